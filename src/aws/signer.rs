// awsio: AWS service-call engine for Rust
// Copyright 2024 the awsio authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Signature V4 for AWS APIs

use hex::encode as hexencode;
use hmac::{Hmac, Mac};
use http::Method;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::Sha256;

use crate::aws::creds::Credentials;
use crate::aws::header_constants::{
    X_AMZ_ALGORITHM, X_AMZ_CREDENTIAL, X_AMZ_DATE, X_AMZ_EXPIRES, X_AMZ_SECURITY_TOKEN,
    X_AMZ_SIGNATURE, X_AMZ_SIGNED_HEADERS,
};
use crate::aws::http::Url;
use crate::aws::multimap_ext::{Multimap, MultimapExt};
use crate::aws::region::Region;
use crate::aws::utils::{to_amz_date, to_signer_date, sha256_hash, UtcTime};

/// Default pre-signed URL validity in seconds (24 hours).
pub const DEFAULT_PRESIGN_EXPIRES: u32 = 86_400;

// The unreserved set for canonical URI segments. A `%` already present in a
// segment introduces an escape and is preserved.
const CANONICAL_SEGMENT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'%');

/// Returns HMAC hash for given key and data
pub fn hmac_hash(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut hasher = Hmac::<Sha256>::new_from_slice(key).expect("HMAC can take key of any size");
    hasher.update(data);
    hasher.finalize().into_bytes().to_vec()
}

/// Returns hex encoded HMAC hash for given key and data
pub fn hmac_hash_hex(key: &[u8], data: &[u8]) -> String {
    hexencode(hmac_hash(key, data))
}

/// Returns scope value of given date, region and service name
pub fn get_scope(date: UtcTime, region: Region, service_name: &str) -> String {
    format!(
        "{}/{}/{}/aws4_request",
        to_signer_date(date),
        region,
        service_name
    )
}

/// Canonical URI: the path component only, each segment percent-encoded
/// with the AWS-unreserved set. The empty path canonicalizes to `/`.
pub fn get_canonical_uri(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    let encoded: Vec<String> = path
        .split('/')
        .map(|segment| utf8_percent_encode(segment, CANONICAL_SEGMENT_SET).collect())
        .collect();
    let mut uri = encoded.join("/");
    if !uri.starts_with('/') {
        uri.insert(0, '/');
    }
    uri
}

/// Returns hex encoded SHA256 hash of canonical request
pub fn get_canonical_request_hash(
    method: &Method,
    uri: &str,
    query_string: &str,
    headers: &str,
    signed_headers: &str,
    content_sha256: &str,
) -> String {
    // CanonicalRequest =
    //   HTTPRequestMethod + '\n' +
    //   CanonicalURI + '\n' +
    //   CanonicalQueryString + '\n' +
    //   CanonicalHeaders + '\n\n' +
    //   SignedHeaders + '\n' +
    //   HexEncode(Hash(RequestPayload))
    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n\n{}\n{}",
        method, uri, query_string, headers, signed_headers, content_sha256
    );
    sha256_hash(canonical_request.as_bytes())
}

/// Returns string-to-sign value of given date, scope and canonical request hash
pub fn get_string_to_sign(date: UtcTime, scope: &str, canonical_request_hash: &str) -> String {
    format!(
        "AWS4-HMAC-SHA256\n{}\n{}\n{}",
        to_amz_date(date),
        scope,
        canonical_request_hash
    )
}

/// Returns signing key of given secret key, date, region and service name
pub fn get_signing_key(
    secret_key: &str,
    date: UtcTime,
    region: Region,
    service_name: &str,
) -> Vec<u8> {
    let mut key: Vec<u8> = b"AWS4".to_vec();
    key.extend(secret_key.as_bytes());

    let date_key = hmac_hash(key.as_slice(), to_signer_date(date).as_bytes());
    let date_region_key = hmac_hash(date_key.as_slice(), region.as_str().as_bytes());
    let date_region_service_key = hmac_hash(date_region_key.as_slice(), service_name.as_bytes());
    hmac_hash(date_region_service_key.as_slice(), b"aws4_request")
}

/// Returns signature value for given signing key and string-to-sign
pub fn get_signature(signing_key: &[u8], string_to_sign: &[u8]) -> String {
    hmac_hash_hex(signing_key, string_to_sign)
}

/// Returns authorization value for given access key, scope, signed headers and signature
pub fn get_authorization(
    access_key: &str,
    scope: &str,
    signed_headers: &str,
    signature: &str,
) -> String {
    format!(
        "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
        access_key, scope, signed_headers, signature
    )
}

/// Signs the request and adds the `Authorization` header
pub fn sign_v4(
    service_name: &str,
    method: &Method,
    path: &str,
    region: Region,
    headers: &mut Multimap,
    query_params: &Multimap,
    access_key: &str,
    secret_key: &str,
    content_sha256: &str,
    date: UtcTime,
) {
    let scope = get_scope(date, region, service_name);
    let (signed_headers, canonical_headers) = headers.get_canonical_headers();
    let canonical_uri = get_canonical_uri(path);
    let canonical_query_string = query_params.get_canonical_query_string();
    let canonical_request_hash = get_canonical_request_hash(
        method,
        &canonical_uri,
        &canonical_query_string,
        &canonical_headers,
        &signed_headers,
        content_sha256,
    );
    let string_to_sign = get_string_to_sign(date, &scope, &canonical_request_hash);
    let signing_key = get_signing_key(secret_key, date, region, service_name);
    let signature = get_signature(signing_key.as_slice(), string_to_sign.as_bytes());
    let authorization = get_authorization(access_key, &scope, &signed_headers, &signature);

    headers.add("Authorization", authorization);
}

/// Adds the signature fields to the query parameters of a pre-signed URL.
/// Only the `host` header is signed and the payload stays unsigned.
pub fn presign_v4(
    service_name: &str,
    method: &Method,
    host: &str,
    path: &str,
    region: Region,
    query_params: &mut Multimap,
    access_key: &str,
    secret_key: &str,
    session_token: Option<&str>,
    date: UtcTime,
    expires: u32,
) {
    let scope = get_scope(date, region, service_name);
    let canonical_headers = "host:".to_string() + host;
    let signed_headers = "host";

    query_params.add(X_AMZ_ALGORITHM, "AWS4-HMAC-SHA256");
    query_params.add(X_AMZ_CREDENTIAL, format!("{access_key}/{scope}"));
    query_params.add(X_AMZ_DATE, to_amz_date(date));
    query_params.add(X_AMZ_EXPIRES, expires.to_string());
    query_params.add(X_AMZ_SIGNED_HEADERS, signed_headers);
    if let Some(token) = session_token {
        query_params.add(X_AMZ_SECURITY_TOKEN, token);
    }

    let canonical_uri = get_canonical_uri(path);
    let canonical_query_string = query_params.get_canonical_query_string();
    let canonical_request_hash = get_canonical_request_hash(
        method,
        &canonical_uri,
        &canonical_query_string,
        &canonical_headers,
        signed_headers,
        "UNSIGNED-PAYLOAD",
    );
    let string_to_sign = get_string_to_sign(date, &scope, &canonical_request_hash);
    let signing_key = get_signing_key(secret_key, date, region, service_name);
    let signature = get_signature(signing_key.as_slice(), string_to_sign.as_bytes());

    query_params.add(X_AMZ_SIGNATURE, signature);
}

/// Stateless per call; holds the resolved credential, the region and the
/// service name the signature is scoped to.
#[derive(Clone, Debug)]
pub struct Signer {
    creds: Credentials,
    region: Region,
    service: String,
    presign_expires: u32,
}

impl Signer {
    pub fn new(creds: Credentials, region: Region, service: &str) -> Self {
        Self {
            creds,
            region,
            service: service.to_string(),
            presign_expires: DEFAULT_PRESIGN_EXPIRES,
        }
    }

    pub fn presign_expires(mut self, expires: u32) -> Self {
        self.presign_expires = expires;
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.creds
    }

    pub fn region(&self) -> Region {
        self.region
    }

    /// Header-mode signing: adds `X-Amz-Security-Token` when a session token
    /// is present, then the `Authorization` header. Anonymous credentials
    /// leave the request unsigned.
    pub fn sign_headers(
        &self,
        method: &Method,
        url: &Url,
        headers: &mut Multimap,
        content_sha256: &str,
        date: UtcTime,
    ) {
        if self.creds.is_anonymous() {
            return;
        }
        if let Some(token) = &self.creds.session_token {
            headers.add(X_AMZ_SECURITY_TOKEN, token.clone());
        }

        let mut query_params = Multimap::new();
        for (key, value) in &url.query {
            query_params.add(key.clone(), value.clone());
        }

        sign_v4(
            &self.service,
            method,
            &url.path,
            self.region,
            headers,
            &query_params,
            &self.creds.access_key,
            &self.creds.secret_key,
            content_sha256,
            date,
        );
    }

    /// Pre-sign mode: moves the signature into the query string. The URL's
    /// query items are rewritten in canonical (sorted) order; no
    /// `Authorization` header is emitted.
    pub fn presign_url(&self, method: &Method, url: &mut Url, date: UtcTime) {
        if self.creds.is_anonymous() {
            return;
        }

        let mut query_params = Multimap::new();
        for (key, value) in &url.query {
            query_params.add(key.clone(), value.clone());
        }

        presign_v4(
            &self.service,
            method,
            &url.host_header_value(),
            &url.path,
            self.region,
            &mut query_params,
            &self.creds.access_key,
            &self.creds.secret_key,
            self.creds.session_token.as_deref(),
            date,
            self.presign_expires,
        );

        let mut items: Vec<(String, String)> = query_params
            .iter_all()
            .flat_map(|(k, vs)| vs.iter().map(|v| (k.clone(), v.clone())))
            .collect();
        items.sort();
        url.query = items;
    }
}
