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

//! Various utility and helper functions

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::engine::Engine as _;
use chrono::{DateTime, NaiveDateTime, ParseError, Utc};
use lazy_static::lazy_static;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use sha2::{Digest, Sha256};
pub use urlencoding::decode as url_decode;
pub use urlencoding::encode as url_encode;
use xmltree::Element;

use crate::aws::error::Error;

/// Date and time with UTC timezone
pub type UtcTime = DateTime<Utc>;

/// Hex encoded SHA-256 of the empty byte string.
pub const EMPTY_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Encodes data using base64 algorithm
pub fn b64_encode<T: AsRef<[u8]>>(input: T) -> String {
    BASE64.encode(input)
}

/// Decodes base64 data
pub fn b64_decode(input: &str) -> Result<Vec<u8>, Error> {
    BASE64
        .decode(input)
        .map_err(|e| Error::DecodeError(e.to_string()))
}

/// Gets hex encoded SHA256 hash of given data
pub fn sha256_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Gets current UTC time
pub fn utc_now() -> UtcTime {
    chrono::offset::Utc::now()
}

/// Gets signer date value of given time
pub fn to_signer_date(time: UtcTime) -> String {
    time.format("%Y%m%d").to_string()
}

/// Gets AMZ date value of given time
pub fn to_amz_date(time: UtcTime) -> String {
    time.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Gets ISO8601 UTC formatted value of given time
pub fn to_iso8601utc(time: UtcTime) -> String {
    time.format("%Y-%m-%dT%H:%M:%S.%3fZ").to_string()
}

/// Parses ISO8601 UTC formatted value to time
pub fn from_iso8601utc(s: &str) -> Result<UtcTime, ParseError> {
    Ok(DateTime::<Utc>::from_naive_utc_and_offset(
        match NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S.%3fZ") {
            Ok(d) => d,
            _ => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%SZ")?,
        },
        Utc,
    ))
}

// The AWS-unreserved characters. NON_ALPHANUMERIC escapes everything
// non-alphanumeric, so only the unreserved marks are removed from the set.
const UNRESERVED_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

// Same as above but keeps `/`, for greedy path substitution and canonical
// URIs where segment separators must survive.
const PATH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Percent-encodes with the AWS-unreserved allow-list (`A-Z a-z 0-9 - _ . ~`).
pub fn uri_encode(s: &str) -> String {
    utf8_percent_encode(s, UNRESERVED_ENCODE_SET).collect()
}

/// Percent-encodes a URL path, leaving segment separators intact.
pub fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH_ENCODE_SET).collect()
}

/// Checks if given hostname is valid or not
pub fn match_hostname(value: &str) -> bool {
    lazy_static! {
        static ref HOSTNAME_REGEX: Regex =
            Regex::new(r"^([a-z_\d-]{1,63}\.)*([a-z_\d-]{1,63})$").unwrap();
    }

    if !HOSTNAME_REGEX.is_match(value.to_lowercase().as_str()) {
        return false;
    }

    for token in value.split('.') {
        if token.starts_with('-')
            || token.starts_with('_')
            || token.ends_with('-')
            || token.ends_with('_')
        {
            return false;
        }
    }

    true
}

/// Gets optional text value of given XML element for given tag.
pub fn get_option_text(element: &Element, tag: &str) -> Option<String> {
    element
        .get_child(tag)
        .map(|v| v.get_text().unwrap_or_default().to_string())
}

/// Gets default text value of given XML element for given tag.
pub fn get_default_text(element: &Element, tag: &str) -> String {
    element.get_child(tag).map_or(String::new(), |v| {
        v.get_text().unwrap_or_default().to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_of_empty_matches_known_constant() {
        assert_eq!(sha256_hash(b""), EMPTY_SHA256);
    }

    #[test]
    fn test_amz_date_formats() {
        let date = chrono::TimeZone::with_ymd_and_hms(&Utc, 2013, 5, 24, 0, 0, 0).unwrap();
        assert_eq!(to_amz_date(date), "20130524T000000Z");
        assert_eq!(to_signer_date(date), "20130524");
    }

    #[test]
    fn test_uri_encode_unreserved_set() {
        assert_eq!(uri_encode("a-b_c.d~e"), "a-b_c.d~e");
        assert_eq!(uri_encode("a/b c"), "a%2Fb%20c");
        assert_eq!(encode_path("a/b c"), "a/b%20c");
    }

    #[test]
    fn test_iso8601_round_trip() {
        let date = chrono::TimeZone::with_ymd_and_hms(&Utc, 2015, 8, 30, 12, 36, 0).unwrap();
        let s = to_iso8601utc(date);
        assert_eq!(from_iso8601utc(&s).unwrap(), date);
    }
}
