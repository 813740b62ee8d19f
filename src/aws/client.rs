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

//! The client façade: threads credential resolution, request building,
//! signing, transport and response validation together.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use http::Method;
use serde_json::Value;

use crate::aws::codec;
use crate::aws::creds::{Credentials, CredentialChain, StaticProvider, Provider};
use crate::aws::endpoint::EndpointConfig;
use crate::aws::error::{classify_error, extract_error_parts, Error, ServiceErrorType};
use crate::aws::hal;
use crate::aws::header_constants::{CONTENT_TYPE, HOST, X_AMZ_DATE};
use crate::aws::hooks::RequestLifecycleHooks;
use crate::aws::http::Url;
use crate::aws::multimap_ext::{Multimap, MultimapExt};
use crate::aws::protocol::ServiceProtocol;
use crate::aws::region::{resolve_region, Region};
use crate::aws::request::{build_request, AwsRequest, BuildContext};
use crate::aws::response::{bind_output, decode_success_body, DecodedBody};
use crate::aws::shape::{MemberKind, Shape};
use crate::aws::signer::Signer;
use crate::aws::transport::{HttpRequest, HttpResponse, Transport};
use crate::aws::utils::{sha256_hash, to_amz_date, utc_now, EMPTY_SHA256};

/// Static description of the service a client talks to.
#[derive(Clone, Debug, Default)]
pub struct ServiceConfig {
    /// Signing name, e.g. `sqs`.
    pub service: String,
    /// API version, sent as `Version=` by the query protocols.
    pub api_version: String,
    pub protocol: ServiceProtocol,
    /// `X-Amz-Target` prefix for the json protocol; defaults to the service
    /// name.
    pub amz_target_prefix: Option<String>,
    pub endpoint: EndpointConfig,
}

/// Client builder manufactures a [`Client`] using given parameters.
#[derive(Debug, Default)]
pub struct ClientBuilder {
    config: ServiceConfig,
    region: Option<Region>,
    credentials: Option<(String, String, Option<String>)>,
    credentials_file: Option<PathBuf>,
    presign_expires: Option<u32>,
    follow_hal_links: bool,
    user_agent: Option<String>,
    hooks: Vec<Arc<dyn RequestLifecycleHooks>>,
    error_types: Vec<Arc<dyn ServiceErrorType>>,
}

impl ClientBuilder {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            follow_hal_links: true,
            ..Default::default()
        }
    }

    pub fn region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    /// Explicit credentials; takes precedence over the whole resolution
    /// chain.
    pub fn credentials(
        mut self,
        access_key: &str,
        secret_key: &str,
        session_token: Option<&str>,
    ) -> Self {
        self.credentials = Some((
            access_key.to_string(),
            secret_key.to_string(),
            session_token.map(|t| t.to_string()),
        ));
        self
    }

    /// Overrides the shared credentials file location, `~/.aws/credentials`
    /// by default.
    pub fn credentials_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.credentials_file = Some(path.into());
        self
    }

    /// Pre-signed URL validity in seconds.
    pub fn presign_expires(mut self, expires: u32) -> Self {
        self.presign_expires = Some(expires);
        self
    }

    /// Whether HAL decoding follows embedded internal links with nested
    /// signed GETs. On by default.
    pub fn follow_hal_links(mut self, follow: bool) -> Self {
        self.follow_hal_links = follow;
        self
    }

    pub fn user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = Some(user_agent.to_string());
        self
    }

    /// Add a lifecycle hook. Hooks observe requests in the order they were
    /// added and responses in reverse order.
    pub fn hook(mut self, hook: Arc<dyn RequestLifecycleHooks>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Register a service-specific error type, consulted before the common
    /// error code lists.
    pub fn error_type(mut self, error_type: Arc<dyn ServiceErrorType>) -> Self {
        self.error_types.push(error_type);
        self
    }

    /// Build the client. Credentials and region resolve here, once; later
    /// edits to the environment or the credentials file are not observed.
    pub fn build(self) -> Result<Client, Error> {
        let region = resolve_region(
            self.region,
            self.config.endpoint.partition_endpoint.as_deref(),
        );

        let credentials = self.resolve_credentials();
        let base = self.config.endpoint.resolve(&self.config.service, region)?;

        let mut signer = Signer::new(credentials, region, &self.config.service);
        if let Some(expires) = self.presign_expires {
            signer = signer.presign_expires(expires);
        }

        let mut transport = Transport::new();
        if let Some(user_agent) = self.user_agent {
            transport = transport.user_agent(user_agent);
        }

        Ok(Client {
            shared: Arc::new(SharedClient {
                config: self.config,
                region,
                base,
                signer,
                transport,
                hooks: self.hooks,
                error_types: self.error_types,
                follow_hal_links: self.follow_hal_links,
            }),
        })
    }

    fn resolve_credentials(&self) -> Credentials {
        if let Some((access_key, secret_key, session_token)) = &self.credentials {
            if let Some(creds) =
                StaticProvider::new(access_key, secret_key, session_token.as_deref()).fetch()
            {
                return creds;
            }
        }
        match &self.credentials_file {
            Some(path) => CredentialChain::with_credentials_file(path).resolve(),
            None => CredentialChain::standard().resolve(),
        }
    }
}

#[derive(Debug)]
struct SharedClient {
    config: ServiceConfig,
    region: Region,
    base: Url,
    signer: Signer,
    transport: Transport,
    hooks: Vec<Arc<dyn RequestLifecycleHooks>>,
    error_types: Vec<Arc<dyn ServiceErrorType>>,
    follow_hal_links: bool,
}

/// Immutable bundle of signer, protocol and endpoint configuration;
/// thread-safe and cheap to clone. Each call owns its request and response
/// state.
#[derive(Clone, Debug)]
pub struct Client {
    shared: Arc<SharedClient>,
}

impl Client {
    pub fn region(&self) -> Region {
        self.shared.region
    }

    pub fn endpoint(&self) -> &Url {
        &self.shared.base
    }

    fn context(&self) -> BuildContext<'_> {
        BuildContext {
            service: &self.shared.config.service,
            api_version: &self.shared.config.api_version,
            protocol: &self.shared.config.protocol,
            target_prefix: self.shared.config.amz_target_prefix.as_deref(),
            region: self.shared.region,
            base: &self.shared.base,
        }
    }

    /// Typed input, typed output.
    pub async fn round_trip<I: Shape, O: Shape>(
        &self,
        operation: &str,
        path: &str,
        method: Method,
        input: &I,
    ) -> Result<O, Error> {
        let request = build_request(&self.context(), operation, path, method, Some(input))?;
        let (request, response) = self.execute(request).await?;
        self.decode_output(&request, response).await
    }

    /// No input, typed output.
    pub async fn round_trip_no_input<O: Shape>(
        &self,
        operation: &str,
        path: &str,
        method: Method,
    ) -> Result<O, Error> {
        let request = build_request::<()>(&self.context(), operation, path, method, None)?;
        let (request, response) = self.execute(request).await?;
        self.decode_output(&request, response).await
    }

    /// Typed input, no output.
    pub async fn call_with_input<I: Shape>(
        &self,
        operation: &str,
        path: &str,
        method: Method,
        input: &I,
    ) -> Result<(), Error> {
        let request = build_request(&self.context(), operation, path, method, Some(input))?;
        self.execute(request).await?;
        Ok(())
    }

    /// No input, no output.
    pub async fn call(&self, operation: &str, path: &str, method: Method) -> Result<(), Error> {
        let request = build_request::<()>(&self.context(), operation, path, method, None)?;
        self.execute(request).await?;
        Ok(())
    }

    /// Blocking form of [`Client::round_trip`]. Must not be called from an
    /// async context.
    pub fn round_trip_blocking<I: Shape, O: Shape>(
        &self,
        operation: &str,
        path: &str,
        method: Method,
        input: &I,
    ) -> Result<O, Error> {
        wait(self.round_trip(operation, path, method, input))
    }

    /// Blocking form of [`Client::round_trip_no_input`].
    pub fn round_trip_no_input_blocking<O: Shape>(
        &self,
        operation: &str,
        path: &str,
        method: Method,
    ) -> Result<O, Error> {
        wait(self.round_trip_no_input(operation, path, method))
    }

    /// Blocking form of [`Client::call_with_input`].
    pub fn call_with_input_blocking<I: Shape>(
        &self,
        operation: &str,
        path: &str,
        method: Method,
        input: &I,
    ) -> Result<(), Error> {
        wait(self.call_with_input(operation, path, method, input))
    }

    /// Blocking form of [`Client::call`].
    pub fn call_blocking(&self, operation: &str, path: &str, method: Method) -> Result<(), Error> {
        wait(self.call(operation, path, method))
    }

    /// Signs per the method and protocol, sends, classifies failures.
    ///
    /// GET requests pre-sign the URL except under `restjson`, where the URI
    /// already carries path and query and headers are signed instead.
    /// Non-GET requests always sign headers.
    async fn execute(&self, mut request: AwsRequest) -> Result<(AwsRequest, HttpResponse), Error> {
        for hook in self.shared.hooks.iter() {
            hook.before_signing_mut(&mut request)
                .await
                .inspect_err(|e| log::warn!("hook {} failed: {e}", hook.name()))?;
        }

        let date = utc_now();
        let body = request.body.to_bytes()?;

        let presign = request.method == Method::GET
            && !matches!(request.protocol, ServiceProtocol::RestJson);
        if presign {
            request.headers.remove_ci(HOST);
            request.headers.add(HOST, request.url.host_header_value());
            let method = request.method.clone();
            self.shared
                .signer
                .presign_url(&method, &mut request.url, date);
        } else {
            if !request.headers.contains_key_ci(HOST) {
                request.headers.add(HOST, request.url.host_header_value());
            }
            request.headers.add(X_AMZ_DATE, to_amz_date(date));
            let content_sha256 = if body.is_empty() {
                EMPTY_SHA256.to_string()
            } else {
                sha256_hash(&body)
            };
            self.shared.signer.sign_headers(
                &request.method,
                &request.url,
                &mut request.headers,
                &content_sha256,
                date,
            );
        }

        let http_request = HttpRequest {
            method: request.method.clone(),
            url: request.url.clone(),
            headers: request.headers.clone(),
            body,
        };
        let result = self.shared.transport.send(&http_request).await;

        for hook in self.shared.hooks.iter().rev() {
            hook.after_execute(&request, &result).await;
        }

        let response = result?;
        if !response.is_success() {
            let parts =
                extract_error_parts(&request.protocol, &response.headers, &response.body);
            return Err(classify_error(
                parts,
                response.status_code,
                response.body,
                &self.shared.error_types,
            ));
        }
        Ok((request, response))
    }

    async fn decode_output<O: Shape>(
        &self,
        request: &AwsRequest,
        response: HttpResponse,
    ) -> Result<O, Error> {
        let is_json_protocol = matches!(
            request.protocol,
            ServiceProtocol::Json { .. } | ServiceProtocol::RestJson
        );
        let is_hal = response
            .headers
            .get_ci(CONTENT_TYPE)
            .map(hal::is_hal)
            .unwrap_or(false);

        let decoded = if is_json_protocol && is_hal && !response.body.is_empty() {
            DecodedBody::Value(self.expand_hal::<O>(&response.body).await?)
        } else {
            decode_success_body(&request.protocol, &request.operation, &response.body)?
        };

        bind_output(decoded, &response.headers, &response.body)
    }

    /// HAL decoding: properties come through as-is; each `_embedded`
    /// relation binds to the output member carrying that wire name. Internal
    /// links of embedded list items are followed with nested signed GETs
    /// against the same endpoint (cross-origin links are unsupported).
    pub(crate) async fn expand_hal<O: Shape>(
        &self,
        body: &Bytes,
    ) -> Result<crate::aws::shape::FieldValue, Error> {
        let document: Value = serde_json::from_slice(body)?;
        let parsed = hal::parse(&document);
        let mut object = parsed.properties;
        let descriptor = O::descriptor();

        for (rel, representations) in parsed.embedded {
            let member = descriptor.members.iter().find(|m| {
                m.location.map(|l| l.name == rel).unwrap_or(false)
            });
            let Some(member) = member else {
                continue;
            };

            match member.kind {
                MemberKind::List => {
                    let mut items = Vec::with_capacity(representations.len());
                    for representation in &representations {
                        let mut properties = hal::parse(representation).properties;
                        if self.shared.follow_hal_links {
                            for (link_rel, href) in hal::internal_links(representation) {
                                let linked = self.fetch_hal_link(&href).await?;
                                let linked_properties = hal::parse(&linked).properties;
                                properties.insert(
                                    hal::camel_case(&link_rel),
                                    Value::Object(linked_properties),
                                );
                            }
                        }
                        items.push(Value::Object(properties));
                    }
                    object.insert(member.label.to_string(), Value::Array(items));
                }
                MemberKind::Structure => {
                    if let Some(first) = representations.first() {
                        object.insert(
                            member.label.to_string(),
                            Value::Object(hal::parse(first).properties),
                        );
                    }
                }
                _ => {}
            }
        }

        Ok(codec::json::from_json(Value::Object(object)))
    }

    /// One nested signed GET for a HAL link, relative to the client
    /// endpoint. Shares the caller's transport, so dropping the outer future
    /// cancels the inner request too.
    async fn fetch_hal_link(&self, href: &str) -> Result<Value, Error> {
        let mut url = self.shared.base.clone();
        let (path, query) = match href.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (href, None),
        };
        url.path = path.to_string();
        url.query = Vec::new();
        if let Some(query) = query {
            for item in query.split('&').filter(|i| !i.is_empty()) {
                let (key, value) = item.split_once('=').unwrap_or((item, ""));
                url.query.push((key.to_string(), value.to_string()));
            }
        }

        let date = utc_now();
        let mut headers = Multimap::new();
        headers.add(HOST, url.host_header_value());
        headers.add(X_AMZ_DATE, to_amz_date(date));
        self.shared
            .signer
            .sign_headers(&Method::GET, &url, &mut headers, EMPTY_SHA256, date);

        let response = self
            .shared
            .transport
            .send(&HttpRequest {
                method: Method::GET,
                url,
                headers,
                body: Bytes::new(),
            })
            .await?;
        if !response.is_success() {
            let parts = extract_error_parts(
                &ServiceProtocol::RestJson,
                &response.headers,
                &response.body,
            );
            return Err(classify_error(
                parts,
                response.status_code,
                response.body,
                &self.shared.error_types,
            ));
        }
        Ok(serde_json::from_slice(&response.body)?)
    }
}

/// Runs a call future to completion on a fresh current-thread runtime.
fn wait<F, T>(future: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(future)
}
