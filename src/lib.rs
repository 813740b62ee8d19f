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

//! # awsio
//!
//! A protocol-polymorphic engine for calling AWS-style services. Given a
//! service description (wire protocol, API version, endpoints) and a typed
//! input value, the engine projects the input onto an HTTP request, signs it
//! with AWS Signature Version 4, dispatches it over a minimal HTTP/1.1
//! transport, and decodes the response (or a classified error) back into a
//! typed output value.
//!
//! Five wire protocols share one dispatcher: `json`, `restjson`, `restxml`,
//! `query`, and the `ec2` query variant. They differ only in how fields of
//! the input map onto headers, path segments, query string, and body, and
//! symmetrically in how response bytes map back onto output fields.
//!
//! ## Basic usage
//!
//! ```no_run
//! use awsio::aws::client::{Client, ClientBuilder, ServiceConfig};
//! use awsio::aws::protocol::ServiceProtocol;
//! use awsio::aws::region::Region;
//! use http::Method;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client: Client = ClientBuilder::new(ServiceConfig {
//!         service: "iam".into(),
//!         api_version: "2010-05-08".into(),
//!         protocol: ServiceProtocol::Query,
//!         ..Default::default()
//!     })
//!     .region(Region::UsEast1)
//!     .build()
//!     .unwrap();
//!
//!     client
//!         .call("DeleteAccountPasswordPolicy", "/", Method::POST)
//!         .await
//!         .expect("request failed");
//! }
//! ```
//!
//! ## Design
//! - Input and output values implement [`aws::shape::Shape`], a generated
//!   descriptor-table contract; the engine never reflects dynamically.
//! - Credentials resolve once at client construction through an ordered
//!   provider chain (explicit, environment, shared credentials file,
//!   anonymous).
//! - The async API is canonical; every send has a `_blocking` form.

#![allow(clippy::result_large_err)]
#![allow(clippy::too_many_arguments)]
pub mod aws;
