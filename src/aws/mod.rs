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

//! The AWS service-call engine: credential resolution, endpoint resolution,
//! protocol-dispatched request building, Signature V4, transport, and
//! response validation.

pub mod client;
pub mod codec;
pub mod creds;
pub mod endpoint;
pub mod error;
pub mod hal;
pub mod header_constants;
pub mod hooks;
pub mod http;
pub mod multimap_ext;
pub mod protocol;
pub mod region;
pub mod request;
pub mod response;
pub mod shape;
pub mod signer;
pub mod transport;
pub mod utils;

pub use client::{Client, ClientBuilder};

#[cfg(test)]
mod request_tests;
#[cfg(test)]
mod signer_tests;
