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

//! AWS wire protocols

use std::fmt;

/// The wire protocol of a service, deciding how input fields project onto
/// HTTP primitives and how response bytes project back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServiceProtocol {
    /// The target-header JSON protocol (`application/x-amz-json-<version>`).
    Json { version: String },
    /// REST with JSON bodies.
    RestJson,
    /// REST with XML bodies.
    RestXml,
    /// The flat `Action=...&Version=...` query protocol.
    Query,
    /// Any other protocol by name. `other("ec2")` is the EC2 variant of the
    /// query protocol (always a form body).
    Other(String),
}

impl Default for ServiceProtocol {
    fn default() -> Self {
        ServiceProtocol::Query
    }
}

impl ServiceProtocol {
    /// Whether this is the EC2 variant of the query protocol.
    pub fn is_ec2(&self) -> bool {
        matches!(self, ServiceProtocol::Other(name) if name == "ec2")
    }

    pub fn name(&self) -> &str {
        match self {
            ServiceProtocol::Json { .. } => "json",
            ServiceProtocol::RestJson => "restjson",
            ServiceProtocol::RestXml => "restxml",
            ServiceProtocol::Query => "query",
            ServiceProtocol::Other(name) => name,
        }
    }
}

impl fmt::Display for ServiceProtocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}
