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

//! Endpoint resolution

use std::collections::HashMap;
use std::str::FromStr;

use crate::aws::error::Error;
use crate::aws::http::Url;
use crate::aws::region::Region;

/// Endpoint configuration of one service.
///
/// Resolution order: the explicit override, the region-specific entry in
/// `service_endpoints`, the partition's global entry when
/// `partition_endpoint` is set, and finally the canonical
/// `{service}.{region}.{partition domain}` host. The scheme defaults to
/// `https`.
#[derive(Clone, Debug, Default)]
pub struct EndpointConfig {
    /// Explicit endpoint override, e.g. `http://localhost:4566`. May carry a
    /// scheme and port.
    pub endpoint: Option<String>,
    /// Region identifier (or pseudo-region key) to endpoint host.
    pub service_endpoints: HashMap<String, String>,
    /// Key of the partition-global entry in `service_endpoints`, for
    /// services with a single endpoint per partition (e.g. IAM).
    pub partition_endpoint: Option<String>,
}

impl EndpointConfig {
    /// Resolves the base URL for `service` in `region`.
    pub fn resolve(&self, service: &str, region: Region) -> Result<Url, Error> {
        if let Some(endpoint) = &self.endpoint {
            return Url::from_str(endpoint);
        }

        if let Some(host) = self.service_endpoints.get(region.as_str()) {
            return Url::from_str(host);
        }

        if let Some(key) = &self.partition_endpoint {
            if let Some(host) = self.service_endpoints.get(key) {
                return Url::from_str(host);
            }
        }

        let host = format!(
            "{}.{}.{}",
            service,
            region.as_str(),
            region.partition().domain()
        );
        Url::from_str(&host)
    }
}
