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

use std::fmt::Debug;

use crate::aws::error::Error;
use crate::aws::request::AwsRequest;
use crate::aws::transport::HttpResponse;

/// Middleware observing and mutating requests around the exchange.
///
/// Hooks see requests in the order they were registered and responses in
/// reverse order (the standard onion model).
#[async_trait::async_trait]
pub trait RequestLifecycleHooks: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs after the request is fully projected, before it is signed. The
    /// mutation is signed along with everything else.
    async fn before_signing_mut(&self, _request: &mut AwsRequest) -> Result<(), Error> {
        Ok(())
    }

    /// Observes the finished exchange; failures included.
    async fn after_execute(&self, _request: &AwsRequest, _response: &Result<HttpResponse, Error>) {
    }
}
