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

//! Protocol-dispatched projection of a typed input onto a generic request.

use std::collections::BTreeMap;

use bytes::Bytes;
use http::Method;
use typed_builder::TypedBuilder;
use xmltree::Element;

use crate::aws::codec;
use crate::aws::error::Error;
use crate::aws::header_constants::{CONTENT_TYPE, X_AMZ_TARGET};
use crate::aws::http::Url;
use crate::aws::multimap_ext::{Multimap, MultimapExt};
use crate::aws::protocol::ServiceProtocol;
use crate::aws::region::Region;
use crate::aws::shape::{FieldValue, MemberKind, Shape};
use crate::aws::utils::{encode_path, url_decode};

/// The request body in its pre-materialized form.
#[derive(Clone, Debug, Default)]
pub enum Body {
    #[default]
    Empty,
    Text(String),
    Json(Bytes),
    Xml(Element),
    Buffer(Bytes),
}

impl Body {
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    /// Materializes the body bytes as they go on the wire.
    pub fn to_bytes(&self) -> Result<Bytes, Error> {
        Ok(match self {
            Body::Empty => Bytes::new(),
            Body::Text(s) => Bytes::from(s.clone()),
            Body::Json(b) | Body::Buffer(b) => b.clone(),
            Body::Xml(element) => codec::xml::encode(element)?,
        })
    }
}

/// A fully projected service request, ready for signing and dispatch.
#[derive(Clone, Debug, TypedBuilder)]
pub struct AwsRequest {
    pub region: Region,
    pub url: Url,
    pub protocol: ServiceProtocol,
    #[builder(setter(into))]
    pub service: String,
    #[builder(default, setter(into))]
    pub amz_target: Option<String>,
    #[builder(setter(into))]
    pub operation: String,
    pub method: Method,
    #[builder(default)]
    pub headers: Multimap,
    #[builder(default)]
    pub body: Body,
}

/// Everything about the service a single build needs.
#[derive(Clone, Copy, Debug)]
pub struct BuildContext<'a> {
    pub service: &'a str,
    pub api_version: &'a str,
    pub protocol: &'a ServiceProtocol,
    pub target_prefix: Option<&'a str>,
    pub region: Region,
    pub base: &'a Url,
}

/// Substitutes `{name}` (verbatim) and `{name+}` (path-encoded, separators
/// kept) template parameters from the input's path params.
fn substitute_path<S: Shape>(template: &str, input: Option<&S>) -> Result<String, Error> {
    let mut path = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        path.push_str(&rest[..open]);
        let Some(close) = rest[open..].find('}') else {
            return Err(Error::InvalidUrl(format!(
                "unterminated path template in {template}"
            )));
        };
        let name = &rest[open + 1..open + close];
        let (name, greedy) = match name.strip_suffix('+') {
            Some(stripped) => (stripped, true),
            None => (name, false),
        };

        let field = input
            .map(|_| S::descriptor())
            .and_then(|d| {
                d.path_params
                    .iter()
                    .find(|(template_name, _)| *template_name == name)
            })
            .map(|(_, field)| *field)
            .ok_or_else(|| {
                Error::InvalidUrl(format!("no field bound to path parameter {name}"))
            })?;
        let value = input
            .and_then(|i| i.read_field(field))
            .filter(|v| !v.is_null())
            .ok_or_else(|| {
                Error::InvalidUrl(format!("no value for path parameter {name}"))
            })?;

        if greedy {
            path.push_str(&encode_path(&value.text_form()));
        } else {
            path.push_str(&value.text_form());
        }
        rest = &rest[open + close + 1..];
    }
    path.push_str(rest);
    Ok(path)
}

fn join_paths(base: &str, path: &str) -> String {
    if base.is_empty() || base == "/" {
        return if path.is_empty() {
            "/".to_string()
        } else {
            path.to_string()
        };
    }
    let mut joined = base.trim_end_matches('/').to_string();
    if !path.starts_with('/') {
        joined.push('/');
    }
    joined.push_str(path);
    joined
}

/// The payload body per the shared selection rule: structures serialize
/// structurally, blobs pass through raw, strings become text, and anything
/// else is rejected rather than guessed.
fn payload_body<S: Shape>(
    input: &S,
    field: &'static str,
    xml: bool,
) -> Result<Body, Error> {
    let descriptor = S::descriptor();
    let member = descriptor.member(field).ok_or_else(|| {
        Error::UnsupportedOperation(format!("payload field {field} does not exist"))
    })?;
    let Some(value) = input.read_field(field).filter(|v| !v.is_null()) else {
        if xml && member.kind == MemberKind::Structure {
            return Err(Error::MissingParameter(format!(
                "payload element {} not found",
                descriptor.wire_name(field)
            )));
        }
        return Ok(Body::Empty);
    };

    match (member.kind, value) {
        (MemberKind::Structure, value) => {
            if xml {
                let name = descriptor.wire_name(field);
                Ok(Body::Xml(codec::xml::to_element(name, &value)))
            } else {
                Ok(Body::Json(codec::json::encode(&value)?))
            }
        }
        (MemberKind::Blob, FieldValue::Blob(bytes)) => Ok(Body::Buffer(bytes)),
        (MemberKind::Blob, value) | (MemberKind::Scalar, value) => match value {
            FieldValue::Str(text) => Ok(Body::Text(text)),
            FieldValue::Blob(bytes) => Ok(Body::Buffer(bytes)),
            _ => Err(Error::UnsupportedOperation(format!(
                "payload field {field} must be a structure, blob or string"
            ))),
        },
        _ => Err(Error::UnsupportedOperation(format!(
            "payload field {field} must be a structure, blob or string"
        ))),
    }
}

/// Builds an [`AwsRequest`] from an operation, a path template and a typed
/// input, dispatching the body construction on the service protocol.
pub fn build_request<S: Shape>(
    ctx: &BuildContext,
    operation: &str,
    path: &str,
    method: Method,
    input: Option<&S>,
) -> Result<AwsRequest, Error> {
    let descriptor = input.map(|_| S::descriptor());

    // Header, query and path projection happen for every protocol.
    let mut headers = Multimap::new();
    let mut query_dict: BTreeMap<String, String> = BTreeMap::new();

    if let (Some(input), Some(descriptor)) = (input, descriptor) {
        for (wire_name, field) in descriptor.header_params {
            // The payload field is the body, not a header.
            if descriptor.payload_path == Some(*field) {
                continue;
            }
            if let Some(value) = input.read_field(field).filter(|v| !v.is_null()) {
                headers.add(*wire_name, value.text_form());
            }
        }
        for (wire_name, field) in descriptor.query_params {
            if let Some(value) = input.read_field(field) {
                query_dict.insert((*wire_name).to_string(), value.text_form());
            }
        }
    }

    let (path_template, template_query) = match path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path, None),
    };
    let substituted = substitute_path(path_template, input)?;

    // Protocol dispatch: how the remaining fields form the body.
    let mut body = Body::Empty;
    match ctx.protocol {
        ServiceProtocol::Json { .. } | ServiceProtocol::RestJson => {
            if let Some(input) = input {
                body = match S::descriptor().payload_path {
                    Some(field) => payload_body(input, field, false)?,
                    None => Body::Json(codec::json::encode(&input.to_value())?),
                };
            }
        }
        ServiceProtocol::RestXml => {
            if let Some(input) = input {
                body = match S::descriptor().payload_path {
                    Some(field) => payload_body(input, field, true)?,
                    None => Body::Xml(codec::xml::to_element(operation, &input.to_value())),
                };
            }
        }
        ServiceProtocol::Query | ServiceProtocol::Other(_) => {
            let is_query = *ctx.protocol == ServiceProtocol::Query;
            let is_ec2 = ctx.protocol.is_ec2();
            if is_query || is_ec2 {
                let mut dict = input
                    .map(|i| codec::query::flatten(&i.to_value()))
                    .unwrap_or_default();
                dict.insert("Action".to_string(), operation.to_string());
                dict.insert("Version".to_string(), ctx.api_version.to_string());

                if method == Method::GET && !is_ec2 {
                    query_dict.extend(dict);
                } else {
                    body = Body::Text(codec::query::to_form_body(&dict));
                    headers.add(CONTENT_TYPE, "application/x-www-form-urlencoded");
                }
            }
        }
    }

    // Protocol headers the body implies.
    match ctx.protocol {
        ServiceProtocol::Json { version } => {
            headers.add(
                X_AMZ_TARGET,
                format!("{}.{}", ctx.target_prefix.unwrap_or(ctx.service), operation),
            );
            if !headers.contains_key_ci(CONTENT_TYPE) {
                headers.add(CONTENT_TYPE, format!("application/x-amz-json-{version}"));
            }
        }
        ServiceProtocol::RestJson => {
            if matches!(body, Body::Json(_)) && !headers.contains_key_ci(CONTENT_TYPE) {
                headers.add(CONTENT_TYPE, "application/json");
            }
        }
        ServiceProtocol::RestXml => {
            if matches!(body, Body::Xml(_)) && !headers.contains_key_ci(CONTENT_TYPE) {
                headers.add(CONTENT_TYPE, "application/xml");
            }
        }
        _ => {}
    }

    // Dictionary-derived query items in sorted order, then items from the
    // path template in their given order.
    let mut query: Vec<(String, String)> = query_dict.into_iter().collect();
    if let Some(template_query) = template_query {
        for item in template_query.split('&').filter(|i| !i.is_empty()) {
            let (key, value) = item.split_once('=').unwrap_or((item, ""));
            query.push((
                url_decode(key).map_err(|_| Error::MalformedUrl)?.into_owned(),
                url_decode(value)
                    .map_err(|_| Error::MalformedUrl)?
                    .into_owned(),
            ));
        }
    }

    let url = Url {
        https: ctx.base.https,
        host: ctx.base.host.clone(),
        port: ctx.base.port,
        path: join_paths(&ctx.base.path, &substituted),
        query,
    };

    let amz_target = match ctx.protocol {
        ServiceProtocol::Json { .. } => Some(format!(
            "{}.{}",
            ctx.target_prefix.unwrap_or(ctx.service),
            operation
        )),
        _ => None,
    };

    Ok(AwsRequest::builder()
        .region(ctx.region)
        .url(url)
        .protocol(ctx.protocol.clone())
        .service(ctx.service)
        .amz_target(amz_target)
        .operation(operation)
        .method(method)
        .headers(headers)
        .body(body)
        .build())
}
