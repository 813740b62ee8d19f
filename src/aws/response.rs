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

//! Protocol-dispatched inversion of the request builder: response bytes back
//! into typed output values.

use std::collections::BTreeMap;

use bytes::Bytes;
use xmltree::Element;

use crate::aws::codec;
use crate::aws::error::Error;
use crate::aws::header_constants::CONTENT_TYPE;
use crate::aws::multimap_ext::{Multimap, MultimapExt};
use crate::aws::protocol::ServiceProtocol;
use crate::aws::shape::{FieldValue, MemberKind, Shape, ShapeDescriptor};
use crate::aws::utils::{b64_decode, from_iso8601utc};

/// A response body after protocol decoding, before shape binding.
#[derive(Clone, Debug)]
pub enum DecodedBody {
    Empty,
    Value(FieldValue),
    Buffer(Bytes),
}

/// Descends one level into `<Op>Result`/`<Op>Response` wrapper elements
/// that carry exactly one child.
fn unwrap_result_element(mut root: Element, operation: &str) -> Element {
    let is_wrapper = root.name == format!("{operation}Result")
        || root.name == format!("{operation}Response");
    if !is_wrapper {
        return root;
    }
    let element_indices: Vec<usize> = root
        .children
        .iter()
        .enumerate()
        .filter_map(|(i, n)| n.as_element().map(|_| i))
        .collect();
    if element_indices.len() != 1 {
        return root;
    }
    match root.children.swap_remove(element_indices[0]) {
        xmltree::XMLNode::Element(only) => only,
        other => {
            root.children.push(other);
            root
        }
    }
}

/// Decodes a successful body per protocol. HAL documents are the client's
/// concern (link expansion suspends); this handles everything else.
pub fn decode_success_body(
    protocol: &ServiceProtocol,
    operation: &str,
    body: &Bytes,
) -> Result<DecodedBody, Error> {
    if body.is_empty() {
        return Ok(DecodedBody::Empty);
    }
    match protocol {
        ServiceProtocol::Json { .. } | ServiceProtocol::RestJson => {
            Ok(DecodedBody::Value(codec::json::decode(body)?))
        }
        ServiceProtocol::RestXml | ServiceProtocol::Query => {
            let root = codec::xml::decode(body)?;
            let root = unwrap_result_element(root, operation);
            Ok(DecodedBody::Value(codec::xml::element_to_value(&root)))
        }
        ServiceProtocol::Other(name) if name == "ec2" => {
            let root = codec::xml::decode(body)?;
            let root = unwrap_result_element(root, operation);
            Ok(DecodedBody::Value(codec::xml::element_to_value(&root)))
        }
        ServiceProtocol::Other(_) => Ok(DecodedBody::Buffer(body.clone())),
    }
}

/// Coerces a header string into a number or boolean when it parses as one;
/// integers win whenever the value is whole.
fn coerce_header_value(value: &str) -> FieldValue {
    if let Ok(i) = value.parse::<i64>() {
        return FieldValue::Int(i);
    }
    if let Ok(f) = value.parse::<f64>() {
        if f % 1.0 == 0.0 {
            return FieldValue::Int(f as i64);
        }
        return FieldValue::Float(f);
    }
    if let Ok(b) = value.parse::<bool>() {
        return FieldValue::Bool(b);
    }
    FieldValue::Str(value.to_string())
}

/// Body-decoded values arrive in their wire text form; narrow each one into
/// the member's declared kind. Blobs travel as base64 text, timestamps as
/// ISO8601 text or epoch seconds.
fn narrow_member_kinds(
    structure: &mut BTreeMap<String, FieldValue>,
    descriptor: &ShapeDescriptor,
) -> Result<(), Error> {
    for member in descriptor.members {
        let Some(value) = structure.get(member.label) else {
            continue;
        };
        let narrowed = match (member.kind, value) {
            (MemberKind::Blob, FieldValue::Str(text)) => {
                FieldValue::Blob(Bytes::from(b64_decode(text)?))
            }
            (MemberKind::Timestamp, FieldValue::Str(text)) => {
                FieldValue::Timestamp(from_iso8601utc(text)?)
            }
            (MemberKind::Timestamp, FieldValue::Int(seconds)) => {
                match chrono::DateTime::from_timestamp(*seconds, 0) {
                    Some(timestamp) => FieldValue::Timestamp(timestamp),
                    None => continue,
                }
            }
            _ => continue,
        };
        structure.insert(member.label.to_string(), narrowed);
    }
    Ok(())
}

/// Binds a decoded body plus response headers to the typed output.
///
/// A declared payload path takes the raw body (text when the body is
/// textual) and stops projection there; otherwise header-mapped members
/// merge into the decoded dictionary case-insensitively.
pub fn bind_output<O: Shape>(
    decoded: DecodedBody,
    headers: &Multimap,
    raw_body: &Bytes,
) -> Result<O, Error> {
    let descriptor = O::descriptor();

    if let Some(field) = descriptor.payload_path {
        let textual = headers
            .get_ci(CONTENT_TYPE)
            .map(|ct| ct.starts_with("text/"))
            .unwrap_or(false);
        let payload = if textual {
            FieldValue::Str(String::from_utf8_lossy(raw_body).into_owned())
        } else {
            FieldValue::Blob(raw_body.clone())
        };
        let mut structure = BTreeMap::new();
        structure.insert(field.to_string(), payload);
        return O::from_value(FieldValue::Structure(structure));
    }

    let mut structure = match decoded {
        DecodedBody::Empty => BTreeMap::new(),
        DecodedBody::Value(value) => value
            .into_structure()
            .ok_or_else(|| Error::DecodeError("expected a structural response body".into()))?,
        DecodedBody::Buffer(bytes) => {
            let mut structure = BTreeMap::new();
            // No payload member declared; surface the bytes under the
            // conventional body key.
            structure.insert("body".to_string(), FieldValue::Blob(bytes));
            structure
        }
    };

    narrow_member_kinds(&mut structure, descriptor)?;

    for (wire_name, field) in descriptor.header_params {
        if let Some(value) = headers.get_ci(wire_name) {
            structure.insert((*field).to_string(), coerce_header_value(value));
        }
    }

    O::from_value(FieldValue::Structure(structure))
}
