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

//! The shape reflection contract.
//!
//! Generated per-service code describes each input and output value with a
//! static [`ShapeDescriptor`] and a field accessor keyed by field name. The
//! engine only ever talks to shapes through this contract; there is no
//! dynamic reflection.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::aws::error::Error;
use crate::aws::utils::{b64_encode, to_iso8601utc, UtcTime};

/// Where a member travels on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocationKind {
    Header,
    Query,
    Uri,
    Body,
}

/// A member's wire-name override and location.
#[derive(Clone, Copy, Debug)]
pub struct Location {
    pub name: &'static str,
    pub kind: LocationKind,
}

/// The coarse type of a member, deciding codec treatment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberKind {
    Scalar,
    List,
    Map,
    Structure,
    Blob,
    Timestamp,
}

/// One member of a shape, in declaration order.
#[derive(Clone, Copy, Debug)]
pub struct Member {
    pub label: &'static str,
    pub location: Option<Location>,
    pub kind: MemberKind,
}

/// Class-level metadata of a shape: which fields project onto headers,
/// query string and path, which single field (if any) is the raw payload,
/// and the ordered member list.
#[derive(Clone, Copy, Debug)]
pub struct ShapeDescriptor {
    /// Wire header name to field name.
    pub header_params: &'static [(&'static str, &'static str)],
    /// Wire query parameter name to field name.
    pub query_params: &'static [(&'static str, &'static str)],
    /// Path template name to field name.
    pub path_params: &'static [(&'static str, &'static str)],
    /// Field whose value is the raw HTTP body.
    pub payload_path: Option<&'static str>,
    pub members: &'static [Member],
}

impl ShapeDescriptor {
    pub const EMPTY: ShapeDescriptor = ShapeDescriptor {
        header_params: &[],
        query_params: &[],
        path_params: &[],
        payload_path: None,
        members: &[],
    };

    /// Finds a member by its label.
    pub fn member(&self, label: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.label == label)
    }

    /// The wire-name override of a member, falling back to its label.
    pub fn wire_name<'a>(&self, label: &'a str) -> &'a str {
        self.member(label)
            .and_then(|m| m.location.as_ref())
            .map(|l| l.name)
            .unwrap_or(label)
    }
}

/// Dynamic value bridging typed shapes and the wire codecs.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Null,
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Blob(Bytes),
    Timestamp(UtcTime),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
    Structure(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// The natural textual form, used for header, query and path
    /// projection. `Null` renders as the empty string.
    pub fn text_form(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Str(s) => s.clone(),
            FieldValue::Int(i) => i.to_string(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Blob(b) => b64_encode(b),
            FieldValue::Timestamp(t) => to_iso8601utc(*t),
            FieldValue::List(_) | FieldValue::Map(_) | FieldValue::Structure(_) => String::new(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_structure(&self) -> Option<&BTreeMap<String, FieldValue>> {
        match self {
            FieldValue::Structure(map) => Some(map),
            _ => None,
        }
    }

    pub fn into_structure(self) -> Option<BTreeMap<String, FieldValue>> {
        match self {
            FieldValue::Structure(map) => Some(map),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<Bytes> for FieldValue {
    fn from(v: Bytes) -> Self {
        FieldValue::Blob(v)
    }
}

/// A typed input or output value.
///
/// `read_field` is the generated accessor shim keyed by field name;
/// `to_value`/`from_value` give the codecs a full structural form.
pub trait Shape: Sized {
    fn descriptor() -> &'static ShapeDescriptor;

    /// Yields the current value of the named field, `None` when the shape
    /// has no such field.
    fn read_field(&self, field: &str) -> Option<FieldValue>;

    /// The whole value as a structure of field values.
    fn to_value(&self) -> FieldValue;

    /// Rebuilds the shape from a decoded structure.
    fn from_value(value: FieldValue) -> Result<Self, Error>;
}

/// The unit shape: no fields, no metadata. Used by the façade operations
/// without input or output.
impl Shape for () {
    fn descriptor() -> &'static ShapeDescriptor {
        &ShapeDescriptor::EMPTY
    }

    fn read_field(&self, _field: &str) -> Option<FieldValue> {
        None
    }

    fn to_value(&self) -> FieldValue {
        FieldValue::Structure(BTreeMap::new())
    }

    fn from_value(_value: FieldValue) -> Result<Self, Error> {
        Ok(())
    }
}
