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

//! JSON codec

use std::collections::BTreeMap;

use bytes::Bytes;
use serde_json::{Map, Number, Value};

use crate::aws::error::Error;
use crate::aws::shape::FieldValue;
use crate::aws::utils::{b64_encode, to_iso8601utc};

/// Converts a field value into its JSON form. Blobs serialize as base64
/// text, timestamps as ISO8601.
pub fn to_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Str(s) => Value::String(s.clone()),
        FieldValue::Int(i) => Value::Number(Number::from(*i)),
        FieldValue::Float(f) => Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        FieldValue::Bool(b) => Value::Bool(*b),
        FieldValue::Blob(b) => Value::String(b64_encode(b)),
        FieldValue::Timestamp(t) => Value::String(to_iso8601utc(*t)),
        FieldValue::List(items) => Value::Array(items.iter().map(to_json).collect()),
        FieldValue::Map(entries) | FieldValue::Structure(entries) => {
            let mut object = Map::new();
            for (key, value) in entries {
                if !value.is_null() {
                    object.insert(key.clone(), to_json(value));
                }
            }
            Value::Object(object)
        }
    }
}

/// Converts JSON into the dynamic field-value form. Integral numbers become
/// `Int`, objects become `Structure`; the response binder narrows strings
/// into timestamps or blobs where the output's members say so.
pub fn from_json(value: Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Null,
        Value::Bool(b) => FieldValue::Bool(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                FieldValue::Int(i)
            } else {
                FieldValue::Float(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => FieldValue::Str(s),
        Value::Array(items) => FieldValue::List(items.into_iter().map(from_json).collect()),
        Value::Object(object) => {
            let mut entries = BTreeMap::new();
            for (key, value) in object {
                entries.insert(key, from_json(value));
            }
            FieldValue::Structure(entries)
        }
    }
}

/// Serializes a structural value to JSON bytes.
pub fn encode(value: &FieldValue) -> Result<Bytes, Error> {
    Ok(Bytes::from(serde_json::to_vec(&to_json(value))?))
}

/// Parses JSON bytes into the dynamic form.
pub fn decode(body: &[u8]) -> Result<FieldValue, Error> {
    Ok(from_json(serde_json::from_slice(body)?))
}
