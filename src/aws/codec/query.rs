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

//! Flat `name=value` codec for the query protocol and its ec2 variant.

use std::collections::BTreeMap;

use crate::aws::shape::FieldValue;
use crate::aws::utils::url_encode;

fn flatten_into(prefix: &str, value: &FieldValue, out: &mut BTreeMap<String, String>) {
    let key = |suffix: &str| {
        if prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{prefix}.{suffix}")
        }
    };

    match value {
        FieldValue::Structure(entries) => {
            for (name, value) in entries {
                if !value.is_null() {
                    flatten_into(&key(name), value, out);
                }
            }
        }
        FieldValue::Map(entries) => {
            for (i, (map_key, map_value)) in entries.iter().enumerate() {
                let n = i + 1;
                out.insert(key(&format!("entry.{n}.key")), map_key.clone());
                flatten_into(&key(&format!("entry.{n}.value")), map_value, out);
            }
        }
        FieldValue::List(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten_into(&key(&format!("member.{}", i + 1)), item, out);
            }
        }
        other => {
            out.insert(prefix.to_string(), other.text_form());
        }
    }
}

/// Flattens a structural value into the flat dictionary the query protocol
/// sends: nested members dotted, lists as `member.N`, maps as
/// `entry.N.key`/`entry.N.value`. Nil values become empty strings.
pub fn flatten(value: &FieldValue) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    flatten_into("", value, &mut out);
    out
}

/// Renders the dictionary as an `application/x-www-form-urlencoded` body in
/// sorted-key order.
pub fn to_form_body(dict: &BTreeMap<String, String>) -> String {
    let mut body = String::new();
    for (key, value) in dict {
        if !body.is_empty() {
            body.push('&');
        }
        body.push_str(&url_encode(key));
        body.push('=');
        body.push_str(&url_encode(value));
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structure(entries: Vec<(&str, FieldValue)>) -> FieldValue {
        FieldValue::Structure(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    #[test]
    fn test_flatten_scalars() {
        let input = structure(vec![
            ("UserName", FieldValue::Str("Bob".to_string())),
            ("MaxItems", FieldValue::Int(10)),
        ]);
        let dict = flatten(&input);
        assert_eq!(dict["UserName"], "Bob");
        assert_eq!(dict["MaxItems"], "10");
    }

    #[test]
    fn test_flatten_nested_and_list() {
        let input = structure(vec![
            (
                "Filter",
                structure(vec![("Name", FieldValue::Str("state".to_string()))]),
            ),
            (
                "Instances",
                FieldValue::List(vec![
                    FieldValue::Str("i-1".to_string()),
                    FieldValue::Str("i-2".to_string()),
                ]),
            ),
        ]);
        let dict = flatten(&input);
        assert_eq!(dict["Filter.Name"], "state");
        assert_eq!(dict["Instances.member.1"], "i-1");
        assert_eq!(dict["Instances.member.2"], "i-2");
    }

    #[test]
    fn test_nil_becomes_empty_string() {
        let input = structure(vec![("Marker", FieldValue::Null)]);
        // Null members are dropped at the structure level; an explicit null
        // leaf still renders as the empty string.
        assert!(flatten(&input).is_empty());

        let mut out = BTreeMap::new();
        super::flatten_into("Marker", &FieldValue::Null, &mut out);
        assert_eq!(out["Marker"], "");
    }

    #[test]
    fn test_form_body_is_sorted() {
        let mut dict = BTreeMap::new();
        dict.insert("Version".to_string(), "2010-05-08".to_string());
        dict.insert("Action".to_string(), "GetUser".to_string());
        dict.insert("UserName".to_string(), "Bob".to_string());
        assert_eq!(
            to_form_body(&dict),
            "Action=GetUser&UserName=Bob&Version=2010-05-08"
        );
    }
}
