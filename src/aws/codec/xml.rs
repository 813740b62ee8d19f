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

//! XML codec

use std::collections::BTreeMap;

use bytes::Bytes;
use xmltree::{Element, XMLNode};

use crate::aws::error::Error;
use crate::aws::shape::FieldValue;

fn text_node(value: &FieldValue) -> XMLNode {
    XMLNode::Text(value.text_form())
}

fn push_child(parent: &mut Element, name: &str, value: &FieldValue) {
    match value {
        FieldValue::Null => {}
        // Lists serialize as repeated elements carrying the member's name.
        FieldValue::List(items) => {
            for item in items {
                push_child(parent, name, item);
            }
        }
        _ => {
            parent
                .children
                .push(XMLNode::Element(to_element(name, value)));
        }
    }
}

/// Serializes a field value under the given element name.
pub fn to_element(name: &str, value: &FieldValue) -> Element {
    let mut element = Element::new(name);
    match value {
        FieldValue::Map(entries) | FieldValue::Structure(entries) => {
            for (key, value) in entries {
                push_child(&mut element, key, value);
            }
        }
        FieldValue::List(items) => {
            for item in items {
                push_child(&mut element, "member", item);
            }
        }
        FieldValue::Null => {}
        other => element.children.push(text_node(other)),
    }
    element
}

/// Reflects an element back into the dynamic form: leaves become strings,
/// children group into a structure, repeated names into lists.
pub fn element_to_value(element: &Element) -> FieldValue {
    let children: Vec<&Element> = element
        .children
        .iter()
        .filter_map(|n| n.as_element())
        .collect();

    if children.is_empty() {
        return FieldValue::Str(
            element
                .get_text()
                .map(|t| t.to_string())
                .unwrap_or_default(),
        );
    }

    let mut entries: BTreeMap<String, Vec<FieldValue>> = BTreeMap::new();
    for child in children {
        entries
            .entry(child.name.clone())
            .or_default()
            .push(element_to_value(child));
    }

    let mut structure = BTreeMap::new();
    for (name, mut values) in entries {
        let value = if values.len() == 1 {
            values.remove(0)
        } else {
            FieldValue::List(values)
        };
        structure.insert(name, value);
    }
    FieldValue::Structure(structure)
}

/// Writes an element as XML bytes.
pub fn encode(element: &Element) -> Result<Bytes, Error> {
    let mut out = Vec::new();
    element.write(&mut out)?;
    Ok(Bytes::from(out))
}

/// Parses XML bytes.
pub fn decode(body: &[u8]) -> Result<Element, Error> {
    Ok(Element::parse(body)?)
}
