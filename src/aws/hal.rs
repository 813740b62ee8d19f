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

//! Hypertext Application Language (`hal+json`) documents: `_links`,
//! `_embedded`, and everything else as properties.

use serde_json::{Map, Value};

/// Whether a Content-Type denotes a HAL document.
pub fn is_hal(content_type: &str) -> bool {
    content_type.contains("hal+json")
}

/// Camel-cases a link relation: `file-format` becomes `fileFormat`.
pub fn camel_case(rel: &str) -> String {
    let mut out = String::with_capacity(rel.len());
    let mut upper_next = false;
    for c in rel.chars() {
        if c == '-' || c == '_' || c == ' ' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// One parsed HAL representation.
#[derive(Clone, Debug, Default)]
pub struct HalDocument {
    /// The representation's own fields, `_links` and `_embedded` removed.
    pub properties: Map<String, Value>,
    /// Embedded representations per relation; single objects normalize to a
    /// one-element list.
    pub embedded: Vec<(String, Vec<Value>)>,
}

/// Splits a JSON object into a HAL document. Non-objects yield an empty
/// document.
pub fn parse(value: &Value) -> HalDocument {
    let Some(object) = value.as_object() else {
        return HalDocument::default();
    };

    let mut properties = Map::new();
    for (key, value) in object {
        if key != "_links" && key != "_embedded" {
            properties.insert(key.clone(), value.clone());
        }
    }

    let mut embedded = Vec::new();
    if let Some(relations) = object.get("_embedded").and_then(|e| e.as_object()) {
        for (rel, representation) in relations {
            let list = match representation {
                Value::Array(items) => items.clone(),
                single => vec![single.clone()],
            };
            embedded.push((rel.clone(), list));
        }
    }

    HalDocument {
        properties,
        embedded,
    }
}

/// The internal links of one representation: `(relation, href)` pairs from
/// `_links`, skipping `self` and anything cross-origin (absolute hrefs are
/// unsupported).
pub fn internal_links(representation: &Value) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let Some(links) = representation
        .as_object()
        .and_then(|o| o.get("_links"))
        .and_then(|l| l.as_object())
    else {
        return out;
    };
    for (rel, link) in links {
        if rel == "self" {
            continue;
        }
        if let Some(href) = link.get("href").and_then(|h| h.as_str()) {
            if href.starts_with('/') {
                out.push((rel.clone(), href.to_string()));
            }
        }
    }
    out
}
