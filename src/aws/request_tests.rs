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

//! Tests for the protocol-dispatched request builder, using hand-written
//! stand-ins for generated shapes.

use std::collections::BTreeMap;

use bytes::Bytes;
use http::Method;

use super::error::Error;
use super::http::Url;
use super::multimap_ext::MultimapExt;
use super::protocol::ServiceProtocol;
use super::region::Region;
use super::request::{build_request, Body, BuildContext};
use super::shape::{
    FieldValue, Location, LocationKind, Member, MemberKind, Shape, ShapeDescriptor,
};

fn context<'a>(protocol: &'a ServiceProtocol, base: &'a Url) -> BuildContext<'a> {
    BuildContext {
        service: "testsvc",
        api_version: "2010-05-08",
        protocol,
        target_prefix: Some("TestSvc_20100508"),
        region: Region::UsEast1,
        base,
    }
}

fn base_url() -> Url {
    "https://testsvc.us-east-1.amazonaws.com".parse().unwrap()
}

// --- GetUser: a plain query-protocol input --------------------------------

#[derive(Clone, Debug, Default)]
struct GetUserInput {
    user_name: Option<String>,
}

static GET_USER_DESCRIPTOR: ShapeDescriptor = ShapeDescriptor {
    header_params: &[],
    query_params: &[],
    path_params: &[],
    payload_path: None,
    members: &[Member {
        label: "UserName",
        location: None,
        kind: MemberKind::Scalar,
    }],
};

impl Shape for GetUserInput {
    fn descriptor() -> &'static ShapeDescriptor {
        &GET_USER_DESCRIPTOR
    }

    fn read_field(&self, field: &str) -> Option<FieldValue> {
        match field {
            "UserName" => self.user_name.clone().map(FieldValue::from),
            _ => None,
        }
    }

    fn to_value(&self) -> FieldValue {
        let mut entries = BTreeMap::new();
        if let Some(user_name) = &self.user_name {
            entries.insert("UserName".to_string(), FieldValue::from(user_name.clone()));
        }
        FieldValue::Structure(entries)
    }

    fn from_value(value: FieldValue) -> Result<Self, Error> {
        let entries = value
            .into_structure()
            .ok_or_else(|| Error::DecodeError("expected structure".into()))?;
        Ok(Self {
            user_name: entries
                .get("UserName")
                .and_then(|v| v.as_str())
                .map(String::from),
        })
    }
}

// --- PutObject: payload path, header and uri members ----------------------

#[derive(Clone, Debug, Default)]
struct PutObjectInput {
    bucket: Option<String>,
    key: Option<String>,
    body: Option<Bytes>,
    content_type: Option<String>,
}

static PUT_OBJECT_DESCRIPTOR: ShapeDescriptor = ShapeDescriptor {
    header_params: &[("Content-Type", "ContentType"), ("Body", "Body")],
    query_params: &[],
    path_params: &[("Bucket", "Bucket"), ("Key", "Key")],
    payload_path: Some("Body"),
    members: &[
        Member {
            label: "Bucket",
            location: Some(Location {
                name: "Bucket",
                kind: LocationKind::Uri,
            }),
            kind: MemberKind::Scalar,
        },
        Member {
            label: "Key",
            location: Some(Location {
                name: "Key",
                kind: LocationKind::Uri,
            }),
            kind: MemberKind::Scalar,
        },
        Member {
            label: "Body",
            location: Some(Location {
                name: "Body",
                kind: LocationKind::Body,
            }),
            kind: MemberKind::Blob,
        },
        Member {
            label: "ContentType",
            location: Some(Location {
                name: "Content-Type",
                kind: LocationKind::Header,
            }),
            kind: MemberKind::Scalar,
        },
    ],
};

impl Shape for PutObjectInput {
    fn descriptor() -> &'static ShapeDescriptor {
        &PUT_OBJECT_DESCRIPTOR
    }

    fn read_field(&self, field: &str) -> Option<FieldValue> {
        match field {
            "Bucket" => self.bucket.clone().map(FieldValue::from),
            "Key" => self.key.clone().map(FieldValue::from),
            "Body" => self.body.clone().map(FieldValue::from),
            "ContentType" => self.content_type.clone().map(FieldValue::from),
            _ => None,
        }
    }

    fn to_value(&self) -> FieldValue {
        let mut entries = BTreeMap::new();
        if let Some(bucket) = &self.bucket {
            entries.insert("Bucket".to_string(), FieldValue::from(bucket.clone()));
        }
        if let Some(key) = &self.key {
            entries.insert("Key".to_string(), FieldValue::from(key.clone()));
        }
        if let Some(body) = &self.body {
            entries.insert("Body".to_string(), FieldValue::from(body.clone()));
        }
        if let Some(content_type) = &self.content_type {
            entries.insert(
                "ContentType".to_string(),
                FieldValue::from(content_type.clone()),
            );
        }
        FieldValue::Structure(entries)
    }

    fn from_value(_value: FieldValue) -> Result<Self, Error> {
        Ok(Self::default())
    }
}

// --- CreateRule: restxml structure payload --------------------------------

#[derive(Clone, Debug, Default)]
struct CreateRuleInput {
    rule: Option<BTreeMap<String, FieldValue>>,
}

static CREATE_RULE_DESCRIPTOR: ShapeDescriptor = ShapeDescriptor {
    header_params: &[],
    query_params: &[],
    path_params: &[],
    payload_path: Some("Rule"),
    members: &[Member {
        label: "Rule",
        location: Some(Location {
            name: "LifecycleRule",
            kind: LocationKind::Body,
        }),
        kind: MemberKind::Structure,
    }],
};

impl Shape for CreateRuleInput {
    fn descriptor() -> &'static ShapeDescriptor {
        &CREATE_RULE_DESCRIPTOR
    }

    fn read_field(&self, field: &str) -> Option<FieldValue> {
        match field {
            "Rule" => self.rule.clone().map(FieldValue::Structure),
            _ => None,
        }
    }

    fn to_value(&self) -> FieldValue {
        let mut entries = BTreeMap::new();
        if let Some(rule) = &self.rule {
            entries.insert("Rule".to_string(), FieldValue::Structure(rule.clone()));
        }
        FieldValue::Structure(entries)
    }

    fn from_value(_value: FieldValue) -> Result<Self, Error> {
        Ok(Self::default())
    }
}

// --------------------------------------------------------------------------

#[test]
fn test_query_protocol_get_merges_sorted_query_string() {
    let base = base_url();
    let protocol = ServiceProtocol::Query;
    let input = GetUserInput {
        user_name: Some("Bob".to_string()),
    };

    let request = build_request(
        &context(&protocol, &base),
        "GetUser",
        "/",
        Method::GET,
        Some(&input),
    )
    .unwrap();

    assert_eq!(
        request.url.query_string(),
        "Action=GetUser&UserName=Bob&Version=2010-05-08"
    );
    assert!(request.body.is_empty());
}

#[test]
fn test_query_protocol_post_builds_sorted_form_body() {
    let base = base_url();
    let protocol = ServiceProtocol::Query;
    let input = GetUserInput {
        user_name: Some("Bob".to_string()),
    };

    let request = build_request(
        &context(&protocol, &base),
        "GetUser",
        "/",
        Method::POST,
        Some(&input),
    )
    .unwrap();

    let Body::Text(form) = &request.body else {
        panic!("expected a form body, got {:?}", request.body);
    };
    assert_eq!(form, "Action=GetUser&UserName=Bob&Version=2010-05-08");
    assert_eq!(
        request.headers.get_ci("content-type"),
        Some("application/x-www-form-urlencoded")
    );
    assert!(request.url.query.is_empty());
}

#[test]
fn test_ec2_protocol_always_builds_form_body() {
    let base = base_url();
    let protocol = ServiceProtocol::Other("ec2".to_string());
    let input = GetUserInput {
        user_name: Some("Bob".to_string()),
    };

    let request = build_request(
        &context(&protocol, &base),
        "GetUser",
        "/",
        Method::GET,
        Some(&input),
    )
    .unwrap();

    let Body::Text(form) = &request.body else {
        panic!("expected a form body even on GET");
    };
    assert_eq!(form, "Action=GetUser&UserName=Bob&Version=2010-05-08");
    assert!(request.url.query.is_empty());
}

#[test]
fn test_unknown_protocol_leaves_body_empty() {
    let base = base_url();
    let protocol = ServiceProtocol::Other("mqtt".to_string());
    let input = GetUserInput {
        user_name: Some("Bob".to_string()),
    };

    let request = build_request(
        &context(&protocol, &base),
        "GetUser",
        "/",
        Method::POST,
        Some(&input),
    )
    .unwrap();
    assert!(request.body.is_empty());
}

#[test]
fn test_restjson_payload_blob_passes_raw_bytes() {
    let base = base_url();
    let protocol = ServiceProtocol::RestJson;
    let input = PutObjectInput {
        bucket: Some("bk".to_string()),
        key: Some("obj".to_string()),
        body: Some(Bytes::from_static(&[0x01, 0x02])),
        content_type: Some("application/octet-stream".to_string()),
    };

    let request = build_request(
        &context(&protocol, &base),
        "PutObject",
        "/{Bucket}/{Key+}",
        Method::PUT,
        Some(&input),
    )
    .unwrap();

    let Body::Buffer(bytes) = &request.body else {
        panic!("expected a raw buffer body");
    };
    assert_eq!(&bytes[..], &[0x01, 0x02]);
    // The payload field is the body, not a header.
    assert!(!request.headers.contains_key_ci("Body"));
    assert_eq!(
        request.headers.get_ci("content-type"),
        Some("application/octet-stream")
    );
}

#[test]
fn test_path_template_substitution() {
    let base = base_url();
    let protocol = ServiceProtocol::RestJson;
    let input = PutObjectInput {
        bucket: Some("bk".to_string()),
        key: Some("dir one/file two.txt".to_string()),
        body: Some(Bytes::from_static(b"x")),
        content_type: None,
    };

    let request = build_request(
        &context(&protocol, &base),
        "PutObject",
        "/{Bucket}/{Key+}",
        Method::PUT,
        Some(&input),
    )
    .unwrap();

    // {name} is verbatim; {name+} applies path encoding with separators kept.
    assert_eq!(request.url.path, "/bk/dir%20one/file%20two.txt");
}

#[test]
fn test_path_template_missing_value_fails() {
    let base = base_url();
    let protocol = ServiceProtocol::RestJson;
    let input = PutObjectInput {
        bucket: None,
        ..Default::default()
    };

    let result = build_request(
        &context(&protocol, &base),
        "PutObject",
        "/{Bucket}/{Key+}",
        Method::PUT,
        Some(&input),
    );
    assert!(matches!(result, Err(Error::InvalidUrl(_))));
}

#[test]
fn test_template_query_items_follow_sorted_dictionary_items() {
    let base = base_url();
    let protocol = ServiceProtocol::Query;
    let input = GetUserInput {
        user_name: Some("Bob".to_string()),
    };

    let request = build_request(
        &context(&protocol, &base),
        "GetUser",
        "/?list-type=2&fetch-owner=true",
        Method::GET,
        Some(&input),
    )
    .unwrap();

    // Dictionary-derived items sorted first, template items after, in their
    // given order.
    assert_eq!(
        request.url.query_string(),
        "Action=GetUser&UserName=Bob&Version=2010-05-08&list-type=2&fetch-owner=true"
    );
}

#[test]
fn test_json_protocol_sets_target_and_content_type() {
    let base = base_url();
    let protocol = ServiceProtocol::Json {
        version: "1.1".to_string(),
    };
    let input = GetUserInput {
        user_name: Some("Bob".to_string()),
    };

    let request = build_request(
        &context(&protocol, &base),
        "GetUser",
        "/",
        Method::POST,
        Some(&input),
    )
    .unwrap();

    assert_eq!(
        request.headers.get_ci("x-amz-target"),
        Some("TestSvc_20100508.GetUser")
    );
    assert_eq!(
        request.headers.get_ci("content-type"),
        Some("application/x-amz-json-1.1")
    );
    assert_eq!(
        request.amz_target.as_deref(),
        Some("TestSvc_20100508.GetUser")
    );
    let Body::Json(bytes) = &request.body else {
        panic!("expected a JSON body");
    };
    assert_eq!(&bytes[..], br#"{"UserName":"Bob"}"#);
}

#[test]
fn test_restxml_structure_payload_uses_location_name() {
    let base = base_url();
    let protocol = ServiceProtocol::RestXml;
    let mut rule = BTreeMap::new();
    rule.insert("Status".to_string(), FieldValue::from("Enabled"));
    let input = CreateRuleInput { rule: Some(rule) };

    let request = build_request(
        &context(&protocol, &base),
        "CreateRule",
        "/rules",
        Method::PUT,
        Some(&input),
    )
    .unwrap();

    let Body::Xml(element) = &request.body else {
        panic!("expected an XML body");
    };
    assert_eq!(element.name, "LifecycleRule");
    assert_eq!(
        element.get_child("Status").unwrap().get_text().unwrap(),
        "Enabled"
    );
}

#[test]
fn test_restxml_missing_payload_element_fails() {
    let base = base_url();
    let protocol = ServiceProtocol::RestXml;
    let input = CreateRuleInput { rule: None };

    let result = build_request(
        &context(&protocol, &base),
        "CreateRule",
        "/rules",
        Method::PUT,
        Some(&input),
    );
    assert!(matches!(result, Err(Error::MissingParameter(_))));
}

#[test]
fn test_built_url_is_absolute() {
    let base = base_url();
    let protocol = ServiceProtocol::Query;

    let request = build_request::<()>(
        &context(&protocol, &base),
        "ListUsers",
        "/",
        Method::GET,
        None,
    )
    .unwrap();

    let rendered = request.url.to_string();
    assert!(rendered.starts_with("https://testsvc.us-east-1.amazonaws.com/"));
}
