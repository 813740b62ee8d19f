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

//! End-to-end exchanges against a local single-shot HTTP server.

use std::collections::BTreeMap;

use http::Method;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use awsio::aws::client::{Client, ClientBuilder, ServiceConfig};
use awsio::aws::endpoint::EndpointConfig;
use awsio::aws::error::Error;
use awsio::aws::protocol::ServiceProtocol;
use awsio::aws::region::Region;
use awsio::aws::shape::{FieldValue, Member, MemberKind, Shape, ShapeDescriptor};

#[derive(Clone, Debug, Default)]
struct GetUserInput {
    user_name: Option<String>,
}

static GET_USER_INPUT_DESCRIPTOR: ShapeDescriptor = ShapeDescriptor {
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
        &GET_USER_INPUT_DESCRIPTOR
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

    fn from_value(_value: FieldValue) -> Result<Self, Error> {
        Ok(Self::default())
    }
}

#[derive(Clone, Debug, Default)]
struct GetUserOutput {
    user_name: Option<String>,
    user_id: Option<String>,
}

static GET_USER_OUTPUT_DESCRIPTOR: ShapeDescriptor = ShapeDescriptor {
    header_params: &[],
    query_params: &[],
    path_params: &[],
    payload_path: None,
    members: &[
        Member {
            label: "UserName",
            location: None,
            kind: MemberKind::Scalar,
        },
        Member {
            label: "UserId",
            location: None,
            kind: MemberKind::Scalar,
        },
    ],
};

impl Shape for GetUserOutput {
    fn descriptor() -> &'static ShapeDescriptor {
        &GET_USER_OUTPUT_DESCRIPTOR
    }

    fn read_field(&self, _field: &str) -> Option<FieldValue> {
        None
    }

    fn to_value(&self) -> FieldValue {
        FieldValue::Structure(BTreeMap::new())
    }

    fn from_value(value: FieldValue) -> Result<Self, Error> {
        let entries = match value {
            FieldValue::Structure(entries) => entries,
            _ => return Err(Error::DecodeError("expected structure".into())),
        };
        // The User element nests the scalar fields.
        let user = match entries.get("User") {
            Some(FieldValue::Structure(user)) => user.clone(),
            _ => entries,
        };
        Ok(Self {
            user_name: user
                .get("UserName")
                .and_then(|v| v.as_str())
                .map(String::from),
            user_id: user.get("UserId").and_then(|v| v.as_str()).map(String::from),
        })
    }
}

/// Serves exactly one canned response on an ephemeral port, returning the
/// captured request bytes through the join handle.
async fn one_shot_server(response: &'static str) -> (u16, tokio::task::JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut captured = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            captured.extend_from_slice(&buf[..n]);
            if request_complete(&captured) || n == 0 {
                break;
            }
        }
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        captured
    });

    (port, handle)
}

fn request_complete(raw: &[u8]) -> bool {
    let Some(head_end) = raw.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };
    let head = String::from_utf8_lossy(&raw[..head_end]);
    let content_length: usize = head
        .lines()
        .find_map(|l| {
            let (k, v) = l.split_once(':')?;
            k.trim()
                .eq_ignore_ascii_case("content-length")
                .then(|| v.trim().parse().ok())?
        })
        .unwrap_or(0);
    raw.len() >= head_end + 4 + content_length
}

fn client_for_port(port: u16) -> Client {
    ClientBuilder::new(ServiceConfig {
        service: "iam".to_string(),
        api_version: "2010-05-08".to_string(),
        protocol: ServiceProtocol::Query,
        amz_target_prefix: None,
        endpoint: EndpointConfig {
            endpoint: Some(format!("http://127.0.0.1:{port}")),
            ..Default::default()
        },
    })
    .region(Region::UsEast1)
    .credentials("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY", None)
    .build()
    .unwrap()
}

#[tokio::test]
async fn round_trip_decodes_typed_output() {
    let (port, server) = one_shot_server(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: text/xml\r\n\
         Content-Length: 172\r\n\
         Connection: close\r\n\
         \r\n\
         <GetUserResponse><User><UserName>Bob</UserName><UserId>AIDACKCEVSQ6C2EXAMPLE</UserId></User><ResponseMetadata><RequestId>r1</RequestId></ResponseMetadata></GetUserResponse>",
    )
    .await;

    let client = client_for_port(port);
    let input = GetUserInput {
        user_name: Some("Bob".to_string()),
    };
    let output: GetUserOutput = client
        .round_trip("GetUser", "/", Method::POST, &input)
        .await
        .unwrap();

    assert_eq!(output.user_name.as_deref(), Some("Bob"));
    assert_eq!(output.user_id.as_deref(), Some("AIDACKCEVSQ6C2EXAMPLE"));

    let captured = String::from_utf8(server.await.unwrap()).unwrap();
    assert!(captured.starts_with("POST / HTTP/1.1\r\n"));
    assert!(captured.contains("Authorization: AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"));
    assert!(captured.contains("Connection: close\r\n"));
    assert!(captured.ends_with("Action=GetUser&UserName=Bob&Version=2010-05-08"));
}

#[tokio::test]
async fn error_responses_classify_by_code() {
    let (port, server) = one_shot_server(
        "HTTP/1.1 403 Forbidden\r\n\
         Content-Type: text/xml\r\n\
         Content-Length: 126\r\n\
         Connection: close\r\n\
         \r\n\
         <ErrorResponse><Error><Code>AccessDenied</Code><Message>not for you</Message></Error><RequestId>r2</RequestId></ErrorResponse>",
    )
    .await;

    let client = client_for_port(port);
    let result = client.call("DeleteUser", "/", Method::POST).await;

    let Err(Error::AwsClient {
        code,
        message,
        status_code,
    }) = result
    else {
        panic!("expected a classified client error");
    };
    assert_eq!(code, "AccessDenied");
    assert_eq!(message, "not for you");
    assert_eq!(status_code, 403);

    server.await.unwrap();
}

#[tokio::test]
async fn blocking_facade_wraps_the_async_form() {
    let (port, server) = one_shot_server(
        "HTTP/1.1 200 OK\r\n\
         Content-Length: 0\r\n\
         Connection: close\r\n\
         \r\n",
    )
    .await;

    let client = client_for_port(port);
    // The blocking form spins its own runtime; hand it to a thread that is
    // not already inside one.
    tokio::task::spawn_blocking(move || client.call_blocking("Ping", "/", Method::POST))
        .await
        .unwrap()
        .unwrap();

    server.await.unwrap();
}
