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

//! Minimal HTTP/1.1 client: one request, one buffered response, one
//! connection. Pooling, retries and request timeouts are the caller's
//! concern.

use std::time::Duration;

use bytes::Bytes;
use http::Method;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::aws::error::Error;
use crate::aws::header_constants::{
    ACCEPT, CONNECTION, CONTENT_LENGTH, HOST, USER_AGENT,
};
use crate::aws::http::Url;
use crate::aws::multimap_ext::{Multimap, MultimapExt};

/// Fixed TCP connect timeout. There is no overall request timeout; callers
/// layer cancellation by dropping the future.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A fully formed request as handed to the transport.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Multimap,
    pub body: Bytes,
}

/// Status, headers and the fully buffered body.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status_code: u16,
    pub headers: Multimap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Parsed status line and header block.
#[derive(Clone, Debug)]
pub struct ResponseHead {
    pub status_code: u16,
    pub headers: Multimap,
}

enum ReaderState {
    Ready,
    ParsingBody { head: ResponseHead, body: Vec<u8> },
}

/// Accumulates one response: `Ready -> ParsingBody -> Ready`. Events out of
/// order surface as malformed-head or malformed-body errors.
struct ResponseReader {
    state: ReaderState,
}

impl ResponseReader {
    fn new() -> Self {
        Self {
            state: ReaderState::Ready,
        }
    }

    fn on_head(&mut self, head: ResponseHead) -> Result<(), Error> {
        match self.state {
            ReaderState::Ready => {
                self.state = ReaderState::ParsingBody {
                    head,
                    body: Vec::new(),
                };
                Ok(())
            }
            ReaderState::ParsingBody { .. } => Err(Error::MalformedHead),
        }
    }

    fn on_body(&mut self, chunk: &[u8]) -> Result<(), Error> {
        match &mut self.state {
            ReaderState::Ready => Err(Error::MalformedBody),
            ReaderState::ParsingBody { body, .. } => {
                body.extend_from_slice(chunk);
                Ok(())
            }
        }
    }

    fn on_end(&mut self) -> Result<HttpResponse, Error> {
        match std::mem::replace(&mut self.state, ReaderState::Ready) {
            ReaderState::Ready => Err(Error::MalformedHead),
            ReaderState::ParsingBody { head, body } => Ok(HttpResponse {
                status_code: head.status_code,
                headers: head.headers,
                body: Bytes::from(body),
            }),
        }
    }
}

fn find_head_end(data: &[u8]) -> Option<usize> {
    data.windows(4).position(|w| w == b"\r\n\r\n")
}

fn parse_head(data: &[u8]) -> Result<ResponseHead, Error> {
    let text = std::str::from_utf8(data).map_err(|_| Error::MalformedHead)?;
    let mut lines = text.split("\r\n");

    let status_line = lines.next().ok_or(Error::MalformedHead)?;
    let mut parts = status_line.splitn(3, ' ');
    let version = parts.next().ok_or(Error::MalformedHead)?;
    if !version.starts_with("HTTP/1.") {
        return Err(Error::MalformedHead);
    }
    let status_code: u16 = parts
        .next()
        .ok_or(Error::MalformedHead)?
        .parse()
        .map_err(|_| Error::MalformedHead)?;

    let mut headers = Multimap::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let (key, value) = line.split_once(':').ok_or(Error::MalformedHead)?;
        headers.add(key.trim(), value.trim());
    }

    Ok(ResponseHead {
        status_code,
        headers,
    })
}

fn dechunk(mut data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    loop {
        let line_end = data
            .windows(2)
            .position(|w| w == b"\r\n")
            .ok_or(Error::MalformedBody)?;
        let size_line =
            std::str::from_utf8(&data[..line_end]).map_err(|_| Error::MalformedBody)?;
        let size_hex = size_line.split(';').next().unwrap_or(size_line).trim();
        let size = usize::from_str_radix(size_hex, 16).map_err(|_| Error::MalformedBody)?;
        data = &data[line_end + 2..];

        if size == 0 {
            return Ok(out);
        }
        if data.len() < size + 2 {
            return Err(Error::MalformedBody);
        }
        out.extend_from_slice(&data[..size]);
        if &data[size..size + 2] != b"\r\n" {
            return Err(Error::MalformedBody);
        }
        data = &data[size + 2..];
    }
}

/// Feeds the raw connection bytes through the reader state machine.
fn parse_response(raw: &[u8]) -> Result<HttpResponse, Error> {
    let mut reader = ResponseReader::new();

    let head_end = find_head_end(raw).ok_or(Error::MalformedHead)?;
    let head = parse_head(&raw[..head_end])?;

    let content_length: Option<usize> = head
        .headers
        .get_ci(CONTENT_LENGTH)
        .and_then(|v| v.parse().ok());
    let chunked = head
        .headers
        .get_ci("Transfer-Encoding")
        .map(|v| v.eq_ignore_ascii_case("chunked"))
        .unwrap_or(false);

    reader.on_head(head)?;

    let body = &raw[head_end + 4..];
    if chunked {
        let body = dechunk(body)?;
        reader.on_body(&body)?;
    } else if let Some(length) = content_length {
        if body.len() < length {
            return Err(Error::MalformedBody);
        }
        reader.on_body(&body[..length])?;
        // A second head on a connection we asked to close is a protocol
        // violation.
        let tail = &body[length..];
        if let Some(end) = find_head_end(tail) {
            if let Ok(second) = parse_head(&tail[..end]) {
                reader.on_head(second)?;
            }
        }
    } else {
        reader.on_body(body)?;
    }

    reader.on_end()
}

async fn exchange<S>(stream: &mut S, payload: &[u8]) -> Result<Vec<u8>, Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(payload).await?;
    stream.flush().await?;

    let mut raw = Vec::new();
    match stream.read_to_end(&mut raw).await {
        Ok(_) => {}
        // Servers that close without a TLS close_notify still sent a
        // complete message; the parser decides.
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof && !raw.is_empty() => {}
        Err(e) => return Err(e.into()),
    }
    Ok(raw)
}

/// The HTTP send primitive the signer feeds.
#[derive(Clone, Debug, Default)]
pub struct Transport {
    user_agent: Option<String>,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    fn default_user_agent() -> String {
        format!(
            "awsio ({}; {}) awsio/{}",
            std::env::consts::OS,
            std::env::consts::ARCH,
            env!("CARGO_PKG_VERSION")
        )
    }

    fn serialize(&self, req: &HttpRequest) -> Vec<u8> {
        let mut headers = req.headers.clone();
        if !headers.contains_key_ci(HOST) {
            headers.add(HOST, req.url.host_header_value());
        }
        if !headers.contains_key_ci(USER_AGENT) {
            headers.add(
                USER_AGENT,
                self.user_agent
                    .clone()
                    .unwrap_or_else(Self::default_user_agent),
            );
        }
        if !headers.contains_key_ci(ACCEPT) {
            headers.add(ACCEPT, "*/*");
        }
        headers.remove_ci(CONTENT_LENGTH);
        headers.add(CONTENT_LENGTH, req.body.len().to_string());
        headers.remove_ci(CONNECTION);
        headers.add(CONNECTION, "close");

        let mut out = Vec::with_capacity(256 + req.body.len());
        out.extend_from_slice(
            format!("{} {} HTTP/1.1\r\n", req.method, req.url.request_target()).as_bytes(),
        );
        for (key, values) in headers.iter_all() {
            for value in values {
                out.extend_from_slice(format!("{key}: {value}\r\n").as_bytes());
            }
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&req.body);
        out
    }

    /// Sends the request and buffers the complete response. TLS is chosen by
    /// the URL scheme; the connect phase is bounded by [`CONNECT_TIMEOUT`].
    pub async fn send(&self, req: &HttpRequest) -> Result<HttpResponse, Error> {
        let host = req.url.host.clone();
        let addr = format!("{}:{}", host, req.url.effective_port());
        let payload = self.serialize(req);

        let tcp = timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr))
            .await
            .map_err(|_| Error::ConnectTimeout)??;

        let raw = if req.url.https {
            let connector = tokio_native_tls::TlsConnector::from(
                native_tls::TlsConnector::new()?,
            );
            let mut stream = connector.connect(&host, tcp).await?;
            exchange(&mut stream, &payload).await?
        } else {
            let mut stream = tcp;
            exchange(&mut stream, &payload).await?
        };

        parse_response(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head(status_code: u16) -> ResponseHead {
        ResponseHead {
            status_code,
            headers: Multimap::new(),
        }
    }

    #[test]
    fn test_reader_happy_path() {
        let mut reader = ResponseReader::new();
        reader.on_head(head(200)).unwrap();
        reader.on_body(b"hel").unwrap();
        reader.on_body(b"lo").unwrap();
        let resp = reader.on_end().unwrap();
        assert_eq!(resp.status_code, 200);
        assert_eq!(&resp.body[..], b"hello");

        // Back in Ready: a new exchange can start.
        reader.on_head(head(204)).unwrap();
        assert_eq!(reader.on_end().unwrap().status_code, 204);
    }

    #[test]
    fn test_reader_second_head_is_malformed() {
        let mut reader = ResponseReader::new();
        reader.on_head(head(200)).unwrap();
        assert!(matches!(reader.on_head(head(200)), Err(Error::MalformedHead)));
    }

    #[test]
    fn test_reader_body_without_head_is_malformed() {
        let mut reader = ResponseReader::new();
        assert!(matches!(reader.on_body(b"x"), Err(Error::MalformedBody)));
    }

    #[test]
    fn test_reader_end_without_head_is_malformed() {
        let mut reader = ResponseReader::new();
        assert!(matches!(reader.on_end(), Err(Error::MalformedHead)));
    }

    #[test]
    fn test_parse_response_content_length() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nContent-Type: text/plain\r\n\r\nhello";
        let resp = parse_response(raw).unwrap();
        assert_eq!(resp.status_code, 200);
        assert_eq!(resp.headers.get_ci("content-type"), Some("text/plain"));
        assert_eq!(&resp.body[..], b"hello");
    }

    #[test]
    fn test_parse_response_to_connection_close() {
        let raw = b"HTTP/1.1 404 Not Found\r\nServer: test\r\n\r\nnot here";
        let resp = parse_response(raw).unwrap();
        assert_eq!(resp.status_code, 404);
        assert_eq!(&resp.body[..], b"not here");
    }

    #[test]
    fn test_parse_response_chunked() {
        let raw =
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n";
        let resp = parse_response(raw).unwrap();
        assert_eq!(&resp.body[..], b"hello world");
    }

    #[test]
    fn test_parse_response_truncated_body() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nshort";
        assert!(matches!(parse_response(raw), Err(Error::MalformedBody)));
    }

    #[test]
    fn test_parse_response_garbage_head() {
        assert!(matches!(
            parse_response(b"BOGUS\r\n\r\n"),
            Err(Error::MalformedHead)
        ));
    }

    #[test]
    fn test_serialize_sets_required_headers() {
        let transport = Transport::new();
        let req = HttpRequest {
            method: Method::POST,
            url: "https://sqs.us-east-1.amazonaws.com/".parse().unwrap(),
            headers: Multimap::new(),
            body: Bytes::from_static(b"Action=Ping"),
        };
        let raw = transport.serialize(&req);
        let text = String::from_utf8(raw).unwrap();
        assert!(text.starts_with("POST / HTTP/1.1\r\n"));
        assert!(text.contains("Host: sqs.us-east-1.amazonaws.com\r\n"));
        assert!(text.contains("Content-Length: 11\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert!(text.contains("Accept: */*\r\n"));
        assert!(text.contains("User-Agent: awsio"));
        assert!(text.ends_with("\r\n\r\nAction=Ping"));
    }
}
