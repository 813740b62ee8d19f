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

use std::fmt;
use std::str::FromStr;

use http::Uri;

use crate::aws::error::Error;
use crate::aws::utils::{match_hostname, url_decode, url_encode};

/// Represents an absolute HTTP URL with an ordered query-item list.
///
/// Dictionary-derived query items are inserted in sorted key order;
/// template-supplied items follow in their given order.
#[derive(Clone, Debug)]
pub struct Url {
    pub https: bool,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl Default for Url {
    fn default() -> Self {
        Self {
            https: true,
            host: String::default(),
            port: u16::default(),
            path: String::from("/"),
            query: Vec::new(),
        }
    }
}

impl Url {
    /// The `Host` header value for this URL: host plus port when the port is
    /// non-default.
    pub fn host_header_value(&self) -> String {
        if self.port > 0 {
            return format!("{}:{}", self.host, self.port);
        }
        self.host.clone()
    }

    /// The port the transport must dial.
    pub fn effective_port(&self) -> u16 {
        if self.port > 0 {
            self.port
        } else if self.https {
            443
        } else {
            80
        }
    }

    /// Renders the query items, in order, as an encoded query string.
    pub fn query_string(&self) -> String {
        let mut query = String::new();
        for (key, value) in &self.query {
            if !query.is_empty() {
                query.push('&');
            }
            query.push_str(&url_encode(key));
            query.push('=');
            query.push_str(&url_encode(value));
        }
        query
    }

    /// Path plus query string, as written on the request line.
    pub fn request_target(&self) -> String {
        let mut target = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        if !self.query.is_empty() {
            target.push('?');
            target.push_str(&self.query_string());
        }
        target
    }
}

impl FromStr for Url {
    type Err = Error;

    /// Parses an absolute URL. The scheme must be `http` or `https`; the
    /// scheme defaults to `https` when none is given.
    fn from_str(s: &str) -> Result<Self, Error> {
        let uri = s.parse::<Uri>()?;

        let https = match uri.scheme() {
            None => true,
            Some(scheme) => match scheme.as_str() {
                "http" => false,
                "https" => true,
                _ => {
                    return Err(Error::InvalidUrl(
                        "scheme must be http or https".to_string(),
                    ));
                }
            },
        };

        let mut host = uri
            .host()
            .ok_or_else(|| Error::InvalidUrl("valid host must be provided".to_string()))?
            .to_string();
        if host.parse::<std::net::Ipv6Addr>().is_ok() {
            host = format!("[{host}]");
        } else if !match_hostname(&host) && host.parse::<std::net::Ipv4Addr>().is_err() {
            return Err(Error::InvalidUrl(format!("invalid host {host}")));
        }

        let mut port = uri.port_u16().unwrap_or(0);
        if (https && port == 443) || (!https && port == 80) {
            port = 0;
        }

        let path = match uri.path() {
            "" => "/".to_string(),
            p => p.to_string(),
        };

        let mut query = Vec::new();
        if let Some(q) = uri.query() {
            for item in q.split('&').filter(|i| !i.is_empty()) {
                let (key, value) = item.split_once('=').unwrap_or((item, ""));
                query.push((
                    url_decode(key).map_err(|_| Error::MalformedUrl)?.into_owned(),
                    url_decode(value)
                        .map_err(|_| Error::MalformedUrl)?
                        .into_owned(),
                ));
            }
        }

        Ok(Url {
            https,
            host,
            port,
            path,
            query,
        })
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.host.is_empty() {
            return Err(std::fmt::Error);
        }

        if self.https {
            f.write_str("https://")?;
        } else {
            f.write_str("http://")?;
        }

        if self.port > 0 {
            write!(f, "{}:{}", self.host, self.port)?;
        } else {
            f.write_str(&self.host)?;
        }

        f.write_str(&self.request_target())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        let url: Url = "https://iam.amazonaws.com/?Action=ListUsers&Version=2010-05-08"
            .parse()
            .unwrap();
        assert!(url.https);
        assert_eq!(url.host, "iam.amazonaws.com");
        assert_eq!(url.port, 0);
        assert_eq!(url.path, "/");
        assert_eq!(
            url.query,
            vec![
                ("Action".to_string(), "ListUsers".to_string()),
                ("Version".to_string(), "2010-05-08".to_string()),
            ]
        );
        assert_eq!(
            url.to_string(),
            "https://iam.amazonaws.com/?Action=ListUsers&Version=2010-05-08"
        );
    }

    #[test]
    fn test_default_ports_are_normalized() {
        let url: Url = "https://example.com:443/a".parse().unwrap();
        assert_eq!(url.port, 0);
        assert_eq!(url.host_header_value(), "example.com");
        assert_eq!(url.effective_port(), 443);

        let url: Url = "http://example.com:8080".parse().unwrap();
        assert_eq!(url.host_header_value(), "example.com:8080");
        assert_eq!(url.effective_port(), 8080);
        assert_eq!(url.path, "/");
    }

    #[test]
    fn test_scheme_validation() {
        assert!(matches!(
            "ftp://example.com/".parse::<Url>(),
            Err(Error::InvalidUrl(_))
        ));
    }
}
