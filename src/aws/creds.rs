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

//! Credential providers

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::aws::utils::UtcTime;

/// Credentials contain access key, secret key and optionally a session token
/// and an expiry.
#[derive(Clone, Debug, PartialEq)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
    pub session_token: Option<String>,
    pub expiry: Option<UtcTime>,
}

impl Credentials {
    /// Anonymous credentials: requests signed with these are not signed at
    /// all, which permits unsigned calls to public endpoints.
    pub fn anonymous() -> Self {
        Self {
            access_key: String::new(),
            secret_key: String::new(),
            session_token: None,
            expiry: None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.access_key.is_empty() && self.secret_key.is_empty()
    }
}

/// Provider trait to fetch credentials. Returns `None` when this source has
/// nothing to offer, letting a chain fall through to the next provider.
pub trait Provider: std::fmt::Debug {
    fn fetch(&self) -> Option<Credentials>;
}

/// Static credential provider
#[derive(Clone, Debug)]
pub struct StaticProvider {
    creds: Credentials,
}

impl StaticProvider {
    /// Returns a static provider with given access key, secret key and
    /// optional session token
    ///
    /// # Examples
    ///
    /// ```
    /// use awsio::aws::creds::StaticProvider;
    /// let provider = StaticProvider::new("AKIDEXAMPLE", "secret", None);
    /// ```
    pub fn new(access_key: &str, secret_key: &str, session_token: Option<&str>) -> StaticProvider {
        StaticProvider {
            creds: Credentials {
                access_key: access_key.to_string(),
                secret_key: secret_key.to_string(),
                session_token: session_token.map(|v| v.to_string()),
                expiry: None,
            },
        }
    }
}

impl Provider for StaticProvider {
    fn fetch(&self) -> Option<Credentials> {
        if self.creds.access_key.is_empty() || self.creds.secret_key.is_empty() {
            return None;
        }
        Some(self.creds.clone())
    }
}

/// Reads credentials from `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and
/// optionally `AWS_SESSION_TOKEN`.
#[derive(Clone, Debug, Default)]
pub struct EnvProvider;

impl Provider for EnvProvider {
    fn fetch(&self) -> Option<Credentials> {
        let access_key = std::env::var("AWS_ACCESS_KEY_ID").ok()?;
        let secret_key = std::env::var("AWS_SECRET_ACCESS_KEY").ok()?;
        if access_key.is_empty() || secret_key.is_empty() {
            return None;
        }
        Some(Credentials {
            access_key,
            secret_key,
            session_token: std::env::var("AWS_SESSION_TOKEN").ok(),
            expiry: None,
        })
    }
}

/// Reads credentials from the shared INI-formatted credentials file,
/// `~/.aws/credentials` by default. The profile comes from `AWS_PROFILE`,
/// falling back to `default`.
#[derive(Clone, Debug, Default)]
pub struct ProfileProvider {
    path: Option<PathBuf>,
    profile: Option<String>,
}

impl ProfileProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the credentials file location. The file is read once per
    /// fetch; the engine resolves credentials once at client construction.
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            profile: None,
        }
    }

    pub fn profile(mut self, profile: &str) -> Self {
        self.profile = Some(profile.to_string());
        self
    }

    fn file_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.path {
            return Some(path.clone());
        }
        let home = std::env::var("HOME").ok()?;
        Some(Path::new(&home).join(".aws").join("credentials"))
    }
}

/// Parses INI-formatted text into section name to key/value maps. Comments
/// start with `;` or `#`; whitespace around section names, keys and values
/// is trimmed.
fn parse_ini(text: &str) -> HashMap<String, HashMap<String, String>> {
    let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current: Option<String> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            let name = line[1..line.len() - 1].trim().to_string();
            sections.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if let Some(section) = &current {
            sections
                .entry(section.clone())
                .or_default()
                .insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    sections
}

impl Provider for ProfileProvider {
    fn fetch(&self) -> Option<Credentials> {
        let path = self.file_path()?;
        let text = std::fs::read_to_string(path).ok()?;
        let sections = parse_ini(&text);

        let profile = self
            .profile
            .clone()
            .or_else(|| std::env::var("AWS_PROFILE").ok())
            .unwrap_or_else(|| "default".to_string());
        let section = sections.get(&profile)?;

        let access_key = section.get("aws_access_key_id")?.clone();
        let secret_key = section.get("aws_secret_access_key")?.clone();
        if access_key.is_empty() || secret_key.is_empty() {
            return None;
        }
        Some(Credentials {
            access_key,
            secret_key,
            session_token: section.get("aws_session_token").cloned(),
            expiry: None,
        })
    }
}

/// Always yields empty-string credentials; terminal element of the default
/// chain.
#[derive(Clone, Debug, Default)]
pub struct AnonymousProvider;

impl Provider for AnonymousProvider {
    fn fetch(&self) -> Option<Credentials> {
        Some(Credentials::anonymous())
    }
}

/// Ordered credential resolution: explicit, environment, shared credentials
/// file, anonymous. The first provider with something to offer wins.
#[derive(Debug, Default)]
pub struct CredentialChain {
    providers: Vec<Box<dyn Provider + Send + Sync>>,
}

impl CredentialChain {
    /// The standard chain: environment, then credentials file, then
    /// anonymous. Prepend a [`StaticProvider`] for explicit credentials.
    pub fn standard() -> Self {
        Self {
            providers: vec![
                Box::new(EnvProvider),
                Box::new(ProfileProvider::new()),
                Box::new(AnonymousProvider),
            ],
        }
    }

    /// A chain with the credentials file read from `path` instead of
    /// `~/.aws/credentials`.
    pub fn with_credentials_file<P: AsRef<Path>>(path: P) -> Self {
        Self {
            providers: vec![
                Box::new(EnvProvider),
                Box::new(ProfileProvider::with_path(path)),
                Box::new(AnonymousProvider),
            ],
        }
    }

    pub fn push<P: Provider + Send + Sync + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Walks the chain in order; deterministic for fixed environment and
    /// file state.
    pub fn resolve(&self) -> Credentials {
        for provider in &self.providers {
            if let Some(creds) = provider.fetch() {
                return creds;
            }
        }
        Credentials::anonymous()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn scratch_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("awsio-creds-{name}-{}", std::process::id()));
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_static_provider() {
        let provider = StaticProvider::new("AKID", "secret", Some("token"));
        let creds = provider.fetch().unwrap();
        assert_eq!(creds.access_key, "AKID");
        assert_eq!(creds.secret_key, "secret");
        assert_eq!(creds.session_token.as_deref(), Some("token"));
    }

    #[test]
    fn test_static_provider_requires_both_keys() {
        assert!(StaticProvider::new("AKID", "", None).fetch().is_none());
        assert!(StaticProvider::new("", "secret", None).fetch().is_none());
    }

    #[test]
    fn test_profile_provider_parses_ini() {
        let path = scratch_file(
            "parse",
            "; leading comment\n\
             [default]\n\
             aws_access_key_id = AKIDDEFAULT\n\
             aws_secret_access_key = defaultsecret\n\
             # trailing comment\n\
             [ci]\n\
             aws_access_key_id=AKIDCI\n\
             aws_secret_access_key=  cisecret  \n\
             aws_session_token = citoken\n",
        );

        let creds = ProfileProvider::with_path(&path).fetch().unwrap();
        assert_eq!(creds.access_key, "AKIDDEFAULT");
        assert_eq!(creds.secret_key, "defaultsecret");
        assert_eq!(creds.session_token, None);

        let creds = ProfileProvider::with_path(&path)
            .profile("ci")
            .fetch()
            .unwrap();
        assert_eq!(creds.access_key, "AKIDCI");
        assert_eq!(creds.secret_key, "cisecret");
        assert_eq!(creds.session_token.as_deref(), Some("citoken"));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_profile_provider_missing_profile() {
        let path = scratch_file(
            "missing",
            "[other]\naws_access_key_id = A\naws_secret_access_key = B\n",
        );
        assert!(ProfileProvider::with_path(&path)
            .profile("default")
            .fetch()
            .is_none());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_chain_falls_through_to_anonymous() {
        let chain = CredentialChain {
            providers: vec![
                Box::new(StaticProvider::new("", "", None)),
                Box::new(AnonymousProvider),
            ],
        };
        assert!(chain.resolve().is_anonymous());
    }

    #[test]
    fn test_chain_first_success_wins() {
        let chain = CredentialChain {
            providers: vec![
                Box::new(StaticProvider::new("FIRST", "one", None)),
                Box::new(StaticProvider::new("SECOND", "two", None)),
            ],
        };
        assert_eq!(chain.resolve().access_key, "FIRST");
    }
}
