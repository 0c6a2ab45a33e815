// ── Runtime connection configuration ──
//
// These types describe *which* server to talk to and *how*. They carry
// credential data and connection tuning, but never touch disk. The CLI
// (or any other consumer) constructs a `ClientConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use wgpilot_api::{TlsMode, TransportConfig};

use crate::error::CoreError;

/// User-supplied target server.
///
/// Construction validates the URL, so a `ServerProfile` in hand is always
/// well-formed: `http(s)://host[:port][/prefix]`, no query, fragment or
/// embedded credentials.
#[derive(Debug, Clone)]
pub struct ServerProfile {
    url: Url,
    password: Option<SecretString>,
}

impl ServerProfile {
    pub fn new(url: &str, password: Option<SecretString>) -> Result<Self, CoreError> {
        let url = parse_server_url(url)?;
        Ok(Self { url, password })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn password(&self) -> Option<&SecretString> {
        self.password.as_ref()
    }

    pub fn with_password(mut self, password: SecretString) -> Self {
        self.password = Some(password);
        self
    }

    /// Canonical server identity used to key sessions and secrets.
    pub fn server_key(&self) -> String {
        canonical_key(&self.url)
    }
}

/// Canonical form of a server URL: no trailing slash.
pub(crate) fn canonical_key(url: &Url) -> String {
    url.as_str().trim_end_matches('/').to_owned()
}

fn parse_server_url(raw: &str) -> Result<Url, CoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation("url", "server URL is empty"));
    }

    let url = Url::parse(trimmed)
        .map_err(|e| CoreError::validation("url", format!("'{trimmed}' is not a URL: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(CoreError::validation(
            "url",
            format!("expected http or https, got '{}'", url.scheme()),
        ));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(CoreError::validation("url", "missing host"));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(CoreError::validation(
            "url",
            "credentials must not be embedded in the URL",
        ));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(CoreError::validation(
            "url",
            "query strings and fragments are not allowed",
        ));
    }

    Ok(url)
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// Bundled root store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed certs on a LAN).
    DangerAcceptInvalid,
}

/// Configuration for talking to a single server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub profile: ServerProfile,
    pub tls: TlsVerification,
    /// Connect and read timeout for every call, probes included.
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(profile: ServerProfile) -> Self {
        Self {
            profile,
            tls: TlsVerification::default(),
            timeout: wgpilot_api::transport::DEFAULT_TIMEOUT,
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn accepts_host_with_port() {
        let profile = ServerProfile::new("http://host:51821", None).unwrap();
        assert_eq!(profile.server_key(), "http://host:51821");
        assert_eq!(profile.url().port(), Some(51821));
    }

    #[test]
    fn accepts_https_with_prefix() {
        let profile = ServerProfile::new(" https://vpn.example.com/wg/ ", None).unwrap();
        assert_eq!(profile.server_key(), "https://vpn.example.com/wg");
    }

    #[test]
    fn rejects_malformed_urls() {
        for bad in [
            "",
            "host:51821",
            "ftp://host",
            "http://user:pw@host",
            "http://host/?x=1",
            "http://host/#frag",
            "not a url",
        ] {
            let err = ServerProfile::new(bad, None).unwrap_err();
            assert!(
                matches!(err, CoreError::Validation { ref field, .. } if field == "url"),
                "{bad:?} should be rejected, got {err:?}"
            );
        }
    }

    #[test]
    fn transport_carries_timeout_and_tls() {
        let mut config = ClientConfig::new(ServerProfile::new("http://h", None).unwrap());
        config.timeout = Duration::from_secs(3);
        config.tls = TlsVerification::DangerAcceptInvalid;

        let transport = config.transport();
        assert_eq!(transport.timeout, Duration::from_secs(3));
        assert!(matches!(transport.tls, TlsMode::DangerAcceptInvalid));
    }
}
