// Login encodings and session credentials
//
// Servers in the wg-easy family disagree on how the login body is shaped.
// `AuthFormat` enumerates every encoding we know, in the order they are
// tried. `SessionCredential` is whatever the server handed back on success.

use std::fmt;
use std::str::FromStr;

use reqwest::RequestBuilder;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, HeaderMap, SET_COOKIE};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

/// One way of encoding the password in a `POST /api/session` body.
///
/// Declaration order is priority order: [`AuthFormat::CANDIDATES`] lists
/// them exactly as they are probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthFormat {
    /// `{"password": p}`
    JsonPassword,
    /// `{"pass": p}`
    JsonPass,
    /// `password=p`
    FormPassword,
    /// `pass=p`
    FormPass,
    /// The raw password as `text/plain`.
    PlainText,
}

impl AuthFormat {
    /// Every candidate in probe order.
    pub const CANDIDATES: [Self; 5] = [
        Self::JsonPassword,
        Self::JsonPass,
        Self::FormPassword,
        Self::FormPass,
        Self::PlainText,
    ];

    /// Stable identifier used for persistence and display.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::JsonPassword => "json-password",
            Self::JsonPass => "json-pass",
            Self::FormPassword => "form-password",
            Self::FormPass => "form-pass",
            Self::PlainText => "plain-text",
        }
    }

    /// 1-based position in the probe order.
    pub fn priority(self) -> usize {
        match self {
            Self::JsonPassword => 1,
            Self::JsonPass => 2,
            Self::FormPassword => 3,
            Self::FormPass => 4,
            Self::PlainText => 5,
        }
    }

    /// Attach the password to `builder` in this encoding.
    pub fn encode(self, builder: RequestBuilder, password: &SecretString) -> RequestBuilder {
        let password = password.expose_secret();
        match self {
            Self::JsonPassword => builder.json(&json!({ "password": password })),
            Self::JsonPass => builder.json(&json!({ "pass": password })),
            Self::FormPassword => builder.form(&[("password", password)]),
            Self::FormPass => builder.form(&[("pass", password)]),
            Self::PlainText => builder
                .header(CONTENT_TYPE, "text/plain; charset=utf-8")
                .body(password.to_owned()),
        }
    }
}

impl fmt::Display for AuthFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::CANDIDATES
            .into_iter()
            .find(|format| format.as_str() == s)
            .ok_or_else(|| format!("unknown auth format '{s}'"))
    }
}

// ── Session credential ──────────────────────────────────────────────

/// How a credential is presented on subsequent requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    /// Sent back verbatim in the `Cookie` header.
    Cookie,
    /// Sent as `Authorization: Bearer <token>`.
    Bearer,
}

impl CredentialKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cookie => "cookie",
            Self::Bearer => "bearer",
        }
    }
}

impl FromStr for CredentialKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cookie" => Ok(Self::Cookie),
            "bearer" => Ok(Self::Bearer),
            other => Err(format!("unknown credential kind '{other}'")),
        }
    }
}

/// Opaque session credential returned by a successful login.
#[derive(Debug, Clone)]
pub struct SessionCredential {
    kind: CredentialKind,
    value: SecretString,
}

impl SessionCredential {
    pub fn new(kind: CredentialKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: SecretString::from(value.into()),
        }
    }

    pub fn kind(&self) -> CredentialKind {
        self.kind
    }

    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().trim().is_empty()
    }

    /// Extract a credential from a login response.
    ///
    /// `Set-Cookie` headers win; each cookie is reduced to its `name=value`
    /// pair and the pairs are joined the way a `Cookie` header expects.
    /// Without cookies, a JSON body with a string `token` field is accepted.
    pub fn from_login_response(headers: &HeaderMap, body: &str) -> Option<Self> {
        let cookies: Vec<&str> = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .map(str::trim)
            .filter(|pair| pair.contains('=') && !pair.starts_with('='))
            .collect();

        if !cookies.is_empty() {
            return Some(Self::new(CredentialKind::Cookie, cookies.join("; ")));
        }

        serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("token")?.as_str().map(str::to_owned))
            .filter(|token| !token.trim().is_empty())
            .map(|token| Self::new(CredentialKind::Bearer, token))
    }

    /// Attach this credential to an outgoing request.
    pub fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.kind {
            CredentialKind::Cookie => builder.header(COOKIE, self.expose()),
            CredentialKind::Bearer => {
                builder.header(AUTHORIZATION, format!("Bearer {}", self.expose()))
            }
        }
    }
}
