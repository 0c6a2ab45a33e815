// Session-aware HTTP client
//
// Wraps `reqwest::Client` with URL construction under the configured base
// URL and uniform status handling. Endpoint groups (session, peers) are
// implemented as inherent methods in separate files to keep this module
// focused on transport mechanics.

use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::auth::SessionCredential;
use crate::error::Error;
use crate::transport::TransportConfig;

/// Longest server message carried into an error.
const MESSAGE_PREVIEW_CHARS: usize = 200;

/// Raw HTTP client for one management server.
///
/// Holds no session state of its own: every authenticated call takes the
/// credential explicitly, so whoever owns the session decides what is sent.
#[derive(Debug, Clone)]
pub struct WgClient {
    http: reqwest::Client,
    base_url: Url,
}

impl WgClient {
    /// Create a client for `base_url` from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/api/{segments...}`, percent-encoding each segment.
    ///
    /// A path prefix on the base URL (reverse-proxy mounts) is preserved.
    pub(crate) fn api_url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and decode a JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        credential: &SessionCredential,
    ) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = credential.apply(self.http.get(url)).send().await?;
        let body = Self::checked(resp).await?.text().await?;
        decode(&body)
    }

    /// Send a GET request and return the body as text.
    pub(crate) async fn get_text(
        &self,
        url: Url,
        credential: &SessionCredential,
    ) -> Result<String, Error> {
        debug!("GET {}", url);

        let resp = credential.apply(self.http.get(url)).send().await?;
        Ok(Self::checked(resp).await?.text().await?)
    }

    /// Send a POST request with an optional JSON body, discarding the response body.
    pub(crate) async fn post(
        &self,
        url: Url,
        body: Option<&(impl Serialize + Sync)>,
        credential: &SessionCredential,
    ) -> Result<(), Error> {
        debug!("POST {}", url);

        let mut builder = credential.apply(self.http.post(url));
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let resp = builder.send().await?;
        Self::checked(resp).await?;
        Ok(())
    }

    /// Send a DELETE request, discarding the response body.
    pub(crate) async fn delete(&self, url: Url, credential: &SessionCredential) -> Result<(), Error> {
        debug!("DELETE {}", url);

        let resp = credential.apply(self.http.delete(url)).send().await?;
        Self::checked(resp).await?;
        Ok(())
    }

    /// Map the response status onto the error taxonomy.
    ///
    /// 401 is always `SessionExpired`; any other non-2xx becomes `Http`
    /// with a bounded preview of the body.
    pub(crate) async fn checked(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
        let status = resp.status();
        trace!(%status, "response received");

        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::SessionExpired);
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http {
                status: status.as_u16(),
                message: message_preview(status, &body),
            });
        }

        Ok(resp)
    }
}

/// Decode a JSON body, keeping the raw text on failure.
pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(MESSAGE_PREVIEW_CHARS).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.to_owned(),
        }
    })
}

/// Human-readable message for a failed response.
///
/// Prefers a JSON `message`/`error` field, then the trimmed body, then the
/// canonical reason phrase.
pub(crate) fn message_preview(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str().map(str::to_owned))
        });

    let text = from_json.unwrap_or_else(|| body.trim().to_owned());
    if text.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_owned();
    }
    text.chars().take(MESSAGE_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn client(base: &str) -> WgClient {
        WgClient::with_client(reqwest::Client::new(), Url::parse(base).unwrap())
    }

    #[test]
    fn api_url_appends_under_root() {
        let url = client("http://host:51821")
            .api_url(&["wireguard", "client"])
            .unwrap();
        assert_eq!(url.as_str(), "http://host:51821/api/wireguard/client");
    }

    #[test]
    fn api_url_keeps_path_prefix_and_encodes_ids() {
        let url = client("https://vpn.example.com/wg/")
            .api_url(&["wireguard", "client", "a b/c", "enable"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://vpn.example.com/wg/api/wireguard/client/a%20b%2Fc/enable"
        );
    }

    #[test]
    fn message_preview_prefers_json_message() {
        let msg = message_preview(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error":"Client Not Found"}"#,
        );
        assert_eq!(msg, "Client Not Found");
    }

    #[test]
    fn message_preview_falls_back_to_reason_and_truncates() {
        assert_eq!(message_preview(StatusCode::BAD_GATEWAY, "  "), "Bad Gateway");

        let long = "x".repeat(500);
        assert_eq!(message_preview(StatusCode::BAD_REQUEST, &long).len(), 200);
    }
}
