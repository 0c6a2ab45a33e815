// Session endpoint
//
// Password login against `POST /api/session` in a caller-chosen encoding,
// logout, and the session/info probe. The credential is captured from the
// login response and handed back; nothing is kept on the client.

use reqwest::header::SET_COOKIE;
use secrecy::SecretString;
use tracing::debug;

use crate::auth::{AuthFormat, SessionCredential};
use crate::client::{self, WgClient};
use crate::error::Error;
use crate::models::WireServerInfo;

impl WgClient {
    /// Log in with `password` encoded as `format`.
    ///
    /// Succeeds only on a 2xx that carries a session credential. A
    /// rejected login surfaces as `Http` (including 401, which here means
    /// "wrong encoding or password", not an expired session).
    pub async fn login(
        &self,
        format: AuthFormat,
        password: &SecretString,
    ) -> Result<SessionCredential, Error> {
        let url = self.api_url(&["session"])?;
        debug!(%format, "logging in at {}", url);

        let resp = format.encode(self.http().post(url), password).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http {
                status: status.as_u16(),
                message: client::message_preview(status, &body),
            });
        }

        let headers = resp.headers().clone();
        let body = resp.text().await?;

        let credential = SessionCredential::from_login_response(&headers, &body)
            .ok_or(Error::MissingCredential)?;

        debug!(
            %format,
            kind = credential.kind().as_str(),
            cookies = headers.get_all(SET_COOKIE).iter().count(),
            "login accepted"
        );
        Ok(credential)
    }

    /// End the session server-side.
    pub async fn logout(&self, credential: &SessionCredential) -> Result<(), Error> {
        let url = self.api_url(&["session"])?;
        self.delete(url, credential).await?;
        debug!("logout complete");
        Ok(())
    }

    /// Session and release information (`GET /api/session`).
    pub async fn server_info(&self, credential: &SessionCredential) -> Result<WireServerInfo, Error> {
        let url = self.api_url(&["session"])?;
        self.get_json(url, credential).await
    }
}
