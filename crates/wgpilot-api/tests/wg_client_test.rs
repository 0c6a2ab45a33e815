#![allow(clippy::unwrap_used)]
// Integration tests for `WgClient` using wiremock.

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wgpilot_api::{AuthFormat, CredentialKind, Error, SessionCredential, WgClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, WgClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = WgClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

fn cookie() -> SessionCredential {
    SessionCredential::new(CredentialKind::Cookie, "connect.sid=abc")
}

fn password() -> SecretString {
    SecretString::from("hunter2".to_owned())
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_json_password_captures_cookie() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/session"))
        .and(body_json(json!({ "password": "hunter2" })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "connect.sid=abc; Path=/; HttpOnly")
                .set_body_json(json!({ "success": true })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let cred = client
        .login(AuthFormat::JsonPassword, &password())
        .await
        .unwrap();
    assert_eq!(cred.kind(), CredentialKind::Cookie);
    assert_eq!(cred.expose(), "connect.sid=abc");
}

#[tokio::test]
async fn test_login_form_pass_encoding() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/session"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("pass=hunter2"))
        .respond_with(ResponseTemplate::new(204).insert_header("set-cookie", "sid=1"))
        .expect(1)
        .mount(&server)
        .await;

    let cred = client.login(AuthFormat::FormPass, &password()).await.unwrap();
    assert_eq!(cred.expose(), "sid=1");
}

#[tokio::test]
async fn test_login_plain_text_with_token_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/session"))
        .and(body_string("hunter2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "tok" })))
        .mount(&server)
        .await;

    let cred = client
        .login(AuthFormat::PlainText, &password())
        .await
        .unwrap();
    assert_eq!(cred.kind(), CredentialKind::Bearer);
    assert_eq!(cred.expose(), "tok");
}

#[tokio::test]
async fn test_login_rejected_is_http_error_not_expiry() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/session"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Incorrect Password" })))
        .mount(&server)
        .await;

    let result = client.login(AuthFormat::JsonPassword, &password()).await;
    match result {
        Err(Error::Http { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Incorrect Password");
        }
        other => panic!("expected Http error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_login_without_credential() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    let result = client.login(AuthFormat::JsonPassword, &password()).await;
    assert!(
        matches!(result, Err(Error::MissingCredential)),
        "expected MissingCredential, got: {result:?}"
    );
}

// ── Peers ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_peers_sends_cookie() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/wireguard/client"))
        .and(header("cookie", "connect.sid=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": "p1",
                "name": "laptop",
                "address": "10.8.0.2",
                "publicKey": "pk1",
                "enabled": true,
                "latestHandshakeAt": "2024-06-15T10:30:00Z",
                "transferRx": 1024,
                "transferTx": 2048
            }
        ])))
        .mount(&server)
        .await;

    let peers = client.list_peers(&cookie()).await.unwrap();
    assert_eq!(peers.len(), 1);
    assert_eq!(peers[0].name, "laptop");
    assert_eq!(peers[0].transfer_rx, Some(1024));
}

#[tokio::test]
async fn test_bearer_credential_uses_authorization_header() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/wireguard/client"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let bearer = SessionCredential::new(CredentialKind::Bearer, "tok");
    assert!(client.list_peers(&bearer).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_enable_disable_delete() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/wireguard/client"))
        .and(body_json(json!({ "name": "phone" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/wireguard/client/p1/enable"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/wireguard/client/p1/disable"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/wireguard/client/p1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let cred = cookie();
    client.create_peer("phone", &cred).await.unwrap();
    client.enable_peer("p1", &cred).await.unwrap();
    client.disable_peer("p1", &cred).await.unwrap();
    client.delete_peer("p1", &cred).await.unwrap();
}

#[tokio::test]
async fn test_peer_configuration_is_text() {
    let (server, client) = setup().await;

    let config = "[Interface]\nPrivateKey = x\nAddress = 10.8.0.2/24\n";
    Mock::given(method("GET"))
        .and(path("/api/wireguard/client/p1/configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_string(config))
        .mount(&server)
        .await;

    let text = client.peer_configuration("p1", &cookie()).await.unwrap();
    assert_eq!(text, config);
}

#[tokio::test]
async fn test_server_info() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version": "14.0.0",
            "latestRelease": { "version": "15.0.0", "changelog": "" },
            "authenticated": true,
            "requiresPassword": true
        })))
        .mount(&server)
        .await;

    let info = client.server_info(&cookie()).await.unwrap();
    assert_eq!(info.version.as_deref(), Some("14.0.0"));
    assert_eq!(info.latest_release.unwrap().version(), "15.0.0");
    assert_eq!(info.authenticated, Some(true));
}

// ── Error tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized_is_session_expired() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.list_peers(&cookie()).await;
    assert!(
        matches!(result, Err(Error::SessionExpired)),
        "expected SessionExpired, got: {result:?}"
    );
}

#[tokio::test]
async fn test_server_error_carries_status_and_message() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/wireguard/client/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "Client Not Found" })))
        .mount(&server)
        .await;

    let err = client.delete_peer("missing", &cookie()).await.unwrap_err();
    match err {
        Error::Http { status, ref message } => {
            assert_eq!(status, 404);
            assert!(message.contains("Client Not Found"));
        }
        other => panic!("expected an HTTP error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_peer_list() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/wireguard/client"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    let result = client.list_peers(&cookie()).await;
    match result {
        Err(Error::Deserialization { body, .. }) => assert_eq!(body, "<html>proxy</html>"),
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_connection_refused_is_transient() {
    // Bind and drop a server so the port is known to be closed.
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };
    let client = WgClient::with_client(reqwest::Client::new(), Url::parse(&uri).unwrap());

    let err = client.list_peers(&cookie()).await.unwrap_err();
    assert!(err.is_transient(), "expected transient error, got: {err:?}");
}
