//! End-to-end session lifecycle over HTTP with in-memory collaborators

use reqwest::header::{HeaderMap, AUTHORIZATION, COOKIE, SET_COOKIE};
use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;

use session_core::auth::{
    hash_password, InMemoryRefreshStore, InMemoryUserDirectory, Role, SessionManager, TokenCodec,
    UserRecord,
};
use session_core::configuration::{JwtSettings, SessionSettings};
use session_core::middleware::PublicRoutes;
use session_core::startup::{run, AppState};

const EMAIL: &str = "ursula@example.com";
const PASSWORD: &str = "correct horse battery staple";

pub struct TestApp {
    pub address: String,
    pub session: SessionManager,
    pub store: Arc<InMemoryRefreshStore>,
    pub client: reqwest::Client,
}

impl TestApp {
    async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn post_with_cookie(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", self.address, path))
            .header(COOKIE, format!("refreshToken={}", token))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn login(&self) -> Value {
        let response = self
            .post_json("/auth/login", &json!({ "email": EMAIL, "password": PASSWORD }))
            .await;
        assert_eq!(200, response.status().as_u16());
        response.json().await.expect("Failed to parse response")
    }
}

async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let codec = TokenCodec::new(&JwtSettings {
        secret: "integration-test-secret-0123456789abcdef".to_string(),
        access_token_expiry: 3600,
        refresh_token_expiry: 604800,
        issuer: "session-core-test".to_string(),
    })
    .expect("Failed to build token codec");

    let store = Arc::new(InMemoryRefreshStore::new());
    let session = SessionManager::new(codec, store.clone());

    let directory = InMemoryUserDirectory::new();
    directory
        .insert(UserRecord {
            identity: EMAIL.to_string(),
            role: Role::Artist,
            password_hash: hash_password(PASSWORD, 4).expect("Failed to hash password"),
        })
        .expect("Failed to seed directory");

    let state = AppState {
        session: session.clone(),
        directory: Arc::new(directory),
        session_settings: SessionSettings::default(),
        public_routes: PublicRoutes::default(),
    };
    let server = run(listener, state).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        session,
        store,
        client: reqwest::Client::new(),
    }
}

fn set_cookies(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

fn token(body: &Value, field: &str) -> String {
    body[field].as_str().expect("token field present").to_string()
}

// --- Login ---

#[tokio::test]
async fn login_returns_token_pair_for_valid_credentials() {
    let app = spawn_app().await;

    let body = app.login().await;

    assert!(body["accessToken"].is_string());
    assert!(body["refreshToken"].is_string());
    assert_eq!(body["tokenType"], "Bearer");
    assert_eq!(body["expiresIn"], 3600);
    assert_eq!(1, app.store.len());
}

#[tokio::test]
async fn login_rejects_unknown_identity_and_wrong_password_alike() {
    let app = spawn_app().await;

    let unknown = app
        .post_json("/auth/login", &json!({ "email": "nobody@example.com", "password": PASSWORD }))
        .await;
    let wrong = app
        .post_json("/auth/login", &json!({ "email": EMAIL, "password": "nope" }))
        .await;

    assert_eq!(401, unknown.status().as_u16());
    assert_eq!(401, wrong.status().as_u16());

    let unknown: Value = unknown.json().await.unwrap();
    let wrong: Value = wrong.json().await.unwrap();
    assert_eq!(unknown["code"], wrong["code"]);
    assert_eq!(unknown["message"], wrong["message"]);
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn login_for_unknown_identity_still_pays_for_a_password_check() {
    let app = spawn_app().await;

    let started = std::time::Instant::now();
    let response = app
        .post_json("/auth/login", &json!({ "email": "nobody@example.com", "password": PASSWORD }))
        .await;
    let elapsed = started.elapsed();

    assert_eq!(401, response.status().as_u16());
    // A cost-12 bcrypt verify, not an immediate return.
    assert!(elapsed >= std::time::Duration::from_millis(10), "took {:?}", elapsed);
}

#[tokio::test]
async fn login_returns_400_for_empty_fields() {
    let app = spawn_app().await;

    let test_cases = vec![
        (json!({ "email": "", "password": PASSWORD }), "empty email"),
        (json!({ "email": EMAIL, "password": "" }), "empty password"),
    ];

    for (body, description) in test_cases {
        let response = app.post_json("/auth/login", &body).await;
        assert_eq!(400, response.status().as_u16(), "Expected 400 for {}", description);
    }
}

// --- Refresh ---

#[tokio::test]
async fn refresh_rotates_and_rejects_replay() {
    let app = spawn_app().await;
    let first = app.login().await;
    let old_refresh = token(&first, "refreshToken");

    let response = app
        .post_json("/auth/refresh", &json!({ "refreshToken": old_refresh }))
        .await;
    assert_eq!(200, response.status().as_u16());
    let second: Value = response.json().await.unwrap();
    assert_ne!(second["refreshToken"], first["refreshToken"]);
    assert_eq!(1, app.store.len());

    let replay = app
        .post_json("/auth/refresh", &json!({ "refreshToken": old_refresh }))
        .await;
    assert_eq!(401, replay.status().as_u16());
    let error: Value = replay.json().await.unwrap();
    assert_eq!(error["code"], "UNAUTHENTICATED");

    // The rotated-in token is still live.
    let response = app
        .post_json("/auth/refresh", &json!({ "refreshToken": token(&second, "refreshToken") }))
        .await;
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn replayed_and_forged_tokens_look_identical() {
    let app = spawn_app().await;
    let pair = app.login().await;
    let refresh = token(&pair, "refreshToken");
    app.post_json("/auth/refresh", &json!({ "refreshToken": refresh })).await;

    let replayed = app
        .post_json("/auth/refresh", &json!({ "refreshToken": refresh }))
        .await;
    let forged = app
        .post_json("/auth/refresh", &json!({ "refreshToken": "forged.token.value" }))
        .await;

    assert_eq!(replayed.status(), forged.status());
    let replayed: Value = replayed.json().await.unwrap();
    let forged: Value = forged.json().await.unwrap();
    assert_eq!(replayed["code"], forged["code"]);
    assert_eq!(replayed["message"], forged["message"]);
}

#[tokio::test]
async fn refresh_rejects_access_token() {
    let app = spawn_app().await;
    let pair = app.login().await;

    let response = app
        .post_json("/auth/refresh", &json!({ "refreshToken": token(&pair, "accessToken") }))
        .await;

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn refresh_via_cookie_sets_rotated_cookie() {
    let app = spawn_app().await;
    let pair = app.login().await;

    let response = app
        .post_with_cookie("/auth/refresh", &token(&pair, "refreshToken"))
        .await;
    assert_eq!(200, response.status().as_u16());

    let cookies = set_cookies(response.headers());
    let body: Value = response.json().await.unwrap();
    let rotated = token(&body, "refreshToken");

    assert_eq!(1, cookies.len());
    assert!(cookies[0].starts_with(&format!("refreshToken={}", rotated)));
    assert!(cookies[0].contains("HttpOnly"));
}

#[tokio::test]
async fn refresh_without_any_token_is_401() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(&format!("{}/auth/refresh", app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn old_access_token_survives_rotation() {
    let app = spawn_app().await;
    let pair = app.login().await;
    app.post_json("/auth/refresh", &json!({ "refreshToken": token(&pair, "refreshToken") }))
        .await;

    let response = app
        .client
        .get(&format!("{}/auth/me", app.address))
        .bearer_auth(token(&pair, "accessToken"))
        .send()
        .await
        .unwrap();

    assert_eq!(200, response.status().as_u16());
}

// --- Exchange ---

#[tokio::test]
async fn exchange_returns_pair_and_clears_cookie() {
    let app = spawn_app().await;
    let federated = app.session.login("federated@example.com", Role::User).await.unwrap();

    let response = app
        .post_with_cookie("/auth/exchange", &federated.refresh_token)
        .await;
    assert_eq!(200, response.status().as_u16());

    let cookies = set_cookies(response.headers());
    assert_eq!(1, cookies.len());
    assert!(cookies[0].starts_with("refreshToken=;"));
    assert!(cookies[0].contains("Max-Age=0"));

    let body: Value = response.json().await.unwrap();
    assert_ne!(token(&body, "refreshToken"), federated.refresh_token);

    let me: Value = app
        .client
        .get(&format!("{}/auth/me", app.address))
        .bearer_auth(token(&body, "accessToken"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["identity"], "federated@example.com");
    assert_eq!(me["role"], "USER");

    // An exchanged cookie cannot be exchanged again.
    let again = app
        .post_with_cookie("/auth/exchange", &federated.refresh_token)
        .await;
    assert_eq!(401, again.status().as_u16());
}

#[tokio::test]
async fn exchange_ignores_body_tokens() {
    let app = spawn_app().await;
    let pair = app.login().await;

    let response = app
        .post_json("/auth/exchange", &json!({ "refreshToken": token(&pair, "refreshToken") }))
        .await;

    assert_eq!(401, response.status().as_u16());
    assert_eq!(1, app.store.len());
}

// --- Logout ---

#[tokio::test]
async fn logout_is_idempotent_and_revokes() {
    let app = spawn_app().await;
    let pair = app.login().await;
    let refresh = token(&pair, "refreshToken");

    for _ in 0..2 {
        let response = app
            .post_json("/auth/logout", &json!({ "refreshToken": refresh }))
            .await;
        assert_eq!(200, response.status().as_u16());
        let cookies = set_cookies(response.headers());
        assert!(cookies[0].contains("Max-Age=0"));
    }
    assert!(app.store.is_empty());

    let response = app
        .post_json("/auth/refresh", &json!({ "refreshToken": refresh }))
        .await;
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn logout_with_garbage_or_nothing_still_succeeds() {
    let app = spawn_app().await;

    let garbage = app
        .post_json("/auth/logout", &json!({ "refreshToken": "garbage" }))
        .await;
    assert_eq!(200, garbage.status().as_u16());

    let nothing = app
        .client
        .post(&format!("{}/auth/logout", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(200, nothing.status().as_u16());
}

// --- Auth boundary ---

#[tokio::test]
async fn me_returns_identity_context_for_bearer() {
    let app = spawn_app().await;
    let pair = app.login().await;

    let response = app
        .client
        .get(&format!("{}/auth/me", app.address))
        .bearer_auth(token(&pair, "accessToken"))
        .send()
        .await
        .unwrap();

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["identity"], EMAIL);
    assert_eq!(body["role"], "ARTIST");
}

#[tokio::test]
async fn me_rejects_missing_malformed_and_wrong_kind_credentials() {
    let app = spawn_app().await;
    let pair = app.login().await;

    let headers = vec![
        None,
        Some("Basic dXNlcjpwYXNz".to_string()),
        Some(format!("Bearer {}", token(&pair, "refreshToken"))),
        Some("Bearer not.a.jwt".to_string()),
    ];

    for header in headers {
        let mut request = app.client.get(&format!("{}/auth/me", app.address));
        if let Some(value) = &header {
            request = request.header(AUTHORIZATION, value.as_str());
        }
        let response = request.send().await.unwrap();

        assert_eq!(401, response.status().as_u16(), "header {:?}", header);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["code"], "UNAUTHENTICATED");
    }
}

// --- Revoke all ---

#[tokio::test]
async fn delete_sessions_revokes_every_refresh_token_of_caller() {
    let app = spawn_app().await;
    let first = app.login().await;
    let second = app.login().await;
    let other = app.session.login("someone@else.com", Role::User).await.unwrap();
    assert_eq!(3, app.store.len());

    let response = app
        .client
        .delete(&format!("{}/auth/sessions", app.address))
        .bearer_auth(token(&second, "accessToken"))
        .send()
        .await
        .unwrap();
    assert_eq!(204, response.status().as_u16());
    assert_eq!(1, app.store.len());

    for body in [&first, &second] {
        let response = app
            .post_json("/auth/refresh", &json!({ "refreshToken": token(body, "refreshToken") }))
            .await;
        assert_eq!(401, response.status().as_u16());
    }

    let response = app
        .post_json("/auth/refresh", &json!({ "refreshToken": other.refresh_token }))
        .await;
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn delete_sessions_requires_bearer() {
    let app = spawn_app().await;
    app.login().await;

    let response = app
        .client
        .delete(&format!("{}/auth/sessions", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(401, response.status().as_u16());
    assert_eq!(1, app.store.len());
}
