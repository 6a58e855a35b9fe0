use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use authgate::auth::{Fingerprint, SessionService};
use authgate::configuration::{CookieSettings, JwtSettings};
use authgate::startup::run;
use authgate::store::{
    Account, CredentialStore, FingerprintSwap, InMemoryCredentialStore, NewAccount, StoreError,
};
use reqwest::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use reqwest::Response;
use serde_json::{json, Value};
use uuid::Uuid;

const PASSWORD: &str = "SecurePass123";

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

fn jwt_settings() -> JwtSettings {
    JwtSettings {
        issuer: "authgate-test".to_string(),
        access_secret: "integration-access-secret".to_string(),
        refresh_secret: "integration-refresh-secret".to_string(),
        access_token_expiry: 900,
        refresh_token_expiry: 604800,
    }
}

fn spawn_app_with(store: Arc<dyn CredentialStore>, store_timeout: Duration) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let sessions = SessionService::new(&jwt_settings(), store)
        .expect("Failed to build session service")
        .with_password_cost(4)
        .with_store_timeout(store_timeout);

    let server = run(listener, sessions, CookieSettings::default()).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        client: reqwest::Client::new(),
    }
}

fn spawn_app() -> TestApp {
    spawn_app_with(Arc::new(InMemoryCredentialStore::new()), Duration::from_secs(2))
}

impl TestApp {
    async fn post_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(&format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn register(&self, email: &str, password: &str) -> Response {
        self.post_json(
            "/auth/register",
            &json!({ "email": email, "name": "Alice", "password": password }),
        )
        .await
    }

    async fn login(&self, email: &str, password: &str) -> Response {
        self.post_json("/auth/login", &json!({ "email": email, "password": password }))
            .await
    }

    /// Register alice and log her in, returning the login body
    async fn signed_in(&self) -> Value {
        assert_eq!(201, self.register("alice@example.com", PASSWORD).await.status().as_u16());
        let response = self.login("alice@example.com", PASSWORD).await;
        assert_eq!(200, response.status().as_u16());
        response.json().await.expect("Failed to parse response")
    }

    async fn refresh_with_cookie(&self, refresh_token: &str) -> Response {
        self.client
            .post(&format!("{}/auth/refresh", self.address))
            .header(COOKIE, format!("refreshToken={}", refresh_token))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn me_with_bearer(&self, access_token: &str) -> Response {
        self.client
            .get(&format!("{}/api/me", self.address))
            .header(AUTHORIZATION, format!("Bearer {}", access_token))
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

fn set_cookie(response: &Response, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&prefix))
        .map(str::to_string)
}

fn cookie_value(header: &str) -> &str {
    let pair = header.split(';').next().unwrap_or_default();
    pair.split_once('=').map(|(_, value)| value).unwrap_or_default()
}

fn token(body: &Value, field: &str) -> String {
    body[field].as_str().expect("missing token").to_string()
}

// --- Registration ---

#[tokio::test]
async fn register_returns_201_with_identity() {
    let app = spawn_app();

    let response = app.register("alice@example.com", PASSWORD).await;

    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["name"], "Alice");
    assert!(body["id"].as_str().and_then(|id| Uuid::parse_str(id).ok()).is_some());
    assert!(body.get("password_hash").is_none());
    assert!(body.get("access_token").is_none());
}

#[tokio::test]
async fn register_returns_409_for_duplicate_email() {
    let app = spawn_app();
    app.register("alice@example.com", PASSWORD).await;

    let response = app.register("ALICE@example.com", PASSWORD).await;

    assert_eq!(409, response.status().as_u16());
}

#[tokio::test]
async fn register_returns_400_for_invalid_fields() {
    let app = spawn_app();
    let test_cases = vec![
        (json!({ "email": "", "name": "Alice", "password": PASSWORD }), "blank email"),
        (json!({ "email": "a@example.com", "name": " ", "password": PASSWORD }), "blank name"),
        (json!({ "email": "a@example.com", "name": "Alice", "password": "short" }), "short password"),
    ];

    for (body, description) in test_cases {
        let response = app.post_json("/auth/register", &body).await;
        assert_eq!(400, response.status().as_u16(), "Should reject {}", description);
    }
}

// --- Login ---

#[tokio::test]
async fn login_returns_tokens_and_sets_cookies() {
    let app = spawn_app();
    app.register("alice@example.com", PASSWORD).await;

    let response = app.login("alice@example.com", PASSWORD).await;
    assert_eq!(200, response.status().as_u16());

    let access_cookie = set_cookie(&response, "accessToken").expect("missing accessToken cookie");
    let refresh_cookie = set_cookie(&response, "refreshToken").expect("missing refreshToken cookie");
    for cookie in [&access_cookie, &refresh_cookie] {
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(!cookie.contains("Secure"));
    }
    assert!(access_cookie.contains("Max-Age=900"));
    assert!(refresh_cookie.contains("Max-Age=604800"));

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 900);
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert_eq!(cookie_value(&access_cookie), body["access_token"].as_str().unwrap());
    assert_eq!(cookie_value(&refresh_cookie), body["refresh_token"].as_str().unwrap());
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = spawn_app();
    app.register("alice@example.com", PASSWORD).await;

    let wrong_password = app.login("alice@example.com", "WrongPass123").await;
    let unknown_email = app.login("nobody@example.com", PASSWORD).await;

    assert_eq!(401, wrong_password.status().as_u16());
    assert_eq!(401, unknown_email.status().as_u16());

    let a: Value = wrong_password.json().await.unwrap();
    let b: Value = unknown_email.json().await.unwrap();
    assert_eq!(a["code"], "INVALID_CREDENTIALS");
    assert_eq!(a["code"], b["code"]);
    assert_eq!(a["message"], b["message"]);
}

// --- Protected routes ---

#[tokio::test]
async fn me_accepts_bearer_header() {
    let app = spawn_app();
    let session = app.signed_in().await;

    let response = app.me_with_bearer(&token(&session, "access_token")).await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["id"], session["user"]["id"]);
}

#[tokio::test]
async fn me_accepts_access_cookie() {
    let app = spawn_app();
    let session = app.signed_in().await;

    let response = app
        .client
        .get(&format!("{}/api/me", app.address))
        .header(COOKIE, format!("accessToken={}", token(&session, "access_token")))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn protected_routes_reject_uniformly() {
    let app = spawn_app();
    let session = app.signed_in().await;

    let missing = app
        .client
        .get(&format!("{}/api/me", app.address))
        .send()
        .await
        .unwrap();
    let garbage = app.me_with_bearer("not-a-token").await;
    let wrong_kind = app.me_with_bearer(&token(&session, "refresh_token")).await;

    let mut messages = Vec::new();
    for response in [missing, garbage, wrong_kind] {
        assert_eq!(401, response.status().as_u16());
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["code"], "UNAUTHENTICATED");
        messages.push(body["message"].clone());
    }
    assert!(messages.windows(2).all(|pair| pair[0] == pair[1]));
}

// --- Refresh ---

#[tokio::test]
async fn refresh_rotates_and_rejects_replay() {
    let app = spawn_app();
    let session = app.signed_in().await;
    let original = token(&session, "refresh_token");

    let response = app.refresh_with_cookie(&original).await;
    assert_eq!(200, response.status().as_u16());
    assert!(set_cookie(&response, "accessToken").is_some());
    assert!(set_cookie(&response, "refreshToken").is_some());

    let rotated: Value = response.json().await.unwrap();
    assert_ne!(token(&rotated, "refresh_token"), original);
    assert_eq!(200, app.me_with_bearer(&token(&rotated, "access_token")).await.status().as_u16());

    let replay = app.refresh_with_cookie(&original).await;
    assert_eq!(401, replay.status().as_u16());
    let body: Value = replay.json().await.unwrap();
    assert_eq!(body["code"], "UNAUTHENTICATED");

    // The rotated token is still the live one.
    let next = app.refresh_with_cookie(&token(&rotated, "refresh_token")).await;
    assert_eq!(200, next.status().as_u16());
}

#[tokio::test]
async fn refresh_accepts_json_body() {
    let app = spawn_app();
    let session = app.signed_in().await;

    let response = app
        .post_json(
            "/auth/refresh",
            &json!({ "refresh_token": token(&session, "refresh_token") }),
        )
        .await;

    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn refresh_without_token_returns_401() {
    let app = spawn_app();

    let response = app
        .client
        .post(&format!("{}/auth/refresh", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn refresh_rejects_access_token() {
    let app = spawn_app();
    let session = app.signed_in().await;

    let response = app.refresh_with_cookie(&token(&session, "access_token")).await;

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn concurrent_refresh_has_single_winner() {
    let app = spawn_app();
    let session = app.signed_in().await;
    let refresh_token = token(&session, "refresh_token");

    let (first, second) = tokio::join!(
        app.refresh_with_cookie(&refresh_token),
        app.refresh_with_cookie(&refresh_token)
    );

    let mut statuses = [first.status().as_u16(), second.status().as_u16()];
    statuses.sort_unstable();
    assert_eq!(statuses, [200, 401]);
}

#[tokio::test]
async fn new_login_supersedes_previous_session() {
    let app = spawn_app();
    let first = app.signed_in().await;

    let second = app.login("alice@example.com", PASSWORD).await;
    assert_eq!(200, second.status().as_u16());

    let response = app.refresh_with_cookie(&token(&first, "refresh_token")).await;
    assert_eq!(401, response.status().as_u16());
}

// --- Logout and password change ---

#[tokio::test]
async fn logout_revokes_refresh_and_clears_cookies() {
    let app = spawn_app();
    let session = app.signed_in().await;
    let access_token = token(&session, "access_token");

    let response = app
        .client
        .post(&format!("{}/api/logout", app.address))
        .header(AUTHORIZATION, format!("Bearer {}", access_token))
        .send()
        .await
        .unwrap();

    assert_eq!(200, response.status().as_u16());
    for name in ["accessToken", "refreshToken"] {
        let cookie = set_cookie(&response, name).expect("missing removal cookie");
        assert_eq!(cookie_value(&cookie), "");
        assert!(cookie.contains("Max-Age=0"));
    }

    let refresh = app.refresh_with_cookie(&token(&session, "refresh_token")).await;
    assert_eq!(401, refresh.status().as_u16());

    // Access tokens are stateless and live out their TTL.
    assert_eq!(200, app.me_with_bearer(&access_token).await.status().as_u16());
}

#[tokio::test]
async fn change_password_requires_current_password() {
    let app = spawn_app();
    let session = app.signed_in().await;

    let response = app
        .client
        .post(&format!("{}/api/change-password", app.address))
        .header(AUTHORIZATION, format!("Bearer {}", token(&session, "access_token")))
        .json(&json!({ "current_password": "WrongPass123", "new_password": "BrandNewPass456" }))
        .send()
        .await
        .unwrap();

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_CREDENTIALS");

    let refresh = app.refresh_with_cookie(&token(&session, "refresh_token")).await;
    assert_eq!(200, refresh.status().as_u16());
}

#[tokio::test]
async fn change_password_ends_session() {
    let app = spawn_app();
    let session = app.signed_in().await;

    let response = app
        .client
        .post(&format!("{}/api/change-password", app.address))
        .header(AUTHORIZATION, format!("Bearer {}", token(&session, "access_token")))
        .json(&json!({ "current_password": PASSWORD, "new_password": "BrandNewPass456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());

    let refresh = app.refresh_with_cookie(&token(&session, "refresh_token")).await;
    assert_eq!(401, refresh.status().as_u16());

    assert_eq!(401, app.login("alice@example.com", PASSWORD).await.status().as_u16());
    assert_eq!(200, app.login("alice@example.com", "BrandNewPass456").await.status().as_u16());
}

// --- Store failures ---

/// A store whose calls never complete
struct StalledStore;

#[async_trait::async_trait]
impl CredentialStore for StalledStore {
    async fn create_account(&self, _account: NewAccount) -> Result<Account, StoreError> {
        std::future::pending().await
    }

    async fn find_account_by_id(&self, _id: Uuid) -> Result<Account, StoreError> {
        std::future::pending().await
    }

    async fn find_account_by_email(&self, _email: &str) -> Result<Account, StoreError> {
        std::future::pending().await
    }

    async fn set_fingerprint(
        &self,
        _id: Uuid,
        _fingerprint: Option<&Fingerprint>,
    ) -> Result<(), StoreError> {
        std::future::pending().await
    }

    async fn swap_fingerprint(
        &self,
        _id: Uuid,
        _current: &Fingerprint,
        _next: &Fingerprint,
    ) -> Result<FingerprintSwap, StoreError> {
        std::future::pending().await
    }

    async fn update_password(&self, _id: Uuid, _password_hash: &str) -> Result<(), StoreError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn stalled_store_returns_503() {
    let app = spawn_app_with(Arc::new(StalledStore), Duration::from_millis(100));

    let login = app.login("alice@example.com", PASSWORD).await;
    assert_eq!(503, login.status().as_u16());
    let body: Value = login.json().await.unwrap();
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");

    let register = app.register("alice@example.com", PASSWORD).await;
    assert_eq!(503, register.status().as_u16());
}
