/// Authentication Routes
///
/// Registration, login, token refresh, and the protected session endpoints.
/// Every successful login or refresh sets the `accessToken` and
/// `refreshToken` cookies and also returns the pair in the body.

use actix_web::{web, HttpRequest, HttpResponse, HttpResponseBuilder};
use serde::{Deserialize, Serialize};

use crate::auth::{SessionService, TokenPair};
use crate::configuration::CookieSettings;
use crate::cookies::{pair_cookies, removal_cookies, REFRESH_TOKEN_COOKIE};
use crate::error::{AppError, RejectReason};
use crate::store::AccountIdentity;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body form of a refresh for clients that cannot keep cookies
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Token response returned by login and refresh
#[derive(Serialize)]
pub struct AuthResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<AccountIdentity>,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

impl AuthResponse {
    fn new(user: Option<AccountIdentity>, pair: TokenPair) -> Self {
        Self {
            user,
            expires_in: pair.access_expires_in,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer",
        }
    }
}

fn with_session_cookies(
    mut builder: HttpResponseBuilder,
    pair: &TokenPair,
    cookies: &CookieSettings,
) -> HttpResponseBuilder {
    for cookie in pair_cookies(pair, cookies) {
        builder.cookie(cookie);
    }
    builder
}

/// POST /auth/register
///
/// # Errors
/// - 400: blank email or name, password out of bounds
/// - 409: email already registered
pub async fn register(
    form: web::Json<RegisterRequest>,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let identity = sessions
        .register(&form.email, &form.name, &form.password)
        .await?;

    Ok(HttpResponse::Created().json(identity))
}

/// POST /auth/login
///
/// # Errors
/// - 401 `INVALID_CREDENTIALS`: unknown email or wrong password, which are
///   indistinguishable
/// - 503: credential store unavailable
pub async fn login(
    form: web::Json<LoginRequest>,
    sessions: web::Data<SessionService>,
    cookies: web::Data<CookieSettings>,
) -> Result<HttpResponse, AppError> {
    let (identity, pair) = sessions.login(&form.email, &form.password).await?;

    let mut response = with_session_cookies(HttpResponse::Ok(), &pair, &cookies);
    Ok(response.json(AuthResponse::new(Some(identity), pair)))
}

/// POST /auth/refresh
///
/// Reads the refresh token from the `refreshToken` cookie, or from a JSON
/// body when no cookie is present. A token can be exchanged only once.
///
/// # Errors
/// - 401 `UNAUTHENTICATED`: missing, invalid, expired, reused or revoked
/// - 503: credential store unavailable
pub async fn refresh(
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    sessions: web::Data<SessionService>,
    cookies: web::Data<CookieSettings>,
) -> Result<HttpResponse, AppError> {
    let presented = req
        .cookie(REFRESH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
        .or_else(|| body.map(|body| body.into_inner().refresh_token))
        .ok_or(RejectReason::MissingToken)?;

    let pair = sessions.rotate(&presented).await?;

    let mut response = with_session_cookies(HttpResponse::Ok(), &pair, &cookies);
    Ok(response.json(AuthResponse::new(None, pair)))
}

/// GET /api/me
pub async fn me(identity: web::ReqData<AccountIdentity>) -> HttpResponse {
    HttpResponse::Ok().json(identity.into_inner())
}

/// POST /api/logout
///
/// Ends the session everywhere and clears both cookies. Access tokens
/// already issued stay valid until they expire.
pub async fn logout(
    identity: web::ReqData<AccountIdentity>,
    sessions: web::Data<SessionService>,
    cookies: web::Data<CookieSettings>,
) -> Result<HttpResponse, AppError> {
    sessions.revoke(identity.id).await?;

    let mut response = HttpResponse::Ok();
    for cookie in removal_cookies(&cookies) {
        response.cookie(cookie);
    }
    Ok(response.json(serde_json::json!({ "message": "Logged out" })))
}

/// POST /api/change-password
///
/// # Errors
/// - 400: new password out of bounds
/// - 401 `INVALID_CREDENTIALS`: current password is wrong
pub async fn change_password(
    identity: web::ReqData<AccountIdentity>,
    form: web::Json<ChangePasswordRequest>,
    sessions: web::Data<SessionService>,
    cookies: web::Data<CookieSettings>,
) -> Result<HttpResponse, AppError> {
    sessions
        .change_password(identity.id, &form.current_password, &form.new_password)
        .await?;

    let mut response = HttpResponse::Ok();
    for cookie in removal_cookies(&cookies) {
        response.cookie(cookie);
    }
    Ok(response.json(serde_json::json!({ "message": "Password changed" })))
}
