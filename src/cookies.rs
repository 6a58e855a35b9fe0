/// Session cookies
///
/// Tokens travel as two cookies, `accessToken` and `refreshToken`, neither
/// readable by page scripts. Whether they require HTTPS is configuration.

use actix_web::cookie::time::Duration;
use actix_web::cookie::{Cookie, SameSite};

use crate::auth::TokenPair;
use crate::configuration::CookieSettings;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

fn session_cookie(
    name: &'static str,
    value: String,
    max_age_seconds: i64,
    settings: &CookieSettings,
) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(max_age_seconds))
        .finish()
}

/// Cookies carrying both halves of a freshly minted pair
pub fn pair_cookies(pair: &TokenPair, settings: &CookieSettings) -> [Cookie<'static>; 2] {
    [
        session_cookie(
            ACCESS_TOKEN_COOKIE,
            pair.access_token.clone(),
            pair.access_expires_in,
            settings,
        ),
        session_cookie(
            REFRESH_TOKEN_COOKIE,
            pair.refresh_token.clone(),
            pair.refresh_expires_in,
            settings,
        ),
    ]
}

/// Cookies that make the client drop both tokens
pub fn removal_cookies(settings: &CookieSettings) -> [Cookie<'static>; 2] {
    [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE].map(|name| {
        let mut cookie = session_cookie(name, String::new(), 0, settings);
        cookie.make_removal();
        cookie
    })
}
