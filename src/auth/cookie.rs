/// Refresh Token Cookie
///
/// Helpers for the flows that deliver the refresh token in a cookie.

use actix_web::cookie::time::Duration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::HttpRequest;

use crate::configuration::SessionSettings;

/// httpOnly cookie carrying `token`, living `max_age_seconds`
pub fn refresh_cookie(settings: &SessionSettings, token: &str, max_age_seconds: i64) -> Cookie<'static> {
    Cookie::build(settings.cookie_name.clone(), token.to_string())
        .path("/")
        .http_only(true)
        .secure(settings.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(max_age_seconds))
        .finish()
}

/// Cookie that makes the browser drop its refresh token
pub fn cleared_refresh_cookie(settings: &SessionSettings) -> Cookie<'static> {
    refresh_cookie(settings, "", 0)
}

/// Refresh token from the request cookie, if present and non-empty
pub fn read_refresh_cookie(req: &HttpRequest, settings: &SessionSettings) -> Option<String> {
    req.cookie(&settings.cookie_name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}
