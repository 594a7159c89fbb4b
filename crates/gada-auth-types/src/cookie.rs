//! Cookie builders for the refresh token.
//!
//! The refresh token only travels in an HttpOnly cookie scoped to
//! [`REFRESH_COOKIE_PATH`]; it is never put in a response body.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

/// Cookie name for the refresh token.
pub const GADA_REFRESH_TOKEN: &str = "gada_refresh_token";

/// Path the refresh cookie is scoped to (login, refresh and logout routes).
pub const REFRESH_COOKIE_PATH: &str = "/auth/token";

/// Refresh-token lifetime and cookie Max-Age in seconds (7 days).
pub const REFRESH_TOKEN_TTL_SECS: i64 = 604_800;

/// Deployment-dependent cookie attributes.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    /// `Domain` attribute; host-only cookie when `None`.
    pub domain: Option<String>,
    /// `Secure` attribute. Only disable for plain-HTTP local development.
    pub secure: bool,
}

fn refresh_cookie(value: String, max_age: Duration, settings: &CookieSettings) -> Cookie<'static> {
    let mut builder = Cookie::build((GADA_REFRESH_TOKEN, value))
        .path(REFRESH_COOKIE_PATH)
        .max_age(max_age)
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::Lax);
    if let Some(domain) = &settings.domain {
        builder = builder.domain(domain.clone());
    }
    builder.build()
}

/// Set the refresh-token cookie on the jar.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use gada_auth_types::cookie::{set_refresh_token_cookie, CookieSettings, GADA_REFRESH_TOKEN};
///
/// let settings = CookieSettings { domain: Some("example.com".to_string()), secure: true };
/// let jar = set_refresh_token_cookie(CookieJar::new(), "refresh_value".to_string(), &settings);
/// let cookie = jar.get(GADA_REFRESH_TOKEN).unwrap();
/// assert_eq!(cookie.path(), Some("/auth/token"));
/// assert_eq!(cookie.domain(), Some("example.com"));
/// assert_eq!(cookie.max_age(), Some(time::Duration::seconds(604800)));
/// assert!(cookie.http_only().unwrap_or(false));
/// assert!(cookie.secure().unwrap_or(false));
/// ```
pub fn set_refresh_token_cookie(jar: CookieJar, value: String, settings: &CookieSettings) -> CookieJar {
    jar.add(refresh_cookie(
        value,
        Duration::seconds(REFRESH_TOKEN_TTL_SECS),
        settings,
    ))
}

/// Clear the refresh-token cookie by setting Max-Age to 0.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use gada_auth_types::cookie::{
///     clear_refresh_token_cookie, set_refresh_token_cookie, CookieSettings, GADA_REFRESH_TOKEN,
/// };
///
/// let settings = CookieSettings { domain: None, secure: true };
/// let jar = set_refresh_token_cookie(CookieJar::new(), "r".to_string(), &settings);
/// let jar = clear_refresh_token_cookie(jar, &settings);
/// let refresh = jar.get(GADA_REFRESH_TOKEN).unwrap();
/// assert_eq!(refresh.value(), "");
/// assert_eq!(refresh.max_age(), Some(time::Duration::ZERO));
/// ```
pub fn clear_refresh_token_cookie(jar: CookieJar, settings: &CookieSettings) -> CookieJar {
    jar.add(refresh_cookie(String::new(), Duration::ZERO, settings))
}
