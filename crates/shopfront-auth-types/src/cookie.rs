//! Cookie builders for the MFA assurance token.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

/// Cookie name for the MFA assurance token.
pub const MFA_ASSURANCE_COOKIE: &str = "shopfront_mfa";

/// Assurance-token JWT lifetime and cookie Max-Age in seconds (4 hours).
pub const MFA_TOKEN_EXP: u64 = 14400;

/// Set the assurance-token cookie on the jar.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use shopfront_auth_types::cookie::{set_assurance_cookie, MFA_ASSURANCE_COOKIE};
///
/// let jar = CookieJar::new();
/// let jar = set_assurance_cookie(jar, "token_value".to_string(), "shop.example".to_string());
/// let cookie = jar.get(MFA_ASSURANCE_COOKIE).unwrap();
/// assert_eq!(cookie.path(), Some("/"));
/// assert_eq!(cookie.domain(), Some("shop.example"));
/// assert_eq!(cookie.max_age(), Some(time::Duration::seconds(14400)));
/// assert!(cookie.http_only().unwrap_or(false));
/// assert!(cookie.secure().unwrap_or(false));
/// ```
pub fn set_assurance_cookie(jar: CookieJar, value: String, domain: String) -> CookieJar {
    let cookie = Cookie::build((MFA_ASSURANCE_COOKIE, value))
        .path("/")
        .domain(domain)
        .max_age(Duration::seconds(MFA_TOKEN_EXP as i64))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .build();
    jar.add(cookie)
}

/// Clear the assurance cookie by setting Max-Age to 0.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use shopfront_auth_types::cookie::{
///     clear_assurance_cookie, set_assurance_cookie, MFA_ASSURANCE_COOKIE,
/// };
///
/// let jar = CookieJar::new();
/// let jar = set_assurance_cookie(jar, "a".to_string(), "shop.example".to_string());
/// let jar = clear_assurance_cookie(jar, "shop.example".to_string());
/// let cookie = jar.get(MFA_ASSURANCE_COOKIE).unwrap();
/// assert_eq!(cookie.value(), "");
/// assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
/// ```
pub fn clear_assurance_cookie(jar: CookieJar, domain: String) -> CookieJar {
    let cookie = Cookie::build((MFA_ASSURANCE_COOKIE, ""))
        .path("/")
        .domain(domain)
        .max_age(Duration::ZERO)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .build();
    jar.add(cookie)
}
