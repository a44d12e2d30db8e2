//! Guest cart and session cookies.

use std::time::Duration;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::domain::value_objects::GuestToken;
use crate::services::CartIdentity;

pub const CART_COOKIE: &str = "cart_id";
pub const SESSION_COOKIE: &str = "session_token";

#[derive(Clone, Debug)]
pub struct CookieSettings {
    pub max_age: Duration,
    pub secure: bool,
}

impl Default for CookieSettings {
    fn default() -> Self { Self { max_age: Duration::from_secs(30 * 24 * 60 * 60), secure: false } }
}

impl CookieSettings {
    pub fn set_cart(&self, jar: CookieJar, token: &GuestToken) -> CookieJar {
        let max_age = cookie::time::Duration::seconds(i64::try_from(self.max_age.as_secs()).unwrap_or(i64::MAX));
        jar.add(self.build(CART_COOKIE, token.as_str().to_string(), max_age))
    }

    pub fn clear_cart(&self, jar: CookieJar) -> CookieJar {
        jar.add(self.build(CART_COOKIE, String::new(), cookie::time::Duration::ZERO))
    }

    pub fn clear_session(&self, jar: CookieJar) -> CookieJar {
        jar.add(self.build(SESSION_COOKIE, String::new(), cookie::time::Duration::ZERO))
    }

    /// Cookies implied by how the request's identity was resolved.
    pub fn for_identity(&self, identity: &CartIdentity) -> CookieJar {
        let mut jar = CookieJar::new();
        if identity.fresh_guest {
            if let Some(token) = identity.scope.guest_token() { jar = self.set_cart(jar, token); }
        }
        if identity.clear_session { jar = self.clear_session(jar); }
        jar
    }

    fn build(&self, name: &'static str, value: String, max_age: cookie::time::Duration) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .max_age(max_age)
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .build()
    }
}

/// Guest token and session token sent with the request, surrounding quotes
/// removed.
pub fn request_tokens(jar: &CookieJar) -> (Option<String>, Option<String>) {
    let value = |name| jar.get(name).map(|c| c.value_trimmed().to_string());
    (value(CART_COOKIE), value(SESSION_COOKIE))
}
