//! Cart identity resolution
//!
//! Decides which scope a request reads and writes: the signed-in user, the
//! guest cookie, or a freshly minted guest token.

use std::sync::Arc;

use tracing::debug;

use crate::domain::value_objects::{CartScope, GuestToken};
use crate::ports::SessionResolver;
use crate::StoreResult;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CartIdentity {
    pub scope: CartScope,
    /// The guest token was minted for this request and must be set as a cookie.
    pub fresh_guest: bool,
    /// Guest cookie seen on an authenticated request, kept for migration.
    pub pending_guest: Option<GuestToken>,
    /// A session cookie was sent but did not resolve; the caller clears it.
    pub clear_session: bool,
}

impl CartIdentity {
    pub fn is_authenticated(&self) -> bool { self.scope.is_authenticated() }
}

#[derive(Clone)]
pub struct CartIdentityResolver {
    sessions: Arc<dyn SessionResolver>,
}

impl CartIdentityResolver {
    pub fn new(sessions: Arc<dyn SessionResolver>) -> Self { Self { sessions } }

    pub async fn resolve(&self, session_token: Option<&str>, guest_cookie: Option<&str>) -> StoreResult<CartIdentity> {
        let guest = guest_cookie.and_then(|raw| GuestToken::parse(raw).ok());

        let mut clear_session = false;
        if let Some(token) = session_token.map(str::trim).filter(|t| !t.is_empty()) {
            match self.sessions.resolve(token).await? {
                Some(user_id) => {
                    return Ok(CartIdentity {
                        scope: CartScope::User(user_id),
                        fresh_guest: false,
                        pending_guest: guest,
                        clear_session: false,
                    });
                }
                None => {
                    debug!("session token did not resolve, falling back to guest cart");
                    clear_session = true;
                }
            }
        }

        let (token, fresh_guest) = match guest {
            Some(token) => (token, false),
            None => (GuestToken::mint(), true),
        };
        Ok(CartIdentity { scope: CartScope::Guest(token), fresh_guest, pending_guest: None, clear_session })
    }
}
