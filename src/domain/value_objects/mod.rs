//! Value Objects for the cart and coupon domain

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Authenticated customer identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    pub fn new(id: Uuid) -> Self { Self(id) }
    pub fn as_uuid(&self) -> Uuid { self.0 }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Opaque token carried by the guest cart cookie
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestToken(String);

impl GuestToken {
    const MAX_LEN: usize = 64;

    pub fn mint() -> Self { Self(Uuid::new_v4().to_string()) }

    /// Accepts cookie-safe tokens only: ASCII alphanumerics, `-` and `_`.
    pub fn parse(value: &str) -> Result<Self, GuestTokenError> {
        let value = value.trim();
        if value.is_empty() { return Err(GuestTokenError::Empty); }
        if value.len() > Self::MAX_LEN { return Err(GuestTokenError::TooLong); }
        if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(GuestTokenError::InvalidCharacter);
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for GuestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum GuestTokenError { Empty, TooLong, InvalidCharacter }
impl std::error::Error for GuestTokenError {}
impl fmt::Display for GuestTokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "guest token empty"),
            Self::TooLong => write!(f, "guest token too long"),
            Self::InvalidCharacter => write!(f, "guest token has invalid characters"),
        }
    }
}

/// The identity that owns a set of cart lines.
///
/// A line belongs to exactly one scope at a time.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CartScope {
    Guest(GuestToken),
    User(UserId),
}

impl CartScope {
    pub fn is_authenticated(&self) -> bool { matches!(self, Self::User(_)) }

    pub fn guest_token(&self) -> Option<&GuestToken> {
        match self { Self::Guest(token) => Some(token), Self::User(_) => None }
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self { Self::User(id) => Some(*id), Self::Guest(_) => None }
    }

    /// Stable string form, used as the public cart id and as a rate-limit key.
    pub fn key(&self) -> String {
        match self {
            Self::Guest(token) => format!("guest:{token}"),
            Self::User(id) => format!("user:{id}"),
        }
    }
}

/// Coupon code, normalised to trimmed upper-case
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CouponCode(String);

impl CouponCode {
    pub fn new(value: &str) -> Option<Self> {
        let value = value.trim().to_uppercase();
        if value.is_empty() { None } else { Some(Self(value)) }
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Rounds to currency minor-unit precision (2 dp, half away from zero).
/// The result always carries a scale of 2 so it renders as `15.00`.
pub fn round_currency(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Truncates to 2 decimal places, for amounts that must not grow when rounded.
pub fn floor_currency(amount: Decimal) -> Decimal {
    let mut floored = amount.round_dp_with_strategy(2, RoundingStrategy::ToZero);
    floored.rescale(2);
    floored
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_coupon_code_normalised() {
        assert_eq!(CouponCode::new("  welcome20 ").unwrap().as_str(), "WELCOME20");
        assert!(CouponCode::new("   ").is_none());
    }

    #[test]
    fn test_guest_token_parse() {
        let minted = GuestToken::mint();
        assert_eq!(GuestToken::parse(minted.as_str()).unwrap(), minted);
        assert_eq!(GuestToken::parse(""), Err(GuestTokenError::Empty));
        assert_eq!(GuestToken::parse("abc;def"), Err(GuestTokenError::InvalidCharacter));
        assert_eq!(GuestToken::parse(&"a".repeat(65)), Err(GuestTokenError::TooLong));
    }

    #[test]
    fn test_scope_key() {
        let id = Uuid::nil();
        assert_eq!(CartScope::User(UserId::new(id)).key(), format!("user:{id}"));
        let token = GuestToken::parse("abc").unwrap();
        assert_eq!(CartScope::Guest(token).key(), "guest:abc");
    }

    #[test]
    fn test_round_currency() {
        assert_eq!(round_currency(dec!(16.005)), dec!(16.01));
        assert_eq!(round_currency(dec!(3.3333)), dec!(3.33));
        assert_eq!(round_currency(dec!(15)).to_string(), "15.00");
    }

    #[test]
    fn test_floor_currency() {
        assert_eq!(floor_currency(dec!(10.005)), dec!(10.00));
        assert_eq!(floor_currency(dec!(7)).to_string(), "7.00");
    }
}
