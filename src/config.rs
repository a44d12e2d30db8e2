//! Service configuration, read from the environment (after `.env`).

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub port: u16,
    pub nats_url: Option<String>,
    pub redis_url: Option<String>,
    pub currency: String,
    pub cart_cookie_max_age: Duration,
    pub cookie_secure: bool,
    pub coupon_rate_limit_max: u32,
    pub coupon_rate_limit_window: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
            port: parse_or("PORT", 8083)?,
            nats_url: env::var("NATS_URL").ok().filter(|v| !v.is_empty()),
            redis_url: env::var("REDIS_URL").ok().filter(|v| !v.is_empty()),
            currency: env::var("CURRENCY").unwrap_or_else(|_| "AED".to_string()),
            cart_cookie_max_age: Duration::from_secs(parse_or::<u64>("CART_COOKIE_MAX_AGE_DAYS", 30)? * 24 * 60 * 60),
            cookie_secure: parse_or("COOKIE_SECURE", false)?,
            coupon_rate_limit_max: parse_or("COUPON_RATE_LIMIT_MAX", 10)?,
            coupon_rate_limit_window: Duration::from_secs(parse_or("COUPON_RATE_LIMIT_WINDOW_SECS", 60)?),
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().with_context(|| format!("invalid value for {key}: {raw:?}")),
        Err(_) => Ok(default),
    }
}
