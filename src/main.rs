//! Souq Cart - storefront cart and coupon service

use std::sync::Arc;

use anyhow::Result;
use souq_cart::{
    http::{self, AppState, CookieSettings},
    outbound::{InMemoryRateLimiter, LogPublisher, NatsPublisher, PgStore, RedisRateLimiter},
    ports::{EventPublisher, RateLimiter},
    services::{CartIdentityResolver, CartService, CouponService},
    Config,
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = Config::from_env()?;

    let db = PgPoolOptions::new().max_connections(config.database_max_connections).connect(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&db).await?;
    let store = Arc::new(PgStore::new(db));

    let events: Arc<dyn EventPublisher> = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Arc::new(NatsPublisher::new(client)),
            Err(err) => {
                tracing::warn!(error = %err, "NATS unavailable, logging events instead");
                Arc::new(LogPublisher)
            }
        },
        None => Arc::new(LogPublisher),
    };

    let limiter: Arc<dyn RateLimiter> = match &config.redis_url {
        Some(url) => Arc::new(RedisRateLimiter::new(
            redis::Client::open(url.as_str())?,
            "souq_cart:coupon_validate",
            config.coupon_rate_limit_max,
            config.coupon_rate_limit_window,
        )),
        None => Arc::new(InMemoryRateLimiter::new(config.coupon_rate_limit_max, config.coupon_rate_limit_window)),
    };

    let state = AppState {
        carts: CartService::new(store.clone(), store.clone(), events.clone()),
        coupons: CouponService::new(store.clone(), events, config.currency.clone()),
        identity: CartIdentityResolver::new(store),
        limiter,
        cookies: CookieSettings { max_age: config.cart_cookie_max_age, secure: config.cookie_secure },
    };

    tracing::info!("🚀 Souq Cart listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?, http::router(state)).await?;
    Ok(())
}
