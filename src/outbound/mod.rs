//! Adapters behind the ports
pub mod events;
#[cfg(feature = "test-support")]
pub mod memory;
pub mod postgres;
pub mod rate_limit;

pub use events::{LogPublisher, NatsPublisher};
pub use postgres::PgStore;
pub use rate_limit::{InMemoryRateLimiter, RedisRateLimiter};
