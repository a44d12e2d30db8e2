//! Event publishers
use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::events::DomainEvent;
use crate::ports::EventPublisher;

/// Publishes domain events as JSON on NATS.
#[derive(Clone)]
pub struct NatsPublisher {
    client: async_nats::Client,
}

impl NatsPublisher {
    pub fn new(client: async_nats::Client) -> Self { Self { client } }
}

#[async_trait]
impl EventPublisher for NatsPublisher {
    async fn publish(&self, event: DomainEvent) {
        let subject = event.subject();
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(subject, error = %err, "failed to encode event");
                return;
            }
        };
        if let Err(err) = self.client.publish(subject.to_string(), payload.into()).await {
            warn!(subject, error = %err, "failed to publish event");
        }
    }
}

/// Used when no NATS server is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, event: DomainEvent) {
        info!(subject = event.subject(), ?event, "domain event");
    }
}
