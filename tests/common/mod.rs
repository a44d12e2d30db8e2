//! Router harness over the in-memory adapters.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{self, Body},
    http::{header, Method, Request, Response, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::Value;
use souq_cart::{
    http::{self, AppState, CookieSettings},
    outbound::{memory::{MemoryStore, RecordingPublisher}, InMemoryRateLimiter},
    services::{CartIdentityResolver, CartService, CouponService},
    UserId,
};
use tower::ServiceExt;
use uuid::Uuid;

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub events: Arc<RecordingPublisher>,
    router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub set_cookies: Vec<String>,
    pub body: Value,
}

impl TestResponse {
    /// Value of a cookie set by the response, if any.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.set_cookies
            .iter()
            .filter_map(|raw| cookie::Cookie::parse(raw.as_str()).ok())
            .find(|c| c.name() == name)
            .map(|c| c.value().to_string())
    }
}

impl TestApp {
    pub fn new() -> Self { Self::with_rate_limit(100) }

    pub fn with_rate_limit(max: u32) -> Self {
        let store = Arc::new(MemoryStore::default());
        let events = Arc::new(RecordingPublisher::default());
        let state = AppState {
            carts: CartService::new(store.clone(), store.clone(), events.clone()),
            coupons: CouponService::new(store.clone(), events.clone(), "AED"),
            identity: CartIdentityResolver::new(store.clone()),
            limiter: Arc::new(InMemoryRateLimiter::new(max, Duration::from_secs(60))),
            cookies: CookieSettings::default(),
        };
        Self { store, events, router: http::router(state) }
    }

    /// Creates a live session and returns its token and user.
    pub fn sign_in(&self) -> (String, UserId) {
        let user = UserId::new(Uuid::new_v4());
        let token = format!("session-{}", Uuid::new_v4());
        self.store.add_session(&token, user, Utc::now() + chrono::Duration::hours(1));
        (token, user)
    }

    pub async fn request(&self, method: Method, uri: &str, cookies: &[(&str, &str)], body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if !cookies.is_empty() {
            let cookie = cookies.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("; ");
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };
        let response = self.router.clone().oneshot(request).await.expect("router error during test request");
        read(response).await
    }
}

async fn read(response: Response<Body>) -> TestResponse {
    let status = response.status();
    let set_cookies = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().expect("ascii cookie").to_string())
        .collect();
    let bytes = body::to_bytes(response.into_body(), usize::MAX).await.expect("response body bytes");
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).expect("json response") };
    TestResponse { status, set_cookies, body }
}
