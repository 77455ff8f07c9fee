use std::sync::Arc;

use axum::{Router, middleware::from_fn_with_state, routing::get};
use services::{
    chat::ChatService, events::EventHub, functions::FunctionsClient,
    notifications::NotificationService, subscriptions::SubscriptionService,
};
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod auth;
pub mod config;
pub mod routes;

pub use config::Config;

struct AppStateInner {
    pool: PgPool,
    config: Config,
    events: EventHub,
    chat: ChatService,
    notifications: NotificationService,
    subscriptions: SubscriptionService,
    functions: FunctionsClient,
}

/// Shared handle cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let events = EventHub::new();
        let functions = FunctionsClient::new(config.functions_base_url.clone());
        let chat = ChatService::new(events.clone());
        let notifications = NotificationService::new(events.clone(), functions.clone());
        let subscriptions = SubscriptionService::new();

        Self {
            inner: Arc::new(AppStateInner {
                pool,
                config,
                events,
                chat,
                notifications,
                subscriptions,
                functions,
            }),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn events(&self) -> &EventHub {
        &self.inner.events
    }

    pub fn chat(&self) -> &ChatService {
        &self.inner.chat
    }

    pub fn notifications(&self) -> &NotificationService {
        &self.inner.notifications
    }

    pub fn subscriptions(&self) -> &SubscriptionService {
        &self.inner.subscriptions
    }

    pub fn functions(&self) -> &FunctionsClient {
        &self.inner.functions
    }
}

async fn health() -> &'static str {
    "ok"
}

/// Everything under `/api` requires a valid bearer token; the health probe
/// does not.
pub fn app(state: AppState) -> Router {
    let api = routes::router().layer(from_fn_with_state(state.clone(), auth::authenticate));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Route patterns are validated when the router is assembled; a bad
    // pattern or a conflicting merge panics here. The lazy pool spawns its
    // maintenance task, so a runtime is needed even without connecting.
    #[tokio::test]
    async fn router_assembles() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/placeholder")
            .expect("lazy pool");
        let config = Config {
            database_url: "postgres://localhost/placeholder".to_string(),
            listen_addr: "127.0.0.1:0".to_string(),
            jwt_secret: "secret".to_string(),
            functions_base_url: "http://localhost:9000/functions".to_string(),
        };
        let _ = app(AppState::new(pool, config));
    }
}
