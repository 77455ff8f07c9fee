use axum::Router;

use crate::AppState;

pub mod chat;
pub mod dashboard;
pub mod dm;
pub mod error;
pub mod members;
pub mod notifications;
pub mod projects;
pub mod subscriptions;
pub mod tasks;
pub mod workspaces;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(workspaces::router())
        .merge(members::router())
        .merge(projects::router())
        .merge(tasks::router())
        .merge(dashboard::router())
        .merge(chat::router())
        .merge(dm::router())
        .merge(notifications::router())
        .merge(subscriptions::router())
}
