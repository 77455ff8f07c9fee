pub mod chat;
pub mod dashboard;
pub mod events;
pub mod functions;
pub mod notifications;
pub mod subscriptions;
