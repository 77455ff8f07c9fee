pub mod activity_logs;
pub mod channel_messages;
pub mod channels;
pub mod dm;
pub mod notification_preferences;
pub mod notifications;
pub mod project_statuses;
pub mod projects;
pub mod subscriptions;
pub mod tasks;
pub mod types;
pub mod users;
pub mod workspace_members;
pub mod workspaces;

use sqlx::{PgPool, Postgres, Transaction, migrate::MigrateError, postgres::PgPoolOptions};

pub type Tx<'a> = Transaction<'a, Postgres>;

pub async fn migrate(pool: &PgPool) -> Result<(), MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}
