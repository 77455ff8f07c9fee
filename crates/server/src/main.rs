use server::{AppState, Config, app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::logging::init("info,server=debug,services=debug");

    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_url).await?;
    db::migrate(&pool).await?;

    let listen_addr = config.listen_addr.clone();
    let state = AppState::new(pool, config);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(%listen_addr, "listening");
    axum::serve(listener, app(state)).await?;

    Ok(())
}
