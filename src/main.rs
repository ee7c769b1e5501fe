use roost_api::app;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, ROOST_API_PORT, etc.
    let _ = dotenvy::dotenv();

    let config = roost_api::config::config();

    tracing_subscriber::fmt::init();
    tracing::info!("Starting Roost API in {:?} mode", config.environment);

    // Best effort: a missing database still serves /health as degraded
    if let Err(e) = roost_api::database::Database::migrate().await {
        tracing::warn!("Skipping migrations: {}", e);
    }

    let app = app::app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("ROOST_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("🚀 Roost API server listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}
