use tracing_subscriber::EnvFilter;

use aura_server::config::ServerConfig;

#[tokio::main]
async fn main() {
    let json_logs = std::env::var("AURA_LOG_JSON").is_ok_and(|v| v == "1");
    if json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Aura server starting");

    let config = ServerConfig::load();
    config.validate();
    let listen_addr = config.listen_addr.clone();

    let (app, state) = aura_server::build_app(config);
    aura_server::spawn_sweeper(state.clone());
    aura_server::spawn_event_logger(state.clone());

    let listener = match tokio::net::TcpListener::bind(&listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %listen_addr, error = %e, "Failed to bind");
            std::process::exit(1);
        },
    };
    tracing::info!(
        addr = %listen_addr,
        games = state.game_registry.available_games(),
        "Listening"
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Could not listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutting down");
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
    {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
