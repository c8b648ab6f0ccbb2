use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::info;

use huddle_api::standup;
use huddle_api::state::AppStateInner;
use huddle_store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "huddle=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let data_path = std::env::var("HUDDLE_DATA_PATH").unwrap_or_else(|_| "data.json".into());
    let host = std::env::var("HUDDLE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("HUDDLE_PORT")
        .unwrap_or_else(|_| "3200".into())
        .parse()?;
    let base_url = std::env::var("HUDDLE_BASE_URL")
        .unwrap_or_else(|_| format!("http://localhost:{port}"));

    // Open the workspace document
    let store = Store::open(&PathBuf::from(&data_path))?;

    // Shared state
    let state = AppStateInner::new(store, base_url);

    // Standups that were active at last shutdown get their flush
    // timers re-armed.
    standup::resume_pending(&state).map_err(|e| anyhow::anyhow!("resume standups: {e}"))?;

    let app = huddle_api::router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Huddle server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
