use clap::Parser;
use std::sync::Arc;

use study_planner::api::{AppState, create_router};
use study_planner::config::CONFIG;
use study_planner::session::{Assistant, ChatService};

#[derive(Parser, Debug)]
#[command(version, about = "Chat relay for Gemini with optional web search")]
struct Args {
    /// Address to listen on (overrides BIND_ADDR)
    #[arg(long)]
    bind: Option<String>,

    /// Directory served at `/` (overrides STATIC_DIR)
    #[arg(long)]
    static_dir: Option<String>,

    /// Enable debug logging (same as APP_DEBUG=True)
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = &*CONFIG;

    let level = if args.debug || config.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    // Initialize tracing subscriber (log records are bridged in as well)
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .init();

    let assistant: Option<Arc<dyn Assistant>> = match ChatService::from_config(config) {
        Ok(service) => Some(Arc::new(service) as Arc<dyn Assistant>),
        Err(e) => {
            tracing::error!("assistant initialization failed: {:#}", e);
            None
        }
    };

    let static_dir = args.static_dir.as_deref().unwrap_or(&config.static_dir);
    let app = create_router(AppState::new(assistant), static_dir);

    let bind = args.bind.as_deref().unwrap_or(&config.bind_addr);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
