//! Kara - A citizen air-quality and pollution-complaint service.
//!
//! # API Endpoints
//!
//! - `POST /session` - Start an anonymous session
//! - `POST /complaints` - File a complaint
//! - `GET /complaints` - Complaint feed, optionally for one user
//! - `GET /complaints/stream` - Live feed (Server-Sent Events)
//! - `GET /complaints/map` - Map markers
//! - `POST /complaints/draft` - AI summary and draft
//! - `POST /complaints/:id/upvote` - Upvote a complaint
//! - `PUT /complaints/:id/status` - Update moderation status
//! - `GET /aqi` - Current AQI reading
//! - `POST /aqi/tips` - Health tips for a reading
//! - `GET /health` - Health check

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use kara::api::router;
use kara::config::Config;
use kara::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("kara=info".parse()?))
        .init();

    let config = Config::from_env();
    let port = config.port;

    info!(
        port,
        db_url = %config.database_url,
        city = %config.city,
        source = ?config.aqi_source,
        "Starting Kara server"
    );

    let state = AppState::from_config(config).await?;
    info!("Database initialized");

    let app = router(state).layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Kara is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
