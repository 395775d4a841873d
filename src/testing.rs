//! Test helpers: local stand-ins for upstream APIs.

use std::sync::Arc;

use axum::Router;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use crate::config::Config;
use crate::state::AppState;
use crate::storage::SqliteStore;

/// Serve `app` on an ephemeral local port and return its base URL.
pub(crate) async fn spawn_stub(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// A `generateContent` response envelope wrapping `text`.
pub(crate) fn gemini_reply(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
}

/// A successful WAQI city feed.
pub(crate) fn waqi_feed(aqi: i64) -> Value {
    json!({
        "status": "ok",
        "data": {
            "aqi": aqi,
            "city": {"name": "Bengaluru"},
            "iaqi": {"pm25": {"v": aqi}, "pm10": {"v": 40}, "o3": {"v": 8.5}}
        }
    })
}

/// App state on an in-memory store whose upstreams all point at `base_url`.
pub(crate) async fn app_state(base_url: &str) -> AppState {
    let config = Config {
        gemini_api_key: "test-key".to_string(),
        gemini_base_url: base_url.to_string(),
        gemini_model: "test-model".to_string(),
        waqi_base_url: base_url.to_string(),
        open_meteo_base_url: base_url.to_string(),
        database_url: "sqlite::memory:".to_string(),
        ..Config::default()
    };
    let store = SqliteStore::new(&config.database_url).await.unwrap();
    AppState::new(config, Arc::new(store))
}
