//! HTTP API handlers for Kara.
//!
//! Every handler returns [`crate::error::Result`]; failures render as
//! `(status, {"error": message})` through `KaraError`'s `IntoResponse`.
//! Request bodies and API keys are never logged.

use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post, put},
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::assistant::{DraftOutcome, HealthTip};
use crate::error::{KaraError, Result};
use crate::geocode::{MapMarker, map_markers};
use crate::model::{
    AnonymousSession, AqiReading, AqiResponse, Complaint, CreatedResponse, FeedQuery,
    NewComplaint, StatusUpdate, my_reports,
};
use crate::state::AppState;

/// Build the full route table over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/session", post(create_session))
        .route("/complaints", post(create_complaint).get(list_complaints))
        .route("/complaints/stream", get(stream_complaints))
        .route("/complaints/map", get(complaint_map))
        .route("/complaints/draft", post(draft_complaint))
        .route("/complaints/:id/upvote", post(upvote_complaint))
        .route("/complaints/:id/status", put(update_status))
        .route("/aqi", get(get_aqi))
        .route("/aqi/tips", post(post_health_tips))
        .route("/health", get(health_check))
        .with_state(state)
}

/// POST /session - Start an anonymous session.
///
/// # Response
///
/// ```json
/// { "user_id": "2f1c..." }
/// ```
#[instrument(skip(state))]
pub async fn create_session(State(state): State<AppState>) -> Result<Json<AnonymousSession>> {
    let session = state.identity.sign_in_anonymously().await?;
    Ok(Json(session))
}

/// POST /complaints - File a new complaint.
///
/// # Request Body
///
/// ```json
/// {
///     "user_id": "u1",
///     "description": "Heavy smoke near junction",
///     "location": "MG Road",
///     "category": "Vehicular Smoke"
/// }
/// ```
///
/// # Response
///
/// `201 Created` with `{"id": "..."}`. Missing fields give `400`, an
/// unreachable store `503`.
#[instrument(skip_all)]
pub async fn create_complaint(
    State(state): State<AppState>,
    Json(complaint): Json<NewComplaint>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    match state.repository.create_complaint(complaint).await {
        Ok(id) => {
            info!(id = %id, "Complaint filed");
            Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
        }
        Err(e) => {
            warn!(error = %e, "Failed to file complaint");
            Err(e)
        }
    }
}

/// GET /complaints - The complaint feed, newest first.
///
/// # Query Parameters
///
/// - `user_id` (optional): Only complaints filed by this user
#[instrument(skip(state))]
pub async fn list_complaints(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<Complaint>>> {
    let feed = state.repository.list_feed().await?;

    let feed = match &query.user_id {
        Some(user_id) => my_reports(&feed, user_id),
        None => feed,
    };
    debug!(count = feed.len(), "Feed listed");
    Ok(Json(feed))
}

/// GET /complaints/map - One marker per complaint, placed by location hash.
#[instrument(skip(state))]
pub async fn complaint_map(State(state): State<AppState>) -> Result<Json<Vec<MapMarker>>> {
    let feed = state.repository.list_feed().await?;
    Ok(Json(map_markers(&feed, state.config.center)))
}

enum FeedEvent {
    Snapshot(Vec<Complaint>),
    Failed(String),
}

/// GET /complaints/stream - Live feed over Server-Sent Events.
///
/// Sends a `feed` event carrying the full JSON snapshot on connect and after
/// every write. If the store fails, a single `error` event is sent and the
/// stream ends. The subscription is released when the client disconnects.
pub async fn stream_complaints(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let error_tx = tx.clone();

    let subscription = state.repository.subscribe_to_feed(
        move |complaints| {
            let _ = tx.send(FeedEvent::Snapshot(complaints));
        },
        move |e: KaraError| {
            let _ = error_tx.send(FeedEvent::Failed(e.user_message()));
        },
    );
    info!("Feed stream opened");

    let stream = async_stream::stream! {
        let _subscription = subscription;

        while let Some(event) = rx.recv().await {
            match event {
                FeedEvent::Snapshot(complaints) => {
                    match Event::default().event("feed").json_data(&complaints) {
                        Ok(event) => yield Ok(event),
                        Err(e) => warn!(error = %e, "Failed to encode feed snapshot"),
                    }
                }
                FeedEvent::Failed(message) => {
                    yield Ok(Event::default().event("error").data(message));
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// POST /complaints/:id/upvote - Add one upvote.
///
/// Returns `204 No Content`, or `404` for an unknown id.
#[instrument(skip(state))]
pub async fn upvote_complaint(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.repository.increment_upvote(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /complaints/:id/status - Move a complaint through moderation.
///
/// # Request Body
///
/// ```json
/// { "status": "In Review" }
/// ```
#[instrument(skip(state, update))]
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> Result<StatusCode> {
    state.repository.set_status(&id, update.status).await?;
    info!(id = %id, status = update.status.as_str(), "Complaint status updated");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /complaints/draft - AI summary and formal draft for a report form.
///
/// # Response
///
/// One of:
///
/// ```json
/// { "state": "ready", "summary": "...", "draft": "..." }
/// { "state": "invalid_response", "message": "..." }
/// { "state": "unavailable", "message": "..." }
/// ```
///
/// Missing form fields give `400`.
#[instrument(skip_all)]
pub async fn draft_complaint(
    State(state): State<AppState>,
    Json(form): Json<NewComplaint>,
) -> Result<Json<DraftOutcome>> {
    let outcome = state.assistant.complaint_draft(&form).await?;
    Ok(Json(outcome))
}

/// GET /aqi - Current reading for the configured city.
///
/// Includes the category, its label and display colors. Upstream failures
/// give `502`.
#[instrument(skip(state))]
pub async fn get_aqi(State(state): State<AppState>) -> Result<Json<AqiResponse>> {
    match state.aqi.fetch_reading().await {
        Ok(reading) => {
            info!(city = %reading.city, aqi = reading.aqi, "AQI fetched");
            Ok(Json(AqiResponse::from(reading)))
        }
        Err(e) => {
            warn!(error = %e, "AQI fetch error");
            Err(e)
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TipsResponse {
    pub tips: Vec<HealthTip>,
}

/// POST /aqi/tips - Health tips for a reading.
///
/// Always `200`; a failed AI request yields one explanatory tip.
#[instrument(skip_all)]
pub async fn post_health_tips(
    State(state): State<AppState>,
    Json(reading): Json<AqiReading>,
) -> Json<TipsResponse> {
    let tips = state.assistant.health_tips(&reading).await;
    debug!(aqi = reading.aqi, count = tips.len(), "Health tips generated");
    Json(TipsResponse { tips })
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}
