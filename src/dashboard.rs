//! Headless dashboard session.
//!
//! [`Dashboard`] holds the state behind one mounted dashboard view: the AQI
//! panel, the health tips and draft slots, the live complaint feed and the
//! form status message. UI event handlers map one-to-one onto its methods.
//!
//! # Lifecycle
//!
//! ```ignore
//! let dashboard = Dashboard::mount(state, Some(session)).await;
//! dashboard.submit(form).await;
//! let feed = dashboard.feed();
//! dashboard.unmount().await;
//! ```
//!
//! Exactly one feed subscription exists per mounted dashboard. It is released
//! by [`Dashboard::unmount`]; mounting again opens a fresh one.

use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tracing::{info, instrument, warn};

use crate::assistant::{
    DRAFT_MISSING_FIELDS_MESSAGE, DraftOutcome, HealthTip, tips_fallback,
};
use crate::error::KaraError;
use crate::feed::FeedSubscription;
use crate::geocode::{MapMarker, map_markers};
use crate::model::{AnonymousSession, AqiReading, Complaint, NewComplaint, my_reports};
use crate::request::{Applied, RequestSlot, RequestState};
use crate::state::AppState;

pub const AQI_UNAVAILABLE_MESSAGE: &str = "Could not fetch AQI data.";
pub const SUBMIT_SUCCESS_MESSAGE: &str = "Report submitted successfully!";
pub const SUBMIT_MISSING_FIELDS_MESSAGE: &str = "Please fill in all fields.";
pub const SUBMIT_FAILED_MESSAGE: &str = "Failed to submit report.";

/// Landing page greeting for a local hour of day (0-23).
pub fn greeting(hour: u32) -> &'static str {
    if hour < 12 {
        "Good Morning. Ready for a Clear Day?"
    } else if hour < 18 {
        "Good Afternoon. Stay Pollution Aware."
    } else {
        "Good Evening. How's the Air Out There?"
    }
}

/// State of the AQI widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum AqiPanel {
    Loading,
    Ready(AqiReading),
    Unavailable(String),
}

#[derive(Default)]
struct Panels {
    tips: RequestSlot<Vec<HealthTip>>,
    draft: RequestSlot<DraftOutcome>,
    message: Option<String>,
    submitting: bool,
}

/// Feed contents as last pushed by the subscription.
#[derive(Debug, Clone, Default)]
struct FeedView {
    complaints: Vec<Complaint>,
    error: Option<String>,
}

/// One mounted dashboard view.
pub struct Dashboard {
    app: AppState,
    session: Option<AnonymousSession>,
    aqi: Mutex<AqiPanel>,
    panels: Mutex<Panels>,
    feed: watch::Receiver<FeedView>,
    subscription: FeedSubscription,
}

impl Dashboard {
    /// Open the feed subscription and load the AQI reading.
    #[instrument(skip_all)]
    pub async fn mount(app: AppState, session: Option<AnonymousSession>) -> Self {
        let (feed_tx, feed_rx) = watch::channel(FeedView::default());
        let error_tx = feed_tx.clone();

        let subscription = app.repository.subscribe_to_feed(
            move |complaints| {
                feed_tx.send_modify(|view| view.complaints = complaints);
            },
            move |e: KaraError| {
                error_tx.send_modify(|view| view.error = Some(e.user_message()));
            },
        );

        let dashboard = Self {
            app,
            session,
            aqi: Mutex::new(AqiPanel::Loading),
            panels: Mutex::new(Panels::default()),
            feed: feed_rx,
            subscription,
        };

        dashboard.refresh_aqi().await;
        info!("Dashboard mounted");
        dashboard
    }

    /// Release the feed subscription.
    pub async fn unmount(self) {
        self.subscription.unsubscribe().await;
        info!("Dashboard unmounted");
    }

    pub fn session(&self) -> Option<&AnonymousSession> {
        self.session.as_ref()
    }

    /// Fetch a fresh AQI reading into the panel.
    pub async fn refresh_aqi(&self) {
        *self.aqi.lock().await = AqiPanel::Loading;

        let panel = match self.app.aqi.fetch_reading().await {
            Ok(reading) => AqiPanel::Ready(reading),
            Err(e) => {
                warn!(error = %e, "AQI fetch error");
                AqiPanel::Unavailable(AQI_UNAVAILABLE_MESSAGE.to_string())
            }
        };
        *self.aqi.lock().await = panel;
    }

    pub async fn aqi(&self) -> AqiPanel {
        self.aqi.lock().await.clone()
    }

    /// Ask for health tips for the current reading.
    ///
    /// Does nothing while no reading is available. Returns whether this
    /// request's result was the one kept.
    pub async fn request_health_tips(&self) -> Option<Applied> {
        let reading = match &*self.aqi.lock().await {
            AqiPanel::Ready(reading) => reading.clone(),
            _ => return None,
        };

        let token = self.panels.lock().await.tips.begin();

        let result = self
            .app
            .assistant
            .try_health_tips(&reading)
            .await
            .map_err(|e| {
                warn!(error = %e, "Health tips request failed");
                tips_fallback(&e).text
            });

        let applied = self.panels.lock().await.tips.finish(token, result);
        if applied == Applied::Stale {
            info!("Discarded stale health tips response");
        }
        Some(applied)
    }

    /// Tips to display. A failed request yields a single explanatory tip.
    pub async fn tips(&self) -> Vec<HealthTip> {
        match self.panels.lock().await.tips.state() {
            RequestState::Success(tips) => tips.clone(),
            RequestState::Failed(message) => vec![HealthTip::notice(message)],
            RequestState::Idle | RequestState::Requesting => Vec::new(),
        }
    }

    pub async fn tips_loading(&self) -> bool {
        self.panels.lock().await.tips.is_requesting()
    }

    /// Ask for an AI summary and draft of the form contents.
    pub async fn generate_draft(&self, form: &NewComplaint) -> Option<Applied> {
        if !form.has_report_fields() {
            self.set_message(DRAFT_MISSING_FIELDS_MESSAGE).await;
            return None;
        }

        let token = self.panels.lock().await.draft.begin();

        let result = match self.app.assistant.complaint_draft(form).await {
            Ok(outcome @ DraftOutcome::Ready(_)) => Ok(outcome),
            Ok(DraftOutcome::InvalidResponse { message })
            | Ok(DraftOutcome::Unavailable { message }) => Err(message),
            Err(e) => Err(e.user_message()),
        };

        let failure = result.as_ref().err().cloned();

        let mut panels = self.panels.lock().await;
        let applied = panels.draft.finish(token, result);
        match (applied, failure) {
            (Applied::Yes, Some(message)) => panels.message = Some(message),
            (Applied::Stale, _) => info!("Discarded stale draft response"),
            (Applied::Yes, None) => {}
        }
        Some(applied)
    }

    pub async fn draft(&self) -> RequestState<DraftOutcome> {
        self.panels.lock().await.draft.state().clone()
    }

    /// Submit the report form as the current session.
    ///
    /// Returns the new complaint id on success. Every outcome also sets the
    /// form status message.
    #[instrument(skip_all)]
    pub async fn submit(&self, mut form: NewComplaint) -> Option<String> {
        form.user_id = self.session.as_ref().map(|s| s.user_id.clone());
        if form.validate().is_err() {
            self.set_message(SUBMIT_MISSING_FIELDS_MESSAGE).await;
            return None;
        }

        self.panels.lock().await.submitting = true;
        let result = self.app.repository.create_complaint(form).await;

        let mut panels = self.panels.lock().await;
        panels.submitting = false;
        match result {
            Ok(id) => {
                panels.draft.clear();
                panels.message = Some(SUBMIT_SUCCESS_MESSAGE.to_string());
                Some(id)
            }
            Err(e) => {
                warn!(error = %e, "Error adding complaint");
                panels.message = Some(SUBMIT_FAILED_MESSAGE.to_string());
                None
            }
        }
    }

    pub async fn is_submitting(&self) -> bool {
        self.panels.lock().await.submitting
    }

    /// Upvote a complaint. Failures are logged and otherwise ignored.
    pub async fn upvote(&self, complaint_id: &str) -> bool {
        match self.app.repository.increment_upvote(complaint_id).await {
            Ok(()) => true,
            Err(e) => {
                warn!(id = %complaint_id, error = %e, "Error upvoting");
                false
            }
        }
    }

    pub async fn message(&self) -> Option<String> {
        self.panels.lock().await.message.clone()
    }

    async fn set_message(&self, message: &str) {
        self.panels.lock().await.message = Some(message.to_string());
    }

    /// Latest complaint feed, newest first.
    pub fn feed(&self) -> Vec<Complaint> {
        self.feed.borrow().complaints.clone()
    }

    /// Set once the feed subscription has failed.
    pub fn feed_error(&self) -> Option<String> {
        self.feed.borrow().error.clone()
    }

    /// The current session's own complaints.
    pub fn my_reports(&self) -> Vec<Complaint> {
        match &self.session {
            Some(session) => my_reports(&self.feed.borrow().complaints, &session.user_id),
            None => Vec::new(),
        }
    }

    /// Map pins for every complaint in the feed.
    pub fn markers(&self) -> Vec<MapMarker> {
        map_markers(&self.feed.borrow().complaints, self.app.config.center)
    }

    /// Wait until the feed satisfies `predicate`.
    pub async fn wait_for_feed<F>(&self, mut predicate: F) -> Vec<Complaint>
    where
        F: FnMut(&[Complaint]) -> bool,
    {
        let mut feed = self.feed.clone();
        match feed
            .wait_for(|view| predicate(&view.complaints) || view.error.is_some())
            .await
        {
            Ok(view) => view.complaints.clone(),
            Err(_) => self.feed(),
        }
    }
}
