//! Request state tracking for display slots.
//!
//! A slot moves `Idle → Requesting → Success | Failed` and can be restarted
//! from any state. Each start issues a [`RequestToken`]; only the response
//! carrying the most recent token is applied, so an older request that
//! resolves late cannot overwrite a newer one.

use serde::Serialize;

/// Identifies one request issued against a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum RequestState<T> {
    Idle,
    Requesting,
    Success(T),
    Failed(String),
}

/// Whether a finished response was applied to the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Yes,
    /// A newer request was started after this one; the response was dropped.
    Stale,
}

#[derive(Debug, Clone)]
pub struct RequestSlot<T> {
    state: RequestState<T>,
    latest: u64,
}

impl<T> Default for RequestSlot<T> {
    fn default() -> Self {
        Self {
            state: RequestState::Idle,
            latest: 0,
        }
    }
}

impl<T> RequestSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &RequestState<T> {
        &self.state
    }

    pub fn is_requesting(&self) -> bool {
        matches!(self.state, RequestState::Requesting)
    }

    /// Start a request, superseding any in flight.
    pub fn begin(&mut self) -> RequestToken {
        self.latest += 1;
        self.state = RequestState::Requesting;
        RequestToken(self.latest)
    }

    /// Return to `Idle`, discarding whatever is in flight.
    pub fn clear(&mut self) {
        self.latest += 1;
        self.state = RequestState::Idle;
    }

    /// Record the outcome of the request identified by `token`.
    pub fn finish(&mut self, token: RequestToken, result: Result<T, String>) -> Applied {
        if token.0 != self.latest {
            return Applied::Stale;
        }

        self.state = match result {
            Ok(value) => RequestState::Success(value),
            Err(message) => RequestState::Failed(message),
        };
        Applied::Yes
    }

    /// The successful value, if the latest request succeeded.
    pub fn value(&self) -> Option<&T> {
        match &self.state {
            RequestState::Success(value) => Some(value),
            _ => None,
        }
    }
}
