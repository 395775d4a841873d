//! Live complaint feed subscriptions.
//!
//! A subscription pushes the full, newest-first complaint list to its
//! `on_update` callback once on start and again after every write the
//! repository performs. Writes that land while a snapshot is being read are
//! coalesced into one more read, so subscribers always converge on the latest
//! state but may skip intermediate ones.
//!
//! `on_error` fires at most once. After it fires the subscription is over and
//! `on_update` is never called again.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::KaraError;
use crate::model::Complaint;
use crate::storage::ComplaintStore;

type UpdateFn = Box<dyn FnMut(Vec<Complaint>) + Send>;
type ErrorFn = Box<dyn FnOnce(KaraError) + Send>;

struct Callbacks {
    on_update: UpdateFn,
    on_error: ErrorFn,
}

/// Handle to a running feed subscription.
///
/// Call [`FeedSubscription::unsubscribe`] when the view goes away. Dropping
/// the handle also stops delivery, but only `unsubscribe` guarantees that a
/// callback already running has finished by the time it returns.
pub struct FeedSubscription {
    callbacks: Arc<Mutex<Option<Callbacks>>>,
    task: JoinHandle<()>,
}

impl FeedSubscription {
    pub(crate) fn spawn<U, E>(
        store: Arc<dyn ComplaintStore>,
        mut changes: watch::Receiver<u64>,
        on_update: U,
        on_error: E,
    ) -> Self
    where
        U: FnMut(Vec<Complaint>) + Send + 'static,
        E: FnOnce(KaraError) + Send + 'static,
    {
        let callbacks = Arc::new(Mutex::new(Some(Callbacks {
            on_update: Box::new(on_update),
            on_error: Box::new(on_error),
        })));

        let slot = Arc::clone(&callbacks);
        let task = tokio::spawn(async move {
            loop {
                // Mark the current version seen before reading, so a write
                // racing with the read triggers another pass.
                let version = *changes.borrow_and_update();
                let snapshot = store.list_feed().await;

                let mut guard = slot.lock().await;
                match snapshot {
                    Ok(complaints) => match guard.as_mut() {
                        Some(callbacks) => {
                            debug!(version, count = complaints.len(), "Delivering feed snapshot");
                            (callbacks.on_update)(complaints);
                        }
                        None => return,
                    },
                    Err(e) => {
                        warn!(error = %e, "Feed subscription failed");
                        if let Some(callbacks) = guard.take() {
                            (callbacks.on_error)(e);
                        }
                        return;
                    }
                }
                drop(guard);

                if changes.changed().await.is_err() {
                    // Repository dropped; nothing will change again
                    return;
                }
            }
        });

        Self { callbacks, task }
    }

    /// Stop delivery. No callback runs after this returns.
    pub async fn unsubscribe(self) {
        self.callbacks.lock().await.take();
        self.task.abort();
    }

    /// False once the subscription has ended, either through an error or
    /// because the repository went away.
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        if let Ok(mut callbacks) = self.callbacks.try_lock() {
            callbacks.take();
        }
        self.task.abort();
    }
}
