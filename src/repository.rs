//! Complaint repository.
//!
//! Wraps a [`ComplaintStore`] with change notification so live feed
//! subscribers see every write made through it.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, instrument};

use crate::error::{KaraError, Result};
use crate::feed::FeedSubscription;
use crate::model::{Complaint, ComplaintStatus, NewComplaint};
use crate::storage::ComplaintStore;

/// Shared handle to the complaint store.
#[derive(Clone)]
pub struct ComplaintRepository {
    store: Arc<dyn ComplaintStore>,
    changes: Arc<watch::Sender<u64>>,
}

impl ComplaintRepository {
    pub fn new(store: Arc<dyn ComplaintStore>) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            store,
            changes: Arc::new(changes),
        }
    }

    fn notify(&self) {
        self.changes.send_modify(|version| *version += 1);
    }

    /// Create a complaint authored by `complaint.user_id`.
    #[instrument(skip(self, complaint), fields(category = %complaint.category))]
    pub async fn create_complaint(&self, complaint: NewComplaint) -> Result<String> {
        let id = self.store.create_complaint(complaint).await?;
        info!(id = %id, "Complaint created");
        self.notify();
        Ok(id)
    }

    /// Add one upvote. Duplicate upvotes from one session are allowed.
    #[instrument(skip(self))]
    pub async fn increment_upvote(&self, id: &str) -> Result<()> {
        self.store.increment_upvote(id).await?;
        self.notify();
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn set_status(&self, id: &str, status: ComplaintStatus) -> Result<()> {
        self.store.set_status(id, status).await?;
        info!(id = %id, status = status.as_str(), "Complaint status changed");
        self.notify();
        Ok(())
    }

    pub async fn list_feed(&self) -> Result<Vec<Complaint>> {
        self.store.list_feed().await
    }

    pub async fn get_complaint(&self, id: &str) -> Result<Complaint> {
        self.store.get_complaint(id).await
    }

    /// Open a live, newest-first feed subscription.
    ///
    /// See [`crate::feed`] for delivery guarantees.
    pub fn subscribe_to_feed<U, E>(&self, on_update: U, on_error: E) -> FeedSubscription
    where
        U: FnMut(Vec<Complaint>) + Send + 'static,
        E: FnOnce(KaraError) + Send + 'static,
    {
        FeedSubscription::spawn(
            Arc::clone(&self.store),
            self.changes.subscribe(),
            on_update,
            on_error,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use super::*;
    use crate::storage::SqliteStore;

    async fn repository() -> ComplaintRepository {
        let store = SqliteStore::new("sqlite::memory:").await.unwrap();
        ComplaintRepository::new(Arc::new(store))
    }

    fn report(user: &str, location: &str) -> NewComplaint {
        NewComplaint::new(user, "Heavy smoke near junction", location, "Vehicular Smoke")
    }

    /// Wait for a snapshot with exactly `len` complaints.
    async fn snapshot_of_len(
        rx: &mut mpsc::UnboundedReceiver<Vec<Complaint>>,
        len: usize,
    ) -> Vec<Complaint> {
        timeout(Duration::from_secs(5), async {
            loop {
                let snapshot = rx.recv().await.expect("subscription ended");
                if snapshot.len() == len {
                    return snapshot;
                }
            }
        })
        .await
        .expect("timed out waiting for snapshot")
    }

    #[tokio::test]
    async fn test_subscription_delivers_initial_and_updated_snapshots() {
        let repo = repository().await;
        let (tx, mut rx) = mpsc::unbounded_channel();

        let subscription = repo.subscribe_to_feed(
            move |snapshot| {
                let _ = tx.send(snapshot);
            },
            |_| panic!("unexpected feed error"),
        );

        assert!(snapshot_of_len(&mut rx, 0).await.is_empty());

        let older = repo.create_complaint(report("u1", "A")).await.unwrap();
        let newer = repo.create_complaint(report("u2", "B")).await.unwrap();

        let snapshot = snapshot_of_len(&mut rx, 2).await;
        assert_eq!(snapshot[0].id, newer);
        assert_eq!(snapshot[1].id, older);

        subscription.unsubscribe().await;
    }

    #[tokio::test]
    async fn test_upvote_pushes_new_snapshot() {
        let repo = repository().await;
        let id = repo.create_complaint(report("u1", "A")).await.unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let _subscription = repo.subscribe_to_feed(
            move |snapshot| {
                let _ = tx.send(snapshot);
            },
            |_| {},
        );

        repo.increment_upvote(&id).await.unwrap();

        let upvoted = timeout(Duration::from_secs(5), async {
            loop {
                let snapshot = rx.recv().await.unwrap();
                if snapshot[0].upvotes == 1 {
                    return snapshot;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(upvoted[0].id, id);
    }

    #[tokio::test]
    async fn test_no_delivery_after_unsubscribe() {
        let repo = repository().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let counter = Arc::clone(&calls);
        let subscription = repo.subscribe_to_feed(
            move |snapshot| {
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(snapshot);
            },
            |_| {},
        );

        snapshot_of_len(&mut rx, 0).await;
        subscription.unsubscribe().await;
        let before = calls.load(Ordering::SeqCst);

        repo.create_complaint(report("u1", "A")).await.unwrap();
        repo.create_complaint(report("u1", "B")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(calls.load(Ordering::SeqCst), before);
    }

    #[tokio::test]
    async fn test_concurrent_upvotes_through_repository() {
        let repo = repository().await;
        let id = repo.create_complaint(report("u1", "A")).await.unwrap();

        let (a, b) = tokio::join!(repo.increment_upvote(&id), repo.increment_upvote(&id));
        a.unwrap();
        b.unwrap();

        assert_eq!(repo.get_complaint(&id).await.unwrap().upvotes, 2);
    }

    struct UnavailableStore {
        reads: AtomicUsize,
    }

    #[async_trait]
    impl ComplaintStore for UnavailableStore {
        async fn create_complaint(&self, _complaint: NewComplaint) -> Result<String> {
            Err(KaraError::StoreUnavailable("offline".to_string()))
        }

        async fn increment_upvote(&self, _id: &str) -> Result<()> {
            Err(KaraError::StoreUnavailable("offline".to_string()))
        }

        async fn list_feed(&self) -> Result<Vec<Complaint>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Err(KaraError::StoreUnavailable("offline".to_string()))
        }

        async fn get_complaint(&self, id: &str) -> Result<Complaint> {
            Err(KaraError::NotFound(id.to_string()))
        }

        async fn set_status(&self, _id: &str, _status: ComplaintStatus) -> Result<()> {
            Err(KaraError::StoreUnavailable("offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_error_fires_once_and_ends_subscription() {
        let store = Arc::new(UnavailableStore {
            reads: AtomicUsize::new(0),
        });
        let repo = ComplaintRepository::new(store.clone());
        let (err_tx, mut err_rx) = mpsc::unbounded_channel();
        let updates = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&updates);
        let subscription = repo.subscribe_to_feed(
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            move |e| {
                let _ = err_tx.send(e);
            },
        );

        let err = timeout(Duration::from_secs(5), err_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(err, KaraError::StoreUnavailable(_)));

        // Further changes must not restart delivery
        repo.notify();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(updates.load(Ordering::SeqCst), 0);
        assert_eq!(store.reads.load(Ordering::SeqCst), 1);
        assert!(err_rx.recv().await.is_none());
        assert!(!subscription.is_active());
    }
}
