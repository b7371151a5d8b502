use crate::domain::Snapshot;
use std::sync::Arc;
use tokio::sync::watch;

/// Holder of the latest published snapshot.
///
/// Publishing swaps the whole `Arc<Snapshot>` in one step, so readers see either the previous
/// snapshot or the new one, never a mix. Readers only hold the channel's lock for the clone
/// of an `Arc`.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    tx: Arc<watch::Sender<Arc<Snapshot>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Snapshot::empty()));
        Self { tx: Arc::new(tx) }
    }

    pub fn load(&self) -> Arc<Snapshot> {
        self.tx.borrow().clone()
    }

    /// Replaces the current snapshot and returns the one it replaced.
    pub fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        self.tx.send_replace(Arc::new(snapshot))
    }

    /// Change notifications; the receiver starts with the current snapshot marked as seen.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.tx.subscribe()
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::snapshot::fixtures::{score, stock};
    use crate::domain::ScoreLevel;
    use chrono::Utc;
    use uuid::Uuid;

    #[tokio::test]
    async fn publish_replaces_and_notifies() {
        let store = SnapshotStore::new();
        assert!(store.load().is_empty());

        let mut rx = store.subscribe();
        let at = Utc::now();
        let snapshot = Snapshot::try_new(
            Uuid::new_v4(),
            at,
            vec![stock("AAA", "Sugar")],
            vec![score("AAA", ScoreLevel::Met, at)],
        )
        .unwrap();

        let previous = store.publish(snapshot);
        assert!(previous.is_empty());

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().len(), 1);
        assert_eq!(store.load().last_updated(), Some(at));
    }

    #[test]
    fn readers_keep_their_snapshot_after_a_swap() {
        let store = SnapshotStore::new();
        let held = store.load();

        let at = Utc::now();
        store.publish(
            Snapshot::try_new(
                Uuid::new_v4(),
                at,
                vec![stock("AAA", "Sugar")],
                vec![score("AAA", ScoreLevel::Met, at)],
            )
            .unwrap(),
        );

        assert!(held.is_empty());
        assert_eq!(store.load().len(), 1);
    }
}
