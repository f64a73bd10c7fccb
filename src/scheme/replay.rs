use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

use crate::timestamp::UnixTimestamp;

/// Store of transaction signatures that have already paid for something.
pub trait ReplayGuard: Send + Sync {
    /// Records `signature`, confirmed in a block at `block_time`, as consumed. Returns `true`
    /// if it was not consumed before.
    ///
    /// Check and insert are one atomic step: of any number of concurrent callers with the
    /// same signature, exactly one sees `true`.
    fn mark_consumed(&self, signature: &str, block_time: UnixTimestamp) -> bool;

    fn is_consumed(&self, signature: &str) -> bool;

    /// Forgets signatures whose transactions are older than `horizon`. Returns how many were
    /// dropped.
    fn prune(&self, horizon: UnixTimestamp) -> usize;
}

impl<T: ReplayGuard + ?Sized> ReplayGuard for Arc<T> {
    fn mark_consumed(&self, signature: &str, block_time: UnixTimestamp) -> bool {
        (**self).mark_consumed(signature, block_time)
    }

    fn is_consumed(&self, signature: &str) -> bool {
        (**self).is_consumed(signature)
    }

    fn prune(&self, horizon: UnixTimestamp) -> usize {
        (**self).prune(horizon)
    }
}

/// Process-local [`ReplayGuard`].
///
/// Entries are keyed by signature and stamped with the later of the block time and the
/// local time of consumption. [`ReplayGuard::prune`] can then drop those older than the
/// freshness window: the block time is never past the stamp, so a pruned transaction
/// fails verification as stale before the guard is consulted. A block time ahead of the
/// local clock keeps its entry alive until the ledger's clock has moved past it.
///
/// Clones share the same store.
#[derive(Clone, Debug, Default)]
pub struct InMemoryReplayGuard {
    consumed: Arc<DashMap<String, UnixTimestamp>>,
}

impl InMemoryReplayGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.consumed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty()
    }

    fn mark_consumed_at(&self, signature: &str, at: UnixTimestamp) -> bool {
        // The entry holds the shard lock until it is dropped.
        match self.consumed.entry(signature.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(at);
                true
            }
        }
    }
}

impl ReplayGuard for InMemoryReplayGuard {
    fn mark_consumed(&self, signature: &str, block_time: UnixTimestamp) -> bool {
        let fresh = self.mark_consumed_at(signature, block_time.max(UnixTimestamp::now()));
        tracing::trace!(signature, fresh, "mark consumed");
        fresh
    }

    fn is_consumed(&self, signature: &str) -> bool {
        self.consumed.contains_key(signature)
    }

    fn prune(&self, horizon: UnixTimestamp) -> usize {
        let before = self.consumed.len();
        self.consumed.retain(|_, consumed_at| *consumed_at >= horizon);
        let pruned = before.saturating_sub(self.consumed.len());
        if pruned > 0 {
            tracing::debug!(pruned, %horizon, "pruned consumed signatures");
        }
        pruned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_mark_is_rejected() {
        let guard = InMemoryReplayGuard::new();
        assert!(!guard.is_consumed("sig"));
        let now = UnixTimestamp::now();
        assert!(guard.mark_consumed("sig", now));
        assert!(guard.is_consumed("sig"));
        assert!(!guard.mark_consumed("sig", now));
        assert!(guard.mark_consumed("other", now));
        assert_eq!(guard.len(), 2);
    }

    #[test]
    fn test_prune_drops_only_old_entries() {
        let guard = InMemoryReplayGuard::new();
        guard.mark_consumed_at("old", UnixTimestamp::from_secs(100));
        guard.mark_consumed_at("new", UnixTimestamp::from_secs(500));
        assert_eq!(guard.prune(UnixTimestamp::from_secs(200)), 1);
        assert!(!guard.is_consumed("old"));
        assert!(guard.is_consumed("new"));
    }

    #[test]
    fn test_future_block_time_outlives_local_clock() {
        let guard = InMemoryReplayGuard::new();
        let now = UnixTimestamp::now();
        assert!(guard.mark_consumed("ahead", now + 60));
        assert_eq!(guard.prune(now + 30), 0);
        assert!(guard.is_consumed("ahead"));
        assert_eq!(guard.prune(now + 61), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_marks_have_one_winner() {
        let guard = InMemoryReplayGuard::new();
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let guard = guard.clone();
                tokio::spawn(async move { guard.mark_consumed("contested", UnixTimestamp::now()) })
            })
            .collect();
        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
