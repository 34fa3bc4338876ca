use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-buyer serialisation of events.
///
/// Two presses of `+` from the same buyer would otherwise race on the
/// read-modify-write of a cart line. Different buyers never wait on each other.
#[derive(Clone, Default)]
pub struct BuyerLocks {
    locks: Arc<DashMap<i64, Arc<Mutex<()>>>>,
}

impl BuyerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other event for `buyer_id` is in flight.
    pub async fn acquire(&self, buyer_id: i64) -> OwnedMutexGuard<()> {
        // Clone the Arc so the DashMap shard lock is released before awaiting.
        let lock = Arc::clone(self.locks.entry(buyer_id).or_default().value());
        lock.lock_owned().await
    }

    /// Number of buyers seen so far.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_buyer_is_serialised() {
        let locks = BuyerLocks::new();
        let in_flight = Arc::new(AtomicU32::new(0));
        let max_seen = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let in_flight = Arc::clone(&in_flight);
            let max_seen = Arc::clone(&max_seen);
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(1).await;
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test]
    async fn test_different_buyers_do_not_block() {
        let locks = BuyerLocks::new();
        let _first = locks.acquire(1).await;

        let second = tokio::time::timeout(Duration::from_millis(100), locks.acquire(2)).await;
        assert!(second.is_ok());
    }
}
