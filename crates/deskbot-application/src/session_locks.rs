use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Per-session turn locks.
///
/// Turns for one session run one at a time; turns for different sessions
/// never wait on each other beyond the map lookup. An entry lives only while
/// some turn holds or waits for it.
#[derive(Default)]
pub struct SessionLocks {
    locks: Arc<RwLock<HashMap<String, Arc<Mutex<()>>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock for `session_id`, creating it on first use.
    async fn lock_for(&self, session_id: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().await.get(session_id) {
            return lock.clone();
        }
        let mut locks = self.locks.write().await;
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Waits for the turn lock of `session_id`.
    ///
    /// Pair every call with [`SessionLocks::release`].
    pub async fn acquire(&self, session_id: &str) -> OwnedMutexGuard<()> {
        self.lock_for(session_id).await.lock_owned().await
    }

    /// Unlocks the turn and drops the entry when nobody else holds a handle.
    ///
    /// Handles are only cloned under the map lock, so a count of one seen
    /// under the write lock means no turn is holding or queued on it.
    pub async fn release(&self, session_id: &str, guard: OwnedMutexGuard<()>) {
        drop(guard);
        let mut locks = self.locks.write().await;
        if locks.get(session_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(session_id);
        }
    }

    pub async fn len(&self) -> usize {
        self.locks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.locks.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_session_shares_one_lock() {
        let locks = SessionLocks::new();
        let a = locks.lock_for("s1").await;
        let b = locks.lock_for("s1").await;
        let c = locks.lock_for("s2").await;
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(locks.len().await, 2);
    }

    #[tokio::test]
    async fn entry_is_dropped_after_last_release() {
        let locks = SessionLocks::new();
        for i in 0..100 {
            let id = format!("s{}", i);
            let guard = locks.acquire(&id).await;
            assert_eq!(locks.len().await, 1);
            locks.release(&id, guard).await;
        }
        assert!(locks.is_empty().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn queued_turn_keeps_the_entry_alive() {
        let locks = Arc::new(SessionLocks::new());
        let first = locks.acquire("s1").await;
        let (finish_tx, finish_rx) = tokio::sync::oneshot::channel::<()>();

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let guard = locks.acquire("s1").await;
                let _ = finish_rx.await;
                locks.release("s1", guard).await;
            })
        };
        // Wait until the second turn holds its own handle.
        while Arc::strong_count(locks.locks.read().await.get("s1").unwrap()) < 3 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        locks.release("s1", first).await;
        assert_eq!(locks.len().await, 1, "a queued turn still needs the lock");

        finish_tx.send(()).unwrap();
        waiter.await.unwrap();
        assert!(locks.is_empty().await);
    }
}
