//! Chat Locks - un lock asincrono per ogni chat con traffico in corso
//!
//! Serializza per una stessa chat le operazioni che toccano sottoscrizioni e
//! fan-out: join, invio dei messaggi e rimozione dei membri. Una entry vive
//! solo finché qualcuno tiene o attende il lock.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Clone, Default)]
pub struct ChatLocks {
    locks: Arc<DashMap<i32, Arc<Mutex<()>>>>,
}

/// Held for the duration of one chat operation. Dropping it releases the
/// lock and evicts the entry when no other task is waiting on it.
pub struct ChatLockGuard {
    chat_id: i32,
    locks: Arc<DashMap<i32, Arc<Mutex<()>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl ChatLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, chat_id: i32) -> ChatLockGuard {
        // il clone avviene sotto il lock della shard: l'eviction non può
        // rimuovere una entry appena ottenuta
        let mutex = self
            .locks
            .entry(chat_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        ChatLockGuard {
            chat_id,
            locks: self.locks.clone(),
            guard: Some(mutex.lock_owned().await),
        }
    }

    /// Number of chats with a live entry
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Drop for ChatLockGuard {
    fn drop(&mut self) {
        // prima si rilascia il lock, poi si rimuove la entry se solo la mappa la tiene
        drop(self.guard.take());
        self.locks
            .remove_if(&self.chat_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_entry_evicted_after_release() {
        let locks = ChatLocks::new();
        {
            let _guard = locks.lock(7).await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_entry_kept_while_a_waiter_exists() {
        let locks = ChatLocks::new();
        let first = locks.lock(7).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(7).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(first);
        assert_eq!(locks.len(), 1, "waiter still holds the entry");

        waiter.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_locks_are_per_chat() {
        let locks = ChatLocks::new();
        let _a = locks.lock(1).await;
        let b = tokio::time::timeout(Duration::from_millis(50), locks.lock(2)).await;
        assert!(b.is_ok());
    }
}
