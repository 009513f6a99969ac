//! Append-only record store
//!
//! The `RecordStore` trait is the only way handlers touch stored data, so the
//! in-memory implementation can later be swapped for a persistent one without
//! changing call sites.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::{Error, Result};

/// Append-only, insertion-ordered record store
///
/// Implementations never merge, deduplicate, mutate or delete records.
///
/// # Example
/// ```
/// # use baitline_core::{InMemoryStore, RecordStore};
/// # async fn example() -> baitline_core::Result<()> {
/// let store = InMemoryStore::new("events");
/// assert_eq!(store.append("first".to_string()).await?, 1);
/// assert_eq!(store.append("first".to_string()).await?, 2);
/// assert_eq!(store.snapshot().await?.len(), 2);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait RecordStore<T>: Send + Sync
where
    T: Clone + Send + Sync + 'static,
{
    /// Append a record
    ///
    /// # Returns
    /// The number of records in the store after the append.
    ///
    /// # Errors
    /// - `Error::StoreUnavailable` if the store can no longer accept writes
    async fn append(&self, record: T) -> Result<usize>;

    /// Consistent copy of every record, in insertion order
    ///
    /// # Errors
    /// - `Error::StoreUnavailable` if the store can no longer be read
    async fn snapshot(&self) -> Result<Vec<T>>;

    /// Number of stored records
    async fn len(&self) -> Result<usize> {
        Ok(self.snapshot().await?.len())
    }

    /// Whether the store is still usable
    fn is_healthy(&self) -> bool {
        true
    }

    /// Short name used in logs and metrics
    fn name(&self) -> &str;
}

/// Process-memory store guarded by a single read-write lock
///
/// Appends are serialized behind the write lock; snapshots clone under the
/// read lock, so readers never observe a partially applied append. Growth is
/// unbounded: records live until the process exits.
pub struct InMemoryStore<T> {
    name: String,
    records: RwLock<Vec<T>>,
}

impl<T> InMemoryStore<T> {
    /// Create an empty store
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: RwLock::new(Vec::new()),
        }
    }

    fn poisoned(&self) -> Error {
        tracing::error!(store = %self.name, "Store lock poisoned, refusing access");
        Error::StoreUnavailable(format!("{} store lock poisoned", self.name))
    }
}

#[async_trait]
impl<T> RecordStore<T> for InMemoryStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn append(&self, record: T) -> Result<usize> {
        let mut records = self.records.write().map_err(|_| self.poisoned())?;
        records.push(record);
        Ok(records.len())
    }

    async fn snapshot(&self) -> Result<Vec<T>> {
        let records = self.records.read().map_err(|_| self.poisoned())?;
        Ok(records.clone())
    }

    async fn len(&self) -> Result<usize> {
        let records = self.records.read().map_err(|_| self.poisoned())?;
        Ok(records.len())
    }

    fn is_healthy(&self) -> bool {
        !self.records.is_poisoned()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_append_returns_new_length() {
        let store = InMemoryStore::new("test");
        assert_eq!(store.append(10).await.unwrap(), 1);
        assert_eq!(store.append(20).await.unwrap(), 2);
        assert_eq!(store.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_snapshot_preserves_insertion_order() {
        let store = InMemoryStore::new("test");
        for i in 0..5 {
            store.append(i).await.unwrap();
        }
        assert_eq!(store.snapshot().await.unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_duplicates_are_kept() {
        let store = InMemoryStore::new("test");
        store.append("same".to_string()).await.unwrap();
        store.append("same".to_string()).await.unwrap();
        assert_eq!(store.snapshot().await.unwrap(), vec!["same", "same"]);
    }

    #[tokio::test]
    async fn test_snapshot_is_detached_from_later_appends() {
        let store = InMemoryStore::new("test");
        store.append(1).await.unwrap();
        let snapshot = store.snapshot().await.unwrap();
        store.append(2).await.unwrap();
        assert_eq!(snapshot, vec![1]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_are_all_recorded() {
        let store: Arc<dyn RecordStore<usize>> = Arc::new(InMemoryStore::new("test"));

        let handles: Vec<_> = (0..8)
            .map(|task| {
                let store = store.clone();
                tokio::spawn(async move {
                    for i in 0..100 {
                        store.append(task * 100 + i).await.unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        let mut records = store.snapshot().await.unwrap();
        assert_eq!(records.len(), 800);
        records.sort_unstable();
        records.dedup();
        assert_eq!(records.len(), 800);
    }

    #[test]
    fn test_poisoned_store_reports_unhealthy() {
        let store = Arc::new(InMemoryStore::<u8>::new("events"));
        assert!(store.is_healthy());

        let cloned = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = cloned.records.write().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(!store.is_healthy());
        let err = block_on(store.append(1)).unwrap_err();
        assert!(err.to_string().contains("events store lock poisoned"));
    }

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(future)
    }
}
