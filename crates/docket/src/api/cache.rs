use std::sync::{Arc, RwLock, RwLockReadGuard};

use async_trait::async_trait;

use super::{RecordSource, Refresh};
use crate::error::ApiError;
use crate::record::ExportRecord;

/// Read-mostly copy of the backend's record list, refreshed on demand.
pub struct RecordCache<R> {
    source: Arc<dyn RecordSource<R>>,
    records: RwLock<Vec<R>>,
}

impl<R> RecordCache<R>
where
    R: ExportRecord + Clone + Send + Sync + 'static,
{
    pub fn new(source: Arc<dyn RecordSource<R>>) -> Self {
        Self {
            source,
            records: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<R>> {
        match self.records.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Record cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn replace(&self, records: Vec<R>) {
        let mut guard = match self.records.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Record cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        *guard = records;
    }

    /// Snapshot of the cached records in fetch order.
    pub fn records(&self) -> Vec<R> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn find(&self, record_id: &str) -> Option<R> {
        self.read()
            .iter()
            .find(|record| record.record_id() == record_id)
            .cloned()
    }

    /// Re-fetches the list. On error the previous contents are kept.
    pub async fn reload(&self) -> Result<usize, ApiError> {
        let records = self.source.fetch_records().await?;
        let count = records.len();
        self.replace(records);
        tracing::debug!(count, "Record cache refreshed");
        Ok(count)
    }
}

#[async_trait]
impl<R> Refresh for RecordCache<R>
where
    R: ExportRecord + Clone + Send + Sync + 'static,
{
    async fn refresh(&self) -> Result<usize, ApiError> {
        self.reload().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ProjectRecord;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RecordSource<ProjectRecord> for CountingSource {
        async fn fetch_records(&self) -> Result<Vec<ProjectRecord>, ApiError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 2 {
                return Err(ApiError::Decode("boom".to_string()));
            }
            Ok((0..=call)
                .map(|i| ProjectRecord {
                    notion_id: format!("p{}", i),
                    approved: call > 0,
                    ..Default::default()
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_refresh_replaces_contents() {
        let cache = RecordCache::<ProjectRecord>::new(Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        }));
        assert!(cache.is_empty());

        assert_eq!(cache.refresh().await.unwrap(), 1);
        assert!(!cache.find("p0").unwrap().approved);

        assert_eq!(cache.refresh().await.unwrap(), 2);
        assert!(cache.find("p0").unwrap().approved);
        assert!(cache.find("p1").is_some());
        assert!(cache.find("p9").is_none());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_records() {
        let cache = RecordCache::<ProjectRecord>::new(Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        }));
        cache.refresh().await.unwrap();
        cache.refresh().await.unwrap();
        assert!(cache.refresh().await.is_err());
        assert_eq!(cache.len(), 2);
    }
}
