//! Durable record → job bookkeeping.
//!
//! Two entries are kept in the key/value store: a JSON object mapping record
//! ids to job ids and a JSON array of in-flight record ids. The object is the
//! source of truth; the array is kept consistent with it on every write and
//! repaired by [`JobLedger::reconcile`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::store::{KeyValueStore, StoreError};

pub const JOB_IDS_KEY: &str = "taskIds";
pub const IN_FLIGHT_KEY: &str = "processingProjects";

pub struct JobLedger {
    store: Arc<dyn KeyValueStore>,
    /// Serializes read-modify-write cycles across poll chains.
    write_lock: Mutex<()>,
}

impl JobLedger {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job ledger lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn read<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T, StoreError> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(T::default());
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(value),
            Err(e) => {
                log::warn!("Discarding unreadable '{}' entry: {}", key, e);
                Ok(T::default())
            }
        }
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value).map_err(|e| StoreError::Json {
            key: key.to_string(),
            source: e,
        })?;
        self.store.set(key, &raw)
    }

    /// Every tracked record with its job id.
    pub fn jobs(&self) -> Result<BTreeMap<String, String>, StoreError> {
        self.read(JOB_IDS_KEY)
    }

    pub fn in_flight(&self) -> Result<Vec<String>, StoreError> {
        self.read(IN_FLIGHT_KEY)
    }

    pub fn job_for(&self, record_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self.jobs()?.remove(record_id))
    }

    /// Persists `record_id → job_id` and marks the record in flight.
    pub fn record(&self, record_id: &str, job_id: &str) -> Result<(), StoreError> {
        let _guard = self.lock();

        let mut jobs = self.jobs()?;
        jobs.insert(record_id.to_string(), job_id.to_string());
        self.write(JOB_IDS_KEY, &jobs)?;

        let mut in_flight = self.in_flight()?;
        if !in_flight.iter().any(|id| id == record_id) {
            in_flight.push(record_id.to_string());
            self.write(IN_FLIGHT_KEY, &in_flight)?;
        }

        log::debug!("Recorded job {} for record {}", job_id, record_id);
        Ok(())
    }

    /// Drops every trace of `record_id`. Absent records are a no-op.
    pub fn forget(&self, record_id: &str) -> Result<(), StoreError> {
        let _guard = self.lock();

        let mut jobs = self.jobs()?;
        if jobs.remove(record_id).is_some() {
            self.write(JOB_IDS_KEY, &jobs)?;
        }

        let mut in_flight = self.in_flight()?;
        let before = in_flight.len();
        in_flight.retain(|id| id != record_id);
        if in_flight.len() != before {
            self.write(IN_FLIGHT_KEY, &in_flight)?;
        }

        Ok(())
    }

    /// Repairs the in-flight set against the job map and returns the map.
    ///
    /// Ids without a job id are dropped from the set; mapped records missing
    /// from the set are added.
    pub fn reconcile(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let _guard = self.lock();

        let jobs = self.jobs()?;
        let stored = self.in_flight()?;

        let mut repaired: Vec<String> = Vec::with_capacity(jobs.len());
        for id in &stored {
            if jobs.contains_key(id) && !repaired.contains(id) {
                repaired.push(id.clone());
            }
        }
        for id in jobs.keys() {
            if !repaired.contains(id) {
                repaired.push(id.clone());
            }
        }

        if repaired != stored {
            log::info!(
                "Reconciled in-flight set: {} stored, {} tracked",
                stored.len(),
                repaired.len()
            );
            self.write(IN_FLIGHT_KEY, &repaired)?;
        }

        Ok(jobs)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock();
        self.store.remove(JOB_IDS_KEY)?;
        self.store.remove(IN_FLIGHT_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn ledger() -> (Arc<MemoryStore>, JobLedger) {
        let store = Arc::new(MemoryStore::new());
        let ledger = JobLedger::new(store.clone());
        (store, ledger)
    }

    #[test]
    fn test_record_writes_both_entries() {
        let (store, ledger) = ledger();
        ledger.record("r1", "job-1").unwrap();
        ledger.record("r1", "job-1").unwrap();

        assert_eq!(
            store.get(JOB_IDS_KEY).unwrap().as_deref(),
            Some(r#"{"r1":"job-1"}"#)
        );
        assert_eq!(
            store.get(IN_FLIGHT_KEY).unwrap().as_deref(),
            Some(r#"["r1"]"#)
        );
        assert_eq!(ledger.job_for("r1").unwrap().as_deref(), Some("job-1"));
    }

    #[test]
    fn test_forget_removes_both_entries() {
        let (_, ledger) = ledger();
        ledger.record("r1", "job-1").unwrap();
        ledger.record("r2", "job-2").unwrap();

        ledger.forget("r1").unwrap();
        ledger.forget("missing").unwrap();

        assert_eq!(ledger.job_for("r1").unwrap(), None);
        assert_eq!(ledger.in_flight().unwrap(), vec!["r2"]);
        assert_eq!(ledger.jobs().unwrap().len(), 1);
    }

    #[test]
    fn test_reconcile_repairs_in_flight_set() {
        let store = Arc::new(MemoryStore::with_entries([
            (JOB_IDS_KEY, r#"{"r1":"job-1","r3":"job-3"}"#),
            (IN_FLIGHT_KEY, r#"["r2","r1","r1"]"#),
        ]));
        let ledger = JobLedger::new(store);

        let jobs = ledger.reconcile().unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(ledger.in_flight().unwrap(), vec!["r1", "r3"]);
    }

    #[test]
    fn test_unreadable_entries_are_treated_as_empty() {
        let store = Arc::new(MemoryStore::with_entries([(JOB_IDS_KEY, "not json")]));
        let ledger = JobLedger::new(store);
        assert!(ledger.jobs().unwrap().is_empty());

        ledger.record("r1", "job-1").unwrap();
        assert_eq!(ledger.job_for("r1").unwrap().as_deref(), Some("job-1"));
    }

    #[test]
    fn test_clear() {
        let (store, ledger) = ledger();
        ledger.record("r1", "job-1").unwrap();
        ledger.clear().unwrap();
        assert_eq!(store.get(JOB_IDS_KEY).unwrap(), None);
        assert!(ledger.in_flight().unwrap().is_empty());
    }
}
