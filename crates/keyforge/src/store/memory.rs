use super::{Store, StoreError};
use crate::{RequestId, Status, ValidatorKey, ValidatorRequest};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// An in-process [`Store`] backed by hash maps behind a single mutex.
///
/// Nothing survives a restart, so this is meant for tests and throwaway runs.
/// The lock is never held across an `.await`.
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
    available: AtomicBool,
}

#[derive(Debug, Default)]
struct Tables {
    requests: HashMap<RequestId, ValidatorRequest>,
    // Per-request key rows in insertion order.
    keys: HashMap<RequestId, Vec<ValidatorKey>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Tables::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulates losing (or regaining) the backing storage. While unavailable
    /// every operation fails with [`StoreError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    /// Total number of requests held.
    pub fn request_count(&self) -> usize {
        self.inner.lock().requests.len()
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StoreError::Unavailable {
                reason: "memory store marked unavailable".to_string(),
            })
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    async fn create_request(&self, request: &ValidatorRequest) -> Result<(), StoreError> {
        self.ensure_available()?;
        let mut tables = self.inner.lock();
        if tables.requests.contains_key(&request.id) {
            return Err(StoreError::DuplicateId {
                id: request.id.to_string(),
            });
        }
        let mut row = request.clone();
        row.status = Status::Started;
        row.error_message = None;
        tables.requests.insert(request.id, row);
        Ok(())
    }

    async fn get_request(&self, id: &RequestId) -> Result<ValidatorRequest, StoreError> {
        self.ensure_available()?;
        self.inner
            .lock()
            .requests
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    async fn update_status(
        &self,
        id: &RequestId,
        status: Status,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        self.ensure_available()?;
        let mut tables = self.inner.lock();
        let row = tables
            .requests
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        row.status = status;
        row.error_message = error_message.map(str::to_owned);
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn save_key(&self, key: &ValidatorKey) -> Result<(), StoreError> {
        self.ensure_available()?;
        let mut tables = self.inner.lock();
        if !tables.requests.contains_key(&key.request_id) {
            return Err(StoreError::ForeignKeyViolation {
                request_id: key.request_id.to_string(),
            });
        }
        let rows = tables.keys.entry(key.request_id).or_default();
        if rows.iter().any(|k| k.id == key.id) {
            return Err(StoreError::DuplicateId {
                id: key.id.to_string(),
            });
        }
        rows.push(key.clone());
        Ok(())
    }

    async fn list_keys(&self, request_id: &RequestId) -> Result<Vec<String>, StoreError> {
        self.ensure_available()?;
        Ok(self
            .inner
            .lock()
            .keys
            .get(request_id)
            .map(|rows| rows.iter().map(|k| k.value.clone()).collect())
            .unwrap_or_default())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.ensure_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FeeRecipient;

    fn recipient() -> FeeRecipient {
        FeeRecipient::parse("0x1234567890abcdef1234567890abcdef12345678").unwrap()
    }

    #[tokio::test]
    async fn keys_require_an_existing_request() {
        let store = MemoryStore::new();
        let key = ValidatorKey::new(RequestId::new(), "aa".repeat(32), recipient());
        let err = store.save_key(&key).await.unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let store = MemoryStore::new();
        let request = ValidatorRequest::new(2, recipient());
        store.create_request(&request).await.unwrap();
        let err = store.create_request(&request).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId { .. }));

        let key = ValidatorKey::new(request.id, "bb".repeat(32), recipient());
        store.save_key(&key).await.unwrap();
        let err = store.save_key(&key).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId { .. }));
        assert_eq!(store.request_count(), 1);
    }

    #[tokio::test]
    async fn keys_are_listed_in_insertion_order() {
        let store = MemoryStore::new();
        let request = ValidatorRequest::new(3, recipient());
        store.create_request(&request).await.unwrap();

        let values = ["03", "01", "02"].map(|b| b.repeat(32));
        for value in &values {
            let key = ValidatorKey::new(request.id, value.clone(), recipient());
            store.save_key(&key).await.unwrap();
        }
        assert_eq!(store.list_keys(&request.id).await.unwrap(), values);
        assert!(store.list_keys(&RequestId::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_updates_overwrite_message() {
        let store = MemoryStore::new();
        let request = ValidatorRequest::new(1, recipient());
        store.create_request(&request).await.unwrap();

        store
            .update_status(&request.id, Status::Failed, Some("boom"))
            .await
            .unwrap();
        let row = store.get_request(&request.id).await.unwrap();
        assert_eq!(row.status, Status::Failed);
        assert_eq!(row.error_message.as_deref(), Some("boom"));
        assert!(row.updated_at >= row.created_at);

        let err = store
            .update_status(&RequestId::new(), Status::Successful, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn outage_fails_every_operation() {
        let store = MemoryStore::new();
        let request = ValidatorRequest::new(1, recipient());
        store.create_request(&request).await.unwrap();

        store.set_available(false);
        assert!(matches!(
            store.health_check().await,
            Err(StoreError::Unavailable { .. })
        ));
        assert!(matches!(
            store.get_request(&request.id).await,
            Err(StoreError::Unavailable { .. })
        ));

        store.set_available(true);
        store.health_check().await.unwrap();
    }
}
