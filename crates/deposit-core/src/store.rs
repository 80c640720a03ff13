//! # Record Stores
//!
//! Storage seams for payment and request records. The checkout machine and
//! the HTTP mirror both talk to these traits; backends (in-memory, JSON
//! file, remote HTTP) are chosen once at construction, never per call.

use crate::error::{DepositError, DepositResult};
use crate::record::{DormRequest, PaymentDraft, PaymentRecord, PaymentStatus, RequestDraft};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;

/// Store of deposit payment records.
///
/// Records are append-only apart from status transitions; insertion order
/// is preserved and nothing is ever deduplicated or reordered.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Assign a fresh id and timestamp, append, and return the full record
    async fn append(&self, draft: PaymentDraft) -> DepositResult<PaymentRecord>;

    /// Every record in insertion order
    async fn list_all(&self) -> DepositResult<Vec<PaymentRecord>>;

    /// Replace the status of the record with this id.
    ///
    /// Fails with `RecordNotFound` for an unknown id and
    /// `InvalidTransition` for a move the lifecycle forbids. A repeated
    /// refund is a no-op that still returns the record.
    async fn set_status(&self, id: &str, status: PaymentStatus) -> DepositResult<PaymentRecord>;

    /// Debug wipe of the whole collection
    async fn clear(&self) -> DepositResult<()>;
}

/// Store of dorm waitlist requests
#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn append(&self, draft: RequestDraft) -> DepositResult<DormRequest>;

    async fn list_all(&self) -> DepositResult<Vec<DormRequest>>;

    async fn delete(&self, id: &str) -> DepositResult<()>;

    /// Stamp a payment id onto a request. Callers treat this as
    /// fire-and-forget; a missing request is still an error here so the
    /// caller can decide to log it.
    async fn attach_payment(&self, request_id: &str, payment_id: &str) -> DepositResult<()>;

    async fn clear(&self) -> DepositResult<()>;
}

/// Shared handle types used throughout the engine
pub type SharedPaymentStore = Arc<dyn PaymentStore>;
pub type SharedRequestStore = Arc<dyn RequestStore>;

/// Validate and apply a status change on a record that was found.
/// Shared by every backend so the lifecycle rules live in one place.
pub fn apply_status(record: &mut PaymentRecord, status: PaymentStatus) -> DepositResult<()> {
    if !record.status.can_transition_to(status) {
        return Err(DepositError::InvalidTransition {
            from: record.status.to_string(),
            to: status.to_string(),
        });
    }
    record.status = status;
    Ok(())
}

/// In-memory store, the test double and single-session default.
///
/// Both collections live behind one mutex each; last writer wins, which
/// matches the single-client persistence contract.
#[derive(Default)]
pub struct MemoryStore {
    payments: Mutex<Vec<PaymentRecord>>,
    requests: Mutex<Vec<DormRequest>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for wiring one store into both trait slots
    pub fn shared() -> (SharedPaymentStore, SharedRequestStore) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), store)
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn append(&self, draft: PaymentDraft) -> DepositResult<PaymentRecord> {
        let record = draft.into_record();
        let mut payments = self
            .payments
            .lock()
            .map_err(|e| DepositError::Storage(e.to_string()))?;
        payments.push(record.clone());
        Ok(record)
    }

    async fn list_all(&self) -> DepositResult<Vec<PaymentRecord>> {
        let payments = self
            .payments
            .lock()
            .map_err(|e| DepositError::Storage(e.to_string()))?;
        Ok(payments.clone())
    }

    async fn set_status(&self, id: &str, status: PaymentStatus) -> DepositResult<PaymentRecord> {
        let mut payments = self
            .payments
            .lock()
            .map_err(|e| DepositError::Storage(e.to_string()))?;
        let record = payments
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| DepositError::RecordNotFound { id: id.to_string() })?;
        apply_status(record, status)?;
        Ok(record.clone())
    }

    async fn clear(&self) -> DepositResult<()> {
        self.payments
            .lock()
            .map_err(|e| DepositError::Storage(e.to_string()))?
            .clear();
        Ok(())
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn append(&self, draft: RequestDraft) -> DepositResult<DormRequest> {
        let request = draft.into_record();
        let mut requests = self
            .requests
            .lock()
            .map_err(|e| DepositError::Storage(e.to_string()))?;
        requests.push(request.clone());
        Ok(request)
    }

    async fn list_all(&self) -> DepositResult<Vec<DormRequest>> {
        let requests = self
            .requests
            .lock()
            .map_err(|e| DepositError::Storage(e.to_string()))?;
        Ok(requests.clone())
    }

    async fn delete(&self, id: &str) -> DepositResult<()> {
        let mut requests = self
            .requests
            .lock()
            .map_err(|e| DepositError::Storage(e.to_string()))?;
        let before = requests.len();
        requests.retain(|r| r.id != id);
        if requests.len() == before {
            return Err(DepositError::RecordNotFound { id: id.to_string() });
        }
        Ok(())
    }

    async fn attach_payment(&self, request_id: &str, payment_id: &str) -> DepositResult<()> {
        let mut requests = self
            .requests
            .lock()
            .map_err(|e| DepositError::Storage(e.to_string()))?;
        let request = requests
            .iter_mut()
            .find(|r| r.id == request_id)
            .ok_or_else(|| DepositError::RecordNotFound {
                id: request_id.to_string(),
            })?;
        request.payment_id = Some(payment_id.to_string());
        Ok(())
    }

    async fn clear(&self) -> DepositResult<()> {
        self.requests
            .lock()
            .map_err(|e| DepositError::Storage(e.to_string()))?
            .clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ContactType, PaymentMethod, DEPOSIT_AMOUNT};

    fn draft(dorm: &str) -> PaymentDraft {
        PaymentDraft {
            request_id: None,
            dorm_id: dorm.to_string(),
            dorm_name: format!("Dorm {}", dorm),
            amount: DEPOSIT_AMOUNT,
            method: PaymentMethod::MockCard,
            status: PaymentStatus::Authorized,
            card_last4: Some("0366".into()),
            user_id: None,
        }
    }

    fn request_draft(dorm: &str) -> RequestDraft {
        RequestDraft {
            dorm_id: dorm.to_string(),
            dorm_name: format!("Dorm {}", dorm),
            full_name: "Aigerim S.".into(),
            university: "KazNU".into(),
            contact_type: ContactType::Telegram,
            contact_value: "@aigerim".into(),
            room_type: "2-bed".into(),
            budget: 60_000,
            move_in_month: "2026-09".into(),
            user_id: None,
        }
    }

    #[tokio::test]
    async fn test_append_preserves_insertion_order() {
        let store = MemoryStore::new();
        let a = PaymentStore::append(&store, draft("a")).await.unwrap();
        let b = PaymentStore::append(&store, draft("b")).await.unwrap();
        let c = PaymentStore::append(&store, draft("c")).await.unwrap();

        let all = PaymentStore::list_all(&store).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec![a.id.as_str(), b.id.as_str(), c.id.as_str()]);
    }

    #[tokio::test]
    async fn test_refund_then_refund_again_is_noop() {
        let store = MemoryStore::new();
        let record = PaymentStore::append(&store, draft("a")).await.unwrap();

        let refunded = store
            .set_status(&record.id, PaymentStatus::Refunded)
            .await
            .unwrap();
        assert_eq!(refunded.status, PaymentStatus::Refunded);

        // Retrying the refund leaves the record refunded
        let again = store
            .set_status(&record.id, PaymentStatus::Refunded)
            .await
            .unwrap();
        assert_eq!(again.status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn test_refunded_never_returns_to_authorized() {
        let store = MemoryStore::new();
        let record = PaymentStore::append(&store, draft("a")).await.unwrap();
        store
            .set_status(&record.id, PaymentStatus::Refunded)
            .await
            .unwrap();

        let err = store
            .set_status(&record.id, PaymentStatus::Authorized)
            .await
            .unwrap_err();
        assert!(matches!(err, DepositError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_set_status_unknown_id() {
        let store = MemoryStore::new();
        let err = store
            .set_status("DEMO-NOPE1234", PaymentStatus::Refunded)
            .await
            .unwrap_err();
        assert!(matches!(err, DepositError::RecordNotFound { .. }));
    }

    #[tokio::test]
    async fn test_attach_payment() {
        let store = MemoryStore::new();
        let request = RequestStore::append(&store, request_draft("a")).await.unwrap();
        assert!(request.payment_id.is_none());

        store
            .attach_payment(&request.id, "DEMO-ABCD1234")
            .await
            .unwrap();

        let all = RequestStore::list_all(&store).await.unwrap();
        assert_eq!(all[0].payment_id.as_deref(), Some("DEMO-ABCD1234"));

        let err = store
            .attach_payment("missing", "DEMO-ABCD1234")
            .await
            .unwrap_err();
        assert!(matches!(err, DepositError::RecordNotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_request() {
        let store = MemoryStore::new();
        let request = RequestStore::append(&store, request_draft("a")).await.unwrap();

        RequestStore::delete(&store, &request.id).await.unwrap();
        assert!(RequestStore::list_all(&store).await.unwrap().is_empty());

        let err = RequestStore::delete(&store, &request.id).await.unwrap_err();
        assert!(matches!(err, DepositError::RecordNotFound { .. }));
    }

    #[tokio::test]
    async fn test_clear_wipes_collection() {
        let store = MemoryStore::new();
        PaymentStore::append(&store, draft("a")).await.unwrap();
        PaymentStore::append(&store, draft("b")).await.unwrap();

        PaymentStore::clear(&store).await.unwrap();
        assert!(PaymentStore::list_all(&store).await.unwrap().is_empty());
    }
}
