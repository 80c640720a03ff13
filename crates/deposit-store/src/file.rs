//! # JSON File Store
//!
//! One pretty-printed JSON array per collection under a data directory,
//! matching the mirror server's `data/*.json` layout. A missing file
//! reads as an empty collection; writes replace the whole file
//! (last-writer-wins, per the prototype's persistence contract).

use async_trait::async_trait;
use deposit_core::auth::{Session, User};
use deposit_core::error::{DepositError, DepositResult};
use deposit_core::record::{DormRequest, PaymentDraft, PaymentRecord, PaymentStatus, RequestDraft};
use deposit_core::store::{apply_status, PaymentStore, RequestStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

const PAYMENTS: &str = "payments";
const REQUESTS: &str = "requests";
const USERS: &str = "users";
const SESSIONS: &str = "sessions";

/// Flat-file JSON store for every collection the mirror serves
pub struct JsonFileStore {
    data_dir: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    /// Cross-process writers stay last-writer-wins.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open a store rooted at `data_dir`, creating the directory if needed
    pub fn open(data_dir: impl Into<PathBuf>) -> DepositResult<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)
            .map_err(|e| DepositError::Storage(format!("create {}: {}", data_dir.display(), e)))?;
        Ok(Self {
            data_dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn collection_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", name))
    }

    async fn read_collection<T: DeserializeOwned>(&self, name: &str) -> DepositResult<Vec<T>> {
        let path = self.collection_path(name);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                DepositError::Storage(format!("parse {}: {}", path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(DepositError::Storage(format!(
                "read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn write_collection<T: Serialize>(&self, name: &str, items: &[T]) -> DepositResult<()> {
        let path = self.collection_path(name);
        let contents = serde_json::to_string_pretty(items)?;
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| DepositError::Storage(format!("write {}: {}", path.display(), e)))?;
        debug!(collection = name, count = items.len(), "collection written");
        Ok(())
    }

    // User and session collections are consumed by the API crate only

    pub async fn list_users(&self) -> DepositResult<Vec<User>> {
        self.read_collection(USERS).await
    }

    pub async fn add_user(&self, user: User) -> DepositResult<User> {
        let _guard = self.write_lock.lock().await;
        let mut users: Vec<User> = self.read_collection(USERS).await?;
        if users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(DepositError::DuplicateEmail {
                email: user.email.clone(),
            });
        }
        users.push(user.clone());
        self.write_collection(USERS, &users).await?;
        Ok(user)
    }

    pub async fn find_user_by_email(&self, email: &str) -> DepositResult<Option<User>> {
        let users = self.list_users().await?;
        Ok(users
            .into_iter()
            .find(|u| u.email.eq_ignore_ascii_case(email)))
    }

    pub async fn add_session(&self, session: Session) -> DepositResult<Session> {
        let _guard = self.write_lock.lock().await;
        let mut sessions: Vec<Session> = self.read_collection(SESSIONS).await?;
        sessions.push(session.clone());
        self.write_collection(SESSIONS, &sessions).await?;
        Ok(session)
    }

    /// Look up the session behind a bearer token
    pub async fn find_session(&self, token: &str) -> DepositResult<Option<Session>> {
        let sessions: Vec<Session> = self.read_collection(SESSIONS).await?;
        Ok(sessions.into_iter().find(|s| s.token == token))
    }
}

#[async_trait]
impl PaymentStore for JsonFileStore {
    async fn append(&self, draft: PaymentDraft) -> DepositResult<PaymentRecord> {
        let _guard = self.write_lock.lock().await;
        let record = draft.into_record();
        let mut payments: Vec<PaymentRecord> = self.read_collection(PAYMENTS).await?;
        payments.push(record.clone());
        self.write_collection(PAYMENTS, &payments).await?;
        Ok(record)
    }

    async fn list_all(&self) -> DepositResult<Vec<PaymentRecord>> {
        self.read_collection(PAYMENTS).await
    }

    async fn set_status(&self, id: &str, status: PaymentStatus) -> DepositResult<PaymentRecord> {
        let _guard = self.write_lock.lock().await;
        let mut payments: Vec<PaymentRecord> = self.read_collection(PAYMENTS).await?;
        let record = payments
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| DepositError::RecordNotFound { id: id.to_string() })?;
        apply_status(record, status)?;
        let updated = record.clone();
        self.write_collection(PAYMENTS, &payments).await?;
        Ok(updated)
    }

    async fn clear(&self) -> DepositResult<()> {
        let _guard = self.write_lock.lock().await;
        self.write_collection::<PaymentRecord>(PAYMENTS, &[]).await
    }
}

#[async_trait]
impl RequestStore for JsonFileStore {
    async fn append(&self, draft: RequestDraft) -> DepositResult<DormRequest> {
        let _guard = self.write_lock.lock().await;
        let request = draft.into_record();
        let mut requests: Vec<DormRequest> = self.read_collection(REQUESTS).await?;
        requests.push(request.clone());
        self.write_collection(REQUESTS, &requests).await?;
        Ok(request)
    }

    async fn list_all(&self) -> DepositResult<Vec<DormRequest>> {
        self.read_collection(REQUESTS).await
    }

    async fn delete(&self, id: &str) -> DepositResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut requests: Vec<DormRequest> = self.read_collection(REQUESTS).await?;
        let before = requests.len();
        requests.retain(|r| r.id != id);
        if requests.len() == before {
            return Err(DepositError::RecordNotFound { id: id.to_string() });
        }
        self.write_collection(REQUESTS, &requests).await
    }

    async fn attach_payment(&self, request_id: &str, payment_id: &str) -> DepositResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut requests: Vec<DormRequest> = self.read_collection(REQUESTS).await?;
        let request = requests
            .iter_mut()
            .find(|r| r.id == request_id)
            .ok_or_else(|| DepositError::RecordNotFound {
                id: request_id.to_string(),
            })?;
        request.payment_id = Some(payment_id.to_string());
        self.write_collection(REQUESTS, &requests).await
    }

    async fn clear(&self) -> DepositResult<()> {
        let _guard = self.write_lock.lock().await;
        self.write_collection::<DormRequest>(REQUESTS, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deposit_core::record::{ContactType, PaymentMethod, DEPOSIT_AMOUNT};
    use tempfile::TempDir;

    fn draft() -> PaymentDraft {
        PaymentDraft {
            request_id: None,
            dorm_id: "kaznu-abai-3".into(),
            dorm_name: "KazNU Abai Dorm 3".into(),
            amount: DEPOSIT_AMOUNT,
            method: PaymentMethod::MockCard,
            status: PaymentStatus::Authorized,
            card_last4: Some("0366".into()),
            user_id: None,
        }
    }

    #[tokio::test]
    async fn test_payments_survive_reopen() {
        let dir = TempDir::new().unwrap();

        let id = {
            let store = JsonFileStore::open(dir.path()).unwrap();
            PaymentStore::append(&store, draft()).await.unwrap().id
        };

        // Fresh handle over the same directory sees the record
        let store = JsonFileStore::open(dir.path()).unwrap();
        let all = PaymentStore::list_all(&store).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, id);
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert!(PaymentStore::list_all(&store).await.unwrap().is_empty());
        assert!(RequestStore::list_all(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_status_persists() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        let record = PaymentStore::append(&store, draft()).await.unwrap();

        store
            .set_status(&record.id, PaymentStatus::Refunded)
            .await
            .unwrap();

        let reopened = JsonFileStore::open(dir.path()).unwrap();
        let all = PaymentStore::list_all(&reopened).await.unwrap();
        assert_eq!(all[0].status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn test_refund_transition_rules_apply() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        let record = PaymentStore::append(&store, draft()).await.unwrap();

        store
            .set_status(&record.id, PaymentStatus::Refunded)
            .await
            .unwrap();
        // Idempotent retry
        store
            .set_status(&record.id, PaymentStatus::Refunded)
            .await
            .unwrap();
        // Never back to authorized
        let err = store
            .set_status(&record.id, PaymentStatus::Authorized)
            .await
            .unwrap_err();
        assert!(matches!(err, DepositError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_request_attach_and_delete() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();

        let request = RequestStore::append(
            &store,
            RequestDraft {
                dorm_id: "d1".into(),
                dorm_name: "Dorm 1".into(),
                full_name: "Aigerim S.".into(),
                university: "KazNU".into(),
                contact_type: ContactType::Email,
                contact_value: "a@b.kz".into(),
                room_type: "2-bed".into(),
                budget: 60_000,
                move_in_month: "2026-09".into(),
                user_id: None,
            },
        )
        .await
        .unwrap();

        store
            .attach_payment(&request.id, "DEMO-ABCD1234")
            .await
            .unwrap();
        let all = RequestStore::list_all(&store).await.unwrap();
        assert_eq!(all[0].payment_id.as_deref(), Some("DEMO-ABCD1234"));

        RequestStore::delete(&store, &request.id).await.unwrap();
        assert!(RequestStore::list_all(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();

        let user = User::new("A", "a@x.kz", "s3curepass", None);
        store.add_user(user).await.unwrap();

        let dup = User::new("B", "A@X.KZ", "0therpass", None);
        let err = store.add_user(dup).await.unwrap_err();
        assert!(matches!(err, DepositError::DuplicateEmail { .. }));
    }

    #[tokio::test]
    async fn test_session_lookup() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();

        let session = Session::new("user-1");
        let token = session.token.clone();
        store.add_session(session).await.unwrap();

        let found = store.find_session(&token).await.unwrap().unwrap();
        assert_eq!(found.user_id, "user-1");
        assert!(store.find_session("bogus").await.unwrap().is_none());
    }
}
