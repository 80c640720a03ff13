//! # Payment & Request Records
//!
//! Persisted record shapes for the deposit engine: payment records with
//! their status lifecycle, and the dorm waitlist requests they attach to.
//! Optional fields are explicit members, never inferred at runtime.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Fixed reservation deposit for the card checkout variant, in whole KZT
pub const DEPOSIT_AMOUNT: i64 = 5_000;

/// Fixed reservation deposit for the demo checkout variant, in whole KZT
pub const DEMO_DEPOSIT_AMOUNT: i64 = 10_000;

/// Prefix on every generated payment id
pub const PAYMENT_ID_PREFIX: &str = "DEMO-";

const ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ID_LEN: usize = 8;

/// Generate a short uppercase base-36 token, e.g. `K3F8A2QZ`
pub fn short_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LEN)
        .map(|_| ID_CHARSET[rng.gen_range(0..ID_CHARSET.len())] as char)
        .collect()
}

/// Generate a payment id, e.g. `DEMO-K3F8A2QZ`
pub fn payment_id() -> String {
    format!("{}{}", PAYMENT_ID_PREFIX, short_id())
}

/// Payment record lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Deposit hold placed (card checkout variant)
    Authorized,
    /// Simulated gateway success (demo variant)
    Success,
    /// Simulated gateway decline; never persisted
    Declined,
    /// Deposit released back; terminal
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Authorized => "authorized",
            PaymentStatus::Success => "success",
            PaymentStatus::Declined => "declined",
            PaymentStatus::Refunded => "refunded",
        }
    }

    /// Whether a stored record may move from `self` to `to`.
    ///
    /// `Authorized` and `Success` may be refunded exactly once.
    /// `Refunded -> Refunded` is permitted as an idempotent no-op;
    /// everything else out of a terminal state is refused.
    pub fn can_transition_to(&self, to: PaymentStatus) -> bool {
        match (self, to) {
            (PaymentStatus::Authorized, PaymentStatus::Refunded) => true,
            (PaymentStatus::Success, PaymentStatus::Refunded) => true,
            (PaymentStatus::Refunded, PaymentStatus::Refunded) => true,
            (a, b) if *a == b => true,
            _ => false,
        }
    }

    /// Terminal states never leave their status (other than no-op retries)
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Declined | PaymentStatus::Refunded)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the deposit was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Platform-native payment sheet (opportunistic probe on open)
    PaymentRequest,
    /// Manually entered mock card
    MockCard,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::PaymentRequest => "PaymentRequest",
            PaymentMethod::MockCard => "MockCard",
        }
    }
}

/// A persisted deposit payment record.
///
/// Created only by the checkout state machine on a non-declined attempt;
/// `id` and `timestamp` are assigned by the store and immutable after that.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    /// Unique id, `DEMO-` + 8 uppercase base-36 chars
    pub id: String,

    /// Back-reference to the waitlist request; not validated for existence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// Dorm the deposit holds
    pub dorm_id: String,

    /// Dorm name, denormalized for receipts
    pub dorm_name: String,

    /// Whole KZT, fixed per variant, never user-editable
    pub amount: i64,

    /// Payment path used
    pub method: PaymentMethod,

    /// Lifecycle status
    pub status: PaymentStatus,

    /// Last 4 digits, populated only for the manual-card path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_last4: Option<String>,

    /// Owning user, when a session was present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Creation time, immutable
    pub timestamp: DateTime<Utc>,
}

/// A payment record before the store assigns id and timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub dorm_id: String,
    pub dorm_name: String,
    pub amount: i64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_last4: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl PaymentDraft {
    /// Materialize the draft with a fresh id and creation timestamp
    pub fn into_record(self) -> PaymentRecord {
        PaymentRecord {
            id: payment_id(),
            request_id: self.request_id,
            dorm_id: self.dorm_id,
            dorm_name: self.dorm_name,
            amount: self.amount,
            method: self.method,
            status: self.status,
            card_last4: self.card_last4,
            user_id: self.user_id,
            timestamp: Utc::now(),
        }
    }
}

/// How the requester wants to be reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactType {
    Email,
    Telegram,
}

impl Default for ContactType {
    fn default() -> Self {
        ContactType::Email
    }
}

/// A dorm waitlist/interest request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DormRequest {
    /// Short uppercase id
    pub id: String,
    pub dorm_id: String,
    pub dorm_name: String,
    pub full_name: String,
    pub university: String,
    #[serde(default)]
    pub contact_type: ContactType,
    pub contact_value: String,
    pub room_type: String,
    /// Monthly budget in whole KZT
    pub budget: i64,
    pub move_in_month: String,
    /// Set once a deposit is taken for this request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A request before the store assigns id and timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDraft {
    pub dorm_id: String,
    pub dorm_name: String,
    pub full_name: String,
    pub university: String,
    #[serde(default)]
    pub contact_type: ContactType,
    pub contact_value: String,
    pub room_type: String,
    pub budget: i64,
    pub move_in_month: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl RequestDraft {
    /// Materialize the draft with a fresh id and creation timestamp
    pub fn into_record(self) -> DormRequest {
        DormRequest {
            id: short_id(),
            dorm_id: self.dorm_id,
            dorm_name: self.dorm_name,
            full_name: self.full_name,
            university: self.university,
            contact_type: self.contact_type,
            contact_value: self.contact_value,
            room_type: self.room_type,
            budget: self.budget,
            move_in_month: self.move_in_month,
            payment_id: None,
            user_id: self.user_id,
            timestamp: Utc::now(),
        }
    }
}
