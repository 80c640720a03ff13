//! # deposit-core
//!
//! Core types and logic for the dorm-deposit engine.
//!
//! This crate provides:
//! - Card validation (Luhn checksum, expiry window, input formatters)
//! - `CheckoutSession` state machine for the mock deposit flow
//! - `PaymentStore` / `RequestStore` traits and the in-memory backend
//! - `EventSink` for fire-and-forget analytics events
//! - `DormCatalog` listings and auth primitives
//! - `DepositError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use deposit_core::{
//!     CardForm, CheckoutConfig, CheckoutSession, MemoryStore, NoPaymentSheet,
//!     NullSink, SubmitOutcome,
//! };
//! use std::sync::Arc;
//!
//! let (payments, requests) = MemoryStore::shared();
//! let config = CheckoutConfig::deposit("kaznu-abai-3", "KazNU Abai Dorm 3");
//! let mut session = CheckoutSession::new(config, payments, requests, Arc::new(NullSink));
//!
//! session.open(&NoPaymentSheet).await?;
//!
//! let form = CardForm::new("Aigerim S.", "4532 0151 1283 0366", "12/27", "123");
//! match session.submit_card(&form).await? {
//!     SubmitOutcome::Approved(record) => println!("deposit {} held", record.id),
//!     SubmitOutcome::Declined { message } => println!("declined: {}", message),
//!     SubmitOutcome::Rejected(errors) => println!("{} field errors", errors.len()),
//! }
//! ```

pub mod auth;
pub mod card;
pub mod catalog;
pub mod checkout;
pub mod error;
pub mod events;
pub mod record;
pub mod store;

// Re-exports for convenience
pub use auth::{validate_password, SafeUser, Session, User};
pub use card::{
    card_last4, format_card_number, format_expiry, is_valid_cvc, luhn_check, validate_expiry,
    CardForm, FieldError,
};
pub use catalog::{Dorm, DormCatalog, GenderPolicy};
pub use checkout::{
    CheckoutConfig, CheckoutSession, CheckoutState, DeclinePolicy, NoPaymentSheet, PaymentSheet,
    SubmitOutcome, DECLINE_RATE, PROCESSING_DELAY,
};
pub use error::{DepositError, DepositResult};
pub use events::{EventSink, MemoryEventLog, NullSink, SharedEventSink, TrackedEvent};
pub use record::{
    ContactType, DormRequest, PaymentDraft, PaymentMethod, PaymentRecord, PaymentStatus,
    RequestDraft, DEMO_DEPOSIT_AMOUNT, DEPOSIT_AMOUNT,
};
pub use store::{
    MemoryStore, PaymentStore, RequestStore, SharedPaymentStore, SharedRequestStore,
};
