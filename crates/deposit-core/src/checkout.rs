//! # Checkout State Machine
//!
//! The deposit checkout flow: `Init -> AwaitingCard -> Processing ->
//! Success | Declined`, driven by user input and one simulated gateway
//! round trip. Exactly one state is active at a time, and a record is
//! appended only on a non-declined outcome, strictly after the
//! processing delay resolves.

use crate::card::{luhn_check, CardForm, FieldError};
use crate::error::{DepositError, DepositResult};
use crate::events::SharedEventSink;
use crate::record::{
    PaymentDraft, PaymentMethod, PaymentRecord, PaymentStatus, DEMO_DEPOSIT_AMOUNT,
    DEPOSIT_AMOUNT,
};
use crate::store::{SharedPaymentStore, SharedRequestStore};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

/// Simulated gateway round-trip latency
pub const PROCESSING_DELAY: Duration = Duration::from_millis(1500);

/// Decline probability of the probabilistic (demo) variant
pub const DECLINE_RATE: f64 = 0.125;

/// How a validated submission is resolved into an outcome
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeclinePolicy {
    /// Success iff the Luhn check passes; since the form validator
    /// already required it, this path effectively always succeeds
    Deterministic,
    /// Decline with fixed probability, independent of input correctness.
    /// Models gateway-level declines.
    Probabilistic { rate: f64 },
}

impl DeclinePolicy {
    /// Draw the outcome for a submitted card. Returns true on decline.
    pub fn draw(&self, card_number: &str, rng: &mut StdRng) -> bool {
        match self {
            DeclinePolicy::Deterministic => !luhn_check(card_number),
            DeclinePolicy::Probabilistic { rate } => rng.gen::<f64>() < *rate,
        }
    }
}

/// The mutually exclusive checkout states
#[derive(Debug, Clone)]
pub enum CheckoutState {
    /// Dialog opened, probing the platform payment sheet
    Init,
    /// Manual card entry form is showing
    AwaitingCard,
    /// Simulated gateway round trip in flight
    Processing,
    /// Terminal for the attempt; record was stored
    Success(PaymentRecord),
    /// Terminal for the attempt; nothing was stored
    Declined { message: String },
    /// Flow aborted by the user
    Closed,
}

impl CheckoutState {
    pub fn name(&self) -> &'static str {
        match self {
            CheckoutState::Init => "init",
            CheckoutState::AwaitingCard => "card",
            CheckoutState::Processing => "processing",
            CheckoutState::Success(_) => "success",
            CheckoutState::Declined { .. } => "declined",
            CheckoutState::Closed => "closed",
        }
    }
}

/// Result of one card-form submission
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// Validation failed; no transition happened
    Rejected(Vec<FieldError>),
    /// Deposit taken; exactly one record was appended
    Approved(PaymentRecord),
    /// Simulated gateway decline; nothing was stored
    Declined { message: String },
}

/// Per-session checkout configuration
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub dorm_id: String,
    pub dorm_name: String,
    /// Parent waitlist request, when the flow was entered from one
    pub request_id: Option<String>,
    pub user_id: Option<String>,
    /// Fixed deposit, never user-editable
    pub amount: i64,
    pub delay: Duration,
    pub policy: DeclinePolicy,
    /// Status stamped onto the stored record on success
    pub recorded_status: PaymentStatus,
}

impl CheckoutConfig {
    /// The card checkout variant: 5 000 KZT hold, deterministic outcome
    pub fn deposit(dorm_id: impl Into<String>, dorm_name: impl Into<String>) -> Self {
        Self {
            dorm_id: dorm_id.into(),
            dorm_name: dorm_name.into(),
            request_id: None,
            user_id: None,
            amount: DEPOSIT_AMOUNT,
            delay: PROCESSING_DELAY,
            policy: DeclinePolicy::Deterministic,
            recorded_status: PaymentStatus::Authorized,
        }
    }

    /// The demo variant: 10 000 KZT, 12.5% simulated decline rate
    pub fn demo(dorm_id: impl Into<String>, dorm_name: impl Into<String>) -> Self {
        Self {
            dorm_id: dorm_id.into(),
            dorm_name: dorm_name.into(),
            request_id: None,
            user_id: None,
            amount: DEMO_DEPOSIT_AMOUNT,
            delay: PROCESSING_DELAY,
            policy: DeclinePolicy::Probabilistic { rate: DECLINE_RATE },
            recorded_status: PaymentStatus::Success,
        }
    }

    pub fn with_request(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_policy(mut self, policy: DeclinePolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Platform-native payment sheet capability.
///
/// Probed once when the dialog opens; unavailable or cancelled is a
/// normal branch that falls through to manual card entry, never an error.
#[async_trait]
pub trait PaymentSheet: Send + Sync {
    /// One opportunistic attempt, no retry. Returns whether the user
    /// completed payment through the sheet.
    async fn probe(&self, amount: i64) -> bool;
}

/// The always-absent capability (the common case in this prototype)
pub struct NoPaymentSheet;

#[async_trait]
impl PaymentSheet for NoPaymentSheet {
    async fn probe(&self, _amount: i64) -> bool {
        false
    }
}

/// One checkout dialog session.
///
/// Holds a transient reference to at most the one record it created;
/// closing after success resets it for a fresh attempt. Dropping the
/// session mid-`Processing` discards the in-flight result: the store
/// append happens only after the delay resolves.
pub struct CheckoutSession {
    config: CheckoutConfig,
    state: CheckoutState,
    payments: SharedPaymentStore,
    requests: SharedRequestStore,
    events: SharedEventSink,
    rng: StdRng,
}

impl CheckoutSession {
    pub fn new(
        config: CheckoutConfig,
        payments: SharedPaymentStore,
        requests: SharedRequestStore,
        events: SharedEventSink,
    ) -> Self {
        Self {
            config,
            state: CheckoutState::Init,
            payments,
            requests,
            events,
            rng: StdRng::from_entropy(),
        }
    }

    /// Seed the outcome draws, making the probabilistic path
    /// deterministic in tests
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    /// Open the dialog: probe the payment sheet once, then either
    /// finalize immediately (sheet accepted) or show the card form.
    pub async fn open(&mut self, sheet: &dyn PaymentSheet) -> DepositResult<&CheckoutState> {
        self.state = CheckoutState::Init;
        self.events.emit(
            "open_checkout",
            json!({ "requestId": self.config.request_id, "amount": self.config.amount }),
        );

        if sheet.probe(self.config.amount).await {
            self.events.emit(
                "payment_attempt",
                json!({ "requestId": self.config.request_id, "method": "PaymentRequest" }),
            );
            self.finalize(PaymentMethod::PaymentRequest, None).await?;
        } else {
            self.state = CheckoutState::AwaitingCard;
        }

        Ok(&self.state)
    }

    /// Submit the manual card form.
    ///
    /// Validation failures are reported per field without a transition.
    /// A validated submit holds in `Processing` for the simulated
    /// latency window, then resolves via the decline policy.
    pub async fn submit_card(&mut self, form: &CardForm) -> DepositResult<SubmitOutcome> {
        if !matches!(self.state, CheckoutState::AwaitingCard) {
            return Err(DepositError::InvalidTransition {
                from: self.state.name().to_string(),
                to: "processing".to_string(),
            });
        }

        let errors = form.validate();
        if !errors.is_empty() {
            return Ok(SubmitOutcome::Rejected(errors));
        }

        self.events.emit(
            "payment_attempt",
            json!({ "requestId": self.config.request_id, "method": "MockCard" }),
        );
        self.state = CheckoutState::Processing;

        tokio::time::sleep(self.config.delay).await;

        if self.config.policy.draw(&form.number, &mut self.rng) {
            let message = "Payment failed. Please check your card details.".to_string();
            let event = match self.config.policy {
                DeclinePolicy::Deterministic => "payment_failure",
                DeclinePolicy::Probabilistic { .. } => "mock_pay_decline",
            };
            self.events.emit(
                event,
                json!({ "requestId": self.config.request_id, "method": "MockCard" }),
            );
            self.state = CheckoutState::Declined {
                message: message.clone(),
            };
            return Ok(SubmitOutcome::Declined { message });
        }

        let record = self.finalize(PaymentMethod::MockCard, form.last4()).await?;
        Ok(SubmitOutcome::Approved(record))
    }

    /// Return from `Declined` to the card form, clearing the banner.
    /// Entered field values are the caller's to keep.
    pub fn retry(&mut self) -> DepositResult<&CheckoutState> {
        match self.state {
            CheckoutState::Declined { .. } => {
                self.state = CheckoutState::AwaitingCard;
                Ok(&self.state)
            }
            _ => Err(DepositError::InvalidTransition {
                from: self.state.name().to_string(),
                to: "card".to_string(),
            }),
        }
    }

    /// Abort the flow without creating any record
    pub fn skip(&mut self) {
        self.events.emit(
            "payment_skip",
            json!({ "requestId": self.config.request_id }),
        );
        self.state = CheckoutState::Closed;
    }

    /// Close the dialog. After success this resets the session so it can
    /// be reopened fresh; before success it behaves as skip.
    pub fn close(&mut self) {
        match self.state {
            CheckoutState::Success(_) => {
                self.state = CheckoutState::Init;
            }
            CheckoutState::Closed => {}
            _ => self.skip(),
        }
    }

    /// Store the record, attach it to the parent request, emit the
    /// success event, and land in `Success`.
    async fn finalize(
        &mut self,
        method: PaymentMethod,
        card_last4: Option<String>,
    ) -> DepositResult<PaymentRecord> {
        let draft = PaymentDraft {
            request_id: self.config.request_id.clone(),
            dorm_id: self.config.dorm_id.clone(),
            dorm_name: self.config.dorm_name.clone(),
            amount: self.config.amount,
            method,
            status: self.config.recorded_status,
            card_last4,
            user_id: self.config.user_id.clone(),
        };

        let record = self.payments.append(draft).await?;

        // Fire-and-forget: a missing parent request must not fail checkout
        if let Some(request_id) = &self.config.request_id {
            if let Err(err) = self.requests.attach_payment(request_id, &record.id).await {
                warn!(request_id = %request_id, %err, "failed to attach payment to request");
            }
        }

        self.events.emit(
            "payment_success",
            json!({
                "requestId": self.config.request_id,
                "paymentId": record.id,
                "method": method.as_str(),
                "amount": record.amount,
            }),
        );
        info!(payment_id = %record.id, method = method.as_str(), "deposit recorded");

        self.state = CheckoutState::Success(record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemoryEventLog;
    use crate::store::{MemoryStore, PaymentStore, RequestStore};
    use crate::record::{ContactType, RequestDraft};
    use std::sync::Arc;

    struct AcceptingSheet;

    #[async_trait]
    impl PaymentSheet for AcceptingSheet {
        async fn probe(&self, _amount: i64) -> bool {
            true
        }
    }

    fn session_with(
        config: CheckoutConfig,
    ) -> (CheckoutSession, Arc<MemoryStore>, Arc<MemoryEventLog>) {
        let store = Arc::new(MemoryStore::new());
        let events = Arc::new(MemoryEventLog::new());
        let session = CheckoutSession::new(
            config,
            store.clone(),
            store.clone(),
            events.clone(),
        )
        .with_seed(7);
        (session, store, events)
    }

    fn valid_form() -> CardForm {
        CardForm::new("Aigerim S.", "4532 0151 1283 0366", "12/99", "123")
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_a_deterministic_success() {
        let (mut session, store, events) =
            session_with(CheckoutConfig::deposit("kaznu-abai-3", "KazNU Abai Dorm 3"));

        session.open(&NoPaymentSheet).await.unwrap();
        assert!(matches!(session.state(), CheckoutState::AwaitingCard));

        let outcome = session.submit_card(&valid_form()).await.unwrap();
        let record = match outcome {
            SubmitOutcome::Approved(record) => record,
            other => panic!("expected approval, got {:?}", other),
        };

        assert!(matches!(session.state(), CheckoutState::Success(_)));
        assert_eq!(record.amount, DEPOSIT_AMOUNT);
        assert_eq!(record.method, PaymentMethod::MockCard);
        assert_eq!(record.status, PaymentStatus::Authorized);
        assert_eq!(record.card_last4.as_deref(), Some("0366"));

        // Exactly one record stored
        assert_eq!(PaymentStore::list_all(&*store).await.unwrap().len(), 1);
        assert_eq!(
            events.event_names(),
            vec!["open_checkout", "payment_attempt", "payment_success"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_b_luhn_failure_rejected() {
        let (mut session, store, _events) =
            session_with(CheckoutConfig::deposit("d1", "Dorm 1"));
        session.open(&NoPaymentSheet).await.unwrap();

        let form = CardForm::new("Aigerim S.", "1234 5678 9012 3456", "12/99", "123");
        let outcome = session.submit_card(&form).await.unwrap();

        match outcome {
            SubmitOutcome::Rejected(errors) => {
                assert!(errors.iter().any(|e| e.field == "number"));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        // No transition, nothing stored
        assert!(matches!(session.state(), CheckoutState::AwaitingCard));
        assert!(PaymentStore::list_all(&*store).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_c_expired_card_rejected() {
        let (mut session, store, _events) =
            session_with(CheckoutConfig::deposit("d1", "Dorm 1"));
        session.open(&NoPaymentSheet).await.unwrap();

        let form = CardForm::new("Aigerim S.", "4532 0151 1283 0366", "01/20", "123");
        let outcome = session.submit_card(&form).await.unwrap();

        match outcome {
            SubmitOutcome::Rejected(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "expiry");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        assert!(matches!(session.state(), CheckoutState::AwaitingCard));
        assert!(PaymentStore::list_all(&*store).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_payment_sheet_accepted_path() {
        let (mut session, store, _events) =
            session_with(CheckoutConfig::deposit("d1", "Dorm 1"));

        session.open(&AcceptingSheet).await.unwrap();

        let record = match session.state() {
            CheckoutState::Success(record) => record.clone(),
            other => panic!("expected success, got {:?}", other),
        };
        assert_eq!(record.method, PaymentMethod::PaymentRequest);
        assert!(record.card_last4.is_none());
        assert_eq!(PaymentStore::list_all(&*store).await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probabilistic_decline_stores_nothing() {
        let config = CheckoutConfig::demo("d1", "Dorm 1")
            .with_policy(DeclinePolicy::Probabilistic { rate: 1.0 });
        let (mut session, store, events) = session_with(config);
        session.open(&NoPaymentSheet).await.unwrap();

        let outcome = session.submit_card(&valid_form()).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Declined { .. }));
        assert!(matches!(session.state(), CheckoutState::Declined { .. }));
        assert!(PaymentStore::list_all(&*store).await.unwrap().is_empty());
        assert!(events
            .event_names()
            .contains(&"mock_pay_decline".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_probabilistic_success_stores_exactly_one() {
        let config = CheckoutConfig::demo("d1", "Dorm 1")
            .with_policy(DeclinePolicy::Probabilistic { rate: 0.0 });
        let (mut session, store, _events) = session_with(config);
        session.open(&NoPaymentSheet).await.unwrap();

        let outcome = session.submit_card(&valid_form()).await.unwrap();
        let record = match outcome {
            SubmitOutcome::Approved(record) => record,
            other => panic!("expected approval, got {:?}", other),
        };
        assert_eq!(record.amount, DEMO_DEPOSIT_AMOUNT);
        assert_eq!(record.status, PaymentStatus::Success);
        assert_eq!(PaymentStore::list_all(&*store).await.unwrap().len(), 1);
    }

    #[test]
    fn test_decline_rate_converges() {
        let policy = DeclinePolicy::Probabilistic { rate: DECLINE_RATE };
        let mut rng = StdRng::seed_from_u64(42);

        let trials = 10_000;
        let declines = (0..trials)
            .filter(|_| policy.draw("4532015112830366", &mut rng))
            .count();

        let observed = declines as f64 / trials as f64;
        // 12.5% within generous sampling tolerance
        assert!(
            (observed - DECLINE_RATE).abs() < 0.02,
            "observed decline rate {} too far from {}",
            observed,
            DECLINE_RATE
        );
    }

    #[test]
    fn test_deterministic_policy_never_declines_valid_cards() {
        let policy = DeclinePolicy::Deterministic;
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1_000 {
            assert!(!policy.draw("4532015112830366", &mut rng));
        }
        assert!(policy.draw("1234567890123456", &mut rng));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_decline() {
        let config = CheckoutConfig::demo("d1", "Dorm 1")
            .with_policy(DeclinePolicy::Probabilistic { rate: 1.0 });
        let (mut session, _store, _events) = session_with(config);
        session.open(&NoPaymentSheet).await.unwrap();
        session.submit_card(&valid_form()).await.unwrap();

        session.retry().unwrap();
        assert!(matches!(session.state(), CheckoutState::AwaitingCard));

        // Retry only makes sense from Declined
        let err = session.retry().unwrap_err();
        assert!(matches!(err, DepositError::InvalidTransition { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_creates_no_record() {
        let (mut session, store, events) =
            session_with(CheckoutConfig::deposit("d1", "Dorm 1"));
        session.open(&NoPaymentSheet).await.unwrap();

        session.skip();
        assert!(matches!(session.state(), CheckoutState::Closed));
        assert!(PaymentStore::list_all(&*store).await.unwrap().is_empty());
        assert!(events.event_names().contains(&"payment_skip".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_after_success_resets() {
        let (mut session, _store, _events) =
            session_with(CheckoutConfig::deposit("d1", "Dorm 1"));
        session.open(&NoPaymentSheet).await.unwrap();
        session.submit_card(&valid_form()).await.unwrap();
        assert!(matches!(session.state(), CheckoutState::Success(_)));

        session.close();
        assert!(matches!(session.state(), CheckoutState::Init));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_outside_card_state_refused() {
        let (mut session, _store, _events) =
            session_with(CheckoutConfig::deposit("d1", "Dorm 1"));

        // Never opened: still in Init
        let err = session.submit_card(&valid_form()).await.unwrap_err();
        assert!(matches!(err, DepositError::InvalidTransition { .. }));

        // After success, a second submit is refused too
        session.open(&NoPaymentSheet).await.unwrap();
        session.submit_card(&valid_form()).await.unwrap();
        let err = session.submit_card(&valid_form()).await.unwrap_err();
        assert!(matches!(err, DepositError::InvalidTransition { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_attaches_payment_to_request() {
        let store = Arc::new(MemoryStore::new());
        let events = Arc::new(MemoryEventLog::new());

        let request = RequestStore::append(
            &*store,
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

        let config = CheckoutConfig::deposit("d1", "Dorm 1").with_request(request.id.clone());
        let mut session =
            CheckoutSession::new(config, store.clone(), store.clone(), events).with_seed(3);

        session.open(&NoPaymentSheet).await.unwrap();
        let outcome = session.submit_card(&valid_form()).await.unwrap();
        let record = match outcome {
            SubmitOutcome::Approved(record) => record,
            other => panic!("expected approval, got {:?}", other),
        };

        let requests = RequestStore::list_all(&*store).await.unwrap();
        assert_eq!(requests[0].payment_id.as_deref(), Some(record.id.as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_request_does_not_fail_checkout() {
        let config = CheckoutConfig::deposit("d1", "Dorm 1").with_request("GONE1234");
        let (mut session, store, _events) = session_with(config);
        session.open(&NoPaymentSheet).await.unwrap();

        let outcome = session.submit_card(&valid_form()).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Approved(_)));
        assert_eq!(PaymentStore::list_all(&*store).await.unwrap().len(), 1);
    }
}
