//! # Card Validation
//!
//! Pure, stateless card-input helpers: Luhn checksum, expiry window,
//! and the input formatters the checkout form applies on every keystroke.
//! No I/O and no side effects anywhere in this module.

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Luhn checksum over a card number.
///
/// Whitespace is stripped first; any remaining non-digit (or an empty
/// string) fails immediately. This validates well-formedness only, not
/// that the card is real or authorized.
pub fn luhn_check(card_number: &str) -> bool {
    let digits: String = card_number.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }

    let mut sum = 0u32;
    let mut double = false;

    for c in digits.chars().rev() {
        let mut digit = c.to_digit(10).unwrap_or(0);
        if double {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
        double = !double;
    }

    sum % 10 == 0
}

/// Regroup a card number into blocks of 4 separated by single spaces.
///
/// Output is capped at 19 characters (16 digits + 3 separators), matching
/// the form field's max length. Idempotent.
pub fn format_card_number(raw: &str) -> String {
    let cleaned: Vec<char> = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let grouped: Vec<String> = cleaned
        .chunks(4)
        .map(|chunk| chunk.iter().collect())
        .collect();
    let joined = grouped.join(" ");
    joined.chars().take(19).collect()
}

/// Normalize expiry input to `MM/YY`.
///
/// Strips non-digits; once 2+ digits are present a `/` is inserted after
/// the month and the year is capped to 2 digits.
pub fn format_expiry(raw: &str) -> String {
    let cleaned: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if cleaned.len() >= 2 {
        let month = &cleaned[..2];
        let year: String = cleaned[2..].chars().take(2).collect();
        format!("{}/{}", month, year)
    } else {
        cleaned
    }
}

/// Validate an `MM/YY` expiry against today's date.
///
/// The current month is still valid; anything strictly earlier is not.
pub fn validate_expiry(expiry: &str) -> bool {
    validate_expiry_at(expiry, Utc::now().date_naive())
}

/// Expiry validation against an explicit reference date (for tests).
pub fn validate_expiry_at(expiry: &str, today: NaiveDate) -> bool {
    let mut parts = expiry.split('/');
    let (month, year) = match (parts.next(), parts.next(), parts.next()) {
        (Some(m), Some(y), None) => (m, y),
        _ => return false,
    };
    if month.len() != 2 || year.len() != 2 {
        return false;
    }

    let month_num: u32 = match month.parse() {
        Ok(m) => m,
        Err(_) => return false,
    };
    let year_num: i32 = match year.parse::<i32>() {
        Ok(y) => 2000 + y,
        Err(_) => return false,
    };

    if !(1..=12).contains(&month_num) {
        return false;
    }

    let current_year = today.year();
    let current_month = today.month();

    if year_num < current_year {
        return false;
    }
    if year_num == current_year && month_num < current_month {
        return false;
    }

    true
}

/// CVC must be exactly 3 digits.
pub fn is_valid_cvc(cvc: &str) -> bool {
    cvc.len() == 3 && cvc.chars().all(|c| c.is_ascii_digit())
}

/// Last 4 digits of a card number, for display on receipts.
/// Returns `None` if fewer than 4 digits are present.
pub fn card_last4(card_number: &str) -> Option<String> {
    let digits: String = card_number.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return None;
    }
    Some(digits[digits.len() - 4..].to_string())
}

/// A single field-level validation failure, keyed by form field name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Form field identifier ("name", "number", "expiry", "cvc")
    pub field: String,
    /// User-facing message
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// The manually entered card form, as typed by the user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardForm {
    /// Cardholder name
    pub name: String,
    /// Card number, possibly space-grouped
    pub number: String,
    /// Expiry in `MM/YY`
    pub expiry: String,
    /// 3-digit CVC
    pub cvc: String,
}

impl CardForm {
    pub fn new(
        name: impl Into<String>,
        number: impl Into<String>,
        expiry: impl Into<String>,
        cvc: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            number: number.into(),
            expiry: expiry.into(),
            cvc: cvc.into(),
        }
    }

    /// Run every field check and collect the failures.
    /// An empty vec means the form is submittable.
    pub fn validate(&self) -> Vec<FieldError> {
        self.validate_at(Utc::now().date_naive())
    }

    /// Validation against an explicit reference date (for tests).
    pub fn validate_at(&self, today: NaiveDate) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "Cardholder name is required"));
        }
        if !luhn_check(&self.number) {
            errors.push(FieldError::new("number", "Invalid card number"));
        }
        if !validate_expiry_at(&self.expiry, today) {
            errors.push(FieldError::new("expiry", "Invalid or expired date"));
        }
        if !is_valid_cvc(&self.cvc) {
            errors.push(FieldError::new("cvc", "CVC must be 3 digits"));
        }

        errors
    }

    /// Last 4 digits of the entered number
    pub fn last4(&self) -> Option<String> {
        card_last4(&self.number)
    }
}
