//! Check-in data models and API request/response types.
//!
//! This module defines:
//! - `Checkin`: Database entity representing one attendee submission
//! - `CheckinRequest`: Public submission body, validated with `validator`
//! - `UpdateCheckinRequest`: Administrative correction body
//! - `CheckinResponse`: Full record returned to admin staff
//! - `MaskedCheckin`: Privacy-preserving row for viewer dashboards

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

lazy_static! {
    /// Letters (including the Vietnamese accented range) and spaces only.
    static ref FULL_NAME_REGEX: regex::Regex =
        regex::Regex::new(r"^[a-zA-ZÀ-ỹ\s]+$").unwrap();

    /// Local mobile format: ten digits starting with 0.
    static ref PHONE_REGEX: regex::Regex =
        regex::Regex::new(r"^0[0-9]{9}$").unwrap();
}

/// Represents a check-in record from the database.
///
/// # Database Table
///
/// Maps to the `event_checkins` table. The plaintext name and phone are
/// used only for validation and authorized staff display; the encrypted
/// copies are what matter for at-rest confidentiality. A partial unique
/// index on `(event_id, ip_address)` is the hard backstop behind the
/// application-level duplicate guard.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Checkin {
    /// Unique identifier for this check-in (store-assigned)
    pub id: i64,

    /// Submitted attendee name, plaintext
    pub full_name: String,

    /// Submitted phone number, plaintext
    pub phone_number: String,

    /// AES-256-GCM encrypted copy of the name, base64(nonce || ciphertext)
    pub encrypted_name: String,

    /// AES-256-GCM encrypted copy of the phone number
    pub encrypted_phone: String,

    /// Whether the attendee accepted the data-sharing terms
    pub terms_accepted: bool,

    /// Owning event; NULL for the legacy non-event-scoped flow
    pub event_id: Option<i64>,

    /// Submitter network address as reported by the proxy chain, best effort
    pub ip_address: Option<String>,

    /// Submitter's browser user-agent string
    pub user_agent: Option<String>,

    /// Submission timestamp
    pub checked_in_at: DateTime<Utc>,
}

/// Field set for inserting a new check-in row.
///
/// Built by the submission flow after validation and encryption; the store
/// assigns `id` and `checked_in_at`.
#[derive(Debug, Clone)]
pub struct NewCheckin {
    pub full_name: String,
    pub phone_number: String,
    pub encrypted_name: String,
    pub encrypted_phone: String,
    pub terms_accepted: bool,
    pub event_id: Option<i64>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Public check-in submission body.
///
/// # JSON Example
///
/// ```json
/// {
///   "full_name": "Nguyễn Văn A",
///   "phone_number": "0901234567",
///   "terms_accepted": true
/// }
/// ```
#[derive(Debug, Deserialize, Validate)]
pub struct CheckinRequest {
    /// Attendee name: 2-100 characters, letters and spaces only
    #[validate(length(min = 2, max = 100, message = "Full name must be 2-100 characters"))]
    #[validate(regex(
        path = *FULL_NAME_REGEX,
        message = "Full name may only contain letters and spaces"
    ))]
    pub full_name: String,

    /// Phone number: exactly 10 digits starting with 0
    #[validate(regex(
        path = *PHONE_REGEX,
        message = "Phone number must be 10 digits starting with 0"
    ))]
    pub phone_number: String,

    /// Must be true; check-ins without consent are rejected
    #[validate(custom(function = "validate_terms_accepted"))]
    pub terms_accepted: bool,
}

/// Terms consent is mandatory, not merely recorded.
fn validate_terms_accepted(accepted: &bool) -> Result<(), ValidationError> {
    if *accepted {
        Ok(())
    } else {
        Err(ValidationError::new("terms_accepted")
            .with_message("You must accept the terms to continue".into()))
    }
}

/// Administrative correction of a check-in's name and/or phone.
///
/// Omitted fields are left unchanged. Updated fields get freshly derived
/// encrypted copies.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCheckinRequest {
    #[validate(length(min = 2, max = 100, message = "Full name must be 2-100 characters"))]
    #[validate(regex(
        path = *FULL_NAME_REGEX,
        message = "Full name may only contain letters and spaces"
    ))]
    pub full_name: Option<String>,

    #[validate(regex(
        path = *PHONE_REGEX,
        message = "Phone number must be 10 digits starting with 0"
    ))]
    pub phone_number: Option<String>,
}

/// Full check-in record for admin staff.
///
/// Excludes the encrypted copies, which are redundant for authorized viewers.
#[derive(Debug, Serialize)]
pub struct CheckinResponse {
    pub id: i64,
    pub full_name: String,
    pub phone_number: String,
    pub terms_accepted: bool,
    pub event_id: Option<i64>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub checked_in_at: DateTime<Utc>,
}

impl From<Checkin> for CheckinResponse {
    fn from(checkin: Checkin) -> Self {
        Self {
            id: checkin.id,
            full_name: checkin.full_name,
            phone_number: checkin.phone_number,
            terms_accepted: checkin.terms_accepted,
            event_id: checkin.event_id,
            ip_address: checkin.ip_address,
            user_agent: checkin.user_agent,
            checked_in_at: checkin.checked_in_at,
        }
    }
}

/// Privacy-preserving check-in row for viewer dashboards.
///
/// Built by decrypting the at-rest copies and masking the result
/// (`Nguyen V** A*`, `090***4567`).
#[derive(Debug, Serialize)]
pub struct MaskedCheckin {
    pub id: i64,
    pub masked_name: String,
    pub masked_phone: String,
    pub terms_accepted: bool,
    pub event_id: Option<i64>,
    pub checked_in_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, phone: &str, terms: bool) -> CheckinRequest {
        CheckinRequest {
            full_name: name.to_string(),
            phone_number: phone.to_string(),
            terms_accepted: terms,
        }
    }

    #[test]
    fn accepts_valid_submission() {
        assert!(request("Nguyễn Văn A", "0901234567", true).validate().is_ok());
    }

    #[test]
    fn accepts_plain_ascii_name() {
        assert!(request("John Smith", "0123456789", true).validate().is_ok());
    }

    #[test]
    fn rejects_short_name() {
        assert!(request("A", "0901234567", true).validate().is_err());
    }

    #[test]
    fn rejects_name_with_digits() {
        assert!(request("Nguyen 123", "0901234567", true).validate().is_err());
    }

    #[test]
    fn rejects_phone_not_starting_with_zero() {
        assert!(request("Nguyen Van A", "1901234567", true).validate().is_err());
    }

    #[test]
    fn rejects_phone_with_wrong_length() {
        assert!(request("Nguyen Van A", "090123456", true).validate().is_err());
        assert!(request("Nguyen Van A", "09012345678", true).validate().is_err());
    }

    #[test]
    fn rejects_unaccepted_terms() {
        assert!(request("Nguyen Van A", "0901234567", false).validate().is_err());
    }
}
