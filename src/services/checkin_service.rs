//! Check-in submission flow - core business logic.
//!
//! This service owns the full submission pipeline:
//! - Form validation
//! - Duplicate-guard consultation
//! - At-rest encryption of name and phone
//! - Insert, with the racing-duplicate conflict translated into the same
//!   outcome as a guard hit
//! - Live dashboard notification
//!
//! # Race Handling
//!
//! The guard's check-then-act window is accepted: two concurrent submissions
//! from one device can both see "no prior check-in". The partial unique
//! index on `(event_id, ip_address)` catches the second insert, and this
//! service maps that error to [`AppError::AlreadyCheckedIn`] so the user
//! never sees a generic failure.

use validator::Validate;

use crate::{
    error::AppError,
    models::{
        checkin::{Checkin, CheckinRequest, NewCheckin},
        event::Event,
    },
    notify::{CheckinNotice, CheckinNotifier},
    services::{
        crypto::{self, FieldCipher},
        guard::{self, CheckinStore},
    },
    state::AppState,
};

/// Name of the partial unique index enforcing one check-in per device
/// per event. Must match the migration.
const DUPLICATE_CONSTRAINT: &str = "event_checkins_event_ip_key";

/// Execute a check-in submission.
///
/// `event` is `None` for the legacy non-event-scoped flow, which skips the
/// duplicate guard entirely (there is no event to key it on).
///
/// # Errors
///
/// - `Validation`: form data failed validation
/// - `AlreadyCheckedIn`: guard found a prior record, or the insert hit the
///   unique constraint in a race
/// - `Database`: the store is unreachable or the insert failed otherwise
pub async fn submit_checkin(
    state: &AppState,
    event: Option<&Event>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    request: CheckinRequest,
) -> Result<Checkin, AppError> {
    submit(
        &state.pool,
        &state.cipher,
        &state.notifier,
        state.relaxed_guard,
        event,
        ip_address,
        user_agent,
        request,
    )
    .await
}

/// The pipeline itself, generic over the store so it can run against an
/// in-memory fake.
#[allow(clippy::too_many_arguments)]
async fn submit<S: CheckinStore + Sync>(
    store: &S,
    cipher: &FieldCipher,
    notifier: &CheckinNotifier,
    relaxed_guard: bool,
    event: Option<&Event>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    request: CheckinRequest,
) -> Result<Checkin, AppError> {
    // Validate form data
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    // Consult the duplicate guard for event-scoped submissions
    if let Some(event) = event {
        let prior =
            guard::prior_checkin(store, event.id, ip_address.as_deref(), relaxed_guard).await;

        if let Some(prior) = prior {
            return Err(AppError::AlreadyCheckedIn {
                previous: Some(crypto::mask_name(&prior.full_name)),
            });
        }
    }

    // Derive the at-rest copies
    let encrypted_name = cipher.encrypt(&request.full_name)?;
    let encrypted_phone = cipher.encrypt(&request.phone_number)?;

    let event_id = event.map(|e| e.id);

    // Insert; the unique index is the real duplicate authority
    let insert_result = store
        .insert_checkin(NewCheckin {
            full_name: request.full_name,
            phone_number: request.phone_number,
            encrypted_name,
            encrypted_phone,
            terms_accepted: request.terms_accepted,
            event_id,
            ip_address: ip_address.clone(),
            user_agent,
        })
        .await;

    let checkin = match insert_result {
        Ok(checkin) => checkin,
        Err(err) if AppError::is_unique_violation(&err, DUPLICATE_CONSTRAINT) => {
            // Lost the race against a concurrent submission from the same
            // device. Present the same outcome as a guard hit, with the
            // earlier submitter's masked name when we can still fetch it.
            let previous = lookup_previous_name(store, event_id, ip_address.as_deref()).await;
            return Err(AppError::AlreadyCheckedIn { previous });
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!(checkin_id = checkin.id, event_id, "check-in recorded");

    // Feed live dashboards
    notifier.publish(CheckinNotice {
        id: checkin.id,
        event_id: checkin.event_id,
        masked_name: crypto::mask_name(&checkin.full_name),
        checked_in_at: checkin.checked_in_at,
    });

    Ok(checkin)
}

/// Best-effort lookup of the earlier submitter's masked name after losing
/// an insert race. A failure here degrades to a context-free conflict.
async fn lookup_previous_name<S: CheckinStore + Sync>(
    store: &S,
    event_id: Option<i64>,
    ip_address: Option<&str>,
) -> Option<String> {
    let event_id = event_id?;
    let ip_address = ip_address?;

    let found = store
        .find_by_event_and_address(event_id, ip_address)
        .await
        .ok()??;

    Some(crypto::mask_name(&found.full_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::EventStatus;
    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};

    /// What the fake store answers when asked to insert.
    enum InsertOutcome {
        Accept,
        DuplicateKey,
        Unavailable,
    }

    /// In-memory store standing in for PostgreSQL.
    struct FakeStore {
        records: Vec<Checkin>,
        insert_outcome: InsertOutcome,
    }

    #[async_trait]
    impl CheckinStore for FakeStore {
        async fn find_by_event_and_address(
            &self,
            event_id: i64,
            ip_address: &str,
        ) -> Result<Option<Checkin>, sqlx::Error> {
            Ok(self
                .records
                .iter()
                .find(|c| {
                    c.event_id == Some(event_id) && c.ip_address.as_deref() == Some(ip_address)
                })
                .cloned())
        }

        async fn insert_checkin(&self, new: NewCheckin) -> Result<Checkin, sqlx::Error> {
            match self.insert_outcome {
                InsertOutcome::Accept => Ok(Checkin {
                    id: 42,
                    full_name: new.full_name,
                    phone_number: new.phone_number,
                    encrypted_name: new.encrypted_name,
                    encrypted_phone: new.encrypted_phone,
                    terms_accepted: new.terms_accepted,
                    event_id: new.event_id,
                    ip_address: new.ip_address,
                    user_agent: new.user_agent,
                    checked_in_at: Utc::now(),
                }),
                InsertOutcome::DuplicateKey => {
                    Err(unique_violation(super::DUPLICATE_CONSTRAINT))
                }
                InsertOutcome::Unavailable => Err(sqlx::Error::PoolClosed),
            }
        }
    }

    /// A database error carrying a unique-violation kind and constraint
    /// name, the way the PostgreSQL driver reports one.
    #[derive(Debug)]
    struct UniqueViolation {
        constraint: &'static str,
    }

    impl std::fmt::Display for UniqueViolation {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(
                f,
                "duplicate key value violates unique constraint \"{}\"",
                self.constraint
            )
        }
    }

    impl std::error::Error for UniqueViolation {}

    impl sqlx::error::DatabaseError for UniqueViolation {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::UniqueViolation
        }

        fn constraint(&self) -> Option<&str> {
            Some(self.constraint)
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    fn unique_violation(constraint: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(UniqueViolation { constraint }))
    }

    fn event(id: i64) -> Event {
        Event {
            id,
            event_name: "Grand Opening 2024".to_string(),
            event_date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            slug: "grand-opening-2024-05032024".to_string(),
            target_checkins: 500,
            description: None,
            status: EventStatus::Active,
            display_limit: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn existing_checkin(event_id: i64, ip: &str) -> Checkin {
        Checkin {
            id: 1,
            full_name: "Nguyen Van A".to_string(),
            phone_number: "0901234567".to_string(),
            encrypted_name: String::new(),
            encrypted_phone: String::new(),
            terms_accepted: true,
            event_id: Some(event_id),
            ip_address: Some(ip.to_string()),
            user_agent: None,
            checked_in_at: Utc::now(),
        }
    }

    fn request() -> CheckinRequest {
        CheckinRequest {
            full_name: "Tran Thi B".to_string(),
            phone_number: "0912345678".to_string(),
            terms_accepted: true,
        }
    }

    fn cipher() -> FieldCipher {
        FieldCipher::from_passphrase("test-passphrase")
    }

    #[tokio::test]
    async fn valid_submission_is_stored_and_announced() {
        let store = FakeStore {
            records: Vec::new(),
            insert_outcome: InsertOutcome::Accept,
        };
        let cipher = cipher();
        let notifier = CheckinNotifier::new();
        let mut rx = notifier.subscribe();

        let ev = event(7);
        let checkin = submit(
            &store,
            &cipher,
            &notifier,
            false,
            Some(&ev),
            Some("203.0.113.9".to_string()),
            Some("test-agent".to_string()),
            request(),
        )
        .await
        .unwrap();

        assert_eq!(checkin.event_id, Some(7));
        // The stored encrypted copies decrypt back to the submitted values.
        assert_eq!(cipher.decrypt(&checkin.encrypted_name).unwrap(), "Tran Thi B");
        assert_eq!(cipher.decrypt(&checkin.encrypted_phone).unwrap(), "0912345678");

        let notice = rx.try_recv().unwrap();
        assert_eq!(notice.id, checkin.id);
        assert_eq!(notice.masked_name, "Tran T** B*");
    }

    #[tokio::test]
    async fn prior_checkin_is_rejected_before_insert() {
        let store = FakeStore {
            records: vec![existing_checkin(7, "203.0.113.9")],
            insert_outcome: InsertOutcome::Accept,
        };
        let ev = event(7);

        let err = submit(
            &store,
            &cipher(),
            &CheckinNotifier::new(),
            false,
            Some(&ev),
            Some("203.0.113.9".to_string()),
            None,
            request(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            AppError::AlreadyCheckedIn { previous: Some(ref p) } if p == "Nguyen V** A*"
        ));
    }

    #[tokio::test]
    async fn racing_insert_conflict_reads_as_already_checked_in() {
        // The relaxed bypass lets the guard wave this loopback address
        // through, so the unique index is the only thing standing; the
        // resulting conflict must carry the winner's masked name.
        let store = FakeStore {
            records: vec![existing_checkin(7, "127.0.0.1")],
            insert_outcome: InsertOutcome::DuplicateKey,
        };
        let ev = event(7);

        let err = submit(
            &store,
            &cipher(),
            &CheckinNotifier::new(),
            true,
            Some(&ev),
            Some("127.0.0.1".to_string()),
            None,
            request(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            AppError::AlreadyCheckedIn { previous: Some(ref p) } if p == "Nguyen V** A*"
        ));
    }

    #[tokio::test]
    async fn conflict_with_unreadable_winner_degrades_to_no_context() {
        // Guard misses (no record visible), insert still collides; the
        // follow-up name lookup finds nothing and the conflict is reported
        // without the previous name.
        let store = FakeStore {
            records: Vec::new(),
            insert_outcome: InsertOutcome::DuplicateKey,
        };
        let ev = event(7);

        let err = submit(
            &store,
            &cipher(),
            &CheckinNotifier::new(),
            false,
            Some(&ev),
            Some("203.0.113.9".to_string()),
            None,
            request(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::AlreadyCheckedIn { previous: None }));
    }

    #[tokio::test]
    async fn store_outage_on_insert_is_not_masked() {
        let store = FakeStore {
            records: Vec::new(),
            insert_outcome: InsertOutcome::Unavailable,
        };
        let ev = event(7);

        let err = submit(
            &store,
            &cipher(),
            &CheckinNotifier::new(),
            false,
            Some(&ev),
            Some("203.0.113.9".to_string()),
            None,
            request(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Database(_)));
    }

    #[tokio::test]
    async fn invalid_form_is_rejected() {
        let store = FakeStore {
            records: Vec::new(),
            insert_outcome: InsertOutcome::Accept,
        };
        let ev = event(7);

        let err = submit(
            &store,
            &cipher(),
            &CheckinNotifier::new(),
            false,
            Some(&ev),
            Some("203.0.113.9".to_string()),
            None,
            CheckinRequest {
                full_name: "Tran Thi B".to_string(),
                phone_number: "12345".to_string(),
                terms_accepted: true,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }
}
