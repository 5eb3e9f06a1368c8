//! Duplicate-submission guard.
//!
//! Decides, at submission time, whether an (event, network address) pair has
//! already produced a check-in, so the same device cannot register twice for
//! one event. The guard is advisory: it exists to give the common case a
//! friendly "already checked in" answer without a failed insert. Two racing
//! submissions can both pass it; the partial unique index on
//! `(event_id, ip_address)` is the actual authority, and the submission flow
//! translates that conflict into the same user-facing outcome.

use async_trait::async_trait;
use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

use crate::{
    db::DbPool,
    models::checkin::{Checkin, NewCheckin},
};

/// Store access the submission flow needs.
///
/// Implemented for the PostgreSQL pool in production and by in-memory fakes
/// in tests; neither the guard nor the submission pipeline ever reaches for
/// a shared global client.
#[async_trait]
pub trait CheckinStore {
    /// Find any check-in with matching event id and address (zero or one).
    async fn find_by_event_and_address(
        &self,
        event_id: i64,
        ip_address: &str,
    ) -> Result<Option<Checkin>, sqlx::Error>;

    /// Insert a new check-in row and return the stored record.
    ///
    /// Must surface the store's unique-violation error unchanged; the
    /// submission flow is responsible for translating it.
    async fn insert_checkin(&self, new: NewCheckin) -> Result<Checkin, sqlx::Error>;
}

#[async_trait]
impl CheckinStore for DbPool {
    async fn find_by_event_and_address(
        &self,
        event_id: i64,
        ip_address: &str,
    ) -> Result<Option<Checkin>, sqlx::Error> {
        sqlx::query_as::<_, Checkin>(
            r#"
            SELECT * FROM event_checkins
            WHERE event_id = $1 AND ip_address = $2
            LIMIT 1
            "#,
        )
        .bind(event_id)
        .bind(ip_address)
        .fetch_optional(self)
        .await
    }

    async fn insert_checkin(&self, new: NewCheckin) -> Result<Checkin, sqlx::Error> {
        sqlx::query_as::<_, Checkin>(
            r#"
            INSERT INTO event_checkins (
                full_name,
                phone_number,
                encrypted_name,
                encrypted_phone,
                terms_accepted,
                event_id,
                ip_address,
                user_agent
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&new.full_name)
        .bind(&new.phone_number)
        .bind(&new.encrypted_name)
        .bind(&new.encrypted_phone)
        .bind(new.terms_accepted)
        .bind(new.event_id)
        .bind(&new.ip_address)
        .bind(&new.user_agent)
        .fetch_one(self)
        .await
    }
}

/// Look up a prior check-in for this (event, address) pair.
///
/// # Policy
///
/// - Relaxed mode + recognized local/private address: report "no prior
///   check-in" without consulting the store, so operators can test
///   repeatedly from a development machine.
/// - No address available: skip the check and allow the submission.
///   Availability wins over strict duplicate prevention.
/// - Store read failure: same as no address; the subsequent insert still
///   surfaces a hard store outage to the caller.
/// - Otherwise: return the matching record, if any, so the caller can show
///   who already checked in.
pub async fn prior_checkin<S: CheckinStore + Sync>(
    store: &S,
    event_id: i64,
    ip_address: Option<&str>,
    relaxed: bool,
) -> Option<Checkin> {
    let address = match ip_address {
        Some(addr) => addr,
        None => {
            tracing::warn!(event_id, "no client address, skipping duplicate check");
            return None;
        }
    };

    if relaxed && is_local_or_private(address) {
        tracing::debug!(event_id, address, "relaxed policy bypasses duplicate check");
        return None;
    }

    match store.find_by_event_and_address(event_id, address).await {
        Ok(found) => found,
        Err(err) => {
            // Degrade to "allow"; the insert path is not masked.
            tracing::warn!(event_id, address, error = %err, "duplicate lookup failed, allowing submission");
            None
        }
    }
}

/// Whether an address is loopback or in an RFC-1918 private range.
///
/// Recognizes `127.0.0.1`, `::1`, the literal `localhost`, and the
/// `10.0.0.0/8`, `172.16.0.0/12`, `192.168.0.0/16` blocks. These ranges also
/// cover venues behind corporate NAT, which is why the bypass only applies
/// when the relaxed flag is explicitly enabled.
pub fn is_local_or_private(address: &str) -> bool {
    if address == "localhost" {
        return true;
    }

    match address.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => v4.is_loopback() || v4.is_private(),
        Ok(IpAddr::V6(v6)) => v6.is_loopback(),
        Err(_) => false,
    }
}

/// Best-effort resolution of the submitter's network address.
///
/// Prefers the first hop of `x-forwarded-for`, then `x-real-ip`, then the
/// socket peer address. Returns `None` when the forwarded headers are
/// unreadable and no peer address was captured; the guard treats that as
/// "skip the check".
pub fn resolve_client_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|h| h.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return Some(real_ip.to_string());
        }
    }

    peer.map(|addr| addr.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    /// In-memory store standing in for PostgreSQL.
    struct FakeStore {
        records: Vec<Checkin>,
        fail: bool,
    }

    impl FakeStore {
        fn with(records: Vec<Checkin>) -> Self {
            Self {
                records,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                records: Vec::new(),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl CheckinStore for FakeStore {
        async fn find_by_event_and_address(
            &self,
            event_id: i64,
            ip_address: &str,
        ) -> Result<Option<Checkin>, sqlx::Error> {
            if self.fail {
                return Err(sqlx::Error::PoolClosed);
            }
            Ok(self
                .records
                .iter()
                .find(|c| c.event_id == Some(event_id) && c.ip_address.as_deref() == Some(ip_address))
                .cloned())
        }

        async fn insert_checkin(&self, new: NewCheckin) -> Result<Checkin, sqlx::Error> {
            if self.fail {
                return Err(sqlx::Error::PoolClosed);
            }
            Ok(Checkin {
                id: 1,
                full_name: new.full_name,
                phone_number: new.phone_number,
                encrypted_name: new.encrypted_name,
                encrypted_phone: new.encrypted_phone,
                terms_accepted: new.terms_accepted,
                event_id: new.event_id,
                ip_address: new.ip_address,
                user_agent: new.user_agent,
                checked_in_at: Utc::now(),
            })
        }
    }

    fn checkin(event_id: i64, ip: &str) -> Checkin {
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

    #[tokio::test]
    async fn relaxed_policy_skips_lookup_for_loopback() {
        // A matching record exists, but the relaxed bypass never sees it.
        let store = FakeStore::with(vec![checkin(7, "127.0.0.1")]);
        let prior = prior_checkin(&store, 7, Some("127.0.0.1"), true).await;
        assert!(prior.is_none());
    }

    #[tokio::test]
    async fn relaxed_policy_still_checks_public_addresses() {
        let store = FakeStore::with(vec![checkin(7, "203.0.113.9")]);
        let prior = prior_checkin(&store, 7, Some("203.0.113.9"), true).await;
        assert!(prior.is_some());
    }

    #[tokio::test]
    async fn strict_policy_returns_existing_record() {
        let store = FakeStore::with(vec![checkin(7, "192.168.1.20")]);
        let prior = prior_checkin(&store, 7, Some("192.168.1.20"), false).await;
        let found = prior.expect("existing record should be returned");
        assert_eq!(found.full_name, "Nguyen Van A");
    }

    #[tokio::test]
    async fn strict_policy_with_no_match_reports_clear() {
        let store = FakeStore::with(vec![checkin(7, "203.0.113.9")]);
        assert!(prior_checkin(&store, 7, Some("198.51.100.2"), false).await.is_none());
        // Same address, different event.
        assert!(prior_checkin(&store, 8, Some("203.0.113.9"), false).await.is_none());
    }

    #[tokio::test]
    async fn missing_address_allows_submission() {
        let store = FakeStore::with(vec![checkin(7, "203.0.113.9")]);
        assert!(prior_checkin(&store, 7, None, false).await.is_none());
    }

    #[tokio::test]
    async fn store_read_failure_allows_submission() {
        let store = FakeStore::failing();
        assert!(prior_checkin(&store, 7, Some("203.0.113.9"), false).await.is_none());
    }

    #[test]
    fn recognizes_local_and_private_ranges() {
        assert!(is_local_or_private("127.0.0.1"));
        assert!(is_local_or_private("::1"));
        assert!(is_local_or_private("localhost"));
        assert!(is_local_or_private("10.1.2.3"));
        assert!(is_local_or_private("172.16.0.1"));
        assert!(is_local_or_private("172.31.255.255"));
        assert!(is_local_or_private("192.168.0.10"));

        assert!(!is_local_or_private("172.32.0.1"));
        assert!(!is_local_or_private("8.8.8.8"));
        assert!(!is_local_or_private("203.0.113.9"));
        assert!(!is_local_or_private("not-an-ip"));
    }

    #[test]
    fn forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        assert_eq!(
            resolve_client_address(&headers, None),
            Some("203.0.113.9".to_string())
        );
    }

    #[test]
    fn real_ip_header_is_second_choice() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "198.51.100.2".parse().unwrap());
        assert_eq!(
            resolve_client_address(&headers, None),
            Some("198.51.100.2".to_string())
        );
    }

    #[test]
    fn falls_back_to_peer_address() {
        let headers = HeaderMap::new();
        let peer: SocketAddr = "203.0.113.9:54321".parse().unwrap();
        assert_eq!(
            resolve_client_address(&headers, Some(peer)),
            Some("203.0.113.9".to_string())
        );
        assert_eq!(resolve_client_address(&headers, None), None);
    }
}
