//! Idempotency keys for ticket creation.

use chrono::{DateTime, Utc};
use deskbot_core::text;
use uuid::Uuid;

/// Deterministic key for (reporter, description, time bucket).
///
/// The same reporter submitting the same normalised description within one
/// bucket gets the same key. The bucket is the submission time floored to
/// `bucket_minutes`.
pub fn idempotency_key(
    reporter_id: &str,
    description: &str,
    submitted_at: DateTime<Utc>,
    bucket_minutes: i64,
) -> String {
    let width = bucket_minutes.max(1) * 60;
    let bucket = submitted_at.timestamp().div_euclid(width);
    let combined = format!("{}|{}|{}", reporter_id, text::normalize(description), bucket);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, combined.as_bytes()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, h, m, 0).unwrap()
    }

    #[test]
    fn same_inputs_same_key() {
        let a = idempotency_key("alice", "VPN is down!", at(9, 1), 10);
        let b = idempotency_key("alice", "vpn is   down", at(9, 8), 10);
        assert_eq!(a, b);
    }

    #[test]
    fn key_changes_across_buckets_reporters_and_text() {
        let base = idempotency_key("alice", "VPN is down", at(9, 1), 10);
        assert_ne!(base, idempotency_key("alice", "VPN is down", at(9, 11), 10));
        assert_ne!(base, idempotency_key("bob", "VPN is down", at(9, 1), 10));
        assert_ne!(base, idempotency_key("alice", "Printer is down", at(9, 1), 10));
    }
}
