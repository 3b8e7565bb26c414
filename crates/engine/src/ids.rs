//! Injected identifier source.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub trait IdGenerator: Send + Sync {
    /// Identifier for a transaction or split record.
    fn entry_id(&self) -> String;

    /// Human-readable account token: `USR-` plus a random base-36 segment
    /// and a time-derived base-36 segment. Collisions are acceptable for a
    /// single-machine store; this is not a cryptographic identifier.
    fn user_token(&self, now: DateTime<Utc>) -> String;
}

/// Default generator backed by v4 UUIDs.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn entry_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    fn user_token(&self, now: DateTime<Utc>) -> String {
        let bytes = Uuid::new_v4().into_bytes();
        let mut entropy = [0u8; 8];
        entropy.copy_from_slice(&bytes[..8]);
        let random_segment = base36(u64::from_le_bytes(entropy), 6);
        let time_segment = base36(now.timestamp_millis().unsigned_abs(), 4);
        format!("USR-{random_segment}{time_segment}")
    }
}

/// Deterministic generator for tests: `entry-1`, `entry-2`, ...
#[derive(Debug, Default)]
pub struct SequentialIds(AtomicU64);

impl IdGenerator for SequentialIds {
    fn entry_id(&self) -> String {
        format!("entry-{}", self.0.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn user_token(&self, _now: DateTime<Utc>) -> String {
        format!("USR-{:06}", self.0.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Lowest `len` base-36 digits of `value`, most significant first.
fn base36(mut value: u64, len: usize) -> String {
    const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

    let mut digits = Vec::with_capacity(len);
    for _ in 0..len {
        digits.push(ALPHABET[(value % 36) as usize] as char);
        value /= 36;
    }
    digits.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn base36_keeps_lowest_digits() {
        assert_eq!(base36(0, 4), "0000");
        assert_eq!(base36(35, 4), "000Z");
        assert_eq!(base36(36, 4), "0010");
        // 36^4 wraps back to zero in the lowest four digits.
        assert_eq!(base36(36u64.pow(4), 4), "0000");
    }

    #[test]
    fn user_token_shape() {
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap();
        let token = RandomIds.user_token(now);
        assert!(token.starts_with("USR-"));
        assert_eq!(token.len(), "USR-".len() + 10);
        assert!(
            token[4..]
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }

    #[test]
    fn sequential_ids_count_up() {
        let ids = SequentialIds::default();
        assert_eq!(ids.entry_id(), "entry-1");
        assert_eq!(ids.entry_id(), "entry-2");
    }
}
