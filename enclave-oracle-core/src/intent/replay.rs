//! Optional replay protection
//!
//! Verification alone is stateless: the same (payload, timestamp, signature)
//! verifies every time it is presented. A `ReplayGuard` remembers every
//! accepted request by SHA-256(intent || timestamp || signature) and can
//! additionally bound how far a timestamp may drift from the current time.
//! With a window set, keys whose timestamp has fallen behind it are pruned,
//! since those requests can no longer pass the freshness check anyway.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::error::{OracleError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayGuard {
    /// Maximum |now - timestamp| accepted, if any
    pub freshness_window_ms: Option<u64>,
    /// Request key -> timestamp it was signed for
    consumed: BTreeMap<String, u64>,
}

impl ReplayGuard {
    pub fn new(freshness_window_ms: Option<u64>) -> Self {
        Self {
            freshness_window_ms,
            consumed: BTreeMap::new(),
        }
    }

    pub fn request_key(intent: u8, timestamp_ms: u64, signature: &[u8]) -> String {
        let mut h = Sha256::new();
        h.update([intent]);
        h.update(timestamp_ms.to_le_bytes());
        h.update(signature);
        hex::encode(h.finalize())
    }

    /// Check a request without recording it; returns its key on success
    pub fn check(&self, intent: u8, timestamp_ms: u64, signature: &[u8], now_ms: u64) -> Result<String> {
        if let Some(window_ms) = self.freshness_window_ms {
            if now_ms.abs_diff(timestamp_ms) > window_ms {
                return Err(OracleError::StaleTimestamp {
                    timestamp_ms,
                    window_ms,
                });
            }
        }
        let key = Self::request_key(intent, timestamp_ms, signature);
        if self.consumed.contains_key(&key) {
            return Err(OracleError::ReplayDetected);
        }
        Ok(key)
    }

    /// Record an accepted request and drop keys that are now outside the
    /// freshness window
    pub fn consume(&mut self, key: String, timestamp_ms: u64, now_ms: u64) {
        self.consumed.insert(key, timestamp_ms);
        if let Some(window_ms) = self.freshness_window_ms {
            let oldest = now_ms.saturating_sub(window_ms);
            self.consumed.retain(|_, ts| *ts >= oldest);
        }
    }

    pub fn check_and_consume(
        &mut self,
        intent: u8,
        timestamp_ms: u64,
        signature: &[u8],
        now_ms: u64,
    ) -> Result<()> {
        let key = self.check(intent, timestamp_ms, signature, now_ms)?;
        self.consume(key, timestamp_ms, now_ms);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.consumed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_use_rejected() {
        let mut guard = ReplayGuard::new(None);
        let sig = [9u8; 64];
        guard.check_and_consume(0, 100, &sig, 0).unwrap();
        let err = guard.check_and_consume(0, 100, &sig, 0).unwrap_err();
        assert!(matches!(err, OracleError::ReplayDetected));
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn test_keys_are_intent_scoped() {
        let mut guard = ReplayGuard::new(None);
        let sig = [9u8; 64];
        guard.check_and_consume(0, 100, &sig, 0).unwrap();
        assert!(guard.check_and_consume(1, 100, &sig, 0).is_ok());
        assert!(guard.check_and_consume(0, 101, &sig, 0).is_ok());
    }

    #[test]
    fn test_freshness_window() {
        let guard = ReplayGuard::new(Some(60_000));
        let sig = [1u8; 64];
        assert!(guard.check(0, 1_000_000, &sig, 1_030_000).is_ok());
        assert!(guard.check(0, 1_000_000, &sig, 970_000).is_ok());
        let err = guard.check(0, 1_000_000, &sig, 1_060_001).unwrap_err();
        assert!(matches!(err, OracleError::StaleTimestamp { window_ms: 60_000, .. }));
    }

    #[test]
    fn test_check_does_not_consume() {
        let guard = ReplayGuard::new(None);
        guard.check(0, 1, &[0u8; 64], 0).unwrap();
        assert!(guard.is_empty());
    }

    #[test]
    fn test_expired_keys_pruned() {
        let mut guard = ReplayGuard::new(Some(1_000));
        let sig = [4u8; 64];
        guard.check_and_consume(0, 10_000, &sig, 10_000).unwrap();
        guard.check_and_consume(0, 10_500, &sig, 10_500).unwrap();
        assert_eq!(guard.len(), 2);

        guard.check_and_consume(0, 11_200, &sig, 11_200).unwrap();
        assert_eq!(guard.len(), 2);

        // the pruned request is still refused, now as stale
        let err = guard.check(0, 10_000, &sig, 11_200).unwrap_err();
        assert!(matches!(err, OracleError::StaleTimestamp { .. }));
        let err = guard.check(0, 10_500, &sig, 11_200).unwrap_err();
        assert!(matches!(err, OracleError::ReplayDetected));
    }

    #[test]
    fn test_no_pruning_without_window() {
        let mut guard = ReplayGuard::new(None);
        let sig = [4u8; 64];
        guard.check_and_consume(0, 1, &sig, 1).unwrap();
        guard.check_and_consume(0, 2, &sig, u64::MAX).unwrap();
        assert_eq!(guard.len(), 2);
    }
}
