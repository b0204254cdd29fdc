// Token payload and timestamp helpers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claim holding the original issue time of a refresh chain
pub const ORIG_IAT: &str = "orig_iat";

/// Whole UTC seconds since the epoch, sub-second part truncated
pub fn unix_seconds(now: DateTime<Utc>) -> i64 {
    now.timestamp()
}

/// Claim-name to claim-value mapping carried inside a token
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenPayload(Map<String, Value>);

impl TokenPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, claim: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(claim.into(), value.into());
    }

    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.0.get(claim)
    }

    pub fn remove(&mut self, claim: &str) -> Option<Value> {
        self.0.remove(claim)
    }

    pub fn contains(&self, claim: &str) -> bool {
        self.0.contains_key(claim)
    }

    pub fn claims(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Integer claim, `None` if absent or not an integer
    pub fn get_i64(&self, claim: &str) -> Option<i64> {
        self.0.get(claim).and_then(Value::as_i64)
    }

    /// Original issue time; a non-integer value counts as absent
    pub fn orig_iat(&self) -> Option<i64> {
        self.get_i64(ORIG_IAT)
    }

    pub fn set_orig_iat(&mut self, timestamp: i64) {
        self.insert(ORIG_IAT, timestamp);
    }
}

impl From<Map<String, Value>> for TokenPayload {
    fn from(claims: Map<String, Value>) -> Self {
        Self(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_unix_seconds_truncates() {
        let now = Utc.timestamp_opt(1000, 999_000_000).unwrap();
        assert_eq!(unix_seconds(now), 1000);
    }

    #[test]
    fn test_orig_iat_roundtrip() {
        let mut payload = TokenPayload::new();
        assert_eq!(payload.orig_iat(), None);

        payload.set_orig_iat(1000);
        assert_eq!(payload.orig_iat(), Some(1000));
        assert!(payload.contains(ORIG_IAT));
    }

    #[test]
    fn test_orig_iat_non_integer_is_absent() {
        let mut payload = TokenPayload::new();
        payload.insert(ORIG_IAT, "1000");
        assert_eq!(payload.orig_iat(), None);

        payload.insert(ORIG_IAT, 1000.0);
        assert_eq!(payload.orig_iat(), None);
    }

    #[test]
    fn test_orig_iat_zero_is_present() {
        let mut payload = TokenPayload::new();
        payload.set_orig_iat(0);
        assert_eq!(payload.orig_iat(), Some(0));
    }

    #[test]
    fn test_payload_serializes_flat() {
        let mut payload = TokenPayload::new();
        payload.insert("user_id", "7");
        payload.set_orig_iat(1000);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json, serde_json::json!({ "user_id": "7", "orig_iat": 1000 }));

        let back: TokenPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, payload);
    }
}
