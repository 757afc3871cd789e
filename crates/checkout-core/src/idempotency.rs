//! # Idempotency Keys
//!
//! One key per checkout attempt. The key is minted when the attempt starts and
//! sent unchanged with every retry of that attempt's session-creation call, so
//! the processor collapses the retries into one session.

use crate::error::{CheckoutError, CheckoutResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// HTTP header carrying the key from the client to the session endpoint
pub const IDEMPOTENCY_HEADER: &str = "x-idempotency-key";

/// Opaque, CSPRNG-backed checkout attempt key (UUID v4 text form)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Mint a fresh key. Cannot fail.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Parse a key received from a client.
    ///
    /// Accepts any UUID in hyphenated form and normalises it to lowercase.
    pub fn parse(raw: &str) -> CheckoutResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CheckoutError::InvalidIdempotencyKey(
                "key is empty".to_string(),
            ));
        }
        let uuid = Uuid::try_parse(trimmed)
            .map_err(|e| CheckoutError::InvalidIdempotencyKey(e.to_string()))?;
        Ok(Self(uuid.hyphenated().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for IdempotencyKey {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for IdempotencyKey {
    type Error = CheckoutError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<IdempotencyKey> for String {
    fn from(key: IdempotencyKey) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_fresh_keys_are_unique() {
        let keys: HashSet<_> = (0..1000).map(|_| IdempotencyKey::new()).collect();
        assert_eq!(keys.len(), 1000);
    }

    #[test]
    fn test_parse_round_trips_generated_key() {
        let key = IdempotencyKey::new();
        assert_eq!(IdempotencyKey::parse(key.as_str()).unwrap(), key);
    }

    #[test]
    fn test_parse_normalises_case() {
        let key = IdempotencyKey::parse("  3F2504E0-4F89-41D3-9A0C-0305E82C3301 ").unwrap();
        assert_eq!(key.as_str(), "3f2504e0-4f89-41d3-9a0c-0305e82c3301");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            IdempotencyKey::parse(""),
            Err(CheckoutError::InvalidIdempotencyKey(_))
        ));
        assert!(IdempotencyKey::parse("not-a-key").is_err());
    }
}
