//! Verifier configuration as deployments ship it: SuperAdmin keys, the
//! signature minimum, and the cache TTL, deserialized from JSON.

use serde::Deserialize;
use std::time::Duration;

use crate::crypto::{P256PublicKey, PublicKeyError};
use crate::verifier::WhitelistVerifier;

/// Invalid verifier or cache construction parameters.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("at least one SuperAdmin key is required")]
    NoSuperAdminKeys,
    #[error("minimum valid signatures must be positive")]
    NonPositiveMinimumSignatures,
    #[error("SuperAdmin key {index} does not decode: {source}")]
    InvalidSuperAdminKey {
        index: usize,
        #[source]
        source: PublicKeyError,
    },
    #[error("cache ttl must be positive")]
    NonPositiveTtl,
}

fn default_cache_ttl_seconds() -> u64 {
    300
}

fn default_min_valid_signatures() -> u32 {
    1
}

/// Deployment configuration for the whitelist verifier.
///
/// ```json
/// {
///   "superAdminKeys": ["A9oy...", "Ak3k..."],
///   "minValidSignatures": 2,
///   "cacheTtlSeconds": 120
/// }
/// ```
///
/// Keys are base64 SEC1 P-256 points. `cacheTtlSeconds` governs the rules
/// container cache and defaults to five minutes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifierConfig {
    pub super_admin_keys: Vec<String>,
    #[serde(default = "default_min_valid_signatures")]
    pub min_valid_signatures: u32,
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,
}

impl VerifierConfig {
    /// Decode the configured keys and build the verifier.
    pub fn build(&self) -> Result<WhitelistVerifier, ConfigError> {
        let keys = self
            .super_admin_keys
            .iter()
            .enumerate()
            .map(|(index, encoded)| {
                P256PublicKey::from_base64(encoded)
                    .map_err(|source| ConfigError::InvalidSuperAdminKey { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        WhitelistVerifier::new(keys, self.min_valid_signatures)
    }

    /// The configured cache TTL. Zero is a configuration error.
    pub fn cache_ttl(&self) -> Result<Duration, ConfigError> {
        if self.cache_ttl_seconds == 0 {
            return Err(ConfigError::NonPositiveTtl);
        }
        Ok(Duration::from_secs(self.cache_ttl_seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::b64;
    use p256::ecdsa::SigningKey;

    fn key_base64() -> String {
        let key = SigningKey::random(&mut rand::thread_rng());
        b64::encode(key.verifying_key().to_encoded_point(true).as_bytes())
    }

    #[test]
    fn builds_verifier_from_json() {
        let raw = format!(
            r#"{{"superAdminKeys": ["{}"], "minValidSignatures": 1, "cacheTtlSeconds": 60}}"#,
            key_base64()
        );
        let config: VerifierConfig = serde_json::from_str(&raw).unwrap();
        assert!(config.build().is_ok());
        assert_eq!(config.cache_ttl().unwrap(), Duration::from_secs(60));
    }

    #[test]
    fn defaults_apply_when_fields_are_absent() {
        let raw = format!(r#"{{"superAdminKeys": ["{}"]}}"#, key_base64());
        let config: VerifierConfig = serde_json::from_str(&raw).unwrap();
        assert_eq!(config.min_valid_signatures, 1);
        assert_eq!(config.cache_ttl().unwrap(), Duration::from_secs(300));
    }

    #[test]
    fn bad_key_is_named_by_index() {
        let raw = format!(
            r#"{{"superAdminKeys": ["{}", "AAAA"], "minValidSignatures": 1}}"#,
            key_base64()
        );
        let config: VerifierConfig = serde_json::from_str(&raw).unwrap();
        let err = config.build().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidSuperAdminKey { index: 1, .. }
        ));
    }

    #[test]
    fn empty_keys_and_zero_minimum_are_rejected() {
        let raw = r#"{"superAdminKeys": [], "minValidSignatures": 1}"#;
        let config: VerifierConfig = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            config.build().unwrap_err(),
            ConfigError::NoSuperAdminKeys
        ));

        let raw = format!(
            r#"{{"superAdminKeys": ["{}"], "minValidSignatures": 0}}"#,
            key_base64()
        );
        let config: VerifierConfig = serde_json::from_str(&raw).unwrap();
        assert!(matches!(
            config.build().unwrap_err(),
            ConfigError::NonPositiveMinimumSignatures
        ));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let raw = format!(
            r#"{{"superAdminKeys": ["{}"], "cacheTtlSeconds": 0}}"#,
            key_base64()
        );
        let config: VerifierConfig = serde_json::from_str(&raw).unwrap();
        assert!(matches!(
            config.cache_ttl().unwrap_err(),
            ConfigError::NonPositiveTtl
        ));
    }
}
