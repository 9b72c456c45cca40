//! End-to-end verification of whitelisted address and asset envelopes.
//!
//! [`WhitelistVerifier`] walks a fixed sequence of checks over a server
//! envelope; the first failing step rejects the envelope:
//!
//! 1. the declared metadata hash matches the payload bytes,
//! 2. the rules container carries enough SuperAdmin signatures,
//! 3. the rules container decodes into the governance model,
//! 4. some approver signature covers the payload hash (current or legacy),
//! 5. the approver signatures satisfy the applicable threshold tree,
//! 6. (addresses only) the payload parses into [`WhitelistedAddress`].
//!
//! Steps 2 and 3 are skipped when the caller supplies an already-verified
//! rules container, typically from [`RulesContainerCache`](crate::cache::RulesContainerCache).
//! Asset envelopes run the same pipeline minus step 6, use the asset legacy
//! hash strategies, and never consult rule lines.
//!
//! Verification is pure with respect to the envelope: no mutation, no I/O, no
//! suspension. The verifier is cheap to clone and safe to share across tasks.

use std::sync::Arc;

use crate::config::ConfigError;
use crate::crypto::{
    P256PublicKey, constant_time_eq_str, contains_constant_time, sha256_hex,
    verify_p256_signature,
};
use crate::decoders::{RulesDecoder, RulesSignaturesDecoder};
use crate::envelope::{ApproverSignature, WhitelistEnvelope, WhitelistedAddress};
use crate::legacy::{legacy_address_hashes, legacy_asset_hashes};
use crate::quorum::evaluate_parallel_thresholds;
use crate::rules::{RulesContainer, SequentialThresholds};
use crate::util::b64::Base64Blob;

/// The failure classes an envelope can be rejected with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyErrorKind {
    /// A cryptographic or structural invariant does not hold.
    Integrity,
    /// Rules are well-formed but this envelope does not meet quorum.
    Whitelist,
}

/// Rejection of one envelope, carrying the failure class and a message naming
/// the envelope where available. Secret material never appears in messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// The envelope violates a cryptographic or structural invariant.
    #[error("{0}")]
    Integrity(String),
    /// Rules exist and are well-formed, but quorum requirements are not met.
    #[error("{0}")]
    Whitelist(String),
}

impl VerifyError {
    pub fn kind(&self) -> VerifyErrorKind {
        match self {
            VerifyError::Integrity(_) => VerifyErrorKind::Integrity,
            VerifyError::Whitelist(_) => VerifyErrorKind::Whitelist,
        }
    }
}

/// Outcome of a successful address envelope verification.
///
/// `verified_hash` is the hash actually covered by an approver signature; it
/// differs from the envelope's metadata hash when a legacy strategy applied.
#[derive(Debug, Clone)]
pub struct AddressVerification {
    pub verified_address: WhitelistedAddress,
    pub verified_hash: String,
    pub verified_rules_container: Arc<RulesContainer>,
}

/// Outcome of a successful asset envelope verification. Asset payloads are not
/// parsed into a domain model.
#[derive(Debug, Clone)]
pub struct AssetVerification {
    pub verified_hash: String,
    pub verified_rules_container: Arc<RulesContainer>,
}

/// Verifier for whitelisted address and asset envelopes.
///
/// Construction pins the platform SuperAdmin keys and the number of SuperAdmin
/// signatures a rules container must carry; both are validated up front.
#[derive(Debug, Clone)]
pub struct WhitelistVerifier {
    super_admin_keys: Vec<P256PublicKey>,
    min_valid_signatures: u32,
}

impl WhitelistVerifier {
    /// Create a verifier trusting `super_admin_keys`, requiring at least
    /// `min_valid_signatures` of them on every rules container.
    pub fn new(
        super_admin_keys: Vec<P256PublicKey>,
        min_valid_signatures: u32,
    ) -> Result<Self, ConfigError> {
        if super_admin_keys.is_empty() {
            return Err(ConfigError::NoSuperAdminKeys);
        }
        if min_valid_signatures == 0 {
            return Err(ConfigError::NonPositiveMinimumSignatures);
        }
        Ok(WhitelistVerifier {
            super_admin_keys,
            min_valid_signatures,
        })
    }

    /// Verify one whitelisted address envelope.
    ///
    /// With `cached_rules` supplied, the rules container and its SuperAdmin
    /// signatures are taken as already verified and the corresponding steps
    /// are skipped.
    #[tracing::instrument(skip_all, fields(envelope = %envelope.id), err)]
    pub fn verify_address<R, S>(
        &self,
        envelope: &WhitelistEnvelope,
        rules_decoder: &R,
        signatures_decoder: &S,
        cached_rules: Option<Arc<RulesContainer>>,
    ) -> Result<AddressVerification, VerifyError>
    where
        R: RulesDecoder,
        S: RulesSignaturesDecoder,
    {
        check_metadata_hash(envelope)?;
        let rules = match cached_rules {
            Some(rules) => rules,
            None => {
                self.check_container_signatures(envelope, signatures_decoder)?;
                decode_rules(envelope, rules_decoder)?
            }
        };

        let signed = envelope.signed_address.as_ref().ok_or_else(|| {
            VerifyError::Integrity(format!(
                "envelope {}: no signed address present",
                envelope.id
            ))
        })?;
        let verified_hash = find_covered_hash(envelope, &signed.signatures, || {
            legacy_address_hashes(&envelope.metadata.payload_as_string)
        })?;

        let rule = rules
            .find_address_rules(&envelope.blockchain, &envelope.network)
            .ok_or_else(|| {
                VerifyError::Whitelist(format!(
                    "envelope {}: no address whitelisting rules for {} on {}",
                    envelope.id, envelope.blockchain, envelope.network
                ))
            })?;
        let thresholds = select_address_thresholds(envelope, rule);
        evaluate_parallel_thresholds(
            &envelope.id,
            thresholds,
            &signed.signatures,
            &verified_hash,
            &rules,
        )?;

        let verified_address: WhitelistedAddress =
            serde_json::from_str(&envelope.metadata.payload_as_string).map_err(|err| {
                VerifyError::Integrity(format!(
                    "envelope {}: verified payload does not parse: {err}",
                    envelope.id
                ))
            })?;

        Ok(AddressVerification {
            verified_address,
            verified_hash,
            verified_rules_container: rules,
        })
    }

    /// Verify one whitelisted asset (contract address) envelope.
    ///
    /// Assets use the contract rule set, the asset legacy hash strategies, and
    /// only a rule's default thresholds; the payload is not parsed.
    #[tracing::instrument(skip_all, fields(envelope = %envelope.id), err)]
    pub fn verify_asset<R, S>(
        &self,
        envelope: &WhitelistEnvelope,
        rules_decoder: &R,
        signatures_decoder: &S,
        cached_rules: Option<Arc<RulesContainer>>,
    ) -> Result<AssetVerification, VerifyError>
    where
        R: RulesDecoder,
        S: RulesSignaturesDecoder,
    {
        check_metadata_hash(envelope)?;
        let rules = match cached_rules {
            Some(rules) => rules,
            None => {
                self.check_container_signatures(envelope, signatures_decoder)?;
                decode_rules(envelope, rules_decoder)?
            }
        };

        let signed = envelope.signed_contract_address.as_ref().ok_or_else(|| {
            VerifyError::Integrity(format!(
                "envelope {}: no signed contract address present",
                envelope.id
            ))
        })?;
        let verified_hash = find_covered_hash(envelope, &signed.signatures, || {
            legacy_asset_hashes(&envelope.metadata.payload_as_string)
        })?;

        let rule = rules
            .find_contract_rules(&envelope.blockchain, &envelope.network)
            .ok_or_else(|| {
                VerifyError::Whitelist(format!(
                    "envelope {}: no contract whitelisting rules for {} on {}",
                    envelope.id, envelope.blockchain, envelope.network
                ))
            })?;
        evaluate_parallel_thresholds(
            &envelope.id,
            &rule.parallel_thresholds,
            &signed.signatures,
            &verified_hash,
            &rules,
        )?;

        Ok(AssetVerification {
            verified_hash,
            verified_rules_container: rules,
        })
    }

    /// Verify a batch of address envelopes, failing fast on the first bad one.
    pub fn verify_all<R, S>(
        &self,
        envelopes: &[WhitelistEnvelope],
        rules_decoder: &R,
        signatures_decoder: &S,
        cached_rules: Option<Arc<RulesContainer>>,
    ) -> Result<Vec<AddressVerification>, VerifyError>
    where
        R: RulesDecoder,
        S: RulesSignaturesDecoder,
    {
        envelopes
            .iter()
            .map(|envelope| {
                self.verify_address(
                    envelope,
                    rules_decoder,
                    signatures_decoder,
                    cached_rules.clone(),
                )
            })
            .collect()
    }

    /// Verify a batch of address envelopes, keeping a per-envelope outcome.
    pub fn verify_each<R, S>(
        &self,
        envelopes: &[WhitelistEnvelope],
        rules_decoder: &R,
        signatures_decoder: &S,
        cached_rules: Option<Arc<RulesContainer>>,
    ) -> Vec<Result<AddressVerification, VerifyError>>
    where
        R: RulesDecoder,
        S: RulesSignaturesDecoder,
    {
        envelopes
            .iter()
            .map(|envelope| {
                self.verify_address(
                    envelope,
                    rules_decoder,
                    signatures_decoder,
                    cached_rules.clone(),
                )
            })
            .collect()
    }

    /// Count SuperAdmin signatures over the decoded rules container bytes and
    /// require the configured minimum. Each record counts at most once, under
    /// any of the trusted keys.
    fn check_container_signatures<S>(
        &self,
        envelope: &WhitelistEnvelope,
        signatures_decoder: &S,
    ) -> Result<(), VerifyError>
    where
        S: RulesSignaturesDecoder,
    {
        let records = signatures_decoder
            .decode_signatures(&envelope.rules_signatures_base64)
            .map_err(|err| {
                VerifyError::Integrity(format!(
                    "envelope {}: rules signatures do not decode: {err}",
                    envelope.id
                ))
            })?;
        if records.is_empty() {
            return Err(VerifyError::Integrity(format!(
                "envelope {}: rules container carries no signatures",
                envelope.id
            )));
        }

        let container_bytes = Base64Blob(&envelope.rules_container_base64)
            .decode()
            .map_err(|err| {
                VerifyError::Integrity(format!(
                    "envelope {}: rules container is not valid base64: {err}",
                    envelope.id
                ))
            })?;
        if container_bytes.is_empty() {
            return Err(VerifyError::Integrity(format!(
                "envelope {}: rules container is empty",
                envelope.id
            )));
        }

        let valid = records
            .iter()
            .filter(|record| !record.signature.is_empty())
            .filter(|record| {
                self.super_admin_keys.iter().any(|key| {
                    verify_p256_signature(
                        key.verifying_key(),
                        &container_bytes,
                        &record.signature,
                    )
                })
            })
            .count() as u32;
        tracing::debug!(
            envelope = %envelope.id,
            valid,
            required = self.min_valid_signatures,
            "rules container SuperAdmin signatures counted"
        );
        if valid < self.min_valid_signatures {
            return Err(VerifyError::Integrity(format!(
                "envelope {}: rules container signed by {valid} SuperAdmins, {} required",
                envelope.id, self.min_valid_signatures
            )));
        }
        Ok(())
    }
}

/// Verify that a blockchain address string was issued by the custody HSM.
///
/// Looks up the container user holding the HSM slot role and checks the raw
/// `r || s` signature over the address's UTF-8 bytes. A container without an
/// HSM slot is an integrity error, never a silent skip.
pub fn verify_address_signature(
    address: &str,
    signature_base64: &str,
    rules: &RulesContainer,
) -> Result<bool, VerifyError> {
    let hsm_key = rules.hsm_public_key().ok_or_else(|| {
        VerifyError::Integrity("rules container has no HSM slot user".to_string())
    })?;
    Ok(verify_p256_signature(
        hsm_key.verifying_key(),
        address.as_bytes(),
        signature_base64,
    ))
}

fn check_metadata_hash(envelope: &WhitelistEnvelope) -> Result<(), VerifyError> {
    if envelope.metadata.payload_as_string.is_empty() {
        return Err(VerifyError::Integrity(format!(
            "envelope {}: payload is empty",
            envelope.id
        )));
    }
    if envelope.metadata.hash.is_empty() {
        return Err(VerifyError::Integrity(format!(
            "envelope {}: metadata hash is empty",
            envelope.id
        )));
    }
    let computed = sha256_hex(envelope.metadata.payload_as_string.as_bytes());
    if !constant_time_eq_str(&computed, &envelope.metadata.hash) {
        return Err(VerifyError::Integrity(format!(
            "envelope {}: metadata hash verification failed",
            envelope.id
        )));
    }
    Ok(())
}

fn decode_rules<R>(
    envelope: &WhitelistEnvelope,
    rules_decoder: &R,
) -> Result<Arc<RulesContainer>, VerifyError>
where
    R: RulesDecoder,
{
    let rules = rules_decoder
        .decode_rules(&envelope.rules_container_base64)
        .map_err(|err| {
            VerifyError::Integrity(format!(
                "envelope {}: rules container does not decode: {err}",
                envelope.id
            ))
        })?;
    Ok(Arc::new(rules))
}

/// Locate the hash actually covered by the approver signatures.
///
/// The declared metadata hash is probed first; when absent, each legacy
/// candidate is probed in order and the first covered one wins. Every scan
/// visits all hashes of all signatures and folds matches into a flag, so
/// timing does not disclose which signature position carried the match.
fn find_covered_hash(
    envelope: &WhitelistEnvelope,
    signatures: &[ApproverSignature],
    legacy_candidates: impl FnOnce() -> Vec<String>,
) -> Result<String, VerifyError> {
    if covered_by_any(signatures, &envelope.metadata.hash) {
        return Ok(envelope.metadata.hash.clone());
    }
    for candidate in legacy_candidates() {
        if covered_by_any(signatures, &candidate) {
            tracing::warn!(
                envelope = %envelope.id,
                "metadata hash not covered directly, matched a legacy schema hash"
            );
            return Ok(candidate);
        }
    }
    Err(VerifyError::Integrity(format!(
        "envelope {}: metadata hash is not covered by any signature",
        envelope.id
    )))
}

fn covered_by_any(signatures: &[ApproverSignature], hash: &str) -> bool {
    let mut found = false;
    for signature in signatures {
        found |= contains_constant_time(&signature.hashes, hash);
    }
    found
}

/// Pick the threshold set governing an address envelope.
///
/// With no linked internal addresses and exactly one linked wallet, the first
/// rule line whose leading cell names that wallet's derivation path overrides
/// the rule's default thresholds.
fn select_address_thresholds<'a>(
    envelope: &WhitelistEnvelope,
    rule: &'a crate::rules::AddressRule,
) -> &'a [SequentialThresholds] {
    if envelope.linked_internal_addresses.is_empty() && envelope.linked_wallets.len() == 1 {
        let wallet_path = &envelope.linked_wallets[0].path;
        for line in &rule.lines {
            if line.leading_wallet_path() == Some(wallet_path.as_str()) {
                return &line.parallel_thresholds;
            }
        }
    }
    &rule.parallel_thresholds
}
