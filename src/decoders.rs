//! Pluggable decoders for the two opaque envelope blobs.
//!
//! The verifier never interprets `rulesContainerBase64` or
//! `rulesSignaturesBase64` itself; it is parameterized over a pair of decoders
//! so deployments can swap wire formats without touching verification logic.
//! This crate ships the JSON-shaped pair as its default implementation. A
//! protobuf-shaped pair can be slotted in by implementing the same traits; the
//! shape is never inferred from the bytes.
//!
//! Decoders must be pure and must reject empty input deterministically.

use serde::Deserialize;

use crate::rules::RulesContainer;
use crate::util::b64;

/// Decodes the base64 rules container blob into the governance model.
pub trait RulesDecoder {
    fn decode_rules(&self, rules_container_base64: &str) -> Result<RulesContainer, DecodeError>;
}

/// Decodes the base64 rules signatures blob into SuperAdmin signature records.
pub trait RulesSignaturesDecoder {
    fn decode_signatures(
        &self,
        rules_signatures_base64: &str,
    ) -> Result<Vec<RulesSignature>, DecodeError>;
}

/// One SuperAdmin's signature over the decoded rules container bytes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesSignature {
    #[serde(default)]
    pub user_id: String,
    /// Raw `r || s` P-256 signature, base64. May be empty, in which case the
    /// record is skipped during counting.
    #[serde(default)]
    pub signature: String,
}

/// Failure to decode one of the opaque envelope blobs.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The blob was the empty string, or decoded to zero bytes.
    #[error("input is empty")]
    Empty,
    #[error("input is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("decoded bytes are not valid JSON for this shape: {0}")]
    Json(#[from] serde_json::Error),
}

/// JSON-shaped rules container decoder: base64, then a [`RulesContainer`]
/// document.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRulesDecoder;

impl RulesDecoder for JsonRulesDecoder {
    fn decode_rules(&self, rules_container_base64: &str) -> Result<RulesContainer, DecodeError> {
        let bytes = decode_non_empty(rules_container_base64)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// JSON-shaped rules signatures decoder: base64, then an array of
/// [`RulesSignature`] records.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRulesSignaturesDecoder;

impl RulesSignaturesDecoder for JsonRulesSignaturesDecoder {
    fn decode_signatures(
        &self,
        rules_signatures_base64: &str,
    ) -> Result<Vec<RulesSignature>, DecodeError> {
        let bytes = decode_non_empty(rules_signatures_base64)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn decode_non_empty(encoded: &str) -> Result<Vec<u8>, DecodeError> {
    if encoded.is_empty() {
        return Err(DecodeError::Empty);
    }
    let bytes = b64::decode(encoded)?;
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok(bytes)
}
