//! Client-side integrity verification for custody whitelisted addresses and
//! assets.
//!
//! A whitelisted entry authorizes outgoing transfers to a specific blockchain
//! address or contract, and is honored only when a quorum of organization
//! signers approved it under the organization's active governance rules. This
//! crate decides whether a server-supplied envelope for such an entry can be
//! trusted: a canonical payload with its declared hash, a SuperAdmin-signed
//! governance rules container, and per-approver signature records.
//!
//! # Overview
//!
//! Verification walks a fixed pipeline: payload hash check, SuperAdmin
//! signature quorum over the rules container, container decode, hash coverage
//! across approver signatures (with legacy-schema fallback), governance
//! threshold evaluation, and finally a parse of the now-trusted payload.
//! Everything is CPU-bound and pure; the only mutable state lives in the
//! optional rules container cache.
//!
//! # Modules
//!
//! - [`cache`] — TTL cache for decoded rules containers with single-flight refresh.
//! - [`canonical`] — Canonical JSON rendering of signed hash arrays (cross-SDK interop contract).
//! - [`config`] — Deployment configuration: SuperAdmin keys, signature minimum, cache TTL.
//! - [`crypto`] — SHA-256, constant-time comparison, ECDSA/P-256 over raw `r || s` signatures.
//! - [`decoders`] — Pluggable decoders for the rules container and rules signatures blobs.
//! - [`envelope`] — The server envelope model and the verified address payload model.
//! - [`legacy`] — Candidate hashes for entries signed under older payload schemas.
//! - [`rules`] — The decoded governance rules container and its queries.
//! - [`verifier`] — The envelope verification pipeline for addresses and assets.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use whitelist_verifier::config::VerifierConfig;
//! use whitelist_verifier::decoders::{JsonRulesDecoder, JsonRulesSignaturesDecoder};
//! use whitelist_verifier::envelope::WhitelistEnvelope;
//!
//! # fn run(envelope: &WhitelistEnvelope) -> Result<(), Box<dyn std::error::Error>> {
//! let config: VerifierConfig = serde_json::from_str(
//!     r#"{"superAdminKeys": ["A9oy..."], "minValidSignatures": 1}"#,
//! )?;
//! let verifier = config.build()?;
//! let verified = verifier.verify_address(
//!     envelope,
//!     &JsonRulesDecoder,
//!     &JsonRulesSignaturesDecoder,
//!     None,
//! )?;
//! println!("trusted destination: {}", verified.verified_address.address);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod canonical;
pub mod config;
pub mod crypto;
pub mod decoders;
pub mod envelope;
pub mod legacy;
mod quorum;
pub mod rules;
pub mod util;
pub mod verifier;

#[cfg(test)]
pub(crate) mod test_support;
