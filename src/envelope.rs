//! Server-supplied envelope for one whitelisted entry, and the domain model
//! extracted from its verified payload.
//!
//! An envelope bundles everything required to establish end-to-end trust in a
//! whitelisted address or asset: the canonical payload bytes and their declared
//! hash, the governance rules container active at approval time, SuperAdmin
//! signatures over that container, and the per-approver signature records.
//!
//! `payload_as_string` is the exact byte sequence that was hashed and signed.
//! It is carried opaquely and never re-serialized; only the final verification
//! step parses it into [`WhitelistedAddress`].

use serde::{Deserialize, Deserializer};

/// A server envelope for one whitelisted address or asset entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhitelistEnvelope {
    /// Opaque identifier, used in error messages only.
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    /// Routing key for rule lookup, together with `network`.
    pub blockchain: String,
    /// Routing key for rule lookup, together with `blockchain`.
    pub network: String,
    /// Declared hash and canonical payload bytes.
    pub metadata: EnvelopeMetadata,
    /// Governance rules container active when the entry was signed, base64.
    #[serde(default)]
    pub rules_container_base64: String,
    /// SuperAdmin signatures over the decoded rules container bytes, base64.
    #[serde(default)]
    pub rules_signatures_base64: String,
    /// Approver signature records for an address entry.
    #[serde(default)]
    pub signed_address: Option<SignedEntry>,
    /// Approver signature records for an asset (contract address) entry.
    #[serde(default)]
    pub signed_contract_address: Option<SignedEntry>,
    /// Internal addresses linked to this entry; consulted for rule-line matching.
    #[serde(default)]
    pub linked_internal_addresses: Vec<LinkedInternalAddress>,
    /// Wallets linked to this entry; consulted for rule-line matching.
    #[serde(default)]
    pub linked_wallets: Vec<LinkedWallet>,
}

/// Declared payload hash and the canonical payload bytes it covers.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeMetadata {
    /// Hex-encoded SHA-256 the server claims for the payload (lowercase, 64 chars).
    #[serde(default)]
    pub hash: String,
    /// The exact byte sequence that was hashed and signed. Never re-serialized.
    #[serde(default)]
    pub payload_as_string: String,
}

/// The ordered approver signature records of one entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedEntry {
    #[serde(default)]
    pub signatures: Vec<ApproverSignature>,
}

/// One approver's signature over the canonical JSON rendering of `hashes`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproverSignature {
    /// The signing user's id within the rules container.
    pub user_id: String,
    /// Raw `r || s` P-256 signature, base64.
    #[serde(default)]
    pub signature: String,
    /// The payload hashes this approver vouched for.
    #[serde(default)]
    pub hashes: Vec<String>,
}

/// An internal address linked to a whitelisted entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedInternalAddress {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// A wallet linked to a whitelisted entry, identified by its derivation path.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedWallet {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub path: String,
    /// Wallet display name; the wire field is `name`.
    #[serde(default, rename = "name")]
    pub label: Option<String>,
}

/// The domain model parsed from a verified address payload.
///
/// Only fields extracted here, after the envelope passed every verification
/// step, are security-trusted; the same values appearing anywhere else in the
/// inputs must be treated as untrusted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhitelistedAddress {
    /// Blockchain the destination lives on. The wire field is `currency`.
    #[serde(rename = "currency")]
    pub blockchain: String,
    pub network: String,
    pub address: String,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub contract_type: Option<String>,
    #[serde(default, rename = "tnParticipantID")]
    pub tn_participant_id: Option<String>,
    #[serde(default)]
    pub address_type: Option<String>,
    /// Numeric exchange account reference, sent as a string. An unparseable
    /// value is treated as absent rather than failing the parse.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub exchange_account_id: Option<i64>,
    #[serde(default)]
    pub linked_internal_addresses: Vec<LinkedInternalAddress>,
    #[serde(default)]
    pub linked_wallets: Vec<LinkedWallet>,
}

/// Accept a JSON id that arrives either as a string or as a bare number.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(i64),
    }
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(value) => value,
        StringOrNumber::Number(value) => value.to_string(),
    })
}

/// Parse an integer sent as a string, treating anything unparseable as absent.
fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.parse().ok()))
}
