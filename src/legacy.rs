//! Legacy hash recomputation for entries signed against older schema versions.
//!
//! When a field is added to the canonical payload schema, entries approved
//! before the rollout still carry signatures over the old rendering. Instead of
//! re-parsing JSON, the verifier applies targeted string-level deletions to
//! `payloadAsString` and hashes each variant; any of those hashes may appear in
//! an approver's signed `hashes` array.
//!
//! Address payloads and asset payloads evolved differently, so each kind has
//! its own strategy list. Every strategy is applied to the original string, not
//! cumulatively; only the combined strategies chain explicitly.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

use crate::crypto::sha256_hex;

/// `,"contractType":"…"` anywhere in the payload.
static ADDRESS_CONTRACT_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#","contractType":"[^"]*""#).expect("static pattern"));

/// `,"label":"…"` immediately before a closing brace. This targets labels of
/// `linkedInternalAddresses` elements; the top-level address label is followed
/// by a comma and stays untouched.
static ADDRESS_TRAILING_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#","label":"[^"]*"\}"#).expect("static pattern"));

/// `,"isNFT":<bool>` when the field is not first in its object.
static ASSET_IS_NFT_INNER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#","isNFT":(?:true|false)"#).expect("static pattern"));

/// `"isNFT":<bool>,` when the field opens its object.
static ASSET_IS_NFT_LEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""isNFT":(?:true|false),"#).expect("static pattern"));

/// `,"kindType":"…"` when the field is not first in its object.
static ASSET_KIND_TYPE_INNER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#","kindType":"[^"]*""#).expect("static pattern"));

/// `"kindType":"…",` when the field opens its object.
static ASSET_KIND_TYPE_LEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""kindType":"[^"]*","#).expect("static pattern"));

fn strip_contract_type(payload: &str) -> Cow<'_, str> {
    ADDRESS_CONTRACT_TYPE.replace_all(payload, "")
}

fn strip_trailing_labels(payload: &str) -> Cow<'_, str> {
    ADDRESS_TRAILING_LABEL.replace_all(payload, "}")
}

fn strip_is_nft(payload: &str) -> String {
    let inner = ASSET_IS_NFT_INNER.replace_all(payload, "");
    ASSET_IS_NFT_LEADING.replace_all(&inner, "").into_owned()
}

fn strip_kind_type(payload: &str) -> String {
    let inner = ASSET_KIND_TYPE_INNER.replace_all(payload, "");
    ASSET_KIND_TYPE_LEADING.replace_all(&inner, "").into_owned()
}

/// Candidate hashes for an address payload signed under an older schema.
///
/// Strategies, each applied to the original payload:
/// 1. drop `contractType`,
/// 2. drop trailing linked-address labels,
/// 3. both.
///
/// Variants identical to the original are skipped, duplicate hashes are
/// dropped, and the insertion order of unique hashes is preserved. An empty
/// payload yields an empty list.
pub fn legacy_address_hashes(payload: &str) -> Vec<String> {
    if payload.is_empty() {
        return Vec::new();
    }
    let without_contract_type = strip_contract_type(payload);
    let without_labels = strip_trailing_labels(payload);
    let without_both = strip_contract_type(&without_labels).into_owned();
    collect_variant_hashes(
        payload,
        [
            without_contract_type.into_owned(),
            without_labels.into_owned(),
            without_both,
        ],
    )
}

/// Candidate hashes for an asset payload signed under an older schema.
///
/// Strategies, each applied to the original payload:
/// 1. drop `isNFT`,
/// 2. drop `kindType`,
/// 3. both.
pub fn legacy_asset_hashes(payload: &str) -> Vec<String> {
    if payload.is_empty() {
        return Vec::new();
    }
    let without_is_nft = strip_is_nft(payload);
    let without_kind_type = strip_kind_type(payload);
    let without_both = strip_kind_type(&without_is_nft);
    collect_variant_hashes(payload, [without_is_nft, without_kind_type, without_both])
}

fn collect_variant_hashes<const N: usize>(original: &str, variants: [String; N]) -> Vec<String> {
    let mut hashes: Vec<String> = Vec::with_capacity(N);
    for variant in variants {
        if variant == original {
            continue;
        }
        let hash = sha256_hex(variant.as_bytes());
        if !hashes.contains(&hash) {
            hashes.push(hash);
        }
    }
    hashes
}
