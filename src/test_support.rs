//! Builders shared by the unit tests: P-256 signers, container documents,
//! approver signatures, and envelope skeletons.

use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use serde_json::{Value, json};

use crate::canonical::compact_json;
use crate::crypto::sha256_hex;
use crate::envelope::{ApproverSignature, EnvelopeMetadata, SignedEntry, WhitelistEnvelope};
use crate::rules::{Group, GroupThreshold, RulesContainer, SequentialThresholds, User};
use crate::util::b64;

/// Sign raw bytes, producing the platform's base64 `r || s` form.
pub(crate) fn sign_bytes(key: &SigningKey, message: &[u8]) -> String {
    let signature: Signature = key.sign(message);
    b64::encode(signature.to_bytes())
}

/// An approver signature record over the canonical rendering of `hashes`.
pub(crate) fn approver_signature(
    user_id: &str,
    key: &SigningKey,
    hashes: &[String],
) -> ApproverSignature {
    let hashes: Vec<String> = hashes.to_vec();
    let message = compact_json(&hashes).expect("hash arrays serialize");
    ApproverSignature {
        user_id: user_id.to_string(),
        signature: sign_bytes(key, &message),
        hashes,
    }
}

pub(crate) fn user(id: &str, key: &SigningKey, roles: &[&str]) -> User {
    User {
        id: id.to_string(),
        public_key: (*key.verifying_key()).into(),
        roles: roles.iter().map(|role| role.to_string()).collect(),
    }
}

pub(crate) fn group(id: &str, member_ids: &[&str]) -> Group {
    Group {
        id: id.to_string(),
        user_ids: member_ids.iter().map(|id| id.to_string()).collect(),
    }
}

pub(crate) fn rules_with(users: Vec<User>, groups: Vec<Group>) -> RulesContainer {
    RulesContainer {
        users,
        groups,
        address_whitelisting_rules: Vec::new(),
        contract_address_whitelisting_rules: Vec::new(),
    }
}

pub(crate) fn sequential_path(thresholds: &[(&str, u32)]) -> SequentialThresholds {
    SequentialThresholds {
        thresholds: thresholds
            .iter()
            .map(|(group_id, minimum)| GroupThreshold {
                group_id: group_id.to_string(),
                minimum_signatures: *minimum,
            })
            .collect(),
    }
}

/// An address envelope skeleton with the metadata hash derived from `payload`.
/// Container and signature blobs start empty; tests fill them as needed.
pub(crate) fn address_envelope(
    payload: &str,
    signatures: Vec<ApproverSignature>,
) -> WhitelistEnvelope {
    WhitelistEnvelope {
        id: "wl-1".to_string(),
        blockchain: "ETH".to_string(),
        network: "mainnet".to_string(),
        metadata: EnvelopeMetadata {
            hash: sha256_hex(payload.as_bytes()),
            payload_as_string: payload.to_string(),
        },
        rules_container_base64: String::new(),
        rules_signatures_base64: String::new(),
        signed_address: Some(SignedEntry { signatures }),
        signed_contract_address: None,
        linked_internal_addresses: Vec::new(),
        linked_wallets: Vec::new(),
    }
}

/// A user document with the key rendered in base64 SEC1 form.
pub(crate) fn user_value(id: &str, key: &SigningKey, roles: &[&str]) -> Value {
    json!({
        "id": id,
        "publicKey": b64::encode(key.verifying_key().to_encoded_point(true).as_bytes()),
        "roles": roles,
    })
}

pub(crate) fn group_value(id: &str, member_ids: &[&str]) -> Value {
    json!({"id": id, "userIds": member_ids})
}

/// A `parallelThresholds` document: an OR over AND paths of `(group, minimum)`.
pub(crate) fn paths_value(paths: &[&[(&str, u32)]]) -> Value {
    let paths: Vec<Value> = paths
        .iter()
        .map(|thresholds| {
            let thresholds: Vec<Value> = thresholds
                .iter()
                .map(|(group_id, minimum)| {
                    json!({"groupId": group_id, "minimumSignatures": minimum})
                })
                .collect();
            json!({"thresholds": thresholds})
        })
        .collect();
    json!(paths)
}

/// A rule line whose leading cell is an internal wallet at `path`.
pub(crate) fn line_value(path: &str, parallel_thresholds: Value) -> Value {
    json!({
        "cells": [{"source": {"type": "INTERNAL_WALLET", "path": path}}],
        "parallelThresholds": parallel_thresholds,
    })
}

/// A full rules container document.
pub(crate) fn container_value(
    users: Vec<Value>,
    groups: Vec<Value>,
    address_rules: Value,
    contract_rules: Value,
) -> Value {
    json!({
        "users": users,
        "groups": groups,
        "addressWhitelistingRules": address_rules,
        "contractAddressWhitelistingRules": contract_rules,
    })
}

pub(crate) fn to_container_b64(container: &Value) -> String {
    b64::encode(serde_json::to_vec(container).expect("container documents serialize"))
}

/// A rules-signatures blob: each signer signs the decoded container bytes.
pub(crate) fn rules_signatures_b64(
    container_b64: &str,
    signers: &[(&str, &SigningKey)],
) -> String {
    let container_bytes = b64::decode(container_b64).expect("container blob decodes");
    let records: Vec<Value> = signers
        .iter()
        .map(|(user_id, key)| {
            json!({"userId": user_id, "signature": sign_bytes(key, &container_bytes)})
        })
        .collect();
    b64::encode(serde_json::to_vec(&records).expect("signature records serialize"))
}
