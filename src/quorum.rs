//! Threshold quorum evaluation over an envelope's approver signatures.
//!
//! A rule's `parallel_thresholds` is an OR across approval paths; each path is
//! an AND of group thresholds. Paths are evaluated left to right and the first
//! succeeding path wins. Within a path, every group threshold is evaluated so
//! a failure reports the full per-group tally, not just the first miss.
//!
//! A signature counts toward a group threshold when its user belongs to the
//! group, its signed `hashes` array covers the verified hash, and its ECDSA
//! signature over the canonical rendering of that array checks out under the
//! user's key. The same signer may contribute to several group thresholds of
//! one path when they belong to several groups; counting is per valid
//! signature record, so duplicate records from one user each count.

use crate::canonical::compact_json;
use crate::crypto::{contains_constant_time, verify_p256_signature};
use crate::envelope::ApproverSignature;
use crate::rules::{GroupThreshold, RulesContainer, SequentialThresholds};
use crate::verifier::VerifyError;

/// Evaluate `paths` against the envelope's signatures, returning the index of
/// the first satisfied path.
///
/// An empty `paths` list is a configuration error surfaced as a whitelist
/// failure. When every path fails, the error aggregates each path's per-group
/// tally.
pub(crate) fn evaluate_parallel_thresholds(
    envelope_id: &str,
    paths: &[SequentialThresholds],
    signatures: &[ApproverSignature],
    verified_hash: &str,
    rules: &RulesContainer,
) -> Result<usize, VerifyError> {
    if paths.is_empty() {
        return Err(VerifyError::Whitelist(format!(
            "envelope {envelope_id}: no approval paths configured for this entry"
        )));
    }

    // Approvers sign the canonical rendering of their hashes array; prepare it
    // once per signature. A record that fails to serialize stays uncheckable
    // without failing the whole evaluation.
    let signed_messages: Vec<Option<Vec<u8>>> = signatures
        .iter()
        .map(|signature| compact_json(&signature.hashes).ok())
        .collect();

    let mut path_failures: Vec<String> = Vec::with_capacity(paths.len());
    for (index, path) in paths.iter().enumerate() {
        match evaluate_path(path, signatures, &signed_messages, verified_hash, rules) {
            Ok(()) => {
                tracing::debug!(
                    envelope_id,
                    path = index,
                    "approval path satisfied"
                );
                return Ok(index);
            }
            Err(reason) => path_failures.push(format!("path {}: {reason}", index + 1)),
        }
    }

    Err(VerifyError::Whitelist(format!(
        "envelope {envelope_id}: whitelist thresholds not met: {}",
        path_failures.join("; ")
    )))
}

/// Evaluate one AND path. Every group threshold is tallied; the error lists
/// each group's outcome so callers see the complete picture.
fn evaluate_path(
    path: &SequentialThresholds,
    signatures: &[ApproverSignature],
    signed_messages: &[Option<Vec<u8>>],
    verified_hash: &str,
    rules: &RulesContainer,
) -> Result<(), String> {
    if path.thresholds.is_empty() {
        return Err("no group thresholds configured".to_string());
    }

    let mut satisfied = true;
    let mut outcomes: Vec<String> = Vec::with_capacity(path.thresholds.len());
    for threshold in &path.thresholds {
        match evaluate_group_threshold(
            threshold,
            signatures,
            signed_messages,
            verified_hash,
            rules,
        ) {
            GroupOutcome::Satisfied { counted } => {
                outcomes.push(format!(
                    "group {}: {}/{} valid signatures",
                    threshold.group_id, counted, threshold.minimum_signatures
                ));
            }
            GroupOutcome::Unsatisfied { counted } => {
                satisfied = false;
                outcomes.push(format!(
                    "group {}: {}/{} valid signatures",
                    threshold.group_id, counted, threshold.minimum_signatures
                ));
            }
            GroupOutcome::GroupNotFound => {
                satisfied = false;
                outcomes.push(format!(
                    "group {}: not found in rules container",
                    threshold.group_id
                ));
            }
        }
    }

    if satisfied {
        Ok(())
    } else {
        Err(outcomes.join(", "))
    }
}

enum GroupOutcome {
    Satisfied { counted: u32 },
    Unsatisfied { counted: u32 },
    GroupNotFound,
}

fn evaluate_group_threshold(
    threshold: &GroupThreshold,
    signatures: &[ApproverSignature],
    signed_messages: &[Option<Vec<u8>>],
    verified_hash: &str,
    rules: &RulesContainer,
) -> GroupOutcome {
    let Some(group) = rules.find_group(&threshold.group_id) else {
        return GroupOutcome::GroupNotFound;
    };

    // A zero minimum is vacuously satisfied, even on an empty group.
    if threshold.minimum_signatures == 0 {
        return GroupOutcome::Satisfied { counted: 0 };
    }
    if group.user_ids.is_empty() {
        return GroupOutcome::Unsatisfied { counted: 0 };
    }

    let mut counted: u32 = 0;
    for (index, signature) in signatures.iter().enumerate() {
        if !group.user_ids.contains(&signature.user_id) {
            continue;
        }
        if !contains_constant_time(&signature.hashes, verified_hash) {
            continue;
        }
        // A group may reference a user the container does not carry; such a
        // signature stays uncheckable and simply does not count.
        let Some(user) = rules.find_user(&signature.user_id) else {
            continue;
        };
        let Some(message) = &signed_messages[index] else {
            continue;
        };
        if verify_p256_signature(user.public_key.verifying_key(), message, &signature.signature) {
            counted += 1;
            if counted >= threshold.minimum_signatures {
                return GroupOutcome::Satisfied { counted };
            }
        }
    }

    GroupOutcome::Unsatisfied { counted }
}
