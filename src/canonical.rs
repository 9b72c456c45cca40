//! Canonical JSON serialization of signed hash arrays.
//!
//! An approver does not sign an envelope payload directly. They sign the
//! canonical JSON rendering of the `hashes` array attached to their signature
//! record: UTF-8, no whitespace between tokens, strings escaped per the JSON
//! interchange standard, no trailing newline. Every SDK that talks to the
//! platform must produce bit-identical output here, so this module is pinned
//! by shared test vectors rather than left to serializer defaults.

use serde_json::Error as JsonError;

/// Serialize `values` as compact canonical JSON, the exact byte sequence an
/// approver signs.
///
/// The output uses `,` between elements and no spaces anywhere; string escapes
/// follow RFC 8259 (`"` and `\` escaped, control characters as `\uXXXX`,
/// everything else emitted as raw UTF-8).
pub fn compact_json(values: &[String]) -> Result<Vec<u8>, JsonError> {
    serde_json::to_vec(values)
}
