//! Small utilities shared across the verifier: base64 plumbing.

pub mod b64;
