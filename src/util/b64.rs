use base64::Engine;
use base64::engine::general_purpose::STANDARD as b64;
use std::fmt::Display;

/// A base64 string (standard alphabet, padded) as handed over by the platform.
///
/// Envelopes carry their rules container and rules signatures as opaque base64
/// blobs. This wrapper keeps the encoded form around for error messages while
/// giving typed access to the decoded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base64Blob<'a>(pub &'a str);

impl Base64Blob<'_> {
    /// Decode to the raw binary payload.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        b64.decode(self.0)
    }

    /// Whether the encoded form is the empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> From<&'a str> for Base64Blob<'a> {
    fn from(value: &'a str) -> Self {
        Base64Blob(value)
    }
}

impl Display for Base64Blob<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Decode a standalone base64 string with the standard padded alphabet.
pub fn decode(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    b64.decode(input)
}

/// Encode raw bytes with the standard padded alphabet.
pub fn encode<T: AsRef<[u8]>>(input: T) -> String {
    b64.encode(input.as_ref())
}
