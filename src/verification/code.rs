use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use std::fmt;
use uuid::Uuid;

/// A random single-use verification code.
///
/// The encoded form is only meant to travel safely in a URL query string.
/// It adds no secrecy and no integrity: the code is unguessable because it is
/// a random v4 UUID, not because of how it is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VerificationCode(Uuid);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedCode;

impl VerificationCode {
    pub fn generate() -> Self {
        VerificationCode(Uuid::new_v4())
    }

    pub fn encode(&self) -> String {
        URL_SAFE.encode(self.to_string())
    }

    pub fn decode(encoded: &str) -> Result<Self, MalformedCode> {
        let bytes = URL_SAFE.decode(encoded.trim()).map_err(|_| MalformedCode)?;
        let text = std::str::from_utf8(&bytes).map_err(|_| MalformedCode)?;
        Uuid::parse_str(text)
            .map(VerificationCode)
            .map_err(|_| MalformedCode)
    }
}

impl fmt::Display for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}
