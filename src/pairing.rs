//! Pairing code generation and validation
//!
//! The camera displays a six digit code (and the equivalent scan payload);
//! the remote relays it back to connect. Codes are uniform over
//! 000000-999999 with leading zeros preserved. Refreshing retires the
//! previous code so late connect attempts can be rejected as stale.

use crate::errors::CamlinkError;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Prefix used when the code is carried in a scannable payload.
pub const SCAN_PREFIX: &str = "CAMERA_CONNECT:";

/// A six ASCII-digit pairing code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PairingCode(String);

impl PairingCode {
    /// Validate and wrap a user-entered code.
    pub fn parse(raw: &str) -> Result<Self, CamlinkError> {
        let trimmed = raw.trim();
        if trimmed.len() == 6 && trimmed.chars().all(|c| c.is_ascii_digit()) {
            Ok(PairingCode(trimmed.to_string()))
        } else {
            Err(CamlinkError::InvalidCode(raw.to_string()))
        }
    }

    /// Payload embedded in the QR code shown on the camera.
    pub fn scan_payload(&self) -> String {
        format!("{}{}", SCAN_PREFIX, self.0)
    }

    /// Extract a code from a scanned payload.
    pub fn from_scan_payload(payload: &str) -> Result<Self, CamlinkError> {
        match payload.strip_prefix(SCAN_PREFIX) {
            Some(code) => Self::parse(code),
            None => Err(CamlinkError::InvalidCode(payload.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PairingCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for PairingCode {
    type Error = CamlinkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PairingCode::parse(&value)
    }
}

impl From<PairingCode> for String {
    fn from(code: PairingCode) -> String {
        code.0
    }
}

/// Generates the camera's current pairing code.
///
/// Holds at most one live code; `refresh` swaps it out and reports the
/// retired one so the rendezvous layer can reject it as stale.
#[derive(Debug, Default)]
pub struct PairingCodeGenerator {
    current: Option<PairingCode>,
}

impl PairingCodeGenerator {
    pub fn new() -> Self {
        Self { current: None }
    }

    /// Generate the first code, or return the live one unchanged.
    pub fn generate(&mut self) -> PairingCode {
        if let Some(code) = &self.current {
            return code.clone();
        }
        let code = Self::random_code();
        self.current = Some(code.clone());
        code
    }

    /// Replace the live code. Returns the new code and the retired one.
    pub fn refresh(&mut self) -> (PairingCode, Option<PairingCode>) {
        let retired = self.current.take();
        let code = Self::random_code();
        log::info!("Pairing code refreshed");
        self.current = Some(code.clone());
        (code, retired)
    }

    /// The live code, if one has been generated.
    pub fn current(&self) -> Option<&PairingCode> {
        self.current.as_ref()
    }

    fn random_code() -> PairingCode {
        let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
        PairingCode(format!("{:06}", n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_six_digits() {
        let code = PairingCode::parse("482913").unwrap();
        assert_eq!(code.as_str(), "482913");
        assert_eq!(code.to_string(), "482913");
    }

    #[test]
    fn test_parse_preserves_leading_zeros() {
        let code = PairingCode::parse("004213").unwrap();
        assert_eq!(code.as_str(), "004213");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(PairingCode::parse("12345").is_err());
        assert!(PairingCode::parse("1234567").is_err());
        assert!(PairingCode::parse("12a456").is_err());
        assert!(PairingCode::parse("").is_err());
    }

    #[test]
    fn test_scan_payload_round_trip() {
        let code = PairingCode::parse("482913").unwrap();
        assert_eq!(code.scan_payload(), "CAMERA_CONNECT:482913");
        let back = PairingCode::from_scan_payload("CAMERA_CONNECT:482913").unwrap();
        assert_eq!(back, code);
        assert!(PairingCode::from_scan_payload("OTHER:482913").is_err());
    }

    #[test]
    fn test_generated_codes_are_well_formed() {
        let mut gen = PairingCodeGenerator::new();
        for _ in 0..100 {
            let (code, _) = gen.refresh();
            assert_eq!(code.as_str().len(), 6);
            assert!(code.as_str().chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_generate_is_stable_until_refresh() {
        let mut gen = PairingCodeGenerator::new();
        let first = gen.generate();
        assert_eq!(gen.generate(), first);
        assert_eq!(gen.current(), Some(&first));

        let (fresh, retired) = gen.refresh();
        assert_eq!(retired, Some(first));
        assert_eq!(gen.current(), Some(&fresh));
    }

    #[test]
    fn test_refresh_with_no_prior_code_retires_nothing() {
        let mut gen = PairingCodeGenerator::new();
        let (_, retired) = gen.refresh();
        assert!(retired.is_none());
    }
}
