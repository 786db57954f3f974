//! Core value types: request origins, signer identities, observed events, verdicts.

use crate::domain::error::ExtractError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Width of a signer identity in bytes
pub const SIGNER_LEN: usize = 20;

/// Width of a signer identity in hex digits
pub const SIGNER_HEX_LEN: usize = SIGNER_LEN * 2;

/// Network-level identity of a request's source.
///
/// Typically a textual IP address; equality is exact string match and there
/// is no TTL on anything keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Origin(String);

impl Origin {
    pub fn new(origin: impl Into<String>) -> Self {
        Self(origin.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<IpAddr> for Origin {
    fn from(ip: IpAddr) -> Self {
        Self(ip.to_string())
    }
}

impl From<&str> for Origin {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Origin {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for Origin {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Fixed-width account identifier extracted from request content.
///
/// Displayed and serialized as a 0x-prefixed lowercase hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignerId([u8; SIGNER_LEN]);

impl SignerId {
    pub const fn new(bytes: [u8; SIGNER_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse from exactly 40 hex digits (no 0x prefix).
    pub fn from_hex(s: &str) -> Result<Self, ExtractError> {
        if s.len() != SIGNER_HEX_LEN {
            return Err(ExtractError::AddressWidth {
                expected: SIGNER_HEX_LEN,
                got: s.len(),
            });
        }
        let mut bytes = [0u8; SIGNER_LEN];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Build from a raw byte slice; the slice must be exactly 20 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ExtractError> {
        let arr: [u8; SIGNER_LEN] =
            bytes
                .try_into()
                .map_err(|_| ExtractError::SignerWidth {
                    expected: SIGNER_LEN,
                    got: bytes.len(),
                })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; SIGNER_LEN] {
        &self.0
    }
}

impl fmt::Display for SignerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for SignerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignerId({self})")
    }
}

impl From<[u8; SIGNER_LEN]> for SignerId {
    fn from(bytes: [u8; SIGNER_LEN]) -> Self {
        Self(bytes)
    }
}

impl Serialize for SignerId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SignerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let hex_part = s.strip_prefix("0x").unwrap_or(&s);
        Self::from_hex(hex_part).map_err(serde::de::Error::custom)
    }
}

/// Activity recognized in a request body.
///
/// The extractor yields `Option<ActivityEvent>`; `None` means the body
/// referenced neither a probe nor a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityEvent {
    /// Origin declares interest in a signer (account lookup by address)
    IdentityProbe { signer: SignerId },
    /// Origin asserts a signer is transacting (staged transaction payload)
    TransactionSubmission { signer: SignerId },
}

impl ActivityEvent {
    pub fn signer(&self) -> SignerId {
        match self {
            Self::IdentityProbe { signer } => *signer,
            Self::TransactionSubmission { signer } => *signer,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::IdentityProbe { .. } => EventKind::IdentityProbe,
            Self::TransactionSubmission { .. } => EventKind::TransactionSubmission,
        }
    }
}

/// Event classification as carried on audit records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Body referenced neither a probe nor a submission
    None,
    IdentityProbe,
    TransactionSubmission,
}

/// Admission decision for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Forward the request to the protected backend
    Allow,
    /// Short-circuit with a rejection response
    Deny,
}

impl Verdict {
    pub fn is_allow(self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn is_deny(self) -> bool {
        matches!(self, Self::Deny)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signer_hex_roundtrip() {
        let signer = SignerId::from_hex("9c19b0bf454cbba6fca22ebd92c50a1dc3389bdc").unwrap();
        assert_eq!(
            signer.to_string(),
            "0x9c19b0bf454cbba6fca22ebd92c50a1dc3389bdc"
        );
        let again = SignerId::from_hex("9c19b0bf454cbba6fca22ebd92c50a1dc3389bdc").unwrap();
        assert_eq!(signer, again);
    }

    #[test]
    fn test_signer_rejects_bad_width() {
        assert!(matches!(
            SignerId::from_hex("abcd"),
            Err(ExtractError::AddressWidth { got: 4, .. })
        ));
        assert!(matches!(
            SignerId::from_hex(&"ab".repeat(32)),
            Err(ExtractError::AddressWidth { got: 64, .. })
        ));
    }

    #[test]
    fn test_signer_rejects_non_hex() {
        let s = "zz19b0bf454cbba6fca22ebd92c50a1dc3389bdc";
        assert!(matches!(
            SignerId::from_hex(s),
            Err(ExtractError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_signer_from_slice() {
        let bytes = [0xabu8; 20];
        let signer = SignerId::from_slice(&bytes).unwrap();
        assert_eq!(signer.as_bytes(), &bytes);

        assert!(matches!(
            SignerId::from_slice(&[0u8; 32]),
            Err(ExtractError::SignerWidth { got: 32, .. })
        ));
    }

    #[test]
    fn test_signer_serde_accepts_prefix() {
        let json = "\"0x9c19b0bf454cbba6fca22ebd92c50a1dc3389bdc\"";
        let signer: SignerId = serde_json::from_str(json).unwrap();
        assert_eq!(serde_json::to_string(&signer).unwrap(), json);

        let bare = "\"9c19b0bf454cbba6fca22ebd92c50a1dc3389bdc\"";
        let same: SignerId = serde_json::from_str(bare).unwrap();
        assert_eq!(signer, same);
    }

    #[test]
    fn test_origin_from_ip() {
        let origin = Origin::from(IpAddr::from([10, 0, 0, 7]));
        assert_eq!(origin.as_str(), "10.0.0.7");
        assert_eq!(Origin::from("10.0.0.7"), origin);
    }

    #[test]
    fn test_event_accessors() {
        let signer = SignerId::new([1u8; 20]);
        let probe = ActivityEvent::IdentityProbe { signer };
        let submission = ActivityEvent::TransactionSubmission { signer };

        assert_eq!(probe.signer(), signer);
        assert_eq!(probe.kind(), EventKind::IdentityProbe);
        assert_eq!(submission.kind(), EventKind::TransactionSubmission);
    }

    #[test]
    fn test_verdict_predicates() {
        assert!(Verdict::Allow.is_allow());
        assert!(!Verdict::Allow.is_deny());
        assert!(Verdict::Deny.is_deny());
    }
}
