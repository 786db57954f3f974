//! Recognizes admission-relevant activity inside captured request bodies.
//!
//! Bodies arrive as the raw serialized document, so quotes inside an
//! embedded query appear escaped (`\"`). Markers match that escaped form
//! directly rather than parsing the document.

use crate::codec;
use crate::domain::error::ExtractError;
use crate::domain::types::{ActivityEvent, SignerId};
use tracing::debug;

/// Turns a request body into at most one activity event
pub trait ActivityExtractor: Send + Sync {
    /// Scan `body` for recognizable activity.
    ///
    /// `Ok(None)` means the body carried no marker. `Err` means a marker
    /// was present but its content was unusable.
    fn extract(&self, body: &str) -> Result<Option<ActivityEvent>, ExtractError>;
}

/// Marker-driven extractor for JSON-wrapped query bodies.
///
/// A submission marker takes precedence over probe markers, so a probe
/// string embedded inside a submission cannot reroute the event.
pub struct MarkerScanExtractor {
    pub submission_marker: String,
    pub probe_markers: Vec<String>,
    pub payload_start: String,
    pub payload_end: String,
}

impl Default for MarkerScanExtractor {
    fn default() -> Self {
        Self {
            submission_marker: "stageTransaction".to_string(),
            probe_markers: vec![
                r#"agent(address:\""#.to_string(),
                r#"agent(address: \""#.to_string(),
            ],
            // Hex text of the envelope frame: dict opener through final
            // list-and-dict terminators
            payload_start: "64313".to_string(),
            payload_end: "6565".to_string(),
        }
    }
}

impl MarkerScanExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Greedy span from the first start marker to the end of the last end
    /// marker, hex-decoded and unpacked for its signer field.
    fn submission_signer(&self, body: &str) -> Result<SignerId, ExtractError> {
        let start = body
            .find(&self.payload_start)
            .ok_or(ExtractError::MissingPayload)?;
        let end = body
            .rfind(&self.payload_end)
            .map(|idx| idx + self.payload_end.len())
            .filter(|end| *end > start)
            .ok_or(ExtractError::MissingPayload)?;

        let payload = hex::decode(&body[start..end])?;
        codec::transaction_signer(&payload)
    }

    /// Address between the first pair of escaped quotes; everything after
    /// its `0x` prefix must be exactly the signer's 40 hex digits.
    fn probe_signer(&self, body: &str) -> Result<SignerId, ExtractError> {
        let quoted = body
            .split(r#"\""#)
            .nth(1)
            .ok_or(ExtractError::MissingAddress)?;
        let after_prefix = quoted
            .split("0x")
            .nth(1)
            .ok_or(ExtractError::MissingAddress)?;
        SignerId::from_hex(after_prefix)
    }
}

impl ActivityExtractor for MarkerScanExtractor {
    fn extract(&self, body: &str) -> Result<Option<ActivityEvent>, ExtractError> {
        if body.contains(&self.submission_marker) {
            let signer = self.submission_signer(body)?;
            debug!(signer = %signer, "Transaction submission recognized");
            return Ok(Some(ActivityEvent::TransactionSubmission { signer }));
        }

        if self
            .probe_markers
            .iter()
            .any(|marker| body.contains(marker.as_str()))
        {
            let signer = self.probe_signer(body)?;
            debug!(signer = %signer, "Identity probe recognized");
            return Ok(Some(ActivityEvent::IdentityProbe { signer }));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn byte_str(bytes: &[u8]) -> Vec<u8> {
        let mut out = format!("{}:", bytes.len()).into_bytes();
        out.extend_from_slice(bytes);
        out
    }

    fn sample_envelope(signer: &[u8; 20]) -> Vec<u8> {
        let mut tx = vec![b'd'];
        tx.extend(byte_str(b"g"));
        tx.extend(byte_str(&[0x11; 32]));
        tx.extend(byte_str(b"n"));
        tx.extend(b"i3e");
        tx.extend(byte_str(b"s"));
        tx.extend(byte_str(signer));
        tx.extend(byte_str(b"u"));
        tx.push(b'l');
        tx.extend(byte_str(signer));
        tx.push(b'e');
        tx.push(b'e');
        tx
    }

    fn submission_body(payload_hex: &str) -> String {
        format!(r#"{{"query":"mutation {{ stageTransaction(payload: \"{payload_hex}\") }}"}}"#)
    }

    #[test]
    fn test_probe_extraction() {
        let extractor = MarkerScanExtractor::new();
        let body = r#"{"query":"{\n  agent(address: \"0x9fab0f2d0a72a0b3584f1f6b20e85e1a18a8e2c5\") {\n    state\n  }\n}"}"#;

        let event = extractor.extract(body).unwrap().unwrap();
        assert_eq!(
            event,
            ActivityEvent::IdentityProbe {
                signer: SignerId::from_hex("9fab0f2d0a72a0b3584f1f6b20e85e1a18a8e2c5")
                    .unwrap()
            }
        );
    }

    #[test]
    fn test_probe_marker_without_space() {
        let extractor = MarkerScanExtractor::new();
        let body = r#"{"query":"{agent(address:\"0x9fab0f2d0a72a0b3584f1f6b20e85e1a18a8e2c5\"){state}}"}"#;

        let event = extractor.extract(body).unwrap().unwrap();
        assert!(matches!(event, ActivityEvent::IdentityProbe { .. }));
    }

    #[test]
    fn test_probe_accepts_mixed_case_address() {
        let extractor = MarkerScanExtractor::new();
        let body = r#"{"query":"{agent(address:\"0x9FAB0F2D0A72A0B3584F1F6B20E85E1A18A8E2C5\"){state}}"}"#;

        let event = extractor.extract(body).unwrap().unwrap();
        assert_eq!(
            event.signer(),
            SignerId::from_hex("9fab0f2d0a72a0b3584f1f6b20e85e1a18a8e2c5").unwrap()
        );
    }

    #[test]
    fn test_submission_extraction() {
        let extractor = MarkerScanExtractor::new();
        let signer_bytes = [0xaa; 20];
        let body = submission_body(&hex::encode(sample_envelope(&signer_bytes)));

        let event = extractor.extract(&body).unwrap().unwrap();
        assert_eq!(
            event,
            ActivityEvent::TransactionSubmission {
                signer: SignerId::new(signer_bytes)
            }
        );
    }

    #[test]
    fn test_submission_wins_over_probe() {
        let extractor = MarkerScanExtractor::new();
        let payload_hex = hex::encode(sample_envelope(&[0xbb; 20]));
        let body = format!(
            r#"{{"query":"mutation {{ stageTransaction(payload: \"{payload_hex}\") }} # agent(address: \"0x9fab0f2d0a72a0b3584f1f6b20e85e1a18a8e2c5\")"}}"#
        );

        let event = extractor.extract(&body).unwrap().unwrap();
        assert_eq!(
            event,
            ActivityEvent::TransactionSubmission {
                signer: SignerId::new([0xbb; 20])
            }
        );
    }

    #[test]
    fn test_submission_marker_without_payload() {
        let extractor = MarkerScanExtractor::new();
        let body = r#"{"query":"mutation { stageTransaction(payload: \"\") }"}"#;

        assert!(matches!(
            extractor.extract(body),
            Err(ExtractError::MissingPayload)
        ));
    }

    #[test]
    fn test_submission_with_odd_length_span() {
        let extractor = MarkerScanExtractor::new();
        let body = submission_body("643136565");

        assert!(matches!(
            extractor.extract(&body),
            Err(ExtractError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_submission_payload_missing_signer() {
        // Decodes to a dict without the signer field
        let extractor = MarkerScanExtractor::new();
        let body = submission_body("64313a316c6565");

        assert!(matches!(
            extractor.extract(&body),
            Err(ExtractError::MissingSigner)
        ));
    }

    #[test]
    fn test_probe_without_address() {
        let extractor = MarkerScanExtractor::new();
        let body = r#"{"query":"{agent(address:\"nothing here\"){state}}"}"#;

        assert!(matches!(
            extractor.extract(body),
            Err(ExtractError::MissingAddress)
        ));
    }

    #[test]
    fn test_probe_with_short_address() {
        let extractor = MarkerScanExtractor::new();
        let body = r#"{"query":"{agent(address:\"0x9fab\"){state}}"}"#;

        assert!(matches!(
            extractor.extract(body),
            Err(ExtractError::AddressWidth { .. })
        ));
    }

    #[test]
    fn test_probe_with_overlong_address() {
        // 42 hex digits must fail outright, not be truncated to a signer
        // the sender never named
        let extractor = MarkerScanExtractor::new();
        let body = r#"{"query":"{agent(address:\"0xaabbccddeeff00112233445566778899aabbccddee\"){state}}"}"#;

        assert!(matches!(
            extractor.extract(body),
            Err(ExtractError::AddressWidth { got: 42, .. })
        ));
    }

    #[test]
    fn test_plain_body_yields_nothing() {
        let extractor = MarkerScanExtractor::new();

        assert_eq!(
            extractor.extract(r#"{"query":"{ nodeStatus { tip } }"}"#).unwrap(),
            None
        );
        assert_eq!(extractor.extract("").unwrap(), None);
    }
}
