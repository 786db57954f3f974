//! Transaction envelope decoding.
//!
//! A staged transaction travels as a dictionary in the envelope encoding; the
//! admission layer only reads its signer field. Signature, nonce, actions,
//! and the rest of the envelope are never interpreted here.

pub mod bencodex;

pub use bencodex::{decode, Key, Value};

use crate::domain::error::ExtractError;
use crate::domain::types::SignerId;

/// Dictionary key of the signer field in a transaction envelope
const SIGNER_KEY: &[u8] = b"s";

/// Decode a transaction envelope and return its signer identity.
pub fn transaction_signer(payload: &[u8]) -> Result<SignerId, ExtractError> {
    let envelope = decode(payload)?;
    if envelope.as_dict().is_none() {
        return Err(ExtractError::NotADictionary);
    }

    let field = envelope
        .get(SIGNER_KEY)
        .ok_or(ExtractError::MissingSigner)?;
    let bytes = field.as_bytes().ok_or(ExtractError::SignerType)?;
    SignerId::from_slice(bytes)
}
