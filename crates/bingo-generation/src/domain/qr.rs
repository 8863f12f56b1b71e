//! Signed QR payloads.
//!
//! A ticket's QR code carries `{event_id, card_id}` plus an HMAC-SHA256 tag
//! over `"{event_id}:{card_id}"` keyed with the server secret, so a scanned
//! ticket can be checked without consulting the index.

use std::fmt;

use bingo_core::error::DomainError;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Decoded QR payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayload {
    /// Event identifier.
    pub event_id: String,
    /// Card identifier.
    pub card_id: Uuid,
    /// Hex HMAC-SHA256 tag.
    pub sig: String,
}

/// Signs and checks QR payloads with a server-held secret.
#[derive(Clone)]
pub struct QrSigner {
    secret: Vec<u8>,
}

impl fmt::Debug for QrSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QrSigner").finish_non_exhaustive()
    }
}

impl QrSigner {
    /// Creates a signer from the server secret.
    #[must_use]
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self, event_id: &str, card_id: Uuid) -> Result<HmacSha256, DomainError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| DomainError::Infrastructure(format!("hmac key rejected: {e}")))?;
        mac.update(format!("{event_id}:{card_id}").as_bytes());
        Ok(mac)
    }

    /// Produces the compact JSON payload for a ticket.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the payload cannot be built.
    pub fn sign(&self, event_id: &str, card_id: Uuid) -> Result<String, DomainError> {
        let tag = self.mac(event_id, card_id)?.finalize().into_bytes();
        let payload = QrPayload {
            event_id: event_id.to_owned(),
            card_id,
            sig: hex::encode(tag),
        };
        serde_json::to_string(&payload)
            .map_err(|e| DomainError::Infrastructure(format!("qr payload serialization failed: {e}")))
    }

    /// Decodes a payload and checks its tag in constant time.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidArgument` if the payload is malformed or
    /// the tag does not match.
    pub fn verify(&self, raw: &str) -> Result<QrPayload, DomainError> {
        let payload: QrPayload = serde_json::from_str(raw)
            .map_err(|e| DomainError::InvalidArgument(format!("malformed qr payload: {e}")))?;
        let tag = hex::decode(&payload.sig)
            .map_err(|e| DomainError::InvalidArgument(format!("malformed qr signature: {e}")))?;
        self.mac(&payload.event_id, payload.card_id)?
            .verify_slice(&tag)
            .map_err(|_| DomainError::InvalidArgument("qr signature mismatch".to_owned()))?;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_payload_verifies() {
        let signer = QrSigner::new("dev-secret-key");
        let card_id = Uuid::new_v4();

        let raw = signer.sign("E1", card_id).unwrap();
        let payload = signer.verify(&raw).unwrap();

        assert_eq!(payload.event_id, "E1");
        assert_eq!(payload.card_id, card_id);
        assert_eq!(payload.sig.len(), 64);
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let signer = QrSigner::new("dev-secret-key");
        let raw = signer.sign("E1", Uuid::new_v4()).unwrap();
        let tampered = raw.replace("\"E1\"", "\"E2\"");

        assert!(matches!(
            signer.verify(&tampered),
            Err(DomainError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_other_secret_is_rejected() {
        let raw = QrSigner::new("one").sign("E1", Uuid::new_v4()).unwrap();
        assert!(QrSigner::new("two").verify(&raw).is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let rendered = format!("{:?}", QrSigner::new("hunter2"));
        assert!(!rendered.contains("hunter2"));
    }
}
