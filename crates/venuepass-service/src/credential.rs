//! Pass credential codec.
//!
//! Format: `CHECKIN::<base64(json payload)>::<hex HMAC-SHA256>`, signature
//! computed over the base64 payload segment. The payload binds the booking
//! to its facility, slot, and validity window; any prefix, payload, or
//! signature mismatch is rejected as tampered.

use base64::Engine;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use venuepass_core::{BookingId, FacilityId, SlotType};

use crate::crypto::{constant_time_eq, hmac_sha256_hex};

const PREFIX: &str = "CHECKIN";

/// The signed payload carried by a pass credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassCredential {
    /// The booking this pass belongs to.
    pub booking_id: BookingId,
    /// The facility it is valid at.
    pub facility_id: FacilityId,
    /// The slot it is valid for.
    pub slot_type: SlotType,
    /// First valid date (the booking's start date).
    pub valid_from: NaiveDate,
    /// Last valid date (the booking's end date).
    pub valid_till: NaiveDate,
}

impl PassCredential {
    /// Encode and sign the credential.
    ///
    /// # Panics
    ///
    /// Never panics in practice: the payload is a plain struct with string
    /// keys, which always serializes.
    #[must_use]
    pub fn encode(&self, secret: &[u8]) -> String {
        let json = serde_json::to_vec(self).expect("credential payload serializes");
        let payload = base64::engine::general_purpose::STANDARD.encode(json);
        let signature = hmac_sha256_hex(secret, payload.as_bytes());
        format!("{PREFIX}::{payload}::{signature}")
    }

    /// Parse and verify a credential string.
    ///
    /// # Errors
    ///
    /// Returns an error if the structure, payload, or signature is invalid.
    pub fn decode(token: &str, secret: &[u8]) -> Result<Self, CredentialError> {
        let parts: Vec<&str> = token.split("::").collect();
        let [prefix, payload, signature] = parts.as_slice() else {
            return Err(CredentialError::Malformed);
        };
        if *prefix != PREFIX {
            return Err(CredentialError::Malformed);
        }

        let expected = hmac_sha256_hex(secret, payload.as_bytes());
        if !constant_time_eq(&expected, signature) {
            return Err(CredentialError::BadSignature);
        }

        let json = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|_| CredentialError::Malformed)?;
        serde_json::from_slice(&json).map_err(|_| CredentialError::Malformed)
    }
}

/// Credential parse/verify failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    /// Wrong prefix, wrong segment count, or undecodable payload.
    #[error("malformed credential")]
    Malformed,

    /// The signature does not match the payload.
    #[error("signature mismatch")]
    BadSignature,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential() -> PassCredential {
        PassCredential {
            booking_id: BookingId::generate(),
            facility_id: FacilityId::generate(),
            slot_type: SlotType::Morning,
            valid_from: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            valid_till: NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
        }
    }

    #[test]
    fn roundtrip() {
        let cred = credential();
        let token = cred.encode(b"secret");
        assert!(token.starts_with("CHECKIN::"));
        assert_eq!(PassCredential::decode(&token, b"secret").unwrap(), cred);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = credential().encode(b"secret");
        assert_eq!(
            PassCredential::decode(&token, b"other"),
            Err(CredentialError::BadSignature)
        );
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let token = credential().encode(b"secret");
        let mut parts: Vec<String> = token.split("::").map(String::from).collect();
        let other = credential();
        parts[1] = base64::engine::general_purpose::STANDARD
            .encode(serde_json::to_vec(&other).unwrap());
        let forged = parts.join("::");
        assert_eq!(
            PassCredential::decode(&forged, b"secret"),
            Err(CredentialError::BadSignature)
        );
    }

    #[test]
    fn wrong_prefix_and_shape_are_rejected() {
        let token = credential().encode(b"secret");
        let renamed = token.replacen("CHECKIN", "TICKET", 1);
        assert_eq!(
            PassCredential::decode(&renamed, b"secret"),
            Err(CredentialError::Malformed)
        );
        assert_eq!(
            PassCredential::decode("CHECKIN::only-two-parts", b"secret"),
            Err(CredentialError::Malformed)
        );
    }
}
