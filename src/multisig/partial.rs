//! Partial signatures
//!
//! One cosigner's signature over a sign document, tagged with the key that
//! produced it and the sequence it was produced against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{SignMode, SimplePublicKey};
use crate::crypto::{verify_digest, KeyError, COMPACT_SIGNATURE_LEN};

/// A single cosigner's signature
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialSignature {
    /// Key that produced the signature
    pub signer: SimplePublicKey,
    pub mode: SignMode,
    /// Fixed-width low-S `r || s`
    #[serde(with = "hex_signature")]
    pub signature: [u8; COMPACT_SIGNATURE_LEN],
    /// Account sequence the signer signed against
    pub sequence: u64,
    /// When the signature was received
    pub signed_at: DateTime<Utc>,
}

impl PartialSignature {
    pub fn new(
        signer: SimplePublicKey,
        mode: SignMode,
        signature: [u8; COMPACT_SIGNATURE_LEN],
        sequence: u64,
    ) -> Self {
        Self {
            signer,
            mode,
            signature,
            sequence,
            signed_at: Utc::now(),
        }
    }

    /// Verify against a sign document digest
    pub fn verify(&self, digest: &[u8; 32]) -> Result<bool, KeyError> {
        verify_digest(self.signer.inner(), digest, &self.signature)
    }
}

mod hex_signature {
    use super::COMPACT_SIGNATURE_LEN;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &[u8; COMPACT_SIGNATURE_LEN],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<[u8; COMPACT_SIGNATURE_LEN], D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(encoded).map_err(de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| de::Error::custom("signature must be 64 bytes"))
    }
}
