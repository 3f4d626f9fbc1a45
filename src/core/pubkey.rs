//! Public keys: simple secp256k1 keys and legacy amino threshold keys
//!
//! A threshold (composite) key fixes the order of its members at
//! construction. That order determines the composite address and the
//! slot order of every multisignature produced for it.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use prost::Message;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::convert::TryFrom;
use std::fmt;
use thiserror::Error;

use crate::core::amino;
use crate::crypto::{
    encode_address, hash160, public_key_from_encoded, public_key_from_slice, sha256_truncated,
    KeyError, COMPRESSED_KEY_LEN,
};

/// Amino registration prefix of `tendermint/PubKeySecp256k1`
pub const SECP256K1_AMINO_PREFIX: [u8; 4] = [0xeb, 0x5a, 0xe9, 0x87];

/// Amino registration prefix of `tendermint/PubKeyMultisigThreshold`
pub const MULTISIG_AMINO_PREFIX: [u8; 4] = [0x22, 0xc1, 0xf7, 0xe2];

/// Errors building or decoding public keys
#[derive(Error, Debug)]
pub enum PublicKeyError {
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),
    #[error("Duplicate member public key at index {0}")]
    DuplicateMember(usize),
    #[error("Nested threshold keys are not supported")]
    NestedMultisig,
    #[error("Key error: {0}")]
    Key(#[from] KeyError),
}

// =============================================================================
// Simple keys
// =============================================================================

/// A single secp256k1 verification key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SimplePublicKey(secp256k1::PublicKey);

impl SimplePublicKey {
    pub fn new(key: secp256k1::PublicKey) -> Self {
        Self(key)
    }

    /// Parse from base64 (terra.js convention) or hex
    pub fn from_encoded(encoded: &str) -> Result<Self, KeyError> {
        public_key_from_encoded(encoded).map(Self)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        public_key_from_slice(bytes).map(Self)
    }

    /// The underlying curve point
    pub fn inner(&self) -> &secp256k1::PublicKey {
        &self.0
    }

    /// Compressed SEC1 bytes, the form compared during aggregation
    pub fn to_bytes(&self) -> [u8; COMPRESSED_KEY_LEN] {
        self.0.serialize()
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    /// Amino binary encoding: prefix followed by the length-prefixed key
    pub fn amino_bytes(&self) -> Vec<u8> {
        let mut out = SECP256K1_AMINO_PREFIX.to_vec();
        prost::encoding::encode_varint(COMPRESSED_KEY_LEN as u64, &mut out);
        out.extend_from_slice(&self.to_bytes());
        out
    }

    /// bech32(hrp, RIPEMD160(SHA256(key)))
    pub fn address(&self, hrp: &str) -> Result<String, KeyError> {
        encode_address(hrp, &hash160(&self.to_bytes()))
    }
}

impl fmt::Display for SimplePublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base64())
    }
}

impl Serialize for SimplePublicKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for SimplePublicKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Self::from_encoded(&encoded).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Threshold keys
// =============================================================================

/// An M-of-N composite key with a fixed member order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyAminoMultisigPublicKey {
    threshold: u32,
    members: Vec<SimplePublicKey>,
}

impl LegacyAminoMultisigPublicKey {
    /// Create a composite key
    ///
    /// # Errors
    /// Fails if the threshold is zero or exceeds the member count, or if a
    /// member key appears twice.
    pub fn new(threshold: u32, members: Vec<SimplePublicKey>) -> Result<Self, PublicKeyError> {
        if threshold == 0 {
            return Err(PublicKeyError::InvalidThreshold(
                "threshold must be at least 1".to_string(),
            ));
        }

        if threshold as usize > members.len() {
            return Err(PublicKeyError::InvalidThreshold(format!(
                "threshold {} exceeds member count {}",
                threshold,
                members.len()
            )));
        }

        let mut seen = HashSet::new();
        for (index, member) in members.iter().enumerate() {
            if !seen.insert(member.to_bytes()) {
                return Err(PublicKeyError::DuplicateMember(index));
            }
        }

        Ok(Self { threshold, members })
    }

    /// Required signature count (M)
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Members in declared order (N of them)
    pub fn members(&self) -> &[SimplePublicKey] {
        &self.members
    }

    /// Slot index of a member, matched on exact compressed key bytes
    pub fn position_of(&self, key: &SimplePublicKey) -> Option<usize> {
        let needle = key.to_bytes();
        self.members.iter().position(|m| m.to_bytes() == needle)
    }

    /// Description like "2-of-3"
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.threshold, self.members.len())
    }

    /// Amino binary encoding of the composite descriptor
    pub fn amino_bytes(&self) -> Vec<u8> {
        let body = amino::LegacyAminoPubKey {
            threshold: self.threshold,
            public_keys: self.members.iter().map(|m| m.amino_bytes()).collect(),
        };
        let mut out = MULTISIG_AMINO_PREFIX.to_vec();
        out.extend(body.encode_to_vec());
        out
    }

    /// bech32(hrp, SHA256(amino)[..20]); depends on member order
    pub fn address(&self, hrp: &str) -> Result<String, KeyError> {
        encode_address(hrp, &sha256_truncated(&self.amino_bytes()))
    }
}

// =============================================================================
// Polymorphic key
// =============================================================================

/// Either a simple key or a composite threshold key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AminoPubKeyJson", into = "AminoPubKeyJson")]
pub enum PublicKey {
    Simple(SimplePublicKey),
    Multisig(LegacyAminoMultisigPublicKey),
}

impl PublicKey {
    pub fn address(&self, hrp: &str) -> Result<String, KeyError> {
        match self {
            PublicKey::Simple(key) => key.address(hrp),
            PublicKey::Multisig(key) => key.address(hrp),
        }
    }

    pub fn amino_bytes(&self) -> Vec<u8> {
        match self {
            PublicKey::Simple(key) => key.amino_bytes(),
            PublicKey::Multisig(key) => key.amino_bytes(),
        }
    }
}

impl From<SimplePublicKey> for PublicKey {
    fn from(key: SimplePublicKey) -> Self {
        PublicKey::Simple(key)
    }
}

impl From<LegacyAminoMultisigPublicKey> for PublicKey {
    fn from(key: LegacyAminoMultisigPublicKey) -> Self {
        PublicKey::Multisig(key)
    }
}

/// Amino JSON shape of a public key
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum AminoPubKeyJson {
    #[serde(rename = "tendermint/PubKeySecp256k1")]
    Secp256k1(String),
    #[serde(rename = "tendermint/PubKeyMultisigThreshold")]
    MultisigThreshold {
        threshold: String,
        pubkeys: Vec<AminoPubKeyJson>,
    },
}

impl From<PublicKey> for AminoPubKeyJson {
    fn from(key: PublicKey) -> Self {
        match key {
            PublicKey::Simple(simple) => AminoPubKeyJson::Secp256k1(simple.to_base64()),
            PublicKey::Multisig(multi) => AminoPubKeyJson::MultisigThreshold {
                threshold: multi.threshold.to_string(),
                pubkeys: multi
                    .members
                    .iter()
                    .map(|m| AminoPubKeyJson::Secp256k1(m.to_base64()))
                    .collect(),
            },
        }
    }
}

impl TryFrom<AminoPubKeyJson> for PublicKey {
    type Error = PublicKeyError;

    fn try_from(json: AminoPubKeyJson) -> Result<Self, Self::Error> {
        match json {
            AminoPubKeyJson::Secp256k1(value) => {
                Ok(PublicKey::Simple(SimplePublicKey::from_encoded(&value)?))
            }
            AminoPubKeyJson::MultisigThreshold { threshold, pubkeys } => {
                let threshold = threshold.trim().parse::<u32>().map_err(|e| {
                    PublicKeyError::InvalidThreshold(format!("{}: {}", threshold, e))
                })?;
                let members = pubkeys
                    .into_iter()
                    .map(|member| match member {
                        AminoPubKeyJson::Secp256k1(value) => {
                            SimplePublicKey::from_encoded(&value).map_err(PublicKeyError::from)
                        }
                        AminoPubKeyJson::MultisigThreshold { .. } => {
                            Err(PublicKeyError::NestedMultisig)
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(PublicKey::Multisig(LegacyAminoMultisigPublicKey::new(
                    threshold, members,
                )?))
            }
        }
    }
}
