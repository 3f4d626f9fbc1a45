//! Transaction model
//!
//! A Cosmos-SDK style transaction split into body, auth info and the
//! signature envelopes attached during assembly. Serialization targets the
//! legacy amino JSON `StdTx` accepted by the LCD `/txs` endpoint.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

use crate::core::codec::{base64_bytes, string_number};
use crate::core::coins::Coins;
use crate::core::pubkey::PublicKey;
use crate::multisig::ThresholdSignatureDescriptor;

// =============================================================================
// Error Types
// =============================================================================

/// Transaction-related errors
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("Transaction has no messages")]
    NoMessages,
    #[error("Signer {0} has no public key")]
    MissingPublicKey(String),
    #[error("Expected {expected} signature envelope(s), found {found}")]
    SignatureCount { expected: usize, found: usize },
    #[error("Signature envelope {0} does not match its signer slot")]
    SignerMismatch(usize),
    #[error("Unknown sign mode: {0}")]
    UnknownSignMode(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// =============================================================================
// Sign modes
// =============================================================================

/// Signing modes, numbered as in `cosmos.tx.signing.v1beta1.SignMode`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignMode {
    Direct,
    Textual,
    LegacyAminoJson,
}

impl SignMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignMode::Direct => "SIGN_MODE_DIRECT",
            SignMode::Textual => "SIGN_MODE_TEXTUAL",
            SignMode::LegacyAminoJson => "SIGN_MODE_LEGACY_AMINO_JSON",
        }
    }

    pub fn from_i32(value: i32) -> Result<Self, TransactionError> {
        match value {
            1 => Ok(SignMode::Direct),
            2 => Ok(SignMode::Textual),
            127 => Ok(SignMode::LegacyAminoJson),
            other => Err(TransactionError::UnknownSignMode(other.to_string())),
        }
    }

    /// Accepts the full enum name, or a decimal number
    pub fn from_name(name: &str) -> Result<Self, TransactionError> {
        let trimmed = name.trim();
        if let Ok(value) = trimmed.parse::<i32>() {
            return Self::from_i32(value);
        }
        match trimmed {
            "SIGN_MODE_DIRECT" => Ok(SignMode::Direct),
            "SIGN_MODE_TEXTUAL" => Ok(SignMode::Textual),
            "SIGN_MODE_LEGACY_AMINO_JSON" => Ok(SignMode::LegacyAminoJson),
            other => Err(TransactionError::UnknownSignMode(other.to_string())),
        }
    }
}

impl fmt::Display for SignMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for SignMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SignMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Name(String),
            Number(i32),
        }

        let mode = match Raw::deserialize(deserializer)? {
            Raw::Name(name) => SignMode::from_name(&name),
            Raw::Number(value) => SignMode::from_i32(value),
        };
        mode.map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Messages and fee
// =============================================================================

/// Bank transfer message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSend {
    pub from_address: String,
    pub to_address: String,
    pub amount: Coins,
}

/// Supported messages in amino JSON form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Msg {
    #[serde(rename = "bank/MsgSend")]
    Send(MsgSend),
}

/// Transaction fee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    pub amount: Coins,
    #[serde(with = "string_number")]
    pub gas: u64,
}

// =============================================================================
// Body and auth info
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxBody {
    pub messages: Vec<Msg>,
    pub memo: String,
    /// 0 means no timeout
    pub timeout_height: u64,
}

/// A declared signer slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerInfo {
    pub public_key: PublicKey,
    pub sequence: u64,
    pub mode: SignMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthInfo {
    pub signer_infos: Vec<SignerInfo>,
    pub fee: Fee,
}

// =============================================================================
// Signatures
// =============================================================================

/// Signature material carried by an envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureData {
    Single { mode: SignMode, signature: Vec<u8> },
    Multi(ThresholdSignatureDescriptor),
}

impl SignatureData {
    /// Bytes placed in the `signature` field of a `StdTx`
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            SignatureData::Single { signature, .. } => signature.clone(),
            SignatureData::Multi(descriptor) => descriptor.to_bytes(),
        }
    }
}

/// A public key, its signature data and the sequence it was produced at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEnvelope {
    pub public_key: PublicKey,
    pub data: SignatureData,
    pub sequence: u64,
}

// =============================================================================
// Transaction
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub body: TxBody,
    pub auth_info: AuthInfo,
    pub signatures: Vec<SignatureEnvelope>,
}

impl Transaction {
    pub fn new(body: TxBody, auth_info: AuthInfo) -> Self {
        Self {
            body,
            auth_info,
            signatures: Vec::new(),
        }
    }

    pub fn append_signature(&mut self, envelope: SignatureEnvelope) {
        self.signatures.push(envelope);
    }

    /// Check that every declared signer slot has exactly one matching envelope
    pub fn validate_signatures(&self) -> Result<(), TransactionError> {
        let expected = self.auth_info.signer_infos.len();
        let found = self.signatures.len();
        if expected != found {
            return Err(TransactionError::SignatureCount { expected, found });
        }

        for (index, (info, envelope)) in self
            .auth_info
            .signer_infos
            .iter()
            .zip(&self.signatures)
            .enumerate()
        {
            if info.public_key != envelope.public_key || info.sequence != envelope.sequence {
                return Err(TransactionError::SignerMismatch(index));
            }
        }
        Ok(())
    }

    /// Convert to the legacy amino JSON `StdTx`
    pub fn to_std_tx(&self) -> StdTx {
        StdTx {
            msg: self.body.messages.clone(),
            fee: self.auth_info.fee.clone(),
            signatures: self
                .signatures
                .iter()
                .map(|envelope| StdSignature {
                    pub_key: envelope.public_key.clone(),
                    signature: envelope.data.to_bytes(),
                })
                .collect(),
            memo: self.body.memo.clone(),
            timeout_height: self.body.timeout_height,
        }
    }
}

/// Legacy amino JSON transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdTx {
    pub msg: Vec<Msg>,
    pub fee: Fee,
    pub signatures: Vec<StdSignature>,
    pub memo: String,
    #[serde(
        with = "string_number",
        default,
        skip_serializing_if = "is_zero"
    )]
    pub timeout_height: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdSignature {
    pub pub_key: PublicKey,
    #[serde(with = "base64_bytes")]
    pub signature: Vec<u8>,
}

pub(crate) fn is_zero(value: &u64) -> bool {
    *value == 0
}
