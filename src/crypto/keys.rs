//! secp256k1 key handling
//!
//! Provides key parsing, bech32 address encoding and signature
//! verification over the secp256k1 curve. Signing happens in the HSM and
//! on the remote service; nothing here holds a private key.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bech32::{FromBase32, ToBase32, Variant};
use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, Secp256k1};
use thiserror::Error;

/// Length of a compressed secp256k1 public key
pub const COMPRESSED_KEY_LEN: usize = 33;

/// Length of a fixed-width `r || s` signature
pub const COMPACT_SIGNATURE_LEN: usize = 64;

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// Parse a compressed or uncompressed public key, returning it compressed
pub fn public_key_from_slice(bytes: &[u8]) -> Result<PublicKey, KeyError> {
    PublicKey::from_slice(bytes).map_err(|e| KeyError::InvalidPublicKey(e.to_string()))
}

/// Parse a public key given as base64 (terra.js convention) or hex
pub fn public_key_from_encoded(encoded: &str) -> Result<PublicKey, KeyError> {
    let trimmed = encoded.trim();
    let is_hex = trimmed.len() == COMPRESSED_KEY_LEN * 2
        && trimmed.chars().all(|c| c.is_ascii_hexdigit());

    let bytes = if is_hex {
        hex::decode(trimmed).map_err(|e| KeyError::InvalidPublicKey(e.to_string()))?
    } else {
        STANDARD
            .decode(trimmed)
            .map_err(|e| KeyError::InvalidPublicKey(e.to_string()))?
    };

    public_key_from_slice(&bytes)
}

/// Verify a fixed-width signature over a 32-byte digest
///
/// High-S signatures are rejected, matching Cosmos-SDK verifiers.
pub fn verify_digest(
    public_key: &PublicKey,
    digest: &[u8; 32],
    signature: &[u8],
) -> Result<bool, KeyError> {
    if signature.len() != COMPACT_SIGNATURE_LEN {
        return Err(KeyError::InvalidSignature(format!(
            "expected {} bytes, got {}",
            COMPACT_SIGNATURE_LEN,
            signature.len()
        )));
    }

    let secp = Secp256k1::verification_only();
    let message = Message::from_digest_slice(digest)?;
    let sig = Signature::from_compact(signature)
        .map_err(|e| KeyError::InvalidSignature(e.to_string()))?;

    Ok(secp.verify_ecdsa(&message, &sig, public_key).is_ok())
}

/// Encode raw address bytes as bech32 with the given prefix
pub fn encode_address(hrp: &str, bytes: &[u8]) -> Result<String, KeyError> {
    bech32::encode(hrp, bytes.to_base32(), Variant::Bech32)
        .map_err(|e| KeyError::InvalidAddress(e.to_string()))
}

/// Decode a bech32 address into its prefix and raw bytes
pub fn decode_address(address: &str) -> Result<(String, Vec<u8>), KeyError> {
    let (hrp, data, variant) =
        bech32::decode(address).map_err(|e| KeyError::InvalidAddress(e.to_string()))?;
    if variant != Variant::Bech32 {
        return Err(KeyError::InvalidAddress(format!(
            "{} is not a bech32 address",
            address
        )));
    }
    let bytes =
        Vec::<u8>::from_base32(&data).map_err(|e| KeyError::InvalidAddress(e.to_string()))?;
    Ok((hrp, bytes))
}
