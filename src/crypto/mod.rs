//! Cryptographic primitives
//!
//! This module provides:
//! - SHA-256 / RIPEMD-160 hashing for sign bytes and addresses
//! - secp256k1 key parsing and signature verification
//! - DER signature and PEM public key decoding for HSM outputs

pub mod der;
pub mod hash;
pub mod keys;

pub use der::{decode_der_signature, parse_public_key_der, parse_public_key_pem, CanonicalSignature};
#[cfg(test)]
pub(crate) use der::encode_public_key_pem;
pub use hash::{hash160, sha256, sha256_truncated, ADDRESS_LEN};
pub use keys::{
    decode_address, encode_address, public_key_from_encoded, public_key_from_slice,
    verify_digest, KeyError, COMPACT_SIGNATURE_LEN, COMPRESSED_KEY_LEN,
};
