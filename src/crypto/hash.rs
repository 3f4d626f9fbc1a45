//! Hashing helpers used for sign bytes and address derivation
//!
//! Cosmos-SDK chains sign SHA-256 digests and derive account addresses
//! from RIPEMD160(SHA256(pubkey)) for simple keys and from a truncated
//! SHA-256 for composite keys.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Length of an account address in bytes
pub const ADDRESS_LEN: usize = 20;

/// Computes the SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// RIPEMD160(SHA256(data)), the address hash for secp256k1 keys
pub fn hash160(data: &[u8]) -> [u8; ADDRESS_LEN] {
    let mut ripemd = Ripemd160::new();
    ripemd.update(sha256(data));
    ripemd.finalize().into()
}

/// SHA-256 truncated to address length (tendermint `tmhash.SumTruncated`)
pub fn sha256_truncated(data: &[u8]) -> [u8; ADDRESS_LEN] {
    let full = sha256(data);
    let mut out = [0u8; ADDRESS_LEN];
    out.copy_from_slice(&full[..ADDRESS_LEN]);
    out
}
