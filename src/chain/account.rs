//! Account snapshots

use crate::core::{PublicKey, SignerData};

/// On-chain account state at the time of the lookup
///
/// Fetched fresh for every signing attempt; never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub address: String,
    pub account_number: u64,
    pub sequence: u64,
    /// None until the account has signed its first transaction
    pub public_key: Option<PublicKey>,
}

impl AccountInfo {
    /// Signer metadata for the builder, using `fallback` when the chain
    /// has not recorded a key yet
    pub fn signer_data(&self, fallback: &PublicKey) -> SignerData {
        SignerData {
            address: self.address.clone(),
            sequence: self.sequence,
            public_key: Some(self.public_key.clone().unwrap_or_else(|| fallback.clone())),
        }
    }

    /// Whether the chain's recorded key (if any) is `key`
    pub fn key_matches(&self, key: &PublicKey) -> bool {
        self.public_key.as_ref().map_or(true, |on_chain| on_chain == key)
    }
}
