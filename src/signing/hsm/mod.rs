//! HSM signing through a managed key service
//!
//! [`KmsClient`] is the narrow interface to the key service,
//! [`CloudKmsClient`] speaks the Cloud KMS REST API, and
//! [`HsmSignatureAdapter`] turns its DER output into chain-ready signatures.

pub mod adapter;
pub mod cloud;
pub mod kms;

use thiserror::Error;

use crate::retry::Transient;

pub use adapter::HsmSignatureAdapter;
pub use cloud::{CloudKmsClient, DEFAULT_KMS_ENDPOINT};
pub use kms::{KeyVersionPath, KmsClient, KmsPublicKey, EC_SIGN_SECP256K1_SHA256};

/// HSM errors
#[derive(Error, Debug)]
pub enum HsmError {
    /// Throttling, outages, network failures; worth retrying
    #[error("HSM unavailable: {0}")]
    Unavailable(String),
    /// The key version is missing, disabled, inaccessible or of the wrong kind
    #[error("HSM key error: {0}")]
    Key(String),
    #[error("Invalid HSM response: {0}")]
    InvalidResponse(String),
}

impl Transient for HsmError {
    fn is_transient(&self) -> bool {
        matches!(self, HsmError::Unavailable(_))
    }
}
