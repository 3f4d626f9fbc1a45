//! Partial signers
//!
//! Each cosigner leg implements [`PartialSigner`]:
//! - [`RemoteSignatureClient`] asks a remote signing service over HTTP
//! - [`HsmSignatureAdapter`] signs with a managed KMS key

pub mod hsm;
pub mod remote;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::{SignDoc, TransactionError, Transfer};
use crate::multisig::PartialSignature;
use crate::retry::Transient;

pub use hsm::{
    CloudKmsClient, HsmError, HsmSignatureAdapter, KeyVersionPath, KmsClient, KmsPublicKey,
};
pub use remote::{RemoteSignatureClient, RemoteSigningError, RequestEnvelope};

/// Everything a leg may need to produce its signature
///
/// The remote service rebuilds the transaction from the transfer; the HSM
/// signs the sign document directly.
#[derive(Debug, Clone)]
pub struct SigningRequest {
    pub transfer: Transfer,
    pub sign_doc: SignDoc,
}

impl SigningRequest {
    /// Sequence every leg is expected to sign against
    pub fn sequence(&self) -> u64 {
        self.sign_doc.sequence
    }
}

/// Errors from any signing leg
#[derive(Error, Debug)]
pub enum SignerError {
    #[error("Remote signing error: {0}")]
    Remote(#[from] RemoteSigningError),
    #[error("HSM error: {0}")]
    Hsm(#[from] HsmError),
    #[error("Sign document error: {0}")]
    SignDoc(#[from] TransactionError),
}

impl Transient for SignerError {
    fn is_transient(&self) -> bool {
        match self {
            SignerError::Remote(e) => e.is_transient(),
            SignerError::Hsm(e) => e.is_transient(),
            SignerError::SignDoc(_) => false,
        }
    }
}

/// One cosigner of the composite key
#[async_trait]
pub trait PartialSigner: Send + Sync {
    /// Short label used in logs and errors
    fn name(&self) -> &str;

    async fn sign(&self, request: &SigningRequest) -> Result<PartialSignature, SignerError>;
}
