//! Multi-signature aggregation
//!
//! Collects independently produced partial signatures for an M-of-N
//! composite key and turns them into one threshold signature descriptor.
//!
//! # Example
//!
//! ```ignore
//! use multisig_signer::multisig::aggregate;
//!
//! // Arrival order does not matter; slots follow member order
//! let aggregation = aggregate(&composite, vec![remote_sig, hsm_sig])?;
//! let descriptor = aggregation.descriptor;
//! ```

pub mod aggregator;
pub mod descriptor;
pub mod partial;

use thiserror::Error;

pub use aggregator::{aggregate, Aggregation, UnknownSignerWarning};
pub use descriptor::{CompactBitArray, ThresholdSignatureDescriptor};
pub use partial::PartialSignature;

/// Errors related to multisig aggregation
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MultisigError {
    #[error("Duplicate signatures for member index {index}")]
    DuplicateSigner { index: usize },
    #[error("Insufficient signatures: have {have}, need {need}")]
    InsufficientSignatures { have: usize, need: usize },
}
