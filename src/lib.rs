//! Multisig Signer: M-of-N threshold transfers for Terra (legacy amino)
//!
//! Assembles a transfer signed by a 2-of-2 composite key whose members are
//! held by a remote signing service and a Cloud KMS HSM key:
//! - Unsigned transaction and amino JSON sign document from a fresh account snapshot
//! - Concurrent partial signatures with per-leg retry and a shared timeout
//! - DER to low-S compact signature conversion for KMS output
//! - Threshold descriptor in member order, independent of arrival order
//! - Single-envelope assembly and sync broadcast through the LCD
//!
//! # Example
//!
//! ```rust,no_run
//! use multisig_signer::config::SignerConfig;
//! use multisig_signer::core::Transfer;
//!
//! # async fn run(coordinator: multisig_signer::coordinator::SigningCoordinator) -> Result<(), Box<dyn std::error::Error>> {
//! let config = SignerConfig::load(".key-info.json")?;
//! let composite = config.composite_key()?;
//! println!("Sending from {}", composite.address(&config.chain.hrp)?);
//!
//! let transfer = Transfer::new("terra1...", "1000uluna".parse()?, "memo");
//! let outcome = coordinator.send(&transfer).await?;
//! println!("txhash {}", outcome.txhash);
//! # Ok(())
//! # }
//! ```

pub mod chain;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod core;
pub mod crypto;
pub mod multisig;
pub mod retry;
pub mod signing;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use chain::{AccountInfo, BroadcastResult, ChainClient, ChainError, LcdClient};
pub use config::{ConfigError, SignerConfig};
pub use coordinator::{
    Assembler, AttemptError, BroadcastOutcome, CoordinatorSettings, SignedTransfer,
    SigningCoordinator,
};
pub use core::{
    Coins, LegacyAminoMultisigPublicKey, PublicKey, SignDoc, SimplePublicKey, Transaction,
    Transfer, TxBuilder,
};
pub use multisig::{aggregate, MultisigError, PartialSignature, ThresholdSignatureDescriptor};
pub use retry::RetryPolicy;
pub use signing::{
    CloudKmsClient, HsmSignatureAdapter, PartialSigner, RemoteSignatureClient, SignerError,
};
