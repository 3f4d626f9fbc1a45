//! Assembler & broadcaster
//!
//! Attaches the aggregated multisignature to the transaction and submits
//! it. Broadcast failures are reported as-is and never retried: the chain
//! may already have accepted a transaction whose response was lost.

use std::sync::Arc;

use crate::chain::{ChainClient, ChainError};
use crate::coordinator::AttemptError;
use crate::core::{LegacyAminoMultisigPublicKey, SignatureData, SignatureEnvelope, Transaction};
use crate::multisig::ThresholdSignatureDescriptor;

/// Result of an accepted broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastOutcome {
    pub txhash: String,
    pub raw_log: String,
}

pub struct Assembler {
    chain: Arc<dyn ChainClient>,
}

impl Assembler {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self { chain }
    }

    /// Append the one composite-key envelope to `tx`
    pub fn assemble(
        mut tx: Transaction,
        composite: &LegacyAminoMultisigPublicKey,
        descriptor: ThresholdSignatureDescriptor,
        sequence: u64,
    ) -> Transaction {
        tx.append_signature(SignatureEnvelope {
            public_key: composite.clone().into(),
            data: SignatureData::Multi(descriptor),
            sequence,
        });
        tx
    }

    /// Validate and submit a signed transaction
    pub async fn broadcast(&self, tx: &Transaction) -> Result<BroadcastOutcome, AttemptError> {
        tx.validate_signatures()?;

        let result = match self.chain.broadcast_sync(&tx.to_std_tx()).await {
            Ok(result) => result,
            Err(ChainError::Status { status, body }) => {
                return Err(AttemptError::BroadcastHttp { status, body })
            }
            Err(e) => return Err(AttemptError::BroadcastFailed(e)),
        };

        if !result.is_success() {
            log::warn!(
                "Broadcast rejected: code {} txhash {} log {}",
                result.code,
                result.txhash,
                result.raw_log
            );
            return Err(AttemptError::Broadcast {
                code: result.code,
                raw_log: result.raw_log,
                txhash: result.txhash,
            });
        }

        log::info!("Broadcast accepted: txhash {}", result.txhash);
        Ok(BroadcastOutcome {
            txhash: result.txhash,
            raw_log: result.raw_log,
        })
    }
}
