//! Chain collaborator interface

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chain::account::AccountInfo;
use crate::chain::ChainError;
use crate::core::StdTx;

/// Outcome of a synchronous broadcast (mempool admission, not inclusion)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastResult {
    pub txhash: String,
    /// 0 on success
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub raw_log: String,
}

impl BroadcastResult {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// Account lookup and transaction submission
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Current account number, sequence and recorded key for `address`
    async fn account_info(&self, address: &str) -> Result<AccountInfo, ChainError>;

    /// Submit a signed transaction and wait for mempool admission
    async fn broadcast_sync(&self, tx: &StdTx) -> Result<BroadcastResult, ChainError>;
}
