//! Signer configuration
//!
//! Loaded from a key-info JSON file:
//!
//! ```json
//! {
//!   "stationServerPublickey": "A3...",
//!   "signingServerPublickey": "Ax...",
//!   "signingServerUrl": "https://signer.example/sign",
//!   "gcpInfo": {
//!     "projectId": "p", "locationId": "global", "keyRingId": "r",
//!     "keyId": "k", "versionId": "1"
//!   }
//! }
//! ```
//!
//! Everything else (chain, retry, timeouts) is optional.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::coordinator::CoordinatorSettings;
use crate::core::{
    DecAmount, LegacyAminoMultisigPublicKey, PublicKeyError, SimplePublicKey, TxBuilder,
    DEFAULT_GAS_LIMIT,
};
use crate::chain::DEFAULT_LCD_TIMEOUT;
use crate::retry::RetryPolicy;
use crate::signing::hsm::DEFAULT_KMS_ENDPOINT;
use crate::signing::remote::DEFAULT_REMOTE_TIMEOUT;
use crate::signing::{KeyVersionPath, RequestEnvelope};

/// Default config file name
pub const DEFAULT_CONFIG_FILE: &str = ".key-info.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid composite key: {0}")]
    CompositeKey(#[from] PublicKeyError),
}

/// Chain endpoint and fee parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChainConfig {
    pub lcd_url: String,
    pub chain_id: String,
    /// bech32 prefix for addresses
    pub hrp: String,
    pub gas_limit: u64,
    pub gas_prices: BTreeMap<String, DecAmount>,
    pub timeout_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        let mut gas_prices = BTreeMap::new();
        gas_prices.insert("uluna".to_string(), DecAmount::new(1133, 5));
        Self {
            lcd_url: "https://bombay-lcd.terra.dev".to_string(),
            chain_id: "bombay-12".to_string(),
            hrp: "terra".to_string(),
            gas_limit: DEFAULT_GAS_LIMIT,
            gas_prices,
            timeout_ms: DEFAULT_LCD_TIMEOUT.as_millis() as u64,
        }
    }
}

/// Remote signing service options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SigningServerConfig {
    pub envelope: RequestEnvelope,
    pub timeout_ms: u64,
}

impl Default for SigningServerConfig {
    fn default() -> Self {
        Self {
            envelope: RequestEnvelope::Wrapped,
            timeout_ms: DEFAULT_REMOTE_TIMEOUT.as_millis() as u64,
        }
    }
}

/// Cloud KMS endpoint and credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KmsConfig {
    pub endpoint: String,
    /// OAuth2 access token; falls back to `GCP_ACCESS_TOKEN` when absent
    pub access_token: Option<String>,
    pub timeout_ms: u64,
}

impl Default for KmsConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_KMS_ENDPOINT.to_string(),
            access_token: None,
            timeout_ms: 10_000,
        }
    }
}

/// Full signer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignerConfig {
    /// HSM member key, position 0 in the composite key
    pub station_server_publickey: SimplePublicKey,
    /// Remote signer member key, position 1
    pub signing_server_publickey: SimplePublicKey,
    pub signing_server_url: String,
    pub gcp_info: KeyVersionPath,
    #[serde(default = "default_threshold")]
    pub threshold: u32,
    #[serde(default)]
    pub signing_server: SigningServerConfig,
    #[serde(default)]
    pub kms: KmsConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default = "default_signing_timeout_ms")]
    pub signing_timeout_ms: u64,
    #[serde(default = "default_max_stale_restarts")]
    pub max_stale_restarts: u32,
    #[serde(default = "default_verify_signatures")]
    pub verify_signatures: bool,
}

fn default_threshold() -> u32 {
    2
}

fn default_signing_timeout_ms() -> u64 {
    30_000
}

fn default_max_stale_restarts() -> u32 {
    2
}

fn default_verify_signatures() -> bool {
    true
}

impl SignerConfig {
    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path.as_ref())?;
        let config: SignerConfig = serde_json::from_str(&data)?;
        log::debug!("Loaded signer config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Composite key with members `[station, signing server]`
    pub fn composite_key(&self) -> Result<LegacyAminoMultisigPublicKey, ConfigError> {
        Ok(LegacyAminoMultisigPublicKey::new(
            self.threshold,
            vec![self.station_server_publickey, self.signing_server_publickey],
        )?)
    }

    pub fn tx_builder(&self) -> TxBuilder {
        self.chain
            .gas_prices
            .iter()
            .fold(
                TxBuilder::new(self.chain.chain_id.clone()).gas_limit(self.chain.gas_limit),
                |builder, (denom, price)| builder.gas_price(denom.clone(), *price),
            )
    }

    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            signing_timeout: Duration::from_millis(self.signing_timeout_ms),
            retry: self.retry,
            max_stale_restarts: self.max_stale_restarts,
            verify_signatures: self.verify_signatures,
        }
    }
}
