//! CLI commands for the multisig signer
//!
//! Implements the command handlers for the `multisig` binary.

use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::chain::{ChainClient, LcdClient};
use crate::config::SignerConfig;
use crate::coordinator::{CoordinatorSettings, SigningCoordinator};
use crate::core::{Coins, LegacyAminoMultisigPublicKey, Transfer};
use crate::crypto::decode_address;
use crate::signing::{
    CloudKmsClient, HsmSignatureAdapter, PartialSigner, RemoteSignatureClient,
};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Environment variable consulted when the config carries no KMS token
pub const ACCESS_TOKEN_ENV: &str = "GCP_ACCESS_TOKEN";

/// Application state
pub struct AppState {
    pub config: SignerConfig,
    pub composite: LegacyAminoMultisigPublicKey,
    pub address: String,
}

impl AppState {
    /// Load the config and derive the composite key
    pub fn new(config_path: &Path) -> CliResult<Self> {
        let config = SignerConfig::load(config_path)?;
        let composite = config.composite_key()?;
        let address = composite.address(&config.chain.hrp)?;
        Ok(Self {
            config,
            composite,
            address,
        })
    }

    /// Wire the LCD client, both signing legs and the coordinator
    pub fn coordinator(&self) -> CliResult<SigningCoordinator> {
        let config = &self.config;

        let chain: Arc<dyn ChainClient> = Arc::new(LcdClient::new(
            config.chain.lcd_url.clone(),
            Duration::from_millis(config.chain.timeout_ms),
        )?);

        let access_token = match &config.kms.access_token {
            Some(token) => token.clone(),
            None => env::var(ACCESS_TOKEN_ENV).map_err(|_| {
                format!("no KMS access token in config and {} is not set", ACCESS_TOKEN_ENV)
            })?,
        };
        let kms = CloudKmsClient::new(
            config.kms.endpoint.clone(),
            access_token,
            Duration::from_millis(config.kms.timeout_ms),
        )?;
        let hsm = HsmSignatureAdapter::new(Arc::new(kms), config.gcp_info.clone())
            .with_expected_key(config.station_server_publickey);

        let remote = RemoteSignatureClient::new(
            config.signing_server_url.clone(),
            config.signing_server_publickey,
            config.signing_server.envelope,
            Duration::from_millis(config.signing_server.timeout_ms),
        )?;

        let signers: Vec<Arc<dyn PartialSigner>> = vec![Arc::new(hsm), Arc::new(remote)];
        let settings: CoordinatorSettings = config.coordinator_settings();

        Ok(SigningCoordinator::new(
            chain,
            config.tx_builder(),
            self.composite.clone(),
            &config.chain.hrp,
            signers,
            settings,
        )?)
    }
}

/// Print the composite key and its address
pub fn cmd_address(state: &AppState) -> CliResult<()> {
    println!("🔐 Composite key ({})", state.composite.description());
    for (index, member) in state.composite.members().iter().enumerate() {
        println!("   ├─ [{}] {}", index, member);
    }
    println!("   └─ Address: {}", state.address);
    Ok(())
}

/// Sign a transfer and broadcast it, or print it when `dry_run` is set
pub async fn cmd_send(
    state: &AppState,
    to: &str,
    amount: &str,
    memo: &str,
    dry_run: bool,
) -> CliResult<()> {
    let (hrp, _) = decode_address(to)?;
    if hrp != state.config.chain.hrp {
        return Err(format!(
            "recipient {} is not a {} address",
            to, state.config.chain.hrp
        )
        .into());
    }

    let amount: Coins = amount.parse()?;

    let transfer = Transfer::new(to, amount.clone(), memo);
    let coordinator = state.coordinator()?;

    println!("📤 Transfer:");
    println!("   ├─ From: {}", state.address);
    println!("   ├─ To: {}", to);
    println!("   ├─ Amount: {}", amount);
    println!("   └─ Memo: {}", memo);

    if dry_run {
        let signed = coordinator.sign(&transfer).await?;
        for warning in &signed.warnings {
            println!("⚠️  {}", warning);
        }
        println!(
            "\n🧾 Signed at account {} sequence {}:",
            signed.account.account_number, signed.account.sequence
        );
        println!("{}", serde_json::to_string_pretty(&signed.std_tx())?);
        return Ok(());
    }

    let outcome = coordinator.send(&transfer).await?;
    println!("\n✅ Broadcast accepted");
    println!("   └─ txhash: {}", outcome.txhash);
    Ok(())
}
