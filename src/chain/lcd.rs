//! LCD (REST) chain client
//!
//! - account lookup: `GET /cosmos/auth/v1beta1/accounts/{address}`
//! - broadcast: `POST /txs` with a legacy amino `StdTx` in sync mode

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::chain::account::AccountInfo;
use crate::chain::client::{BroadcastResult, ChainClient};
use crate::chain::ChainError;
use crate::core::codec::string_number;
use crate::core::{LegacyAminoMultisigPublicKey, PublicKey, SimplePublicKey, StdTx};

/// gRPC `NOT_FOUND`, returned by older LCDs with HTTP 500
const GRPC_NOT_FOUND: u32 = 5;

/// Default request timeout
pub const DEFAULT_LCD_TIMEOUT: Duration = Duration::from_secs(10);

pub struct LcdClient {
    base_url: String,
    client: reqwest::Client,
}

impl LcdClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ChainError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Deserialize)]
struct AccountResponse {
    account: RawAccount,
}

#[derive(Deserialize)]
struct RawAccount {
    #[serde(default)]
    address: String,
    #[serde(default)]
    pub_key: Option<ProtoPubKey>,
    #[serde(default, with = "string_number")]
    account_number: u64,
    #[serde(default, with = "string_number")]
    sequence: u64,
    /// Vesting accounts nest the base account
    #[serde(default)]
    base_account: Option<Box<RawAccount>>,
    #[serde(default)]
    base_vesting_account: Option<Box<RawAccount>>,
}

impl RawAccount {
    fn into_base(self) -> RawAccount {
        match (self.base_account, self.base_vesting_account) {
            (Some(base), _) => base.into_base(),
            (None, Some(vesting)) => vesting.into_base(),
            (None, None) => RawAccount {
                base_account: None,
                base_vesting_account: None,
                ..self
            },
        }
    }
}

/// Public keys in protobuf JSON (`@type` tagged)
#[derive(Deserialize)]
#[serde(tag = "@type")]
enum ProtoPubKey {
    #[serde(rename = "/cosmos.crypto.secp256k1.PubKey")]
    Secp256k1 { key: String },
    #[serde(rename = "/cosmos.crypto.multisig.LegacyAminoPubKey")]
    LegacyAmino {
        #[serde(with = "string_number")]
        threshold: u32,
        public_keys: Vec<ProtoPubKey>,
    },
}

impl ProtoPubKey {
    fn into_public_key(self) -> Result<PublicKey, ChainError> {
        match self {
            ProtoPubKey::Secp256k1 { key } => Ok(SimplePublicKey::from_encoded(&key)
                .map_err(|e| ChainError::InvalidResponse(e.to_string()))?
                .into()),
            ProtoPubKey::LegacyAmino {
                threshold,
                public_keys,
            } => {
                let members = public_keys
                    .into_iter()
                    .map(|member| match member.into_public_key()? {
                        PublicKey::Simple(simple) => Ok(simple),
                        PublicKey::Multisig(_) => Err(ChainError::InvalidResponse(
                            "nested multisig public key".to_string(),
                        )),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let composite = LegacyAminoMultisigPublicKey::new(threshold, members)
                    .map_err(|e| ChainError::InvalidResponse(e.to_string()))?;
                Ok(composite.into())
            }
        }
    }
}

#[derive(Deserialize)]
struct GrpcStatus {
    #[serde(default)]
    code: u32,
}

#[derive(Serialize)]
struct BroadcastRequest<'a> {
    tx: &'a StdTx,
    mode: &'static str,
}

// =============================================================================
// ChainClient
// =============================================================================

#[async_trait]
impl ChainClient for LcdClient {
    async fn account_info(&self, address: &str) -> Result<AccountInfo, ChainError> {
        let url = format!("{}/cosmos/auth/v1beta1/accounts/{}", self.base_url, address);
        log::debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let not_found = status == reqwest::StatusCode::NOT_FOUND
                || serde_json::from_str::<GrpcStatus>(&body)
                    .map(|s| s.code == GRPC_NOT_FOUND)
                    .unwrap_or(false);
            if not_found {
                return Err(ChainError::AccountNotFound(address.to_string()));
            }
            return Err(ChainError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: AccountResponse = serde_json::from_str(&body)
            .map_err(|e| ChainError::InvalidResponse(format!("account response: {}", e)))?;
        let account = parsed.account.into_base();
        let public_key = account
            .pub_key
            .map(ProtoPubKey::into_public_key)
            .transpose()?;

        Ok(AccountInfo {
            address: if account.address.is_empty() {
                address.to_string()
            } else {
                account.address
            },
            account_number: account.account_number,
            sequence: account.sequence,
            public_key,
        })
    }

    async fn broadcast_sync(&self, tx: &StdTx) -> Result<BroadcastResult, ChainError> {
        let url = format!("{}/txs", self.base_url);
        log::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(&BroadcastRequest { tx, mode: "sync" })
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ChainError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| ChainError::InvalidResponse(format!("broadcast response: {}", e)))
    }
}
