//! Test helpers: in-process HTTP servers standing in for the remote signer,
//! Cloud KMS and the LCD, an in-memory chain, and local signing keys.

use async_trait::async_trait;
use axum::Router;
use rand::rngs::OsRng;
use secp256k1::constants::CURVE_ORDER;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use tokio::net::TcpListener;

use crate::chain::{AccountInfo, BroadcastResult, ChainClient, ChainError};
use crate::core::StdTx;
use crate::crypto::{KeyError, COMPACT_SIGNATURE_LEN};

/// Serve `router` on an ephemeral local port and return its base URL
pub(crate) async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

// =============================================================================
// Local keys
// =============================================================================

/// A secp256k1 key pair standing in for a cosigner's private key
#[derive(Clone)]
pub(crate) struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    pub fn from_private_key_hex(hex_key: &str) -> Self {
        let secret_key = SecretKey::from_slice(&hex::decode(hex_key).unwrap()).unwrap();
        let public_key = PublicKey::from_secret_key(&Secp256k1::signing_only(), &secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Sign a 32-byte digest, returning the low-S `r || s` form
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<[u8; COMPACT_SIGNATURE_LEN], KeyError> {
        let secp = Secp256k1::signing_only();
        let message = Message::from_digest_slice(digest)?;
        Ok(secp.sign_ecdsa(&message, &self.secret_key).serialize_compact())
    }
}

/// Replace `s` of a compact signature with `n - s`
pub(crate) fn negate_s(compact: &[u8; COMPACT_SIGNATURE_LEN]) -> [u8; COMPACT_SIGNATURE_LEN] {
    let mut out = *compact;
    let mut borrow = 0i16;
    for i in (0..32).rev() {
        let mut diff = CURVE_ORDER[i] as i16 - compact[32 + i] as i16 - borrow;
        if diff < 0 {
            diff += 256;
            borrow = 1;
        } else {
            borrow = 0;
        }
        out[32 + i] = diff as u8;
    }
    out
}

// =============================================================================
// Chain
// =============================================================================

/// Chain with a scripted account sequence and a recorded broadcast log
pub(crate) struct MockChain {
    /// Returned by successive lookups; the last entry repeats
    accounts: Mutex<Vec<AccountInfo>>,
    pub account_calls: AtomicU32,
    pub broadcasts: Mutex<Vec<StdTx>>,
    pub broadcast_result: BroadcastResult,
    /// When set, broadcasts fail with this HTTP status and body
    pub broadcast_status: Option<(u16, String)>,
}

impl MockChain {
    pub fn new(accounts: Vec<AccountInfo>) -> Self {
        Self {
            accounts: Mutex::new(accounts),
            account_calls: AtomicU32::new(0),
            broadcasts: Mutex::new(Vec::new()),
            broadcast_result: BroadcastResult {
                txhash: "A1B2C3".to_string(),
                code: 0,
                raw_log: "[]".to_string(),
            },
            broadcast_status: None,
        }
    }

    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.lock().unwrap().len()
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn account_info(&self, address: &str) -> Result<AccountInfo, ChainError> {
        self.account_calls.fetch_add(1, Ordering::SeqCst);
        let mut accounts = self.accounts.lock().unwrap();
        let account = if accounts.len() > 1 {
            accounts.remove(0)
        } else {
            accounts
                .first()
                .cloned()
                .ok_or_else(|| ChainError::AccountNotFound(address.to_string()))?
        };
        Ok(account)
    }

    async fn broadcast_sync(&self, tx: &StdTx) -> Result<BroadcastResult, ChainError> {
        self.broadcasts.lock().unwrap().push(tx.clone());
        if let Some((status, body)) = &self.broadcast_status {
            return Err(ChainError::Status {
                status: *status,
                body: body.clone(),
            });
        }
        Ok(self.broadcast_result.clone())
    }
}
