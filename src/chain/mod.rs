//! Chain access
//!
//! Account lookup and broadcast behind the [`ChainClient`] trait, with an
//! LCD REST implementation.

pub mod account;
pub mod client;
pub mod lcd;

use thiserror::Error;

use crate::retry::{is_transient_status, Transient};

pub use account::AccountInfo;
pub use client::{BroadcastResult, ChainClient};
pub use lcd::{LcdClient, DEFAULT_LCD_TIMEOUT};

/// Errors talking to the chain
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Account {address} is controlled by a different public key than configured")]
    PublicKeyMismatch { address: String },
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Transient for ChainError {
    fn is_transient(&self) -> bool {
        match self {
            ChainError::Status { status, .. } => is_transient_status(*status),
            ChainError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
