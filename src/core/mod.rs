//! Core transaction components
//!
//! This module contains the fundamental building blocks:
//! - Public keys (simple secp256k1 and legacy amino threshold keys)
//! - Amino binary messages for threshold keys and multisignatures
//! - Coins and decimal gas prices
//! - Transactions, signature envelopes and the amino `StdTx` form
//! - The canonical sign document
//! - The unsigned transaction builder

pub mod amino;
pub mod builder;
pub mod codec;
pub mod coins;
pub mod pubkey;
pub mod sign_doc;
pub mod transaction;
pub mod transfer;

pub use builder::{CreateTxOptions, SignerData, TxBuilder, DEFAULT_GAS_LIMIT};
pub use coins::{Coin, CoinError, Coins, DecAmount};
pub use pubkey::{
    AminoPubKeyJson, LegacyAminoMultisigPublicKey, PublicKey, PublicKeyError, SimplePublicKey,
};
pub use sign_doc::SignDoc;
pub use transaction::{
    AuthInfo, Fee, Msg, MsgSend, SignMode, SignatureData, SignatureEnvelope, SignerInfo, StdSignature,
    StdTx, Transaction, TransactionError, TxBody,
};
pub use transfer::{Transfer, TransferPayload};
