//! Canonical sign document
//!
//! Every cosigner signs SHA-256 over the same amino JSON bytes. Any field
//! that differs between signers (chain id, sequence, fee, memo) yields a
//! signature the chain will not accept.

use serde::Serialize;

use crate::core::codec::{canonical_json, string_number};
use crate::core::transaction::{is_zero, AuthInfo, Fee, Msg, TransactionError, TxBody};
use crate::crypto::sha256;

/// The document every signer of a transaction signs over
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignDoc {
    pub chain_id: String,
    pub account_number: u64,
    pub sequence: u64,
    pub auth_info: AuthInfo,
    pub tx_body: TxBody,
}

/// Amino `StdSignDoc`; field order does not matter, keys are sorted on output
#[derive(Serialize)]
struct StdSignDoc<'a> {
    #[serde(with = "string_number")]
    account_number: u64,
    chain_id: &'a str,
    fee: &'a Fee,
    memo: &'a str,
    msgs: &'a [Msg],
    #[serde(with = "string_number")]
    sequence: u64,
    #[serde(with = "string_number", skip_serializing_if = "is_zero")]
    timeout_height: u64,
}

impl SignDoc {
    pub fn new(
        chain_id: impl Into<String>,
        account_number: u64,
        sequence: u64,
        auth_info: AuthInfo,
        tx_body: TxBody,
    ) -> Self {
        Self {
            chain_id: chain_id.into(),
            account_number,
            sequence,
            auth_info,
            tx_body,
        }
    }

    /// Canonical amino JSON bytes
    pub fn sign_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        let doc = StdSignDoc {
            account_number: self.account_number,
            chain_id: &self.chain_id,
            fee: &self.auth_info.fee,
            memo: &self.tx_body.memo,
            msgs: &self.tx_body.messages,
            sequence: self.sequence,
            timeout_height: self.tx_body.timeout_height,
        };
        Ok(canonical_json(&doc)?)
    }

    /// SHA-256 of the sign bytes; this is what ECDSA signs
    pub fn digest(&self) -> Result<[u8; 32], TransactionError> {
        Ok(sha256(&self.sign_bytes()?))
    }
}
