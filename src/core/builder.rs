//! Unsigned transaction builder
//!
//! Turns messages, memo and signer metadata into an unsigned
//! [`Transaction`] with a computed fee, and derives the [`SignDoc`] that
//! cosigners sign.

use std::collections::BTreeMap;

use crate::core::coins::{Coins, DecAmount};
use crate::core::pubkey::PublicKey;
use crate::core::sign_doc::SignDoc;
use crate::core::transaction::{
    AuthInfo, Fee, Msg, SignMode, SignerInfo, Transaction, TransactionError, TxBody,
};
use crate::core::transfer::Transfer;

/// Default gas limit for a single bank send
pub const DEFAULT_GAS_LIMIT: u64 = 200_000;

/// Signer metadata for one signer slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerData {
    pub address: String,
    pub sequence: u64,
    pub public_key: Option<PublicKey>,
}

/// Options for [`TxBuilder::create`]
#[derive(Debug, Clone, Default)]
pub struct CreateTxOptions {
    pub messages: Vec<Msg>,
    pub memo: String,
    /// Explicit fee; estimated from gas settings when absent
    pub fee: Option<Fee>,
    pub timeout_height: u64,
}

/// Builds unsigned transactions for one chain
#[derive(Debug, Clone)]
pub struct TxBuilder {
    chain_id: String,
    gas_limit: u64,
    gas_prices: BTreeMap<String, DecAmount>,
}

impl TxBuilder {
    pub fn new(chain_id: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            gas_limit: DEFAULT_GAS_LIMIT,
            gas_prices: BTreeMap::new(),
        }
    }

    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    pub fn gas_price(mut self, denom: impl Into<String>, price: DecAmount) -> Self {
        self.gas_prices.insert(denom.into(), price);
        self
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// `ceil(gas_limit * price)` for every configured gas-price denom
    pub fn estimate_fee(&self) -> Fee {
        let mut amount = Coins::new();
        for (denom, price) in &self.gas_prices {
            amount.add(denom.clone(), price.mul_ceil(self.gas_limit));
        }
        Fee {
            amount,
            gas: self.gas_limit,
        }
    }

    /// Compose an unsigned transaction with one signer slot per signer
    pub fn create(
        &self,
        signers: &[SignerData],
        options: CreateTxOptions,
    ) -> Result<Transaction, TransactionError> {
        if options.messages.is_empty() {
            return Err(TransactionError::NoMessages);
        }

        let signer_infos = signers
            .iter()
            .map(|signer| {
                let public_key = signer
                    .public_key
                    .clone()
                    .ok_or_else(|| TransactionError::MissingPublicKey(signer.address.clone()))?;
                Ok(SignerInfo {
                    public_key,
                    sequence: signer.sequence,
                    mode: SignMode::LegacyAminoJson,
                })
            })
            .collect::<Result<Vec<_>, TransactionError>>()?;

        let fee = options.fee.unwrap_or_else(|| self.estimate_fee());

        log::debug!(
            "Built unsigned tx: {} message(s), {} signer slot(s), fee {} gas {}",
            options.messages.len(),
            signer_infos.len(),
            fee.amount,
            fee.gas
        );

        Ok(Transaction::new(
            TxBody {
                messages: options.messages,
                memo: options.memo,
                timeout_height: options.timeout_height,
            },
            AuthInfo { signer_infos, fee },
        ))
    }

    /// Unsigned transaction sending `transfer` from the signer's address
    pub fn create_transfer(
        &self,
        signer: &SignerData,
        transfer: &Transfer,
    ) -> Result<Transaction, TransactionError> {
        self.create(
            std::slice::from_ref(signer),
            CreateTxOptions {
                messages: vec![transfer.to_msg(&signer.address)],
                memo: transfer.memo.clone(),
                ..Default::default()
            },
        )
    }

    /// The sign document for `tx` at the given account number and sequence
    pub fn sign_doc(&self, tx: &Transaction, account_number: u64, sequence: u64) -> SignDoc {
        SignDoc::new(
            self.chain_id.clone(),
            account_number,
            sequence,
            tx.auth_info.clone(),
            tx.body.clone(),
        )
    }
}
