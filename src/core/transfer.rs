//! Transfer requests
//!
//! The logical content of a send: who receives, how much, and the memo.
//! The same content drives the on-chain message and the payload sent to the
//! remote signer, which rebuilds the transaction on its side.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::coins::Coins;
use crate::core::transaction::{Msg, MsgSend};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub receiver_address: String,
    pub amount: Coins,
    pub memo: String,
}

/// Wire shape of a transfer for the remote signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferPayload {
    pub receiver_address: String,
    pub amount: BTreeMap<String, u128>,
    pub memo: String,
}

impl Transfer {
    pub fn new(receiver_address: impl Into<String>, amount: Coins, memo: impl Into<String>) -> Self {
        Self {
            receiver_address: receiver_address.into(),
            amount,
            memo: memo.into(),
        }
    }

    /// The bank send message moving `amount` out of `from_address`
    pub fn to_msg(&self, from_address: &str) -> Msg {
        Msg::Send(MsgSend {
            from_address: from_address.to_string(),
            to_address: self.receiver_address.clone(),
            amount: self.amount.clone(),
        })
    }

    pub fn payload(&self) -> TransferPayload {
        TransferPayload {
            receiver_address: self.receiver_address.clone(),
            amount: self.amount.as_map().clone(),
            memo: self.memo.clone(),
        }
    }
}

impl From<TransferPayload> for Transfer {
    fn from(payload: TransferPayload) -> Self {
        Self {
            receiver_address: payload.receiver_address,
            amount: payload.amount.into(),
            memo: payload.memo,
        }
    }
}
