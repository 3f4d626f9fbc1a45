//! Remote signature client
//!
//! POSTs the transfer to the signing service and parses the single
//! signature it returns. The service builds and signs the transaction on
//! its own side, so the response carries the sequence it signed against;
//! that sequence must match ours.
//!
//! There is no idempotency key: retrying after a timeout may make the
//! service sign twice. Signing alone moves no funds.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::core::codec::string_number;
use crate::core::{SignMode, SimplePublicKey, Transfer};
use crate::crypto::COMPACT_SIGNATURE_LEN;
use crate::multisig::PartialSignature;
use crate::retry::{is_transient_status, Transient};
use crate::signing::{PartialSigner, SignerError, SigningRequest};

/// Default request timeout
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from the remote signing service
#[derive(Error, Debug)]
pub enum RemoteSigningError {
    #[error("Signing service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed signing response: {0}")]
    MalformedResponse(String),
    #[error("Signing service signed sequence {observed}, expected {expected}")]
    StaleSequence { expected: u64, observed: u64 },
    #[error("Request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Transient for RemoteSigningError {
    fn is_transient(&self) -> bool {
        match self {
            RemoteSigningError::Status { status, .. } => is_transient_status(*status),
            RemoteSigningError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// How the transfer payload is wrapped in the request body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestEnvelope {
    /// `{"json": "<payload serialized to a string>"}`
    #[default]
    Wrapped,
    /// The payload object itself
    Plain,
}

#[derive(Deserialize)]
struct SignResponse {
    #[serde(with = "string_number")]
    sequence: u64,
    data: SignResponseData,
}

#[derive(Deserialize)]
struct SignResponseData {
    single: SingleSignature,
}

#[derive(Deserialize)]
struct SingleSignature {
    mode: SignMode,
    signature: String,
}

/// Client for the remote cosigner
pub struct RemoteSignatureClient {
    url: String,
    signer_key: SimplePublicKey,
    envelope: RequestEnvelope,
    client: reqwest::Client,
}

impl RemoteSignatureClient {
    /// `signer_key` is the service's member key in the composite key
    pub fn new(
        url: impl Into<String>,
        signer_key: SimplePublicKey,
        envelope: RequestEnvelope,
        timeout: Duration,
    ) -> Result<Self, RemoteSigningError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            signer_key,
            envelope,
            client,
        })
    }

    pub fn signer_key(&self) -> &SimplePublicKey {
        &self.signer_key
    }

    fn request_body(&self, transfer: &Transfer) -> Result<serde_json::Value, RemoteSigningError> {
        let payload = serde_json::to_value(transfer.payload())
            .map_err(|e| RemoteSigningError::MalformedResponse(e.to_string()))?;
        Ok(match self.envelope {
            RequestEnvelope::Plain => payload,
            RequestEnvelope::Wrapped => serde_json::json!({ "json": payload.to_string() }),
        })
    }

    /// Ask the service to sign `transfer`, expecting it to sign at `expected_sequence`
    pub async fn request_signature(
        &self,
        transfer: &Transfer,
        expected_sequence: u64,
    ) -> Result<PartialSignature, RemoteSigningError> {
        let body = self.request_body(transfer)?;
        log::debug!("Requesting remote signature from {}", self.url);

        let response = self.client.post(&self.url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(RemoteSigningError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: SignResponse = serde_json::from_str(&text)
            .map_err(|e| RemoteSigningError::MalformedResponse(e.to_string()))?;

        if parsed.sequence != expected_sequence {
            return Err(RemoteSigningError::StaleSequence {
                expected: expected_sequence,
                observed: parsed.sequence,
            });
        }

        let signature = decode_signature(&parsed.data.single.signature)?;
        log::info!(
            "Remote signature received (mode {}, sequence {})",
            parsed.data.single.mode,
            parsed.sequence
        );

        Ok(PartialSignature::new(
            self.signer_key,
            parsed.data.single.mode,
            signature,
            parsed.sequence,
        ))
    }
}

/// Accepts 128 hex characters or base64
fn decode_signature(encoded: &str) -> Result<[u8; COMPACT_SIGNATURE_LEN], RemoteSigningError> {
    let trimmed = encoded.trim();
    let is_hex = trimmed.len() == COMPACT_SIGNATURE_LEN * 2
        && trimmed.chars().all(|c| c.is_ascii_hexdigit());

    let bytes = if is_hex {
        hex::decode(trimmed).map_err(|e| RemoteSigningError::MalformedResponse(e.to_string()))?
    } else {
        STANDARD
            .decode(trimmed)
            .map_err(|e| RemoteSigningError::MalformedResponse(e.to_string()))?
    };

    let len = bytes.len();
    bytes.try_into().map_err(|_| {
        RemoteSigningError::MalformedResponse(format!(
            "signature must be {} bytes, got {}",
            COMPACT_SIGNATURE_LEN, len
        ))
    })
}

#[async_trait]
impl PartialSigner for RemoteSignatureClient {
    fn name(&self) -> &str {
        "remote-signer"
    }

    async fn sign(&self, request: &SigningRequest) -> Result<PartialSignature, SignerError> {
        Ok(self
            .request_signature(&request.transfer, request.sequence())
            .await?)
    }
}
