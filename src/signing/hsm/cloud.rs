//! Cloud KMS over REST
//!
//! - `GET  {endpoint}/v1/{version}/publicKey`
//! - `POST {endpoint}/v1/{version}:asymmetricSign` with `{"digest": {"sha256": b64}}`
//!
//! Requests carry an OAuth2 bearer token supplied by the caller.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use std::time::Duration;

use crate::retry::is_transient_status;
use crate::signing::hsm::kms::{KeyVersionPath, KmsClient, KmsPublicKey};
use crate::signing::hsm::HsmError;

pub const DEFAULT_KMS_ENDPOINT: &str = "https://cloudkms.googleapis.com";

#[derive(Deserialize)]
struct PublicKeyResponse {
    pem: String,
    algorithm: String,
}

#[derive(Deserialize)]
struct SignResponse {
    signature: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

pub struct CloudKmsClient {
    endpoint: String,
    access_token: String,
    client: reqwest::Client,
}

impl CloudKmsClient {
    pub fn new(
        endpoint: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, HsmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HsmError::Unavailable(e.to_string()))?;
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            client,
        })
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<T, HsmError> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(request_error)?;
        let status = response.status();
        let body = response.text().await.map_err(request_error)?;

        if !status.is_success() {
            return Err(status_error(status.as_u16(), &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| HsmError::InvalidResponse(format!("{}: {}", what, e)))
    }
}

fn request_error(e: reqwest::Error) -> HsmError {
    if e.is_timeout() || e.is_connect() {
        HsmError::Unavailable(e.to_string())
    } else {
        HsmError::InvalidResponse(e.to_string())
    }
}

/// 429 and 5xx are transient; 404, 403, FAILED_PRECONDITION and the rest are key problems
fn status_error(status: u16, body: &str) -> HsmError {
    let detail = match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) if !parsed.error.status.is_empty() => {
            format!("{} {}: {}", status, parsed.error.status, parsed.error.message)
        }
        Ok(parsed) => format!("{}: {}", status, parsed.error.message),
        Err(_) => format!("{}: {}", status, body),
    };

    if is_transient_status(status) {
        HsmError::Unavailable(detail)
    } else {
        HsmError::Key(detail)
    }
}

#[async_trait]
impl KmsClient for CloudKmsClient {
    async fn get_public_key(&self, version: &KeyVersionPath) -> Result<KmsPublicKey, HsmError> {
        let url = format!("{}/v1/{}/publicKey", self.endpoint, version);
        log::debug!("GET {}", url);

        let response: PublicKeyResponse =
            self.read_json(self.client.get(&url), "publicKey").await?;
        Ok(KmsPublicKey {
            pem: response.pem,
            algorithm: response.algorithm,
        })
    }

    async fn asymmetric_sign(
        &self,
        version: &KeyVersionPath,
        digest: &[u8; 32],
    ) -> Result<Vec<u8>, HsmError> {
        let url = format!("{}/v1/{}:asymmetricSign", self.endpoint, version);
        log::debug!("POST {}", url);

        let body = serde_json::json!({ "digest": { "sha256": STANDARD.encode(digest) } });
        let response: SignResponse = self
            .read_json(self.client.post(&url).json(&body), "asymmetricSign")
            .await?;

        STANDARD
            .decode(response.signature.trim())
            .map_err(|e| HsmError::InvalidResponse(format!("signature is not base64: {}", e)))
    }
}
