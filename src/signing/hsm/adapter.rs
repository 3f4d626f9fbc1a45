//! HSM signature adapter
//!
//! Signs sign documents with a KMS key version and returns chain-ready
//! partial signatures:
//! 1. digest = SHA-256(sign bytes)
//! 2. KMS returns DER `SEQUENCE { r, s }`
//! 3. decode to fixed-width `r || s`, normalize `s` to low-S
//! 4. verify against the key version's public key before returning

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::core::{SignDoc, SignMode, SimplePublicKey};
use crate::crypto::{decode_der_signature, parse_public_key_pem, verify_digest};
use crate::multisig::PartialSignature;
use crate::signing::hsm::kms::{KeyVersionPath, KmsClient, EC_SIGN_SECP256K1_SHA256};
use crate::signing::hsm::HsmError;
use crate::signing::{PartialSigner, SignerError, SigningRequest};

pub struct HsmSignatureAdapter {
    kms: Arc<dyn KmsClient>,
    version: KeyVersionPath,
    /// Member key this version is configured as, if known
    expected_key: Option<SimplePublicKey>,
    /// A key version's public half never changes
    public_key: OnceCell<SimplePublicKey>,
}

impl HsmSignatureAdapter {
    pub fn new(kms: Arc<dyn KmsClient>, version: KeyVersionPath) -> Self {
        Self {
            kms,
            version,
            expected_key: None,
            public_key: OnceCell::new(),
        }
    }

    /// Require the KMS key to be `key`
    pub fn with_expected_key(mut self, key: SimplePublicKey) -> Self {
        self.expected_key = Some(key);
        self
    }

    /// Public key of the key version; fetched once, failures are not cached
    pub async fn public_key(&self) -> Result<SimplePublicKey, HsmError> {
        self.public_key
            .get_or_try_init(|| self.fetch_public_key())
            .await
            .copied()
    }

    async fn fetch_public_key(&self) -> Result<SimplePublicKey, HsmError> {
        let reported = self.kms.get_public_key(&self.version).await?;
        if reported.algorithm != EC_SIGN_SECP256K1_SHA256 {
            return Err(HsmError::Key(format!(
                "{} uses algorithm {}, expected {}",
                self.version, reported.algorithm, EC_SIGN_SECP256K1_SHA256
            )));
        }

        let key = parse_public_key_pem(&reported.pem)
            .map(SimplePublicKey::new)
            .map_err(|e| HsmError::Key(format!("{}: {}", self.version, e)))?;

        if let Some(expected) = &self.expected_key {
            if expected != &key {
                return Err(HsmError::Key(format!(
                    "{} holds key {}, configured member key is {}",
                    self.version, key, expected
                )));
            }
        }

        log::info!("HSM public key loaded for {}: {}", self.version, key);
        Ok(key)
    }

    /// Sign `sign_doc`, producing a low-S signature at its sequence
    pub async fn sign_doc(&self, sign_doc: &SignDoc) -> Result<PartialSignature, HsmError> {
        let key = self.public_key().await?;
        let digest = sign_doc
            .digest()
            .map_err(|e| HsmError::InvalidResponse(format!("sign document: {}", e)))?;

        let der = self.kms.asymmetric_sign(&self.version, &digest).await?;
        let canonical = decode_der_signature(&der)
            .map_err(|e| HsmError::InvalidResponse(e.to_string()))?;
        if canonical.was_high_s {
            log::debug!("Normalized high-S signature from {}", self.version);
        }

        let signature = canonical.to_compact();
        let valid = verify_digest(key.inner(), &digest, &signature)
            .map_err(|e| HsmError::InvalidResponse(e.to_string()))?;
        if !valid {
            return Err(HsmError::Key(format!(
                "signature from {} does not verify against {}",
                self.version, key
            )));
        }

        Ok(PartialSignature::new(
            key,
            SignMode::LegacyAminoJson,
            signature,
            sign_doc.sequence,
        ))
    }
}

#[async_trait]
impl PartialSigner for HsmSignatureAdapter {
    fn name(&self) -> &str {
        "gcp-hsm"
    }

    async fn sign(&self, request: &SigningRequest) -> Result<PartialSignature, SignerError> {
        Ok(self.sign_doc(&request.sign_doc).await?)
    }
}
