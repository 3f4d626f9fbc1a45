//! Signing coordinator
//!
//! Drives one transfer from account lookup to broadcast:
//!
//! ```text
//! account snapshot -> unsigned tx + SignDoc -> legs (concurrent) -> aggregate -> assemble -> broadcast
//! ```
//!
//! Every leg signs against the same snapshot. A leg that reports another
//! sequence fails the attempt with a stale-sequence error, and the attempt
//! restarts from a fresh lookup. Nothing survives between attempts.

pub mod assembler;

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::chain::{AccountInfo, ChainClient, ChainError};
use crate::core::{LegacyAminoMultisigPublicKey, PublicKey, StdTx, Transaction, TransactionError, Transfer, TxBuilder};
use crate::crypto::KeyError;
use crate::multisig::{aggregate, MultisigError, PartialSignature, UnknownSignerWarning};
use crate::retry::RetryPolicy;
use crate::signing::{PartialSigner, RemoteSigningError, SignerError, SigningRequest};

pub use assembler::{Assembler, BroadcastOutcome};

/// Errors that end a signing attempt
#[derive(Error, Debug)]
pub enum AttemptError {
    #[error("Account resolution failed for {address}: {source}")]
    Resolution {
        address: String,
        #[source]
        source: ChainError,
    },
    #[error("{leg} failed: {source}")]
    Signing {
        leg: String,
        #[source]
        source: SignerError,
    },
    #[error("{leg} signed sequence {observed}, snapshot sequence is {expected}")]
    StaleSequence {
        leg: String,
        expected: u64,
        observed: u64,
    },
    #[error("Signature from {leg} does not verify against the sign document")]
    InvalidPartialSignature { leg: String },
    #[error("Signing legs did not finish within {0:?}")]
    SigningTimeout(Duration),
    #[error("Aggregation failed: {0}")]
    Aggregation(#[from] MultisigError),
    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),
    #[error("Broadcast rejected (code {code}, txhash {txhash}): {raw_log}")]
    Broadcast {
        code: u32,
        raw_log: String,
        txhash: String,
    },
    #[error("Broadcast endpoint returned HTTP {status}: {body}")]
    BroadcastHttp { status: u16, body: String },
    #[error("Broadcast failed: {0}")]
    BroadcastFailed(ChainError),
    #[error("Key error: {0}")]
    Key(#[from] KeyError),
}

/// Coordinator limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorSettings {
    /// Bound on all legs together
    pub signing_timeout: Duration,
    /// Retry policy for the account lookup and every leg
    pub retry: RetryPolicy,
    /// Fresh attempts allowed after a stale sequence
    pub max_stale_restarts: u32,
    /// Check each partial signature against the sign document
    pub verify_signatures: bool,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            signing_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            max_stale_restarts: 2,
            verify_signatures: true,
        }
    }
}

/// A fully signed transfer, not yet broadcast
#[derive(Debug, Clone)]
pub struct SignedTransfer {
    pub tx: Transaction,
    pub account: AccountInfo,
    pub warnings: Vec<UnknownSignerWarning>,
}

impl SignedTransfer {
    pub fn std_tx(&self) -> StdTx {
        self.tx.to_std_tx()
    }
}

pub struct SigningCoordinator {
    chain: Arc<dyn ChainClient>,
    builder: TxBuilder,
    composite: LegacyAminoMultisigPublicKey,
    address: String,
    signers: Vec<Arc<dyn PartialSigner>>,
    assembler: Assembler,
    settings: CoordinatorSettings,
}

impl SigningCoordinator {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        builder: TxBuilder,
        composite: LegacyAminoMultisigPublicKey,
        hrp: &str,
        signers: Vec<Arc<dyn PartialSigner>>,
        settings: CoordinatorSettings,
    ) -> Result<Self, KeyError> {
        let address = composite.address(hrp)?;
        Ok(Self {
            assembler: Assembler::new(chain.clone()),
            chain,
            builder,
            composite,
            address,
            signers,
            settings,
        })
    }

    /// Address of the composite key
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Sign `transfer`, restarting on stale sequences
    pub async fn sign(&self, transfer: &Transfer) -> Result<SignedTransfer, AttemptError> {
        let mut restarts = 0;
        loop {
            match self.attempt(transfer).await {
                Err(AttemptError::StaleSequence {
                    leg,
                    expected,
                    observed,
                }) if restarts < self.settings.max_stale_restarts => {
                    restarts += 1;
                    log::warn!(
                        "{} signed sequence {} but snapshot was {}; restarting ({}/{})",
                        leg,
                        observed,
                        expected,
                        restarts,
                        self.settings.max_stale_restarts
                    );
                }
                other => return other,
            }
        }
    }

    /// Sign and broadcast `transfer`
    pub async fn send(&self, transfer: &Transfer) -> Result<BroadcastOutcome, AttemptError> {
        let signed = self.sign(transfer).await?;
        self.assembler.broadcast(&signed.tx).await
    }

    async fn attempt(&self, transfer: &Transfer) -> Result<SignedTransfer, AttemptError> {
        let composite_key: PublicKey = self.composite.clone().into();
        let account = self.resolve(&composite_key).await?;
        log::info!(
            "Signing transfer on {} from {} at account {} sequence {}",
            self.builder.chain_id(),
            self.address,
            account.account_number,
            account.sequence
        );

        let tx = self
            .builder
            .create_transfer(&account.signer_data(&composite_key), transfer)?;
        let sign_doc = self
            .builder
            .sign_doc(&tx, account.account_number, account.sequence);
        let digest = sign_doc.digest()?;
        let request = SigningRequest {
            transfer: transfer.clone(),
            sign_doc,
        };

        let partials = self.collect(&request, account.sequence, &digest).await?;
        let aggregation = aggregate(&self.composite, partials)?;
        let tx = Assembler::assemble(tx, &self.composite, aggregation.descriptor, account.sequence);

        Ok(SignedTransfer {
            tx,
            account,
            warnings: aggregation.warnings,
        })
    }

    /// Fresh account snapshot for the composite address
    async fn resolve(&self, composite_key: &PublicKey) -> Result<AccountInfo, AttemptError> {
        let chain = self.chain.as_ref();
        let address = self.address.as_str();
        let resolution = |source| AttemptError::Resolution {
            address: address.to_string(),
            source,
        };

        let account = self
            .settings
            .retry
            .run("account lookup", move || chain.account_info(address))
            .await
            .map_err(resolution)?;

        if !account.key_matches(composite_key) {
            return Err(resolution(ChainError::PublicKeyMismatch {
                address: address.to_string(),
            }));
        }
        Ok(account)
    }

    /// Run every leg concurrently and wait for all of them
    async fn collect(
        &self,
        request: &SigningRequest,
        sequence: u64,
        digest: &[u8; 32],
    ) -> Result<Vec<PartialSignature>, AttemptError> {
        let retry = self.settings.retry;
        let legs = self.signers.iter().map(|signer| {
            let signer = signer.as_ref();
            async move {
                let result = retry
                    .run(signer.name(), move || signer.sign(request))
                    .await;
                (signer.name(), result)
            }
        });

        let results = tokio::time::timeout(self.settings.signing_timeout, join_all(legs))
            .await
            .map_err(|_| AttemptError::SigningTimeout(self.settings.signing_timeout))?;

        let mut partials = Vec::with_capacity(results.len());
        for (leg, result) in results {
            let partial = result.map_err(|source| leg_error(leg, source))?;

            if partial.sequence != sequence {
                return Err(AttemptError::StaleSequence {
                    leg: leg.to_string(),
                    expected: sequence,
                    observed: partial.sequence,
                });
            }

            if self.settings.verify_signatures && !partial.verify(digest)? {
                return Err(AttemptError::InvalidPartialSignature {
                    leg: leg.to_string(),
                });
            }

            log::debug!("{} signed as {}", leg, partial.signer);
            partials.push(partial);
        }
        Ok(partials)
    }
}

fn leg_error(leg: &str, source: SignerError) -> AttemptError {
    match source {
        SignerError::Remote(RemoteSigningError::StaleSequence { expected, observed }) => {
            AttemptError::StaleSequence {
                leg: leg.to_string(),
                expected,
                observed,
            }
        }
        source => AttemptError::Signing {
            leg: leg.to_string(),
            source,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SignMode, SimplePublicKey};
    use crate::testing::KeyPair;
    use crate::signing::hsm::kms::soft::SoftKms;
    use crate::signing::{
        HsmSignatureAdapter, KeyVersionPath, RemoteSignatureClient, RequestEnvelope,
    };
    use crate::testing::{serve, MockChain};
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicU32, Ordering};

    const SEQUENCE: u64 = 5;
    const ACCOUNT_NUMBER: u64 = 42;

    struct Parties {
        /// HSM key, member 0
        station: KeyPair,
        /// Remote signer key, member 1
        signing: KeyPair,
        composite: LegacyAminoMultisigPublicKey,
    }

    fn parties() -> Parties {
        let station = KeyPair::generate();
        let signing = KeyPair::generate();
        let composite = LegacyAminoMultisigPublicKey::new(
            2,
            vec![
                SimplePublicKey::new(station.public_key),
                SimplePublicKey::new(signing.public_key),
            ],
        )
        .unwrap();
        Parties {
            station,
            signing,
            composite,
        }
    }

    fn account(parties: &Parties, sequence: u64) -> AccountInfo {
        AccountInfo {
            address: parties.composite.address("terra").unwrap(),
            account_number: ACCOUNT_NUMBER,
            sequence,
            public_key: Some(parties.composite.clone().into()),
        }
    }

    fn builder() -> TxBuilder {
        TxBuilder::new("bombay-12").gas_price("uluna", "0.01133".parse().unwrap())
    }

    fn transfer() -> Transfer {
        Transfer::new("terra1to", "1uluna".parse().unwrap(), "memo")
    }

    fn fast_settings() -> CoordinatorSettings {
        CoordinatorSettings {
            signing_timeout: Duration::from_secs(5),
            retry: RetryPolicy {
                max_retries: 2,
                base_backoff_ms: 1,
                max_backoff_ms: 5,
            },
            ..Default::default()
        }
    }

    fn hsm(parties: &Parties) -> Arc<dyn PartialSigner> {
        let version = KeyVersionPath {
            project_id: "proj".to_string(),
            location_id: "global".to_string(),
            key_ring_id: "ring".to_string(),
            key_id: "station".to_string(),
            version_id: "1".to_string(),
        };
        Arc::new(
            HsmSignatureAdapter::new(Arc::new(SoftKms::new(parties.station.clone())), version)
                .with_expected_key(SimplePublicKey::new(parties.station.public_key)),
        )
    }

    /// Mock signing service that rebuilds and signs the tx like the real one
    async fn signing_service(
        key: KeyPair,
        chain_account: AccountInfo,
        composite: LegacyAminoMultisigPublicKey,
    ) -> String {
        let handler = move |Json(body): Json<Value>| {
            let key = key.clone();
            let account = chain_account.clone();
            let composite = composite.clone();
            async move {
                let payload: crate::core::TransferPayload =
                    serde_json::from_str(body["json"].as_str().unwrap()).unwrap();
                let transfer = Transfer::from(payload);
                let b = builder();
                let composite_key: PublicKey = composite.into();
                let tx = b
                    .create_transfer(&account.signer_data(&composite_key), &transfer)
                    .unwrap();
                let digest = b
                    .sign_doc(&tx, account.account_number, account.sequence)
                    .digest()
                    .unwrap();
                let signature = key.sign_digest(&digest).unwrap();
                Json(json!({
                    "sequence": account.sequence,
                    "data": {"single": {
                        "mode": "SIGN_MODE_LEGACY_AMINO_JSON",
                        "signature": STANDARD.encode(signature)
                    }}
                }))
            }
        };
        serve(Router::new().route("/sign", post(handler))).await
    }

    async fn remote(parties: &Parties, url: String) -> Arc<dyn PartialSigner> {
        Arc::new(
            RemoteSignatureClient::new(
                url,
                SimplePublicKey::new(parties.signing.public_key),
                RequestEnvelope::Wrapped,
                Duration::from_secs(5),
            )
            .unwrap(),
        )
    }

    fn coordinator(
        parties: &Parties,
        chain: Arc<MockChain>,
        signers: Vec<Arc<dyn PartialSigner>>,
        settings: CoordinatorSettings,
    ) -> SigningCoordinator {
        SigningCoordinator::new(
            chain,
            builder(),
            parties.composite.clone(),
            "terra",
            signers,
            settings,
        )
        .unwrap()
    }

    /// Signs with a fixed key at a fixed sequence, whatever the request says
    struct FixedSigner {
        key: KeyPair,
        sequence: Option<u64>,
        calls: AtomicU32,
        delay: Duration,
    }

    impl FixedSigner {
        fn new(key: KeyPair) -> Self {
            Self {
                key,
                sequence: None,
                calls: AtomicU32::new(0),
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl PartialSigner for FixedSigner {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn sign(&self, request: &SigningRequest) -> Result<PartialSignature, SignerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            let digest = request.sign_doc.digest()?;
            let signature = self.key.sign_digest(&digest).unwrap();
            Ok(PartialSignature::new(
                SimplePublicKey::new(self.key.public_key),
                SignMode::LegacyAminoJson,
                signature,
                self.sequence.unwrap_or(request.sequence()),
            ))
        }
    }

    /// Signs only once every leg sharing the barrier has been asked to
    struct RendezvousSigner {
        key: KeyPair,
        barrier: Arc<tokio::sync::Barrier>,
    }

    #[async_trait]
    impl PartialSigner for RendezvousSigner {
        fn name(&self) -> &str {
            "rendezvous"
        }

        async fn sign(&self, request: &SigningRequest) -> Result<PartialSignature, SignerError> {
            self.barrier.wait().await;
            let digest = request.sign_doc.digest()?;
            Ok(PartialSignature::new(
                SimplePublicKey::new(self.key.public_key),
                SignMode::LegacyAminoJson,
                self.key.sign_digest(&digest).unwrap(),
                request.sequence(),
            ))
        }
    }

    #[tokio::test]
    async fn test_end_to_end_send() {
        let p = parties();
        let chain = Arc::new(MockChain::new(vec![account(&p, SEQUENCE)]));
        let url = signing_service(p.signing.clone(), account(&p, SEQUENCE), p.composite.clone()).await;
        let signers = vec![remote(&p, format!("{}/sign", url)).await, hsm(&p)];
        let coordinator = coordinator(&p, chain.clone(), signers, fast_settings());

        let signed = coordinator.sign(&transfer()).await.unwrap();
        let tx = &signed.tx;

        // Exactly one envelope, bound to the composite key at sequence 5
        assert_eq!(tx.signatures.len(), 1);
        let envelope = &tx.signatures[0];
        let composite_key: PublicKey = p.composite.clone().into();
        assert_eq!(envelope.sequence, SEQUENCE);
        assert_eq!(envelope.public_key, composite_key);
        assert_eq!(tx.body.memo, "memo");

        // Descriptor slots follow member order: [A (HSM), B (remote)]
        let descriptor = match &envelope.data {
            crate::core::SignatureData::Multi(descriptor) => descriptor,
            other => panic!("expected multisig data, got {:?}", other),
        };
        let slots = descriptor.slots();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].as_ref().unwrap().signer.inner(), &p.station.public_key);
        assert_eq!(slots[1].as_ref().unwrap().signer.inner(), &p.signing.public_key);
        assert!(tx.validate_signatures().is_ok());

        let outcome = coordinator.send(&transfer()).await.unwrap();
        assert_eq!(outcome.txhash, "A1B2C3");
        assert_eq!(chain.broadcast_count(), 1);

        let broadcast = chain.broadcasts.lock().unwrap()[0].clone();
        assert_eq!(broadcast.signatures.len(), 1);
        assert_eq!(broadcast.memo, "memo");
    }

    #[tokio::test]
    async fn test_leg_order_does_not_change_descriptor() {
        let p = parties();
        let chain = Arc::new(MockChain::new(vec![account(&p, SEQUENCE)]));

        let mut slow_a = FixedSigner::new(p.station.clone());
        slow_a.delay = Duration::from_millis(30);
        let fast_b = FixedSigner::new(p.signing.clone());
        let first = coordinator(
            &p,
            chain.clone(),
            vec![Arc::new(slow_a), Arc::new(fast_b)],
            fast_settings(),
        )
        .sign(&transfer())
        .await
        .unwrap();

        let fast_a = FixedSigner::new(p.station.clone());
        let mut slow_b = FixedSigner::new(p.signing.clone());
        slow_b.delay = Duration::from_millis(30);
        let second = coordinator(
            &p,
            chain,
            vec![Arc::new(slow_b), Arc::new(fast_a)],
            fast_settings(),
        )
        .sign(&transfer())
        .await
        .unwrap();

        assert_eq!(
            first.tx.signatures[0].data.to_bytes(),
            second.tx.signatures[0].data.to_bytes()
        );
    }

    #[tokio::test]
    async fn test_stale_hsm_sequence_blocks_broadcast() {
        let p = parties();
        let chain = Arc::new(MockChain::new(vec![account(&p, SEQUENCE)]));

        let mut stale = FixedSigner::new(p.station.clone());
        stale.sequence = Some(SEQUENCE - 1);
        let settings = CoordinatorSettings {
            max_stale_restarts: 0,
            ..fast_settings()
        };
        let coordinator = coordinator(
            &p,
            chain.clone(),
            vec![Arc::new(FixedSigner::new(p.signing.clone())), Arc::new(stale)],
            settings,
        );

        let err = coordinator.send(&transfer()).await.unwrap_err();
        assert!(matches!(
            err,
            AttemptError::StaleSequence {
                expected: 5,
                observed: 4,
                ..
            }
        ));
        assert_eq!(chain.broadcast_count(), 0);
    }

    #[tokio::test]
    async fn test_stale_sequence_restarts_from_fresh_lookup() {
        let p = parties();
        // Second lookup sees the sequence the remote service already saw
        let chain = Arc::new(MockChain::new(vec![account(&p, 4), account(&p, SEQUENCE)]));
        let url = signing_service(p.signing.clone(), account(&p, SEQUENCE), p.composite.clone()).await;
        let signers = vec![remote(&p, format!("{}/sign", url)).await, hsm(&p)];
        let coordinator = coordinator(&p, chain.clone(), signers, fast_settings());

        let signed = coordinator.sign(&transfer()).await.unwrap();
        assert_eq!(signed.account.sequence, SEQUENCE);
        assert_eq!(signed.tx.signatures[0].sequence, SEQUENCE);
        assert_eq!(chain.account_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_remote_500_retried_then_fails() {
        let p = parties();
        let chain = Arc::new(MockChain::new(vec![account(&p, SEQUENCE)]));

        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/sign",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::INTERNAL_SERVER_ERROR, "signer crashed")
                }
            }),
        );
        let url = serve(router).await;

        let hsm_leg = Arc::new(FixedSigner::new(p.station.clone()));
        let signers: Vec<Arc<dyn PartialSigner>> =
            vec![remote(&p, format!("{}/sign", url)).await, hsm_leg.clone()];
        let coordinator = coordinator(&p, chain.clone(), signers, fast_settings());

        let err = coordinator.send(&transfer()).await.unwrap_err();
        match err {
            AttemptError::Signing { leg, source } => {
                assert_eq!(leg, "remote-signer");
                assert!(matches!(
                    source,
                    SignerError::Remote(RemoteSigningError::Status { status: 500, .. })
                ));
            }
            other => panic!("unexpected error: {}", other),
        }
        // 1 attempt + 2 retries
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        // The HSM leg ran once and its result was dropped with the attempt
        assert_eq!(hsm_leg.calls.load(Ordering::SeqCst), 1);
        assert_eq!(chain.broadcast_count(), 0);
    }

    #[tokio::test]
    async fn test_signing_timeout() {
        let p = parties();
        let chain = Arc::new(MockChain::new(vec![account(&p, SEQUENCE)]));

        let mut stuck = FixedSigner::new(p.station.clone());
        stuck.delay = Duration::from_secs(60);
        let settings = CoordinatorSettings {
            signing_timeout: Duration::from_millis(50),
            ..fast_settings()
        };
        let coordinator = coordinator(
            &p,
            chain.clone(),
            vec![Arc::new(stuck), Arc::new(FixedSigner::new(p.signing.clone()))],
            settings,
        );

        let err = coordinator.send(&transfer()).await.unwrap_err();
        assert!(matches!(err, AttemptError::SigningTimeout(_)));
        assert_eq!(chain.broadcast_count(), 0);
    }

    #[tokio::test]
    async fn test_foreign_signer_ignored_with_warning() {
        let p = parties();
        let chain = Arc::new(MockChain::new(vec![account(&p, SEQUENCE)]));
        let coordinator = coordinator(
            &p,
            chain,
            vec![
                Arc::new(FixedSigner::new(p.station.clone())),
                Arc::new(FixedSigner::new(KeyPair::generate())),
                Arc::new(FixedSigner::new(p.signing.clone())),
            ],
            fast_settings(),
        );

        let signed = coordinator.sign(&transfer()).await.unwrap();
        assert_eq!(signed.warnings.len(), 1);
        assert_eq!(signed.tx.signatures.len(), 1);
    }

    #[tokio::test]
    async fn test_insufficient_signatures() {
        let p = parties();
        let chain = Arc::new(MockChain::new(vec![account(&p, SEQUENCE)]));
        let coordinator = coordinator(
            &p,
            chain.clone(),
            vec![Arc::new(FixedSigner::new(p.station.clone()))],
            fast_settings(),
        );

        let err = coordinator.send(&transfer()).await.unwrap_err();
        assert!(matches!(
            err,
            AttemptError::Aggregation(MultisigError::InsufficientSignatures { have: 1, need: 2 })
        ));
        assert_eq!(chain.broadcast_count(), 0);
    }

    /// Returns a well-formed signature over the wrong document
    struct WrongDocSigner(KeyPair);

    #[async_trait]
    impl PartialSigner for WrongDocSigner {
        fn name(&self) -> &str {
            "wrong-doc"
        }

        async fn sign(&self, request: &SigningRequest) -> Result<PartialSignature, SignerError> {
            let signature = self
                .0
                .sign_digest(&crate::crypto::sha256(b"not the sign doc"))
                .unwrap();
            Ok(PartialSignature::new(
                SimplePublicKey::new(self.0.public_key),
                SignMode::LegacyAminoJson,
                signature,
                request.sequence(),
            ))
        }
    }

    #[tokio::test]
    async fn test_invalid_partial_signature() {
        let p = parties();
        let chain = Arc::new(MockChain::new(vec![account(&p, SEQUENCE)]));
        let coordinator = coordinator(
            &p,
            chain,
            vec![
                Arc::new(FixedSigner::new(p.station.clone())),
                Arc::new(WrongDocSigner(p.signing.clone())),
            ],
            fast_settings(),
        );

        let err = coordinator.sign(&transfer()).await.unwrap_err();
        assert!(matches!(
            err,
            AttemptError::InvalidPartialSignature { ref leg } if leg == "wrong-doc"
        ));
    }

    #[tokio::test]
    async fn test_account_key_mismatch_is_resolution_error() {
        let p = parties();
        let mut foreign = account(&p, SEQUENCE);
        foreign.public_key = Some(SimplePublicKey::new(KeyPair::generate().public_key).into());
        let chain = Arc::new(MockChain::new(vec![foreign]));
        let coordinator = coordinator(
            &p,
            chain,
            vec![Arc::new(FixedSigner::new(p.station.clone()))],
            fast_settings(),
        );

        let err = coordinator.sign(&transfer()).await.unwrap_err();
        assert!(matches!(
            err,
            AttemptError::Resolution {
                source: ChainError::PublicKeyMismatch { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_account_is_resolution_error() {
        let p = parties();
        let chain = Arc::new(MockChain::new(vec![]));
        let coordinator = coordinator(&p, chain.clone(), vec![], fast_settings());

        let err = coordinator.sign(&transfer()).await.unwrap_err();
        assert!(matches!(
            err,
            AttemptError::Resolution {
                source: ChainError::AccountNotFound(_),
                ..
            }
        ));
        // Not found is not transient; no retries
        assert_eq!(chain.account_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fresh_account_without_key_uses_composite() {
        let p = parties();
        let mut fresh = account(&p, 0);
        fresh.public_key = None;
        let chain = Arc::new(MockChain::new(vec![fresh]));
        let coordinator = coordinator(
            &p,
            chain,
            vec![
                Arc::new(FixedSigner::new(p.station.clone())),
                Arc::new(FixedSigner::new(p.signing.clone())),
            ],
            fast_settings(),
        );

        let signed = coordinator.sign(&transfer()).await.unwrap();
        let composite_key: PublicKey = p.composite.clone().into();
        assert_eq!(signed.tx.auth_info.signer_infos[0].sequence, 0);
        assert_eq!(signed.tx.auth_info.signer_infos[0].public_key, composite_key);
    }

    #[tokio::test]
    async fn test_chain_rejection_surfaces_verbatim() {
        let p = parties();
        let mut mock = MockChain::new(vec![account(&p, SEQUENCE)]);
        mock.broadcast_result = crate::chain::BroadcastResult {
            txhash: "DEAD".to_string(),
            code: 32,
            raw_log: "account sequence mismatch, expected 6, got 5".to_string(),
        };
        let chain = Arc::new(mock);
        let coordinator = coordinator(
            &p,
            chain.clone(),
            vec![
                Arc::new(FixedSigner::new(p.station.clone())),
                Arc::new(FixedSigner::new(p.signing.clone())),
            ],
            fast_settings(),
        );

        let err = coordinator.send(&transfer()).await.unwrap_err();
        match err {
            AttemptError::Broadcast {
                code,
                raw_log,
                txhash,
            } => {
                assert_eq!(code, 32);
                assert_eq!(txhash, "DEAD");
                assert!(raw_log.contains("sequence mismatch"));
            }
            other => panic!("unexpected error: {}", other),
        }
        // Never retried
        assert_eq!(chain.broadcast_count(), 1);
    }

    #[tokio::test]
    async fn test_legs_are_requested_concurrently() {
        let p = parties();
        let chain = Arc::new(MockChain::new(vec![account(&p, SEQUENCE)]));
        let barrier = Arc::new(tokio::sync::Barrier::new(2));
        let settings = CoordinatorSettings {
            signing_timeout: Duration::from_secs(2),
            ..fast_settings()
        };
        // A leg awaited alone never passes the barrier and the attempt times out
        let coordinator = coordinator(
            &p,
            chain,
            vec![
                Arc::new(RendezvousSigner {
                    key: p.station.clone(),
                    barrier: barrier.clone(),
                }),
                Arc::new(RendezvousSigner {
                    key: p.signing.clone(),
                    barrier,
                }),
            ],
            settings,
        );

        let signed = coordinator.sign(&transfer()).await.unwrap();
        assert_eq!(signed.tx.signatures.len(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_http_failure_keeps_status_apart() {
        let p = parties();
        let mut mock = MockChain::new(vec![account(&p, SEQUENCE)]);
        mock.broadcast_status = Some((502, "bad gateway".to_string()));
        let chain = Arc::new(mock);
        let coordinator = coordinator(
            &p,
            chain.clone(),
            vec![
                Arc::new(FixedSigner::new(p.station.clone())),
                Arc::new(FixedSigner::new(p.signing.clone())),
            ],
            fast_settings(),
        );

        let err = coordinator.send(&transfer()).await.unwrap_err();
        match err {
            AttemptError::BroadcastHttp { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "bad gateway");
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(chain.broadcast_count(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_rejects_wrong_envelope_count() {
        let p = parties();
        let chain = Arc::new(MockChain::new(vec![account(&p, SEQUENCE)]));
        let coordinator = coordinator(
            &p,
            chain.clone(),
            vec![
                Arc::new(FixedSigner::new(p.station.clone())),
                Arc::new(FixedSigner::new(p.signing.clone())),
            ],
            fast_settings(),
        );
        let mut signed = coordinator.sign(&transfer()).await.unwrap();
        let extra = signed.tx.signatures[0].clone();
        signed.tx.append_signature(extra);

        let assembler = Assembler::new(chain.clone());
        let err = assembler.broadcast(&signed.tx).await.unwrap_err();
        assert!(matches!(
            err,
            AttemptError::Transaction(TransactionError::SignatureCount {
                expected: 1,
                found: 2
            })
        ));
        assert_eq!(chain.broadcast_count(), 0);
    }

    #[test]
    fn test_assemble_appends_one_envelope() {
        let p = parties();
        let key: PublicKey = p.composite.clone().into();
        let signer = account(&p, SEQUENCE).signer_data(&key);
        let tx = builder().create_transfer(&signer, &transfer()).unwrap();
        let doc = builder().sign_doc(&tx, ACCOUNT_NUMBER, SEQUENCE);
        let digest = doc.digest().unwrap();

        let cosigners = [&p.signing, &p.station];
        let partials = cosigners.iter().map(|kp| {
            PartialSignature::new(
                SimplePublicKey::new(kp.public_key),
                SignMode::LegacyAminoJson,
                kp.sign_digest(&digest).unwrap(),
                SEQUENCE,
            )
        });
        let aggregation = aggregate(&p.composite, partials).unwrap();

        let signed = Assembler::assemble(tx, &p.composite, aggregation.descriptor, SEQUENCE);
        assert_eq!(signed.signatures.len(), 1);
        assert_eq!(signed.signatures[0].public_key, key);
        assert_eq!(signed.signatures[0].sequence, SEQUENCE);
        assert!(signed.validate_signatures().is_ok());
    }
}
