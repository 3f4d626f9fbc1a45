//! Key service interface

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::signing::hsm::HsmError;

/// Cloud KMS algorithm name for secp256k1 ECDSA over SHA-256
pub const EC_SIGN_SECP256K1_SHA256: &str = "EC_SIGN_SECP256K1_SHA256";

/// Fully-qualified address of one key version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyVersionPath {
    pub project_id: String,
    pub location_id: String,
    pub key_ring_id: String,
    pub key_id: String,
    pub version_id: String,
}

impl fmt::Display for KeyVersionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "projects/{}/locations/{}/keyRings/{}/cryptoKeys/{}/cryptoKeyVersions/{}",
            self.project_id, self.location_id, self.key_ring_id, self.key_id, self.version_id
        )
    }
}

/// Public half of a key version as the service reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KmsPublicKey {
    /// PEM SubjectPublicKeyInfo
    pub pem: String,
    pub algorithm: String,
}

/// Asymmetric signing primitives of a managed key service
#[async_trait]
pub trait KmsClient: Send + Sync {
    async fn get_public_key(&self, version: &KeyVersionPath) -> Result<KmsPublicKey, HsmError>;

    /// Sign a SHA-256 digest; returns a DER ECDSA signature
    async fn asymmetric_sign(
        &self,
        version: &KeyVersionPath,
        digest: &[u8; 32],
    ) -> Result<Vec<u8>, HsmError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_version_path() {
        let path = KeyVersionPath {
            project_id: "proj".to_string(),
            location_id: "global".to_string(),
            key_ring_id: "ring".to_string(),
            key_id: "key".to_string(),
            version_id: "1".to_string(),
        };
        assert_eq!(
            path.to_string(),
            "projects/proj/locations/global/keyRings/ring/cryptoKeys/key/cryptoKeyVersions/1"
        );
    }
}
