//! Multisig aggregation
//!
//! Places partial signatures at their member slots of a composite key.
//! Aggregation is a pure function: the descriptor depends only on the
//! composite key and the set of accepted signatures, never on arrival order.

use std::fmt;

use crate::core::{LegacyAminoMultisigPublicKey, SimplePublicKey};
use crate::multisig::descriptor::ThresholdSignatureDescriptor;
use crate::multisig::partial::PartialSignature;
use crate::multisig::MultisigError;

/// A signature from a key outside the composite key; ignored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSignerWarning {
    pub signer: SimplePublicKey,
}

impl fmt::Display for UnknownSignerWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ignoring signature from {}: not a member of the composite key",
            self.signer
        )
    }
}

/// Result of a successful aggregation
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub descriptor: ThresholdSignatureDescriptor,
    pub warnings: Vec<UnknownSignerWarning>,
}

/// Combine partial signatures into a threshold signature descriptor
///
/// # Errors
/// - [`MultisigError::DuplicateSigner`] if two signatures map to one member
/// - [`MultisigError::InsufficientSignatures`] if fewer than the threshold remain
pub fn aggregate<I>(
    composite: &LegacyAminoMultisigPublicKey,
    partials: I,
) -> Result<Aggregation, MultisigError>
where
    I: IntoIterator<Item = PartialSignature>,
{
    let mut slots: Vec<Option<PartialSignature>> = vec![None; composite.members().len()];
    let mut warnings = Vec::new();

    for partial in partials {
        let Some(index) = composite.position_of(&partial.signer) else {
            let warning = UnknownSignerWarning {
                signer: partial.signer,
            };
            log::warn!("{}", warning);
            warnings.push(warning);
            continue;
        };

        if slots[index].is_some() {
            return Err(MultisigError::DuplicateSigner { index });
        }
        slots[index] = Some(partial);
    }

    let have = slots.iter().filter(|slot| slot.is_some()).count();
    let need = composite.threshold() as usize;
    if have < need {
        return Err(MultisigError::InsufficientSignatures { have, need });
    }

    log::debug!(
        "Aggregated {} of {} member signature(s) for {} key",
        have,
        slots.len(),
        composite.description()
    );

    Ok(Aggregation {
        descriptor: ThresholdSignatureDescriptor::from_slots(slots),
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SignMode;
    use crate::crypto::sha256;
    use crate::testing::KeyPair;

    struct Fixture {
        signers: Vec<KeyPair>,
        composite: LegacyAminoMultisigPublicKey,
        digest: [u8; 32],
    }

    fn fixture(threshold: u32, n: usize) -> Fixture {
        let signers: Vec<KeyPair> = (0..n).map(|_| KeyPair::generate()).collect();
        let members = signers
            .iter()
            .map(|kp| SimplePublicKey::new(kp.public_key))
            .collect();
        Fixture {
            composite: LegacyAminoMultisigPublicKey::new(threshold, members).unwrap(),
            signers,
            digest: sha256(b"sign doc"),
        }
    }

    fn sign(kp: &KeyPair, digest: &[u8; 32]) -> PartialSignature {
        PartialSignature::new(
            SimplePublicKey::new(kp.public_key),
            SignMode::LegacyAminoJson,
            kp.sign_digest(digest).unwrap(),
            5,
        )
    }

    #[test]
    fn test_order_independent_of_arrival() {
        let f = fixture(2, 2);
        let a = sign(&f.signers[0], &f.digest);
        let b = sign(&f.signers[1], &f.digest);

        let ab = aggregate(&f.composite, vec![a.clone(), b.clone()]).unwrap();
        let ba = aggregate(&f.composite, vec![b.clone(), a.clone()]).unwrap();

        assert_eq!(ab.descriptor.to_bytes(), ba.descriptor.to_bytes());
        let slots = ba.descriptor.slots();
        assert_eq!(slots[0].as_ref().unwrap().signature, a.signature);
        assert_eq!(slots[1].as_ref().unwrap().signature, b.signature);
    }

    #[test]
    fn test_insufficient_signatures() {
        let f = fixture(2, 2);
        let a = sign(&f.signers[0], &f.digest);

        let err = aggregate(&f.composite, vec![a]).unwrap_err();
        assert!(matches!(
            err,
            MultisigError::InsufficientSignatures { have: 1, need: 2 }
        ));
    }

    #[test]
    fn test_foreign_signer_ignored() {
        let f = fixture(2, 2);
        let stranger = KeyPair::generate();
        let partials = vec![
            sign(&f.signers[1], &f.digest),
            sign(&stranger, &f.digest),
            sign(&f.signers[0], &f.digest),
        ];

        let result = aggregate(&f.composite, partials).unwrap();
        assert_eq!(result.descriptor.present(), 2);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(
            result.warnings[0].signer,
            SimplePublicKey::new(stranger.public_key)
        );
    }

    #[test]
    fn test_foreign_signer_does_not_count_toward_threshold() {
        let f = fixture(2, 2);
        let stranger = KeyPair::generate();
        let partials = vec![sign(&f.signers[0], &f.digest), sign(&stranger, &f.digest)];

        assert!(matches!(
            aggregate(&f.composite, partials),
            Err(MultisigError::InsufficientSignatures { have: 1, need: 2 })
        ));
    }

    #[test]
    fn test_duplicate_signer() {
        let f = fixture(2, 3);
        let partials = vec![
            sign(&f.signers[1], &f.digest),
            sign(&f.signers[1], &sha256(b"other")),
            sign(&f.signers[2], &f.digest),
        ];

        assert!(matches!(
            aggregate(&f.composite, partials),
            Err(MultisigError::DuplicateSigner { index: 1 })
        ));
    }

    #[test]
    fn test_two_of_three_leaves_gap() {
        let f = fixture(2, 3);
        let partials = vec![sign(&f.signers[2], &f.digest), sign(&f.signers[0], &f.digest)];

        let result = aggregate(&f.composite, partials).unwrap();
        let slots = result.descriptor.slots();
        assert!(slots[0].is_some());
        assert!(slots[1].is_none());
        assert!(slots[2].is_some());
        assert!(result.warnings.is_empty());
    }
}
