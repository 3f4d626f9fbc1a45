//! DER and PEM decoding for key-service outputs
//!
//! Managed key services return ECDSA signatures as ASN.1 DER
//! `SEQUENCE { r INTEGER, s INTEGER }` and public keys as PEM-wrapped
//! SubjectPublicKeyInfo. Chains expect a 64-byte `r || s` with `s` in
//! the lower half of the curve order, so everything here funnels into
//! that form.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use secp256k1::ecdsa::Signature;
use secp256k1::PublicKey;

use super::keys::{public_key_from_slice, KeyError, COMPACT_SIGNATURE_LEN};

const TAG_BIT_STRING: u8 = 0x03;
const TAG_OID: u8 = 0x06;
const TAG_SEQUENCE: u8 = 0x30;

/// 1.2.840.10045.2.1
const OID_EC_PUBLIC_KEY: &[u8] = &[0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01];
/// 1.3.132.0.10
const OID_SECP256K1: &[u8] = &[0x2b, 0x81, 0x04, 0x00, 0x0a];

/// A signature decoded from DER and brought into canonical low-S form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalSignature {
    compact: [u8; COMPACT_SIGNATURE_LEN],
    /// Whether `s` had to be negated to reach low-S form
    pub was_high_s: bool,
}

impl CanonicalSignature {
    /// Fixed-width `r || s`
    pub fn to_compact(&self) -> [u8; COMPACT_SIGNATURE_LEN] {
        self.compact
    }

    /// Big-endian `r`
    pub fn r(&self) -> [u8; 32] {
        let mut r = [0u8; 32];
        r.copy_from_slice(&self.compact[..32]);
        r
    }

    /// Big-endian `s`, always in the lower half of the curve order
    pub fn s(&self) -> [u8; 32] {
        let mut s = [0u8; 32];
        s.copy_from_slice(&self.compact[32..]);
        s
    }
}

/// Decode a DER ECDSA signature into fixed-width low-S form
///
/// Strict DER is tried first; BER-ish encodings some HSMs emit (extra
/// leading zeros, long-form lengths) fall back to the lax parser.
pub fn decode_der_signature(der: &[u8]) -> Result<CanonicalSignature, KeyError> {
    let mut sig = Signature::from_der(der)
        .or_else(|_| Signature::from_der_lax(der))
        .map_err(|e| KeyError::InvalidSignature(format!("malformed DER signature: {}", e)))?;

    let before = sig.serialize_compact();
    sig.normalize_s();
    let compact = sig.serialize_compact();

    Ok(CanonicalSignature {
        compact,
        was_high_s: before != compact,
    })
}

/// Parse a PEM `PUBLIC KEY` block holding a secp256k1 SubjectPublicKeyInfo
pub fn parse_public_key_pem(pem: &str) -> Result<PublicKey, KeyError> {
    let body: String = pem
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("-----"))
        .collect();

    if body.is_empty() {
        return Err(KeyError::InvalidPublicKey("empty PEM document".to_string()));
    }

    let der = STANDARD
        .decode(body.as_bytes())
        .map_err(|e| KeyError::InvalidPublicKey(format!("PEM body is not base64: {}", e)))?;

    parse_public_key_der(&der)
}

/// Parse a DER SubjectPublicKeyInfo, requiring `id-ecPublicKey` on secp256k1
pub fn parse_public_key_der(der: &[u8]) -> Result<PublicKey, KeyError> {
    let mut outer = DerReader::new(der);
    let spki = outer.expect(TAG_SEQUENCE)?;
    if !outer.is_empty() {
        return Err(invalid_spki("trailing bytes after SubjectPublicKeyInfo"));
    }

    let mut spki = DerReader::new(spki);
    let mut algorithm = DerReader::new(spki.expect(TAG_SEQUENCE)?);

    if algorithm.expect(TAG_OID)? != OID_EC_PUBLIC_KEY {
        return Err(invalid_spki("key algorithm is not id-ecPublicKey"));
    }
    if algorithm.expect(TAG_OID)? != OID_SECP256K1 {
        return Err(invalid_spki("curve is not secp256k1"));
    }

    let bits = spki.expect(TAG_BIT_STRING)?;
    match bits.split_first() {
        Some((0, point)) => public_key_from_slice(point),
        _ => Err(invalid_spki("public key BIT STRING has unused bits")),
    }
}

fn invalid_spki(reason: &str) -> KeyError {
    KeyError::InvalidPublicKey(reason.to_string())
}

/// Minimal reader over definite-length DER TLVs
struct DerReader<'a> {
    data: &'a [u8],
}

impl<'a> DerReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read one TLV with the given tag and return its contents
    fn expect(&mut self, tag: u8) -> Result<&'a [u8], KeyError> {
        let (&found, rest) = self
            .data
            .split_first()
            .ok_or_else(|| invalid_spki("unexpected end of DER input"))?;
        if found != tag {
            return Err(KeyError::InvalidPublicKey(format!(
                "expected DER tag {:#04x}, found {:#04x}",
                tag, found
            )));
        }

        let (len, rest) = read_length(rest)?;
        if rest.len() < len {
            return Err(invalid_spki("DER length exceeds input"));
        }

        let (contents, remaining) = rest.split_at(len);
        self.data = remaining;
        Ok(contents)
    }
}

fn read_length(data: &[u8]) -> Result<(usize, &[u8]), KeyError> {
    let (&first, rest) = data
        .split_first()
        .ok_or_else(|| invalid_spki("missing DER length"))?;

    if first & 0x80 == 0 {
        return Ok((first as usize, rest));
    }

    let octets = (first & 0x7f) as usize;
    if octets == 0 || octets > 2 || rest.len() < octets {
        return Err(invalid_spki("unsupported DER length encoding"));
    }

    let len = rest[..octets]
        .iter()
        .fold(0usize, |acc, &b| (acc << 8) | b as usize);
    Ok((len, &rest[octets..]))
}

/// Encode a secp256k1 key as a PEM SubjectPublicKeyInfo, the shape KMS returns
#[cfg(test)]
pub(crate) fn encode_public_key_pem(key: &PublicKey) -> String {
    const SPKI_PREFIX: &[u8] = &[
        0x30, 0x56, 0x30, 0x10, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01, 0x06, 0x05,
        0x2b, 0x81, 0x04, 0x00, 0x0a, 0x03, 0x42, 0x00,
    ];
    let mut der = SPKI_PREFIX.to_vec();
    der.extend_from_slice(&key.serialize_uncompressed());
    format!(
        "-----BEGIN PUBLIC KEY-----\n{}\n-----END PUBLIC KEY-----\n",
        STANDARD.encode(der)
    )
}
