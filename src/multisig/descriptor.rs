//! Threshold signature descriptor
//!
//! One slot per member of the composite key, in member order. The byte
//! form is the amino `Multisignature`:
//!
//! ```text
//! field 1: CompactBitArray { 1: extra_bits_stored, 2: elems }
//! field 2: repeated signature bytes, present slots only, in slot order
//! ```

use prost::Message;

use crate::core::amino;
use crate::multisig::partial::PartialSignature;

/// Bit array marking which member slots carry a signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactBitArray {
    /// Bits used in the last byte (`len % 8`)
    extra_bits_stored: u32,
    elems: Vec<u8>,
}

impl CompactBitArray {
    /// All-clear array of `bits` bits
    pub fn new(bits: usize) -> Self {
        Self {
            extra_bits_stored: (bits % 8) as u32,
            elems: vec![0u8; (bits + 7) / 8],
        }
    }

    /// Number of bits
    pub fn len(&self) -> usize {
        match self.extra_bits_stored {
            0 => self.elems.len() * 8,
            extra => (self.elems.len() - 1) * 8 + extra as usize,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bit `i` lives at `elems[i / 8] & (1 << (7 - i % 8))`
    pub fn set(&mut self, index: usize, value: bool) -> bool {
        if index >= self.len() {
            return false;
        }
        let mask = 1u8 << (7 - index % 8);
        if value {
            self.elems[index / 8] |= mask;
        } else {
            self.elems[index / 8] &= !mask;
        }
        true
    }

    pub fn get(&self, index: usize) -> bool {
        index < self.len() && self.elems[index / 8] & (1u8 << (7 - index % 8)) != 0
    }

    pub fn count_ones(&self) -> usize {
        self.elems.iter().map(|b| b.count_ones() as usize).sum()
    }

    fn to_message(&self) -> amino::CompactBitArray {
        amino::CompactBitArray {
            extra_bits_stored: self.extra_bits_stored,
            elems: self.elems.clone(),
        }
    }

    /// Amino encoding; zero-valued fields are omitted
    pub fn amino_bytes(&self) -> Vec<u8> {
        self.to_message().encode_to_vec()
    }
}

/// Partial signatures placed at their composite-key member slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdSignatureDescriptor {
    slots: Vec<Option<PartialSignature>>,
}

impl ThresholdSignatureDescriptor {
    /// Build from slots already in member order
    pub(crate) fn from_slots(slots: Vec<Option<PartialSignature>>) -> Self {
        Self { slots }
    }

    pub fn slots(&self) -> &[Option<PartialSignature>] {
        &self.slots
    }

    /// Number of filled slots
    pub fn present(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn bit_array(&self) -> CompactBitArray {
        let mut bits = CompactBitArray::new(self.slots.len());
        for (index, slot) in self.slots.iter().enumerate() {
            if slot.is_some() {
                bits.set(index, true);
            }
        }
        bits
    }

    /// Filled slots in member order
    pub fn signatures(&self) -> impl Iterator<Item = &PartialSignature> {
        self.slots.iter().flatten()
    }

    /// Amino `Multisignature` bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        amino::Multisignature {
            bitarray: Some(self.bit_array().to_message()),
            sigs: self.signatures().map(|p| p.signature.to_vec()).collect(),
        }
        .encode_to_vec()
    }
}
