//! Amino binary messages
//!
//! Legacy amino shares the protobuf wire format for these structs; the
//! registered type prefix is prepended by the caller where one applies.

/// Bit array of signer slots
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CompactBitArray {
    #[prost(uint32, tag = "1")]
    pub extra_bits_stored: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub elems: Vec<u8>,
}

/// `tendermint/PubKeyMultisigThreshold` signature body
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Multisignature {
    #[prost(message, optional, tag = "1")]
    pub bitarray: Option<CompactBitArray>,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub sigs: Vec<Vec<u8>>,
}

/// `tendermint/PubKeyMultisigThreshold` key body; members are prefixed
/// amino key encodings
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LegacyAminoPubKey {
    #[prost(uint32, tag = "1")]
    pub threshold: u32,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub public_keys: Vec<Vec<u8>>,
}
