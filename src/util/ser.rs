//! Helpful serialization tools.
//!
//! Everything that crosses a boundary (network, disk) is encoded as DER via
//! `rasn`. The byte containers here know how to present themselves to `rasn` as
//! plain OCTET STRINGs so the derived encoders on our structs stay simple.

use crate::error::Result;
use base64::Engine;
use rasn::{
    types::{constraints::Constraints, Identifier, OctetString, Tag},
    AsnType, Decode, Decoder, Encode, Encoder,
};
use std::ops::Deref;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub(crate) fn serialize<T: Encode>(obj: &T) -> Result<Vec<u8>> {
    Ok(rasn::der::encode(obj)?)
}

pub(crate) fn deserialize<T: Decode>(bytes: &[u8]) -> Result<T> {
    Ok(rasn::der::decode::<T>(bytes)?)
}

/// Convert bytes to base64
pub fn base64_encode<T: AsRef<[u8]>>(bytes: T) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes.as_ref())
}

/// A default implementation for (de)serializing an object to or from binary
/// format. This is what callers use to hand our objects to the network or to
/// storage.
pub trait AsnBinary: Encode + Decode {
    /// Serialize this object
    fn serialize_binary(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    /// Deserialize this object
    fn deserialize_binary(slice: &[u8]) -> Result<Self> {
        deserialize(slice)
    }
}

/// A fixed-length byte array that encodes as an OCTET STRING.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Binary<const N: usize>([u8; N]);

impl<const N: usize> Binary<N> {
    /// Wrap a byte array
    pub fn new(bytes: [u8; N]) -> Self {
        Self(bytes)
    }

    /// Build from a slice, which must be exactly `N` bytes long.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self> {
        let arr: [u8; N] = slice.try_into().map_err(|_| crate::error::Error::BadLength)?;
        Ok(Self(arr))
    }
}

impl<const N: usize> Deref for Binary<N> {
    type Target = [u8; N];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const N: usize> AsRef<[u8]> for Binary<N> {
    fn as_ref(&self) -> &[u8] {
        &self.0[..]
    }
}

impl<const N: usize> AsnType for Binary<N> {
    const TAG: Tag = <[u8; N] as AsnType>::TAG;
    const IDENTIFIER: Identifier = <[u8; N] as AsnType>::IDENTIFIER;
}

impl<const N: usize> Encode for Binary<N> {
    fn encode_with_tag_and_constraints<'encoder, E: Encoder<'encoder>>(
        &self,
        encoder: &mut E,
        tag: Tag,
        constraints: Constraints,
        identifier: Identifier,
    ) -> std::result::Result<(), E::Error> {
        self.0.encode_with_tag_and_constraints(encoder, tag, constraints, identifier)
    }
}

impl<const N: usize> Decode for Binary<N> {
    fn decode_with_tag_and_constraints<D: Decoder>(decoder: &mut D, tag: Tag, constraints: Constraints) -> std::result::Result<Self, D::Error> {
        Ok(Self(<[u8; N]>::decode_with_tag_and_constraints(decoder, tag, constraints)?))
    }
}

/// A fixed-length byte array holding secret material. Zeroed on drop, and
/// never printed.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct BinarySecret<const N: usize>([u8; N]);

impl<const N: usize> BinarySecret<N> {
    /// Wrap a secret byte array
    pub fn new(bytes: [u8; N]) -> Self {
        Self(bytes)
    }

    /// Build from a slice, which must be exactly `N` bytes long.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self> {
        let arr: [u8; N] = slice.try_into().map_err(|_| crate::error::Error::BadLength)?;
        Ok(Self(arr))
    }

    /// Grab the secret bytes. Try not to hold onto them.
    pub fn expose_secret(&self) -> &[u8; N] {
        &self.0
    }
}

impl<const N: usize> Clone for BinarySecret<N> {
    fn clone(&self) -> Self {
        Self(self.0)
    }
}

impl<const N: usize> std::fmt::Debug for BinarySecret<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BinarySecret<{}>(<redacted>)", N)
    }
}

impl<const N: usize> AsnType for BinarySecret<N> {
    const TAG: Tag = <[u8; N] as AsnType>::TAG;
    const IDENTIFIER: Identifier = <[u8; N] as AsnType>::IDENTIFIER;
}

impl<const N: usize> Encode for BinarySecret<N> {
    fn encode_with_tag_and_constraints<'encoder, E: Encoder<'encoder>>(
        &self,
        encoder: &mut E,
        tag: Tag,
        constraints: Constraints,
        identifier: Identifier,
    ) -> std::result::Result<(), E::Error> {
        self.0.encode_with_tag_and_constraints(encoder, tag, constraints, identifier)
    }
}

impl<const N: usize> Decode for BinarySecret<N> {
    fn decode_with_tag_and_constraints<D: Decoder>(decoder: &mut D, tag: Tag, constraints: Constraints) -> std::result::Result<Self, D::Error> {
        Ok(Self(<[u8; N]>::decode_with_tag_and_constraints(decoder, tag, constraints)?))
    }
}

/// A variable-length byte vector that encodes as an OCTET STRING.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BinaryVec(Vec<u8>);

impl Deref for BinaryVec {
    type Target = Vec<u8>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<u8>> for BinaryVec {
    fn from(vec: Vec<u8>) -> Self {
        Self(vec)
    }
}

impl AsnType for BinaryVec {
    const TAG: Tag = Tag::OCTET_STRING;
    const IDENTIFIER: Identifier = <OctetString as AsnType>::IDENTIFIER;
}

impl Encode for BinaryVec {
    fn encode_with_tag_and_constraints<'encoder, E: Encoder<'encoder>>(
        &self,
        encoder: &mut E,
        tag: Tag,
        constraints: Constraints,
        identifier: Identifier,
    ) -> std::result::Result<(), E::Error> {
        OctetString::from(self.0.clone()).encode_with_tag_and_constraints(encoder, tag, constraints, identifier)
    }
}

impl Decode for BinaryVec {
    fn decode_with_tag_and_constraints<D: Decoder>(decoder: &mut D, tag: Tag, constraints: Constraints) -> std::result::Result<Self, D::Error> {
        let octets = OctetString::decode_with_tag_and_constraints(decoder, tag, constraints)?;
        Ok(Self(octets.to_vec()))
    }
}
