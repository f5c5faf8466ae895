use crate::util::ser::{self, AsnBinary, Binary};
use rasn::{AsnType, Decode, Encode};
use std::ops::Deref;

/// A cryptographic hash. By defining this as an enum, we allow expansion of
/// hash algorithms in the future.
#[derive(Clone, Debug, PartialEq, Eq, AsnType, Encode, Decode)]
#[rasn(choice)]
pub enum Hash {
    /// Blake3 256bit hash
    #[rasn(tag(explicit(0)))]
    Blake3(Binary<32>),
}

impl Hash {
    /// Create a new blake3 (256 bit) hash from a message
    pub fn new_blake3(message: &[u8]) -> Self {
        let hash = blake3::hash(message);
        Self::Blake3(Binary::new(*hash.as_bytes()))
    }

    /// Return the byte slice representing this hash.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Blake3(bin) => bin.deref(),
        }
    }
}

impl AsnBinary for Hash {}

impl std::fmt::Display for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", ser::base64_encode(self.as_bytes()))
    }
}
