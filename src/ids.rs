//! Identifiers that flow between roles: server ids, pseudonyms, and the time
//! coordinates (link window, time period) everything is bound to.

use crate::{
    error::{Error, Result},
    util::ser::{self, AsnBinary, Binary, BinaryVec},
};
use rasn::{AsnType, Decode, Encode};
use std::ops::Deref;

/// An epoch of `L` time periods. Link windows start at `1`.
pub type LinkWindow = u32;

/// A time period within a link window, in `[1, L]`.
pub type TimePeriod = u32;

/// Identifies a server (a relying party). Arbitrary bytes, but never empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, AsnType, Encode, Decode)]
#[rasn(delegate)]
pub struct ServerId(BinaryVec);

impl ServerId {
    /// Create a server id. Empty ids are rejected.
    pub fn new<T: Into<Vec<u8>>>(bytes: T) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            Err(Error::IdentifierEmpty)?;
        }
        Ok(Self(BinaryVec::from(bytes)))
    }

    /// The raw id bytes
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl AsnBinary for ServerId {}

impl std::fmt::Display for ServerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", ser::base64_encode(self.as_bytes()))
    }
}

/// A user's handle for one link window, issued by the pseudonym manager. It
/// can't be tied back to the user's real identity without the PM's key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, AsnType, Encode, Decode)]
#[rasn(delegate)]
pub struct Pseudonym(Binary<32>);

impl Pseudonym {
    pub(crate) fn new(bytes: [u8; 32]) -> Self {
        Self(Binary::new(bytes))
    }

    /// Rebuild a pseudonym from bytes received from elsewhere. Must be exactly
    /// 32 bytes.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self> {
        Ok(Self(Binary::try_from_slice(slice)?))
    }
}

impl Deref for Pseudonym {
    type Target = [u8; 32];
    fn deref(&self) -> &Self::Target {
        self.0.deref()
    }
}

impl AsnBinary for Pseudonym {}

impl std::fmt::Display for Pseudonym {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", ser::base64_encode(self.0.as_ref()))
    }
}
