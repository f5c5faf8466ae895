//! The seed chain.
//!
//! Each (pseudonym, server, link window) gets one base seed from the nymble
//! manager. Every time period steps the seed forward through a one-way
//! function `f`, and the nymble for that period is a second one-way function
//! `g` of the period's seed:
//!
//! ```text
//! seed_0 --f--> seed_1 --f--> seed_2 --f--> ... --f--> seed_L
//!                 |             |                        |
//!                 g             g                        g
//!                 v             v                        v
//!              nymble_1      nymble_2                 nymble_L
//! ```
//!
//! Knowing `seed_t` lets you compute every later nymble (this is what a
//! linking token hands a server), but nymbles alone tell you nothing about
//! each other, and nothing runs the chain backwards.

use crate::{
    ids::TimePeriod,
    util::ser::{self, AsnBinary, Binary, BinarySecret},
};
use rasn::{AsnType, Decode, Encode};
use std::ops::Deref;

const CONTEXT_EVOLVE: &str = "nymble-core 2024-06-01 seed chain evolve";
const CONTEXT_NYMBLE: &str = "nymble-core 2024-06-01 seed chain nymble";

/// One link in the seed chain.
#[derive(Debug, Clone, AsnType, Encode, Decode)]
#[rasn(delegate)]
pub struct Seed(BinarySecret<32>);

impl Seed {
    pub(crate) fn new(bytes: [u8; 32]) -> Self {
        Self(BinarySecret::new(bytes))
    }

    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        self.0.expose_secret()
    }

    /// Step the chain forward one time period.
    pub fn evolve(&self) -> Self {
        Self::new(blake3::derive_key(CONTEXT_EVOLVE, self.as_bytes()))
    }

    /// Step the chain forward `steps` time periods. Zero steps is a copy.
    pub fn evolve_by(&self, steps: TimePeriod) -> Self {
        let mut seed = self.clone();
        for _ in 0..steps {
            seed = seed.evolve();
        }
        seed
    }

    /// The nymble that this seed produces.
    pub fn nymble(&self) -> Nymble {
        Nymble(Binary::new(blake3::derive_key(CONTEXT_NYMBLE, self.as_bytes())))
    }
}

impl PartialEq for Seed {
    fn eq(&self, other: &Self) -> bool {
        use subtle::ConstantTimeEq;
        self.as_bytes().ct_eq(other.as_bytes()).unwrap_u8() == 1
    }
}

impl AsnBinary for Seed {}

/// The public, per-period face of a seed. This is what sits inside a ticket
/// and what a blacklist lists.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, AsnType, Encode, Decode)]
#[rasn(delegate)]
pub struct Nymble(Binary<32>);

impl Nymble {
    /// Rebuild a nymble from bytes received from elsewhere.
    pub fn try_from_slice(slice: &[u8]) -> crate::error::Result<Self> {
        Ok(Self(Binary::try_from_slice(slice)?))
    }
}

impl Deref for Nymble {
    type Target = [u8; 32];
    fn deref(&self) -> &Self::Target {
        self.0.deref()
    }
}

impl AsnBinary for Nymble {}

impl std::fmt::Display for Nymble {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", ser::base64_encode(self.0.as_ref()))
    }
}
