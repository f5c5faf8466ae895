//! The crypto base wraps the algorithms the protocol is built from: a digest,
//! a keyed MAC, a key stretcher, symmetric sealing, and signatures.
//!
//! The idea here is that specific algorithms are wrapped in descriptive
//! interfaces that allow high-level use of the encapsulated cryptographic
//! algorithms without needing to know the details of those algorithms.

use crate::error::{Error, Result};

mod hash;
mod hmac;
mod secret_key;
mod sign_key;

pub use hash::*;
pub use hmac::*;
pub use secret_key::*;
pub use sign_key::*;

/// The length (in bytes) of our digest output. Every long-term key in the
/// system (the PM/NM shared key, the per-server keys) is exactly this long.
pub const DIGEST_LEN: usize = 32;

/// Hash arbitrary data. An empty input is perfectly valid and has a defined
/// output.
pub fn digest(data: &[u8]) -> Hash {
    Hash::new_blake3(data)
}

/// MAC a message with a raw key. The key must be exactly [`DIGEST_LEN`] bytes.
pub fn mac(key: &[u8], message: &[u8]) -> Result<Hmac> {
    let hmac_key = HmacKey::try_from_slice(key)?;
    Hmac::new(&hmac_key, message)
}

/// Given the bytes from a secret key, derive some other key of N length in a secure manner.
pub fn stretch_key<const N: usize>(input: &[u8], output: &mut [u8; N], info: Option<&[u8]>, salt: Option<&[u8]>) -> Result<()> {
    let hkdf = hkdf::SimpleHkdf::<blake3::Hasher>::new(salt, input);
    hkdf.expand(info.unwrap_or(b"nymble/hkdf"), output)
        .map_err(|_| Error::CryptoHKDFFailed)?;
    Ok(())
}
