use crate::{
    crypto::base::stretch_key,
    error::{Error, Result},
    util::ser::{AsnBinary, Binary, BinarySecret},
};
use hmac::{Mac, SimpleHmac};
use rand::{CryptoRng, RngCore};
use rasn::{AsnType, Decode, Encode};
use std::ops::Deref;
use subtle::{Choice, ConstantTimeEq};

/// A key for deriving an HMAC.
///
/// This is also the shape of every long-term secret in the system: the key
/// shared between the pseudonym and nymble managers, and the per-server keys
/// the nymble manager hands out at registration.
#[derive(Debug, AsnType, Encode, Decode)]
#[rasn(choice)]
pub enum HmacKey {
    /// Blake3 HMAC key
    #[rasn(tag(explicit(0)))]
    Blake3(BinarySecret<32>),
}

impl HmacKey {
    /// Create a new blake3 HMAC key
    pub fn new_blake3<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut randbuf = [0u8; 32];
        rng.fill_bytes(&mut randbuf);
        Self::Blake3(BinarySecret::new(randbuf))
    }

    /// Create a new blake3 HMAC key from a byte array
    pub fn new_blake3_from_bytes(keybytes: [u8; 32]) -> Self {
        Self::Blake3(BinarySecret::new(keybytes))
    }

    /// Create a blake3 HMAC key from a byte slice. Anything that isn't exactly
    /// 32 bytes (including an empty slice) is rejected.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self> {
        Ok(Self::Blake3(BinarySecret::try_from_slice(slice)?))
    }

    /// Derive a purpose-specific HMAC key from a root secret.
    pub fn derive(root: &[u8], info: &[u8]) -> Result<Self> {
        let mut keybytes = [0u8; 32];
        stretch_key(root, &mut keybytes, Some(info), None)?;
        Ok(Self::new_blake3_from_bytes(keybytes))
    }

    /// Grab the raw key bytes.
    pub fn expose_secret(&self) -> &[u8] {
        match self {
            Self::Blake3(key) => key.expose_secret(),
        }
    }
}

impl Clone for HmacKey {
    fn clone(&self) -> Self {
        match self {
            Self::Blake3(secret) => Self::Blake3(secret.clone()),
        }
    }
}

impl ConstantTimeEq for HmacKey {
    fn ct_eq(&self, other: &Self) -> Choice {
        match (self, other) {
            (Self::Blake3(key1), Self::Blake3(key2)) => key1.expose_secret().ct_eq(key2.expose_secret()),
        }
    }
}

impl PartialEq for HmacKey {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).unwrap_u8() == 1
    }
}

impl AsnBinary for HmacKey {}

/// An HMAC
#[derive(Debug, Clone, AsnType, Encode, Decode)]
#[rasn(choice)]
pub enum Hmac {
    /// HMAC over blake3. Blake3 has a keyed mode of its own, but going through
    /// HMAC keeps the door open for hashes that need it.
    #[rasn(tag(explicit(0)))]
    Blake3(Binary<32>),
}

impl Hmac {
    /// MAC some data.
    pub fn new(hmac_key: &HmacKey, data: &[u8]) -> Result<Self> {
        match hmac_key {
            HmacKey::Blake3(hmac_key) => {
                let mut hmac =
                    SimpleHmac::<blake3::Hasher>::new_from_slice(hmac_key.expose_secret().as_slice()).map_err(|_| Error::CryptoBadKey)?;
                hmac.update(data);
                let result = hmac.finalize();
                let gen_arr = result.into_bytes();
                let arr: [u8; 32] = gen_arr.as_slice().try_into().map_err(|_| Error::BadLength)?;
                Ok(Hmac::Blake3(Binary::new(arr)))
            }
        }
    }

    /// Rebuild an HMAC from a byte slice received from elsewhere.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self> {
        Ok(Self::Blake3(Binary::try_from_slice(slice)?))
    }

    /// Check this MAC against some data, in constant time.
    pub fn verify(&self, hmac_key: &HmacKey, data: &[u8]) -> Result<()> {
        match (self, hmac_key) {
            (Self::Blake3(hmac), HmacKey::Blake3(hmac_key)) => {
                let mut hmac_ver =
                    SimpleHmac::<blake3::Hasher>::new_from_slice(hmac_key.expose_secret().as_slice()).map_err(|_| Error::CryptoBadKey)?;
                hmac_ver.update(data);
                hmac_ver
                    .verify_slice(hmac.as_ref())
                    .map_err(|_| Error::CryptoHmacVerificationFailed)?;
            }
        }
        Ok(())
    }
}

impl Deref for Hmac {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        match self {
            Hmac::Blake3(bytes) => &(bytes.deref())[..],
        }
    }
}

impl ConstantTimeEq for Hmac {
    fn ct_eq(&self, other: &Self) -> Choice {
        match (self, other) {
            (Hmac::Blake3(bytes1), Hmac::Blake3(bytes2)) => bytes1.deref().ct_eq(bytes2.deref()),
        }
    }
}

impl PartialEq for Hmac {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).unwrap_u8() == 1
    }
}

impl Eq for Hmac {}

impl AsnBinary for Hmac {}
