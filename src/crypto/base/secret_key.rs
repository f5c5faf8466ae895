use crate::{
    crypto::base::stretch_key,
    error::{Error, Result},
    util::ser::{AsnBinary, Binary, BinarySecret, BinaryVec},
};
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use rasn::{AsnType, Decode, Decoder, Encode, Encoder};
use std::ops::Deref;

/// Plaintext, plus optional AAD (additional associated data) that the seal
/// will be bound to.
#[derive(Debug, Clone, getset::Getters)]
#[getset(get = "pub")]
pub struct DataWithAAD<'msg> {
    data: &'msg [u8],
    aad: Option<Vec<u8>>,
}

impl<'msg> DataWithAAD<'msg> {
    /// Pair some data with AAD
    pub fn new(data: &'msg [u8], aad: Vec<u8>) -> Self {
        Self { data, aad: Some(aad) }
    }
}

impl<'msg> From<&'msg [u8]> for DataWithAAD<'msg> {
    fn from(data: &'msg [u8]) -> Self {
        Self { data, aad: None }
    }
}

impl<'msg, const N: usize> From<&'msg [u8; N]> for DataWithAAD<'msg> {
    fn from(data: &'msg [u8; N]) -> Self {
        Self {
            data: data.as_slice(),
            aad: None,
        }
    }
}

/// A sealed (encrypted and authenticated) value, with everything but the key
/// needed to open it.
#[derive(Debug, Clone, PartialEq, AsnType, Encode, Decode, getset::Getters)]
#[getset(get = "pub")]
pub struct Sealed {
    /// Our heroic nonce
    #[rasn(tag(explicit(0)))]
    nonce: SecretKeyNonce,
    /// The ciphertext
    #[rasn(tag(explicit(1)))]
    ciphertext: BinaryVec,
    /// The AAD the ciphertext is bound to, if any
    #[rasn(tag(explicit(2)))]
    aad: Option<BinaryVec>,
}

impl Sealed {
    fn new(nonce: SecretKeyNonce, ciphertext: Vec<u8>, aad: Option<Vec<u8>>) -> Self {
        Self {
            nonce,
            ciphertext: BinaryVec::from(ciphertext),
            aad: aad.map(BinaryVec::from),
        }
    }
}

impl AsnBinary for Sealed {}

/// A nonce for a [`SecretKey`]
#[derive(Debug, Clone, PartialEq, AsnType, Encode, Decode)]
#[rasn(choice)]
pub enum SecretKeyNonce {
    #[rasn(tag(explicit(0)))]
    XChaCha20Poly1305(Binary<24>),
}

/// A symmetric key for sealing values
#[derive(Debug, AsnType, Encode, Decode)]
#[rasn(choice)]
pub enum SecretKey {
    #[rasn(tag(explicit(0)))]
    XChaCha20Poly1305(BinarySecret<32>),
}

impl SecretKey {
    /// Create a SecretKey from a byte array
    pub fn new_xchacha20poly1305_from_bytes(secret_bytes: [u8; 32]) -> Self {
        Self::XChaCha20Poly1305(BinarySecret::new(secret_bytes))
    }

    /// Derive a purpose-specific sealing key from a root secret.
    pub fn derive(root: &[u8], info: &[u8]) -> Result<Self> {
        let mut keybytes = [0u8; 32];
        stretch_key(root, &mut keybytes, Some(info), None)?;
        Ok(Self::new_xchacha20poly1305_from_bytes(keybytes))
    }

    /// Make a nonce from a set of bytes passed in. Make sure you send enough bytes for the nonce
    /// type you want...
    pub fn make_nonce(&self, bytes: &[u8]) -> Result<SecretKeyNonce> {
        match self {
            SecretKey::XChaCha20Poly1305(_) => {
                let nonce_bytes: [u8; 24] = bytes.get(0..24).ok_or(Error::BadLength)?.try_into().map_err(|_| Error::BadLength)?;
                Ok(SecretKeyNonce::XChaCha20Poly1305(Binary::new(nonce_bytes)))
            }
        }
    }

    /// Encrypt a value with a secret key/nonce. The caller is responsible for
    /// never reusing a nonce under the same key.
    pub fn seal_with_nonce<'a, 'msg, D: Into<DataWithAAD<'msg>>>(&'a self, nonce: SecretKeyNonce, data: D) -> Result<Sealed> {
        match self {
            SecretKey::XChaCha20Poly1305(ref key) => {
                let nonce_bin = match nonce {
                    SecretKeyNonce::XChaCha20Poly1305(ref bin) => bin.deref(),
                };
                let secret: &'a [u8; 32] = key.expose_secret();
                let cipher = chacha20poly1305::XChaCha20Poly1305::new(secret.into());
                let DataWithAAD { data, aad } = data.into();
                let payload = match aad.as_ref() {
                    Some(aad) => Payload { msg: data, aad },
                    None => data.into(),
                };
                let enc = cipher
                    .encrypt(chacha20poly1305::XNonce::from_slice(nonce_bin.as_slice()), payload)
                    .map_err(|_| Error::CryptoSealFailed)?;
                Ok(Sealed::new(nonce, enc, aad))
            }
        }
    }

    /// Open a sealed value. Fails if the key is wrong or the ciphertext or AAD
    /// were touched.
    pub fn open(&self, sealed: &Sealed) -> Result<Vec<u8>> {
        match (self, sealed.nonce()) {
            (SecretKey::XChaCha20Poly1305(ref key), SecretKeyNonce::XChaCha20Poly1305(ref nonce)) => {
                let cipher = chacha20poly1305::XChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(key.expose_secret().as_slice()));
                let ciphertext = match sealed.aad().as_ref() {
                    Some(aad) => Payload {
                        msg: sealed.ciphertext().deref().as_slice(),
                        aad: aad.deref().as_slice(),
                    },
                    None => sealed.ciphertext().deref().as_slice().into(),
                };
                let dec = cipher
                    .decrypt(chacha20poly1305::XNonce::from_slice(nonce.as_slice()), ciphertext)
                    .map_err(|_| Error::CryptoOpenFailed)?;
                Ok(dec)
            }
        }
    }
}

impl Clone for SecretKey {
    fn clone(&self) -> Self {
        match self {
            Self::XChaCha20Poly1305(secret) => Self::XChaCha20Poly1305(secret.clone()),
        }
    }
}
