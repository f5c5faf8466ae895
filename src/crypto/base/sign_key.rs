use crate::{
    crypto::base::stretch_key,
    error::{Error, Result},
    util::ser::{AsnBinary, Binary, BinarySecret},
};
use rasn::{AsnType, Decode, Decoder, Encode, Encoder};
use std::ops::Deref;

/// A signature derived from a signing keypair.
#[derive(Debug, Clone, PartialEq, AsnType, Encode, Decode)]
#[rasn(choice)]
pub enum SignKeypairSignature {
    #[rasn(tag(explicit(0)))]
    Ed25519(Binary<64>),
}

impl AsRef<[u8]> for SignKeypairSignature {
    fn as_ref(&self) -> &[u8] {
        match self {
            Self::Ed25519(sig) => sig.as_ref(),
        }
    }
}

impl AsnBinary for SignKeypairSignature {}

/// An asymmetric signing keypair. Unlike the public half, this never leaves
/// the entity that owns it.
#[derive(Debug, AsnType, Encode, Decode)]
#[rasn(choice)]
pub enum SignKeypair {
    /// Ed25519 signing keypair
    #[rasn(tag(explicit(0)))]
    Ed25519 {
        #[rasn(tag(explicit(0)))]
        public: Binary<32>,
        #[rasn(tag(explicit(1)))]
        secret: BinarySecret<32>,
    },
}

impl SignKeypair {
    /// Create a new ed25519 keypair from a cryptographic seed
    pub fn new_ed25519_from_bytes(secret_bytes: [u8; 32]) -> Self {
        let secret = ed25519_consensus::SigningKey::from(secret_bytes);
        let public = secret.verification_key();
        Self::Ed25519 {
            public: Binary::new(public.to_bytes()),
            secret: BinarySecret::new(secret.to_bytes()),
        }
    }

    /// Deterministically derive an ed25519 keypair from a root secret. The
    /// same root and info always produce the same keypair.
    pub fn derive_ed25519(root: &[u8], info: &[u8]) -> Result<Self> {
        let mut seed = [0u8; 32];
        stretch_key(root, &mut seed, Some(info), None)?;
        Ok(Self::new_ed25519_from_bytes(seed))
    }

    /// Sign a value with our secret key.
    pub fn sign(&self, data: &[u8]) -> Result<SignKeypairSignature> {
        match self {
            Self::Ed25519 { secret, .. } => {
                let seckey = ed25519_consensus::SigningKey::from(*secret.expose_secret());
                let sig_obj = seckey.sign(data);
                Ok(SignKeypairSignature::Ed25519(Binary::new(sig_obj.to_bytes())))
            }
        }
    }

    /// Grab the public half of this keypair.
    pub fn public(&self) -> SignKeypairPublic {
        match self {
            Self::Ed25519 { public, .. } => SignKeypairPublic::Ed25519(public.clone()),
        }
    }
}

/// An asymmetric signing public key.
#[derive(Debug, Clone, PartialEq, AsnType, Encode, Decode)]
#[rasn(choice)]
pub enum SignKeypairPublic {
    /// Ed25519 signing public key
    #[rasn(tag(explicit(0)))]
    Ed25519(Binary<32>),
}

impl SignKeypairPublic {
    /// Verify a value with a detached signature given the public key of the
    /// signer.
    pub fn verify(&self, signature: &SignKeypairSignature, data: &[u8]) -> Result<()> {
        match (self, signature) {
            (Self::Ed25519(pubkey_bytes), SignKeypairSignature::Ed25519(sig_bytes)) => {
                let pubkey = ed25519_consensus::VerificationKey::try_from(*pubkey_bytes.deref())
                    .map_err(|_| Error::CryptoSignatureVerificationFailed)?;
                let sig = ed25519_consensus::Signature::from(*sig_bytes.deref());
                pubkey.verify(&sig, data).map_err(|_| Error::CryptoSignatureVerificationFailed)?;
                Ok(())
            }
        }
    }
}

impl AsnBinary for SignKeypairPublic {}
