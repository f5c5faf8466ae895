//! The main error enum for the project lives here, and documents the various
//! conditions that can arise while interacting with the system.
//!
//! Note that most protocol outcomes (a ticket that doesn't verify, a server we
//! don't know about, a stale blacklist) are *not* errors. Those come back as
//! `bool` or `Option`. Errors are reserved for arguments that are present but
//! invalid, and for the (rare) failure of an underlying primitive.

use thiserror::Error;

/// This is our error enum. It contains an entry for any part of the system in
/// which an expectation is not met or a problem occurs.
#[derive(Error, Debug)]
pub enum Error {
    /// An error while encoding to DER.
    #[error("ASN.1 serialization error")]
    ASNSerialize(#[from] rasn::error::EncodeError),

    /// An error while decoding DER.
    #[error("ASN.1 deserialization error")]
    ASNDeserialize(#[from] rasn::error::DecodeError),

    /// A byte slice was the wrong length for the value being built from it.
    #[error("incorrect length for value")]
    BadLength,

    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// The configuration could not be parsed.
    #[error("yaml configuration error")]
    ConfigYaml(#[from] serde_yaml::Error),

    /// Bad key.
    #[error("key is invalid")]
    CryptoBadKey,

    /// Failed to expand a root key into a subkey.
    #[error("HKDF expansion failed")]
    CryptoHKDFFailed,

    /// An HMAC failed to verify.
    #[error("the given HMAC combo does not verify")]
    CryptoHmacVerificationFailed,

    /// Failed to open a sealed object.
    #[error("failed to open a sealed object")]
    CryptoOpenFailed,

    /// Failed to seal an object.
    #[error("failed to seal an object")]
    CryptoSealFailed,

    /// A signature failed to verify.
    #[error("the given signature/public key/data combo does not verify")]
    CryptoSignatureVerificationFailed,

    /// An identifier (server id, user id) was given as an empty byte string.
    #[error("identifier cannot be empty")]
    IdentifierEmpty,

    /// Link windows start at 1.
    #[error("link window must be at least 1")]
    LinkWindowInvalid,

    /// A ticket opened fine but its contents don't agree with each other (the
    /// sealed seed doesn't produce the ticket's nymble, or was sealed for a
    /// different context).
    #[error("ticket contents are inconsistent")]
    TicketInvalid,
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        // rasn/yaml errors can't be compared directly, so compare the debug
        // output instead. only really used by tests.
        format!("{:?}", self) == format!("{:?}", other)
    }
}

/// Wraps `std::result::Result` around our `Error` enum
pub type Result<T> = std::result::Result<T, Error>;
