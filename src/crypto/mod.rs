//! The crypto module contains our cryptographic primitives: hashing, MACs,
//! sealing (symmetric authenticated encryption), and signing.

pub mod base;
