//! Utilities. Serialization helpers, and fixtures for tests.

pub(crate) mod ser;
