use alloc::string::String;

use thiserror::Error;

// -----------------------------------------------------------------------------
// Error

/// Failures of the [`TypeRegistry`](crate::TypeRegistry).
///
/// `DuplicateRegistration` only happens during start-up registration,
/// the other variants are reported by lookups at (de)serialization time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistryError {
    #[error("wrapper `{0}` is already registered")]
    DuplicateRegistration(String),

    #[error("wrapper `{0}` is not registered")]
    UnknownType(String),

    #[error("wrapper `{0}` is schema-only and cannot be instantiated")]
    MissingFactory(String),
}

/// Failures of a single accessor call on a live object.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AccessError {
    #[error("instance does not contain the `{schema}` schema")]
    MissingFacet { schema: String },

    #[error("expected a {expected} value, found {found}")]
    IncompatibleValue {
        expected: &'static str,
        found: &'static str,
    },
}
