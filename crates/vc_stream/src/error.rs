use alloc::string::String;
use core::fmt;

use thiserror::Error;
use vc_wrap::RegistryError;

// -----------------------------------------------------------------------------
// Location

/// Position in the input where a parse error was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Byte offset into a binary stream.
    Byte(usize),
    /// One-based line of an ascii stream.
    Line(usize),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Byte(offset) => write!(f, "byte {offset}"),
            Self::Line(line) => write!(f, "line {line}"),
        }
    }
}

// -----------------------------------------------------------------------------
// StreamError

/// Failures of a read or write pass. Any failure aborts the whole pass.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StreamError {
    /// A lookup in the registry failed, e.g. an unknown type on read.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// An object to be written reports a type name without a wrapper.
    #[error("cannot write `{0}`, the type has no registered wrapper")]
    UnregisteredType(String),

    #[error("stream format version {found} is newer than the supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// A field does not fit its declared kind or could not be accessed.
    ///
    /// `path` names the field like `Start/Group/Children`.
    #[error("malformed field `{path}`: {reason}")]
    MalformedField { path: String, reason: String },

    /// Objects are nested deeper than the stream's `max_depth`.
    #[error("objects at `{path}` are nested deeper than the limit of {limit}")]
    DepthExceeded { path: String, limit: usize },

    #[error("parse error at {location}: {reason}")]
    Parse { location: Location, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StreamError {
    /// A field error whose path is filled in by the stream.
    #[inline]
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedField {
            path: String::new(),
            reason: reason.into(),
        }
    }

    #[inline]
    pub(crate) fn parse(location: Location, reason: impl Into<String>) -> Self {
        Self::Parse {
            location,
            reason: reason.into(),
        }
    }
}
