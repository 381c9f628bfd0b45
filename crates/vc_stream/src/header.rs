//! Stream headers.

use alloc::collections::BTreeMap;
use alloc::string::String;
use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::StreamError;

/// Leading bytes of a binary stream.
pub const BINARY_MAGIC: [u8; 8] = *b"\x89VCARC\r\n";

/// First token of an ascii stream.
pub const ASCII_MAGIC: &str = "#Ascii";

/// Layout version of the wire format itself.
///
/// Independent of the schema version used for property gating. Readers
/// refuse streams with a newer major version.
pub const WIRE_FORMAT_MAJOR: u32 = 1;

/// Fails with [`StreamError::UnsupportedVersion`] for a layout newer than ours.
pub(crate) fn check_format_major(found: u32) -> Result<(), StreamError> {
    if found > WIRE_FORMAT_MAJOR {
        return Err(StreamError::UnsupportedVersion {
            found,
            supported: WIRE_FORMAT_MAJOR,
        });
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// ContentKind

/// What the root object of a stream is meant to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ContentKind {
    Scene,
    Image,
    #[default]
    Object,
}

impl ContentKind {
    pub const fn as_u32(self) -> u32 {
        match self {
            Self::Scene => 1,
            Self::Image => 2,
            Self::Object => 3,
        }
    }

    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Scene),
            2 => Some(Self::Image),
            3 => Some(Self::Object),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Scene => "Scene",
            Self::Image => "Image",
            Self::Object => "Object",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A content kind name other than `Scene`, `Image` or `Object`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown content kind `{0}`")]
pub struct UnknownContentKind(pub String);

impl FromStr for ContentKind {
    type Err = UnknownContentKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Scene" => Ok(Self::Scene),
            "Image" => Ok(Self::Image),
            "Object" => Ok(Self::Object),
            _ => Err(UnknownContentKind(String::from(s))),
        }
    }
}

// -----------------------------------------------------------------------------
// Header

/// Everything a stream states about itself before the root object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub format_major: u32,
    pub content: ContentKind,
    /// Schema version the properties were gated with.
    pub version: u32,
    /// Versions of custom domains, overriding `version` for their wrappers.
    pub custom_domains: BTreeMap<String, u32>,
    pub generator: String,
}

impl Header {
    pub fn new(content: ContentKind, version: u32) -> Self {
        Self {
            format_major: WIRE_FORMAT_MAJOR,
            content,
            version,
            custom_domains: BTreeMap::new(),
            generator: String::new(),
        }
    }

    /// The version properties of a wrapper in `domain` are gated with.
    ///
    /// Falls back to the stream version for the default domain and for
    /// domains the stream does not list.
    pub fn domain_version(&self, domain: Option<&str>) -> u32 {
        domain
            .and_then(|name| self.custom_domains.get(name))
            .copied()
            .unwrap_or(self.version)
    }
}
