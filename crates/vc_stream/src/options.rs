//! Stream options, from config files or option strings.

use alloc::collections::BTreeMap;
use alloc::string::String;
use core::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::header::ContentKind;

/// Default nesting limit of object definitions inside each other.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Wire format of an output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Format {
    #[default]
    Binary,
    Ascii,
}

/// Settings of a write pass.
///
/// Deserializes from any serde format, missing keys take their defaults:
///
/// ```
/// # use vc_stream::{Format, StreamOptions};
/// let options: StreamOptions = "Ascii TargetVersion=2 CustomDomains=vcUi:1".parse().unwrap();
/// assert_eq!(options.format, Format::Ascii);
/// assert_eq!(options.target_version, Some(2));
/// assert_eq!(options.custom_domains["vcUi"], 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamOptions {
    pub format: Format,
    pub content: ContentKind,
    /// Schema version to gate properties with, the registry's latest when `None`.
    pub target_version: Option<u32>,
    /// Versions of custom domains written to the header.
    pub custom_domains: BTreeMap<String, u32>,
    /// Leaves out fields equal to their declared default.
    ///
    /// Readers then keep whatever the factory produced, so this is only
    /// lossless when factories agree with the declared defaults.
    pub omit_defaults: bool,
    pub generator: String,
    /// Deepest nesting of object definitions a pass accepts.
    pub max_depth: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            format: Format::Binary,
            content: ContentKind::Object,
            target_version: None,
            custom_domains: BTreeMap::new(),
            omit_defaults: false,
            generator: String::from(concat!("vc_archive ", env!("CARGO_PKG_VERSION"))),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// A value in an option string that could not be parsed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid value `{value}` for option `{key}`")]
pub struct OptionsError {
    pub key: String,
    pub value: String,
}

impl FromStr for StreamOptions {
    type Err = OptionsError;

    /// Parses whitespace-separated flags and `Key=Value` pairs.
    ///
    /// Unknown keys are logged and ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut options = Self::default();
        for item in s.split_whitespace() {
            let (key, value) = item.split_once('=').unwrap_or((item, ""));
            let invalid = || OptionsError {
                key: String::from(key),
                value: String::from(value),
            };
            match key {
                "Ascii" => options.format = Format::Ascii,
                "Binary" => options.format = Format::Binary,
                "OmitDefaults" => options.omit_defaults = true,
                "TargetVersion" => options.target_version = Some(value.parse().map_err(|_| invalid())?),
                "MaxDepth" => options.max_depth = value.parse().map_err(|_| invalid())?,
                "Content" => options.content = value.parse().map_err(|_| invalid())?,
                "CustomDomains" => {
                    for pair in value.split(';').filter(|pair| !pair.is_empty()) {
                        let (name, version) = pair.split_once(':').ok_or_else(invalid)?;
                        let version = version.parse().map_err(|_| invalid())?;
                        options.custom_domains.insert(String::from(name), version);
                    }
                }
                _ => warn!("ignoring unknown stream option `{item}`"),
            }
        }
        Ok(options)
    }
}
