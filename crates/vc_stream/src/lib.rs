#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod error;
mod ids;
mod input;
mod options;
mod output;
mod path;

pub mod file;
pub mod format;
pub mod header;

#[cfg(test)]
mod tests;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use error::{Location, StreamError};
pub use file::{from_bytes, from_bytes_with, load, load_with_header, save, save_with, to_bytes};
pub use header::{ContentKind, Header, UnknownContentKind, WIRE_FORMAT_MAJOR};
pub use input::InputStream;
pub use options::{DEFAULT_MAX_DEPTH, Format, OptionsError, StreamOptions};
pub use output::OutputStream;
