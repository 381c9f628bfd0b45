//! Wire formats.
//!
//! A format is a [`FieldSink`] and a [`FieldSource`]. They only know how
//! tokens are laid out; walking wrappers, id tables and version gates is
//! done once by [`OutputStream`](crate::OutputStream) and
//! [`InputStream`](crate::InputStream).

use alloc::string::String;
use alloc::vec::Vec;

use vc_wrap::{PropertyKind, Value};

use crate::error::{Location, StreamError};
use crate::header::Header;

pub mod ascii;
pub mod binary;

// -----------------------------------------------------------------------------
// Tokens

/// The start of an object slot as read from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectToken {
    Null,
    /// An id that is meant to be defined earlier in the stream.
    Reference { id: u32 },
    /// The first occurrence of an id, its fields follow.
    Definition {
        id: u32,
        type_name: String,
        class_version: u32,
    },
}

/// The start of a field as read from the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldHeader {
    pub name: String,
    /// Kind stated by self-describing formats.
    pub kind: Option<PropertyKind>,
}

// -----------------------------------------------------------------------------
// FieldSink

/// Output side of a wire format.
///
/// Writing into memory cannot fail; only values that do not fit the kind
/// they are written as are reported.
pub trait FieldSink {
    fn write_header(&mut self, header: &Header);

    fn write_null(&mut self);

    fn write_reference(&mut self, id: u32, type_name: &str, class_version: u32);

    fn begin_definition(&mut self, id: u32, type_name: &str, class_version: u32);

    fn end_definition(&mut self);

    fn begin_field(&mut self, name: &str, kind: &PropertyKind);

    fn end_field(&mut self) {}

    /// Writes a value of any kind except `OBJECT` and `LIST`.
    fn write_scalar(&mut self, kind: &PropertyKind, value: &Value) -> Result<(), StreamError>;

    fn begin_list(&mut self, element: &PropertyKind, len: usize);

    fn end_list(&mut self);

    fn into_bytes(self) -> Vec<u8>;
}

// -----------------------------------------------------------------------------
// FieldSource

/// Input side of a wire format.
pub trait FieldSource {
    /// Reads the header, failing early on a newer wire format.
    fn read_header(&mut self) -> Result<Header, StreamError>;

    /// Reads the start of an object slot.
    ///
    /// `is_known` tells whether an id was already defined. Formats that
    /// cannot tell a back-reference from a definition on their own use it to
    /// decide.
    fn read_object_token(&mut self, is_known: &dyn Fn(u32) -> bool) -> Result<ObjectToken, StreamError>;

    /// Returns the next field of the current definition, or `None` once its
    /// end marker was consumed.
    fn next_field(&mut self) -> Result<Option<FieldHeader>, StreamError>;

    /// Skips the value of a field whose header carried no kind.
    fn skip_field(&mut self) -> Result<(), StreamError>;

    /// For a field whose header carried no kind, the type name of the object
    /// definition its value opens, if it opens one.
    ///
    /// Such a value can be read as an `OBJECT` instead of being skipped, so
    /// that later back-references to it resolve.
    fn peek_definition(&self) -> Option<String> {
        None
    }

    /// Reads a value of any kind except `OBJECT` and `LIST`.
    fn read_scalar(&mut self, kind: &PropertyKind) -> Result<Value, StreamError>;

    /// Reads the element count of a list.
    fn begin_list(&mut self) -> Result<usize, StreamError>;

    fn end_list(&mut self) -> Result<(), StreamError>;

    fn location(&self) -> Location;
}

fn mismatch(kind: &PropertyKind, value: &Value) -> StreamError {
    StreamError::malformed(alloc::format!(
        "{} value cannot be written as {kind}",
        value.variant_name()
    ))
}
