//! Whole-archive reads and writes.

use alloc::vec::Vec;
use std::io::{Read, Write};

use vc_wrap::{ObjectRef, TypeRegistry};

use crate::error::{Location, StreamError};
use crate::format::{FieldSink, FieldSource};
use crate::format::ascii::{AsciiSink, AsciiSource};
use crate::format::binary::{BinarySink, BinarySource};
use crate::header::Header;
use crate::input::InputStream;
use crate::options::{Format, StreamOptions};
use crate::output::OutputStream;

/// Reads an archive, detecting its format.
///
/// A null root is an error.
pub fn load(registry: &TypeRegistry, source: impl Read) -> Result<ObjectRef, StreamError> {
    load_with_header(registry, source).map(|(_, root)| root)
}

/// Like [`load`], also returning the stream header.
pub fn load_with_header(registry: &TypeRegistry, mut source: impl Read) -> Result<(Header, ObjectRef), StreamError> {
    let mut bytes = Vec::new();
    source.read_to_end(&mut bytes)?;
    from_bytes(registry, &bytes)
}

/// Decodes an archive held in memory.
pub fn from_bytes(registry: &TypeRegistry, bytes: &[u8]) -> Result<(Header, ObjectRef), StreamError> {
    from_bytes_with(registry, bytes, &StreamOptions::default())
}

/// Like [`from_bytes`], with the nesting limit taken from `options`.
///
/// The other options describe output and are ignored, the header states them.
pub fn from_bytes_with(
    registry: &TypeRegistry,
    bytes: &[u8],
    options: &StreamOptions,
) -> Result<(Header, ObjectRef), StreamError> {
    if BinarySource::detect(bytes) {
        let stream = InputStream::new(registry, BinarySource::new(bytes))?;
        return read_root(stream.with_max_depth(options.max_depth));
    }
    match core::str::from_utf8(bytes) {
        Ok(text) if AsciiSource::detect(text) => {
            let stream = InputStream::new(registry, AsciiSource::new(text))?;
            read_root(stream.with_max_depth(options.max_depth))
        }
        _ => Err(StreamError::parse(Location::Byte(0), "unrecognized archive format")),
    }
}

fn read_root<S: FieldSource>(
    mut stream: InputStream<'_, S>,
) -> Result<(Header, ObjectRef), StreamError> {
    match stream.read_object()? {
        Some(root) => Ok((stream.header().clone(), root)),
        None => Err(StreamError::parse(stream.location(), "root object is null")),
    }
}

/// Writes `root` as a binary archive at `target_version`.
pub fn save(
    registry: &TypeRegistry,
    root: &ObjectRef,
    sink: impl Write,
    target_version: u32,
) -> Result<(), StreamError> {
    let options = StreamOptions {
        target_version: Some(target_version),
        ..StreamOptions::default()
    };
    save_with(registry, root, sink, &options)
}

/// Writes `root` with explicit options.
///
/// Nothing reaches `sink` unless the whole graph was encoded.
pub fn save_with(
    registry: &TypeRegistry,
    root: &ObjectRef,
    mut sink: impl Write,
    options: &StreamOptions,
) -> Result<(), StreamError> {
    let bytes = to_bytes(registry, root, options)?;
    sink.write_all(&bytes)?;
    sink.flush()?;
    Ok(())
}

/// Encodes `root` into memory.
pub fn to_bytes(registry: &TypeRegistry, root: &ObjectRef, options: &StreamOptions) -> Result<Vec<u8>, StreamError> {
    match options.format {
        Format::Binary => encode(OutputStream::new(registry, BinarySink::new(), options), root),
        Format::Ascii => encode(OutputStream::new(registry, AsciiSink::new(), options), root),
    }
}

fn encode<S: FieldSink>(mut stream: OutputStream<'_, S>, root: &ObjectRef) -> Result<Vec<u8>, StreamError> {
    stream.write_root(root)?;
    Ok(stream.finish())
}
