//! Little-endian binary format.
//!
//! Strings, blobs and lists are prefixed with a `u32` length. Every field
//! carries its kind descriptor, so readers can decode fields they have no
//! declaration for.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use vc_wrap::{KindTag, PropertyKind, Value};

use super::{FieldHeader, FieldSink, FieldSource, ObjectToken, mismatch};
use crate::error::{Location, StreamError};
use crate::header::{BINARY_MAGIC, ContentKind, Header, check_format_major};

/// Header attribute bit: custom domain versions follow.
const ATTR_CUSTOM_DOMAINS: u32 = 0x1;

/// Nesting limit of list descriptors.
const MAX_KIND_DEPTH: usize = 16;

// -----------------------------------------------------------------------------
// BinarySink

#[derive(Debug, Default)]
pub struct BinarySink {
    buf: Vec<u8>,
}

impl BinarySink {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    #[inline]
    fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    #[inline]
    fn put_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn put_f32s(&mut self, values: &[f32]) {
        for value in values {
            self.buf.extend_from_slice(&value.to_le_bytes());
        }
    }

    fn put_f64s(&mut self, values: &[f64]) {
        for value in values {
            self.buf.extend_from_slice(&value.to_le_bytes());
        }
    }

    fn put_bytes(&mut self, bytes: &[u8]) {
        self.put_u32(bytes.len() as u32);
        self.buf.extend_from_slice(bytes);
    }

    #[inline]
    fn put_str(&mut self, value: &str) {
        self.put_bytes(value.as_bytes());
    }

    fn put_kind(&mut self, kind: &PropertyKind) {
        self.put_u8(kind.tag() as u8);
        if let PropertyKind::List(element) = kind {
            self.put_kind(element);
        }
    }
}

impl FieldSink for BinarySink {
    fn write_header(&mut self, header: &Header) {
        self.buf.extend_from_slice(&BINARY_MAGIC);
        self.put_u32(header.format_major);
        self.put_u32(header.content.as_u32());
        self.put_u32(header.version);
        if header.custom_domains.is_empty() {
            self.put_u32(0);
        } else {
            self.put_u32(ATTR_CUSTOM_DOMAINS);
            self.put_u32(header.custom_domains.len() as u32);
            for (name, version) in &header.custom_domains {
                self.put_str(name);
                self.put_u32(*version);
            }
        }
        self.put_str(&header.generator);
    }

    fn write_null(&mut self) {
        self.put_u32(0);
    }

    fn write_reference(&mut self, id: u32, _type_name: &str, _class_version: u32) {
        self.put_u32(id);
    }

    fn begin_definition(&mut self, id: u32, type_name: &str, class_version: u32) {
        self.put_u32(id);
        self.put_str(type_name);
        self.put_u32(class_version);
    }

    fn end_definition(&mut self) {
        // An empty field name ends the object.
        self.put_u32(0);
    }

    fn begin_field(&mut self, name: &str, kind: &PropertyKind) {
        self.put_str(name);
        self.put_kind(kind);
    }

    fn write_scalar(&mut self, kind: &PropertyKind, value: &Value) -> Result<(), StreamError> {
        use PropertyKind as K;

        match (kind, value) {
            (K::Bool, Value::Bool(v)) => self.put_u8(u8::from(*v)),
            (K::Int | K::Enum(_), Value::Int(v)) => self.put_i32(*v),
            (K::UInt | K::GlEnum | K::HexInt, Value::UInt(v)) => self.put_u32(*v),
            (K::Float, Value::Float(v)) => self.put_f32s(&[*v]),
            (K::Double, Value::Double(v)) => self.put_f64s(&[*v]),
            (K::String, Value::String(v)) => self.put_str(v),
            (K::Vec2f, Value::Vec2f(v)) => self.put_f32s(v),
            (K::Vec3f, Value::Vec3f(v)) => self.put_f32s(v),
            (K::Vec4f, Value::Vec4f(v)) => self.put_f32s(v),
            (K::Vec2d, Value::Vec2d(v)) => self.put_f64s(v),
            (K::Vec3d, Value::Vec3d(v)) => self.put_f64s(v),
            (K::Vec4d | K::Quat, Value::Vec4d(v)) => self.put_f64s(v),
            (K::Matrix, Value::Matrix(v)) => self.put_f64s(v),
            (K::Blob, Value::Blob(v)) => self.put_bytes(v),
            _ => return Err(mismatch(kind, value)),
        }
        Ok(())
    }

    fn begin_list(&mut self, _element: &PropertyKind, len: usize) {
        self.put_u32(len as u32);
    }

    fn end_list(&mut self) {}

    #[inline]
    fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

// -----------------------------------------------------------------------------
// BinarySource

#[derive(Debug)]
pub struct BinarySource<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BinarySource<'a> {
    #[inline]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Returns `true` if `bytes` starts like a binary stream.
    #[inline]
    pub fn detect(bytes: &[u8]) -> bool {
        bytes.starts_with(&BINARY_MAGIC)
    }

    #[inline]
    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], StreamError> {
        if len > self.remaining() {
            return Err(StreamError::parse(
                Location::Byte(self.pos),
                alloc::format!("unexpected end of input, {len} bytes needed"),
            ));
        }
        let bytes = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], StreamError> {
        let mut out = [0; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    #[inline]
    fn u32(&mut self) -> Result<u32, StreamError> {
        self.array().map(u32::from_le_bytes)
    }

    #[inline]
    fn i32(&mut self) -> Result<i32, StreamError> {
        self.array().map(i32::from_le_bytes)
    }

    fn f32s<const N: usize>(&mut self) -> Result<[f32; N], StreamError> {
        let mut out = [0.0; N];
        for slot in &mut out {
            *slot = f32::from_le_bytes(self.array()?);
        }
        Ok(out)
    }

    fn f64s<const N: usize>(&mut self) -> Result<[f64; N], StreamError> {
        let mut out = [0.0; N];
        for slot in &mut out {
            *slot = f64::from_le_bytes(self.array()?);
        }
        Ok(out)
    }

    fn bytes(&mut self) -> Result<&'a [u8], StreamError> {
        let len = self.u32()? as usize;
        self.take(len)
    }

    fn string(&mut self) -> Result<String, StreamError> {
        let start = self.pos;
        let bytes = self.bytes()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| StreamError::parse(Location::Byte(start), "string is not valid UTF-8"))
    }

    fn kind(&mut self, depth: usize) -> Result<PropertyKind, StreamError> {
        let [byte] = self.array()?;
        let Some(tag) = KindTag::from_u8(byte) else {
            return Err(StreamError::malformed(alloc::format!(
                "unknown kind tag {byte:#04x} at byte {}",
                self.pos - 1
            )));
        };
        match tag.simple_kind() {
            Some(kind) => Ok(kind),
            None if depth < MAX_KIND_DEPTH => Ok(PropertyKind::list(self.kind(depth + 1)?)),
            None => Err(StreamError::malformed("list descriptor nested too deeply")),
        }
    }
}

impl FieldSource for BinarySource<'_> {
    fn read_header(&mut self) -> Result<Header, StreamError> {
        if self.array::<8>()? != BINARY_MAGIC {
            return Err(StreamError::parse(Location::Byte(0), "not a binary archive"));
        }
        let format_major = self.u32()?;
        check_format_major(format_major)?;

        let at = self.pos;
        let content = ContentKind::from_u32(self.u32()?)
            .ok_or_else(|| StreamError::parse(Location::Byte(at), "unknown content kind"))?;
        let version = self.u32()?;
        let attributes = self.u32()?;

        let mut custom_domains = BTreeMap::new();
        if attributes & ATTR_CUSTOM_DOMAINS != 0 {
            let count = self.u32()?;
            for _ in 0..count {
                let name = self.string()?;
                custom_domains.insert(name, self.u32()?);
            }
        }
        let generator = self.string()?;

        Ok(Header {
            format_major,
            content,
            version,
            custom_domains,
            generator,
        })
    }

    fn read_object_token(&mut self, is_known: &dyn Fn(u32) -> bool) -> Result<ObjectToken, StreamError> {
        let id = self.u32()?;
        if id == 0 {
            return Ok(ObjectToken::Null);
        }
        if is_known(id) {
            return Ok(ObjectToken::Reference { id });
        }
        let type_name = self.string()?;
        let class_version = self.u32()?;
        Ok(ObjectToken::Definition {
            id,
            type_name,
            class_version,
        })
    }

    fn next_field(&mut self) -> Result<Option<FieldHeader>, StreamError> {
        let name = self.string()?;
        if name.is_empty() {
            return Ok(None);
        }
        let kind = self.kind(0)?;
        Ok(Some(FieldHeader {
            name,
            kind: Some(kind),
        }))
    }

    fn skip_field(&mut self) -> Result<(), StreamError> {
        Err(StreamError::malformed("binary fields are skipped by decoding their kind"))
    }

    fn read_scalar(&mut self, kind: &PropertyKind) -> Result<Value, StreamError> {
        use PropertyKind as K;

        Ok(match kind {
            K::Bool => {
                let at = self.pos;
                match self.array::<1>()? {
                    [0] => Value::Bool(false),
                    [1] => Value::Bool(true),
                    [other] => {
                        return Err(StreamError::malformed(alloc::format!(
                            "invalid bool byte {other:#04x} at byte {at}"
                        )));
                    }
                }
            }
            K::Int | K::Enum(_) => Value::Int(self.i32()?),
            K::UInt | K::GlEnum | K::HexInt => Value::UInt(self.u32()?),
            K::Float => Value::Float(f32::from_le_bytes(self.array()?)),
            K::Double => Value::Double(f64::from_le_bytes(self.array()?)),
            K::String => Value::String(self.string()?),
            K::Vec2f => Value::Vec2f(self.f32s()?),
            K::Vec3f => Value::Vec3f(self.f32s()?),
            K::Vec4f => Value::Vec4f(self.f32s()?),
            K::Vec2d => Value::Vec2d(self.f64s()?),
            K::Vec3d => Value::Vec3d(self.f64s()?),
            K::Vec4d | K::Quat => Value::Vec4d(self.f64s()?),
            K::Matrix => Value::Matrix(self.f64s()?),
            K::Blob => Value::Blob(self.bytes()?.to_vec()),
            K::Object | K::List(_) => {
                return Err(StreamError::malformed(alloc::format!("{kind} is not a scalar kind")));
            }
        })
    }

    fn begin_list(&mut self) -> Result<usize, StreamError> {
        let at = self.pos;
        let len = self.u32()? as usize;
        // Every element takes at least one byte.
        if len > self.remaining() {
            return Err(StreamError::parse(
                Location::Byte(at),
                alloc::format!("list of {len} elements exceeds the input"),
            ));
        }
        Ok(len)
    }

    fn end_list(&mut self) -> Result<(), StreamError> {
        Ok(())
    }

    #[inline]
    fn location(&self) -> Location {
        Location::Byte(self.pos)
    }
}
