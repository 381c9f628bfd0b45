//! The closed set of property kinds understood by the codecs.

use alloc::boxed::Box;
use core::fmt;

use crate::value::Value;

// -----------------------------------------------------------------------------
// EnumTable

/// A fixed name <-> integer table of an `ENUM` property.
///
/// Adding names is compatible, removing or renumbering them breaks files
/// written before the change.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct EnumTable {
    entries: &'static [(&'static str, i32)],
}

impl EnumTable {
    /// A table without entries, used for enums decoded from self-describing input.
    pub const EMPTY: Self = Self { entries: &[] };

    #[inline]
    pub const fn new(entries: &'static [(&'static str, i32)]) -> Self {
        Self { entries }
    }

    pub fn name_of(&self, value: i32) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(name, _)| *name)
    }

    pub fn value_of(&self, name: &str) -> Option<i32> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, value)| *value)
    }

    #[inline]
    pub fn entries(&self) -> &'static [(&'static str, i32)] {
        self.entries
    }
}

impl fmt::Debug for EnumTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter().copied()).finish()
    }
}

// -----------------------------------------------------------------------------
// KindTag

/// The one-byte tag identifying a kind on the binary wire.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindTag {
    Bool = 1,
    Int = 2,
    UInt = 3,
    Float = 4,
    Double = 5,
    String = 6,
    Vec2f = 7,
    Vec3f = 8,
    Vec4f = 9,
    Vec2d = 10,
    Vec3d = 11,
    Vec4d = 12,
    Quat = 13,
    Matrix = 14,
    Enum = 15,
    GlEnum = 16,
    HexInt = 17,
    Object = 18,
    List = 19,
    Blob = 20,
}

impl KindTag {
    pub const fn from_u8(byte: u8) -> Option<Self> {
        Some(match byte {
            1 => Self::Bool,
            2 => Self::Int,
            3 => Self::UInt,
            4 => Self::Float,
            5 => Self::Double,
            6 => Self::String,
            7 => Self::Vec2f,
            8 => Self::Vec3f,
            9 => Self::Vec4f,
            10 => Self::Vec2d,
            11 => Self::Vec3d,
            12 => Self::Vec4d,
            13 => Self::Quat,
            14 => Self::Matrix,
            15 => Self::Enum,
            16 => Self::GlEnum,
            17 => Self::HexInt,
            18 => Self::Object,
            19 => Self::List,
            20 => Self::Blob,
            _ => return None,
        })
    }

    /// Builds the kind for a tag that carries no further description.
    ///
    /// Returns `None` for [`KindTag::List`], whose element kind follows on the wire.
    pub const fn simple_kind(self) -> Option<PropertyKind> {
        Some(match self {
            Self::Bool => PropertyKind::Bool,
            Self::Int => PropertyKind::Int,
            Self::UInt => PropertyKind::UInt,
            Self::Float => PropertyKind::Float,
            Self::Double => PropertyKind::Double,
            Self::String => PropertyKind::String,
            Self::Vec2f => PropertyKind::Vec2f,
            Self::Vec3f => PropertyKind::Vec3f,
            Self::Vec4f => PropertyKind::Vec4f,
            Self::Vec2d => PropertyKind::Vec2d,
            Self::Vec3d => PropertyKind::Vec3d,
            Self::Vec4d => PropertyKind::Vec4d,
            Self::Quat => PropertyKind::Quat,
            Self::Matrix => PropertyKind::Matrix,
            Self::Enum => PropertyKind::Enum(EnumTable::EMPTY),
            Self::GlEnum => PropertyKind::GlEnum,
            Self::HexInt => PropertyKind::HexInt,
            Self::Object => PropertyKind::Object,
            Self::Blob => PropertyKind::Blob,
            Self::List => return None,
        })
    }
}

// -----------------------------------------------------------------------------
// PropertyKind

/// The codec category of a property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKind {
    Bool,
    Int,
    UInt,
    Float,
    Double,
    String,
    Vec2f,
    Vec3f,
    Vec4f,
    Vec2d,
    Vec3d,
    Vec4d,
    Quat,
    Matrix,
    Enum(EnumTable),
    /// A GL constant, written by name when [`gl::GL_TABLE`](crate::gl::GL_TABLE) knows it.
    GlEnum,
    /// An unsigned integer written in hexadecimal by text codecs.
    HexInt,
    /// A reference to another object, routed through the stream's id table.
    Object,
    List(Box<PropertyKind>),
    Blob,
}

impl PropertyKind {
    /// Shorthand for `PropertyKind::List(Box::new(element))`.
    #[inline]
    pub fn list(element: PropertyKind) -> Self {
        Self::List(Box::new(element))
    }

    pub const fn tag(&self) -> KindTag {
        match self {
            Self::Bool => KindTag::Bool,
            Self::Int => KindTag::Int,
            Self::UInt => KindTag::UInt,
            Self::Float => KindTag::Float,
            Self::Double => KindTag::Double,
            Self::String => KindTag::String,
            Self::Vec2f => KindTag::Vec2f,
            Self::Vec3f => KindTag::Vec3f,
            Self::Vec4f => KindTag::Vec4f,
            Self::Vec2d => KindTag::Vec2d,
            Self::Vec3d => KindTag::Vec3d,
            Self::Vec4d => KindTag::Vec4d,
            Self::Quat => KindTag::Quat,
            Self::Matrix => KindTag::Matrix,
            Self::Enum(_) => KindTag::Enum,
            Self::GlEnum => KindTag::GlEnum,
            Self::HexInt => KindTag::HexInt,
            Self::Object => KindTag::Object,
            Self::List(_) => KindTag::List,
            Self::Blob => KindTag::Blob,
        }
    }

    /// Upper-case kind name as listed in schema dumps.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Bool => "BOOL",
            Self::Int => "INT",
            Self::UInt => "UINT",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::String => "STRING",
            Self::Vec2f => "VEC2F",
            Self::Vec3f => "VEC3F",
            Self::Vec4f => "VEC4F",
            Self::Vec2d => "VEC2D",
            Self::Vec3d => "VEC3D",
            Self::Vec4d => "VEC4D",
            Self::Quat => "QUAT",
            Self::Matrix => "MATRIX",
            Self::Enum(_) => "ENUM",
            Self::GlEnum => "GLENUM",
            Self::HexInt => "HEXINT",
            Self::Object => "OBJECT",
            Self::List(_) => "LIST",
            Self::Blob => "BLOB",
        }
    }

    /// Compares the wire shape of two kinds, ignoring enum tables.
    pub fn same_shape(&self, other: &PropertyKind) -> bool {
        match (self, other) {
            (Self::List(a), Self::List(b)) => a.same_shape(b),
            _ => self.tag() == other.tag(),
        }
    }

    /// Returns `true` if `value` has the representation this kind encodes.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Bool, Value::Bool(_))
            | (Self::Int | Self::Enum(_), Value::Int(_))
            | (Self::UInt | Self::GlEnum | Self::HexInt, Value::UInt(_))
            | (Self::Float, Value::Float(_))
            | (Self::Double, Value::Double(_))
            | (Self::String, Value::String(_))
            | (Self::Vec2f, Value::Vec2f(_))
            | (Self::Vec3f, Value::Vec3f(_))
            | (Self::Vec4f, Value::Vec4f(_))
            | (Self::Vec2d, Value::Vec2d(_))
            | (Self::Vec3d, Value::Vec3d(_))
            | (Self::Vec4d | Self::Quat, Value::Vec4d(_))
            | (Self::Matrix, Value::Matrix(_))
            | (Self::Object, Value::Object(_))
            | (Self::Blob, Value::Blob(_)) => true,
            (Self::List(element), Value::List(items)) => items.iter().all(|v| element.accepts(v)),
            _ => false,
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List(element) => write!(f, "LIST<{element}>"),
            _ => f.write_str(self.name()),
        }
    }
}
