//! Dynamic values exchanged between accessors and codecs.

use alloc::string::String;
use alloc::vec::Vec;

use crate::object::ObjectRef;

// -----------------------------------------------------------------------------
// Value

/// A property value in its type-erased form.
///
/// Several [`PropertyKind`](crate::PropertyKind)s share a representation:
/// `Enum` is carried as [`Int`](Value::Int), `GlEnum` and `HexInt` as
/// [`UInt`](Value::UInt) and `Quat` as [`Vec4d`](Value::Vec4d).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i32),
    UInt(u32),
    Float(f32),
    Double(f64),
    String(String),
    Vec2f([f32; 2]),
    Vec3f([f32; 3]),
    Vec4f([f32; 4]),
    Vec2d([f64; 2]),
    Vec3d([f64; 3]),
    Vec4d([f64; 4]),
    /// Row-major 4x4 matrix.
    Matrix([f64; 16]),
    Object(Option<ObjectRef>),
    List(Vec<Value>),
    Blob(Vec<u8>),
}

impl Value {
    /// Name of the representation, used in error messages.
    pub const fn variant_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::Vec2f(_) => "vec2f",
            Self::Vec3f(_) => "vec3f",
            Self::Vec4f(_) => "vec4f",
            Self::Vec2d(_) => "vec2d",
            Self::Vec3d(_) => "vec3d",
            Self::Vec4d(_) => "vec4d",
            Self::Matrix(_) => "matrix",
            Self::Object(_) => "object",
            Self::List(_) => "list",
            Self::Blob(_) => "blob",
        }
    }

    /// Returns the referenced object, `None` for null or non-object values.
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(object) => object.as_ref(),
            _ => None,
        }
    }
}

// -----------------------------------------------------------------------------
// Blob

/// Opaque bytes, stored as [`Value::Blob`].
///
/// A newtype so that `Vec<u8>` is not confused with a list of integers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blob(pub Vec<u8>);

// -----------------------------------------------------------------------------
// PropertyValue

/// Conversion between a typed accessor value and [`Value`].
pub trait PropertyValue: Sized + 'static {
    fn into_value(self) -> Value;

    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! impl_property_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl PropertyValue for $ty {
                #[inline]
                fn into_value(self) -> Value {
                    Value::$variant(self)
                }

                #[inline]
                fn from_value(value: Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_property_value! {
    bool => Bool,
    i32 => Int,
    u32 => UInt,
    f32 => Float,
    f64 => Double,
    String => String,
    [f32; 2] => Vec2f,
    [f32; 3] => Vec3f,
    [f32; 4] => Vec4f,
    [f64; 2] => Vec2d,
    [f64; 3] => Vec3d,
    [f64; 4] => Vec4d,
    [f64; 16] => Matrix,
    Option<ObjectRef> => Object,
}

impl PropertyValue for ObjectRef {
    #[inline]
    fn into_value(self) -> Value {
        Value::Object(Some(self))
    }

    /// Null references are rejected.
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(object) => object,
            _ => None,
        }
    }
}

impl PropertyValue for Blob {
    #[inline]
    fn into_value(self) -> Value {
        Value::Blob(self.0)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Blob(bytes) => Some(Blob(bytes)),
            _ => None,
        }
    }
}

impl<T: PropertyValue> PropertyValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(T::into_value).collect())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}
