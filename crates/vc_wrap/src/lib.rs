#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

// -----------------------------------------------------------------------------
// Extern Self

// Macros expand to `$crate` paths, but doc tests and the fixtures in this
// crate spell the crate name out, so `vc_wrap` must also resolve to `crate`.
extern crate self as vc_wrap;

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod error;
pub mod hash;

pub mod gl;
pub mod kind;
pub mod object;
pub mod property;
pub mod registry;
pub mod value;
pub mod version;
pub mod wrapper;

// -----------------------------------------------------------------------------
// Top-Level exports

pub mod __macro_exports;

pub use error::{AccessError, RegistryError};
pub use kind::{EnumTable, KindTag, PropertyKind};
pub use object::{Object, ObjectId, ObjectRef};
pub use property::PropertyDescriptor;
pub use registry::{ChainProperty, TypeRegistry};
pub use value::{Blob, PropertyValue, Value};
pub use version::VersionGate;
pub use wrapper::{Declaration, Factory, ObjectWrapper};
