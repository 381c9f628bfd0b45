//! The live object model the streams walk.
//!
//! Objects are shared and possibly cyclic, so they are always handled
//! through [`ObjectRef`], a reference-counted handle to a lock around a
//! `dyn Object`. Accessors of a wrapper never see the whole instance, they
//! see the [facet](Object::facet) registered under the wrapper's name.

use alloc::sync::Arc;
use core::any::Any;
use core::fmt;
use core::hash::{Hash, Hasher};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

// -----------------------------------------------------------------------------
// Object

/// A value that can take part in an archived object graph.
///
/// The composition of a type is expressed through facets: the wrapper named
/// [`type_name`](Object::type_name) operates on the instance itself, while an
/// ancestor wrapper operates on the embedded struct that provides its schema.
///
/// Implementations are usually generated by [`impl_object!`](crate::impl_object).
pub trait Object: Any + Send + Sync {
    /// Registered wrapper name of the concrete type.
    fn type_name(&self) -> &'static str;

    /// Returns the part of `self` that accessors of the wrapper `schema` operate on.
    fn facet(&self, schema: &str) -> Option<&dyn Any>;

    /// Mutable variant of [`facet`](Object::facet).
    fn facet_mut(&mut self, schema: &str) -> Option<&mut dyn Any>;
}

impl dyn Object {
    /// Returns `true` if the concrete type is `T`.
    #[inline]
    pub fn is<T: Object>(&self) -> bool {
        (self as &dyn Any).is::<T>()
    }

    #[inline]
    pub fn downcast_ref<T: Object>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }

    #[inline]
    pub fn downcast_mut<T: Object>(&mut self) -> Option<&mut T> {
        (self as &mut dyn Any).downcast_mut::<T>()
    }
}

/// Implements [`Object`] for a struct.
///
/// The first argument is the type, the literal is its wrapper name, and the
/// optional trailing identifiers name embedded fields that provide ancestor
/// schemas. Facet lookup checks the own name first, then each field in order.
///
/// ```
/// use vc_wrap::impl_object;
///
/// #[derive(Default)]
/// struct Node { name: String }
///
/// #[derive(Default)]
/// struct Group { node: Node, children: Vec<u32> }
///
/// impl_object!(Node => "Node");
/// impl_object!(Group => "Group", node);
///
/// use vc_wrap::Object;
/// let group = Group::default();
/// assert!(group.facet("Node").unwrap().is::<Node>());
/// assert!(group.facet("Group").unwrap().is::<Group>());
/// assert!(group.facet("Image").is_none());
/// ```
#[macro_export]
macro_rules! impl_object {
    ($ty:ty => $name:literal $(, $base:ident)* $(,)?) => {
        impl $crate::object::Object for $ty {
            #[inline]
            fn type_name(&self) -> &'static str {
                $name
            }

            fn facet(&self, schema: &str) -> ::core::option::Option<&dyn ::core::any::Any> {
                if schema == $name {
                    return ::core::option::Option::Some(self);
                }
                $(
                    if let ::core::option::Option::Some(facet) =
                        $crate::object::Object::facet(&self.$base, schema)
                    {
                        return ::core::option::Option::Some(facet);
                    }
                )*
                ::core::option::Option::None
            }

            fn facet_mut(
                &mut self,
                schema: &str,
            ) -> ::core::option::Option<&mut dyn ::core::any::Any> {
                if schema == $name {
                    return ::core::option::Option::Some(self);
                }
                $(
                    if $crate::object::Object::facet(&self.$base, schema).is_some() {
                        return $crate::object::Object::facet_mut(&mut self.$base, schema);
                    }
                )*
                ::core::option::Option::None
            }
        }
    };
}

// -----------------------------------------------------------------------------
// ObjectId

/// Identity of a shared object: the address of its allocation.
///
/// An id is only meaningful while a handle to the object is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

// -----------------------------------------------------------------------------
// ObjectRef

/// Shared handle to a live object.
///
/// Equality and hashing are by identity, never by content.
#[derive(Clone)]
pub struct ObjectRef(Arc<RwLock<dyn Object>>);

impl ObjectRef {
    /// Moves `value` into a new shared allocation.
    pub fn new<T: Object>(value: T) -> Self {
        let inner: Arc<RwLock<dyn Object>> = Arc::new(RwLock::new(value));
        Self(inner)
    }

    /// Takes a read lock on the object.
    ///
    /// Poisoning is ignored, a panicking accessor does not invalidate the graph.
    pub fn read(&self) -> RwLockReadGuard<'_, dyn Object> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes a write lock on the object.
    pub fn write(&self) -> RwLockWriteGuard<'_, dyn Object> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub fn id(&self) -> ObjectId {
        ObjectId(Arc::as_ptr(&self.0).cast::<()>().addr())
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }

    /// Registered wrapper name of the concrete type.
    pub fn type_name(&self) -> &'static str {
        self.read().type_name()
    }

    #[inline]
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Runs `f` on the concrete value if it is a `T`.
    pub fn with<T: Object, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let guard = self.read();
        guard.downcast_ref::<T>().map(f)
    }

    /// Runs `f` on the concrete value if it is a `T`.
    pub fn with_mut<T: Object, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut guard = self.write();
        guard.downcast_mut::<T>().map(f)
    }
}

impl PartialEq for ObjectRef {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjectRef {}

impl Hash for ObjectRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The object may be locked by the caller, never block here.
        let name = match self.0.try_read() {
            Ok(guard) => guard.type_name(),
            Err(_) => "<locked>",
        };
        write!(f, "ObjectRef({name} @ {:#x})", self.id().0)
    }
}
