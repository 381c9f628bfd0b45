//! Typed accessor pairs erased behind [`PropertyDescriptor`].

use alloc::boxed::Box;
use alloc::string::String;
use core::any::{Any, type_name};
use core::fmt;

use crate::error::AccessError;
use crate::kind::PropertyKind;
use crate::value::{PropertyValue, Value};
use crate::version::VersionGate;

type Getter = Box<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;
type Setter = Box<dyn Fn(&mut dyn Any, Value) -> Result<(), AccessError> + Send + Sync>;

// -----------------------------------------------------------------------------
// PropertyDescriptor

/// One named, typed, versioned field of a wrapper.
///
/// The accessors receive the facet of the owning wrapper, never the whole
/// instance. A descriptor is immutable once its wrapper is registered.
pub struct PropertyDescriptor {
    name: &'static str,
    kind: PropertyKind,
    default: Value,
    gate: VersionGate,
    facet_type: &'static str,
    getter: Getter,
    setter: Setter,
}

impl PropertyDescriptor {
    /// Builds a descriptor from typed accessors over the facet type `T`.
    pub fn new<T, V>(
        name: &'static str,
        kind: PropertyKind,
        default: V,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self
    where
        T: Any,
        V: PropertyValue,
    {
        let getter: Getter = Box::new(move |facet| facet.downcast_ref::<T>().map(|t| get(t).into_value()));
        let setter: Setter = Box::new(move |facet, value| {
            let Some(target) = facet.downcast_mut::<T>() else {
                return Err(AccessError::MissingFacet {
                    schema: String::from(type_name::<T>()),
                });
            };
            let found = value.variant_name();
            let typed = V::from_value(value).ok_or(AccessError::IncompatibleValue {
                expected: type_name::<V>(),
                found,
            })?;
            set(target, typed);
            Ok(())
        });

        Self {
            name,
            kind,
            default: default.into_value(),
            gate: VersionGate::ALWAYS,
            facet_type: type_name::<T>(),
            getter,
            setter,
        }
    }

    /// Replaces the version gate.
    #[inline]
    pub fn with_gate(mut self, gate: VersionGate) -> Self {
        self.gate = gate;
        self
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    /// Value the factory is expected to produce, used by default omission.
    #[inline]
    pub fn default_value(&self) -> &Value {
        &self.default
    }

    #[inline]
    pub fn gate(&self) -> VersionGate {
        self.gate
    }

    #[inline]
    pub(crate) fn gate_mut(&mut self) -> &mut VersionGate {
        &mut self.gate
    }

    /// Reads the property from a facet.
    pub fn get(&self, facet: &dyn Any) -> Result<Value, AccessError> {
        (self.getter)(facet).ok_or_else(|| AccessError::MissingFacet {
            schema: String::from(self.facet_type),
        })
    }

    /// Writes the property on a facet.
    pub fn set(&self, facet: &mut dyn Any, value: Value) -> Result<(), AccessError> {
        (self.setter)(facet, value)
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("default", &self.default)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}
