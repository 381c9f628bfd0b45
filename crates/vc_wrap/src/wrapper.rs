//! Per-type wrappers and the declaration block that builds them.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;
use core::marker::PhantomData;

use crate::kind::PropertyKind;
use crate::object::{Object, ObjectRef};
use crate::property::PropertyDescriptor;
use crate::value::PropertyValue;
use crate::version::VersionGate;

type ReadHook = Box<dyn Fn(&mut dyn Any) + Send + Sync>;

// -----------------------------------------------------------------------------
// Factory

/// Produces a fresh, default-initialized instance of a concrete type.
#[derive(Clone)]
pub struct Factory(Arc<dyn Fn() -> ObjectRef + Send + Sync>);

impl Factory {
    /// Wraps a constructor of `T`, typically `T::default`.
    pub fn new<T: Object>(f: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self(Arc::new(move || ObjectRef::new(f())))
    }

    /// Wraps a constructor that already produces a shared handle.
    pub fn from_fn(f: impl Fn() -> ObjectRef + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    #[inline]
    pub fn create(&self) -> ObjectRef {
        (self.0)()
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Factory(..)")
    }
}

// -----------------------------------------------------------------------------
// Declaration

/// The declaration block of a wrapper.
///
/// Properties are recorded in call order, which is also their wire order.
/// Every property gets the current revision as its lower version bound;
/// [`update_to_version`](Self::update_to_version) raises that revision.
///
/// Misuse (a default of the wrong kind, duplicate names, removing an unknown
/// property) is a programming error and panics during start-up.
pub struct Declaration<T> {
    revision: u32,
    domain: Option<&'static str>,
    properties: Vec<PropertyDescriptor>,
    hooks: Vec<ReadHook>,
    _marker: PhantomData<fn(&mut T)>,
}

impl<T: Any> Declaration<T> {
    fn new() -> Self {
        Self {
            revision: 0,
            domain: None,
            properties: Vec::new(),
            hooks: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Declares a property of the facet `T`.
    pub fn property<V: PropertyValue>(
        &mut self,
        name: &'static str,
        kind: PropertyKind,
        default: V,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> &mut Self {
        assert!(
            self.properties.iter().all(|p| p.name() != name),
            "property `{name}` declared twice"
        );
        let desc = PropertyDescriptor::new(name, kind, default, get, set)
            .with_gate(VersionGate::since(self.revision));
        assert!(
            desc.kind().accepts(desc.default_value()),
            "default of `{name}` does not fit {}",
            desc.kind(),
        );
        self.properties.push(desc);
        self
    }

    /// Raises the revision that later properties are introduced in.
    pub fn update_to_version(&mut self, version: u32) -> &mut Self {
        assert!(version >= self.revision, "revisions must not decrease");
        self.revision = version;
        self
    }

    /// Ends a declared property at the revision before the current one.
    pub fn mark_removed(&mut self, name: &str) -> &mut Self {
        assert!(self.revision > 0, "`{name}` cannot be removed before revision 1");
        let max = self.revision - 1;
        *self.gate_mut(name) = self.gate_of(name).until(max);
        self
    }

    /// Overrides the gate of a declared property.
    pub fn set_gate(&mut self, name: &str, gate: VersionGate) -> &mut Self {
        *self.gate_mut(name) = gate;
        self
    }

    /// Places the wrapper in a custom version domain.
    pub fn domain(&mut self, domain: &'static str) -> &mut Self {
        self.domain = Some(domain);
        self
    }

    /// Registers a hook that runs once the fields of an instance are read.
    pub fn on_read_finished(&mut self, hook: impl Fn(&mut T) + Send + Sync + 'static) -> &mut Self {
        self.hooks.push(Box::new(move |facet| {
            if let Some(target) = facet.downcast_mut::<T>() {
                hook(target);
            }
        }));
        self
    }

    #[inline]
    pub fn revision(&self) -> u32 {
        self.revision
    }

    fn gate_of(&self, name: &str) -> VersionGate {
        match self.properties.iter().find(|p| p.name() == name) {
            Some(p) => p.gate(),
            None => panic!("property `{name}` is not declared"),
        }
    }

    fn gate_mut(&mut self, name: &str) -> &mut VersionGate {
        match self.properties.iter_mut().find(|p| p.name() == name) {
            Some(p) => p.gate_mut(),
            None => panic!("property `{name}` is not declared"),
        }
    }
}

// -----------------------------------------------------------------------------
// ObjectWrapper

/// Everything the registry knows about one concrete type.
pub struct ObjectWrapper {
    name: &'static str,
    domain: Option<&'static str>,
    factory: Option<Factory>,
    chain: Vec<&'static str>,
    version: u32,
    properties: Vec<PropertyDescriptor>,
    hooks: Vec<ReadHook>,
}

impl ObjectWrapper {
    /// Builds a wrapper, running `declare` exactly once.
    ///
    /// `chain` lists ancestor names root-first. The wrapper's own name is
    /// appended if missing and moved to the end otherwise; repeated names
    /// are dropped.
    pub fn new<T: Any>(
        name: &'static str,
        factory: Option<Factory>,
        chain: &[&'static str],
        declare: impl FnOnce(&mut Declaration<T>),
    ) -> Self {
        let mut decl = Declaration::<T>::new();
        declare(&mut decl);

        let mut normalized: Vec<&'static str> = Vec::with_capacity(chain.len() + 1);
        for &ancestor in chain {
            if ancestor != name && !normalized.contains(&ancestor) {
                normalized.push(ancestor);
            }
        }
        normalized.push(name);

        Self {
            name,
            domain: decl.domain,
            factory,
            chain: normalized,
            version: decl.revision,
            properties: decl.properties,
            hooks: decl.hooks,
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Custom version domain, `None` for the stream's own version.
    #[inline]
    pub fn domain(&self) -> Option<&'static str> {
        self.domain
    }

    #[inline]
    pub fn factory(&self) -> Option<&Factory> {
        self.factory.as_ref()
    }

    /// Returns `false` for schema-only wrappers.
    #[inline]
    pub fn is_instantiable(&self) -> bool {
        self.factory.is_some()
    }

    /// Ancestor names root-first, ending with [`name`](Self::name).
    #[inline]
    pub fn chain(&self) -> &[&'static str] {
        &self.chain
    }

    /// Highest revision declared, written next to the type name.
    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Own properties in declaration order.
    #[inline]
    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name() == name)
    }

    /// Runs the finished-read hooks on this wrapper's facet of `object`.
    pub fn read_finished(&self, object: &mut dyn Object) {
        if self.hooks.is_empty() {
            return;
        }
        if let Some(facet) = object.facet_mut(self.name) {
            for hook in &self.hooks {
                hook(facet);
            }
        }
    }
}

impl fmt::Debug for ObjectWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectWrapper")
            .field("name", &self.name)
            .field("domain", &self.domain)
            .field("instantiable", &self.factory.is_some())
            .field("chain", &self.chain)
            .field("version", &self.version)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}
