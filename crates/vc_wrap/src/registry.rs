use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use std::sync::OnceLock;

use log::warn;

use crate::error::{AccessError, RegistryError};
use crate::hash::{HashMap, HashSet};
use crate::kind::PropertyKind;
use crate::object::{Object, ObjectRef};
use crate::property::PropertyDescriptor;
use crate::value::Value;
use crate::version::VersionGate;
use crate::wrapper::{Declaration, Factory, ObjectWrapper};

static GLOBAL: OnceLock<TypeRegistry> = OnceLock::new();

// -----------------------------------------------------------------------------
// TypeRegistry

/// A registry of [wrappers](ObjectWrapper), keyed by type name.
///
/// The registry is filled during a single start-up pass and only read
/// afterwards. Entries are never replaced or removed, so shared references
/// handed out by lookups stay valid for the registry's lifetime and any
/// number of streams may read it concurrently.
///
/// # Example
///
/// ```
/// use vc_wrap::{Factory, PropertyKind, RegistryError, TypeRegistry, impl_object};
///
/// #[derive(Default)]
/// struct Light { on: bool }
/// impl_object!(Light => "Light");
///
/// let mut registry = TypeRegistry::new();
/// registry
///     .register::<Light>("Light", Some(Factory::new(Light::default)), &["Object"], |decl| {
///         decl.property("On", PropertyKind::Bool, false, |l: &Light| l.on, |l, v| l.on = v);
///     })
///     .unwrap();
/// registry.validate().unwrap();
///
/// let light = registry.instantiate("Light").unwrap();
/// assert_eq!(light.type_name(), "Light");
///
/// assert!(matches!(registry.instantiate("Object"), Err(RegistryError::MissingFactory(_))));
/// assert!(matches!(registry.lookup("Lamp"), Err(RegistryError::UnknownType(_))));
/// ```
pub struct TypeRegistry {
    wrappers: HashMap<&'static str, ObjectWrapper>,
}

impl Default for TypeRegistry {
    /// See [`TypeRegistry::new`] .
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Creates a registry without any wrapper.
    #[inline]
    pub const fn empty() -> Self {
        Self {
            wrappers: HashMap::with_hasher(crate::hash::FixedHashState),
        }
    }

    /// Creates a registry holding the schema-only root wrapper `Object`.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.wrappers.insert("Object", ObjectWrapper::new::<()>("Object", None, &[], |_| {}));
        registry
    }

    /// Builds a wrapper from a declaration block and inserts it.
    ///
    /// `T` is the facet type the accessors of `declare` operate on, which is
    /// the concrete type for instantiable wrappers.
    pub fn register<T: core::any::Any>(
        &mut self,
        name: &'static str,
        factory: Option<Factory>,
        chain: &[&'static str],
        declare: impl FnOnce(&mut Declaration<T>),
    ) -> Result<&ObjectWrapper, RegistryError> {
        if self.wrappers.contains_key(name) {
            return Err(RegistryError::DuplicateRegistration(name.to_string()));
        }
        self.insert_wrapper(ObjectWrapper::new(name, factory, chain, declare))
    }

    /// Inserts a prebuilt wrapper.
    pub fn insert_wrapper(&mut self, wrapper: ObjectWrapper) -> Result<&ObjectWrapper, RegistryError> {
        use hashbrown::hash_map::Entry;

        match self.wrappers.entry(wrapper.name()) {
            Entry::Occupied(entry) => Err(RegistryError::DuplicateRegistration(entry.key().to_string())),
            Entry::Vacant(entry) => Ok(entry.insert(wrapper)),
        }
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&ObjectWrapper> {
        self.wrappers.get(name)
    }

    /// Like [`get`](Self::get), but reports a missing wrapper as an error.
    pub fn lookup(&self, name: &str) -> Result<&ObjectWrapper, RegistryError> {
        self.get(name)
            .ok_or_else(|| RegistryError::UnknownType(name.to_string()))
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.wrappers.contains_key(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.wrappers.len()
    }

    /// Returns an iterator over all wrappers, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &ObjectWrapper> {
        self.wrappers.values()
    }

    /// Creates a fresh instance of the named type.
    pub fn instantiate(&self, name: &str) -> Result<ObjectRef, RegistryError> {
        let wrapper = self.lookup(name)?;
        let factory = wrapper
            .factory()
            .ok_or_else(|| RegistryError::MissingFactory(name.to_string()))?;
        let object = factory.create();
        let produced = object.type_name();
        if produced != name {
            warn!("factory of `{name}` produced an instance reporting `{produced}`");
        }
        Ok(object)
    }

    /// Resolves the chain of the named wrapper, root-first.
    pub fn chain(&self, name: &str) -> Result<Vec<&ObjectWrapper>, RegistryError> {
        let wrapper = self.lookup(name)?;
        wrapper
            .chain()
            .iter()
            .map(|ancestor| self.lookup(ancestor))
            .collect()
    }

    /// Returns the effective property list of the named wrapper.
    ///
    /// Ancestor properties come first, root-first, followed by the wrapper's
    /// own ones. A name declared more than once along the chain is listed
    /// once, at the position of its most-derived declaration, which is the
    /// one that wins.
    pub fn chain_properties(&self, name: &str) -> Result<Vec<ChainProperty<'_>>, RegistryError> {
        let chain = self.chain(name)?;

        let mut seen = HashSet::<&str>::default();
        let mut properties: Vec<ChainProperty<'_>> = chain
            .iter()
            .rev()
            .flat_map(|&owner| {
                owner
                    .properties()
                    .iter()
                    .rev()
                    .map(move |descriptor| ChainProperty { owner, descriptor })
            })
            .filter(|property| seen.insert(property.name()))
            .collect();
        properties.reverse();
        Ok(properties)
    }

    /// Checks that every chain resolves.
    ///
    /// Meant to be the last step of start-up registration.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let mut names: Vec<_> = self.wrappers.keys().copied().collect();
        names.sort_unstable();
        for name in names {
            self.chain(name)?;
        }
        Ok(())
    }

    /// Highest class version of any wrapper, the default write target.
    pub fn latest_version(&self) -> u32 {
        self.iter().map(ObjectWrapper::version).max().unwrap_or(0)
    }

    /// Writes one `Name = Prop:KIND ...` line per wrapper, sorted by name.
    pub fn write_schema(&self, out: &mut impl fmt::Write) -> fmt::Result {
        let mut wrappers: Vec<_> = self.iter().collect();
        wrappers.sort_unstable_by_key(|w| w.name());
        for wrapper in wrappers {
            write!(out, "{} =", wrapper.name())?;
            for property in wrapper.properties() {
                write!(out, " {}:{}", property.name(), property.kind())?;
            }
            out.write_char('\n')?;
        }
        Ok(())
    }

    /// See [`write_schema`](Self::write_schema).
    pub fn schema(&self) -> String {
        let mut out = String::new();
        // Writing into a `String` cannot fail.
        let _ = self.write_schema(&mut out);
        out
    }

    /// Makes this registry the process-wide one.
    ///
    /// Only the first call succeeds, later ones hand the registry back.
    pub fn install(self) -> Result<&'static TypeRegistry, TypeRegistry> {
        let mut rejected = Some(self);
        let installed = GLOBAL.get_or_init(|| rejected.take().unwrap_or_else(Self::empty));
        match rejected {
            Some(registry) => Err(registry),
            None => Ok(installed),
        }
    }

    /// The process-wide registry, if one was [installed](Self::install).
    #[inline]
    pub fn global() -> Option<&'static TypeRegistry> {
        GLOBAL.get()
    }

    /// Runs every registration function submitted with
    /// [`submit_wrapper!`](crate::submit_wrapper).
    ///
    /// Returns the number of functions run. Submissions run in no particular
    /// order, which is fine since chains are only resolved on lookup; call
    /// [`validate`](Self::validate) afterwards.
    ///
    /// Each function runs once per call, so calling this twice on the same
    /// registry fails with [`RegistryError::DuplicateRegistration`].
    ///
    /// Without the `auto_register` feature nothing is collected and `0` is
    /// returned.
    pub fn auto_register(&mut self) -> Result<usize, RegistryError> {
        #[cfg(feature = "auto_register")]
        {
            use crate::__macro_exports::auto_register::{__AutoRegisterFunc, inventory};

            let mut count = 0;
            for func in inventory::iter::<__AutoRegisterFunc> {
                (func.0)(self)?;
                count += 1;
            }
            Ok(count)
        }
        #[cfg(not(feature = "auto_register"))]
        {
            Ok(0)
        }
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.wrappers.keys().collect();
        names.sort_unstable();
        f.debug_struct("TypeRegistry").field("wrappers", &names).finish()
    }
}

// -----------------------------------------------------------------------------
// ChainProperty

/// A property of a chain together with the wrapper that declared it.
#[derive(Debug, Clone, Copy)]
pub struct ChainProperty<'a> {
    owner: &'a ObjectWrapper,
    descriptor: &'a PropertyDescriptor,
}

impl<'a> ChainProperty<'a> {
    #[inline]
    pub fn owner(&self) -> &'a ObjectWrapper {
        self.owner
    }

    #[inline]
    pub fn descriptor(&self) -> &'a PropertyDescriptor {
        self.descriptor
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.descriptor.name()
    }

    #[inline]
    pub fn kind(&self) -> &'a PropertyKind {
        self.descriptor.kind()
    }

    #[inline]
    pub fn gate(&self) -> VersionGate {
        self.descriptor.gate()
    }

    /// Reads the property from the owner's facet of `object`.
    pub fn get(&self, object: &dyn Object) -> Result<Value, AccessError> {
        let facet = object.facet(self.owner.name()).ok_or_else(|| self.missing_facet())?;
        self.descriptor.get(facet)
    }

    /// Writes the property on the owner's facet of `object`.
    pub fn set(&self, object: &mut dyn Object, value: Value) -> Result<(), AccessError> {
        let facet = object
            .facet_mut(self.owner.name())
            .ok_or_else(|| self.missing_facet())?;
        self.descriptor.set(facet, value)
    }

    fn missing_facet(&self) -> AccessError {
        AccessError::MissingFacet {
            schema: self.owner.name().to_string(),
        }
    }
}
