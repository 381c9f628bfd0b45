//! Items used by the exported macros. Not public API.

#[cfg(feature = "auto_register")]
pub mod auto_register {
    pub use inventory;

    use crate::error::RegistryError;
    use crate::registry::TypeRegistry;

    /// A registration function collected by [`TypeRegistry::auto_register`].
    pub struct __AutoRegisterFunc(pub fn(&mut TypeRegistry) -> Result<(), RegistryError>);

    inventory::collect!(__AutoRegisterFunc);
}

/// Submits a registration function to [`TypeRegistry::auto_register`](crate::TypeRegistry::auto_register).
///
/// The function must have the signature
/// `fn(&mut TypeRegistry) -> Result<(), RegistryError>`. Without the
/// `auto_register` feature the macro expands to nothing.
///
/// ```
/// use vc_wrap::{Factory, RegistryError, TypeRegistry, impl_object, submit_wrapper};
///
/// #[derive(Default)]
/// struct Marker;
/// impl_object!(Marker => "Marker");
///
/// fn register_marker(registry: &mut TypeRegistry) -> Result<(), RegistryError> {
///     registry.register::<Marker>("Marker", Some(Factory::new(Marker::default)), &["Object"], |_| {})?;
///     Ok(())
/// }
///
/// submit_wrapper!(register_marker);
///
/// let mut registry = TypeRegistry::new();
/// registry.auto_register().unwrap();
/// # #[cfg(feature = "auto_register")]
/// assert!(registry.contains("Marker"));
/// ```
#[cfg(feature = "auto_register")]
#[macro_export]
macro_rules! submit_wrapper {
    ($register:path) => {
        $crate::__macro_exports::auto_register::inventory::submit! {
            $crate::__macro_exports::auto_register::__AutoRegisterFunc($register)
        }
    };
}

/// Submits a registration function to [`TypeRegistry::auto_register`](crate::TypeRegistry::auto_register).
///
/// The `auto_register` feature is disabled, so this expands to nothing.
#[cfg(not(feature = "auto_register"))]
#[macro_export]
macro_rules! submit_wrapper {
    ($register:path) => {};
}
