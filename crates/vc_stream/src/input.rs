use alloc::vec::Vec;

use log::{debug, trace, warn};
use vc_wrap::{ObjectRef, ObjectWrapper, PropertyKind, TypeRegistry, Value};

use crate::error::{Location, StreamError};
use crate::format::{FieldSource, ObjectToken};
use crate::header::Header;
use crate::ids::{ReadIds, ReadState};
use crate::options::DEFAULT_MAX_DEPTH;
use crate::path::FieldPath;

// -----------------------------------------------------------------------------
// InputStream

/// Reconstructs an object graph from a [`FieldSource`].
///
/// An object is constructed by its factory and registered under its id
/// before its fields are read, so back-references from inside its own
/// fields resolve to the same, partially populated instance. Population is
/// complete once the outermost [`read_object`](Self::read_object) returns.
///
/// Fields without a matching property, and fields whose property is gated
/// out at the stream's version, are skipped. Properties without a field keep
/// the value the factory gave them.
///
/// Definitions nested deeper than [`max_depth`](Self::with_max_depth) fail
/// the pass with [`StreamError::DepthExceeded`].
pub struct InputStream<'r, S> {
    registry: &'r TypeRegistry,
    source: S,
    header: Header,
    ids: ReadIds,
    path: FieldPath,
    depth: usize,
    max_depth: usize,
}

impl<'r, S: FieldSource> InputStream<'r, S> {
    /// Reads the stream header.
    ///
    /// Fails with [`StreamError::UnsupportedVersion`] for a newer wire
    /// format before any object is touched.
    pub fn new(registry: &'r TypeRegistry, mut source: S) -> Result<Self, StreamError> {
        let header = source.read_header()?;
        debug!(
            "reading {} stream at version {} written by `{}`",
            header.content, header.version, header.generator
        );
        Ok(Self {
            registry,
            source,
            header,
            ids: ReadIds::default(),
            path: FieldPath::default(),
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        })
    }

    /// Sets the deepest nesting of object definitions accepted.
    #[inline]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[inline]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Reads an object slot, `None` for a null reference.
    pub fn read_object(&mut self) -> Result<Option<ObjectRef>, StreamError> {
        let ids = &self.ids;
        let token = self.source.read_object_token(&|id| ids.contains(id))?;

        let (id, type_name, class_version) = match token {
            ObjectToken::Null => return Ok(None),
            ObjectToken::Reference { id } => {
                return match self.ids.get(id) {
                    Some((object, state)) => {
                        if state == ReadState::UnderConstruction {
                            trace!("cycle back to #{id}");
                        }
                        Ok(Some(object.clone()))
                    }
                    None => Err(self.path.error(alloc::format!("reference to undefined object #{id}"))),
                };
            }
            ObjectToken::Definition {
                id,
                type_name,
                class_version,
            } => (id, type_name, class_version),
        };

        if self.depth >= self.max_depth {
            return Err(self.path.too_deep(self.max_depth));
        }
        self.depth += 1;
        let object = self.read_definition(id, &type_name, class_version)?;
        self.depth -= 1;
        Ok(Some(object))
    }

    fn read_definition(&mut self, id: u32, type_name: &str, class_version: u32) -> Result<ObjectRef, StreamError> {
        let registry = self.registry;
        let wrapper = registry.lookup(type_name)?;
        if class_version > wrapper.version() {
            warn!(
                "`{type_name}` was written at class version {class_version}, newer than {}; unknown fields are skipped",
                wrapper.version()
            );
        }
        let object = registry.instantiate(type_name)?;
        trace!("defining `{type_name}` #{id}");
        self.ids.begin(id, object.clone());
        self.path.push(type_name);

        let properties = registry.chain_properties(type_name)?;
        while let Some(field) = self.source.next_field().map_err(|err| self.path.attach(err))? {
            let property = properties.iter().find(|p| p.name() == field.name).filter(|p| {
                p.gate()
                    .permits(self.header.domain_version(p.owner().domain()))
            });

            let Some(property) = property else {
                debug!("skipping field `{}` of `{type_name}`", field.name);
                self.path.push(&field.name);
                match &field.kind {
                    Some(kind) => {
                        self.read_value(kind)?;
                    }
                    // Keep definitions the reader can build, later fields may refer to them.
                    None => match self.source.peek_definition() {
                        Some(nested) if registry.get(&nested).is_some_and(ObjectWrapper::is_instantiable) => {
                            self.read_object()?;
                        }
                        _ => self.source.skip_field()?,
                    },
                }
                self.path.pop();
                continue;
            };

            self.path.push(property.name());
            if let Some(wire) = &field.kind
                && !wire.same_shape(property.kind())
            {
                return Err(self.path.error(alloc::format!(
                    "stream holds {wire}, declared as {}",
                    property.kind()
                )));
            }
            let value = self.read_value(property.kind())?;
            let assigned = property.set(&mut *object.write(), value);
            assigned.map_err(|err| self.path.error(err))?;
            self.path.pop();
        }

        {
            let mut guard = object.write();
            for owner in registry.chain(type_name)? {
                owner.read_finished(&mut *guard);
            }
        }

        self.ids.complete(id);
        self.path.pop();
        Ok(object)
    }

    fn read_value(&mut self, kind: &PropertyKind) -> Result<Value, StreamError> {
        match kind {
            PropertyKind::Object => Ok(Value::Object(self.read_object()?)),
            PropertyKind::List(element) => {
                let len = self.source.begin_list().map_err(|err| self.path.attach(err))?;
                let mut items = Vec::with_capacity(len.min(1024));
                for _ in 0..len {
                    items.push(self.read_value(element)?);
                }
                self.source.end_list()?;
                Ok(Value::List(items))
            }
            _ => self
                .source
                .read_scalar(kind)
                .map_err(|err| self.path.attach(err)),
        }
    }

    /// Current position in the input.
    #[inline]
    pub fn location(&self) -> Location {
        self.source.location()
    }

    /// Number of objects reconstructed so far.
    #[inline]
    pub fn object_count(&self) -> usize {
        self.ids.len()
    }
}
