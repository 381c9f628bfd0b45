use alloc::vec::Vec;

use log::{debug, trace};
use vc_wrap::{ObjectRef, PropertyKind, TypeRegistry, Value};

use crate::error::StreamError;
use crate::format::FieldSink;
use crate::header::Header;
use crate::ids::{WriteIds, WriteState};
use crate::options::StreamOptions;
use crate::path::FieldPath;

// -----------------------------------------------------------------------------
// OutputStream

/// Writes an object graph through a [`FieldSink`].
///
/// Each object is defined once, at its first occurrence; later
/// occurrences, including cycles back to an object whose body is still being
/// written, refer to it by id.
///
/// A stream is a single pass. The produced bytes are only handed out by
/// [`finish`](Self::finish), so a failed pass never leaks partial output.
/// Definitions nested deeper than [`StreamOptions::max_depth`] fail the pass
/// with [`StreamError::DepthExceeded`].
pub struct OutputStream<'r, S> {
    registry: &'r TypeRegistry,
    sink: S,
    header: Header,
    omit_defaults: bool,
    ids: WriteIds,
    path: FieldPath,
    depth: usize,
    max_depth: usize,
}

impl<'r, S: FieldSink> OutputStream<'r, S> {
    /// Creates a stream writing with `options`.
    pub fn new(registry: &'r TypeRegistry, sink: S, options: &StreamOptions) -> Self {
        let version = options
            .target_version
            .unwrap_or_else(|| registry.latest_version());
        let mut header = Header::new(options.content, version);
        header.custom_domains = options.custom_domains.clone();
        header.generator = options.generator.clone();

        Self {
            registry,
            sink,
            header,
            omit_defaults: options.omit_defaults,
            ids: WriteIds::default(),
            path: FieldPath::default(),
            depth: 0,
            max_depth: options.max_depth,
        }
    }

    #[inline]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Writes the header followed by the root object.
    pub fn write_root(&mut self, root: &ObjectRef) -> Result<(), StreamError> {
        self.sink.write_header(&self.header);
        self.write_object(Some(root))
    }

    /// Writes an object slot.
    pub fn write_object(&mut self, object: Option<&ObjectRef>) -> Result<(), StreamError> {
        let Some(object) = object else {
            self.sink.write_null();
            return Ok(());
        };

        let registry = self.registry;
        let type_name = object.type_name();
        let wrapper = registry
            .get(type_name)
            .ok_or_else(|| StreamError::UnregisteredType(type_name.into()))?;

        if let Some((id, state)) = self.ids.get(object) {
            if state == WriteState::Reserved {
                trace!("cycle back to `{type_name}` #{id}");
            }
            self.sink.write_reference(id, type_name, wrapper.version());
            return Ok(());
        }

        if self.depth >= self.max_depth {
            return Err(self.path.too_deep(self.max_depth));
        }
        self.depth += 1;
        self.write_definition(object, type_name, wrapper.version())?;
        self.depth -= 1;
        Ok(())
    }

    fn write_definition(
        &mut self,
        object: &ObjectRef,
        type_name: &'static str,
        class_version: u32,
    ) -> Result<(), StreamError> {
        let registry = self.registry;
        let id = self.ids.reserve(object);
        trace!("defining `{type_name}` #{id}");
        self.sink.begin_definition(id, type_name, class_version);
        self.path.push(type_name);

        for property in registry.chain_properties(type_name)? {
            let version = self.header.domain_version(property.owner().domain());
            if !property.gate().permits(version) {
                debug!(
                    "`{type_name}.{}` is outside {} at version {version}, not written",
                    property.name(),
                    property.gate(),
                );
                continue;
            }

            // The lock is released before recursing into nested objects.
            let value = property.get(&*object.read());
            self.path.push(property.name());
            let value = value.map_err(|err| self.path.error(err))?;

            if self.omit_defaults && value == *property.descriptor().default_value() {
                self.path.pop();
                continue;
            }

            self.sink.begin_field(property.name(), property.kind());
            self.write_value(property.kind(), &value)?;
            self.sink.end_field();
            self.path.pop();
        }

        self.sink.end_definition();
        self.ids.mark_written(object);
        self.path.pop();
        Ok(())
    }

    fn write_value(&mut self, kind: &PropertyKind, value: &Value) -> Result<(), StreamError> {
        match (kind, value) {
            (PropertyKind::Object, Value::Object(object)) => self.write_object(object.as_ref()),
            (PropertyKind::List(element), Value::List(items)) => {
                self.sink.begin_list(element, items.len());
                for item in items {
                    self.write_value(element, item)?;
                }
                self.sink.end_list();
                Ok(())
            }
            _ => self
                .sink
                .write_scalar(kind, value)
                .map_err(|err| self.path.attach(err)),
        }
    }

    /// Ends the pass and returns the encoded bytes.
    pub fn finish(self) -> Vec<u8> {
        debug!("wrote {} objects at version {}", self.ids.len(), self.header.version);
        self.sink.into_bytes()
    }
}
