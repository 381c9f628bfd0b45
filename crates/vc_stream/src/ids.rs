//! Per-stream identity tables.
//!
//! Ids start at 1, the binary format reserves 0 for null references.

use alloc::vec::Vec;

use vc_wrap::hash::HashMap;
use vc_wrap::{ObjectId, ObjectRef};

// -----------------------------------------------------------------------------
// WriteIds

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteState {
    /// Id handed out, body still being written.
    Reserved,
    Written,
}

/// Write side: object identity to id.
///
/// Every object that got an id is pinned until the stream is dropped, so an
/// address cannot be reused by another object mid-pass.
#[derive(Default)]
pub(crate) struct WriteIds {
    entries: HashMap<ObjectId, (u32, WriteState)>,
    pinned: Vec<ObjectRef>,
}

impl WriteIds {
    pub fn get(&self, object: &ObjectRef) -> Option<(u32, WriteState)> {
        self.entries.get(&object.id()).copied()
    }

    /// Hands out the next id. The object must not have one yet.
    pub fn reserve(&mut self, object: &ObjectRef) -> u32 {
        debug_assert!(self.get(object).is_none());
        let id = self.pinned.len() as u32 + 1;
        self.entries.insert(object.id(), (id, WriteState::Reserved));
        self.pinned.push(object.clone());
        id
    }

    pub fn mark_written(&mut self, object: &ObjectRef) {
        if let Some((_, state)) = self.entries.get_mut(&object.id()) {
            *state = WriteState::Written;
        }
    }

    pub fn len(&self) -> usize {
        self.pinned.len()
    }
}

// -----------------------------------------------------------------------------
// ReadIds

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadState {
    /// Registered before its fields were read, back-references may already
    /// see it partially populated.
    UnderConstruction,
    Complete,
}

/// Read side: id to the reconstructed instance.
#[derive(Default)]
pub(crate) struct ReadIds {
    entries: HashMap<u32, (ObjectRef, ReadState)>,
}

impl ReadIds {
    #[inline]
    pub fn contains(&self, id: u32) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn get(&self, id: u32) -> Option<(&ObjectRef, ReadState)> {
        self.entries.get(&id).map(|(object, state)| (object, *state))
    }

    pub fn begin(&mut self, id: u32, object: ObjectRef) {
        self.entries.insert(id, (object, ReadState::UnderConstruction));
    }

    pub fn complete(&mut self, id: u32) {
        if let Some((_, state)) = self.entries.get_mut(&id) {
            *state = ReadState::Complete;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
