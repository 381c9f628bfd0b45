//! Schema-version gating of properties.

use core::fmt;

/// The closed range of stream versions a property exists in.
///
/// Gating is the only evolution mechanism: a property outside the range is
/// neither written nor read, and keeps the value its factory gave it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionGate {
    min: u32,
    max: Option<u32>,
}

impl VersionGate {
    /// A gate that permits every version.
    pub const ALWAYS: Self = Self { min: 0, max: None };

    /// Creates a gate from explicit bounds.
    ///
    /// # Panics
    ///
    /// Panics if `max < min`.
    #[inline]
    pub const fn new(min: u32, max: Option<u32>) -> Self {
        if let Some(max) = max {
            assert!(min <= max, "version gate upper bound below its lower bound");
        }
        Self { min, max }
    }

    /// Permits `min` and every later version.
    #[inline]
    pub const fn since(min: u32) -> Self {
        Self { min, max: None }
    }

    /// Returns a copy that stops permitting versions after `max`.
    ///
    /// A `max` below the lower bound yields a gate that permits nothing
    /// at or after `min`, which is what a property added and removed in the
    /// same revision needs.
    #[inline]
    pub const fn until(self, max: u32) -> Self {
        Self { min: self.min, max: Some(max) }
    }

    #[inline]
    pub const fn min(&self) -> u32 {
        self.min
    }

    #[inline]
    pub const fn max(&self) -> Option<u32> {
        self.max
    }

    /// Returns `true` if `version` lies inside the gate.
    #[inline]
    pub const fn permits(&self, version: u32) -> bool {
        if version < self.min {
            return false;
        }
        match self.max {
            Some(max) => version <= max,
            None => true,
        }
    }
}

impl Default for VersionGate {
    #[inline]
    fn default() -> Self {
        Self::ALWAYS
    }
}

impl fmt::Display for VersionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "[{}, {max}]", self.min),
            None => write!(f, "[{}, ..)", self.min),
        }
    }
}
