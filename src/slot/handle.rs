//! Generational Handles
//!
//! Handles are lightweight identifiers for pooled records. The generational
//! index pattern prevents dangling references:
//! - Each slot has a generation counter
//! - When a slot is recycled by a drain, its generation advances
//! - Old handles then fail lookups instead of aliasing the new occupant
//!
//! Slot indices are 1-based so the all-zero handle can serve as null.

use std::fmt;
use serde::{Serialize, Deserialize};

/// Identifier for one slot in a [`SlotPool`](super::SlotPool).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle {
    /// 1-based slot index (0 = null)
    index: u32,
    /// Version of the slot this handle was issued for
    generation: u32,
}

impl Handle {
    /// The null/invalid handle.
    pub const NULL: Handle = Handle { index: 0, generation: 0 };

    /// Should only be called by SlotPool.
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        debug_assert!(index != 0);
        Self { index, generation }
    }

    /// 1-based slot index.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn is_null(&self) -> bool {
        self.index == 0
    }

    /// Position of this handle's slot in backing storage, if not null.
    pub(crate) fn slot(&self) -> Option<usize> {
        (self.index as usize).checked_sub(1)
    }

    /// Pack into a single integer (index in the low 32 bits).
    pub fn to_bits(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    pub fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

impl Default for Handle {
    fn default() -> Self {
        Handle::NULL
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Handle(null)")
        } else {
            write!(f, "Handle({}v{})", self.index, self.generation)
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}
