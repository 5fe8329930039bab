//! Error type for pool and world operations

use crate::slot::Handle;

/// Errors surfaced by the slot allocator and the physics world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhysicsError {
    /// Null, out-of-range, or stale (already reclaimed) handle
    InvalidHandle(Handle),
    /// Backing storage could not grow
    OutOfMemory {
        /// Number of elements the failed reservation asked for
        requested: usize,
    },
}

impl std::fmt::Display for PhysicsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhysicsError::InvalidHandle(h) => write!(f, "Invalid handle: {:?}", h),
            PhysicsError::OutOfMemory { requested } => {
                write!(f, "Out of memory: could not reserve {} more elements", requested)
            }
        }
    }
}

impl std::error::Error for PhysicsError {}

/// Reserve room for `additional` more elements, reporting failure instead of aborting.
pub(crate) fn try_reserve<T>(vec: &mut Vec<T>, additional: usize) -> Result<(), PhysicsError> {
    vec.try_reserve(additional)
        .map_err(|_| PhysicsError::OutOfMemory { requested: additional })
}
