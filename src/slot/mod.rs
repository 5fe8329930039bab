//! Slot Allocator
//!
//! Generic handle-indexed object pool with deferred deletion.
//!
//! Key concepts:
//! - Handle: generational index, zero is null
//! - SlotPool: array-backed storage with an intrusive live list
//! - Free vs drain: `free` only marks and queues; `drain` reclaims
//!
//! The physics world stores its bodies in a `SlotPool<Body>` and drains it
//! once per substep, so a body deleted from inside a contact callback stays
//! visible for the rest of the pass that deleted it.

pub mod handle;
pub mod pool;

pub use handle::Handle;
pub use pool::{Iter, SlotPool};
