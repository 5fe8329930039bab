//! Physics Module
//!
//! Axis-aligned box physics for 2D games, stepped at a fixed rate.
//!
//! Key concepts:
//! - Body: Plain data for one box, addressed by a generational Handle
//! - SpatialGrid: Uniform-grid broad-phase, rebuilt every substep
//! - Contact: One overlap found by the narrow-phase
//! - Reaction hooks: Gameplay callbacks that may cancel a contact or destroy bodies
//! - World: Owns all of the above and drives the fixed-timestep loop
//!
//! Design philosophy:
//! - Rebuild instead of maintain (no incremental broad-phase bookkeeping)
//! - Destroyed bodies stay visible until the next substep
//! - No allocation failure aborts; growth errors come back as `PhysicsError`

pub mod body;
pub mod contact;
pub mod grid;
pub mod solver;
pub mod timestep;
pub mod world;

// Re-export main types
pub use body::{Bodies, Body, BodyAccess, Layers, PreSolveFn};
pub use contact::{collide, layers_interact, Contact};
pub use grid::{CellRange, SpatialGrid};
pub use timestep::FixedTimestep;
pub use world::{PreSolveHook, TeardownHook, World};
