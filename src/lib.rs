//! BONNIE-PHYS: Box physics core for BONNIE-32 games
//!
//! Small, predictable 2D collision and response:
//! - Generational handles over a slot pool with deferred deletion
//! - Uniform-grid broad-phase with separate static buckets
//! - Exact AABB narrow-phase and impulse response
//! - Fixed-timestep driver with reaction hooks for gameplay code

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod error;
pub mod math;
pub mod physics;
pub mod slot;

pub use config::{load_config, load_config_from_str, save_config, ConfigError, PhysicsConfig};
pub use error::PhysicsError;
pub use math::Vec2;
pub use physics::{Body, BodyAccess, Contact, Layers, World};
pub use slot::{Handle, SlotPool};
