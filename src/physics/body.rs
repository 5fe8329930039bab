//! Body Records
//!
//! Plain data for one physical body. Bodies are created zeroed by the pool
//! and filled in by their owner right after creation; the core only reads
//! the fields it needs for pairing, solving, and integration.

use std::ops::{BitAnd, BitOr, BitOrAssign};
use serde::{Serialize, Deserialize};

use super::contact::Contact;
use crate::error::PhysicsError;
use crate::math::Vec2;
use crate::slot::{Handle, SlotPool};

/// The body store: a slot pool of bodies.
pub type Bodies = SlotPool<Body>;

/// Per-body reaction hook, invoked before a contact involving this body is solved.
///
/// May clear `contact.active` to cancel resolution, and may destroy either body.
pub type PreSolveFn = fn(&mut Contact, &mut BodyAccess<'_>);

/// What a reaction hook may do to the body store mid-substep.
///
/// Everything except reclaiming: records destroyed here stay readable and
/// collidable until the next substep drains them.
pub struct BodyAccess<'w> {
    bodies: &'w mut Bodies,
}

impl<'w> BodyAccess<'w> {
    pub(crate) fn new(bodies: &'w mut Bodies) -> Self {
        Self { bodies }
    }

    pub fn get(&self, handle: Handle) -> Result<&Body, PhysicsError> {
        self.bodies.get(handle)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut Body, PhysicsError> {
        self.bodies.get_mut(handle)
    }

    pub fn get_pair_mut(&mut self, a: Handle, b: Handle) -> Result<(&mut Body, &mut Body), PhysicsError> {
        self.bodies.get_pair_mut(a, b)
    }

    /// Spawn a body. It joins the broad-phase from the next substep on.
    pub fn create(&mut self) -> Result<Handle, PhysicsError> {
        self.bodies.alloc()
    }

    /// Mark a body for deletion at the next drain.
    pub fn destroy(&mut self, handle: Handle) -> Result<(), PhysicsError> {
        self.bodies.free(handle)
    }

    /// Body exists and has not been destroyed.
    pub fn is_alive(&self, handle: Handle) -> bool {
        self.bodies.is_live(handle)
    }
}

/// Collision layer bitset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Layers(pub u32);

impl Layers {
    pub const NONE: Layers = Layers(0);
    pub const ALL: Layers = Layers(u32::MAX);

    /// Single-layer set for bit `n`. Bits past 31 give the empty set.
    pub const fn bit(n: u32) -> Layers {
        match 1u32.checked_shl(n) {
            Some(bits) => Layers(bits),
            None => Layers::NONE,
        }
    }

    pub fn intersects(self, other: Layers) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Layers {
    type Output = Layers;
    fn bitor(self, other: Layers) -> Layers {
        Layers(self.0 | other.0)
    }
}

impl BitOrAssign for Layers {
    fn bitor_assign(&mut self, other: Layers) {
        self.0 |= other.0;
    }
}

impl BitAnd for Layers {
    type Output = Layers;
    fn bitand(self, other: Layers) -> Layers {
        Layers(self.0 & other.0)
    }
}

/// One axis-aligned box body.
#[derive(Debug, Clone, Default)]
pub struct Body {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Force accumulator. Cleared once per `World::update`, not per substep.
    pub accel: Vec2,
    /// AABB half extents
    pub half_size: Vec2,

    pub mass: f32,
    pub restitution: f32,
    /// Linear drag coefficient applied during integration
    pub damping: f32,

    /// Never moved by the solver; only tested against dynamic bodies
    pub is_static: bool,
    /// Skipped by integration (still collides)
    pub no_update: bool,

    /// What this body advertises for contact generation
    pub collision_layer: Layers,
    /// What this body tests against for contact generation
    pub collision_mask: Layers,
    /// Carried for consumers that gate response separately; unused by the core
    pub solve_layer: Layers,
    pub solve_mask: Layers,

    /// Owner tag so gameplay code can identify the body in callbacks
    pub user_data: u64,
    pub pre_solve: Option<PreSolveFn>,
}

impl Body {
    /// Inverse mass used by the solver. Static or massless bodies are immovable.
    pub fn inv_mass(&self) -> f32 {
        if self.is_static || self.mass <= 0.0 {
            0.0
        } else {
            1.0 / self.mass
        }
    }

    /// Minimum corner of the AABB.
    pub fn min(&self) -> Vec2 {
        self.position - self.half_size
    }

    /// Maximum corner of the AABB.
    pub fn max(&self) -> Vec2 {
        self.position + self.half_size
    }

    /// Semi-implicit Euler step with linear damping.
    pub fn integrate(&mut self, dt: f32) {
        let accel_total = self.accel - self.velocity * self.damping;
        self.velocity += accel_total * dt;
        self.position += self.velocity * dt;
    }

    /// Add to the force accumulator for this frame.
    pub fn push(&mut self, accel: Vec2) {
        self.accel += accel;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_zeroed() {
        let body = Body::default();
        assert_eq!(body.position, Vec2::ZERO);
        assert_eq!(body.mass, 0.0);
        assert!(!body.is_static);
        assert!(body.collision_layer.is_empty());
        assert!(body.pre_solve.is_none());
        assert_eq!(body.user_data, 0);
    }

    #[test]
    fn test_inv_mass() {
        let mut body = Body { mass: 4.0, ..Default::default() };
        assert_eq!(body.inv_mass(), 0.25);
        body.is_static = true;
        assert_eq!(body.inv_mass(), 0.0);
        body.is_static = false;
        body.mass = 0.0;
        assert_eq!(body.inv_mass(), 0.0);
    }

    #[test]
    fn test_integrate_semi_implicit() {
        let mut body = Body {
            velocity: Vec2::new(2.0, 0.0),
            accel: Vec2::new(0.0, 4.0),
            damping: 0.5,
            ..Default::default()
        };
        body.integrate(0.5);
        // accel_total = (0,4) - (2,0)*0.5 = (-1,4); v = (2,0) + (-0.5,2) = (1.5,2)
        assert_eq!(body.velocity, Vec2::new(1.5, 2.0));
        // Position uses the updated velocity
        assert_eq!(body.position, Vec2::new(0.75, 1.0));
    }

    #[test]
    fn test_layers() {
        let a = Layers::bit(0) | Layers::bit(3);
        assert!(a.intersects(Layers::bit(3)));
        assert!(!a.intersects(Layers::bit(1)));
        assert_eq!(a & Layers::bit(0), Layers::bit(0));
        assert!(!Layers::NONE.intersects(Layers::ALL));
        assert_eq!(Layers::bit(31), Layers(0x8000_0000));
        assert_eq!(Layers::bit(32), Layers::NONE);
        assert!(Layers::bit(u32::MAX).is_empty());
    }
}
