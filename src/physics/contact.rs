//! Contact Generation (narrow-phase)
//!
//! Exact AABB-vs-AABB test via the Minkowski difference. The separating
//! axis is the one with the shallower penetration; on an exact tie X wins.

use super::body::Body;
use crate::math::{sign, Vec2};
use crate::slot::Handle;

/// One detected overlap between two bodies, alive for a single substep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// The body whose test initiated this contact
    pub a: Handle,
    pub b: Handle,
    /// Unit axis pointing from `a` toward `b` (zero when the centers coincide on that axis)
    pub normal: Vec2,
    /// Penetration along `normal`
    pub pierce: Vec2,
    /// Cleared by a reaction hook to skip resolution
    pub active: bool,
}

impl Contact {
    /// Whether `handle` participates in this contact.
    pub fn involves(&self, handle: Handle) -> bool {
        self.a == handle || self.b == handle
    }

    /// The participant that is not `handle`.
    pub fn other(&self, handle: Handle) -> Option<Handle> {
        if self.a == handle {
            Some(self.b)
        } else if self.b == handle {
            Some(self.a)
        } else {
            None
        }
    }

    /// Penetration depth along the normal.
    pub fn depth(&self) -> f32 {
        self.pierce.abs().x.max(self.pierce.abs().y)
    }
}

/// Pair filter: at least one side's mask must see the other's layer.
///
/// Deliberately an OR, so a body with an empty mask is still seen by
/// bodies whose mask covers its layer.
pub fn layers_interact(a: &Body, b: &Body) -> bool {
    a.collision_mask.intersects(b.collision_layer) || b.collision_mask.intersects(a.collision_layer)
}

/// Test two boxes for overlap and build the contact if they do.
///
/// Returns `None` for disjoint or merely touching boxes. Does not apply the
/// layer filter; see [`layers_interact`].
pub fn collide(ha: Handle, a: &Body, hb: Handle, b: &Body) -> Option<Contact> {
    let delta = b.position - a.position;
    let sum = a.half_size + b.half_size;

    let overlaps = -sum.x < delta.x && delta.x < sum.x && -sum.y < delta.y && delta.y < sum.y;
    if !overlaps {
        return None;
    }

    let depth_x = sum.x - delta.x.abs();
    let depth_y = sum.y - delta.y.abs();

    let (normal, pierce) = if depth_x <= depth_y {
        let n = sign(delta.x);
        (Vec2::new(n, 0.0), Vec2::new(n * depth_x, 0.0))
    } else {
        let n = sign(delta.y);
        (Vec2::new(0.0, n), Vec2::new(0.0, n * depth_y))
    };

    Some(Contact {
        a: ha,
        b: hb,
        normal,
        pierce,
        active: true,
    })
}
