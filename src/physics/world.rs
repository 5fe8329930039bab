//! Physics World
//!
//! The World owns everything one simulation needs:
//! - The body store (slot pool with deferred deletion)
//! - The broad-phase grid, rebuilt every substep
//! - The fixed-timestep clock
//! - The world-wide reaction hook and the teardown hook
//!
//! Per substep, strictly in this order:
//! 1. Drain bodies destroyed since the last substep
//! 2. Rebuild the grid from the live list
//! 3. Test candidate pairs, run reaction hooks, solve accepted contacts
//! 4. Integrate every body
//!
//! A body destroyed during step 3 keeps colliding and is still integrated
//! in step 4; it only disappears at the next substep's drain. Gameplay code
//! relies on that extra step of visibility.

use super::body::{Bodies, Body, BodyAccess};
use super::contact::{collide, layers_interact, Contact};
use super::grid::SpatialGrid;
use super::solver;
use super::timestep::FixedTimestep;
use crate::config::PhysicsConfig;
use crate::error::PhysicsError;
use crate::math::Vec2;
use crate::slot::Handle;

/// World-wide reaction hook, run for every contact before the per-body hooks.
pub type PreSolveHook = Box<dyn FnMut(&mut Contact, &mut BodyAccess<'_>)>;

/// Called for each body as it is reclaimed, so owners can release whatever
/// they attached to it.
pub type TeardownHook = Box<dyn FnMut(Handle, &mut Body)>;

/// A self-contained 2D physics simulation.
pub struct World {
    bodies: Bodies,
    grid: SpatialGrid,
    clock: FixedTimestep,
    config: PhysicsConfig,
    pre_solve: Option<PreSolveHook>,
    teardown: Option<TeardownHook>,
    /// Candidate pairs for the current substep (reused buffer)
    pairs: Vec<(Handle, Handle)>,
    /// Overlaps detected during the last update that ran a substep
    hits: Vec<(Handle, Handle)>,
    /// Substeps run since creation or the last reset
    substeps: u64,
}

impl World {
    /// Create an empty world. Call [`PhysicsConfig::validate`] first for
    /// settings that came from outside the program.
    pub fn new(config: PhysicsConfig) -> Result<Self, PhysicsError> {
        let grid = SpatialGrid::new(config.cell_size, config.grid_width, config.grid_height)?;
        log::debug!(
            "physics world created: step {:.5}s, grid {}x{} @ {}",
            config.fixed_step, config.grid_width, config.grid_height, config.cell_size
        );
        Ok(Self {
            bodies: Bodies::new(),
            grid,
            clock: FixedTimestep::new(config.fixed_step),
            config,
            pre_solve: None,
            teardown: None,
            pairs: Vec::new(),
            hits: Vec::new(),
            substeps: 0,
        })
    }

    /// Current settings (reflects later `set_*` calls).
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    // =========================================================================
    // Body Management
    // =========================================================================

    /// Create a zeroed body. The caller fills in its fields right away.
    pub fn create(&mut self) -> Result<Handle, PhysicsError> {
        self.bodies.alloc()
    }

    /// Create a body initialised from `body`.
    pub fn insert(&mut self, body: Body) -> Result<Handle, PhysicsError> {
        let handle = self.bodies.alloc()?;
        *self.bodies.get_mut(handle)? = body;
        Ok(handle)
    }

    /// Mark a body for deletion. It stays valid until the next substep drains it.
    ///
    /// Destroying a body that is already pending is a no-op.
    pub fn destroy(&mut self, handle: Handle) -> Result<(), PhysicsError> {
        self.bodies.free(handle)
    }

    pub fn body(&self, handle: Handle) -> Result<&Body, PhysicsError> {
        self.bodies.get(handle)
    }

    pub fn body_mut(&mut self, handle: Handle) -> Result<&mut Body, PhysicsError> {
        self.bodies.get_mut(handle)
    }

    /// Body exists and has not been destroyed.
    pub fn is_alive(&self, handle: Handle) -> bool {
        self.bodies.is_live(handle)
    }

    /// Handle still resolves (alive, or destroyed but not yet drained).
    pub fn contains(&self, handle: Handle) -> bool {
        self.bodies.contains(handle)
    }

    /// Bodies on the live list, including ones pending deletion.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Handles on the live list, newest first.
    pub fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.bodies.handles()
    }

    /// Read-only view of the body store, e.g. for drawing.
    pub fn bodies(&self) -> &Bodies {
        &self.bodies
    }

    pub fn bodies_mut(&mut self) -> &mut Bodies {
        &mut self.bodies
    }

    /// Reclaim destroyed bodies now instead of at the next substep.
    ///
    /// Returns the number of bodies reclaimed.
    pub fn drain(&mut self) -> usize {
        let teardown = &mut self.teardown;
        let drained = self.bodies.drain(|handle, body| {
            if let Some(hook) = teardown.as_mut() {
                hook(handle, body);
            }
        });
        if drained > 0 {
            log::trace!("drained {} bodies", drained);
        }
        drained
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Resize the broad-phase grid, discarding the previous sizing.
    pub fn set_grid_size(&mut self, width: u32, height: u32) -> Result<(), PhysicsError> {
        self.grid.resize(width, height)?;
        self.config.grid_width = width;
        self.config.grid_height = height;
        Ok(())
    }

    pub fn set_cell_size(&mut self, cell_size: f32) {
        self.grid.set_cell_size(cell_size);
        self.config.cell_size = cell_size;
    }

    /// Change the substep length. Banked frame time is kept.
    pub fn set_fixed_step(&mut self, step: f32) {
        self.clock.set_step(step);
        self.config.fixed_step = step;
    }

    /// Install the world-wide reaction hook, replacing any previous one.
    pub fn set_pre_solve(&mut self, hook: impl FnMut(&mut Contact, &mut BodyAccess<'_>) + 'static) {
        self.pre_solve = Some(Box::new(hook));
    }

    pub fn clear_pre_solve(&mut self) {
        self.pre_solve = None;
    }

    /// Install the teardown hook run on each body as it is reclaimed.
    pub fn set_teardown(&mut self, hook: impl FnMut(Handle, &mut Body) + 'static) {
        self.teardown = Some(Box::new(hook));
    }

    // =========================================================================
    // Simulation
    // =========================================================================

    /// Advance by one frame of `delta_seconds`.
    ///
    /// Runs as many fixed substeps as the banked time allows and carries the
    /// remainder to the next call. Afterwards every body's force accumulator
    /// is cleared, once per call regardless of how many substeps ran.
    /// Returns the number of substeps run.
    pub fn update(&mut self, delta_seconds: f32) -> Result<usize, PhysicsError> {
        if !self.clock.accumulate(delta_seconds) {
            log::warn!("ignoring invalid frame delta {}", delta_seconds);
        }

        let mut ran = 0;
        while self.clock.consume() {
            if ran == 0 {
                self.hits.clear();
            }
            self.step()?;
            ran += 1;
        }

        self.bodies.for_each_mut(|_, body| body.accel = Vec2::ZERO);
        Ok(ran)
    }

    /// Run exactly one substep of `fixed_step` seconds, ignoring the clock.
    pub fn step(&mut self) -> Result<(), PhysicsError> {
        let dt = self.clock.step();

        self.drain();

        let uncovered = self.grid.rebuild(&self.bodies)?;
        if uncovered > 0 {
            log::trace!("{} bodies outside the broad-phase grid", uncovered);
        }

        let mut pairs = std::mem::take(&mut self.pairs);
        pairs.clear();
        self.grid.collect_pairs(&mut pairs);
        for &(a, b) in &pairs {
            self.process_pair(a, b);
        }
        self.pairs = pairs;

        self.bodies.for_each_mut(|_, body| {
            if !body.no_update {
                body.integrate(dt);
            }
        });

        self.substeps += 1;
        Ok(())
    }

    /// Filter, test, run hooks, and solve one candidate pair.
    fn process_pair(&mut self, ha: Handle, hb: Handle) {
        let (Ok(a), Ok(b)) = (self.bodies.get(ha), self.bodies.get(hb)) else {
            return;
        };
        if !layers_interact(a, b) {
            return;
        }
        let Some(mut contact) = collide(ha, a, hb, b) else {
            return;
        };
        let hook_a = a.pre_solve;
        let hook_b = b.pre_solve;

        self.hits.push((ha, hb));

        {
            let mut access = BodyAccess::new(&mut self.bodies);
            if let Some(hook) = self.pre_solve.as_mut() {
                hook(&mut contact, &mut access);
            }
            if let Some(hook) = hook_a {
                hook(&mut contact, &mut access);
            }
            if let Some(hook) = hook_b {
                hook(&mut contact, &mut access);
            }
        }

        if !contact.active {
            return;
        }
        if let Ok((a, b)) = self.bodies.get_pair_mut(ha, hb) {
            solver::resolve(&contact, a, b);
        }
    }

    /// Time banked but not yet simulated.
    pub fn accumulator(&self) -> f32 {
        self.clock.accumulator()
    }

    /// Substeps run since creation or the last reset.
    pub fn substep_count(&self) -> u64 {
        self.substeps
    }

    /// Bodies that overlapped `handle` during the most recent update that
    /// ran at least one substep, in detection order without repeats.
    ///
    /// Includes overlaps a reaction hook cancelled.
    pub fn recent_hits(&self, handle: Handle) -> Result<Vec<Handle>, PhysicsError> {
        self.bodies.get(handle)?;
        let mut out = Vec::new();
        for &(a, b) in &self.hits {
            let other = if a == handle {
                b
            } else if b == handle {
                a
            } else {
                continue;
            };
            if !out.contains(&other) {
                out.push(other);
            }
        }
        Ok(out)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Tear down every body and zero the clock. Hooks and settings are kept.
    pub fn reset(&mut self) {
        let teardown = &mut self.teardown;
        self.bodies.clear(|handle, body| {
            if let Some(hook) = teardown.as_mut() {
                hook(handle, body);
            }
        });
        self.grid.clear();
        self.clock.reset();
        self.pairs.clear();
        self.hits.clear();
        self.substeps = 0;
        log::debug!("physics world reset");
    }

    /// Tear down every body and release the world.
    pub fn shutdown(mut self) {
        self.reset();
        log::debug!("physics world shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body::Layers;
    use std::cell::RefCell;
    use std::rc::Rc;

    const STEP: f32 = 0.25;

    fn world() -> World {
        World::new(PhysicsConfig {
            fixed_step: STEP,
            cell_size: 4.0,
            grid_width: 8,
            grid_height: 8,
        })
        .unwrap()
    }

    fn solid(x: f32, y: f32, half: f32) -> Body {
        Body {
            position: Vec2::new(x, y),
            half_size: Vec2::splat(half),
            mass: 1.0,
            collision_layer: Layers::bit(0),
            collision_mask: Layers::bit(0),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_returns_zeroed_body() {
        let mut world = world();
        let h = world.create().unwrap();
        let body = world.body(h).unwrap();
        assert_eq!(body.position, Vec2::ZERO);
        assert_eq!(body.mass, 0.0);
        assert!(world.is_alive(h));
    }

    #[test]
    fn test_stale_handle_is_invalid() {
        let mut world = world();
        let h = world.create().unwrap();
        world.destroy(h).unwrap();
        world.drain();
        assert_eq!(world.body(h).err(), Some(PhysicsError::InvalidHandle(h)));
        assert!(world.body_mut(Handle::NULL).is_err());
    }

    #[test]
    fn test_update_counts_substeps_and_carries_remainder() {
        let mut world = world();
        assert_eq!(world.update(0.125).unwrap(), 0);
        assert_eq!(world.update(0.5).unwrap(), 2);
        assert_eq!(world.accumulator(), 0.125);
        assert_eq!(world.update(0.125).unwrap(), 1);
        assert_eq!(world.accumulator(), 0.0);
        assert_eq!(world.substep_count(), 3);

        // Bad deltas bank nothing
        assert_eq!(world.update(-1.0).unwrap(), 0);
        assert_eq!(world.accumulator(), 0.0);
    }

    #[test]
    fn test_total_substeps_floor_of_total_time() {
        let mut world = world();
        let deltas = [0.0625, 0.375, 0.5, 0.03125, 0.25, 0.9375];
        let total: f32 = deltas.iter().sum();
        let mut steps = 0;
        for d in deltas {
            steps += world.update(d).unwrap();
        }
        assert_eq!(steps, (total / STEP).floor() as usize);
    }

    #[test]
    fn test_force_held_across_substeps_then_cleared() {
        let mut world = world();
        let h = world
            .insert(Body {
                position: Vec2::new(16.0, 16.0),
                mass: 1.0,
                ..Default::default()
            })
            .unwrap();
        world.body_mut(h).unwrap().push(Vec2::new(4.0, 0.0));

        // Two substeps in one frame, both see the force
        assert_eq!(world.update(0.5).unwrap(), 2);
        let body = world.body(h).unwrap();
        assert_eq!(body.velocity, Vec2::new(2.0, 0.0));
        // x += 1*0.25 then 2*0.25
        assert_eq!(body.position, Vec2::new(16.75, 16.0));
        assert_eq!(body.accel, Vec2::ZERO);

        // Next frame coasts
        world.update(0.25).unwrap();
        let body = world.body(h).unwrap();
        assert_eq!(body.velocity, Vec2::new(2.0, 0.0));
    }

    #[test]
    fn test_accel_cleared_even_without_substep() {
        let mut world = world();
        let h = world.create().unwrap();
        world.body_mut(h).unwrap().accel = Vec2::new(1.0, 1.0);
        assert_eq!(world.update(0.0625).unwrap(), 0);
        assert_eq!(world.body(h).unwrap().accel, Vec2::ZERO);
    }

    #[test]
    fn test_no_update_skips_integration() {
        let mut world = world();
        let h = world
            .insert(Body {
                velocity: Vec2::new(1.0, 0.0),
                no_update: true,
                ..Default::default()
            })
            .unwrap();
        world.step().unwrap();
        assert_eq!(world.body(h).unwrap().position, Vec2::ZERO);
    }

    #[test]
    fn test_dynamic_rests_on_static() {
        let mut world = world();
        let mut floor = solid(16.0, 16.0, 2.0);
        floor.is_static = true;
        let floor = world.insert(floor).unwrap();
        let box_ = world.insert(solid(16.0, 19.5, 2.0)).unwrap();

        world.step().unwrap();

        // Penetration of 0.5 on Y pushes only the dynamic box
        assert_eq!(world.body(floor).unwrap().position, Vec2::new(16.0, 16.0));
        assert_eq!(world.body(box_).unwrap().position, Vec2::new(16.0, 20.0));
    }

    #[test]
    fn test_equal_masses_split_correction() {
        let mut world = world();
        let a = world.insert(solid(13.0, 14.0, 1.0)).unwrap();
        let b = world.insert(solid(14.5, 14.0, 1.0)).unwrap();

        world.step().unwrap();

        let pa = world.body(a).unwrap().position;
        let pb = world.body(b).unwrap().position;
        assert_eq!(pa.x + pb.x, 27.5);
        assert_eq!(pb.x - pa.x, 2.0);
    }

    #[test]
    fn test_mask_filter_blocks_contact() {
        let mut world = world();
        let mut a = solid(13.0, 14.0, 1.0);
        let mut b = solid(14.0, 14.0, 1.0);
        a.collision_layer = Layers::bit(1);
        a.collision_mask = Layers::bit(1);
        b.collision_layer = Layers::bit(2);
        b.collision_mask = Layers::bit(2);
        let ha = world.insert(a).unwrap();
        let hb = world.insert(b).unwrap();

        world.update(STEP).unwrap();

        assert_eq!(world.body(ha).unwrap().position, Vec2::new(13.0, 14.0));
        assert_eq!(world.body(hb).unwrap().position, Vec2::new(14.0, 14.0));
        assert!(world.recent_hits(ha).unwrap().is_empty());
    }

    #[test]
    fn test_zero_mask_body_still_hit() {
        let mut world = world();
        let mut bolt = solid(13.0, 14.0, 1.0);
        bolt.collision_mask = Layers::NONE;
        let bolt = world.insert(bolt).unwrap();
        let target = world.insert(solid(14.0, 14.0, 1.0)).unwrap();

        world.update(STEP).unwrap();
        assert_eq!(world.recent_hits(bolt).unwrap(), vec![target]);
        assert_eq!(world.recent_hits(target).unwrap(), vec![bolt]);
    }

    #[test]
    fn test_hook_can_cancel_resolution() {
        let mut world = world();
        let a = world.insert(solid(13.0, 14.0, 1.0)).unwrap();
        let b = world.insert(solid(14.0, 14.0, 1.0)).unwrap();
        let calls = Rc::new(RefCell::new(0));
        let seen = calls.clone();
        world.set_pre_solve(move |contact, _| {
            *seen.borrow_mut() += 1;
            contact.active = false;
        });

        world.step().unwrap();

        assert_eq!(*calls.borrow(), 1);
        assert_eq!(world.body(a).unwrap().position, Vec2::new(13.0, 14.0));
        assert_eq!(world.body(b).unwrap().position, Vec2::new(14.0, 14.0));
    }

    fn cancel_and_tag(contact: &mut Contact, bodies: &mut BodyAccess<'_>) {
        contact.active = false;
        if let Ok(body) = bodies.get_mut(contact.a) {
            body.user_data += 1;
        }
    }

    #[test]
    fn test_per_body_hook() {
        let mut world = world();
        let mut a = solid(13.0, 14.0, 1.0);
        a.pre_solve = Some(cancel_and_tag);
        let a = world.insert(a).unwrap();
        let b = world.insert(solid(14.0, 14.0, 1.0)).unwrap();

        world.step().unwrap();

        assert_eq!(world.body(a).unwrap().user_data, 1);
        assert_eq!(world.body(b).unwrap().position, Vec2::new(14.0, 14.0));
    }

    #[test]
    fn test_deleted_in_hook_visible_until_next_drain() {
        let mut world = world();
        let bullet = world
            .insert(Body {
                velocity: Vec2::new(4.0, 0.0),
                ..solid(13.0, 14.0, 1.0)
            })
            .unwrap();
        let target = world.insert(solid(14.0, 14.0, 1.0)).unwrap();
        let mut wall = solid(13.0, 14.5, 1.0);
        wall.is_static = true;
        let wall = world.insert(wall).unwrap();

        let hits = Rc::new(RefCell::new(Vec::new()));
        let log = hits.clone();
        world.set_pre_solve(move |contact, bodies| {
            log.borrow_mut().push((contact.a, contact.b));
            if contact.a == bullet || contact.b == bullet {
                bodies.destroy(bullet).unwrap();
                // Destroying twice is harmless
                bodies.destroy(bullet).unwrap();
                assert!(!bodies.is_alive(bullet));
                assert!(bodies.get(bullet).is_ok());
            }
        });
        let torn_down = Rc::new(RefCell::new(Vec::new()));
        let td = torn_down.clone();
        world.set_teardown(move |h, _| td.borrow_mut().push(h));

        world.step().unwrap();

        // Bullet collided with both target and wall despite being destroyed on the first contact
        let seen = hits.borrow().clone();
        assert!(seen.iter().filter(|(a, b)| *a == bullet || *b == bullet).count() >= 2);
        assert!(seen.iter().any(|&(a, b)| (a, b) == (bullet, wall)));
        assert!(seen.iter().any(|&(a, b)| a == target || b == target));

        // Still readable and integrated during the substep that destroyed it
        assert!(world.contains(bullet));
        assert!(!world.is_alive(bullet));
        assert!(world.handles().any(|h| h == bullet));
        assert!(torn_down.borrow().is_empty());

        world.step().unwrap();
        assert_eq!(*torn_down.borrow(), vec![bullet]);
        assert!(world.body(bullet).is_err());
        assert!(!world.handles().any(|h| h == bullet));

        // Slot is reused under a new generation
        let fresh = world.create().unwrap();
        assert_eq!(fresh.index(), bullet.index());
        assert_ne!(fresh, bullet);
    }

    #[test]
    fn test_destroyed_between_steps_is_drained_first() {
        let mut world = world();
        let h = world
            .insert(Body {
                position: Vec2::new(16.0, 16.0),
                velocity: Vec2::new(4.0, 0.0),
                ..Default::default()
            })
            .unwrap();
        world.destroy(h).unwrap();
        assert!(world.body(h).is_ok());

        world.step().unwrap();
        assert!(world.body(h).is_err());
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn test_destroyed_in_hook_is_still_integrated() {
        let mut world = world();
        let a = world
            .insert(Body {
                velocity: Vec2::new(4.0, 0.0),
                ..solid(13.0, 14.0, 1.0)
            })
            .unwrap();
        world.insert(solid(14.0, 14.0, 1.0)).unwrap();
        world.set_pre_solve(move |contact, bodies| {
            contact.active = false;
            bodies.destroy(a).unwrap();
        });

        world.step().unwrap();

        let body = world.body(a).unwrap();
        assert_eq!(body.position, Vec2::new(14.0, 14.0));
        assert!(!world.is_alive(a));
    }

    #[test]
    fn test_recent_hits_cleared_per_update() {
        let mut world = world();
        let a = world.insert(solid(13.0, 14.0, 1.0)).unwrap();
        let b = world.insert(solid(14.0, 14.0, 1.0)).unwrap();
        world.set_pre_solve(|contact, _| contact.active = false);

        world.update(STEP).unwrap();
        assert_eq!(world.recent_hits(a).unwrap(), vec![b]);

        // A frame with no substep keeps the previous hits
        world.update(0.0625).unwrap();
        assert_eq!(world.recent_hits(a).unwrap(), vec![b]);

        world.body_mut(b).unwrap().position = Vec2::new(24.0, 24.0);
        world.update(STEP).unwrap();
        assert!(world.recent_hits(a).unwrap().is_empty());
        assert!(world.recent_hits(Handle::NULL).is_err());
    }

    #[test]
    fn test_set_grid_size_discards_coverage() {
        let mut world = world();
        let a = world.insert(solid(13.0, 14.0, 1.0)).unwrap();
        world.insert(solid(14.0, 14.0, 1.0)).unwrap();

        world.set_grid_size(1, 1).unwrap();
        assert_eq!(world.config().grid_width, 1);
        world.step().unwrap();
        // Both bodies sit outside the single 4x4 cell now
        assert_eq!(world.body(a).unwrap().position, Vec2::new(13.0, 14.0));
    }

    #[test]
    fn test_reset_tears_down_all_bodies() {
        let mut world = world();
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        world.set_teardown(move |_, _| *c.borrow_mut() += 1);

        let a = world.create().unwrap();
        let b = world.create().unwrap();
        world.destroy(b).unwrap();
        world.update(0.125).unwrap();

        world.reset();
        assert_eq!(*count.borrow(), 2);
        assert_eq!(world.body_count(), 0);
        assert!(world.body(a).is_err());
        assert_eq!(world.accumulator(), 0.0);
        assert_eq!(world.substep_count(), 0);
    }

    #[test]
    fn test_shutdown_runs_teardown() {
        let mut world = world();
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        world.set_teardown(move |_, _| *c.borrow_mut() += 1);
        world.create().unwrap();
        world.create().unwrap();
        world.shutdown();
        assert_eq!(*count.borrow(), 2);
    }
}
