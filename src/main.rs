//! BONNIE-PHYS Sandbox
//!
//! Interactive playground for the physics core:
//! - Left click drops a crate
//! - Right click fires a projectile from the left wall toward the cursor
//! - R clears everything and rebuilds the arena
//!
//! Projectiles have an empty collision mask, so they only hit bodies that
//! look for them, and are destroyed by the world reaction hook on impact.

use macroquad::prelude::*;

use bonnie_phys::physics::BodyAccess;
use bonnie_phys::{Body, Contact, Handle, Layers, PhysicsConfig, Vec2, World, VERSION};

/// Arena size in world units
const ARENA_W: f32 = 1024.0;
const ARENA_H: f32 = 576.0;
const WALL: f32 = 16.0;
const GRAVITY: f32 = 900.0;
const PROJECTILE_SPEED: f32 = 900.0;

/// `Body::user_data` tags
const TAG_WALL: u64 = 1;
const TAG_CRATE: u64 = 2;
const TAG_PROJECTILE: u64 = 3;

const LAYER_SOLID: Layers = Layers::bit(0);
const LAYER_PROJECTILE: Layers = Layers::bit(1);

fn window_conf() -> Conf {
    Conf {
        window_title: format!("BONNIE-PHYS Sandbox v{}", VERSION),
        window_width: 1280,
        window_height: 720,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

/// Settings file on native, built-in defaults everywhere else.
fn sandbox_config() -> PhysicsConfig {
    #[cfg(not(target_arch = "wasm32"))]
    {
        match bonnie_phys::load_config("assets/sandbox.ron") {
            Ok(config) => return config,
            Err(e) => log::warn!("using default physics config ({})", e),
        }
    }
    PhysicsConfig::default()
}

/// Destroy projectiles on impact. The contact stays active so the hit still pushes.
fn on_contact(contact: &mut Contact, bodies: &mut BodyAccess<'_>) {
    for handle in [contact.a, contact.b] {
        let is_projectile = bodies
            .get(handle)
            .map(|body| body.user_data == TAG_PROJECTILE)
            .unwrap_or(false);
        if is_projectile {
            if let Err(e) = bodies.destroy(handle) {
                log::error!("failed to destroy projectile {}: {}", handle, e);
            }
        }
    }
}

fn spawn_arena(world: &mut World) -> Result<(), bonnie_phys::PhysicsError> {
    let pieces = [
        // Floor
        (Vec2::new(ARENA_W * 0.5, ARENA_H - WALL * 0.5), Vec2::new(ARENA_W * 0.5, WALL * 0.5)),
        // Left and right walls
        (Vec2::new(WALL * 0.5, ARENA_H * 0.5), Vec2::new(WALL * 0.5, ARENA_H * 0.5)),
        (Vec2::new(ARENA_W - WALL * 0.5, ARENA_H * 0.5), Vec2::new(WALL * 0.5, ARENA_H * 0.5)),
        // Ledge
        (Vec2::new(ARENA_W * 0.65, ARENA_H * 0.6), Vec2::new(96.0, 8.0)),
    ];
    for (position, half_size) in pieces {
        world.insert(Body {
            position,
            half_size,
            mass: 1.0,
            is_static: true,
            collision_layer: LAYER_SOLID,
            collision_mask: LAYER_SOLID,
            user_data: TAG_WALL,
            ..Default::default()
        })?;
    }
    Ok(())
}

fn spawn_crate(world: &mut World, at: Vec2) -> Result<Handle, bonnie_phys::PhysicsError> {
    let half = 10.0 + rand_range(0.0, 14.0);
    world.insert(Body {
        position: at,
        half_size: Vec2::splat(half),
        mass: half * half * 0.01,
        restitution: 0.1,
        damping: 0.2,
        collision_layer: LAYER_SOLID,
        collision_mask: LAYER_SOLID | LAYER_PROJECTILE,
        user_data: TAG_CRATE,
        ..Default::default()
    })
}

fn spawn_projectile(world: &mut World, toward: Vec2) -> Result<Handle, bonnie_phys::PhysicsError> {
    let origin = Vec2::new(WALL * 3.0, ARENA_H * 0.5);
    let dir = toward - origin;
    let len = dir.length();
    let velocity = if len > 0.0 {
        dir.scale(PROJECTILE_SPEED / len)
    } else {
        Vec2::new(PROJECTILE_SPEED, 0.0)
    };
    world.insert(Body {
        position: origin,
        velocity,
        half_size: Vec2::splat(4.0),
        mass: 0.5,
        collision_layer: LAYER_PROJECTILE,
        collision_mask: Layers::NONE,
        user_data: TAG_PROJECTILE,
        ..Default::default()
    })
}

fn rand_range(lo: f32, hi: f32) -> f32 {
    macroquad::rand::gen_range(lo, hi)
}

/// Screen-to-world transform: uniform scale, arena centered.
struct View {
    scale: f32,
    offset: (f32, f32),
}

impl View {
    fn fit() -> Self {
        let scale = (screen_width() / ARENA_W).min(screen_height() / ARENA_H);
        let offset = (
            (screen_width() - ARENA_W * scale) * 0.5,
            (screen_height() - ARENA_H * scale) * 0.5,
        );
        Self { scale, offset }
    }

    fn to_world(&self, (x, y): (f32, f32)) -> Vec2 {
        Vec2::new((x - self.offset.0) / self.scale, (y - self.offset.1) / self.scale)
    }

    fn draw_body(&self, body: &Body, color: Color) {
        let min = body.min();
        draw_rectangle(
            self.offset.0 + min.x * self.scale,
            self.offset.1 + min.y * self.scale,
            body.half_size.x * 2.0 * self.scale,
            body.half_size.y * 2.0 * self.scale,
            color,
        );
    }
}

/// Destroy live bodies that left the arena. Returns how many were destroyed.
fn cull_escaped(world: &mut World, doomed: &mut Vec<Handle>) -> usize {
    doomed.clear();
    doomed.extend(world.bodies().iter().filter_map(|(handle, body)| {
        let p = body.position;
        let outside = p.x < -WALL || p.x > ARENA_W + WALL || p.y < -ARENA_H || p.y > ARENA_H + WALL;
        (outside && world.is_alive(handle)).then_some(handle)
    }));

    let mut culled = 0;
    for &handle in doomed.iter() {
        match world.destroy(handle) {
            Ok(()) => culled += 1,
            Err(e) => log::error!("failed to cull body {}: {}", handle, e),
        }
    }
    culled
}

fn build_world(config: &PhysicsConfig) -> Option<World> {
    let mut world = match World::new(config.clone()) {
        Ok(world) => world,
        Err(e) => {
            log::error!("failed to create physics world: {}", e);
            return None;
        }
    };
    world.set_pre_solve(on_contact);
    world.set_teardown(|handle, body| {
        log::trace!("reclaimed body {} (tag {})", handle, body.user_data);
    });
    if let Err(e) = spawn_arena(&mut world) {
        log::error!("failed to build arena: {}", e);
    }
    Some(world)
}

#[macroquad::main(window_conf)]
async fn main() {
    // Initialize crash logging FIRST (before any other code)
    #[cfg(not(target_arch = "wasm32"))]
    crashlog::setup!(crashlog::cargo_metadata!().capitalized(), false);

    #[cfg(not(target_arch = "wasm32"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = sandbox_config();
    let Some(mut world) = build_world(&config) else {
        return;
    };
    log::info!("=== BONNIE-PHYS v{} ===", VERSION);

    let mut doomed: Vec<Handle> = Vec::new();

    loop {
        let view = View::fit();
        let cursor = view.to_world(mouse_position());

        if is_mouse_button_pressed(MouseButton::Left) {
            if let Err(e) = spawn_crate(&mut world, cursor) {
                log::error!("failed to spawn crate: {}", e);
            }
        }
        if is_mouse_button_pressed(MouseButton::Right) {
            if let Err(e) = spawn_projectile(&mut world, cursor) {
                log::error!("failed to spawn projectile: {}", e);
            }
        }
        if is_key_pressed(KeyCode::R) {
            world.reset();
            if let Err(e) = spawn_arena(&mut world) {
                log::error!("failed to rebuild arena: {}", e);
            }
        }

        // Gravity, held for every substep of this frame
        world.bodies_mut().for_each_mut(|_, body| {
            if !body.is_static && body.user_data == TAG_CRATE {
                body.push(Vec2::new(0.0, GRAVITY));
            }
        });

        if let Err(e) = world.update(get_frame_time()) {
            log::error!("physics update failed: {}", e);
        }

        cull_escaped(&mut world, &mut doomed);

        clear_background(Color::from_rgba(20, 20, 28, 255));
        for (_, body) in world.bodies().iter() {
            let color = match body.user_data {
                TAG_WALL => Color::from_rgba(90, 90, 110, 255),
                TAG_CRATE => Color::from_rgba(200, 150, 80, 255),
                TAG_PROJECTILE => Color::from_rgba(240, 80, 80, 255),
                _ => WHITE,
            };
            view.draw_body(body, color);
        }

        draw_text(
            &format!(
                "bodies: {}  substeps: {}  [LMB] crate  [RMB] projectile  [R] reset",
                world.body_count(),
                world.substep_count()
            ),
            12.0,
            24.0,
            20.0,
            LIGHTGRAY,
        );

        next_frame().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cull_destroys_only_escaped_bodies() {
        let mut world = World::new(PhysicsConfig::default()).unwrap();
        let inside = world
            .insert(Body { position: Vec2::new(100.0, 100.0), ..Default::default() })
            .unwrap();
        let escaped = world
            .insert(Body { position: Vec2::new(ARENA_W * 2.0, 100.0), ..Default::default() })
            .unwrap();

        let mut doomed = Vec::new();
        assert_eq!(cull_escaped(&mut world, &mut doomed), 1);
        assert!(world.is_alive(inside));
        assert!(!world.is_alive(escaped));

        // Already pending bodies are not culled twice
        assert_eq!(cull_escaped(&mut world, &mut doomed), 0);
    }
}
