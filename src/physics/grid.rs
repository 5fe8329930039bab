//! Spatial Grid (broad-phase)
//!
//! Uniform grid rebuilt from scratch every substep. Each cell keeps two
//! singly linked buckets, one for dynamic and one for static bodies, whose
//! nodes are bump-allocated from an arena that is cleared on rebuild.
//!
//! Known limitations kept on purpose:
//! - Cells outside `width × height` are skipped, so the part of a body that
//!   sticks out of the grid gets no broad-phase coverage.
//! - A body spanning several cells is inserted once per cell and pairs are
//!   not de-duplicated, so two bodies sharing N cells are tested N times.

use super::body::Bodies;
use crate::error::{try_reserve, PhysicsError};
use crate::slot::Handle;

/// Bucket list node.
#[derive(Debug, Clone, Copy)]
struct Node {
    body: Handle,
    next: Option<u32>,
}

/// Inclusive cell range covered by a box, already clamped to the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl CellRange {
    pub fn cell_count(&self) -> usize {
        (self.x1 - self.x0 + 1) as usize * (self.y1 - self.y0 + 1) as usize
    }
}

/// Uniform-grid broad-phase.
#[derive(Debug)]
pub struct SpatialGrid {
    cell_size: f32,
    width: u32,
    height: u32,
    dynamic_heads: Vec<Option<u32>>,
    static_heads: Vec<Option<u32>>,
    arena: Vec<Node>,
}

impl SpatialGrid {
    /// Create a grid of `width × height` cells, each `cell_size` on a side.
    pub fn new(cell_size: f32, width: u32, height: u32) -> Result<Self, PhysicsError> {
        let mut grid = Self {
            cell_size,
            width: 0,
            height: 0,
            dynamic_heads: Vec::new(),
            static_heads: Vec::new(),
            arena: Vec::new(),
        };
        grid.resize(width, height)?;
        Ok(grid)
    }

    /// Reconfigure the grid extent, discarding all previous sizing and contents.
    /// On failure the grid is left as it was.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), PhysicsError> {
        let cells = (width as usize)
            .checked_mul(height as usize)
            .ok_or(PhysicsError::OutOfMemory { requested: usize::MAX })?;

        let mut dynamic_heads = Vec::new();
        let mut static_heads = Vec::new();
        try_reserve(&mut dynamic_heads, cells)?;
        try_reserve(&mut static_heads, cells)?;
        dynamic_heads.resize(cells, None);
        static_heads.resize(cells, None);

        self.dynamic_heads = dynamic_heads;
        self.static_heads = static_heads;
        self.arena = Vec::new();
        self.width = width;
        self.height = height;
        log::debug!("spatial grid resized to {}x{} cells of {}", width, height, self.cell_size);
        Ok(())
    }

    pub fn set_cell_size(&mut self, cell_size: f32) {
        self.cell_size = cell_size;
        self.clear();
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of bucket nodes from the last rebuild.
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Empty every bucket and the node arena, keeping allocations.
    pub fn clear(&mut self) {
        self.dynamic_heads.fill(None);
        self.static_heads.fill(None);
        self.arena.clear();
    }

    /// Cells covered by the box `[min, max]`, clamped to the grid.
    ///
    /// `None` when the box lies entirely outside the grid (or the grid is empty).
    pub fn cell_range(&self, min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Option<CellRange> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let x0 = (min_x / self.cell_size).floor();
        let y0 = (min_y / self.cell_size).floor();
        let x1 = (max_x / self.cell_size).floor();
        let y1 = (max_y / self.cell_size).floor();

        // NaN compares false everywhere, so a non-finite box falls out here
        let (w, h) = (self.width as f32, self.height as f32);
        if !(x1 >= 0.0 && y1 >= 0.0 && x0 < w && y0 < h) {
            return None;
        }

        Some(CellRange {
            x0: x0.max(0.0) as u32,
            y0: y0.max(0.0) as u32,
            x1: x1.min(w - 1.0) as u32,
            y1: y1.min(h - 1.0) as u32,
        })
    }

    /// Bucket every body on the live list (pending ones included) by footprint.
    ///
    /// Returns how many bodies fell entirely outside the grid.
    pub fn rebuild(&mut self, bodies: &Bodies) -> Result<usize, PhysicsError> {
        self.clear();

        let mut uncovered = 0;
        for (handle, body) in bodies.iter() {
            let min = body.min();
            let max = body.max();
            let Some(range) = self.cell_range(min.x, min.y, max.x, max.y) else {
                uncovered += 1;
                continue;
            };
            try_reserve(&mut self.arena, range.cell_count())?;

            for cy in range.y0..=range.y1 {
                for cx in range.x0..=range.x1 {
                    let cell = cy as usize * self.width as usize + cx as usize;
                    let heads = if body.is_static {
                        &mut self.static_heads
                    } else {
                        &mut self.dynamic_heads
                    };
                    let node = self.arena.len() as u32;
                    self.arena.push(Node {
                        body: handle,
                        next: heads[cell],
                    });
                    heads[cell] = Some(node);
                }
            }
        }
        Ok(uncovered)
    }

    /// Append every candidate pair from the last rebuild to `out`.
    ///
    /// Per cell: each dynamic body against every later dynamic body in the
    /// same bucket, then against every static body in the cell. Static
    /// bodies never initiate a test.
    pub fn collect_pairs(&self, out: &mut Vec<(Handle, Handle)>) {
        for cell in 0..self.dynamic_heads.len() {
            let mut a = self.dynamic_heads[cell];
            while let Some(ai) = a {
                let node_a = self.arena[ai as usize];

                let mut b = node_a.next;
                while let Some(bi) = b {
                    let node_b = self.arena[bi as usize];
                    out.push((node_a.body, node_b.body));
                    b = node_b.next;
                }

                let mut s = self.static_heads[cell];
                while let Some(si) = s {
                    let node_s = self.arena[si as usize];
                    out.push((node_a.body, node_s.body));
                    s = node_s.next;
                }

                a = node_a.next;
            }
        }
    }

    /// Bodies bucketed in cell `(cx, cy)` from the last rebuild: `(dynamic, static)`.
    pub fn cell_bodies(&self, cx: u32, cy: u32) -> (Vec<Handle>, Vec<Handle>) {
        if cx >= self.width || cy >= self.height {
            return (Vec::new(), Vec::new());
        }
        let cell = cy as usize * self.width as usize + cx as usize;
        (self.walk(self.dynamic_heads[cell]), self.walk(self.static_heads[cell]))
    }

    fn walk(&self, mut cursor: Option<u32>) -> Vec<Handle> {
        let mut out = Vec::new();
        while let Some(i) = cursor {
            let node = self.arena[i as usize];
            out.push(node.body);
            cursor = node.next;
        }
        out
    }
}
