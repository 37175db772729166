//! Coordinate types for world and tile positions.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::math::round_to_int;

/// Edge length of one map tile in world units.
pub const TILE_SIZE: i32 = 32;

/// Tile coordinate (column/row in the map grid).
///
/// May lie outside the grid; clamping to a concrete grid happens in the
/// collision layer, which knows the map dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct TileCoord {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Tile containing an integer world position.
    ///
    /// Uses truncating division, so `-1..=-31` maps to column 0 exactly
    /// like the legacy tile lookup does.
    #[must_use]
    pub const fn from_world_int(x: i32, y: i32) -> Self {
        Self {
            x: x / TILE_SIZE,
            y: y / TILE_SIZE,
        }
    }

    /// Tile containing a continuous world position (rounded first).
    #[must_use]
    pub fn from_world(x: f32, y: f32) -> Self {
        Self::from_world_int(round_to_int(x), round_to_int(y))
    }

    /// Clamps the coordinate into a `width` x `height` grid.
    #[must_use]
    pub fn clamped(self, width: i32, height: i32) -> Self {
        Self {
            x: self.x.clamp(0, (width - 1).max(0)),
            y: self.y.clamp(0, (height - 1).max(0)),
        }
    }

    /// Converts to linear index for array access (`y * width + x`).
    #[must_use]
    pub const fn to_index(self, width: i32) -> usize {
        (self.y * width + self.x) as usize
    }

    /// Creates from linear index.
    #[must_use]
    pub const fn from_index(index: usize, width: i32) -> Self {
        let width = width as usize;
        Self {
            x: (index % width) as i32,
            y: (index / width) as i32,
        }
    }

    /// World position of the tile's center.
    #[must_use]
    pub fn center(self) -> Vec2 {
        Vec2::new(
            (self.x * TILE_SIZE + TILE_SIZE / 2) as f32,
            (self.y * TILE_SIZE + TILE_SIZE / 2) as f32,
        )
    }
}
