//! # Zilly Collision
//!
//! Tile-grid collision engine.
//!
//! This crate answers every spatial question the character simulation asks
//! of a map:
//! - Point, box and line queries against solid tiles
//! - Swept box integration with per-axis bounce and death detection
//! - Hook traces through teleporters, through tiles and hook blockers
//! - Directional move restrictions from stopper tiles and switch doors
//! - Lookups on the optional tele, speedup, switch and tune layers

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod collision;
pub mod layers;
pub mod restrictions;
pub mod switches;
pub mod tile;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::collision::*;
    pub use crate::layers::*;
    pub use crate::restrictions::*;
    pub use crate::switches::*;
    pub use crate::tile::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn test_fixture_to_grid() {
        let layers = MapLayers::from_rows(&["....", "..#.", "...."]).expect("fixture");
        let collision = Collision::new(layers).expect("grid");
        assert_eq!(collision.width(), 4);
        assert_eq!(collision.height(), 3);
        assert!(collision.check_point(Vec2::new(80.0, 48.0)));
        assert!(!collision.check_point(Vec2::new(16.0, 16.0)));
    }

    #[test]
    fn test_restrictions_clamp_velocity() {
        let collision =
            Collision::new(MapLayers::from_rows(&["...", ".+.", "..."]).expect("fixture"))
                .expect("grid");
        let r = collision.get_move_restrictions(
            None,
            Vec2::new(16.0, 48.0),
            DEFAULT_RESTRICTION_DISTANCE,
            None,
        );
        assert_eq!(r, CantMove::RIGHT);
        assert_eq!(clamp_vel(r, Vec2::new(4.0, 1.0)), Vec2::new(0.0, 1.0));
    }
}
