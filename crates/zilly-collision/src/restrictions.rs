//! Directional move restrictions derived from stopper tiles.

use glam::Vec2;

use crate::tile::{TileFlags, TileIndex};

/// Move restriction bits.
pub struct CantMove;

impl CantMove {
    /// Cannot move left
    pub const LEFT: u8 = 1 << 0;
    /// Cannot move right
    pub const RIGHT: u8 = 1 << 1;
    /// Cannot move up
    pub const UP: u8 = 1 << 2;
    /// Cannot move down
    pub const DOWN: u8 = 1 << 3;
    /// Every direction
    pub const ALL: u8 = Self::LEFT | Self::RIGHT | Self::UP | Self::DOWN;
}

/// Sample direction used by the restriction query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    /// The cell under the character
    Here,
    /// One sample distance to the right
    Right,
    /// One sample distance down
    Down,
    /// One sample distance to the left
    Left,
    /// One sample distance up
    Up,
}

impl MoveDirection {
    /// All directions in sampling order.
    pub const ALL: [Self; 5] = [Self::Here, Self::Right, Self::Down, Self::Left, Self::Up];

    /// Unit offset of the sample.
    #[must_use]
    pub const fn offset(self) -> Vec2 {
        match self {
            Self::Here => Vec2::ZERO,
            Self::Right => Vec2::new(1.0, 0.0),
            Self::Down => Vec2::new(0.0, 1.0),
            Self::Left => Vec2::new(-1.0, 0.0),
            Self::Up => Vec2::new(0.0, -1.0),
        }
    }

    /// Restriction bits a stopper in this direction may contribute.
    #[must_use]
    pub const fn mask(self) -> u8 {
        match self {
            Self::Here => 0,
            Self::Right => CantMove::RIGHT,
            Self::Down => CantMove::DOWN,
            Self::Left => CantMove::LEFT,
            Self::Up => CantMove::UP,
        }
    }
}

// Indexed by `flags & ORIENTATION_MASK` (values 0..=11).
const STOP_TABLE: [u8; 12] = [
    CantMove::DOWN,  // R0
    CantMove::DOWN,  // HFLIP ^ R180
    CantMove::UP,    // HFLIP ^ R0
    CantMove::UP,    // R180
    0,
    0,
    0,
    0,
    CantMove::LEFT,  // R90
    CantMove::LEFT,  // HFLIP ^ R270
    CantMove::RIGHT, // HFLIP ^ R90
    CantMove::RIGHT, // R270
];

const VERTICAL: u8 = CantMove::UP | CantMove::DOWN;
const HORIZONTAL: u8 = CantMove::LEFT | CantMove::RIGHT;

const STOPS_TABLE: [u8; 12] = [
    VERTICAL, VERTICAL, VERTICAL, VERTICAL, 0, 0, 0, 0, HORIZONTAL, HORIZONTAL, HORIZONTAL,
    HORIZONTAL,
];

/// Blocked directions of a stopper tile regardless of where it is sampled.
#[must_use]
pub fn raw_restrictions(tile: u8, flags: u8) -> u8 {
    let orientation = usize::from(flags & TileFlags::ORIENTATION_MASK);
    match tile {
        TileIndex::STOP => STOP_TABLE.get(orientation).copied().unwrap_or(0),
        TileIndex::STOPS => STOPS_TABLE.get(orientation).copied().unwrap_or(0),
        TileIndex::STOPA => CantMove::ALL,
        _ => 0,
    }
}

/// Restrictions contributed by a tile sampled in `direction`.
///
/// Stoppers only block moving onto them, except a one-way stopper under
/// the character which also blocks leaving in its direction.
#[must_use]
pub fn restrictions_for(direction: MoveDirection, tile: u8, flags: u8) -> u8 {
    let raw = raw_restrictions(tile, flags);
    if direction == MoveDirection::Here && tile == TileIndex::STOP {
        return raw;
    }
    raw & direction.mask()
}

/// Zeroes velocity components pointing into blocked directions.
#[must_use]
pub fn clamp_vel(restrictions: u8, mut vel: Vec2) -> Vec2 {
    if vel.x > 0.0 && restrictions & CantMove::RIGHT != 0 {
        vel.x = 0.0;
    }
    if vel.x < 0.0 && restrictions & CantMove::LEFT != 0 {
        vel.x = 0.0;
    }
    if vel.y > 0.0 && restrictions & CantMove::DOWN != 0 {
        vel.y = 0.0;
    }
    if vel.y < 0.0 && restrictions & CantMove::UP != 0 {
        vel.y = 0.0;
    }
    vel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_rotations() {
        assert_eq!(raw_restrictions(TileIndex::STOP, TileFlags::ROTATION_0), CantMove::DOWN);
        assert_eq!(raw_restrictions(TileIndex::STOP, TileFlags::ROTATION_90), CantMove::LEFT);
        assert_eq!(raw_restrictions(TileIndex::STOP, TileFlags::ROTATION_180), CantMove::UP);
        assert_eq!(raw_restrictions(TileIndex::STOP, TileFlags::ROTATION_270), CantMove::RIGHT);
        assert_eq!(
            raw_restrictions(TileIndex::STOP, TileFlags::HFLIP ^ TileFlags::ROTATION_90),
            CantMove::RIGHT
        );
    }

    #[test]
    fn test_opaque_flag_ignored() {
        assert_eq!(
            raw_restrictions(TileIndex::STOP, TileFlags::ROTATION_90 | TileFlags::OPAQUE),
            CantMove::LEFT
        );
    }

    #[test]
    fn test_two_way_and_all() {
        assert_eq!(raw_restrictions(TileIndex::STOPS, TileFlags::ROTATION_180), VERTICAL);
        assert_eq!(raw_restrictions(TileIndex::STOPS, TileFlags::ROTATION_270), HORIZONTAL);
        assert_eq!(raw_restrictions(TileIndex::STOPA, 0), CantMove::ALL);
        assert_eq!(raw_restrictions(TileIndex::SOLID, 0), 0);
    }

    #[test]
    fn test_direction_masking() {
        // A stopper to the right only blocks moving right.
        assert_eq!(restrictions_for(MoveDirection::Right, TileIndex::STOPA, 0), CantMove::RIGHT);
        // One-way stopper under us blocks unconditionally.
        assert_eq!(
            restrictions_for(MoveDirection::Here, TileIndex::STOP, TileFlags::ROTATION_0),
            CantMove::DOWN
        );
        // Other stoppers under us do nothing.
        assert_eq!(restrictions_for(MoveDirection::Here, TileIndex::STOPA, 0), 0);
        // One-way stopper below blocking up does not stop us moving down onto it.
        assert_eq!(
            restrictions_for(MoveDirection::Down, TileIndex::STOP, TileFlags::ROTATION_180),
            0
        );
    }

    #[test]
    fn test_clamp_vel() {
        let v = clamp_vel(CantMove::RIGHT | CantMove::UP, Vec2::new(3.0, -2.0));
        assert_eq!(v, Vec2::ZERO);
        let v = clamp_vel(CantMove::RIGHT | CantMove::UP, Vec2::new(-3.0, 2.0));
        assert_eq!(v, Vec2::new(-3.0, 2.0));
    }
}
