//! Map tile records and tile index/flag constants.
//!
//! The record layouts match what the map loader hands over, so raw layer
//! bytes can be reinterpreted with `bytemuck`.

use bytemuck::{Pod, Zeroable};

/// A game or front layer tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Tile {
    /// Tile type (see [`TileIndex`])
    pub index: u8,
    /// Flip/rotate bits (see [`TileFlags`])
    pub flags: u8,
    /// Run-length skip count used by the map format
    pub skip: u8,
    /// Unused
    pub reserved: u8,
}

impl Tile {
    /// Creates a tile with the given index and no flags.
    #[must_use]
    pub const fn new(index: u8) -> Self {
        Self {
            index,
            flags: 0,
            skip: 0,
            reserved: 0,
        }
    }

    /// Returns the tile with flags set.
    #[must_use]
    pub const fn with_flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }
}

/// A tele layer tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct TeleTile {
    /// Teleport group number
    pub number: u8,
    /// Teleport tile type
    pub kind: u8,
}

/// A speedup layer tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct SpeedupTile {
    /// Force magnitude (0 = no speedup)
    pub force: u8,
    /// Speed cap (0 = uncapped)
    pub max_speed: u8,
    /// Tile type
    pub kind: u8,
    /// Padding to keep the record layout
    pub padding: u8,
    /// Direction in degrees
    pub angle: i16,
}

/// A switch layer tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct SwitchTile {
    /// Switch number
    pub number: u8,
    /// Tile type
    pub kind: u8,
    /// Flip/rotate bits
    pub flags: u8,
    /// Delay in seconds for timed switches
    pub delay: u8,
}

/// A tune layer tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct TuneTile {
    /// Tuning zone number
    pub number: u8,
    /// Tile type
    pub kind: u8,
}

/// A runtime door tile, built from the switch layer and updated by doors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DoorTile {
    /// Tile type (0 = no door)
    pub index: u8,
    /// Flip/rotate bits
    pub flags: u8,
    /// Switch number that activates this door
    pub number: u8,
}

/// Decoded speedup tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Speedup {
    /// Force magnitude
    pub force: u8,
    /// Speed cap (0 = uncapped)
    pub max_speed: u8,
    /// Direction in degrees
    pub angle: i16,
}

/// Tile index constants.
pub struct TileIndex;

impl TileIndex {
    /// Empty
    pub const AIR: u8 = 0;
    /// Hookable solid
    pub const SOLID: u8 = 1;
    /// Kills on contact
    pub const DEATH: u8 = 2;
    /// Unhookable solid
    pub const NOHOOK: u8 = 3;
    /// Blocks lasers
    pub const NOLASER: u8 = 4;
    /// Hook passes, players do not
    pub const THROUGH_CUT: u8 = 5;
    /// Passable companion of a solid tile
    pub const THROUGH: u8 = 6;
    /// Refills jumps
    pub const JUMP: u8 = 7;
    /// Freezes the character
    pub const FREEZE: u8 = 9;
    /// Evil teleporter (resets velocity)
    pub const TELEIN_EVIL: u8 = 10;
    /// Unfreezes the character
    pub const UNFREEZE: u8 = 11;
    /// Deep freeze
    pub const DFREEZE: u8 = 12;
    /// Deep unfreeze
    pub const DUNFREEZE: u8 = 13;
    /// Teleports weapons
    pub const TELEIN_WEAPON: u8 = 14;
    /// Teleports hooks
    pub const TELEIN_HOOK: u8 = 15;
    /// Wall jump
    pub const WALLJUMP: u8 = 16;
    /// Teleporter entry
    pub const TELEIN: u8 = 26;
    /// Teleporter exit
    pub const TELEOUT: u8 = 27;
    /// Speedup boost
    pub const BOOST: u8 = 28;
    /// Teleport checkpoint
    pub const TELECHECK: u8 = 29;
    /// Teleport checkpoint exit
    pub const TELECHECK_OUT: u8 = 30;
    /// Teleport to last checkpoint
    pub const TELECHECK_IN: u8 = 31;
    /// One-way stopper
    pub const STOP: u8 = 60;
    /// Two-way stopper
    pub const STOPS: u8 = 61;
    /// All-direction stopper
    pub const STOPA: u8 = 62;
    /// Evil teleport to last checkpoint
    pub const TELECHECK_IN_EVIL: u8 = 63;
    /// Hook blocker from all sides
    pub const THROUGH_ALL: u8 = 66;
    /// Directional hook blocker / passage
    pub const THROUGH_DIR: u8 = 67;
    /// Tuning zone
    pub const TUNE: u8 = 68;
    /// Last index of the special-tile range
    pub const TELE_LASER_DISABLE: u8 = 129;

    /// Highest index reported by the basic tile lookup; anything above
    /// is treated as empty.
    pub const BASIC_MAX: u8 = 128;

    /// First index of the legacy range that is cleared at load time.
    pub const LEGACY_RANGE_START: u8 = 98;
}

/// Tile flag bits.
pub struct TileFlags;

impl TileFlags {
    /// Vertical flip
    pub const VFLIP: u8 = 1 << 0;
    /// Horizontal flip
    pub const HFLIP: u8 = 1 << 1;
    /// Opaque (render only)
    pub const OPAQUE: u8 = 1 << 2;
    /// Rotate by 90 degrees
    pub const ROTATE: u8 = 1 << 3;

    /// No rotation
    pub const ROTATION_0: u8 = 0;
    /// 90 degrees
    pub const ROTATION_90: u8 = Self::ROTATE;
    /// 180 degrees
    pub const ROTATION_180: u8 = Self::VFLIP | Self::HFLIP;
    /// 270 degrees
    pub const ROTATION_270: u8 = Self::VFLIP | Self::HFLIP | Self::ROTATE;

    /// Bits relevant to orientation.
    pub const ORIENTATION_MASK: u8 = Self::VFLIP | Self::HFLIP | Self::ROTATE;
}
