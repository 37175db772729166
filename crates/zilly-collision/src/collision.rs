//! The collision grid.
//!
//! Built once per map from [`MapLayers`]. Every query clamps coordinates to
//! the grid and treats missing optional layers as inert, so no query can
//! fail or read out of bounds.

use std::collections::BTreeMap;

use glam::Vec2;
use tracing::{debug, info, warn};
use zilly_common::{mix, round_to_int, MapError, TileCoord, TILE_SIZE};

use crate::layers::MapLayers;
use crate::restrictions::{restrictions_for, MoveDirection};
use crate::switches::SwitchActive;
use crate::tile::{
    DoorTile, Speedup, SpeedupTile, SwitchTile, TeleTile, Tile, TileFlags, TileIndex, TuneTile,
};

/// Sample distance used for move restrictions when the caller has no
/// better value.
pub const DEFAULT_RESTRICTION_DISTANCE: f32 = 18.0;

/// Upper bound on `move_box` sub-steps. Speeds up to this many units per
/// tick still advance one unit or less per sub-step.
pub const MAX_SWEEP_STEPS: i32 = 65_536;

/// What a line trace ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    /// Reached the end point without hitting anything
    Nothing,
    /// Hit a solid tile of this index
    Tile(u8),
    /// Entered a hook teleporter of this group
    HookTeleport(u8),
}

impl Hit {
    /// True for anything but [`Hit::Nothing`].
    #[must_use]
    pub fn is_hit(self) -> bool {
        !matches!(self, Self::Nothing)
    }
}

/// Result of a line trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineHit {
    /// What was hit
    pub hit: Hit,
    /// Sample where the hit happened (end point on a miss)
    pub pos: Vec2,
    /// Last free sample before the hit (end point on a miss)
    pub before: Vec2,
}

impl LineHit {
    fn miss(end: Vec2) -> Self {
        Self {
            hit: Hit::Nothing,
            pos: end,
            before: end,
        }
    }
}

/// Offset to the "through" companion cell along the dominant travel axis.
#[must_use]
pub fn through_offset(p0: Vec2, p1: Vec2) -> (i32, i32) {
    let x = p0.x - p1.x;
    let y = p0.y - p1.y;
    if x.abs() > y.abs() {
        if x < 0.0 {
            (-TILE_SIZE, 0)
        } else {
            (TILE_SIZE, 0)
        }
    } else if y < 0.0 {
        (0, -TILE_SIZE)
    } else {
        (0, TILE_SIZE)
    }
}

/// True if a directional tile with `flags` matches travel from `p0` to `p1`.
///
/// `toward` selects the hook-blocker reading (blocks travel toward the
/// tile's face); the opposite reading lets the hook pass.
fn directional_match(flags: u8, p0: Vec2, p1: Vec2, toward: bool) -> bool {
    let (r0, r90, r180, r270) = if toward {
        (p0.y < p1.y, p0.x > p1.x, p0.y > p1.y, p0.x < p1.x)
    } else {
        (p0.y > p1.y, p0.x < p1.x, p0.y < p1.y, p0.x > p1.x)
    };
    match flags {
        TileFlags::ROTATION_0 => r0,
        TileFlags::ROTATION_90 => r90,
        TileFlags::ROTATION_180 => r180,
        TileFlags::ROTATION_270 => r270,
        _ => false,
    }
}

/// Tile-grid collision world for one map.
#[derive(Debug, Clone)]
pub struct Collision {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
    front: Option<Vec<Tile>>,
    tele: Option<Vec<TeleTile>>,
    speedup: Option<Vec<SpeedupTile>>,
    switch: Option<Vec<SwitchTile>>,
    door: Option<Vec<DoorTile>>,
    tune: Option<Vec<TuneTile>>,
    tele_outs: BTreeMap<u8, Vec<Vec2>>,
    num_switchers: u8,
}

/// Keeps an optional layer only if it covers the whole grid.
fn accept_layer<T>(name: &str, layer: Option<Vec<T>>, len: usize) -> Option<Vec<T>> {
    match layer {
        Some(data) if data.len() >= len => {
            debug!("Accepted {} layer ({} records)", name, data.len());
            Some(data)
        }
        Some(data) => {
            warn!(
                "Dropping {} layer: {} records, need {}",
                name,
                data.len(),
                len
            );
            None
        }
        None => None,
    }
}

impl Collision {
    /// Builds the grid from a layer set.
    ///
    /// Fails only if the dimensions are empty or the game layer does not
    /// cover the grid exactly. Short optional layers are dropped.
    pub fn new(layers: MapLayers) -> Result<Self, MapError> {
        let MapLayers {
            width,
            height,
            game,
            front,
            tele,
            speedup,
            switch,
            tune,
        } = layers;

        if width <= 0 || height <= 0 {
            return Err(MapError::InvalidDimensions { width, height });
        }
        let len = (width as usize) * (height as usize);
        if game.len() != len {
            return Err(MapError::GameLayerSize {
                expected: len,
                actual: game.len(),
            });
        }

        let mut tiles = game;
        for tile in &mut tiles {
            if (TileIndex::LEGACY_RANGE_START..=TileIndex::BASIC_MAX).contains(&tile.index)
                && !matches!(
                    tile.index,
                    TileIndex::DEATH | TileIndex::SOLID | TileIndex::NOHOOK | TileIndex::FREEZE
                )
            {
                tile.index = TileIndex::AIR;
            }
        }

        let front = accept_layer("front", front, len);
        let tele = accept_layer("tele", tele, len);
        let speedup = accept_layer("speedup", speedup, len);
        let tune = accept_layer("tune", tune, len);
        let had_switch = switch.is_some();
        let switch = accept_layer("switch", switch, len);

        // Doors exist whenever the map has a switch layer, even a rejected one.
        let mut num_switchers = 0u8;
        let door = had_switch.then(|| {
            let mut door = vec![DoorTile::default(); len];
            if let Some(switch) = &switch {
                for (cell, tile) in door.iter_mut().zip(switch) {
                    num_switchers = num_switchers.max(tile.number);
                    if matches!(
                        tile.kind,
                        TileIndex::STOP | TileIndex::STOPS | TileIndex::STOPA
                    ) {
                        *cell = DoorTile {
                            index: tile.kind,
                            flags: tile.flags,
                            number: tile.number,
                        };
                    }
                }
            }
            door
        });

        let mut tele_outs: BTreeMap<u8, Vec<Vec2>> = BTreeMap::new();
        if let Some(tele) = &tele {
            for (i, tile) in tele.iter().enumerate().take(len) {
                if tile.kind == TileIndex::TELEOUT {
                    tele_outs
                        .entry(tile.number)
                        .or_default()
                        .push(TileCoord::from_index(i, width).center());
                }
            }
        }

        info!(
            "Collision grid {}x{} ready ({} tele groups, {} switchers)",
            width,
            height,
            tele_outs.len(),
            num_switchers
        );

        Ok(Self {
            width,
            height,
            tiles,
            front,
            tele,
            speedup,
            switch,
            door,
            tune,
            tele_outs,
            num_switchers,
        })
    }

    /// Width in tiles.
    #[must_use]
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Height in tiles.
    #[must_use]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Highest switch number found on the switch layer.
    #[must_use]
    pub fn num_switchers(&self) -> u8 {
        self.num_switchers
    }

    /// Teleporter exits of a group (cell centres, in map order).
    #[must_use]
    pub fn tele_outs(&self, group: u8) -> &[Vec2] {
        self.tele_outs.get(&group).map_or(&[], Vec::as_slice)
    }

    // ----- basic tile lookups ---------------------------------------------

    fn clamped_index(&self, x: i32, y: i32) -> usize {
        TileCoord::from_world_int(x, y)
            .clamped(self.width, self.height)
            .to_index(self.width)
    }

    /// Base tile index at an integer world position.
    ///
    /// Indices above 128 are reported as air.
    #[must_use]
    pub fn get_tile(&self, x: i32, y: i32) -> u8 {
        let index = self
            .tiles
            .get(self.clamped_index(x, y))
            .map_or(0, |t| t.index);
        if index > TileIndex::BASIC_MAX {
            0
        } else {
            index
        }
    }

    /// True if the base tile at an integer world position blocks movement.
    #[must_use]
    pub fn is_solid(&self, x: i32, y: i32) -> bool {
        matches!(self.get_tile(x, y), TileIndex::SOLID | TileIndex::NOHOOK)
    }

    fn is_tile(&self, x: i32, y: i32, flag: u8) -> bool {
        if flag == TileIndex::DEATH {
            self.get_tile(x, y) == TileIndex::DEATH
        } else {
            self.is_solid(x, y)
        }
    }

    /// True if the point lies in a solid tile.
    #[must_use]
    pub fn check_point(&self, pos: Vec2) -> bool {
        self.is_solid(round_to_int(pos.x), round_to_int(pos.y))
    }

    /// Point test against a tile class: `DEATH` tests for death tiles,
    /// anything else tests for solid tiles.
    #[must_use]
    pub fn check_point_flagged(&self, pos: Vec2, flag: u8) -> bool {
        self.is_tile(round_to_int(pos.x), round_to_int(pos.y), flag)
    }

    /// Base tile index at a continuous world position.
    #[must_use]
    pub fn get_collision_at(&self, pos: Vec2) -> u8 {
        self.get_tile(round_to_int(pos.x), round_to_int(pos.y))
    }

    /// Linear cell index of a world position, clamped to the grid.
    #[must_use]
    pub fn get_pure_map_index(&self, pos: Vec2) -> usize {
        self.clamped_index(round_to_int(pos.x), round_to_int(pos.y))
    }

    /// Rewrites the base tile at a world position.
    pub fn set_collision_at(&mut self, pos: Vec2, index: u8) {
        let i = self.get_pure_map_index(pos);
        if let Some(tile) = self.tiles.get_mut(i) {
            tile.index = index;
        }
    }

    /// Rewrites the door tile at a world position. No-op without doors.
    pub fn set_door_at(&mut self, pos: Vec2, index: u8, flags: u8, number: u8) {
        let i = self.get_pure_map_index(pos);
        if let Some(tile) = self.door.as_mut().and_then(|d| d.get_mut(i)) {
            *tile = DoorTile {
                index,
                flags,
                number,
            };
        }
    }

    // ----- per-layer index queries ----------------------------------------

    /// Base layer tile index of a cell.
    #[must_use]
    pub fn get_tile_index(&self, index: usize) -> u8 {
        self.tiles.get(index).map_or(0, |t| t.index)
    }

    /// Base layer tile flags of a cell.
    #[must_use]
    pub fn get_tile_flags(&self, index: usize) -> u8 {
        self.tiles.get(index).map_or(0, |t| t.flags)
    }

    fn front_tile(&self, index: usize) -> Option<&Tile> {
        self.front.as_ref().and_then(|f| f.get(index))
    }

    /// Front layer tile index of a cell.
    #[must_use]
    pub fn get_front_tile_index(&self, index: usize) -> u8 {
        self.front_tile(index).map_or(0, |t| t.index)
    }

    /// Front layer tile flags of a cell.
    #[must_use]
    pub fn get_front_tile_flags(&self, index: usize) -> u8 {
        self.front_tile(index).map_or(0, |t| t.flags)
    }

    fn door_tile(&self, index: usize) -> Option<&DoorTile> {
        self.door
            .as_ref()
            .and_then(|d| d.get(index))
            .filter(|t| t.index != 0)
    }

    /// Door tile index of a cell.
    #[must_use]
    pub fn get_door_tile_index(&self, index: usize) -> u8 {
        self.door_tile(index).map_or(0, |t| t.index)
    }

    /// Door tile flags of a cell.
    #[must_use]
    pub fn get_door_tile_flags(&self, index: usize) -> u8 {
        self.door_tile(index).map_or(0, |t| t.flags)
    }

    /// Switch number controlling the door in a cell.
    #[must_use]
    pub fn get_door_tile_number(&self, index: usize) -> u8 {
        self.door_tile(index).map_or(0, |t| t.number)
    }

    fn tele_kind(&self, index: usize, kind: u8) -> u8 {
        self.tele
            .as_ref()
            .and_then(|t| t.get(index))
            .filter(|t| t.kind == kind)
            .map_or(0, |t| t.number)
    }

    /// Teleporter group of a TELEIN cell, or 0.
    #[must_use]
    pub fn is_teleport(&self, index: usize) -> u8 {
        self.tele_kind(index, TileIndex::TELEIN)
    }

    /// Teleporter group of an evil TELEIN cell, or 0.
    #[must_use]
    pub fn is_evil_teleport(&self, index: usize) -> u8 {
        self.tele_kind(index, TileIndex::TELEIN_EVIL)
    }

    /// Group of a "teleport to checkpoint" cell, or 0.
    #[must_use]
    pub fn is_check_teleport(&self, index: usize) -> u8 {
        self.tele_kind(index, TileIndex::TELECHECK_IN)
    }

    /// Group of an evil "teleport to checkpoint" cell, or 0.
    #[must_use]
    pub fn is_check_evil_teleport(&self, index: usize) -> u8 {
        self.tele_kind(index, TileIndex::TELECHECK_IN_EVIL)
    }

    /// Number of a teleport checkpoint cell, or 0.
    #[must_use]
    pub fn is_tele_checkpoint(&self, index: usize) -> u8 {
        self.tele_kind(index, TileIndex::TELECHECK)
    }

    /// Group of a weapon teleporter cell, or 0.
    #[must_use]
    pub fn is_teleport_weapon(&self, index: usize) -> u8 {
        self.tele_kind(index, TileIndex::TELEIN_WEAPON)
    }

    /// Group of a hook teleporter cell, or 0.
    #[must_use]
    pub fn is_teleport_hook(&self, index: usize) -> u8 {
        self.tele_kind(index, TileIndex::TELEIN_HOOK)
    }

    fn speedup_tile(&self, index: usize) -> Option<&SpeedupTile> {
        self.speedup
            .as_ref()
            .and_then(|s| s.get(index))
            .filter(|s| s.force > 0)
    }

    /// True if the cell holds a speedup with non-zero force.
    #[must_use]
    pub fn is_speedup(&self, index: usize) -> bool {
        self.speedup_tile(index).is_some()
    }

    /// Speedup parameters of a cell.
    #[must_use]
    pub fn speedup(&self, index: usize) -> Option<Speedup> {
        self.speedup_tile(index).map(|s| Speedup {
            force: s.force,
            max_speed: s.max_speed,
            angle: s.angle,
        })
    }

    /// Tuning zone of a cell, or 0.
    #[must_use]
    pub fn tune_zone(&self, index: usize) -> u8 {
        self.tune
            .as_ref()
            .and_then(|t| t.get(index))
            .filter(|t| t.kind == TileIndex::TUNE)
            .map_or(0, |t| t.number)
    }

    fn switch_tile(&self, index: usize) -> Option<&SwitchTile> {
        self.switch
            .as_ref()
            .and_then(|s| s.get(index))
            .filter(|s| s.kind > 0)
    }

    /// Switch layer tile type of a cell.
    #[must_use]
    pub fn switch_type(&self, index: usize) -> u8 {
        self.switch_tile(index).map_or(0, |s| s.kind)
    }

    /// Switch number of a cell.
    #[must_use]
    pub fn switch_number(&self, index: usize) -> u8 {
        self.switch_tile(index).map_or(0, |s| s.number)
    }

    /// Switch tile flags of a cell.
    #[must_use]
    pub fn switch_flags(&self, index: usize) -> u8 {
        self.switch_tile(index).map_or(0, |s| s.flags)
    }

    /// Switch delay (seconds) of a cell.
    #[must_use]
    pub fn switch_delay(&self, index: usize) -> u8 {
        self.switch_tile(index).map_or(0, |s| s.delay)
    }

    // ----- existence --------------------------------------------------------

    /// True if the cell holds any special tile on any layer, or sits next
    /// to a stopper that affects it.
    #[must_use]
    pub fn tile_exists(&self, index: usize) -> bool {
        let special = |t: &Tile| (TileIndex::FREEZE..=TileIndex::TELE_LASER_DISABLE).contains(&t.index);

        if self.tiles.get(index).is_some_and(special) {
            return true;
        }
        if self.front_tile(index).is_some_and(special) {
            return true;
        }
        if let Some(tele) = self.tele.as_ref().and_then(|t| t.get(index)) {
            if matches!(
                tele.kind,
                TileIndex::TELEIN
                    | TileIndex::TELEIN_EVIL
                    | TileIndex::TELECHECK_IN_EVIL
                    | TileIndex::TELECHECK
                    | TileIndex::TELECHECK_IN
            ) {
                return true;
            }
        }
        if self.is_speedup(index)
            || self.door_tile(index).is_some()
            || self.switch_tile(index).is_some()
            || self.tune.as_ref().and_then(|t| t.get(index)).is_some_and(|t| t.kind != 0)
        {
            return true;
        }
        self.tile_exists_next(index)
    }

    fn tile_exists_next(&self, index: usize) -> bool {
        let len = self.tiles.len();
        if index >= len {
            return false;
        }
        let width = self.width as usize;
        let left = if index > 1 { index - 1 } else { index };
        let right = if index + 1 < len { index + 1 } else { index };
        let below = if index + width < len { index + width } else { index };
        let above = if index > width { index - width } else { index };

        let neighbours = |lookup: &dyn Fn(usize) -> (u8, u8)| {
            let (r, rf) = lookup(right);
            let (l, lf) = lookup(left);
            let (b, bf) = lookup(below);
            let (a, af) = lookup(above);
            (r == TileIndex::STOP && rf == TileFlags::ROTATION_270)
                || (l == TileIndex::STOP && lf == TileFlags::ROTATION_90)
                || (b == TileIndex::STOP && bf == TileFlags::ROTATION_0)
                || (a == TileIndex::STOP && af == TileFlags::ROTATION_180)
                || [r, l, b, a]
                    .iter()
                    .any(|&t| t == TileIndex::STOPA || t == TileIndex::STOPS)
        };

        if neighbours(&|i: usize| (self.get_tile_index(i), self.get_tile_flags(i))) {
            return true;
        }
        if self.front.is_some()
            && neighbours(&|i: usize| (self.get_front_tile_index(i), self.get_front_tile_flags(i)))
        {
            return true;
        }
        self.door.is_some()
            && neighbours(&|i: usize| (self.get_door_tile_index(i), self.get_door_tile_flags(i)))
    }

    // ----- line traces ------------------------------------------------------

    /// Traces a segment in unit steps and reports the first solid tile.
    #[must_use]
    pub fn intersect_line(&self, p0: Vec2, p1: Vec2) -> LineHit {
        let distance = p0.distance(p1);
        let end = (distance + 1.0) as i32;
        let mut last = p0;

        for i in 0..=end {
            let a = i as f32 / end as f32;
            let pos = mix(p0, p1, a);
            if self.check_point(pos) {
                return LineHit {
                    hit: Hit::Tile(self.get_collision_at(pos)),
                    pos,
                    before: last,
                };
            }
            last = pos;
        }
        LineHit::miss(p1)
    }

    /// Hook trace: like [`Collision::intersect_line`] but honours hook
    /// teleporters, through tiles and hook blockers.
    ///
    /// With `old_teleport_hook` the hook teleports through plain
    /// teleporters instead of hook teleporters.
    #[must_use]
    pub fn intersect_line_tele_hook(&self, p0: Vec2, p1: Vec2, old_teleport_hook: bool) -> LineHit {
        let distance = p0.distance(p1);
        let end = (distance + 1.0) as i32;
        let mut last = p0;
        let (dx, dy) = through_offset(p0, p1);

        for i in 0..=end {
            let a = i as f32 / end as f32;
            let pos = mix(p0, p1, a);
            let ix = round_to_int(pos.x);
            let iy = round_to_int(pos.y);

            let index = self.get_pure_map_index(pos);
            let tele = if old_teleport_hook {
                self.is_teleport(index)
            } else {
                self.is_teleport_hook(index)
            };
            if tele != 0 {
                return LineHit {
                    hit: Hit::HookTeleport(tele),
                    pos,
                    before: last,
                };
            }

            let mut hit = 0;
            if self.is_solid(ix, iy) {
                if !self.is_through(ix, iy, dx, dy, p0, p1) {
                    hit = self.get_tile(ix, iy);
                }
            } else if self.is_hook_blocker(ix, iy, p0, p1) {
                hit = TileIndex::NOHOOK;
            }
            if hit != 0 {
                return LineHit {
                    hit: Hit::Tile(hit),
                    pos,
                    before: last,
                };
            }
            last = pos;
        }
        LineHit::miss(p1)
    }

    /// True if a hook travelling `p0 -> p1` passes the solid tile at
    /// `(x, y)`.
    #[must_use]
    pub fn is_through(&self, x: i32, y: i32, xoff: i32, yoff: i32, p0: Vec2, p1: Vec2) -> bool {
        let pos = self.clamped_index(x, y);
        if let Some(front) = self.front_tile(pos) {
            if matches!(front.index, TileIndex::THROUGH_ALL | TileIndex::THROUGH_CUT) {
                return true;
            }
            if front.index == TileIndex::THROUGH_DIR
                && directional_match(front.flags, p0, p1, false)
            {
                return true;
            }
        }
        let offpos = self.clamped_index(x + xoff, y + yoff);
        self.get_tile_index(offpos) == TileIndex::THROUGH
            || self.get_front_tile_index(offpos) == TileIndex::THROUGH
    }

    /// True if a hook travelling `p0 -> p1` is stopped by the free tile at
    /// `(x, y)`.
    #[must_use]
    pub fn is_hook_blocker(&self, x: i32, y: i32, p0: Vec2, p1: Vec2) -> bool {
        let pos = self.clamped_index(x, y);
        let blocks = |tile: Option<&Tile>| {
            tile.is_some_and(|t| {
                t.index == TileIndex::THROUGH_ALL
                    || (t.index == TileIndex::THROUGH_DIR
                        && directional_match(t.flags, p0, p1, true))
            })
        };
        blocks(self.tiles.get(pos)) || blocks(self.front_tile(pos))
    }

    // ----- movement ---------------------------------------------------------

    /// Tests the four corners of a box against a tile class.
    #[must_use]
    pub fn test_box_flagged(&self, pos: Vec2, size: Vec2, flag: u8) -> bool {
        let half = size * 0.5;
        self.check_point_flagged(Vec2::new(pos.x - half.x, pos.y - half.y), flag)
            || self.check_point_flagged(Vec2::new(pos.x + half.x, pos.y - half.y), flag)
            || self.check_point_flagged(Vec2::new(pos.x - half.x, pos.y + half.y), flag)
            || self.check_point_flagged(Vec2::new(pos.x + half.x, pos.y + half.y), flag)
    }

    /// Tests the four corners of a box against solid tiles.
    #[must_use]
    pub fn test_box(&self, pos: Vec2, size: Vec2) -> bool {
        self.test_box_flagged(pos, size, TileIndex::SOLID)
    }

    /// Moves a point one step, bouncing off solid tiles.
    ///
    /// Returns the number of axes that bounced. The position is left
    /// untouched when the step would end inside a solid tile.
    pub fn move_point(&self, pos: &mut Vec2, vel: &mut Vec2, elasticity: f32) -> u32 {
        let start = *pos;
        let step = *vel;
        if !self.check_point(start + step) {
            *pos = start + step;
            return 0;
        }

        let mut bounces = 0;
        if self.check_point(Vec2::new(start.x + step.x, start.y)) {
            vel.x *= -elasticity;
            bounces += 1;
        }
        if self.check_point(Vec2::new(start.x, start.y + step.y)) {
            vel.y *= -elasticity;
            bounces += 1;
        }
        if bounces == 0 {
            *vel *= -elasticity;
        }
        bounces
    }

    /// Sweeps a box along its velocity, resolving solid contacts axis by
    /// axis. Returns true if the shrunk box touched a death tile on any
    /// sub-step.
    ///
    /// A non-finite velocity leaves the box where it is.
    pub fn move_box(&self, pos: &mut Vec2, vel: &mut Vec2, size: Vec2, elasticity: f32) -> bool {
        let mut p = *pos;
        let mut v = *vel;
        let distance = v.length();
        if !distance.is_finite() {
            debug!("move_box: non-finite velocity {v}, box not moved");
            return false;
        }
        let max = (distance as i32).min(MAX_SWEEP_STEPS);
        let mut death = false;

        if distance > 0.00001 {
            let fraction = 1.0 / max.saturating_add(1) as f32;
            for _ in 0..=max {
                let mut new_pos = p + v * fraction;

                if self.test_box_flagged(new_pos, size * (2.0 / 3.0), TileIndex::DEATH) {
                    death = true;
                }

                if self.test_box(new_pos, size) {
                    let mut hits = 0;
                    if self.test_box(Vec2::new(p.x, new_pos.y), size) {
                        new_pos.y = p.y;
                        v.y *= -elasticity;
                        hits += 1;
                    }
                    if self.test_box(Vec2::new(new_pos.x, p.y), size) {
                        new_pos.x = p.x;
                        v.x *= -elasticity;
                        hits += 1;
                    }
                    // Corner: neither axis alone collides.
                    if hits == 0 {
                        new_pos = p;
                        v *= -elasticity;
                    }
                }
                p = new_pos;
            }
        }

        *pos = p;
        *vel = v;
        death
    }

    // ----- move restrictions ------------------------------------------------

    /// Directional blocking flags around `pos`.
    ///
    /// Samples the cell under `pos` and the four cells `distance` away on
    /// the game, front and (if the switch is active) door layers.
    /// `override_center` replaces the cell used for the centre sample.
    #[must_use]
    pub fn get_move_restrictions(
        &self,
        switches: Option<&dyn SwitchActive>,
        pos: Vec2,
        distance: f32,
        override_center: Option<usize>,
    ) -> u8 {
        debug_assert!(
            (0.0..=32.0).contains(&distance),
            "restriction distance {distance} outside 0..=32"
        );

        let mut restrictions = 0;
        for direction in MoveDirection::ALL {
            let mut index = self.get_pure_map_index(pos + direction.offset() * distance);
            if direction == MoveDirection::Here {
                if let Some(center) = override_center {
                    index = center;
                }
            }

            restrictions |= restrictions_for(
                direction,
                self.get_tile_index(index),
                self.get_tile_flags(index),
            );
            restrictions |= restrictions_for(
                direction,
                self.get_front_tile_index(index),
                self.get_front_tile_flags(index),
            );

            if let Some(switches) = switches {
                if switches.is_active(self.get_door_tile_number(index)) {
                    restrictions |= restrictions_for(
                        direction,
                        self.get_door_tile_index(index),
                        self.get_door_tile_flags(index),
                    );
                }
            }
        }
        restrictions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::restrictions::CantMove;
    use crate::switches::Switchers;
    use proptest::prelude::*;

    fn grid(rows: &[&str]) -> Collision {
        Collision::new(MapLayers::from_rows(rows).expect("fixture")).expect("grid")
    }

    fn floor() -> Collision {
        grid(&[
            "..........",
            "..........",
            "..........",
            "..........",
            "##########",
        ])
    }

    #[test]
    fn test_rejects_bad_dimensions() {
        assert!(matches!(
            Collision::new(MapLayers::empty(0, 4)),
            Err(MapError::InvalidDimensions { .. })
        ));
        let mut layers = MapLayers::empty(4, 4);
        layers.game.pop();
        assert!(matches!(
            Collision::new(layers),
            Err(MapError::GameLayerSize {
                expected: 16,
                actual: 15
            })
        ));
    }

    #[test]
    fn test_get_tile_and_check_point() {
        let c = floor();
        assert_eq!(c.get_tile(5, 5), TileIndex::AIR);
        assert_eq!(c.get_tile(40, 4 * 32 + 1), TileIndex::SOLID);
        assert!(c.check_point(Vec2::new(100.0, 140.0)));
        assert!(!c.check_point(Vec2::new(100.0, 100.0)));
    }

    #[test]
    fn test_out_of_bounds_clamps() {
        let c = floor();
        // Far below the map reads the bottom row.
        assert!(c.check_point(Vec2::new(50.0, 10_000.0)));
        // Far to the left/top reads the top-left cell.
        assert!(!c.check_point(Vec2::new(-5000.0, -5000.0)));
    }

    #[test]
    fn test_legacy_range_sanitised() {
        let mut layers = MapLayers::empty(3, 1);
        layers.set_game(0, 0, Tile::new(100));
        layers.set_game(1, 0, Tile::new(128));
        layers.set_game(2, 0, Tile::new(200));
        let c = Collision::new(layers).expect("grid");
        assert_eq!(c.get_tile_index(0), 0);
        assert_eq!(c.get_tile_index(1), 0);
        // Above the range stays in the layer but reads as air.
        assert_eq!(c.get_tile_index(2), 200);
        assert_eq!(c.get_tile(64, 0), 0);
    }

    #[test]
    fn test_short_optional_layer_dropped() {
        let mut layers = MapLayers::empty(4, 4);
        layers.tele = Some(vec![TeleTile::default(); 3]);
        let c = Collision::new(layers).expect("grid");
        assert_eq!(c.is_teleport(0), 0);
        assert!(c.tele_outs(1).is_empty());
    }

    #[test]
    fn test_intersect_line() {
        let c = floor();
        let hit = c.intersect_line(Vec2::new(50.0, 50.0), Vec2::new(50.0, 200.0));
        assert_eq!(hit.hit, Hit::Tile(TileIndex::SOLID));
        assert!(hit.pos.y >= 127.5 && hit.pos.y < 129.5);
        assert!(hit.before.y < hit.pos.y);

        let miss = c.intersect_line(Vec2::new(50.0, 50.0), Vec2::new(200.0, 50.0));
        assert_eq!(miss.hit, Hit::Nothing);
        assert_eq!(miss.pos, Vec2::new(200.0, 50.0));
    }

    #[test]
    fn test_intersect_line_zero_length() {
        let c = floor();
        let p = Vec2::new(50.0, 50.0);
        assert_eq!(c.intersect_line(p, p).hit, Hit::Nothing);
        let solid = Vec2::new(50.0, 140.0);
        let hit = c.intersect_line(solid, solid);
        assert_eq!(hit.hit, Hit::Tile(TileIndex::SOLID));
        assert_eq!(hit.pos, solid);
    }

    #[test]
    fn test_tele_hook_sentinel() {
        let mut layers = MapLayers::from_rows(&["......", "......"]).expect("fixture");
        layers.set_tele(3, 0, TileIndex::TELEIN_HOOK, 4);
        layers.set_tele(0, 1, TileIndex::TELEOUT, 4);
        let c = Collision::new(layers).expect("grid");

        let hit = c.intersect_line_tele_hook(Vec2::new(10.0, 16.0), Vec2::new(180.0, 16.0), false);
        assert_eq!(hit.hit, Hit::HookTeleport(4));
        assert!(hit.pos.x >= 95.5);

        // Old behaviour only teleports through plain teleporters.
        let hit = c.intersect_line_tele_hook(Vec2::new(10.0, 16.0), Vec2::new(180.0, 16.0), true);
        assert_eq!(hit.hit, Hit::Nothing);

        assert_eq!(c.tele_outs(4), &[Vec2::new(16.0, 48.0)]);
    }

    #[test]
    fn test_through_tile_lets_hook_pass() {
        // Hook travelling up through a solid row with a through companion
        // directly below each solid cell.
        let mut layers = MapLayers::from_rows(&["....", "####", "....", "...."]).expect("fixture");
        layers.set_game(1, 2, Tile::new(TileIndex::THROUGH));
        let c = Collision::new(layers).expect("grid");

        let blocked = c.intersect_line_tele_hook(Vec2::new(80.0, 120.0), Vec2::new(80.0, 0.0), false);
        assert_eq!(blocked.hit, Hit::Tile(TileIndex::SOLID));

        let passed = c.intersect_line_tele_hook(Vec2::new(48.0, 120.0), Vec2::new(48.0, 0.0), false);
        assert_eq!(passed.hit, Hit::Nothing);
    }

    #[test]
    fn test_hook_blocker_direction() {
        let mut layers = MapLayers::empty(4, 4);
        layers.set_game(
            1,
            1,
            Tile::new(TileIndex::THROUGH_DIR).with_flags(TileFlags::ROTATION_0),
        );
        let c = Collision::new(layers).expect("grid");

        // Travelling down into a R0 blocker is stopped.
        let down = c.intersect_line_tele_hook(Vec2::new(48.0, 0.0), Vec2::new(48.0, 120.0), false);
        assert_eq!(down.hit, Hit::Tile(TileIndex::NOHOOK));
        // Travelling up passes.
        let up = c.intersect_line_tele_hook(Vec2::new(48.0, 120.0), Vec2::new(48.0, 0.0), false);
        assert_eq!(up.hit, Hit::Nothing);
    }

    #[test]
    fn test_move_box_lands_on_floor() {
        let c = floor();
        let size = Vec2::splat(28.0);
        let mut pos = Vec2::new(100.0, 50.0);
        let mut vel = Vec2::new(0.0, 40.0);
        for _ in 0..10 {
            let died = c.move_box(&mut pos, &mut vel, size, 0.0);
            assert!(!died);
            vel.y += 40.0;
        }
        // Bottom edge rests just above the solid row at y = 128.
        assert!(pos.y + 14.0 < 128.0);
        assert!(pos.y + 14.0 > 126.0);
        assert!(!c.test_box(pos, size));
    }

    #[test]
    fn test_move_box_huge_velocity() {
        let c = floor();
        let size = Vec2::splat(28.0);

        let mut pos = Vec2::new(100.0, 100.0);
        let mut vel = Vec2::new(f32::INFINITY, 0.0);
        assert!(!c.move_box(&mut pos, &mut vel, size, 0.0));
        assert_eq!(pos, Vec2::new(100.0, 100.0));

        let mut vel = Vec2::new(f32::NAN, 1.0);
        assert!(!c.move_box(&mut pos, &mut vel, size, 0.0));
        assert_eq!(pos, Vec2::new(100.0, 100.0));

        // Open row: the box flies the whole distance in bounded sub-steps.
        let mut vel = Vec2::new(1e12, 0.0);
        assert!(!c.move_box(&mut pos, &mut vel, size, 0.0));
        assert!(pos.is_finite());
        assert!(pos.x > 1e11);
        assert_eq!(pos.y, 100.0);
        assert_eq!(vel, Vec2::new(1e12, 0.0));

        // Straight down into the floor still stops on it.
        let mut pos = Vec2::new(100.0, 50.0);
        let mut vel = Vec2::new(0.0, 1e12);
        let _ = c.move_box(&mut pos, &mut vel, size, 0.0);
        assert!(pos.is_finite());
        assert!(!c.test_box(pos, size));
    }

    #[test]
    fn test_move_box_reflects() {
        let c = floor();
        let mut pos = Vec2::new(100.0, 100.0);
        let mut vel = Vec2::new(0.0, 30.0);
        let _ = c.move_box(&mut pos, &mut vel, Vec2::splat(28.0), 1.0);
        assert!(vel.y < 0.0);
    }

    #[test]
    fn test_move_box_reports_death() {
        let c = grid(&["....", "....", "xxxx"]);
        let mut pos = Vec2::new(48.0, 40.0);
        let mut vel = Vec2::new(0.0, 30.0);
        assert!(c.move_box(&mut pos, &mut vel, Vec2::splat(28.0), 0.0));
    }

    #[test]
    fn test_move_point_bounces() {
        let c = floor();
        let mut pos = Vec2::new(50.0, 120.0);
        let mut vel = Vec2::new(0.0, 20.0);
        let bounces = c.move_point(&mut pos, &mut vel, 0.5);
        assert_eq!(bounces, 1);
        assert_eq!(pos, Vec2::new(50.0, 120.0));
        assert_eq!(vel, Vec2::new(0.0, -10.0));

        let mut vel = Vec2::new(5.0, -5.0);
        assert_eq!(c.move_point(&mut pos, &mut vel, 0.5), 0);
        assert_eq!(pos, Vec2::new(55.0, 115.0));
    }

    #[test]
    fn test_move_restrictions_stoppers() {
        // One-way stopper blocking downward movement, under the character.
        let c = grid(&["....", ".v..", "....", "...."]);
        let on = c.get_move_restrictions(None, Vec2::new(48.0, 48.0), 18.0, None);
        assert_eq!(on, CantMove::DOWN);

        // Standing above it: blocked from moving down onto it.
        let above = c.get_move_restrictions(None, Vec2::new(48.0, 28.0), 18.0, None);
        assert_eq!(above & CantMove::DOWN, CantMove::DOWN);

        // Far away: nothing.
        let away = c.get_move_restrictions(None, Vec2::new(112.0, 112.0), 18.0, None);
        assert_eq!(away, 0);
    }

    #[test]
    fn test_move_restrictions_override_center() {
        let c = grid(&["....", ".v..", "....", "...."]);
        let stop = c.get_pure_map_index(Vec2::new(48.0, 48.0));
        let r = c.get_move_restrictions(None, Vec2::new(112.0, 112.0), 0.0, Some(stop));
        assert_eq!(r, CantMove::DOWN);
    }

    #[test]
    fn test_door_restrictions_follow_switch() {
        let mut layers = MapLayers::empty(4, 4);
        layers.set_switch(
            2,
            1,
            SwitchTile {
                number: 3,
                kind: TileIndex::STOPA,
                flags: 0,
                delay: 0,
            },
        );
        let mut c = Collision::new(layers).expect("grid");
        assert_eq!(c.num_switchers(), 3);
        assert_eq!(c.get_door_tile_number(6), 3);

        let mut switchers = Switchers::new(c.num_switchers());
        let pos = Vec2::new(48.0, 48.0);
        let r = c.get_move_restrictions(Some(&switchers.for_team(0)), pos, 18.0, None);
        assert_eq!(r, CantMove::RIGHT);

        switchers.set_status(3, 0, false);
        let r = c.get_move_restrictions(Some(&switchers.for_team(0)), pos, 18.0, None);
        assert_eq!(r, 0);

        // Without a switch capability doors are ignored.
        assert_eq!(c.get_move_restrictions(None, pos, 18.0, None), 0);

        c.set_door_at(Vec2::new(80.0, 48.0), 0, 0, 0);
        assert_eq!(c.get_door_tile_index(6), 0);
    }

    #[test]
    fn test_tile_exists() {
        let mut layers = MapLayers::from_rows(&["......", "...f..", "......", ".....+"])
            .expect("fixture");
        layers.set_speedup(
            0,
            0,
            SpeedupTile {
                force: 2,
                ..Default::default()
            },
        );
        let c = Collision::new(layers).expect("grid");
        assert!(c.tile_exists(9));
        assert!(c.tile_exists(0));
        // Neighbour of the all-direction stopper.
        assert!(c.tile_exists(22));
        assert!(!c.tile_exists(14));
        assert!(!c.tile_exists(999));
    }

    #[test]
    fn test_layer_queries_without_layers() {
        let c = floor();
        assert_eq!(c.get_front_tile_index(3), 0);
        assert_eq!(c.get_door_tile_index(3), 0);
        assert_eq!(c.switch_type(3), 0);
        assert_eq!(c.tune_zone(3), 0);
        assert!(c.speedup(3).is_none());
        assert_eq!(c.is_teleport_weapon(3), 0);
    }

    #[test]
    fn test_set_collision_at() {
        let mut c = floor();
        c.set_collision_at(Vec2::new(20.0, 20.0), TileIndex::SOLID);
        assert!(c.check_point(Vec2::new(10.0, 10.0)));
    }

    proptest! {
        #[test]
        fn prop_out_of_bounds_matches_edge(x in -20_000i32..20_000, y in -20_000i32..20_000) {
            let c = grid(&["#..", ".-.", "..x"]);
            let max = 3 * 32 - 1;
            // Truncating division maps -31..=-1 to cell 0, so clamping the
            // world coordinate to 0..=max gives the same cell.
            let cx = x.clamp(0, max);
            let cy = y.clamp(0, max);
            prop_assert_eq!(c.get_tile(x, y), c.get_tile(cx, cy));
            prop_assert_eq!(c.is_solid(x, y), c.is_solid(cx, cy));
        }

        #[test]
        fn prop_falling_box_lands_on_floor(v0 in 0.0f32..=6000.0) {
            // Floor at y = 9600.
            let mut rows = vec!["...."; 300];
            rows.push("####");
            let c = grid(&rows);
            let size = Vec2::splat(28.0);

            let mut pos = Vec2::new(64.0, 100.0);
            let mut vel = Vec2::new(0.0, v0);
            for _ in 0..300 {
                let _ = c.move_box(&mut pos, &mut vel, size, 0.0);
                vel.y = (vel.y + 0.5).min(6000.0);
            }

            let bottom = pos.y + 14.0;
            prop_assert!(bottom > 9598.0 && bottom < 9600.0, "bottom at {}", bottom);
            prop_assert!(!c.test_box(pos, size));
        }

        #[test]
        fn prop_zero_length_line(x in -100.0f32..200.0, y in -100.0f32..200.0) {
            let c = grid(&["#..", ".-.", "..x"]);
            let p = Vec2::new(x, y);
            let hit = c.intersect_line(p, p);
            prop_assert_eq!(hit.hit.is_hit(), c.check_point(p));
        }
    }
}
