//! Layer set handed over by the map loader.
//!
//! `MapLayers` owns one vector per layer. The game layer is mandatory, the
//! rest are optional. The collision grid validates sizes when it is built.

use bytemuck::Pod;
use zilly_common::MapError;

use crate::tile::{SpeedupTile, SwitchTile, TeleTile, Tile, TileFlags, TileIndex, TuneTile};

/// Raw layer data for one map.
#[derive(Debug, Clone, Default)]
pub struct MapLayers {
    /// Width in tiles
    pub width: i32,
    /// Height in tiles
    pub height: i32,
    /// Game layer (mandatory)
    pub game: Vec<Tile>,
    /// Front layer
    pub front: Option<Vec<Tile>>,
    /// Tele layer
    pub tele: Option<Vec<TeleTile>>,
    /// Speedup layer
    pub speedup: Option<Vec<SpeedupTile>>,
    /// Switch layer
    pub switch: Option<Vec<SwitchTile>>,
    /// Tune layer
    pub tune: Option<Vec<TuneTile>>,
}

/// Reinterprets raw layer bytes as tile records.
fn cast_layer<T: Pod>(layer: &'static str, bytes: &[u8]) -> Result<Vec<T>, MapError> {
    let size = std::mem::size_of::<T>();
    if bytes.len() % size != 0 {
        return Err(MapError::RawLayer {
            layer,
            reason: format!("{} bytes is not a multiple of {size}", bytes.len()),
        });
    }
    // Copies instead of casting in place so unaligned buffers work too.
    Ok(bytemuck::pod_collect_to_vec(bytes))
}

impl MapLayers {
    /// Creates an empty (all air) map with only a game layer.
    #[must_use]
    pub fn empty(width: i32, height: i32) -> Self {
        let len = (width.max(0) as usize) * (height.max(0) as usize);
        Self {
            width,
            height,
            game: vec![Tile::default(); len],
            ..Default::default()
        }
    }

    /// Creates a layer set from the game layer's raw bytes.
    pub fn from_raw_game(width: i32, height: i32, game: &[u8]) -> Result<Self, MapError> {
        Ok(Self {
            width,
            height,
            game: cast_layer("game", game)?,
            ..Default::default()
        })
    }

    /// Attaches a front layer from raw bytes.
    pub fn with_raw_front(mut self, bytes: &[u8]) -> Result<Self, MapError> {
        self.front = Some(cast_layer("front", bytes)?);
        Ok(self)
    }

    /// Attaches a tele layer from raw bytes.
    pub fn with_raw_tele(mut self, bytes: &[u8]) -> Result<Self, MapError> {
        self.tele = Some(cast_layer("tele", bytes)?);
        Ok(self)
    }

    /// Attaches a speedup layer from raw bytes.
    pub fn with_raw_speedup(mut self, bytes: &[u8]) -> Result<Self, MapError> {
        self.speedup = Some(cast_layer("speedup", bytes)?);
        Ok(self)
    }

    /// Attaches a switch layer from raw bytes.
    pub fn with_raw_switch(mut self, bytes: &[u8]) -> Result<Self, MapError> {
        self.switch = Some(cast_layer("switch", bytes)?);
        Ok(self)
    }

    /// Attaches a tune layer from raw bytes.
    pub fn with_raw_tune(mut self, bytes: &[u8]) -> Result<Self, MapError> {
        self.tune = Some(cast_layer("tune", bytes)?);
        Ok(self)
    }

    /// Builds a game layer from text rows, one glyph per tile.
    ///
    /// Legend:
    /// - `.` or space: air
    /// - `#`: solid, `-`: unhookable solid, `x`: death, `f`: freeze
    /// - `v` `<` `^` `>`: one-way stopper blocking that direction
    /// - `=`: vertical two-way stopper, `|`: horizontal two-way stopper
    /// - `+`: all-direction stopper
    /// - `t`: through companion tile
    pub fn from_rows(rows: &[&str]) -> Result<Self, MapError> {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.chars().count());
        let mut game = Vec::with_capacity(width * height);

        for (y, row) in rows.iter().enumerate() {
            let len = row.chars().count();
            if len != width {
                return Err(MapError::RaggedRows {
                    row: y,
                    expected: width,
                    actual: len,
                });
            }
            for (x, glyph) in row.chars().enumerate() {
                let tile = match glyph {
                    '.' | ' ' => Tile::new(TileIndex::AIR),
                    '#' => Tile::new(TileIndex::SOLID),
                    '-' => Tile::new(TileIndex::NOHOOK),
                    'x' => Tile::new(TileIndex::DEATH),
                    'f' => Tile::new(TileIndex::FREEZE),
                    't' => Tile::new(TileIndex::THROUGH),
                    'v' => Tile::new(TileIndex::STOP).with_flags(TileFlags::ROTATION_0),
                    '<' => Tile::new(TileIndex::STOP).with_flags(TileFlags::ROTATION_90),
                    '^' => Tile::new(TileIndex::STOP).with_flags(TileFlags::ROTATION_180),
                    '>' => Tile::new(TileIndex::STOP).with_flags(TileFlags::ROTATION_270),
                    '=' => Tile::new(TileIndex::STOPS).with_flags(TileFlags::ROTATION_0),
                    '|' => Tile::new(TileIndex::STOPS).with_flags(TileFlags::ROTATION_90),
                    '+' => Tile::new(TileIndex::STOPA),
                    _ => return Err(MapError::UnknownGlyph { glyph, x, y }),
                };
                game.push(tile);
            }
        }

        Ok(Self {
            width: width as i32,
            height: height as i32,
            game,
            ..Default::default()
        })
    }

    fn cell(&self, x: i32, y: i32) -> Option<usize> {
        (x >= 0 && y >= 0 && x < self.width && y < self.height)
            .then(|| (y * self.width + x) as usize)
    }

    fn len(&self) -> usize {
        (self.width.max(0) as usize) * (self.height.max(0) as usize)
    }

    /// Sets a game layer tile. Out-of-grid coordinates are ignored.
    pub fn set_game(&mut self, x: i32, y: i32, tile: Tile) {
        if let Some(i) = self.cell(x, y) {
            if let Some(t) = self.game.get_mut(i) {
                *t = tile;
            }
        }
    }

    /// Sets a front layer tile, creating the layer on first use.
    pub fn set_front(&mut self, x: i32, y: i32, tile: Tile) {
        let len = self.len();
        if let Some(i) = self.cell(x, y) {
            self.front.get_or_insert_with(|| vec![Tile::default(); len])[i] = tile;
        }
    }

    /// Sets a tele layer tile, creating the layer on first use.
    pub fn set_tele(&mut self, x: i32, y: i32, kind: u8, number: u8) {
        let len = self.len();
        if let Some(i) = self.cell(x, y) {
            self.tele.get_or_insert_with(|| vec![TeleTile::default(); len])[i] =
                TeleTile { number, kind };
        }
    }

    /// Sets a speedup layer tile, creating the layer on first use.
    pub fn set_speedup(&mut self, x: i32, y: i32, tile: SpeedupTile) {
        let len = self.len();
        if let Some(i) = self.cell(x, y) {
            self.speedup
                .get_or_insert_with(|| vec![SpeedupTile::default(); len])[i] = tile;
        }
    }

    /// Sets a switch layer tile, creating the layer on first use.
    pub fn set_switch(&mut self, x: i32, y: i32, tile: SwitchTile) {
        let len = self.len();
        if let Some(i) = self.cell(x, y) {
            self.switch
                .get_or_insert_with(|| vec![SwitchTile::default(); len])[i] = tile;
        }
    }

    /// Sets a tune layer tile, creating the layer on first use.
    pub fn set_tune(&mut self, x: i32, y: i32, number: u8) {
        let len = self.len();
        if let Some(i) = self.cell(x, y) {
            self.tune.get_or_insert_with(|| vec![TuneTile::default(); len])[i] = TuneTile {
                number,
                kind: TileIndex::TUNE,
            };
        }
    }
}
