//! The set of character cores simulated together.

use glam::Vec2;
use tracing::{debug, info};
use zilly_collision::{Collision, SwitchActive};
use zilly_common::{SlotId, MAX_CLIENTS};

use crate::character::{CharacterCore, CoreEnv};
use crate::config::PhysicsConfig;
use crate::input::PlayerInput;
use crate::tuning::TuningParams;

/// Fixed-size table of character slots plus the shared tuning sets.
///
/// Cores refer to each other only through [`SlotId`]s, which are checked
/// for liveness on every use.
#[derive(Debug)]
pub struct WorldCore {
    characters: Vec<Option<CharacterCore>>,
    tuning: [TuningParams; 2],
    rng: fastrand::Rng,
}

impl Clone for WorldCore {
    fn clone(&self) -> Self {
        // Same generator state, so a clone replays the same teleport picks.
        Self {
            characters: self.characters.clone(),
            tuning: self.tuning,
            rng: fastrand::Rng::with_seed(self.rng.get_seed()),
        }
    }
}

impl Default for WorldCore {
    fn default() -> Self {
        Self::new(0)
    }
}

impl WorldCore {
    /// Creates an empty world with default tuning. `seed` drives the
    /// choice between several hook teleport destinations.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            characters: vec![None; MAX_CLIENTS],
            tuning: [TuningParams::default(); 2],
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Tuning set by index (0 main, 1 dummy). Out-of-range indices read
    /// the main set.
    #[must_use]
    pub fn tuning(&self, index: usize) -> &TuningParams {
        self.tuning.get(index).unwrap_or(&self.tuning[0])
    }

    /// Mutable tuning set, if the index exists.
    pub fn tuning_mut(&mut self, index: usize) -> Option<&mut TuningParams> {
        self.tuning.get_mut(index)
    }

    /// Places a fresh core at `pos` in `slot`, replacing any previous one.
    ///
    /// Returns `None` if the slot is outside the table.
    pub fn spawn(&mut self, slot: SlotId, pos: Vec2) -> Option<&mut CharacterCore> {
        let entry = self.characters.get_mut(slot.index())?;
        if entry.is_some() {
            debug!("Slot {} respawned", slot);
        } else {
            info!("Slot {} joined at ({:.0}, {:.0})", slot, pos.x, pos.y);
        }
        let mut core = CharacterCore::new(pos);
        core.set_slot(Some(slot));
        Some(entry.insert(core))
    }

    /// Inserts an existing core into `slot`.
    pub fn insert(&mut self, slot: SlotId, mut core: CharacterCore) -> Option<&mut CharacterCore> {
        let entry = self.characters.get_mut(slot.index())?;
        core.set_slot(Some(slot));
        Some(entry.insert(core))
    }

    /// Empties `slot`, returning its core.
    ///
    /// Cores hooked to it notice on their next tick and release.
    pub fn remove(&mut self, slot: SlotId) -> Option<CharacterCore> {
        let mut core = self.characters.get_mut(slot.index())?.take()?;
        info!("Slot {} left", slot);
        core.set_slot(None);
        Some(core)
    }

    /// Core in `slot`, if occupied.
    #[must_use]
    pub fn get(&self, slot: SlotId) -> Option<&CharacterCore> {
        self.characters.get(slot.index())?.as_ref()
    }

    /// Mutable core in `slot`, if occupied.
    pub fn get_mut(&mut self, slot: SlotId) -> Option<&mut CharacterCore> {
        self.characters.get_mut(slot.index())?.as_mut()
    }

    /// Sets the input the core in `slot` applies on its next tick.
    ///
    /// Returns `false` if the slot is empty.
    pub fn set_input(&mut self, slot: SlotId, input: PlayerInput) -> bool {
        match self.get_mut(slot) {
            Some(core) => {
                core.input = input;
                true
            }
            None => false,
        }
    }

    /// Occupied slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &CharacterCore)> {
        self.characters
            .iter()
            .enumerate()
            .filter_map(|(i, c)| Some((SlotId::checked(i)?, c.as_ref()?)))
    }

    /// Mutable occupied slots in index order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SlotId, &mut CharacterCore)> {
        self.characters
            .iter_mut()
            .enumerate()
            .filter_map(|(i, c)| Some((SlotId::checked(i)?, c.as_mut()?)))
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.characters.iter().flatten().count()
    }

    /// True if no slot is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn others(
        &self,
        skip: Option<SlotId>,
    ) -> impl Iterator<Item = (SlotId, &CharacterCore)> {
        self.iter().filter(move |(slot, _)| Some(*slot) != skip)
    }

    pub(crate) fn others_mut(
        &mut self,
        skip: Option<SlotId>,
    ) -> impl Iterator<Item = (SlotId, &mut CharacterCore)> {
        self.iter_mut().filter(move |(slot, _)| Some(*slot) != skip)
    }

    pub(crate) fn random_index(&mut self, len: usize) -> usize {
        self.rng.usize(..len)
    }

    /// Advances every core by one tick.
    ///
    /// Runs all ticks, then all drag applications, then all moves. The
    /// tuning set comes from `config.dummy`.
    pub fn tick(
        &mut self,
        collision: &Collision,
        config: &PhysicsConfig,
        switches: Option<&dyn SwitchActive>,
        use_input: bool,
    ) {
        let tuning = *self.tuning(config.tuning_index());
        let env = CoreEnv {
            collision,
            tuning: &tuning,
            config,
            switches,
        };

        for i in 0..self.characters.len() {
            let Some(mut core) = self.characters.get_mut(i).and_then(Option::take) else {
                continue;
            };
            core.tick(use_input, &env, Some(&mut *self));
            self.put_back(i, core);
        }

        for (_, core) in self.iter_mut() {
            core.add_drag_velocity(&tuning);
            core.reset_drag_velocity();
        }

        for i in 0..self.characters.len() {
            let Some(mut core) = self.characters.get_mut(i).and_then(Option::take) else {
                continue;
            };
            core.move_core(&env, Some(&*self));
            if core.death {
                debug!("Slot {:?} hit a death tile", core.slot());
            }
            self.put_back(i, core);
        }
    }

    fn put_back(&mut self, index: usize, core: CharacterCore) {
        if let Some(entry) = self.characters.get_mut(index) {
            *entry = Some(core);
        }
    }

    /// Rounds every core to its network form.
    pub fn quantize(&mut self) {
        for (_, core) in self.iter_mut() {
            core.quantize();
        }
    }
}
