//! Client-side prediction on top of confirmed server state.

use tracing::{debug, info};
use zilly_collision::{Collision, SwitchActive};
use zilly_common::SlotId;

use crate::character::{CharacterCore, NetCharacterCore};
use crate::config::PhysicsConfig;
use crate::input::PlayerInput;
use crate::world::WorldCore;

/// Inputs applied on one predicted tick.
pub type TickInputs<'a> = &'a [(SlotId, PlayerInput)];

/// Keeps the last confirmed world and predicts ahead of it.
///
/// Prediction always runs on a clone. The confirmed world changes only
/// through [`Predictor::rebase`].
#[derive(Debug, Clone)]
pub struct Predictor {
    confirmed: WorldCore,
    confirmed_tick: i32,
}

impl Predictor {
    /// Starts from `world` as confirmed at `tick`.
    #[must_use]
    pub fn new(world: WorldCore, tick: i32) -> Self {
        Self {
            confirmed: world,
            confirmed_tick: tick,
        }
    }

    /// Last confirmed world.
    #[must_use]
    pub fn confirmed(&self) -> &WorldCore {
        &self.confirmed
    }

    /// Tick of the last confirmed world.
    #[must_use]
    pub fn confirmed_tick(&self) -> i32 {
        self.confirmed_tick
    }

    /// Replaces confirmed state with a server snapshot.
    ///
    /// Slots in the snapshot are (re)created from their network form; slots
    /// missing from it are removed. Inputs carried by existing cores are
    /// kept.
    pub fn rebase(&mut self, tick: i32, snapshot: &[(SlotId, NetCharacterCore)]) {
        let stale: Vec<SlotId> = self
            .confirmed
            .iter()
            .map(|(slot, _)| slot)
            .filter(|slot| !snapshot.iter().any(|(s, _)| s == slot))
            .collect();
        for slot in stale {
            self.confirmed.remove(slot);
        }

        for (slot, net) in snapshot {
            if self.confirmed.get(*slot).is_none() {
                self.confirmed.insert(*slot, CharacterCore::default());
            }
            let Some(core) = self.confirmed.get_mut(*slot) else {
                debug!("Snapshot slot {} out of range, skipped", slot);
                continue;
            };
            core.read(net);
            core.quantize();
        }

        if tick < self.confirmed_tick {
            info!(
                "Rebased backwards from tick {} to {}",
                self.confirmed_tick, tick
            );
        } else {
            debug!("Rebased to tick {} with {} cores", tick, snapshot.len());
        }
        self.confirmed_tick = tick;
    }

    /// Predicts one tick per entry of `inputs`, starting from the confirmed
    /// world. Each tick is quantised like the server would transmit it.
    #[must_use]
    pub fn predict<'a>(
        &self,
        collision: &Collision,
        config: &PhysicsConfig,
        switches: Option<&dyn SwitchActive>,
        inputs: impl IntoIterator<Item = TickInputs<'a>>,
    ) -> WorldCore {
        let mut world = self.confirmed.clone();
        for tick_inputs in inputs {
            for (slot, input) in tick_inputs {
                world.set_input(*slot, *input);
            }
            world.tick(collision, config, switches, true);
            world.quantize();
        }
        world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use zilly_collision::MapLayers;

    fn open_map() -> Collision {
        Collision::new(MapLayers::empty(64, 64)).expect("grid")
    }

    #[test]
    fn test_predict_leaves_confirmed_untouched() {
        let collision = open_map();
        let config = PhysicsConfig::default();
        let mut world = WorldCore::new(3);
        let slot = SlotId::new(0);
        world.spawn(slot, Vec2::new(500.0, 500.0));
        let predictor = Predictor::new(world, 10);

        let right = [(
            slot,
            PlayerInput {
                direction: 1,
                target_x: 1,
                ..PlayerInput::default()
            },
        )];
        let predicted =
            predictor.predict(&collision, &config, None, std::iter::repeat(&right[..]).take(5));

        let start = predictor.confirmed().get(slot).map(|c| c.pos);
        let ahead = predicted.get(slot).map(|c| c.pos);
        assert_eq!(start, Some(Vec2::new(500.0, 500.0)));
        assert!(ahead.is_some_and(|p| p.x > 500.0 && p.y > 500.0));
        assert_eq!(predictor.confirmed_tick(), 10);
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let collision = open_map();
        let config = PhysicsConfig::default();
        let mut world = WorldCore::new(3);
        world.spawn(SlotId::new(0), Vec2::new(500.0, 500.0));
        world.spawn(SlotId::new(1), Vec2::new(520.0, 500.0));
        let predictor = Predictor::new(world, 0);

        let inputs = [(
            SlotId::new(0),
            PlayerInput {
                direction: -1,
                jump: 1,
                target_x: 1,
                hook: 1,
                ..PlayerInput::default()
            },
        )];
        let ticks = || std::iter::repeat(&inputs[..]).take(20);
        let a = predictor.predict(&collision, &config, None, ticks());
        let b = predictor.predict(&collision, &config, None, ticks());
        let net_a: Vec<_> = a.iter().map(|(s, c)| (s, c.write())).collect();
        let net_b: Vec<_> = b.iter().map(|(s, c)| (s, c.write())).collect();
        assert_eq!(net_a, net_b);
    }

    #[test]
    fn test_rebase_reads_snapshot() {
        let mut predictor = Predictor::new(WorldCore::new(0), 0);
        predictor
            .confirmed
            .spawn(SlotId::new(9), Vec2::new(1.0, 1.0));

        let net = NetCharacterCore {
            x: 320,
            y: 64,
            vel_x: 512,
            hooked_player: -1,
            ..NetCharacterCore::default()
        };
        predictor.rebase(42, &[(SlotId::new(2), net)]);

        assert_eq!(predictor.confirmed_tick(), 42);
        assert!(predictor.confirmed().get(SlotId::new(9)).is_none());
        let core = predictor.confirmed().get(SlotId::new(2)).expect("rebased");
        assert_eq!(core.pos, Vec2::new(320.0, 64.0));
        assert_eq!(core.vel.x, 2.0);
        assert_eq!(core.write(), net);
    }
}
