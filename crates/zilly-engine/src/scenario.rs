//! Scenario runner and tick trace.
//!
//! Builds the map and players described by a [`SimConfig`], steps the world
//! with each player's scripted input, and records the network form of every
//! core after every tick together with a per-tick state hash. Two traces of
//! the same scenario must hash identically tick for tick.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Write;
use tracing::{debug, info, warn};
use zilly_collision::{Collision, MapLayers, SwitchActive, Switchers};
use zilly_common::{SlotId, ZillyResult};
use zilly_gameplay::{NetCharacterCore, PhysicsConfig, PlayerInput, WorldCore};

use crate::config::{ScriptedInput, SimConfig};

/// One core's state after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceCore {
    /// Slot
    pub slot: SlotId,
    /// Network form
    pub core: NetCharacterCore,
    /// Core events raised this tick
    pub events: u8,
    /// Touched a death tile this tick
    pub death: bool,
}

/// All cores after one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceTick {
    /// Tick number, starting at 0
    pub tick: u32,
    /// Hash of `cores`
    pub state_hash: u64,
    /// Cores in slot order
    pub cores: Vec<TraceCore>,
}

/// Full record of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    /// Seed the run used
    pub seed: u64,
    /// Ticks in order
    pub ticks: Vec<TraceTick>,
}

impl Trace {
    /// First tick whose state hash differs from `other`, if any.
    #[must_use]
    pub fn first_divergence(&self, other: &Self) -> Option<u32> {
        self.ticks
            .iter()
            .zip(&other.ticks)
            .find(|(a, b)| a.state_hash != b.state_hash)
            .map(|(a, _)| a.tick)
            .or_else(|| {
                let shorter = self.ticks.len().min(other.ticks.len());
                (self.ticks.len() != other.ticks.len()).then_some(shorter as u32)
            })
    }

    /// Writes the trace as pretty JSON.
    pub fn write_json<W: Write>(&self, writer: W) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(writer, self)
    }
}

struct Script {
    slot: SlotId,
    inputs: Vec<ScriptedInput>,
}

impl Script {
    /// Input in effect at `tick`: the latest change at or before it.
    fn input_at(&self, tick: u32) -> PlayerInput {
        let after = self.inputs.partition_point(|s| s.tick <= tick);
        after
            .checked_sub(1)
            .and_then(|i| self.inputs.get(i))
            .map_or_else(PlayerInput::default, |s| s.input)
    }
}

/// A built, runnable scenario.
pub struct Scenario {
    collision: Collision,
    world: WorldCore,
    physics: PhysicsConfig,
    switchers: Switchers,
    scripts: Vec<Script>,
    use_input: bool,
    quantize: bool,
    seed: u64,
    next_tick: u32,
}

impl Scenario {
    /// Builds the map, tuning and players of `config`.
    ///
    /// The config should already be validated.
    pub fn build(config: &SimConfig) -> ZillyResult<Self> {
        let rows: Vec<&str> = config.map.rows.iter().map(String::as_str).collect();
        let collision = Collision::new(MapLayers::from_rows(&rows)?)?;
        let switchers = Switchers::new(collision.num_switchers());

        let tuning = config.tuning_params()?;
        let mut world = WorldCore::new(config.seed);
        for set in 0..2 {
            if let Some(params) = world.tuning_mut(set) {
                *params = tuning;
            }
        }

        let mut scripts = Vec::with_capacity(config.players.len());
        for player in &config.players {
            let Some(slot) = SlotId::checked(usize::from(player.slot)) else {
                warn!("Player slot {} out of range, skipped", player.slot);
                continue;
            };
            world.spawn(slot, player.spawn);

            let mut inputs = player.inputs.clone();
            inputs.sort_by_key(|s| s.tick);
            scripts.push(Script { slot, inputs });
        }

        info!(
            "Scenario ready: {}x{} map, {} players",
            collision.width(),
            collision.height(),
            scripts.len()
        );

        Ok(Self {
            collision,
            world,
            physics: config.physics,
            switchers,
            scripts,
            use_input: config.use_input,
            quantize: config.quantize,
            seed: config.seed,
            next_tick: 0,
        })
    }

    /// The simulated world.
    #[must_use]
    pub fn world(&self) -> &WorldCore {
        &self.world
    }

    /// Advances one tick and returns its trace entry.
    pub fn step(&mut self) -> TraceTick {
        let tick = self.next_tick;
        self.next_tick += 1;

        for script in &self.scripts {
            self.world.set_input(script.slot, script.input_at(tick));
        }

        let switches: &dyn SwitchActive = &self.switchers.for_team(0);
        self.world
            .tick(&self.collision, &self.physics, Some(switches), self.use_input);
        if self.quantize {
            self.world.quantize();
        }

        let cores: Vec<TraceCore> = self
            .world
            .iter()
            .map(|(slot, core)| TraceCore {
                slot,
                core: core.write(),
                events: core.triggered_events,
                death: core.death,
            })
            .collect();

        let mut hasher = DefaultHasher::new();
        cores.hash(&mut hasher);
        let state_hash = hasher.finish();

        debug!(
            "Tick {}: {} cores, hash {:016x}",
            tick,
            cores.len(),
            state_hash
        );

        TraceTick {
            tick,
            state_hash,
            cores,
        }
    }

    /// Runs `ticks` ticks and returns the trace.
    pub fn run(&mut self, ticks: u32) -> Trace {
        let mut trace = Trace {
            seed: self.seed,
            ticks: Vec::with_capacity(ticks as usize),
        };
        for _ in 0..ticks {
            trace.ticks.push(self.step());
        }
        trace
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlayerScript;
    use glam::Vec2;
    use zilly_common::ZillyError;

    #[test]
    fn test_script_input_lookup() {
        let right = PlayerInput {
            direction: 1,
            ..PlayerInput::default()
        };
        let left = PlayerInput {
            direction: -1,
            ..PlayerInput::default()
        };
        let script = Script {
            slot: SlotId::new(0),
            inputs: vec![
                ScriptedInput {
                    tick: 5,
                    input: right,
                },
                ScriptedInput {
                    tick: 10,
                    input: left,
                },
            ],
        };
        assert_eq!(script.input_at(0), PlayerInput::default());
        assert_eq!(script.input_at(5), right);
        assert_eq!(script.input_at(9), right);
        assert_eq!(script.input_at(10), left);
        assert_eq!(script.input_at(1000), left);
    }

    #[test]
    fn test_default_scenario_runs() {
        let mut config = SimConfig::default();
        config.validate().expect("valid");
        let mut scenario = Scenario::build(&config).expect("build");
        let trace = scenario.run(config.ticks);

        assert_eq!(trace.ticks.len(), 250);
        assert!(trace.ticks.iter().all(|t| t.cores.len() == 2));

        let walker = scenario.world().get(SlotId::new(0)).expect("spawned");
        assert!(walker.pos.x > 80.0);
    }

    #[test]
    fn test_runs_are_reproducible() {
        let config = SimConfig::default();
        let a = Scenario::build(&config).expect("build").run(120);
        let b = Scenario::build(&config).expect("build").run(120);
        assert_eq!(a.first_divergence(&b), None);
        assert_eq!(a, b);

        let shorter = Scenario::build(&config).expect("build").run(60);
        assert_eq!(a.first_divergence(&shorter), Some(60));
    }

    #[test]
    fn test_passive_scenario_ignores_scripts() {
        let mut config = SimConfig::default();
        config.use_input = false;
        config.players.truncate(1);
        let mut scenario = Scenario::build(&config).expect("build");
        scenario.run(100);
        let core = scenario.world().get(SlotId::new(0)).expect("spawned");
        assert_eq!(core.pos.x, 80.0);
    }

    #[test]
    fn test_death_tile_reported() {
        let mut config = SimConfig::default();
        config.map.rows = vec![
            "........".to_string(),
            "........".to_string(),
            "........".to_string(),
            "xxxxxxxx".to_string(),
            "########".to_string(),
        ];
        config.players = vec![PlayerScript {
            slot: 0,
            spawn: Vec2::new(48.0, 48.0),
            inputs: Vec::new(),
        }];
        let mut scenario = Scenario::build(&config).expect("build");
        let trace = scenario.run(60);
        assert!(trace.ticks.iter().any(|t| t.cores.iter().any(|c| c.death)));
    }

    #[test]
    fn test_bad_map_rejected() {
        let mut config = SimConfig::default();
        config.map.rows = vec!["..".to_string(), "...".to_string()];
        assert!(matches!(
            Scenario::build(&config),
            Err(ZillyError::Map(_))
        ));
    }

    #[test]
    fn test_tuning_overrides_reach_both_sets() {
        let mut config = SimConfig::default();
        config.tuning.insert("gravity".to_string(), 0.0);
        let scenario = Scenario::build(&config).expect("build");
        assert_eq!(scenario.world().tuning(0).gravity.get(), 0.0);
        assert_eq!(scenario.world().tuning(1).gravity.get(), 0.0);
        assert_eq!(scenario.world().tuning(0).hook_length.get(), 380.0);

        config.tuning.insert("warp".to_string(), 1.0);
        assert!(matches!(
            Scenario::build(&config),
            Err(ZillyError::Tuning(_))
        ));
    }

    #[test]
    fn test_trace_json() {
        let config = SimConfig::default();
        let trace = Scenario::build(&config).expect("build").run(3);
        let mut out = Vec::new();
        trace.write_json(&mut out).expect("serialize");
        let back: Trace = serde_json::from_slice(&out).expect("deserialize");
        assert_eq!(back, trace);
    }
}
