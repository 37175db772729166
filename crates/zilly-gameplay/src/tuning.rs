//! Physics tuning parameters.
//!
//! Each parameter is stored as integer hundredths so values loaded from
//! config or received over the network compare bit-identical on every
//! machine. The parameter order is part of the network contract.

use serde::{Deserialize, Serialize};
use zilly_common::{round_to_int, TuningError};

/// A tuning value stored as hundredths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "f32", into = "f32")]
pub struct TuneParam(i32);

impl TuneParam {
    /// Creates a parameter, rounding to the nearest hundredth.
    #[must_use]
    pub fn new(value: f32) -> Self {
        Self(round_to_int(value * 100.0))
    }

    /// Creates a parameter from its raw hundredths.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Raw hundredths.
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Value as a float.
    #[must_use]
    pub fn get(self) -> f32 {
        self.0 as f32 / 100.0
    }

    /// Value interpreted as a toggle (non-zero is on).
    #[must_use]
    pub fn enabled(self) -> bool {
        self.0 != 0
    }
}

impl From<f32> for TuneParam {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

impl From<TuneParam> for f32 {
    fn from(param: TuneParam) -> Self {
        param.get()
    }
}

macro_rules! tuning_params {
    ($($(#[$meta:meta])* $name:ident = $default:expr,)*) => {
        /// The full tuning parameter set.
        ///
        /// Field order matches the network order.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct TuningParams {
            $($(#[$meta])* pub $name: TuneParam,)*
        }

        impl Default for TuningParams {
            fn default() -> Self {
                Self {
                    $($name: TuneParam::new($default),)*
                }
            }
        }

        impl TuningParams {
            /// Parameter names in index order.
            pub const NAMES: &'static [&'static str] = &[$(stringify!($name)),*];

            fn slot(&self, index: usize) -> Option<TuneParam> {
                [$(self.$name),*].get(index).copied()
            }

            fn slot_mut(&mut self, index: usize) -> Option<&mut TuneParam> {
                [$(&mut self.$name),*].into_iter().nth(index)
            }
        }
    };
}

tuning_params! {
    /// Max horizontal speed on ground
    ground_control_speed = 10.0,
    /// Horizontal acceleration on ground
    ground_control_accel = 100.0 / 50.0,
    /// Velocity multiplier on ground without input
    ground_friction = 0.5,
    /// Upward velocity of a ground jump
    ground_jump_impulse = 13.2,
    /// Upward velocity of an air jump
    air_jump_impulse = 12.0,
    /// Max horizontal speed in air
    air_control_speed = 250.0 / 50.0,
    /// Horizontal acceleration in air
    air_control_accel = 1.5,
    /// Velocity multiplier in air without input
    air_friction = 0.95,
    /// Max hook reach
    hook_length = 380.0,
    /// Hook travel per tick
    hook_fire_speed = 80.0,
    /// Hook pull acceleration
    hook_drag_accel = 3.0,
    /// Max speed reached by hook pull
    hook_drag_speed = 15.0,
    /// Downward acceleration per tick
    gravity = 0.5,
    /// Speed (units per second) where the velocity ramp starts
    velramp_start = 550.0,
    /// Ramp range
    velramp_range = 2000.0,
    /// Ramp curvature
    velramp_curvature = 1.4,
    /// Gun projectile curvature
    gun_curvature = 1.25,
    /// Gun projectile speed
    gun_speed = 2200.0,
    /// Gun projectile lifetime
    gun_lifetime = 2.0,
    /// Shotgun projectile curvature
    shotgun_curvature = 1.25,
    /// Shotgun projectile speed
    shotgun_speed = 2750.0,
    /// Shotgun spread speed difference
    shotgun_speeddiff = 0.8,
    /// Shotgun projectile lifetime
    shotgun_lifetime = 0.20,
    /// Grenade curvature
    grenade_curvature = 7.0,
    /// Grenade speed
    grenade_speed = 1000.0,
    /// Grenade lifetime
    grenade_lifetime = 2.0,
    /// Laser reach
    laser_reach = 800.0,
    /// Laser bounce delay
    laser_bounce_delay = 150.0,
    /// Max laser bounces
    laser_bounce_num = 1000.0,
    /// Reach cost per laser bounce
    laser_bounce_cost = 0.0,
    /// Laser damage
    laser_damage = 5.0,
    /// Characters push each other apart (toggle)
    player_collision = 1.0,
    /// Characters can hook each other (toggle)
    player_hooking = 1.0,
    /// Shotgun knockback
    shotgun_strength = 10.0,
    /// Explosion knockback
    explosion_strength = 6.0,
    /// Hammer knockback
    hammer_strength = 1.0,
    /// Max seconds a player stays hooked
    hook_duration = 1.25,
    /// Hammer fire delay (ms)
    hammer_fire_delay = 125.0,
    /// Gun fire delay (ms)
    gun_fire_delay = 125.0,
    /// Shotgun fire delay (ms)
    shotgun_fire_delay = 500.0,
    /// Grenade fire delay (ms)
    grenade_fire_delay = 500.0,
    /// Laser fire delay (ms)
    laser_fire_delay = 800.0,
    /// Ninja fire delay (ms)
    ninja_fire_delay = 800.0,
}

impl TuningParams {
    /// Number of parameters.
    #[must_use]
    pub fn len() -> usize {
        Self::NAMES.len()
    }

    /// Index of a parameter by case-insensitive name.
    pub fn index_of(name: &str) -> Result<usize, TuningError> {
        Self::NAMES
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .ok_or_else(|| TuningError::UnknownName(name.to_string()))
    }

    /// Reads a parameter by index.
    pub fn get(&self, index: usize) -> Result<f32, TuningError> {
        self.slot(index)
            .map(TuneParam::get)
            .ok_or(TuningError::IndexOutOfRange {
                index,
                len: Self::len(),
            })
    }

    /// Writes a parameter by index.
    pub fn set(&mut self, index: usize, value: f32) -> Result<(), TuningError> {
        let param = self.slot_mut(index).ok_or(TuningError::IndexOutOfRange {
            index,
            len: Self::len(),
        })?;
        *param = TuneParam::new(value);
        Ok(())
    }

    /// Reads a parameter by case-insensitive name.
    pub fn get_by_name(&self, name: &str) -> Result<f32, TuningError> {
        self.get(Self::index_of(name)?)
    }

    /// Writes a parameter by case-insensitive name.
    pub fn set_by_name(&mut self, name: &str, value: f32) -> Result<(), TuningError> {
        self.set(Self::index_of(name)?, value)
    }

    /// Iterates `(name, value)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        Self::NAMES
            .iter()
            .enumerate()
            .filter_map(|(i, name)| self.slot(i).map(|p| (*name, p.get())))
    }

    /// Raw hundredths in index order, as sent over the network.
    #[must_use]
    pub fn to_raw(&self) -> Vec<i32> {
        (0..Self::len())
            .filter_map(|i| self.slot(i))
            .map(TuneParam::raw)
            .collect()
    }
}
