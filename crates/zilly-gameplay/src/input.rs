//! Per-tick player input as consumed by the character core.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Fire/weapon counters wrap at this mask.
pub const INPUT_STATE_MASK: i32 = 0x3f;

/// Player flag bits carried with the input.
pub struct PlayerFlags;

impl PlayerFlags {
    /// Player is typing in chat
    pub const CHATTING: i32 = 1 << 1;
    /// Scoreboard is open
    pub const SCOREBOARD: i32 = 1 << 2;
}

/// One tick of player input, laid out like its network message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Pod, Zeroable,
)]
#[repr(C)]
#[serde(default)]
pub struct PlayerInput {
    /// -1 left, 0 none, 1 right
    pub direction: i32,
    /// Aim target relative to the character
    pub target_x: i32,
    /// Aim target relative to the character
    pub target_y: i32,
    /// Jump held
    pub jump: i32,
    /// Fire press counter
    pub fire: i32,
    /// Hook held
    pub hook: i32,
    /// See [`PlayerFlags`]
    pub player_flags: i32,
    /// Weapon slot requested directly
    pub wanted_weapon: i32,
    /// Next-weapon press counter
    pub next_weapon: i32,
    /// Previous-weapon press counter
    pub prev_weapon: i32,
}

impl PlayerInput {
    /// Walk direction from held movement keys. Both or neither held is 0.
    #[must_use]
    pub fn direction_from_keys(left: bool, right: bool) -> i32 {
        match (left, right) {
            (true, false) => -1,
            (false, true) => 1,
            _ => 0,
        }
    }

    /// Sets the aim target. A zero target becomes `(1, 0)` so the aim
    /// direction is always defined.
    pub fn set_target(&mut self, target: Vec2) {
        self.target_x = target.x as i32;
        self.target_y = target.y as i32;
        if self.target_x == 0 && self.target_y == 0 {
            self.target_x = 1;
        }
    }

    /// Aim target as a vector.
    #[must_use]
    pub fn target(&self) -> Vec2 {
        Vec2::new(self.target_x as f32, self.target_y as f32)
    }

    /// True if jump is held.
    #[must_use]
    pub fn jumping(&self) -> bool {
        self.jump != 0
    }

    /// True if hook is held.
    #[must_use]
    pub fn hooking(&self) -> bool {
        self.hook != 0
    }

    /// True if this input should be sent even though no resend interval
    /// has passed. Aim changes alone do not count.
    #[must_use]
    pub fn differs_from(&self, last: &Self) -> bool {
        self.direction != last.direction
            || self.jump != last.jump
            || self.fire != last.fire
            || self.hook != last.hook
            || self.player_flags != last.player_flags
            || self.wanted_weapon != last.wanted_weapon
            || self.next_weapon != last.next_weapon
            || self.prev_weapon != last.prev_weapon
    }

    /// Input after all keys are released (focus loss, respawn).
    ///
    /// A held fire press is counted as released so the counter stays even.
    #[must_use]
    pub fn released(mut self) -> Self {
        self.direction = 0;
        self.jump = 0;
        if self.fire & 1 != 0 {
            self.fire += 1;
        }
        self.fire &= INPUT_STATE_MASK;
        self
    }
}
