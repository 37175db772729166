//! Deterministic character physics core.
//!
//! A [`CharacterCore`] is advanced in three passes per tick (see
//! [`WorldCore::tick`]): [`CharacterCore::tick`] for every core, then
//! [`CharacterCore::add_drag_velocity`] / [`CharacterCore::reset_drag_velocity`]
//! for every core, then [`CharacterCore::move_core`] for every core. Hook drag
//! computed during the first pass only lands in velocity during the second,
//! which keeps the result independent of iteration order.
//!
//! All arithmetic is plain `f32` in a fixed order so client prediction and
//! server reproduce each other exactly after [`CharacterCore::quantize`].

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::trace;
use zilly_collision::{
    clamp_vel, Collision, Hit, SwitchActive, TileIndex, DEFAULT_RESTRICTION_DISTANCE,
};
use zilly_common::{
    angle, closest_point_on_line, mix, round_to_int, saturated_add, velocity_ramp, SlotId,
};

use crate::config::PhysicsConfig;
use crate::hook::HookState;
use crate::input::PlayerInput;
use crate::tuning::TuningParams;
use crate::world::WorldCore;

/// Edge length of the character's collision box.
pub const PHYS_SIZE: f32 = 28.0;

/// Simulation ticks per second.
pub const SERVER_TICK_SPEED: i32 = 50;

/// Hard cap on velocity magnitude (units per tick).
pub const MAX_VELOCITY: f32 = 6000.0;

/// Ticks a player can stay hooked before the hook lets go.
const MAX_PLAYER_HOOK_TICKS: i32 = SERVER_TICK_SPEED + SERVER_TICK_SPEED / 5;

/// Events raised during the last tick, as bits.
pub struct CoreEvents;

impl CoreEvents {
    /// Jumped off the ground
    pub const GROUND_JUMP: u8 = 1 << 0;
    /// Jumped in the air
    pub const AIR_JUMP: u8 = 1 << 1;
    /// Hook launched (reserved, not raised by the core)
    pub const HOOK_LAUNCH: u8 = 1 << 2;
    /// Hook attached to a player
    pub const HOOK_ATTACH_PLAYER: u8 = 1 << 3;
    /// Hook attached to terrain
    pub const HOOK_ATTACH_GROUND: u8 = 1 << 4;
    /// Hook hit an unhookable tile
    pub const HOOK_HIT_NOHOOK: u8 = 1 << 5;
    /// Hook finished retracting (reserved, not raised by the core)
    pub const HOOK_RETRACT: u8 = 1 << 6;
}

/// Quantized character state in network order.
///
/// The field order is a wire contract: position, velocity (x256), hook
/// state and tick, hook position, hook direction (x256), hooked player
/// (-1 for none), jump bits, direction, angle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize, Pod, Zeroable,
)]
#[repr(C)]
pub struct NetCharacterCore {
    /// Position x
    pub x: i32,
    /// Position y
    pub y: i32,
    /// Velocity x times 256
    pub vel_x: i32,
    /// Velocity y times 256
    pub vel_y: i32,
    /// Hook state wire value
    pub hook_state: i32,
    /// Ticks since the hook grabbed
    pub hook_tick: i32,
    /// Hook position x
    pub hook_x: i32,
    /// Hook position y
    pub hook_y: i32,
    /// Hook direction x times 256
    pub hook_dx: i32,
    /// Hook direction y times 256
    pub hook_dy: i32,
    /// Hooked slot or -1
    pub hooked_player: i32,
    /// Jump bits
    pub jumped: i32,
    /// Walk direction
    pub direction: i32,
    /// Aim angle (radians times 256)
    pub angle: i32,
}

impl NetCharacterCore {
    /// Number of wire fields.
    pub const FIELDS: usize = 14;

    /// Fields in wire order.
    #[must_use]
    pub fn to_array(&self) -> [i32; Self::FIELDS] {
        bytemuck::cast(*self)
    }

    /// Builds from fields in wire order.
    #[must_use]
    pub fn from_array(fields: [i32; Self::FIELDS]) -> Self {
        bytemuck::cast(fields)
    }
}

/// Everything a core needs from outside itself for one step.
#[derive(Clone, Copy)]
pub struct CoreEnv<'a> {
    /// Map collision
    pub collision: &'a Collision,
    /// Tuning set selected by the caller
    pub tuning: &'a TuningParams,
    /// Behaviour flags
    pub config: &'a PhysicsConfig,
    /// Switch state for door stoppers, seen from this core's team
    pub switches: Option<&'a dyn SwitchActive>,
}

/// Simulation state of one character.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterCore {
    /// Position (box centre)
    pub pos: Vec2,
    /// Velocity in units per tick
    pub vel: Vec2,
    /// Hook head position
    pub hook_pos: Vec2,
    /// Hook travel direction
    pub hook_dir: Vec2,
    /// Anchor for the hook length after a hook teleport
    pub hook_tele_base: Vec2,
    /// Ticks spent grabbed
    pub hook_tick: i32,
    /// Hook state
    pub hook_state: HookState,
    /// Hooked character (weak, may be stale)
    pub hooked_player: Option<SlotId>,
    /// Set while a teleported hook is still flying
    pub new_hook: bool,
    /// Bit 0: jump held since last ground jump; bit 1: air jump used
    pub jumped: i32,
    /// Walk direction (-1, 0, 1)
    pub direction: i32,
    /// Aim angle (radians times 256)
    pub angle: i32,
    /// Input applied on the next tick
    pub input: PlayerInput,
    /// [`CoreEvents`] raised during the last tick
    pub triggered_events: u8,
    /// Current move restriction bits
    pub move_restrictions: u8,
    /// Set if the last move touched a death tile
    pub death: bool,
    hook_drag_vel: Vec2,
    slot: Option<SlotId>,
}

impl Default for CharacterCore {
    fn default() -> Self {
        Self::new(Vec2::ZERO)
    }
}

impl CharacterCore {
    /// Creates a core at rest at `pos`.
    #[must_use]
    pub fn new(pos: Vec2) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            hook_pos: pos,
            hook_dir: Vec2::ZERO,
            hook_tele_base: Vec2::ZERO,
            hook_tick: 0,
            hook_state: HookState::Idle,
            hooked_player: None,
            new_hook: false,
            jumped: 0,
            direction: 0,
            angle: 0,
            input: PlayerInput::default(),
            triggered_events: 0,
            move_restrictions: 0,
            death: false,
            hook_drag_vel: Vec2::ZERO,
            slot: None,
        }
    }

    /// Slot this core occupies in its world, if any.
    #[must_use]
    pub fn slot(&self) -> Option<SlotId> {
        self.slot
    }

    pub(crate) fn set_slot(&mut self, slot: Option<SlotId>) {
        self.slot = slot;
    }

    /// Drag staged by hooks for the next drag pass.
    #[must_use]
    pub fn hook_drag_vel(&self) -> Vec2 {
        self.hook_drag_vel
    }

    pub(crate) fn stage_drag(&mut self, drag: Vec2) {
        self.hook_drag_vel += drag;
    }

    /// Resets the physical state for a (re)spawn.
    pub fn reset(&mut self) {
        self.pos = Vec2::ZERO;
        self.vel = Vec2::ZERO;
        self.new_hook = false;
        self.hook_drag_vel = Vec2::ZERO;
        self.hook_pos = Vec2::ZERO;
        self.hook_dir = Vec2::ZERO;
        self.hook_tick = 0;
        self.hook_state = HookState::Idle;
        self.hooked_player = None;
        self.jumped = 0;
        self.triggered_events = 0;
        self.death = false;
    }

    /// True if standing on solid ground.
    #[must_use]
    pub fn is_grounded(&self, collision: &Collision) -> bool {
        let half = PHYS_SIZE / 2.0;
        collision.check_point(Vec2::new(self.pos.x + half, self.pos.y + half + 5.0))
            || collision.check_point(Vec2::new(self.pos.x - half, self.pos.y + half + 5.0))
    }

    /// Advances input, hook and inter-character forces by one tick.
    ///
    /// `world` holds the other characters. If this core sits in it, its own
    /// slot is skipped.
    pub fn tick(&mut self, use_input: bool, env: &CoreEnv<'_>, mut world: Option<&mut WorldCore>) {
        let tuning = env.tuning;

        if env.config.ddrace_prediction {
            let switches = if use_input { env.switches } else { None };
            self.move_restrictions = env.collision.get_move_restrictions(
                switches,
                self.pos,
                DEFAULT_RESTRICTION_DISTANCE,
                None,
            );
        }
        self.triggered_events = 0;

        let grounded = self.is_grounded(env.collision);
        let target_direction = self.input.target().normalize_or_zero();

        self.vel.y += tuning.gravity.get();

        let (max_speed, accel, friction) = if grounded {
            (
                tuning.ground_control_speed.get(),
                tuning.ground_control_accel.get(),
                tuning.ground_friction.get(),
            )
        } else {
            (
                tuning.air_control_speed.get(),
                tuning.air_control_accel.get(),
                tuning.air_friction.get(),
            )
        };

        if use_input {
            self.apply_input(grounded, target_direction, tuning);
        }

        if self.direction < 0 {
            self.vel.x = saturated_add(-max_speed, max_speed, self.vel.x, -accel);
        }
        if self.direction > 0 {
            self.vel.x = saturated_add(-max_speed, max_speed, self.vel.x, accel);
        }
        if self.direction == 0 {
            self.vel.x *= friction;
        }

        if grounded {
            self.jumped &= !2;
        }

        match self.hook_state {
            HookState::Idle => {
                self.hooked_player = None;
                self.hook_pos = self.pos;
            }
            state if state.is_retracting() => {
                self.hook_state = state.next_retract();
            }
            HookState::RetractEnd => {
                self.hook_state = HookState::Retracted;
            }
            HookState::Flying => {
                self.tick_flying(env, target_direction, world.as_deref_mut());
            }
            _ => {}
        }

        if self.hook_state == HookState::Grabbed {
            self.tick_grabbed(tuning, world.as_deref());
        }

        if let Some(world) = world {
            self.interact(tuning, world);
            if self.hook_state != HookState::Flying {
                self.new_hook = false;
            }
        }

        self.vel = clamp_vel(self.move_restrictions, self.vel);

        if self.vel.length() > MAX_VELOCITY {
            self.vel = self.vel.normalize_or_zero() * MAX_VELOCITY;
        }
    }

    fn apply_input(&mut self, grounded: bool, target_direction: Vec2, tuning: &TuningParams) {
        self.direction = self.input.direction;
        self.angle = (angle(self.input.target()) * 256.0) as i32;

        if self.input.jumping() {
            if self.jumped & 1 == 0 {
                if grounded {
                    self.triggered_events |= CoreEvents::GROUND_JUMP;
                    self.vel.y = -tuning.ground_jump_impulse.get();
                    self.jumped |= 1;
                } else if self.jumped & 2 == 0 {
                    self.triggered_events |= CoreEvents::AIR_JUMP;
                    self.vel.y = -tuning.air_jump_impulse.get();
                    self.jumped |= 3;
                }
            }
        } else {
            self.jumped &= !1;
        }

        if self.input.hooking() {
            if self.hook_state == HookState::Idle {
                self.hook_state = HookState::Flying;
                self.hook_pos = self.pos + target_direction * PHYS_SIZE * 1.5;
                self.hook_dir = target_direction;
                self.hooked_player = None;
                self.hook_tick = 0;
            }
        } else {
            self.hooked_player = None;
            self.hook_state = HookState::Idle;
            self.hook_pos = self.pos;
        }
    }

    fn tick_flying(
        &mut self,
        env: &CoreEnv<'_>,
        target_direction: Vec2,
        mut world: Option<&mut WorldCore>,
    ) {
        let tuning = env.tuning;
        let hook_length = tuning.hook_length.get();

        let mut new_pos = self.hook_pos + self.hook_dir * tuning.hook_fire_speed.get();
        let anchor = if self.new_hook {
            self.hook_tele_base
        } else {
            self.pos
        };
        if anchor.distance(new_pos) > hook_length {
            self.hook_state = HookState::RetractStart;
            new_pos = anchor + (new_pos - anchor).normalize_or_zero() * hook_length;
        }

        let trace = if env.config.ddrace_prediction {
            env.collision
                .intersect_line_tele_hook(self.hook_pos, new_pos, env.config.old_teleport_hook)
        } else {
            env.collision.intersect_line(self.hook_pos, new_pos)
        };
        new_pos = trace.pos;

        let (hit_ground, hit_nohook, tele_group) = match trace.hit {
            Hit::Tile(TileIndex::NOHOOK) => (false, true, None),
            Hit::Tile(_) => (true, false, None),
            Hit::HookTeleport(group) => (false, false, Some(group)),
            Hit::Nothing => (false, false, None),
        };

        // Players take precedence over terrain hit on the same step.
        if tuning.player_hooking.enabled() {
            if let Some(world) = world.as_deref() {
                let mut best = 0.0;
                for (slot, other) in world.others(self.slot) {
                    let closest = closest_point_on_line(self.hook_pos, new_pos, other.pos);
                    if other.pos.distance(closest) < PHYS_SIZE + 2.0
                        && (self.hooked_player.is_none()
                            || self.hook_pos.distance(other.pos) < best)
                    {
                        self.triggered_events |= CoreEvents::HOOK_ATTACH_PLAYER;
                        self.hook_state = HookState::Grabbed;
                        self.hooked_player = Some(slot);
                        best = self.hook_pos.distance(other.pos);
                    }
                }
            }
        }

        if self.hook_state != HookState::Flying {
            return;
        }

        if hit_ground {
            self.triggered_events |= CoreEvents::HOOK_ATTACH_GROUND;
            self.hook_state = HookState::Grabbed;
        } else if hit_nohook {
            self.triggered_events |= CoreEvents::HOOK_HIT_NOHOOK;
            self.hook_state = HookState::RetractStart;
        }

        let outs = tele_group.map_or(&[][..], |group| env.collision.tele_outs(group));
        if outs.is_empty() {
            self.hook_pos = new_pos;
            return;
        }

        let pick = if outs.len() == 1 {
            0
        } else {
            world.map_or(0, |w| w.random_index(outs.len()))
        };
        let Some(&out) = outs.get(pick) else {
            self.hook_pos = new_pos;
            return;
        };

        trace!("Hook teleported to {:?}", out);
        self.triggered_events = 0;
        self.hooked_player = None;
        self.new_hook = true;
        self.hook_pos = out + target_direction * PHYS_SIZE * 1.5;
        self.hook_dir = target_direction;
        self.hook_tele_base = self.hook_pos;
    }

    fn tick_grabbed(&mut self, tuning: &TuningParams, world: Option<&WorldCore>) {
        if let Some(hooked) = self.hooked_player {
            match world.and_then(|w| w.get(hooked)) {
                Some(other) => self.hook_pos = other.pos,
                None => self.release_hook(),
            }
        }

        if self.hooked_player.is_none() && self.hook_pos.distance(self.pos) > 46.0 {
            let mut hook_vel =
                (self.hook_pos - self.pos).normalize_or_zero() * tuning.hook_drag_accel.get();
            // Pulls up harder than down.
            if hook_vel.y > 0.0 {
                hook_vel.y *= 0.3;
            }
            if (hook_vel.x < 0.0 && self.direction < 0) || (hook_vel.x > 0.0 && self.direction > 0)
            {
                hook_vel.x *= 0.95;
            } else {
                hook_vel.x *= 0.75;
            }

            let new_vel = self.vel + hook_vel;
            if new_vel.length() < tuning.hook_drag_speed.get()
                || new_vel.length() < self.vel.length()
            {
                self.vel = new_vel;
            }
        }

        self.hook_tick += 1;
        if let Some(hooked) = self.hooked_player {
            let alive = world.is_some_and(|w| w.get(hooked).is_some());
            if self.hook_tick > MAX_PLAYER_HOOK_TICKS || !alive {
                self.release_hook();
            }
        }
    }

    fn release_hook(&mut self) {
        self.hooked_player = None;
        self.hook_state = HookState::Retracted;
        self.hook_pos = self.pos;
    }

    /// Player collision push and hook drag staging against every other core.
    fn interact(&mut self, tuning: &TuningParams, world: &mut WorldCore) {
        let player_collision = tuning.player_collision.enabled();
        let player_hooking = tuning.player_hooking.enabled();

        for (slot, other) in world.others_mut(self.slot) {
            let distance = self.pos.distance(other.pos);
            let dir = (self.pos - other.pos).normalize_or_zero();

            if player_collision && distance < PHYS_SIZE * 1.25 && distance > 0.0 {
                let a = PHYS_SIZE * 1.45 - distance;
                let mut velocity = 0.5;
                // Less push when already moving away.
                if self.vel.length() > 0.0001 {
                    velocity = 1.0 - (self.vel.normalize_or_zero().dot(dir) + 1.0) / 2.0;
                }
                self.vel += dir * a * (velocity * 0.75);
                self.vel *= 0.85;
            }

            if player_hooking && self.hooked_player == Some(slot) && distance > PHYS_SIZE * 1.50 {
                let accel =
                    tuning.hook_drag_accel.get() * (distance / tuning.hook_length.get());
                other.stage_drag(dir * accel * 1.5);
                self.hook_drag_vel -= dir * accel * 0.25;
            }
        }
    }

    /// Folds staged hook drag into velocity, bounded by the drag speed.
    pub fn add_drag_velocity(&mut self, tuning: &TuningParams) {
        let drag_speed = tuning.hook_drag_speed.get();
        self.vel.x = saturated_add(-drag_speed, drag_speed, self.vel.x, self.hook_drag_vel.x);
        self.vel.y = saturated_add(-drag_speed, drag_speed, self.vel.y, self.hook_drag_vel.y);
    }

    /// Clears staged hook drag.
    pub fn reset_drag_velocity(&mut self) {
        self.hook_drag_vel = Vec2::ZERO;
    }

    /// Integrates position against the map and the other characters.
    ///
    /// Does nothing without a world.
    pub fn move_core(&mut self, env: &CoreEnv<'_>, world: Option<&WorldCore>) {
        let Some(world) = world else {
            return;
        };
        let tuning = env.tuning;

        let ramp = velocity_ramp(
            self.vel.length() * SERVER_TICK_SPEED as f32,
            tuning.velramp_start.get(),
            tuning.velramp_range.get(),
            tuning.velramp_curvature.get(),
        );

        self.vel.x *= ramp;
        let mut new_pos = self.pos;
        self.death =
            env.collision
                .move_box(&mut new_pos, &mut self.vel, Vec2::splat(PHYS_SIZE), 0.0);
        self.vel.x *= 1.0 / ramp;

        if self.death {
            trace!("Core {:?} touched a death tile", self.slot);
        }

        if tuning.player_collision.enabled() {
            let distance = self.pos.distance(new_pos);
            let end = (distance + 1.0) as i32;
            let mut last = self.pos;
            for i in 0..end {
                let a = if distance > 0.0 {
                    i as f32 / distance
                } else {
                    0.0
                };
                let pos = mix(self.pos, new_pos, a);
                for (_, other) in world.others(self.slot) {
                    let d = pos.distance(other.pos);
                    if (0.0..PHYS_SIZE).contains(&d) {
                        if a > 0.0 {
                            self.pos = last;
                        } else if new_pos.distance(other.pos) > d {
                            self.pos = new_pos;
                        }
                        return;
                    }
                }
                last = pos;
            }
        }

        self.pos = new_pos;
    }

    /// Adds a force, then clamps by the move restrictions.
    pub fn apply_force(&mut self, force: Vec2) {
        self.vel = self.limit_vel(self.vel + force);
    }

    /// Clamps a velocity by the current move restrictions.
    #[must_use]
    pub fn limit_vel(&self, vel: Vec2) -> Vec2 {
        clamp_vel(self.move_restrictions, vel)
    }

    /// Quantized network form.
    #[must_use]
    pub fn write(&self) -> NetCharacterCore {
        NetCharacterCore {
            x: round_to_int(self.pos.x),
            y: round_to_int(self.pos.y),
            vel_x: round_to_int(self.vel.x * 256.0),
            vel_y: round_to_int(self.vel.y * 256.0),
            hook_state: self.hook_state.to_wire(),
            hook_tick: self.hook_tick,
            hook_x: round_to_int(self.hook_pos.x),
            hook_y: round_to_int(self.hook_pos.y),
            hook_dx: round_to_int(self.hook_dir.x * 256.0),
            hook_dy: round_to_int(self.hook_dir.y * 256.0),
            hooked_player: SlotId::to_wire(self.hooked_player),
            jumped: self.jumped,
            direction: self.direction,
            angle: self.angle,
        }
    }

    /// Loads state from its network form.
    pub fn read(&mut self, net: &NetCharacterCore) {
        self.pos = Vec2::new(net.x as f32, net.y as f32);
        self.vel = Vec2::new(net.vel_x as f32 / 256.0, net.vel_y as f32 / 256.0);
        self.hook_state = HookState::from_wire(net.hook_state);
        self.hook_tick = net.hook_tick;
        self.hook_pos = Vec2::new(net.hook_x as f32, net.hook_y as f32);
        self.hook_dir = Vec2::new(net.hook_dx as f32 / 256.0, net.hook_dy as f32 / 256.0);
        self.hooked_player = SlotId::from_wire(net.hooked_player);
        self.jumped = net.jumped;
        self.direction = net.direction;
        self.angle = net.angle;
    }

    /// Rounds the state to what the network would carry.
    pub fn quantize(&mut self) {
        let net = self.write();
        self.read(&net);
    }
}
