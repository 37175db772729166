//! Hook state machine states.

use serde::{Deserialize, Serialize};

/// State of a character's grappling hook.
///
/// The retract states advance one step per tick. Wire values are part of
/// the network contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum HookState {
    /// Fully retracted, waiting for the hook key to be released
    Retracted,
    /// Not in use
    #[default]
    Idle,
    /// First retract tick
    RetractStart,
    /// Second retract tick
    Retract1,
    /// Last retract tick
    RetractEnd,
    /// Travelling
    Flying,
    /// Attached to terrain or a player
    Grabbed,
}

impl HookState {
    /// Network value of the state.
    #[must_use]
    pub const fn to_wire(self) -> i32 {
        match self {
            Self::Retracted => -1,
            Self::Idle => 0,
            Self::RetractStart => 1,
            Self::Retract1 => 2,
            Self::RetractEnd => 3,
            Self::Flying => 4,
            Self::Grabbed => 5,
        }
    }

    /// Decodes a network value. Unknown values read as `Idle`.
    #[must_use]
    pub const fn from_wire(value: i32) -> Self {
        match value {
            -1 => Self::Retracted,
            1 => Self::RetractStart,
            2 => Self::Retract1,
            3 => Self::RetractEnd,
            4 => Self::Flying,
            5 => Self::Grabbed,
            _ => Self::Idle,
        }
    }

    /// True while stepping through the retract sequence (before its end).
    #[must_use]
    pub const fn is_retracting(self) -> bool {
        matches!(self, Self::RetractStart | Self::Retract1)
    }

    /// Next retract step.
    #[must_use]
    pub const fn next_retract(self) -> Self {
        match self {
            Self::RetractStart => Self::Retract1,
            Self::Retract1 => Self::RetractEnd,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_values() {
        for state in [
            HookState::Retracted,
            HookState::Idle,
            HookState::RetractStart,
            HookState::Retract1,
            HookState::RetractEnd,
            HookState::Flying,
            HookState::Grabbed,
        ] {
            assert_eq!(HookState::from_wire(state.to_wire()), state);
        }
        assert_eq!(HookState::from_wire(42), HookState::Idle);
        assert_eq!(HookState::Grabbed.to_wire(), 5);
    }

    #[test]
    fn test_retract_sequence() {
        let mut state = HookState::RetractStart;
        let mut steps = 0;
        while state.is_retracting() {
            state = state.next_retract();
            steps += 1;
        }
        assert_eq!(state, HookState::RetractEnd);
        assert_eq!(steps, 2);
    }
}
