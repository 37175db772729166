//! Physics behaviour switches.

use serde::{Deserialize, Serialize};

/// Flags that change how the character core simulates.
///
/// Passed explicitly into every simulation call; nothing reads them from
/// global state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Recompute move restrictions every tick and trace hooks through
    /// teleporters and through tiles
    pub ddrace_prediction: bool,
    /// Simulate with the second tuning set
    pub dummy: bool,
    /// Hooks teleport through plain teleporters instead of hook teleporters
    pub old_teleport_hook: bool,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            ddrace_prediction: true,
            dummy: false,
            old_teleport_hook: false,
        }
    }
}

impl PhysicsConfig {
    /// Index of the tuning set this config selects.
    #[must_use]
    pub fn tuning_index(&self) -> usize {
        usize::from(self.dummy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tuning_index() {
        let mut config = PhysicsConfig::default();
        assert_eq!(config.tuning_index(), 0);
        config.dummy = true;
        assert_eq!(config.tuning_index(), 1);
    }
}
