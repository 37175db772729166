//! ID types for player slots.

use serde::{Deserialize, Serialize};

/// Maximum number of character slots in a world.
pub const MAX_CLIENTS: usize = 64;

/// Index of a character slot in the world's character array.
///
/// This is a weak reference: the slot may have been emptied or reused since
/// the id was stored, so holders must check liveness before dereferencing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(u16);

impl SlotId {
    /// Creates a slot id from a raw index.
    #[must_use]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Creates a slot id if `index` is inside `0..MAX_CLIENTS`.
    #[must_use]
    pub fn checked(index: usize) -> Option<Self> {
        (index < MAX_CLIENTS).then(|| Self(index as u16))
    }

    /// Returns the raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Encodes an optional slot the way the network struct carries it
    /// (`-1` for none).
    #[must_use]
    pub fn to_wire(slot: Option<Self>) -> i32 {
        slot.map_or(-1, |s| i32::from(s.0))
    }

    /// Decodes a wire slot value. Negative or out-of-range values are none.
    #[must_use]
    pub fn from_wire(value: i32) -> Option<Self> {
        usize::try_from(value).ok().and_then(Self::checked)
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_bounds() {
        assert!(SlotId::checked(MAX_CLIENTS - 1).is_some());
        assert!(SlotId::checked(MAX_CLIENTS).is_none());
    }

    #[test]
    fn test_from_wire_rejects_out_of_range() {
        assert_eq!(SlotId::from_wire(MAX_CLIENTS as i32), None);
        assert_eq!(SlotId::from_wire(-7), None);
        assert_eq!(SlotId::from_wire(3), Some(SlotId::new(3)));
    }
}
