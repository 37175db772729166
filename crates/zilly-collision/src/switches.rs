//! Switch activation state.
//!
//! The collision grid never owns switch state. Restriction queries take a
//! [`SwitchActive`] capability that answers for the querying entity's team.

/// Answers whether switch `number` is currently active.
pub trait SwitchActive {
    /// Returns true if the numbered switch is on.
    fn is_active(&self, number: u8) -> bool;
}

impl<F: Fn(u8) -> bool> SwitchActive for F {
    fn is_active(&self, number: u8) -> bool {
        self(number)
    }
}

/// Number of teams tracked per switch.
pub const MAX_TEAMS: usize = 64;

/// Runtime switch status, one row per switch number, one column per team.
#[derive(Debug, Clone)]
pub struct Switchers {
    status: Vec<[bool; MAX_TEAMS]>,
}

impl Switchers {
    /// Creates a table for switch numbers `0..=highest`, all active.
    ///
    /// Door stoppers start closed, so "active" is the initial state.
    #[must_use]
    pub fn new(highest: u8) -> Self {
        Self {
            status: vec![[true; MAX_TEAMS]; usize::from(highest) + 1],
        }
    }

    /// Number of switch rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.status.len()
    }

    /// True if there are no switch rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.status.is_empty()
    }

    /// Status of a switch for a team. Unknown switches or teams are off.
    #[must_use]
    pub fn status(&self, number: u8, team: usize) -> bool {
        self.status
            .get(usize::from(number))
            .and_then(|row| row.get(team))
            .copied()
            .unwrap_or(false)
    }

    /// Sets a switch for a team. Unknown switches or teams are ignored.
    pub fn set_status(&mut self, number: u8, team: usize, active: bool) {
        if let Some(cell) = self
            .status
            .get_mut(usize::from(number))
            .and_then(|row| row.get_mut(team))
        {
            *cell = active;
        }
    }

    /// View of the table for one team.
    #[must_use]
    pub fn for_team(&self, team: usize) -> TeamSwitches<'_> {
        TeamSwitches {
            switchers: self,
            team,
        }
    }
}

/// A [`Switchers`] table seen from one team.
#[derive(Debug, Clone, Copy)]
pub struct TeamSwitches<'a> {
    switchers: &'a Switchers,
    team: usize,
}

impl SwitchActive for TeamSwitches<'_> {
    fn is_active(&self, number: u8) -> bool {
        // Number 0 means "not switch controlled".
        number != 0 && self.switchers.status(number, self.team)
    }
}
