//! Configuration record shared by every movement ability.

use derive_getters::Getters;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};

use crate::game::ActionBudget;

/// Which destinations a movement may target.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DestinationRestriction {
    /// Any planet.
    #[default]
    Unrestricted,
    /// Unowned planets or the mover's own; never an enemy planet.
    CannotAttack,
    /// Only planets the mover already controls.
    MustControl,
}

/// Bookkeeping applied when a plan is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bookkeeping {
    /// Exhaust every source planet; exhausted planets cannot be sources.
    ExhaustSources,
    /// Exhaust the destination.
    ExhaustDestination,
    /// Mark the ability used for the rest of the turn.
    MarkUsed,
    /// Spend one unit of a per-turn budget.
    ConsumeBudget(ActionBudget),
}

/// Parameters of the movement wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct MovementConfig {
    /// Sources must be adjacent to the destination.
    require_adjacent: bool,
    /// Several sources may feed one destination.
    multiple_sources: bool,
    /// Destination ownership restriction.
    restriction: DestinationRestriction,
    /// Maximum forces taken from each source.
    per_source_cap: Option<u32>,
    /// Every force on a chosen source must move.
    move_all: bool,
    /// Applied on confirmation, in order.
    bookkeeping: Vec<Bookkeeping>,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            require_adjacent: true,
            multiple_sources: false,
            restriction: DestinationRestriction::Unrestricted,
            per_source_cap: None,
            move_all: false,
            bookkeeping: vec![Bookkeeping::MarkUsed, Bookkeeping::ConsumeBudget(ActionBudget::Move)],
        }
    }
}

impl MovementConfig {
    /// Returns true if confirming the plan exhausts its sources.
    pub fn exhausts_sources(&self) -> bool {
        self.bookkeeping.contains(&Bookkeeping::ExhaustSources)
    }

    /// Returns true if the ability can only be used once per turn.
    pub fn once_per_turn(&self) -> bool {
        self.bookkeeping.contains(&Bookkeeping::MarkUsed)
    }

    /// Budgets the plan spends on confirmation.
    pub fn budgets(&self) -> impl Iterator<Item = ActionBudget> + '_ {
        self.bookkeeping.iter().filter_map(|b| match b {
            Bookkeeping::ConsumeBudget(budget) => Some(*budget),
            _ => None,
        })
    }
}
