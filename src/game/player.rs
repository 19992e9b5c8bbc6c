//! Players, their abilities and per-turn budgets.

use std::collections::{BTreeMap, BTreeSet};

use derive_getters::Getters;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Stable integer id of a player, assigned in turn order starting at 1.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[display("{}", _0)]
pub struct PlayerId(pub u32);

/// A capability bound to a player.
///
/// The `key` names the effect provider that implements the ability; counters
/// are private state the provider may read and bump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct PlayerAbility {
    key: String,
    counters: BTreeMap<String, i64>,
}

impl PlayerAbility {
    /// Creates an ability with no counters.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            counters: BTreeMap::new(),
        }
    }

    /// Reads a counter, defaulting to zero.
    pub fn counter(&self, name: &str) -> i64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    /// Adds `delta` to a counter and returns the new value.
    pub fn bump(&mut self, name: &str, delta: i64) -> i64 {
        let value = self.counters.entry(name.to_string()).or_insert(0);
        *value += delta;
        *value
    }
}

/// Which per-turn budget an action draws from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionBudget {
    /// Main actions.
    Action,
    /// Movement actions.
    Move,
}

/// Budgets each player receives at the start of their turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct TurnAllowance {
    actions: u32,
    moves: u32,
}

impl TurnAllowance {
    /// Creates an allowance.
    pub fn new(actions: u32, moves: u32) -> Self {
        Self { actions, moves }
    }
}

impl Default for TurnAllowance {
    fn default() -> Self {
        Self::new(1, 2)
    }
}

/// A seat in the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Player {
    pub(crate) id: PlayerId,
    pub(crate) name: String,
    pub(crate) abilities: Vec<PlayerAbility>,
    pub(crate) credits: u32,
    pub(crate) eliminated: bool,
    pub(crate) actions: u32,
    pub(crate) moves: u32,
    pub(crate) used_this_turn: BTreeSet<String>,
    pub(crate) produced_this_turn: bool,
}

impl Player {
    pub(crate) fn new(id: PlayerId, name: String, allowance: TurnAllowance) -> Self {
        Self {
            id,
            name,
            abilities: Vec::new(),
            credits: 0,
            eliminated: false,
            actions: allowance.actions,
            moves: allowance.moves,
            used_this_turn: BTreeSet::new(),
            produced_this_turn: false,
        }
    }

    /// Returns true if the player holds the ability named `key`.
    pub fn has_ability(&self, key: &str) -> bool {
        self.abilities.iter().any(|a| a.key == key)
    }

    /// Looks up a held ability.
    pub fn ability(&self, key: &str) -> Option<&PlayerAbility> {
        self.abilities.iter().find(|a| a.key == key)
    }

    pub(crate) fn ability_mut(&mut self, key: &str) -> Option<&mut PlayerAbility> {
        self.abilities.iter_mut().find(|a| a.key == key)
    }

    /// Remaining budget of the given kind.
    pub fn budget(&self, budget: ActionBudget) -> u32 {
        match budget {
            ActionBudget::Action => self.actions,
            ActionBudget::Move => self.moves,
        }
    }

    pub(crate) fn spend(&mut self, budget: ActionBudget) -> bool {
        let slot = match budget {
            ActionBudget::Action => &mut self.actions,
            ActionBudget::Move => &mut self.moves,
        };
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
        true
    }

    pub(crate) fn start_turn(&mut self, allowance: TurnAllowance) {
        self.actions = allowance.actions;
        self.moves = allowance.moves;
        self.used_this_turn.clear();
        self.produced_this_turn = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spend_stops_at_zero() {
        let mut player = Player::new(PlayerId(1), "Ada".to_string(), TurnAllowance::new(1, 0));
        assert!(player.spend(ActionBudget::Action));
        assert!(!player.spend(ActionBudget::Action));
        assert!(!player.spend(ActionBudget::Move));
    }

    #[test]
    fn test_ability_counters_default_to_zero() {
        let mut ability = PlayerAbility::new("plunder");
        assert_eq!(ability.counter("captures"), 0);
        assert_eq!(ability.bump("captures", 2), 2);
        assert_eq!(ability.counter("captures"), 2);
    }
}
