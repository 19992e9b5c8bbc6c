//! Planets, ownership and adjacency.

use std::collections::{BTreeMap, BTreeSet};

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

use crate::EngineError;
use crate::game::PlayerId;

/// Name of a planet, unique within a board.
pub type PlanetId = String;

/// A planet on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Planet {
    pub(crate) name: PlanetId,
    pub(crate) owner: Option<PlayerId>,
    pub(crate) forces: u32,
    pub(crate) base_output: u32,
    pub(crate) exhausted: bool,
    pub(crate) adjacent: BTreeSet<PlanetId>,
}

impl Planet {
    /// Creates an unowned, empty, ready planet.
    pub fn new(name: impl Into<PlanetId>, base_output: u32) -> Self {
        Self {
            name: name.into(),
            owner: None,
            forces: 0,
            base_output,
            exhausted: false,
            adjacent: BTreeSet::new(),
        }
    }

    /// Returns true if `player` owns this planet.
    pub fn is_owned_by(&self, player: PlayerId) -> bool {
        self.owner == Some(player)
    }

    /// Returns true if `name` is adjacent to this planet.
    pub fn is_adjacent_to(&self, name: &str) -> bool {
        self.adjacent.contains(name)
    }
}

/// All planets of a game, keyed and iterated by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    planets: BTreeMap<PlanetId, Planet>,
}

impl Board {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a planet, replacing any planet with the same name.
    pub(crate) fn insert(&mut self, planet: Planet) {
        self.planets.insert(planet.name.clone(), planet);
    }

    /// Connects two planets in both directions.
    pub(crate) fn connect(&mut self, a: &str, b: &str) -> Result<(), EngineError> {
        if a == b {
            return Err(EngineError::invariant(format!(
                "Planet '{}' cannot be adjacent to itself",
                a
            )));
        }
        if !self.planets.contains_key(b) {
            return Err(EngineError::invariant(format!("Unknown planet '{}'", b)));
        }
        self.planet_mut(a)?.adjacent.insert(b.to_string());
        self.planet_mut(b)?.adjacent.insert(a.to_string());
        Ok(())
    }

    /// Looks up a planet by name.
    pub fn get(&self, name: &str) -> Option<&Planet> {
        self.planets.get(name)
    }

    /// Looks up a planet, treating an unknown name as a broken contract.
    pub fn planet(&self, name: &str) -> Result<&Planet, EngineError> {
        self.planets
            .get(name)
            .ok_or_else(|| EngineError::invariant(format!("Unknown planet '{}'", name)))
    }

    pub(crate) fn planet_mut(&mut self, name: &str) -> Result<&mut Planet, EngineError> {
        self.planets
            .get_mut(name)
            .ok_or_else(|| EngineError::invariant(format!("Unknown planet '{}'", name)))
    }

    /// Iterates planets in name order.
    pub fn planets(&self) -> impl Iterator<Item = &Planet> {
        self.planets.values()
    }

    pub(crate) fn planets_mut(&mut self) -> impl Iterator<Item = &mut Planet> {
        self.planets.values_mut()
    }

    /// Iterates the planets owned by `player`, in name order.
    pub fn owned_by(&self, player: PlayerId) -> impl Iterator<Item = &Planet> {
        self.planets.values().filter(move |p| p.is_owned_by(player))
    }

    /// Returns true if `a` and `b` are adjacent.
    pub fn are_adjacent(&self, a: &str, b: &str) -> bool {
        self.get(a).is_some_and(|p| p.is_adjacent_to(b))
    }

    /// Total forces `player` has on the board.
    pub fn total_forces(&self, player: PlayerId) -> u32 {
        self.owned_by(player).map(|p| p.forces).sum()
    }

    /// Number of planets on the board.
    pub fn len(&self) -> usize {
        self.planets.len()
    }

    /// Returns true if the board has no planets.
    pub fn is_empty(&self) -> bool {
        self.planets.is_empty()
    }

    /// Formats the board as one line per planet.
    pub fn display(&self, name_of: impl Fn(PlayerId) -> String) -> String {
        self.planets
            .values()
            .map(|p| {
                let owner = p.owner.map(&name_of).unwrap_or_else(|| "-".to_string());
                let exhausted = if p.exhausted { " (exhausted)" } else { "" };
                format!(
                    "{}: {} x{} [output {}]{}",
                    p.name, owner, p.forces, p.base_output, exhausted
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
