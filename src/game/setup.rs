//! Game setup from code or from a TOML scenario file.

use std::collections::BTreeSet;
use std::path::Path;

use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::ConfigError;
use crate::game::{
    Board, DEFAULT_CAPACITY, Game, GameId, Planet, Player, PlayerAbility, PlayerId, TurnAllowance,
};
use crate::provider::ProviderRegistry;

/// A seat described by a scenario.
#[derive(Debug, Clone, Serialize, Deserialize, Getters, new)]
pub struct PlayerSpec {
    name: String,
    #[serde(default)]
    abilities: Vec<String>,
}

/// A planet described by a scenario.
#[derive(Debug, Clone, Serialize, Deserialize, Getters, new)]
pub struct PlanetSpec {
    name: String,
    #[serde(default)]
    owner: Option<String>,
    #[serde(default)]
    forces: u32,
    #[serde(default)]
    output: u32,
    #[serde(default)]
    adjacent: Vec<String>,
}

/// Declarative description of a starting position.
#[derive(Debug, Clone, Serialize, Deserialize, Getters)]
pub struct Scenario {
    id: GameId,
    #[serde(default = "default_capacity")]
    capacity: u32,
    #[serde(default)]
    allowance: TurnAllowance,
    players: Vec<PlayerSpec>,
    planets: Vec<PlanetSpec>,
}

#[instrument]
fn default_capacity() -> u32 {
    DEFAULT_CAPACITY
}

impl Scenario {
    /// Loads a scenario from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading scenario from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read scenario file: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Parses a scenario from a TOML string.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let scenario: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse scenario: {}", e)))?;
        info!(
            scenario = %scenario.id,
            players = scenario.players.len(),
            planets = scenario.planets.len(),
            "Scenario parsed"
        );
        Ok(scenario)
    }

    /// Converts the scenario into a setup builder.
    pub fn into_setup(self) -> GameSetup {
        GameSetup {
            id: self.id,
            capacity: self.capacity,
            allowance: self.allowance,
            players: self.players,
            planets: self.planets,
        }
    }
}

/// Builder for a new [`Game`].
///
/// Player ids are assigned in the order players are added, starting at 1,
/// which is also the turn order.
#[derive(Debug, Clone)]
pub struct GameSetup {
    id: GameId,
    capacity: u32,
    allowance: TurnAllowance,
    players: Vec<PlayerSpec>,
    planets: Vec<PlanetSpec>,
}

impl GameSetup {
    /// Starts a setup with standard capacity and allowance.
    pub fn new(id: impl Into<GameId>) -> Self {
        Self {
            id: id.into(),
            capacity: DEFAULT_CAPACITY,
            allowance: TurnAllowance::default(),
            players: Vec::new(),
            planets: Vec::new(),
        }
    }

    /// Overrides the planet capacity.
    pub fn capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    /// Overrides the per-turn allowance.
    pub fn allowance(mut self, allowance: TurnAllowance) -> Self {
        self.allowance = allowance;
        self
    }

    /// Adds a player holding the given abilities, in grant order.
    pub fn player(mut self, name: &str, abilities: &[&str]) -> Self {
        self.players.push(PlayerSpec::new(
            name.to_string(),
            abilities.iter().map(|a| a.to_string()).collect(),
        ));
        self
    }

    /// Adds a planet.
    pub fn planet(
        mut self,
        name: &str,
        owner: Option<&str>,
        forces: u32,
        output: u32,
        adjacent: &[&str],
    ) -> Self {
        self.planets.push(PlanetSpec::new(
            name.to_string(),
            owner.map(str::to_string),
            forces,
            output,
            adjacent.iter().map(|a| a.to_string()).collect(),
        ));
        self
    }

    /// Validates the setup and builds the game.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for fewer than two players, duplicate names,
    /// unknown abilities or planets, unknown owners, or forces above capacity.
    #[instrument(skip(self, registry), fields(game_id = %self.id))]
    pub fn build(self, registry: &ProviderRegistry) -> Result<Game, ConfigError> {
        if self.players.len() < 2 {
            return Err(ConfigError::new("A game needs at least two players"));
        }
        if self.capacity == 0 {
            return Err(ConfigError::new("Capacity must be positive"));
        }

        let mut names = BTreeSet::new();
        let mut players = Vec::with_capacity(self.players.len());
        for (index, spec) in self.players.iter().enumerate() {
            if !names.insert(spec.name.to_lowercase()) {
                return Err(ConfigError::new(format!(
                    "Duplicate player name '{}'",
                    spec.name
                )));
            }
            let id = PlayerId(index as u32 + 1);
            let mut player = Player::new(id, spec.name.clone(), self.allowance);
            for key in &spec.abilities {
                if !registry.contains(key) {
                    return Err(ConfigError::new(format!(
                        "Unknown ability '{}' for player '{}'",
                        key, spec.name
                    )));
                }
                if player.has_ability(key) {
                    return Err(ConfigError::new(format!(
                        "Ability '{}' granted twice to '{}'",
                        key, spec.name
                    )));
                }
                player.abilities.push(PlayerAbility::new(key.clone()));
            }
            players.push(player);
        }

        let mut board = Board::new();
        for spec in &self.planets {
            if board.get(&spec.name).is_some() {
                return Err(ConfigError::new(format!(
                    "Duplicate planet '{}'",
                    spec.name
                )));
            }
            if spec.forces > self.capacity {
                return Err(ConfigError::new(format!(
                    "Planet '{}' starts with {} forces, above capacity {}",
                    spec.name, spec.forces, self.capacity
                )));
            }
            let mut planet = Planet::new(spec.name.clone(), spec.output);
            planet.forces = spec.forces;
            planet.owner = match &spec.owner {
                Some(owner) => Some(
                    players
                        .iter()
                        .find(|p| p.name.eq_ignore_ascii_case(owner))
                        .map(|p| p.id)
                        .ok_or_else(|| {
                            ConfigError::new(format!(
                                "Planet '{}' owned by unknown player '{}'",
                                spec.name, owner
                            ))
                        })?,
                ),
                None => None,
            };
            board.insert(planet);
        }
        for spec in &self.planets {
            for other in &spec.adjacent {
                board
                    .connect(&spec.name, other)
                    .map_err(|e| ConfigError::new(e.message))?;
            }
        }

        info!(
            players = players.len(),
            planets = board.len(),
            capacity = self.capacity,
            "Game built"
        );
        Ok(Game::new(
            self.id,
            players,
            board,
            self.capacity,
            self.allowance,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUEL: &str = r#"
id = "duel"

[[players]]
name = "Ada"
abilities = ["advance"]

[[players]]
name = "Brin"
abilities = ["advance", "fortress"]

[[planets]]
name = "Vega"
owner = "Ada"
forces = 3
output = 2
adjacent = ["Rigel"]

[[planets]]
name = "Rigel"
owner = "Brin"
forces = 2
output = 1
"#;

    #[test]
    fn test_scenario_builds_game() {
        let registry = ProviderRegistry::standard();
        let game = Scenario::from_toml(DUEL)
            .expect("Parse failed")
            .into_setup()
            .build(&registry)
            .expect("Build failed");
        assert_eq!(game.players().len(), 2);
        assert_eq!(*game.capacity(), DEFAULT_CAPACITY);
        assert!(game.board().are_adjacent("Rigel", "Vega"));
        assert_eq!(
            *game.board().planet("Rigel").expect("Missing planet").owner(),
            Some(PlayerId(2))
        );
    }

    #[test]
    fn test_unknown_ability_rejected() {
        let registry = ProviderRegistry::standard();
        let result = GameSetup::new("g")
            .player("Ada", &["teleport"])
            .player("Brin", &[])
            .build(&registry);
        assert!(result.is_err());
    }

    #[test]
    fn test_single_player_rejected() {
        let registry = ProviderRegistry::standard();
        let result = GameSetup::new("g").player("Ada", &[]).build(&registry);
        assert!(result.is_err());
    }

    #[test]
    fn test_forces_above_capacity_rejected() {
        let registry = ProviderRegistry::standard();
        let result = GameSetup::new("g")
            .player("Ada", &[])
            .player("Brin", &[])
            .planet("Vega", Some("Ada"), 7, 1, &[])
            .build(&registry);
        assert!(result.is_err());
    }
}
