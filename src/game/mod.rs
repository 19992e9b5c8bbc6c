//! Game state aggregate: players, board, event stack and turn state.

mod board;
mod player;
mod setup;
mod state;

pub use board::{Board, Planet, PlanetId};
pub use player::{ActionBudget, Player, PlayerAbility, PlayerId, TurnAllowance};
pub use setup::{GameSetup, PlanetSpec, PlayerSpec, Scenario};
pub use state::{DEFAULT_CAPACITY, Game, GameId, GameStatus};
