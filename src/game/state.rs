//! The game aggregate root.

use std::collections::BTreeSet;

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::EngineError;
use crate::decision::DecisionId;
use crate::event::{EventId, EventKind, EventStack, GameEvent};
use crate::game::{Board, Player, PlayerId, TurnAllowance};
use crate::provider::TriggerId;

/// Unique identifier for a game.
pub type GameId = String;

/// Capacity of a planet in the standard rules.
pub const DEFAULT_CAPACITY: u32 = 6;

/// Whether the game is still being played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GameStatus {
    /// Turns are being taken.
    InProgress,
    /// The game ended; `winner` is `None` if nobody survived.
    Finished {
        /// Last player standing.
        winner: Option<PlayerId>,
    },
}

/// Persisted root entity of a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Game {
    pub(crate) id: GameId,
    pub(crate) players: Vec<Player>,
    pub(crate) board: Board,
    pub(crate) stack: EventStack,
    pub(crate) turn_index: usize,
    pub(crate) round: u32,
    pub(crate) epoch: u64,
    pub(crate) status: GameStatus,
    pub(crate) capacity: u32,
    pub(crate) allowance: TurnAllowance,
    pub(crate) next_event_id: u64,
    pub(crate) next_request_seq: u64,
    pub(crate) consumed_triggers: BTreeSet<(EventId, TriggerId)>,
}

impl Game {
    pub(crate) fn new(
        id: GameId,
        players: Vec<Player>,
        board: Board,
        capacity: u32,
        allowance: TurnAllowance,
    ) -> Self {
        Self {
            id,
            players,
            board,
            stack: EventStack::new(),
            turn_index: 0,
            round: 1,
            epoch: 0,
            status: GameStatus::InProgress,
            capacity,
            allowance,
            next_event_id: 1,
            next_request_seq: 1,
            consumed_triggers: BTreeSet::new(),
        }
    }

    /// Returns true while turns are being taken.
    pub fn is_in_progress(&self) -> bool {
        self.status == GameStatus::InProgress
    }

    /// The player whose turn it is.
    pub fn current_player(&self) -> PlayerId {
        self.players[self.turn_index].id
    }

    /// Looks up a player.
    pub fn player(&self, id: PlayerId) -> Result<&Player, EngineError> {
        self.players
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| EngineError::invariant(format!("Unknown player {}", id)))
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player, EngineError> {
        self.players
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| EngineError::invariant(format!("Unknown player {}", id)))
    }

    /// Looks up a player by name, case-insensitively.
    pub fn player_by_name(&self, name: &str) -> Option<&Player> {
        self.players
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Returns true if `id` is seated in this game.
    pub fn is_participant(&self, id: PlayerId) -> bool {
        self.players.iter().any(|p| p.id == id)
    }

    /// Display name of a player, or its id if unknown.
    pub fn name_of(&self, id: PlayerId) -> String {
        self.player(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|_| format!("player {}", id))
    }

    /// Players in trigger resolution order: the current-turn player first,
    /// then the others in turn order, wrapping around.
    pub fn resolution_order(&self) -> Vec<PlayerId> {
        let count = self.players.len();
        (0..count)
            .map(|offset| self.players[(self.turn_index + offset) % count].id)
            .collect()
    }

    /// Players still in the game.
    pub fn active_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| !p.eliminated)
    }

    /// Pushes a new event on top of the stack and returns its id.
    #[instrument(skip(self, kind), fields(game_id = %self.id, tag = %kind.tag()))]
    pub(crate) fn push_event(&mut self, kind: EventKind) -> EventId {
        let id = EventId(self.next_event_id);
        self.next_event_id += 1;
        debug!(event_id = %id, depth = self.stack.len() + 1, "Pushing event");
        self.stack.push(GameEvent::new(id, kind));
        id
    }

    pub(crate) fn stack_mut(&mut self) -> &mut EventStack {
        &mut self.stack
    }

    pub(crate) fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    /// Returns true if the trigger was already consumed for the event.
    pub fn is_consumed(&self, event: EventId, trigger: &TriggerId) -> bool {
        self.consumed_triggers.contains(&(event, trigger.clone()))
    }

    pub(crate) fn consume_trigger(&mut self, event: EventId, trigger: TriggerId) -> bool {
        self.consumed_triggers.insert((event, trigger))
    }

    /// Drops consumed-trigger bookkeeping for a resolved event.
    pub(crate) fn forget_triggers(&mut self, event: EventId) {
        self.consumed_triggers.retain(|(e, _)| *e != event);
    }

    /// Raises the interaction epoch for a fresh prompt and returns it.
    pub(crate) fn open_prompt(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    /// Mints a decision id unique across games.
    pub(crate) fn mint_decision_id(&mut self) -> DecisionId {
        let id = DecisionId::new(format!("{}-{}", self.id, self.next_request_seq));
        self.next_request_seq += 1;
        id
    }

    /// Ends the current turn and starts the next active player's turn.
    #[instrument(skip(self), fields(game_id = %self.id))]
    pub(crate) fn advance_turn(&mut self) -> Result<PlayerId, EngineError> {
        let previous = self.current_player();
        let count = self.players.len();
        let next_index = (1..=count)
            .map(|offset| (self.turn_index + offset) % count)
            .find(|&index| !self.players[index].eliminated)
            .ok_or_else(|| EngineError::invariant("No active player left to take a turn"))?;
        if next_index <= self.turn_index {
            self.round += 1;
        }
        self.turn_index = next_index;

        let allowance = self.allowance;
        let next = self.players[next_index].id;
        self.player_mut(next)?.start_turn(allowance);
        for planet in self.board.planets_mut() {
            if planet.owner == Some(next) {
                planet.exhausted = false;
            }
        }
        info!(previous = %previous, next = %next, round = self.round, "Turn advanced");
        Ok(next)
    }

    /// Eliminates every active player with no forces left.
    ///
    /// Returns the newly eliminated players in turn order and finishes the
    /// game when at most one player remains.
    #[instrument(skip(self), fields(game_id = %self.id))]
    pub(crate) fn check_elimination(&mut self) -> Vec<PlayerId> {
        let doomed: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|p| !p.eliminated && self.board.total_forces(p.id) == 0)
            .map(|p| p.id)
            .collect();

        for player in self.players.iter_mut() {
            if doomed.contains(&player.id) {
                player.eliminated = true;
                info!(player = %player.id, name = %player.name, "Player eliminated");
            }
        }

        if self.is_in_progress() {
            let survivors: Vec<PlayerId> = self.active_players().map(|p| p.id).collect();
            match survivors.as_slice() {
                [] => {
                    info!("No players remain, game ends without a winner");
                    self.status = GameStatus::Finished { winner: None };
                }
                [winner] => {
                    info!(winner = %winner, "Game won");
                    self.status = GameStatus::Finished {
                        winner: Some(*winner),
                    };
                }
                _ => {}
            }
        }

        doomed
    }
}
