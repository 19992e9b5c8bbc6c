//! Persisted decision requests and the prompts that carry them.

use std::collections::BTreeSet;

use derive_getters::Getters;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::EngineError;
use crate::choice::Choice;
use crate::event::EventId;
use crate::game::{Game, GameId, PlayerId};
use crate::presentation::{Button, PresentationSink};
use crate::provider::{ResolutionRequest, TriggerId};

/// Opaque id of a decision request; doubles as the button token.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[display("{}", _0)]
pub struct DecisionId(String);

impl DecisionId {
    /// Wraps a raw id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// What activating a request does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionPayload {
    /// Resolve one optional triggered effect.
    ActivateTrigger {
        /// Key of the provider that offered it.
        source: String,
        /// Owner of the ability.
        owner: PlayerId,
        /// Trigger consumed on activation.
        trigger_id: TriggerId,
        /// Work to execute.
        request: ResolutionRequest,
    },
    /// Decline every optional trigger offered to `owner`.
    PassTriggers {
        /// Passing player.
        owner: PlayerId,
        /// Triggers consumed by the pass.
        triggers: Vec<TriggerId>,
    },
    /// Click on a decision event's menu.
    Choice(Choice),
}

/// A durable, clickable option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct DecisionRequest {
    id: DecisionId,
    game_id: GameId,
    allowed_players: BTreeSet<PlayerId>,
    epoch: u64,
    event_id: EventId,
    label: String,
    payload: DecisionPayload,
}

impl DecisionRequest {
    pub(crate) fn new(
        game: &mut Game,
        allowed_players: BTreeSet<PlayerId>,
        epoch: u64,
        event_id: EventId,
        label: String,
        payload: DecisionPayload,
    ) -> Self {
        Self {
            id: game.mint_decision_id(),
            game_id: game.id().clone(),
            allowed_players,
            epoch,
            event_id,
            label,
            payload,
        }
    }

    /// Checks that `requester` may activate this request against `game` now.
    ///
    /// An empty allowed set admits any participant.
    ///
    /// # Errors
    ///
    /// Returns an input error for a foreign game, a non-participant or
    /// eliminated player, a player the request is not addressed to, or an
    /// expired epoch.
    #[instrument(skip(self, game), fields(decision_id = %self.id, game_id = %self.game_id))]
    pub fn validate(&self, game: &Game, requester: PlayerId) -> Result<(), EngineError> {
        if &self.game_id != game.id() {
            return Err(EngineError::input("That button belongs to another game"));
        }
        if !game.is_participant(requester) {
            return Err(EngineError::input("You are not playing in this game"));
        }
        if *game.player(requester)?.eliminated() {
            return Err(EngineError::input("You have been eliminated"));
        }
        if !self.allowed_players.is_empty() && !self.allowed_players.contains(&requester) {
            let names = self
                .allowed_players
                .iter()
                .map(|p| game.name_of(*p))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(EngineError::input(format!("This choice is for {}", names)));
        }
        if self.epoch != *game.epoch() {
            warn!(
                request_epoch = self.epoch,
                game_epoch = game.epoch(),
                "Stale decision request"
            );
            return Err(EngineError::input("That button has expired"));
        }
        Ok(())
    }
}

/// The requests offered at one suspension point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Prompt {
    game_id: GameId,
    epoch: u64,
    text: String,
    requests: Vec<DecisionRequest>,
}

impl Prompt {
    pub(crate) fn new(
        game_id: GameId,
        epoch: u64,
        text: String,
        requests: Vec<DecisionRequest>,
    ) -> Self {
        Self {
            game_id,
            epoch,
            text,
            requests,
        }
    }

    /// Button labels in display order.
    pub fn labels(&self) -> Vec<&str> {
        self.requests.iter().map(|r| r.label.as_str()).collect()
    }

    /// Finds the request behind a label.
    pub fn find(&self, label: &str) -> Option<&DecisionRequest> {
        self.requests.iter().find(|r| r.label == label)
    }

    /// Writes the prompt text and its buttons to a sink.
    pub fn render(&self, sink: &mut dyn PresentationSink) {
        sink.text(&self.text);
        let buttons: Vec<Button> = self
            .requests
            .iter()
            .map(|r| Button::new(r.label.clone(), r.id.clone()))
            .collect();
        sink.buttons(&buttons);
    }
}
