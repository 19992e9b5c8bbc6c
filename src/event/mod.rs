//! Game events and the event stack.
//!
//! Every event is a closed variant of [`EventKind`]. Accumulator events
//! (movement, begin-production) carry fields providers adjust before the
//! event resolves; decision events (production choice, movement planning)
//! carry enough state to rebuild their menu after a restart.

mod payload;
mod stack;

pub use payload::{
    CaptureEvent, CombatSide, MovementEvent, MovementReport, ProductionChoiceEvent,
    ProductionEvent, ProductionOutput, ProductionReport, SourceAmount, StrengthBonus,
};
pub use stack::EventStack;

use derive_getters::Getters;
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::game::{Game, PlayerId};
use crate::movement::MovementPlan;

/// Stable id of an event occurrence, never reused within a game.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[display("e{}", _0)]
pub struct EventId(pub u64);

/// Variant payload of a game event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, strum::EnumDiscriminants)]
#[strum_discriminants(name(EventTag))]
#[strum_discriminants(derive(Hash, PartialOrd, Ord, strum::Display))]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// Forces are about to move; providers may add strength or redirect excess.
    Movement(MovementEvent),
    /// A movement finished resolving.
    MovementComplete(MovementReport),
    /// A planet changed hands from one player to another.
    Capture(CaptureEvent),
    /// A planet is about to produce; providers may adjust the output.
    BeginProduction(ProductionEvent),
    /// A planet finished producing.
    PostProduction(ProductionReport),
    /// A player lost their last forces.
    PlayerEliminated {
        /// The eliminated player.
        player: PlayerId,
    },
    /// A player is choosing where to produce.
    ProductionChoice(ProductionChoiceEvent),
    /// A player is planning a movement.
    MovementPlanning(MovementPlan),
    /// The current player ended their turn.
    EndTurn {
        /// The player whose turn ends.
        player: PlayerId,
    },
}

impl EventKind {
    /// Returns the discriminant used to route the event to providers.
    pub fn tag(&self) -> EventTag {
        EventTag::from(self)
    }

    /// Returns true for events whose purpose is obtaining a player choice.
    pub fn is_decision(&self) -> bool {
        matches!(
            self,
            EventKind::ProductionChoice(_) | EventKind::MovementPlanning(_)
        )
    }

    /// The player the event is about, when there is one.
    pub fn acting_player(&self) -> Option<PlayerId> {
        match self {
            EventKind::Movement(m) => Some(m.mover),
            EventKind::MovementComplete(r) => Some(r.mover),
            EventKind::Capture(c) => Some(c.mover),
            EventKind::BeginProduction(p) => Some(p.player),
            EventKind::PostProduction(r) => Some(r.player),
            EventKind::PlayerEliminated { player } => Some(*player),
            EventKind::ProductionChoice(c) => Some(c.player),
            EventKind::MovementPlanning(plan) => Some(*plan.player()),
            EventKind::EndTurn { player } => Some(*player),
        }
    }

    /// One-line description for prompts and the journal.
    pub fn describe(&self, game: &Game) -> String {
        match self {
            EventKind::Movement(m) => format!(
                "{} moving {} forces to {}",
                game.name_of(m.mover),
                m.total_moving(),
                m.destination
            ),
            EventKind::MovementComplete(r) => {
                let holder = r
                    .resulting_owner
                    .map(|p| game.name_of(p))
                    .unwrap_or_else(|| "nobody".to_string());
                let mut text = format!(
                    "{} moved {} forces to {}; {} now holds it with {}",
                    game.name_of(r.mover),
                    r.moved,
                    r.destination,
                    holder,
                    r.resulting_forces
                );
                if r.destroyed_excess > 0 {
                    text.push_str(&format!(" ({} lost to capacity)", r.destroyed_excess));
                }
                text
            }
            EventKind::Capture(c) => format!(
                "{} captured {} from {}",
                game.name_of(c.mover),
                c.planet,
                game.name_of(c.previous_owner)
            ),
            EventKind::BeginProduction(p) => format!(
                "{} producing on {} ({} forces, {} credits)",
                game.name_of(p.player),
                p.planet,
                p.output.forces,
                p.output.credits
            ),
            EventKind::PostProduction(r) => {
                let mut text = format!(
                    "{} produced {} forces on {}",
                    game.name_of(r.player),
                    r.produced,
                    r.planet
                );
                if r.credits > 0 {
                    text.push_str(&format!(" and {} credits", r.credits));
                }
                if r.destroyed > 0 {
                    text.push_str(&format!(" ({} lost to capacity)", r.destroyed));
                }
                text
            }
            EventKind::PlayerEliminated { player } => {
                format!("{} has been eliminated", game.name_of(*player))
            }
            EventKind::ProductionChoice(c) => {
                format!("{} choosing where to produce", game.name_of(c.player))
            }
            EventKind::MovementPlanning(plan) => format!(
                "{} planning a move with {}",
                game.name_of(*plan.player()),
                plan.ability()
            ),
            EventKind::EndTurn { player } => format!("{} ends their turn", game.name_of(*player)),
        }
    }
}

/// An event occurrence on the stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct GameEvent {
    id: EventId,
    kind: EventKind,
}

impl GameEvent {
    pub(crate) fn new(id: EventId, kind: EventKind) -> Self {
        Self { id, kind }
    }

    pub(crate) fn kind_mut(&mut self) -> &mut EventKind {
        &mut self.kind
    }

    /// Shorthand for the routing tag.
    pub fn tag(&self) -> EventTag {
        self.kind.tag()
    }
}
