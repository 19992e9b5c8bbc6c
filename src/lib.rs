//! Orbital Conquest - event resolution engine for an asynchronous,
//! button-driven, turn-based strategy game.
//!
//! Every game action becomes an event on a per-game stack. Abilities held by
//! players react to the top event through effect providers; reactions either
//! resolve automatically or become durable buttons that any process can pick
//! up later.
//!
//! # Architecture
//!
//! - **Game**: board, players, turn state and the event stack
//! - **Provider**: pluggable abilities and their resolution requests
//! - **Resolution**: the trigger loop that drains or suspends the stack
//! - **Movement / Production**: decision wizards and their arithmetic
//! - **Session**: per-game guard, cache and commit discipline
//! - **Store**: SQLite or in-memory persistence
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use orbital_conquest::{
//!     Command, EngineConfig, GameSetup, MemoryGameStore, PlayerId, ProviderRegistry,
//!     SessionManager,
//! };
//!
//! # fn example() -> Result<(), orbital_conquest::EngineError> {
//! let manager = SessionManager::new(
//!     Arc::new(MemoryGameStore::new()),
//!     Arc::new(ProviderRegistry::standard()),
//!     EngineConfig::default(),
//! );
//! let game = manager.create_game(
//!     GameSetup::new("duel")
//!         .player("Ada", &["advance"])
//!         .player("Brin", &["advance"])
//!         .planet("Terra", Some("Ada"), 3, 1, &["Luna"])
//!         .planet("Luna", Some("Brin"), 2, 1, &[]),
//! )?;
//! let outcome = manager.execute(game.id(), PlayerId(1), &Command::Produce)?;
//! assert!(outcome.prompt.is_some());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod choice;
mod command;
mod config;
mod decision;
mod error;
mod event;
mod game;
mod movement;
mod nudge;
mod presentation;
mod production;
mod provider;
mod resolution;
mod session;
mod store;

// Crate-level exports - Errors and configuration
pub use config::{ConfigError, EngineConfig, OptionalTriggerPolicy};
pub use error::{EngineError, ErrorKind};

// Crate-level exports - Game state
pub use game::{
    ActionBudget, Board, DEFAULT_CAPACITY, Game, GameId, GameSetup, GameStatus, Planet,
    PlanetId, PlanetSpec, Player, PlayerAbility, PlayerId, PlayerSpec, Scenario, TurnAllowance,
};

// Crate-level exports - Events
pub use event::{
    CaptureEvent, CombatSide, EventId, EventKind, EventStack, EventTag, GameEvent,
    MovementEvent, MovementReport, ProductionChoiceEvent, ProductionEvent, ProductionOutput,
    ProductionReport, SourceAmount, StrengthBonus,
};

// Crate-level exports - Providers
pub use provider::{
    Colonists, EffectProvider, EventContext, Fortress, Industrious, MovementAbility, Plunder,
    ProviderRegistry, Refinery, ResolutionRequest, Sabotage, TriggerId, TriggeredEffect,
    Vengeance,
};

// Crate-level exports - Movement and production
pub use movement::{
    Bookkeeping, DestinationRestriction, Engagement, EngagementOutcome, MovementChoice,
    MovementConfig, MovementPlan, PlanStage, PlanStep, project, resolve_engagement,
};
pub use production::{begin_production, production_candidates};

// Crate-level exports - Decisions and resolution
pub use choice::{Choice, ChoiceOutcome, Menu, MenuOption, handle_choice, show_choices};
pub use command::Command;
pub use decision::{DecisionId, DecisionPayload, DecisionRequest, Prompt};
pub use resolution::{Resolution, ResolutionReport, Resolver, pending_text};

// Crate-level exports - Sessions, persistence and output
pub use nudge::NudgeScheduler;
pub use presentation::{Button, Message, MessageBuilder, MessageLimits, PresentationSink, render_plain};
pub use session::{GameCache, GameGuard, GuardTicket, SessionManager, SessionOutcome};
pub use store::{DbError, GameStore, MemoryGameStore, SqliteGameStore, StoredGame};
