//! Effect providers: abilities that react to events.
//!
//! A provider inspects the top event through an [`EventContext`] and yields
//! [`TriggeredEffect`]s. Each effect carries a [`ResolutionRequest`], a
//! serializable command that is executed the same way whether the loop
//! auto-resolves it or a player clicks it later.

mod abilities;
mod registry;
mod request;

pub use abilities::{
    Colonists, Fortress, Industrious, MovementAbility, Plunder, Refinery, Sabotage, Vengeance,
};
pub use registry::ProviderRegistry;
pub use request::ResolutionRequest;

use derive_getters::Getters;
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::EngineError;
use crate::event::{EventId, EventTag, GameEvent};
use crate::game::{Game, PlayerAbility, PlayerId};
use crate::movement::MovementConfig;

/// Identifies one provider's reaction to one event occurrence.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[display("{}", _0)]
pub struct TriggerId(String);

impl TriggerId {
    /// Builds the id from provider key, owner, event and occurrence index.
    pub fn new(key: &str, owner: PlayerId, event: EventId, occurrence: u32) -> Self {
        Self(format!("{}:{}:{}:{}", key, owner, event, occurrence))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A candidate reaction offered by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct TriggeredEffect {
    source: String,
    owner: PlayerId,
    label: String,
    mandatory: bool,
    auto_resolve: bool,
    trigger_id: TriggerId,
    request: ResolutionRequest,
}

impl TriggeredEffect {
    /// An effect the loop resolves without asking anyone.
    pub fn automatic(
        ctx: &EventContext<'_>,
        occurrence: u32,
        label: impl Into<String>,
        request: ResolutionRequest,
    ) -> Self {
        Self::build(ctx, occurrence, label, request, true, true)
    }

    /// An effect the owner may decline.
    pub fn optional(
        ctx: &EventContext<'_>,
        occurrence: u32,
        label: impl Into<String>,
        request: ResolutionRequest,
    ) -> Self {
        Self::build(ctx, occurrence, label, request, false, false)
    }

    /// An effect the owner must click but cannot decline.
    pub fn forced(
        ctx: &EventContext<'_>,
        occurrence: u32,
        label: impl Into<String>,
        request: ResolutionRequest,
    ) -> Self {
        Self::build(ctx, occurrence, label, request, true, false)
    }

    fn build(
        ctx: &EventContext<'_>,
        occurrence: u32,
        label: impl Into<String>,
        request: ResolutionRequest,
        mandatory: bool,
        auto_resolve: bool,
    ) -> Self {
        Self {
            source: ctx.key.to_string(),
            owner: ctx.owner,
            label: label.into(),
            mandatory,
            auto_resolve,
            trigger_id: TriggerId::new(ctx.key, ctx.owner, *ctx.event.id(), occurrence),
            request,
        }
    }
}

/// Read-only view handed to a provider while it inspects an event.
#[derive(Debug, Clone, Copy)]
pub struct EventContext<'a> {
    /// Key of the provider being asked.
    pub key: &'a str,
    /// The event on top of the stack.
    pub event: &'a GameEvent,
    /// Player holding the ability.
    pub owner: PlayerId,
    /// The held ability, with its private counters.
    pub ability: &'a PlayerAbility,
    /// Current game state.
    pub game: &'a Game,
}

/// Contract implemented by every pluggable ability.
pub trait EffectProvider: std::fmt::Debug + Send + Sync {
    /// Unique key; abilities reference providers by it.
    fn key(&self) -> &'static str;

    /// Human-readable name shown on buttons and in logs.
    fn name(&self) -> &'static str {
        self.key()
    }

    /// Event kinds this provider wants to inspect.
    fn reacts_to(&self) -> &'static [EventTag] {
        &[]
    }

    /// Inspects an event. Must be pure: the loop may ask again after any
    /// state change and relies on getting the same answer for the same state.
    fn triggered_effects(&self, _ctx: &EventContext<'_>) -> Vec<TriggeredEffect> {
        Vec::new()
    }

    /// Executes a resolution request this provider issued.
    fn resolve(
        &self,
        owner: PlayerId,
        request: &ResolutionRequest,
        game: &mut Game,
    ) -> Result<(), EngineError> {
        request.apply(owner, game)
    }

    /// Movement configuration when the ability moves forces.
    fn movement(&self) -> Option<MovementConfig> {
        None
    }
}
