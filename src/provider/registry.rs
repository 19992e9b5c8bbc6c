//! Explicitly constructed registry of effect providers.

use std::collections::HashMap;

use tracing::{debug, info, instrument, trace};

use crate::EngineError;
use crate::event::{EventTag, GameEvent};
use crate::game::Game;
use crate::movement::MovementConfig;
use crate::provider::abilities::{
    Colonists, Fortress, Industrious, MovementAbility, Plunder, Refinery, Sabotage, Vengeance,
};
use crate::provider::{EffectProvider, EventContext, TriggeredEffect};

/// Maps ability keys and event tags to providers.
///
/// Built once at startup and shared read-only by every session.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: Vec<Box<dyn EffectProvider>>,
    by_key: HashMap<&'static str, usize>,
    by_tag: HashMap<EventTag, Vec<usize>>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in ability.
    #[instrument]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        let providers: Vec<Box<dyn EffectProvider>> = vec![
            Box::new(MovementAbility::advance()),
            Box::new(MovementAbility::muster()),
            Box::new(MovementAbility::evacuate()),
            Box::new(MovementAbility::raid()),
            Box::new(Industrious),
            Box::new(Sabotage),
            Box::new(Refinery),
            Box::new(Fortress),
            Box::new(Colonists),
            Box::new(Plunder),
            Box::new(Vengeance),
        ];
        for provider in providers {
            registry.insert(provider);
        }
        info!(count = registry.len(), "Standard provider registry built");
        registry
    }

    /// Adds a provider.
    ///
    /// # Errors
    ///
    /// Returns a config error if a provider with the same key exists.
    #[instrument(skip(self, provider), fields(key = provider.key()))]
    pub fn register(&mut self, provider: Box<dyn EffectProvider>) -> Result<(), EngineError> {
        let key = provider.key();
        if self.by_key.contains_key(key) {
            return Err(EngineError::new(
                crate::ErrorKind::Config,
                format!("Provider '{}' registered twice", key),
            ));
        }
        self.insert(provider);
        Ok(())
    }

    /// Indexes a provider whose key is known to be new.
    fn insert(&mut self, provider: Box<dyn EffectProvider>) {
        let index = self.providers.len();
        for tag in provider.reacts_to() {
            self.by_tag.entry(*tag).or_default().push(index);
        }
        self.by_key.insert(provider.key(), index);
        self.providers.push(provider);
        debug!(index, "Provider registered");
    }

    /// Returns true if a provider with this key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    /// Looks up a provider by key.
    pub fn get(&self, key: &str) -> Option<&dyn EffectProvider> {
        self.by_key.get(key).map(|&i| self.providers[i].as_ref())
    }

    /// Movement configuration for a movement ability.
    pub fn movement_config(&self, key: &str) -> Option<MovementConfig> {
        self.get(key).and_then(|p| p.movement())
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns true when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Asks every active provider to inspect `event`.
    ///
    /// Effects come back in resolution order: players by
    /// [`Game::resolution_order`], each player's abilities in grant order, and
    /// each provider's effects in the order it returned them. Eliminated
    /// players' abilities are inactive; consumed triggers are dropped.
    #[instrument(skip(self, game, event), fields(game_id = %game.id(), event_id = %event.id()))]
    pub fn collect(&self, game: &Game, event: &GameEvent) -> Vec<TriggeredEffect> {
        let interested = match self.by_tag.get(&event.tag()) {
            Some(indices) => indices,
            None => return Vec::new(),
        };

        let mut effects = Vec::new();
        for player_id in game.resolution_order() {
            let Ok(player) = game.player(player_id) else {
                continue;
            };
            if *player.eliminated() {
                continue;
            }
            for ability in player.abilities() {
                let Some(&index) = self.by_key.get(ability.key().as_str()) else {
                    continue;
                };
                if !interested.contains(&index) {
                    continue;
                }
                let provider = &self.providers[index];
                let ctx = EventContext {
                    key: provider.key(),
                    event,
                    owner: player_id,
                    ability,
                    game,
                };
                for effect in provider.triggered_effects(&ctx) {
                    if game.is_consumed(*event.id(), effect.trigger_id()) {
                        trace!(trigger_id = %effect.trigger_id(), "Skipping consumed trigger");
                        continue;
                    }
                    effects.push(effect);
                }
            }
        }
        debug!(count = effects.len(), "Collected triggered effects");
        effects
    }
}
