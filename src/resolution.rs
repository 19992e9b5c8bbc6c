//! The stack-driven trigger loop.
//!
//! [`Resolver::continue_resolving`] drains the stack until it is empty or a
//! player has to click something. Each step looks at the top event only:
//!
//! 1. automatic effects resolve one at a time, in resolution order;
//! 2. remaining optional effects are offered as buttons and the loop suspends;
//! 3. a decision event with no reactions left shows its menu and suspends;
//! 4. anything else is popped and its terminal handler runs.

use std::collections::BTreeSet;

use tracing::{debug, error, info, instrument, warn};

use crate::EngineError;
use crate::choice::{handle_choice, show_choices};
use crate::config::{EngineConfig, OptionalTriggerPolicy};
use crate::decision::{DecisionPayload, DecisionRequest, Prompt};
use crate::event::{EventKind, GameEvent};
use crate::game::{Game, PlayerId};
use crate::movement::execute_movement;
use crate::production::finish_production;
use crate::provider::{ProviderRegistry, TriggeredEffect};

/// How a drain ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The stack is empty.
    Drained,
    /// Waiting on a player.
    Suspended(Prompt),
}

/// Everything a drain produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionReport {
    /// Human-readable record of what resolved, in order.
    pub journal: Vec<String>,
    /// How the drain ended.
    pub outcome: Resolution,
    /// Steps taken.
    pub steps: usize,
}

impl ResolutionReport {
    /// The pending prompt, if the drain suspended.
    pub fn prompt(&self) -> Option<&Prompt> {
        match &self.outcome {
            Resolution::Drained => None,
            Resolution::Suspended(prompt) => Some(prompt),
        }
    }
}

enum Step {
    Progress,
    Drained,
    Suspended(Prompt),
}

/// Runs the trigger loop against a registry.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'r> {
    registry: &'r ProviderRegistry,
    policy: OptionalTriggerPolicy,
    max_steps: usize,
}

impl<'r> Resolver<'r> {
    /// Creates a resolver with the configured policy and step bound.
    pub fn new(registry: &'r ProviderRegistry, config: &EngineConfig) -> Self {
        Self {
            registry,
            policy: *config.optional_triggers(),
            max_steps: *config.max_resolution_steps(),
        }
    }

    /// Resolves until the stack drains or a player must act.
    ///
    /// # Errors
    ///
    /// Returns an invariant error if a handler breaks a contract or the drain
    /// exceeds the configured step bound.
    #[instrument(skip(self, game), fields(game_id = %game.id(), depth = game.stack().len()))]
    pub fn continue_resolving(&self, game: &mut Game) -> Result<ResolutionReport, EngineError> {
        let mut journal = Vec::new();
        let mut steps = 0;
        loop {
            if steps >= self.max_steps {
                error!(
                    steps,
                    top = ?game.stack().top().map(|e| e.tag()),
                    "Resolution exceeded step bound"
                );
                return Err(EngineError::invariant(format!(
                    "Resolution did not settle within {} steps",
                    self.max_steps
                )));
            }
            steps += 1;
            match self.step(game, &mut journal)? {
                Step::Progress => continue,
                Step::Drained => {
                    debug!(steps, "Stack drained");
                    return Ok(ResolutionReport {
                        journal,
                        outcome: Resolution::Drained,
                        steps,
                    });
                }
                Step::Suspended(prompt) => {
                    info!(
                        steps,
                        epoch = prompt.epoch(),
                        buttons = prompt.requests().len(),
                        "Resolution suspended"
                    );
                    return Ok(ResolutionReport {
                        journal,
                        outcome: Resolution::Suspended(prompt),
                        steps,
                    });
                }
            }
        }
    }

    fn step(&self, game: &mut Game, journal: &mut Vec<String>) -> Result<Step, EngineError> {
        let Some(top) = game.stack().top().cloned() else {
            return Ok(Step::Drained);
        };

        if top.kind().is_decision() && !game.is_in_progress() {
            game.stack_mut().pop();
            game.forget_triggers(*top.id());
            debug!(event_id = %top.id(), "Discarding decision in a finished game");
            return Ok(Step::Progress);
        }

        let effects = self.registry.collect(game, &top);
        if let Some(effect) = effects.iter().find(|e| *e.auto_resolve()) {
            self.resolve_effect(game, &top, effect)?;
            journal.push(effect.label().clone());
            return Ok(Step::Progress);
        }

        if !effects.is_empty() {
            return Ok(Step::Suspended(self.offer_triggers(game, &top, effects)));
        }

        if top.kind().is_decision() {
            return Ok(Step::Suspended(offer_menu(game, &top)?));
        }

        let event = game
            .stack_mut()
            .pop()
            .ok_or_else(|| EngineError::invariant("Stack emptied underneath the loop"))?;
        self.finish(game, &event, journal)?;
        game.forget_triggers(*event.id());
        Ok(Step::Progress)
    }

    #[instrument(skip(self, game, event, effect), fields(event_id = %event.id(), trigger_id = %effect.trigger_id()))]
    fn resolve_effect(
        &self,
        game: &mut Game,
        event: &GameEvent,
        effect: &TriggeredEffect,
    ) -> Result<(), EngineError> {
        let provider = self.registry.get(effect.source()).ok_or_else(|| {
            EngineError::invariant(format!("Unknown provider '{}'", effect.source()))
        })?;
        game.consume_trigger(*event.id(), effect.trigger_id().clone());
        provider.resolve(*effect.owner(), effect.request(), game)?;
        debug!(label = %effect.label(), "Automatic effect resolved");
        Ok(())
    }

    fn offer_triggers(
        &self,
        game: &mut Game,
        event: &GameEvent,
        mut effects: Vec<TriggeredEffect>,
    ) -> Prompt {
        if self.policy == OptionalTriggerPolicy::OneAtATime {
            effects.truncate(1);
        }
        let epoch = game.open_prompt();
        let mut requests = Vec::new();
        let mut owners: Vec<PlayerId> = Vec::new();
        for effect in &effects {
            if !owners.contains(effect.owner()) {
                owners.push(*effect.owner());
            }
            requests.push(DecisionRequest::new(
                game,
                BTreeSet::from([*effect.owner()]),
                epoch,
                *event.id(),
                effect.label().clone(),
                DecisionPayload::ActivateTrigger {
                    source: effect.source().clone(),
                    owner: *effect.owner(),
                    trigger_id: effect.trigger_id().clone(),
                    request: effect.request().clone(),
                },
            ));
        }
        for owner in owners {
            let offered: Vec<&TriggeredEffect> =
                effects.iter().filter(|e| *e.owner() == owner).collect();
            if offered.iter().any(|e| *e.mandatory()) {
                continue;
            }
            let label = format!("Pass ({})", game.name_of(owner));
            requests.push(DecisionRequest::new(
                game,
                BTreeSet::from([owner]),
                epoch,
                *event.id(),
                label,
                DecisionPayload::PassTriggers {
                    owner,
                    triggers: offered.iter().map(|e| e.trigger_id().clone()).collect(),
                },
            ));
        }
        Prompt::new(
            game.id().clone(),
            epoch,
            trigger_text(game, event),
            requests,
        )
    }

    /// Applies an activated request. Does not validate it.
    ///
    /// # Errors
    ///
    /// Returns an input error if the trigger was already consumed and an
    /// invariant error if the request's event is not on top of the stack.
    #[instrument(skip(self, game, request, journal), fields(game_id = %game.id(), decision_id = %request.id()))]
    pub fn apply_decision(
        &self,
        game: &mut Game,
        request: &DecisionRequest,
        journal: &mut Vec<String>,
    ) -> Result<(), EngineError> {
        let top_id = game.stack().top().map(|e| *e.id());
        if top_id != Some(*request.event_id()) {
            return Err(EngineError::invariant(format!(
                "Decision {} targets {} but the top of the stack is {:?}",
                request.id(),
                request.event_id(),
                top_id
            )));
        }
        let event_id = *request.event_id();
        // Siblings of the clicked button expire with it.
        game.open_prompt();

        match request.payload() {
            DecisionPayload::ActivateTrigger {
                source,
                owner,
                trigger_id,
                request: work,
            } => {
                if game.is_consumed(event_id, trigger_id) {
                    return Err(EngineError::input("That reaction was already used"));
                }
                let provider = self.registry.get(source).ok_or_else(|| {
                    EngineError::invariant(format!("Unknown provider '{}'", source))
                })?;
                game.consume_trigger(event_id, trigger_id.clone());
                provider.resolve(*owner, work, game)?;
                journal.push(request.label().clone());
            }
            DecisionPayload::PassTriggers { owner, triggers } => {
                for trigger in triggers {
                    game.consume_trigger(event_id, trigger.clone());
                }
                journal.push(format!("{} passes", game.name_of(*owner)));
            }
            DecisionPayload::Choice(choice) => {
                let kind = game
                    .stack()
                    .top()
                    .map(|e| e.kind().clone())
                    .ok_or_else(|| EngineError::invariant("Decision event vanished"))?;
                let outcome = handle_choice(&kind, choice, game)?;
                if outcome.complete {
                    game.stack_mut().pop();
                    game.forget_triggers(event_id);
                } else if let Some(updated) = outcome.updated {
                    let open = game.stack_mut().find_mut(event_id).ok_or_else(|| {
                        EngineError::invariant(format!("Event {} is no longer open", event_id))
                    })?;
                    *open.kind_mut() = updated;
                }
                for follow_up in outcome.follow_ups {
                    game.push_event(follow_up);
                }
                journal.extend(outcome.journal);
            }
        }
        Ok(())
    }

    /// Validates, applies and then keeps resolving a clicked request.
    ///
    /// # Errors
    ///
    /// Returns an input error if `requester` may not click the request now.
    #[instrument(skip(self, game, request), fields(game_id = %game.id(), decision_id = %request.id(), requester = %requester))]
    pub fn activate(
        &self,
        game: &mut Game,
        request: &DecisionRequest,
        requester: PlayerId,
    ) -> Result<ResolutionReport, EngineError> {
        request.validate(game, requester)?;
        let mut journal = Vec::new();
        self.apply_decision(game, request, &mut journal)?;
        let mut report = self.continue_resolving(game)?;
        journal.append(&mut report.journal);
        report.journal = journal;
        Ok(report)
    }

    #[instrument(skip(self, game, event, journal), fields(event_id = %event.id(), tag = %event.tag()))]
    fn finish(
        &self,
        game: &mut Game,
        event: &GameEvent,
        journal: &mut Vec<String>,
    ) -> Result<(), EngineError> {
        match event.kind() {
            EventKind::Movement(movement) => {
                let (report, capture) = execute_movement(game, movement)?;
                let eliminated = game.check_elimination();
                let current = game.current_player();
                if game.is_in_progress() && eliminated.contains(&current) {
                    // Sits below the movement results so the turn ends once they settle.
                    info!(player = %current, "Current player eliminated, ending their turn");
                    game.push_event(EventKind::EndTurn { player: current });
                }
                game.push_event(EventKind::MovementComplete(report));
                for player in eliminated {
                    game.push_event(EventKind::PlayerEliminated { player });
                }
                if let Some(capture) = capture {
                    game.push_event(EventKind::Capture(capture));
                }
            }
            EventKind::BeginProduction(production) => {
                let report = finish_production(game, production)?;
                game.push_event(EventKind::PostProduction(report));
            }
            EventKind::EndTurn { player } => {
                journal.push(event.kind().describe(game));
                if game.is_in_progress() {
                    let next = game.advance_turn()?;
                    journal.push(format!(
                        "Round {}: it is now {}'s turn",
                        game.round(),
                        game.name_of(next)
                    ));
                } else {
                    warn!(player = %player, "Turn ended after the game finished");
                }
            }
            EventKind::MovementComplete(_)
            | EventKind::Capture(_)
            | EventKind::PostProduction(_)
            | EventKind::PlayerEliminated { .. } => {
                journal.push(event.kind().describe(game));
            }
            EventKind::ProductionChoice(_) | EventKind::MovementPlanning(_) => {
                return Err(EngineError::invariant(format!(
                    "Decision event {} reached a terminal handler",
                    event.id()
                )));
            }
        }
        Ok(())
    }
}

fn trigger_text(game: &Game, event: &GameEvent) -> String {
    format!("Reactions to: {}", event.kind().describe(game))
}

fn offer_menu(game: &mut Game, event: &GameEvent) -> Result<Prompt, EngineError> {
    let menu = show_choices(event.kind(), game)?;
    let epoch = game.open_prompt();
    let requests = menu
        .options
        .into_iter()
        .map(|option| {
            DecisionRequest::new(
                game,
                BTreeSet::from([menu.chooser]),
                epoch,
                *event.id(),
                option.label,
                DecisionPayload::Choice(option.choice),
            )
        })
        .collect();
    Ok(Prompt::new(game.id().clone(), epoch, menu.text, requests))
}

/// Text describing what the game is waiting on, rebuilt from state alone.
///
/// Returns `None` when the stack is empty.
pub fn pending_text(game: &Game) -> Option<String> {
    let top = game.stack().top()?;
    if top.kind().is_decision() {
        if let Ok(menu) = show_choices(top.kind(), game) {
            return Some(menu.text);
        }
    }
    Some(trigger_text(game, top))
}
