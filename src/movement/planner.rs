//! The movement planning wizard.
//!
//! A [`MovementPlan`] lives inside a decision event, so every field here is
//! persisted and the menu for any stage can be rebuilt from the plan and the
//! board alone.
//!
//! Stages run `ChooseDestination -> ChooseSources -> ChooseAmount -> Confirm`.
//! A stage with a single legal option is taken automatically, and
//! `move_all` fixes every amount.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::EngineError;
use crate::event::{MovementEvent, SourceAmount};
use crate::game::{Game, Planet, PlanetId, PlayerId};
use crate::movement::{Bookkeeping, DestinationRestriction, MovementConfig};

/// Current step of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStage {
    /// Picking where forces go.
    ChooseDestination,
    /// Picking where forces come from.
    ChooseSources,
    /// Picking how many forces leave the next source.
    ChooseAmount,
    /// Waiting for confirmation.
    Confirm,
}

/// One click in the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementChoice {
    /// Choose the destination.
    Destination(PlanetId),
    /// Add a source.
    Source(PlanetId),
    /// Stop adding sources.
    SourcesDone,
    /// Set the amount for a source.
    Amount {
        /// Source planet.
        source: PlanetId,
        /// Forces moving.
        amount: u32,
    },
    /// Execute the plan.
    Confirm,
    /// Abandon the plan.
    Cancel,
}

/// What a click did to the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStep {
    /// The wizard needs another click.
    Continue,
    /// The player abandoned the plan.
    Cancelled,
    /// The plan is final; the movement event is ready to push.
    Confirmed(MovementEvent),
}

/// Persisted state of one movement wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct MovementPlan {
    player: PlayerId,
    ability: String,
    config: MovementConfig,
    stage: PlanStage,
    destination: Option<PlanetId>,
    sources: Vec<PlanetId>,
    amounts: Vec<SourceAmount>,
}

impl MovementPlan {
    /// Starts a plan at the destination step.
    pub fn new(player: PlayerId, ability: impl Into<String>, config: MovementConfig) -> Self {
        Self {
            player,
            ability: ability.into(),
            config,
            stage: PlanStage::ChooseDestination,
            destination: None,
            sources: Vec::new(),
            amounts: Vec::new(),
        }
    }

    fn allows_destination(&self, planet: &Planet) -> bool {
        match self.config.restriction() {
            DestinationRestriction::Unrestricted => true,
            DestinationRestriction::CannotAttack => {
                planet.owner().is_none() || planet.is_owned_by(self.player)
            }
            DestinationRestriction::MustControl => planet.is_owned_by(self.player),
        }
    }

    fn is_source_for(&self, planet: &Planet, destination: &Planet) -> bool {
        planet.is_owned_by(self.player)
            && *planet.forces() > 0
            && planet.name() != destination.name()
            && (!*self.config.require_adjacent() || planet.is_adjacent_to(destination.name()))
            && !(self.config.exhausts_sources() && *planet.exhausted())
    }

    /// Destinations with at least one legal source, in name order.
    pub fn destination_options(&self, game: &Game) -> Vec<PlanetId> {
        game.board()
            .planets()
            .filter(|dest| self.allows_destination(dest))
            .filter(|dest| {
                game.board()
                    .planets()
                    .any(|source| self.is_source_for(source, dest))
            })
            .map(|dest| dest.name().clone())
            .collect()
    }

    /// Legal sources not yet selected, in name order.
    pub fn source_options(&self, game: &Game) -> Result<Vec<PlanetId>, EngineError> {
        let destination = self.destination_planet(game)?;
        Ok(game
            .board()
            .planets()
            .filter(|source| self.is_source_for(source, destination))
            .filter(|source| !self.sources.contains(source.name()))
            .map(|source| source.name().clone())
            .collect())
    }

    fn destination_planet<'g>(&self, game: &'g Game) -> Result<&'g Planet, EngineError> {
        let name = self
            .destination
            .as_ref()
            .ok_or_else(|| EngineError::invariant("Movement plan has no destination yet"))?;
        game.board().planet(name)
    }

    fn pending_source(&self) -> Option<&PlanetId> {
        self.sources
            .iter()
            .find(|s| !self.amounts.iter().any(|a| &a.planet == *s))
    }

    /// Inclusive range of amounts for a source.
    pub fn amount_bounds(&self, game: &Game, source: &str) -> Result<(u32, u32), EngineError> {
        let forces = *game.board().planet(source)?.forces();
        let max = self.config.per_source_cap().map_or(forces, |cap| cap.min(forces));
        if max == 0 {
            return Err(EngineError::input(format!("No forces can leave {}", source)));
        }
        if *self.config.move_all() {
            Ok((max, max))
        } else {
            Ok((1, max))
        }
    }

    /// Takes every step that has exactly one legal option.
    ///
    /// # Errors
    ///
    /// Returns an input error when no legal destination or source exists.
    #[instrument(skip(self, game), fields(ability = %self.ability, player = %self.player))]
    pub fn advance(&mut self, game: &Game) -> Result<(), EngineError> {
        loop {
            match self.stage {
                PlanStage::ChooseDestination => {
                    let options = self.destination_options(game);
                    match options.as_slice() {
                        [] => {
                            return Err(EngineError::input(format!(
                                "There is no legal destination for {}",
                                self.ability
                            )));
                        }
                        [only] => {
                            debug!(destination = %only, "Only one destination, taking it");
                            self.destination = Some(only.clone());
                            self.stage = PlanStage::ChooseSources;
                        }
                        _ => return Ok(()),
                    }
                }
                PlanStage::ChooseSources => {
                    let options = self.source_options(game)?;
                    if self.sources.is_empty() {
                        match options.as_slice() {
                            [] => {
                                return Err(EngineError::input(
                                    "None of your forces can reach that destination",
                                ));
                            }
                            [only] => {
                                debug!(source = %only, "Only one source, taking it");
                                self.sources.push(only.clone());
                                self.stage = PlanStage::ChooseAmount;
                            }
                            _ => return Ok(()),
                        }
                    } else if !*self.config.multiple_sources() || options.is_empty() {
                        self.stage = PlanStage::ChooseAmount;
                    } else {
                        return Ok(());
                    }
                }
                PlanStage::ChooseAmount => match self.pending_source().cloned() {
                    None => self.stage = PlanStage::Confirm,
                    Some(source) => {
                        let (min, max) = self.amount_bounds(game, &source)?;
                        if min == max {
                            debug!(source = %source, amount = max, "Amount fixed, taking it");
                            self.amounts.push(SourceAmount {
                                planet: source,
                                amount: max,
                            });
                        } else {
                            return Ok(());
                        }
                    }
                },
                PlanStage::Confirm => return Ok(()),
            }
        }
    }

    /// The options of the current stage with their button labels.
    pub fn options(&self, game: &Game) -> Result<Vec<(String, MovementChoice)>, EngineError> {
        let mut options = Vec::new();
        match self.stage {
            PlanStage::ChooseDestination => {
                for destination in self.destination_options(game) {
                    let planet = game.board().planet(&destination)?;
                    let owner = planet
                        .owner()
                        .map(|o| game.name_of(o))
                        .unwrap_or_else(|| "unowned".to_string());
                    options.push((
                        format!("To {} ({}, {})", destination, owner, planet.forces()),
                        MovementChoice::Destination(destination),
                    ));
                }
            }
            PlanStage::ChooseSources => {
                for source in self.source_options(game)? {
                    let forces = game.board().planet(&source)?.forces();
                    options.push((
                        format!("From {} ({})", source, forces),
                        MovementChoice::Source(source),
                    ));
                }
                if !self.sources.is_empty() {
                    options.push((
                        "Done choosing sources".to_string(),
                        MovementChoice::SourcesDone,
                    ));
                }
            }
            PlanStage::ChooseAmount => {
                if let Some(source) = self.pending_source() {
                    let (min, max) = self.amount_bounds(game, source)?;
                    for amount in min..=max {
                        options.push((
                            format!("Move {} from {}", amount, source),
                            MovementChoice::Amount {
                                source: source.clone(),
                                amount,
                            },
                        ));
                    }
                }
            }
            PlanStage::Confirm => {
                options.push(("Confirm".to_string(), MovementChoice::Confirm));
            }
        }
        options.push(("Cancel".to_string(), MovementChoice::Cancel));
        Ok(options)
    }

    /// Prompt text for the current stage.
    pub fn prompt_text(&self, game: &Game) -> String {
        let name = game.name_of(self.player);
        match self.stage {
            PlanStage::ChooseDestination => {
                format!("{}, where should {} send forces?", name, self.ability)
            }
            PlanStage::ChooseSources => format!(
                "{}, which planets send forces to {}?",
                name,
                self.destination.as_deref().unwrap_or("?")
            ),
            PlanStage::ChooseAmount => format!(
                "{}, how many forces leave {}?",
                name,
                self.pending_source().map(String::as_str).unwrap_or("?")
            ),
            PlanStage::Confirm => {
                let moves = self
                    .amounts
                    .iter()
                    .map(|a| format!("{} from {}", a.amount, a.planet))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "{}, confirm moving {} to {}?",
                    name,
                    moves,
                    self.destination.as_deref().unwrap_or("?")
                )
            }
        }
    }

    /// Applies one click.
    ///
    /// # Errors
    ///
    /// Returns an input error if the choice is not currently offered.
    #[instrument(skip(self, game), fields(ability = %self.ability, stage = ?self.stage))]
    pub fn apply(&mut self, game: &Game, choice: &MovementChoice) -> Result<PlanStep, EngineError> {
        let offered = self.options(game)?;
        if !offered.iter().any(|(_, c)| c == choice) {
            return Err(EngineError::input("That option is no longer available"));
        }

        match choice {
            MovementChoice::Cancel => {
                info!("Movement plan cancelled");
                return Ok(PlanStep::Cancelled);
            }
            MovementChoice::Destination(destination) => {
                self.destination = Some(destination.clone());
                self.stage = PlanStage::ChooseSources;
            }
            MovementChoice::Source(source) => {
                self.sources.push(source.clone());
                if !*self.config.multiple_sources() {
                    self.stage = PlanStage::ChooseAmount;
                }
            }
            MovementChoice::SourcesDone => self.stage = PlanStage::ChooseAmount,
            MovementChoice::Amount { source, amount } => self.amounts.push(SourceAmount {
                planet: source.clone(),
                amount: *amount,
            }),
            MovementChoice::Confirm => {
                let event = self.to_event(game)?;
                info!(destination = %event.destination, moving = event.total_moving(), "Movement plan confirmed");
                return Ok(PlanStep::Confirmed(event));
            }
        }
        self.advance(game)?;
        Ok(PlanStep::Continue)
    }

    fn to_event(&self, game: &Game) -> Result<MovementEvent, EngineError> {
        let destination = self.destination_planet(game)?;
        for amount in &self.amounts {
            let source = game.board().planet(&amount.planet)?;
            if !self.is_source_for(source, destination) || amount.amount > *source.forces() {
                return Err(EngineError::input(format!(
                    "{} can no longer send {} forces",
                    amount.planet, amount.amount
                )));
            }
        }
        Ok(MovementEvent {
            mover: self.player,
            ability: self.ability.clone(),
            destination: destination.name().clone(),
            sources: self.amounts.clone(),
            attacker_bonuses: Vec::new(),
            defender_bonuses: Vec::new(),
            excess_redirect: None,
        })
    }

    /// Applies the configured bookkeeping for a confirmed plan.
    ///
    /// # Errors
    ///
    /// Returns an input error if a required budget is exhausted.
    #[instrument(skip(self, game, event), fields(ability = %self.ability))]
    pub(crate) fn apply_bookkeeping(
        &self,
        game: &mut Game,
        event: &MovementEvent,
    ) -> Result<(), EngineError> {
        for step in self.config.bookkeeping() {
            match step {
                Bookkeeping::ExhaustSources => {
                    for source in &event.sources {
                        game.board_mut().planet_mut(&source.planet)?.exhausted = true;
                    }
                }
                Bookkeeping::ExhaustDestination => {
                    game.board_mut().planet_mut(&event.destination)?.exhausted = true;
                }
                Bookkeeping::MarkUsed => {
                    game.player_mut(self.player)?
                        .used_this_turn
                        .insert(self.ability.clone());
                }
                Bookkeeping::ConsumeBudget(budget) => {
                    if !game.player_mut(self.player)?.spend(*budget) {
                        return Err(EngineError::input(format!("No {} left this turn", budget)));
                    }
                }
            }
            debug!(step = ?step, "Bookkeeping applied");
        }
        Ok(())
    }
}
