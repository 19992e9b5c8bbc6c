//! Built-in abilities.
//!
//! Each covers one provider shape: automatic adjustment, optional penalty,
//! conversion, strength bonus, excess redirect, capture reaction, and the
//! movement abilities that configure the planning wizard.

use tracing::{debug, instrument};

use crate::EngineError;
use crate::event::{CombatSide, EventKind, EventTag};
use crate::game::{ActionBudget, Game, PlayerId};
use crate::movement::{self, Bookkeeping, DestinationRestriction, MovementConfig};
use crate::provider::{EffectProvider, EventContext, ResolutionRequest, TriggeredEffect};

/// An ability that moves forces with a fixed wizard configuration.
#[derive(Debug, Clone)]
pub struct MovementAbility {
    key: &'static str,
    name: &'static str,
    config: MovementConfig,
    attack_bonus: u32,
}

impl MovementAbility {
    /// Creates a movement ability.
    pub fn new(key: &'static str, name: &'static str, config: MovementConfig) -> Self {
        Self {
            key,
            name,
            config,
            attack_bonus: 0,
        }
    }

    /// Grants an attacker bonus whenever this ability starts a fight.
    pub fn with_attack_bonus(mut self, bonus: u32) -> Self {
        self.attack_bonus = bonus;
        self
    }

    /// Move from one adjacent planet anywhere.
    pub fn advance() -> Self {
        Self::new("advance", "Advance", MovementConfig::default())
    }

    /// Gather forces from several adjacent planets onto one you control.
    pub fn muster() -> Self {
        Self::new(
            "muster",
            "Muster",
            MovementConfig::default()
                .with_multiple_sources(true)
                .with_restriction(DestinationRestriction::MustControl)
                .with_bookkeeping(vec![
                    Bookkeeping::ExhaustSources,
                    Bookkeeping::MarkUsed,
                    Bookkeeping::ConsumeBudget(ActionBudget::Move),
                ]),
        )
    }

    /// Pull every force off one planet to a safe neighbour.
    pub fn evacuate() -> Self {
        Self::new(
            "evacuate",
            "Evacuate",
            MovementConfig::default()
                .with_restriction(DestinationRestriction::CannotAttack)
                .with_move_all(true),
        )
    }

    /// Strike from several planets, at most two forces each, with a bonus.
    pub fn raid() -> Self {
        Self::new(
            "raid",
            "Raid",
            MovementConfig::default()
                .with_multiple_sources(true)
                .with_per_source_cap(Some(2))
                .with_bookkeeping(vec![
                    Bookkeeping::MarkUsed,
                    Bookkeeping::ConsumeBudget(ActionBudget::Action),
                ]),
        )
        .with_attack_bonus(1)
    }
}

impl EffectProvider for MovementAbility {
    fn key(&self) -> &'static str {
        self.key
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn reacts_to(&self) -> &'static [EventTag] {
        &[EventTag::Movement]
    }

    fn triggered_effects(&self, ctx: &EventContext<'_>) -> Vec<TriggeredEffect> {
        let EventKind::Movement(movement) = ctx.event.kind() else {
            return Vec::new();
        };
        if self.attack_bonus == 0 || movement.ability != self.key || movement.mover != ctx.owner {
            return Vec::new();
        }
        let hostile = ctx
            .game
            .board()
            .get(&movement.destination)
            .and_then(|p| *p.owner())
            .is_some_and(|owner| owner != ctx.owner);
        if !hostile {
            return Vec::new();
        }
        vec![TriggeredEffect::automatic(
            ctx,
            0,
            format!("{} strikes first (+{})", self.name, self.attack_bonus),
            ResolutionRequest::AddStrength {
                event: *ctx.event.id(),
                side: CombatSide::Attacker,
                amount: self.attack_bonus,
                source: self.key.to_string(),
            },
        )]
    }

    fn movement(&self) -> Option<MovementConfig> {
        Some(self.config.clone())
    }
}

/// +1 force whenever one of your planets produces.
#[derive(Debug, Clone, Copy)]
pub struct Industrious;

impl EffectProvider for Industrious {
    fn key(&self) -> &'static str {
        "industrious"
    }

    fn name(&self) -> &'static str {
        "Industrious"
    }

    fn reacts_to(&self) -> &'static [EventTag] {
        &[EventTag::BeginProduction]
    }

    fn triggered_effects(&self, ctx: &EventContext<'_>) -> Vec<TriggeredEffect> {
        match ctx.event.kind() {
            EventKind::BeginProduction(production) if production.player == ctx.owner => {
                vec![TriggeredEffect::automatic(
                    ctx,
                    0,
                    format!("Industrious: +1 force on {}", production.planet),
                    ResolutionRequest::AdjustProduction {
                        event: *ctx.event.id(),
                        forces: 1,
                        credits: 0,
                    },
                )]
            }
            _ => Vec::new(),
        }
    }
}

/// May cost a rival one force when they produce next to you.
#[derive(Debug, Clone, Copy)]
pub struct Sabotage;

impl EffectProvider for Sabotage {
    fn key(&self) -> &'static str {
        "sabotage"
    }

    fn name(&self) -> &'static str {
        "Sabotage"
    }

    fn reacts_to(&self) -> &'static [EventTag] {
        &[EventTag::BeginProduction]
    }

    fn triggered_effects(&self, ctx: &EventContext<'_>) -> Vec<TriggeredEffect> {
        let EventKind::BeginProduction(production) = ctx.event.kind() else {
            return Vec::new();
        };
        if production.player == ctx.owner || production.output.forces <= 0 {
            return Vec::new();
        }
        let bordering = ctx
            .game
            .board()
            .owned_by(ctx.owner)
            .any(|p| p.is_adjacent_to(&production.planet));
        if !bordering {
            return Vec::new();
        }
        vec![TriggeredEffect::optional(
            ctx,
            0,
            format!("Sabotage {}: -1 force", production.planet),
            ResolutionRequest::AdjustProduction {
                event: *ctx.event.id(),
                forces: -1,
                credits: 0,
            },
        )]
    }
}

/// May turn one produced force into two credits.
#[derive(Debug, Clone, Copy)]
pub struct Refinery;

impl EffectProvider for Refinery {
    fn key(&self) -> &'static str {
        "refinery"
    }

    fn name(&self) -> &'static str {
        "Refinery"
    }

    fn reacts_to(&self) -> &'static [EventTag] {
        &[EventTag::BeginProduction]
    }

    fn triggered_effects(&self, ctx: &EventContext<'_>) -> Vec<TriggeredEffect> {
        match ctx.event.kind() {
            EventKind::BeginProduction(production)
                if production.player == ctx.owner && production.output.forces >= 1 =>
            {
                vec![TriggeredEffect::optional(
                    ctx,
                    0,
                    format!("Refine on {}: 1 force into 2 credits", production.planet),
                    ResolutionRequest::ConvertForces {
                        event: *ctx.event.id(),
                        forces: 1,
                        credits: 2,
                    },
                )]
            }
            _ => Vec::new(),
        }
    }
}

/// +1 defence on your planets.
#[derive(Debug, Clone, Copy)]
pub struct Fortress;

impl EffectProvider for Fortress {
    fn key(&self) -> &'static str {
        "fortress"
    }

    fn name(&self) -> &'static str {
        "Fortress"
    }

    fn reacts_to(&self) -> &'static [EventTag] {
        &[EventTag::Movement]
    }

    fn triggered_effects(&self, ctx: &EventContext<'_>) -> Vec<TriggeredEffect> {
        let EventKind::Movement(movement) = ctx.event.kind() else {
            return Vec::new();
        };
        let defending = ctx
            .game
            .board()
            .get(&movement.destination)
            .is_some_and(|p| p.is_owned_by(ctx.owner));
        if !defending || movement.mover == ctx.owner {
            return Vec::new();
        }
        vec![TriggeredEffect::automatic(
            ctx,
            0,
            format!("Fortress holds {} (+1)", movement.destination),
            ResolutionRequest::AddStrength {
                event: *ctx.event.id(),
                side: CombatSide::Defender,
                amount: 1,
                source: self.key().to_string(),
            },
        )]
    }
}

/// May send forces above capacity to a neighbouring planet you control.
#[derive(Debug, Clone, Copy)]
pub struct Colonists;

impl EffectProvider for Colonists {
    fn key(&self) -> &'static str {
        "colonists"
    }

    fn name(&self) -> &'static str {
        "Colonists"
    }

    fn reacts_to(&self) -> &'static [EventTag] {
        &[EventTag::Movement]
    }

    fn triggered_effects(&self, ctx: &EventContext<'_>) -> Vec<TriggeredEffect> {
        let EventKind::Movement(movement) = ctx.event.kind() else {
            return Vec::new();
        };
        if movement.mover != ctx.owner || movement.excess_redirect.is_some() {
            return Vec::new();
        }
        let Ok(outcome) = movement::project(ctx.game, movement) else {
            return Vec::new();
        };
        if outcome.excess == 0 || !outcome.mover_holds {
            return Vec::new();
        }
        let capacity = *ctx.game.capacity();
        ctx.game
            .board()
            .owned_by(ctx.owner)
            .filter(|p| p.is_adjacent_to(&movement.destination))
            .filter(|p| *p.forces() < capacity)
            .enumerate()
            .map(|(index, planet)| {
                TriggeredEffect::optional(
                    ctx,
                    index as u32,
                    format!("Send excess to {}", planet.name()),
                    ResolutionRequest::RedirectExcess {
                        event: *ctx.event.id(),
                        to: planet.name().clone(),
                    },
                )
            })
            .collect()
    }
}

/// Gain a credit for every planet you capture.
#[derive(Debug, Clone, Copy)]
pub struct Plunder;

impl Plunder {
    /// Counter tracking captures rewarded so far.
    pub const COUNTER: &'static str = "captures";
}

impl EffectProvider for Plunder {
    fn key(&self) -> &'static str {
        "plunder"
    }

    fn name(&self) -> &'static str {
        "Plunder"
    }

    fn reacts_to(&self) -> &'static [EventTag] {
        &[EventTag::Capture]
    }

    fn triggered_effects(&self, ctx: &EventContext<'_>) -> Vec<TriggeredEffect> {
        match ctx.event.kind() {
            EventKind::Capture(capture) if capture.mover == ctx.owner => {
                vec![TriggeredEffect::automatic(
                    ctx,
                    0,
                    format!("Plunder {}: +1 credit", capture.planet),
                    ResolutionRequest::GainCredits {
                        player: ctx.owner,
                        amount: 1,
                    },
                )]
            }
            _ => Vec::new(),
        }
    }

    #[instrument(skip(self, request, game), fields(game_id = %game.id()))]
    fn resolve(
        &self,
        owner: PlayerId,
        request: &ResolutionRequest,
        game: &mut Game,
    ) -> Result<(), EngineError> {
        request.apply(owner, game)?;
        let ability = game
            .player_mut(owner)?
            .ability_mut(self.key())
            .ok_or_else(|| EngineError::invariant("Plunder resolved for a player without it"))?;
        let total = ability.bump(Self::COUNTER, 1);
        debug!(owner = %owner, total, "Plunder counter bumped");
        Ok(())
    }
}

/// When one of your planets falls, you must take two credits in compensation.
#[derive(Debug, Clone, Copy)]
pub struct Vengeance;

impl EffectProvider for Vengeance {
    fn key(&self) -> &'static str {
        "vengeance"
    }

    fn name(&self) -> &'static str {
        "Vengeance"
    }

    fn reacts_to(&self) -> &'static [EventTag] {
        &[EventTag::Capture]
    }

    fn triggered_effects(&self, ctx: &EventContext<'_>) -> Vec<TriggeredEffect> {
        match ctx.event.kind() {
            EventKind::Capture(capture) if capture.previous_owner == ctx.owner => {
                vec![TriggeredEffect::forced(
                    ctx,
                    0,
                    format!("Swear vengeance for {}: +2 credits", capture.planet),
                    ResolutionRequest::GainCredits {
                        player: ctx.owner,
                        amount: 2,
                    },
                )]
            }
            _ => Vec::new(),
        }
    }
}
