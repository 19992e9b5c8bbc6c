//! Payload records carried by event variants.

use serde::{Deserialize, Serialize};

use crate::game::{PlanetId, PlayerId};

/// Forces taken from one source planet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAmount {
    /// Source planet.
    pub planet: PlanetId,
    /// Forces leaving it.
    pub amount: u32,
}

/// Side of a combat a bonus applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CombatSide {
    /// The moving player.
    Attacker,
    /// The destination's owner.
    Defender,
}

/// A strength bonus contributed by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrengthBonus {
    /// Name of the contributing ability.
    pub source: String,
    /// Bonus strength.
    pub amount: u32,
}

/// Accumulator for a pending movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementEvent {
    /// The moving player.
    pub mover: PlayerId,
    /// Movement ability that produced the plan.
    pub ability: String,
    /// Destination planet.
    pub destination: PlanetId,
    /// Forces taken from each source.
    pub sources: Vec<SourceAmount>,
    /// Bonuses for the mover.
    pub attacker_bonuses: Vec<StrengthBonus>,
    /// Bonuses for the destination's owner.
    pub defender_bonuses: Vec<StrengthBonus>,
    /// Planet receiving forces that would exceed capacity.
    pub excess_redirect: Option<PlanetId>,
}

impl MovementEvent {
    /// Total forces moving.
    pub fn total_moving(&self) -> u32 {
        self.sources.iter().map(|s| s.amount).sum()
    }

    /// Sum of bonuses on one side.
    pub fn bonus(&self, side: CombatSide) -> u32 {
        let bonuses = match side {
            CombatSide::Attacker => &self.attacker_bonuses,
            CombatSide::Defender => &self.defender_bonuses,
        };
        bonuses.iter().map(|b| b.amount).sum()
    }
}

/// Result of a resolved movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementReport {
    /// The moving player.
    pub mover: PlayerId,
    /// Movement ability used.
    pub ability: String,
    /// Destination planet.
    pub destination: PlanetId,
    /// Forces that left their sources.
    pub moved: u32,
    /// Forces on the destination afterwards.
    pub resulting_forces: u32,
    /// Owner of the destination afterwards.
    pub resulting_owner: Option<PlayerId>,
    /// Forces destroyed because of capacity.
    pub destroyed_excess: u32,
    /// Whether a combat took place.
    pub fought: bool,
}

/// A planet changing hands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureEvent {
    /// New owner.
    pub mover: PlayerId,
    /// Previous owner.
    pub previous_owner: PlayerId,
    /// Captured planet.
    pub planet: PlanetId,
}

/// Adjustable output of a production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProductionOutput {
    /// Forces to add to the planet; may go negative while providers adjust.
    pub forces: i32,
    /// Credits to add to the producing player.
    pub credits: i32,
}

/// Accumulator for a pending production.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionEvent {
    /// Producing player.
    pub player: PlayerId,
    /// Producing planet.
    pub planet: PlanetId,
    /// Effective output, seeded from the planet's base output.
    pub output: ProductionOutput,
}

/// Result of a resolved production.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionReport {
    /// Producing player.
    pub player: PlayerId,
    /// Producing planet.
    pub planet: PlanetId,
    /// Forces added.
    pub produced: u32,
    /// Forces lost to capacity.
    pub destroyed: u32,
    /// Credits gained.
    pub credits: u32,
}

/// Decision state of a multi-round production choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionChoiceEvent {
    /// Choosing player.
    pub player: PlayerId,
    /// Planets already produced during this choice.
    pub produced: Vec<PlanetId>,
}
