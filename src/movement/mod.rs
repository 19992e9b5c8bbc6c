//! Movement: the planning wizard, its configuration, and combat arithmetic.

mod combat;
mod config;
mod planner;

pub use combat::{Engagement, EngagementOutcome, project, resolve_engagement};
pub use config::{Bookkeeping, DestinationRestriction, MovementConfig};
pub use planner::{MovementChoice, MovementPlan, PlanStage, PlanStep};

pub(crate) use combat::execute_movement;
