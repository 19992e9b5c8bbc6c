//! Per-game concurrency guard, aggregate cache and session orchestration.

mod cache;
mod guard;
mod manager;

pub use cache::GameCache;
pub use guard::{GameGuard, GuardTicket};
pub use manager::{SessionManager, SessionOutcome};
