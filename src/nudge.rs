//! Best-effort reminders for idle decisions.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::config::EngineConfig;
use crate::decision::Prompt;
use crate::game::GameId;
use crate::session::SessionManager;

/// Re-surfaces a prompt after a delay if nobody has acted on it.
#[derive(Debug, Clone, Copy)]
pub struct NudgeScheduler {
    delay: Duration,
}

impl NudgeScheduler {
    /// Creates a scheduler with a fixed delay.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Creates a scheduler using the configured delay.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(Duration::from_secs(*config.nudge_delay_secs()))
    }

    /// Waits, then calls `on_nudge` with the pending prompt if the game is
    /// still at `epoch`. Failures are logged and dropped.
    #[instrument(skip(self, manager, on_nudge))]
    pub fn schedule<F>(
        &self,
        manager: Arc<SessionManager>,
        game_id: GameId,
        epoch: u64,
        on_nudge: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(Prompt) + Send + 'static,
    {
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let lookup_id = game_id.clone();
            let resurfaced =
                tokio::task::spawn_blocking(move || manager.resurface(&lookup_id)).await;
            match resurfaced {
                Ok(Ok(Some(prompt))) if *prompt.epoch() == epoch => {
                    info!(game_id = %game_id, epoch, "Nudging idle decision");
                    on_nudge(prompt);
                }
                Ok(Ok(_)) => debug!(game_id = %game_id, "Game moved on, no nudge"),
                Ok(Err(e)) => warn!(game_id = %game_id, error = %e, "Nudge lookup failed"),
                Err(e) => warn!(game_id = %game_id, error = %e, "Nudge task failed"),
            }
        })
    }
}
