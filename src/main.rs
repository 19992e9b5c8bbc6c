//! Orbital Conquest - terminal front end
//!
//! Each invocation runs one guarded session against the SQLite store and
//! prints the resulting messages with their button tokens.

#![warn(missing_docs)]

mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use cli::{Cli, Command as CliCommand};
use orbital_conquest::{
    Command, DecisionId, EngineConfig, Game, GameStore, MessageBuilder, NudgeScheduler,
    PlayerId, PresentationSink, ProviderRegistry, Scenario, SessionManager, SessionOutcome,
    SqliteGameStore, render_plain,
};
use tracing::{debug, info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli.config)?;
    if let Some(db_path) = cli.db_path {
        config = config.with_db_path(db_path);
    }

    let store = Arc::new(SqliteGameStore::open(config.db_path().clone())?);
    let registry = Arc::new(ProviderRegistry::standard());
    let manager = Arc::new(SessionManager::new(
        store.clone(),
        registry,
        config.clone(),
    ));

    match cli.command {
        CliCommand::Init { scenario } => {
            let scenario = Scenario::from_file(&scenario)?;
            let game = manager.create_game(scenario.into_setup())?;
            println!("Created game '{}'", game.id());
            print_board(&game);
        }
        CliCommand::Show { game } => {
            let snapshot = manager.snapshot(&game)?;
            print_board(&snapshot);
            if let Some(prompt) = manager.resurface(&game)? {
                let mut builder = MessageBuilder::new(*config.message_limits());
                prompt.render(&mut builder);
                print!("{}", render_plain(&builder.finish()));
            }
        }
        CliCommand::Produce { game, player } => {
            let id = resolve_player(&manager, &game, &player)?;
            let outcome = manager.execute(&game, id, &Command::Produce)?;
            print_outcome(&config, &outcome);
        }
        CliCommand::Move {
            game,
            player,
            ability,
        } => {
            let id = resolve_player(&manager, &game, &player)?;
            let outcome = manager.execute(&game, id, &Command::Move { ability })?;
            print_outcome(&config, &outcome);
        }
        CliCommand::EndTurn { game, player } => {
            let id = resolve_player(&manager, &game, &player)?;
            let outcome = manager.execute(&game, id, &Command::EndTurn)?;
            print_outcome(&config, &outcome);
        }
        CliCommand::Click { token, player } => {
            let token = DecisionId::new(token);
            let request = store
                .load_decision(&token)?
                .ok_or_else(|| anyhow!("That button has expired"))?;
            let id = resolve_player(&manager, request.game_id(), &player)?;
            let outcome = manager.activate(&token, id)?;
            print_outcome(&config, &outcome);
        }
        CliCommand::Nudge { game, delay_secs } => {
            let scheduler = match delay_secs {
                Some(secs) => NudgeScheduler::new(Duration::from_secs(secs)),
                None => NudgeScheduler::from_config(&config),
            };
            let epoch = *manager.snapshot(&game)?.epoch();
            let limits = *config.message_limits();
            let handle = scheduler.schedule(manager.clone(), game, epoch, move |prompt| {
                let mut builder = MessageBuilder::new(limits);
                builder.text("Reminder: this is still waiting on you.");
                prompt.render(&mut builder);
                print!("{}", render_plain(&builder.finish()));
            });
            handle.await.context("Nudge task panicked")?;
        }
    }

    Ok(())
}

/// Loads the config file, falling back to defaults when it does not exist.
#[instrument(skip(path), fields(path = %path.display()))]
fn load_config(path: &std::path::Path) -> Result<EngineConfig> {
    if path.exists() {
        Ok(EngineConfig::from_file(path)?)
    } else {
        debug!("Config file not found, using defaults");
        Ok(EngineConfig::default())
    }
}

/// Maps a player name to their id in a game.
#[instrument(skip(manager))]
fn resolve_player(manager: &SessionManager, game_id: &str, name: &str) -> Result<PlayerId> {
    let game = manager.snapshot(game_id)?;
    let player = game
        .player_by_name(name)
        .ok_or_else(|| anyhow!("No player named '{}' in game '{}'", name, game_id))?;
    info!(player = %player.id(), "Resolved player");
    Ok(*player.id())
}

fn print_board(game: &Game) {
    println!("{}", game.board().display(|id| game.name_of(id)));
    println!(
        "Round {}, {} to act",
        game.round(),
        game.name_of(game.current_player())
    );
}

fn print_outcome(config: &EngineConfig, outcome: &SessionOutcome) {
    let mut builder = MessageBuilder::new(*config.message_limits());
    outcome.render(&mut builder);
    print!("{}", render_plain(&builder.finish()));
    if !outcome.committed {
        println!("(nothing changed)");
    }
}
