//! Command-line interface for orbital_conquest.

use clap::{Parser, Subcommand};

/// Orbital Conquest - play a button-driven strategy game from the terminal
#[derive(Parser, Debug)]
#[command(name = "orbital_conquest")]
#[command(about = "Event resolution engine for an asynchronous strategy game", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the engine config file
    #[arg(short, long, default_value = "orbital_conquest.toml")]
    pub config: std::path::PathBuf,

    /// Override the database path from the config
    #[arg(long)]
    pub db_path: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a game from a scenario file
    Init {
        /// Path to the scenario TOML
        #[arg(short, long)]
        scenario: std::path::PathBuf,
    },

    /// Print the board and any pending buttons
    Show {
        /// Game id
        #[arg(short, long)]
        game: String,
    },

    /// Start producing
    Produce {
        /// Game id
        #[arg(short, long)]
        game: String,

        /// Acting player's name
        #[arg(short, long)]
        player: String,
    },

    /// Start planning a movement
    Move {
        /// Game id
        #[arg(short, long)]
        game: String,

        /// Acting player's name
        #[arg(short, long)]
        player: String,

        /// Movement ability key
        #[arg(short, long)]
        ability: String,
    },

    /// End the current turn
    EndTurn {
        /// Game id
        #[arg(short, long)]
        game: String,

        /// Acting player's name
        #[arg(short, long)]
        player: String,
    },

    /// Click a button by its token
    Click {
        /// Button token (decision request id)
        #[arg(short, long)]
        token: String,

        /// Clicking player's name
        #[arg(short, long)]
        player: String,
    },

    /// Wait, then re-surface the pending prompt if nobody acted
    Nudge {
        /// Game id
        #[arg(short, long)]
        game: String,

        /// Override the configured delay in seconds
        #[arg(long)]
        delay_secs: Option<u64>,
    },
}
