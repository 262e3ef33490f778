//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "reqgraph")]
#[command(about = "Requirement graph consistency analysis and health scoring")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the engine config file (defaults to the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a full analysis pass over a snapshot file
    Analyze {
        /// Snapshot file (YAML or JSON) describing requirements and edges
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Business phase override (exploration, validation, growth,
        /// expansion, maturity)
        #[arg(long)]
        phase: Option<String>,

        /// Score store to load baselines from (YAML or SQLite by extension)
        #[arg(long)]
        scores: Option<PathBuf>,

        /// Group near matches at the looser related threshold instead
        /// of the duplicate threshold
        #[arg(long)]
        related: bool,

        /// Persist updated scores back to the score store
        #[arg(long, requires = "scores")]
        save: bool,
    },

    /// Establish baselines for all requirements in a snapshot
    Baseline {
        /// Snapshot file (YAML or JSON)
        file: PathBuf,

        /// Score store to establish baselines in
        #[arg(long)]
        scores: PathBuf,

        /// Business phase override
        #[arg(long)]
        phase: Option<String>,
    },

    /// Inspect or create the engine configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
