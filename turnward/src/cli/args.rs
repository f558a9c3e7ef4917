//! CLI argument definitions
//!
//! All Clap derive structs for `turnward` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::observability::LogFormat;

// ============================================================================
// Root CLI
// ============================================================================

/// Turn orchestration runtime for phase-driven puzzle battles.
#[derive(Parser, Debug)]
#[command(name = "turnward", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "TURNWARD_COLOR")]
    pub color: ColorChoice,

    /// Log line format.
    #[arg(long, default_value = "human", global = true, env = "TURNWARD_LOG_FORMAT")]
    pub log_format: LogFormat,
}

// ============================================================================
// Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play a simulated battle against scripted collaborators.
    Run(RunArgs),

    /// Validate configuration files.
    Validate(ValidateArgs),

    /// Print the phase transition table.
    Transitions(TransitionsArgs),

    /// Display version information.
    Version(VersionArgs),
}

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to a YAML battle configuration.
    #[arg(short, long, env = "TURNWARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of player turns to play.
    #[arg(long, default_value_t = 3)]
    pub turns: u32,

    /// Enemy attack countdown.
    #[arg(long, default_value_t = 2)]
    pub enemy_countdown: i32,

    /// Skills reserved before every turn.
    #[arg(long, default_value_t = 0)]
    pub pending_skills: usize,

    /// Number of drop entities on the board.
    #[arg(long, default_value_t = 0)]
    pub drops: usize,

    /// Write structured events (JSONL) to this file.
    #[arg(long, env = "TURNWARD_EVENTS_FILE")]
    pub events_file: Option<PathBuf>,

    /// Serve Prometheus metrics on this port.
    #[arg(long, env = "TURNWARD_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Summary format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Treat warnings as errors.
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for `transitions`.
#[derive(Args, Debug)]
pub struct TransitionsArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Only list edges leaving this phase.
    #[arg(long)]
    pub from: Option<turnward_core::BattlePhase>,
}

/// Arguments for `version`.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

// ============================================================================
// Tests
// ============================================================================
