//! CLI command dispatch and handlers
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod run;
pub mod transitions;
pub mod validate;
pub mod version;

use crate::cli::args::{Cli, Commands};
use turnward_core::TurnwardError;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli) -> Result<(), TurnwardError> {
    match cli.command {
        Commands::Run(args) => run::run(&args).await,
        Commands::Validate(args) => validate::run(&args),
        Commands::Transitions(args) => transitions::run(&args),
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}
