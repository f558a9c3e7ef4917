//! Transition table listing.

use serde::Serialize;
use turnward_core::{BattlePhase, TurnwardError, edges, legal_targets};

use crate::cli::args::{OutputFormat, TransitionsArgs};

#[derive(Debug, Serialize)]
struct Edge {
    from: BattlePhase,
    to: BattlePhase,
}

/// Print the transition table.
///
/// # Errors
///
/// Returns a JSON error if serialization fails.
pub fn run(args: &TransitionsArgs) -> Result<(), TurnwardError> {
    let edges: Vec<Edge> = edges()
        .into_iter()
        .filter(|(from, _)| args.from.is_none_or(|f| f == *from))
        .map(|(from, to)| Edge { from, to })
        .collect();

    match args.format {
        OutputFormat::Human => {
            let sources = args.from.map_or_else(|| BattlePhase::ALL.to_vec(), |f| vec![f]);
            for from in sources {
                let targets: Vec<&str> = legal_targets(from).iter().map(|t| t.as_str()).collect();
                if targets.is_empty() {
                    println!("{from:<18} (no exits)");
                } else {
                    println!("{from:<18} -> {}", targets.join(", "));
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&edges)?),
    }
    Ok(())
}
