//! Simulated battle command.
//!
//! Plays the opening and a number of turns against the scripted
//! collaborators from [`crate::sim`], in real time, and prints a summary.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use turnward_core::{BattleConfig, TurnwardError};

use crate::battle::{Admission, BattleOrchestrator, BattleStatus, OpeningOutcome};
use crate::cli::args::{OutputFormat, RunArgs};
use crate::config::{ConfigLoader, LoaderOptions};
use crate::observability::EventEmitter;
use crate::sim::{SimBattle, SimOptions};

/// Longest a single step of the driver waits for the battle.
const DRIVER_WAIT: Duration = Duration::from_secs(60);
const DRIVER_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Serialize)]
struct RunSummary {
    opening: &'static str,
    status: BattleStatus,
    player_attacks: u64,
    enemy_attacks: u64,
    skills_executed: u64,
    drop_actions: u64,
}

/// Run a simulated battle.
///
/// # Errors
///
/// Returns a usage error for `--turns 0`, and an error if the
/// configuration cannot be loaded, the events file cannot be created, or
/// the metrics endpoint cannot be installed.
pub async fn run(args: &RunArgs) -> Result<(), TurnwardError> {
    if args.turns == 0 {
        return Err(TurnwardError::Usage("--turns must be at least 1".to_owned()));
    }
    if let Some(port) = args.metrics_port {
        crate::observability::init_metrics(Some(port))?;
        tracing::info!(port, "Prometheus metrics endpoint started");
    }

    let config = match &args.config {
        Some(path) => {
            tracing::info!(config = %path.display(), "loading configuration");
            let result = ConfigLoader::new(LoaderOptions::default()).load(path)?;
            for warning in &result.warnings {
                tracing::warn!(
                    location = warning.location.as_deref().unwrap_or("<unknown>"),
                    "{}",
                    warning.message
                );
            }
            result.config
        }
        None => Arc::new(BattleConfig::default()),
    };

    let emitter = match &args.events_file {
        Some(path) => EventEmitter::from_file(path)?,
        None => EventEmitter::noop(),
    };

    let sim = SimBattle::new(&SimOptions {
        enemy_countdown: args.enemy_countdown,
        drops: args.drops,
        ..SimOptions::default()
    });
    let battle = BattleOrchestrator::builder(config)
        .collaborators(sim.collaborators())
        .emitter(Arc::new(emitter))
        .build();
    let handle = battle.handle();
    sim.skills.report_to(handle.clone());
    battle.start();

    let opening = battle.run_opening().await;
    if opening == OpeningOutcome::Ready {
        for turn in 1..=args.turns {
            if !wait_until(|| ready_for_input(&battle.status())).await {
                tracing::warn!(turn, "battle never became ready for input");
                break;
            }
            sim.skills.reserve(args.pending_skills);

            match battle.notify_user_operation() {
                Admission::Accepted => {}
                Admission::Rejected(reason) => {
                    tracing::warn!(turn, %reason, "operation rejected");
                    continue;
                }
            }

            // One match: a cell clears, the board refills, the engine reports.
            sim.board.set_matching(true);
            sim.board.clear_cell(0, 0);
            tokio::time::sleep(Duration::from_millis(300)).await;
            sim.board.refill();
            sim.board.set_matching(false);
            handle.match_completed();

            let finished = u64::from(turn);
            if !wait_until(|| {
                let status = battle.status();
                status.turns_completed + status.turns_abandoned >= finished
            })
            .await
            {
                tracing::warn!(turn, "turn did not finish");
                break;
            }
        }
    } else {
        tracing::warn!(?opening, "battle did not start");
    }
    battle.stop();

    let summary = RunSummary {
        opening: match opening {
            OpeningOutcome::Ready => "ready",
            OpeningOutcome::EnemySpawnFailed => "enemy_spawn_failed",
            OpeningOutcome::Abandoned(_) => "abandoned",
        },
        status: battle.status(),
        player_attacks: sim.player.attacks(),
        enemy_attacks: sim.enemy.attacks(),
        skills_executed: sim.skills.executed(),
        drop_actions: sim.drops.drops().iter().map(|d| d.actions()).sum(),
    };
    print_summary(&summary, args.format)
}

const fn ready_for_input(status: &BattleStatus) -> bool {
    matches!(status.phase, turnward_core::BattlePhase::BattleInProgress)
        && !status.gate.input_cooldown
        && !status.gate.skill_followup
        && !status.gate.user_operation_in_flight
        && !status.gate.turn_transition_in_flight
}

/// Polls `condition` until it holds or [`DRIVER_WAIT`] passes.
async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + DRIVER_WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(DRIVER_POLL).await;
    }
    condition()
}

fn print_summary(summary: &RunSummary, format: OutputFormat) -> Result<(), TurnwardError> {
    match format {
        OutputFormat::Human => {
            let status = &summary.status;
            let fires = &status.watchdog_fires;
            println!("opening:          {}", summary.opening);
            println!("final phase:      {}", status.phase);
            println!(
                "turns:            {} started, {} completed, {} abandoned",
                status.turns_started, status.turns_completed, status.turns_abandoned
            );
            println!("player attacks:   {}", summary.player_attacks);
            println!("enemy attacks:    {}", summary.enemy_attacks);
            println!("skills executed:  {}", summary.skills_executed);
            println!("drop actions:     {}", summary.drop_actions);
            println!(
                "watchdog fires:   user_operation={} turn_transition={} enemy_attack={} phase_timeout={}",
                fires.user_operation, fires.turn_transition, fires.enemy_attack, fires.phase_timeout
            );
            println!("recovery epoch:   {}", status.epoch);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(summary)?),
    }
    Ok(())
}
