//! Shared integration-test harness: an orchestrator wired to the scripted
//! collaborators, with its event stream captured in memory.

#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;
use std::process::Output;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use turnward::battle::BattleStatus;
use turnward::observability::EventEmitter;
use turnward::sim::{SimBattle, SimOptions};
use turnward::{BattleConfig, BattleOrchestrator, BattlePhase};

/// Longest any helper waits before failing the test.
pub const WAIT_LIMIT: Duration = Duration::from_secs(120);

/// Poll spacing for the wait helpers.
pub const POLL: Duration = Duration::from_millis(10);

/// In-memory JSONL sink shared with the emitter.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<u8>>>);

impl Write for EventLog {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl EventLog {
    /// Every event emitted so far.
    pub fn events(&self) -> Vec<Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .filter(|l| !l.is_empty())
            .map(|l| serde_json::from_str(l).unwrap_or_else(|e| panic!("invalid JSON: {e}\nline: {l}")))
            .collect()
    }

    /// Events of one type.
    pub fn of_type(&self, kind: &str) -> Vec<Value> {
        self.events()
            .into_iter()
            .filter(|e| e["type"] == kind)
            .collect()
    }

    /// Target phases of every `PhaseEntered`, in order.
    pub fn phases_entered(&self) -> Vec<String> {
        self.of_type("PhaseEntered")
            .iter()
            .map(|e| e["to"].as_str().unwrap().to_owned())
            .collect()
    }
}

/// One orchestrator with scripted collaborators.
pub struct Harness {
    pub battle: Arc<BattleOrchestrator>,
    pub sim: SimBattle,
    pub log: EventLog,
}

impl Harness {
    /// Battle with every collaborator present, already in `BattleInProgress`.
    pub fn new(options: SimOptions) -> Self {
        Self::at(BattlePhase::BattleInProgress, options)
    }

    /// Battle with every collaborator present, starting in `phase`.
    pub fn at(phase: BattlePhase, options: SimOptions) -> Self {
        Self::with_config(phase, options, BattleConfig::default())
    }

    /// Battle with a custom configuration.
    pub fn with_config(phase: BattlePhase, options: SimOptions, config: BattleConfig) -> Self {
        let sim = SimBattle::new(&options);
        let log = EventLog::default();
        let battle = BattleOrchestrator::builder(Arc::new(config))
            .collaborators(sim.collaborators())
            .emitter(Arc::new(EventEmitter::new(Box::new(log.clone()))))
            .initial_phase(phase)
            .build();
        Self { battle, sim, log }
    }

    /// Battle without collaborators, starting in `phase`.
    pub fn bare(phase: BattlePhase) -> Self {
        let log = EventLog::default();
        let battle = BattleOrchestrator::builder(Arc::new(BattleConfig::default()))
            .emitter(Arc::new(EventEmitter::new(Box::new(log.clone()))))
            .initial_phase(phase)
            .build();
        Self {
            battle,
            sim: SimBattle::new(&SimOptions::default()),
            log,
        }
    }

    pub fn status(&self) -> BattleStatus {
        self.battle.status()
    }

    /// Polls until `condition` holds; panics after [`WAIT_LIMIT`].
    pub async fn wait_for(&self, what: &str, condition: impl Fn(&BattleStatus) -> bool) {
        let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
        loop {
            if condition(&self.battle.status()) {
                return;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {what}: {:?}",
                self.battle.status()
            );
            tokio::time::sleep(POLL).await;
        }
    }

    /// Waits until `n` turns have completed.
    pub async fn wait_for_turns(&self, n: u64) {
        self.wait_for("turns to complete", |s| s.turns_completed >= n)
            .await;
    }

    /// One player move: admission, then the engine reports the match.
    pub fn play_move(&self) {
        assert!(
            self.battle.notify_user_operation().is_accepted(),
            "operation rejected: {:?}",
            self.battle.status()
        );
        assert!(self.battle.handle().match_completed());
    }
}

// ============================================================================
// Binary helpers
// ============================================================================

/// Path to a file under `tests/fixtures/`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Runs the `turnward` binary to completion.
pub fn run_command(args: &[&str]) -> Output {
    std::process::Command::new(env!("CARGO_BIN_EXE_turnward"))
        .args(args)
        .output()
        .expect("failed to run turnward")
}
