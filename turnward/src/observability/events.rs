//! Structured event stream for `Turnward`.
//!
//! Discrete, typed battle events serialized as newline-delimited JSON
//! (JSONL) with a monotonically increasing sequence number.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use turnward_core::BattlePhase;

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted while a battle runs.
///
/// Tagged with `"type"` when serialized so consumers can dispatch on it.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The orchestrator subscribed to its event sources.
    BattleStarted {
        /// When the battle started.
        timestamp: DateTime<Utc>,
        /// Phase the register held at start.
        phase: BattlePhase,
    },

    /// The orchestrator unsubscribed.
    BattleStopped {
        /// When the battle stopped.
        timestamp: DateTime<Utc>,
        /// Human-readable stop reason.
        reason: String,
    },

    /// The register changed phase.
    PhaseEntered {
        /// When the change happened.
        timestamp: DateTime<Utc>,
        /// Previous phase.
        from: BattlePhase,
        /// Phase entered.
        to: BattlePhase,
        /// Whether a recovery forced the change.
        forced: bool,
    },

    /// A transition request was refused.
    TransitionDenied {
        /// When the request was refused.
        timestamp: DateTime<Utc>,
        /// Phase at the time of the request.
        from: BattlePhase,
        /// Requested phase.
        to: BattlePhase,
        /// Denial classification.
        reason: String,
    },

    /// A user operation was not admitted.
    OperationRejected {
        /// When the operation was refused.
        timestamp: DateTime<Utc>,
        /// Rejection reason label.
        reason: String,
    },

    /// A turn sequence began.
    TurnStarted {
        /// When the turn began.
        timestamp: DateTime<Utc>,
        /// One-based turn number.
        turn: u64,
    },

    /// A turn sequence ran to completion.
    TurnCompleted {
        /// When the turn completed.
        timestamp: DateTime<Utc>,
        /// One-based turn number.
        turn: u64,
        /// Whether the turn took the pending-skill detour.
        skill_detour: bool,
    },

    /// A turn sequence stopped before completion.
    TurnAbandoned {
        /// When the turn stopped.
        timestamp: DateTime<Utc>,
        /// One-based turn number.
        turn: u64,
        /// Why the turn stopped.
        reason: String,
    },

    /// A watchdog budget was exceeded and its recovery ran.
    WatchdogFired {
        /// When the watchdog fired.
        timestamp: DateTime<Utc>,
        /// Watchdog name.
        watchdog: String,
        /// Phase at the time it fired.
        phase: BattlePhase,
    },

    /// The skill follow-up finished and handed the turn to the enemy.
    SkillFollowupResolved {
        /// When the follow-up resolved.
        timestamp: DateTime<Utc>,
        /// Entry point that resolved it.
        source: String,
    },
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

/// Wraps an [`Event`] with a monotonically increasing sequence number.
#[derive(Debug, Serialize)]
struct EventEnvelope {
    /// Zero-based, monotonically increasing sequence counter.
    sequence: u64,
    /// The wrapped event (flattened into the same JSON object).
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Serialization or I/O failures are dropped; the event stream never
/// interferes with the battle.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates an emitter that discards all events.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        // Numbered under the writer lock so file order matches sequence order.
        if let Ok(mut w) = self.writer.lock() {
            let envelope = EventEnvelope {
                sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
                event,
            };
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }

    /// Returns the number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::noop()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex as StdMutex};

    use super::*;

    #[derive(Clone)]
    struct TestWriter(Arc<StdMutex<Vec<u8>>>);

    impl TestWriter {
        fn new() -> Self {
            Self(Arc::new(StdMutex::new(Vec::new())))
        }

        fn contents(&self) -> String {
            let buf = self.0.lock().unwrap();
            String::from_utf8_lossy(&buf).into_owned()
        }
    }

    impl Write for TestWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn phase_entered() -> Event {
        Event::PhaseEntered {
            timestamp: DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            from: BattlePhase::PlayerAttack,
            to: BattlePhase::EnemyAttack,
            forced: false,
        }
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let json = serde_json::to_string(&phase_entered()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["type"], "PhaseEntered");
        assert_eq!(parsed["from"], "player_attack");
        assert_eq!(parsed["to"], "enemy_attack");
    }

    #[test]
    fn emitter_writes_sequenced_jsonl() {
        let tw = TestWriter::new();
        let emitter = EventEmitter::new(Box::new(tw.clone()));
        emitter.emit(phase_entered());
        emitter.emit(Event::WatchdogFired {
            timestamp: Utc::now(),
            watchdog: "enemy_attack".to_owned(),
            phase: BattlePhase::EnemyAttack,
        });

        assert_eq!(emitter.event_count(), 2);

        let lines: Vec<serde_json::Value> = tw
            .contents()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0]["sequence"], 0);
        assert_eq!(lines[0]["type"], "PhaseEntered");
        assert_eq!(lines[1]["sequence"], 1);
        assert_eq!(lines[1]["watchdog"], "enemy_attack");
        assert!(lines[1].get("event").is_none());
    }

    #[test]
    fn noop_emitter_still_counts() {
        let emitter = EventEmitter::noop();
        emitter.emit(Event::OperationRejected {
            timestamp: Utc::now(),
            reason: "duplicate".to_owned(),
        });
        assert_eq!(emitter.event_count(), 1);
    }
}
