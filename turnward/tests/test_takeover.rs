mod common;

use std::time::Duration;

use common::Harness;
use turnward::BattlePhase;
use turnward::battle::{Admission, RejectReason};
use turnward::sim::SimOptions;

#[tokio::test(start_paused = true)]
async fn passive_orchestrator_ignores_everything() {
    let h = Harness::new(SimOptions::default());
    h.battle.start();
    h.battle.set_new_system_active(true);

    assert_eq!(
        h.battle.notify_user_operation(),
        Admission::Rejected(RejectReason::Takeover)
    );
    assert!(!h.battle.try_transition(BattlePhase::PuzzleMatching));
    assert!(!h.battle.start_skill_processing());
    assert!(!h.battle.ensure_correct_state());

    // Events are dropped rather than queued.
    assert!(h.battle.handle().match_completed());
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.status().turns_started, 0);
    assert_eq!(h.battle.current_phase(), BattlePhase::BattleInProgress);
    assert!(h.log.of_type("TransitionDenied").is_empty());
}

#[tokio::test(start_paused = true)]
async fn external_phase_is_mirrored_and_watchdogs_stay_quiet() {
    let h = Harness::new(SimOptions::default());
    h.battle.start();

    // Mirroring only applies while passive.
    assert!(!h.battle.sync_phase_from_external(BattlePhase::EnemyAttack));
    assert_eq!(h.battle.current_phase(), BattlePhase::BattleInProgress);

    h.battle.set_new_system_active(true);
    assert!(h.battle.sync_phase_from_external(BattlePhase::EnemyAttack));
    assert_eq!(h.battle.current_phase(), BattlePhase::EnemyAttack);

    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(h.battle.current_phase(), BattlePhase::EnemyAttack);
    assert_eq!(h.status().watchdog_fires.enemy_attack, 0);

    // Taking the battle back lets the manual repair act.
    h.battle.set_new_system_active(false);
    assert!(h.battle.ensure_correct_state());
    assert_eq!(h.battle.current_phase(), BattlePhase::BattleInProgress);
}

#[tokio::test(start_paused = true)]
async fn takeover_mid_turn_abandons_it_and_release_clears_flags() {
    let h = Harness::new(SimOptions::default());
    h.battle.start();

    h.play_move();
    tokio::time::sleep(Duration::from_secs(1)).await;
    h.battle.set_new_system_active(true);
    tokio::time::sleep(Duration::from_secs(10)).await;

    let status = h.status();
    assert_eq!(status.turns_abandoned, 1);
    assert_eq!(status.phase, BattlePhase::PlayerAttack);
    // The other owner may still rely on these.
    assert!(status.gate.turn_transition_in_flight);

    h.battle.set_new_system_active(false);
    let status = h.status();
    assert!(!status.gate.turn_transition_in_flight);
    assert!(!status.gate.user_operation_in_flight);
    assert!(!status.takeover);
}
