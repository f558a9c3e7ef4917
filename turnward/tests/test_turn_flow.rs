mod common;

use std::time::Duration;

use common::Harness;
use turnward::BattlePhase;
use turnward::battle::{Admission, RejectReason, TurnOutcome};
use turnward::collaborators::SkillQueue;
use turnward::sim::SimOptions;

#[tokio::test(start_paused = true)]
async fn first_turn_skips_countdown_and_cooldown_follows() {
    let h = Harness::new(SimOptions {
        enemy_countdown: 0,
        ..SimOptions::default()
    });
    assert!(h.battle.start());

    h.play_move();
    h.wait_for_turns(1).await;

    // Counter already at zero, so the enemy attacks even on the first turn.
    assert_eq!(h.sim.player.attacks(), 1);
    assert_eq!(h.sim.enemy.attacks(), 1);
    assert_eq!(h.battle.current_phase(), BattlePhase::BattleInProgress);
    assert!(!h.sim.input.is_blocked());

    let status = h.status();
    assert!(status.gate.input_cooldown);
    assert!(!status.gate.user_operation_in_flight);
    assert!(!status.gate.turn_transition_in_flight);
    assert_eq!(status.epoch, 0);

    assert_eq!(
        h.battle.notify_user_operation(),
        Admission::Rejected(RejectReason::InputCooldown)
    );
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.battle.notify_user_operation(), Admission::Accepted);
}

#[tokio::test(start_paused = true)]
async fn turn_walks_the_expected_phases() {
    let h = Harness::new(SimOptions::default());
    h.battle.start();

    h.play_move();
    h.wait_for_turns(1).await;

    assert_eq!(
        h.log.phases_entered(),
        [
            "puzzle_matching",
            "player_attack",
            "enemy_attack",
            "battle_in_progress"
        ]
    );
    // First turn leaves the countdown untouched, so nobody attacks.
    assert_eq!(h.sim.enemy.attacks(), 0);

    let completed = h.log.of_type("TurnCompleted");
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0]["turn"], 1);
    assert_eq!(completed[0]["skill_detour"], false);
}

#[tokio::test(start_paused = true)]
async fn enemy_attacks_when_countdown_runs_out() {
    let h = Harness::new(SimOptions {
        enemy_countdown: 2,
        drops: 1,
        drop_interval: 2,
        ..SimOptions::default()
    });
    h.battle.start();

    for turn in 1..=3 {
        h.wait_for("ready for input", |s| {
            s.phase == BattlePhase::BattleInProgress
                && !s.gate.input_cooldown
                && !s.gate.turn_transition_in_flight
        })
        .await;
        h.play_move();
        h.wait_for_turns(turn).await;
    }

    // Turn 1 skips the countdown, turn 2 takes it to 1, turn 3 to 0.
    assert_eq!(h.sim.enemy.attacks(), 1);
    assert_eq!(h.sim.player.attacks(), 3);
    // The drop counts down every enemy turn and acts on the second.
    assert_eq!(h.sim.drops.drops()[0].actions(), 1);

    let status = h.status();
    assert_eq!(status.turns_started, 3);
    assert_eq!(status.turns_abandoned, 0);
    assert_eq!(status.watchdog_fires.turn_transition, 0);
    assert_eq!(status.watchdog_fires.enemy_attack, 0);
}

#[tokio::test(start_paused = true)]
async fn pending_skills_run_before_the_enemy() {
    let h = Harness::new(SimOptions::default());
    h.battle.start();
    h.sim.skills.reserve(2);

    h.play_move();
    h.wait_for("enemy attack", |s| s.phase == BattlePhase::EnemyAttack)
        .await;
    assert!(!h.sim.skills.has_pending_skills());
    assert_eq!(h.sim.skills.executed(), 2);
    h.wait_for_turns(1).await;

    assert_eq!(
        h.log.phases_entered(),
        [
            "puzzle_matching",
            "player_attack",
            "skill_animation",
            "skill_after_process",
            "enemy_attack",
            "battle_in_progress"
        ]
    );
    assert!(h.battle.followup_holder().is_none());

    let completed = h.log.of_type("TurnCompleted");
    assert_eq!(completed[0]["skill_detour"], true);
}

#[tokio::test(start_paused = true)]
async fn skill_events_during_a_turn_do_not_double_enter_enemy_attack() {
    let h = Harness::new(SimOptions::default());
    h.sim.skills.report_to(h.battle.handle());
    h.battle.start();
    h.sim.skills.reserve(2);

    h.play_move();
    h.wait_for_turns(1).await;
    // Let any follow-up still sleeping finish.
    tokio::time::sleep(Duration::from_secs(10)).await;

    let entered = h.log.phases_entered();
    assert_eq!(entered.iter().filter(|p| *p == "enemy_attack").count(), 1);
    assert!(h.log.of_type("SkillFollowupResolved").is_empty());
    assert!(h.log.of_type("TransitionDenied").is_empty());
    assert!(!h.status().gate.skill_followup);
    assert_eq!(h.battle.current_phase(), BattlePhase::BattleInProgress);
}

#[tokio::test(start_paused = true)]
async fn second_match_while_turn_runs_is_ignored() {
    let h = Harness::new(SimOptions::default());
    h.battle.start();

    h.play_move();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(h.battle.handle().match_completed());
    h.wait_for_turns(1).await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    let status = h.status();
    assert_eq!(status.turns_started, 1);
    assert_eq!(h.sim.player.attacks(), 1);
}

#[tokio::test(start_paused = true)]
async fn skills_reserved_late_start_the_next_animation() {
    let h = Harness::new(SimOptions {
        enemy_countdown: 0,
        ..SimOptions::default()
    });
    h.battle.start();

    h.play_move();
    // Reserved while the enemy resolves, after the detour check.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(h.battle.current_phase(), BattlePhase::EnemyAttack);
    h.sim.skills.reserve(1);

    h.wait_for_turns(1).await;
    assert_eq!(h.battle.current_phase(), BattlePhase::SkillAnimation);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.sim.skills.executed(), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_a_running_turn() {
    let h = Harness::new(SimOptions::default());
    h.battle.start();

    h.play_move();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.battle.current_phase(), BattlePhase::PlayerAttack);
    h.battle.stop();

    tokio::time::sleep(Duration::from_secs(30)).await;
    let status = h.status();
    assert_eq!(status.phase, BattlePhase::PlayerAttack);
    assert_eq!(status.turns_completed, 0);
    assert_eq!(status.watchdog_fires.turn_transition, 0);
    assert!(!h.battle.start());
    assert_eq!(h.log.of_type("BattleStopped").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn match_during_skill_handover_leaves_the_enemy_alone() {
    let h = Harness::new(SimOptions {
        enemy_countdown: 0,
        ..SimOptions::default()
    });
    h.battle.start();

    assert!(h.battle.start_skill_processing());
    assert!(h.battle.handle().skill_animation_completed());
    h.wait_for("enemy attack", |s| s.phase == BattlePhase::EnemyAttack)
        .await;

    // Nothing is waiting for a move while the enemy resolves.
    assert!(h.battle.handle().match_completed());
    h.wait_for("battle in progress", |s| {
        s.phase == BattlePhase::BattleInProgress
    })
    .await;

    assert_eq!(h.sim.enemy.attacks(), 1);
    assert_eq!(
        h.log.phases_entered(),
        [
            "skill_animation",
            "skill_after_process",
            "enemy_attack",
            "battle_in_progress"
        ]
    );
    let status = h.status();
    assert_eq!(status.epoch, 0);
    assert_eq!(status.turns_started, 0);
    assert_eq!(status.turns_abandoned, 0);
    assert!(!status.gate.turn_transition_in_flight);
    assert!(h.log.of_type("TransitionDenied").is_empty());
    assert_eq!(h.log.of_type("SkillFollowupResolved").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn turn_outside_battle_in_progress_touches_nothing() {
    let h = Harness::new(SimOptions::default());
    h.battle.start();
    assert!(h.battle.start_skill_processing());
    let writes = h.sim.input.writes();

    let outcome = std::sync::Arc::clone(&h.battle).run_turn().await;
    assert_eq!(outcome, TurnOutcome::WrongPhase(BattlePhase::SkillAnimation));

    assert!(h.battle.handle().match_completed());
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(h.battle.current_phase(), BattlePhase::SkillAnimation);
    assert_eq!(h.sim.input.writes(), writes);
    let status = h.status();
    assert_eq!(status.epoch, 0);
    assert_eq!(status.turns_started, 0);
    assert!(!status.gate.turn_transition_in_flight);
    assert!(status.gate.skill_followup);
    assert!(h.log.of_type("TransitionDenied").is_empty());
}
