mod common;

use std::time::Duration;

use common::Harness;
use turnward::BattlePhase;
use turnward::battle::{Admission, RejectReason};
use turnward::sim::SimOptions;

#[tokio::test(start_paused = true)]
async fn animation_completed_hands_the_battle_to_the_enemy() {
    let h = Harness::new(SimOptions::default());
    h.battle.start();

    assert!(h.battle.start_skill_processing());
    assert!(h.battle.is_matching_after_skill());
    assert_eq!(
        h.battle.notify_user_operation(),
        Admission::Rejected(RejectReason::SkillFollowup)
    );

    assert!(h.battle.handle().skill_animation_completed());
    tokio::time::sleep(Duration::from_secs(6)).await;

    assert_eq!(
        h.log.phases_entered(),
        [
            "skill_animation",
            "skill_after_process",
            "enemy_attack",
            "battle_in_progress"
        ]
    );
    assert!(!h.battle.is_matching_after_skill());
    assert!(h.battle.followup_holder().is_none());

    let resolved = h.log.of_type("SkillFollowupResolved");
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0]["source"], "animation_completed");
}

#[tokio::test(start_paused = true)]
async fn animation_started_clears_the_followup_flag() {
    let h = Harness::new(SimOptions::default());
    h.battle.start();

    assert!(h.battle.start_skill_processing());
    assert!(h.battle.handle().skill_animation_started());
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!h.battle.is_matching_after_skill());
}

#[tokio::test(start_paused = true)]
async fn unsubscribed_orchestrator_ignores_skill_events() {
    let h = Harness::new(SimOptions::default());
    h.battle.start();
    h.battle.unsubscribe_from_skill_events();

    assert!(h.battle.start_skill_processing());
    assert!(h.battle.handle().skill_animation_completed());
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(h.battle.current_phase(), BattlePhase::SkillAnimation);
    assert!(h.log.of_type("SkillFollowupResolved").is_empty());
}

#[tokio::test(start_paused = true)]
async fn after_process_monitor_proceeds_to_the_enemy() {
    let h = Harness::new(SimOptions::default());
    h.battle.start();

    assert!(h.battle.start_skill_processing());
    h.battle.start_skill_after_process_monitoring();
    tokio::time::sleep(Duration::from_secs(4)).await;

    assert_eq!(h.battle.current_phase(), BattlePhase::BattleInProgress);
    let resolved = h.log.of_type("SkillFollowupResolved");
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0]["source"], "after_process");
}

#[tokio::test(start_paused = true)]
async fn after_process_monitor_runs_remaining_skills() {
    let h = Harness::new(SimOptions::default());
    h.battle.start();
    h.sim.skills.reserve(1);

    assert!(h.battle.start_skill_processing());
    h.battle.start_skill_after_process_monitoring();
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(h.sim.skills.executed(), 1);
    assert_eq!(h.battle.current_phase(), BattlePhase::SkillAnimation);
    assert!(h.log.of_type("SkillFollowupResolved").is_empty());
}

#[tokio::test(start_paused = true)]
async fn setter_starts_a_followup() {
    let h = Harness::new(SimOptions::default());
    h.battle.start();

    assert!(h.battle.try_transition(BattlePhase::SkillAnimation));
    h.battle.set_matching_after_skill(true);
    assert!(h.battle.is_matching_after_skill());
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(!h.battle.is_matching_after_skill());
    let resolved = h.log.of_type("SkillFollowupResolved");
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0]["source"], "setter");
}

#[tokio::test(start_paused = true)]
async fn followup_outside_skill_phases_only_clears_the_flag() {
    let h = Harness::new(SimOptions::default());
    h.battle.start();

    h.battle.set_matching_after_skill(true);
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert!(!h.battle.is_matching_after_skill());
    assert_eq!(h.battle.current_phase(), BattlePhase::BattleInProgress);
    assert!(h.log.phases_entered().is_empty());
}
