//! Battle phase enumeration.
//!
//! Exactly one [`BattlePhase`] is active at any instant. The runtime
//! stores it as a `u8` ordinal inside an atomic register, so the
//! ordinal mapping here is part of the contract.

use serde::{Deserialize, Serialize};

/// One discrete, mutually exclusive stage of battle progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum BattlePhase {
    /// Screen fade before anything is shown.
    FadeOut,
    /// "Battle N Start" banner.
    BattleStartText,
    /// Player characters entering.
    PlayerSpawn,
    /// Enemies entering.
    EnemySpawn,
    /// Deck placed on the board.
    DeckPlacement,
    /// Puzzle grid being generated; no player input.
    PuzzleGenerating,
    /// Matching engine resolving the player's move.
    PuzzleMatching,
    /// Player characters attacking.
    PlayerAttack,
    /// Enemy turn resolution.
    EnemyAttack,
    /// Enemy initial skill; no player input.
    EnemySkill,
    /// Pending skills animating.
    SkillAnimation,
    /// Board settling after a skill animation.
    SkillAfterProcess,
    /// Idle, waiting for the next player operation.
    BattleInProgress,
}

impl BattlePhase {
    /// All phases in ordinal order.
    pub const ALL: [Self; 13] = [
        Self::FadeOut,
        Self::BattleStartText,
        Self::PlayerSpawn,
        Self::EnemySpawn,
        Self::DeckPlacement,
        Self::PuzzleGenerating,
        Self::PuzzleMatching,
        Self::PlayerAttack,
        Self::EnemyAttack,
        Self::EnemySkill,
        Self::SkillAnimation,
        Self::SkillAfterProcess,
        Self::BattleInProgress,
    ];

    /// Returns the ordinal used for atomic storage.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Inverse of [`ordinal`](Self::ordinal).
    #[must_use]
    pub const fn from_ordinal(ordinal: u8) -> Option<Self> {
        if (ordinal as usize) < Self::ALL.len() {
            Some(Self::ALL[ordinal as usize])
        } else {
            None
        }
    }

    /// Stable `snake_case` name, also used as a metrics label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FadeOut => "fade_out",
            Self::BattleStartText => "battle_start_text",
            Self::PlayerSpawn => "player_spawn",
            Self::EnemySpawn => "enemy_spawn",
            Self::DeckPlacement => "deck_placement",
            Self::PuzzleGenerating => "puzzle_generating",
            Self::PuzzleMatching => "puzzle_matching",
            Self::PlayerAttack => "player_attack",
            Self::EnemyAttack => "enemy_attack",
            Self::EnemySkill => "enemy_skill",
            Self::SkillAnimation => "skill_animation",
            Self::SkillAfterProcess => "skill_after_process",
            Self::BattleInProgress => "battle_in_progress",
        }
    }

    /// Whether a turn is actively resolving attacks in this phase.
    ///
    /// The user-operation watchdog never forces these phases back to
    /// [`BattlePhase::BattleInProgress`]; their own watchdogs own them.
    #[must_use]
    pub const fn is_attack_resolution(self) -> bool {
        matches!(
            self,
            Self::PlayerAttack | Self::EnemyAttack | Self::SkillAnimation
        )
    }

    /// Phases the stuck-phase recovery is allowed to unwind.
    #[must_use]
    pub const fn is_stuck_recoverable(self) -> bool {
        matches!(self, Self::PlayerAttack | Self::EnemyAttack | Self::EnemySkill)
    }
}

impl std::fmt::Display for BattlePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinal_round_trips_for_every_phase() {
        for phase in BattlePhase::ALL {
            assert_eq!(BattlePhase::from_ordinal(phase.ordinal()), Some(phase));
        }
    }

    #[test]
    fn out_of_range_ordinal_is_none() {
        assert_eq!(BattlePhase::from_ordinal(13), None);
        assert_eq!(BattlePhase::from_ordinal(u8::MAX), None);
    }

    #[test]
    fn display_matches_serde_name() {
        let json = serde_json::to_string(&BattlePhase::SkillAfterProcess).unwrap();
        assert_eq!(json, "\"skill_after_process\"");
        assert_eq!(BattlePhase::SkillAfterProcess.to_string(), "skill_after_process");
    }

    #[test]
    fn attack_resolution_set() {
        assert!(BattlePhase::PlayerAttack.is_attack_resolution());
        assert!(BattlePhase::EnemyAttack.is_attack_resolution());
        assert!(BattlePhase::SkillAnimation.is_attack_resolution());
        assert!(!BattlePhase::EnemySkill.is_attack_resolution());
        assert!(!BattlePhase::BattleInProgress.is_attack_resolution());
    }

    #[test]
    fn stuck_recoverable_set() {
        assert!(BattlePhase::EnemySkill.is_stuck_recoverable());
        assert!(!BattlePhase::SkillAnimation.is_stuck_recoverable());
        assert!(!BattlePhase::PuzzleMatching.is_stuck_recoverable());
    }
}
