//! Applying a finished battle to the snapshot.
use serde::{Deserialize, Serialize};

use crate::battle::{Battle, BattleOutcome, CombatDice};
use crate::catalog::{Catalog, StageId};
use crate::constants::{
    LOG_REWARD_BOSS, LOG_REWARD_GEMS, LOG_REWARD_GOLD, LOG_REWARD_LEVEL_UP, LOG_REWARD_LOST,
    LOG_REWARD_STAGE, LOG_REWARD_WORLD, LOG_REWARD_XP,
};
use crate::error::{ActionError, GameError, Shortfall};
use crate::progression::grant_xp;
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RewardEvent {
    Gold { amount: u64 },
    Xp { amount: u64 },
    Gems { amount: u64 },
    LevelUp { level: u32 },
    StageCleared { stage: StageId, first_clear: bool },
    WorldUnlocked { world: u8 },
    BossDefeated { stage: StageId },
    BattleLost { stage: StageId },
}

impl RewardEvent {
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Gold { .. } => LOG_REWARD_GOLD,
            Self::Xp { .. } => LOG_REWARD_XP,
            Self::Gems { .. } => LOG_REWARD_GEMS,
            Self::LevelUp { .. } => LOG_REWARD_LEVEL_UP,
            Self::StageCleared { .. } => LOG_REWARD_STAGE,
            Self::WorldUnlocked { .. } => LOG_REWARD_WORLD,
            Self::BossDefeated { .. } => LOG_REWARD_BOSS,
            Self::BattleLost { .. } => LOG_REWARD_LOST,
        }
    }
}

/// Fold a finished battle into `snapshot` and mark the battle committed.
///
/// The stamina cost is charged for either outcome. Victory credits the stage
/// reward, grants xp and advances progression; defeat only counts the loss.
/// Hp and battle effects never leave the battle. The changes are built on a
/// copy and swapped in whole, so a rejected commit leaves both the snapshot
/// and the battle as they were.
///
/// # Errors
///
/// `InvalidAction(BattleNotFinished)` while the battle is still running,
/// `InvalidAction(AlreadyCommitted)` for a second commit of the same battle,
/// `InvalidAction(StageLocked)` when the stage is no longer playable on this
/// snapshot, and `InsufficientResource(Stamina)` when the bar cannot cover
/// the battle cost.
pub fn commit_battle<D: CombatDice>(
    snapshot: &mut Snapshot,
    catalog: &Catalog,
    battle: &mut Battle<D>,
) -> Result<Vec<RewardEvent>, GameError> {
    if battle.is_committed() {
        return Err(ActionError::AlreadyCommitted.into());
    }
    let Some(outcome) = battle.outcome() else {
        return Err(ActionError::BattleNotFinished.into());
    };
    let stage = battle.stage();
    if !snapshot.progress.is_playable(catalog, stage) {
        return Err(ActionError::StageLocked(stage).into());
    }
    let cost = catalog.stamina.battle_cost;
    if snapshot.stamina.current < cost {
        return Err(Shortfall::Stamina {
            needed: cost,
            available: snapshot.stamina.current,
        }
        .into());
    }

    let mut next = snapshot.clone();
    let mut events = Vec::new();
    next.stamina.current -= cost;
    next.stats.stamina_spent = next.stats.stamina_spent.saturating_add(u64::from(cost));

    match outcome {
        BattleOutcome::Victory => {
            let reward = catalog.stage_reward(stage);
            next.inventory.gold = next.inventory.gold.saturating_add(reward.gold);
            next.stats.gold_earned = next.stats.gold_earned.saturating_add(reward.gold);
            events.push(RewardEvent::Gold {
                amount: reward.gold,
            });
            events.push(RewardEvent::Xp { amount: reward.xp });
            if reward.gems > 0 {
                next.inventory.gems = next.inventory.gems.saturating_add(reward.gems);
                next.stats.gems_earned = next.stats.gems_earned.saturating_add(reward.gems);
                events.push(RewardEvent::Gems {
                    amount: reward.gems,
                });
            }

            let start_level = next.player.level;
            let level_ups = grant_xp(&mut next, catalog, reward.xp);
            events.extend((1..=level_ups).map(|step| RewardEvent::LevelUp {
                level: start_level + step,
            }));

            let clear = next.progress.complete_stage(catalog, stage);
            events.push(RewardEvent::StageCleared {
                stage,
                first_clear: clear.first_clear,
            });
            if let Some(world) = clear.world_unlocked {
                events.push(RewardEvent::WorldUnlocked { world });
            }
            if clear.boss {
                events.push(RewardEvent::BossDefeated { stage });
            }
            next.stats.battles_won += 1;
        }
        BattleOutcome::Defeat => {
            next.stats.battles_lost += 1;
            events.push(RewardEvent::BattleLost { stage });
        }
    }

    next.player.active_effects.clear();
    next.player.restore_full_hp(catalog);
    *snapshot = next;
    battle.mark_committed();
    log::info!(
        "committed {outcome:?} at {stage}: {} reward events, level {}",
        events.len(),
        snapshot.player.level
    );
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::{AlwaysAttack, BattleAction, BattleOptions, ScriptedDice};

    fn won_battle(snapshot: &Snapshot, catalog: &Catalog, stage: StageId) -> Battle<ScriptedDice> {
        let mut strong = snapshot.clone();
        strong.player.attack = 10_000;
        let mut battle = Battle::enter_with_dice(
            &strong,
            catalog,
            stage,
            BattleOptions::default(),
            ScriptedDice::neutral(),
        )
        .unwrap();
        battle.submit_action(&BattleAction::Attack).unwrap();
        assert_eq!(battle.outcome(), Some(BattleOutcome::Victory));
        battle
    }

    #[test]
    fn unfinished_battle_cannot_commit() {
        let catalog = Catalog::builtin();
        let mut snapshot = Snapshot::new(&catalog, "Aria", 0, "d");
        let mut battle =
            Battle::enter(&snapshot, &catalog, StageId::new(0, 1), BattleOptions::default()).unwrap();
        let before = snapshot.clone();
        assert!(matches!(
            commit_battle(&mut snapshot, &catalog, &mut battle),
            Err(GameError::InvalidAction(ActionError::BattleNotFinished))
        ));
        assert_eq!(snapshot, before);
        assert!(!battle.is_committed());
    }

    #[test]
    fn battle_commits_only_once() {
        let catalog = Catalog::builtin();
        let mut snapshot = Snapshot::new(&catalog, "Aria", 0, "d");
        let mut battle = won_battle(&snapshot, &catalog, StageId::new(0, 1));
        commit_battle(&mut snapshot, &catalog, &mut battle).unwrap();
        assert!(battle.is_committed());

        let after_first = snapshot.clone();
        assert!(matches!(
            commit_battle(&mut snapshot, &catalog, &mut battle),
            Err(GameError::InvalidAction(ActionError::AlreadyCommitted))
        ));
        assert_eq!(snapshot, after_first);
        assert_eq!(snapshot.stats.battles_won, 1);
    }

    #[test]
    fn empty_stamina_rejects_commit() {
        let catalog = Catalog::builtin();
        let mut snapshot = Snapshot::new(&catalog, "Aria", 0, "d");
        snapshot.stamina.current = 1;
        let mut first = won_battle(&snapshot, &catalog, StageId::new(0, 1));
        let mut second = won_battle(&snapshot, &catalog, StageId::new(0, 1));

        commit_battle(&mut snapshot, &catalog, &mut first).unwrap();
        assert_eq!(snapshot.stamina.current, 0);
        let before = snapshot.clone();
        let err = commit_battle(&mut snapshot, &catalog, &mut second).unwrap_err();
        assert!(matches!(
            err,
            GameError::InsufficientResource(Shortfall::Stamina {
                needed: 1,
                available: 0
            })
        ));
        assert_eq!(snapshot, before);
        assert!(!second.is_committed());
        assert_eq!(snapshot.inventory.gold, catalog.stage_reward(StageId::new(0, 1)).gold);
    }

    #[test]
    fn locked_stage_rejects_commit() {
        let catalog = Catalog::builtin();
        let mut unlocked = Snapshot::new(&catalog, "Aria", 0, "d");
        unlocked.progress.current_stage = 3;
        let mut battle = won_battle(&unlocked, &catalog, StageId::new(0, 3));

        let mut fresh = Snapshot::new(&catalog, "Aria", 0, "d");
        let before = fresh.clone();
        assert!(matches!(
            commit_battle(&mut fresh, &catalog, &mut battle),
            Err(GameError::InvalidAction(ActionError::StageLocked(stage))) if stage == StageId::new(0, 3)
        ));
        assert_eq!(fresh, before);
    }

    #[test]
    fn boss_victory_levels_up_and_pays_gems() {
        let catalog = Catalog::builtin();
        let mut snapshot = Snapshot::new(&catalog, "Aria", 0, "d");
        snapshot.progress.current_stage = 5;
        snapshot.player.xp = 80;
        let mut battle = won_battle(&snapshot, &catalog, StageId::new(0, 5));

        let events = commit_battle(&mut snapshot, &catalog, &mut battle).unwrap();
        assert_eq!(snapshot.player.level, 2);
        assert_eq!(snapshot.player.xp, 30);
        assert_eq!(snapshot.player.max_hp, 110);
        assert_eq!(snapshot.player.hp, 110);
        assert_eq!(snapshot.inventory.gems, 1);
        assert_eq!(snapshot.inventory.gold, 10 + 5 + 10);
        assert!(snapshot.progress.bosses_defeated.contains(&StageId::new(0, 5)));
        assert_eq!(snapshot.progress.cursor(), StageId::new(0, 6));
        assert_eq!(snapshot.stamina.current, 9);
        assert_eq!(snapshot.stats.battles_won, 1);
        assert_eq!(
            events,
            vec![
                RewardEvent::Gold { amount: 25 },
                RewardEvent::Xp { amount: 50 },
                RewardEvent::Gems { amount: 1 },
                RewardEvent::LevelUp { level: 2 },
                RewardEvent::StageCleared {
                    stage: StageId::new(0, 5),
                    first_clear: true
                },
                RewardEvent::BossDefeated {
                    stage: StageId::new(0, 5)
                },
            ]
        );
    }

    #[test]
    fn defeat_only_counts_the_loss() {
        let catalog = Catalog::builtin();
        let mut snapshot = Snapshot::new(&catalog, "Aria", 0, "d");
        let mut weak = snapshot.clone();
        weak.player.attack = 0;
        let mut battle = Battle::enter(
            &weak,
            &catalog,
            StageId::new(0, 1),
            BattleOptions::with_seed(5),
        )
        .unwrap();
        battle.auto_resolve(&mut AlwaysAttack);
        assert_eq!(battle.outcome(), Some(BattleOutcome::Defeat));

        let events = commit_battle(&mut snapshot, &catalog, &mut battle).unwrap();
        assert_eq!(
            events,
            vec![RewardEvent::BattleLost {
                stage: StageId::new(0, 1)
            }]
        );
        assert_eq!(snapshot.stats.battles_lost, 1);
        assert_eq!(snapshot.inventory.gold, 0);
        assert_eq!(snapshot.progress.cursor(), StageId::new(0, 1));
        assert_eq!(snapshot.player.hp, 100);
    }

    #[test]
    fn world_boundary_emits_unlock() {
        let catalog = Catalog::builtin();
        let mut snapshot = Snapshot::new(&catalog, "Aria", 0, "d");
        snapshot.progress.current_stage = 30;
        let mut battle = won_battle(&snapshot, &catalog, StageId::new(0, 30));
        let events = commit_battle(&mut snapshot, &catalog, &mut battle).unwrap();
        assert!(events.contains(&RewardEvent::WorldUnlocked { world: 1 }));
        assert_eq!(snapshot.progress.worlds_unlocked, 2);
    }
}
