//! Experience curve, level growth, and the world/stage cursor.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::catalog::{Catalog, StageId};
use crate::player::Player;
use crate::snapshot::Snapshot;

/// Campaign position and clear history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// 0-based world of the cursor.
    pub current_world: u8,
    /// 1-based stage of the cursor.
    pub current_stage: u8,
    pub worlds_unlocked: u8,
    #[serde(default)]
    pub stages_completed: BTreeSet<StageId>,
    #[serde(default)]
    pub bosses_defeated: BTreeSet<StageId>,
    #[serde(default)]
    pub highest_stage_index: u32,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            current_world: 0,
            current_stage: 1,
            worlds_unlocked: 1,
            stages_completed: BTreeSet::new(),
            bosses_defeated: BTreeSet::new(),
            highest_stage_index: 0,
        }
    }
}

/// What a stage clear changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageClear {
    pub first_clear: bool,
    pub boss: bool,
    /// Newly unlocked 0-based world, if the clear crossed a world boundary.
    pub world_unlocked: Option<u8>,
}

impl Progress {
    #[must_use]
    pub const fn cursor(&self) -> StageId {
        StageId::new(self.current_world, self.current_stage)
    }

    /// Whether `stage` may be entered from the current cursor.
    #[must_use]
    pub fn is_playable(&self, catalog: &Catalog, stage: StageId) -> bool {
        if !catalog.contains_stage(stage) || stage.world >= self.worlds_unlocked {
            return false;
        }
        stage.world < self.current_world
            || (stage.world == self.current_world && stage.stage <= self.current_stage)
    }

    /// Record a cleared stage and advance the cursor when the cursor itself
    /// was cleared. On the very last stage the cursor stays pinned.
    pub fn complete_stage(&mut self, catalog: &Catalog, stage: StageId) -> StageClear {
        let stages_per_world = catalog.world.stages_per_world;
        let mut clear = StageClear {
            first_clear: self.stages_completed.insert(stage),
            boss: catalog.is_boss_stage(stage.stage),
            world_unlocked: None,
        };
        if clear.boss {
            self.bosses_defeated.insert(stage);
        }
        let linear =
            u32::from(stage.world) * u32::from(stages_per_world) + u32::from(stage.stage);
        self.highest_stage_index = self.highest_stage_index.max(linear);

        if stage != self.cursor() {
            return clear;
        }
        if stage.stage < stages_per_world {
            self.current_stage = stage.stage + 1;
        } else if self.current_world.saturating_add(1) < catalog.world.worlds {
            self.current_world += 1;
            self.current_stage = 1;
            let unlocked = self.current_world + 1;
            if unlocked > self.worlds_unlocked {
                self.worlds_unlocked = unlocked;
                clear.world_unlocked = Some(self.current_world);
            }
        }
        clear
    }

    /// Repair a cursor that points outside the configured campaign.
    pub fn normalize(&mut self, catalog: &Catalog) {
        let last = catalog.final_stage();
        if self.current_world > last.world {
            self.current_world = last.world;
            self.current_stage = last.stage;
        }
        self.current_stage = self.current_stage.clamp(1, catalog.world.stages_per_world);
        self.worlds_unlocked = self
            .worlds_unlocked
            .max(self.current_world + 1)
            .min(catalog.world.worlds);
    }
}

/// Add xp to `player`, levelling up while the requirement is met.
///
/// Each level applies the catalogue growth and refills hp. At the level cap
/// xp is kept just below the next requirement. Returns the number of
/// level-ups.
pub fn apply_xp(player: &mut Player, catalog: &Catalog, amount: u64) -> u32 {
    let max_level = catalog.progression.max_level;
    player.xp = player.xp.saturating_add(amount);
    let mut level_ups = 0;
    while player.level < max_level {
        let needed = catalog.xp_to_next(player.level);
        if player.xp < needed {
            break;
        }
        player.xp -= needed;
        player.level += 1;
        level_ups += 1;
    }
    if player.level >= max_level {
        let cap = catalog.xp_to_next(max_level).saturating_sub(1);
        player.xp = player.xp.min(cap);
    }
    if level_ups > 0 {
        player.recompute_base_stats(catalog);
        player.restore_full_hp(catalog);
        log::debug!("level up x{level_ups} to {}", player.level);
    }
    level_ups
}

/// Snapshot-level xp grant that also feeds the lifetime counters.
pub fn grant_xp(snapshot: &mut Snapshot, catalog: &Catalog, amount: u64) -> u32 {
    snapshot.stats.xp_earned = snapshot.stats.xp_earned.saturating_add(amount);
    apply_xp(&mut snapshot.player, catalog, amount)
}
