//! Battle data: sides, phases, options, actions and events.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::{Catalog, EnemyProfile, SkillEffect, SkillId};
use crate::constants::{
    DEFAULT_MAX_TURNS, LOG_BATTLE_ATTACK, LOG_BATTLE_CRITICAL, LOG_BATTLE_DEFEAT,
    LOG_BATTLE_DEFEND, LOG_BATTLE_ENTER, LOG_BATTLE_EXPIRED, LOG_BATTLE_HEAL, LOG_BATTLE_SKILL,
    LOG_BATTLE_TURN, LOG_BATTLE_TURN_LIMIT, LOG_BATTLE_VICTORY,
};
use crate::effects::{StatusEffects, StatusKind};
use crate::numbers::clamp_i64_to_i32;
use crate::player::Player;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Player,
    Enemy,
}

impl Side {
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Player => Self::Enemy,
            Self::Enemy => Self::Player,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Player => "player",
            Self::Enemy => "enemy",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Start,
    PlayerTurn,
    EnemyTurn,
    Victory,
    Defeat,
}

impl Phase {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Victory | Self::Defeat)
    }

    #[must_use]
    pub const fn turn_of(side: Side) -> Self {
        match side {
            Side::Player => Self::PlayerTurn,
            Side::Enemy => Self::EnemyTurn,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleOutcome {
    Victory,
    Defeat,
}

const fn default_max_turns() -> u32 {
    DEFAULT_MAX_TURNS
}

const fn default_tiebreak() -> bool {
    true
}

/// Per-battle knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleOptions {
    #[serde(default)]
    pub rng_seed: u64,
    /// Turns taken by either side before the battle is lost; at least 1.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    /// Whether the player opens when speeds tie.
    #[serde(default = "default_tiebreak")]
    pub player_first_tiebreak: bool,
}

impl Default for BattleOptions {
    fn default() -> Self {
        Self {
            rng_seed: 0,
            max_turns: DEFAULT_MAX_TURNS,
            player_first_tiebreak: true,
        }
    }
}

impl BattleOptions {
    #[must_use]
    pub fn with_seed(rng_seed: u64) -> Self {
        Self {
            rng_seed,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "skill", rename_all = "snake_case")]
pub enum BattleAction {
    Attack,
    Defend,
    UseSkill(SkillId),
}

/// A usable skill with its live cooldown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSlot {
    /// Skill id for the player, display name for enemy variants.
    pub key: String,
    pub name: String,
    pub effect: SkillEffect,
    pub cooldown: u32,
    pub duration: u32,
    /// Turns until usable again; zero means ready.
    pub remaining: u32,
}

impl SkillSlot {
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.remaining == 0
    }
}

/// One side of a battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    pub name: String,
    pub max_hp: i32,
    pub hp: i32,
    pub attack: i32,
    pub defense: i32,
    /// Speed before status multipliers.
    pub speed: i32,
    pub effects: StatusEffects,
    pub skills: Vec<SkillSlot>,
}

impl Combatant {
    /// Copy the player's derived stats; hp starts full.
    #[must_use]
    pub fn from_player(player: &Player, catalog: &Catalog) -> Self {
        let skills = player
            .available_skills(catalog)
            .iter()
            .filter_map(|id| catalog.skill(id))
            .map(|def| SkillSlot {
                key: def.id.as_str().to_string(),
                name: def.name.clone(),
                effect: def.effect,
                cooldown: def.cooldown,
                duration: def.duration,
                remaining: 0,
            })
            .collect();
        let max_hp = player.effective_max_hp(catalog);
        Self {
            name: player.name.clone(),
            max_hp,
            hp: max_hp,
            attack: player.effective_attack(catalog),
            defense: player.effective_defense(catalog),
            speed: player.gear_speed(catalog),
            effects: player.active_effects.clone(),
            skills,
        }
    }

    #[must_use]
    pub fn from_enemy(profile: &EnemyProfile) -> Self {
        Self {
            name: profile.name.clone(),
            max_hp: profile.hp,
            hp: profile.hp,
            attack: profile.attack,
            defense: profile.defense,
            speed: profile.speed,
            effects: StatusEffects::new(),
            skills: profile
                .skills
                .iter()
                .map(|skill| SkillSlot {
                    key: skill.name.clone(),
                    name: skill.name.clone(),
                    effect: skill.effect,
                    cooldown: skill.cooldown,
                    duration: skill.duration,
                    remaining: 0,
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn effective_speed(&self) -> i32 {
        let pct = 100 + i64::from(self.effects.speed_bonus_pct());
        clamp_i64_to_i32(i64::from(self.speed.max(0)) * pct / 100)
    }

    #[must_use]
    pub const fn is_down(&self) -> bool {
        self.hp <= 0
    }

    #[must_use]
    pub fn skill(&self, key: &str) -> Option<&SkillSlot> {
        self.skills.iter().find(|slot| slot.key == key)
    }

    /// Indices of skills off cooldown.
    #[must_use]
    pub fn ready_skills(&self) -> Vec<usize> {
        self.skills
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_ready())
            .map(|(index, _)| index)
            .collect()
    }

    /// Restore up to `amount` hp without exceeding the maximum.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.hp;
        self.hp = self.hp.saturating_add(amount.max(0)).min(self.max_hp);
        self.hp - before
    }

    /// Count every cooldown down by one turn.
    pub fn tick_cooldowns(&mut self) {
        for slot in &mut self.skills {
            slot.remaining = slot.remaining.saturating_sub(1);
        }
    }
}

/// What happened during a battle step, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BattleEvent {
    Entered {
        enemy: String,
        boss: bool,
        first: Side,
    },
    TurnStarted {
        turn: u32,
        actor: Side,
    },
    Attacked {
        actor: Side,
        damage: i32,
        critical: bool,
        doubled: bool,
        blocked: bool,
        target_hp: i32,
    },
    Defended {
        actor: Side,
    },
    SkillUsed {
        actor: Side,
        skill: String,
    },
    Healed {
        actor: Side,
        amount: i32,
        hp: i32,
    },
    EffectExpired {
        actor: Side,
        effect: StatusKind,
    },
    Victory {
        turns: u32,
    },
    Defeat {
        turns: u32,
    },
    TurnLimit {
        turns: u32,
    },
}

impl BattleEvent {
    /// Stable presentation key for localisation.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Entered { .. } => LOG_BATTLE_ENTER,
            Self::TurnStarted { .. } => LOG_BATTLE_TURN,
            Self::Attacked { critical: true, .. } => LOG_BATTLE_CRITICAL,
            Self::Attacked { .. } => LOG_BATTLE_ATTACK,
            Self::Defended { .. } => LOG_BATTLE_DEFEND,
            Self::SkillUsed { .. } => LOG_BATTLE_SKILL,
            Self::Healed { .. } => LOG_BATTLE_HEAL,
            Self::EffectExpired { .. } => LOG_BATTLE_EXPIRED,
            Self::Victory { .. } => LOG_BATTLE_VICTORY,
            Self::Defeat { .. } => LOG_BATTLE_DEFEAT,
            Self::TurnLimit { .. } => LOG_BATTLE_TURN_LIMIT,
        }
    }
}
