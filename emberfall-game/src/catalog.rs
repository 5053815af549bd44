//! Immutable configuration table: worlds, scaling, rewards, stamina, skills,
//! weapons, skins and enemy archetypes.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

use crate::numbers::floor_f64_to_i64;

const DEFAULT_CATALOG_DATA: &str = include_str!("../assets/catalog.json");
const BASIS_POINTS: u128 = 10_000;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            #[must_use]
            pub fn new(value: &str) -> Self {
                Self(value.trim().to_string())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }
    };
}

string_id!(
    /// Catalogue identifier of a weapon.
    WeaponId
);
string_id!(
    /// Catalogue identifier of a skin.
    SkinId
);
string_id!(
    /// Catalogue identifier of a player skill.
    SkillId
);

/// A stage address. `world` is zero-based, `stage` is one-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StageId {
    pub world: u8,
    pub stage: u8,
}

impl StageId {
    #[must_use]
    pub const fn new(world: u8, stage: u8) -> Self {
        Self { world, stage }
    }

    /// One-based world number used by the scaling formulas.
    #[must_use]
    pub const fn world_number(self) -> u32 {
        self.world as u32 + 1
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.world_number(), self.stage)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    #[default]
    Common,
    Rare,
    Epic,
    Legendary,
}

/// Shop price of a catalogue item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Price {
    #[default]
    Free,
    Gold(u32),
    Gems(u32),
}

/// What a skill does when it resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SkillEffect {
    /// Raise speed by a percentage for the skill duration.
    SpeedBoost { multiplier_pct: u32 },
    /// Restore a percentage of maximum hp immediately.
    Heal { pct_of_max_hp: u32 },
    /// Double the next outgoing attack.
    DamageDoubler,
    /// Halve the next incoming attack while the skill duration lasts.
    Guard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDef {
    pub id: SkillId,
    pub name: String,
    pub effect: SkillEffect,
    /// Cooldown in turns.
    pub cooldown: u32,
    /// Duration in turns; zero for instant effects.
    #[serde(default)]
    pub duration: u32,
    /// Gem cost of unlocking the skill outside of a skin grant.
    #[serde(default)]
    pub unlock_gems: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponDef {
    pub id: WeaponId,
    pub name: String,
    #[serde(default)]
    pub rarity: Rarity,
    #[serde(default)]
    pub attack_bonus: i32,
    #[serde(default)]
    pub defense_bonus: i32,
    #[serde(default)]
    pub speed_bonus: i32,
    #[serde(default)]
    pub price: Price,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkinDef {
    pub id: SkinId,
    pub name: String,
    #[serde(default)]
    pub rarity: Rarity,
    #[serde(default)]
    pub hp_bonus: i32,
    #[serde(default)]
    pub defense_bonus: i32,
    #[serde(default)]
    pub granted_skill: Option<SkillId>,
    #[serde(default)]
    pub price: Price,
}

/// Flavour variant of a generic skill used by enemies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemySkillDef {
    pub name: String,
    pub effect: SkillEffect,
    pub cooldown: u32,
    #[serde(default)]
    pub duration: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyArchetype {
    pub name: String,
    pub boss_name: String,
    #[serde(default)]
    pub skills: Vec<EnemySkillDef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldCfg {
    pub worlds: u8,
    pub stages_per_world: u8,
    pub boss_interval: u8,
}

impl Default for WorldCfg {
    fn default() -> Self {
        Self {
            worlds: 10,
            stages_per_world: 30,
            boss_interval: 5,
        }
    }
}

/// Base combat stats of a level-one character, or per-level growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatBlock {
    pub max_hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub speed: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionCfg {
    pub base_xp: u64,
    pub xp_growth: f64,
    pub max_level: u32,
    pub base_stats: StatBlock,
    pub growth: StatBlock,
}

impl Default for ProgressionCfg {
    fn default() -> Self {
        Self {
            base_xp: 100,
            xp_growth: 1.15,
            max_level: 100,
            base_stats: StatBlock {
                max_hp: 100,
                attack: 10,
                defense: 5,
                speed: 10,
            },
            growth: StatBlock {
                max_hp: 10,
                attack: 5,
                defense: 3,
                speed: 2,
            },
        }
    }
}

/// Enemy scaling coefficients expressed in basis points (1/10 000).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyScalingCfg {
    pub base_hp: u32,
    pub hp_world_bp: u32,
    pub hp_stage_bp: u32,
    pub hp_level_bp: u32,
    pub base_damage: u32,
    pub damage_world_bp: u32,
    pub damage_stage_bp: u32,
    pub damage_level_bp: u32,
    pub boss_hp_bp: u32,
    pub boss_damage_bp: u32,
    pub defense_per_world: i32,
    pub base_speed: i32,
    pub speed_per_world: i32,
}

impl Default for EnemyScalingCfg {
    fn default() -> Self {
        Self {
            base_hp: 100,
            hp_world_bp: 3_000,
            hp_stage_bp: 500,
            hp_level_bp: 200,
            base_damage: 50,
            damage_world_bp: 2_500,
            damage_stage_bp: 300,
            damage_level_bp: 150,
            boss_hp_bp: 50_000,
            boss_damage_bp: 15_000,
            defense_per_world: 3,
            base_speed: 9,
            speed_per_world: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardCfg {
    pub gold_base: u32,
    pub gold_per_world: u32,
    pub gold_per_stage: u32,
    pub xp_base: u32,
    pub xp_per_world: u32,
    pub xp_per_stage: u32,
    pub boss_gems: u32,
}

impl Default for RewardCfg {
    fn default() -> Self {
        Self {
            gold_base: 10,
            gold_per_world: 5,
            gold_per_stage: 2,
            xp_base: 25,
            xp_per_world: 10,
            xp_per_stage: 3,
            boss_gems: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaminaCfg {
    pub default_max: u32,
    pub weekly_max: u32,
    pub monthly_max: u32,
    pub accrual_secs: i64,
    pub battle_cost: u32,
    pub weekly_duration_secs: i64,
    pub monthly_duration_secs: i64,
}

impl Default for StaminaCfg {
    fn default() -> Self {
        Self {
            default_max: 10,
            weekly_max: 20,
            monthly_max: 25,
            accrual_secs: 1_200,
            battle_cost: 1,
            weekly_duration_secs: 7 * 86_400,
            monthly_duration_secs: 30 * 86_400,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombatCfg {
    pub crit_chance: f64,
    pub crit_multiplier: f64,
}

impl Default for CombatCfg {
    fn default() -> Self {
        Self {
            crit_chance: 0.15,
            crit_multiplier: 1.5,
        }
    }
}

/// Enemy statistics for one stage at one player level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyProfile {
    pub name: String,
    pub boss: bool,
    pub hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub speed: i32,
    pub skills: Vec<EnemySkillDef>,
}

/// Currencies and xp granted for clearing a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReward {
    pub gold: u64,
    pub xp: u64,
    pub gems: u64,
}

/// Subscription tiers that raise the stamina cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionKind {
    Weekly,
    Monthly,
}

/// Errors raised when catalogue invariants are violated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("{field} must be at least 1")]
    ZeroDimension { field: &'static str },
    #[error("default weapon {0} is not in the catalogue")]
    MissingDefaultWeapon(WeaponId),
    #[error("default skin {0} is not in the catalogue")]
    MissingDefaultSkin(SkinId),
    #[error("skin {skin} grants unknown skill {skill}")]
    UnknownGrantedSkill { skin: SkinId, skill: SkillId },
    #[error("instant skill {0} must not declare a duration")]
    InstantWithDuration(String),
    #[error("timed skill {0} must declare a duration")]
    TimedWithoutDuration(String),
    #[error("duplicate catalogue id {0}")]
    DuplicateId(String),
    #[error("stamina accrual interval must be positive (got {0})")]
    AccrualInterval(i64),
    #[error("enemy archetype list is empty")]
    NoEnemies,
}

/// Read-only registry of game content and balance values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub world: WorldCfg,
    #[serde(default)]
    pub progression: ProgressionCfg,
    #[serde(default)]
    pub enemy_scaling: EnemyScalingCfg,
    #[serde(default)]
    pub rewards: RewardCfg,
    #[serde(default)]
    pub stamina: StaminaCfg,
    #[serde(default)]
    pub combat: CombatCfg,
    pub default_weapon: WeaponId,
    pub default_skin: SkinId,
    pub skills: Vec<SkillDef>,
    pub weapons: Vec<WeaponDef>,
    pub skins: Vec<SkinDef>,
    pub enemies: Vec<EnemyArchetype>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::from_json(DEFAULT_CATALOG_DATA).unwrap_or_else(|err| {
            log::warn!("embedded catalogue rejected ({err}); using built-in table");
            Self::builtin()
        })
    }
}

impl Catalog {
    /// Process-wide catalogue parsed once from the embedded asset.
    #[must_use]
    pub fn shared() -> &'static Self {
        static CATALOG: OnceLock<Catalog> = OnceLock::new();
        CATALOG.get_or_init(Self::default)
    }

    /// Load and validate a catalogue from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or the table is invalid.
    pub fn from_json(json: &str) -> Result<Self, CatalogLoadError> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Hard-coded catalogue matching the embedded asset.
    #[must_use]
    pub fn builtin() -> Self {
        let skill = |id: &str, name: &str, effect, cooldown, duration, unlock_gems| SkillDef {
            id: SkillId::new(id),
            name: name.to_string(),
            effect,
            cooldown,
            duration,
            unlock_gems,
        };
        let weapon = |id: &str, name: &str, rarity, stats: (i32, i32, i32), price| WeaponDef {
            id: WeaponId::new(id),
            name: name.to_string(),
            rarity,
            attack_bonus: stats.0,
            defense_bonus: stats.1,
            speed_bonus: stats.2,
            price,
        };
        let skin = |id: &str, name: &str, rarity, hp_bonus, defense_bonus, grant: Option<&str>, price| {
            SkinDef {
                id: SkinId::new(id),
                name: name.to_string(),
                rarity,
                hp_bonus,
                defense_bonus,
                granted_skill: grant.map(SkillId::new),
                price,
            }
        };
        let enemy_skill = |name: &str, effect, cooldown, duration| EnemySkillDef {
            name: name.to_string(),
            effect,
            cooldown,
            duration,
        };
        let frenzy = || enemy_skill("Frenzy", SkillEffect::DamageDoubler, 8, 3);
        let mend = |pct| enemy_skill("Mend", SkillEffect::Heal { pct_of_max_hp: pct }, 10, 0);
        let harden = || enemy_skill("Harden", SkillEffect::Guard, 5, 2);
        let haste = || {
            enemy_skill(
                "Haste",
                SkillEffect::SpeedBoost { multiplier_pct: 50 },
                10,
                3,
            )
        };
        let archetype = |name: &str, boss: &str, skills| EnemyArchetype {
            name: name.to_string(),
            boss_name: boss.to_string(),
            skills,
        };

        Self {
            world: WorldCfg::default(),
            progression: ProgressionCfg::default(),
            enemy_scaling: EnemyScalingCfg::default(),
            rewards: RewardCfg::default(),
            stamina: StaminaCfg::default(),
            combat: CombatCfg::default(),
            default_weapon: WeaponId::new("training_sword"),
            default_skin: SkinId::new("wanderer"),
            skills: vec![
                skill(
                    "speed_boost",
                    "Speed Boost",
                    SkillEffect::SpeedBoost { multiplier_pct: 50 },
                    30,
                    5,
                    5,
                ),
                skill(
                    "instant_heal",
                    "Instant Heal",
                    SkillEffect::Heal { pct_of_max_hp: 30 },
                    60,
                    0,
                    8,
                ),
                skill(
                    "time_rewind",
                    "Time Rewind",
                    SkillEffect::Heal { pct_of_max_hp: 20 },
                    120,
                    0,
                    12,
                ),
                skill(
                    "damage_doubler",
                    "Damage Doubler",
                    SkillEffect::DamageDoubler,
                    90,
                    7,
                    10,
                ),
            ],
            weapons: vec![
                weapon("training_sword", "Training Sword", Rarity::Common, (0, 0, 0), Price::Free),
                weapon("iron_sword", "Iron Sword", Rarity::Common, (10, 0, 0), Price::Gold(150)),
                weapon("ember_blade", "Ember Blade", Rarity::Rare, (20, 0, 2), Price::Gold(600)),
                weapon("frostbite_axe", "Frostbite Axe", Rarity::Epic, (32, 4, 0), Price::Gems(25)),
                weapon("dawnbreaker", "Dawnbreaker", Rarity::Legendary, (50, 8, 3), Price::Gems(80)),
            ],
            skins: vec![
                skin("wanderer", "Wanderer", Rarity::Common, 0, 0, None, Price::Free),
                skin("windrunner", "Windrunner", Rarity::Rare, 0, 0, Some("speed_boost"), Price::Gold(400)),
                skin("cleric", "Cleric", Rarity::Rare, 20, 0, Some("instant_heal"), Price::Gold(800)),
                skin("chronomancer", "Chronomancer", Rarity::Epic, 0, 2, Some("time_rewind"), Price::Gems(30)),
                skin("berserker", "Berserker", Rarity::Epic, 10, 0, Some("damage_doubler"), Price::Gems(40)),
            ],
            enemies: vec![
                archetype("Mire Goblin", "Goblin Warchief", vec![frenzy()]),
                archetype("Ash Wolf", "Alpha of Cinders", vec![haste()]),
                archetype("Stone Golem", "Granite Colossus", vec![harden()]),
                archetype("Marsh Witch", "Coven Matriarch", vec![mend(15)]),
                archetype("Dune Raider", "Sandstorm Khan", vec![haste(), frenzy()]),
                archetype("Frost Wraith", "Winter Sovereign", vec![harden(), mend(10)]),
                archetype("Ember Drake", "Magma Wyrm", vec![frenzy(), harden()]),
                archetype("Void Cultist", "Herald of Nothing", vec![mend(15), haste()]),
                archetype("Storm Titan", "Thunder Regent", vec![frenzy(), haste(), harden()]),
                archetype("Fallen Seraph", "The Last Ember", vec![frenzy(), mend(20), harden()]),
            ],
        }
    }

    /// Check structural invariants of the table.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), CatalogError> {
        for (field, value) in [
            ("worlds", self.world.worlds),
            ("stages_per_world", self.world.stages_per_world),
            ("boss_interval", self.world.boss_interval),
        ] {
            if value == 0 {
                return Err(CatalogError::ZeroDimension { field });
            }
        }
        if self.progression.max_level == 0 {
            return Err(CatalogError::ZeroDimension { field: "max_level" });
        }
        if self.stamina.accrual_secs <= 0 {
            return Err(CatalogError::AccrualInterval(self.stamina.accrual_secs));
        }
        if self.enemies.is_empty() {
            return Err(CatalogError::NoEnemies);
        }
        if self.weapon(&self.default_weapon).is_none() {
            return Err(CatalogError::MissingDefaultWeapon(self.default_weapon.clone()));
        }
        if self.skin(&self.default_skin).is_none() {
            return Err(CatalogError::MissingDefaultSkin(self.default_skin.clone()));
        }

        let mut seen = std::collections::BTreeSet::new();
        let ids = self
            .skills
            .iter()
            .map(|s| format!("skill:{}", s.id))
            .chain(self.weapons.iter().map(|w| format!("weapon:{}", w.id)))
            .chain(self.skins.iter().map(|s| format!("skin:{}", s.id)));
        for id in ids {
            if !seen.insert(id.clone()) {
                return Err(CatalogError::DuplicateId(id));
            }
        }

        let timed = self
            .skills
            .iter()
            .map(|s| (s.id.to_string(), s.effect, s.duration))
            .chain(self.enemies.iter().flat_map(|e| {
                e.skills
                    .iter()
                    .map(|s| (s.name.clone(), s.effect, s.duration))
            }));
        for (name, effect, duration) in timed {
            match effect {
                SkillEffect::Heal { .. } if duration > 0 => {
                    return Err(CatalogError::InstantWithDuration(name));
                }
                SkillEffect::SpeedBoost { .. } | SkillEffect::DamageDoubler | SkillEffect::Guard
                    if duration == 0 =>
                {
                    return Err(CatalogError::TimedWithoutDuration(name));
                }
                _ => {}
            }
        }

        for skin in &self.skins {
            if let Some(skill) = &skin.granted_skill
                && self.skill(skill).is_none()
            {
                return Err(CatalogError::UnknownGrantedSkill {
                    skin: skin.id.clone(),
                    skill: skill.clone(),
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn weapon(&self, id: &WeaponId) -> Option<&WeaponDef> {
        self.weapons.iter().find(|w| &w.id == id)
    }

    #[must_use]
    pub fn skin(&self, id: &SkinId) -> Option<&SkinDef> {
        self.skins.iter().find(|s| &s.id == id)
    }

    #[must_use]
    pub fn skill(&self, id: &SkillId) -> Option<&SkillDef> {
        self.skills.iter().find(|s| &s.id == id)
    }

    /// Whether the address lies inside the world grid.
    #[must_use]
    pub const fn contains_stage(&self, stage: StageId) -> bool {
        stage.world < self.world.worlds && stage.stage >= 1 && stage.stage <= self.world.stages_per_world
    }

    #[must_use]
    pub const fn is_boss_stage(&self, stage: u8) -> bool {
        matches!(stage.checked_rem(self.world.boss_interval), Some(0)) && stage > 0
    }

    /// Last addressable stage of the grid.
    #[must_use]
    pub const fn final_stage(&self) -> StageId {
        StageId::new(
            self.world.worlds.saturating_sub(1),
            self.world.stages_per_world,
        )
    }

    /// Experience required to advance from `level` to `level + 1`:
    /// `⌊base_xp × growth^(level−1)⌋`.
    #[must_use]
    pub fn xp_to_next(&self, level: u32) -> u64 {
        let exponent = i32::try_from(level.saturating_sub(1)).unwrap_or(i32::MAX);
        #[allow(clippy::cast_precision_loss)]
        let base = self.progression.base_xp as f64;
        let raw = base * self.progression.xp_growth.powi(exponent);
        u64::try_from(floor_f64_to_i64(raw)).unwrap_or(0).max(1)
    }

    /// Base stats for a character of the given level, before equipment.
    #[must_use]
    pub const fn stats_for_level(&self, level: u32) -> StatBlock {
        let steps = level.saturating_sub(1) as i32;
        let base = self.progression.base_stats;
        let growth = self.progression.growth;
        StatBlock {
            max_hp: base.max_hp + growth.max_hp * steps,
            attack: base.attack + growth.attack * steps,
            defense: base.defense + growth.defense * steps,
            speed: base.speed + growth.speed * steps,
        }
    }

    /// Enemy statistics for `stage` fought by a player of `level`.
    #[must_use]
    pub fn enemy_profile(&self, stage: StageId, level: u32) -> EnemyProfile {
        let cfg = &self.enemy_scaling;
        let w = u128::from(stage.world);
        let s = u128::from(stage.stage.saturating_sub(1));
        let l = u128::from(level.saturating_sub(1));
        let boss = self.is_boss_stage(stage.stage);

        let scale = |base: u32, world_bp: u32, stage_bp: u32, level_bp: u32, boss_bp: u32| {
            let mut numerator = u128::from(base)
                * (BASIS_POINTS + u128::from(world_bp) * w)
                * (BASIS_POINTS + u128::from(stage_bp) * s)
                * (BASIS_POINTS + u128::from(level_bp) * l);
            let mut denominator = BASIS_POINTS * BASIS_POINTS * BASIS_POINTS;
            if boss {
                numerator *= u128::from(boss_bp);
                denominator *= BASIS_POINTS;
            }
            i32::try_from(numerator / denominator).unwrap_or(i32::MAX)
        };

        let hp = scale(
            cfg.base_hp,
            cfg.hp_world_bp,
            cfg.hp_stage_bp,
            cfg.hp_level_bp,
            cfg.boss_hp_bp,
        );
        let attack = scale(
            cfg.base_damage,
            cfg.damage_world_bp,
            cfg.damage_stage_bp,
            cfg.damage_level_bp,
            cfg.boss_damage_bp,
        );
        let world_steps = i32::from(stage.world);
        let archetype = self
            .enemies
            .get(usize::from(stage.world) % self.enemies.len().max(1));
        let (name, skills) = match archetype {
            Some(a) if boss => (a.boss_name.clone(), a.skills.clone()),
            Some(a) => (a.name.clone(), a.skills.clone()),
            None => (String::from("Shade"), Vec::new()),
        };

        EnemyProfile {
            name,
            boss,
            hp: hp.max(1),
            attack,
            defense: cfg.defense_per_world * world_steps,
            speed: cfg.base_speed + cfg.speed_per_world * world_steps,
            skills,
        }
    }

    /// Rewards for clearing `stage`.
    #[must_use]
    pub fn stage_reward(&self, stage: StageId) -> StageReward {
        let cfg = &self.rewards;
        let w = u64::from(stage.world_number());
        let s = u64::from(stage.stage);
        StageReward {
            gold: u64::from(cfg.gold_base)
                + u64::from(cfg.gold_per_world) * w
                + u64::from(cfg.gold_per_stage) * s,
            xp: u64::from(cfg.xp_base)
                + u64::from(cfg.xp_per_world) * w
                + u64::from(cfg.xp_per_stage) * s,
            gems: if self.is_boss_stage(stage.stage) {
                u64::from(cfg.boss_gems)
            } else {
                0
            },
        }
    }

    /// Stamina cap granted by a subscription tier, or the default cap.
    #[must_use]
    pub const fn stamina_max_for(&self, tier: Option<SubscriptionKind>) -> u32 {
        match tier {
            None => self.stamina.default_max,
            Some(SubscriptionKind::Weekly) => self.stamina.weekly_max,
            Some(SubscriptionKind::Monthly) => self.stamina.monthly_max,
        }
    }

    #[must_use]
    pub const fn subscription_duration(&self, kind: SubscriptionKind) -> i64 {
        match kind {
            SubscriptionKind::Weekly => self.stamina.weekly_duration_secs,
            SubscriptionKind::Monthly => self.stamina.monthly_duration_secs,
        }
    }
}

/// Failure to load a catalogue from JSON.
#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("catalogue JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("catalogue is invalid: {0}")]
    Invalid(#[from] CatalogError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_asset_matches_builtin_table() {
        let parsed = Catalog::from_json(DEFAULT_CATALOG_DATA).unwrap();
        assert_eq!(parsed, Catalog::builtin());
        assert!(Catalog::builtin().validate().is_ok());
    }

    #[test]
    fn xp_curve_follows_growth_factor() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.xp_to_next(1), 100);
        assert_eq!(catalog.xp_to_next(2), 115);
        assert_eq!(catalog.xp_to_next(3), 132);
        assert!(catalog.xp_to_next(99) > catalog.xp_to_next(98));
    }

    #[test]
    fn enemy_scaling_uses_exact_floors() {
        let catalog = Catalog::builtin();
        let first = catalog.enemy_profile(StageId::new(0, 1), 1);
        assert_eq!(first.hp, 100);
        assert_eq!(first.attack, 50);
        assert_eq!(first.defense, 0);
        assert!(!first.boss);

        // w=2, s=3, L=5: 100 × 1.3 × 1.1 × 1.08 = 154.44
        let mid = catalog.enemy_profile(StageId::new(1, 3), 5);
        assert_eq!(mid.hp, 154);
        // 50 × 1.25 × 1.06 × 1.06 = 70.225
        assert_eq!(mid.attack, 70);
    }

    #[test]
    fn boss_stages_scale_hp_and_damage() {
        let catalog = Catalog::builtin();
        // w=1, s=5, L=1: hp 100 × 1.2 × 5 = 600, damage 50 × 1.12 × 1.5 = 84
        let boss = catalog.enemy_profile(StageId::new(0, 5), 1);
        assert!(boss.boss);
        assert_eq!(boss.hp, 600);
        assert_eq!(boss.attack, 84);
        assert_eq!(boss.name, "Goblin Warchief");
    }

    #[test]
    fn rewards_follow_linear_formula() {
        let catalog = Catalog::builtin();
        let reward = catalog.stage_reward(StageId::new(0, 5));
        assert_eq!(reward.gold, 10 + 5 + 10);
        assert_eq!(reward.xp, 25 + 10 + 15);
        assert_eq!(reward.gems, 1);
        assert_eq!(catalog.stage_reward(StageId::new(2, 4)).gems, 0);
    }

    #[test]
    fn validation_rejects_broken_tables() {
        let mut catalog = Catalog::builtin();
        catalog.world.boss_interval = 0;
        assert_eq!(
            catalog.validate(),
            Err(CatalogError::ZeroDimension {
                field: "boss_interval"
            })
        );

        let mut catalog = Catalog::builtin();
        catalog.skills[1].duration = 3;
        assert!(matches!(
            catalog.validate(),
            Err(CatalogError::InstantWithDuration(_))
        ));

        let mut catalog = Catalog::builtin();
        let guard = catalog
            .enemies
            .iter_mut()
            .flat_map(|e| e.skills.iter_mut())
            .find(|s| s.effect == SkillEffect::Guard)
            .unwrap();
        guard.duration = 0;
        assert_eq!(
            catalog.validate(),
            Err(CatalogError::TimedWithoutDuration(String::from("Harden")))
        );

        let mut catalog = Catalog::builtin();
        catalog.skins[1].granted_skill = Some(SkillId::new("meteor"));
        assert!(matches!(
            catalog.validate(),
            Err(CatalogError::UnknownGrantedSkill { .. })
        ));

        let mut catalog = Catalog::builtin();
        catalog.default_weapon = WeaponId::new("spoon");
        assert!(matches!(
            catalog.validate(),
            Err(CatalogError::MissingDefaultWeapon(_))
        ));
    }

    #[test]
    fn stamina_caps_follow_tier() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.stamina_max_for(None), 10);
        assert_eq!(catalog.stamina_max_for(Some(SubscriptionKind::Weekly)), 20);
        assert_eq!(catalog.stamina_max_for(Some(SubscriptionKind::Monthly)), 25);
    }
}
