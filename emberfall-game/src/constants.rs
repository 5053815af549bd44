//! Centralized constants for Emberfall core logic.
//!
//! Balance values that designers tune live in the catalogue asset. The values
//! here are structural: schema versions, file layout, cryptographic sizes and
//! the stable keys emitted in battle and reward events.

// Schema -------------------------------------------------------------------
pub const SNAPSHOT_VERSION: u32 = 1;
pub(crate) const DEFAULT_PLAYER_NAME: &str = "Wanderer";
pub(crate) const DEFAULT_LANGUAGE: &str = "en";
pub(crate) const DEFAULT_VOLUME: u8 = 80;
pub(crate) const MAX_VOLUME: u8 = 100;

// Persistence layout -------------------------------------------------------
pub(crate) const SAVE_FILE_NAME: &str = "save.bin";
pub(crate) const SAVE_TEMP_SUFFIX: &str = "tmp";
pub(crate) const SETTINGS_FILE_NAME: &str = "settings.json";
pub(crate) const KEY_FILE_NAME: &str = ".key";
pub(crate) const BACKUP_DIR_NAME: &str = "backups";
pub(crate) const BACKUP_PREFIX: &str = "save-";
pub(crate) const BACKUP_EXTENSION: &str = "bin";
pub const BACKUP_RETENTION: usize = 5;
#[cfg(unix)]
pub(crate) const KEY_FILE_MODE: u32 = 0o600;

// Crypto -------------------------------------------------------------------
pub const KEY_SIZE: usize = 32;
pub(crate) const NONCE_SIZE: usize = 24;
pub(crate) const FINGERPRINT_DOMAIN: &[u8] = b"emberfall.device";
pub(crate) const BATTLE_STREAM_DOMAIN: &[u8] = b"emberfall.battle";

// Battle tuning ------------------------------------------------------------
pub const DEFAULT_MAX_TURNS: u32 = 200;
pub(crate) const VARIANCE_MIN: f64 = 0.8;
pub(crate) const VARIANCE_MAX: f64 = 1.2;
pub(crate) const DEFENSE_REDUCTION_RATIO: f64 = 0.1;
pub(crate) const DEFENDING_DAMAGE_FACTOR: f64 = 0.5;
pub(crate) const DAMAGE_DOUBLER_FACTOR: f64 = 2.0;
pub(crate) const MIN_DAMAGE: i32 = 1;
pub(crate) const DEFEND_DURATION: u32 = 2;
pub(crate) const ENEMY_SKILL_PCT: u32 = 30;

// Event keys ---------------------------------------------------------------
pub(crate) const LOG_BATTLE_ENTER: &str = "log.battle.enter";
pub(crate) const LOG_BATTLE_TURN: &str = "log.battle.turn";
pub(crate) const LOG_BATTLE_ATTACK: &str = "log.battle.attack";
pub(crate) const LOG_BATTLE_CRITICAL: &str = "log.battle.critical";
pub(crate) const LOG_BATTLE_DEFEND: &str = "log.battle.defend";
pub(crate) const LOG_BATTLE_SKILL: &str = "log.battle.skill";
pub(crate) const LOG_BATTLE_HEAL: &str = "log.battle.heal";
pub(crate) const LOG_BATTLE_EXPIRED: &str = "log.battle.effect-expired";
pub(crate) const LOG_BATTLE_VICTORY: &str = "log.battle.victory";
pub(crate) const LOG_BATTLE_DEFEAT: &str = "log.battle.defeat";
pub(crate) const LOG_BATTLE_TURN_LIMIT: &str = "log.battle.turn-limit";
pub(crate) const LOG_REWARD_GOLD: &str = "log.reward.gold";
pub(crate) const LOG_REWARD_XP: &str = "log.reward.xp";
pub(crate) const LOG_REWARD_GEMS: &str = "log.reward.gems";
pub(crate) const LOG_REWARD_LEVEL_UP: &str = "log.reward.level-up";
pub(crate) const LOG_REWARD_STAGE: &str = "log.reward.stage-cleared";
pub(crate) const LOG_REWARD_WORLD: &str = "log.reward.world-unlocked";
pub(crate) const LOG_REWARD_BOSS: &str = "log.reward.boss-defeated";
pub(crate) const LOG_REWARD_LOST: &str = "log.reward.battle-lost";

#[cfg(test)]
pub(crate) const FLOAT_EPSILON: f64 = 1e-9;
