//! Emberfall Game Engine
//!
//! Deterministic simulation core for the Emberfall RPG: catalogue data,
//! derived player stats, the stamina clock, stage progression, turn-based
//! battles and an integrity-checked, encrypted save pipeline.
//! Nothing here touches a UI; time and persistence are injected through
//! [`Clock`] and [`SaveStore`].

pub mod battle;
pub mod catalog;
pub mod clock;
pub mod constants;
pub mod crypto;
pub mod effects;
pub mod engine;
pub mod error;
pub mod numbers;
pub mod player;
pub mod progression;
pub mod rewards;
pub mod save;
pub mod shop;
pub mod snapshot;
pub mod stamina;
pub mod storage;

// Re-export commonly used types
pub use battle::{
    AlwaysAttack, Battle, BattleAction, BattleEvent, BattleOptions, BattleOutcome, CombatDice,
    Combatant, Phase, PlayerPolicy, ScriptedDice, SeededDice, Side, derive_stream_seed,
};
pub use catalog::{
    Catalog, CatalogError, CatalogLoadError, Price, SkillEffect, SkillId, SkinId, StageId,
    SubscriptionKind, WeaponId,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use constants::SNAPSHOT_VERSION;
pub use crypto::{CryptoError, SaveKey};
pub use effects::{StatusEffect, StatusEffects, StatusKind};
pub use engine::GameEngine;
pub use error::{ActionError, GameError, Shortfall};
pub use player::{EquipmentSlot, Player, change_equipment};
pub use progression::{Progress, StageClear, apply_xp, grant_xp};
pub use rewards::{RewardEvent, commit_battle};
pub use save::{
    CorruptionStage, LoadReport, LoadSource, SaveError, SavePipeline, export_plaintext,
    import_plaintext,
};
pub use shop::{activate_subscription, buy_skin, buy_weapon, unlock_skill};
pub use snapshot::{Inventory, Settings, Snapshot, Stats};
pub use stamina::{Stamina, Subscription, Subscriptions, stamina_accrue, stamina_spend};
pub use storage::{FileStore, MemoryStore, SaveStore, StoreError};
