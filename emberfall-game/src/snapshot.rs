//! The persisted player record.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::catalog::{Catalog, SkinId, WeaponId};
use crate::constants::{
    DEFAULT_LANGUAGE, DEFAULT_PLAYER_NAME, DEFAULT_VOLUME, FINGERPRINT_DOMAIN, MAX_VOLUME,
    SNAPSHOT_VERSION,
};
use crate::crypto::keyed_digest;
use crate::player::Player;
use crate::progression::Progress;
use crate::stamina::{Stamina, Subscriptions, sync_stamina_cap};

/// Owned items and currencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub weapons: BTreeSet<WeaponId>,
    pub skins: BTreeSet<SkinId>,
    #[serde(default)]
    pub gold: u64,
    #[serde(default)]
    pub gems: u64,
}

impl Inventory {
    /// Starting inventory holding the catalogue defaults.
    #[must_use]
    pub fn starter(catalog: &Catalog) -> Self {
        Self {
            weapons: BTreeSet::from([catalog.default_weapon.clone()]),
            skins: BTreeSet::from([catalog.default_skin.clone()]),
            gold: 0,
            gems: 0,
        }
    }
}

/// Lifetime counters; they only ever increase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Stats {
    pub battles_won: u64,
    pub battles_lost: u64,
    pub gold_earned: u64,
    pub gems_earned: u64,
    pub xp_earned: u64,
    pub stamina_spent: u64,
    pub purchases: u64,
}

/// Non-sensitive preferences mirrored beside the save as plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub music_volume: u8,
    pub sfx_volume: u8,
    pub language: String,
    pub auto_battle: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            music_volume: DEFAULT_VOLUME,
            sfx_volume: DEFAULT_VOLUME,
            language: DEFAULT_LANGUAGE.to_string(),
            auto_battle: false,
        }
    }
}

impl Settings {
    pub fn clamp(&mut self) {
        self.music_volume = self.music_volume.min(MAX_VOLUME);
        self.sfx_volume = self.sfx_volume.min(MAX_VOLUME);
        if self.language.trim().is_empty() {
            self.language = DEFAULT_LANGUAGE.to_string();
        }
    }
}

const fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

/// Complete persisted state plus integrity metadata.
///
/// Field order is the canonical serialisation order; the checksum covers
/// every field except `checksum` itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    pub created_at: i64,
    #[serde(default)]
    pub last_saved: i64,
    #[serde(default)]
    pub save_count: u64,
    #[serde(default)]
    pub device_fingerprint: String,
    #[serde(default)]
    pub checksum: String,
    pub player: Player,
    #[serde(default)]
    pub progress: Progress,
    pub inventory: Inventory,
    pub stamina: Stamina,
    #[serde(default)]
    pub subscriptions: Subscriptions,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default)]
    pub settings: Settings,
}

impl Snapshot {
    /// A first-run record for this device.
    #[must_use]
    pub fn new(catalog: &Catalog, name: &str, now: i64, device: &str) -> Self {
        let name = if name.trim().is_empty() {
            DEFAULT_PLAYER_NAME
        } else {
            name
        };
        Self {
            version: SNAPSHOT_VERSION,
            created_at: now,
            last_saved: now,
            save_count: 0,
            device_fingerprint: device_fingerprint(device, now),
            checksum: String::new(),
            player: Player::new(name, catalog),
            progress: Progress::default(),
            inventory: Inventory::starter(catalog),
            stamina: Stamina::full(catalog.stamina.default_max, now),
            subscriptions: Subscriptions::default(),
            stats: Stats::default(),
            settings: Settings::default(),
        }
    }

    /// Repair a loaded record so every cross-field invariant holds again.
    ///
    /// Derived values are re-derived from the catalogue instead of trusted:
    /// base stats from level, the stamina cap from subscriptions. Default
    /// items are re-granted and unowned equipment falls back to defaults.
    pub fn normalize(&mut self, catalog: &Catalog, now: i64) {
        self.inventory
            .weapons
            .insert(catalog.default_weapon.clone());
        self.inventory.skins.insert(catalog.default_skin.clone());

        let player = &mut self.player;
        if !self.inventory.weapons.contains(&player.equipped_weapon)
            || catalog.weapon(&player.equipped_weapon).is_none()
        {
            log::warn!(
                "equipped weapon {} not owned; reverting to default",
                player.equipped_weapon
            );
            player.equipped_weapon = catalog.default_weapon.clone();
        }
        if !self.inventory.skins.contains(&player.equipped_skin)
            || catalog.skin(&player.equipped_skin).is_none()
        {
            log::warn!(
                "equipped skin {} not owned; reverting to default",
                player.equipped_skin
            );
            player.equipped_skin = catalog.default_skin.clone();
        }
        player
            .unlocked_skills
            .retain(|skill| catalog.skill(skill).is_some());
        player.level = player.level.clamp(1, catalog.progression.max_level);
        player.recompute_base_stats(catalog);

        self.progress.normalize(catalog);
        sync_stamina_cap(self, catalog, now);
        self.settings.clamp();
    }
}

/// Stable, non-reversible device tag derived from a host-supplied seed.
#[must_use]
pub fn device_fingerprint(device: &str, created_at: i64) -> String {
    let digest = keyed_digest(
        FINGERPRINT_DOMAIN,
        &[device.as_bytes(), &created_at.to_le_bytes()],
    );
    hex::encode(&digest[..16])
}
