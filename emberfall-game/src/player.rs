//! Player character and derived stats.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::catalog::{Catalog, SkillId, SkinDef, SkinId, WeaponDef, WeaponId};
use crate::effects::StatusEffects;
use crate::error::{ActionError, GameError, Shortfall};
use crate::numbers::clamp_i64_to_i32;
use crate::snapshot::{Inventory, Snapshot};

/// Equipment slot addressed by `change_equipment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquipmentSlot {
    Weapon,
    Skin,
}

impl fmt::Display for EquipmentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Weapon => "weapon",
            Self::Skin => "skin",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub level: u32,
    pub xp: u64,
    /// Base maximum hp from level growth, before equipment.
    pub max_hp: i32,
    pub hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub speed: i32,
    pub equipped_weapon: WeaponId,
    pub equipped_skin: SkinId,
    #[serde(default)]
    pub active_effects: StatusEffects,
    #[serde(default)]
    pub unlocked_skills: BTreeSet<SkillId>,
}

impl Player {
    /// Fresh level-one character wearing the default equipment.
    #[must_use]
    pub fn new(name: &str, catalog: &Catalog) -> Self {
        let base = catalog.stats_for_level(1);
        let mut player = Self {
            name: name.trim().to_string(),
            level: 1,
            xp: 0,
            max_hp: base.max_hp,
            hp: base.max_hp,
            attack: base.attack,
            defense: base.defense,
            speed: base.speed,
            equipped_weapon: catalog.default_weapon.clone(),
            equipped_skin: catalog.default_skin.clone(),
            active_effects: StatusEffects::new(),
            unlocked_skills: BTreeSet::new(),
        };
        player.restore_full_hp(catalog);
        player
    }

    fn weapon<'a>(&self, catalog: &'a Catalog) -> Option<&'a WeaponDef> {
        catalog.weapon(&self.equipped_weapon)
    }

    fn skin<'a>(&self, catalog: &'a Catalog) -> Option<&'a SkinDef> {
        catalog.skin(&self.equipped_skin)
    }

    #[must_use]
    pub fn effective_attack(&self, catalog: &Catalog) -> i32 {
        let bonus = self.weapon(catalog).map_or(0, |w| w.attack_bonus);
        self.attack.saturating_add(bonus)
    }

    #[must_use]
    pub fn effective_defense(&self, catalog: &Catalog) -> i32 {
        let weapon = self.weapon(catalog).map_or(0, |w| w.defense_bonus);
        let skin = self.skin(catalog).map_or(0, |s| s.defense_bonus);
        self.defense.saturating_add(weapon).saturating_add(skin)
    }

    /// Base speed plus the weapon bonus, before status multipliers.
    #[must_use]
    pub fn gear_speed(&self, catalog: &Catalog) -> i32 {
        let bonus = self.weapon(catalog).map_or(0, |w| w.speed_bonus);
        self.speed.saturating_add(bonus)
    }

    /// `(base_speed + weapon bonus) × (1 + Σ active multipliers)`, floored.
    #[must_use]
    pub fn effective_speed(&self, catalog: &Catalog) -> i32 {
        let base = i64::from(self.gear_speed(catalog).max(0));
        let pct = 100 + i64::from(self.active_effects.speed_bonus_pct());
        clamp_i64_to_i32(base * pct / 100)
    }

    #[must_use]
    pub fn effective_max_hp(&self, catalog: &Catalog) -> i32 {
        let bonus = self.skin(catalog).map_or(0, |s| s.hp_bonus);
        self.max_hp.saturating_add(bonus).max(1)
    }

    /// Skills usable in battle: the equipped skin's grant plus explicit unlocks.
    #[must_use]
    pub fn available_skills(&self, catalog: &Catalog) -> Vec<SkillId> {
        let mut skills: BTreeSet<SkillId> = self.unlocked_skills.clone();
        if let Some(granted) = self.skin(catalog).and_then(|s| s.granted_skill.clone()) {
            skills.insert(granted);
        }
        skills.into_iter().collect()
    }

    #[must_use]
    pub fn can_use_skill(&self, catalog: &Catalog, skill: &SkillId) -> bool {
        self.unlocked_skills.contains(skill)
            || self
                .skin(catalog)
                .and_then(|s| s.granted_skill.as_ref())
                .is_some_and(|granted| granted == skill)
    }

    pub fn restore_full_hp(&mut self, catalog: &Catalog) {
        self.hp = self.effective_max_hp(catalog);
    }

    /// Keep hp within `0..=effective_max_hp`.
    pub fn clamp_hp(&mut self, catalog: &Catalog) {
        self.hp = self.hp.clamp(0, self.effective_max_hp(catalog));
    }

    /// Reset base stats to the values implied by the current level.
    pub fn recompute_base_stats(&mut self, catalog: &Catalog) {
        let stats = catalog.stats_for_level(self.level);
        self.max_hp = stats.max_hp;
        self.attack = stats.attack;
        self.defense = stats.defense;
        self.speed = stats.speed;
        self.clamp_hp(catalog);
    }
}

impl Inventory {
    #[must_use]
    pub fn owns(&self, slot: EquipmentSlot, id: &str) -> bool {
        match slot {
            EquipmentSlot::Weapon => self.weapons.contains(&WeaponId::new(id)),
            EquipmentSlot::Skin => self.skins.contains(&SkinId::new(id)),
        }
    }
}

/// Equip an owned weapon or skin.
///
/// # Errors
///
/// Returns `InvalidAction` for ids missing from the catalogue and
/// `InsufficientResource` when the item is not owned. The snapshot is not
/// modified on error.
pub fn change_equipment(
    snapshot: &mut Snapshot,
    catalog: &Catalog,
    slot: EquipmentSlot,
    id: &str,
) -> Result<(), GameError> {
    let known = match slot {
        EquipmentSlot::Weapon => catalog.weapon(&WeaponId::new(id)).is_some(),
        EquipmentSlot::Skin => catalog.skin(&SkinId::new(id)).is_some(),
    };
    if !known {
        return Err(ActionError::UnknownItem(id.to_string()).into());
    }
    if !snapshot.inventory.owns(slot, id) {
        return Err(Shortfall::NotOwned {
            item: format!("{slot} {id}"),
        }
        .into());
    }
    match slot {
        EquipmentSlot::Weapon => snapshot.player.equipped_weapon = WeaponId::new(id),
        EquipmentSlot::Skin => {
            snapshot.player.equipped_skin = SkinId::new(id);
            snapshot.player.clamp_hp(catalog);
        }
    }
    log::debug!("equipped {slot} {id}");
    Ok(())
}
