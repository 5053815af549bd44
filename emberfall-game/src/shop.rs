//! Currency spending: equipment, skill unlocks and subscriptions.
use crate::catalog::{Catalog, Price, SkillId, SkinId, SubscriptionKind, WeaponId};
use crate::error::{ActionError, GameError, Shortfall};
use crate::snapshot::{Inventory, Snapshot};
use crate::stamina::sync_stamina_cap;

fn charge(inventory: &mut Inventory, price: Price) -> Result<(), Shortfall> {
    match price {
        Price::Free => Ok(()),
        Price::Gold(cost) => {
            let needed = u64::from(cost);
            if inventory.gold < needed {
                return Err(Shortfall::Gold {
                    needed,
                    available: inventory.gold,
                });
            }
            inventory.gold -= needed;
            Ok(())
        }
        Price::Gems(cost) => {
            let needed = u64::from(cost);
            if inventory.gems < needed {
                return Err(Shortfall::Gems {
                    needed,
                    available: inventory.gems,
                });
            }
            inventory.gems -= needed;
            Ok(())
        }
    }
}

/// Buy a weapon at its catalogue price.
///
/// # Errors
///
/// `InvalidAction` for unknown ids; `InsufficientResource` when the weapon is
/// already owned or funds are short.
pub fn buy_weapon(snapshot: &mut Snapshot, catalog: &Catalog, id: &str) -> Result<(), GameError> {
    let id = WeaponId::new(id);
    let def = catalog
        .weapon(&id)
        .ok_or_else(|| ActionError::UnknownItem(id.to_string()))?;
    if snapshot.inventory.weapons.contains(&id) {
        return Err(Shortfall::AlreadyOwned {
            item: format!("weapon {id}"),
        }
        .into());
    }
    charge(&mut snapshot.inventory, def.price)?;
    snapshot.inventory.weapons.insert(id.clone());
    snapshot.stats.purchases += 1;
    log::info!("bought weapon {id} for {:?}", def.price);
    Ok(())
}

/// Buy a skin at its catalogue price.
///
/// # Errors
///
/// Same as [`buy_weapon`].
pub fn buy_skin(snapshot: &mut Snapshot, catalog: &Catalog, id: &str) -> Result<(), GameError> {
    let id = SkinId::new(id);
    let def = catalog
        .skin(&id)
        .ok_or_else(|| ActionError::UnknownItem(id.to_string()))?;
    if snapshot.inventory.skins.contains(&id) {
        return Err(Shortfall::AlreadyOwned {
            item: format!("skin {id}"),
        }
        .into());
    }
    charge(&mut snapshot.inventory, def.price)?;
    snapshot.inventory.skins.insert(id.clone());
    snapshot.stats.purchases += 1;
    log::info!("bought skin {id} for {:?}", def.price);
    Ok(())
}

/// Unlock a skill permanently for gems.
///
/// # Errors
///
/// `InvalidAction` for unknown skills; `InsufficientResource` when it is
/// already unlocked or gems are short.
pub fn unlock_skill(snapshot: &mut Snapshot, catalog: &Catalog, id: &str) -> Result<(), GameError> {
    let id = SkillId::new(id);
    let def = catalog
        .skill(&id)
        .ok_or_else(|| ActionError::UnknownSkill(id.clone()))?;
    if snapshot.player.unlocked_skills.contains(&id) {
        return Err(Shortfall::AlreadyOwned {
            item: format!("skill {id}"),
        }
        .into());
    }
    charge(&mut snapshot.inventory, Price::Gems(def.unlock_gems))?;
    snapshot.player.unlocked_skills.insert(id.clone());
    snapshot.stats.purchases += 1;
    log::info!("unlocked skill {id}");
    Ok(())
}

/// Start or extend a subscription and re-derive the stamina cap.
pub fn activate_subscription(
    snapshot: &mut Snapshot,
    catalog: &Catalog,
    kind: SubscriptionKind,
    now: i64,
) {
    snapshot
        .subscriptions
        .activate(kind, now, catalog.subscription_duration(kind));
    sync_stamina_cap(snapshot, catalog, now);
    log::info!(
        "subscription {kind:?} active; stamina cap {}",
        snapshot.stamina.max
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Catalog, Snapshot) {
        let catalog = Catalog::builtin();
        let snapshot = Snapshot::new(&catalog, "Aria", 0, "d");
        (catalog, snapshot)
    }

    #[test]
    fn gold_purchase_deducts_and_grants() {
        let (catalog, mut snapshot) = setup();
        snapshot.inventory.gold = 200;
        buy_weapon(&mut snapshot, &catalog, "iron_sword").unwrap();
        assert_eq!(snapshot.inventory.gold, 50);
        assert!(snapshot.inventory.weapons.contains(&WeaponId::new("iron_sword")));
        assert_eq!(snapshot.stats.purchases, 1);
    }

    #[test]
    fn short_funds_leave_snapshot_unchanged() {
        let (catalog, mut snapshot) = setup();
        snapshot.inventory.gems = 3;
        let before = snapshot.clone();
        let err = buy_skin(&mut snapshot, &catalog, "chronomancer").unwrap_err();
        assert!(matches!(
            err,
            GameError::InsufficientResource(Shortfall::Gems {
                needed: 30,
                available: 3
            })
        ));
        assert_eq!(snapshot, before);
    }

    #[test]
    fn owned_items_cannot_be_rebought() {
        let (catalog, mut snapshot) = setup();
        let err = buy_weapon(&mut snapshot, &catalog, "training_sword").unwrap_err();
        assert!(matches!(
            err,
            GameError::InsufficientResource(Shortfall::AlreadyOwned { .. })
        ));
    }

    #[test]
    fn skill_unlock_costs_gems() {
        let (catalog, mut snapshot) = setup();
        snapshot.inventory.gems = 10;
        unlock_skill(&mut snapshot, &catalog, "speed_boost").unwrap();
        assert_eq!(snapshot.inventory.gems, 5);
        assert!(
            snapshot
                .player
                .available_skills(&catalog)
                .contains(&SkillId::new("speed_boost"))
        );
        assert!(matches!(
            unlock_skill(&mut snapshot, &catalog, "meteor"),
            Err(GameError::InvalidAction(ActionError::UnknownSkill(_)))
        ));
    }

    #[test]
    fn subscription_raises_cap_without_filling() {
        let (catalog, mut snapshot) = setup();
        snapshot.stamina.current = 4;
        activate_subscription(&mut snapshot, &catalog, SubscriptionKind::Monthly, 100);
        assert_eq!(snapshot.stamina.max, 25);
        assert_eq!(snapshot.stamina.current, 4);
        assert_eq!(
            snapshot
                .subscriptions
                .get(SubscriptionKind::Monthly)
                .map(|s| s.expires_at),
            Some(100 + catalog.stamina.monthly_duration_secs)
        );
    }
}
