use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::time::{Duration, Instant};

use emberfall_game::{
    BattleEvent, BattleOptions, BattleOutcome, Catalog, Clock, EquipmentSlot, GameEngine,
    ManualClock, MemoryStore, Price, RewardEvent, Snapshot, StageId,
};

use crate::policy::Strategy;

/// Wall-clock start of every simulated campaign.
const SIM_EPOCH: i64 = 1_700_000_000;

/// Inputs for one campaign run.
#[derive(Debug, Clone, Copy)]
pub struct CampaignPlan {
    pub strategy: Strategy,
    pub seed: u64,
    pub max_battles: u32,
    pub shopping: bool,
}

/// What a campaign reached before its battle budget ran out.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignRecord {
    pub strategy: Strategy,
    pub seed: u64,
    pub battles: u32,
    pub victories: u32,
    pub defeats: u32,
    pub turn_limits: u32,
    pub final_stage: String,
    pub stages_cleared: usize,
    pub bosses_defeated: usize,
    pub level: u32,
    pub gold: u64,
    pub gems: u64,
    pub purchases: u64,
    pub weapon: String,
    pub simulated_secs: i64,
    #[serde(skip)]
    pub wall_time: Duration,
}

impl CampaignRecord {
    #[must_use]
    pub fn win_rate(&self) -> f64 {
        if self.battles == 0 {
            return 0.0;
        }
        f64::from(self.victories) / f64::from(self.battles)
    }
}

type SimEngine = GameEngine<MemoryStore, ManualClock>;

/// Play battles at the campaign cursor until the budget is spent or the
/// final stage has been cleared.
///
/// # Errors
///
/// Returns an error if the engine rejects an action the simulator expected
/// to be legal.
pub fn run_campaign(plan: &CampaignPlan) -> Result<CampaignRecord> {
    let started = Instant::now();
    let mut engine: SimEngine = GameEngine::new(
        MemoryStore::new(),
        ManualClock::new(SIM_EPOCH),
        &format!("sim-{}", plan.seed),
    );
    let mut snapshot = engine.load_or_init().context("initialising save")?;
    let mut policy = plan.strategy.create_policy();
    let mut record = CampaignRecord {
        strategy: plan.strategy,
        seed: plan.seed,
        battles: 0,
        victories: 0,
        defeats: 0,
        turn_limits: 0,
        final_stage: String::new(),
        stages_cleared: 0,
        bosses_defeated: 0,
        level: 1,
        gold: 0,
        gems: 0,
        purchases: 0,
        weapon: String::new(),
        simulated_secs: 0,
        wall_time: Duration::ZERO,
    };
    let last = engine.catalog().final_stage();

    while record.battles < plan.max_battles {
        if snapshot.progress.stages_completed.contains(&last) {
            break;
        }
        snapshot = wait_for_stamina(&engine, snapshot);
        let cursor = snapshot.progress.cursor();
        let seed = plan.seed ^ u64::from(record.battles);
        let mut battle = engine
            .enter_battle(
                &snapshot,
                cursor.world,
                cursor.stage,
                BattleOptions::with_seed(seed),
            )
            .with_context(|| format!("entering {cursor}"))?;
        battle.auto_resolve(policy.as_mut());
        if battle
            .history()
            .iter()
            .any(|e| matches!(e, BattleEvent::TurnLimit { .. }))
        {
            record.turn_limits += 1;
        }

        let (next, rewards) = engine
            .commit_battle(snapshot, &mut battle)
            .with_context(|| format!("committing {cursor}"))?;
        snapshot = next;
        record.battles += 1;
        match battle.outcome() {
            Some(BattleOutcome::Victory) => record.victories += 1,
            Some(BattleOutcome::Defeat) => record.defeats += 1,
            None => bail!("battle at {cursor} ended without an outcome"),
        }
        log::debug!(
            "{} seed {}: {cursor} -> {} reward events",
            plan.strategy,
            plan.seed,
            rewards.len()
        );
        if rewards
            .iter()
            .any(|r| matches!(r, RewardEvent::LevelUp { .. }))
        {
            log::info!(
                "{} seed {} reached level {}",
                plan.strategy,
                plan.seed,
                snapshot.player.level
            );
        }

        if plan.shopping {
            snapshot = upgrade_weapon(&mut engine, snapshot)?;
        }
    }

    if engine.has_pending_write() {
        engine.reconcile(&snapshot).context("final reconcile")?;
    }
    fill_summary(&mut record, &snapshot, engine.clock().now() - SIM_EPOCH);
    record.wall_time = started.elapsed();
    Ok(record)
}

/// Advance the simulated clock until one battle is affordable.
fn wait_for_stamina(engine: &SimEngine, snapshot: Snapshot) -> Snapshot {
    let catalog = engine.catalog();
    let snapshot = engine.stamina_accrue(snapshot);
    let cost = catalog.stamina.battle_cost;
    if snapshot.stamina.current >= cost {
        return snapshot;
    }
    let now = engine.clock().now();
    let wait = snapshot
        .stamina
        .seconds_until_next(now, catalog.stamina.accrual_secs)
        .unwrap_or(0)
        + catalog.stamina.accrual_secs * i64::from(cost - snapshot.stamina.current - 1);
    engine.clock().advance(wait);
    engine.stamina_accrue(snapshot)
}

/// Buy and equip the strongest gold-priced weapon the wallet covers.
fn upgrade_weapon(engine: &mut SimEngine, snapshot: Snapshot) -> Result<Snapshot> {
    let catalog: &Catalog = engine.catalog();
    let current_bonus = catalog
        .weapon(&snapshot.player.equipped_weapon)
        .map_or(0, |w| w.attack_bonus);
    let candidate = catalog
        .weapons
        .iter()
        .filter(|w| w.attack_bonus > current_bonus)
        .filter(|w| !snapshot.inventory.weapons.contains(&w.id))
        .filter(|w| {
            matches!(w.price, Price::Gold(cost) if u64::from(cost) <= snapshot.inventory.gold)
        })
        .max_by_key(|w| w.attack_bonus)
        .map(|w| w.id.clone());
    let Some(id) = candidate else {
        return Ok(snapshot);
    };

    let bought = match engine.buy_weapon(snapshot.clone(), id.as_str()) {
        Ok(bought) => bought,
        Err(err) if err.is_rejection() => {
            log::warn!("skipping {id}: {err}");
            return Ok(snapshot);
        }
        Err(err) => return Err(err).with_context(|| format!("buying {id}")),
    };
    let equipped = engine
        .change_equipment(bought, EquipmentSlot::Weapon, id.as_str())
        .with_context(|| format!("equipping {id}"))?;
    log::info!("equipped {id}");
    Ok(engine.save(&equipped)?)
}

fn fill_summary(record: &mut CampaignRecord, snapshot: &Snapshot, simulated_secs: i64) {
    let cursor: StageId = snapshot.progress.cursor();
    record.final_stage = cursor.to_string();
    record.stages_cleared = snapshot.progress.stages_completed.len();
    record.bosses_defeated = snapshot.progress.bosses_defeated.len();
    record.level = snapshot.player.level;
    record.gold = snapshot.inventory.gold;
    record.gems = snapshot.inventory.gems;
    record.purchases = snapshot.stats.purchases;
    record.weapon = snapshot.player.equipped_weapon.to_string();
    record.simulated_secs = simulated_secs;
}

/// Run every strategy against every seed.
///
/// # Errors
///
/// Returns the first campaign failure.
pub fn run_matrix(
    strategies: &[Strategy],
    seeds: &[u64],
    max_battles: u32,
    shopping: bool,
) -> Result<Vec<CampaignRecord>> {
    let mut records = Vec::with_capacity(strategies.len() * seeds.len());
    for &strategy in strategies {
        for &seed in seeds {
            let plan = CampaignPlan {
                strategy,
                seed,
                max_battles,
                shopping,
            };
            records.push(
                run_campaign(&plan)
                    .with_context(|| format!("{strategy} campaign with seed {seed}"))?,
            );
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(strategy: Strategy, seed: u64) -> CampaignPlan {
        CampaignPlan {
            strategy,
            seed,
            max_battles: 25,
            shopping: true,
        }
    }

    #[test]
    fn campaign_makes_progress() {
        let record = run_campaign(&plan(Strategy::Brawler, 7)).unwrap();
        assert_eq!(record.battles, 25);
        assert_eq!(record.victories + record.defeats, 25);
        assert_eq!(record.stages_cleared, usize::try_from(record.victories).unwrap());
        assert!(!record.final_stage.is_empty());
    }

    #[test]
    fn campaigns_are_reproducible() {
        for strategy in Strategy::ALL {
            let a = run_campaign(&plan(strategy, 11)).unwrap();
            let b = run_campaign(&plan(strategy, 11)).unwrap();
            assert_eq!(a.victories, b.victories);
            assert_eq!(a.final_stage, b.final_stage);
            assert_eq!(a.gold, b.gold);
            assert_eq!(a.simulated_secs, b.simulated_secs);
        }
    }

    #[test]
    fn stamina_waits_advance_the_clock() {
        let record = run_campaign(&CampaignPlan {
            max_battles: 15,
            ..plan(Strategy::Brawler, 3)
        })
        .unwrap();
        assert!(record.simulated_secs >= 5 * 1_200);
    }

    #[test]
    fn matrix_covers_every_pair() {
        let records = run_matrix(&Strategy::ALL, &[1, 2], 3, false).unwrap();
        assert_eq!(records.len(), 6);
        assert!(records.iter().all(|r| r.purchases == 0));
    }
}
