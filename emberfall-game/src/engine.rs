//! Stateful facade over the save pipeline, clock and catalogue.
use crate::battle::{Battle, BattleAction, BattleEvent, BattleOptions};
use crate::catalog::{Catalog, StageId, SubscriptionKind};
use crate::clock::Clock;
use crate::error::{GameError, Shortfall};
use crate::player::{self, EquipmentSlot};
use crate::progression;
use crate::rewards::{self, RewardEvent};
use crate::save::{LoadReport, SavePipeline};
use crate::shop;
use crate::snapshot::Snapshot;
use crate::stamina;
use crate::storage::SaveStore;

/// Game engine owning persistence and time.
///
/// Pure operations take a snapshot by value and hand back the updated one.
/// Commit points also persist; when storage is unavailable the returned
/// snapshot stays authoritative and [`GameEngine::reconcile`] retries.
#[derive(Debug)]
pub struct GameEngine<S: SaveStore, C: Clock> {
    pipeline: SavePipeline<S>,
    clock: C,
    catalog: Catalog,
    pending_write: bool,
}

impl<S: SaveStore, C: Clock> GameEngine<S, C> {
    /// Engine using the shared catalogue.
    #[must_use]
    pub fn new(store: S, clock: C, device: &str) -> Self {
        Self::with_catalog(store, clock, device, Catalog::shared().clone())
    }

    #[must_use]
    pub fn with_catalog(store: S, clock: C, device: &str, catalog: Catalog) -> Self {
        Self {
            pipeline: SavePipeline::new(store, device),
            clock,
            catalog,
            pending_write: false,
        }
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub const fn pipeline(&self) -> &SavePipeline<S> {
        &self.pipeline
    }

    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Whether a scheduled or failed write still has to reach storage.
    #[must_use]
    pub const fn has_pending_write(&self) -> bool {
        self.pending_write
    }

    /// Load with full recovery details.
    ///
    /// # Errors
    ///
    /// Returns `Save(SchemaMismatch)` for saves from a newer schema and
    /// `Save(StorageUnavailable)` when no key can be obtained.
    pub fn load(&mut self) -> Result<LoadReport, GameError> {
        let report = self.pipeline.read(&self.catalog, self.clock.now())?;
        if report.rewrite_scheduled {
            self.pending_write = true;
        }
        Ok(report)
    }

    /// # Errors
    ///
    /// Same as [`GameEngine::load`].
    pub fn load_or_init(&mut self) -> Result<Snapshot, GameError> {
        Ok(self.load()?.snapshot)
    }

    /// Persist `snapshot`, returning it as written.
    ///
    /// # Errors
    ///
    /// Returns `Save(..)` when the write fails; the write stays pending.
    pub fn save(&mut self, snapshot: &Snapshot) -> Result<Snapshot, GameError> {
        match self.pipeline.write(snapshot, self.clock.now()) {
            Ok(written) => {
                self.pending_write = false;
                Ok(written)
            }
            Err(err) => {
                self.pending_write = true;
                Err(err.into())
            }
        }
    }

    /// Write at a commit point. Failures are logged and leave the write
    /// pending; the caller keeps the unsaved snapshot.
    fn commit(&mut self, snapshot: Snapshot) -> Snapshot {
        match self.save(&snapshot) {
            Ok(written) => written,
            Err(err) => {
                log::error!("commit not persisted: {err}");
                snapshot
            }
        }
    }

    /// Perform a scheduled rewrite, if any.
    ///
    /// # Errors
    ///
    /// Same as [`GameEngine::save`].
    pub fn reconcile(&mut self, snapshot: &Snapshot) -> Result<Option<Snapshot>, GameError> {
        if !self.pending_write {
            return Ok(None);
        }
        self.save(snapshot).map(Some)
    }

    /// Permit overwriting a save from a newer schema.
    pub const fn allow_overwrite(&mut self) {
        self.pipeline.allow_overwrite();
    }

    /// Wipe the save and backups and start over with a fresh record.
    ///
    /// # Errors
    ///
    /// Returns `Save(..)` if the store cannot be cleared or written.
    pub fn reset(&mut self, name: &str, device: &str) -> Result<Snapshot, GameError> {
        self.pipeline.reset()?;
        let fresh = Snapshot::new(&self.catalog, name, self.clock.now(), device);
        log::warn!("save reset");
        self.save(&fresh)
    }

    /// # Errors
    ///
    /// Returns `Save(Serialization)` if the snapshot cannot be encoded.
    pub fn export_plaintext(&self, snapshot: &Snapshot) -> Result<Vec<u8>, GameError> {
        Ok(self.pipeline.export(snapshot)?)
    }

    /// # Errors
    ///
    /// Returns `Save(Corrupted)` for tampered payloads.
    pub fn import_plaintext(&self, bytes: &[u8]) -> Result<Snapshot, GameError> {
        Ok(self
            .pipeline
            .import(bytes, &self.catalog, self.clock.now())?)
    }

    #[must_use]
    pub fn stamina_accrue(&self, mut snapshot: Snapshot) -> Snapshot {
        stamina::stamina_accrue(&mut snapshot, &self.catalog, self.clock.now());
        snapshot
    }

    /// Spend stamina and persist on success.
    pub fn stamina_spend(&mut self, mut snapshot: Snapshot, amount: u32) -> (bool, Snapshot) {
        if !stamina::stamina_spend(&mut snapshot, amount) {
            return (false, snapshot);
        }
        (true, self.commit(snapshot))
    }

    #[must_use]
    pub fn grant_xp(&self, mut snapshot: Snapshot, amount: u64) -> (Snapshot, u32) {
        let level_ups = progression::grant_xp(&mut snapshot, &self.catalog, amount);
        (snapshot, level_ups)
    }

    /// # Errors
    ///
    /// See [`player::change_equipment`].
    pub fn change_equipment(
        &self,
        mut snapshot: Snapshot,
        slot: EquipmentSlot,
        id: &str,
    ) -> Result<Snapshot, GameError> {
        player::change_equipment(&mut snapshot, &self.catalog, slot, id)?;
        Ok(snapshot)
    }

    /// Open a battle after accruing stamina and checking the entry cost.
    /// The snapshot is not modified; the cost is charged at commit.
    ///
    /// # Errors
    ///
    /// `InsufficientResource(Stamina)` when the bar cannot cover the cost;
    /// `InvalidAction` for unknown or locked stages.
    pub fn enter_battle(
        &self,
        snapshot: &Snapshot,
        world: u8,
        stage: u8,
        options: BattleOptions,
    ) -> Result<Battle, GameError> {
        let mut view = snapshot.clone();
        stamina::stamina_accrue(&mut view, &self.catalog, self.clock.now());
        let cost = self.catalog.stamina.battle_cost;
        if view.stamina.current < cost {
            return Err(Shortfall::Stamina {
                needed: cost,
                available: view.stamina.current,
            }
            .into());
        }
        Ok(Battle::enter(
            &view,
            &self.catalog,
            StageId::new(world, stage),
            options,
        )?)
    }

    /// # Errors
    ///
    /// See [`Battle::submit_action`].
    pub fn submit_action(
        &self,
        battle: &mut Battle,
        action: &BattleAction,
    ) -> Result<Vec<BattleEvent>, GameError> {
        Ok(battle.submit_action(action)?)
    }

    /// # Errors
    ///
    /// See [`Battle::auto_step_enemy`].
    pub fn auto_step_enemy(&self, battle: &mut Battle) -> Result<Vec<BattleEvent>, GameError> {
        Ok(battle.auto_step_enemy()?)
    }

    /// Apply a finished battle and persist the result. A battle can be
    /// committed once.
    ///
    /// # Errors
    ///
    /// See [`rewards::commit_battle`].
    pub fn commit_battle(
        &mut self,
        mut snapshot: Snapshot,
        battle: &mut Battle,
    ) -> Result<(Snapshot, Vec<RewardEvent>), GameError> {
        stamina::stamina_accrue(&mut snapshot, &self.catalog, self.clock.now());
        let events = rewards::commit_battle(&mut snapshot, &self.catalog, battle)?;
        Ok((self.commit(snapshot), events))
    }

    /// # Errors
    ///
    /// See [`shop::buy_weapon`].
    pub fn buy_weapon(&mut self, mut snapshot: Snapshot, id: &str) -> Result<Snapshot, GameError> {
        shop::buy_weapon(&mut snapshot, &self.catalog, id)?;
        Ok(self.commit(snapshot))
    }

    /// # Errors
    ///
    /// See [`shop::buy_skin`].
    pub fn buy_skin(&mut self, mut snapshot: Snapshot, id: &str) -> Result<Snapshot, GameError> {
        shop::buy_skin(&mut snapshot, &self.catalog, id)?;
        Ok(self.commit(snapshot))
    }

    /// # Errors
    ///
    /// See [`shop::unlock_skill`].
    pub fn unlock_skill(&mut self, mut snapshot: Snapshot, id: &str) -> Result<Snapshot, GameError> {
        shop::unlock_skill(&mut snapshot, &self.catalog, id)?;
        Ok(self.commit(snapshot))
    }

    pub fn activate_subscription(&mut self, mut snapshot: Snapshot, kind: SubscriptionKind) -> Snapshot {
        shop::activate_subscription(&mut snapshot, &self.catalog, kind, self.clock.now());
        self.commit(snapshot)
    }
}

#[cfg(feature = "async")]
impl<C: Clock> GameEngine<crate::storage::FileStore, C> {
    /// Run a file write on a Tokio blocking worker.
    ///
    /// # Errors
    ///
    /// Returns `Save(SchemaMismatch)` while a newer save is protected and
    /// `Save(StorageUnavailable)` when the key cannot be loaded. Write errors
    /// arrive through the join handle.
    pub fn save_in_background(
        &mut self,
        snapshot: Snapshot,
    ) -> Result<tokio::task::JoinHandle<Result<Snapshot, crate::save::SaveError>>, GameError> {
        self.pipeline.check_writable()?;
        let key = self.pipeline.key()?;
        let store = self.pipeline.store().clone();
        let now = self.clock.now();
        Ok(tokio::task::spawn_blocking(move || {
            crate::save::persist(&store, &key, &snapshot, now)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::AlwaysAttack;
    use crate::clock::ManualClock;
    use crate::save::LoadSource;
    use crate::storage::MemoryStore;

    fn engine() -> GameEngine<MemoryStore, ManualClock> {
        GameEngine::with_catalog(
            MemoryStore::new(),
            ManualClock::new(1_000),
            "device",
            Catalog::builtin(),
        )
    }

    #[test]
    fn first_load_is_fresh_and_save_round_trips() {
        let mut engine = engine();
        let report = engine.load().unwrap();
        assert_eq!(report.source, LoadSource::Fresh);
        assert!(!engine.has_pending_write());

        let saved = engine.save(&report.snapshot).unwrap();
        assert_eq!(saved.save_count, 1);
        assert_eq!(engine.load_or_init().unwrap(), saved);
    }

    #[test]
    fn enter_battle_requires_stamina() {
        let engine = engine();
        let mut snapshot = Snapshot::new(engine.catalog(), "Aria", 1_000, "d");
        snapshot.stamina.current = 0;
        let err = engine
            .enter_battle(&snapshot, 0, 1, BattleOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            GameError::InsufficientResource(Shortfall::Stamina { needed: 1, .. })
        ));

        engine.clock().advance(1_200);
        assert!(engine.enter_battle(&snapshot, 0, 1, BattleOptions::default()).is_ok());
    }

    #[test]
    fn commit_persists_and_failed_write_stays_pending() {
        let mut engine = engine();
        let snapshot = engine.load_or_init().unwrap();
        let mut battle = engine
            .enter_battle(&snapshot, 0, 1, BattleOptions::with_seed(9))
            .unwrap();
        battle.auto_resolve(&mut AlwaysAttack);

        engine.pipeline().store().set_fail_writes(true);
        let (committed, events) = engine.commit_battle(snapshot, &mut battle).unwrap();
        assert!(!events.is_empty());
        assert!(engine.has_pending_write());
        assert_eq!(committed.save_count, 0);

        engine.pipeline().store().set_fail_writes(false);
        let written = engine.reconcile(&committed).unwrap().unwrap();
        assert_eq!(written.save_count, 1);
        assert!(!engine.has_pending_write());
        assert_eq!(engine.reconcile(&written).unwrap(), None);
    }

    #[test]
    fn purchases_are_persisted() {
        let mut engine = engine();
        let mut snapshot = engine.load_or_init().unwrap();
        snapshot.inventory.gold = 150;
        let snapshot = engine.buy_weapon(snapshot, "iron_sword").unwrap();
        let snapshot = engine
            .change_equipment(snapshot, EquipmentSlot::Weapon, "iron_sword")
            .unwrap();
        assert_eq!(snapshot.inventory.gold, 0);
        let reloaded = engine.load_or_init().unwrap();
        assert!(reloaded.inventory.weapons.contains(&crate::catalog::WeaponId::new("iron_sword")));
    }

    #[test]
    fn reset_starts_over() {
        let mut engine = engine();
        let mut snapshot = engine.load_or_init().unwrap();
        snapshot.inventory.gold = 999;
        engine.save(&snapshot).unwrap();
        let fresh = engine.reset("Brin", "device").unwrap();
        assert_eq!(fresh.inventory.gold, 0);
        assert_eq!(fresh.player.name, "Brin");
        assert_eq!(engine.pipeline().store().backup_count(), 0);
    }

    #[test]
    fn grant_and_accrue_are_pure() {
        let engine = engine();
        let mut snapshot = Snapshot::new(engine.catalog(), "Aria", 1_000, "d");
        snapshot.stamina.current = 0;
        engine.clock().advance(3_600);
        let snapshot = engine.stamina_accrue(snapshot);
        assert_eq!(snapshot.stamina.current, 3);
        let (snapshot, ups) = engine.grant_xp(snapshot, 100);
        assert_eq!(ups, 1);
        assert_eq!(snapshot.player.level, 2);
    }
}
