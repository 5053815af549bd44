//! Turn-based battle simulator.
//!
//! A [`Battle`] copies the player's derived stats at entry and never touches
//! the snapshot; [`crate::rewards::commit_battle`] applies the result. Given
//! the same snapshot, stage and seed every battle replays identically.

pub mod dice;
pub mod enemy;
pub mod resolve;
pub mod state;

pub use dice::{CombatDice, ScriptedDice, SeededDice, derive_stream_seed};
pub use enemy::EnemyMove;
pub use state::{
    BattleAction, BattleEvent, BattleOptions, BattleOutcome, Combatant, Phase, Side, SkillSlot,
};

use crate::catalog::{Catalog, CombatCfg, SkillId, StageId};
use crate::error::ActionError;
use crate::snapshot::Snapshot;

/// Chooses the player's action when a battle is auto-played.
pub trait PlayerPolicy {
    fn choose(&mut self, player: &Combatant, enemy: &Combatant, turn: u32) -> BattleAction;
}

impl<F> PlayerPolicy for F
where
    F: FnMut(&Combatant, &Combatant, u32) -> BattleAction,
{
    fn choose(&mut self, player: &Combatant, enemy: &Combatant, turn: u32) -> BattleAction {
        self(player, enemy, turn)
    }
}

/// Always attacks.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAttack;

impl PlayerPolicy for AlwaysAttack {
    fn choose(&mut self, _: &Combatant, _: &Combatant, _: u32) -> BattleAction {
        BattleAction::Attack
    }
}

#[derive(Debug)]
pub struct Battle<D: CombatDice = SeededDice> {
    stage: StageId,
    boss: bool,
    player_level: u32,
    options: BattleOptions,
    combat: CombatCfg,
    player: Combatant,
    enemy: Combatant,
    phase: Phase,
    turn_index: u32,
    dice: D,
    history: Vec<BattleEvent>,
    committed: bool,
}

impl Battle<SeededDice> {
    /// Start a battle on `stage` with dice seeded from `options.rng_seed`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownStage` for addresses outside the grid and
    /// `StageLocked` when the stage is not yet playable.
    pub fn enter(
        snapshot: &Snapshot,
        catalog: &Catalog,
        stage: StageId,
        options: BattleOptions,
    ) -> Result<Self, ActionError> {
        let dice = SeededDice::for_stage(options.rng_seed, stage);
        Self::enter_with_dice(snapshot, catalog, stage, options, dice)
    }
}

impl<D: CombatDice> Battle<D> {
    /// [`Battle::enter`] with caller-supplied dice.
    ///
    /// # Errors
    ///
    /// Same as [`Battle::enter`].
    pub fn enter_with_dice(
        snapshot: &Snapshot,
        catalog: &Catalog,
        stage: StageId,
        options: BattleOptions,
        dice: D,
    ) -> Result<Self, ActionError> {
        if !catalog.contains_stage(stage) {
            return Err(ActionError::UnknownStage(stage));
        }
        if !snapshot.progress.is_playable(catalog, stage) {
            return Err(ActionError::StageLocked(stage));
        }
        let level = snapshot.player.level;
        let profile = catalog.enemy_profile(stage, level);
        let player = Combatant::from_player(&snapshot.player, catalog);
        let enemy = Combatant::from_enemy(&profile);

        let mut battle = Self {
            stage,
            boss: profile.boss,
            player_level: level,
            options: BattleOptions {
                max_turns: options.max_turns.max(1),
                ..options
            },
            combat: catalog.combat,
            player,
            enemy,
            phase: Phase::Start,
            turn_index: 0,
            dice,
            history: Vec::new(),
            committed: false,
        };
        battle.open();
        log::debug!(
            "battle entered at {stage} vs {} (hp {}, atk {})",
            battle.enemy.name,
            battle.enemy.hp,
            battle.enemy.attack
        );
        Ok(battle)
    }

    fn open(&mut self) {
        let player_speed = self.player.effective_speed();
        let enemy_speed = self.enemy.effective_speed();
        let first = if player_speed == enemy_speed {
            if self.options.player_first_tiebreak {
                Side::Player
            } else {
                Side::Enemy
            }
        } else if player_speed > enemy_speed {
            Side::Player
        } else {
            Side::Enemy
        };
        self.phase = Phase::turn_of(first);
        self.history.push(BattleEvent::Entered {
            enemy: self.enemy.name.clone(),
            boss: self.boss,
            first,
        });
    }

    #[must_use]
    pub const fn stage(&self) -> StageId {
        self.stage
    }

    #[must_use]
    pub const fn is_boss(&self) -> bool {
        self.boss
    }

    #[must_use]
    pub const fn player_level(&self) -> u32 {
        self.player_level
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn turn_index(&self) -> u32 {
        self.turn_index
    }

    #[must_use]
    pub const fn options(&self) -> &BattleOptions {
        &self.options
    }

    #[must_use]
    pub const fn player(&self) -> &Combatant {
        &self.player
    }

    #[must_use]
    pub const fn enemy(&self) -> &Combatant {
        &self.enemy
    }

    /// Every event since entry, in order.
    #[must_use]
    pub fn history(&self) -> &[BattleEvent] {
        &self.history
    }

    #[must_use]
    pub const fn outcome(&self) -> Option<BattleOutcome> {
        match self.phase {
            Phase::Victory => Some(BattleOutcome::Victory),
            Phase::Defeat => Some(BattleOutcome::Defeat),
            Phase::Start | Phase::PlayerTurn | Phase::EnemyTurn => None,
        }
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Whether the result has already been folded into a snapshot.
    #[must_use]
    pub const fn is_committed(&self) -> bool {
        self.committed
    }

    pub(crate) const fn mark_committed(&mut self) {
        self.committed = true;
    }

    fn validate_skill(&self, skill: &SkillId) -> Result<usize, ActionError> {
        let Some(index) = self
            .player
            .skills
            .iter()
            .position(|slot| slot.key == skill.as_str())
        else {
            return Err(ActionError::SkillUnavailable(skill.clone()));
        };
        let remaining = self.player.skills[index].remaining;
        if remaining > 0 {
            return Err(ActionError::OnCooldown {
                skill: skill.clone(),
                remaining,
            });
        }
        Ok(index)
    }

    /// Resolve the player's action for this turn.
    ///
    /// # Errors
    ///
    /// Returns `BattleOver`, `NotPlayerTurn`, `SkillUnavailable` or
    /// `OnCooldown`; the battle is unchanged in every case.
    pub fn submit_action(&mut self, action: &BattleAction) -> Result<Vec<BattleEvent>, ActionError> {
        match self.phase {
            Phase::Victory | Phase::Defeat => return Err(ActionError::BattleOver),
            Phase::Start | Phase::EnemyTurn => return Err(ActionError::NotPlayerTurn),
            Phase::PlayerTurn => {}
        }
        let skill_slot = match action {
            BattleAction::UseSkill(skill) => Some(self.validate_skill(skill)?),
            BattleAction::Attack | BattleAction::Defend => None,
        };

        let mut events = vec![self.turn_started(Side::Player)];
        match (action, skill_slot) {
            (BattleAction::UseSkill(_), Some(slot)) => {
                events.extend(resolve::use_skill(Side::Player, &mut self.player, slot));
            }
            (BattleAction::Defend, _) => events.push(resolve::defend(Side::Player, &mut self.player)),
            _ => {
                let hit = resolve::strike(
                    &mut self.player,
                    &mut self.enemy,
                    &mut self.dice,
                    &self.combat,
                );
                events.push(resolve::attack_event(Side::Player, hit, self.enemy.hp));
            }
        }
        self.finish_turn(Side::Player, &mut events);
        Ok(events)
    }

    /// Let the enemy take its turn.
    ///
    /// # Errors
    ///
    /// Returns `BattleOver` or `NotEnemyTurn` without changing the battle.
    pub fn auto_step_enemy(&mut self) -> Result<Vec<BattleEvent>, ActionError> {
        match self.phase {
            Phase::Victory | Phase::Defeat => return Err(ActionError::BattleOver),
            Phase::Start | Phase::PlayerTurn => return Err(ActionError::NotEnemyTurn),
            Phase::EnemyTurn => {}
        }
        let mut events = vec![self.turn_started(Side::Enemy)];
        match enemy::choose_move(&self.enemy, &mut self.dice) {
            EnemyMove::Skill(slot) => {
                events.extend(resolve::use_skill(Side::Enemy, &mut self.enemy, slot));
            }
            EnemyMove::Attack => {
                let hit = resolve::strike(
                    &mut self.enemy,
                    &mut self.player,
                    &mut self.dice,
                    &self.combat,
                );
                events.push(resolve::attack_event(Side::Enemy, hit, self.player.hp));
            }
        }
        self.finish_turn(Side::Enemy, &mut events);
        Ok(events)
    }

    /// Play to the end, asking `policy` for every player turn. A policy
    /// action that is rejected is replaced by a plain attack.
    pub fn auto_resolve<P: PlayerPolicy + ?Sized>(&mut self, policy: &mut P) -> Vec<BattleEvent> {
        let mut events = Vec::new();
        while !self.is_finished() {
            let step = match self.phase {
                Phase::PlayerTurn => {
                    let action = policy.choose(&self.player, &self.enemy, self.turn_index);
                    self.submit_action(&action)
                        .or_else(|_| self.submit_action(&BattleAction::Attack))
                }
                _ => self.auto_step_enemy(),
            };
            match step {
                Ok(step) => events.extend(step),
                Err(err) => {
                    log::error!("auto-resolve stalled: {err}");
                    break;
                }
            }
        }
        events
    }

    const fn turn_started(&self, actor: Side) -> BattleEvent {
        BattleEvent::TurnStarted {
            turn: self.turn_index + 1,
            actor,
        }
    }

    fn finish_turn(&mut self, actor: Side, events: &mut Vec<BattleEvent>) {
        let (acting, opponent) = match actor {
            Side::Player => (&mut self.player, &mut self.enemy),
            Side::Enemy => (&mut self.enemy, &mut self.player),
        };
        events.extend(resolve::end_turn(actor, acting, opponent));
        self.turn_index += 1;

        if self.enemy.is_down() {
            self.phase = Phase::Victory;
            events.push(BattleEvent::Victory {
                turns: self.turn_index,
            });
            log::debug!("battle won at {} in {} turns", self.stage, self.turn_index);
        } else if self.player.is_down() {
            self.phase = Phase::Defeat;
            events.push(BattleEvent::Defeat {
                turns: self.turn_index,
            });
            log::debug!("battle lost at {} in {} turns", self.stage, self.turn_index);
        } else if self.turn_index >= self.options.max_turns {
            self.phase = Phase::Defeat;
            events.push(BattleEvent::TurnLimit {
                turns: self.turn_index,
            });
            events.push(BattleEvent::Defeat {
                turns: self.turn_index,
            });
            log::debug!("battle at {} hit the turn limit", self.stage);
        } else {
            self.phase = Phase::turn_of(actor.opponent());
        }
        self.history.extend(events.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SkinId;
    use crate::effects::StatusKind;

    fn setup() -> (Catalog, Snapshot) {
        let catalog = Catalog::builtin();
        let snapshot = Snapshot::new(&catalog, "Aria", 0, "device");
        (catalog, snapshot)
    }

    #[test]
    fn faster_player_opens() {
        let (catalog, snapshot) = setup();
        let battle = Battle::enter(&snapshot, &catalog, StageId::new(0, 1), BattleOptions::default())
            .unwrap();
        assert_eq!(battle.phase(), Phase::PlayerTurn);
        assert!(matches!(
            battle.history()[0],
            BattleEvent::Entered {
                first: Side::Player,
                ..
            }
        ));
    }

    #[test]
    fn tie_respects_option() {
        let (catalog, mut snapshot) = setup();
        snapshot.player.speed = 9;
        let options = BattleOptions {
            player_first_tiebreak: false,
            ..BattleOptions::default()
        };
        let battle = Battle::enter(&snapshot, &catalog, StageId::new(0, 1), options).unwrap();
        assert_eq!(battle.phase(), Phase::EnemyTurn);
    }

    #[test]
    fn locked_and_unknown_stages_are_rejected() {
        let (catalog, snapshot) = setup();
        let options = BattleOptions::default();
        assert_eq!(
            Battle::enter(&snapshot, &catalog, StageId::new(0, 2), options).unwrap_err(),
            ActionError::StageLocked(StageId::new(0, 2))
        );
        assert_eq!(
            Battle::enter(&snapshot, &catalog, StageId::new(0, 31), options).unwrap_err(),
            ActionError::UnknownStage(StageId::new(0, 31))
        );
    }

    #[test]
    fn sides_alternate_and_out_of_turn_is_rejected() {
        let (catalog, snapshot) = setup();
        let mut battle = Battle::enter_with_dice(
            &snapshot,
            &catalog,
            StageId::new(0, 1),
            BattleOptions::default(),
            ScriptedDice::neutral(),
        )
        .unwrap();
        assert_eq!(battle.auto_step_enemy(), Err(ActionError::NotEnemyTurn));
        battle.submit_action(&BattleAction::Attack).unwrap();
        assert_eq!(battle.phase(), Phase::EnemyTurn);
        assert_eq!(battle.enemy().hp, 90);
        assert_eq!(
            battle.submit_action(&BattleAction::Attack),
            Err(ActionError::NotPlayerTurn)
        );
        battle.auto_step_enemy().unwrap();
        assert_eq!(battle.phase(), Phase::PlayerTurn);
        assert_eq!(battle.turn_index(), 2);
    }

    #[test]
    fn invalid_skill_does_not_consume_turn() {
        let (catalog, mut snapshot) = setup();
        snapshot.player.equipped_skin = SkinId::new("windrunner");
        let mut battle = Battle::enter_with_dice(
            &snapshot,
            &catalog,
            StageId::new(0, 1),
            BattleOptions::default(),
            ScriptedDice::neutral(),
        )
        .unwrap();
        let before = battle.history().len();
        assert_eq!(
            battle.submit_action(&BattleAction::UseSkill(SkillId::new("instant_heal"))),
            Err(ActionError::SkillUnavailable(SkillId::new("instant_heal")))
        );
        assert_eq!(battle.history().len(), before);
        assert_eq!(battle.turn_index(), 0);

        battle
            .submit_action(&BattleAction::UseSkill(SkillId::new("speed_boost")))
            .unwrap();
        assert!(battle.player().effects.has(StatusKind::SpeedBoost));
        battle.auto_step_enemy().unwrap();
        assert!(matches!(
            battle.submit_action(&BattleAction::UseSkill(SkillId::new("speed_boost"))),
            Err(ActionError::OnCooldown { remaining: 28, .. })
        ));
        assert_eq!(battle.phase(), Phase::PlayerTurn);
    }

    #[test]
    fn finished_battle_rejects_actions() {
        let (catalog, snapshot) = setup();
        let mut battle =
            Battle::enter(&snapshot, &catalog, StageId::new(0, 1), BattleOptions::with_seed(3))
                .unwrap();
        battle.auto_resolve(&mut AlwaysAttack);
        assert!(battle.is_finished());
        assert_eq!(
            battle.submit_action(&BattleAction::Attack),
            Err(ActionError::BattleOver)
        );
        assert_eq!(battle.auto_step_enemy(), Err(ActionError::BattleOver));
    }

    #[test]
    fn turn_limit_ends_in_defeat() {
        let (catalog, snapshot) = setup();
        let options = BattleOptions {
            max_turns: 3,
            ..BattleOptions::with_seed(1)
        };
        let mut battle = Battle::enter(&snapshot, &catalog, StageId::new(0, 1), options).unwrap();
        let mut defend = |_: &Combatant, _: &Combatant, _: u32| BattleAction::Defend;
        let events = battle.auto_resolve(&mut defend);
        assert_eq!(battle.outcome(), Some(BattleOutcome::Defeat));
        assert_eq!(battle.turn_index(), 3);
        assert!(events.contains(&BattleEvent::TurnLimit { turns: 3 }));
    }

    #[test]
    fn same_seed_replays_identically() {
        let (catalog, snapshot) = setup();
        let run = |seed| {
            let mut battle =
                Battle::enter(&snapshot, &catalog, StageId::new(0, 1), BattleOptions::with_seed(seed))
                    .unwrap();
            battle.auto_resolve(&mut AlwaysAttack);
            battle.history().to_vec()
        };
        assert_eq!(run(11), run(11));
    }

    #[test]
    fn every_attack_deals_at_least_one() {
        let (catalog, snapshot) = setup();
        for seed in 0..20 {
            let mut battle =
                Battle::enter(&snapshot, &catalog, StageId::new(0, 1), BattleOptions::with_seed(seed))
                    .unwrap();
            for event in battle.auto_resolve(&mut AlwaysAttack) {
                if let BattleEvent::Attacked { damage, .. } = event {
                    assert!(damage >= 1);
                }
            }
            assert!(battle.turn_index() <= battle.options().max_turns);
        }
    }
}
