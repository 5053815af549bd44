//! Combat primitives shared by both sides.
use crate::catalog::{CombatCfg, SkillEffect};
use crate::constants::{
    DAMAGE_DOUBLER_FACTOR, DEFEND_DURATION, DEFENDING_DAMAGE_FACTOR, DEFENSE_REDUCTION_RATIO,
    MIN_DAMAGE,
};
use crate::effects::StatusKind;
use crate::numbers::{floor_f64_to_i32, percent_of};

use super::dice::CombatDice;
use super::state::{BattleEvent, Combatant, Side};

/// Result of one attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strike {
    pub damage: i32,
    pub critical: bool,
    pub doubled: bool,
    pub blocked: bool,
}

/// Resolve an attack from `attacker` onto `defender`.
///
/// Variance, then doubler, then critical, then the defending halving; the
/// defense reduction is subtracted last and the result floored at 1.
/// Doubler and defending are consumed when they apply.
pub fn strike<D: CombatDice + ?Sized>(
    attacker: &mut Combatant,
    defender: &mut Combatant,
    dice: &mut D,
    combat: &CombatCfg,
) -> Strike {
    let mut base = f64::from(attacker.attack) * dice.variance();

    let doubled = attacker.effects.consume(StatusKind::DamageDoubler).is_some();
    if doubled {
        base *= DAMAGE_DOUBLER_FACTOR;
    }
    let critical = dice.unit() < combat.crit_chance;
    if critical {
        base *= combat.crit_multiplier;
    }
    let reduction = f64::from(defender.defense) * DEFENSE_REDUCTION_RATIO;
    let blocked = defender.effects.consume(StatusKind::Defending).is_some();
    if blocked {
        base *= DEFENDING_DAMAGE_FACTOR;
    }

    let damage = floor_f64_to_i32(base - reduction).max(MIN_DAMAGE);
    defender.hp = defender.hp.saturating_sub(damage);
    Strike {
        damage,
        critical,
        doubled,
        blocked,
    }
}

pub fn attack_event(actor: Side, strike: Strike, target_hp: i32) -> BattleEvent {
    BattleEvent::Attacked {
        actor,
        damage: strike.damage,
        critical: strike.critical,
        doubled: strike.doubled,
        blocked: strike.blocked,
        target_hp,
    }
}

pub fn defend(actor: Side, combatant: &mut Combatant) -> BattleEvent {
    combatant
        .effects
        .apply(StatusKind::Defending, DEFEND_DURATION, 0);
    BattleEvent::Defended { actor }
}

/// Resolve the skill in `slot` for `actor` and start its cooldown.
pub fn use_skill(actor: Side, combatant: &mut Combatant, slot: usize) -> Vec<BattleEvent> {
    let Some(skill) = combatant.skills.get(slot).cloned() else {
        return Vec::new();
    };
    let mut events = Vec::with_capacity(2);
    match skill.effect {
        SkillEffect::Guard => {
            events.push(BattleEvent::SkillUsed {
                actor,
                skill: skill.key.clone(),
            });
            combatant
                .effects
                .apply(StatusKind::Defending, skill.duration, 0);
            events.push(BattleEvent::Defended { actor });
        }
        SkillEffect::SpeedBoost { multiplier_pct } => {
            events.push(BattleEvent::SkillUsed {
                actor,
                skill: skill.key.clone(),
            });
            combatant
                .effects
                .apply(StatusKind::SpeedBoost, skill.duration, multiplier_pct);
        }
        SkillEffect::DamageDoubler => {
            events.push(BattleEvent::SkillUsed {
                actor,
                skill: skill.key.clone(),
            });
            combatant
                .effects
                .apply(StatusKind::DamageDoubler, skill.duration, 0);
        }
        SkillEffect::Heal { pct_of_max_hp } => {
            events.push(BattleEvent::SkillUsed {
                actor,
                skill: skill.key.clone(),
            });
            let amount = combatant.heal(percent_of(combatant.max_hp, pct_of_max_hp));
            events.push(BattleEvent::Healed {
                actor,
                amount,
                hp: combatant.hp,
            });
        }
    }
    if let Some(live) = combatant.skills.get_mut(slot) {
        live.remaining = live.cooldown;
    }
    events
}

/// End-of-turn bookkeeping. Only the acting side's effects tick; every
/// skill cooldown on both sides counts down one turn.
pub fn end_turn(
    actor: Side,
    acting: &mut Combatant,
    opponent: &mut Combatant,
) -> Vec<BattleEvent> {
    let expired = acting.effects.tick();
    acting.tick_cooldowns();
    opponent.tick_cooldowns();
    expired
        .into_iter()
        .map(|effect| BattleEvent::EffectExpired { actor, effect })
        .collect()
}
