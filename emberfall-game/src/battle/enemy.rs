//! Enemy decision making.
use crate::constants::ENEMY_SKILL_PCT;

use super::dice::CombatDice;
use super::state::Combatant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyMove {
    Attack,
    Skill(usize),
}

/// Attack most of the time; otherwise use a random skill that is off
/// cooldown. Falls back to attacking when nothing is ready.
pub fn choose_move<D: CombatDice + ?Sized>(enemy: &Combatant, dice: &mut D) -> EnemyMove {
    if enemy.skills.is_empty() || dice.percent() >= ENEMY_SKILL_PCT {
        return EnemyMove::Attack;
    }
    let ready = enemy.ready_skills();
    if ready.is_empty() {
        return EnemyMove::Attack;
    }
    let choice = dice.pick(ready.len());
    ready
        .get(choice)
        .copied()
        .map_or(EnemyMove::Attack, EnemyMove::Skill)
}
