use clap::ValueEnum;
use serde::Serialize;
use std::fmt;

use emberfall_game::{BattleAction, Combatant, PlayerPolicy, SkillEffect, SkillId};

/// Built-in play styles for automated campaigns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Attack every turn
    Brawler,
    /// Defend and heal when hurt, attack otherwise
    Cautious,
    /// Fire any ready skill before attacking
    Tactician,
}

impl Strategy {
    pub const ALL: [Self; 3] = [Self::Brawler, Self::Cautious, Self::Tactician];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Brawler => "Brawler",
            Self::Cautious => "Cautious",
            Self::Tactician => "Tactician",
        }
    }

    #[must_use]
    pub fn create_policy(self) -> Box<dyn PlayerPolicy> {
        match self {
            Self::Brawler => Box::new(emberfall_game::AlwaysAttack),
            Self::Cautious => Box::new(CautiousPolicy),
            Self::Tactician => Box::new(TacticianPolicy),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct CautiousPolicy;
struct TacticianPolicy;

fn ready_skill(player: &Combatant, wanted: impl Fn(SkillEffect) -> bool) -> Option<SkillId> {
    player
        .skills
        .iter()
        .find(|slot| slot.is_ready() && wanted(slot.effect))
        .map(|slot| SkillId::new(&slot.key))
}

const fn is_heal(effect: SkillEffect) -> bool {
    matches!(effect, SkillEffect::Heal { .. })
}

impl PlayerPolicy for CautiousPolicy {
    fn choose(&mut self, player: &Combatant, _enemy: &Combatant, _turn: u32) -> BattleAction {
        let hurt = player.hp * 10 < player.max_hp * 3;
        if !hurt {
            return BattleAction::Attack;
        }
        ready_skill(player, is_heal).map_or(BattleAction::Defend, BattleAction::UseSkill)
    }
}

impl PlayerPolicy for TacticianPolicy {
    fn choose(&mut self, player: &Combatant, _enemy: &Combatant, _turn: u32) -> BattleAction {
        let full_hp = player.hp >= player.max_hp;
        ready_skill(player, |effect| !(full_hp && is_heal(effect)))
            .map_or(BattleAction::Attack, BattleAction::UseSkill)
    }
}
