//! Status effects carried by a battle side.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Kinds of transient modifiers. At most one effect of each kind is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    SpeedBoost,
    DamageDoubler,
    Defending,
}

impl StatusKind {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::SpeedBoost => "status.speed-boost",
            Self::DamageDoubler => "status.damage-doubler",
            Self::Defending => "status.defending",
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: StatusKind,
    /// Turns left; always positive while the effect is stored.
    pub remaining: u32,
    /// Percentage magnitude (speed bonus); zero when the kind has none.
    #[serde(default)]
    pub magnitude_pct: u32,
}

/// Small inline list of active effects, one slot per kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct StatusEffects(SmallVec<[StatusEffect; 3]>);

impl StatusEffects {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an effect or refresh the existing one of the same kind.
    /// A zero duration never creates an effect.
    pub fn apply(&mut self, kind: StatusKind, duration: u32, magnitude_pct: u32) {
        if duration == 0 {
            return;
        }
        let effect = StatusEffect {
            kind,
            remaining: duration,
            magnitude_pct,
        };
        if let Some(slot) = self.0.iter_mut().find(|e| e.kind == kind) {
            *slot = effect;
        } else {
            self.0.push(effect);
        }
    }

    #[must_use]
    pub fn has(&self, kind: StatusKind) -> bool {
        self.0.iter().any(|e| e.kind == kind)
    }

    #[must_use]
    pub fn get(&self, kind: StatusKind) -> Option<&StatusEffect> {
        self.0.iter().find(|e| e.kind == kind)
    }

    /// Remove and return the effect of `kind`, if active.
    pub fn consume(&mut self, kind: StatusKind) -> Option<StatusEffect> {
        let index = self.0.iter().position(|e| e.kind == kind)?;
        Some(self.0.remove(index))
    }

    /// Decrement every duration by one turn and drop the effects that reach
    /// zero, returning their kinds in storage order.
    pub fn tick(&mut self) -> SmallVec<[StatusKind; 3]> {
        let mut expired = SmallVec::new();
        for effect in &mut self.0 {
            effect.remaining = effect.remaining.saturating_sub(1);
            if effect.remaining == 0 {
                expired.push(effect.kind);
            }
        }
        self.0.retain(|e| e.remaining > 0);
        expired
    }

    /// Sum of active speed multipliers, in percent.
    #[must_use]
    pub fn speed_bonus_pct(&self) -> u32 {
        self.0
            .iter()
            .filter(|e| e.kind == StatusKind::SpeedBoost)
            .map(|e| e.magnitude_pct)
            .sum()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StatusEffect> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_refreshes_instead_of_stacking() {
        let mut effects = StatusEffects::new();
        effects.apply(StatusKind::SpeedBoost, 2, 50);
        effects.apply(StatusKind::SpeedBoost, 5, 50);
        assert_eq!(effects.len(), 1);
        assert_eq!(effects.get(StatusKind::SpeedBoost).unwrap().remaining, 5);
        assert_eq!(effects.speed_bonus_pct(), 50);
    }

    #[test]
    fn zero_duration_is_ignored() {
        let mut effects = StatusEffects::new();
        effects.apply(StatusKind::DamageDoubler, 0, 0);
        assert!(effects.is_empty());
    }

    #[test]
    fn tick_removes_effects_at_zero() {
        let mut effects = StatusEffects::new();
        effects.apply(StatusKind::Defending, 1, 0);
        effects.apply(StatusKind::SpeedBoost, 2, 50);
        let expired = effects.tick();
        assert_eq!(expired.as_slice(), &[StatusKind::Defending]);
        assert!(effects.has(StatusKind::SpeedBoost));
        let expired = effects.tick();
        assert_eq!(expired.as_slice(), &[StatusKind::SpeedBoost]);
        assert!(effects.is_empty());
    }

    #[test]
    fn consume_removes_single_kind() {
        let mut effects = StatusEffects::new();
        effects.apply(StatusKind::DamageDoubler, 7, 0);
        effects.apply(StatusKind::Defending, 2, 0);
        assert!(effects.consume(StatusKind::DamageDoubler).is_some());
        assert!(effects.consume(StatusKind::DamageDoubler).is_none());
        assert!(effects.has(StatusKind::Defending));
    }
}
