//! Stamina regeneration clock and the subscriptions that raise its cap.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::{Catalog, SubscriptionKind};
use crate::numbers::clamp_i64_to_u32;
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamina {
    pub current: u32,
    /// Cap derived from subscriptions; recomputed on load.
    pub max: u32,
    pub last_accrual_time: i64,
}

impl Stamina {
    /// A full bar whose regeneration clock starts at `now`.
    #[must_use]
    pub const fn full(max: u32, now: i64) -> Self {
        Self {
            current: max,
            max,
            last_accrual_time: now,
        }
    }

    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.current >= self.max
    }

    /// Grant one point per elapsed `interval` seconds, up to `max`.
    ///
    /// The clock advances only by the seconds consumed by granted points, so
    /// partial intervals carry over between calls, including the call that
    /// fills the bar. Accrual is paused while `current >= max` and the clock
    /// is left where it is. A clock that moved backwards is clamped.
    /// Returns the number of points granted.
    pub fn accrue(&mut self, now: i64, interval: i64) -> u32 {
        if now < self.last_accrual_time {
            log::warn!(
                "clock warp: now {now} precedes last accrual {}",
                self.last_accrual_time
            );
            self.last_accrual_time = now;
            return 0;
        }
        if self.is_full() || interval <= 0 {
            return 0;
        }

        let elapsed = now - self.last_accrual_time;
        let earned = elapsed / interval;
        let room = i64::from(self.max - self.current);
        let granted = earned.min(room);
        let granted_points = clamp_i64_to_u32(granted);
        self.current += granted_points;
        self.last_accrual_time += granted * interval;
        granted_points
    }

    /// Spend `amount` points if available.
    pub const fn spend(&mut self, amount: u32) -> bool {
        if self.current < amount {
            return false;
        }
        self.current -= amount;
        true
    }

    /// Replace the cap without touching the current value.
    pub const fn set_max(&mut self, max: u32) {
        self.max = max;
    }

    /// Seconds until the next point, or `None` while the bar is full.
    #[must_use]
    pub fn seconds_until_next(&self, now: i64, interval: i64) -> Option<i64> {
        if self.is_full() || interval <= 0 {
            return None;
        }
        let elapsed = (now - self.last_accrual_time).max(0);
        Some(interval - elapsed % interval)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub kind: SubscriptionKind,
    pub active: bool,
    pub expires_at: i64,
}

impl Subscription {
    #[must_use]
    pub const fn is_active_at(&self, now: i64) -> bool {
        self.expires_at > now
    }
}

/// Subscriptions keyed by tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Subscriptions(BTreeMap<SubscriptionKind, Subscription>);

impl Subscriptions {
    #[must_use]
    pub fn get(&self, kind: SubscriptionKind) -> Option<&Subscription> {
        self.0.get(&kind)
    }

    /// Start a subscription, or extend it from its expiry when still active.
    pub fn activate(&mut self, kind: SubscriptionKind, now: i64, duration: i64) {
        let entry = self.0.entry(kind).or_insert(Subscription {
            kind,
            active: false,
            expires_at: now,
        });
        let start = if entry.is_active_at(now) {
            entry.expires_at
        } else {
            now
        };
        entry.expires_at = start.saturating_add(duration.max(0));
        entry.active = entry.is_active_at(now);
    }

    /// Recompute `active` flags, returning the tiers that lapsed.
    pub fn refresh(&mut self, now: i64) -> Vec<SubscriptionKind> {
        let mut lapsed = Vec::new();
        for sub in self.0.values_mut() {
            let active = sub.is_active_at(now);
            if sub.active && !active {
                lapsed.push(sub.kind);
            }
            sub.active = active;
        }
        lapsed
    }

    /// Most generous tier still active at `now`.
    #[must_use]
    pub fn best_tier(&self, now: i64, catalog: &Catalog) -> Option<SubscriptionKind> {
        self.0
            .values()
            .filter(|s| s.is_active_at(now))
            .map(|s| s.kind)
            .max_by_key(|kind| catalog.stamina_max_for(Some(*kind)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subscription> {
        self.0.values()
    }
}

/// Refresh subscription flags and re-derive the stamina cap.
pub fn sync_stamina_cap(snapshot: &mut Snapshot, catalog: &Catalog, now: i64) {
    for kind in snapshot.subscriptions.refresh(now) {
        log::info!("subscription {kind:?} expired at {now}");
    }
    let tier = snapshot.subscriptions.best_tier(now, catalog);
    snapshot.stamina.set_max(catalog.stamina_max_for(tier));
}

/// Bring the stamina bar up to `now`. Returns the points granted.
pub fn stamina_accrue(snapshot: &mut Snapshot, catalog: &Catalog, now: i64) -> u32 {
    sync_stamina_cap(snapshot, catalog, now);
    snapshot
        .stamina
        .accrue(now, catalog.stamina.accrual_secs)
}

/// Spend stamina, recording the spend in the lifetime stats.
pub fn stamina_spend(snapshot: &mut Snapshot, amount: u32) -> bool {
    if !snapshot.stamina.spend(amount) {
        return false;
    }
    snapshot.stats.stamina_spent += u64::from(amount);
    true
}
