//! Hit points and hit delivery.

use bevy::prelude::*;

/// Hit points of anything a pogo can damage.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq, Eq)]
#[reflect(Component)]
pub struct Health {
    pub current: i32,
    pub max: i32,
}

impl Default for Health {
    fn default() -> Self {
        Self::new(3)
    }
}

impl Health {
    pub fn new(max: i32) -> Self {
        let max = max.max(1);
        Self { current: max, max }
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0
    }

    /// Subtract `amount` (never below zero) and return the remaining hit points.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        self.current = (self.current - amount.max(0)).max(0);
        self.current
    }

    pub fn heal(&mut self, amount: i32) {
        self.current = (self.current + amount.max(0)).min(self.max);
    }
}

/// Damage dealt to `target` by `attacker`.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitReceived {
    pub target: Entity,
    pub attacker: Entity,
    pub damage: i32,
}

/// Apply queued hits to [`Health`]. Targets without health only receive the message.
pub fn apply_hits(mut hits: MessageReader<HitReceived>, mut targets: Query<&mut Health>) {
    for hit in hits.read() {
        let Ok(mut health) = targets.get_mut(hit.target) else {
            trace!("hit on {:?} without health", hit.target);
            continue;
        };
        if health.is_dead() {
            continue;
        }
        let remaining = health.take_damage(hit.damage);
        debug!("{:?} took {} damage, {} left", hit.target, hit.damage, remaining);
    }
}
