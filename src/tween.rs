//! Time-driven tweens.
//!
//! Tweens are plain values advanced by whatever clock the caller owns:
//! knockback runs on scaled gameplay time, camera feedback runs on real
//! time so it still plays while the game is slowed down.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Values that can be linearly interpolated.
pub trait Lerp: Copy {
    fn lerp_to(self, target: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp_to(self, target: Self, t: f32) -> Self {
        self + (target - self) * t
    }
}

impl Lerp for Vec2 {
    fn lerp_to(self, target: Self, t: f32) -> Self {
        self.lerp(target, t)
    }
}

impl Lerp for Vec3 {
    fn lerp_to(self, target: Self, t: f32) -> Self {
        self.lerp(target, t)
    }
}

/// Easing curve applied to normalized time.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    #[default]
    Linear,
    /// Hermite `t * t * (3 - 2t)`.
    SmoothStep,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::SmoothStep => t * t * (3.0 - 2.0 * t),
        }
    }
}

/// Interpolates from `start` to `target` over `duration`.
///
/// A zero (or negative) duration completes on the first advance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween<T: Lerp> {
    pub start: T,
    pub target: T,
    pub duration: f32,
    pub easing: Easing,
    elapsed: f32,
}

impl<T: Lerp> Tween<T> {
    pub fn new(start: T, target: T, duration: f32, easing: Easing) -> Self {
        Self {
            start,
            target,
            duration,
            easing,
            elapsed: 0.0,
        }
    }

    /// Advance by `dt` and return the new value.
    pub fn advance(&mut self, dt: f32) -> T {
        self.elapsed += dt.max(0.0);
        self.value()
    }

    /// Current value.
    pub fn value(&self) -> T {
        if self.is_finished() {
            return self.target;
        }
        self.start
            .lerp_to(self.target, self.easing.apply(self.elapsed / self.duration))
    }

    pub fn is_finished(&self) -> bool {
        self.duration <= 0.0 || self.elapsed >= self.duration
    }

    /// Jump to the end and return the target.
    pub fn finish(&mut self) -> T {
        self.elapsed = self.duration.max(0.0);
        self.target
    }

    /// Normalized progress in `0..=1`.
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        }
    }
}

/// Random jitter around a rest offset, decaying linearly to rest over `duration`.
#[derive(Debug, Clone)]
pub struct ShakeTween {
    pub amplitude: f32,
    pub duration: f32,
    /// Scale of the vertical jitter relative to the horizontal one.
    pub vertical_scale: f32,
    rest: Vec3,
    elapsed: f32,
    rng: StdRng,
}

impl ShakeTween {
    pub fn new(rest: Vec3, amplitude: f32, duration: f32) -> Self {
        Self {
            amplitude,
            duration,
            vertical_scale: 1.0,
            rest,
            elapsed: 0.0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Builder: deterministic jitter.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Builder: scale the vertical jitter.
    pub fn with_vertical_scale(mut self, scale: f32) -> Self {
        self.vertical_scale = scale;
        self
    }

    /// Offset the shake returns to.
    pub fn rest(&self) -> Vec3 {
        self.rest
    }

    /// Advance by `dt` and return the current offset.
    pub fn advance(&mut self, dt: f32) -> Vec3 {
        if self.is_finished() {
            return self.rest;
        }
        let decay = 1.0 - self.elapsed / self.duration.max(1e-4);
        self.elapsed += dt.max(0.0);
        if self.is_finished() {
            return self.rest;
        }
        let jitter = Vec3::new(
            self.rng.gen_range(-1.0_f32..=1.0),
            self.rng.gen_range(-1.0_f32..=1.0) * self.vertical_scale,
            self.rng.gen_range(-1.0_f32..=1.0),
        );
        self.rest + jitter * self.amplitude * decay
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Stop immediately and return the rest offset.
    pub fn cancel(&mut self) -> Vec3 {
        self.elapsed = self.duration;
        self.rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Easing Tests ====================

    #[test]
    fn smoothstep_endpoints_and_midpoint() {
        assert_eq!(Easing::SmoothStep.apply(0.0), 0.0);
        assert_eq!(Easing::SmoothStep.apply(1.0), 1.0);
        assert_eq!(Easing::SmoothStep.apply(0.5), 0.5);
        assert!(Easing::SmoothStep.apply(0.25) < 0.25);
        assert_eq!(Easing::Linear.apply(2.0), 1.0);
    }

    // ==================== Tween Tests ====================

    #[test]
    fn tween_reaches_target_exactly() {
        let mut tween = Tween::new(Vec3::ZERO, Vec3::X * 2.0, 0.12, Easing::SmoothStep);
        let mut last = Vec3::ZERO;
        while !tween.is_finished() {
            let value = tween.advance(1.0 / 60.0);
            assert!(value.x >= last.x);
            last = value;
        }
        assert_eq!(tween.value(), Vec3::X * 2.0);
        assert_eq!(tween.progress(), 1.0);
    }

    #[test]
    fn zero_duration_tween_completes_immediately() {
        let mut tween = Tween::new(0.0_f32, 5.0, 0.0, Easing::Linear);
        assert!(tween.is_finished());
        assert_eq!(tween.advance(0.0), 5.0);
    }

    #[test]
    fn finish_snaps_to_target() {
        let mut tween = Tween::new(Vec2::ZERO, Vec2::ONE, 3.0, Easing::SmoothStep);
        tween.advance(0.5);
        assert_eq!(tween.finish(), Vec2::ONE);
        assert!(tween.is_finished());
        assert_eq!(tween.value(), Vec2::ONE);
    }

    #[test]
    fn linear_tween_midpoint() {
        let mut tween = Tween::new(0.0_f32, 10.0, 1.0, Easing::Linear);
        assert!((tween.advance(0.5) - 5.0).abs() < 1e-5);
    }

    // ==================== ShakeTween Tests ====================

    #[test]
    fn shake_stays_within_amplitude_and_settles() {
        let rest = Vec3::new(0.5, 0.2, -1.0);
        let mut shake = ShakeTween::new(rest, 0.12, 0.08).with_seed(7);

        for _ in 0..4 {
            let offset = shake.advance(0.01);
            let jitter = offset - rest;
            assert!(jitter.x.abs() <= 0.12 + 1e-6);
            assert!(jitter.y.abs() <= 0.12 + 1e-6);
            assert!(jitter.z.abs() <= 0.12 + 1e-6);
        }

        for _ in 0..10 {
            shake.advance(0.01);
        }
        assert!(shake.is_finished());
        assert_eq!(shake.advance(0.01), rest);
    }

    #[test]
    fn cancel_returns_rest() {
        let mut shake = ShakeTween::new(Vec3::ONE, 1.0, 10.0).with_seed(1);
        shake.advance(0.1);
        assert_eq!(shake.cancel(), Vec3::ONE);
        assert!(shake.is_finished());
    }
}
