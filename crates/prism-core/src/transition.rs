//! Eased transitions between published states.

use crate::constants::*;
use crate::state::{continuity_index, StateField, VisualEffectState};
use std::f32::consts::PI;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Easing {
    Linear,
    #[default]
    SmoothCubic,
    Harmonic,
    Exponential,
}

impl Easing {
    /// Map progress in \[0, 1\] to eased progress in \[0, 1\].
    pub fn apply(self, t: f32) -> f32 {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 1.0 };
        match self {
            Easing::Linear => t,
            Easing::SmoothCubic => t * t * (3.0 - 2.0 * t),
            Easing::Harmonic => 0.5 - 0.5 * (PI * t).cos(),
            Easing::Exponential => {
                let k = EXPONENTIAL_EASE_RATE;
                (1.0 - (-k * t).exp()) / (1.0 - (-k).exp())
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct TransitionConfig {
    pub easing: Easing,
    /// Duration of a normal transition; 0 snaps straight to the target.
    pub duration_ms: f32,
    /// Fraction of `duration_ms` used when the target jumps.
    pub fast_duration_factor: f32,
    /// Continuity below this marks a big jump.
    pub coherence_threshold: f32,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            easing: Easing::default(),
            duration_ms: TRANSITION_DURATION_MS,
            fast_duration_factor: FAST_TRANSITION_FACTOR,
            coherence_threshold: COHERENCE_THRESHOLD,
        }
    }
}

#[derive(Clone, Debug)]
struct ActiveTransition {
    from: VisualEffectState,
    to: VisualEffectState,
    elapsed_ms: f32,
    duration_ms: f32,
}

impl ActiveTransition {
    fn progress(&self) -> f32 {
        if self.duration_ms <= 0.0 {
            1.0
        } else {
            (self.elapsed_ms / self.duration_ms).min(1.0)
        }
    }

    fn finished(&self) -> bool {
        self.progress() >= 1.0
    }
}

/// Tracks the in-flight transition across ticks.
///
/// Small drifts of the target are folded into the running transition so motion
/// stays continuous. A target that jumps (continuity under the threshold)
/// starts a fresh, shorter transition so lag does not pile up.
pub struct TransitionDriver {
    config: TransitionConfig,
    active: Option<ActiveTransition>,
}

impl TransitionDriver {
    pub fn new(config: TransitionConfig) -> Self {
        Self {
            config,
            active: None,
        }
    }

    pub fn config(&self) -> &TransitionConfig {
        &self.config
    }

    pub fn set_easing(&mut self, easing: Easing) {
        self.config.easing = easing;
    }

    /// Duration a fresh transition from `current` to `target` would get.
    pub fn duration_for(&self, current: &VisualEffectState, target: &VisualEffectState) -> f32 {
        if continuity_index(current, target) < self.config.coherence_threshold {
            self.config.duration_ms * self.config.fast_duration_factor
        } else {
            self.config.duration_ms
        }
    }

    /// Advance by `delta_ms` towards `target`, returning the interpolated state.
    ///
    /// Only the smoothed fields are written; everything else comes from `target`.
    pub fn advance(
        &mut self,
        current: &VisualEffectState,
        target: &VisualEffectState,
        delta_ms: f32,
    ) -> VisualEffectState {
        let restart = match &self.active {
            None => true,
            Some(active) => {
                active.finished()
                    || continuity_index(&active.to, target) < self.config.coherence_threshold
            }
        };
        if restart {
            let duration_ms = self.duration_for(current, target);
            if duration_ms < self.config.duration_ms {
                log::trace!("[transition] big jump, shortening to {:.0}ms", duration_ms);
            }
            self.active = Some(ActiveTransition {
                from: *current,
                to: *target,
                elapsed_ms: 0.0,
                duration_ms,
            });
        }

        let easing = self.config.easing;
        let Some(active) = self.active.as_mut() else {
            return *target;
        };
        active.to = *target;
        active.elapsed_ms += delta_ms.max(0.0);
        let eased = easing.apply(active.progress());

        let mut out = *target;
        for field in StateField::SMOOTHED {
            let a = active.from.get(field);
            let b = active.to.get(field);
            out.set(field, a + (b - a) * eased);
        }
        out
    }

    /// Forget the running transition; the next advance starts fresh.
    pub fn reset(&mut self) {
        self.active = None;
    }
}
