//! Closed-loop quality control: telemetry in, [`QualitySettings`] out.
//!
//! The controller moves one [`QualityLevel`] at a time and waits out a cooldown
//! between decisions so that a frame rate hovering around a threshold cannot
//! make it oscillate. Critical thermal readings and low battery are treated as
//! safety conditions and may drop several levels at once.

use crate::constants::*;
use crate::device::DeviceCapabilityProfile;
use crate::telemetry::{TelemetrySnapshot, ThermalState};
use std::fmt;

/// Discrete fidelity tier. Ordered so that `Ultra > High > ... > Minimal`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QualityLevel {
    Minimal,
    Low,
    Medium,
    High,
    Ultra,
}

impl QualityLevel {
    pub const ALL: [QualityLevel; 5] = [
        QualityLevel::Minimal,
        QualityLevel::Low,
        QualityLevel::Medium,
        QualityLevel::High,
        QualityLevel::Ultra,
    ];

    fn index(self) -> usize {
        self as usize
    }

    fn from_index(index: usize) -> Self {
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }

    pub fn step_down(self) -> Self {
        self.lower_by(1)
    }

    pub fn step_up(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    pub fn lower_by(self, steps: u8) -> Self {
        Self::from_index(self.index().saturating_sub(steps as usize))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QualityLevel::Minimal => "minimal",
            QualityLevel::Low => "low",
            QualityLevel::Medium => "medium",
            QualityLevel::High => "high",
            QualityLevel::Ultra => "ultra",
        }
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource envelope a level is expected to stay inside.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelBudget {
    pub target_fps: f32,
    pub memory_budget_mb: f32,
    pub cpu_budget_pct: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TransitionQuality {
    Instant,
    Basic,
    Balanced,
    Smooth,
    Cinematic,
}

impl TransitionQuality {
    /// Upper bound applied to the state's transition-fluidity.
    pub fn fluidity_cap(self) -> f32 {
        match self {
            TransitionQuality::Instant => 0.2,
            TransitionQuality::Basic => 0.4,
            TransitionQuality::Balanced => 0.6,
            TransitionQuality::Smooth => 0.8,
            TransitionQuality::Cinematic => 1.0,
        }
    }
}

/// Expensive post-processing passes a renderer may skip.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PostEffects {
    pub bloom: bool,
    pub glow: bool,
    pub motion_blur: bool,
    pub backdrop_blur: bool,
}

/// Knobs renderers read every frame. Only the controller produces these.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QualitySettings {
    pub level: QualityLevel,
    pub render_complexity: f32,
    pub element_density: f32,
    pub target_fps: f32,
    pub transition_quality: TransitionQuality,
    pub post_effects: PostEffects,
}

impl QualitySettings {
    pub fn for_level(level: QualityLevel, budget: &LevelBudget, refresh_rate_hz: f32) -> Self {
        let (render_complexity, element_density, transition_quality, post_effects) = match level {
            QualityLevel::Ultra => (
                1.0,
                1.0,
                TransitionQuality::Cinematic,
                PostEffects {
                    bloom: true,
                    glow: true,
                    motion_blur: true,
                    backdrop_blur: true,
                },
            ),
            QualityLevel::High => (
                0.8,
                0.75,
                TransitionQuality::Smooth,
                PostEffects {
                    bloom: true,
                    glow: true,
                    motion_blur: false,
                    backdrop_blur: true,
                },
            ),
            QualityLevel::Medium => (
                0.6,
                0.5,
                TransitionQuality::Balanced,
                PostEffects {
                    glow: true,
                    ..PostEffects::default()
                },
            ),
            QualityLevel::Low => (0.4, 0.3, TransitionQuality::Basic, PostEffects::default()),
            QualityLevel::Minimal => (0.25, 0.15, TransitionQuality::Instant, PostEffects::default()),
        };
        Self {
            level,
            render_complexity,
            element_density,
            target_fps: budget.target_fps.min(refresh_rate_hz),
            transition_quality,
            post_effects,
        }
    }

    /// Single 0..1 fidelity figure published in the shared state.
    pub fn quality_scalar(&self) -> f32 {
        self.render_complexity
    }
}

#[derive(Clone, Debug)]
pub struct QualityConfig {
    pub min_samples: usize,
    pub adaptation_cooldown_ms: f64,
    pub upgrade_hold_ms: f64,
    pub downgrade_fps_ratio: f32,
    pub comfort_fps_ratio: f32,
    pub comfort_memory_ratio: f32,
    pub critical_drop_steps: u8,
    pub low_battery_threshold: f32,
    pub low_battery_ceiling: QualityLevel,
    /// Indexed from `Minimal` to `Ultra`.
    pub level_budgets: [LevelBudget; 5],
}

impl Default for QualityConfig {
    fn default() -> Self {
        let budget = |target_fps, memory_budget_mb, cpu_budget_pct| LevelBudget {
            target_fps,
            memory_budget_mb,
            cpu_budget_pct,
        };
        Self {
            min_samples: MIN_ADAPTATION_SAMPLES,
            adaptation_cooldown_ms: ADAPTATION_COOLDOWN_MS,
            upgrade_hold_ms: UPGRADE_HOLD_MS,
            downgrade_fps_ratio: DOWNGRADE_FPS_RATIO,
            comfort_fps_ratio: COMFORT_FPS_RATIO,
            comfort_memory_ratio: COMFORT_MEMORY_RATIO,
            critical_drop_steps: CRITICAL_DROP_STEPS,
            low_battery_threshold: LOW_BATTERY_THRESHOLD,
            low_battery_ceiling: QualityLevel::Low,
            level_budgets: [
                budget(24.0, 96.0, 20.0),
                budget(30.0, 160.0, 30.0),
                budget(45.0, 256.0, 40.0),
                budget(60.0, 384.0, 55.0),
                budget(60.0, 512.0, 70.0),
            ],
        }
    }
}

impl QualityConfig {
    pub fn budget(&self, level: QualityLevel) -> &LevelBudget {
        &self.level_budgets[level.index()]
    }
}

/// Why the controller changed level.
#[derive(Clone, Debug, PartialEq)]
pub enum AdaptationReason {
    LowFrameRate { avg_fps: f32, target_fps: f32 },
    MemoryPressure { used_mb: f32, budget_mb: f32 },
    ThermalPressure(ThermalState),
    CriticalThermal,
    LowBattery { level: f32 },
    SustainedHeadroom,
    Manual,
}

impl fmt::Display for AdaptationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdaptationReason::LowFrameRate {
                avg_fps,
                target_fps,
            } => write!(
                f,
                "frame rate {:.1} fps below target {:.0} fps",
                avg_fps, target_fps
            ),
            AdaptationReason::MemoryPressure { used_mb, budget_mb } => write!(
                f,
                "memory {:.0} MB over {:.0} MB budget",
                used_mb, budget_mb
            ),
            AdaptationReason::ThermalPressure(state) => {
                write!(f, "thermal state {:?}", state)
            }
            AdaptationReason::CriticalThermal => f.write_str("critical thermal state"),
            AdaptationReason::LowBattery { level } => {
                write!(f, "battery low ({:.0}%)", level * 100.0)
            }
            AdaptationReason::SustainedHeadroom => f.write_str("sustained performance headroom"),
            AdaptationReason::Manual => f.write_str("manual override"),
        }
    }
}

/// Structured record of one settings change.
#[derive(Clone, Debug, PartialEq)]
pub struct AdaptationEvent {
    pub previous: QualitySettings,
    pub current: QualitySettings,
    pub reason: AdaptationReason,
    pub at_ms: f64,
}

pub struct AdaptiveQualityController {
    config: QualityConfig,
    device: DeviceCapabilityProfile,
    settings: QualitySettings,
    last_adaptation_ms: Option<f64>,
    last_safety_ms: Option<f64>,
    headroom_since_ms: Option<f64>,
    adaptations: u64,
}

impl AdaptiveQualityController {
    pub fn new(device: DeviceCapabilityProfile, config: QualityConfig) -> Self {
        let level = device.recommended_level().min(device.max_level());
        let settings =
            QualitySettings::for_level(level, config.budget(level), device.refresh_rate_hz);
        log::info!("[quality] starting at {}", level);
        Self {
            config,
            device,
            settings,
            last_adaptation_ms: None,
            last_safety_ms: None,
            headroom_since_ms: None,
            adaptations: 0,
        }
    }

    /// Current settings. Pure read.
    pub fn current_settings(&self) -> QualitySettings {
        self.settings
    }

    pub fn current_level(&self) -> QualityLevel {
        self.settings.level
    }

    pub fn device(&self) -> &DeviceCapabilityProfile {
        &self.device
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Number of level changes so far.
    pub fn adaptations(&self) -> u64 {
        self.adaptations
    }

    /// Run one adaptation check against the latest telemetry.
    pub fn evaluate(
        &mut self,
        snapshot: &TelemetrySnapshot,
        now_ms: f64,
    ) -> Option<AdaptationEvent> {
        if let Some(event) = self.safety_override(snapshot, now_ms) {
            return Some(event);
        }
        if snapshot.sample_count < self.config.min_samples {
            return None;
        }

        let level = self.settings.level;
        let in_cooldown = self
            .last_adaptation_ms
            .is_some_and(|t| now_ms - t < self.config.adaptation_cooldown_ms);

        if let Some(reason) = self.pressure_reason(snapshot) {
            self.headroom_since_ms = None;
            if in_cooldown || level == QualityLevel::Minimal {
                return None;
            }
            return self.apply(level.step_down(), reason, now_ms);
        }

        if !self.has_headroom(snapshot) {
            self.headroom_since_ms = None;
            return None;
        }
        let since = *self.headroom_since_ms.get_or_insert(now_ms);
        if in_cooldown
            || now_ms - since < self.config.upgrade_hold_ms
            || level >= self.device.max_level()
        {
            return None;
        }
        self.apply(level.step_up(), AdaptationReason::SustainedHeadroom, now_ms)
    }

    /// Jump straight to `level` (clamped to what the device allows).
    pub fn force_level(&mut self, level: QualityLevel, now_ms: f64) -> Option<AdaptationEvent> {
        let level = level.min(self.device.max_level());
        if level == self.settings.level {
            return None;
        }
        self.apply(level, AdaptationReason::Manual, now_ms)
    }

    fn safety_override(
        &mut self,
        snapshot: &TelemetrySnapshot,
        now_ms: f64,
    ) -> Option<AdaptationEvent> {
        let level = self.settings.level;
        let recently = self
            .last_safety_ms
            .is_some_and(|t| now_ms - t < self.config.adaptation_cooldown_ms);

        if snapshot.thermal == ThermalState::Critical && !recently {
            let target = level.lower_by(self.config.critical_drop_steps);
            if target < level {
                self.last_safety_ms = Some(now_ms);
                return self.apply(target, AdaptationReason::CriticalThermal, now_ms);
            }
        }
        if let Some(battery) = snapshot.battery {
            let ceiling = self.config.low_battery_ceiling;
            if battery.is_low(self.config.low_battery_threshold) && level > ceiling {
                self.last_safety_ms = Some(now_ms);
                return self.apply(
                    ceiling,
                    AdaptationReason::LowBattery {
                        level: battery.level,
                    },
                    now_ms,
                );
            }
        }
        None
    }

    fn pressure_reason(&self, snapshot: &TelemetrySnapshot) -> Option<AdaptationReason> {
        let target_fps = self.settings.target_fps;
        let budget = self.config.budget(self.settings.level);
        if snapshot.avg_fps < target_fps * self.config.downgrade_fps_ratio {
            return Some(AdaptationReason::LowFrameRate {
                avg_fps: snapshot.avg_fps,
                target_fps,
            });
        }
        if let Some(used_mb) = snapshot.memory_used_mb() {
            if used_mb > budget.memory_budget_mb {
                return Some(AdaptationReason::MemoryPressure {
                    used_mb,
                    budget_mb: budget.memory_budget_mb,
                });
            }
        }
        if snapshot.thermal != ThermalState::Nominal {
            return Some(AdaptationReason::ThermalPressure(snapshot.thermal));
        }
        None
    }

    fn has_headroom(&self, snapshot: &TelemetrySnapshot) -> bool {
        let budget = self.config.budget(self.settings.level);
        let fps_ok = snapshot.avg_fps >= self.settings.target_fps * self.config.comfort_fps_ratio;
        let memory_ok = snapshot
            .memory_used_mb()
            .map_or(true, |used| used <= budget.memory_budget_mb * self.config.comfort_memory_ratio);
        let battery_ok = snapshot.battery.map_or(true, |b| {
            !(b.is_low(self.config.low_battery_threshold)
                && self.settings.level >= self.config.low_battery_ceiling)
        });
        fps_ok && memory_ok && battery_ok && snapshot.thermal == ThermalState::Nominal
    }

    fn apply(
        &mut self,
        level: QualityLevel,
        reason: AdaptationReason,
        now_ms: f64,
    ) -> Option<AdaptationEvent> {
        let previous = self.settings;
        if level == previous.level {
            return None;
        }
        self.settings =
            QualitySettings::for_level(level, self.config.budget(level), self.device.refresh_rate_hz);
        self.last_adaptation_ms = Some(now_ms);
        self.headroom_since_ms = None;
        self.adaptations += 1;
        log::info!("[quality] {} -> {}: {}", previous.level, level, reason);
        Some(AdaptationEvent {
            previous,
            current: self.settings,
            reason,
            at_ms: now_ms,
        })
    }
}
