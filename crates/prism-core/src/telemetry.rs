//! Continuous, low-overhead performance sampling.

use crate::clock::Clock;
use crate::constants::*;
use std::collections::VecDeque;

/// Host thermal reading, ordered from coolest to hottest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ThermalState {
    #[default]
    Nominal,
    Fair,
    Serious,
    Critical,
}

impl ThermalState {
    /// Normalized pressure in \[0, 1\].
    pub fn pressure(self) -> f32 {
        match self {
            ThermalState::Nominal => 0.0,
            ThermalState::Fair => 0.33,
            ThermalState::Serious => 0.66,
            ThermalState::Critical => 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BatteryStatus {
    /// Charge in \[0, 1\].
    pub level: f32,
    pub charging: bool,
}

impl BatteryStatus {
    pub fn is_low(&self, threshold: f32) -> bool {
        !self.charging && self.level <= threshold
    }

    /// How hard the engine should save power, in \[0, 1\].
    pub fn conservation(&self) -> f32 {
        if self.charging {
            return 0.0;
        }
        (1.0 - self.level / BATTERY_CONSERVATION_ONSET).clamp(0.0, 1.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MemorySample {
    pub used_mb: f32,
    pub limit_mb: f32,
}

#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    pub window: usize,
    pub frame_budget_ms: f32,
    pub benchmark_iterations: u32,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            window: TELEMETRY_WINDOW,
            frame_budget_ms: DEFAULT_FRAME_BUDGET_MS,
            benchmark_iterations: BENCHMARK_ITERATIONS,
        }
    }
}

/// Point-in-time view of the rolling window handed to the quality controller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TelemetrySnapshot {
    pub sample_count: usize,
    pub avg_fps: f32,
    pub min_fps: f32,
    pub max_fps: f32,
    pub avg_frame_time_ms: f32,
    pub memory: Option<MemorySample>,
    pub cpu_cost_ms: Option<f32>,
    pub thermal: ThermalState,
    pub battery: Option<BatteryStatus>,
    pub budget_violations: u64,
    pub health_score: f32,
}

impl TelemetrySnapshot {
    pub fn memory_used_mb(&self) -> Option<f32> {
        self.memory.map(|m| m.used_mb)
    }
}

pub struct PerformanceTelemetryCollector {
    config: TelemetryConfig,
    frame_times: VecDeque<f32>,
    recent_violations: VecDeque<bool>,
    memory: Option<MemorySample>,
    cpu_cost_ms: Option<f32>,
    thermal: ThermalState,
    battery: Option<BatteryStatus>,
    budget_violations: u64,
    total_frames: u64,
}

impl PerformanceTelemetryCollector {
    pub fn new(config: TelemetryConfig) -> Self {
        let window = config.window.max(1);
        Self {
            frame_times: VecDeque::with_capacity(window),
            recent_violations: VecDeque::with_capacity(HEALTH_VIOLATION_WINDOW),
            config,
            memory: None,
            cpu_cost_ms: None,
            thermal: ThermalState::Nominal,
            battery: None,
            budget_violations: 0,
            total_frames: 0,
        }
    }

    /// Record one frame's duration. Non-finite or non-positive values are ignored.
    pub fn record_frame(&mut self, frame_time_ms: f32) {
        if !frame_time_ms.is_finite() || frame_time_ms <= 0.0 {
            return;
        }
        if self.frame_times.len() == self.config.window.max(1) {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(frame_time_ms);
        self.total_frames += 1;

        let over = frame_time_ms > self.config.frame_budget_ms;
        if over {
            self.budget_violations += 1;
            log::trace!(
                "[telemetry] frame {:.2}ms over {:.2}ms budget",
                frame_time_ms,
                self.config.frame_budget_ms
            );
        }
        if self.recent_violations.len() == HEALTH_VIOLATION_WINDOW {
            self.recent_violations.pop_front();
        }
        self.recent_violations.push_back(over);
    }

    pub fn record_memory(&mut self, used_mb: f32, limit_mb: f32) {
        if used_mb.is_finite() && limit_mb.is_finite() && used_mb >= 0.0 && limit_mb > 0.0 {
            self.memory = Some(MemorySample { used_mb, limit_mb });
        }
    }

    pub fn record_thermal(&mut self, thermal: ThermalState) {
        if thermal != self.thermal {
            log::info!("[telemetry] thermal {:?} -> {:?}", self.thermal, thermal);
        }
        self.thermal = thermal;
    }

    pub fn record_battery(&mut self, battery: Option<BatteryStatus>) {
        self.battery = battery.map(|b| BatteryStatus {
            level: if b.level.is_finite() {
                b.level.clamp(0.0, 1.0)
            } else {
                1.0
            },
            charging: b.charging,
        });
    }

    /// Run the synthetic CPU micro-benchmark and keep its cost.
    pub fn sample_cpu_cost(&mut self, clock: &dyn Clock) -> f32 {
        let ms = cpu_benchmark(clock, self.config.benchmark_iterations);
        self.cpu_cost_ms = Some(ms);
        ms
    }

    /// Drop frame samples so the next decision sees only fresh data.
    pub fn reset_window(&mut self) {
        self.frame_times.clear();
    }

    pub fn thermal(&self) -> ThermalState {
        self.thermal
    }

    pub fn battery(&self) -> Option<BatteryStatus> {
        self.battery
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn budget_violations(&self) -> u64 {
        self.budget_violations
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let n = self.frame_times.len();
        let (avg_frame, min_frame, max_frame) = if n == 0 {
            (0.0, 0.0, 0.0)
        } else {
            let sum: f32 = self.frame_times.iter().sum();
            let min = self.frame_times.iter().copied().fold(f32::MAX, f32::min);
            let max = self.frame_times.iter().copied().fold(0.0, f32::max);
            (sum / n as f32, min, max)
        };
        let fps = |ms: f32| if ms > 0.0 { 1000.0 / ms } else { 0.0 };
        TelemetrySnapshot {
            sample_count: n,
            avg_fps: fps(avg_frame),
            // slowest frame gives the lowest rate
            min_fps: fps(max_frame),
            max_fps: fps(min_frame),
            avg_frame_time_ms: avg_frame,
            memory: self.memory,
            cpu_cost_ms: self.cpu_cost_ms,
            thermal: self.thermal,
            battery: self.battery,
            budget_violations: self.budget_violations,
            health_score: self.health_score_for(avg_frame),
        }
    }

    /// Rolling health in \[0, 1\]; 1.0 when there is nothing to complain about.
    pub fn health_score(&self) -> f32 {
        self.snapshot().health_score
    }

    fn health_score_for(&self, avg_frame_ms: f32) -> f32 {
        let frame_score = if avg_frame_ms > 0.0 {
            (self.config.frame_budget_ms / avg_frame_ms).min(1.0)
        } else {
            1.0
        };
        let memory_score = self
            .memory
            .map(|m| {
                let over = (m.used_mb / m.limit_mb - COMFORT_MEMORY_RATIO).max(0.0);
                (1.0 - over / (1.0 - COMFORT_MEMORY_RATIO)).clamp(0.0, 1.0)
            })
            .unwrap_or(1.0);
        let violation_score = if self.recent_violations.is_empty() {
            1.0
        } else {
            let over = self.recent_violations.iter().filter(|v| **v).count();
            1.0 - over as f32 / self.recent_violations.len() as f32
        };
        let thermal_score = 1.0 - self.thermal.pressure() * 0.5;
        (0.45 * frame_score + 0.2 * memory_score + 0.35 * violation_score) * thermal_score
    }
}

/// Fixed arithmetic workload timed against `clock`; returns milliseconds.
///
/// The iteration count is small enough that the sample costs a tiny fraction of
/// a frame even on slow hardware.
pub fn cpu_benchmark(clock: &dyn Clock, iterations: u32) -> f32 {
    let start = clock.now_ms();
    let mut acc = 0.0_f32;
    let mut x = 1.0_f32;
    for i in 0..iterations {
        x = (x * 1.000_1 + i as f32 * 0.5).sin().abs() + 1.0;
        acc += x.sqrt();
    }
    let elapsed = (clock.now_ms() - start).max(0.0) as f32;
    // keep the optimizer from discarding the loop
    std::hint::black_box(acc);
    elapsed
}
