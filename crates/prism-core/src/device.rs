//! One-shot host capability detection.
//!
//! Front-ends implement [`CapabilityProbe`] over whatever platform APIs they
//! have. Every probe method is optional; anything a probe cannot answer is
//! classified conservatively instead of failing detection.

use crate::quality::QualityLevel;

/// Coarse hardware class used for memory and compute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Low,
    Mid,
    High,
}

impl Tier {
    fn step_down(self) -> Self {
        match self {
            Tier::High => Tier::Mid,
            _ => Tier::Low,
        }
    }
}

/// Snapshot of host limits, computed once at startup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeviceCapabilityProfile {
    pub memory_tier: Tier,
    pub compute_tier: Tier,
    pub gpu_acceleration: bool,
    pub refresh_rate_hz: f32,
    pub prefers_reduced_motion: bool,
    pub logical_cores: u32,
    pub device_memory_gb: f32,
}

/// Source of raw capability facts. Returning `None` means "API missing".
pub trait CapabilityProbe {
    fn device_memory_gb(&self) -> Option<f32> {
        None
    }
    fn logical_cores(&self) -> Option<u32> {
        None
    }
    fn gpu_acceleration(&self) -> Option<bool> {
        None
    }
    fn refresh_rate_hz(&self) -> Option<f32> {
        None
    }
    fn prefers_reduced_motion(&self) -> Option<bool> {
        None
    }
    /// Duration of the synthetic CPU micro-benchmark, if the host ran one.
    fn benchmark_ms(&self) -> Option<f32> {
        None
    }
}

// Benchmark durations (for the default iteration count) that mark a slow CPU
const SLOW_BENCHMARK_MS: f32 = 2.0;
const DEFAULT_REFRESH_HZ: f32 = 60.0;

impl DeviceCapabilityProfile {
    /// Most conservative classification; used whenever detection has nothing to go on.
    pub fn conservative() -> Self {
        Self {
            memory_tier: Tier::Low,
            compute_tier: Tier::Low,
            gpu_acceleration: false,
            refresh_rate_hz: DEFAULT_REFRESH_HZ,
            prefers_reduced_motion: false,
            logical_cores: 1,
            device_memory_gb: 0.0,
        }
    }

    /// Typical mid-range laptop or phone.
    pub fn mid_tier() -> Self {
        Self {
            memory_tier: Tier::Mid,
            compute_tier: Tier::Mid,
            gpu_acceleration: true,
            refresh_rate_hz: DEFAULT_REFRESH_HZ,
            prefers_reduced_motion: false,
            logical_cores: 4,
            device_memory_gb: 4.0,
        }
    }

    pub fn high_tier() -> Self {
        Self {
            memory_tier: Tier::High,
            compute_tier: Tier::High,
            gpu_acceleration: true,
            refresh_rate_hz: DEFAULT_REFRESH_HZ,
            prefers_reduced_motion: false,
            logical_cores: 8,
            device_memory_gb: 8.0,
        }
    }

    /// Classify whatever the probe can report. Never fails.
    pub fn detect(probe: &dyn CapabilityProbe) -> Self {
        let device_memory_gb = probe
            .device_memory_gb()
            .filter(|gb| gb.is_finite() && *gb > 0.0);
        let logical_cores = probe.logical_cores().filter(|c| *c > 0);

        let memory_tier = match device_memory_gb {
            Some(gb) if gb >= 6.0 => Tier::High,
            Some(gb) if gb >= 2.0 => Tier::Mid,
            _ => Tier::Low,
        };
        let mut compute_tier = match logical_cores {
            Some(c) if c > 6 => Tier::High,
            Some(c) if c > 2 => Tier::Mid,
            _ => Tier::Low,
        };
        if let Some(ms) = probe.benchmark_ms().filter(|ms| ms.is_finite()) {
            if ms > SLOW_BENCHMARK_MS {
                compute_tier = compute_tier.step_down();
            }
        }
        let refresh_rate_hz = probe
            .refresh_rate_hz()
            .filter(|hz| hz.is_finite() && *hz > 0.0)
            .map(|hz| hz.clamp(24.0, 240.0))
            .unwrap_or(DEFAULT_REFRESH_HZ);

        let profile = Self {
            memory_tier,
            compute_tier,
            gpu_acceleration: probe.gpu_acceleration().unwrap_or(false),
            refresh_rate_hz,
            prefers_reduced_motion: probe.prefers_reduced_motion().unwrap_or(false),
            logical_cores: logical_cores.unwrap_or(1),
            device_memory_gb: device_memory_gb.unwrap_or(0.0),
        };
        log::info!(
            "[device] memory={:?} compute={:?} gpu={} refresh={:.0}Hz reduced_motion={}",
            profile.memory_tier,
            profile.compute_tier,
            profile.gpu_acceleration,
            profile.refresh_rate_hz,
            profile.prefers_reduced_motion
        );
        profile
    }

    /// Level the controller starts at on this device.
    pub fn recommended_level(&self) -> QualityLevel {
        let weakest = self.memory_tier.min(self.compute_tier);
        match (self.gpu_acceleration, weakest) {
            (_, Tier::Low) => QualityLevel::Low,
            (true, Tier::High) => QualityLevel::Ultra,
            (true, Tier::Mid) => QualityLevel::High,
            (false, _) => QualityLevel::Medium,
        }
    }

    /// Highest level the controller may step up to on this device.
    pub fn max_level(&self) -> QualityLevel {
        match (self.gpu_acceleration, self.memory_tier.min(self.compute_tier)) {
            (true, Tier::High) => QualityLevel::Ultra,
            (true, _) => QualityLevel::High,
            (false, _) => QualityLevel::Medium,
        }
    }
}

impl Default for DeviceCapabilityProfile {
    fn default() -> Self {
        Self::conservative()
    }
}
