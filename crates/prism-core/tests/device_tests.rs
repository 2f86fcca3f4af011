// Host-side tests for capability detection.

use prism_core::*;

#[derive(Default)]
struct FakeProbe {
    memory_gb: Option<f32>,
    cores: Option<u32>,
    gpu: Option<bool>,
    refresh_hz: Option<f32>,
    reduced_motion: Option<bool>,
    benchmark_ms: Option<f32>,
}

impl CapabilityProbe for FakeProbe {
    fn device_memory_gb(&self) -> Option<f32> {
        self.memory_gb
    }
    fn logical_cores(&self) -> Option<u32> {
        self.cores
    }
    fn gpu_acceleration(&self) -> Option<bool> {
        self.gpu
    }
    fn refresh_rate_hz(&self) -> Option<f32> {
        self.refresh_hz
    }
    fn prefers_reduced_motion(&self) -> Option<bool> {
        self.reduced_motion
    }
    fn benchmark_ms(&self) -> Option<f32> {
        self.benchmark_ms
    }
}

fn strong() -> FakeProbe {
    FakeProbe {
        memory_gb: Some(8.0),
        cores: Some(8),
        gpu: Some(true),
        refresh_hz: Some(120.0),
        reduced_motion: Some(false),
        benchmark_ms: Some(0.3),
    }
}

#[test]
fn silent_probe_falls_back_to_conservative_profile() {
    let profile = DeviceCapabilityProfile::detect(&FakeProbe::default());
    assert_eq!(profile, DeviceCapabilityProfile::conservative());
    assert_eq!(profile.recommended_level(), QualityLevel::Low);
}

#[test]
fn strong_device_is_classified_high() {
    let profile = DeviceCapabilityProfile::detect(&strong());
    assert_eq!(profile.memory_tier, Tier::High);
    assert_eq!(profile.compute_tier, Tier::High);
    assert_eq!(profile.refresh_rate_hz, 120.0);
    assert_eq!(profile.recommended_level(), QualityLevel::Ultra);
    assert_eq!(profile.max_level(), QualityLevel::Ultra);
}

#[test]
fn slow_benchmark_steps_compute_down() {
    let probe = FakeProbe {
        benchmark_ms: Some(9.0),
        ..strong()
    };
    let profile = DeviceCapabilityProfile::detect(&probe);
    assert_eq!(profile.compute_tier, Tier::Mid);
    assert_eq!(profile.recommended_level(), QualityLevel::High);
}

#[test]
fn missing_gpu_caps_quality_at_medium() {
    let probe = FakeProbe {
        gpu: None,
        ..strong()
    };
    let profile = DeviceCapabilityProfile::detect(&probe);
    assert!(!profile.gpu_acceleration);
    assert_eq!(profile.recommended_level(), QualityLevel::Medium);
    assert_eq!(profile.max_level(), QualityLevel::Medium);
}

#[test]
fn bogus_readings_are_rejected() {
    let probe = FakeProbe {
        memory_gb: Some(f32::NAN),
        cores: Some(0),
        refresh_hz: Some(1000.0),
        ..FakeProbe::default()
    };
    let profile = DeviceCapabilityProfile::detect(&probe);
    assert_eq!(profile.memory_tier, Tier::Low);
    assert_eq!(profile.logical_cores, 1);
    assert_eq!(profile.refresh_rate_hz, 240.0);
}

#[test]
fn reduced_motion_preference_is_carried() {
    let probe = FakeProbe {
        reduced_motion: Some(true),
        ..strong()
    };
    assert!(DeviceCapabilityProfile::detect(&probe).prefers_reduced_motion);
}

#[test]
fn weakest_tier_decides_the_recommendation() {
    let probe = FakeProbe {
        memory_gb: Some(1.0),
        ..strong()
    };
    let profile = DeviceCapabilityProfile::detect(&probe);
    assert_eq!(profile.memory_tier, Tier::Low);
    assert_eq!(profile.recommended_level(), QualityLevel::Low);
    assert_eq!(profile.max_level(), QualityLevel::High);
}
