// Host-side tests for the rolling telemetry window and health score.

use prism_core::*;

fn collector() -> PerformanceTelemetryCollector {
    PerformanceTelemetryCollector::new(TelemetryConfig::default())
}

#[test]
fn ignores_non_finite_and_non_positive_frames() {
    let mut c = collector();
    c.record_frame(f32::NAN);
    c.record_frame(f32::INFINITY);
    c.record_frame(0.0);
    c.record_frame(-4.0);
    assert_eq!(c.total_frames(), 0);
    assert_eq!(c.snapshot().sample_count, 0);
}

#[test]
fn window_keeps_only_recent_frames() {
    let mut c = collector();
    for _ in 0..100 {
        c.record_frame(10.0);
    }
    assert_eq!(c.snapshot().sample_count, TelemetryConfig::default().window);
    assert_eq!(c.total_frames(), 100);
}

#[test]
fn frame_rates_are_derived_from_frame_times() {
    let mut c = collector();
    c.record_frame(10.0);
    c.record_frame(20.0);
    c.record_frame(30.0);
    let s = c.snapshot();
    assert!((s.avg_frame_time_ms - 20.0).abs() < 1e-4);
    assert!((s.avg_fps - 50.0).abs() < 1e-3);
    assert!((s.max_fps - 100.0).abs() < 1e-3);
    assert!((s.min_fps - 1000.0 / 30.0).abs() < 1e-3);
}

#[test]
fn budget_violations_are_counted() {
    let mut c = collector();
    c.record_frame(10.0);
    c.record_frame(40.0);
    c.record_frame(40.0);
    assert_eq!(c.budget_violations(), 2);
}

#[test]
fn health_is_perfect_for_comfortable_frames() {
    let mut c = collector();
    for _ in 0..30 {
        c.record_frame(10.0);
    }
    assert!((c.health_score() - 1.0).abs() < 1e-5);
}

#[test]
fn health_degrades_with_slow_frames_and_heat() {
    let mut c = collector();
    for _ in 0..30 {
        c.record_frame(10.0);
    }
    let healthy = c.health_score();
    for _ in 0..30 {
        c.record_frame(50.0);
    }
    let slow = c.health_score();
    assert!(slow < healthy);

    c.record_thermal(ThermalState::Critical);
    assert!((c.health_score() - slow * 0.5).abs() < 1e-5);
}

#[test]
fn memory_pressure_lowers_health() {
    let mut c = collector();
    c.record_frame(10.0);
    let before = c.health_score();
    c.record_memory(1900.0, 2000.0);
    assert!(c.health_score() < before);
    assert_eq!(c.snapshot().memory_used_mb(), Some(1900.0));
}

#[test]
fn reset_window_clears_samples_but_keeps_totals() {
    let mut c = collector();
    for _ in 0..10 {
        c.record_frame(12.0);
    }
    c.reset_window();
    assert_eq!(c.snapshot().sample_count, 0);
    assert_eq!(c.total_frames(), 10);
}

#[test]
fn battery_level_is_clamped_and_maps_to_conservation() {
    let mut c = collector();
    c.record_battery(Some(BatteryStatus {
        level: 1.7,
        charging: false,
    }));
    assert_eq!(c.battery().map(|b| b.level), Some(1.0));

    let half = BatteryStatus {
        level: 0.25,
        charging: false,
    };
    assert!((half.conservation() - 0.5).abs() < 1e-5);
    assert_eq!(
        BatteryStatus {
            level: 0.05,
            charging: true
        }
        .conservation(),
        0.0
    );
}

#[test]
fn thermal_pressure_rises_with_state() {
    let states = [
        ThermalState::Nominal,
        ThermalState::Fair,
        ThermalState::Serious,
        ThermalState::Critical,
    ];
    for pair in states.windows(2) {
        assert!(pair[0].pressure() < pair[1].pressure());
    }
}

#[test]
fn benchmark_is_timed_against_the_given_clock() {
    let clock = ManualClock::new(5.0);
    assert_eq!(cpu_benchmark(&clock, 100), 0.0);

    let mut c = collector();
    c.sample_cpu_cost(&clock);
    assert_eq!(c.snapshot().cpu_cost_ms, Some(0.0));
}
