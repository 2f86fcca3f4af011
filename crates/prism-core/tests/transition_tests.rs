// Host-side tests for easing curves and the transition driver.

use prism_core::*;

const ALL_EASINGS: [Easing; 4] = [
    Easing::Linear,
    Easing::SmoothCubic,
    Easing::Harmonic,
    Easing::Exponential,
];

fn neutral() -> VisualEffectState {
    VisualEffectState::neutral(DeviceCapabilityProfile::mid_tier(), QualityLevel::High, 0.0)
}

fn driver(easing: Easing, duration_ms: f32) -> TransitionDriver {
    TransitionDriver::new(TransitionConfig {
        easing,
        duration_ms,
        ..TransitionConfig::default()
    })
}

#[test]
fn easings_start_at_zero_and_end_at_one() {
    for easing in ALL_EASINGS {
        assert!(easing.apply(0.0).abs() < 1e-6, "{:?}", easing);
        assert!((easing.apply(1.0) - 1.0).abs() < 1e-6, "{:?}", easing);
    }
}

#[test]
fn easings_are_monotonic() {
    for easing in ALL_EASINGS {
        let mut prev = easing.apply(0.0);
        for i in 1..=100 {
            let v = easing.apply(i as f32 / 100.0);
            assert!(v >= prev - 1e-6, "{:?} not monotonic at step {}", easing, i);
            prev = v;
        }
    }
}

#[test]
fn easing_clamps_out_of_range_progress() {
    assert_eq!(Easing::Linear.apply(-0.5), 0.0);
    assert_eq!(Easing::Linear.apply(1.5), 1.0);
    assert_eq!(Easing::SmoothCubic.apply(f32::NAN), 1.0);
}

#[test]
fn zero_duration_snaps_to_target() {
    let from = neutral();
    let mut to = from;
    to.set(StateField::Luminosity, 1.8);
    to.set(StateField::Depth, 0.9);

    let mut d = driver(Easing::SmoothCubic, 0.0);
    let out = d.advance(&from, &to, 16.0);
    assert_eq!(out.visual.luminosity, 1.8);
    assert_eq!(out.visual.depth, 0.9);
}

#[test]
fn linear_transition_reaches_midpoint_halfway() {
    let from = neutral();
    let mut to = from;
    to.set(StateField::Intensity, 0.4);

    let mut d = driver(Easing::Linear, 100.0);
    let out = d.advance(&from, &to, 50.0);
    assert!((out.audio.intensity - 0.2).abs() < 1e-5);

    let out = d.advance(&out, &to, 50.0);
    assert!((out.audio.intensity - 0.4).abs() < 1e-5);
}

#[test]
fn small_drift_retargets_running_transition() {
    let from = neutral();
    let mut to = from;
    to.set(StateField::Intensity, 0.4);
    let mut drifted = to;
    drifted.set(StateField::Intensity, 0.5);

    let mut d = driver(Easing::Linear, 100.0);
    let mid = d.advance(&from, &to, 50.0);
    // same transition continues, now heading for the drifted target
    let out = d.advance(&mid, &drifted, 25.0);
    assert!((out.audio.intensity - 0.375).abs() < 1e-5);
    let out = d.advance(&out, &drifted, 25.0);
    assert!((out.audio.intensity - 0.5).abs() < 1e-5);
}

#[test]
fn big_jump_gets_the_fast_duration() {
    let from = neutral();
    let mut far = from;
    for field in StateField::SMOOTHED {
        let (_, hi) = field.range();
        far.set(field, hi);
    }
    let mut near = from;
    near.set(StateField::Energy, 0.2);

    let d = TransitionDriver::new(TransitionConfig::default());
    let config = d.config().clone();
    assert_eq!(d.duration_for(&from, &near), config.duration_ms);
    assert!(
        (d.duration_for(&from, &far) - config.duration_ms * config.fast_duration_factor).abs()
            < 1e-3
    );
}

#[test]
fn unsmoothed_fields_come_straight_from_target() {
    let from = neutral();
    let mut to = from;
    to.set(StateField::AdaptiveQuality, 0.4);
    to.temporal.timestamp_ms = 500.0;

    let mut d = driver(Easing::Linear, 1000.0);
    let out = d.advance(&from, &to, 1.0);
    assert_eq!(out.performance.adaptive_quality, 0.4);
    assert_eq!(out.temporal.timestamp_ms, 500.0);
}

#[test]
fn reset_starts_a_fresh_transition() {
    let from = neutral();
    let mut to = from;
    to.set(StateField::Intensity, 0.4);

    let mut d = driver(Easing::Linear, 100.0);
    let mid = d.advance(&from, &to, 50.0);
    d.reset();
    let out = d.advance(&mid, &to, 50.0);
    // fresh transition from the midpoint: halfway between 0.2 and 0.4
    assert!((out.audio.intensity - 0.3).abs() < 1e-5);
}
