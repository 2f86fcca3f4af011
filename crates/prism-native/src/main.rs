//! Headless driver: runs the coordinator against synthetic producers on a
//! simulated 60 Hz clock and reports how the engine adapted.

mod gpu;
mod observers;
mod synth;

use prism_core::constants::BENCHMARK_ITERATIONS;
use prism_core::{
    cpu_benchmark, CoordinatorConfig, DeviceCapabilityProfile, InstantClock, ManualClock,
    StateCoordinator, ThermalState,
};
use std::rc::Rc;

const FRAME_MS: f64 = 1000.0 / 60.0;
const TOTAL_FRAMES: u64 = 60 * 30;
// Frames rendered at SLOW_FRAME_MS to simulate a heavy scene
const SLOW_FRAMES: std::ops::Range<u64> = 300..600;
const SLOW_FRAME_MS: f64 = 45.0;
const CRITICAL_THERMAL_FRAMES: std::ops::Range<u64> = 900..1080;
const AUDIO_DROPOUT_MS: (f64, f64) = (12_000.0, 14_000.0);
const BEAT_BPM: f32 = 110.0;
const SEED: u64 = 0x5EED;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let benchmark_ms = cpu_benchmark(&InstantClock::new(), BENCHMARK_ITERATIONS);
    let adapter = match pollster::block_on(gpu::probe_adapter()) {
        Ok(adapter) => {
            log::info!(
                "[device] adapter `{}` {:?} via {:?}, max texture {}",
                adapter.name,
                adapter.device_type,
                adapter.backend,
                adapter.max_texture_dimension_2d
            );
            Some(adapter)
        }
        Err(e) => {
            log::warn!("[device] {e}; continuing without GPU acceleration");
            None
        }
    };
    let device = DeviceCapabilityProfile::detect(&gpu::NativeProbe {
        adapter,
        benchmark_ms: Some(benchmark_ms),
    });

    let clock = Rc::new(ManualClock::new(0.0));
    let mut coordinator = StateCoordinator::new(device, CoordinatorConfig::default(), clock.clone());

    let (sink, sink_stats) = observers::CountingSink::new();
    coordinator.attach_sink(Box::new(sink));
    coordinator.attach_audio_producer(Box::new(
        synth::BeatProducer::new(clock.clone(), BEAT_BPM, SEED)
            .with_dropout(AUDIO_DROPOUT_MS.0, AUDIO_DROPOUT_MS.1),
    ));
    coordinator.attach_color_producer(Box::new(synth::DriftingPalette::new(
        clock.clone(),
        8_000.0,
        2_000.0,
    )));
    coordinator.register_participant(Box::new(observers::LoggingParticipant::default()))?;
    coordinator.register_participant(Box::new(observers::ParticleField::new()))?;
    coordinator.initialize()?;

    for frame in 0..TOTAL_FRAMES {
        let dt = if SLOW_FRAMES.contains(&frame) {
            SLOW_FRAME_MS
        } else {
            FRAME_MS
        };
        if frame == CRITICAL_THERMAL_FRAMES.start {
            log::info!("[frame] injecting critical thermal reading");
            coordinator
                .telemetry_mut()
                .record_thermal(ThermalState::Critical);
        } else if frame == CRITICAL_THERMAL_FRAMES.end {
            coordinator
                .telemetry_mut()
                .record_thermal(ThermalState::Nominal);
        }
        clock.advance(dt);
        coordinator.tick(dt);
    }

    for event in coordinator.recent_adaptations() {
        log::info!(
            "[quality] {:.1}s {} -> {}: {}",
            event.at_ms / 1000.0,
            event.previous.level.as_str(),
            event.current.level.as_str(),
            event.reason
        );
    }
    let metrics = coordinator.metrics();
    println!("{:#?}", metrics);
    let stats = sink_stats.borrow();
    println!(
        "sink: {} writes in {} groups; busiest {:?}",
        stats.total(),
        stats.groups(),
        stats.busiest(5)
    );
    drop(stats);

    coordinator.destroy();
    Ok(())
}
