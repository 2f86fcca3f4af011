// Shared tuning constants for the coordinator, batch writer and quality controller.
// Everything here is a default; the config structs expose the same values for overriding.

// Frame pacing
pub const DEFAULT_FRAME_BUDGET_MS: f32 = 1000.0 / 60.0;
pub const MAX_TICK_DELTA_MS: f64 = 250.0; // clamp for tab-switch or debugger pauses
pub const TIMESTAMP_EPSILON_MS: f64 = 0.001; // minimum step between published timestamps

// Transition smoothing
pub const TRANSITION_DURATION_MS: f32 = 320.0;
pub const FAST_TRANSITION_FACTOR: f32 = 0.35; // big jumps use this fraction of the duration
pub const COHERENCE_THRESHOLD: f32 = 0.85; // continuity below this counts as a big jump
pub const EXPONENTIAL_EASE_RATE: f32 = 5.0;

// Participants and events
pub const MAX_CONSECUTIVE_FAILURES: u32 = 3;
pub const MAX_PENDING_EVENTS: usize = 64;

// Telemetry
pub const TELEMETRY_WINDOW: usize = 60; // roughly one second of frames at 60 Hz
pub const BENCHMARK_ITERATIONS: u32 = 2_000; // keeps the micro-benchmark well under a millisecond
pub const HEALTH_VIOLATION_WINDOW: usize = 30;

// Quality control
pub const MIN_ADAPTATION_SAMPLES: usize = 5;
pub const ADAPTATION_COOLDOWN_MS: f64 = 3_000.0;
pub const UPGRADE_HOLD_MS: f64 = 5_000.0; // sustained headroom required before stepping up
pub const DOWNGRADE_FPS_RATIO: f32 = 0.8;
pub const COMFORT_FPS_RATIO: f32 = 0.95;
pub const COMFORT_MEMORY_RATIO: f32 = 0.7;
pub const CRITICAL_DROP_STEPS: u8 = 2;
pub const LOW_BATTERY_THRESHOLD: f32 = 0.2;
pub const BATTERY_CONSERVATION_ONSET: f32 = 0.5; // conservation ramps in below this charge

// Batch writer
pub const FLUSH_BUDGET_MS: f64 = 8.0;
pub const VIOLATION_THRESHOLD: u32 = 3; // consecutive over-budget flushes before fallback
pub const FALLBACK_COOLDOWN_MS: f64 = 2_000.0;
pub const HIGH_LATENCY_MS: f64 = 8.0;
pub const NORMAL_LATENCY_MS: f64 = 16.0;
pub const LOW_LATENCY_MS: f64 = 33.0;

// Style variables written outside the state projection
pub const BEAT_PULSE_PROPERTY: &str = "--prism-beat-pulse";
pub const ACCENT_COLOR_PROPERTY: &str = "--prism-accent-color";

// Effect event names emitted by the coordinator itself
pub const BEAT_EVENT: &str = "beat";
pub const QUALITY_CHANGED_EVENT: &str = "quality-changed";

// Neutral color temperature (daylight white)
pub const NEUTRAL_COLOR_TEMPERATURE: f32 = 6500.0;
