use crate::quality::QualityLevel;

/// Debug counters for tooling; nothing in the engine depends on them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineMetrics {
    pub ticks: u64,
    pub state_updates: u64,
    pub events_broadcast: u64,
    pub adaptation_events: u64,
    pub average_tick_ms: f64,
    pub batch_budget_violations: u64,
    pub batch_fallback_activations: u64,
    pub writes_flushed: u64,
    pub writes_coalesced: u64,
    pub participants: usize,
    pub auto_unregistrations: u64,
    pub producer_failures: u64,
    pub health_score: f32,
    pub quality_level: QualityLevel,
}
