use prism_core::constants::{BEAT_EVENT, QUALITY_CHANGED_EVENT};
use prism_core::{
    EffectEvent, EventPayload, Participant, ParticipantError, PropertySink, PropertyValue,
    StateField, StatePatch, TargetHandle, VisualEffectState,
};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

const LOG_EVERY: u64 = 120;

/// Logs a state summary every couple of seconds and every quality change.
#[derive(Default)]
pub struct LoggingParticipant {
    updates: u64,
    beats: u64,
}

impl Participant for LoggingParticipant {
    fn name(&self) -> &str {
        "logger"
    }

    fn on_state_update(&mut self, state: &VisualEffectState) -> Result<(), ParticipantError> {
        self.updates += 1;
        if self.updates % LOG_EVERY == 0 {
            log::info!(
                "[frame] t={:.0}ms beats={} intensity={:.2} pulse={:.2}s depth={:.2} quality={} harmony={:.2}",
                state.temporal.timestamp_ms,
                self.beats,
                state.audio.intensity,
                state.animation.pulse_rate,
                state.animation.effect_depth,
                state.performance.quality_level.as_str(),
                state.animation.system_harmony
            );
        }
        Ok(())
    }

    fn on_effect_event(&mut self, event: &EffectEvent) -> Result<(), ParticipantError> {
        match (event.event_type.as_ref(), &event.payload) {
            (QUALITY_CHANGED_EVENT, EventPayload::Text(change)) => {
                log::info!("[events] quality changed: {}", change)
            }
            (BEAT_EVENT, _) => self.beats += 1,
            (other, payload) => log::debug!("[events] {} {:?}", other, payload),
        }
        Ok(())
    }
}

/// Renderer stand-in that pushes its own depth and glow into the shared state.
pub struct ParticleField {
    phase: f32,
    density: f32,
}

impl ParticleField {
    pub fn new() -> Self {
        Self {
            phase: 0.0,
            density: 1.0,
        }
    }
}

impl Participant for ParticleField {
    fn name(&self) -> &str {
        "particle-field"
    }

    fn on_state_update(&mut self, state: &VisualEffectState) -> Result<(), ParticipantError> {
        self.phase = state.temporal.evolution_phase;
        self.density = state.performance.adaptive_quality;
        Ok(())
    }

    fn contribution(&mut self) -> Option<StatePatch> {
        let swell = (self.phase * std::f32::consts::TAU).sin();
        Some(
            StatePatch::new()
                .with(StateField::Depth, 0.5 + 0.3 * swell * self.density)
                .with(StateField::Luminosity, 1.0 + 0.2 * swell),
        )
    }
}

/// Write counts by property, shared with whoever built the sink.
#[derive(Debug, Default)]
pub struct SinkStats {
    writes: BTreeMap<String, u64>,
    groups: u64,
}

impl SinkStats {
    pub fn total(&self) -> u64 {
        self.writes.values().sum()
    }

    pub fn groups(&self) -> u64 {
        self.groups
    }

    /// Most frequently written properties first.
    pub fn busiest(&self, n: usize) -> Vec<(&str, u64)> {
        let mut all: Vec<(&str, u64)> =
            self.writes.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        all.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        all.truncate(n);
        all
    }
}

/// Sink that only counts what would have been written.
pub struct CountingSink {
    stats: Rc<RefCell<SinkStats>>,
}

impl CountingSink {
    pub fn new() -> (Self, Rc<RefCell<SinkStats>>) {
        let stats = Rc::new(RefCell::new(SinkStats::default()));
        (
            Self {
                stats: stats.clone(),
            },
            stats,
        )
    }
}

impl PropertySink for CountingSink {
    fn write(&mut self, _target: TargetHandle, property: &str, value: &PropertyValue) {
        log::trace!("[batch] {} = {}", property, value);
        *self
            .stats
            .borrow_mut()
            .writes
            .entry(property.to_owned())
            .or_default() += 1;
    }

    fn write_group(&mut self, target: TargetHandle, writes: &[(&str, &PropertyValue)]) {
        self.stats.borrow_mut().groups += 1;
        for (property, value) in writes {
            self.write(target, property, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counting_sink_tallies_groups_and_writes() {
        let (mut sink, stats) = CountingSink::new();
        let one = PropertyValue::Number(1.0);
        let two = PropertyValue::Number(2.0);
        sink.write_group(TargetHandle(0), &[("--a", &one), ("--b", &two)]);
        sink.write(TargetHandle(0), "--a", &two);
        let stats = stats.borrow();
        assert_eq!(stats.total(), 3);
        assert_eq!(stats.groups(), 1);
        assert_eq!(stats.busiest(1), vec![("--a", 2)]);
    }

    #[test]
    fn particle_field_only_touches_visual_fields() {
        let mut field = ParticleField::new();
        let patch = field.contribution().unwrap_or_default();
        assert!(!patch.is_empty());
        assert!(patch.iter().all(|(f, _)| !f.is_producer_only()));
    }
}
