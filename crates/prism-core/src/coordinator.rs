//! The hub: owns the canonical [`VisualEffectState`] and evolves it once per frame.
//!
//! A tick runs a fixed sequence. Producer data is merged into a staging copy,
//! participant contributions are averaged in, quality settings are copied over,
//! the result is eased against the previous state, published to participants,
//! and queued effect events are emitted. Finally the state is projected into
//! style variables through the attached batch writer, which is then flushed.

use crate::batch::{
    BatchConfig, BatchMetrics, Priority, PriorityBatchWriter, PropertySink, PropertyValue,
    TargetHandle,
};
use crate::clock::{Clock, InstantClock};
use crate::constants::*;
use crate::device::DeviceCapabilityProfile;
use crate::error::CoordinatorError;
use crate::events::{EffectEvent, EventPayload, EventQueue};
use crate::metrics::EngineMetrics;
use crate::participant::{CallbackKind, Participant, Registration};
use crate::producer::{
    AudioProducer, AudioProfile, ColorProducer, ColorProfile, ProducerHandle, ProducerKind,
    ProducerPoll,
};
use crate::quality::{
    AdaptationEvent, AdaptiveQualityController, QualityConfig, QualityLevel, QualitySettings,
};
use crate::state::{continuity_index, FieldOrigin, StateField, StatePatch, VisualEffectState};
use crate::telemetry::{PerformanceTelemetryCollector, TelemetryConfig};
use crate::transition::{Easing, TransitionConfig, TransitionDriver};
use fnv::FnvHashMap;
use glam::Vec2;
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::rc::Rc;

const ADAPTATION_LOG_LEN: usize = 16;

#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    pub transition: TransitionConfig,
    pub quality: QualityConfig,
    pub telemetry: TelemetryConfig,
    pub batch: BatchConfig,
    pub max_consecutive_failures: u32,
    pub max_pending_events: usize,
    pub max_delta_ms: f64,
    /// Target the state is projected onto as style variables.
    pub projection_target: TargetHandle,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            transition: TransitionConfig::default(),
            quality: QualityConfig::default(),
            telemetry: TelemetryConfig::default(),
            batch: BatchConfig::default(),
            max_consecutive_failures: MAX_CONSECUTIVE_FAILURES,
            max_pending_events: MAX_PENDING_EVENTS,
            max_delta_ms: MAX_TICK_DELTA_MS,
            projection_target: TargetHandle(0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    Running,
    Destroyed,
}

struct ProducerSlot<P: ?Sized> {
    id: u64,
    producer: Box<P>,
    failing: bool,
}

#[derive(Default)]
struct Counters {
    ticks: u64,
    state_updates: u64,
    events_broadcast: u64,
    adaptation_events: u64,
    auto_unregistrations: u64,
    producer_failures: u64,
    total_tick_ms: f64,
}

pub struct StateCoordinator {
    config: CoordinatorConfig,
    clock: Rc<dyn Clock>,
    lifecycle: Lifecycle,
    state: VisualEffectState,
    participants: Vec<Registration>,
    audio_producers: Vec<ProducerSlot<dyn AudioProducer>>,
    color_producers: Vec<ProducerSlot<dyn ColorProducer>>,
    next_producer_id: u64,
    last_audio: Option<AudioProfile>,
    last_color: Option<ColorProfile>,
    pending_beat: Option<f32>,
    pending_accent: Option<[f32; 3]>,
    quality: AdaptiveQualityController,
    telemetry: PerformanceTelemetryCollector,
    transitions: TransitionDriver,
    writer: Option<PriorityBatchWriter<Box<dyn PropertySink>>>,
    projected: [Option<f32>; StateField::ALL.len()],
    events: EventQueue,
    adaptations: VecDeque<AdaptationEvent>,
    counters: Counters,
}

impl StateCoordinator {
    pub fn new(
        device: DeviceCapabilityProfile,
        config: CoordinatorConfig,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let quality = AdaptiveQualityController::new(device, config.quality.clone());
        let telemetry = PerformanceTelemetryCollector::new(config.telemetry.clone());
        let transitions = TransitionDriver::new(config.transition.clone());
        let events = EventQueue::new(config.max_pending_events);
        let state = VisualEffectState::neutral(device, quality.current_level(), clock.now_ms());
        let mut coordinator = Self {
            config,
            clock,
            lifecycle: Lifecycle::Created,
            state,
            participants: Vec::new(),
            audio_producers: Vec::new(),
            color_producers: Vec::new(),
            next_producer_id: 1,
            last_audio: None,
            last_color: None,
            pending_beat: None,
            pending_accent: None,
            quality,
            telemetry,
            transitions,
            writer: None,
            projected: [None; StateField::ALL.len()],
            events,
            adaptations: VecDeque::with_capacity(ADAPTATION_LOG_LEN),
            counters: Counters::default(),
        };
        let settings = coordinator.quality.current_settings();
        coordinator.copy_performance_fields(&settings);
        coordinator.state.sanitize();
        coordinator
    }

    /// Coordinator on the wall clock with default configuration.
    pub fn with_defaults(device: DeviceCapabilityProfile) -> Self {
        Self::new(
            device,
            CoordinatorConfig::default(),
            Rc::new(InstantClock::new()),
        )
    }

    /// Start evolving state. Calling it again while running does nothing.
    pub fn initialize(&mut self) -> Result<(), CoordinatorError> {
        match self.lifecycle {
            Lifecycle::Running => {
                log::debug!("[coordinator] already initialized");
                return Ok(());
            }
            Lifecycle::Destroyed => return Err(CoordinatorError::Destroyed),
            Lifecycle::Created => {}
        }
        let device = *self.quality.device();
        let now = self.clock.now_ms();
        self.state = VisualEffectState::neutral(device, self.quality.current_level(), now);
        let settings = self.quality.current_settings();
        self.copy_performance_fields(&settings);
        self.state.sanitize();
        let cpu_ms = self.telemetry.sample_cpu_cost(self.clock.as_ref());
        self.lifecycle = Lifecycle::Running;
        log::info!(
            "[coordinator] running: quality={} audio_producers={} color_producers={} participants={} cpu_probe={:.3}ms",
            self.quality.current_level(),
            self.audio_producers.len(),
            self.color_producers.len(),
            self.participants.len(),
            cpu_ms
        );
        Ok(())
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle == Lifecycle::Running
    }

    /// Add a participant; it receives the current state straight away.
    pub fn register_participant(
        &mut self,
        participant: Box<dyn Participant>,
    ) -> Result<(), CoordinatorError> {
        if self.lifecycle == Lifecycle::Destroyed {
            return Err(CoordinatorError::Destroyed);
        }
        let name = participant.name();
        if name.trim().is_empty() {
            return Err(CoordinatorError::EmptyParticipantName);
        }
        if self.has_participant(name) {
            log::warn!("[coordinator] duplicate participant `{}`", name);
            return Err(CoordinatorError::DuplicateParticipant(name.to_owned()));
        }
        let mut registration = Registration::new(participant);
        let result = registration.handle.on_state_update(&self.state);
        registration.record(result, CallbackKind::StateUpdate);
        log::info!("[coordinator] registered `{}`", registration.name);
        self.participants.push(registration);
        Ok(())
    }

    /// Remove a participant by name. Returns whether anything was removed.
    pub fn unregister_participant(&mut self, name: &str) -> bool {
        let before = self.participants.len();
        self.participants.retain(|r| r.name != name);
        let removed = self.participants.len() != before;
        if removed {
            log::info!("[coordinator] unregistered `{}`", name);
        }
        removed
    }

    pub fn has_participant(&self, name: &str) -> bool {
        self.participants.iter().any(|r| r.name == name)
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Registered names in registration (and delivery) order.
    pub fn participant_names(&self) -> Vec<&str> {
        self.participants.iter().map(|r| r.name.as_str()).collect()
    }

    /// Coordinator time of the participant's most recent contribution.
    pub fn last_contribution_ms(&self, name: &str) -> Option<f64> {
        self.participants
            .iter()
            .find(|r| r.name == name)
            .and_then(|r| r.last_contribution_ms)
    }

    pub fn attach_audio_producer(&mut self, producer: Box<dyn AudioProducer>) -> ProducerHandle {
        let id = self.next_id();
        log::info!("[producer] attached audio producer `{}`", producer.name());
        self.audio_producers.push(ProducerSlot {
            id,
            producer,
            failing: false,
        });
        ProducerHandle {
            id,
            kind: ProducerKind::Audio,
        }
    }

    pub fn attach_color_producer(&mut self, producer: Box<dyn ColorProducer>) -> ProducerHandle {
        let id = self.next_id();
        log::info!("[producer] attached color producer `{}`", producer.name());
        self.color_producers.push(ProducerSlot {
            id,
            producer,
            failing: false,
        });
        ProducerHandle {
            id,
            kind: ProducerKind::Color,
        }
    }

    /// Stop polling a producer. Its last good values stay in effect.
    pub fn detach_producer(&mut self, handle: ProducerHandle) -> bool {
        let before = self.audio_producers.len() + self.color_producers.len();
        match handle.kind {
            ProducerKind::Audio => self.audio_producers.retain(|s| s.id != handle.id),
            ProducerKind::Color => self.color_producers.retain(|s| s.id != handle.id),
        }
        before != self.audio_producers.len() + self.color_producers.len()
    }

    /// Route style projections and critical writes to `sink`.
    pub fn attach_sink(&mut self, sink: Box<dyn PropertySink>) {
        self.writer = Some(PriorityBatchWriter::new(
            sink,
            self.clock.clone(),
            self.config.batch.clone(),
        ));
        self.projected = [None; StateField::ALL.len()];
    }

    pub fn writer(&self) -> Option<&PriorityBatchWriter<Box<dyn PropertySink>>> {
        self.writer.as_ref()
    }

    pub fn writer_mut(&mut self) -> Option<&mut PriorityBatchWriter<Box<dyn PropertySink>>> {
        self.writer.as_mut()
    }

    /// Handle participants can keep to queue events for the next tick.
    pub fn event_queue(&self) -> EventQueue {
        self.events.clone()
    }

    pub fn state(&self) -> &VisualEffectState {
        &self.state
    }

    pub fn quality(&self) -> &AdaptiveQualityController {
        &self.quality
    }

    pub fn quality_settings(&self) -> QualitySettings {
        self.quality.current_settings()
    }

    pub fn telemetry(&self) -> &PerformanceTelemetryCollector {
        &self.telemetry
    }

    /// For hosts feeding memory, thermal and battery readings.
    pub fn telemetry_mut(&mut self) -> &mut PerformanceTelemetryCollector {
        &mut self.telemetry
    }

    /// Most recent quality changes, oldest first.
    pub fn recent_adaptations(&self) -> impl Iterator<Item = &AdaptationEvent> {
        self.adaptations.iter()
    }

    pub fn set_easing(&mut self, easing: Easing) {
        self.transitions.set_easing(easing);
    }

    pub fn force_quality_level(&mut self, level: QualityLevel) {
        let now = self.clock.now_ms();
        if let Some(event) = self.quality.force_level(level, now) {
            self.record_adaptation(event);
        }
    }

    /// Deliver an event to every participant right now.
    ///
    /// A failing participant is logged and skipped; the rest still receive it.
    pub fn broadcast_event(&mut self, event_type: &str, payload: EventPayload) {
        if self.lifecycle == Lifecycle::Destroyed {
            return;
        }
        let event = EffectEvent::new(event_type.to_owned(), payload);
        self.deliver_event(&event);
        self.prune_failed_participants();
    }

    /// Advance one frame. Returns the published state, or `None` when not running.
    pub fn tick(&mut self, delta_ms: f64) -> Option<&VisualEffectState> {
        if self.lifecycle != Lifecycle::Running {
            return None;
        }
        let started = self.clock.now_ms();
        let delta_ms = if delta_ms.is_finite() {
            delta_ms.clamp(0.0, self.config.max_delta_ms)
        } else {
            0.0
        };
        self.counters.ticks += 1;
        self.telemetry.record_frame(delta_ms as f32);
        self.adapt(started);

        let previous = self.state;
        let mut staged = previous;

        // (1) producers
        self.merge_producers(&mut staged);
        derive_visual_baseline(&mut staged);
        // (2) participant contributions
        self.merge_contributions(&mut staged, started);
        // (3) quality
        let settings = self.quality.current_settings();
        self.apply_quality(&mut staged, &settings);
        // (4) smoothing
        let mut next = self.transitions.advance(&previous, &staged, delta_ms as f32);
        self.stamp_temporal(&previous, &mut next, delta_ms);
        next.sanitize();
        self.state = next;
        // (5) publish
        self.publish();
        // (6) queued effect events
        self.emit_pending_events();

        self.project_and_flush();
        self.prune_failed_participants();

        self.counters.total_tick_ms += (self.clock.now_ms() - started).max(0.0);
        Some(&self.state)
    }

    /// Stop the loop and drop participants, producers, queued events and pending writes.
    ///
    /// Pending batched writes are discarded, not flushed: the render targets may
    /// already be gone. Calling it twice is harmless.
    pub fn destroy(&mut self) {
        if self.lifecycle == Lifecycle::Destroyed {
            return;
        }
        self.lifecycle = Lifecycle::Destroyed;
        let participants = self.participants.len();
        self.participants.clear();
        self.audio_producers.clear();
        self.color_producers.clear();
        self.events.clear();
        self.transitions.reset();
        self.pending_beat = None;
        self.pending_accent = None;
        let discarded = self
            .writer
            .as_mut()
            .map_or(0, |w| w.discard_pending());
        log::info!(
            "[coordinator] destroyed: released {} participants, discarded {} pending writes",
            participants,
            discarded
        );
    }

    pub fn metrics(&self) -> EngineMetrics {
        let batch = self
            .writer
            .as_ref()
            .map(|w| w.metrics())
            .unwrap_or_else(BatchMetrics::default);
        EngineMetrics {
            ticks: self.counters.ticks,
            state_updates: self.counters.state_updates,
            events_broadcast: self.counters.events_broadcast,
            adaptation_events: self.counters.adaptation_events,
            average_tick_ms: if self.counters.ticks == 0 {
                0.0
            } else {
                self.counters.total_tick_ms / self.counters.ticks as f64
            },
            batch_budget_violations: batch.budget_violations,
            batch_fallback_activations: batch.fallback_activations,
            writes_flushed: batch.flushed,
            writes_coalesced: batch.coalesced,
            participants: self.participants.len(),
            auto_unregistrations: self.counters.auto_unregistrations,
            producer_failures: self.counters.producer_failures,
            health_score: self.telemetry.health_score(),
            quality_level: self.quality.current_level(),
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_producer_id;
        self.next_producer_id += 1;
        id
    }

    fn adapt(&mut self, now_ms: f64) {
        let snapshot = self.telemetry.snapshot();
        if let Some(event) = self.quality.evaluate(&snapshot, now_ms) {
            self.record_adaptation(event);
        }
    }

    fn record_adaptation(&mut self, event: AdaptationEvent) {
        self.counters.adaptation_events += 1;
        self.telemetry.reset_window();
        self.events.push(
            QUALITY_CHANGED_EVENT,
            EventPayload::Text(format!(
                "{} -> {}: {}",
                event.previous.level, event.current.level, event.reason
            )),
        );
        if self.adaptations.len() == ADAPTATION_LOG_LEN {
            self.adaptations.pop_front();
        }
        self.adaptations.push_back(event);
    }

    // Every producer settles on its own; whichever has data this frame contributes.
    fn merge_producers(&mut self, staged: &mut VisualEffectState) {
        for slot in &mut self.audio_producers {
            match slot.producer.poll_profile() {
                ProducerPoll::Ready(profile) => {
                    if slot.failing {
                        log::info!("[producer] `{}` recovered", slot.producer.name());
                        slot.failing = false;
                    }
                    if let Some(beat) = profile.beat.filter(|b| b.is_finite() && *b > 0.0) {
                        let beat = beat.min(1.0);
                        self.pending_beat = Some(self.pending_beat.map_or(beat, |b| b.max(beat)));
                        self.events.push(BEAT_EVENT, EventPayload::Scalar(beat));
                    }
                    self.last_audio = Some(AudioProfile {
                        beat: None,
                        ..profile
                    });
                }
                ProducerPoll::NoData => {}
                ProducerPoll::Failed(e) => {
                    self.counters.producer_failures += 1;
                    if !slot.failing {
                        log::warn!(
                            "[producer] `{}` failed, keeping last good audio: {}",
                            slot.producer.name(),
                            e
                        );
                        slot.failing = true;
                    } else {
                        log::debug!("[producer] `{}` still failing: {}", slot.producer.name(), e);
                    }
                }
            }
        }
        for slot in &mut self.color_producers {
            match slot.producer.poll_profile() {
                ProducerPoll::Ready(profile) => {
                    if slot.failing {
                        log::info!("[producer] `{}` recovered", slot.producer.name());
                        slot.failing = false;
                    }
                    if let Some(accent) = profile.accent {
                        self.pending_accent = Some(accent);
                    }
                    self.last_color = Some(profile);
                }
                ProducerPoll::NoData => {}
                ProducerPoll::Failed(e) => {
                    self.counters.producer_failures += 1;
                    if !slot.failing {
                        log::warn!(
                            "[producer] `{}` failed, keeping last good color: {}",
                            slot.producer.name(),
                            e
                        );
                        slot.failing = true;
                    } else {
                        log::debug!("[producer] `{}` still failing: {}", slot.producer.name(), e);
                    }
                }
            }
        }

        // Re-apply the last good profiles every frame so a stalled producer
        // holds its targets instead of freezing a transition halfway.
        if let Some(audio) = self.last_audio {
            apply_audio_profile(staged, &audio);
        }
        if let Some(color) = self.last_color {
            staged.set(StateField::ColorTemperature, color.color_temperature);
            staged.set(StateField::ColorHarmony, color.harmony);
        }
    }

    fn merge_contributions(&mut self, staged: &mut VisualEffectState, now_ms: f64) {
        let mut values: FnvHashMap<StateField, SmallVec<[f32; 4]>> = FnvHashMap::default();
        for registration in &mut self.participants {
            let Some(patch) = registration.handle.contribution() else {
                continue;
            };
            registration.last_contribution_ms = Some(now_ms);
            collect_patch(&registration.name, &patch, &mut values);
        }

        let mut spread_sum = 0.0;
        let mut spread_fields = 0usize;
        for (field, contributed) in &values {
            if contributed.is_empty() {
                continue;
            }
            let sum: f32 = contributed.iter().sum();
            staged.set(*field, sum / contributed.len() as f32);
            if contributed.len() > 1 {
                let lo = contributed.iter().copied().fold(f32::MAX, f32::min);
                let hi = contributed.iter().copied().fold(f32::MIN, f32::max);
                spread_sum += ((hi - lo) / field.span()).min(1.0);
                spread_fields += 1;
            }
        }

        if !values.contains_key(&StateField::Coherence) {
            let coherence = if spread_fields == 0 {
                1.0
            } else {
                1.0 - spread_sum / spread_fields as f32
            };
            staged.set(StateField::Coherence, coherence);
        }
        if !values.contains_key(&StateField::SystemHarmony) {
            let harmony = 0.5 * staged.visual.coherence + 0.5 * staged.visual.color_harmony;
            staged.set(StateField::SystemHarmony, harmony);
        }
    }

    fn apply_quality(&self, staged: &mut VisualEffectState, settings: &QualitySettings) {
        staged.performance.device = *self.quality.device();
        staged.performance.quality_level = settings.level;
        staged.set(StateField::AdaptiveQuality, settings.quality_scalar());
        staged.set(StateField::ThermalPressure, self.telemetry.thermal().pressure());
        staged.set(
            StateField::BatteryConservation,
            self.telemetry.battery().map_or(0.0, |b| b.conservation()),
        );

        let effect_depth = staged.animation.effect_depth.min(settings.render_complexity);
        staged.set(StateField::EffectDepth, effect_depth);
        let fluidity = staged
            .animation
            .transition_fluidity
            .min(settings.transition_quality.fluidity_cap());
        staged.set(StateField::TransitionFluidity, fluidity);

        if staged.performance.device.prefers_reduced_motion {
            let tempo = staged.audio.tempo_modulation.min(1.0);
            staged.set(StateField::TempoModulation, tempo);
            let depth = staged.animation.effect_depth * 0.5;
            staged.set(StateField::EffectDepth, depth);
        }
    }

    fn copy_performance_fields(&mut self, settings: &QualitySettings) {
        let mut state = self.state;
        self.apply_quality(&mut state, settings);
        self.state.performance = state.performance;
    }

    fn stamp_temporal(
        &self,
        previous: &VisualEffectState,
        next: &mut VisualEffectState,
        delta_ms: f64,
    ) {
        let now = self.clock.now_ms();
        next.temporal.timestamp_ms = now.max(previous.temporal.timestamp_ms + TIMESTAMP_EPSILON_MS);

        let period_ms = (next.animation.pulse_rate as f64 * 1000.0).max(1.0);
        let phase = (previous.temporal.evolution_phase as f64 + delta_ms / period_ms).fract();
        next.set(StateField::EvolutionPhase, phase as f32);
        next.set(StateField::ContinuityIndex, continuity_index(previous, next));
    }

    fn publish(&mut self) {
        let state = self.state;
        for registration in &mut self.participants {
            let result = registration.handle.on_state_update(&state);
            registration.record(result, CallbackKind::StateUpdate);
        }
        self.counters.state_updates += 1;
    }

    fn emit_pending_events(&mut self) {
        for event in self.events.drain() {
            self.deliver_event(&event);
        }
    }

    fn deliver_event(&mut self, event: &EffectEvent) {
        for registration in &mut self.participants {
            let result = registration.handle.on_effect_event(event);
            registration.record(result, CallbackKind::EffectEvent);
        }
        self.counters.events_broadcast += 1;
    }

    fn prune_failed_participants(&mut self) {
        let max = self.config.max_consecutive_failures;
        let before = self.participants.len();
        self.participants.retain(|r| {
            let keep = !r.exceeded(max);
            if !keep {
                log::warn!(
                    "[coordinator] auto-unregistering `{}` after {} consecutive failures",
                    r.name,
                    max
                );
            }
            keep
        });
        self.counters.auto_unregistrations += (before - self.participants.len()) as u64;
    }

    fn project_and_flush(&mut self) {
        let Some(writer) = self.writer.as_mut() else {
            self.pending_beat = None;
            self.pending_accent = None;
            return;
        };
        let target = self.config.projection_target;
        if let Some(beat) = self.pending_beat.take() {
            writer.enqueue(
                target,
                BEAT_PULSE_PROPERTY,
                PropertyValue::Number(beat),
                Priority::Critical,
            );
        }
        if let Some([r, g, b]) = self.pending_accent.take() {
            writer.enqueue(
                target,
                ACCENT_COLOR_PROPERTY,
                PropertyValue::Color([r, g, b, 1.0]),
                Priority::Critical,
            );
        }
        for (i, field) in StateField::ALL.iter().enumerate() {
            let value = self.state.get(*field);
            if self.projected[i].is_some_and(|last| (last - value).abs() <= f32::EPSILON) {
                continue;
            }
            self.projected[i] = Some(value);
            writer.enqueue(
                target,
                field.css_name(),
                PropertyValue::Number(value),
                projection_priority(*field),
            );
        }
        writer.flush();
    }
}

fn projection_priority(field: StateField) -> Priority {
    match (field, field.origin()) {
        (StateField::Intensity | StateField::Energy, _) => Priority::High,
        (_, FieldOrigin::Performance | FieldOrigin::Temporal) => Priority::Low,
        _ => Priority::Normal,
    }
}

fn collect_patch(
    name: &str,
    patch: &StatePatch,
    values: &mut FnvHashMap<StateField, SmallVec<[f32; 4]>>,
) {
    for (field, value) in patch.iter() {
        if field.is_producer_only() {
            log::trace!("[coordinator] ignoring `{}` contribution to {:?}", name, field);
            continue;
        }
        if !value.is_finite() {
            continue;
        }
        values.entry(field).or_default().push(value);
    }
}

fn unit(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn apply_audio_profile(staged: &mut VisualEffectState, profile: &AudioProfile) {
    let energy = unit(profile.energy);
    let arousal = unit(profile.arousal);
    let valence = unit(profile.valence);
    let mood = profile.mood;

    staged.set(StateField::Energy, energy);
    staged.set(StateField::Intensity, 0.6 * energy + 0.4 * arousal);
    staged.set(StateField::TempoModulation, (0.5 + arousal) * mood.tempo_bias());
    staged.set(
        StateField::Complexity,
        0.6 * mood.complexity_bias() + 0.4 * arousal,
    );
    staged.set_flow_direction(Vec2::new(valence * 2.0 - 1.0, arousal * 2.0 - 1.0));
}

// Baseline visual and animation values implied by the audio fields. Neutral
// audio yields the neutral visual state, so a cold start stays at defaults.
fn derive_visual_baseline(staged: &mut VisualEffectState) {
    let intensity = staged.audio.intensity;
    let energy = staged.audio.energy;
    let tempo = staged.audio.tempo_modulation.max(0.5);
    let complexity = staged.audio.complexity;

    staged.set(StateField::FluidIntensity, 1.0 + energy);
    staged.set(StateField::Luminosity, 1.0 + 0.6 * intensity);
    staged.set(StateField::Depth, complexity);
    staged.set(StateField::PulseRate, 2.0 / tempo);
    staged.set(StateField::ScalingFactor, 1.0 + 0.3 * intensity);
    staged.set(StateField::TransitionFluidity, 0.5 - (tempo - 1.0) * 0.25);
    staged.set(StateField::EffectDepth, 0.5 + 0.5 * intensity);
}
