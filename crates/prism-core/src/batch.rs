//! Coalescing, priority-ordered writes of visual properties.
//!
//! Writes are upserted into one pending map per priority tier, keyed by
//! `(target, property)`, so only the latest value for a key survives until the
//! next flush. Critical properties from a small allow-list skip batching and
//! go straight to the sink.

use crate::clock::Clock;
use crate::constants::*;
use fnv::FnvHashMap;
use smallvec::SmallVec;
use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

/// Opaque handle for whatever a sink writes to (a DOM element, a uniform slot, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetHandle(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    Critical,
    High,
    Normal,
    Low,
}

impl Priority {
    const BATCHED: [Priority; 3] = [Priority::High, Priority::Normal, Priority::Low];

    /// Longest a write at this tier should wait before reaching the sink.
    pub fn max_latency_ms(self) -> f64 {
        match self {
            Priority::Critical => 0.0,
            Priority::High => HIGH_LATENCY_MS,
            Priority::Normal => NORMAL_LATENCY_MS,
            Priority::Low => LOW_LATENCY_MS,
        }
    }

    fn slot(self) -> usize {
        match self {
            Priority::Critical | Priority::High => 0,
            Priority::Normal => 1,
            Priority::Low => 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    Number(f32),
    /// RGBA, each channel 0..1.
    Color([f32; 4]),
    Text(String),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Number(v) => write!(f, "{:.4}", v),
            PropertyValue::Color([r, g, b, a]) => write!(
                f,
                "rgba({}, {}, {}, {:.3})",
                (r.clamp(0.0, 1.0) * 255.0).round() as u8,
                (g.clamp(0.0, 1.0) * 255.0).round() as u8,
                (b.clamp(0.0, 1.0) * 255.0).round() as u8,
                a.clamp(0.0, 1.0)
            ),
            PropertyValue::Text(s) => f.write_str(s),
        }
    }
}

/// Downstream consumer of `(target, property, value)` triples.
pub trait PropertySink {
    fn write(&mut self, target: TargetHandle, property: &str, value: &PropertyValue);

    /// Apply several properties to one target. Override when grouping is cheaper.
    fn write_group(&mut self, target: TargetHandle, writes: &[(&str, &PropertyValue)]) {
        for (property, value) in writes {
            self.write(target, property, value);
        }
    }
}

impl<S: PropertySink + ?Sized> PropertySink for Box<S> {
    fn write(&mut self, target: TargetHandle, property: &str, value: &PropertyValue) {
        (**self).write(target, property, value);
    }

    fn write_group(&mut self, target: TargetHandle, writes: &[(&str, &PropertyValue)]) {
        (**self).write_group(target, writes);
    }
}

#[derive(Clone, Debug)]
pub struct BatchConfig {
    pub flush_budget_ms: f64,
    /// Consecutive over-budget flushes before falling back to direct writes.
    pub violation_threshold: u32,
    pub fallback_cooldown_ms: f64,
    pub critical_properties: Vec<Cow<'static, str>>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            flush_budget_ms: FLUSH_BUDGET_MS,
            violation_threshold: VIOLATION_THRESHOLD,
            fallback_cooldown_ms: FALLBACK_COOLDOWN_MS,
            critical_properties: vec![
                Cow::Borrowed(BEAT_PULSE_PROPERTY),
                Cow::Borrowed(ACCENT_COLOR_PROPERTY),
            ],
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BatchMetrics {
    pub enqueued: u64,
    pub coalesced: u64,
    pub flushed: u64,
    pub immediate: u64,
    pub flushes: u64,
    pub deferred: u64,
    pub budget_violations: u64,
    pub fallback_activations: u64,
    pub discarded: u64,
    pub last_flush_ms: f64,
}

type WriteKey = (TargetHandle, Cow<'static, str>);

#[derive(Clone, Debug)]
struct PendingWrite {
    value: PropertyValue,
    priority: Priority,
    enqueued_ms: f64,
    seq: u64,
}

pub struct PriorityBatchWriter<S: PropertySink> {
    sink: S,
    clock: Rc<dyn Clock>,
    config: BatchConfig,
    pending: [FnvHashMap<WriteKey, PendingWrite>; 3],
    // which tier currently holds a key, so a re-prioritised write moves instead of duplicating
    index: FnvHashMap<WriteKey, Priority>,
    seq: u64,
    consecutive_violations: u32,
    fallback_until_ms: Option<f64>,
    metrics: BatchMetrics,
}

impl<S: PropertySink> PriorityBatchWriter<S> {
    pub fn new(sink: S, clock: Rc<dyn Clock>, config: BatchConfig) -> Self {
        Self {
            sink,
            clock,
            config,
            pending: Default::default(),
            index: FnvHashMap::default(),
            seq: 0,
            consecutive_violations: 0,
            fallback_until_ms: None,
            metrics: BatchMetrics::default(),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn metrics(&self) -> BatchMetrics {
        self.metrics
    }

    pub fn pending_len(&self) -> usize {
        self.index.len()
    }

    pub fn is_critical_property(&self, property: &str) -> bool {
        self.config
            .critical_properties
            .iter()
            .any(|p| p.as_ref() == property)
    }

    /// True while batching is disabled after repeated budget overruns.
    pub fn in_fallback(&self) -> bool {
        self.fallback_until_ms.is_some()
    }

    /// Queue a write; repeated keys before the next flush keep only the latest value.
    pub fn enqueue(
        &mut self,
        target: TargetHandle,
        property: impl Into<Cow<'static, str>>,
        value: PropertyValue,
        priority: Priority,
    ) {
        let property = property.into();
        let now = self.clock.now_ms();
        self.metrics.enqueued += 1;
        self.maybe_leave_fallback(now);

        let mut priority = priority;
        if priority == Priority::Critical {
            if self.is_critical_property(&property) {
                self.drop_superseded(target, &property);
                self.write_now(target, &property, &value);
                return;
            }
            log::debug!(
                "[batch] {} is not on the critical allow-list, queuing as high",
                property
            );
            priority = Priority::High;
        }
        if self.fallback_until_ms.is_some() {
            self.drop_superseded(target, &property);
            self.write_now(target, &property, &value);
            return;
        }

        let key = (target, property);
        let seq = self.seq;
        self.seq += 1;
        match self.index.get(&key).copied() {
            Some(old) if old.slot() != priority.slot() => {
                self.pending[old.slot()].remove(&key);
                self.metrics.coalesced += 1;
            }
            Some(_) => self.metrics.coalesced += 1,
            None => {}
        }
        let enqueued_ms = self.pending[priority.slot()]
            .get(&key)
            .map_or(now, |p| p.enqueued_ms);
        self.index.insert(key.clone(), priority);
        self.pending[priority.slot()].insert(
            key,
            PendingWrite {
                value,
                priority,
                enqueued_ms,
                seq,
            },
        );
    }

    /// Drain pending writes in priority order, grouped per target.
    ///
    /// When the flush runs past its budget, lower tiers whose latency deadline
    /// has not passed yet are left for the next flush. Returns writes applied.
    pub fn flush(&mut self) -> usize {
        let start = self.clock.now_ms();
        self.maybe_leave_fallback(start);
        let mut written = 0usize;

        for priority in Priority::BATCHED {
            let slot = priority.slot();
            if self.pending[slot].is_empty() {
                continue;
            }
            let now = self.clock.now_ms();
            let over_budget = now - start > self.config.flush_budget_ms;
            let mut entries: Vec<(WriteKey, PendingWrite)> = if over_budget {
                // only what is already due; the rest waits a frame
                let due: Vec<WriteKey> = self.pending[slot]
                    .iter()
                    .filter(|(_, p)| now - p.enqueued_ms >= p.priority.max_latency_ms())
                    .map(|(k, _)| k.clone())
                    .collect();
                let deferred = self.pending[slot].len() - due.len();
                if deferred > 0 {
                    self.metrics.deferred += deferred as u64;
                    log::debug!("[batch] deferring {} {:?} writes", deferred, priority);
                }
                due.into_iter()
                    .filter_map(|k| self.pending[slot].remove_entry(&k))
                    .collect()
            } else {
                self.pending[slot].drain().collect()
            };
            for (key, _) in &entries {
                self.index.remove(key);
            }
            entries.sort_by(|a, b| a.0 .0.cmp(&b.0 .0).then(a.1.seq.cmp(&b.1.seq)));
            written += self.write_grouped(&entries);
        }

        let elapsed = self.clock.now_ms() - start;
        self.metrics.flushes += 1;
        self.metrics.flushed += written as u64;
        self.metrics.last_flush_ms = elapsed;
        if elapsed > self.config.flush_budget_ms {
            self.record_violation(elapsed);
        } else {
            self.consecutive_violations = 0;
        }
        written
    }

    /// Drop everything pending without writing. Returns how many writes were dropped.
    pub fn discard_pending(&mut self) -> usize {
        let dropped = self.index.len();
        for map in &mut self.pending {
            map.clear();
        }
        self.index.clear();
        self.metrics.discarded += dropped as u64;
        dropped
    }

    // A direct write must not be overwritten later by an older pending value.
    fn drop_superseded(&mut self, target: TargetHandle, property: &Cow<'static, str>) {
        let key = (target, property.clone());
        if let Some(old) = self.index.remove(&key) {
            self.pending[old.slot()].remove(&key);
            self.metrics.coalesced += 1;
        }
    }

    fn write_grouped(&mut self, entries: &[(WriteKey, PendingWrite)]) -> usize {
        let mut written = 0;
        let mut i = 0;
        while i < entries.len() {
            let target = entries[i].0 .0;
            let mut group: SmallVec<[(&str, &PropertyValue); 16]> = SmallVec::new();
            while i < entries.len() && entries[i].0 .0 == target {
                group.push((entries[i].0 .1.as_ref(), &entries[i].1.value));
                i += 1;
            }
            written += group.len();
            self.sink.write_group(target, &group);
        }
        written
    }

    fn write_now(&mut self, target: TargetHandle, property: &str, value: &PropertyValue) {
        self.metrics.immediate += 1;
        self.sink.write(target, property, value);
    }

    fn record_violation(&mut self, elapsed: f64) {
        self.metrics.budget_violations += 1;
        self.consecutive_violations += 1;
        log::warn!(
            "[batch] flush took {:.2}ms (budget {:.2}ms), {} in a row",
            elapsed,
            self.config.flush_budget_ms,
            self.consecutive_violations
        );
        if self.consecutive_violations >= self.config.violation_threshold
            && self.fallback_until_ms.is_none()
        {
            let until = self.clock.now_ms() + self.config.fallback_cooldown_ms;
            self.fallback_until_ms = Some(until);
            self.metrics.fallback_activations += 1;
            log::warn!(
                "[batch] disabling batching for {:.0}ms, writing directly",
                self.config.fallback_cooldown_ms
            );
        }
    }

    fn maybe_leave_fallback(&mut self, now: f64) {
        if let Some(until) = self.fallback_until_ms {
            if now >= until {
                self.fallback_until_ms = None;
                self.consecutive_violations = 0;
                log::info!("[batch] re-enabling batching");
            }
        }
    }
}
