// Host-side tests for the priority batch writer.

use prism_core::constants::{ACCENT_COLOR_PROPERTY, BEAT_PULSE_PROPERTY};
use prism_core::*;
use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<(TargetHandle, String, PropertyValue)>>>;

/// Records writes; optionally advances the clock per group to simulate slow targets.
struct RecordingSink {
    log: Log,
    groups: Rc<RefCell<Vec<TargetHandle>>>,
    clock: Rc<ManualClock>,
    cost_per_group_ms: f64,
}

impl PropertySink for RecordingSink {
    fn write(&mut self, target: TargetHandle, property: &str, value: &PropertyValue) {
        self.log
            .borrow_mut()
            .push((target, property.to_owned(), value.clone()));
    }

    fn write_group(&mut self, target: TargetHandle, writes: &[(&str, &PropertyValue)]) {
        self.groups.borrow_mut().push(target);
        self.clock.advance(self.cost_per_group_ms);
        for (property, value) in writes {
            self.write(target, property, value);
        }
    }
}

struct Fixture {
    writer: PriorityBatchWriter<RecordingSink>,
    log: Log,
    groups: Rc<RefCell<Vec<TargetHandle>>>,
    clock: Rc<ManualClock>,
}

fn fixture(cost_per_group_ms: f64) -> Fixture {
    fixture_with(cost_per_group_ms, BatchConfig::default())
}

fn fixture_with(cost_per_group_ms: f64, config: BatchConfig) -> Fixture {
    let clock = Rc::new(ManualClock::new(0.0));
    let log: Log = Rc::default();
    let groups = Rc::new(RefCell::new(Vec::new()));
    let sink = RecordingSink {
        log: log.clone(),
        groups: groups.clone(),
        clock: clock.clone(),
        cost_per_group_ms,
    };
    let writer = PriorityBatchWriter::new(sink, clock.clone(), config);
    Fixture {
        writer,
        log,
        groups,
        clock,
    }
}

fn properties(log: &Log) -> Vec<String> {
    log.borrow().iter().map(|(_, p, _)| p.clone()).collect()
}

#[test]
fn repeated_key_keeps_only_latest_value() {
    let mut f = fixture(0.0);
    let t = TargetHandle(1);
    for v in [0.1, 0.2, 0.3] {
        f.writer
            .enqueue(t, "--prism-depth", PropertyValue::Number(v), Priority::Normal);
    }
    assert_eq!(f.writer.pending_len(), 1);
    assert_eq!(f.writer.flush(), 1);

    let log = f.log.borrow();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].2, PropertyValue::Number(0.3));
    assert_eq!(f.writer.metrics().coalesced, 2);
}

#[test]
fn flush_drains_in_priority_order() {
    let mut f = fixture(0.0);
    let t = TargetHandle(1);
    f.writer.enqueue(t, "low", PropertyValue::Number(1.0), Priority::Low);
    f.writer
        .enqueue(t, "normal", PropertyValue::Number(1.0), Priority::Normal);
    f.writer.enqueue(t, "high", PropertyValue::Number(1.0), Priority::High);
    f.writer.flush();
    assert_eq!(properties(&f.log), vec!["high", "normal", "low"]);
    assert_eq!(f.writer.pending_len(), 0);
}

#[test]
fn writes_are_grouped_by_target_in_enqueue_order() {
    let mut f = fixture(0.0);
    f.writer
        .enqueue(TargetHandle(2), "a", PropertyValue::Number(1.0), Priority::Normal);
    f.writer
        .enqueue(TargetHandle(1), "b", PropertyValue::Number(1.0), Priority::Normal);
    f.writer
        .enqueue(TargetHandle(2), "c", PropertyValue::Number(1.0), Priority::Normal);
    f.writer
        .enqueue(TargetHandle(1), "d", PropertyValue::Number(1.0), Priority::Normal);
    f.writer.flush();

    assert_eq!(*f.groups.borrow(), vec![TargetHandle(1), TargetHandle(2)]);
    assert_eq!(properties(&f.log), vec!["b", "d", "a", "c"]);
}

#[test]
fn allow_listed_critical_writes_bypass_the_queue() {
    let mut f = fixture(0.0);
    let t = TargetHandle(0);
    f.writer.enqueue(
        t,
        BEAT_PULSE_PROPERTY,
        PropertyValue::Number(0.9),
        Priority::Critical,
    );
    f.writer.enqueue(
        t,
        ACCENT_COLOR_PROPERTY,
        PropertyValue::Color([1.0, 0.5, 0.0, 1.0]),
        Priority::Critical,
    );
    assert_eq!(f.log.borrow().len(), 2);
    assert_eq!(f.writer.pending_len(), 0);
    assert_eq!(f.writer.metrics().immediate, 2);
}

#[test]
fn critical_write_supersedes_pending_value_for_same_key() {
    let mut f = fixture(0.0);
    let t = TargetHandle(0);
    f.writer
        .enqueue(t, BEAT_PULSE_PROPERTY, PropertyValue::Number(0.2), Priority::Normal);
    f.writer
        .enqueue(t, BEAT_PULSE_PROPERTY, PropertyValue::Number(0.9), Priority::Critical);
    assert_eq!(f.writer.pending_len(), 0);
    assert_eq!(f.writer.flush(), 0);

    let log = f.log.borrow();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].2, PropertyValue::Number(0.9));
    assert_eq!(f.writer.metrics().coalesced, 1);
}

#[test]
fn unknown_critical_property_is_queued_as_high() {
    let mut f = fixture(0.0);
    let t = TargetHandle(0);
    assert!(!f.writer.is_critical_property("--prism-depth"));
    f.writer
        .enqueue(t, "--prism-depth", PropertyValue::Number(0.5), Priority::Critical);
    f.writer.enqueue(t, "later", PropertyValue::Number(0.5), Priority::Normal);
    assert!(f.log.borrow().is_empty());
    f.writer.flush();
    assert_eq!(properties(&f.log), vec!["--prism-depth", "later"]);
}

#[test]
fn reprioritised_key_moves_between_tiers() {
    let mut f = fixture(0.0);
    let t = TargetHandle(0);
    f.writer.enqueue(t, "x", PropertyValue::Number(1.0), Priority::Low);
    f.writer.enqueue(t, "y", PropertyValue::Number(1.0), Priority::Normal);
    f.writer.enqueue(t, "x", PropertyValue::Number(2.0), Priority::High);
    assert_eq!(f.writer.pending_len(), 2);
    assert_eq!(f.writer.flush(), 2);
    assert_eq!(properties(&f.log), vec!["x", "y"]);
    assert_eq!(f.log.borrow()[0].2, PropertyValue::Number(2.0));
}

#[test]
fn over_budget_flush_defers_writes_that_can_wait() {
    // each group costs longer than the whole flush budget
    let mut f = fixture(10.0);
    let t = TargetHandle(0);
    f.writer.enqueue(t, "high", PropertyValue::Number(1.0), Priority::High);
    f.writer.enqueue(t, "low", PropertyValue::Number(1.0), Priority::Low);

    assert_eq!(f.writer.flush(), 1);
    assert_eq!(properties(&f.log), vec!["high"]);
    assert_eq!(f.writer.pending_len(), 1);
    assert_eq!(f.writer.metrics().deferred, 1);

    f.clock.advance(40.0);
    assert_eq!(f.writer.flush(), 1);
    assert_eq!(properties(&f.log), vec!["high", "low"]);
}

#[test]
fn repeated_violations_switch_to_direct_writes_until_cooldown() {
    let mut f = fixture(10.0);
    let t = TargetHandle(0);
    for i in 0..3 {
        f.writer
            .enqueue(t, "p", PropertyValue::Number(i as f32), Priority::High);
        f.writer.flush();
    }
    let metrics = f.writer.metrics();
    assert_eq!(metrics.budget_violations, 3);
    assert_eq!(metrics.fallback_activations, 1);
    assert!(f.writer.in_fallback());

    let before = f.log.borrow().len();
    f.writer.enqueue(t, "p", PropertyValue::Number(9.0), Priority::Low);
    assert_eq!(f.log.borrow().len(), before + 1);
    assert_eq!(f.writer.pending_len(), 0);

    f.clock.advance(BatchConfig::default().fallback_cooldown_ms);
    f.writer.enqueue(t, "p", PropertyValue::Number(10.0), Priority::Low);
    assert!(!f.writer.in_fallback());
    assert_eq!(f.writer.pending_len(), 1);
}

#[test]
fn direct_write_in_fallback_is_not_overwritten_by_deferred_value() {
    let config = BatchConfig {
        violation_threshold: 1,
        ..BatchConfig::default()
    };
    let mut f = fixture_with(10.0, config);
    let t = TargetHandle(0);
    f.writer.enqueue(t, "--x", PropertyValue::Number(1.0), Priority::High);
    f.writer.enqueue(t, "--n", PropertyValue::Number(1.0), Priority::Normal);
    // the High group alone blows the budget: --n is deferred and batching turns off
    f.writer.flush();
    assert!(f.writer.in_fallback());
    assert_eq!(f.writer.pending_len(), 1);

    f.writer.enqueue(t, "--n", PropertyValue::Number(2.0), Priority::Normal);
    assert_eq!(f.writer.pending_len(), 0);
    f.writer.flush();

    let log = f.log.borrow();
    let last_n = log.iter().rev().find(|(_, p, _)| p == "--n").map(|(_, _, v)| v.clone());
    assert_eq!(last_n, Some(PropertyValue::Number(2.0)));
    assert_eq!(log.iter().filter(|(_, p, _)| p == "--n").count(), 1);
}

#[test]
fn within_budget_flush_resets_the_violation_streak() {
    let mut f = fixture(10.0);
    let t = TargetHandle(0);
    for _ in 0..2 {
        f.writer.enqueue(t, "p", PropertyValue::Number(1.0), Priority::High);
        f.writer.flush();
    }
    // empty flush costs nothing
    f.writer.flush();
    for _ in 0..2 {
        f.writer.enqueue(t, "p", PropertyValue::Number(1.0), Priority::High);
        f.writer.flush();
    }
    assert!(!f.writer.in_fallback());
    assert_eq!(f.writer.metrics().budget_violations, 4);
}

#[test]
fn discard_pending_drops_without_writing() {
    let mut f = fixture(0.0);
    let t = TargetHandle(0);
    f.writer.enqueue(t, "a", PropertyValue::Number(1.0), Priority::High);
    f.writer.enqueue(t, "b", PropertyValue::Number(1.0), Priority::Low);
    assert_eq!(f.writer.discard_pending(), 2);
    assert_eq!(f.writer.flush(), 0);
    assert!(f.log.borrow().is_empty());
    assert_eq!(f.writer.metrics().discarded, 2);
}

#[test]
fn property_values_format_for_style_sinks() {
    assert_eq!(PropertyValue::Number(0.5).to_string(), "0.5000");
    assert_eq!(
        PropertyValue::Color([1.0, 0.0, 0.5, 1.0]).to_string(),
        "rgba(255, 0, 128, 1.000)"
    );
    assert_eq!(PropertyValue::Text("none".into()).to_string(), "none");
}
