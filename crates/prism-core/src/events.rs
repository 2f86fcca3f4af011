//! Named effect events relayed to participants.

use glam::Vec2;
use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Payload carried with an effect event.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum EventPayload {
    #[default]
    Empty,
    Scalar(f32),
    Vector(Vec2),
    Color([f32; 3]),
    Text(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct EffectEvent {
    pub event_type: Cow<'static, str>,
    pub payload: EventPayload,
}

impl EffectEvent {
    pub fn new(event_type: impl Into<Cow<'static, str>>, payload: EventPayload) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
        }
    }
}

/// Bounded queue of events waiting for the next tick's emit step.
///
/// Cloning shares the queue, so participants can be handed one at
/// construction and push into it from their own callbacks.
#[derive(Clone)]
pub struct EventQueue {
    inner: Rc<RefCell<VecDeque<EffectEvent>>>,
    capacity: usize,
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Rc::new(RefCell::new(VecDeque::with_capacity(capacity.min(64)))),
            capacity: capacity.max(1),
        }
    }

    /// Queue an event; when full the oldest queued event is dropped.
    pub fn push(&self, event_type: impl Into<Cow<'static, str>>, payload: EventPayload) {
        let mut queue = self.inner.borrow_mut();
        if queue.len() >= self.capacity {
            if let Some(dropped) = queue.pop_front() {
                log::warn!(
                    "[events] queue full, dropping `{}`",
                    dropped.event_type
                );
            }
        }
        queue.push_back(EffectEvent::new(event_type, payload));
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    pub(crate) fn drain(&self) -> Vec<EffectEvent> {
        self.inner.borrow_mut().drain(..).collect()
    }

    pub(crate) fn clear(&self) {
        self.inner.borrow_mut().clear();
    }
}
