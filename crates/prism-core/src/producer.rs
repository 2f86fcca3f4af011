//! Audio and color producers feeding the coordinator.
//!
//! Producers are polled, never awaited: each poll returns immediately with
//! fresh data, nothing new, or a failure. The coordinator settles every
//! producer independently, so a slow or broken one only leaves its own fields
//! at their last good values.

use crate::error::ProducerError;
use std::cell::RefCell;
use std::rc::Rc;

/// Discrete mood label from the audio analysis side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Mood {
    #[default]
    Neutral,
    Calm,
    Melancholic,
    Uplifting,
    Energetic,
    Aggressive,
}

impl Mood {
    /// Multiplier applied to tempo-modulation.
    pub fn tempo_bias(self) -> f32 {
        match self {
            Mood::Calm => 0.7,
            Mood::Melancholic => 0.8,
            Mood::Neutral => 1.0,
            Mood::Uplifting => 1.15,
            Mood::Energetic => 1.3,
            Mood::Aggressive => 1.5,
        }
    }

    /// Baseline visual complexity for the mood.
    pub fn complexity_bias(self) -> f32 {
        match self {
            Mood::Calm => 0.25,
            Mood::Melancholic => 0.35,
            Mood::Neutral => 0.5,
            Mood::Uplifting => 0.6,
            Mood::Energetic => 0.75,
            Mood::Aggressive => 0.9,
        }
    }

    /// Rough mood from valence/arousal quadrants.
    pub fn classify(valence: f32, arousal: f32) -> Self {
        match (valence, arousal) {
            (v, a) if a > 0.75 && v < 0.35 => Mood::Aggressive,
            (_, a) if a > 0.65 => Mood::Energetic,
            (v, a) if v > 0.6 && a > 0.4 => Mood::Uplifting,
            (v, a) if v < 0.4 && a < 0.4 => Mood::Melancholic,
            (_, a) if a < 0.3 => Mood::Calm,
            _ => Mood::Neutral,
        }
    }
}

/// Latest audio analysis. All scalars are nominally 0..1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AudioProfile {
    pub energy: f32,
    pub arousal: f32,
    pub valence: f32,
    pub mood: Mood,
    /// Strength of a beat detected since the previous poll.
    pub beat: Option<f32>,
}

impl Default for AudioProfile {
    fn default() -> Self {
        Self {
            energy: 0.0,
            arousal: 0.5,
            valence: 0.5,
            mood: Mood::Neutral,
            beat: None,
        }
    }
}

/// Latest color analysis of the current artwork.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorProfile {
    /// Kelvin-like, 1000..20000.
    pub color_temperature: f32,
    /// 0..1.
    pub harmony: f32,
    /// Optional RGB accent, 0..1 per channel.
    pub accent: Option<[f32; 3]>,
}

/// Outcome of one non-blocking poll.
#[derive(Clone, Debug, PartialEq)]
pub enum ProducerPoll<T> {
    Ready(T),
    NoData,
    Failed(ProducerError),
}

pub trait AudioProducer {
    fn name(&self) -> &str;
    fn poll_profile(&mut self) -> ProducerPoll<AudioProfile>;
}

pub trait ColorProducer {
    fn name(&self) -> &str;
    fn poll_profile(&mut self) -> ProducerPoll<ColorProfile>;
}

/// Which contract a producer slot was attached under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProducerKind {
    Audio,
    Color,
}

/// Subscription handle returned on attach; pass it back to detach.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProducerHandle {
    pub(crate) id: u64,
    pub(crate) kind: ProducerKind,
}

impl ProducerHandle {
    pub fn kind(&self) -> ProducerKind {
        self.kind
    }
}

/// Create a push-fed producer for hosts whose data arrives through callbacks.
pub fn mailbox<T>(name: impl Into<String>) -> (MailboxFeed<T>, MailboxProducer<T>) {
    let slot = Rc::new(RefCell::new(None));
    (
        MailboxFeed { slot: slot.clone() },
        MailboxProducer {
            name: name.into(),
            slot,
        },
    )
}

/// Sending half of a mailbox. Cloneable; the latest value wins.
pub struct MailboxFeed<T> {
    slot: Rc<RefCell<Option<T>>>,
}

impl<T> Clone for MailboxFeed<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T> MailboxFeed<T> {
    pub fn push(&self, value: T) {
        *self.slot.borrow_mut() = Some(value);
    }
}

pub struct MailboxProducer<T> {
    name: String,
    slot: Rc<RefCell<Option<T>>>,
}

impl<T> MailboxProducer<T> {
    fn take(&mut self) -> ProducerPoll<T> {
        match self.slot.borrow_mut().take() {
            Some(v) => ProducerPoll::Ready(v),
            None => ProducerPoll::NoData,
        }
    }
}

impl AudioProducer for MailboxProducer<AudioProfile> {
    fn name(&self) -> &str {
        &self.name
    }

    fn poll_profile(&mut self) -> ProducerPoll<AudioProfile> {
        self.take()
    }
}

impl ColorProducer for MailboxProducer<ColorProfile> {
    fn name(&self) -> &str {
        &self.name
    }

    fn poll_profile(&mut self) -> ProducerPoll<ColorProfile> {
        self.take()
    }
}
