use prism_core::{
    AudioProducer, AudioProfile, Clock, ColorProducer, ColorProfile, Mood, ProducerError,
    ProducerPoll,
};
use rand::prelude::*;
use std::rc::Rc;

// Per-step chance of a beat on downbeats and off-beats of the eighth-note grid
const DOWNBEAT_PROB: f32 = 0.85;
const OFFBEAT_PROB: f32 = 0.3;
const ENVELOPE_DECAY_PER_SEC: f32 = 3.0;

/// Generative beat source standing in for a live analyser.
///
/// Steps an eighth-note grid against the clock, rolling a seeded RNG per step
/// to decide whether a beat lands. Energy follows a decaying envelope kicked by
/// each beat; valence and arousal random-walk slowly.
pub struct BeatProducer {
    clock: Rc<dyn Clock>,
    rng: StdRng,
    bpm: f32,
    step: u64,
    beat_accum: f64,
    last_ms: Option<f64>,
    envelope: f32,
    valence: f32,
    arousal: f32,
    dropout: Option<(f64, f64)>,
}

impl BeatProducer {
    pub fn new(clock: Rc<dyn Clock>, bpm: f32, seed: u64) -> Self {
        Self {
            clock,
            rng: StdRng::seed_from_u64(seed),
            bpm: bpm.max(1.0),
            step: 0,
            beat_accum: 0.0,
            last_ms: None,
            envelope: 0.0,
            valence: 0.5,
            arousal: 0.5,
            dropout: None,
        }
    }

    /// Report the source as unavailable between `from_ms` and `to_ms`.
    pub fn with_dropout(mut self, from_ms: f64, to_ms: f64) -> Self {
        self.dropout = Some((from_ms, to_ms));
        self
    }

    // Returns the strongest beat scheduled during `dt_sec`, if any.
    fn advance(&mut self, dt_sec: f64) -> Option<f32> {
        let seconds_per_beat = 60.0 / self.bpm as f64;
        self.beat_accum += dt_sec;
        let mut strongest: Option<f32> = None;
        while self.beat_accum >= seconds_per_beat / 2.0 {
            // eighth notes grid
            self.beat_accum -= seconds_per_beat / 2.0;
            let prob = if self.step % 2 == 0 {
                DOWNBEAT_PROB
            } else {
                OFFBEAT_PROB
            };
            self.step += 1;
            if self.rng.gen::<f32>() < prob {
                let velocity = 0.4 + self.rng.gen::<f32>() * 0.6;
                strongest = Some(strongest.map_or(velocity, |s| s.max(velocity)));
            }
        }

        self.envelope *= (-ENVELOPE_DECAY_PER_SEC * dt_sec as f32).exp();
        if let Some(v) = strongest {
            self.envelope = self.envelope.max(v);
        }
        let walk = (dt_sec as f32 * 0.2).min(0.05);
        self.valence = (self.valence + self.rng.gen_range(-walk..=walk)).clamp(0.0, 1.0);
        self.arousal = (self.arousal + self.rng.gen_range(-walk..=walk)).clamp(0.0, 1.0);
        strongest
    }
}

impl AudioProducer for BeatProducer {
    fn name(&self) -> &str {
        "synthetic-beat"
    }

    fn poll_profile(&mut self) -> ProducerPoll<AudioProfile> {
        let now = self.clock.now_ms();
        let dt_sec = self.last_ms.map_or(0.0, |last| ((now - last) / 1000.0).max(0.0));
        self.last_ms = Some(now);

        if let Some((from, to)) = self.dropout {
            if (from..to).contains(&now) {
                return ProducerPoll::Failed(ProducerError::Unavailable);
            }
        }
        if dt_sec == 0.0 {
            return ProducerPoll::NoData;
        }

        let beat = self.advance(dt_sec);
        let energy = (0.2 + 0.8 * self.envelope).clamp(0.0, 1.0);
        let arousal = (0.5 * self.arousal + 0.5 * energy).clamp(0.0, 1.0);
        ProducerPoll::Ready(AudioProfile {
            energy,
            arousal,
            valence: self.valence,
            mood: Mood::classify(self.valence, arousal),
            beat,
        })
    }
}

/// Palette that swings slowly between warm and cool, with an occasional accent.
pub struct DriftingPalette {
    clock: Rc<dyn Clock>,
    period_ms: f64,
    accent_every_ms: f64,
    last_accent_ms: f64,
    last_poll_ms: Option<f64>,
}

impl DriftingPalette {
    pub fn new(clock: Rc<dyn Clock>, period_ms: f64, accent_every_ms: f64) -> Self {
        Self {
            clock,
            period_ms: period_ms.max(1.0),
            accent_every_ms,
            last_accent_ms: 0.0,
            last_poll_ms: None,
        }
    }
}

impl ColorProducer for DriftingPalette {
    fn name(&self) -> &str {
        "drifting-palette"
    }

    fn poll_profile(&mut self) -> ProducerPoll<ColorProfile> {
        let now = self.clock.now_ms();
        // A new palette only every 250 ms, like artwork analysis would
        if self.last_poll_ms.is_some_and(|last| now - last < 250.0) {
            return ProducerPoll::NoData;
        }
        self.last_poll_ms = Some(now);

        let phase = (now / self.period_ms * std::f64::consts::TAU) as f32;
        let color_temperature = 6250.0 + 2750.0 * phase.sin();
        let harmony = 0.6 + 0.3 * (phase * 0.5).cos();
        let accent = if now - self.last_accent_ms >= self.accent_every_ms {
            self.last_accent_ms = now;
            let warmth = 0.5 + 0.5 * phase.sin();
            Some([warmth, 0.4, 1.0 - warmth])
        } else {
            None
        };
        ProducerPoll::Ready(ColorProfile {
            color_temperature,
            harmony,
            accent,
        })
    }
}
