use prism_core::{AudioProducer, AudioProfile, Mood, ProducerError, ProducerPoll};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys as web;

// Bins averaged for the energy figure; the low end carries most of the beat.
const ENERGY_BINS: usize = 16;
const BEAT_FLUX_RATIO: f32 = 1.35;
const BEAT_REFRACTORY_POLLS: u32 = 8;

enum Source {
    Pending,
    Live(web::AnalyserNode),
    Denied(String),
}

/// Cloneable slot the microphone setup fills in once permission is granted.
#[derive(Clone)]
pub struct AnalyserSlot(Rc<RefCell<Source>>);

impl AnalyserSlot {
    /// Open the microphone and route it into a fresh analyser.
    ///
    /// Must run from a user gesture or the audio context stays suspended.
    pub async fn connect_microphone(&self) -> anyhow::Result<()> {
        match open_microphone().await {
            Ok(analyser) => {
                log::info!(
                    "[producer] microphone analyser live ({} bins)",
                    analyser.frequency_bin_count()
                );
                *self.0.borrow_mut() = Source::Live(analyser);
                Ok(())
            }
            Err(e) => {
                *self.0.borrow_mut() = Source::Denied(format!("{:?}", e));
                Err(anyhow::anyhow!(format!("{:?}", e)))
            }
        }
    }
}

async fn open_microphone() -> Result<web::AnalyserNode, JsValue> {
    let window = web::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let devices = window.navigator().media_devices()?;
    let constraints = web::MediaStreamConstraints::new();
    constraints.set_audio(&JsValue::TRUE);
    let promise = devices.get_user_media_with_constraints(&constraints)?;
    let stream: web::MediaStream = JsFuture::from(promise).await?.dyn_into()?;

    let ctx = web::AudioContext::new()?;
    let source = ctx.create_media_stream_source(&stream)?;
    let analyser = ctx.create_analyser()?;
    analyser.set_fft_size(256);
    analyser.set_smoothing_time_constant(0.6);
    source.connect_with_audio_node(&analyser)?;
    Ok(analyser)
}

/// Audio producer backed by a Web Audio `AnalyserNode`.
///
/// Energy is the mean normalized level of the lowest bins, arousal tracks the
/// spectral centroid and valence the balance between mids and lows. A beat is
/// reported when energy jumps well above its running average.
pub struct AnalyserProducer {
    slot: AnalyserSlot,
    buf: Vec<f32>,
    avg_energy: f32,
    cooldown: u32,
    reported_denial: bool,
}

impl AnalyserProducer {
    pub fn new() -> (Self, AnalyserSlot) {
        let slot = AnalyserSlot(Rc::new(RefCell::new(Source::Pending)));
        (
            Self {
                slot: slot.clone(),
                buf: Vec::new(),
                avg_energy: 0.0,
                cooldown: 0,
                reported_denial: false,
            },
            slot,
        )
    }

    fn analyse(&mut self) -> AudioProfile {
        let bins = self.buf.len().max(1);
        let lin: Vec<f32> = self
            .buf
            .iter()
            .map(|db| ((db + 100.0) / 100.0).clamp(0.0, 1.0))
            .collect();

        let take = bins.min(ENERGY_BINS);
        let energy = lin.iter().take(take).sum::<f32>() / take as f32;

        let total: f32 = lin.iter().sum();
        let centroid = if total > 1e-4 {
            lin.iter()
                .enumerate()
                .map(|(i, v)| i as f32 * v)
                .sum::<f32>()
                / (total * bins as f32)
        } else {
            0.0
        };
        let arousal = (0.5 * energy + 1.5 * centroid).clamp(0.0, 1.0);

        let third = (bins / 3).max(1);
        let lows: f32 = lin.iter().take(third).sum();
        let mids: f32 = lin.iter().skip(third).take(third).sum();
        let valence = if lows + mids > 1e-4 {
            (mids / (lows + mids) * 1.5).clamp(0.0, 1.0)
        } else {
            0.5
        };

        let beat = if self.cooldown == 0
            && energy > 0.1
            && energy > self.avg_energy * BEAT_FLUX_RATIO
        {
            self.cooldown = BEAT_REFRACTORY_POLLS;
            Some(((energy - self.avg_energy) / energy.max(1e-3)).clamp(0.2, 1.0))
        } else {
            self.cooldown = self.cooldown.saturating_sub(1);
            None
        };
        self.avg_energy = 0.9 * self.avg_energy + 0.1 * energy;

        AudioProfile {
            energy,
            arousal,
            valence,
            mood: Mood::classify(valence, arousal),
            beat,
        }
    }
}

impl AudioProducer for AnalyserProducer {
    fn name(&self) -> &str {
        "microphone"
    }

    fn poll_profile(&mut self) -> ProducerPoll<AudioProfile> {
        let analyser = match &*self.slot.0.borrow() {
            Source::Pending => return ProducerPoll::NoData,
            Source::Denied(reason) => {
                // report once, then stay quiet
                if self.reported_denial {
                    return ProducerPoll::NoData;
                }
                self.reported_denial = true;
                return ProducerPoll::Failed(ProducerError::Failed(reason.clone()));
            }
            Source::Live(a) => a.clone(),
        };
        let bins = analyser.frequency_bin_count() as usize;
        if bins == 0 {
            return ProducerPoll::Failed(ProducerError::Unavailable);
        }
        if self.buf.len() != bins {
            self.buf.resize(bins, -100.0);
        }
        analyser.get_float_frequency_data(&mut self.buf);
        ProducerPoll::Ready(self.analyse())
    }
}
