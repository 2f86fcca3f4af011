#![cfg(target_arch = "wasm32")]
//! Browser front-end: runs the coordinator from requestAnimationFrame and
//! projects the shared state onto the page as CSS custom properties.

mod audio;
mod dom;
mod frame;
mod probe;

use instant::Instant;
use prism_core::constants::BENCHMARK_ITERATIONS;
use prism_core::{
    cpu_benchmark, mailbox, ColorProfile, CoordinatorConfig, DeviceCapabilityProfile,
    InstantClock, MailboxFeed, StateCoordinator,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys as web;

const STAGE_ELEMENT_ID: &str = "prism-stage";

struct Engine {
    coordinator: Rc<RefCell<StateCoordinator>>,
    palette: MailboxFeed<ColorProfile>,
    running: Rc<Cell<bool>>,
}

thread_local! {
    static ENGINE: RefCell<Option<Engine>> = const { RefCell::new(None) };
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("prism-web starting");

    spawn_local(async move {
        if let Err(e) = init().await {
            log::error!("init error: {:?}", e);
        }
    });
    Ok(())
}

async fn init() -> anyhow::Result<()> {
    let window = web::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let document = dom::window_document().ok_or_else(|| anyhow::anyhow!("no document"))?;

    let benchmark_ms = cpu_benchmark(&InstantClock::new(), BENCHMARK_ITERATIONS);
    let device = DeviceCapabilityProfile::detect(
        &probe::BrowserProbe::new(window.clone()).with_benchmark(benchmark_ms),
    );

    // Variables go on `#prism-stage` when the page has one, else on the root
    let mut sink = dom::DomStyleSink::new(&document)?;
    let mut config = CoordinatorConfig::default();
    if let Some(stage) = sink.register(&document, STAGE_ELEMENT_ID) {
        config.projection_target = stage;
    }
    let mut coordinator = StateCoordinator::new(device, config, Rc::new(InstantClock::new()));
    coordinator.attach_sink(Box::new(sink));

    let (palette, palette_producer) = mailbox::<ColorProfile>("artwork-palette");
    coordinator.attach_color_producer(Box::new(palette_producer));
    let (analyser, analyser_slot) = audio::AnalyserProducer::new();
    coordinator.attach_audio_producer(Box::new(analyser));

    if let Some(participant) = dom::QualityClassParticipant::new(&document) {
        coordinator.register_participant(Box::new(participant))?;
    }
    coordinator.initialize()?;

    let coordinator = Rc::new(RefCell::new(coordinator));
    let running = Rc::new(Cell::new(true));
    ENGINE.with(|slot| {
        *slot.borrow_mut() = Some(Engine {
            coordinator: coordinator.clone(),
            palette,
            running: running.clone(),
        });
    });

    // Browsers only hand out the microphone after a user gesture
    static MIC_REQUESTED: AtomicBool = AtomicBool::new(false);
    dom::add_click_listener(&document, move || {
        if MIC_REQUESTED.swap(true, Ordering::SeqCst) {
            return;
        }
        let slot = analyser_slot.clone();
        spawn_local(async move {
            if let Err(e) = slot.connect_microphone().await {
                log::warn!("[producer] microphone unavailable: {:?}", e);
            }
        });
    });

    let frame_ctx = Rc::new(RefCell::new(frame::FrameContext {
        coordinator,
        running,
        window,
        last_instant: Instant::now(),
        frame_count: 0,
    }));
    frame::start_loop(frame_ctx);
    Ok(())
}

/// Feed the palette extracted from the current artwork. Out-of-range values are clamped.
#[wasm_bindgen]
pub fn set_artwork_palette(temperature: f32, harmony: f32) {
    ENGINE.with(|slot| {
        if let Some(engine) = slot.borrow().as_ref() {
            engine.palette.push(ColorProfile {
                color_temperature: temperature,
                harmony,
                accent: None,
            });
        }
    });
}

/// Like [`set_artwork_palette`] with an accent color (channels 0..1).
#[wasm_bindgen]
pub fn set_artwork_accent(temperature: f32, harmony: f32, r: f32, g: f32, b: f32) {
    ENGINE.with(|slot| {
        if let Some(engine) = slot.borrow().as_ref() {
            engine.palette.push(ColorProfile {
                color_temperature: temperature,
                harmony,
                accent: Some([r, g, b]),
            });
        }
    });
}

/// Debug dump of the engine counters.
#[wasm_bindgen]
pub fn engine_metrics() -> String {
    ENGINE.with(|slot| {
        slot.borrow()
            .as_ref()
            .map(|engine| format!("{:?}", engine.coordinator.borrow().metrics()))
            .unwrap_or_default()
    })
}

/// Stop the frame loop and release every participant and producer.
#[wasm_bindgen]
pub fn destroy_engine() {
    ENGINE.with(|slot| {
        if let Some(engine) = slot.borrow_mut().take() {
            engine.running.set(false);
            engine.coordinator.borrow_mut().destroy();
        }
    });
}
