use crate::probe;
use instant::Instant;
use prism_core::StateCoordinator;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

const MEMORY_SAMPLE_EVERY: u64 = 30;

pub struct FrameContext {
    pub coordinator: Rc<RefCell<StateCoordinator>>,
    pub running: Rc<Cell<bool>>,
    pub window: web::Window,
    pub last_instant: Instant,
    pub frame_count: u64,
}

impl FrameContext {
    pub fn frame(&mut self) {
        let now = Instant::now();
        let dt = now - self.last_instant;
        self.last_instant = now;
        self.frame_count += 1;

        let mut coordinator = self.coordinator.borrow_mut();
        if self.frame_count % MEMORY_SAMPLE_EVERY == 0 {
            if let Some((used, limit)) = probe::js_heap_mb(&self.window) {
                coordinator.telemetry_mut().record_memory(used, limit);
            }
        }
        coordinator.tick(dt.as_secs_f64() * 1000.0);
    }
}

pub fn start_loop(frame_ctx: Rc<RefCell<FrameContext>>) {
    let tick: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let tick_clone = tick.clone();
    let frame_ctx_tick = frame_ctx.clone();
    *tick.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        if !frame_ctx_tick.borrow().running.get() {
            log::info!("[frame] loop stopped");
            return;
        }
        frame_ctx_tick.borrow_mut().frame();
        request_frame(&tick_clone);
    }) as Box<dyn FnMut()>));
    request_frame(&tick);
}

fn request_frame(tick: &Rc<RefCell<Option<Closure<dyn FnMut()>>>>) {
    let Some(w) = web::window() else {
        return;
    };
    if let Some(cb) = tick.borrow().as_ref() {
        let _ = w.request_animation_frame(cb.as_ref().unchecked_ref());
    }
}
