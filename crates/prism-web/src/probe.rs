use prism_core::CapabilityProbe;
use wasm_bindgen::JsValue;
use web_sys as web;

/// Reads what the browser is willing to expose. Every lookup goes through
/// `Reflect` so a missing API reads as "unknown" instead of throwing.
pub struct BrowserProbe {
    window: web::Window,
    benchmark_ms: Option<f32>,
}

impl BrowserProbe {
    pub fn new(window: web::Window) -> Self {
        Self {
            window,
            benchmark_ms: None,
        }
    }

    pub fn with_benchmark(mut self, ms: f32) -> Self {
        self.benchmark_ms = Some(ms);
        self
    }

    fn navigator_prop(&self, key: &str) -> Option<JsValue> {
        let navigator = self.window.navigator();
        js_sys::Reflect::get(&navigator, &JsValue::from_str(key))
            .ok()
            .filter(|v| !v.is_undefined() && !v.is_null())
    }
}

impl CapabilityProbe for BrowserProbe {
    fn device_memory_gb(&self) -> Option<f32> {
        self.navigator_prop("deviceMemory")?.as_f64().map(|gb| gb as f32)
    }

    fn logical_cores(&self) -> Option<u32> {
        let cores = self.window.navigator().hardware_concurrency();
        (cores.is_finite() && cores >= 1.0).then_some(cores as u32)
    }

    fn gpu_acceleration(&self) -> Option<bool> {
        Some(self.navigator_prop("gpu").is_some())
    }

    fn prefers_reduced_motion(&self) -> Option<bool> {
        let query = self
            .window
            .match_media("(prefers-reduced-motion: reduce)")
            .ok()
            .flatten()?;
        Some(query.matches())
    }

    fn benchmark_ms(&self) -> Option<f32> {
        self.benchmark_ms
    }
}

/// `performance.memory` in MB as `(used, limit)`; Chromium only.
pub fn js_heap_mb(window: &web::Window) -> Option<(f32, f32)> {
    let performance = window.performance()?;
    let memory = js_sys::Reflect::get(&performance, &JsValue::from_str("memory")).ok()?;
    if memory.is_undefined() {
        return None;
    }
    let read = |key: &str| {
        js_sys::Reflect::get(&memory, &JsValue::from_str(key))
            .ok()
            .and_then(|v| v.as_f64())
    };
    let used = read("usedJSHeapSize")?;
    let limit = read("jsHeapSizeLimit")?;
    const MB: f64 = 1024.0 * 1024.0;
    Some(((used / MB) as f32, (limit / MB) as f32))
}
