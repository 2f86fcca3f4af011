use prism_core::constants::QUALITY_CHANGED_EVENT;
use prism_core::{
    EffectEvent, Participant, ParticipantError, PropertySink, PropertyValue, QualityLevel,
    TargetHandle, VisualEffectState,
};
use std::collections::HashMap;
use wasm_bindgen::JsCast;
use web_sys as web;

#[inline]
pub fn window_document() -> Option<web::Document> {
    web::window().and_then(|w| w.document())
}

#[inline]
pub fn add_click_listener(document: &web::Document, mut handler: impl FnMut() + 'static) {
    let closure =
        wasm_bindgen::closure::Closure::wrap(Box::new(move || handler()) as Box<dyn FnMut()>);
    let _ = document.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
    closure.forget();
}

/// Writes style custom properties onto registered elements.
///
/// Handle 0 is always the document root, so projected variables cascade to
/// the whole page unless a host registers narrower targets.
pub struct DomStyleSink {
    targets: HashMap<TargetHandle, web::HtmlElement>,
    next: u32,
}

impl DomStyleSink {
    pub fn new(document: &web::Document) -> anyhow::Result<Self> {
        let root = document
            .document_element()
            .ok_or_else(|| anyhow::anyhow!("no document element"))?
            .dyn_into::<web::HtmlElement>()
            .map_err(|e| anyhow::anyhow!(format!("{:?}", e)))?;
        let mut targets = HashMap::new();
        targets.insert(TargetHandle(0), root);
        Ok(Self { targets, next: 1 })
    }

    /// Register the element with `id` and return its handle.
    pub fn register(&mut self, document: &web::Document, id: &str) -> Option<TargetHandle> {
        let el = document
            .get_element_by_id(id)?
            .dyn_into::<web::HtmlElement>()
            .ok()?;
        let handle = TargetHandle(self.next);
        self.next += 1;
        self.targets.insert(handle, el);
        Some(handle)
    }
}

impl PropertySink for DomStyleSink {
    fn write(&mut self, target: TargetHandle, property: &str, value: &PropertyValue) {
        let Some(el) = self.targets.get(&target) else {
            log::debug!("[dom] no element for {:?}", target);
            return;
        };
        if let Err(e) = el.style().set_property(property, &value.to_string()) {
            log::warn!("[dom] set_property {} failed: {:?}", property, e);
        }
    }

    fn write_group(&mut self, target: TargetHandle, writes: &[(&str, &PropertyValue)]) {
        let Some(el) = self.targets.get(&target) else {
            return;
        };
        // one style lookup for the whole group
        let style = el.style();
        for (property, value) in writes {
            if let Err(e) = style.set_property(property, &value.to_string()) {
                log::warn!("[dom] set_property {} failed: {:?}", property, e);
            }
        }
    }
}

/// Mirrors the quality level as a `prism-quality-*` class on the root element,
/// so stylesheets can drop expensive rules on weak devices.
pub struct QualityClassParticipant {
    root: web::Element,
    current: Option<&'static str>,
}

impl QualityClassParticipant {
    pub fn new(document: &web::Document) -> Option<Self> {
        Some(Self {
            root: document.document_element()?,
            current: None,
        })
    }
}

impl Participant for QualityClassParticipant {
    fn name(&self) -> &str {
        "quality-class"
    }

    fn on_state_update(&mut self, state: &VisualEffectState) -> Result<(), ParticipantError> {
        let class = match state.performance.quality_level {
            QualityLevel::Minimal => "prism-quality-minimal",
            QualityLevel::Low => "prism-quality-low",
            QualityLevel::Medium => "prism-quality-medium",
            QualityLevel::High => "prism-quality-high",
            QualityLevel::Ultra => "prism-quality-ultra",
        };
        if self.current == Some(class) {
            return Ok(());
        }
        let classes = self.root.class_list();
        if let Some(old) = self.current {
            let _ = classes.remove_1(old);
        }
        classes
            .add_1(class)
            .map_err(|e| ParticipantError::Failed(format!("{:?}", e)))?;
        self.current = Some(class);
        Ok(())
    }

    fn on_effect_event(&mut self, event: &EffectEvent) -> Result<(), ParticipantError> {
        if event.event_type == QUALITY_CHANGED_EVENT {
            log::info!("[dom] quality changed: {:?}", event.payload);
        }
        Ok(())
    }
}
