//! Browser surface for the configurator.
//!
//! Values cross the boundary as plain JS objects through
//! `serde-wasm-bindgen`; errors become JS strings.

use wasm_bindgen::prelude::*;

use crate::config::{EngineOptions, ProductConfig};
use crate::configurator::{Configurator, ObserverId, PartsChanged, PartsObserver};
use crate::error::CustomizeError;
use crate::parts::Part;

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn from_js<T: serde::de::DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn rejected(err: CustomizeError) -> JsValue {
    JsValue::from_str(&String::from(err))
}

fn event_to_js(event: Option<PartsChanged>) -> Result<JsValue, JsValue> {
    match event {
        Some(event) => to_js(&event),
        None => Ok(JsValue::NULL),
    }
}

struct JsObserver {
    callback: js_sys::Function,
}

impl PartsObserver for JsObserver {
    fn name(&self) -> &str {
        "JsObserver"
    }

    fn on_parts_changed(&mut self, event: &PartsChanged) {
        let payload = match to_js(event) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!("Failed to serialize change event: {:?}", err);
                return;
            }
        };
        if let Err(err) = self.callback.call1(&JsValue::NULL, &payload) {
            tracing::warn!("Change observer threw: {:?}", err);
        }
    }
}

#[wasm_bindgen]
pub struct WasmConfigurator {
    inner: Configurator,
}

#[wasm_bindgen]
impl WasmConfigurator {
    /// `options` may be `undefined` for the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<WasmConfigurator, JsValue> {
        let options: EngineOptions = if options.is_undefined() || options.is_null() {
            EngineOptions::default()
        } else {
            from_js(options)?
        };
        Ok(Self {
            inner: Configurator::new(options),
        })
    }

    #[wasm_bindgen(js_name = loadConfig)]
    pub fn load_config(&mut self, config: JsValue) -> Result<JsValue, JsValue> {
        let config: ProductConfig = from_js(config)?;
        let event = self.inner.load_config(config).map_err(rejected)?;
        to_js(&event)
    }

    /// Returns the committed event, or `null` when nothing changed.
    #[wasm_bindgen(js_name = setPart)]
    pub fn set_part(
        &mut self,
        part: &str,
        material: Option<String>,
        color: Option<String>,
        force: Option<bool>,
    ) -> Result<JsValue, JsValue> {
        let change = Part {
            name: part.to_string(),
            material,
            color,
        };
        let event = self
            .inner
            .set_part_with(change, force.unwrap_or(false))
            .map_err(rejected)?;
        event_to_js(event)
    }

    #[wasm_bindgen(js_name = removePart)]
    pub fn remove_part(&mut self, part: &str) -> Result<JsValue, JsValue> {
        let event = self.inner.remove_part(part).map_err(rejected)?;
        event_to_js(event)
    }

    /// Takes an array of `{name, material, color}` objects.
    #[wasm_bindgen(js_name = setParts)]
    pub fn set_parts(&mut self, parts: JsValue) -> Result<JsValue, JsValue> {
        let parts: Vec<Part> = from_js(parts)?;
        let event = self.inner.set_parts(parts).map_err(rejected)?;
        event_to_js(event)
    }

    pub fn parts(&self) -> Result<JsValue, JsValue> {
        to_js(self.inner.parts())
    }

    #[wasm_bindgen(js_name = normalizedParts)]
    pub fn normalized_parts(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.normalized_parts())
    }

    pub fn undo(&mut self) -> Result<JsValue, JsValue> {
        event_to_js(self.inner.undo())
    }

    pub fn redo(&mut self) -> Result<JsValue, JsValue> {
        event_to_js(self.inner.redo())
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.inner.can_undo()
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.inner.can_redo()
    }

    /// Registers `callback` for change events and returns a handle for
    /// `unsubscribe`.
    pub fn subscribe(&mut self, callback: js_sys::Function) -> u64 {
        self.inner.subscribe(JsObserver { callback }).raw()
    }

    pub fn unsubscribe(&mut self, handle: u64) -> bool {
        self.inner.unsubscribe(ObserverId::from_raw(handle))
    }

    #[wasm_bindgen(js_name = observerCount)]
    pub fn observer_count(&self) -> usize {
        self.inner.observer_count()
    }
}
