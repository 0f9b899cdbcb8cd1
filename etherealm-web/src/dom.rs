use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Storage, Window};

/// Retrieve the global `window` object, if running in a browser.
#[must_use]
pub fn window() -> Option<Window> {
    web_sys::window()
}

/// Convert a JavaScript value into a readable string for error reporting.
#[must_use]
pub fn js_error_message(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|err| err.message().into())
        })
        .or_else(|| string_field(value, "message"))
        .unwrap_or_else(|| format!("{value:?}"))
}

/// Read a string property off a plain JS object.
#[must_use]
pub fn string_field(value: &JsValue, field: &str) -> Option<String> {
    if !value.is_object() {
        return None;
    }
    js_sys::Reflect::get(value, &JsValue::from_str(field))
        .ok()
        .and_then(|v| v.as_string())
}

/// Read a numeric property off a plain JS object.
#[must_use]
pub fn number_field(value: &JsValue, field: &str) -> Option<f64> {
    if !value.is_object() {
        return None;
    }
    js_sys::Reflect::get(value, &JsValue::from_str(field))
        .ok()
        .and_then(|v| v.as_f64())
}

/// Access the browser `localStorage` handle.
///
/// # Errors
/// Returns an error if there is no browser window or `localStorage` is unavailable
/// (private browsing modes, sandboxed iframes).
pub fn local_storage() -> Result<Storage, JsValue> {
    window()
        .ok_or_else(|| JsValue::from_str("window unavailable"))?
        .local_storage()?
        .ok_or_else(|| JsValue::from_str("localStorage unavailable"))
}
