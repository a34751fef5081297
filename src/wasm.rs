//! WASM bindings for the web client.

use wasm_bindgen::prelude::*;

use crate::catalog::{Catalog, SourceKind};
use crate::export::{validate_export_request, ExportRequest};
use crate::field_map::resolve_field_map;
use crate::local_parser::parse_local_export;
use crate::strength::classify_password;

/// Initialize panic hook for better error messages.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize output: {}", e)))
}

/// Classify a password; returns `"weak"`, `"medium"` or `"strong"`.
#[wasm_bindgen(js_name = classifyPassword)]
pub fn classify_password_js(password: &str) -> String {
    classify_password(password).as_str().to_string()
}

/// Resolve a header row against a source's alias table.
///
/// Takes the source id and an array of header strings; returns an object
/// mapping each canonical field to a header or null.
#[wasm_bindgen(js_name = resolveFieldMap)]
pub fn resolve_field_map_js(source_id: &str, headers: JsValue) -> Result<JsValue, JsValue> {
    let headers: Vec<String> = serde_wasm_bindgen::from_value(headers)
        .map_err(|e| JsValue::from_str(&format!("Failed to parse headers: {}", e)))?;

    to_js(&resolve_field_map(SourceKind::from_id(source_id), &headers))
}

/// Resolve a field map using JSON strings (alternative API).
#[wasm_bindgen(js_name = resolveFieldMapJson)]
pub fn resolve_field_map_json_js(input_json: &str) -> Result<String, JsValue> {
    crate::field_map::resolve_field_map_json(input_json).map_err(|e| JsValue::from_str(&e))
}

/// Parse an export file in the browser.
///
/// Takes the raw file bytes and the selected source id; returns a
/// `LocalParseOutput`.
#[wasm_bindgen(js_name = parseLocalExport)]
pub fn parse_local_export_js(content: &[u8], source_id: &str) -> Result<JsValue, JsValue> {
    let output = parse_local_export(content, source_id)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    to_js(&output)
}

/// Parse an export file using JSON strings (alternative API).
#[wasm_bindgen(js_name = parseLocalExportJson)]
pub fn parse_local_export_json_js(input_json: &str) -> Result<String, JsValue> {
    crate::local_parser::parse_local_export_json(input_json).map_err(|e| JsValue::from_str(&e))
}

/// Apply the export validation gate.
///
/// Takes a JsValue (ExportRequest) and returns the coerced request.
#[wasm_bindgen(js_name = validateExportRequest)]
pub fn validate_export_request_js(request: JsValue) -> Result<JsValue, JsValue> {
    let request: ExportRequest = serde_wasm_bindgen::from_value(request)
        .map_err(|e| JsValue::from_str(&format!("Failed to parse input: {}", e)))?;

    let validated = validate_export_request(request).map_err(|e| JsValue::from_str(&e.to_string()))?;
    to_js(&validated)
}

/// Default import sources, export formats and merge strategies.
#[wasm_bindgen(js_name = getDefaultCatalog)]
pub fn get_default_catalog() -> Result<JsValue, JsValue> {
    to_js(&Catalog::default())
}
