//! C FFI exports for native hosts.
//!
//! All functions take and return null-terminated UTF-8 strings. Structured
//! inputs and outputs are JSON; failures return `{"success":false,"error":..}`.

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use crate::export::{validate_export_request, ExportRequest};
use crate::field_map::resolve_field_map_json;
use crate::local_parser::parse_local_export_json;
use crate::merge_strategy::MergeStrategy;
use crate::strength::classify_password;

/// Read a C string argument. `None` for null or non-UTF-8 input.
unsafe fn read_input<'a>(input: *const c_char) -> Option<&'a str> {
    if input.is_null() {
        return None;
    }
    CStr::from_ptr(input).to_str().ok()
}

/// Classify a password as `weak`, `medium` or `strong`.
///
/// # Safety
///
/// - `password` must be a valid null-terminated C string
/// - The returned pointer must be freed by calling `free_string`
///
/// # Returns
///
/// The strength label as a plain C string. Returns null on invalid input.
#[no_mangle]
pub unsafe extern "C" fn classify_password_ffi(password: *const c_char) -> *mut c_char {
    match read_input(password) {
        Some(password) => string_to_c_char(classify_password(password).as_str().to_string()),
        None => ptr::null_mut(),
    }
}

/// Resolve a header row against a source's alias table.
///
/// # Safety
///
/// - `input_json` must be a valid null-terminated C string containing
///   `{"sourceId": "...", "headers": [...]}`
/// - The returned pointer must be freed by calling `free_string`
///
/// # Returns
///
/// A JSON object mapping each canonical field to a header or null.
/// Returns null on invalid input.
#[no_mangle]
pub unsafe extern "C" fn resolve_field_map_ffi(input_json: *const c_char) -> *mut c_char {
    let Some(input) = read_input(input_json) else {
        return ptr::null_mut();
    };

    match resolve_field_map_json(input) {
        Ok(json) => string_to_c_char(json),
        Err(e) => create_error_response(&format!("Failed to resolve field map: {}", e)),
    }
}

/// Parse an export file locally.
///
/// # Safety
///
/// - `input_json` must be a valid null-terminated C string containing
///   `{"content": "...", "sourceId": "..."}`
/// - The returned pointer must be freed by calling `free_string`
///
/// # Returns
///
/// A JSON `LocalParseOutput`. Returns null on invalid input.
#[no_mangle]
pub unsafe extern "C" fn parse_local_export_ffi(input_json: *const c_char) -> *mut c_char {
    let Some(input) = read_input(input_json) else {
        return ptr::null_mut();
    };

    match parse_local_export_json(input) {
        Ok(json) => string_to_c_char(json),
        Err(e) => create_error_response(&format!("Parse failed: {}", e)),
    }
}

/// Apply the export validation gate to a JSON `ExportRequest`.
///
/// # Safety
///
/// - `input_json` must be a valid null-terminated C string
/// - The returned pointer must be freed by calling `free_string`
///
/// # Returns
///
/// The coerced request as JSON, or an error response. Returns null on
/// invalid input.
#[no_mangle]
pub unsafe extern "C" fn validate_export_request_ffi(input_json: *const c_char) -> *mut c_char {
    let Some(input) = read_input(input_json) else {
        return ptr::null_mut();
    };

    let request: ExportRequest = match serde_json::from_str(input) {
        Ok(r) => r,
        Err(e) => return create_error_response(&format!("Failed to parse input: {}", e)),
    };

    match validate_export_request(request).map(|r| serde_json::to_string(&r)) {
        Ok(Ok(json)) => string_to_c_char(json),
        Ok(Err(e)) => create_error_response(&format!("Failed to serialize output: {}", e)),
        Err(e) => create_error_response(&e.to_string()),
    }
}

/// Get the merge strategy ids as a JSON array.
///
/// # Safety
///
/// - The returned pointer must be freed by calling `free_string`
#[no_mangle]
pub extern "C" fn get_merge_strategies_ffi() -> *mut c_char {
    let ids: Vec<&str> = MergeStrategy::ALL.iter().map(|s| s.as_str()).collect();
    match serde_json::to_string(&ids) {
        Ok(json) => string_to_c_char(json),
        Err(_) => ptr::null_mut(),
    }
}

/// Free a string that was allocated by Rust.
///
/// # Safety
///
/// - `s` must be a pointer that was returned by one of the FFI functions
/// - This function must only be called once per pointer
/// - After calling this function, the pointer is invalid
#[no_mangle]
pub unsafe extern "C" fn free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

fn string_to_c_char(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(c_string) => c_string.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn create_error_response(message: &str) -> *mut c_char {
    let error_json = serde_json::json!({ "success": false, "error": message });
    string_to_c_char(error_json.to_string())
}
