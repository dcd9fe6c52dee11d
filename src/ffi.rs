//! C-compatible FFI API for cross-language bindings.
//!
//! # ABI Contract
//!
//! All exported functions use `extern "C"` calling convention and `#[no_mangle]`
//! to ensure stable symbol names.
//!
//! ## Inputs
//! Designs, records and column mappings are passed as UTF-8 JSON buffers
//! (pointer + length, not necessarily null-terminated), in the same shape
//! the `labelforge` CLI reads from disk.
//!
//! ## Memory management
//! - Buffers returned by `lf_*` functions are allocated on the Rust heap.
//! - Callers **must** free them with `lf_free_buffer` / `lf_free_string`.
//! - Passing a null pointer to a free function is a no-op.
//!
//! ## Error handling
//! - Functions that can fail return a `c_int` (0 = success, non-zero = error):
//!   `1` null argument, `2` invalid UTF-8, `3` invalid input (JSON, design,
//!   config), `4` generation failed.
//! - Error details can be retrieved via `lf_last_error`.
//!
//! ## Thread safety
//! - The `lf_last_error` uses a thread-local, so it is safe to call from
//!   multiple threads. Generation calls share no state and may run
//!   concurrently.
//!
//! ## Usage from Go (cgo)
//! ```go
//! // #cgo LDFLAGS: -llabel_forge
//! // #include "label_forge.h"
//! import "C"
//! ```

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::slice;
use std::time::Duration;

use crate::error::LabelError;
use crate::model::{BatchRecord, ColumnMapping, Design};
use crate::pipeline::{generate_batch, generate_label, GeneratedDocument, RenderConfig};
use crate::render::BarcodeFallback;
use crate::units::Dpi;

const ERR_NULL: c_int = 1;
const ERR_UTF8: c_int = 2;
const ERR_INPUT: c_int = 3;
const ERR_GENERATE: c_int = 4;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = RefCell::new(None);
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

// ---------------------------------------------------------------------------
// C-compatible configuration types
// ---------------------------------------------------------------------------

/// `LfRenderConfig::barcode_fallback`: draw the raw value as text when it
/// cannot be encoded (default).
pub const LF_BARCODE_FALLBACK_PLAIN_TEXT: u32 = 0;
/// `LfRenderConfig::barcode_fallback`: draw nothing.
pub const LF_BARCODE_FALLBACK_SKIP: u32 = 1;

/// Optional configuration passed to the `lf_generate_*` functions.
///
/// Fields set to `0` (or `NULL` for `title`) fall back to their defaults.
#[repr(C)]
pub struct LfRenderConfig {
    /// Null-terminated UTF-8 document title embedded in PDF metadata.
    /// Pass `NULL` to use the default title ("label-forge output").
    pub title: *const c_char,
    /// Output DPI, `203` or `300`. Pass `0` to use the design's reference DPI.
    pub dpi: u32,
    /// Maximum number of records in a batch. Pass `0` for no cap.
    pub max_records: u32,
    /// Per-image fetch timeout in milliseconds. Pass `0` for the default (5000).
    pub fetch_timeout_ms: u32,
    /// Largest accepted remote image body in bytes. Pass `0` for the default.
    pub max_image_bytes: u64,
    /// One of the `LF_BARCODE_FALLBACK_*` constants.
    pub barcode_fallback: u32,
}

/// Convert an `LfRenderConfig` (FFI) to a `RenderConfig` (Rust).
///
/// # Safety
/// `cfg.title`, if non-null, must point to a valid null-terminated UTF-8 string.
unsafe fn render_config_from_c(cfg: &LfRenderConfig) -> Result<RenderConfig, String> {
    let defaults = RenderConfig::default();

    let title = if cfg.title.is_null() {
        defaults.title.clone()
    } else {
        CStr::from_ptr(cfg.title)
            .to_str()
            .map_err(|e| format!("Invalid UTF-8 in title: {e}"))?
            .to_string()
    };

    let dpi = match cfg.dpi {
        0 => None,
        value => Some(Dpi::try_from(value)?),
    };
    let max_records = (cfg.max_records != 0).then_some(cfg.max_records as usize);
    let fetch_timeout = if cfg.fetch_timeout_ms == 0 {
        defaults.fetch_timeout
    } else {
        Duration::from_millis(cfg.fetch_timeout_ms as u64)
    };
    let max_image_bytes = match cfg.max_image_bytes {
        0 => defaults.max_image_bytes,
        n => n,
    };
    let barcode_fallback = match cfg.barcode_fallback {
        LF_BARCODE_FALLBACK_PLAIN_TEXT => BarcodeFallback::PlainText,
        LF_BARCODE_FALLBACK_SKIP => BarcodeFallback::Skip,
        other => return Err(format!("Unknown barcode_fallback {other}")),
    };

    Ok(RenderConfig {
        title,
        dpi,
        max_records,
        fetch_timeout,
        max_image_bytes,
        barcode_fallback,
        ..defaults
    })
}

unsafe fn config_arg(cfg: *const LfRenderConfig) -> Result<RenderConfig, c_int> {
    if cfg.is_null() {
        return Ok(RenderConfig::default());
    }
    render_config_from_c(&*cfg).map_err(|e| {
        set_last_error(&e);
        ERR_INPUT
    })
}

/// Borrow a UTF-8 input buffer.
unsafe fn str_arg<'a>(ptr: *const u8, len: u32) -> Result<&'a str, c_int> {
    let bytes = slice::from_raw_parts(ptr, len as usize);
    std::str::from_utf8(bytes).map_err(|e| {
        set_last_error(&format!("Invalid UTF-8: {e}"));
        ERR_UTF8
    })
}

fn input_error(e: LabelError) -> c_int {
    set_last_error(&e.to_string());
    ERR_INPUT
}

/// Hand PDF bytes to the caller.
unsafe fn export_buffer(bytes: Vec<u8>, out_buf: *mut *mut u8, out_len: *mut u32) {
    let len = bytes.len() as u32;
    let buf = bytes.into_boxed_slice();
    *out_buf = Box::into_raw(buf) as *mut u8;
    *out_len = len;
}

// ---------------------------------------------------------------------------
// Core API
// ---------------------------------------------------------------------------

/// Render a single label design to a one-page PDF.
///
/// # Parameters
/// - `design_ptr`, `design_len`: UTF-8 design JSON
/// - `cfg`: optional pointer to an [`LfRenderConfig`]; pass `NULL` for defaults
/// - `out_buf`: on success, receives a pointer to heap-allocated PDF bytes
/// - `out_len`: on success, receives the length of the PDF buffer
///
/// # Returns
/// `0` on success, non-zero on error. On error, call `lf_last_error`.
///
/// # Safety
/// - `design_ptr` must point to `design_len` valid bytes.
/// - `cfg`, if non-null, must point to a fully-initialised [`LfRenderConfig`].
/// - `out_buf` and `out_len` must be valid pointers.
/// - The caller must free `*out_buf` by calling `lf_free_buffer`.
#[no_mangle]
pub unsafe extern "C" fn lf_generate_label(
    design_ptr: *const u8,
    design_len: u32,
    cfg: *const LfRenderConfig,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
) -> c_int {
    if design_ptr.is_null() || out_buf.is_null() || out_len.is_null() {
        set_last_error("Null pointer argument");
        return ERR_NULL;
    }

    let design_json = match str_arg(design_ptr, design_len) {
        Ok(s) => s,
        Err(rc) => return rc,
    };
    let design = match Design::from_json(design_json) {
        Ok(d) => d,
        Err(e) => return input_error(e),
    };
    let config = match config_arg(cfg) {
        Ok(c) => c,
        Err(rc) => return rc,
    };

    match generate_label(&design, &config) {
        Ok(doc) => {
            export_buffer(doc.bytes, out_buf, out_len);
            0
        }
        Err(e) => {
            set_last_error(&e.to_string());
            ERR_GENERATE
        }
    }
}

/// Parse the batch inputs and run the batch.
unsafe fn run_batch(
    design_ptr: *const u8,
    design_len: u32,
    records_ptr: *const u8,
    records_len: u32,
    mapping_ptr: *const u8,
    mapping_len: u32,
    cfg: *const LfRenderConfig,
) -> Result<GeneratedDocument, c_int> {
    let design = Design::from_json(str_arg(design_ptr, design_len)?).map_err(input_error)?;
    let records = BatchRecord::list_from_json(str_arg(records_ptr, records_len)?).map_err(input_error)?;
    let mapping = if mapping_ptr.is_null() {
        ColumnMapping::new()
    } else {
        ColumnMapping::from_json(str_arg(mapping_ptr, mapping_len)?).map_err(input_error)?
    };
    let config = config_arg(cfg)?;

    generate_batch(&design, &records, &mapping, &config).map_err(|e| {
        set_last_error(&e.to_string());
        match e {
            LabelError::EmptyBatch | LabelError::BatchTooLarge { .. } => ERR_INPUT,
            _ => ERR_GENERATE,
        }
    })
}

/// Render one page per record into a single PDF.
///
/// # Parameters
/// - `design_ptr`, `design_len`: UTF-8 design JSON
/// - `records_ptr`, `records_len`: UTF-8 JSON array of record objects
/// - `mapping_ptr`, `mapping_len`: UTF-8 JSON object `{column: field}`;
///   pass `NULL` for no mapping
/// - `cfg`: optional pointer to an [`LfRenderConfig`]; pass `NULL` for defaults
/// - `out_buf`, `out_len`: PDF output
///
/// # Returns
/// `0` on success.
///
/// # Safety
/// Every non-null input pointer must point to the stated number of bytes.
/// The caller must free `*out_buf` with `lf_free_buffer`.
#[no_mangle]
pub unsafe extern "C" fn lf_generate_batch(
    design_ptr: *const u8,
    design_len: u32,
    records_ptr: *const u8,
    records_len: u32,
    mapping_ptr: *const u8,
    mapping_len: u32,
    cfg: *const LfRenderConfig,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
) -> c_int {
    if design_ptr.is_null() || records_ptr.is_null() || out_buf.is_null() || out_len.is_null() {
        set_last_error("Null pointer argument");
        return ERR_NULL;
    }

    match run_batch(design_ptr, design_len, records_ptr, records_len, mapping_ptr, mapping_len, cfg) {
        Ok(doc) => {
            export_buffer(doc.bytes, out_buf, out_len);
            0
        }
        Err(rc) => rc,
    }
}

/// Like `lf_generate_batch`, and also return the per-page diagnostic report
/// as JSON.
///
/// # Safety
/// Same as `lf_generate_batch`. Additionally, `*out_report` must be freed
/// with `lf_free_string`.
#[no_mangle]
pub unsafe extern "C" fn lf_generate_batch_with_report(
    design_ptr: *const u8,
    design_len: u32,
    records_ptr: *const u8,
    records_len: u32,
    mapping_ptr: *const u8,
    mapping_len: u32,
    cfg: *const LfRenderConfig,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
    out_report: *mut *mut c_char,
) -> c_int {
    if design_ptr.is_null()
        || records_ptr.is_null()
        || out_buf.is_null()
        || out_len.is_null()
        || out_report.is_null()
    {
        set_last_error("Null pointer argument");
        return ERR_NULL;
    }

    match run_batch(design_ptr, design_len, records_ptr, records_len, mapping_ptr, mapping_len, cfg) {
        Ok(doc) => {
            *out_report = match CString::new(doc.to_json()) {
                Ok(cs) => cs.into_raw(),
                Err(_) => ptr::null_mut(),
            };
            export_buffer(doc.bytes, out_buf, out_len);
            0
        }
        Err(rc) => rc,
    }
}

// ---------------------------------------------------------------------------
// Memory management
// ---------------------------------------------------------------------------

/// Free a PDF buffer returned by `lf_generate_*`.
///
/// # Safety
/// `buf` must have been returned by a previous `lf_generate_*` call, and
/// `len` must be the corresponding length.
#[no_mangle]
pub unsafe extern "C" fn lf_free_buffer(buf: *mut u8, len: u32) {
    if !buf.is_null() {
        let _ = Box::from_raw(slice::from_raw_parts_mut(buf, len as usize));
    }
}

/// Free a report string returned by `lf_generate_batch_with_report`.
///
/// # Safety
/// `s` must have been returned by Rust's `CString::into_raw`.
#[no_mangle]
pub unsafe extern "C" fn lf_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = CString::from_raw(s);
    }
}

/// Retrieve the last error message. Returns a null-terminated string.
///
/// The returned pointer is valid until the next `lf_*` call on the same
/// thread. The caller should **not** free this pointer – it is managed
/// internally.
///
/// Returns null if no error has occurred.
#[no_mangle]
pub extern "C" fn lf_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        let borrow = e.borrow();
        match borrow.as_ref() {
            Some(cs) => cs.as_ptr(),
            None => ptr::null(),
        }
    })
}

/// Return the library version as a null-terminated string.
/// The caller must **not** free this pointer.
#[no_mangle]
pub extern "C" fn lf_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const DESIGN: &str = r#"{
        "label": {"width_mm": 50.8, "height_mm": 25.4},
        "reference_dpi": 203,
        "elements": [
            {"id": "sku", "type": "text", "x": 8, "y": 8, "width": 380, "height": 40,
             "properties": {"content": "SKU {{sku}}"}},
            {"id": "code", "type": "barcode", "x": 8, "y": 60, "width": 380, "height": 120,
             "properties": {"symbology": "CODE128", "value": "ABC-123"}}
        ]
    }"#;

    const RECORDS: &str = r#"[{"sku": "A-1"}, {"sku": "A-2"}, {"sku": "A-3"}]"#;

    fn last_error() -> String {
        let p = lf_last_error();
        assert!(!p.is_null());
        unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned()
    }

    #[test]
    fn ffi_generate_label() {
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe {
            lf_generate_label(
                DESIGN.as_ptr(),
                DESIGN.len() as u32,
                ptr::null(),
                &mut out_buf,
                &mut out_len,
            )
        };

        assert_eq!(rc, 0, "Expected success");
        assert!(!out_buf.is_null());
        assert!(out_len > 100);

        // Verify PDF header
        let bytes = unsafe { slice::from_raw_parts(out_buf, out_len as usize) };
        assert_eq!(&bytes[0..5], b"%PDF-");

        unsafe { lf_free_buffer(out_buf, out_len) };
    }

    #[test]
    fn ffi_generate_batch_with_report() {
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;
        let mut report: *mut c_char = ptr::null_mut();

        let rc = unsafe {
            lf_generate_batch_with_report(
                DESIGN.as_ptr(),
                DESIGN.len() as u32,
                RECORDS.as_ptr(),
                RECORDS.len() as u32,
                ptr::null(),
                0,
                ptr::null(),
                &mut out_buf,
                &mut out_len,
                &mut report,
            )
        };

        assert_eq!(rc, 0);
        assert!(!report.is_null());
        let json = unsafe { CStr::from_ptr(report) }.to_str().unwrap();
        let value: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(value["page_count"], 3);

        unsafe {
            lf_free_string(report);
            lf_free_buffer(out_buf, out_len);
        }
    }

    #[test]
    fn ffi_batch_with_mapping_and_config() {
        let mapping = r#"{"Item": "sku"}"#;
        let records = r#"[{"Item": "X"}]"#;
        let title = CString::new("Labels").unwrap();
        let cfg = LfRenderConfig {
            title: title.as_ptr(),
            dpi: 300,
            max_records: 10,
            fetch_timeout_ms: 250,
            max_image_bytes: 1 << 20,
            barcode_fallback: LF_BARCODE_FALLBACK_SKIP,
        };
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe {
            lf_generate_batch(
                DESIGN.as_ptr(),
                DESIGN.len() as u32,
                records.as_ptr(),
                records.len() as u32,
                mapping.as_ptr(),
                mapping.len() as u32,
                &cfg,
                &mut out_buf,
                &mut out_len,
            )
        };

        assert_eq!(rc, 0, "Expected success");
        let bytes = unsafe { slice::from_raw_parts(out_buf, out_len as usize) };
        assert_eq!(&bytes[0..5], b"%PDF-");
        unsafe { lf_free_buffer(out_buf, out_len) };
    }

    #[test]
    fn ffi_batch_cap_is_an_input_error() {
        let cfg = LfRenderConfig {
            title: ptr::null(),
            dpi: 0,
            max_records: 2,
            fetch_timeout_ms: 0,
            max_image_bytes: 0,
            barcode_fallback: LF_BARCODE_FALLBACK_PLAIN_TEXT,
        };
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe {
            lf_generate_batch(
                DESIGN.as_ptr(),
                DESIGN.len() as u32,
                RECORDS.as_ptr(),
                RECORDS.len() as u32,
                ptr::null(),
                0,
                &cfg,
                &mut out_buf,
                &mut out_len,
            )
        };

        assert_eq!(rc, ERR_INPUT);
        assert!(out_buf.is_null());
        assert!(last_error().contains("exceeds"));
    }

    #[test]
    fn ffi_rejects_unsupported_dpi() {
        let cfg = LfRenderConfig {
            title: ptr::null(),
            dpi: 600,
            max_records: 0,
            fetch_timeout_ms: 0,
            max_image_bytes: 0,
            barcode_fallback: LF_BARCODE_FALLBACK_PLAIN_TEXT,
        };
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe {
            lf_generate_label(DESIGN.as_ptr(), DESIGN.len() as u32, &cfg, &mut out_buf, &mut out_len)
        };
        assert_eq!(rc, ERR_INPUT);
    }

    #[test]
    fn ffi_rejects_unknown_barcode_fallback() {
        let cfg = LfRenderConfig {
            title: ptr::null(),
            dpi: 0,
            max_records: 0,
            fetch_timeout_ms: 0,
            max_image_bytes: 0,
            barcode_fallback: 7,
        };
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe {
            lf_generate_label(DESIGN.as_ptr(), DESIGN.len() as u32, &cfg, &mut out_buf, &mut out_len)
        };
        assert_eq!(rc, ERR_INPUT);
        assert!(out_buf.is_null());
        assert!(last_error().contains("barcode_fallback"));
    }

    #[test]
    fn ffi_config_maps_every_field() {
        let cfg = LfRenderConfig {
            title: ptr::null(),
            dpi: 203,
            max_records: 5,
            fetch_timeout_ms: 40,
            max_image_bytes: 4096,
            barcode_fallback: LF_BARCODE_FALLBACK_SKIP,
        };
        let config = unsafe { render_config_from_c(&cfg) }.unwrap();
        assert_eq!(config.dpi, Some(Dpi::Dpi203));
        assert_eq!(config.max_records, Some(5));
        assert_eq!(config.fetch_timeout, Duration::from_millis(40));
        assert_eq!(config.max_image_bytes, 4096);
        assert_eq!(config.barcode_fallback, BarcodeFallback::Skip);

        let zeroed = LfRenderConfig {
            max_image_bytes: 0,
            barcode_fallback: LF_BARCODE_FALLBACK_PLAIN_TEXT,
            ..cfg
        };
        let config = unsafe { render_config_from_c(&zeroed) }.unwrap();
        assert_eq!(config.max_image_bytes, RenderConfig::default().max_image_bytes);
        assert_eq!(config.barcode_fallback, BarcodeFallback::PlainText);
    }

    #[test]
    fn ffi_invalid_design() {
        let bad = br#"{"label": {"width_mm": 10, "height_mm": 10}, "elements": [{"type": "sticker"}]}"#;
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe {
            lf_generate_label(bad.as_ptr(), bad.len() as u32, ptr::null(), &mut out_buf, &mut out_len)
        };
        assert_eq!(rc, ERR_INPUT);
        assert!(last_error().starts_with("Invalid design"));
    }

    #[test]
    fn ffi_null_input() {
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe {
            lf_generate_label(ptr::null(), 0, ptr::null(), &mut out_buf, &mut out_len)
        };

        assert_eq!(rc, ERR_NULL, "Should fail on null input");
    }

    #[test]
    fn ffi_invalid_utf8() {
        let bytes = [0xffu8, 0xfe, 0xfd];
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe {
            lf_generate_label(bytes.as_ptr(), bytes.len() as u32, ptr::null(), &mut out_buf, &mut out_len)
        };
        assert_eq!(rc, ERR_UTF8);
    }

    #[test]
    fn ffi_version() {
        let v = lf_version();
        let version = unsafe { CStr::from_ptr(v) }.to_str().unwrap();
        assert_eq!(version, env!("CARGO_PKG_VERSION"));
    }
}
