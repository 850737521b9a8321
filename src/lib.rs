//! scorelayout — notation layout and coordinate mapping for a
//! simplified piano-teaching score editor.
//!
//! Turns a flat, absolute-beat collection of notes into the spatial
//! addressing a staff renderer needs: which row a note falls on, its x
//! position, and the row-relative coordinates of the legacy renderer.
//!
//! # Example
//! ```
//! use scorelayout::{compute_layout, Event, LayoutInputs, LegacyAdapter, TimeSignatureChanges};
//!
//! let layout = compute_layout(&LayoutInputs::default());
//! let changes = TimeSignatureChanges::new();
//! let adapter = LegacyAdapter::new(&layout, &changes);
//! let legacy = adapter.to_legacy_note(&Event::new("n1", "C4", 1.0, 17.0));
//! assert_eq!((legacy.system, legacy.beat), (1, 1.0));
//! ```

pub mod error;
pub mod layout;
pub mod legacy;
pub mod model;
pub mod mxl;
pub mod parser;
pub mod playback;
pub mod projection;

use std::path::Path;

pub use error::{Error, Result};
pub use layout::*;
pub use legacy::{calculate_legacy_system_count, LegacyAdapter, LegacyEvent, LegacyRepeatMarker};
pub use model::*;
pub use mxl::parse_mxl;
pub use parser::{parse_musicxml, ImportedScore};
pub use playback::{beats_at, composition_duration_ms, playhead_at, Playhead};
pub use projection::{project, project_json, Projection, ProjectionRequest};

/// Import a MusicXML file from a file path.
/// Automatically detects format based on file extension:
/// - `.musicxml` or `.xml` → uncompressed MusicXML
/// - `.mxl` → compressed MXL (ZIP archive)
pub fn parse_file<P: AsRef<Path>>(path: P, slug: &str) -> Result<ImportedScore> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    parse_bytes(&data, path.extension().and_then(|e| e.to_str()), slug)
}

/// Import MusicXML from raw bytes with an optional format hint.
/// If `extension` is None, tries to auto-detect the format.
pub fn parse_bytes(data: &[u8], extension: Option<&str>, slug: &str) -> Result<ImportedScore> {
    match extension {
        Some("mxl") => parse_mxl(data, slug),
        Some("musicxml") | Some("xml") => parse_musicxml(std::str::from_utf8(data)?, slug),
        _ => {
            // Auto-detect: try as XML first, then as MXL
            if let Ok(xml) = std::str::from_utf8(data) {
                if xml.trim_start().starts_with('<') {
                    return parse_musicxml(xml, slug);
                }
            }
            parse_mxl(data, slug)
        }
    }
}

/// Serialize a layout snapshot for the renderer.
pub fn layout_to_json(layout: &LayoutConfig) -> Result<String> {
    Ok(serde_json::to_string(layout)?)
}

// ═══════════════════════════════════════════════════════════════════════
// C FFI — for the web and mobile shells
// ═══════════════════════════════════════════════════════════════════════

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

/// Project a JSON `ProjectionRequest` and return the JSON `Projection`.
/// The caller must free the returned string with `scorelayout_free_string`.
/// Returns null on invalid input.
///
/// # Safety
/// `request` must be a valid null-terminated UTF-8 C string.
#[no_mangle]
pub unsafe extern "C" fn scorelayout_project_json(request: *const c_char) -> *mut c_char {
    if request.is_null() {
        return std::ptr::null_mut();
    }
    let c_str = unsafe { CStr::from_ptr(request) };
    let json = match c_str.to_str() {
        Ok(s) => s,
        Err(_) => return std::ptr::null_mut(),
    };

    match project_json(json) {
        Ok(out) => CString::new(out).unwrap_or_default().into_raw(),
        Err(e) => {
            log::warn!("projection request rejected: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Free a string previously returned by scorelayout functions.
///
/// # Safety
/// `ptr` must be a string previously returned by a scorelayout function, or null.
#[no_mangle]
pub unsafe extern "C" fn scorelayout_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            let _ = CString::from_raw(ptr);
        }
    }
}
