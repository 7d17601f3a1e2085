//! UTF-16 helpers for Windows API strings

use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;

/// Convert a Windows wide string (UTF-16) to a Rust string, stopping at NUL
pub fn wide_to_string(wide: &[u16]) -> String {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    OsString::from_wide(&wide[..len])
        .to_string_lossy()
        .into_owned()
}

/// Extract the file name from a full Windows path
pub fn extract_filename(path: &str) -> String {
    path.rsplit(['\\', '/']).next().unwrap_or(path).to_string()
}
