//! Shared utility functions used across modules.

use std::ffi::CStr;
use std::time::Duration;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Truncate a string to `max_width` display columns, ending with "…" if
/// anything was cut.
pub fn truncate_str(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut width = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if width + w + 1 > max_width {
            break;
        }
        out.push(c);
        width += w;
    }
    out.push('…');
    out
}

fn scaled(value: f64, units: &[&str]) -> String {
    let mut value = value;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < units.len() {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 || value >= 10.0 {
        format!("{:.0}{}", value, units[unit])
    } else {
        format!("{:.1}{}", value, units[unit])
    }
}

/// `1536` kB → `1.5M`.
pub fn format_memory(kb: u64) -> String {
    scaled(kb as f64, &["k", "M", "G", "T", "P"])
}

/// Byte rate without the `/s`, e.g. `12KB`.
pub fn format_rate(bytes_per_second: f64) -> String {
    scaled(bytes_per_second.max(0.0), &["B", "KB", "MB", "GB", "TB"])
}

/// Compact CPU time: `42s`, `3m04s`, `2h03m`, `3d04h`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        return format!("{}s", secs);
    }
    let (minutes, secs) = (secs / 60, secs % 60);
    if minutes < 60 {
        return format!("{}m{:02}s", minutes, secs);
    }
    let (hours, minutes) = (minutes / 60, minutes % 60);
    if hours < 24 {
        return format!("{}h{:02}m", hours, minutes);
    }
    format!("{}d{:02}h", hours / 24, hours % 24)
}

/// Look up a user name in the password database.
pub fn username_for_uid(uid: u32) -> Option<String> {
    let mut buf = vec![0 as libc::c_char; 4096];
    let mut passwd: libc::passwd = unsafe { std::mem::zeroed() };
    let mut result: *mut libc::passwd = std::ptr::null_mut();

    let rc = unsafe {
        libc::getpwuid_r(
            uid as libc::uid_t,
            &mut passwd,
            buf.as_mut_ptr(),
            buf.len(),
            &mut result,
        )
    };
    if rc != 0 || result.is_null() || passwd.pw_name.is_null() {
        return None;
    }
    let name = unsafe { CStr::from_ptr(passwd.pw_name) };
    Some(name.to_string_lossy().into_owned())
}

/// Name of the user running ftop.
pub fn current_username() -> String {
    let uid = unsafe { libc::getuid() };
    username_for_uid(uid as u32)
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_else(|| uid.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── truncate_str ──────────────────────────────────────────────

    #[test]
    fn truncate_str_short_string_unchanged() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello", 5), "hello");
    }

    #[test]
    fn truncate_str_needs_truncation() {
        assert_eq!(truncate_str("hello world", 8), "hello w…");
        assert_eq!(truncate_str("abc", 1), "…");
        assert_eq!(truncate_str("abc", 0), "");
    }

    #[test]
    fn truncate_str_counts_display_width() {
        assert_eq!(truncate_str("日本語", 5), "日本…");
    }

    // ── formatting ────────────────────────────────────────────────

    #[test]
    fn format_memory_units() {
        assert_eq!(format_memory(0), "0k");
        assert_eq!(format_memory(512), "512k");
        assert_eq!(format_memory(1536), "1.5M");
        assert_eq!(format_memory(200 * 1024), "200M");
        assert_eq!(format_memory(3 * 1024 * 1024), "3.0G");
    }

    #[test]
    fn format_rate_units() {
        assert_eq!(format_rate(0.0), "0B");
        assert_eq!(format_rate(2048.0), "2.0KB");
        assert_eq!(format_rate(50.0 * 1024.0 * 1024.0), "50MB");
        assert_eq!(format_rate(-1.0), "0B");
    }

    #[test]
    fn format_duration_ranges() {
        assert_eq!(format_duration(Duration::from_millis(42_900)), "42s");
        assert_eq!(format_duration(Duration::from_secs(184)), "3m04s");
        assert_eq!(format_duration(Duration::from_secs(2 * 3600 + 180)), "2h03m");
        assert_eq!(format_duration(Duration::from_secs(76 * 3600)), "3d04h");
    }

    // ── users ─────────────────────────────────────────────────────

    #[test]
    fn current_username_is_known() {
        assert!(!current_username().is_empty());
    }
}
