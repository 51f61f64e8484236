/// Current wall-clock time in milliseconds since the Unix epoch.
#[cfg(target_arch = "wasm32")]
pub fn now_millis() -> u64 {
    js_sys::Date::now() as u64
}

/// Current wall-clock time in milliseconds since the Unix epoch.
#[cfg(not(target_arch = "wasm32"))]
pub fn now_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

/// Format a millisecond timestamp as `HH:MM:SS.mmm` (UTC).
pub fn format_millis(timestamp: u64) -> String {
    let millis = timestamp % 1000;
    let total_secs = timestamp / 1000;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = (total_secs / 3600) % 24;
    format!("{hours:02}:{mins:02}:{secs:02}.{millis:03}")
}

/// Human readable age, used in staleness log lines.
pub fn format_age(age_ms: u64) -> String {
    if age_ms < 1000 {
        format!("{age_ms}ms")
    } else if age_ms < 60_000 {
        format!("{:.1}s", age_ms as f64 / 1000.0)
    } else {
        format!("{}m{:02}s", age_ms / 60_000, (age_ms % 60_000) / 1000)
    }
}
