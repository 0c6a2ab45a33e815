// ── Human-readable sizes ──
//
// Base-1024 units. Bytes print as integers, larger units with two
// decimals.

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
const STEP: f64 = 1024.0;

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
pub fn format_bytes(bytes: u64) -> String {
    scale(bytes as f64)
}

/// Like [`format_bytes`] with a `/s` suffix. Negative and non-finite
/// rates print as zero.
pub fn format_rate(bytes_per_sec: f64) -> String {
    format!("{}/s", scale(bytes_per_sec))
}

fn scale(value: f64) -> String {
    if !value.is_finite() || value <= 0.0 {
        return "0 B".to_owned();
    }

    let mut scaled = value;
    let mut unit = 0;
    while scaled >= STEP && unit < UNITS.len() - 1 {
        scaled /= STEP;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", scaled.floor())
    } else {
        format!("{scaled:.2} {}", UNITS[unit])
    }
}
