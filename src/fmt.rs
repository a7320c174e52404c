//! Human-readable sizes and durations for the run report.

const UNITS: [&str; 8] = ["", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "Zi"];

/// Binary-prefixed size with one decimal, e.g. `6.0MiB`.
pub fn human_size(bytes: u64) -> String {
    let mut num = bytes as f64;
    for unit in UNITS {
        if num.abs() < 1024.0 {
            return format!("{num:.1}{unit}B");
        }
        num /= 1024.0;
    }
    format!("{num:.1}YiB")
}

/// `H:MM:SS`
pub fn human_duration(secs: u64) -> String {
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
