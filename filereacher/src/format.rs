const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

/// Human readable size with two decimals and a non-breaking space before the
/// unit.
pub fn format_size(size: u64) -> String {
    let mut value = size as f64;
    let mut unit = 0;
    while value > 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2}\u{a0}{}", UNITS[unit])
}
