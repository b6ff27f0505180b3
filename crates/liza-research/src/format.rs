/// Compact volume label: `950`, `1.2K`, `3.4M`. One decimal place, with
/// ties rounded away from zero (`1_250` is `1.3K`).
#[must_use]
pub fn format_volume(volume: u64) -> String {
    if volume >= 1_000_000 {
        format!("{:.1}M", tenths(volume, 1_000_000))
    } else if volume >= 1_000 {
        format!("{:.1}K", tenths(volume, 1_000))
    } else {
        volume.to_string()
    }
}

/// `volume / unit` rounded half-up to one decimal place.
#[allow(clippy::cast_precision_loss)]
fn tenths(volume: u64, unit: u64) -> f64 {
    let scaled = volume as f64 / (unit / 10) as f64;
    scaled.round() / 10.0
}
