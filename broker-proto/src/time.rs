use chrono::Utc;

/// Seconds since the Unix epoch, as a float. Shared by every crate that needs to stamp a
/// `Message` with a real time instead of a sentinel.
pub fn epoch_now() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}
