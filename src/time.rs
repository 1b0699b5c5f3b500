//! A small seam over the system clock so that core operations never read
//! time directly.

/// The current UTC Unix timestamp in seconds.
#[cfg(not(target_arch = "wasm32"))]
pub fn now() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}

/// The current UTC Unix timestamp in seconds.
#[cfg(target_arch = "wasm32")]
pub fn now() -> u64 {
    (instant::now() / 1000.0) as u64
}
