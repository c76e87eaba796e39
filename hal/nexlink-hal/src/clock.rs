//! Millisecond time source
//!
//! Deadlines are absolute `u32` millisecond stamps that wrap roughly every
//! 49.7 days. Comparisons go through [`deadline_reached`] so a deadline
//! set just before the wrap still expires correctly after it.

/// Monotonic millisecond clock
pub trait Clock {
    /// Current time in milliseconds since an arbitrary epoch (wrapping)
    fn now_ms(&self) -> u32;

    /// Give the host a chance to run while a caller busy-waits
    ///
    /// Called between iterations of a blocking wait. The default does
    /// nothing; on a target this is where a WFE or watchdog feed goes.
    fn relax(&self) {}
}

/// Whether `deadline` has been reached at time `now`
///
/// Uses wrapping distance, valid while deadlines are less than
/// `i32::MAX` milliseconds in the future.
pub fn deadline_reached(now: u32, deadline: u32) -> bool {
    (now.wrapping_sub(deadline) as i32) >= 0
}

/// [`Clock`] backed by the embassy time driver
#[cfg(feature = "embassy")]
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

#[cfg(feature = "embassy")]
impl Clock for EmbassyClock {
    fn now_ms(&self) -> u32 {
        embassy_time::Instant::now().as_millis() as u32
    }
}
