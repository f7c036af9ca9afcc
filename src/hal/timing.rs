//! Time source and sleeps.

/// Monotonic microsecond clock with blocking delays.
///
/// The control loop only reads `now_us`; the blocking helpers
/// (`run_until_idle`, `play_blocking`) also sleep through it.
pub trait Clock {
    fn now_us(&self) -> u64;
    fn delay_us(&mut self, us: u32);

    fn delay_ms(&mut self, ms: u32) {
        self.delay_us(ms.saturating_mul(1000));
    }
}
