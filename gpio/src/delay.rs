use embedded_hal::delay::DelayNs;
use std::thread::sleep;
use std::time::Duration;

/// Blocking delay provider that puts the current thread to sleep.
///
/// Relies on the OS scheduler for resolution; on Linux this is good for the microsecond waits
/// the LCD protocol needs, though a sleep may overshoot by a scheduling quantum.
#[derive(Copy, Clone, Debug, Default)]
pub struct ThreadDelay;

impl DelayNs for ThreadDelay {
    fn delay_ns(&mut self, ns: u32) {
        sleep(Duration::from_nanos(ns.into()));
    }

    fn delay_us(&mut self, us: u32) {
        sleep(Duration::from_micros(us.into()));
    }

    fn delay_ms(&mut self, ms: u32) {
        sleep(Duration::from_millis(ms.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn sleeps_at_least_the_requested_time() {
        let mut delay = ThreadDelay;
        let start = Instant::now();
        delay.delay_ms(5);
        delay.delay_us(100);
        assert!(start.elapsed() >= Duration::from_micros(5100));
    }
}
