//! In-memory GPIO backend that records every line write and delay instead of touching hardware.
//!
//! Writes and delays share a single ordered [MockLog], so the exact interleaving of line changes
//! and waits can be inspected afterwards. Used by the tests and by dry runs of the demo.
use crate::{GpioBusOutput, GpioDriver, GpioError, GpioOutput, GpioResult};
use bitvec::vec::BitVec;
use embedded_hal::delay::DelayNs;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;
use std::sync::atomic::AtomicU8;
use std::time::Duration;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MockEvent {
    /// A line was driven to the given level.
    Write { line: usize, value: bool },
    /// The caller blocked for the given duration.
    Delay(Duration),
}

/// A byte reconstructed from the nibbles latched on a 4-bit bus.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MockTransfer {
    /// Level of the register select line when the high nibble was latched.
    pub rs: bool,
    pub value: u8,
}

/// Shared, ordered record of [MockEvent]s.
#[derive(Clone, Debug, Default)]
pub struct MockLog(Rc<RefCell<Vec<MockEvent>>>);

impl MockLog {
    fn push(&self, event: MockEvent) {
        self.0.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.0.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    /// Sum of all recorded delays.
    pub fn total_delay(&self) -> Duration {
        self.0
            .borrow()
            .iter()
            .filter_map(|event| match event {
                MockEvent::Delay(duration) => Some(*duration),
                MockEvent::Write { .. } => None,
            })
            .sum()
    }

    /// Replays the log as a 4-bit bus and returns every byte it latched.
    ///
    /// A nibble is latched from the `data` lines (LSb first) on each high-to-low edge of the
    /// `enable` line. Nibbles pair up into bytes high nibble first; a trailing unpaired nibble is
    /// dropped. Lines that were never written read as low.
    pub fn decode_4bit(&self, rs: usize, enable: usize, data: [usize; 4]) -> Vec<MockTransfer> {
        let mut levels: HashMap<usize, bool> = HashMap::new();
        let mut transfers = Vec::new();
        let mut pending: Option<(bool, u8)> = None;

        for event in self.0.borrow().iter() {
            let MockEvent::Write { line, value } = *event else {
                continue;
            };

            let was_high = levels.get(&line).copied().unwrap_or(false);
            levels.insert(line, value);

            if line != enable || !was_high || value {
                continue;
            }

            let mut nibble = 0u8;
            for (i, data_line) in data.iter().enumerate() {
                if levels.get(data_line).copied().unwrap_or(false) {
                    nibble |= 1 << i;
                }
            }

            pending = match pending.take() {
                None => Some((levels.get(&rs).copied().unwrap_or(false), nibble)),
                Some((rs_level, high)) => {
                    transfers.push(MockTransfer {
                        rs: rs_level,
                        value: (high << 4) | nibble,
                    });
                    None
                }
            };
        }

        transfers
    }
}

/// GPIO driver backed by nothing but a [MockLog].
pub struct MockGpioDriver {
    lines: usize,
    used_pins: BitVec<AtomicU8>,
    log: MockLog,
}

impl MockGpioDriver {
    pub fn new(lines: usize) -> Self {
        Self {
            lines,
            used_pins: BitVec::repeat(false, lines),
            log: MockLog::default(),
        }
    }

    /// Gets a handle to the log every output of this driver writes to.
    pub fn log(&self) -> MockLog {
        self.log.clone()
    }

    /// Creates a delay provider recording into the same log as this driver's outputs.
    pub fn delay(&self) -> MockDelay {
        MockDelay {
            log: self.log.clone(),
        }
    }
}

impl Debug for MockGpioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockGpioDriver({})", self.lines)
    }
}

impl GpioDriver for MockGpioDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(self.lines)
    }

    fn get_output(&self, index: usize) -> GpioResult<Box<dyn GpioOutput + '_>> {
        if index >= self.lines {
            return Err(GpioError::InvalidArgument);
        }

        if self.used_pins[index] {
            return Err(GpioError::AlreadyInUse);
        }

        self.used_pins.set_aliased(index, true);

        Ok(Box::new(MockOutput {
            driver: self,
            line: index,
        }))
    }

    fn get_bus_output<const N: usize>(
        &self,
        indices: [usize; N],
    ) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>> {
        if indices.iter().any(|&index| index >= self.lines) {
            return Err(GpioError::InvalidArgument);
        }

        if indices.iter().any(|&index| self.used_pins[index]) {
            return Err(GpioError::AlreadyInUse);
        }

        for index in indices {
            self.used_pins.set_aliased(index, true);
        }

        Ok(Box::new(MockBusOutput {
            driver: self,
            lines: indices,
        }))
    }
}

struct MockOutput<'a> {
    driver: &'a MockGpioDriver,
    line: usize,
}

impl Debug for MockOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}][output]", self.driver, self.line)
    }
}

impl GpioOutput for MockOutput<'_> {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.driver.log.push(MockEvent::Write {
            line: self.line,
            value,
        });
        Ok(())
    }
}

impl Drop for MockOutput<'_> {
    fn drop(&mut self) {
        self.driver.used_pins.set_aliased(self.line, false);
    }
}

struct MockBusOutput<'a, const N: usize> {
    driver: &'a MockGpioDriver,
    lines: [usize; N],
}

impl<const N: usize> Debug for MockBusOutput<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}{:?}[output]", self.driver, self.lines)
    }
}

impl<const N: usize> GpioBusOutput<N> for MockBusOutput<'_, N> {
    fn write(&self, values: &[bool; N]) -> GpioResult<()> {
        for (&line, &value) in self.lines.iter().zip(values) {
            self.driver.log.push(MockEvent::Write { line, value });
        }
        Ok(())
    }
}

impl<const N: usize> Drop for MockBusOutput<'_, N> {
    fn drop(&mut self) {
        for &index in &self.lines {
            self.driver.used_pins.set_aliased(index, false);
        }
    }
}

/// Delay provider that records the requested duration instead of sleeping.
#[derive(Clone, Debug)]
pub struct MockDelay {
    log: MockLog,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.log.push(MockEvent::Delay(Duration::from_nanos(ns.into())));
    }

    fn delay_us(&mut self, us: u32) {
        self.log.push(MockEvent::Delay(Duration::from_micros(us.into())));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.log.push(MockEvent::Delay(Duration::from_millis(ms.into())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_claimed_until_dropped() {
        let gpio = MockGpioDriver::new(4);

        let output = gpio.get_output(2).unwrap();
        assert_eq!(gpio.get_output(2).unwrap_err(), GpioError::AlreadyInUse);
        assert_eq!(
            gpio.get_bus_output([0, 1, 2]).unwrap_err(),
            GpioError::AlreadyInUse
        );

        drop(output);
        assert!(gpio.get_output(2).is_ok());
    }

    #[test]
    fn out_of_range_lines_are_rejected() {
        let gpio = MockGpioDriver::new(4);

        assert_eq!(gpio.get_output(4).unwrap_err(), GpioError::InvalidArgument);
        assert_eq!(
            gpio.get_bus_output([0, 9]).unwrap_err(),
            GpioError::InvalidArgument
        );
        // A failed bus claim must not leave its valid lines claimed.
        assert!(gpio.get_output(0).is_ok());
    }

    #[test]
    fn writes_and_delays_share_one_ordered_log() {
        let gpio = MockGpioDriver::new(4);
        let mut delay = gpio.delay();
        let output = gpio.get_output(1).unwrap();

        output.write(true).unwrap();
        delay.delay_us(10);
        output.write(false).unwrap();
        delay.delay_ms(2);

        assert_eq!(
            gpio.log().events(),
            vec![
                MockEvent::Write { line: 1, value: true },
                MockEvent::Delay(Duration::from_micros(10)),
                MockEvent::Write { line: 1, value: false },
                MockEvent::Delay(Duration::from_millis(2)),
            ]
        );
        assert_eq!(gpio.log().total_delay(), Duration::from_micros(2010));
    }

    #[test]
    fn decode_4bit_latches_on_falling_enable_edges() {
        const RS: usize = 0;
        const E: usize = 1;
        const DATA: [usize; 4] = [2, 3, 4, 5];

        let gpio = MockGpioDriver::new(6);
        let rs = gpio.get_output(RS).unwrap();
        let e = gpio.get_output(E).unwrap();
        let bus = gpio.get_bus_output(DATA).unwrap();

        rs.write(true).unwrap();
        for nibble in [0x4, 0x8] {
            bus.write_nibble(nibble).unwrap();
            e.write(false).unwrap();
            e.write(true).unwrap();
            e.write(false).unwrap();
        }
        // A lone nibble is not a byte yet.
        bus.write_nibble(0x1).unwrap();
        e.write(true).unwrap();
        e.write(false).unwrap();

        assert_eq!(
            gpio.log().decode_4bit(RS, E, DATA),
            vec![MockTransfer { rs: true, value: 0x48 }]
        );
    }
}
