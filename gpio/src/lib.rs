pub mod delay;
pub mod gpiod;
pub mod lcd;
pub mod mock;

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("pin already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
    #[error("error: {0}")]
    Other(String),
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

/// A transport exposing digital output lines, addressed by their line number.
///
/// Lines handed out by the driver stay claimed until the returned output is dropped. Claiming
/// a line twice fails with [GpioError::AlreadyInUse].
pub trait GpioDriver: Debug {
    /// Gets the amount of GPIO lines available.
    fn count(&self) -> GpioResult<usize>;

    /// Claims the line at the given index as an output.
    fn get_output(&self, index: usize) -> GpioResult<Box<dyn GpioOutput + '_>>;

    /// Claims the lines at the specific indices as a single output bus.
    ///
    /// Line `i` of the bus is `indices[i]`.
    fn get_bus_output<const N: usize>(
        &self,
        indices: [usize; N],
    ) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>>;
}

pub trait GpioOutput: Debug {
    /// Writes the state of the GPIO line.
    fn write(&self, value: bool) -> GpioResult<()>;
}

pub trait GpioBusOutput<const N: usize>: Debug {
    fn write(&self, values: &[bool; N]) -> GpioResult<()>;
}

impl dyn GpioBusOutput<4> + '_ {
    /// Writes the values to the GPIO lines in the bus.
    /// The values are written as a nibble, LSb first.
    pub fn write_nibble(&self, value: u8) -> GpioResult<()> {
        if value > 0b1111 {
            return Err(GpioError::InvalidArgument);
        }

        let mut values = [false; 4];
        for (i, bit) in values.iter_mut().enumerate() {
            *bit = (value & (1 << i)) != 0;
        }
        self.write(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockEvent, MockGpioDriver};

    #[test]
    fn write_nibble_puts_lsb_on_first_line() {
        let gpio = MockGpioDriver::new(32);
        let bus = gpio.get_bus_output([10, 11, 12, 13]).unwrap();

        bus.write_nibble(0b0110).unwrap();

        assert_eq!(
            gpio.log().events(),
            vec![
                MockEvent::Write { line: 10, value: false },
                MockEvent::Write { line: 11, value: true },
                MockEvent::Write { line: 12, value: true },
                MockEvent::Write { line: 13, value: false },
            ]
        );
    }

    #[test]
    fn write_nibble_rejects_values_wider_than_four_bits() {
        let gpio = MockGpioDriver::new(8);
        let bus = gpio.get_bus_output([0, 1, 2, 3]).unwrap();

        assert_eq!(bus.write_nibble(0x10), Err(GpioError::InvalidArgument));
        assert!(gpio.log().events().is_empty());
    }

    #[test]
    fn io_errors_keep_their_kind() {
        let err: GpioError = std::io::Error::from(std::io::ErrorKind::PermissionDenied).into();
        assert_eq!(err, GpioError::Io(std::io::ErrorKind::PermissionDenied));
    }
}
