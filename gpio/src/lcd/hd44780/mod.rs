//! HD44780 character LCD module.
//!
//! See [driver::HD44780Driver] for the instruction set and [driver::GpioHD44780Driver] for the
//! 4-bit GPIO implementation.

pub mod driver;
