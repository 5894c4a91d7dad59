use crate::lcd::hd44780::driver::{CursorDirection, DisplayGeometry, FontSize, HD44780Driver};
use crate::{GpioBusOutput, GpioDriver, GpioError, GpioOutput, GpioResult};
use embedded_hal::delay::DelayNs;
use log::{debug, trace, warn};
use std::fmt::Debug;

// Function set flags
const EIGHT_BIT_MODE: u8 = 0x10;
const FOUR_BIT_MODE: u8 = 0x00;
const ONE_LINE: u8 = 0x00;
const TWO_LINES: u8 = 0x08;
const DOTS_5X8: u8 = 0x00;
const DOTS_5X10: u8 = 0x04;

/// Function set flags every initialization starts from. Both rows are enabled, which also
/// works for single-row panels wired as two half rows.
const DEFAULT_FUNCTION: u8 = FOUR_BIT_MODE | TWO_LINES | DOTS_5X8;

// Display control flags
const DISPLAY_ON: u8 = 0x04;
const CURSOR_ON: u8 = 0x02;
const BLINK_ON: u8 = 0x01;

const POWER_ON_DELAY_MS: u32 = 50;
const SYNC_DELAY_MS: u32 = 5;
const SETUP_DELAY_MS: u32 = 100;
const SETTLE_DELAY_MS: u32 = 500;
const HOME_DELAY_MS: u32 = 2;
const WRITE_DELAY_MS: u32 = 1;
const RS_SETUP_DELAY_US: u32 = 10;
const ENABLE_PULSE_US: u32 = 1;
const COMMAND_DELAY_US: u32 = 100;

/// Line numbers the display is wired to on the GPIO transport.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct HD44780Pins {
    /// Register select.
    pub rs: usize,
    /// Enable.
    pub enable: usize,
    /// Read/write. Held low for the whole lifetime of the driver, since it never reads.
    /// Leave it out if the display's R/W pin is tied to GND.
    pub rw: Option<usize>,
    /// The four data lines of the 4-bit bus, LSb first (D4, D5, D6, D7 on the display).
    pub data: [usize; 4],
}

impl HD44780Pins {
    pub fn new(rs: usize, enable: usize, data: [usize; 4]) -> Self {
        HD44780Pins {
            rs,
            enable,
            rw: None,
            data,
        }
    }

    pub fn with_rw(mut self, rw: usize) -> Self {
        self.rw = Some(rw);
        self
    }
}

/// HD44780 driver talking to the controller over a 4-bit GPIO bus.
///
/// Every transfer ends with a fixed wait instead of polling the busy flag: 100 us after each
/// enable pulse, which covers the generic instructions, plus the longer waits the datasheet gives
/// for clearing the display, returning home and writing data.
///
/// The driver also tracks the display state the controller can't be asked about without reading
/// it back: the function set and display control flags, the row offsets of the configured
/// geometry, and the last position the cursor was moved to.
#[derive(Debug)]
pub struct GpioHD44780Driver<'a, D> {
    pin_rs: Box<dyn GpioOutput + 'a>,
    pin_e: Box<dyn GpioOutput + 'a>,
    // Only held to keep the line claimed.
    #[allow(dead_code)]
    pin_rw: Option<Box<dyn GpioOutput + 'a>>,
    data_bus: Box<dyn GpioBusOutput<4> + 'a>,
    delay: D,

    display_function: u8,
    display_control: u8,
    entry_direction: CursorDirection,
    autoscroll: bool,
    num_lines: u8,
    row_offsets: [u8; 4],
    cursor_x: u8,
    cursor_y: u8,
}

impl<'a, D: DelayNs + Debug> GpioHD44780Driver<'a, D> {
    /// Claims the lines in `pins` from `gpio` and initializes a 16x1 display with them.
    ///
    /// See [Self::with_geometry].
    pub fn new<G: GpioDriver>(gpio: &'a G, pins: HD44780Pins, delay: D) -> GpioResult<Self> {
        Self::with_geometry(gpio, pins, DisplayGeometry::default(), delay)
    }

    /// Claims the lines in `pins` from `gpio`, runs [Self::begin] with `geometry` and waits
    /// another 500 ms for the display to settle.
    ///
    /// The lines stay claimed until the driver is dropped.
    pub fn with_geometry<G: GpioDriver>(
        gpio: &'a G,
        pins: HD44780Pins,
        geometry: DisplayGeometry,
        delay: D,
    ) -> GpioResult<Self> {
        debug!("Claiming LCD lines {:?} on {:?}", pins, gpio);

        let pin_rs = gpio.get_output(pins.rs)?;
        let pin_e = gpio.get_output(pins.enable)?;
        let pin_rw = pins.rw.map(|rw| gpio.get_output(rw)).transpose()?;
        let data_bus = gpio.get_bus_output(pins.data)?;

        let mut driver = Self::new_4bit(pin_rs, pin_e, pin_rw, data_bus, delay)?;
        driver.begin(geometry)?;
        driver.delay.delay_ms(SETTLE_DELAY_MS);
        Ok(driver)
    }

    /// Creates a driver from already claimed outputs, driving R/W low if present.
    ///
    /// The display is not initialized; call [Self::begin] before anything else.
    pub fn new_4bit(
        pin_rs: Box<dyn GpioOutput + 'a>,
        pin_e: Box<dyn GpioOutput + 'a>,
        pin_rw: Option<Box<dyn GpioOutput + 'a>>,
        data_bus: Box<dyn GpioBusOutput<4> + 'a>,
        delay: D,
    ) -> GpioResult<Self> {
        if let Some(rw) = &pin_rw {
            rw.write(false)?;
        }

        Ok(GpioHD44780Driver {
            pin_rs,
            pin_e,
            pin_rw,
            data_bus,
            delay,
            display_function: DEFAULT_FUNCTION,
            display_control: 0,
            entry_direction: CursorDirection::Right,
            autoscroll: false,
            num_lines: 1,
            row_offsets: [0; 4],
            cursor_x: 0,
            cursor_y: 0,
        })
    }

    /// Initializes the display for the given geometry.
    ///
    /// The controller may be in 8-bit mode or halfway through a 4-bit transfer at this point, so
    /// the function set is repeated three times with the datasheet's waits before switching to
    /// 4-bit mode. Then the real function set (lines and font) is sent, the display is turned on
    /// with the cursor hidden, and cleared.
    ///
    /// Both rows are enabled unless a single-line display asks for the 5x10 font, which the
    /// controller only draws in one-line mode. Multi-line displays always get the 5x8 font.
    ///
    /// The function set flags and row offsets are rebuilt from `geometry` on every call, so
    /// calling it again replaces the previous geometry instead of merging with it.
    pub fn begin(&mut self, geometry: DisplayGeometry) -> GpioResult<()> {
        debug!(
            "Initializing {}x{} display, font {:?}",
            geometry.cols, geometry.lines, geometry.font
        );

        self.display_function = DEFAULT_FUNCTION;
        if geometry.lines <= 1 && geometry.font == FontSize::Dots5x10 {
            self.display_function = FOUR_BIT_MODE | ONE_LINE | DOTS_5X10;
        }
        self.num_lines = geometry.lines;
        self.row_offsets = [
            0x00,
            0x40,
            geometry.cols,
            0x40u8.wrapping_add(geometry.cols),
        ];

        self.delay.delay_ms(POWER_ON_DELAY_MS);

        // Synchronize
        self.command(0x03)?;
        self.delay.delay_ms(SYNC_DELAY_MS);
        self.command(0x03)?;
        self.delay.delay_ms(SYNC_DELAY_MS);
        self.command(0x03)?;
        self.command(0x02)?;

        let function = self.display_function;
        self.function_set(
            function & EIGHT_BIT_MODE != 0,
            function & TWO_LINES != 0,
            function & DOTS_5X10 != 0,
        )?;
        self.delay.delay_ms(SETUP_DELAY_MS);

        self.display(false, false)?;
        self.delay.delay_ms(SETUP_DELAY_MS);

        self.clear()?;
        self.delay.delay_ms(SETUP_DELAY_MS);

        debug!("Display initialized, function set {:08b}", self.display_function);
        Ok(())
    }

    /// Sends an instruction byte.
    pub fn command(&mut self, value: u8) -> GpioResult<()> {
        self.send(value, false)
    }

    /// Sends a data byte and gives the controller 1 ms to store it.
    pub fn write(&mut self, value: u8) -> GpioResult<()> {
        self.send(value, true)?;
        self.delay.delay_ms(WRITE_DELAY_MS);
        Ok(())
    }

    /// Clears the display and moves the cursor to (0, 0).
    pub fn clear(&mut self) -> GpioResult<()> {
        self.clear_display()?;
        self.delay.delay_ms(HOME_DELAY_MS);
        self.cursor_x = 0;
        self.cursor_y = 0;
        Ok(())
    }

    /// Moves the cursor to (0, 0) and undoes any display shift, keeping the contents.
    pub fn home(&mut self) -> GpioResult<()> {
        self.return_home()?;
        self.delay.delay_ms(HOME_DELAY_MS);
        self.cursor_x = 0;
        self.cursor_y = 0;
        Ok(())
    }

    /// Turns the display on, with the cursor and its blinking as requested.
    pub fn display(&mut self, cursor_on: bool, blink_on: bool) -> GpioResult<()> {
        self.display_control = DISPLAY_ON;
        if cursor_on {
            self.display_control |= CURSOR_ON;
        }
        if blink_on {
            self.display_control |= BLINK_ON;
        }
        self.apply_display_control()
    }

    /// Turns the display off. The contents and the cursor settings are kept for the next
    /// [Self::display].
    pub fn no_display(&mut self) -> GpioResult<()> {
        self.display_control &= !DISPLAY_ON;
        self.apply_display_control()
    }

    fn apply_display_control(&mut self) -> GpioResult<()> {
        let control = self.display_control;
        self.set_display_control(
            control & DISPLAY_ON != 0,
            control & CURSOR_ON != 0,
            control & BLINK_ON != 0,
        )
    }

    /// Writes `text` at the cursor, one byte per character.
    ///
    /// Characters are sent as their code point truncated to a byte, so only the first 256 code
    /// points map to the display's character set. There is no wrapping to the next row.
    pub fn print(&mut self, text: &str) -> GpioResult<()> {
        for c in text.chars() {
            let code = u32::from(c);
            if code > 0xFF {
                warn!("Character {:?} does not fit in a byte, sending {:#04x}", c, code as u8);
            }
            self.write(code as u8)?;
        }
        Ok(())
    }

    /// Moves the cursor to `col` on `row`.
    ///
    /// Rows are addressed 40 positions apart (`0x80 + col + row * 40`), not through
    /// [Self::row_offsets]. Both agree on rows 0 and 1; on 4-line displays rows 2 and 3 end up
    /// elsewhere than their row offsets. Out-of-range positions are not clamped and the address
    /// wraps around in 8 bits.
    pub fn set_cursor(&mut self, col: u8, row: u8) -> GpioResult<()> {
        let address = col.wrapping_add(row.wrapping_mul(40));
        self.command(0x80u8.wrapping_add(address))?;
        self.cursor_x = col;
        self.cursor_y = row;
        Ok(())
    }

    /// Moves the cursor relative to its last position set through this driver.
    pub fn scroll_cursor(&mut self, dx: i8, dy: i8) -> GpioResult<()> {
        self.set_cursor(
            self.cursor_x.wrapping_add_signed(dx),
            self.cursor_y.wrapping_add_signed(dy),
        )
    }

    /// Moves the cursor to `col` on `row` through the row's DDRAM offset, which also places rows
    /// 2 and 3 correctly on 4-line displays.
    ///
    /// Fails with [GpioError::InvalidArgument] if `row` is not below 4 or the address is past the
    /// end of DDRAM; nothing is sent in that case.
    pub fn move_to(&mut self, col: u8, row: u8) -> GpioResult<()> {
        let offset = *self
            .row_offsets
            .get(usize::from(row))
            .ok_or(GpioError::InvalidArgument)?;
        let address = offset.checked_add(col).ok_or(GpioError::InvalidArgument)?;
        self.set_ddram_address(address)?;
        self.cursor_x = col;
        self.cursor_y = row;
        Ok(())
    }

    /// Sets which way the cursor moves after each character, for left-to-right or right-to-left
    /// text. The controller starts out moving right.
    pub fn set_text_direction(&mut self, direction: CursorDirection) -> GpioResult<()> {
        self.entry_direction = direction;
        self.apply_entry_mode()
    }

    /// With autoscroll on, the display shifts on every write so the cursor stays in place and
    /// the text moves instead.
    pub fn set_autoscroll(&mut self, autoscroll: bool) -> GpioResult<()> {
        self.autoscroll = autoscroll;
        self.apply_entry_mode()
    }

    fn apply_entry_mode(&mut self) -> GpioResult<()> {
        self.set_entry_mode(self.entry_direction, self.autoscroll)
    }

    /// Shifts the whole display contents by one position.
    pub fn scroll_display(&mut self, direction: CursorDirection) -> GpioResult<()> {
        self.cursor_shift(true, direction)
    }

    /// Stores a 5x8 glyph in one of the 8 CGRAM slots. It can then be printed as the character
    /// with code `slot`.
    ///
    /// Only the low 3 bits of `slot` are used, so slot 9 is slot 1. Each row uses its low 5 bits,
    /// top row first.
    ///
    /// Leaves the controller addressing CGRAM; move the cursor or clear the display before
    /// printing again.
    pub fn create_char(&mut self, slot: u8, glyph: &[u8; 8]) -> GpioResult<()> {
        if slot > 0x07 {
            warn!("CGRAM slot {} out of range, wrapping to {}", slot, slot & 0x07);
        }
        let slot = slot & 0x07;

        self.set_cgram_address(slot << 3)?;
        for &row in glyph {
            self.write(row)?;
        }
        Ok(())
    }

    /// DDRAM base address of each row for the configured column count.
    pub fn row_offsets(&self) -> [u8; 4] {
        self.row_offsets
    }

    /// Last cursor position set through this driver, as (column, row).
    pub fn cursor(&self) -> (u8, u8) {
        (self.cursor_x, self.cursor_y)
    }

    pub fn num_lines(&self) -> u8 {
        self.num_lines
    }

    pub fn display_function(&self) -> u8 {
        self.display_function
    }

    pub fn display_control(&self) -> u8 {
        self.display_control
    }

    /// Cursor direction and autoscroll of the current entry mode.
    pub fn entry_mode(&self) -> (CursorDirection, bool) {
        (self.entry_direction, self.autoscroll)
    }

    fn send(&mut self, value: u8, rs: bool) -> GpioResult<()> {
        trace!("Sending data: {:08b}, RS: {}", value, rs);

        self.pin_rs.write(rs)?;
        self.delay.delay_us(RS_SETUP_DELAY_US);

        self.write4bits(value >> 4)?;
        self.write4bits(value & 0x0F)
    }

    fn write4bits(&mut self, nibble: u8) -> GpioResult<()> {
        trace!("Writing nibble: {:04b}", nibble);
        self.data_bus.write_nibble(nibble)?;
        self.pulse_enable()
    }

    fn pulse_enable(&mut self) -> GpioResult<()> {
        self.pin_e.write(false)?;
        self.delay.delay_us(ENABLE_PULSE_US);
        self.pin_e.write(true)?;
        self.delay.delay_us(ENABLE_PULSE_US);
        self.pin_e.write(false)?;
        self.delay.delay_us(COMMAND_DELAY_US);
        Ok(())
    }
}

impl<D: DelayNs + Debug> HD44780Driver for GpioHD44780Driver<'_, D> {
    fn send_command(&mut self, command: u8) -> GpioResult<()> {
        self.command(command)
    }

    fn send_data(&mut self, data: u8) -> GpioResult<()> {
        self.write(data)
    }
}
