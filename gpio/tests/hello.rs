use crystal_gpio::lcd::hd44780::driver::{
    CursorDirection, DisplayGeometry, GpioHD44780Driver, HD44780Pins,
};
use crystal_gpio::mock::{MockGpioDriver, MockTransfer};

const RS: usize = 12;
const E: usize = 11;
const DATA: [usize; 4] = [5, 4, 3, 2];

fn cmd(value: u8) -> MockTransfer {
    MockTransfer { rs: false, value }
}

fn data(value: u8) -> MockTransfer {
    MockTransfer { rs: true, value }
}

#[test]
fn print_after_power_on() {
    let gpio = MockGpioDriver::new(14);
    let mut lcd =
        GpioHD44780Driver::new(&gpio, HD44780Pins::new(RS, E, DATA), gpio.delay()).unwrap();

    lcd.print("Hi").unwrap();

    assert_eq!(
        gpio.log().decode_4bit(RS, E, DATA),
        vec![
            cmd(0x03),
            cmd(0x03),
            cmd(0x03),
            cmd(0x02),
            cmd(0x28),
            cmd(0x0C),
            cmd(0x01),
            data(b'H'),
            data(b'i'),
        ]
    );
}

#[test]
fn custom_glyph_on_second_row() {
    const HEART: [u8; 8] = [0x00, 0x0A, 0x1F, 0x1F, 0x0E, 0x04, 0x00, 0x00];

    let gpio = MockGpioDriver::new(14);
    let mut lcd = GpioHD44780Driver::with_geometry(
        &gpio,
        HD44780Pins::new(RS, E, DATA),
        DisplayGeometry::new(16, 2),
        gpio.delay(),
    )
    .unwrap();
    gpio.log().clear();

    lcd.create_char(0, &HEART).unwrap();
    lcd.set_cursor(0, 1).unwrap();
    lcd.write(0).unwrap();

    let mut expected = vec![cmd(0x40)];
    expected.extend(HEART.map(data));
    expected.extend([cmd(0xA8), data(0x00)]);
    assert_eq!(gpio.log().decode_4bit(RS, E, DATA), expected);
    assert_eq!(lcd.cursor(), (0, 1));
}

#[test]
fn right_to_left_text_on_third_row() {
    let gpio = MockGpioDriver::new(14);
    let mut lcd = GpioHD44780Driver::with_geometry(
        &gpio,
        HD44780Pins::new(RS, E, DATA),
        DisplayGeometry::new(20, 4),
        gpio.delay(),
    )
    .unwrap();
    gpio.log().clear();

    lcd.set_text_direction(CursorDirection::Left).unwrap();
    lcd.move_to(19, 2).unwrap();
    lcd.print("ab").unwrap();

    assert_eq!(
        gpio.log().decode_4bit(RS, E, DATA),
        vec![cmd(0x04), cmd(0x80 | (20 + 19)), data(b'a'), data(b'b')]
    );
}
