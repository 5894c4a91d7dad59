mod config;
mod utils;

use crate::config::Config;
use crate::utils::parse_pin_bus;
use crystal_gpio::GpioDriver;
use crystal_gpio::delay::ThreadDelay;
use crystal_gpio::gpiod::GpiodDriver;
use crystal_gpio::lcd::hd44780::driver::{CursorDirection, GpioHD44780Driver, HD44780Pins};
use crystal_gpio::mock::MockGpioDriver;
use dotenv::dotenv;
use embedded_hal::delay::DelayNs;
use log::{debug, info};
use std::env::{var, var_os};
use std::fmt::Debug;
use sysinfo::System;

/// Lines available to the mock backend in dry runs.
const DRY_RUN_LINES: usize = 64;

fn main() -> eyre::Result<()> {
    // Initialize environment and logger
    dotenv().ok();
    pretty_env_logger::init();

    const UNKNOWN_STR: &str = "???";

    info!("crystal starting...");
    info!(
        "Running on {} ({}), kernel {}, {}",
        System::host_name().as_deref().unwrap_or(UNKNOWN_STR),
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::cpu_arch(),
    );

    // Get pin numbers from env
    let lcd_rs_pin_no: usize = var("CRYSTAL_LCD_PIN_RS")?.parse()?;
    let lcd_e_pin_no: usize = var("CRYSTAL_LCD_PIN_E")?.parse()?;
    let lcd_rw_pin_no: Option<usize> = var("CRYSTAL_LCD_PIN_RW")
        .ok()
        .map(|s| s.parse())
        .transpose()?;
    let lcd_data_pin_nos: [usize; 4] = parse_pin_bus(&var("CRYSTAL_LCD_PINS_DATA")?)?;

    info!(
        "LCD @ RS: {}, E: {}, RW: {:?}, Data: {:?}",
        lcd_rs_pin_no, lcd_e_pin_no, lcd_rw_pin_no, lcd_data_pin_nos
    );

    let mut pins = HD44780Pins::new(lcd_rs_pin_no, lcd_e_pin_no, lcd_data_pin_nos);
    if let Some(rw) = lcd_rw_pin_no {
        pins = pins.with_rw(rw);
    }

    debug!("Trying to load config...");
    let config = match Config::try_load()? {
        Some(config) => {
            info!("Config loaded.");
            config
        }
        None => {
            info!("Config not found. Using default");
            let config = Config::default();
            config.save()?;
            info!("Default config saved to {}.", Config::path().display());
            config
        }
    };
    debug!("{:?}", config);

    if var_os("CRYSTAL_DRY_RUN").is_some() {
        info!("Dry run, recording instead of driving the display.");
        let gpio = MockGpioDriver::new(DRY_RUN_LINES);
        show(&gpio, pins, &config, gpio.delay())?;

        let log = gpio.log();
        for transfer in log.decode_4bit(pins.rs, pins.enable, pins.data) {
            debug!(
                "{} {:#04x}",
                if transfer.rs { "data" } else { "cmd " },
                transfer.value
            );
        }
        info!(
            "Recorded {} events, {:?} spent waiting.",
            log.len(),
            log.total_delay()
        );
    } else {
        let chip = var("CRYSTAL_GPIO_CHIP").unwrap_or_else(|_| "/dev/gpiochip0".to_string());
        debug!("Opening {}...", chip);
        let gpio = GpiodDriver::open(&chip)?;
        debug!("{:?} initialized.", gpio);
        show(&gpio, pins, &config, ThreadDelay)?;
    }

    info!("Done.");
    Ok(())
}

/// Initializes the display, uploads the glyphs and prints the message.
fn show<G: GpioDriver, D: DelayNs + Debug>(
    gpio: &G,
    pins: HD44780Pins,
    config: &Config,
    delay: D,
) -> eyre::Result<()> {
    debug!("Initializing LCD driver...");
    let mut lcd = GpioHD44780Driver::with_geometry(gpio, pins, config.geometry(), delay)?;
    debug!("{:?} initialized.", lcd);

    for (slot, glyph) in config.glyphs.iter().take(8).enumerate() {
        lcd.create_char(slot as u8, glyph)?;
    }
    // Back to DDRAM after the glyph upload
    lcd.clear()?;

    let first_col = if config.right_to_left {
        lcd.set_text_direction(CursorDirection::Left)?;
        config.cols.saturating_sub(1)
    } else {
        0
    };

    for (row, line) in config
        .message
        .iter()
        .take(lcd.num_lines().into())
        .enumerate()
    {
        lcd.move_to(first_col, row as u8)?;
        lcd.print(line)?;
    }

    lcd.display(config.cursor, config.blink)?;
    Ok(())
}
