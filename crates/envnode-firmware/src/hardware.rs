//! Peripheral setup for the envnode board.
//!
//! - I2C0: SDA GPIO1, SCL GPIO2, 50 kHz (AHT20 at 0x38, BMP180 at 0x77)
//! - Relay: GPIO47, active high, off at reset
//! - Configuration: flash region at [`CONFIG_FLASH_OFFSET`]

use envnode_core::TickSource;
use esp_hal::Blocking;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::i2c::master::{Config as I2cConfig, ConfigError, I2c};
use esp_hal::time::Rate;

/// Start of the default `nvs` partition.
pub const CONFIG_FLASH_OFFSET: u32 = 0x9000;

const I2C_FREQUENCY_KHZ: u32 = 50;

/// Create the blocking I2C master shared by both sensors.
pub fn create_i2c_bus(
    i2c0: esp_hal::peripherals::I2C0<'static>,
    sda: esp_hal::peripherals::GPIO1<'static>,
    scl: esp_hal::peripherals::GPIO2<'static>,
) -> Result<I2c<'static, Blocking>, ConfigError> {
    Ok(I2c::new(
        i2c0,
        I2cConfig::default().with_frequency(Rate::from_khz(I2C_FREQUENCY_KHZ)),
    )?
    .with_sda(sda)
    .with_scl(scl))
}

/// Relay driver pin, starting de-energized.
pub fn relay_output(pin: esp_hal::peripherals::GPIO47<'static>) -> Output<'static> {
    Output::new(pin, Level::Low, OutputConfig::default())
}

/// Milliseconds since boot from the embassy time driver.
pub struct EmbassyClock;

impl TickSource for EmbassyClock {
    fn now_ms(&self) -> u32 {
        embassy_time::Instant::now().as_millis() as u32
    }
}
