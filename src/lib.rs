#![cfg_attr(not(test), no_std)]

//! # BMP280 Pressure and Temperature Sensor Driver
//!
//! A type-safe, `no_std` driver for the Bosch BMP280.
//! The driver is generic over its bus: [`I2cInterface`] and [`SpiInterface`]
//! adapt any `embedded-hal` 1.0 I2C bus or SPI device, and anything else can
//! be plugged in through the [`Interface`] trait.
//! The typestate pattern guarantees that calibration data has been loaded
//! before a measurement can be taken.
//!
//! ## Units
//! - **Temperature**: degrees Celsius (`f64`)
//! - **Pressure**: hectopascal (`f64`), 1013.25 = standard sea level pressure
//!
//! ## Usage
//! ```rust,no_run
//! use bmp280_driver::{Bmp280, Config, PowerMode, PRIMARY_ADDRESS};
//! # fn demo<I2C, D>(i2c: I2C, delay: &mut D) -> bmp280_driver::error::Result<(), I2C::Error>
//! # where I2C: embedded_hal::i2c::I2c, D: embedded_hal::delay::DelayNs {
//!
//! let mut bmp280 = Bmp280::new_i2c(i2c, PRIMARY_ADDRESS).init(delay)?;
//!
//! let measurement = bmp280.read_measurement(delay)?;
//! let _celsius = measurement.temperature_celsius;
//!
//! // Switch to continuous conversions.
//! let config = Config::default().with_power_mode(PowerMode::Normal);
//! bmp280.set_configuration(config, delay)?;
//! # Ok(())
//! # }
//! ```

mod calc;
pub mod interface;
mod settings;

use core::marker::PhantomData;
use embedded_hal::{delay::DelayNs, i2c::I2c, spi::SpiDevice};
use log::debug;

pub use interface::{I2cInterface, Interface, PRIMARY_ADDRESS, SECONDARY_ADDRESS, SpiInterface};
pub use settings::{Config, IirFilter, Oversampling, PowerMode, Preset, StandbyTime};

/// Register map.
pub mod regs {
    pub const ADDR_CALIB: u8 = 0x88;
    pub const ADDR_CHIP_ID: u8 = 0xD0;
    pub const ADDR_RESET: u8 = 0xE0;
    pub const ADDR_STATUS: u8 = 0xF3;
    pub const ADDR_CTRL_MEAS: u8 = 0xF4;
    pub const ADDR_CONFIG: u8 = 0xF5;
    /// First byte of the result block (`press_msb`).
    pub const ADDR_PRESS_MSB: u8 = 0xF7;

    /// Writing this to `ADDR_RESET` runs the full power-on reset.
    pub const RESET_COMMAND: u8 = 0xB6;
    pub const CHIP_ID: u8 = 0x58;

    /// Set while a conversion is running.
    pub const STATUS_MEASURING: u8 = 1 << 3;
    /// Set while NVM data is copied to the image registers.
    pub const STATUS_IM_UPDATE: u8 = 1 << 0;
}

/// Memory address and size of the calibration block.
mod calib_mem {
    pub const ADDR: u8 = crate::regs::ADDR_CALIB;
    pub const SIZE: usize = 24;
}

/// Memory address and size of the measurement result block.
mod raw_data_mem {
    pub const ADDR: u8 = crate::regs::ADDR_PRESS_MSB;
    pub const SIZE: usize = 6;
}

/// Settle delays in milliseconds.
mod timing {
    /// Start-up time after a soft reset.
    pub const RESET_MS: u32 = 2;
    /// Latency after writing `ctrl_meas`.
    pub const CTRL_MEAS_MS: u32 = 5;
    /// Latency after writing `config`; covers one conversion at 1x oversampling.
    pub const CONFIG_MS: u32 = 40;
}

// --- Typestates ---

/// Driver has been created but calibration data has not been read yet.
#[derive(Debug)]
pub struct Uninitialized;
/// Calibration data is loaded and the configuration has been written.
#[derive(Debug)]
pub struct Ready;

/// Error types for the BMP280 driver.
pub mod error {
    use core::fmt;

    /// Errors reported by the driver.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum Bmp280Error<E> {
        /// The transport failed. The bus error is passed through unmodified.
        Bus(E),
        /// The chip id register did not contain 0x58.
        UnexpectedChipId(u8),
    }

    impl<E: fmt::Debug> fmt::Display for Bmp280Error<E> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Bmp280Error::Bus(e) => write!(f, "bus error: {e:?}"),
                Bmp280Error::UnexpectedChipId(id) => {
                    write!(f, "unexpected chip id {id:#04x}, expected 0x58")
                }
            }
        }
    }

    impl<E: fmt::Debug> core::error::Error for Bmp280Error<E> {}

    /// Result type alias for BMP280 operations.
    pub type Result<T, E> = core::result::Result<T, Bmp280Error<E>>;
}

/// Factory-trimmed calibration coefficients read from the sensor.
/// These are unique to every individual chip and required for compensation formulas.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibData {
    pub dig_t1: u16,
    pub dig_t2: i16,
    pub dig_t3: i16,
    pub dig_p1: u16,
    pub dig_p2: i16,
    pub dig_p3: i16,
    pub dig_p4: i16,
    pub dig_p5: i16,
    pub dig_p6: i16,
    pub dig_p7: i16,
    pub dig_p8: i16,
    pub dig_p9: i16,
}

/// Uncompensated 20-bit ADC readings from the result block.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawData {
    pub temp_adc: u32,
    pub press_adc: u32,
}

/// Output of the temperature stage.
///
/// `temp_fine` carries the temperature into the pressure formula.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalcTempData {
    pub temp_fine: f64,
    pub temp_comp: f64,
}

/// Compensated measurement result.
///
/// The raw ADC inputs are kept for diagnostics. A skipped channel reads as
/// `0x80000` and its compensated value is meaningless.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement {
    pub temperature_celsius: f64,
    /// Pressure in hPa. Exactly `0.0` if the calibration table is degenerate.
    pub pressure_hpa: f64,
    pub raw_temperature_adc: u32,
    pub raw_pressure_adc: u32,
}

/// The main BMP280 driver structure.
///
/// Use `Bmp280::new(...)` to start. The `STATE` generic uses the Typestate pattern
/// to track initialization status at compile time.
#[derive(Debug)]
pub struct Bmp280<I, STATE> {
    interface: I,
    config: Config,
    calib_data: CalibData,
    _state: PhantomData<STATE>,
}

impl<I> Bmp280<I, Uninitialized>
where
    I: Interface,
{
    /// Creates a driver that will apply [`Config::default`] during [`init`](Self::init).
    ///
    /// This does not communicate with the sensor yet.
    pub fn new(interface: I) -> Self {
        Self::with_config(interface, Config::default())
    }

    /// Creates a driver that will apply `config` during [`init`](Self::init).
    pub fn with_config(interface: I, config: Config) -> Self {
        Bmp280 {
            interface,
            config,
            calib_data: CalibData::default(),
            _state: PhantomData,
        }
    }

    /// Loads the calibration table and pushes the configuration to the chip.
    ///
    /// This transitions the driver state from `Uninitialized` to `Ready`.
    /// On error the driver is consumed; nothing half-initialized is returned.
    ///
    /// # Errors
    /// Returns an error if the bus fails while reading calibration data or
    /// during the reset + configuration sequence.
    pub fn init(mut self, delay: &mut impl DelayNs) -> error::Result<Bmp280<I, Ready>, I::Error> {
        let calib_data = self.get_calib_data()?;
        debug!("bmp280: calibration loaded {:?}", calib_data);

        let mut sensor = Bmp280 {
            interface: self.interface,
            config: self.config,
            calib_data,
            _state: PhantomData,
        };
        sensor.apply_configuration(delay)?;

        Ok(sensor)
    }

    fn get_calib_data(&mut self) -> error::Result<CalibData, I::Error> {
        let mut buffer = [0u8; calib_mem::SIZE];
        self.interface
            .read_register(calib_mem::ADDR, &mut buffer)
            .map_err(error::Bmp280Error::Bus)?;

        Ok(CalibData::from_bytes(&buffer))
    }
}

impl<I2C> Bmp280<I2cInterface<I2C>, Uninitialized>
where
    I2C: I2c,
{
    /// Creates a driver on an I2C bus.
    ///
    /// # Arguments
    /// * `i2c` - The I2C bus object.
    /// * `address` - [`PRIMARY_ADDRESS`] (`0x76`) or [`SECONDARY_ADDRESS`] (`0x77`).
    pub fn new_i2c(i2c: I2C, address: u8) -> Self {
        Self::new(I2cInterface::new(i2c, address))
    }
}

impl<SPI> Bmp280<SpiInterface<SPI>, Uninitialized>
where
    SPI: SpiDevice,
{
    /// Creates a driver on an SPI device. Chip select is managed by `spi`.
    pub fn new_spi(spi: SPI) -> Self {
        Self::new(SpiInterface::new(spi))
    }
}

impl<I, STATE> Bmp280<I, STATE>
where
    I: Interface,
{
    /// Stored configuration. This is what the driver last pushed, or will push
    /// during `init`.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Gives back the transport.
    pub fn release(self) -> I {
        self.interface
    }

    fn read_reg_byte(&mut self, reg_address: u8) -> error::Result<u8, I::Error> {
        let mut buffer = [0];
        self.interface
            .read_register(reg_address, &mut buffer)
            .map_err(error::Bmp280Error::Bus)?;
        Ok(buffer[0])
    }

    fn write_reg_byte(&mut self, reg_address: u8, value: u8) -> error::Result<(), I::Error> {
        self.interface
            .write_register(reg_address, &[value])
            .map_err(error::Bmp280Error::Bus)
    }
}

impl<I> Bmp280<I, Ready>
where
    I: Interface,
{
    /// Mutable access to the stored configuration for staged field edits.
    ///
    /// Changes take effect on the next [`apply_configuration`](Self::apply_configuration).
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// The calibration table read during `init`.
    pub fn calibration(&self) -> &CalibData {
        &self.calib_data
    }

    /// Replaces the configuration and pushes it to the chip.
    ///
    /// The stored configuration is only replaced once the whole sequence
    /// succeeded; on error the previous one is kept.
    pub fn set_configuration(
        &mut self,
        config: Config,
        delay: &mut impl DelayNs,
    ) -> error::Result<(), I::Error> {
        self.write_config(&config, delay)?;
        self.config = config;
        Ok(())
    }

    /// Pushes the stored configuration to the chip: soft reset, then
    /// `ctrl_meas`, then `config`, each followed by its settle delay.
    pub fn apply_configuration(&mut self, delay: &mut impl DelayNs) -> error::Result<(), I::Error> {
        let config = self.config;
        self.write_config(&config, delay)
    }

    /// Performs a soft reset of the sensor.
    ///
    /// All registers return to their reset values, so the configuration has
    /// to be applied again afterwards.
    pub fn reset(&mut self, delay: &mut impl DelayNs) -> error::Result<(), I::Error> {
        self.write_reg_byte(regs::ADDR_RESET, regs::RESET_COMMAND)?;
        delay.delay_ms(timing::RESET_MS);
        Ok(())
    }

    /// Reads a fresh measurement.
    ///
    /// In forced mode this re-arms a single conversion and waits for it to
    /// finish. In normal mode the latest free-running result is read directly.
    /// In sleep mode the last result from a previous mode is returned.
    pub fn read_measurement(
        &mut self,
        delay: &mut impl DelayNs,
    ) -> error::Result<Measurement, I::Error> {
        if self.config.power_mode == PowerMode::Forced {
            self.trigger_forced_measurement(delay)?;
        }

        let raw_data = self.get_raw_data()?;

        Ok(self.calib_data.compensate(raw_data))
    }

    /// Reads the chip id (expected value: 0x58).
    pub fn read_chip_id(&mut self) -> error::Result<u8, I::Error> {
        self.read_reg_byte(regs::ADDR_CHIP_ID)
    }

    /// Checks that the device answering on the bus is a BMP280.
    pub fn verify_chip_id(&mut self) -> error::Result<(), I::Error> {
        match self.read_chip_id()? {
            regs::CHIP_ID => Ok(()),
            other => Err(error::Bmp280Error::UnexpectedChipId(other)),
        }
    }

    /// Raw `status` register (0xF3).
    pub fn read_status(&mut self) -> error::Result<u8, I::Error> {
        self.read_reg_byte(regs::ADDR_STATUS)
    }

    /// Returns `true` while a conversion is running.
    pub fn is_measuring(&mut self) -> error::Result<bool, I::Error> {
        Ok(self.read_status()? & regs::STATUS_MEASURING != 0)
    }

    /// Returns `true` while calibration data is being copied out of NVM,
    /// as happens right after power-on or a reset.
    pub fn is_updating(&mut self) -> error::Result<bool, I::Error> {
        Ok(self.read_status()? & regs::STATUS_IM_UPDATE != 0)
    }

    /// Raw `ctrl_meas` register (0xF4) as currently held by the chip.
    pub fn read_ctrl_meas(&mut self) -> error::Result<u8, I::Error> {
        self.read_reg_byte(regs::ADDR_CTRL_MEAS)
    }

    /// Raw `config` register (0xF5) as currently held by the chip.
    pub fn read_config_register(&mut self) -> error::Result<u8, I::Error> {
        self.read_reg_byte(regs::ADDR_CONFIG)
    }

    /// Decodes the configuration the chip currently holds.
    ///
    /// Useful to check for an unexpected reset; the stored configuration is
    /// left untouched.
    pub fn read_device_config(&mut self) -> error::Result<Config, I::Error> {
        let ctrl_meas = self.read_ctrl_meas()?;
        let config = self.read_config_register()?;
        Ok(Config::from_registers(ctrl_meas, config))
    }

    fn write_config(
        &mut self,
        config: &Config,
        delay: &mut impl DelayNs,
    ) -> error::Result<(), I::Error> {
        // Always start from reset values so the result does not depend on
        // what the chip held before.
        self.reset(delay)?;

        self.write_reg_byte(regs::ADDR_CTRL_MEAS, config.ctrl_meas())?;
        delay.delay_ms(timing::CTRL_MEAS_MS);

        self.write_reg_byte(regs::ADDR_CONFIG, config.config_register())?;
        delay.delay_ms(timing::CONFIG_MS);

        debug!(
            "bmp280: configuration applied, ctrl_meas={:#04x} config={:#04x}",
            config.ctrl_meas(),
            config.config_register()
        );
        Ok(())
    }

    /// Writes `ctrl_meas` to start one conversion in forced mode and waits
    /// for the worst-case conversion time.
    fn trigger_forced_measurement(
        &mut self,
        delay: &mut impl DelayNs,
    ) -> error::Result<(), I::Error> {
        let ctrl_meas = self.config.ctrl_meas();
        self.write_reg_byte(regs::ADDR_CTRL_MEAS, ctrl_meas)?;

        let wait_us = self
            .config
            .max_measurement_time_us()
            .max(timing::CTRL_MEAS_MS * 1000);
        debug!("bmp280: forced conversion triggered, waiting {} us", wait_us);
        delay.delay_us(wait_us);

        Ok(())
    }

    fn get_raw_data(&mut self) -> error::Result<RawData, I::Error> {
        let mut buffer = [0u8; raw_data_mem::SIZE];
        self.interface
            .read_register(raw_data_mem::ADDR, &mut buffer)
            .map_err(error::Bmp280Error::Bus)?;

        Ok(RawData::from_bytes(&buffer))
    }
}
