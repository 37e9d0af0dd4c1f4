/// Oversampling setting for the temperature and pressure channels.
///
/// Each step doubles the number of samples averaged in hardware. Higher rates
/// reduce noise but lengthen the conversion and raise the current per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Oversampling {
    /// No measurement. The channel's result register keeps its reset value.
    Skipped = 0,
    /// 1x oversampling, 16 bit resolution.
    #[default]
    X1 = 1,
    /// 2x oversampling, 17 bit resolution.
    X2 = 2,
    /// 4x oversampling, 18 bit resolution.
    X4 = 3,
    /// 8x oversampling, 19 bit resolution.
    X8 = 4,
    /// 16x oversampling, 20 bit resolution.
    X16 = 5,
}

impl Oversampling {
    /// Decodes a 3-bit `osrs_x` field. Codes 6 and 7 are treated as 16x by the chip.
    pub fn from_bits(value: u8) -> Self {
        match value & 0x07 {
            0 => Oversampling::Skipped,
            1 => Oversampling::X1,
            2 => Oversampling::X2,
            3 => Oversampling::X4,
            4 => Oversampling::X8,
            _ => Oversampling::X16,
        }
    }

    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Number of samples averaged per conversion (0 when skipped).
    pub fn factor(self) -> u32 {
        match self {
            Oversampling::Skipped => 0,
            Oversampling::X1 => 1,
            Oversampling::X2 => 2,
            Oversampling::X4 => 4,
            Oversampling::X8 => 8,
            Oversampling::X16 => 16,
        }
    }
}

/// Coefficient of the hardware IIR filter applied to temperature and pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum IirFilter {
    #[default]
    Off = 0,
    X2 = 1,
    X4 = 2,
    X8 = 3,
    X16 = 4,
}

impl IirFilter {
    /// Decodes the 3-bit `filter` field. Codes 5 to 7 behave like coefficient 16.
    pub fn from_bits(value: u8) -> Self {
        match value & 0x07 {
            0 => IirFilter::Off,
            1 => IirFilter::X2,
            2 => IirFilter::X4,
            3 => IirFilter::X8,
            _ => IirFilter::X16,
        }
    }

    pub fn bits(self) -> u8 {
        self as u8
    }
}

/// Power mode, bits `mode[1:0]` of `ctrl_meas`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PowerMode {
    /// No conversions. Registers stay readable.
    Sleep = 0,
    /// A single conversion, after which the chip returns to sleep.
    /// Writing `ctrl_meas` again re-arms the next one.
    #[default]
    Forced = 1,
    /// Continuous conversions separated by the configured standby time.
    Normal = 3,
}

impl PowerMode {
    /// Decodes the 2-bit `mode` field. Both `0b01` and `0b10` select forced mode.
    pub fn from_bits(value: u8) -> Self {
        match value & 0x03 {
            0 => PowerMode::Sleep,
            3 => PowerMode::Normal,
            _ => PowerMode::Forced,
        }
    }

    pub fn bits(self) -> u8 {
        self as u8
    }
}

/// Inactive period between conversions in normal mode (`t_sb`).
/// Has no effect in sleep or forced mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StandbyTime {
    /// 0.5 ms.
    Ms0_5 = 0,
    /// 62.5 ms.
    Ms62_5 = 1,
    /// 125 ms.
    Ms125 = 2,
    /// 250 ms.
    Ms250 = 3,
    /// 500 ms.
    Ms500 = 4,
    /// 1000 ms.
    #[default]
    Ms1000 = 5,
    /// 2000 ms.
    Ms2000 = 6,
    /// 4000 ms.
    Ms4000 = 7,
}

impl StandbyTime {
    /// Decodes the 3-bit `t_sb` field; higher bits are ignored.
    pub fn from_bits(value: u8) -> Self {
        match value & 0x07 {
            0 => StandbyTime::Ms0_5,
            1 => StandbyTime::Ms62_5,
            2 => StandbyTime::Ms125,
            3 => StandbyTime::Ms250,
            4 => StandbyTime::Ms500,
            5 => StandbyTime::Ms1000,
            6 => StandbyTime::Ms2000,
            _ => StandbyTime::Ms4000,
        }
    }

    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Standby duration in microseconds.
    pub fn as_micros(self) -> u32 {
        match self {
            StandbyTime::Ms0_5 => 500,
            StandbyTime::Ms62_5 => 62_500,
            StandbyTime::Ms125 => 125_000,
            StandbyTime::Ms250 => 250_000,
            StandbyTime::Ms500 => 500_000,
            StandbyTime::Ms1000 => 1_000_000,
            StandbyTime::Ms2000 => 2_000_000,
            StandbyTime::Ms4000 => 4_000_000,
        }
    }
}

/// Recommended operating modes by use case (datasheet table 7).
///
/// | Preset            | Osrs T / P | Mode   | Filter |
/// |-------------------|------------|--------|--------|
/// | HandheldLowPower  | 2x / 16x   | Normal | 4      |
/// | HandheldDynamic   | 1x / 4x    | Normal | 16     |
/// | WeatherMonitoring | 1x / 1x    | Forced | off    |
/// | Elevator          | 1x / 4x    | Normal | 4      |
/// | DropDetection     | 1x / 2x    | Normal | off    |
/// | IndoorNavigation  | 2x / 16x   | Normal | 16     |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Preset {
    HandheldLowPower,
    HandheldDynamic,
    WeatherMonitoring,
    Elevator,
    DropDetection,
    IndoorNavigation,
}

/// The five user-selectable operating parameters of the sensor.
///
/// Changing a field only updates this value. The driver pushes it to the chip
/// in [`Bmp280::set_configuration`](crate::Bmp280::set_configuration) or
/// [`Bmp280::apply_configuration`](crate::Bmp280::apply_configuration).
///
/// The default is the low power "weather monitoring" setup: 1x oversampling on
/// both channels, filter off, forced mode and a 1000 ms standby time.
///
/// ```rust
/// use bmp280_driver::{Config, Oversampling, PowerMode};
///
/// let config = Config::default()
///     .with_pressure_oversampling(Oversampling::X16)
///     .with_power_mode(PowerMode::Normal);
/// assert_eq!(config.ctrl_meas(), 0b001_101_11);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub pressure_oversampling: Oversampling,
    pub temperature_oversampling: Oversampling,
    pub filter: IirFilter,
    pub power_mode: PowerMode,
    pub standby_time: StandbyTime,
}

impl Config {
    /// Builds one of the datasheet presets. Standby time is chosen separately
    /// because it only sets the output data rate in normal mode.
    pub fn from_preset(preset: Preset, standby_time: StandbyTime) -> Self {
        let (temperature_oversampling, pressure_oversampling, power_mode, filter) = match preset {
            Preset::HandheldLowPower => (
                Oversampling::X2,
                Oversampling::X16,
                PowerMode::Normal,
                IirFilter::X4,
            ),
            Preset::HandheldDynamic => (
                Oversampling::X1,
                Oversampling::X4,
                PowerMode::Normal,
                IirFilter::X16,
            ),
            Preset::WeatherMonitoring => (
                Oversampling::X1,
                Oversampling::X1,
                PowerMode::Forced,
                IirFilter::Off,
            ),
            Preset::Elevator => (
                Oversampling::X1,
                Oversampling::X4,
                PowerMode::Normal,
                IirFilter::X4,
            ),
            Preset::DropDetection => (
                Oversampling::X1,
                Oversampling::X2,
                PowerMode::Normal,
                IirFilter::Off,
            ),
            Preset::IndoorNavigation => (
                Oversampling::X2,
                Oversampling::X16,
                PowerMode::Normal,
                IirFilter::X16,
            ),
        };

        Self {
            pressure_oversampling,
            temperature_oversampling,
            filter,
            power_mode,
            standby_time,
        }
    }

    pub fn with_pressure_oversampling(mut self, os: Oversampling) -> Self {
        self.pressure_oversampling = os;
        self
    }

    pub fn with_temperature_oversampling(mut self, os: Oversampling) -> Self {
        self.temperature_oversampling = os;
        self
    }

    pub fn with_filter(mut self, filter: IirFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_power_mode(mut self, mode: PowerMode) -> Self {
        self.power_mode = mode;
        self
    }

    pub fn with_standby_time(mut self, standby_time: StandbyTime) -> Self {
        self.standby_time = standby_time;
        self
    }

    /// Value of the `ctrl_meas` register (0xF4): `osrs_t[7:5] | osrs_p[4:2] | mode[1:0]`.
    pub fn ctrl_meas(&self) -> u8 {
        (self.temperature_oversampling.bits() << 5)
            | (self.pressure_oversampling.bits() << 2)
            | self.power_mode.bits()
    }

    /// Value of the `config` register (0xF5): `t_sb[7:5] | filter[4:2]`.
    /// Bit 0 (`spi3w_en`) is always left cleared.
    pub fn config_register(&self) -> u8 {
        (self.standby_time.bits() << 5) | (self.filter.bits() << 2)
    }

    /// Reconstructs a configuration from the raw `ctrl_meas` and `config` bytes.
    pub fn from_registers(ctrl_meas: u8, config: u8) -> Self {
        Self {
            temperature_oversampling: Oversampling::from_bits(ctrl_meas >> 5),
            pressure_oversampling: Oversampling::from_bits(ctrl_meas >> 2),
            power_mode: PowerMode::from_bits(ctrl_meas),
            standby_time: StandbyTime::from_bits(config >> 5),
            filter: IirFilter::from_bits(config >> 2),
        }
    }

    /// Worst-case duration of one conversion cycle in microseconds
    /// (datasheet section 3.8.1, maximum column).
    pub fn max_measurement_time_us(&self) -> u32 {
        let t = self.temperature_oversampling.factor();
        let p = self.pressure_oversampling.factor();
        let pressure_part = if p == 0 { 0 } else { 2300 * p + 575 };

        1250 + 2300 * t + pressure_part
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OVERSAMPLING: [Oversampling; 6] = [
        Oversampling::Skipped,
        Oversampling::X1,
        Oversampling::X2,
        Oversampling::X4,
        Oversampling::X8,
        Oversampling::X16,
    ];
    const MODES: [PowerMode; 3] = [PowerMode::Sleep, PowerMode::Forced, PowerMode::Normal];
    const FILTERS: [IirFilter; 5] = [
        IirFilter::Off,
        IirFilter::X2,
        IirFilter::X4,
        IirFilter::X8,
        IirFilter::X16,
    ];

    #[test]
    fn default_is_weather_monitoring() {
        let config = Config::default();
        assert_eq!(config.pressure_oversampling, Oversampling::X1);
        assert_eq!(config.temperature_oversampling, Oversampling::X1);
        assert_eq!(config.filter, IirFilter::Off);
        assert_eq!(config.power_mode, PowerMode::Forced);
        assert_eq!(config.standby_time, StandbyTime::Ms1000);
        assert_eq!(
            config,
            Config::from_preset(Preset::WeatherMonitoring, StandbyTime::Ms1000)
        );
        assert_eq!(config.ctrl_meas(), 0x25);
        assert_eq!(config.config_register(), 0xA0);
    }

    #[test]
    fn ctrl_meas_decodes_back_to_fields() {
        for temp in OVERSAMPLING {
            for pres in OVERSAMPLING {
                for mode in MODES {
                    let config = Config::default()
                        .with_temperature_oversampling(temp)
                        .with_pressure_oversampling(pres)
                        .with_power_mode(mode);
                    let decoded = Config::from_registers(config.ctrl_meas(), 0);

                    assert_eq!(decoded.temperature_oversampling, temp);
                    assert_eq!(decoded.pressure_oversampling, pres);
                    assert_eq!(decoded.power_mode, mode);
                }
            }
        }
    }

    #[test]
    fn config_register_decodes_back_to_fields() {
        for standby in 0..8 {
            for filter in FILTERS {
                let standby = StandbyTime::from_bits(standby);
                let config = Config::default()
                    .with_standby_time(standby)
                    .with_filter(filter);
                let byte = config.config_register();
                let decoded = Config::from_registers(0, byte);

                assert_eq!(byte & 0x03, 0);
                assert_eq!(decoded.standby_time, standby);
                assert_eq!(decoded.filter, filter);
            }
        }
    }

    #[test]
    fn reserved_codes_follow_chip_decoding() {
        assert_eq!(Oversampling::from_bits(6), Oversampling::X16);
        assert_eq!(Oversampling::from_bits(7), Oversampling::X16);
        assert_eq!(IirFilter::from_bits(7), IirFilter::X16);
        assert_eq!(PowerMode::from_bits(0b10), PowerMode::Forced);
    }

    #[test]
    fn measurement_time_scales_with_oversampling() {
        assert_eq!(Config::default().max_measurement_time_us(), 6425);

        let temperature_only = Config::default().with_pressure_oversampling(Oversampling::Skipped);
        assert_eq!(temperature_only.max_measurement_time_us(), 3550);

        let indoor = Config::from_preset(Preset::IndoorNavigation, StandbyTime::Ms0_5);
        assert_eq!(indoor.max_measurement_time_us(), 43_225);
    }

    #[test]
    fn standby_time_in_microseconds() {
        assert_eq!(StandbyTime::Ms0_5.as_micros(), 500);
        assert_eq!(StandbyTime::Ms62_5.as_micros(), 62_500);
        assert_eq!(StandbyTime::default().as_micros(), 1_000_000);
        assert_eq!(StandbyTime::Ms4000.as_micros(), 4_000_000);
        assert_eq!(StandbyTime::from_bits(0b1000_0011), StandbyTime::Ms250);
    }
}
