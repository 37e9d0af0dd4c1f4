use crate::{CalcTempData, CalibData, Measurement, RawData, calib_mem, raw_data_mem};

impl CalibData {
    /// Decodes the 24-byte calibration block starting at 0x88.
    ///
    /// The coefficients are stored as little-endian 16-bit words in the order
    /// `T1..T3, P1..P9`; `T1` and `P1` are unsigned, all others are signed.
    pub fn from_bytes(buffer: &[u8; calib_mem::SIZE]) -> Self {
        let word = |i: usize| [buffer[i], buffer[i + 1]];

        CalibData {
            dig_t1: u16::from_le_bytes(word(0)),
            dig_t2: i16::from_le_bytes(word(2)),
            dig_t3: i16::from_le_bytes(word(4)),
            dig_p1: u16::from_le_bytes(word(6)),
            dig_p2: i16::from_le_bytes(word(8)),
            dig_p3: i16::from_le_bytes(word(10)),
            dig_p4: i16::from_le_bytes(word(12)),
            dig_p5: i16::from_le_bytes(word(14)),
            dig_p6: i16::from_le_bytes(word(16)),
            dig_p7: i16::from_le_bytes(word(18)),
            dig_p8: i16::from_le_bytes(word(20)),
            dig_p9: i16::from_le_bytes(word(22)),
        }
    }

    /// Converts a raw temperature reading into degrees Celsius.
    ///
    /// Also returns `t_fine`, which the pressure formula consumes, so this
    /// must run before [`compensate_pressure`](Self::compensate_pressure).
    pub fn compensate_temperature(&self, temp_adc: u32) -> CalcTempData {
        let adc_t = f64::from(temp_adc);
        let t1 = f64::from(self.dig_t1);

        let var1 = (adc_t / 16384.0 - t1 / 1024.0) * f64::from(self.dig_t2);
        let delta = adc_t / 131072.0 - t1 / 8192.0;
        let var2 = delta * delta * f64::from(self.dig_t3);
        let temp_fine = var1 + var2;

        CalcTempData {
            temp_fine,
            temp_comp: temp_fine / 5120.0,
        }
    }

    /// Converts a raw pressure reading into hPa using `t_fine` from the
    /// temperature stage.
    ///
    /// Returns exactly `0.0` when the `var1` divisor collapses to zero, which
    /// only happens with an uncalibrated or corrupt coefficient table.
    pub fn compensate_pressure(&self, press_adc: u32, temp_fine: f64) -> f64 {
        let p1 = f64::from(self.dig_p1);
        let p2 = f64::from(self.dig_p2);
        let p3 = f64::from(self.dig_p3);
        let p4 = f64::from(self.dig_p4);
        let p5 = f64::from(self.dig_p5);
        let p6 = f64::from(self.dig_p6);
        let p7 = f64::from(self.dig_p7);
        let p8 = f64::from(self.dig_p8);
        let p9 = f64::from(self.dig_p9);

        let mut var1 = temp_fine / 2.0 - 64000.0;
        let mut var2 = var1 * var1 * p6 / 32768.0;
        var2 += var1 * p5 * 2.0;
        var2 = var2 / 4.0 + p4 * 65536.0;
        var1 = (p3 * var1 * var1 / 524288.0 + p2 * var1) / 524288.0;
        var1 = (1.0 + var1 / 32768.0) * p1;

        if var1 == 0.0 {
            return 0.0;
        }

        let mut press = 1048576.0 - f64::from(press_adc);
        press = (press - var2 / 4096.0) * 6250.0 / var1;
        let var1 = p9 * press * press / 2147483648.0;
        let var2 = press * p8 / 32768.0;
        press += (var1 + var2 + p7) / 16.0;

        press / 100.0
    }

    /// Runs both compensation stages on a raw sample.
    pub fn compensate(&self, raw: RawData) -> Measurement {
        let temp = self.compensate_temperature(raw.temp_adc);
        let pressure_hpa = self.compensate_pressure(raw.press_adc, temp.temp_fine);

        Measurement {
            temperature_celsius: temp.temp_comp,
            pressure_hpa,
            raw_temperature_adc: raw.temp_adc,
            raw_pressure_adc: raw.press_adc,
        }
    }
}

impl RawData {
    /// Reconstructs the two 20-bit ADC values from the burst read at 0xF7
    /// (`press_msb, press_lsb, press_xlsb, temp_msb, temp_lsb, temp_xlsb`).
    pub fn from_bytes(buffer: &[u8; raw_data_mem::SIZE]) -> Self {
        let adc20 = |msb: u8, lsb: u8, xlsb: u8| {
            (u32::from(msb) << 12) | (u32::from(lsb) << 4) | (u32::from(xlsb) >> 4)
        };

        RawData {
            press_adc: adc20(buffer[0], buffer[1], buffer[2]),
            temp_adc: adc20(buffer[3], buffer[4], buffer[5]),
        }
    }
}
