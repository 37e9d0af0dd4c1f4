//! Bus transports for the sensor.
//!
//! The driver only needs two primitives, writing bytes to a register and
//! reading a number of bytes starting at a register. [`Interface`] captures
//! them; [`I2cInterface`] and [`SpiInterface`] implement them on top of the
//! `embedded-hal` bus traits.

use embedded_hal::{
    i2c::{self, I2c},
    spi::{self, SpiDevice},
};
use log::trace;

/// I2C address when SDO is tied to GND.
pub const PRIMARY_ADDRESS: u8 = 0x76;
/// I2C address when SDO is tied to VDDIO.
pub const SECONDARY_ADDRESS: u8 = 0x77;

/// Register-level access to the device.
///
/// Implementations must transfer exactly `data.len()` / `buffer.len()` bytes
/// or return an error.
pub trait Interface {
    type Error;

    /// Writes `data` starting at `register`.
    fn write_register(&mut self, register: u8, data: &[u8]) -> Result<(), Self::Error>;

    /// Fills `buffer` with consecutive registers starting at `register`.
    fn read_register(&mut self, register: u8, buffer: &mut [u8]) -> Result<(), Self::Error>;
}

/// Two-wire transport. Each access is addressed with the 7-bit device
/// address followed by the register pointer.
#[derive(Debug)]
pub struct I2cInterface<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C> I2cInterface<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Gives back the bus.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C> Interface for I2cInterface<I2C>
where
    I2C: I2c,
{
    type Error = <I2C as i2c::ErrorType>::Error;

    fn write_register(&mut self, register: u8, data: &[u8]) -> Result<(), Self::Error> {
        trace!("i2c {:#04x} write {:#04x} <- {:02x?}", self.address, register, data);
        // Writes do not auto-increment; every byte goes out as its own
        // register/value pair in a single addressed write.
        for (offset, value) in (0u8..).zip(data) {
            self.i2c
                .write(self.address, &[register.wrapping_add(offset), *value])?;
        }
        Ok(())
    }

    fn read_register(&mut self, register: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.i2c.write_read(self.address, &[register], buffer)?;
        trace!("i2c {:#04x} read {:#04x} -> {:02x?}", self.address, register, buffer);
        Ok(())
    }
}

/// Four-wire transport. Chip select framing comes from the [`SpiDevice`];
/// bit 7 of the register byte selects read (1) or write (0).
#[derive(Debug)]
pub struct SpiInterface<SPI> {
    spi: SPI,
}

impl<SPI> SpiInterface<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Gives back the bus.
    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI> Interface for SpiInterface<SPI>
where
    SPI: SpiDevice,
{
    type Error = <SPI as spi::ErrorType>::Error;

    fn write_register(&mut self, register: u8, data: &[u8]) -> Result<(), Self::Error> {
        let control = register & 0x7F;
        trace!("spi write {:#04x} <- {:02x?}", control, data);
        self.spi.transaction(&mut [
            spi::Operation::Write(&[control]),
            spi::Operation::Write(data),
        ])
    }

    fn read_register(&mut self, register: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        let control = register | 0x80;
        // The byte clocked in while the control byte goes out carries no data
        // and is dropped by the write operation.
        self.spi.transaction(&mut [
            spi::Operation::Write(&[control]),
            spi::Operation::Read(buffer),
        ])?;
        trace!("spi read {:#04x} -> {:02x?}", control, buffer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::{
        i2c::{Mock as I2cMock, Transaction as I2cTransaction},
        spi::{Mock as SpiMock, Transaction as SpiTransaction},
    };

    /// Bus that records the raw byte stream, emitting the address byte at the
    /// start of every operation segment.
    #[derive(Default)]
    struct WireBus {
        wire: Vec<u8>,
    }

    impl i2c::ErrorType for WireBus {
        type Error = ErrorKind;
    }

    impl I2c for WireBus {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [i2c::Operation<'_>],
        ) -> Result<(), Self::Error> {
            for operation in operations {
                match operation {
                    i2c::Operation::Write(bytes) => {
                        self.wire.push(address << 1);
                        self.wire.extend_from_slice(bytes);
                    }
                    i2c::Operation::Read(buffer) => {
                        self.wire.push((address << 1) | 1);
                        buffer.fill(0);
                    }
                }
            }
            Ok(())
        }
    }

    #[test]
    fn i2c_write_prefixes_register_pointer() {
        let expectations = [I2cTransaction::write(PRIMARY_ADDRESS, vec![0xE0, 0xB6])];
        let mut interface = I2cInterface::new(I2cMock::new(&expectations), PRIMARY_ADDRESS);

        interface.write_register(0xE0, &[0xB6]).unwrap();

        interface.release().done();
    }

    #[test]
    fn i2c_write_is_a_single_addressed_segment() {
        let mut interface = I2cInterface::new(WireBus::default(), SECONDARY_ADDRESS);

        interface.write_register(0xF4, &[0x25]).unwrap();

        assert_eq!(interface.release().wire, vec![0xEE, 0xF4, 0x25]);
    }

    #[test]
    fn i2c_multi_byte_write_sends_register_value_pairs() {
        let expectations = [
            I2cTransaction::write(PRIMARY_ADDRESS, vec![0xF4, 0x25]),
            I2cTransaction::write(PRIMARY_ADDRESS, vec![0xF5, 0xA0]),
        ];
        let mut interface = I2cInterface::new(I2cMock::new(&expectations), PRIMARY_ADDRESS);

        interface.write_register(0xF4, &[0x25, 0xA0]).unwrap();

        interface.release().done();
    }

    #[test]
    fn i2c_read_uses_write_read() {
        let expectations = [I2cTransaction::write_read(
            SECONDARY_ADDRESS,
            vec![0xD0],
            vec![0x58],
        )];
        let mut interface = I2cInterface::new(I2cMock::new(&expectations), SECONDARY_ADDRESS);
        assert_eq!(interface.address(), SECONDARY_ADDRESS);

        let mut buffer = [0u8; 1];
        interface.read_register(0xD0, &mut buffer).unwrap();
        assert_eq!(buffer, [0x58]);

        interface.release().done();
    }

    #[test]
    fn i2c_error_is_passed_through() {
        let expectations = [
            I2cTransaction::write_read(PRIMARY_ADDRESS, vec![0xF7], vec![0; 6])
                .with_error(ErrorKind::Other),
        ];
        let mut interface = I2cInterface::new(I2cMock::new(&expectations), PRIMARY_ADDRESS);

        let mut buffer = [0u8; 6];
        let err = interface.read_register(0xF7, &mut buffer).unwrap_err();
        assert_eq!(err, ErrorKind::Other);

        interface.release().done();
    }

    #[test]
    fn spi_write_clears_read_bit() {
        let expectations = [
            SpiTransaction::transaction_start(),
            SpiTransaction::write(0x74),
            SpiTransaction::write_vec(vec![0x25]),
            SpiTransaction::transaction_end(),
        ];
        let mut interface = SpiInterface::new(SpiMock::new(&expectations));

        interface.write_register(0xF4, &[0x25]).unwrap();

        interface.release().done();
    }

    #[test]
    fn spi_read_sets_read_bit() {
        let expectations = [
            SpiTransaction::transaction_start(),
            SpiTransaction::write(0xD0),
            SpiTransaction::read(0x58),
            SpiTransaction::transaction_end(),
            SpiTransaction::transaction_start(),
            SpiTransaction::write(0xF3),
            SpiTransaction::read(0x08),
            SpiTransaction::transaction_end(),
        ];
        let mut interface = SpiInterface::new(SpiMock::new(&expectations));

        let mut buffer = [0u8; 1];
        interface.read_register(0xD0, &mut buffer).unwrap();
        assert_eq!(buffer, [0x58]);

        // Registers below 0x80 still get the read bit.
        interface.read_register(0x73, &mut buffer).unwrap();
        assert_eq!(buffer, [0x08]);

        interface.release().done();
    }
}
