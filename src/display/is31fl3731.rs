//! IS31FL3731 LED Matrix Driver
//!
//! Driver for the 17x7 Scroll pHAT HD, which is an IS31FL3731 charlieplex
//! driver on I2C. Frames are double-buffered: pixels are written into the
//! hidden frame and then the chip is told to display it.

use super::{Frame, FrameSink, DISPLAY_HEIGHT, DISPLAY_WIDTH};
use crate::{Result, WedpiError};
use embedded_hal::i2c::I2c;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// IS31FL3731 I2C address on the Scroll pHAT HD
pub const IS31FL3731_ADDR: u8 = 0x74;

/// PWM registers per frame
const PWM_REGISTERS: usize = 144;

/// Enable/blink registers per frame
const ENABLE_REGISTERS: usize = 18;

/// Bytes per I2C write when uploading PWM data
const WRITE_CHUNK: usize = 32;

/// IS31FL3731 registers
mod reg {
    /// Bank select (frames 0-7 or the function bank)
    pub const COMMAND: u8 = 0xFD;
    pub const BANK_FUNCTION: u8 = 0x0B;

    // Function bank
    pub const MODE: u8 = 0x00;
    pub const FRAME: u8 = 0x01;
    pub const AUDIOSYNC: u8 = 0x06;
    pub const SHUTDOWN: u8 = 0x0A;

    pub const PICTURE_MODE: u8 = 0x00;

    // Frame banks
    pub const ENABLE_OFFSET: u8 = 0x00;
    pub const BLINK_OFFSET: u8 = 0x12;
    pub const COLOR_OFFSET: u8 = 0x24;
}

/// PWM register of a panel pixel in the Scroll pHAT HD wiring
///
/// The left nine columns run right-to-left through the low half of each
/// register row, the right eight columns run bottom-up through the high half.
pub fn pixel_register(x: usize, y: usize) -> usize {
    let (x, y) = (x as isize, y as isize);
    let (x, y) = if x > 8 { (x - 8, 6 - (y + 8)) } else { (8 - x, y) };
    (x * 16 + y) as usize
}

/// IS31FL3731 frame sink
pub struct Is31fl3731<I2C> {
    i2c: I2C,
    address: u8,
    /// Frame currently shown by the chip
    visible_frame: u8,
}

impl<I2C> Is31fl3731<I2C>
where
    I2C: I2c,
{
    /// Create a driver at the default address (call [`init`](Self::init) before use)
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, IS31FL3731_ADDR)
    }

    pub fn with_address(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            visible_frame: 0,
        }
    }

    /// Reset the chip, switch to picture mode and enable every LED on both frames
    pub fn init(&mut self) -> Result<()> {
        self.select_bank(reg::BANK_FUNCTION)?;
        self.write_register(reg::SHUTDOWN, 0x00)?;
        thread::sleep(Duration::from_millis(10));
        self.write_register(reg::SHUTDOWN, 0x01)?;
        self.write_register(reg::MODE, reg::PICTURE_MODE)?;
        self.write_register(reg::AUDIOSYNC, 0x00)?;

        for frame in 0..2u8 {
            self.select_bank(frame)?;
            self.write_block(reg::ENABLE_OFFSET, &[0xFF; ENABLE_REGISTERS])?;
            self.write_block(reg::BLINK_OFFSET, &[0x00; ENABLE_REGISTERS])?;
            self.write_pwm(&[0u8; PWM_REGISTERS])?;
        }

        self.show_frame(0)?;
        info!("IS31FL3731 initialised at 0x{:02X}", self.address);
        Ok(())
    }

    /// Release the I2C bus
    pub fn release(self) -> I2C {
        self.i2c
    }

    fn show_frame(&mut self, frame: u8) -> Result<()> {
        self.select_bank(reg::BANK_FUNCTION)?;
        self.write_register(reg::FRAME, frame)?;
        self.visible_frame = frame;
        Ok(())
    }

    fn select_bank(&mut self, bank: u8) -> Result<()> {
        self.write_register(reg::COMMAND, bank)
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<()> {
        self.i2c
            .write(self.address, &[register, value])
            .map_err(|e| WedpiError::DisplayError(format!("I2C write failed: {:?}", e)))
    }

    fn write_block(&mut self, start: u8, data: &[u8]) -> Result<()> {
        let mut payload = Vec::with_capacity(data.len() + 1);
        payload.push(start);
        payload.extend_from_slice(data);
        self.i2c
            .write(self.address, &payload)
            .map_err(|e| WedpiError::DisplayError(format!("I2C write failed: {:?}", e)))
    }

    fn write_pwm(&mut self, pwm: &[u8; PWM_REGISTERS]) -> Result<()> {
        for (i, chunk) in pwm.chunks(WRITE_CHUNK).enumerate() {
            let start = reg::COLOR_OFFSET + (i * WRITE_CHUNK) as u8;
            self.write_block(start, chunk)?;
        }
        Ok(())
    }
}

impl<I2C> FrameSink for Is31fl3731<I2C>
where
    I2C: I2c,
{
    fn present(&mut self, frame: &Frame) -> Result<()> {
        let mut pwm = [0u8; PWM_REGISTERS];
        for y in 0..DISPLAY_HEIGHT {
            for x in 0..DISPLAY_WIDTH {
                pwm[pixel_register(x, y)] = frame.get(x, y);
            }
        }

        let hidden = 1 - self.visible_frame;
        self.select_bank(hidden)?;
        self.write_pwm(&pwm)?;
        self.show_frame(hidden)?;
        debug!(target: "wedpi::display::frames", "Flipped to frame {}", hidden);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};
    use std::collections::HashSet;

    /// Records every write as (address, bytes)
    #[derive(Default)]
    struct MockBus {
        writes: Vec<(u8, Vec<u8>)>,
        fail: bool,
    }

    impl ErrorType for MockBus {
        type Error = ErrorKind;
    }

    impl I2c for MockBus {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> std::result::Result<(), Self::Error> {
            if self.fail {
                return Err(ErrorKind::Other);
            }
            for op in operations {
                if let Operation::Write(bytes) = op {
                    self.writes.push((address, bytes.to_vec()));
                }
            }
            Ok(())
        }
    }

    /// Replays the writes through a model of the chip's register banks
    fn banks_after(writes: &[(u8, Vec<u8>)]) -> (Vec<[u8; 256]>, u8) {
        let mut banks = vec![[0u8; 256]; 12];
        let mut bank = 0usize;
        for (_, bytes) in writes {
            if bytes[0] == reg::COMMAND {
                bank = bytes[1] as usize;
                continue;
            }
            let start = bytes[0] as usize;
            for (i, value) in bytes[1..].iter().enumerate() {
                banks[bank][start + i] = *value;
            }
        }
        let shown = banks[reg::BANK_FUNCTION as usize][reg::FRAME as usize];
        (banks, shown)
    }

    #[test]
    fn test_pixel_registers_are_unique_and_in_range() {
        let mut seen = HashSet::new();
        for y in 0..DISPLAY_HEIGHT {
            for x in 0..DISPLAY_WIDTH {
                let register = pixel_register(x, y);
                assert!(register < PWM_REGISTERS);
                assert!(seen.insert(register), "duplicate register {}", register);
            }
        }
    }

    #[test]
    fn test_pixel_register_corners() {
        assert_eq!(pixel_register(0, 0), 128);
        assert_eq!(pixel_register(8, 0), 0);
        assert_eq!(pixel_register(9, 0), 14);
        assert_eq!(pixel_register(16, 6), 120);
    }

    #[test]
    fn test_init_sequence() {
        let mut driver = Is31fl3731::new(MockBus::default());
        driver.init().unwrap();

        let bus = driver.release();
        assert!(bus.writes.iter().all(|(addr, _)| *addr == IS31FL3731_ADDR));

        let (banks, shown) = banks_after(&bus.writes);
        let function = &banks[reg::BANK_FUNCTION as usize];
        assert_eq!(function[reg::SHUTDOWN as usize], 0x01);
        assert_eq!(function[reg::MODE as usize], reg::PICTURE_MODE);
        assert_eq!(shown, 0);
        for frame in 0..2 {
            assert!(banks[frame][..ENABLE_REGISTERS].iter().all(|&b| b == 0xFF));
        }
    }

    #[test]
    fn test_present_double_buffers() {
        let mut driver = Is31fl3731::new(MockBus::default());
        driver.init().unwrap();

        let mut frame = Frame::blank();
        frame.set(0, 0, 200);
        frame.set(16, 6, 10);
        driver.present(&frame).unwrap();

        let bus = driver.release();
        let (banks, shown) = banks_after(&bus.writes);
        assert_eq!(shown, 1);

        let pwm = &banks[1][reg::COLOR_OFFSET as usize..];
        assert_eq!(pwm[pixel_register(0, 0)], 200);
        assert_eq!(pwm[pixel_register(16, 6)], 10);
        assert_eq!(pwm[pixel_register(5, 3)], 0);
    }

    #[test]
    fn test_present_alternates_frames() {
        let mut driver = Is31fl3731::new(MockBus::default());
        driver.init().unwrap();

        driver.present(&Frame::blank()).unwrap();
        driver.present(&Frame::blank()).unwrap();

        let bus = driver.release();
        let (_, shown) = banks_after(&bus.writes);
        assert_eq!(shown, 0);
    }

    #[test]
    fn test_bus_failure_is_display_error() {
        let mut driver = Is31fl3731::new(MockBus {
            fail: true,
            ..Default::default()
        });
        assert!(matches!(driver.init(), Err(WedpiError::DisplayError(_))));
    }
}
