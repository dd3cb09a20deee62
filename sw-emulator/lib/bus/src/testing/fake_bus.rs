/*++

Licensed under the Apache-2.0 license.

File Name:

    fake_bus.rs

Abstract:

    File contains a Bus implementation that records every access.

--*/
use crypto_seq_emu_types::{AhbAddr, AhbData, AhbSize};

use crate::{testing::Log, Bus, BusError};
use std::fmt::Write;

/// A Bus implementation that logs all calls and returns canned results.
///
/// # Example
///
/// ```
/// use crypto_seq_emu_bus::{Bus, testing::FakeBus};
/// use crypto_seq_emu_types::AhbSize;
///
/// let mut fake_bus = FakeBus::new();
/// fake_bus.read_result = Ok(35);
/// assert_eq!(fake_bus.read(AhbSize::Word, 0x14), Ok(35));
/// fake_bus.write(AhbSize::Word, 0x8, 0x200).unwrap();
/// assert_eq!(fake_bus.log.count("write("), 1);
/// assert_eq!("read(Word, 0x14)\nwrite(Word, 0x8, 0x200)\n", fake_bus.log.take());
/// ```
pub struct FakeBus {
    pub log: Log,
    pub read_result: Result<AhbData, BusError>,
    pub write_result: Result<(), BusError>,
}

impl FakeBus {
    pub fn new() -> Self {
        Self {
            log: Log::new(),
            read_result: Ok(0),
            write_result: Ok(()),
        }
    }
}

impl Default for FakeBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for FakeBus {
    fn read(&mut self, size: AhbSize, addr: AhbAddr) -> Result<AhbData, BusError> {
        let _ = writeln!(self.log.w(), "read({size:?}, {addr:#x})");
        self.read_result
    }

    fn write(&mut self, size: AhbSize, addr: AhbAddr, val: AhbData) -> Result<(), BusError> {
        let _ = writeln!(self.log.w(), "write({size:?}, {addr:#x}, {val:#x})");
        self.write_result
    }

    fn poll(&mut self) {
        let _ = writeln!(self.log.w(), "poll()");
    }

    fn warm_reset(&mut self) {
        let _ = writeln!(self.log.w(), "warm_reset()");
    }
}
