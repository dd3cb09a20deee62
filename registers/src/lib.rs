// Licensed under the Apache-2.0 license
//
#![no_std]

pub mod crypto;

/// Word-granular access to a memory-mapped register block.
///
/// Offsets are byte offsets from the base of the block. Implementations
/// exist for silicon (`RealMmio`), the emulator, and write-counting fakes.
pub trait Mmio {
    fn read_u32(&self, offset: u32) -> u32;
    fn write_u32(&self, offset: u32, val: u32);
}

impl<T: Mmio + ?Sized> Mmio for &T {
    fn read_u32(&self, offset: u32) -> u32 {
        (**self).read_u32(offset)
    }
    fn write_u32(&self, offset: u32, val: u32) {
        (**self).write_u32(offset, val)
    }
}

/// Volatile access to the register block at a fixed physical address.
pub struct RealMmio {
    base: *mut u32,
}

impl RealMmio {
    /// # Safety
    ///
    /// `base` must be the address of the engine's register block, and no
    /// other `RealMmio` may be created for it.
    pub const unsafe fn new(base: usize) -> Self {
        Self {
            base: base as *mut u32,
        }
    }
}

// The register block is a fixed hardware address; moving the handle across
// contexts does not alias memory.
unsafe impl Send for RealMmio {}

impl Mmio for RealMmio {
    fn read_u32(&self, offset: u32) -> u32 {
        // SAFETY: the constructor contract guarantees `base` maps the block
        // and every offset used by the driver lies inside it.
        unsafe { core::ptr::read_volatile(self.base.add(offset as usize / 4)) }
    }

    fn write_u32(&self, offset: u32, val: u32) {
        // SAFETY: see `read_u32`.
        unsafe { core::ptr::write_volatile(self.base.add(offset as usize / 4), val) }
    }
}
