/*++

Licensed under the Apache-2.0 license.

File Name:

    operand.rs

Abstract:

    File contains typed access to the wide operand registers.

--*/

use arrayvec::ArrayVec;
use bitflags::bitflags;
use crypto_seq_error::{CryptoError, CryptoResult};
use crypto_seq_registers::crypto::{offset, CryptoRegs};
use crypto_seq_registers::Mmio;

/// Largest operand in bytes (quad width).
pub const MAX_OPERAND_BYTES: usize = 64;

/// Operand contents as read back from the engine.
pub type OperandBuf = ArrayVec<u8, MAX_OPERAND_BYTES>;

/// Width class of an operand register group.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Width {
    /// 128 bits: DATA0..DATA3
    Single,
    /// 256 bits: DDATA0..DDATA4
    Double,
    /// 512 bits: QDATA0..QDATA1
    Quad,
}

impl Width {
    pub const ALL: [Width; 3] = [Width::Single, Width::Double, Width::Quad];

    pub const fn bytes(self) -> usize {
        match self {
            Width::Single => 16,
            Width::Double => 32,
            Width::Quad => 64,
        }
    }

    const fn slots(self) -> u8 {
        match self {
            Width::Single => 4,
            Width::Double => 5,
            Width::Quad => 2,
        }
    }
}

/// Byte order in which callers exchange operand bytes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Endianness {
    /// First byte is the least significant.
    Little,
    /// First byte is the most significant.
    Big,
}

bitflags! {
    /// Physical storage behind operand slots. The double and quad slots
    /// alias the single ones: DDATA1 is DATA1:DATA0, DDATA2 is DATA3:DATA2,
    /// QDATA0 is DDATA2:DDATA1 and QDATA1 is DDATA4:DDATA3.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct SlotMask: u8 {
        const DATA0 = 1 << 0;
        const DATA1 = 1 << 1;
        const DATA2 = 1 << 2;
        const DATA3 = 1 << 3;
        const DDATA0 = 1 << 4;
        const DDATA3 = 1 << 5;
        const DDATA4 = 1 << 6;
    }
}

/// A named operand register group.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OperandSlot {
    width: Width,
    index: u8,
}

impl OperandSlot {
    pub const DATA0: Self = Self::at(Width::Single, 0);
    pub const DATA1: Self = Self::at(Width::Single, 1);
    pub const DATA2: Self = Self::at(Width::Single, 2);
    pub const DATA3: Self = Self::at(Width::Single, 3);
    pub const DDATA0: Self = Self::at(Width::Double, 0);
    pub const DDATA1: Self = Self::at(Width::Double, 1);
    pub const DDATA2: Self = Self::at(Width::Double, 2);
    pub const DDATA3: Self = Self::at(Width::Double, 3);
    pub const DDATA4: Self = Self::at(Width::Double, 4);
    pub const QDATA0: Self = Self::at(Width::Quad, 0);
    pub const QDATA1: Self = Self::at(Width::Quad, 1);

    const fn at(width: Width, index: u8) -> Self {
        Self { width, index }
    }

    /// Returns the slot `index` of the `width` class.
    ///
    /// # Errors
    ///
    /// * `DRIVER_CRYPTO_INVALID_WIDTH` - The width class has no such slot
    pub fn new(width: Width, index: u8) -> CryptoResult<Self> {
        if index >= width.slots() {
            return Err(CryptoError::DRIVER_CRYPTO_INVALID_WIDTH);
        }
        Ok(Self::at(width, index))
    }

    pub fn width(self) -> Width {
        self.width
    }

    pub fn index(self) -> u8 {
        self.index
    }

    fn window(self) -> u32 {
        let i = self.index as usize;
        match self.width {
            Width::Single => offset::DATA[i],
            Width::Double => offset::DDATA[i],
            Width::Quad => offset::QDATA[i],
        }
    }

    /// Hardware window presenting the slot most significant word first.
    fn big_window(self) -> Option<u32> {
        match self {
            Self::DDATA0 => Some(offset::DDATA0BIG),
            Self::QDATA1 => Some(offset::QDATA1BIG),
            _ => None,
        }
    }

    pub fn storage(self) -> SlotMask {
        match (self.width, self.index) {
            (Width::Single, i) => SlotMask::from_bits_truncate(1 << i),
            (Width::Double, 0) => SlotMask::DDATA0,
            (Width::Double, 1) => SlotMask::DATA0 | SlotMask::DATA1,
            (Width::Double, 2) => SlotMask::DATA2 | SlotMask::DATA3,
            (Width::Double, 3) => SlotMask::DDATA3,
            (Width::Double, _) => SlotMask::DDATA4,
            (Width::Quad, 0) => {
                SlotMask::DATA0 | SlotMask::DATA1 | SlotMask::DATA2 | SlotMask::DATA3
            }
            (Width::Quad, _) => SlotMask::DDATA3 | SlotMask::DDATA4,
        }
    }
}

/// Zero pads `bytes` to the slot width on their most significant side, so
/// the number they encode is unchanged.
fn padded(slot: OperandSlot, bytes: &[u8], endianness: Endianness) -> CryptoResult<OperandBuf> {
    let len = slot.width.bytes();
    if bytes.len() > len {
        return Err(CryptoError::DRIVER_CRYPTO_INVALID_WIDTH);
    }
    let zeros = core::iter::repeat(0).take(len - bytes.len());
    let mut buf = OperandBuf::new();
    match endianness {
        Endianness::Little => buf.extend(bytes.iter().copied().chain(zeros)),
        Endianness::Big => buf.extend(zeros.chain(bytes.iter().copied())),
    }
    Ok(buf)
}

fn write_words<M: Mmio>(regs: &CryptoRegs<M>, window: u32, bytes: &[u8]) {
    for chunk in bytes.chunks_exact(4) {
        regs.write_window(window, u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
}

/// Rewinds the access pointer of every window.
pub(crate) fn rewind<M: Mmio>(regs: &CryptoRegs<M>) {
    regs.cmd(crypto_seq_registers::crypto::CMD::INSTR.val(0));
}

/// Replaces the slot contents with the number `bytes` encodes, zero
/// extended to the slot width.
pub(crate) fn write<M: Mmio>(
    regs: &CryptoRegs<M>,
    slot: OperandSlot,
    bytes: &[u8],
    endianness: Endianness,
) -> CryptoResult<()> {
    let mut buf = padded(slot, bytes, endianness)?;
    rewind(regs);
    match (endianness, slot.big_window()) {
        (Endianness::Little, _) => write_words(regs, slot.window(), &buf),
        (Endianness::Big, Some(window)) => write_words(regs, window, &buf),
        (Endianness::Big, None) => {
            buf.reverse();
            write_words(regs, slot.window(), &buf);
        }
    }
    Ok(())
}

/// XORs little-endian `bytes` into the slot contents.
pub(crate) fn write_xor<M: Mmio>(
    regs: &CryptoRegs<M>,
    slot: OperandSlot,
    bytes: &[u8],
) -> CryptoResult<()> {
    let buf = padded(slot, bytes, Endianness::Little)?;
    if slot == OperandSlot::DATA0 {
        rewind(regs);
        write_words(regs, offset::DATA0XOR, &buf);
        return Ok(());
    }
    let current = read(regs, slot, Endianness::Little);
    let mut combined = OperandBuf::new();
    combined.extend(current.iter().zip(buf.iter()).map(|(a, b)| a ^ b));
    rewind(regs);
    write_words(regs, slot.window(), &combined);
    Ok(())
}

/// Reads the whole slot.
pub(crate) fn read<M: Mmio>(
    regs: &CryptoRegs<M>,
    slot: OperandSlot,
    endianness: Endianness,
) -> OperandBuf {
    rewind(regs);
    let window = match endianness {
        Endianness::Big => slot.big_window().unwrap_or(slot.window()),
        Endianness::Little => slot.window(),
    };
    let mut buf = OperandBuf::new();
    for _ in 0..slot.width.bytes() / 4 {
        buf.extend(regs.read_window(window).to_le_bytes());
    }
    if endianness == Endianness::Big && slot.big_window().is_none() {
        buf.reverse();
    }
    buf
}
