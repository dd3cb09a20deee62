/*++

Licensed under the Apache-2.0 license.

File Name:

    crypto.rs

Abstract:

    Register layout, bit-fields and opcode table of the CRYPTO instruction
    sequencer peripheral.

--*/

use crate::Mmio;
use tock_registers::fields::FieldValue;
use tock_registers::{register_bitfields, LocalRegisterCopy};

/// Base address of the engine on silicon.
pub const CRYPTO_BASE_ADDR: usize = 0x400F_0000;

/// Size of the register block in bytes.
pub const CRYPTO_BLOCK_SIZE: u32 = 0x400;

/// Number of instruction slots in the SEQ0..SEQ4 buffer.
pub const SEQ_SLOTS: usize = 20;

/// Number of SEQ words; each packs four opcodes.
pub const SEQ_WORDS: usize = 5;

pub mod offset {
    pub const CTRL: u32 = 0x000;
    pub const WAC: u32 = 0x004;
    pub const CMD: u32 = 0x008;
    pub const STATUS: u32 = 0x010;
    pub const DSTATUS: u32 = 0x014;
    pub const KEY: u32 = 0x020;
    pub const KEYBUF: u32 = 0x024;
    pub const SEQCTRL: u32 = 0x030;
    pub const SEQCTRLB: u32 = 0x034;
    pub const IF: u32 = 0x040;
    pub const IFS: u32 = 0x044;
    pub const IFC: u32 = 0x048;
    pub const IEN: u32 = 0x04C;
    pub const SEQ0: u32 = 0x050;
    pub const DATA0: u32 = 0x080;
    pub const DATA1: u32 = 0x084;
    pub const DATA2: u32 = 0x090;
    pub const DATA3: u32 = 0x094;
    pub const DATA0XOR: u32 = 0x0A0;
    pub const DATA0BYTE: u32 = 0x0B0;
    pub const DATA1BYTE: u32 = 0x0B4;
    pub const DATA0XORBYTE: u32 = 0x0BC;
    pub const DDATA0: u32 = 0x100;
    pub const DDATA1: u32 = 0x104;
    pub const DDATA2: u32 = 0x108;
    pub const DDATA3: u32 = 0x10C;
    pub const DDATA4: u32 = 0x110;
    pub const DDATA0BIG: u32 = 0x130;
    pub const DDATA0BYTE: u32 = 0x140;
    pub const DDATA1BYTE: u32 = 0x144;
    /// Four extension bits above bit 255 of DDATA0 (260-bit results).
    pub const DDATA0BYTE32: u32 = 0x148;
    pub const QDATA0: u32 = 0x180;
    pub const QDATA1: u32 = 0x184;
    pub const QDATA1BIG: u32 = 0x1A4;
    pub const QDATA0BYTE: u32 = 0x1C0;
    pub const QDATA1BYTE: u32 = 0x1C4;

    pub const DATA: [u32; 4] = [DATA0, DATA1, DATA2, DATA3];
    pub const DDATA: [u32; 5] = [DDATA0, DDATA1, DDATA2, DDATA3, DDATA4];
    pub const QDATA: [u32; 2] = [QDATA0, QDATA1];

    /// Offset of SEQ word `index`.
    pub const fn seq(index: usize) -> u32 {
        SEQ0 + 4 * index as u32
    }
}

/// Opcode table. Instruction families that take register operands occupy
/// a contiguous range starting at their base value.
pub mod instr {
    pub const END: u8 = 0x00;
    pub const EXEC_ALWAYS: u8 = 0x01;
    pub const EXEC_IF_A: u8 = 0x02;
    pub const EXEC_IF_B: u8 = 0x03;
    pub const EXEC_IF_N_A: u8 = 0x04;
    pub const EXEC_IF_N_B: u8 = 0x05;
    pub const EXEC_IF_CARRY: u8 = 0x06;
    pub const EXEC_IF_N_CARRY: u8 = 0x07;
    pub const EXEC_IF_LAST: u8 = 0x08;
    pub const EXEC_IF_N_LAST: u8 = 0x09;

    /// DATA[src] -> DATA[dst]: `DATA_TO_DATA | src << 2 | dst`.
    pub const DATA_TO_DATA: u8 = 0x10;
    /// DATA0 ^= DATA[src]: `DATA_XOR_DATA0 + src`.
    pub const DATA_XOR_DATA0: u8 = 0x20;
    /// DDATA[src] -> DDATA[dst]: `DDATA_TO_DDATA + src * 5 + dst`.
    pub const DDATA_TO_DDATA: u8 = 0x30;
    /// A = DDATA[a], B = DDATA[b]: `SELECT + a * 5 + b`.
    pub const SELECT: u8 = 0x50;

    pub const ADD: u8 = 0x70;
    pub const ADDC: u8 = 0x71;
    pub const SUB: u8 = 0x72;
    pub const SUBC: u8 = 0x73;
    pub const MADD: u8 = 0x74;
    pub const MSUB: u8 = 0x75;
    pub const MMUL: u8 = 0x76;
    pub const MUL: u8 = 0x77;
    pub const XOR: u8 = 0x78;
    pub const AND: u8 = 0x79;
    pub const OR: u8 = 0x7A;
    pub const NOT: u8 = 0x7B;
    pub const SHL: u8 = 0x7C;
    pub const SHR: u8 = 0x7D;
    pub const CLR: u8 = 0x7E;

    pub const AESENC: u8 = 0x80;
    pub const AESDEC: u8 = 0x81;
    pub const SHA: u8 = 0x88;
}

register_bitfields! [
    u32,

    /// Control
    pub CTRL [
        AES OFFSET(0) NUMBITS(1) [
            AES128 = 0,
            AES256 = 1,
        ],
        KEYBUFDIS OFFSET(1) NUMBITS(1) [],
        SHA OFFSET(2) NUMBITS(1) [
            SHA1 = 0,
            SHA2 = 1,
        ],
        NOBUSYSTALL OFFSET(10) NUMBITS(1) [],
        INCWIDTH OFFSET(14) NUMBITS(2) [
            INCWIDTH1 = 0,
            INCWIDTH2 = 1,
            INCWIDTH3 = 2,
            INCWIDTH4 = 3,
        ],
        DMA0MODE OFFSET(16) NUMBITS(2) [
            FULL = 0,
            LENLIMIT = 1,
            FULLBYTE = 2,
            LENLIMITBYTE = 3,
        ],
        DMA0RSEL OFFSET(20) NUMBITS(2) [
            DATA0 = 0,
            DDATA0 = 1,
            DDATA0BIG = 2,
            QDATA0 = 3,
        ],
        DMA1MODE OFFSET(24) NUMBITS(2) [
            FULL = 0,
            LENLIMIT = 1,
            FULLBYTE = 2,
            LENLIMITBYTE = 3,
        ],
        DMA1RSEL OFFSET(28) NUMBITS(2) [
            DATA1 = 0,
            DDATA1 = 1,
            QDATA1 = 2,
            QDATA1BIG = 3,
        ],
    ],

    /// Wide arithmetic configuration
    pub WAC [
        MODULUS OFFSET(0) NUMBITS(4) [
            BIN256 = 0,
            BIN128 = 1,
            ECCBIN233P = 2,
            ECCBIN163P = 3,
            GCMBIN128 = 4,
            ECCPRIME256P = 5,
            ECCPRIME224P = 6,
            ECCPRIME192P = 7,
            ECCBIN233N = 8,
            ECCBIN233KN = 9,
            ECCBIN163N = 10,
            ECCBIN163KN = 11,
            ECCPRIME256N = 12,
            ECCPRIME224N = 13,
            ECCPRIME192N = 14,
        ],
        MODOP OFFSET(4) NUMBITS(1) [
            BINARY = 0,
            REGULAR = 1,
        ],
        MULWIDTH OFFSET(8) NUMBITS(2) [
            MUL256 = 0,
            MUL128 = 1,
            MULMOD = 2,
        ],
        RESULTWIDTH OFFSET(10) NUMBITS(2) [
            RESULT256 = 0,
            RESULT128 = 1,
            RESULT260 = 2,
        ],
    ],

    /// Command
    pub CMD [
        INSTR OFFSET(0) NUMBITS(8) [],
        SEQSTART OFFSET(9) NUMBITS(1) [],
        SEQSTOP OFFSET(10) NUMBITS(1) [],
        SEQSTEP OFFSET(11) NUMBITS(1) [],
    ],

    /// Coarse status
    pub STATUS [
        SEQRUNNING OFFSET(0) NUMBITS(1) [],
        INSTRRUNNING OFFSET(1) NUMBITS(1) [],
        DMAACTIVE OFFSET(2) NUMBITS(1) [],
    ],

    /// Data status
    pub DSTATUS [
        DATA0ZERO OFFSET(0) NUMBITS(4) [],
        DDATA0LSBS OFFSET(4) NUMBITS(4) [],
        DDATA0MSBS OFFSET(12) NUMBITS(4) [],
        DDATA1MSB OFFSET(16) NUMBITS(1) [],
        CARRY OFFSET(24) NUMBITS(1) [],
    ],

    /// Sequence control, phase A
    pub SEQCTRL [
        LENGTHA OFFSET(0) NUMBITS(14) [],
        BLOCKSIZE OFFSET(20) NUMBITS(2) [
            BYTES16 = 0,
            BYTES32 = 1,
            BYTES64 = 2,
        ],
        DMA0SKIP OFFSET(24) NUMBITS(2) [],
        DMA1SKIP OFFSET(26) NUMBITS(2) [],
        DMA0PRESA OFFSET(28) NUMBITS(1) [],
        DMA1PRESA OFFSET(29) NUMBITS(1) [],
        HALT OFFSET(31) NUMBITS(1) [],
    ],

    /// Sequence control, phase B
    pub SEQCTRLB [
        LENGTHB OFFSET(0) NUMBITS(14) [],
        DMA0PRESB OFFSET(28) NUMBITS(1) [],
        DMA1PRESB OFFSET(29) NUMBITS(1) [],
    ],

    /// Layout shared by IF, IFS, IFC and IEN
    pub INT [
        INSTRDONE OFFSET(0) NUMBITS(1) [],
        SEQDONE OFFSET(1) NUMBITS(1) [],
    ],
];

/// Typed accessors over the register block.
pub struct CryptoRegs<M: Mmio> {
    mmio: M,
}

impl<M: Mmio> CryptoRegs<M> {
    pub const fn new(mmio: M) -> Self {
        Self { mmio }
    }

    pub fn mmio(&self) -> &M {
        &self.mmio
    }

    pub fn ctrl(&self) -> LocalRegisterCopy<u32, CTRL::Register> {
        LocalRegisterCopy::new(self.mmio.read_u32(offset::CTRL))
    }

    pub fn write_ctrl(&self, val: FieldValue<u32, CTRL::Register>) {
        self.mmio.write_u32(offset::CTRL, val.value);
    }

    pub fn wac(&self) -> LocalRegisterCopy<u32, WAC::Register> {
        LocalRegisterCopy::new(self.mmio.read_u32(offset::WAC))
    }

    pub fn write_wac(&self, val: FieldValue<u32, WAC::Register>) {
        self.mmio.write_u32(offset::WAC, val.value);
    }

    pub fn cmd(&self, val: FieldValue<u32, CMD::Register>) {
        self.mmio.write_u32(offset::CMD, val.value);
    }

    pub fn status(&self) -> LocalRegisterCopy<u32, STATUS::Register> {
        LocalRegisterCopy::new(self.mmio.read_u32(offset::STATUS))
    }

    pub fn dstatus(&self) -> LocalRegisterCopy<u32, DSTATUS::Register> {
        LocalRegisterCopy::new(self.mmio.read_u32(offset::DSTATUS))
    }

    pub fn seqctrl(&self) -> LocalRegisterCopy<u32, SEQCTRL::Register> {
        LocalRegisterCopy::new(self.mmio.read_u32(offset::SEQCTRL))
    }

    pub fn write_seqctrl(&self, val: FieldValue<u32, SEQCTRL::Register>) {
        self.mmio.write_u32(offset::SEQCTRL, val.value);
    }

    pub fn seqctrlb(&self) -> LocalRegisterCopy<u32, SEQCTRLB::Register> {
        LocalRegisterCopy::new(self.mmio.read_u32(offset::SEQCTRLB))
    }

    pub fn write_seqctrlb(&self, val: FieldValue<u32, SEQCTRLB::Register>) {
        self.mmio.write_u32(offset::SEQCTRLB, val.value);
    }

    pub fn int_flags(&self) -> LocalRegisterCopy<u32, INT::Register> {
        LocalRegisterCopy::new(self.mmio.read_u32(offset::IF))
    }

    pub fn clear_int_flags(&self, val: FieldValue<u32, INT::Register>) {
        self.mmio.write_u32(offset::IFC, val.value);
    }

    pub fn int_enable(&self) -> LocalRegisterCopy<u32, INT::Register> {
        LocalRegisterCopy::new(self.mmio.read_u32(offset::IEN))
    }

    pub fn write_int_enable(&self, val: FieldValue<u32, INT::Register>) {
        self.mmio.write_u32(offset::IEN, val.value);
    }

    pub fn seq(&self, index: usize) -> u32 {
        self.mmio.read_u32(offset::seq(index))
    }

    pub fn write_seq(&self, index: usize, val: u32) {
        self.mmio.write_u32(offset::seq(index), val);
    }

    /// One access to an operand or key window.
    pub fn read_window(&self, window: u32) -> u32 {
        self.mmio.read_u32(window)
    }

    /// One access to an operand or key window.
    pub fn write_window(&self, window: u32, val: u32) {
        self.mmio.write_u32(window, val);
    }
}
