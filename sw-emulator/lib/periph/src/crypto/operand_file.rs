/*++

Licensed under the Apache-2.0 license.

File Name:

    operand_file.rs

Abstract:

    File contains the operand register storage of the emulated sequencer
    and the bus windows that expose it.

--*/

use crypto_seq_emu_crypto::bignum::U256;
use crypto_seq_registers::crypto::offset;

/// A named operand register.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operand {
    Data(usize),
    DData(usize),
    QData(usize),
}

impl Operand {
    pub fn words(self) -> usize {
        match self {
            Operand::Data(_) => 4,
            Operand::DData(_) => 8,
            Operand::QData(_) => 16,
        }
    }
}

/// How a window presents its operand on the bus.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum View {
    Word,
    WordXor,
    Byte,
    ByteXor,
    /// Most significant word first, bytes swapped.
    Big,
    /// DDATA0 bits 256..259.
    Extension,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Window {
    pub operand: Operand,
    pub view: View,
}

impl Window {
    /// Decodes an operand window offset.
    pub fn at(addr: u32) -> Option<Window> {
        let (operand, view) = match addr {
            offset::DATA0 => (Operand::Data(0), View::Word),
            offset::DATA1 => (Operand::Data(1), View::Word),
            offset::DATA2 => (Operand::Data(2), View::Word),
            offset::DATA3 => (Operand::Data(3), View::Word),
            offset::DATA0XOR => (Operand::Data(0), View::WordXor),
            offset::DATA0BYTE => (Operand::Data(0), View::Byte),
            offset::DATA1BYTE => (Operand::Data(1), View::Byte),
            offset::DATA0XORBYTE => (Operand::Data(0), View::ByteXor),
            offset::DDATA0 => (Operand::DData(0), View::Word),
            offset::DDATA1 => (Operand::DData(1), View::Word),
            offset::DDATA2 => (Operand::DData(2), View::Word),
            offset::DDATA3 => (Operand::DData(3), View::Word),
            offset::DDATA4 => (Operand::DData(4), View::Word),
            offset::DDATA0BIG => (Operand::DData(0), View::Big),
            offset::DDATA0BYTE => (Operand::DData(0), View::Byte),
            offset::DDATA1BYTE => (Operand::DData(1), View::Byte),
            offset::DDATA0BYTE32 => (Operand::DData(0), View::Extension),
            offset::QDATA0 => (Operand::QData(0), View::Word),
            offset::QDATA1 => (Operand::QData(1), View::Word),
            offset::QDATA1BIG => (Operand::QData(1), View::Big),
            offset::QDATA0BYTE => (Operand::QData(0), View::Byte),
            offset::QDATA1BYTE => (Operand::QData(1), View::Byte),
            _ => return None,
        };
        Some(Window { operand, view })
    }

    /// Number of accesses that transfer the whole operand.
    pub fn accesses(self) -> usize {
        match self.view {
            View::Byte | View::ByteXor => self.operand.words() * 4,
            View::Extension => 1,
            _ => self.operand.words(),
        }
    }
}

/// Backing store location of one operand word.
enum Loc {
    Data(usize, usize),
    DData0(usize),
    DData3(usize),
    DData4(usize),
}

/// Operand storage. DDATA1 is DATA1:DATA0, DDATA2 is DATA3:DATA2, QDATA0
/// is DDATA2:DDATA1 and QDATA1 is DDATA4:DDATA3.
#[derive(Default)]
pub struct OperandFile {
    data: [[u32; 4]; 4],
    ddata0: U256,
    ddata0_ext: u8,
    ddata3: U256,
    ddata4: U256,
}

impl OperandFile {
    fn locate(operand: Operand, i: usize) -> Loc {
        match operand {
            Operand::Data(n) => Loc::Data(n, i),
            Operand::DData(0) => Loc::DData0(i),
            Operand::DData(1) => Loc::Data(i / 4, i % 4),
            Operand::DData(2) => Loc::Data(2 + i / 4, i % 4),
            Operand::DData(3) => Loc::DData3(i),
            Operand::DData(_) => Loc::DData4(i),
            Operand::QData(0) => Loc::Data(i / 4, i % 4),
            Operand::QData(_) if i < 8 => Loc::DData3(i),
            Operand::QData(_) => Loc::DData4(i - 8),
        }
    }

    /// Word `i` of `operand`, least significant first.
    pub fn word(&self, operand: Operand, i: usize) -> u32 {
        match Self::locate(operand, i) {
            Loc::Data(n, w) => self.data[n][w],
            Loc::DData0(w) => self.ddata0[w],
            Loc::DData3(w) => self.ddata3[w],
            Loc::DData4(w) => self.ddata4[w],
        }
    }

    pub fn set_word(&mut self, operand: Operand, i: usize, val: u32) {
        match Self::locate(operand, i) {
            Loc::Data(n, w) => self.data[n][w] = val,
            Loc::DData0(w) => self.ddata0[w] = val,
            Loc::DData3(w) => self.ddata3[w] = val,
            Loc::DData4(w) => self.ddata4[w] = val,
        }
    }

    pub fn ddata(&self, n: usize) -> U256 {
        let mut out = [0u32; 8];
        for (i, word) in out.iter_mut().enumerate() {
            *word = self.word(Operand::DData(n), i);
        }
        out
    }

    pub fn set_ddata(&mut self, n: usize, val: &U256) {
        for (i, word) in val.iter().enumerate() {
            self.set_word(Operand::DData(n), i, *word);
        }
    }

    pub fn data(&self, n: usize) -> [u32; 4] {
        self.data[n]
    }

    pub fn set_data(&mut self, n: usize, val: [u32; 4]) {
        self.data[n] = val;
    }

    /// DATA0 as a block in memory order.
    pub fn data0_block(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        for (chunk, word) in out.chunks_exact_mut(4).zip(self.data[0].iter()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        out
    }

    pub fn set_data0_block(&mut self, block: &[u8; 16]) {
        for (word, chunk) in self.data[0].iter_mut().zip(block.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
    }

    pub fn ddata0_ext(&self) -> u8 {
        self.ddata0_ext
    }

    /// Bus read through `window` at access index `ptr`.
    pub fn read_window(&self, window: Window, ptr: usize) -> u32 {
        let words = window.operand.words();
        match window.view {
            View::Word | View::WordXor => self.word(window.operand, ptr % words),
            View::Byte | View::ByteXor => {
                let byte = ptr % (words * 4);
                (self.word(window.operand, byte / 4) >> (8 * (byte % 4))) & 0xff
            }
            View::Big => self
                .word(window.operand, words - 1 - ptr % words)
                .swap_bytes(),
            View::Extension => self.ddata0_ext as u32,
        }
    }

    /// Bus write through `window` at access index `ptr`.
    pub fn write_window(&mut self, window: Window, ptr: usize, val: u32) {
        let words = window.operand.words();
        match window.view {
            View::Word => self.set_word(window.operand, ptr % words, val),
            View::WordXor => {
                let i = ptr % words;
                let old = self.word(window.operand, i);
                self.set_word(window.operand, i, old ^ val);
            }
            View::Byte | View::ByteXor => {
                let byte = ptr % (words * 4);
                let shift = 8 * (byte % 4);
                let old = self.word(window.operand, byte / 4);
                let new = if window.view == View::Byte {
                    (old & !(0xff << shift)) | ((val & 0xff) << shift)
                } else {
                    old ^ ((val & 0xff) << shift)
                };
                self.set_word(window.operand, byte / 4, new);
            }
            View::Big => self.set_word(window.operand, words - 1 - ptr % words, val.swap_bytes()),
            View::Extension => self.ddata0_ext = (val & 0xf) as u8,
        }
    }

    /// Loads `bytes` (zero padded) through a word or big-endian view, as a
    /// DMA channel does at block start.
    pub fn load_bytes(&mut self, window: Window, bytes: &[u8]) {
        for i in 0..window.operand.words() {
            let mut chunk = [0u8; 4];
            for (j, b) in chunk.iter_mut().enumerate() {
                *b = bytes.get(4 * i + j).copied().unwrap_or(0);
            }
            self.write_window(window, i, u32::from_le_bytes(chunk));
        }
    }

    /// Reads the whole operand through a word or big-endian view, as a DMA
    /// channel does at block end.
    pub fn store_bytes(&self, window: Window, out: &mut Vec<u8>, len: usize) {
        let mut bytes = Vec::with_capacity(window.operand.words() * 4);
        for i in 0..window.operand.words() {
            bytes.extend_from_slice(&self.read_window(window, i).to_le_bytes());
        }
        out.extend_from_slice(&bytes[..len.min(bytes.len())]);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
