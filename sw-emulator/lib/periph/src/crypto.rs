/*++

Licensed under the Apache-2.0 license.

File Name:

    crypto.rs

Abstract:

    File contains the emulated CRYPTO instruction sequencer peripheral.

--*/

mod alu;
mod operand_file;

use std::collections::{HashMap, VecDeque};

use alu::{AluState, ExecEnv, Field, Gate, Op};
use crypto_seq_emu_bus::{ActionHandle, Bus, BusError, Clock, Register, Timer};
use crypto_seq_emu_crypto::{moduli, AesKey};
use crypto_seq_emu_types::{AhbAddr, AhbData, AhbSize};
use crypto_seq_registers::crypto::{
    offset, CMD, CTRL, DSTATUS, INT, SEQCTRL, SEQCTRLB, SEQ_SLOTS, SEQ_WORDS, STATUS, WAC,
};
use tock_registers::LocalRegisterCopy;

pub use operand_file::{Operand, OperandFile, View, Window};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum RunState {
    Idle,
    Running,
    /// Stopped between instructions; SEQSTART resumes, SEQSTEP advances
    /// one instruction, SEQSTOP aborts.
    Paused,
}

/// What the scheduled timer action will do when it fires.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Pending {
    None,
    Sequence,
    Step,
    Immediate(u8),
}

/// Position of the sequencer inside the loaded program.
#[derive(Clone, Copy, Debug, Default)]
struct Position {
    pc: usize,
    block: u32,
    blocks_a: u32,
    blocks_b: u32,
    block_open: bool,
    enabled: bool,
}

impl Position {
    fn total_blocks(&self) -> u32 {
        self.blocks_a + self.blocks_b
    }

    fn phase_a(&self) -> bool {
        self.block < self.blocks_a
    }

    fn last(&self) -> bool {
        self.block + 1 == self.total_blocks()
    }
}

/// Data a DMA channel feeds into, or collects from, its target register.
#[derive(Default)]
struct DmaStream {
    input: VecDeque<u8>,
    output: Option<Vec<u8>>,
}

impl DmaStream {
    fn attached(&self) -> bool {
        !self.input.is_empty() || self.output.is_some()
    }
}

/// Emulated sequencer
pub struct Crypto {
    ctrl: LocalRegisterCopy<u32, CTRL::Register>,
    wac: LocalRegisterCopy<u32, WAC::Register>,
    status: LocalRegisterCopy<u32, STATUS::Register>,
    dstatus: LocalRegisterCopy<u32, DSTATUS::Register>,
    seqctrl: LocalRegisterCopy<u32, SEQCTRL::Register>,
    seqctrlb: LocalRegisterCopy<u32, SEQCTRLB::Register>,
    int_flags: LocalRegisterCopy<u32, INT::Register>,
    int_enable: LocalRegisterCopy<u32, INT::Register>,
    seq: [u32; SEQ_WORDS],
    key: [u32; 8],
    keybuf: [u32; 8],
    operands: OperandFile,

    /// Access pointer of every window touched since the last rewind
    pointers: HashMap<AhbAddr, usize>,

    run: RunState,
    pos: Position,
    alu: AluState,
    pending: Pending,
    dma: [DmaStream; 2],

    timer: Timer,
    op_action: Option<ActionHandle>,

    /// Test knob: the sequencer accepts SEQSTART but never advances
    stalled: bool,
}

impl Crypto {
    /// Create a new sequencer bound to `clock`
    pub fn new(clock: &Clock) -> Self {
        Self::with_timer(clock.timer())
    }

    fn with_timer(timer: Timer) -> Self {
        Self {
            ctrl: LocalRegisterCopy::new(0),
            wac: LocalRegisterCopy::new(0),
            status: LocalRegisterCopy::new(0),
            dstatus: LocalRegisterCopy::new(0),
            seqctrl: LocalRegisterCopy::new(0),
            seqctrlb: LocalRegisterCopy::new(0),
            int_flags: LocalRegisterCopy::new(0),
            int_enable: LocalRegisterCopy::new(0),
            seq: [0; SEQ_WORDS],
            key: [0; 8],
            keybuf: [0; 8],
            operands: OperandFile::default(),
            pointers: HashMap::new(),
            run: RunState::Idle,
            pos: Position::default(),
            alu: AluState::default(),
            pending: Pending::None,
            dma: Default::default(),
            timer,
            op_action: None,
            stalled: false,
        }
    }

    /// Stall the sequencer: started sequences report running forever.
    pub fn set_stalled(&mut self, stalled: bool) {
        self.stalled = stalled;
    }

    /// True when an enabled interrupt flag is raised.
    pub fn irq_pending(&self) -> bool {
        self.int_flags.get() & self.int_enable.get() != 0
    }

    /// Queue `bytes` for DMA channel `channel` to feed into its target.
    pub fn attach_dma_input(&mut self, channel: usize, bytes: &[u8]) {
        self.dma[channel].input.extend(bytes.iter().copied());
    }

    /// Collect the target of DMA channel `channel` at every block end.
    pub fn attach_dma_output(&mut self, channel: usize) {
        self.dma[channel].output = Some(Vec::new());
    }

    /// Bytes DMA channel `channel` has collected so far.
    pub fn dma_output(&self, channel: usize) -> &[u8] {
        self.dma[channel].output.as_deref().unwrap_or(&[])
    }

    pub fn operands(&self) -> &OperandFile {
        &self.operands
    }

    fn opcode(&self, slot: usize) -> u8 {
        (self.seq[slot / 4] >> (8 * (slot % 4))) as u8
    }

    fn block_bytes(&self) -> u32 {
        let size: Option<SEQCTRL::BLOCKSIZE::Value> = self.seqctrl.read_as_enum(SEQCTRL::BLOCKSIZE);
        match size {
            Some(SEQCTRL::BLOCKSIZE::Value::BYTES32) => 32,
            Some(SEQCTRL::BLOCKSIZE::Value::BYTES64) => 64,
            _ => 16,
        }
    }

    fn next_pointer(&mut self, addr: AhbAddr, accesses: usize) -> usize {
        let ptr = self.pointers.entry(addr).or_insert(0);
        let current = *ptr;
        *ptr = (current + 1) % accesses;
        current
    }

    fn key_words(&self) -> usize {
        if self.ctrl.matches_all(CTRL::AES::AES256) {
            8
        } else {
            4
        }
    }

    fn aes_key(&self) -> AesKey {
        let words = if self.ctrl.is_set(CTRL::KEYBUFDIS) {
            &self.key
        } else {
            &self.keybuf
        };
        let mut bytes = [0u8; 32];
        for (chunk, word) in bytes.chunks_exact_mut(4).zip(words.iter()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        if self.key_words() == 8 {
            AesKey::Aes256(bytes)
        } else {
            let mut short = [0u8; 16];
            short.copy_from_slice(&bytes[..16]);
            AesKey::Aes128(short)
        }
    }

    fn field(&self) -> Option<Field> {
        use WAC::MODULUS::Value as M;
        let modulus: M = self.wac.read_as_enum(WAC::MODULUS)?;
        let regular = self.wac.matches_all(WAC::MODOP::REGULAR);
        let field = match modulus {
            M::BIN256 => Field::Binary(moduli::bin256()),
            M::BIN128 | M::GCMBIN128 => Field::Binary(moduli::bin128()),
            M::ECCBIN233P => Field::Binary(moduli::bin233()),
            M::ECCBIN163P => Field::Binary(moduli::bin163()),
            M::ECCPRIME256P => Field::Prime(moduli::p256_p()),
            M::ECCPRIME224P => Field::Prime(moduli::p224_p()),
            M::ECCPRIME192P => Field::Prime(moduli::p192_p()),
            M::ECCBIN233N => Field::Prime(moduli::b233_n()),
            M::ECCBIN233KN => Field::Prime(moduli::k233_n()),
            M::ECCBIN163N => Field::Prime(moduli::b163_n()),
            M::ECCBIN163KN => Field::Prime(moduli::k163_n()),
            M::ECCPRIME256N => Field::Prime(moduli::p256_n()),
            M::ECCPRIME224N => Field::Prime(moduli::p224_n()),
            M::ECCPRIME192N => Field::Prime(moduli::p192_n()),
        };
        match (field, regular) {
            (Field::Prime(_), true) | (Field::Binary(_), false) => Some(field),
            _ => {
                log::warn!("crypto: MODOP does not match the selected modulus");
                None
            }
        }
    }

    fn run_op(&mut self, op: Op) {
        let key = self.aes_key();
        let env = ExecEnv {
            field: self.field(),
            width: if self.wac.matches_all(WAC::RESULTWIDTH::RESULT128) {
                128
            } else {
                256
            },
            key: &key,
            sha256: self.ctrl.matches_all(CTRL::SHA::SHA2),
        };
        alu::execute(op, &mut self.operands, &mut self.alu, &env);
        self.update_dstatus();
        self.int_flags.modify(INT::INSTRDONE::SET);
    }

    fn update_dstatus(&mut self) {
        let data0 = self.operands.data(0);
        let ddata0 = self.operands.ddata(0);
        let zero = data0
            .iter()
            .enumerate()
            .fold(0, |acc, (i, w)| acc | (((*w == 0) as u32) << i));
        let ddata1_msb = self.operands.word(Operand::DData(1), 7) >> 31;
        self.dstatus.write(
            DSTATUS::DATA0ZERO.val(zero)
                + DSTATUS::DDATA0LSBS.val(ddata0[0] & 0xf)
                + DSTATUS::DDATA0MSBS.val(ddata0[7] >> 28)
                + DSTATUS::DDATA1MSB.val(ddata1_msb)
                + DSTATUS::CARRY.val(self.alu.carry as u32),
        );
    }

    fn gate_open(&self, gate: Gate) -> bool {
        match gate {
            Gate::Always => true,
            Gate::IfA | Gate::IfNotB => self.pos.phase_a(),
            Gate::IfB | Gate::IfNotA => !self.pos.phase_a(),
            Gate::IfCarry => self.alu.carry,
            Gate::IfNotCarry => !self.alu.carry,
            Gate::IfLast => self.pos.last(),
            Gate::IfNotLast => !self.pos.last(),
        }
    }

    fn dma_target(&self, channel: usize) -> Window {
        let addr = if channel == 0 {
            let rsel: Option<CTRL::DMA0RSEL::Value> = self.ctrl.read_as_enum(CTRL::DMA0RSEL);
            match rsel {
                Some(CTRL::DMA0RSEL::Value::DDATA0) => offset::DDATA0,
                Some(CTRL::DMA0RSEL::Value::DDATA0BIG) => offset::DDATA0BIG,
                Some(CTRL::DMA0RSEL::Value::QDATA0) => offset::QDATA0,
                _ => offset::DATA0,
            }
        } else {
            let rsel: Option<CTRL::DMA1RSEL::Value> = self.ctrl.read_as_enum(CTRL::DMA1RSEL);
            match rsel {
                Some(CTRL::DMA1RSEL::Value::DDATA1) => offset::DDATA1,
                Some(CTRL::DMA1RSEL::Value::QDATA1) => offset::QDATA1,
                Some(CTRL::DMA1RSEL::Value::QDATA1BIG) => offset::QDATA1BIG,
                _ => offset::DATA1,
            }
        };
        Window {
            operand: match addr {
                offset::DATA0 => Operand::Data(0),
                offset::DATA1 => Operand::Data(1),
                offset::DDATA0 | offset::DDATA0BIG => Operand::DData(0),
                offset::DDATA1 => Operand::DData(1),
                offset::QDATA0 => Operand::QData(0),
                _ => Operand::QData(1),
            },
            view: if addr == offset::DDATA0BIG || addr == offset::QDATA1BIG {
                View::Big
            } else {
                View::Word
            },
        }
    }

    /// Bytes channel `channel` moves for the current block.
    fn dma_len(&self, channel: usize, window: Window) -> usize {
        let width = window.operand.words() * 4;
        let mode = if channel == 0 {
            self.ctrl.read(CTRL::DMA0MODE)
        } else {
            self.ctrl.read(CTRL::DMA1MODE)
        };
        // LENLIMIT and LENLIMITBYTE stop at the phase length.
        if mode & 1 == 1 {
            width.min(self.phase_remaining() as usize)
        } else {
            width
        }
    }

    fn phase_remaining(&self) -> u32 {
        if self.pos.phase_a() {
            self.seqctrl.read(SEQCTRL::LENGTHA)
        } else {
            self.seqctrlb.read(SEQCTRLB::LENGTHB)
        }
    }

    fn preserved(&self, channel: usize) -> bool {
        match (channel, self.pos.phase_a()) {
            (0, true) => self.seqctrl.is_set(SEQCTRL::DMA0PRESA),
            (_, true) => self.seqctrl.is_set(SEQCTRL::DMA1PRESA),
            (0, false) => self.seqctrlb.is_set(SEQCTRLB::DMA0PRESB),
            (_, false) => self.seqctrlb.is_set(SEQCTRLB::DMA1PRESB),
        }
    }

    fn open_block(&mut self) {
        self.pos.block_open = true;
        self.pos.enabled = true;
        for channel in 0..2 {
            if self.dma[channel].input.is_empty() || self.preserved(channel) {
                continue;
            }
            let window = self.dma_target(channel);
            let len = self.dma_len(channel, window);
            let input = &mut self.dma[channel].input;
            let n = len.min(input.len());
            let bytes: Vec<u8> = input.drain(..n).collect();
            self.operands.load_bytes(window, &bytes);
        }
    }

    fn close_block(&mut self) {
        for channel in 0..2 {
            let skip = if channel == 0 {
                self.seqctrl.read(SEQCTRL::DMA0SKIP)
            } else {
                self.seqctrl.read(SEQCTRL::DMA1SKIP)
            };
            if self.dma[channel].output.is_none() || self.pos.block < skip {
                continue;
            }
            let window = self.dma_target(channel);
            let len = self.dma_len(channel, window);
            if let Some(out) = self.dma[channel].output.as_mut() {
                self.operands.store_bytes(window, out, len);
            }
        }

        let consumed = self.block_bytes().min(self.phase_remaining());
        if self.pos.phase_a() {
            let left = self.seqctrl.read(SEQCTRL::LENGTHA) - consumed;
            self.seqctrl.modify(SEQCTRL::LENGTHA.val(left));
        } else {
            let left = self.seqctrlb.read(SEQCTRLB::LENGTHB) - consumed;
            self.seqctrlb.modify(SEQCTRLB::LENGTHB.val(left));
        }

        self.pos.block += 1;
        self.pos.pc = 0;
        self.pos.block_open = false;
        if self.pos.block == self.pos.total_blocks() {
            self.finish();
        }
    }

    fn finish(&mut self) {
        log::debug!("crypto: sequence done after {} blocks", self.pos.block);
        self.run = RunState::Idle;
        self.status
            .modify(STATUS::SEQRUNNING::CLEAR + STATUS::INSTRRUNNING::CLEAR + STATUS::DMAACTIVE::CLEAR);
        self.int_flags.modify(INT::SEQDONE::SET);
    }

    fn begin_sequence(&mut self) {
        let block = self.block_bytes();
        let len_a = self.seqctrl.read(SEQCTRL::LENGTHA);
        let len_b = self.seqctrlb.read(SEQCTRLB::LENGTHB);
        self.pos = Position {
            blocks_a: len_a.div_ceil(block).max(1),
            blocks_b: len_b.div_ceil(block),
            ..Default::default()
        };
        log::debug!(
            "crypto: sequence start, {} A blocks, {} B blocks",
            self.pos.blocks_a,
            self.pos.blocks_b
        );
    }

    /// Executes the instruction at the program counter and closes the block
    /// when the next slot is END or past the buffer.
    fn advance(&mut self) {
        if !self.pos.block_open {
            self.open_block();
        }
        match Op::decode(self.opcode(self.pos.pc)) {
            Op::End => {
                self.close_block();
                return;
            }
            Op::Exec(gate) => {
                self.pos.enabled = self.gate_open(gate);
                self.int_flags.modify(INT::INSTRDONE::SET);
            }
            op if self.pos.enabled => self.run_op(op),
            _ => {
                self.int_flags.modify(INT::INSTRDONE::SET);
            }
        }
        self.pos.pc += 1;
        if self.pos.pc == SEQ_SLOTS || self.opcode(self.pos.pc) == 0 {
            self.close_block();
        }
    }

    fn schedule(&mut self, pending: Pending) {
        self.pending = pending;
        self.status.modify(STATUS::INSTRRUNNING::SET);
        if self.stalled {
            log::warn!("crypto: sequencer stalled");
            return;
        }
        let ticks = match pending {
            Pending::Immediate(opcode) => Op::decode(opcode).ticks(),
            _ => Op::decode(self.opcode(self.pos.pc)).ticks(),
        };
        self.op_action = Some(self.timer.schedule_poll_in(ticks));
    }

    fn cancel_pending(&mut self) {
        if let Some(action) = self.op_action.take() {
            self.timer.cancel(action);
        }
        self.pending = Pending::None;
        self.status.modify(STATUS::INSTRRUNNING::CLEAR);
    }

    fn on_seq_start(&mut self) {
        match self.run {
            RunState::Running => return,
            RunState::Idle => self.begin_sequence(),
            RunState::Paused => self.cancel_pending(),
        }
        self.run = RunState::Running;
        let dma_active = self.dma.iter().any(DmaStream::attached) as u32;
        self.status
            .modify(STATUS::SEQRUNNING::SET + STATUS::DMAACTIVE.val(dma_active));
        self.schedule(Pending::Sequence);
    }

    fn on_seq_stop(&mut self) {
        match self.run {
            RunState::Running => {
                self.cancel_pending();
                self.run = RunState::Paused;
                self.status
                    .modify(STATUS::SEQRUNNING::CLEAR + STATUS::DMAACTIVE::CLEAR);
                log::debug!(
                    "crypto: paused at block {} slot {}",
                    self.pos.block,
                    self.pos.pc
                );
            }
            RunState::Paused => {
                self.cancel_pending();
                self.run = RunState::Idle;
                self.pos = Position::default();
                log::debug!("crypto: paused sequence aborted");
            }
            RunState::Idle => {}
        }
    }

    fn on_seq_step(&mut self) {
        match self.run {
            RunState::Running => return,
            RunState::Idle => self.begin_sequence(),
            RunState::Paused => {}
        }
        self.run = RunState::Paused;
        self.schedule(Pending::Step);
    }

    fn write_cmd(&mut self, val: AhbData) {
        let cmd: LocalRegisterCopy<u32, CMD::Register> = LocalRegisterCopy::new(val);
        self.pointers.clear();

        let opcode = cmd.read(CMD::INSTR) as u8;
        if opcode != 0 {
            if self.run == RunState::Idle && self.pending == Pending::None {
                self.schedule(Pending::Immediate(opcode));
            } else {
                log::warn!("crypto: CMD.INSTR {opcode:#04x} ignored while sequencing");
            }
        }
        if cmd.is_set(CMD::SEQSTOP) {
            self.on_seq_stop();
        }
        if cmd.is_set(CMD::SEQSTART) {
            self.on_seq_start();
        }
        if cmd.is_set(CMD::SEQSTEP) {
            self.on_seq_step();
        }
    }

    fn write_seqctrl(&mut self, size: AhbSize, val: AhbData) -> Result<(), BusError> {
        Register::write(&mut self.seqctrl, size, val)?;
        self.pointers.clear();
        if self.seqctrl.is_set(SEQCTRL::HALT) && self.run == RunState::Running {
            self.on_seq_stop();
        }
        Ok(())
    }

    fn key_window(&mut self, addr: AhbAddr) -> usize {
        let words = self.key_words();
        self.next_pointer(addr, words)
    }
}

impl Bus for Crypto {
    fn read(&mut self, size: AhbSize, addr: AhbAddr) -> Result<AhbData, BusError> {
        if let Some(window) = Window::at(addr) {
            let byte_access = matches!(window.view, View::Byte | View::ByteXor);
            if size != AhbSize::Word && !(byte_access && size == AhbSize::Byte) {
                return Err(BusError::LoadAccessFault);
            }
            let ptr = self.next_pointer(addr, window.accesses());
            return Ok(self.operands.read_window(window, ptr) & size.data_mask());
        }
        match addr {
            offset::CTRL => Register::read(&self.ctrl, size),
            offset::WAC => Register::read(&self.wac, size),
            offset::CMD => Register::read(&0u32, size),
            offset::STATUS => Register::read(&self.status, size),
            offset::DSTATUS => Register::read(&self.dstatus, size),
            offset::KEY => {
                let i = self.key_window(addr);
                Register::read(&self.key[i], size)
            }
            offset::KEYBUF => {
                let i = self.key_window(addr);
                Register::read(&self.keybuf[i], size)
            }
            offset::SEQCTRL => Register::read(&self.seqctrl, size),
            offset::SEQCTRLB => Register::read(&self.seqctrlb, size),
            offset::IF | offset::IFS | offset::IFC => Register::read(&self.int_flags, size),
            offset::IEN => Register::read(&self.int_enable, size),
            a if (offset::seq(0)..=offset::seq(SEQ_WORDS - 1)).contains(&a) && a % 4 == 0 => {
                Register::read(&self.seq[((a - offset::SEQ0) / 4) as usize], size)
            }
            _ => Err(BusError::LoadAccessFault),
        }
    }

    fn write(&mut self, size: AhbSize, addr: AhbAddr, val: AhbData) -> Result<(), BusError> {
        if let Some(window) = Window::at(addr) {
            let byte_access = matches!(window.view, View::Byte | View::ByteXor);
            if size != AhbSize::Word && !(byte_access && size == AhbSize::Byte) {
                return Err(BusError::StoreAccessFault);
            }
            if self.run == RunState::Running && self.ctrl.is_set(CTRL::NOBUSYSTALL) {
                log::warn!("crypto: operand write at {addr:#x} dropped while busy");
                return Ok(());
            }
            let ptr = self.next_pointer(addr, window.accesses());
            self.operands.write_window(window, ptr, val & size.data_mask());
            return Ok(());
        }
        match addr {
            offset::CTRL => Register::write(&mut self.ctrl, size, val),
            offset::WAC => Register::write(&mut self.wac, size, val),
            offset::CMD => {
                Register::write(&mut 0u32, size, val)?;
                self.write_cmd(val);
                Ok(())
            }
            offset::KEY => {
                let i = self.key_window(addr);
                Register::write(&mut self.key[i], size, val)
            }
            offset::KEYBUF => {
                let i = self.key_window(addr);
                Register::write(&mut self.keybuf[i], size, val)
            }
            offset::SEQCTRL => self.write_seqctrl(size, val),
            offset::SEQCTRLB => {
                Register::write(&mut self.seqctrlb, size, val)?;
                self.pointers.clear();
                Ok(())
            }
            offset::IFS => {
                Register::write(&mut 0u32, size, val)?;
                self.int_flags.set(self.int_flags.get() | (val & 0x3));
                Ok(())
            }
            offset::IFC => {
                Register::write(&mut 0u32, size, val)?;
                self.int_flags.set(self.int_flags.get() & !val);
                Ok(())
            }
            offset::IEN => Register::write(&mut self.int_enable, size, val),
            a if (offset::seq(0)..=offset::seq(SEQ_WORDS - 1)).contains(&a) && a % 4 == 0 => {
                Register::write(&mut self.seq[((a - offset::SEQ0) / 4) as usize], size, val)
            }
            _ => Err(BusError::StoreAccessFault),
        }
    }

    fn poll(&mut self) {
        if !self.timer.fired(&mut self.op_action) {
            return;
        }
        let pending = std::mem::replace(&mut self.pending, Pending::None);
        self.status.modify(STATUS::INSTRRUNNING::CLEAR);
        match pending {
            Pending::Immediate(opcode) => {
                let op = Op::decode(opcode);
                if !matches!(op, Op::Exec(_)) {
                    self.run_op(op);
                }
            }
            Pending::Sequence => {
                self.advance();
                if self.run == RunState::Running {
                    self.schedule(Pending::Sequence);
                }
            }
            Pending::Step => self.advance(),
            Pending::None => {}
        }
    }

    fn warm_reset(&mut self) {
        self.cancel_pending();
        *self = Self::with_timer(self.timer.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto_seq_emu_crypto::bignum;
    use crypto_seq_registers::crypto::instr;

    fn pack(opcodes: &[u8]) -> [u32; SEQ_WORDS] {
        let mut words = [0u32; SEQ_WORDS];
        for (i, op) in opcodes.iter().enumerate() {
            words[i / 4] |= (*op as u32) << (8 * (i % 4));
        }
        words
    }

    fn load(crypto: &mut Crypto, opcodes: &[u8]) {
        for (i, word) in pack(opcodes).iter().enumerate() {
            crypto
                .write(AhbSize::Word, offset::seq(i), *word)
                .unwrap();
        }
    }

    fn write_operand(crypto: &mut Crypto, window: u32, words: &[u32]) {
        for w in words {
            crypto.write(AhbSize::Word, window, *w).unwrap();
        }
    }

    fn read_words(crypto: &mut Crypto, window: u32, n: usize) -> Vec<u32> {
        (0..n)
            .map(|_| crypto.read(AhbSize::Word, window).unwrap())
            .collect()
    }

    fn run_to_done(clock: &Clock, crypto: &mut Crypto) {
        for _ in 0..10_000 {
            if crypto.read(AhbSize::Word, offset::IF).unwrap() & 0x2 != 0 {
                return;
            }
            clock.increment_and_poll(1, crypto);
        }
        panic!("sequence did not finish");
    }

    #[test]
    fn test_mod_add_sets_carry_on_reduction() {
        let clock = Clock::new();
        let mut crypto = Crypto::new(&clock);
        let p = moduli::p256_p();
        let (p_minus_1, _) = bignum::sub(&p, &bignum::from_be_hex("1"), false, 256);

        crypto
            .write(
                AhbSize::Word,
                offset::WAC,
                (WAC::MODULUS::ECCPRIME256P + WAC::MODOP::REGULAR).value,
            )
            .unwrap();
        write_operand(&mut crypto, offset::DDATA1, &p_minus_1);
        write_operand(&mut crypto, offset::DDATA2, &bignum::from_be_hex("5"));
        load(&mut crypto, &[instr::SELECT + 5 + 2, instr::MADD]);
        crypto
            .write(AhbSize::Word, offset::CMD, CMD::SEQSTART::SET.value)
            .unwrap();
        assert_eq!(crypto.read(AhbSize::Word, offset::STATUS).unwrap() & 1, 1);

        run_to_done(&clock, &mut crypto);
        assert_eq!(crypto.read(AhbSize::Word, offset::STATUS).unwrap() & 1, 0);
        assert_eq!(
            read_words(&mut crypto, offset::DDATA0, 8),
            bignum::from_be_hex("4").to_vec()
        );
        let dstatus = crypto.read(AhbSize::Word, offset::DSTATUS).unwrap();
        assert_ne!(dstatus & (1 << 24), 0);
    }

    #[test]
    fn test_gates_follow_last_block() {
        let clock = Clock::new();
        let mut crypto = Crypto::new(&clock);
        write_operand(&mut crypto, offset::DDATA0, &bignum::from_be_hex("1"));
        // Three 16-byte blocks; shift DDATA0 on all but the last.
        crypto
            .write(AhbSize::Word, offset::SEQCTRL, SEQCTRL::LENGTHA.val(48).value)
            .unwrap();
        load(
            &mut crypto,
            &[instr::EXEC_IF_N_LAST, instr::SELECT, instr::SHL],
        );
        crypto
            .write(AhbSize::Word, offset::CMD, CMD::SEQSTART::SET.value)
            .unwrap();
        run_to_done(&clock, &mut crypto);
        assert_eq!(
            read_words(&mut crypto, offset::DDATA0, 8),
            bignum::from_be_hex("4").to_vec()
        );
        assert_eq!(
            crypto.read(AhbSize::Word, offset::SEQCTRL).unwrap() & 0x3fff,
            0
        );
    }

    #[test]
    fn test_stop_pauses_and_reports_remaining_length() {
        let clock = Clock::new();
        let mut crypto = Crypto::new(&clock);
        crypto
            .write(AhbSize::Word, offset::SEQCTRL, SEQCTRL::LENGTHA.val(64).value)
            .unwrap();
        load(&mut crypto, &[instr::SELECT, instr::ADD]);
        crypto
            .write(AhbSize::Word, offset::CMD, CMD::SEQSTART::SET.value)
            .unwrap();
        // select (1 tick) + add (2 ticks) per block
        for _ in 0..3 {
            clock.increment_and_poll(1, &mut crypto);
        }
        crypto
            .write(AhbSize::Word, offset::CMD, CMD::SEQSTOP::SET.value)
            .unwrap();
        assert_eq!(crypto.read(AhbSize::Word, offset::STATUS).unwrap() & 1, 0);
        assert_eq!(
            crypto.read(AhbSize::Word, offset::SEQCTRL).unwrap() & 0x3fff,
            48
        );
        assert_eq!(crypto.read(AhbSize::Word, offset::IF).unwrap() & 0x2, 0);

        // Resume runs the remaining three blocks.
        crypto
            .write(AhbSize::Word, offset::CMD, CMD::SEQSTART::SET.value)
            .unwrap();
        run_to_done(&clock, &mut crypto);
        assert_eq!(
            crypto.read(AhbSize::Word, offset::SEQCTRL).unwrap() & 0x3fff,
            0
        );
    }

    #[test]
    fn test_step_executes_one_instruction() {
        let clock = Clock::new();
        let mut crypto = Crypto::new(&clock);
        write_operand(&mut crypto, offset::DATA1, &[7, 0, 0, 0]);
        load(&mut crypto, &[instr::DATA_TO_DATA | (1 << 2), instr::CLR]);
        crypto
            .write(AhbSize::Word, offset::CMD, CMD::SEQSTEP::SET.value)
            .unwrap();
        clock.increment_and_poll(1, &mut crypto);
        let flags = crypto.read(AhbSize::Word, offset::IF).unwrap();
        assert_eq!(flags, 0x1);
        assert_eq!(read_words(&mut crypto, offset::DATA0, 4), vec![7, 0, 0, 0]);
    }

    #[test]
    fn test_stalled_engine_never_finishes() {
        let clock = Clock::new();
        let mut crypto = Crypto::new(&clock);
        crypto.set_stalled(true);
        load(&mut crypto, &[instr::CLR]);
        crypto
            .write(AhbSize::Word, offset::CMD, CMD::SEQSTART::SET.value)
            .unwrap();
        for _ in 0..100 {
            clock.increment_and_poll(1, &mut crypto);
        }
        assert_eq!(crypto.read(AhbSize::Word, offset::STATUS).unwrap() & 1, 1);
        assert_eq!(crypto.read(AhbSize::Word, offset::IF).unwrap(), 0);
    }

    #[test]
    fn test_irq_follows_enable() {
        let clock = Clock::new();
        let mut crypto = Crypto::new(&clock);
        crypto
            .write(AhbSize::Word, offset::IFS, INT::SEQDONE::SET.value)
            .unwrap();
        assert!(!crypto.irq_pending());
        crypto
            .write(AhbSize::Word, offset::IEN, INT::SEQDONE::SET.value)
            .unwrap();
        assert!(crypto.irq_pending());
        crypto
            .write(AhbSize::Word, offset::IFC, INT::SEQDONE::SET.value)
            .unwrap();
        assert!(!crypto.irq_pending());
    }

    #[test]
    fn test_dma_feeds_data1_per_block() {
        let clock = Clock::new();
        let mut crypto = Crypto::new(&clock);
        crypto.attach_dma_input(1, &[1u8; 32]);
        crypto.attach_dma_output(0);
        crypto
            .write(AhbSize::Word, offset::SEQCTRL, SEQCTRL::LENGTHA.val(32).value)
            .unwrap();
        load(&mut crypto, &[instr::DATA_XOR_DATA0 + 1]);
        crypto
            .write(AhbSize::Word, offset::CMD, CMD::SEQSTART::SET.value)
            .unwrap();
        run_to_done(&clock, &mut crypto);
        let out = crypto.dma_output(0);
        assert_eq!(out.len(), 32);
        assert_eq!(&out[..16], &[1u8; 16]);
        assert_eq!(&out[16..], &[0u8; 16]);
    }

    #[test]
    fn test_word_only_registers() {
        let clock = Clock::new();
        let mut crypto = Crypto::new(&clock);
        assert_eq!(
            crypto.read(AhbSize::Byte, offset::CTRL),
            Err(BusError::LoadAccessFault)
        );
        assert_eq!(
            crypto.write(AhbSize::Word, offset::STATUS, 1),
            Err(BusError::StoreAccessFault)
        );
        assert_eq!(crypto.write(AhbSize::Byte, offset::DATA0BYTE, 0xaa), Ok(()));
        assert_eq!(crypto.read(AhbSize::Word, 0x3fc), Err(BusError::LoadAccessFault));
    }
}
