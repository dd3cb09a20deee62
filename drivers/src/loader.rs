/*++

Licensed under the Apache-2.0 license.

File Name:

    loader.rs

Abstract:

    File contains the transfer of sequences into the instruction buffer
    and the iteration registers.

--*/

use crypto_seq_error::{CryptoError, CryptoResult};
use crypto_seq_registers::crypto::{CryptoRegs, SEQCTRL, SEQCTRLB, SEQ_WORDS};
use crypto_seq_registers::Mmio;
use tock_registers::fields::FieldValue;

use crate::config::ExecutionConfig;
use crate::instruction::Instruction;
use crate::sequence::{BlockSize, Iteration, Sequence, MAX_INSTRUCTIONS};

/// Packs a sequence into the SEQ0..SEQ4 words. Slot `n` lands in bits
/// `8 * (n % 4)` of word `n / 4`; unused slots are END.
pub fn pack(sequence: &Sequence) -> [u32; SEQ_WORDS] {
    let mut words = [0u32; SEQ_WORDS];
    for (slot, instruction) in sequence.instructions().iter().enumerate() {
        words[slot / 4] |= (instruction.opcode() as u32) << (8 * (slot % 4));
    }
    words
}

/// Decodes the SEQ0..SEQ4 words up to the first END.
///
/// # Errors
///
/// * `DRIVER_CRYPTO_INVALID_OPCODE` - A slot before END holds no opcode
pub fn unpack(words: &[u32; SEQ_WORDS]) -> CryptoResult<Sequence> {
    let mut opcodes = [0u8; MAX_INSTRUCTIONS];
    for (slot, opcode) in opcodes.iter_mut().enumerate() {
        *opcode = (words[slot / 4] >> (8 * (slot % 4))) as u8;
    }
    Sequence::from_opcodes(&opcodes)
}

/// Every configured DMA channel must move exactly one block per iteration.
///
/// # Errors
///
/// * `DRIVER_CRYPTO_INCOMPATIBLE_CONFIG` - A channel width differs from the
///   sequence block size
pub(crate) fn validate(sequence: &Sequence, config: &ExecutionConfig) -> CryptoResult<()> {
    let block = sequence.iteration().block_size.bytes() as usize;
    if config
        .dma
        .channels
        .iter()
        .flatten()
        .any(|ch| ch.width.bytes() != block)
    {
        return Err(CryptoError::DRIVER_CRYPTO_INCOMPATIBLE_CONFIG);
    }
    Ok(())
}

/// Writes the instruction buffer and the iteration registers. Callers
/// validate first; nothing here can fail.
pub(crate) fn load<M: Mmio>(regs: &CryptoRegs<M>, sequence: &Sequence, config: &ExecutionConfig) {
    for (i, word) in pack(sequence).into_iter().enumerate() {
        regs.write_seq(i, word);
    }
    write_iteration(regs, sequence.iteration(), config);
}

/// Programs SEQCTRL and SEQCTRLB. The engine counts LENGTHA and LENGTHB
/// down as blocks complete, so every fresh start rewrites them.
pub(crate) fn write_iteration<M: Mmio>(
    regs: &CryptoRegs<M>,
    iteration: Iteration,
    config: &ExecutionConfig,
) {
    let mut seqctrl: FieldValue<u32, SEQCTRL::Register> =
        SEQCTRL::LENGTHA.val(iteration.length_a as u32);
    seqctrl += match iteration.block_size {
        BlockSize::Bytes16 => SEQCTRL::BLOCKSIZE::BYTES16,
        BlockSize::Bytes32 => SEQCTRL::BLOCKSIZE::BYTES32,
        BlockSize::Bytes64 => SEQCTRL::BLOCKSIZE::BYTES64,
    };
    let mut seqctrlb: FieldValue<u32, SEQCTRLB::Register> =
        SEQCTRLB::LENGTHB.val(iteration.length_b as u32);

    if let Some(ch) = config.dma.channels[0] {
        seqctrl += SEQCTRL::DMA0SKIP.val(ch.skip as u32)
            + SEQCTRL::DMA0PRESA.val(ch.preserve_a as u32);
        seqctrlb += SEQCTRLB::DMA0PRESB.val(ch.preserve_b as u32);
    }
    if let Some(ch) = config.dma.channels[1] {
        seqctrl += SEQCTRL::DMA1SKIP.val(ch.skip as u32)
            + SEQCTRL::DMA1PRESA.val(ch.preserve_a as u32);
        seqctrlb += SEQCTRLB::DMA1PRESB.val(ch.preserve_b as u32);
    }
    regs.write_seqctrl(seqctrl);
    regs.write_seqctrlb(seqctrlb);
}

/// Reads the loaded program back. The lengths reflect the engine's
/// countdown, so they only match the loaded iteration before a run.
pub(crate) fn read_back<M: Mmio>(regs: &CryptoRegs<M>) -> CryptoResult<Sequence> {
    let mut words = [0u32; SEQ_WORDS];
    for (i, word) in words.iter_mut().enumerate() {
        *word = regs.seq(i);
    }
    let seqctrl = regs.seqctrl();
    let size: Option<SEQCTRL::BLOCKSIZE::Value> = seqctrl.read_as_enum(SEQCTRL::BLOCKSIZE);
    let block_size = match size {
        Some(SEQCTRL::BLOCKSIZE::Value::BYTES32) => BlockSize::Bytes32,
        Some(SEQCTRL::BLOCKSIZE::Value::BYTES64) => BlockSize::Bytes64,
        _ => BlockSize::Bytes16,
    };
    let iteration = Iteration {
        length_a: seqctrl.read(SEQCTRL::LENGTHA) as u16,
        length_b: regs.seqctrlb().read(SEQCTRLB::LENGTHB) as u16,
        block_size,
    };
    Ok(unpack(&words)?.with_iteration(iteration))
}

/// Blocks finished so far, derived from the remaining lengths.
pub(crate) fn completed_blocks<M: Mmio>(regs: &CryptoRegs<M>, iteration: Iteration) -> u32 {
    let bytes = iteration.block_size.bytes() as u32;
    let left_a = regs.seqctrl().read(SEQCTRL::LENGTHA).div_ceil(bytes);
    let left_b = regs.seqctrlb().read(SEQCTRLB::LENGTHB).div_ceil(bytes);
    let done_a = iteration.length_a as u32 / bytes - left_a.min(iteration.length_a as u32 / bytes);
    let done_b = iteration.length_b as u32 / bytes - left_b.min(iteration.length_b as u32 / bytes);
    done_a + done_b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DmaChannel, DmaConfig};
    use crate::operand::Width;
    use crypto_seq_registers::crypto::offset;
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct RegFile {
        regs: RefCell<BTreeMap<u32, u32>>,
    }

    impl Mmio for RegFile {
        fn read_u32(&self, offset: u32) -> u32 {
            self.regs.borrow().get(&offset).copied().unwrap_or(0)
        }

        fn write_u32(&self, offset: u32, val: u32) {
            self.regs.borrow_mut().insert(offset, val);
        }
    }

    fn sequence(opcodes: &[u8], iteration: Iteration) -> Sequence {
        Sequence::from_opcodes(opcodes).unwrap().with_iteration(iteration)
    }

    #[test]
    fn test_pack_layout() {
        let seq = sequence(&[0x01, 0x57, 0x74, 0x7c, 0x80, 0x88], Iteration::default());
        assert_eq!(pack(&seq), [0x7c74_5701, 0x0000_8880, 0, 0, 0]);
        assert_eq!(unpack(&pack(&seq)).unwrap().instructions(), seq.instructions());

        let full = sequence(&[0x70; MAX_INSTRUCTIONS], Iteration::default());
        assert_eq!(pack(&full), [0x7070_7070; SEQ_WORDS]);
        assert_eq!(unpack(&pack(&full)).unwrap().len(), MAX_INSTRUCTIONS);
    }

    #[test]
    fn test_unpack_rejects_garbage() {
        assert_eq!(
            unpack(&[0x0000_0b57, 0, 0, 0, 0]),
            Err(CryptoError::DRIVER_CRYPTO_INVALID_OPCODE)
        );
    }

    #[test]
    fn test_load_programs_iteration() {
        let mmio = RegFile::default();
        let regs = CryptoRegs::new(&mmio);
        let config = ExecutionConfig::new(Width::Single).dma(
            DmaConfig::NONE
                .channel0(DmaChannel::new(Width::Single).preserve(true, false).skip(1))
                .channel1(DmaChannel::new(Width::Single)),
        );
        let seq = sequence(&[0x21, 0x80], Iteration::blocks(BlockSize::Bytes16, 3, 1).unwrap());
        validate(&seq, &config).unwrap();
        load(&regs, &seq, &config);

        let seqctrl = regs.seqctrl();
        assert_eq!(seqctrl.read(SEQCTRL::LENGTHA), 48);
        assert_eq!(seqctrl.read(SEQCTRL::DMA0SKIP), 1);
        assert!(seqctrl.is_set(SEQCTRL::DMA0PRESA));
        assert!(!seqctrl.is_set(SEQCTRL::DMA1PRESA));
        assert_eq!(regs.seqctrlb().read(SEQCTRLB::LENGTHB), 16);
        assert_eq!(mmio.regs.borrow()[&offset::SEQ0], 0x8021);

        let back = read_back(&regs).unwrap();
        assert_eq!(back, seq);
        assert_eq!(completed_blocks(&regs, seq.iteration()), 0);

        regs.write_seqctrl(SEQCTRL::LENGTHA.val(0));
        assert_eq!(completed_blocks(&regs, seq.iteration()), 3);
    }

    #[test]
    fn test_dma_width_must_match_block() {
        let config = ExecutionConfig::new(Width::Double)
            .dma(DmaConfig::NONE.channel1(DmaChannel::new(Width::Double)));
        let seq = sequence(&[0x70], Iteration::single(BlockSize::Bytes16));
        assert_eq!(
            validate(&seq, &config),
            Err(CryptoError::DRIVER_CRYPTO_INCOMPATIBLE_CONFIG)
        );
        validate(&seq.with_iteration(Iteration::single(BlockSize::Bytes32)), &config).unwrap();
    }
}
