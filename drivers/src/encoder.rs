/*++

Licensed under the Apache-2.0 license.

File Name:

    encoder.rs

Abstract:

    File contains the translation of high level requests into sequencer
    programs.

--*/

use crypto_seq_error::{CryptoError, CryptoResult};

use crate::config::{ExecutionConfig, PrimitiveVariant};
use crate::instruction::{Condition, DDataReg, DataReg, Instruction};
use crate::operand::Width;
use crate::sequence::{BlockSize, Iteration, Sequence, SequenceBuilder};

/// SHA-256 initial hash value, most significant byte first. Load it into
/// DDATA0 with [`crate::Endianness::Big`] before the first compression.
pub const SHA256_INITIAL_STATE: [u8; 32] = [
    0x6a, 0x09, 0xe6, 0x67, 0xbb, 0x67, 0xae, 0x85, 0x3c, 0x6e, 0xf3, 0x72, 0xa5, 0x4f, 0xf5, 0x3a,
    0x51, 0x0e, 0x52, 0x7f, 0x9b, 0x05, 0x68, 0x8c, 0x1f, 0x83, 0xd9, 0xab, 0x5b, 0xe0, 0xcd, 0x19,
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ShiftDirection {
    Left,
    Right,
}

/// Operations the encoder knows how to express as a sequence.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Request {
    /// DATA0 = AES(DATA1)
    AesEncryptBlock,
    /// DATA0 = AES^-1(DATA1)
    AesDecryptBlock,
    /// CBC encryption of `blocks` blocks streamed through DMA channel 1.
    /// DATA0 holds the IV on entry and each ciphertext block on exit.
    AesCbcEncrypt { blocks: u16 },
    /// DDATA0 = DDATA1 + DDATA2
    Add,
    Sub,
    Mul,
    /// DDATA0 = DDATA1 + DDATA2 reduced by the configured modulus
    ModAdd,
    ModSub,
    ModMul,
    /// Compresses `blocks` message blocks into the DDATA0 state. More than
    /// one block needs DMA channel 1 feeding QDATA1 big-endian.
    ShaCompress { blocks: u16 },
    /// Shifts DDATA0 by one bit in every block but the last.
    ShiftUntilLastBlock { direction: ShiftDirection, blocks: u16 },
    /// DDATA0 += DDATA1 in each phase A block, DDATA0 -= DDATA1 in each
    /// phase B block.
    SumDifference { blocks_a: u16, blocks_b: u16 },
    /// A caller-assembled sequence, checked against the configuration.
    Custom(Sequence),
}

/// Checks that `instruction` can run under `config`.
///
/// # Errors
///
/// * `DRIVER_CRYPTO_UNSUPPORTED_OPERATION` - Modular arithmetic without a
///   field, or a primitive the configured variant does not provide
pub(crate) fn check_instruction(
    instruction: Instruction,
    config: &ExecutionConfig,
) -> CryptoResult<()> {
    let supported = if instruction.is_modular() {
        config.field.is_some()
    } else if instruction.is_aes() {
        is_aes(config)
    } else if instruction == Instruction::Sha {
        matches!(
            config.variant,
            Some(PrimitiveVariant::Sha1 | PrimitiveVariant::Sha256)
        )
    } else {
        true
    };
    if !supported {
        return Err(CryptoError::DRIVER_CRYPTO_UNSUPPORTED_OPERATION);
    }
    Ok(())
}

fn is_aes(config: &ExecutionConfig) -> bool {
    matches!(
        config.variant,
        Some(PrimitiveVariant::Aes128 | PrimitiveVariant::Aes256)
    )
}

fn unsupported<T>() -> CryptoResult<T> {
    Err(CryptoError::DRIVER_CRYPTO_UNSUPPORTED_OPERATION)
}

/// Block size of a sequence that does not iterate: the width of the first
/// DMA channel, so a configured channel moves exactly one operand.
fn single_block(config: &ExecutionConfig) -> BlockSize {
    config
        .dma
        .channels
        .iter()
        .flatten()
        .next()
        .and_then(|ch| BlockSize::from_bytes(ch.width.bytes()))
        .unwrap_or_default()
}

fn program(instructions: &[Instruction], iteration: Iteration) -> CryptoResult<Sequence> {
    let mut builder = SequenceBuilder::default();
    builder
        .extend(instructions.iter().copied())?
        .iteration(iteration);
    Ok(builder.build())
}

fn arithmetic(op: Instruction, config: &ExecutionConfig) -> CryptoResult<Sequence> {
    if config.width == Width::Quad {
        return unsupported();
    }
    check_instruction(op, config)?;
    let select = Instruction::Select {
        a: DDataReg::DData1,
        b: DDataReg::DData2,
    };
    program(&[select, op], Iteration::single(single_block(config)))
}

fn aes_block(op: Instruction, config: &ExecutionConfig) -> CryptoResult<Sequence> {
    check_instruction(op, config)?;
    let load = Instruction::DataToData {
        src: DataReg::Data1,
        dst: DataReg::Data0,
    };
    program(&[load, op], Iteration::single(single_block(config)))
}

fn aes_cbc(blocks: u16, config: &ExecutionConfig) -> CryptoResult<Sequence> {
    check_instruction(Instruction::AesEnc, config)?;
    let [Some(out), Some(input)] = config.dma.channels else {
        return unsupported();
    };
    if out.width != Width::Single || input.width != Width::Single || !out.preserve_a {
        return unsupported();
    }
    program(
        &[
            Instruction::XorData0 { src: DataReg::Data1 },
            Instruction::AesEnc,
        ],
        Iteration::blocks(BlockSize::Bytes16, blocks, 0)?,
    )
}

fn sha(blocks: u16, config: &ExecutionConfig) -> CryptoResult<Sequence> {
    check_instruction(Instruction::Sha, config)?;
    if blocks > 1 {
        match config.dma.channels[1] {
            Some(ch) if ch.width == Width::Quad && ch.big_endian => {}
            _ => return unsupported(),
        }
    }
    program(
        &[Instruction::Sha],
        Iteration::blocks(BlockSize::Bytes64, blocks, 0)?,
    )
}

fn shift(
    direction: ShiftDirection,
    blocks: u16,
    config: &ExecutionConfig,
) -> CryptoResult<Sequence> {
    let op = match direction {
        ShiftDirection::Left => Instruction::Shl,
        ShiftDirection::Right => Instruction::Shr,
    };
    program(
        &[
            Instruction::Exec(Condition::IfNotLast),
            Instruction::Select {
                a: DDataReg::DData0,
                b: DDataReg::DData0,
            },
            op,
        ],
        Iteration::blocks(single_block(config), blocks, 0)?,
    )
}

fn sum_difference(
    blocks_a: u16,
    blocks_b: u16,
    config: &ExecutionConfig,
) -> CryptoResult<Sequence> {
    if config.width == Width::Quad {
        return unsupported();
    }
    program(
        &[
            Instruction::Select {
                a: DDataReg::DData0,
                b: DDataReg::DData1,
            },
            Instruction::Exec(Condition::IfA),
            Instruction::Add,
            Instruction::Exec(Condition::IfB),
            Instruction::Sub,
        ],
        Iteration::blocks(single_block(config), blocks_a, blocks_b)?,
    )
}

/// Produces the sequence that carries out `request` under `config`. Data
/// movement always precedes the instruction that consumes it.
///
/// # Errors
///
/// * `DRIVER_CRYPTO_UNSUPPORTED_OPERATION` - The request has no encoding
///   under this configuration
/// * `DRIVER_CRYPTO_SEQUENCE_TOO_LONG` - The encoding exceeds the
///   instruction buffer
pub fn encode(request: &Request, config: &ExecutionConfig) -> CryptoResult<Sequence> {
    match request {
        Request::AesEncryptBlock => aes_block(Instruction::AesEnc, config),
        Request::AesDecryptBlock => aes_block(Instruction::AesDec, config),
        Request::AesCbcEncrypt { blocks } => aes_cbc(*blocks, config),
        Request::Add => arithmetic(Instruction::Add, config),
        Request::Sub => arithmetic(Instruction::Sub, config),
        Request::Mul => arithmetic(Instruction::Mul, config),
        Request::ModAdd => arithmetic(Instruction::MAdd, config),
        Request::ModSub => arithmetic(Instruction::MSub, config),
        Request::ModMul => arithmetic(Instruction::MMul, config),
        Request::ShaCompress { blocks } => sha(*blocks, config),
        Request::ShiftUntilLastBlock { direction, blocks } => shift(*direction, *blocks, config),
        Request::SumDifference { blocks_a, blocks_b } => {
            sum_difference(*blocks_a, *blocks_b, config)
        }
        Request::Custom(sequence) => {
            for instruction in sequence.instructions() {
                check_instruction(*instruction, config)?;
            }
            Ok(sequence.clone())
        }
    }
}
