// Licensed under the Apache-2.0 license

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use crypto_seq_emu_bus::testing::FakeBus;
use crypto_seq_hw_model::{BusMmio, SharedModel};
use crypto_seq_lib::{
    BlockSize, CompletionMode, CryptoError, DDataReg, DmaChannel, DmaConfig, Endianness,
    ExecutionConfig, FieldOp, Instruction, Iteration, Modulus, OperandSlot, PrimitiveVariant,
    Request, Sequence, Sequencer, SessionState, ShiftDirection, Width, SHA256_INITIAL_STATE,
};
use sha2::{Digest, Sha256};

const POLLS: u32 = 10_000;

fn emulated() -> (SharedModel, Sequencer<BusMmio<SharedModel>>) {
    let model = SharedModel::new();
    let sequencer = Sequencer::new(model.mmio());
    (model, sequencer)
}

fn sha256_pad(msg: &[u8]) -> Vec<u8> {
    let mut padded = msg.to_vec();
    padded.push(0x80);
    while padded.len() % 64 != 56 {
        padded.push(0);
    }
    padded.extend_from_slice(&(msg.len() as u64 * 8).to_be_bytes());
    padded
}

fn aes128_encrypt(key: &[u8; 16], block: &[u8; 16]) -> [u8; 16] {
    let cipher = aes::Aes128::new(GenericArray::from_slice(key));
    let mut out = GenericArray::clone_from_slice(block);
    cipher.encrypt_block(&mut out);
    out.into()
}

#[test]
fn test_aes128_block() {
    let key: [u8; 16] = core::array::from_fn(|i| i as u8);
    let plaintext: [u8; 16] = core::array::from_fn(|i| (i as u8) * 0x11);
    let expected = [
        0x69, 0xc4, 0xe0, 0xd8, 0x6a, 0x7b, 0x04, 0x30, 0xd8, 0xcd, 0xb7, 0x80, 0x70, 0xb4, 0xc5,
        0x5a,
    ];
    assert_eq!(aes128_encrypt(&key, &plaintext), expected);

    let (_model, sequencer) = emulated();
    {
        let mut session = sequencer.session();
        session
            .configure(
                ExecutionConfig::new(Width::Single)
                    .field(FieldOp::Binary, Modulus::Bin128)
                    .variant(PrimitiveVariant::Aes128),
            )
            .unwrap();
        session.write_key(&key).unwrap();
        session
            .write_operand(OperandSlot::DATA1, &plaintext, Endianness::Little)
            .unwrap();
        let seq = session.encode(&Request::AesEncryptBlock).unwrap();
        session.load(&seq).unwrap();
        assert_eq!(session.loaded_sequence().unwrap(), seq);
        session.start().unwrap();
        assert_eq!(session.state(), SessionState::Running);
        let status = session.wait_blocking(POLLS).unwrap();
        assert!(status.sequence_done);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(
            &session
                .read_operand(OperandSlot::DATA0, Endianness::Little)
                .unwrap()[..],
            &expected
        );
    }

    // Dropping the session zeroized the engine.
    let mut session = sequencer.session();
    session.configure(ExecutionConfig::new(Width::Double)).unwrap();
    for slot in [OperandSlot::DDATA0, OperandSlot::DDATA1] {
        let bytes = session.read_operand(slot, Endianness::Little).unwrap();
        assert!(bytes.iter().all(|b| *b == 0));
    }
}

#[test]
fn test_p256_mod_add_reduces_with_carry() {
    let p: [u8; 32] = [
        0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0xff,
    ];
    let mut p_minus_1 = p;
    p_minus_1[31] -= 1;
    let mut five = [0u8; 32];
    five[31] = 5;

    let (_model, sequencer) = emulated();
    let mut session = sequencer.session();
    session
        .configure(ExecutionConfig::new(Width::Double).field(FieldOp::Regular, Modulus::EccPrime256P))
        .unwrap();
    session
        .write_operand(OperandSlot::DDATA1, &p_minus_1, Endianness::Big)
        .unwrap();
    session
        .write_operand(OperandSlot::DDATA2, &five, Endianness::Big)
        .unwrap();
    let seq = session.encode(&Request::ModAdd).unwrap();
    session.load(&seq).unwrap();
    session.start().unwrap();
    let status = session.wait_blocking(POLLS).unwrap();
    assert!(status.carry);

    let mut four = [0u8; 32];
    four[31] = 4;
    assert_eq!(
        &session
            .read_operand(OperandSlot::DDATA0, Endianness::Big)
            .unwrap()[..],
        &four
    );
}

#[test]
fn test_rejected_program_writes_nothing() {
    let bus = FakeBus::new();
    let log = bus.log.clone();
    let sequencer = Sequencer::new(BusMmio::new(bus));
    let mut session = sequencer.session();
    session.configure(ExecutionConfig::new(Width::Double)).unwrap();
    let writes = log.count("write(");
    assert_eq!(writes, 2);

    let single = Iteration::single(BlockSize::Bytes16);
    assert_eq!(
        session.load_opcodes(&[0x70; 21], single),
        Err(CryptoError::DRIVER_CRYPTO_SEQUENCE_TOO_LONG)
    );
    assert_eq!(
        session.load_opcodes(&[0x57, 0x0b, 0x70], single),
        Err(CryptoError::DRIVER_CRYPTO_INVALID_OPCODE)
    );
    assert_eq!(
        session.load_opcodes(&[], single),
        Err(CryptoError::DRIVER_CRYPTO_NO_SEQUENCE_LOADED)
    );
    assert_eq!(log.count("write("), writes);
    assert_eq!(
        session.loaded_sequence(),
        Err(CryptoError::DRIVER_CRYPTO_NO_SEQUENCE_LOADED)
    );

    // A DMA channel wider than the block is caught before the buffer is touched.
    session
        .configure(
            ExecutionConfig::new(Width::Double)
                .dma(DmaConfig::NONE.channel1(DmaChannel::new(Width::Double))),
        )
        .unwrap();
    let writes = log.count("write(");
    assert_eq!(
        session.load_opcodes(&[0x57, 0x70], single),
        Err(CryptoError::DRIVER_CRYPTO_INCOMPATIBLE_CONFIG)
    );
    assert_eq!(log.count("write("), writes);

    session
        .load_opcodes(&[0x57, 0x70], Iteration::single(BlockSize::Bytes32))
        .unwrap();
    assert!(log.count("write(") > writes);
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn test_stalled_engine_times_out_and_poisons() {
    let (model, sequencer) = emulated();
    model.with(|m| m.crypto_mut().set_stalled(true));
    {
        let mut session = sequencer.session();
        session.configure(ExecutionConfig::new(Width::Double)).unwrap();
        let seq = session.encode(&Request::Add).unwrap();
        session.load(&seq).unwrap();
        session.start().unwrap();
        assert_eq!(
            session.wait_blocking(100),
            Err(CryptoError::DRIVER_CRYPTO_TIMEOUT)
        );
        assert_eq!(session.state(), SessionState::Discarded);
        assert_eq!(
            session.halt(),
            Err(CryptoError::DRIVER_CRYPTO_SESSION_DISCARDED)
        );
    }

    let mut session = sequencer.session();
    assert_eq!(
        session.configure(ExecutionConfig::new(Width::Double)),
        Err(CryptoError::DRIVER_CRYPTO_ENGINE_FAULTED)
    );
    drop(session);

    model.with(|m| m.reset());
    assert!(sequencer.recover());

    let mut session = sequencer.session();
    session.configure(ExecutionConfig::new(Width::Double)).unwrap();
    session
        .write_operand(OperandSlot::DDATA1, &[7], Endianness::Little)
        .unwrap();
    session
        .write_operand(OperandSlot::DDATA2, &[8], Endianness::Little)
        .unwrap();
    let seq = session.encode(&Request::Add).unwrap();
    session.load(&seq).unwrap();
    session.start().unwrap();
    session.wait_blocking(POLLS).unwrap();
    assert_eq!(
        session
            .read_operand(OperandSlot::DDATA0, Endianness::Little)
            .unwrap()[0],
        15
    );
}

#[test]
fn test_sha256_single_block() {
    let (_model, sequencer) = emulated();
    let mut session = sequencer.session();
    session
        .configure(ExecutionConfig::new(Width::Double).variant(PrimitiveVariant::Sha256))
        .unwrap();
    session
        .write_operand(OperandSlot::DDATA0, &SHA256_INITIAL_STATE, Endianness::Big)
        .unwrap();
    session
        .write_operand(OperandSlot::QDATA1, &sha256_pad(b"abc"), Endianness::Big)
        .unwrap();
    let seq = session.encode(&Request::ShaCompress { blocks: 1 }).unwrap();
    session.load(&seq).unwrap();
    session.start().unwrap();
    session.wait_blocking(POLLS).unwrap();

    let digest = session
        .read_operand(OperandSlot::DDATA0, Endianness::Big)
        .unwrap();
    assert_eq!(&digest[..], Sha256::digest(b"abc").as_slice());
}

#[test]
fn test_sha256_streams_blocks_through_dma() {
    let msg = b"abcdbcdecdefdefgefghfghighijhijkijkljklmmnlmnomnopnopq";
    let padded = sha256_pad(msg);
    assert_eq!(padded.len(), 128);

    let (model, sequencer) = emulated();
    let mut session = sequencer.session();
    session
        .configure(
            ExecutionConfig::new(Width::Double)
                .variant(PrimitiveVariant::Sha256)
                .dma(DmaConfig::NONE.channel1(DmaChannel::new(Width::Quad).big_endian())),
        )
        .unwrap();
    session
        .write_operand(OperandSlot::DDATA0, &SHA256_INITIAL_STATE, Endianness::Big)
        .unwrap();
    let seq = session.encode(&Request::ShaCompress { blocks: 2 }).unwrap();
    session.load(&seq).unwrap();
    model.with(|m| m.crypto_mut().attach_dma_input(1, &padded));
    session.start().unwrap();
    assert_eq!(
        session.write_operand(OperandSlot::QDATA1, &[0], Endianness::Big),
        Err(CryptoError::DRIVER_CRYPTO_SLOT_DMA_OWNED)
    );
    assert_eq!(
        session.write_operand(OperandSlot::DDATA4, &[0], Endianness::Little),
        Err(CryptoError::DRIVER_CRYPTO_SLOT_DMA_OWNED)
    );
    session.wait_blocking(POLLS).unwrap();

    let digest = session
        .read_operand(OperandSlot::DDATA0, Endianness::Big)
        .unwrap();
    assert_eq!(&digest[..], Sha256::digest(msg).as_slice());
    assert_eq!(digest[..4], [0x24, 0x8d, 0x6a, 0x61]);
}

#[test]
fn test_aes_cbc_matches_software() {
    let key = [0x2b; 16];
    let iv: [u8; 16] = core::array::from_fn(|i| 0xf0 ^ i as u8);
    let plaintext: Vec<u8> = (0..64u8).map(|b| b.wrapping_mul(37)).collect();

    let mut expected = Vec::new();
    let mut chain = iv;
    for block in plaintext.chunks_exact(16) {
        let mixed: [u8; 16] = core::array::from_fn(|i| block[i] ^ chain[i]);
        chain = aes128_encrypt(&key, &mixed);
        expected.extend_from_slice(&chain);
    }

    let (model, sequencer) = emulated();
    let mut session = sequencer.session();
    session
        .configure(
            ExecutionConfig::new(Width::Single)
                .variant(PrimitiveVariant::Aes128)
                .dma(
                    DmaConfig::NONE
                        .channel0(DmaChannel::new(Width::Single).preserve(true, false))
                        .channel1(DmaChannel::new(Width::Single)),
                ),
        )
        .unwrap();
    session.write_key(&key).unwrap();
    session
        .write_operand(OperandSlot::DATA0, &iv, Endianness::Little)
        .unwrap();
    let seq = session
        .encode(&Request::AesCbcEncrypt { blocks: 4 })
        .unwrap();
    session.load(&seq).unwrap();
    model.with(|m| {
        m.crypto_mut().attach_dma_input(1, &plaintext);
        m.crypto_mut().attach_dma_output(0);
    });
    session.start().unwrap();
    session.wait_blocking(POLLS).unwrap();

    model.with(|m| assert_eq!(m.crypto().dma_output(0), &expected[..]));
}

#[test]
fn test_halt_resume_and_acknowledge() {
    let (model, sequencer) = emulated();
    let mut session = sequencer.session();
    let config = ExecutionConfig::new(Width::Double);
    session.configure(config).unwrap();
    let seq = session
        .encode(&Request::ShiftUntilLastBlock {
            direction: ShiftDirection::Left,
            blocks: 8,
        })
        .unwrap();
    session.load(&seq).unwrap();

    // Halt part way, then resume to the end.
    session
        .write_operand(OperandSlot::DDATA0, &[1], Endianness::Little)
        .unwrap();
    session.start().unwrap();
    model.with(|m| {
        for _ in 0..12 {
            m.step();
        }
    });
    session.halt().unwrap();
    session.halt().unwrap();
    assert_eq!(session.state(), SessionState::Halted);
    assert_eq!(
        session.configure(config),
        Err(CryptoError::DRIVER_CRYPTO_CONFIG_LOCKED_WHILE_RUNNING)
    );
    assert_eq!(session.load(&seq), Err(CryptoError::DRIVER_CRYPTO_ALREADY_RUNNING));
    session.start().unwrap();
    session.wait_blocking(POLLS).unwrap();
    let result = session
        .read_operand(OperandSlot::DDATA0, Endianness::Little)
        .unwrap();
    assert_eq!(result[0], 0x80);

    // Halt part way and give up.
    session.start().unwrap();
    model.with(|m| {
        for _ in 0..12 {
            m.step();
        }
    });
    session.halt().unwrap();
    let completed = session.acknowledge().unwrap();
    assert!(completed > 0 && completed < 8, "completed {completed}");
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.halt(), Ok(()));
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn test_single_step() {
    let (_model, sequencer) = emulated();
    let mut session = sequencer.session();
    session.configure(ExecutionConfig::new(Width::Double)).unwrap();
    session
        .write_operand(OperandSlot::DDATA0, &[1], Endianness::Little)
        .unwrap();
    let seq = session
        .encode(&Request::ShiftUntilLastBlock {
            direction: ShiftDirection::Left,
            blocks: 2,
        })
        .unwrap();
    session.load(&seq).unwrap();

    // Three instructions in each of two blocks.
    for _ in 0..5 {
        session.step().unwrap();
        let status = session.wait_blocking(POLLS).unwrap();
        assert!(status.instruction_done);
        assert!(!status.sequence_done);
        assert_eq!(session.state(), SessionState::Running);
    }
    assert_eq!(session.start(), Err(CryptoError::DRIVER_CRYPTO_ALREADY_RUNNING));
    session.step().unwrap();
    let status = session.wait_blocking(POLLS).unwrap();
    assert!(status.sequence_done);
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(
        session
            .read_operand(OperandSlot::DDATA0, Endianness::Little)
            .unwrap()[0],
        2
    );
}

#[test]
fn test_execute_single_instructions() {
    let (_model, sequencer) = emulated();
    let mut session = sequencer.session();
    session.configure(ExecutionConfig::new(Width::Double)).unwrap();
    session
        .write_operand(OperandSlot::DDATA1, &[0xff, 0xff, 0xff, 0xff], Endianness::Little)
        .unwrap();
    session
        .write_operand(OperandSlot::DDATA2, &[1], Endianness::Little)
        .unwrap();
    session
        .execute(Instruction::Select {
            a: DDataReg::DData1,
            b: DDataReg::DData2,
        })
        .unwrap();
    let status = session.execute(Instruction::Add).unwrap();
    assert!(!status.carry);
    let sum = session
        .read_operand(OperandSlot::DDATA0, Endianness::Little)
        .unwrap();
    assert_eq!(sum[..5], [0, 0, 0, 0, 1]);

    assert_eq!(
        session.execute(Instruction::MAdd),
        Err(CryptoError::DRIVER_CRYPTO_UNSUPPORTED_OPERATION)
    );
    assert_eq!(
        session.execute(Instruction::Exec(crypto_seq_lib::Condition::IfCarry)),
        Err(CryptoError::DRIVER_CRYPTO_UNSUPPORTED_OPERATION)
    );
}

#[test]
fn test_sum_difference_phases() {
    let (_model, sequencer) = emulated();
    let mut session = sequencer.session();
    session.configure(ExecutionConfig::new(Width::Double)).unwrap();
    session
        .write_operand(OperandSlot::DDATA0, &[100], Endianness::Little)
        .unwrap();
    session
        .write_operand(OperandSlot::DDATA1, &[3], Endianness::Little)
        .unwrap();
    let seq = session
        .encode(&Request::SumDifference {
            blocks_a: 4,
            blocks_b: 2,
        })
        .unwrap();
    session.load(&seq).unwrap();
    session.start().unwrap();
    session.wait_blocking(POLLS).unwrap();
    // 100 + 4 * 3 - 2 * 3
    assert_eq!(
        session
            .read_operand(OperandSlot::DDATA0, Endianness::Little)
            .unwrap()[0],
        106
    );
}

#[test]
fn test_halt_after_completion_finishes_instead() {
    let (model, sequencer) = emulated();
    let mut session = sequencer.session();
    session.configure(ExecutionConfig::new(Width::Double)).unwrap();
    session
        .write_operand(OperandSlot::DDATA0, &[10], Endianness::Little)
        .unwrap();
    session
        .write_operand(OperandSlot::DDATA1, &[1], Endianness::Little)
        .unwrap();
    let mut builder = Sequence::builder();
    builder
        .push(Instruction::Select {
            a: DDataReg::DData0,
            b: DDataReg::DData1,
        })
        .unwrap()
        .push(Instruction::Add)
        .unwrap();
    let seq = session.encode(&Request::Custom(builder.build())).unwrap();
    session.load(&seq).unwrap();
    session.start().unwrap();

    // The engine finishes before anyone waits for it.
    model.with(|m| {
        for _ in 0..200 {
            m.step();
        }
    });
    session.halt().unwrap();
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(
        session.acknowledge(),
        Err(CryptoError::DRIVER_CRYPTO_NOT_RUNNING)
    );
    assert_eq!(
        session
            .read_operand(OperandSlot::DDATA0, Endianness::Little)
            .unwrap()[0],
        11
    );

    // Starting again is a fresh run of the whole program.
    session.start().unwrap();
    let status = session.wait_blocking(POLLS).unwrap();
    assert!(status.sequence_done);
    assert_eq!(
        session
            .read_operand(OperandSlot::DDATA0, Endianness::Little)
            .unwrap()[0],
        12
    );
}

#[test]
fn test_p224_mod_add_with_natural_length_operands() {
    let p: [u8; 28] = [
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
    ];
    let mut p_minus_1 = p;
    p_minus_1[27] -= 1;

    let (_model, sequencer) = emulated();
    let mut session = sequencer.session();
    session
        .configure(ExecutionConfig::new(Width::Double).field(FieldOp::Regular, Modulus::EccPrime224P))
        .unwrap();
    session
        .write_operand(OperandSlot::DDATA1, &p_minus_1, Endianness::Big)
        .unwrap();
    session
        .write_operand(OperandSlot::DDATA2, &[5], Endianness::Big)
        .unwrap();
    let stored = session
        .read_operand(OperandSlot::DDATA1, Endianness::Big)
        .unwrap();
    assert_eq!(&stored[..4], &[0; 4]);
    assert_eq!(&stored[4..], &p_minus_1);

    let seq = session.encode(&Request::ModAdd).unwrap();
    session.load(&seq).unwrap();
    session.start().unwrap();
    session.wait_blocking(POLLS).unwrap();

    let mut four = [0u8; 32];
    four[31] = 4;
    assert_eq!(
        &session
            .read_operand(OperandSlot::DDATA0, Endianness::Big)
            .unwrap()[..],
        &four
    );
}

#[test]
fn test_operand_writes_refused_while_running_without_stalls() {
    let (_model, sequencer) = emulated();
    let mut session = sequencer.session();
    session
        .configure(ExecutionConfig::new(Width::Double).completion(CompletionMode::Polled))
        .unwrap();
    session
        .write_operand(OperandSlot::DDATA0, &[1], Endianness::Little)
        .unwrap();
    let seq = session
        .encode(&Request::ShiftUntilLastBlock {
            direction: ShiftDirection::Left,
            blocks: 8,
        })
        .unwrap();
    session.load(&seq).unwrap();
    session.start().unwrap();

    assert_eq!(
        session.write_operand(OperandSlot::DDATA3, &[5], Endianness::Little),
        Err(CryptoError::DRIVER_CRYPTO_ALREADY_RUNNING)
    );
    assert_eq!(
        session.write_operand_xor(OperandSlot::DDATA3, &[5]),
        Err(CryptoError::DRIVER_CRYPTO_ALREADY_RUNNING)
    );

    let mut polls = 0;
    while session.state() == SessionState::Running {
        session.poll_nonblocking().unwrap();
        polls += 1;
        assert!(polls < POLLS);
    }
    session
        .write_operand(OperandSlot::DDATA3, &[5], Endianness::Little)
        .unwrap();
    assert_eq!(
        session
            .read_operand(OperandSlot::DDATA3, Endianness::Little)
            .unwrap()[0],
        5
    );
    assert_eq!(
        session
            .read_operand(OperandSlot::DDATA0, Endianness::Little)
            .unwrap()[0],
        0x80
    );
}
