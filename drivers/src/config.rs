/*++

Licensed under the Apache-2.0 license.

File Name:

    config.rs

Abstract:

    File contains the execution configuration of the engine and the table
    of supported combinations.

--*/

use crypto_seq_error::{CryptoError, CryptoResult};
use crypto_seq_registers::crypto::{CTRL, WAC};
use tock_registers::fields::FieldValue;

use crate::operand::{OperandSlot, SlotMask, Width};

/// Arithmetic operator class of the field instructions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldOp {
    /// Carry-less arithmetic over a binary polynomial
    Binary,
    /// Integer arithmetic modulo a prime
    Regular,
}

/// Moduli built into the engine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Modulus {
    Bin256,
    Bin128,
    EccBin233P,
    EccBin163P,
    GcmBin128,
    EccPrime256P,
    EccPrime224P,
    EccPrime192P,
    EccBin233N,
    EccBin233KN,
    EccBin163N,
    EccBin163KN,
    EccPrime256N,
    EccPrime224N,
    EccPrime192N,
}

impl Modulus {
    pub const ALL: [Modulus; 15] = [
        Modulus::Bin256,
        Modulus::Bin128,
        Modulus::EccBin233P,
        Modulus::EccBin163P,
        Modulus::GcmBin128,
        Modulus::EccPrime256P,
        Modulus::EccPrime224P,
        Modulus::EccPrime192P,
        Modulus::EccBin233N,
        Modulus::EccBin233KN,
        Modulus::EccBin163N,
        Modulus::EccBin163KN,
        Modulus::EccPrime256N,
        Modulus::EccPrime224N,
        Modulus::EccPrime192N,
    ];

    /// Bit length of the field elements.
    pub const fn bits(self) -> u16 {
        match self {
            Modulus::Bin256 | Modulus::EccPrime256P | Modulus::EccPrime256N => 256,
            Modulus::EccBin233P | Modulus::EccBin233N | Modulus::EccBin233KN => 233,
            Modulus::EccPrime224P | Modulus::EccPrime224N => 224,
            Modulus::EccPrime192P | Modulus::EccPrime192N => 192,
            Modulus::EccBin163P | Modulus::EccBin163N | Modulus::EccBin163KN => 163,
            Modulus::Bin128 | Modulus::GcmBin128 => 128,
        }
    }

    /// Operator class the modulus is defined for. Curve group orders are
    /// primes even on binary curves.
    pub const fn op(self) -> FieldOp {
        match self {
            Modulus::Bin256
            | Modulus::Bin128
            | Modulus::EccBin233P
            | Modulus::EccBin163P
            | Modulus::GcmBin128 => FieldOp::Binary,
            _ => FieldOp::Regular,
        }
    }

    /// Operand width the modulus fits in.
    pub const fn width(self) -> Width {
        if self.bits() <= 128 {
            Width::Single
        } else {
            Width::Double
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FieldMode {
    pub op: FieldOp,
    pub modulus: Modulus,
}

/// Block cipher key width or hash variant.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PrimitiveVariant {
    Aes128,
    Aes256,
    Sha1,
    Sha256,
}

impl PrimitiveVariant {
    /// AES key length in bytes, or `None` for hash variants.
    pub const fn key_len(self) -> Option<usize> {
        match self {
            PrimitiveVariant::Aes128 => Some(16),
            PrimitiveVariant::Aes256 => Some(32),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DmaMode {
    /// Whole operand every block
    #[default]
    Full,
    /// Stops at the remaining phase length
    LenLimit,
    FullByte,
    LenLimitByte,
}

/// Coupling of one DMA request channel. Channel 0 serves DATA0, DDATA0 or
/// QDATA0 and channel 1 serves DATA1, DDATA1 or QDATA1, chosen by width.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DmaChannel {
    pub mode: DmaMode,
    pub width: Width,
    /// Use the big-endian window (DDATA0BIG on channel 0, QDATA1BIG on
    /// channel 1).
    pub big_endian: bool,
    /// Keep the operand instead of reloading it in phase A blocks.
    pub preserve_a: bool,
    pub preserve_b: bool,
    /// Blocks at the start of the sequence the channel does not drain.
    pub skip: u8,
}

impl DmaChannel {
    pub const fn new(width: Width) -> Self {
        Self {
            mode: DmaMode::Full,
            width,
            big_endian: false,
            preserve_a: false,
            preserve_b: false,
            skip: 0,
        }
    }

    pub fn mode(mut self, mode: DmaMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn big_endian(mut self) -> Self {
        self.big_endian = true;
        self
    }

    pub fn preserve(mut self, phase_a: bool, phase_b: bool) -> Self {
        self.preserve_a = phase_a;
        self.preserve_b = phase_b;
        self
    }

    pub fn skip(mut self, blocks: u8) -> Self {
        self.skip = blocks;
        self
    }

    /// Operand slot the channel feeds and drains.
    pub fn slot(&self, channel: usize) -> OperandSlot {
        match (self.width, channel) {
            (Width::Single, 0) => OperandSlot::DATA0,
            (Width::Single, _) => OperandSlot::DATA1,
            (Width::Double, 0) => OperandSlot::DDATA0,
            (Width::Double, _) => OperandSlot::DDATA1,
            (Width::Quad, 0) => OperandSlot::QDATA0,
            (Width::Quad, _) => OperandSlot::QDATA1,
        }
    }

    fn mode_bits(&self) -> u32 {
        match self.mode {
            DmaMode::Full => 0,
            DmaMode::LenLimit => 1,
            DmaMode::FullByte => 2,
            DmaMode::LenLimitByte => 3,
        }
    }

    /// RSEL encoding, or `None` when the channel has no big-endian window
    /// at this width.
    fn rsel(&self, channel: usize) -> Option<u32> {
        match (channel, self.width, self.big_endian) {
            (_, Width::Single, false) => Some(0),
            (_, Width::Double, false) => Some(1),
            (0, Width::Double, true) => Some(2),
            (0, Width::Quad, false) => Some(3),
            (_, Width::Quad, false) => Some(2),
            (1, Width::Quad, true) => Some(3),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DmaConfig {
    pub channels: [Option<DmaChannel>; 2],
}

impl DmaConfig {
    pub const NONE: Self = Self {
        channels: [None, None],
    };

    pub fn channel0(mut self, channel: DmaChannel) -> Self {
        self.channels[0] = Some(channel);
        self
    }

    pub fn channel1(mut self, channel: DmaChannel) -> Self {
        self.channels[1] = Some(channel);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.channels.iter().any(Option::is_some)
    }

    /// Storage the configured channels own while a sequence runs.
    pub fn owned(&self) -> SlotMask {
        self.channels
            .iter()
            .enumerate()
            .filter_map(|(i, ch)| ch.map(|ch| ch.slot(i).storage()))
            .fold(SlotMask::empty(), |acc, m| acc | m)
    }
}

/// How the caller waits for completion. Blocking waits let operand accesses
/// stall the bus while the engine is busy; the other modes set NOBUSYSTALL.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CompletionMode {
    #[default]
    Blocking,
    Polled,
    Interrupt,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResultWidth {
    Bits128,
    Bits256,
    Bits260,
}

/// Everything `Session::configure` programs before a sequence is loaded.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExecutionConfig {
    pub field: Option<FieldMode>,
    pub width: Width,
    pub variant: Option<PrimitiveVariant>,
    pub dma: DmaConfig,
    pub completion: CompletionMode,
    pub result_width: ResultWidth,
}

impl ExecutionConfig {
    /// Plain arithmetic on `width` operands, no field, blocking completion.
    pub const fn new(width: Width) -> Self {
        Self {
            field: None,
            width,
            variant: None,
            dma: DmaConfig::NONE,
            completion: CompletionMode::Blocking,
            result_width: match width {
                Width::Single => ResultWidth::Bits128,
                _ => ResultWidth::Bits256,
            },
        }
    }

    pub fn field(mut self, op: FieldOp, modulus: Modulus) -> Self {
        self.field = Some(FieldMode { op, modulus });
        self
    }

    pub fn variant(mut self, variant: PrimitiveVariant) -> Self {
        self.variant = Some(variant);
        self
    }

    pub fn dma(mut self, dma: DmaConfig) -> Self {
        self.dma = dma;
        self
    }

    pub fn completion(mut self, completion: CompletionMode) -> Self {
        self.completion = completion;
        self
    }

    pub fn result_width(mut self, result_width: ResultWidth) -> Self {
        self.result_width = result_width;
        self
    }

    /// True for the field / width pairs the engine implements.
    pub fn is_supported_field(field: FieldMode, width: Width) -> bool {
        field.op == field.modulus.op() && width == field.modulus.width()
    }

    /// Checks the configuration against the supported combinations.
    ///
    /// # Errors
    ///
    /// * `DRIVER_CRYPTO_INCOMPATIBLE_CONFIG` - The combination is not one
    ///   the engine supports
    pub fn validate(&self) -> CryptoResult<()> {
        let err = Err(CryptoError::DRIVER_CRYPTO_INCOMPATIBLE_CONFIG);
        if let Some(field) = self.field {
            if !Self::is_supported_field(field, self.width) {
                return err;
            }
        }
        let expected_result = match self.width {
            Width::Single => ResultWidth::Bits128,
            _ => ResultWidth::Bits256,
        };
        if self.result_width != expected_result {
            return err;
        }
        let mut owned = SlotMask::empty();
        for (i, ch) in self.dma.channels.iter().enumerate() {
            let Some(ch) = ch else { continue };
            let storage = ch.slot(i).storage();
            if ch.rsel(i).is_none() || ch.skip > 3 || owned.intersects(storage) {
                return err;
            }
            owned |= storage;
        }
        Ok(())
    }

    pub(crate) fn ctrl(&self) -> FieldValue<u32, CTRL::Register> {
        let mut ctrl = match self.variant {
            Some(PrimitiveVariant::Aes256) => CTRL::AES::AES256,
            _ => CTRL::AES::AES128,
        };
        if self.variant == Some(PrimitiveVariant::Sha256) {
            ctrl += CTRL::SHA::SHA2;
        }
        if self.completion != CompletionMode::Blocking {
            ctrl += CTRL::NOBUSYSTALL::SET;
        }
        if let Some(ch) = self.dma.channels[0] {
            ctrl += CTRL::DMA0MODE.val(ch.mode_bits()) + CTRL::DMA0RSEL.val(ch.rsel(0).unwrap_or(0));
        }
        if let Some(ch) = self.dma.channels[1] {
            ctrl += CTRL::DMA1MODE.val(ch.mode_bits()) + CTRL::DMA1RSEL.val(ch.rsel(1).unwrap_or(0));
        }
        ctrl
    }

    pub(crate) fn wac(&self) -> FieldValue<u32, WAC::Register> {
        let mut wac = match self.width {
            Width::Single => WAC::MULWIDTH::MUL128,
            _ => WAC::MULWIDTH::MUL256,
        };
        wac += match self.result_width {
            ResultWidth::Bits128 => WAC::RESULTWIDTH::RESULT128,
            ResultWidth::Bits256 => WAC::RESULTWIDTH::RESULT256,
            ResultWidth::Bits260 => WAC::RESULTWIDTH::RESULT260,
        };
        if let Some(field) = self.field {
            wac += WAC::MODULUS.val(field.modulus as u32);
            wac += match field.op {
                FieldOp::Binary => WAC::MODOP::BINARY,
                FieldOp::Regular => WAC::MODOP::REGULAR,
            };
        }
        wac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Field / width pairs the engine implements, written out by hand.
    const SUPPORTED: [(Modulus, FieldOp, Width); 15] = [
        (Modulus::Bin256, FieldOp::Binary, Width::Double),
        (Modulus::Bin128, FieldOp::Binary, Width::Single),
        (Modulus::EccBin233P, FieldOp::Binary, Width::Double),
        (Modulus::EccBin163P, FieldOp::Binary, Width::Double),
        (Modulus::GcmBin128, FieldOp::Binary, Width::Single),
        (Modulus::EccPrime256P, FieldOp::Regular, Width::Double),
        (Modulus::EccPrime224P, FieldOp::Regular, Width::Double),
        (Modulus::EccPrime192P, FieldOp::Regular, Width::Double),
        (Modulus::EccBin233N, FieldOp::Regular, Width::Double),
        (Modulus::EccBin233KN, FieldOp::Regular, Width::Double),
        (Modulus::EccBin163N, FieldOp::Regular, Width::Double),
        (Modulus::EccBin163KN, FieldOp::Regular, Width::Double),
        (Modulus::EccPrime256N, FieldOp::Regular, Width::Double),
        (Modulus::EccPrime224N, FieldOp::Regular, Width::Double),
        (Modulus::EccPrime192N, FieldOp::Regular, Width::Double),
    ];

    #[test]
    fn test_field_table_is_exhaustive() {
        for modulus in Modulus::ALL {
            for op in [FieldOp::Binary, FieldOp::Regular] {
                for width in Width::ALL {
                    let config = ExecutionConfig::new(width).field(op, modulus);
                    let expected = if SUPPORTED.contains(&(modulus, op, width)) {
                        Ok(())
                    } else {
                        Err(CryptoError::DRIVER_CRYPTO_INCOMPATIBLE_CONFIG)
                    };
                    assert_eq!(config.validate(), expected, "{modulus:?} {op:?} {width:?}");
                }
            }
        }
    }

    #[test]
    fn test_result_width_260_is_rejected() {
        let config = ExecutionConfig::new(Width::Double).result_width(ResultWidth::Bits260);
        assert_eq!(
            config.validate(),
            Err(CryptoError::DRIVER_CRYPTO_INCOMPATIBLE_CONFIG)
        );
    }

    #[test]
    fn test_overlapping_dma_targets() {
        let overlapping = DmaConfig::NONE
            .channel0(DmaChannel::new(Width::Quad))
            .channel1(DmaChannel::new(Width::Single));
        assert_eq!(
            ExecutionConfig::new(Width::Single).dma(overlapping).validate(),
            Err(CryptoError::DRIVER_CRYPTO_INCOMPATIBLE_CONFIG)
        );

        let disjoint = DmaConfig::NONE
            .channel0(DmaChannel::new(Width::Double))
            .channel1(DmaChannel::new(Width::Double));
        assert_eq!(ExecutionConfig::new(Width::Double).dma(disjoint).validate(), Ok(()));
    }

    #[test]
    fn test_big_endian_windows() {
        let ok = DmaConfig::NONE.channel1(DmaChannel::new(Width::Quad).big_endian());
        assert_eq!(ExecutionConfig::new(Width::Double).dma(ok).validate(), Ok(()));
        assert_eq!(
            ExecutionConfig::new(Width::Double).dma(ok).ctrl().value,
            (CTRL::DMA1RSEL::QDATA1BIG).value
        );

        let missing = DmaConfig::NONE.channel1(DmaChannel::new(Width::Double).big_endian());
        assert_eq!(
            ExecutionConfig::new(Width::Double).dma(missing).validate(),
            Err(CryptoError::DRIVER_CRYPTO_INCOMPATIBLE_CONFIG)
        );
    }

    #[test]
    fn test_register_encoding() {
        let config = ExecutionConfig::new(Width::Double)
            .field(FieldOp::Regular, Modulus::EccPrime256P)
            .variant(PrimitiveVariant::Sha256)
            .completion(CompletionMode::Polled);
        assert_eq!(config.ctrl().value, (CTRL::SHA::SHA2 + CTRL::NOBUSYSTALL::SET).value);
        assert_eq!(
            config.wac().value,
            (WAC::MODULUS::ECCPRIME256P + WAC::MODOP::REGULAR + WAC::MULWIDTH::MUL256).value
        );
    }
}
