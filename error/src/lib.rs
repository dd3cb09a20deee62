/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains the error type shared by the sequencer driver and its
    callers.

--*/
#![cfg_attr(not(any(feature = "std", test)), no_std)]
use core::convert::From;
use core::num::{NonZeroU32, TryFromIntError};

/// Crypto sequencer error type
///
/// Every failure is raised in software; the engine itself only exposes
/// carry, zero, busy and done flags.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(transparent)]
pub struct CryptoError(pub NonZeroU32);

/// Macro to define error constants ensuring uniqueness
///
/// This macro takes a list of (name, value, doc) tuples and generates
/// constant definitions for each error code.
#[macro_export]
macro_rules! define_error_constants {
    ($(($name:ident, $value:expr, $doc:expr)),* $(,)?) => {
        $(
            #[doc = $doc]
            pub const $name: CryptoError = CryptoError::new_const($value);
        )*

        #[cfg(test)]
        /// Returns all defined error constants for the uniqueness test
        pub fn all_constants() -> Vec<(&'static str, u32)> {
            vec![
                $(
                    (stringify!($name), $value),
                )*
            ]
        }
    };
}

impl CryptoError {
    /// Create an error from a const context. Zero is rejected at compile
    /// time; runtime conversions go through `CryptoError::try_from()`.
    const fn new_const(val: u32) -> Self {
        match NonZeroU32::new(val) {
            Some(val) => Self(val),
            None => panic!("CryptoError cannot be 0"),
        }
    }

    define_error_constants![
        (
            DRIVER_CRYPTO_INVALID_WIDTH,
            0x0001_0001,
            "Operand bytes exceed the slot width or the slot does not exist"
        ),
        (
            DRIVER_CRYPTO_SEQUENCE_TOO_LONG,
            0x0001_0002,
            "Sequence needs more than 20 instruction slots"
        ),
        (
            DRIVER_CRYPTO_UNSUPPORTED_OPERATION,
            0x0001_0003,
            "No encoding exists for the request under the current configuration"
        ),
        (
            DRIVER_CRYPTO_INCOMPATIBLE_CONFIG,
            0x0001_0004,
            "Field mode, width and DMA settings are not a supported combination"
        ),
        (
            DRIVER_CRYPTO_CONFIG_LOCKED_WHILE_RUNNING,
            0x0001_0005,
            "Configuration cannot change while a sequence is live"
        ),
        (
            DRIVER_CRYPTO_ALREADY_RUNNING,
            0x0001_0006,
            "A sequence is already executing"
        ),
        (
            DRIVER_CRYPTO_ENGINE_BUSY,
            0x0001_0007,
            "Another session holds the engine"
        ),
        (
            DRIVER_CRYPTO_TIMEOUT,
            0x0001_0008,
            "Engine did not report completion in time"
        ),
        (
            DRIVER_CRYPTO_INVALID_OPCODE,
            0x0001_0009,
            "Opcode outside the instruction table"
        ),
        (
            DRIVER_CRYPTO_NOT_CONFIGURED,
            0x0001_000A,
            "Session used before configure"
        ),
        (
            DRIVER_CRYPTO_SLOT_DMA_OWNED,
            0x0001_000B,
            "Operand slot is owned by a DMA channel"
        ),
        (
            DRIVER_CRYPTO_SESSION_DISCARDED,
            0x0001_000C,
            "Session timed out and must be discarded"
        ),
        (
            DRIVER_CRYPTO_ENGINE_FAULTED,
            0x0001_000D,
            "Engine needs a peripheral reset before reuse"
        ),
        (
            DRIVER_CRYPTO_NOT_RUNNING,
            0x0001_000E,
            "Nothing is executing to wait on"
        ),
        (
            DRIVER_CRYPTO_NO_SEQUENCE_LOADED,
            0x0001_000F,
            "Start requested with an empty instruction buffer"
        ),
    ];
}

impl From<core::num::NonZeroU32> for crate::CryptoError {
    fn from(val: core::num::NonZeroU32) -> Self {
        crate::CryptoError(val)
    }
}

impl From<CryptoError> for core::num::NonZeroU32 {
    fn from(val: CryptoError) -> Self {
        val.0
    }
}

impl From<CryptoError> for u32 {
    fn from(val: CryptoError) -> Self {
        core::num::NonZeroU32::from(val).get()
    }
}

impl TryFrom<u32> for CryptoError {
    type Error = TryFromIntError;
    fn try_from(val: u32) -> Result<Self, TryFromIntError> {
        NonZeroU32::try_from(val).map(CryptoError)
    }
}

pub type CryptoResult<T> = Result<T, CryptoError>;
