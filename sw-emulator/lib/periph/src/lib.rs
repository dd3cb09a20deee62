/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the emulated CRYPTO sequencer peripheral.

--*/

mod crypto;

pub use crypto::{Crypto, Operand, OperandFile, View, Window};
