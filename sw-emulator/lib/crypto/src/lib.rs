/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the emulator crypto library.

--*/

mod aes;
pub mod bignum;
pub mod moduli;
mod sha256;

pub use crate::aes::{aes_decrypt_block, aes_encrypt_block, AesKey};
pub use crate::sha256::{sha256_compress, SHA256_BLOCK_SIZE, SHA256_IV};
