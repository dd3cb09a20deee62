// Licensed under the Apache-2.0 license

pub mod mmio;
mod model_emulated;

pub use mmio::BusMmio;
pub use model_emulated::{ModelEmulated, SharedModel};
