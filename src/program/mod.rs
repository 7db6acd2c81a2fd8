//! Program images and tooling around them.
//!
//! This module provides:
//! - The object image loader (big-endian origin word, then words)
//! - A disassembler (words -> readable text)

pub mod disasm;
pub mod image;

pub use disasm::disassemble;
pub use image::{load_image, ImageError, ProgramImage};
