//! CPU emulation for the LC-3.
//!
//! This module implements the complete LC-3 user-mode architecture:
//! - 65,536 sixteen-bit words, with a memory-mapped keyboard
//! - 8 general-purpose registers, PC and condition flags
//! - 16 opcodes and 6 native trap routines

pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;
pub mod trap;

pub use memory::{Bus, Memory, MemoryError};
pub use registers::{CondFlag, Registers, sign_extend};
pub use decode::{Instruction, Operand, decode, encode};
pub use execute::{Cpu, CpuError, CpuState, Snapshot, PC_START};
pub use trap::TrapVector;
