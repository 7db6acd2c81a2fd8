//! # LC-3 Emulator
//!
//! An instruction-set simulator for the LC-3, a 16-bit educational
//! computer with eight registers, a single address space of 65,536 words
//! and a memory-mapped keyboard.
//!
//! The CPU is generic over a [`Console`], so programs can run against the
//! real terminal or against a scripted [`BufferConsole`].

pub mod console;
pub mod cpu;
pub mod program;

// Re-export commonly used types
pub use console::{BufferConsole, Console, ConsoleError};
pub use cpu::{Cpu, CpuError, CpuState, Instruction, Memory, Registers, PC_START};
pub use program::{disassemble, load_image, ImageError, ProgramImage};

#[cfg(feature = "terminal")]
pub use console::TerminalConsole;
