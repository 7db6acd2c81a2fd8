//! Trap service routines.
//!
//! The six vectors 0x20-0x25 provide character I/O and HALT. They run
//! natively instead of as LC-3 code in system memory. Unknown vectors do
//! nothing.

use log::info;

use super::execute::{Cpu, CpuState};
use super::memory::{Memory, MEMORY_SIZE};
use super::registers::R7;
use crate::console::{Console, ConsoleError};

const R0: u8 = 0;

const IN_PROMPT: &str = "Enter a character: ";

/// The defined trap vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TrapVector {
    /// Read one key into R0 without echo.
    Getc = 0x20,
    /// Print the character in R0.
    Out = 0x21,
    /// Print the one-char-per-word string at R0.
    Puts = 0x22,
    /// Prompt, read one key with echo into R0, set flags.
    In = 0x23,
    /// Print the two-chars-per-word string at R0.
    Putsp = 0x24,
    /// Stop the machine.
    Halt = 0x25,
}

impl TrapVector {
    pub const ALL: [TrapVector; 6] = [
        TrapVector::Getc,
        TrapVector::Out,
        TrapVector::Puts,
        TrapVector::In,
        TrapVector::Putsp,
        TrapVector::Halt,
    ];

    /// Look up a vector by its 8-bit code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Assembler mnemonic.
    pub const fn name(self) -> &'static str {
        match self {
            TrapVector::Getc => "GETC",
            TrapVector::Out => "OUT",
            TrapVector::Puts => "PUTS",
            TrapVector::In => "IN",
            TrapVector::Putsp => "PUTSP",
            TrapVector::Halt => "HALT",
        }
    }
}

impl<C: Console> Cpu<C> {
    /// Run the service routine for `vector`. R7 has already been saved.
    pub(super) fn trap(&mut self, vector: u8) -> Result<(), ConsoleError> {
        let Some(trap) = TrapVector::from_code(vector) else {
            return Ok(());
        };

        match trap {
            TrapVector::Getc => {
                let key = self.bus.console_mut().read_key()?;
                self.regs.set(R0, key);
            }

            TrapVector::Out => {
                let ch = self.regs.get(R0);
                self.bus.console_mut().write_char(ch)?;
            }

            TrapVector::Puts => {
                let text = string_at(self.bus.memory(), self.regs.get(R0));
                let console = self.bus.console_mut();
                for ch in text {
                    console.write_char(ch)?;
                }
            }

            TrapVector::In => {
                let console = self.bus.console_mut();
                for ch in IN_PROMPT.chars() {
                    console.write_char(ch as u16)?;
                }
                console.write_char(b'\n' as u16)?;
                let key = console.read_key()?;
                console.write_char(key)?;
                self.regs.set_with_flags(R0, key);
            }

            TrapVector::Putsp => {
                let text = string_at(self.bus.memory(), self.regs.get(R0));
                let console = self.bus.console_mut();
                for word in text {
                    console.write_char(word & 0xFF)?;
                    let high = word >> 8;
                    if high != 0 {
                        console.write_char(high)?;
                    }
                }
            }

            TrapVector::Halt => {
                info!("halting at {:#06x}", self.regs.get(R7).wrapping_sub(1));
                self.state = CpuState::Halted;
            }
        }

        self.bus.console_mut().flush()
    }
}

/// Words from `start` up to the first zero word.
///
/// Reads bypass the keyboard registers. A string with no terminator stops
/// after one pass over memory.
fn string_at(mem: &Memory, start: u16) -> Vec<u16> {
    let mut addr = start;
    let mut words = Vec::new();
    for _ in 0..MEMORY_SIZE {
        let word = mem.read(addr);
        if word == 0 {
            break;
        }
        words.push(word);
        addr = addr.wrapping_add(1);
    }
    words
}
