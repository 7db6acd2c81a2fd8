//! Memory subsystem.
//!
//! The LC-3 addresses 65,536 sixteen-bit words. Two addresses near the top
//! of the space are keyboard device registers rather than storage; the
//! [`Bus`] intercepts reads of those and consults the console.

use thiserror::Error;

use crate::console::{Console, ConsoleError};

/// The number of addressable words.
pub const MEMORY_SIZE: usize = 1 << 16;

/// Keyboard status register. Bit 15 is set when a key is ready.
pub const KBSR: u16 = 0xFE00;

/// Keyboard data register. Holds the code of the last key reported by [`KBSR`].
pub const KBDR: u16 = 0xFE02;

const KBSR_READY: u16 = 1 << 15;

/// Plain word storage with no device behavior.
#[derive(Clone)]
pub struct Memory {
    cells: Vec<u16>,
}

impl Memory {
    /// Create a new memory with all words zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
        }
    }

    /// Read a word. Every `u16` is a valid address.
    #[inline]
    pub fn read(&self, addr: u16) -> u16 {
        self.cells[addr as usize]
    }

    /// Write a word.
    #[inline]
    pub fn write(&mut self, addr: u16, value: u16) {
        self.cells[addr as usize] = value;
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Copy `program` into consecutive words starting at `origin`.
    pub fn load_program(&mut self, origin: u16, program: &[u16]) -> Result<(), MemoryError> {
        let start = origin as usize;
        let available = MEMORY_SIZE - start;
        if program.len() > available {
            return Err(MemoryError::ProgramTooLarge {
                origin,
                size: program.len(),
                available,
            });
        }

        self.cells[start..start + program.len()].copy_from_slice(program);
        Ok(())
    }

    /// Dump `count` words starting at `start`, stopping at the end of memory.
    pub fn dump(&self, start: u16, count: usize) -> Vec<(u16, u16)> {
        let end = (start as usize + count).min(MEMORY_SIZE);
        (start as usize..end)
            .map(|i| (i as u16, self.cells[i]))
            .collect()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|&&w| w != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// The memory bus: storage plus the memory-mapped keyboard.
pub struct Bus<C> {
    mem: Memory,
    console: C,
}

impl<C: Console> Bus<C> {
    /// Attach `console` to a zeroed memory.
    pub fn new(console: C) -> Self {
        Self {
            mem: Memory::new(),
            console,
        }
    }

    /// Read a word as the CPU sees it.
    ///
    /// Reading [`KBSR`] polls the console without waiting. A pending key sets
    /// the ready bit and lands in [`KBDR`]; otherwise the status reads 0.
    pub fn read(&mut self, addr: u16) -> Result<u16, ConsoleError> {
        if addr == KBSR {
            match self.console.poll_key()? {
                Some(key) => {
                    self.mem.write(KBSR, KBSR_READY);
                    self.mem.write(KBDR, key);
                }
                None => self.mem.write(KBSR, 0),
            }
        }
        Ok(self.mem.read(addr))
    }

    /// Write a word. Device registers are stored like any other word.
    pub fn write(&mut self, addr: u16, value: u16) {
        self.mem.write(addr, value);
    }

    /// Storage without device side effects.
    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.mem
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Program does not fit between its origin and the top of memory.
    #[error("program of {size} words at origin {origin:#06x} exceeds available space {available}")]
    ProgramTooLarge {
        origin: u16,
        size: usize,
        available: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::BufferConsole;
    use proptest::prelude::*;

    #[test]
    fn test_memory_read_write() {
        let mut mem = Memory::new();
        mem.write(0x3000, 42);
        assert_eq!(mem.read(0x3000), 42);
        mem.write(0xFFFF, 0xBEEF);
        assert_eq!(mem.read(0xFFFF), 0xBEEF);
    }

    #[test]
    fn test_load_program() {
        let mut mem = Memory::new();
        mem.load_program(0x3000, &[1, 2, 3]).unwrap();

        assert_eq!(mem.read(0x3000), 1);
        assert_eq!(mem.read(0x3001), 2);
        assert_eq!(mem.read(0x3002), 3);
        assert_eq!(mem.read(0x3003), 0);
    }

    #[test]
    fn test_load_program_to_top_of_memory() {
        let mut mem = Memory::new();
        mem.load_program(0xFFFE, &[7, 8]).unwrap();
        assert_eq!(mem.read(0xFFFF), 8);

        let err = mem.load_program(0xFFFE, &[7, 8, 9]).unwrap_err();
        assert_eq!(
            err,
            MemoryError::ProgramTooLarge { origin: 0xFFFE, size: 3, available: 2 }
        );
    }

    #[test]
    fn test_keyboard_status_without_key() {
        let mut bus = Bus::new(BufferConsole::new());
        assert_eq!(bus.read(KBSR).unwrap(), 0);
    }

    #[test]
    fn test_keyboard_status_is_consumed() {
        let mut bus = Bus::new(BufferConsole::with_input("k"));

        assert_eq!(bus.read(KBSR).unwrap(), 0x8000);
        assert_eq!(bus.read(KBDR).unwrap(), b'k' as u16);

        // No new key: status falls back to 0, data keeps the last key.
        assert_eq!(bus.read(KBSR).unwrap(), 0);
        assert_eq!(bus.read(KBDR).unwrap(), b'k' as u16);
    }

    #[test]
    fn test_data_register_read_does_not_poll() {
        let mut bus = Bus::new(BufferConsole::with_input("x"));
        assert_eq!(bus.read(KBDR).unwrap(), 0);
        assert_eq!(bus.console().pending(), 1);
    }

    proptest! {
        #[test]
        fn prop_write_then_read(addr in any::<u16>(), value in any::<u16>()) {
            prop_assume!(addr != KBSR);
            let mut bus = Bus::new(BufferConsole::new());
            bus.write(addr, value);
            prop_assert_eq!(bus.read(addr).unwrap(), value);
        }
    }
}
