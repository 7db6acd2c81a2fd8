//! Console device used by the keyboard registers and the trap routines.
//!
//! The core never touches the host terminal directly. Everything it needs
//! goes through the [`Console`] trait:
//! - [`BufferConsole`] - scripted input and captured output, for tests and embedding
//! - [`TerminalConsole`] - raw-mode terminal via crossterm (feature `terminal`)

mod buffer;
#[cfg(feature = "terminal")]
mod terminal;

pub use buffer::BufferConsole;
#[cfg(feature = "terminal")]
pub use terminal::TerminalConsole;

use thiserror::Error;

/// A character device: one keyboard, one printer.
///
/// Characters travel as full words; devices decide how to render codes
/// outside the ASCII range.
pub trait Console {
    /// Check for a pending key without waiting.
    fn poll_key(&mut self) -> Result<Option<u16>, ConsoleError>;

    /// Wait for the next key. Never echoes.
    fn read_key(&mut self) -> Result<u16, ConsoleError>;

    /// Print one character.
    fn write_char(&mut self, ch: u16) -> Result<(), ConsoleError>;

    /// Push any buffered output to the device.
    fn flush(&mut self) -> Result<(), ConsoleError> {
        Ok(())
    }
}

/// Errors a console device can report.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// The user pressed the interrupt key (Escape or Ctrl-C).
    ///
    /// This is an abrupt stop, not a halt: the engine abandons the
    /// current instruction.
    #[error("console interrupted by user")]
    Interrupted,

    #[error("console I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A scripted console was asked to wait for a key it will never get.
    #[error("console input exhausted")]
    InputExhausted,
}
