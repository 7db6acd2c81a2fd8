//! Host terminal console.
//!
//! Puts the terminal in raw mode so single keypresses reach the program
//! without waiting for Enter. Escape and Ctrl-C are reserved as the
//! interrupt keys and are never delivered to the program.

use std::io::{self, Stdout, Write};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;

use super::{Console, ConsoleError};

/// Console backed by the process's terminal.
pub struct TerminalConsole {
    out: Stdout,
}

impl TerminalConsole {
    /// Enter raw mode. Raw mode is left again when the console is dropped.
    pub fn new() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self { out: io::stdout() })
    }

    /// Translate a key event to a character code.
    fn translate(key: KeyEvent) -> Result<Option<u16>, ConsoleError> {
        if key.kind != KeyEventKind::Press {
            return Ok(None);
        }

        let code = match key.code {
            KeyCode::Esc => return Err(ConsoleError::Interrupted),
            KeyCode::Char('c') | KeyCode::Char('C')
                if key.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                return Err(ConsoleError::Interrupted)
            }
            KeyCode::Char(c) => c as u32,
            KeyCode::Enter => 0x0A,
            KeyCode::Tab => 0x09,
            KeyCode::Backspace => 0x08,
            _ => return Ok(None),
        };

        // Anything beyond the basic plane cannot fit in a word.
        Ok(u16::try_from(code).ok())
    }
}

impl Console for TerminalConsole {
    fn poll_key(&mut self) -> Result<Option<u16>, ConsoleError> {
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if let Some(code) = Self::translate(key)? {
                    return Ok(Some(code));
                }
            }
        }
        Ok(None)
    }

    fn read_key(&mut self) -> Result<u16, ConsoleError> {
        loop {
            if let Event::Key(key) = event::read()? {
                if let Some(code) = Self::translate(key)? {
                    return Ok(code);
                }
            }
        }
    }

    fn write_char(&mut self, ch: u16) -> Result<(), ConsoleError> {
        let mut out = self.out.lock();
        if ch == 0x0A {
            // Raw mode disables the implicit carriage return.
            out.write_all(b"\r\n")?;
        } else {
            let c = char::from_u32(ch as u32).unwrap_or(char::REPLACEMENT_CHARACTER);
            let mut buf = [0u8; 4];
            out.write_all(c.encode_utf8(&mut buf).as_bytes())?;
        }
        out.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ConsoleError> {
        self.out.flush()?;
        Ok(())
    }
}

impl Drop for TerminalConsole {
    fn drop(&mut self) {
        let _ = self.out.flush();
        let _ = terminal::disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn test_printable_keys() {
        let key = press(KeyCode::Char('a'), KeyModifiers::NONE);
        assert_eq!(TerminalConsole::translate(key).unwrap(), Some(0x61));
        let key = press(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(TerminalConsole::translate(key).unwrap(), Some(0x0A));
    }

    #[test]
    fn test_interrupt_keys() {
        let esc = press(KeyCode::Esc, KeyModifiers::NONE);
        assert!(matches!(TerminalConsole::translate(esc), Err(ConsoleError::Interrupted)));
        let ctrl_c = press(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(matches!(TerminalConsole::translate(ctrl_c), Err(ConsoleError::Interrupted)));
    }

    #[test]
    fn test_release_and_unmapped_keys_ignored() {
        let mut release = press(KeyCode::Char('a'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert_eq!(TerminalConsole::translate(release).unwrap(), None);
        let f1 = press(KeyCode::F(1), KeyModifiers::NONE);
        assert_eq!(TerminalConsole::translate(f1).unwrap(), None);
    }
}
