//! In-memory console with a scripted keyboard.

use std::collections::VecDeque;

use super::{Console, ConsoleError};

/// Deterministic console: keys come from a queue, output goes to a buffer.
#[derive(Debug, Clone, Default)]
pub struct BufferConsole {
    input: VecDeque<u16>,
    output: Vec<u16>,
}

impl BufferConsole {
    /// Create an empty console.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a console with `keys` already queued.
    pub fn with_input(keys: &str) -> Self {
        let mut console = Self::new();
        console.push_str(keys);
        console
    }

    /// Queue one key code.
    pub fn push_key(&mut self, key: u16) {
        self.input.push_back(key);
    }

    /// Queue every character of `keys`.
    pub fn push_str(&mut self, keys: &str) {
        self.input.extend(keys.chars().map(|c| c as u16));
    }

    /// Number of keys still waiting to be read.
    pub fn pending(&self) -> usize {
        self.input.len()
    }

    /// Everything written so far.
    pub fn output(&self) -> &[u16] {
        &self.output
    }

    /// Output rendered as text. Codes that are not valid chars become U+FFFD.
    pub fn output_string(&self) -> String {
        self.output
            .iter()
            .map(|&c| char::from_u32(c as u32).unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    }

    /// Drain the output buffer.
    pub fn take_output(&mut self) -> Vec<u16> {
        std::mem::take(&mut self.output)
    }
}

impl Console for BufferConsole {
    fn poll_key(&mut self) -> Result<Option<u16>, ConsoleError> {
        Ok(self.input.pop_front())
    }

    fn read_key(&mut self) -> Result<u16, ConsoleError> {
        self.input.pop_front().ok_or(ConsoleError::InputExhausted)
    }

    fn write_char(&mut self, ch: u16) -> Result<(), ConsoleError> {
        self.output.push(ch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_fifo() {
        let mut console = BufferConsole::with_input("ab");
        assert_eq!(console.poll_key().unwrap(), Some(b'a' as u16));
        assert_eq!(console.read_key().unwrap(), b'b' as u16);
        assert_eq!(console.poll_key().unwrap(), None);
    }

    #[test]
    fn test_blocking_read_on_empty_queue() {
        let mut console = BufferConsole::new();
        assert!(matches!(console.read_key(), Err(ConsoleError::InputExhausted)));
    }

    #[test]
    fn test_output_capture() {
        let mut console = BufferConsole::new();
        for c in "HI".chars() {
            console.write_char(c as u16).unwrap();
        }
        assert_eq!(console.output_string(), "HI");
        assert_eq!(console.take_output(), vec![0x48, 0x49]);
        assert!(console.output().is_empty());
    }
}
