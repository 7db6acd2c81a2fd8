//! LC-3 object image format.
//!
//! An image is a flat binary file of big-endian words:
//! - Word 0: the origin, where the rest is loaded
//! - Words 1..: program contents, placed at consecutive addresses
//!
//! A trailing odd byte is ignored.

use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

use crate::cpu::memory::MEMORY_SIZE;

/// A parsed program image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramImage {
    /// Load address of the first word.
    pub origin: u16,
    /// Program words in host order.
    pub words: Vec<u16>,
}

impl ProgramImage {
    /// Create an image from words already in host order.
    pub fn new(origin: u16, words: Vec<u16>) -> Result<Self, ImageError> {
        let available = MEMORY_SIZE - origin as usize;
        if words.len() > available {
            return Err(ImageError::TooLarge {
                origin,
                size: words.len(),
                available,
            });
        }
        Ok(Self { origin, words })
    }

    /// Parse the raw bytes of an image file.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        let mut chunks = bytes.chunks_exact(2);
        let origin = chunks
            .next()
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .ok_or(ImageError::MissingOrigin(bytes.len()))?;

        let words = chunks
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();

        Self::new(origin, words)
    }

    /// Serialize back to the file format.
    pub fn to_bytes(&self) -> Vec<u8> {
        std::iter::once(self.origin)
            .chain(self.words.iter().copied())
            .flat_map(u16::to_be_bytes)
            .collect()
    }

    /// Get the number of program words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Address one past the last loaded word (wraps to 0 at the top of memory).
    pub fn end(&self) -> u16 {
        self.origin.wrapping_add(self.words.len() as u16)
    }
}

/// Load an image file from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<ProgramImage, ImageError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| ImageError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let image = ProgramImage::from_bytes(&bytes)?;
    info!(
        "read {}: {} bytes, {} words at {:#06x}",
        path.display(),
        bytes.len(),
        image.len(),
        image.origin
    );
    Ok(image)
}

/// Errors that can occur while reading an image.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("cannot read image {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image has {0} bytes, too short for an origin word")]
    MissingOrigin(usize),

    #[error("image of {size} words at origin {origin:#06x} exceeds available space {available}")]
    TooLarge {
        origin: u16,
        size: usize,
        available: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_image() {
        let image = ProgramImage::from_bytes(&[0x30, 0x00, 0x12, 0x34, 0xF0, 0x25]).unwrap();
        assert_eq!(image.origin, 0x3000);
        assert_eq!(image.words, vec![0x1234, 0xF025]);
        assert_eq!(image.end(), 0x3002);
    }

    #[test]
    fn test_odd_trailing_byte_dropped() {
        let image = ProgramImage::from_bytes(&[0x30, 0x00, 0x12, 0x34, 0xAB]).unwrap();
        assert_eq!(image.words, vec![0x1234]);
    }

    #[test]
    fn test_origin_only() {
        let image = ProgramImage::from_bytes(&[0x40, 0x00]).unwrap();
        assert_eq!(image.origin, 0x4000);
        assert!(image.is_empty());
    }

    #[test]
    fn test_missing_origin() {
        assert!(matches!(
            ProgramImage::from_bytes(&[0x30]),
            Err(ImageError::MissingOrigin(1))
        ));
        assert!(matches!(
            ProgramImage::from_bytes(&[]),
            Err(ImageError::MissingOrigin(0))
        ));
    }

    #[test]
    fn test_image_past_top_of_memory() {
        let err = ProgramImage::from_bytes(&[0xFF, 0xFF, 0, 1, 0, 2]).unwrap_err();
        assert!(matches!(
            err,
            ImageError::TooLarge { origin: 0xFFFF, size: 2, available: 1 }
        ));
    }

    #[test]
    fn test_to_bytes() {
        let image = ProgramImage::new(0x3000, vec![0xF025]).unwrap();
        assert_eq!(image.to_bytes(), vec![0x30, 0x00, 0xF0, 0x25]);
    }

    #[test]
    fn test_load_from_disk() {
        let path = std::env::temp_dir().join(format!("lc3-image-{}.obj", std::process::id()));
        std::fs::write(&path, [0x30, 0x00, 0x10, 0x25, 0xF0, 0x25]).unwrap();

        let image = load_image(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(image, ProgramImage::new(0x3000, vec![0x1025, 0xF025]).unwrap());
    }

    #[test]
    fn test_missing_file() {
        let err = load_image("/nonexistent/program.obj").unwrap_err();
        assert!(matches!(err, ImageError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/program.obj"));
    }
}
