use log::debug;
use std::fs;
use std::io;
use std::path::Path;

use crate::error::ImageError;

// Geometry of a digitized 5.25" disk: 35 tracks of raw nibbles.
pub const TRACK_COUNT: usize = 35;
pub const TRACK_BYTES: usize = 6656;

/// Size of a complete nibble image: 232,960 bytes.
pub const NIB_SIZE: usize = TRACK_COUNT * TRACK_BYTES;

/// A nibble disk image held in memory. The content is opaque here; the
/// receiving core interprets the encoding.
pub struct NibbleImage {
    data: Vec<u8>,
}

impl NibbleImage {
    /// Read a full image from `path`. Files below `NIB_SIZE` bytes are
    /// rejected before any transfer can start; a short image is never
    /// padded or truncated to fit.
    pub fn load(path: &Path) -> Result<NibbleImage, ImageError> {
        let data = fs::read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ImageError::NotFound(path.to_path_buf()),
            _ => ImageError::Io(e),
        })?;
        if data.len() < NIB_SIZE {
            return Err(ImageError::TooShort { found: data.len() });
        }
        debug!("Loaded {} ({} bytes).", path.display(), data.len());
        Ok(NibbleImage { data })
    }

    /// The raw image bytes, in file order. Always at least `NIB_SIZE` long.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}
