use std::error;
use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::image::NIB_SIZE;

/// A failed write to the physical bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusError(pub String);

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "bus write failed: {}", self.0)
    }
}

impl error::Error for BusError {}

/// Errors from loading a disk image.
#[derive(Debug)]
pub enum ImageError {
    /// The path did not resolve to a readable image file.
    NotFound(PathBuf),
    /// The file holds fewer bytes than a complete image. A short image is
    /// never padded or partially sent.
    TooShort { found: usize },
    /// Any other failure while reading the file.
    Io(io::Error),
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ImageError::NotFound(path) => write!(f, "cannot open {}", path.display()),
            ImageError::TooShort { found } => {
                write!(f, "expected {} bytes from nib file, got {}", NIB_SIZE, found)
            }
            ImageError::Io(e) => write!(f, "error reading image: {}", e),
        }
    }
}

impl error::Error for ImageError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            ImageError::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors from the transfer engine. `Bus` and `Cancelled` mean the wire
/// sequence stopped before the end pulses were sent: the receiver is out
/// of sync until the next complete transfer.
#[derive(Debug)]
pub enum TransferError {
    /// The requested send length is zero or exceeds the loaded image.
    InvalidLength { requested: usize, available: usize },
    /// A bus write failed mid-sequence.
    Bus(BusError),
    /// The operator abandoned a stepped transfer.
    Cancelled,
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TransferError::InvalidLength { requested, available } => {
                write!(f, "invalid send length {} (image holds {} bytes)", requested, available)
            }
            TransferError::Bus(e) => write!(f, "{} (termination not sent)", e),
            TransferError::Cancelled => write!(f, "abandoned by operator (termination not sent)"),
        }
    }
}

impl error::Error for TransferError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            TransferError::Bus(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BusError> for TransferError {
    fn from(e: BusError) -> TransferError {
        TransferError::Bus(e)
    }
}
