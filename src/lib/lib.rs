//! Feed nibble-format floppy disk images to a historic-computer core over
//! a ten-line parallel bus: eight data lines, a clock strobe, and a start
//! marker. The wire protocol lives in `sender`; the other modules are the
//! plumbing that gets bytes to it and the operator console that drives it.

mod bus;
mod catalog;
mod error;
mod image;
mod sender;
mod shell;
mod timing;

use std::io;
use std::path::Path;

pub use crate::bus::{MockBus, ParallelBus, RealBus, CLOCK_LINE, DATA_LINES, START_LINE};
pub use crate::catalog::Catalog;
pub use crate::error::{BusError, ImageError, TransferError};
pub use crate::image::{NibbleImage, NIB_SIZE, TRACK_BYTES, TRACK_COUNT};
pub use crate::sender::send;
pub use crate::shell::{parse_command, transfer, Command, Shell};
pub use crate::timing::{Advance, FixedPacer, Pacer, Phase, SteppedPacer};

/// Scan `image_dir` and run the interactive shell on stdin until the
/// operator quits.
pub fn run(image_dir: &Path, bus: impl ParallelBus) -> io::Result<()> {
    let catalog = Catalog::scan(image_dir)?;
    let mut shell = Shell::new(catalog, bus);
    shell.run(io::stdin().lock())
}

/// Logging setup for tests; safe to call more than once.
#[cfg(test)]
pub(crate) fn init_test_logging() {
    use simplelog::{Config, LevelFilter, TestLogger};
    let _ = TestLogger::init(LevelFilter::Trace, Config::default());
}
