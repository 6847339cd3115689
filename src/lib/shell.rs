use log::{info, warn};
use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Duration;

use crate::bus::ParallelBus;
use crate::catalog::Catalog;
use crate::image::{NibbleImage, NIB_SIZE};
use crate::sender;
use crate::timing::{FixedPacer, Pacer, SteppedPacer};

const HELP: &str = "\
Usage:
  load <disk#> [length]
     Send a disk image at full speed. Example: load 1
  step <disk#> [length]
     Send a disk image one half-cycle per keypress, for debug.
     Any key advances; Esc or q abandons the transfer.
  list
     List all disk images.
  help
     This message.
  quit
     Exit.";

/// A parsed operator command.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    /// `load` or `step`. The selection is the 1-based listing number; 0
    /// (including anything unparsable) is always an invalid selection.
    Send {
        selection: usize,
        length: Option<usize>,
        step: bool,
    },
    List,
    Help,
    Quit,
}

/// Parse one input line. `None` for a blank line.
pub fn parse_command(line: &str) -> Option<Command> {
    let mut words = line.split_whitespace();
    let cmd = words.next()?;
    Some(match cmd {
        "load" | "step" => Command::Send {
            selection: words.next().and_then(|w| w.parse().ok()).unwrap_or(0),
            length: words.next().and_then(|w| w.parse().ok()),
            step: cmd == "step",
        },
        "list" => Command::List,
        "quit" | "exit" => Command::Quit,
        _ => Command::Help,
    })
}

/// Load the image at `path` and push `length` bytes of it through the
/// engine with the given pacing.
pub fn transfer<B, P>(
    bus: &mut B,
    pacer: &mut P,
    path: &Path,
    length: usize,
) -> Result<Duration, Box<dyn Error>>
where
    B: ParallelBus,
    P: Pacer,
{
    let image = NibbleImage::load(path)?;
    let elapsed = sender::send(bus, pacer, image.bytes(), length)?;
    Ok(elapsed)
}

/// The interactive command loop. Owns the catalog and the bus, which
/// structurally serializes transfers: one session at a time, ever.
pub struct Shell<B> {
    catalog: Catalog,
    bus: B,
}

impl<B: ParallelBus> Shell<B> {
    pub fn new(catalog: Catalog, bus: B) -> Self {
        Shell { catalog, bus }
    }

    /// Run the command loop until `quit` or end of input.
    pub fn run(&mut self, input: impl BufRead) -> io::Result<()> {
        println!("{}", self.catalog.listing());
        let mut lines = input.lines();
        loop {
            print!("> ");
            io::stdout().flush()?;
            let line = match lines.next() {
                Some(line) => line?,
                None => break,
            };
            match parse_command(&line) {
                None => continue,
                Some(Command::Quit) => break,
                Some(Command::List) => println!("{}", self.catalog.listing()),
                Some(Command::Help) => println!("{}", HELP),
                Some(Command::Send {
                    selection,
                    length,
                    step,
                }) => self.send(selection, length, step),
            }
        }
        Ok(())
    }

    /// Resolve a selection and run one transfer session.
    fn send(&mut self, selection: usize, length: Option<usize>, step: bool) {
        let path = match self.catalog.select(selection) {
            Some(path) => path.to_path_buf(),
            None => {
                // Out-of-range selections just show the list again.
                println!("{}", self.catalog.listing());
                return;
            }
        };
        let length = length.unwrap_or(NIB_SIZE);
        println!("OK. Now loading image #{} ({} bytes)...", selection, length);
        info!("Operator requested image #{} ({}), step={}.", selection, path.display(), step);

        let result = if step {
            match SteppedPacer::new() {
                Ok(mut pacer) => transfer(&mut self.bus, &mut pacer, &path, length),
                Err(e) => Err(e.into()),
            }
        } else {
            let mut pacer = FixedPacer::new();
            transfer(&mut self.bus, &mut pacer, &path, length)
        };

        match result {
            Ok(elapsed) => println!("Disk image sent in {} ms.", elapsed.as_millis()),
            Err(e) => {
                warn!("Transfer of image #{} failed: {}", selection, e);
                println!("Transfer failed: {}", e);
            }
        }
    }
}
