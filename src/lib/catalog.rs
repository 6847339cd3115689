use log::info;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Upper bound on offered images; a scan stops counting past this.
const MAX_DISKS: usize = 100;

/// The disk images offered for selection, in name order. Selection numbers
/// shown to the operator are 1-based; storage is 0-based.
pub struct Catalog {
    entries: Vec<PathBuf>,
}

impl Catalog {
    /// Scan `dir` for `.nib` files. Anything else is skipped with a note
    /// in the log.
    pub fn scan(dir: &Path) -> io::Result<Catalog> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            match path.extension().and_then(|e| e.to_str()) {
                Some("nib") => entries.push(path),
                _ => info!("Ignoring non-nib file: {}", path.display()),
            }
        }
        entries.sort();
        if entries.len() > MAX_DISKS {
            info!("Offering the first {} of {} images.", MAX_DISKS, entries.len());
            entries.truncate(MAX_DISKS);
        }
        info!("Catalog holds {} disk images.", entries.len());
        Ok(Catalog { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an image by its 1-based listing number.
    pub fn select(&self, number: usize) -> Option<&Path> {
        if number == 0 {
            return None;
        }
        self.entries.get(number - 1).map(PathBuf::as_path)
    }

    /// The operator-facing listing.
    pub fn listing(&self) -> String {
        let mut out = format!(
            "Found {} disk images. Type `load <number>` to send one:\n",
            self.entries.len()
        );
        for (i, path) in self.entries.iter().enumerate() {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_default();
            out.push_str(&format!("  {}: {}\n", i + 1, name));
        }
        out
    }
}
