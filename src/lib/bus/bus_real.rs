use log::info;
use memmap::{MmapMut, MmapOptions};
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::ptr;

use super::bus_interface::ParallelBus;
use crate::error::BusError;

const PAGE_SIZE: usize = 0x1000;

/// The parallel bus, driven through a memory-mapped GPIO output data
/// register. Pin directions and output enables are platform bring-up done
/// before this process starts; all we touch is the data register itself.
pub struct RealBus {
    map: MmapMut,
    offset: usize,
}

impl RealBus {
    /// Map the register page containing the GPIO output data register.
    /// `register` is the byte offset of that register within `path`
    /// (typically a physical address when `path` is `/dev/mem`), and must
    /// be word-aligned.
    pub fn map(path: &Path, register: usize) -> io::Result<Self> {
        if register % 4 != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "bus register offset must be word-aligned",
            ));
        }
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let page = register & !(PAGE_SIZE - 1);
        let map = unsafe { MmapOptions::new().offset(page).len(PAGE_SIZE).map_mut(&file)? };
        info!("Mapped bus register {:#x} from {}.", register, path.display());
        Ok(RealBus {
            map,
            offset: register - page,
        })
    }
}

impl ParallelBus for RealBus {
    fn write_word(&mut self, word: u16) -> Result<(), BusError> {
        let reg = self.map[self.offset..].as_mut_ptr() as *mut u32;
        // Volatile keeps the stores from being elided or merged; the
        // receiver latches on individual edges.
        unsafe { ptr::write_volatile(reg, u32::from(word)) };
        Ok(())
    }
}
