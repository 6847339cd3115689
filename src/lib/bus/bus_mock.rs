use super::bus_interface::ParallelBus;
use crate::error::BusError;

/// A bus that records every word instead of driving hardware. Tests
/// inspect the recording; `--dry-run` uses the discarding flavor.
pub struct MockBus {
    words: Vec<u16>,
    written: usize,
    record: bool,
    fail_after: Option<usize>,
}

impl MockBus {
    /// A recording mock: every word written is kept, in order.
    pub fn new() -> Self {
        MockBus {
            words: Vec::new(),
            written: 0,
            record: true,
            fail_after: None,
        }
    }

    /// A mock that accepts and drops everything.
    pub fn discard() -> Self {
        MockBus {
            record: false,
            ..MockBus::new()
        }
    }

    /// A recording mock whose (n+1)-th write, and every write after it,
    /// fails.
    pub fn fail_after(n: usize) -> Self {
        MockBus {
            fail_after: Some(n),
            ..MockBus::new()
        }
    }

    /// Every word successfully written so far.
    pub fn words(&self) -> &[u16] {
        &self.words
    }

    /// Count of successful writes (also valid for a discarding mock).
    pub fn written(&self) -> usize {
        self.written
    }
}

impl Default for MockBus {
    fn default() -> Self {
        MockBus::new()
    }
}

impl ParallelBus for MockBus {
    fn write_word(&mut self, word: u16) -> Result<(), BusError> {
        if let Some(limit) = self.fail_after {
            if self.written >= limit {
                return Err(BusError("injected fault".to_string()));
            }
        }
        self.written += 1;
        if self.record {
            self.words.push(word);
        }
        Ok(())
    }
}
