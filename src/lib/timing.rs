use crossterm::event::{self, Event, KeyCode};
use crossterm::terminal;
use std::io::{self, Write};
use std::thread;
use std::time::Duration;

/// One half-cycle boundary in the wire sequence. Each phase has a
/// one-character marker so an operator single-stepping a transfer can
/// correlate engine state with an oscilloscope or logic trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    StartAssert,
    StartDeassert,
    ByteAssert,
    ByteDeassert,
    EndAssert,
    EndDeassert,
}

impl Phase {
    /// The marker printed in step mode.
    pub fn marker(self) -> char {
        match self {
            Phase::StartAssert => '/',
            Phase::StartDeassert => '\\',
            Phase::ByteAssert => '[',
            Phase::ByteDeassert => ']',
            Phase::EndAssert => '{',
            Phase::EndDeassert => '}',
        }
    }
}

/// Whether the engine may proceed past a half-cycle boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Continue,
    /// The operator asked to abandon the session.
    Abort,
}

/// Paces the transfer engine: called once per half-cycle boundary, after
/// the bus word for that boundary has been written.
pub trait Pacer {
    fn half_cycle(&mut self, phase: Phase) -> Advance;
}

/// Streaming pace: a fixed short sleep per half-cycle, suitable for
/// direct hardware consumption.
pub struct FixedPacer {
    period: Duration,
}

impl FixedPacer {
    pub fn new() -> Self {
        FixedPacer::with_period(Duration::from_micros(1))
    }

    pub fn with_period(period: Duration) -> Self {
        FixedPacer { period }
    }
}

impl Default for FixedPacer {
    fn default() -> Self {
        FixedPacer::new()
    }
}

impl Pacer for FixedPacer {
    fn half_cycle(&mut self, _phase: Phase) -> Advance {
        thread::sleep(self.period);
        Advance::Continue
    }
}

/// Debug pace: print the phase marker, then hold the bus state until the
/// operator presses a key. Esc or `q` abandons the transfer. The terminal
/// stays in raw mode for the lifetime of the pacer so single keypresses
/// arrive unbuffered.
pub struct SteppedPacer;

impl SteppedPacer {
    pub fn new() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(SteppedPacer)
    }
}

impl Pacer for SteppedPacer {
    fn half_cycle(&mut self, phase: Phase) -> Advance {
        print!("{}", phase.marker());
        let _ = io::stdout().flush();
        loop {
            match event::read() {
                Ok(Event::Key(key)) => {
                    return match key.code {
                        KeyCode::Esc | KeyCode::Char('q') => Advance::Abort,
                        _ => Advance::Continue,
                    };
                }
                // Resize and mouse events are not operator input.
                Ok(_) => continue,
                Err(_) => return Advance::Abort,
            }
        }
    }
}

impl Drop for SteppedPacer {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_markers_distinct() {
        let phases = [
            Phase::StartAssert,
            Phase::StartDeassert,
            Phase::ByteAssert,
            Phase::ByteDeassert,
            Phase::EndAssert,
            Phase::EndDeassert,
        ];
        let markers: HashSet<char> = phases.iter().map(|p| p.marker()).collect();
        assert_eq!(markers.len(), phases.len());
    }

    #[test]
    fn test_fixed_pacer_continues() {
        let mut pacer = FixedPacer::with_period(Duration::ZERO);
        assert_eq!(pacer.half_cycle(Phase::StartAssert), Advance::Continue);
        assert_eq!(pacer.half_cycle(Phase::ByteDeassert), Advance::Continue);
    }
}
