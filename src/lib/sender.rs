use log::{debug, info};
use std::time::{Duration, Instant};

use crate::bus::{ParallelBus, CLOCK_LINE, START_LINE};
use crate::error::TransferError;
use crate::timing::{Advance, Pacer, Phase};

/// Send the first `length` bytes of `payload` over the bus.
///
/// The wire sequence is: one start pulse (both control lines up, then all
/// lines down), `length` strobed payload bytes, then a double end pulse on
/// the start line. Each payload byte is put on the data lines first and
/// strobed second; the receiver samples on the strobe's rising edge, so
/// the data must be stable before the edge and must not change until the
/// strobe falls again.
///
/// Returns the wall-clock duration of the whole sequence. On a bus fault
/// or operator abort the sequence stops where it is: the end pulses are
/// not sent and the receiver must be assumed out of sync. The engine keeps
/// no state between calls; a failed session does not taint the next one.
pub fn send<B, P>(
    bus: &mut B,
    pacer: &mut P,
    payload: &[u8],
    length: usize,
) -> Result<Duration, TransferError>
where
    B: ParallelBus,
    P: Pacer,
{
    if length == 0 || length > payload.len() {
        return Err(TransferError::InvalidLength {
            requested: length,
            available: payload.len(),
        });
    }

    info!("Transfer session: sending {} of {} bytes.", length, payload.len());
    let started = Instant::now();

    // Start pulse. Asserting both control lines at once is the start
    // signature; no other word in the sequence carries both.
    step(bus, pacer, START_LINE | CLOCK_LINE, Phase::StartAssert)?;
    step(bus, pacer, 0, Phase::StartDeassert)?;

    for &byte in &payload[..length] {
        let data = u16::from(byte);
        // Data lines settle before the strobe rises.
        bus.write_word(data)?;
        step(bus, pacer, data | CLOCK_LINE, Phase::ByteAssert)?;
        step(bus, pacer, data, Phase::ByteDeassert)?;
    }

    // Double end pulse on the start line; payload never raises it, so the
    // pair is unmistakable on the far side.
    for _ in 0..2 {
        step(bus, pacer, START_LINE, Phase::EndAssert)?;
        step(bus, pacer, 0, Phase::EndDeassert)?;
    }

    let elapsed = started.elapsed();
    debug!("Transfer session finished in {} ms.", elapsed.as_millis());
    Ok(elapsed)
}

/// One bus write followed by its half-cycle hold.
fn step<B, P>(bus: &mut B, pacer: &mut P, word: u16, phase: Phase) -> Result<(), TransferError>
where
    B: ParallelBus,
    P: Pacer,
{
    bus.write_word(word)?;
    match pacer.half_cycle(phase) {
        Advance::Continue => Ok(()),
        Advance::Abort => Err(TransferError::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{MockBus, DATA_LINES};
    use crate::init_test_logging;
    use crate::timing::FixedPacer;
    use ntest::timeout;

    /// A pacer that records each phase and resumes immediately, optionally
    /// aborting at the n-th half-cycle.
    struct InstantPacer {
        phases: Vec<Phase>,
        abort_at: Option<usize>,
    }

    impl InstantPacer {
        fn new() -> Self {
            InstantPacer {
                phases: Vec::new(),
                abort_at: None,
            }
        }

        fn abort_at(n: usize) -> Self {
            InstantPacer {
                phases: Vec::new(),
                abort_at: Some(n),
            }
        }
    }

    impl Pacer for InstantPacer {
        fn half_cycle(&mut self, phase: Phase) -> Advance {
            if self.abort_at == Some(self.phases.len()) {
                return Advance::Abort;
            }
            self.phases.push(phase);
            Advance::Continue
        }
    }

    fn random_payload(len: usize) -> Vec<u8> {
        let mut payload = Vec::with_capacity(len);
        payload.resize_with(len, rand::random);
        payload
    }

    #[test]
    fn test_exact_word_sequence() {
        init_test_logging();
        let mut bus = MockBus::new();
        let mut pacer = InstantPacer::new();

        send(&mut bus, &mut pacer, &[0xA5, 0x00, 0xFF], 3).unwrap();

        assert_eq!(
            bus.words(),
            &[
                0x0300, 0x0000, // start pulse
                0x00A5, 0x02A5, 0x00A5, // byte 0: set, strobe up, strobe down
                0x0000, 0x0200, 0x0000, // byte 1
                0x00FF, 0x02FF, 0x00FF, // byte 2
                0x0100, 0x0000, // end pulse 1
                0x0100, 0x0000, // end pulse 2
            ]
        );
        assert_eq!(
            pacer.phases,
            vec![
                Phase::StartAssert,
                Phase::StartDeassert,
                Phase::ByteAssert,
                Phase::ByteDeassert,
                Phase::ByteAssert,
                Phase::ByteDeassert,
                Phase::ByteAssert,
                Phase::ByteDeassert,
                Phase::EndAssert,
                Phase::EndDeassert,
                Phase::EndAssert,
                Phase::EndDeassert,
            ]
        );
    }

    #[test]
    fn test_half_cycle_and_write_counts() {
        let payload = random_payload(17);
        let mut bus = MockBus::new();
        let mut pacer = InstantPacer::new();

        send(&mut bus, &mut pacer, &payload, payload.len()).unwrap();

        // 2 half-cycles for the start pulse, 2 per byte, 4 for the double
        // end pulse; each byte needs one extra write to settle its data.
        assert_eq!(pacer.phases.len(), 6 + 2 * payload.len());
        assert_eq!(bus.words().len(), 6 + 3 * payload.len());
    }

    #[test]
    fn test_start_line_never_strobed() {
        let payload = random_payload(64);
        let mut bus = MockBus::new();
        let mut pacer = InstantPacer::new();

        send(&mut bus, &mut pacer, &payload, payload.len()).unwrap();

        // Past the start-assert word, the start line and the clock strobe
        // are mutually exclusive, and payload words never raise the start
        // line at all.
        for &word in &bus.words()[1..] {
            if word & START_LINE != 0 {
                assert_eq!(word & CLOCK_LINE, 0, "strobed start marker: {:#06x}", word);
                assert_eq!(word & DATA_LINES, 0, "data under start marker: {:#06x}", word);
            }
        }
    }

    #[test]
    fn test_data_stable_across_strobe() {
        let payload = random_payload(32);
        let mut bus = MockBus::new();
        let mut pacer = InstantPacer::new();

        send(&mut bus, &mut pacer, &payload, payload.len()).unwrap();

        for (i, &byte) in payload.iter().enumerate() {
            let data = u16::from(byte);
            let words = &bus.words()[2 + 3 * i..5 + 3 * i];
            assert_eq!(words[0], data);
            assert_eq!(words[1], data | CLOCK_LINE);
            assert_eq!(words[2], data);
        }
    }

    #[test]
    fn test_truncated_send_stops_at_length() {
        let payload = random_payload(16);
        let mut bus = MockBus::new();
        let mut pacer = InstantPacer::new();

        send(&mut bus, &mut pacer, &payload, 5).unwrap();

        assert_eq!(bus.words().len(), 6 + 3 * 5);
        assert_eq!(bus.words()[2 + 3 * 4] & DATA_LINES, u16::from(payload[4]));
    }

    #[test]
    fn test_zero_length_rejected_without_bus_activity() {
        let mut bus = MockBus::new();
        let mut pacer = InstantPacer::new();

        let result = send(&mut bus, &mut pacer, &[1, 2, 3], 0);

        assert!(matches!(
            result,
            Err(TransferError::InvalidLength { requested: 0, .. })
        ));
        assert!(bus.words().is_empty());
        assert!(pacer.phases.is_empty());
    }

    #[test]
    fn test_overlong_length_rejected_without_bus_activity() {
        let mut bus = MockBus::new();
        let mut pacer = InstantPacer::new();

        let result = send(&mut bus, &mut pacer, &[1, 2, 3], 4);

        assert!(matches!(
            result,
            Err(TransferError::InvalidLength {
                requested: 4,
                available: 3,
            })
        ));
        assert!(bus.words().is_empty());
    }

    #[test]
    fn test_bus_fault_is_fatal_to_session() {
        init_test_logging();
        let payload = random_payload(8);
        // Fail partway through the payload phase.
        let mut bus = MockBus::fail_after(9);
        let mut pacer = InstantPacer::new();

        let result = send(&mut bus, &mut pacer, &payload, payload.len());

        assert!(matches!(result, Err(TransferError::Bus(_))));
        // Nothing after the fault, in particular no end pulses.
        assert_eq!(bus.words().len(), 9);
        assert_ne!(*bus.words().last().unwrap(), START_LINE);
    }

    #[test]
    fn test_engine_clean_after_failed_session() {
        let payload = random_payload(8);
        let mut failing = MockBus::fail_after(4);
        let mut pacer = InstantPacer::new();
        assert!(send(&mut failing, &mut pacer, &payload, payload.len()).is_err());

        // A fresh session on a healthy bus runs to completion.
        let mut bus = MockBus::new();
        let mut pacer = InstantPacer::new();
        send(&mut bus, &mut pacer, &payload, payload.len()).unwrap();
        assert_eq!(bus.words().len(), 6 + 3 * payload.len());
    }

    #[test]
    fn test_operator_abort_stops_sequence() {
        let payload = random_payload(8);
        let mut bus = MockBus::new();
        // Abort at the rising strobe of the second byte.
        let mut pacer = InstantPacer::abort_at(4);

        let result = send(&mut bus, &mut pacer, &payload, payload.len());

        assert!(matches!(result, Err(TransferError::Cancelled)));
        // start pulse (2) + byte 0 (3) + byte 1 data and strobe-up (2).
        assert_eq!(bus.words().len(), 7);
    }

    #[test]
    #[timeout(2000)]
    fn test_streaming_pace_reports_elapsed_time() {
        let payload = random_payload(64);
        let mut bus = MockBus::new();
        let mut pacer = FixedPacer::new();

        let elapsed = send(&mut bus, &mut pacer, &payload, payload.len()).unwrap();

        assert!(elapsed > Duration::ZERO);
    }
}
