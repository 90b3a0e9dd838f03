//! Timed redundancy for an acknowledgement-free mesh.
//!
//! Every originated or forwarded packet gets a bounded number of blind
//! retransmissions inside a fixed window after its first emission. A full
//! queue costs only the redundancy; the first transmission already went out.

use alloc::vec::Vec;

use crate::time::{Duration, Timestamp};
use crate::types::Payload;

/// One pending-redundancy entry.
#[derive(Debug, Clone)]
struct Slot {
    header: Vec<u8>,
    message: Option<Payload>,
    first_sent: Timestamp,
    sent_count: u8,
}

/// A retransmission that is due now; re-emit through the raw TX path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueRetransmit {
    pub header: Vec<u8>,
    pub message: Option<Payload>,
    /// 1-based count of this emission (first retransmit is 2).
    pub emission: u8,
}

/// Fixed-size set of pending-redundancy slots.
pub struct RetransmitQueue {
    slots: Vec<Option<Slot>>,
}

impl RetransmitQueue {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots }
    }

    /// Track a packet whose first transmission just happened.
    /// Returns false (dropping the redundancy) when every slot is busy.
    pub fn enqueue(&mut self, header: Vec<u8>, message: Option<Payload>, now: Timestamp) -> bool {
        for slot in self.slots.iter_mut() {
            if slot.is_none() {
                *slot = Some(Slot {
                    header,
                    message,
                    first_sent: now,
                    sent_count: 1,
                });
                return true;
            }
        }
        false
    }

    /// Retire expired entries and collect the retransmissions that are due.
    ///
    /// An entry's nth emission is due at `first_sent + n * interval`; the
    /// entry retires once `window` has elapsed or `max_count` emissions are
    /// spent.
    pub fn pump(
        &mut self,
        now: Timestamp,
        interval: Duration,
        window: Duration,
        max_count: u8,
    ) -> Vec<DueRetransmit> {
        let mut due = Vec::new();
        for slot in self.slots.iter_mut() {
            let Some(entry) = slot.as_mut() else {
                continue;
            };
            let elapsed = now.saturating_since(entry.first_sent);
            if elapsed > window {
                *slot = None;
                continue;
            }
            if entry.sent_count < max_count
                && elapsed >= interval.saturating_mul(entry.sent_count as u64)
            {
                entry.sent_count += 1;
                due.push(DueRetransmit {
                    header: entry.header.clone(),
                    message: entry.message.clone(),
                    emission: entry.sent_count,
                });
            }
        }
        due
    }

    /// Number of occupied slots.
    pub fn active(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_secs(10);
    const WINDOW: Duration = Duration::from_secs(60);
    const COUNT: u8 = 3;

    fn pump_at(q: &mut RetransmitQueue, secs: u64) -> Vec<DueRetransmit> {
        q.pump(Timestamp::from_secs(secs), INTERVAL, WINDOW, COUNT)
    }

    #[test]
    fn test_retransmits_on_schedule() {
        let mut q = RetransmitQueue::new(3);
        assert!(q.enqueue(b"102a000h304".to_vec(), None, Timestamp::ZERO));

        assert!(pump_at(&mut q, 5).is_empty());
        let due = pump_at(&mut q, 10);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].emission, 2);
        // Second retry is scheduled off sent_count, not off the last retry.
        assert!(pump_at(&mut q, 15).is_empty());
        let due = pump_at(&mut q, 20);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].emission, 3);
    }

    #[test]
    fn test_emission_bound() {
        let mut q = RetransmitQueue::new(3);
        q.enqueue(b"102a000h304".to_vec(), None, Timestamp::ZERO);
        let mut emissions = 1; // the first transmission
        for s in 1..=59 {
            emissions += pump_at(&mut q, s).len();
        }
        assert_eq!(emissions as u8, COUNT);
    }

    #[test]
    fn test_window_retires_entry() {
        let mut q = RetransmitQueue::new(3);
        q.enqueue(b"102a000h304".to_vec(), None, Timestamp::ZERO);
        assert_eq!(q.active(), 1);
        assert!(pump_at(&mut q, 61).is_empty());
        assert_eq!(q.active(), 0);
        // Slot is reusable immediately.
        assert!(q.enqueue(b"203b000h302".to_vec(), None, Timestamp::from_secs(61)));
    }

    #[test]
    fn test_full_queue_drops_redundancy() {
        let mut q = RetransmitQueue::new(3);
        for i in 0..3u8 {
            let mut header = b"102a000h304".to_vec();
            header[3] = b'a' + i;
            assert!(q.enqueue(header, None, Timestamp::ZERO));
        }
        assert!(!q.enqueue(b"405d000h301".to_vec(), None, Timestamp::ZERO));
        assert_eq!(q.active(), 3);
    }

    #[test]
    fn test_message_travels_with_header() {
        let mut q = RetransmitQueue::new(3);
        q.enqueue(
            b"000hFFFF128B2".to_vec(),
            Some(b"Hello".to_vec()),
            Timestamp::ZERO,
        );
        let due = pump_at(&mut q, 10);
        assert_eq!(due[0].message.as_deref(), Some(&b"Hello"[..]));
    }

    #[test]
    fn test_late_pump_inside_window_still_fires() {
        // The loop may be held by a long TX burst; a due retry fires on the
        // next pump rather than being lost.
        let mut q = RetransmitQueue::new(3);
        q.enqueue(b"102a000h304".to_vec(), None, Timestamp::ZERO);
        let due = pump_at(&mut q, 25);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].emission, 2);
    }
}
