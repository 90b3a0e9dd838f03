//! Platform seams: infrared driver, clock, and blocking delay.
//!
//! The engine never touches hardware directly. An implementation pairs these
//! traits with real pins and timers on the lamp MCU, or with captured queues
//! in tests and simulation.

use crate::time::{Duration, Timestamp};
use crate::types::Direction;

/// Byte-oriented infrared channel: four directional emitters sharing one
/// omnidirectional receiver.
///
/// The emitters and the receiver share the IR medium, so the engine stops
/// the receiver for the whole of a four-direction burst; a driver that
/// leaves it running will decode its own transmission.
pub trait IrLink {
    /// Emit one character on the given directional emitter (NEC framing).
    fn tx_byte(&mut self, dir: Direction, byte: u8);

    /// Fetch the next decoded character, if any.
    fn poll_byte(&mut self) -> Option<u8>;

    /// Stop the receiver ahead of a transmission burst.
    fn receiver_stop(&mut self);

    /// Resume the receiver after the burst.
    fn receiver_start(&mut self);
}

/// Monotonic time source. The epoch is arbitrary but fixed per session.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Blocking wait, used only inside the TX burst where holding the loop is
/// required anyway (the carrier cannot be used in both directions at once).
pub trait Delay {
    fn delay(&mut self, d: Duration);
}

#[cfg(test)]
pub mod test_impls {
    //! Deterministic trait implementations for unit tests.

    use super::*;
    use alloc::collections::VecDeque;
    use alloc::vec::Vec;

    /// Captures transmitted bytes and serves queued receive bytes.
    pub struct MockLink {
        pub rx_queue: VecDeque<u8>,
        /// Every transmitted byte, in order, with its direction.
        pub tx_log: Vec<(Direction, u8)>,
        pub receiver_running: bool,
        /// Count of stop/start transitions, for gating assertions.
        pub stops: usize,
        pub starts: usize,
    }

    impl MockLink {
        pub fn new() -> Self {
            Self {
                rx_queue: VecDeque::new(),
                tx_log: Vec::new(),
                receiver_running: true,
                stops: 0,
                starts: 0,
            }
        }

        /// Queue a byte sequence for reception.
        pub fn push_rx(&mut self, bytes: &[u8]) {
            self.rx_queue.extend(bytes.iter().copied());
        }

        /// Bytes sent on one direction, in order.
        pub fn sent_on(&self, dir: Direction) -> Vec<u8> {
            self.tx_log
                .iter()
                .filter(|(d, _)| *d == dir)
                .map(|&(_, b)| b)
                .collect()
        }
    }

    impl Default for MockLink {
        fn default() -> Self {
            Self::new()
        }
    }

    impl IrLink for MockLink {
        fn tx_byte(&mut self, dir: Direction, byte: u8) {
            self.tx_log.push((dir, byte));
        }

        fn poll_byte(&mut self) -> Option<u8> {
            if self.receiver_running {
                self.rx_queue.pop_front()
            } else {
                None
            }
        }

        fn receiver_stop(&mut self) {
            self.receiver_running = false;
            self.stops += 1;
        }

        fn receiver_start(&mut self) {
            self.receiver_running = true;
            self.starts += 1;
        }
    }

    /// Manually advanced clock.
    pub struct MockClock {
        pub now: Timestamp,
    }

    impl MockClock {
        pub fn new() -> Self {
            Self {
                now: Timestamp::ZERO,
            }
        }

        pub fn advance(&mut self, d: Duration) {
            self.now += d;
        }
    }

    impl Default for MockClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clock for MockClock {
        fn now(&self) -> Timestamp {
            self.now
        }
    }

    /// Clock advanced from outside the node that owns it.
    #[derive(Clone)]
    pub struct SharedClock(pub alloc::rc::Rc<core::cell::Cell<u64>>);

    impl SharedClock {
        pub fn new() -> Self {
            Self(alloc::rc::Rc::new(core::cell::Cell::new(0)))
        }

        pub fn advance(&self, d: Duration) {
            self.0.set(self.0.get() + d.as_millis());
        }

        pub fn set(&self, t: Timestamp) {
            self.0.set(t.as_millis());
        }
    }

    impl Default for SharedClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clock for SharedClock {
        fn now(&self) -> Timestamp {
            Timestamp::from_millis(self.0.get())
        }
    }

    /// Records requested delays without sleeping.
    pub struct MockDelay {
        pub log: Vec<Duration>,
    }

    impl MockDelay {
        pub fn new() -> Self {
            Self { log: Vec::new() }
        }

        pub fn total(&self) -> Duration {
            self.log
                .iter()
                .fold(Duration::ZERO, |acc, &d| acc + d)
        }
    }

    impl Default for MockDelay {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Delay for MockDelay {
        fn delay(&mut self, d: Duration) {
            self.log.push(d);
        }
    }
}
