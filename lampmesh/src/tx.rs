//! Four-direction transmission bursts.
//!
//! Emission is blocking and holds the cooperative loop: the receiver shares
//! the IR channel and is stopped for the whole burst, so nothing useful
//! could run concurrently anyway. Characters are paced at the NEC decode
//! budget and every segment ends in the space terminator.

use crate::time::Duration;
use crate::traits::{Delay, IrLink};
use crate::types::{Direction, SEGMENT_TERMINATOR, IR_CHAR_GAP, IR_SEGMENT_GAP};

/// Emit a header (and optional message) on all four directions in clockwise
/// order FRONT, RIGHT, BACK, LEFT.
pub fn transmit_burst<L: IrLink, D: Delay>(
    link: &mut L,
    delay: &mut D,
    direction_gap: Duration,
    header: &[u8],
    message: Option<&[u8]>,
) {
    link.receiver_stop();

    for (i, &dir) in Direction::ALL.iter().enumerate() {
        send_segment(link, delay, dir, header);
        if let Some(message) = message {
            delay.delay(IR_SEGMENT_GAP);
            send_segment(link, delay, dir, message);
        }
        if i + 1 < Direction::ALL.len() {
            delay.delay(direction_gap);
        }
    }

    link.receiver_start();
}

/// One space-terminated segment on one emitter, character by character.
fn send_segment<L: IrLink, D: Delay>(link: &mut L, delay: &mut D, dir: Direction, bytes: &[u8]) {
    for &b in bytes {
        link.tx_byte(dir, b);
        delay.delay(IR_CHAR_GAP);
    }
    link.tx_byte(dir, SEGMENT_TERMINATOR);
    delay.delay(IR_CHAR_GAP);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::test_impls::{MockDelay, MockLink};

    const GAP: Duration = Duration::from_millis(100);

    #[test]
    fn test_all_four_directions_carry_the_segment() {
        let mut link = MockLink::new();
        let mut delay = MockDelay::new();
        transmit_burst(&mut link, &mut delay, GAP, b"102a000h304", None);

        for dir in Direction::ALL {
            assert_eq!(link.sent_on(dir), b"102a000h304 ");
        }
    }

    #[test]
    fn test_clockwise_direction_order() {
        let mut link = MockLink::new();
        let mut delay = MockDelay::new();
        transmit_burst(&mut link, &mut delay, GAP, b"000h01000", None);

        let order: alloc::vec::Vec<Direction> = link
            .tx_log
            .iter()
            .map(|&(d, _)| d)
            .collect();
        let per_dir = b"000h01000 ".len();
        assert_eq!(order.len(), per_dir * 4);
        assert!(order[..per_dir].iter().all(|&d| d == Direction::Front));
        assert!(order[per_dir..2 * per_dir].iter().all(|&d| d == Direction::Right));
        assert!(order[2 * per_dir..3 * per_dir].iter().all(|&d| d == Direction::Back));
        assert!(order[3 * per_dir..].iter().all(|&d| d == Direction::Left));
    }

    #[test]
    fn test_receiver_gated_for_whole_burst() {
        let mut link = MockLink::new();
        let mut delay = MockDelay::new();
        transmit_burst(&mut link, &mut delay, GAP, b"000hFFFF128B2", Some(b"Hello"));

        assert_eq!(link.stops, 1);
        assert_eq!(link.starts, 1);
        assert!(link.receiver_running);
    }

    #[test]
    fn test_message_follows_header_on_each_direction() {
        let mut link = MockLink::new();
        let mut delay = MockDelay::new();
        transmit_burst(&mut link, &mut delay, GAP, b"000hFFFF128B2", Some(b"Hello"));

        for dir in Direction::ALL {
            assert_eq!(link.sent_on(dir), b"000hFFFF128B2 Hello ");
        }
    }

    #[test]
    fn test_burst_timing() {
        let mut link = MockLink::new();
        let mut delay = MockDelay::new();
        transmit_burst(&mut link, &mut delay, GAP, b"102a000h304", None);

        // 12 paced characters per direction plus 3 inter-direction gaps.
        let chars = (b"102a000h304".len() as u64 + 1) * 4;
        let expected = IR_CHAR_GAP.saturating_mul(chars) + GAP.saturating_mul(3);
        assert_eq!(delay.total(), expected);
    }

    #[test]
    fn test_header_message_gap_present() {
        let mut link = MockLink::new();
        let mut delay = MockDelay::new();
        transmit_burst(&mut link, &mut delay, GAP, b"000hFFFF128B2", Some(b"Hi"));

        // Per direction: 14 header chars, then the 50 ms re-arm gap, then
        // 3 message chars; directions separated by the direction gap.
        let gaps: alloc::vec::Vec<Duration> =
            delay.log.iter().copied().filter(|&d| d == IR_SEGMENT_GAP).collect();
        assert_eq!(gaps.len(), 4);
    }
}
