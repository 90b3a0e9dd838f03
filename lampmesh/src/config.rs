//! Compile-time protocol configuration.
//!
//! The `MeshConfig` trait collects the deployment-tunable constants. Lamps
//! and HQ differ only here: HQ absorbs traffic from the whole field and
//! carries a larger dedup cache.

use crate::time::Duration;

/// Configuration trait for protocol tuning. All bounds must be non-zero.
pub trait MeshConfig {
    /// Dedup ring slots.
    const CACHE_SIZE: usize;

    /// Pending-redundancy slots.
    const RETRANSMIT_SLOTS: usize;

    /// Total emissions per tracked packet (first transmission included).
    const RETRANSMIT_COUNT: u8;

    /// Spacing between scheduled retransmissions.
    const RETRANSMIT_INTERVAL: Duration;

    /// Horizon after which a tracked packet is retired.
    const REDUNDANCY_WINDOW: Duration;

    /// Gradient tolerance K: how far downstream a node may still forward.
    const GRADIENT_TOLERANCE: u8;

    /// Pause between the four directional emissions of a burst.
    const IR_DIRECTION_GAP: Duration;

    /// How long a pending header waits for its message segment.
    const IR_MESSAGE_TIMEOUT: Duration;

    /// How often a held LiFi message is re-driven to phones.
    const LIFI_REBROADCAST_INTERVAL: Duration;

    /// Minimum spacing between accepted SOS button presses.
    const SOS_COOLDOWN: Duration;
}

/// Street-lamp deployment defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct LampConfig;

impl MeshConfig for LampConfig {
    const CACHE_SIZE: usize = 3;
    const RETRANSMIT_SLOTS: usize = 3;
    const RETRANSMIT_COUNT: u8 = 2;
    const RETRANSMIT_INTERVAL: Duration = Duration::from_secs(10);
    const REDUNDANCY_WINDOW: Duration = Duration::from_secs(60);
    const GRADIENT_TOLERANCE: u8 = 1;
    const IR_DIRECTION_GAP: Duration = Duration::from_millis(100);
    const IR_MESSAGE_TIMEOUT: Duration = Duration::from_secs(3);
    const LIFI_REBROADCAST_INTERVAL: Duration = Duration::from_secs(60);
    const SOS_COOLDOWN: Duration = Duration::from_secs(180);
}

/// Headquarters: same timing, larger dedup cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct HqConfig;

impl MeshConfig for HqConfig {
    const CACHE_SIZE: usize = 8;
    const RETRANSMIT_SLOTS: usize = 3;
    const RETRANSMIT_COUNT: u8 = 2;
    const RETRANSMIT_INTERVAL: Duration = Duration::from_secs(10);
    const REDUNDANCY_WINDOW: Duration = Duration::from_secs(60);
    const GRADIENT_TOLERANCE: u8 = 1;
    const IR_DIRECTION_GAP: Duration = Duration::from_millis(100);
    const IR_MESSAGE_TIMEOUT: Duration = Duration::from_secs(3);
    const LIFI_REBROADCAST_INTERVAL: Duration = Duration::from_secs(60);
    const SOS_COOLDOWN: Duration = Duration::from_secs(180);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hq_cache_outsizes_lamp_cache() {
        assert!(HqConfig::CACHE_SIZE > LampConfig::CACHE_SIZE);
    }

    #[test]
    fn test_bounds_nonzero() {
        assert!(LampConfig::CACHE_SIZE > 0);
        assert!(LampConfig::RETRANSMIT_SLOTS > 0);
        assert!(LampConfig::RETRANSMIT_COUNT > 0);
        assert!(HqConfig::CACHE_SIZE > 0);
    }

    #[test]
    fn test_schedule_fits_window() {
        // Every scheduled retransmission lands inside the redundancy window.
        let last = LampConfig::RETRANSMIT_INTERVAL
            .saturating_mul((LampConfig::RETRANSMIT_COUNT - 1) as u64);
        assert!(last < LampConfig::REDUNDANCY_WINDOW);
    }
}
