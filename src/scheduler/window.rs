// ABOUTME: Sliding quota window - admission timestamps within a trailing horizon.
// ABOUTME: Pruned against a caller-supplied `now` before every admission decision.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// Trailing horizon of the per-second window.
pub const SECOND: Duration = Duration::from_secs(1);

/// Trailing horizon of the per-minute window.
pub const MINUTE: Duration = Duration::from_secs(60);

/// Admission timestamps falling within a fixed trailing horizon.
#[derive(Debug)]
pub struct QuotaWindow {
    horizon: Duration,
    admissions: VecDeque<Instant>,
}

impl QuotaWindow {
    /// Create an empty window with the given horizon.
    pub fn new(horizon: Duration) -> Self {
        Self {
            horizon,
            admissions: VecDeque::new(),
        }
    }

    /// Drop admissions that are at least `horizon` old relative to `now`.
    pub fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.admissions.front() {
            if now.saturating_duration_since(oldest) >= self.horizon {
                self.admissions.pop_front();
            } else {
                break;
            }
        }
    }

    /// Record `count` admissions at `at`.
    pub fn record(&mut self, at: Instant, count: usize) {
        self.admissions.extend(std::iter::repeat_n(at, count));
    }

    /// Number of admissions currently held.
    pub fn len(&self) -> usize {
        self.admissions.len()
    }

    /// Returns true if no admissions are held.
    pub fn is_empty(&self) -> bool {
        self.admissions.is_empty()
    }

    /// Remaining headroom under `ceiling`, negative if the ceiling was lowered
    /// below the current count.
    pub fn headroom(&self, ceiling: u32) -> i64 {
        i64::from(ceiling) - self.admissions.len() as i64
    }

    /// When the oldest held admission leaves the horizon.
    pub fn next_expiry(&self) -> Option<Instant> {
        self.admissions.front().map(|&oldest| oldest + self.horizon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prune_drops_entries_at_horizon() {
        let start = Instant::now();
        let mut window = QuotaWindow::new(SECOND);
        window.record(start, 2);
        window.record(start + Duration::from_millis(500), 1);

        window.prune(start + Duration::from_millis(999));
        assert_eq!(window.len(), 3);

        window.prune(start + SECOND);
        assert_eq!(window.len(), 1);

        window.prune(start + Duration::from_millis(1500));
        assert!(window.is_empty());
    }

    #[test]
    fn test_headroom_goes_negative_after_ceiling_drop() {
        let mut window = QuotaWindow::new(MINUTE);
        window.record(Instant::now(), 5);
        assert_eq!(window.headroom(8), 3);
        assert_eq!(window.headroom(3), -2);
    }

    #[test]
    fn test_next_expiry_tracks_oldest() {
        let start = Instant::now();
        let mut window = QuotaWindow::new(SECOND);
        assert!(window.next_expiry().is_none());

        window.record(start, 1);
        window.record(start + Duration::from_millis(300), 1);
        assert_eq!(window.next_expiry(), Some(start + SECOND));
    }
}
