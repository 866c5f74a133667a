//! Interpolation of a remote player between received snapshots.

use crate::net::Kinematics;

/// Snapshot gap above which interpolation gives up and jumps to the newer
/// state. Gaps this large mean the peer stalled or we lost a long run of
/// datagrams, and easing across them would replay ancient movement.
pub const SNAP_THRESHOLD_MS: u64 = 10_000;

/// Smooths one remote player's motion between its last two snapshots.
///
/// Never extrapolates: once local time passes the newer snapshot the
/// player holds there until the next snapshot arrives.
#[derive(Debug, Clone, Default)]
pub struct Interpolator {
    current: Kinematics,
    next: Kinematics,
    elapsed_ms: u64,
    seeded: bool,
}

impl Interpolator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a freshly received snapshot, restarting the blend from the
    /// previously newest one. The first snapshot seeds both endpoints.
    pub fn push(&mut self, state: Kinematics) {
        if self.seeded {
            self.current = self.next;
        } else {
            self.current = state;
            self.seeded = true;
        }
        self.next = state;
        self.elapsed_ms = 0;
    }

    /// Advances local playback time.
    pub fn advance(&mut self, delta_ms: u64) {
        self.elapsed_ms = self.elapsed_ms.saturating_add(delta_ms);
    }

    /// State to display right now.
    pub fn sample(&self) -> Kinematics {
        let span = self.next.time.saturating_sub(self.current.time);
        if span == 0 || span >= SNAP_THRESHOLD_MS {
            return self.next;
        }
        let t = (self.elapsed_ms as f64 / span as f64).clamp(0.0, 1.0);
        Kinematics {
            position: self.current.position.lerp(self.next.position, t),
            velocity: self.current.velocity.lerp(self.next.velocity, t),
            acceleration: self.current.acceleration.lerp(self.next.acceleration, t),
            time: self.current.time + (t * span as f64) as u64,
        }
    }

    /// Newest snapshot received, unblended.
    pub fn latest(&self) -> Kinematics {
        self.next
    }

    pub fn has_state(&self) -> bool {
        self.seeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;

    fn at(x: f64, time: u64) -> Kinematics {
        Kinematics {
            position: DVec2::new(x, 0.0),
            velocity: DVec2::new(10.0, 0.0),
            acceleration: DVec2::ZERO,
            time,
        }
    }

    #[test]
    fn test_first_snapshot_seeds_both_endpoints() {
        let mut interp = Interpolator::new();
        assert!(!interp.has_state());
        interp.push(at(5.0, 1000));
        assert!(interp.has_state());
        assert_eq!(interp.sample(), at(5.0, 1000));
    }

    #[test]
    fn test_midpoint_blend() {
        let mut interp = Interpolator::new();
        interp.push(at(0.0, 1000));
        interp.push(at(10.0, 1100));
        interp.advance(50);
        let sample = interp.sample();
        assert!((sample.position.x - 5.0).abs() < 1e-9);
        assert_eq!(sample.time, 1050);
    }

    #[test]
    fn test_never_extrapolates() {
        let mut interp = Interpolator::new();
        interp.push(at(0.0, 1000));
        interp.push(at(10.0, 1100));
        interp.advance(500);
        assert_eq!(interp.sample(), at(10.0, 1100));
    }

    #[test]
    fn test_snaps_across_large_gap() {
        let mut interp = Interpolator::new();
        interp.push(at(0.0, 1000));
        interp.push(at(10.0, 1000 + SNAP_THRESHOLD_MS));
        // no blend at all, even at elapsed zero
        assert_eq!(interp.sample(), at(10.0, 1000 + SNAP_THRESHOLD_MS));
    }

    #[test]
    fn test_out_of_order_snapshot_snaps() {
        let mut interp = Interpolator::new();
        interp.push(at(10.0, 2000));
        interp.push(at(0.0, 1000));
        // span underflows to zero, so the newest snapshot wins outright
        assert_eq!(interp.sample(), at(0.0, 1000));
    }
}
