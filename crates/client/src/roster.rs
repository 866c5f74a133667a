//! Local roster of remote players.

use autumn::interp::Interpolator;
use autumn::net::{Kinematics, OtherSnapshot};

/// Interpolators for every remote player seen so far.
///
/// The roster only ever grows: a response reporting fewer players than
/// before marks the extras inactive but keeps their entries, so a player
/// reappearing in a later response resumes from their last known state.
#[derive(Debug, Default)]
pub struct Roster {
    players: Vec<Interpolator>,
    active: usize,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one snapshot list, growing the roster as needed. Entries
    /// are matched by position in the list.
    pub fn apply(&mut self, snapshots: &[OtherSnapshot]) {
        if snapshots.len() > self.players.len() {
            self.players.resize_with(snapshots.len(), Interpolator::new);
        }
        self.active = snapshots.len();
        for (player, snapshot) in self.players.iter_mut().zip(snapshots) {
            player.push(snapshot.state);
        }
    }

    /// Advances playback time for every entry.
    pub fn advance(&mut self, delta_ms: u64) {
        for player in &mut self.players {
            player.advance(delta_ms);
        }
    }

    /// Interpolated states of the currently active players.
    pub fn states(&self) -> Vec<Kinematics> {
        self.players[..self.active]
            .iter()
            .map(Interpolator::sample)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;

    fn snapshots(count: usize, base_x: f64, time: u64) -> Vec<OtherSnapshot> {
        (0..count)
            .map(|i| OtherSnapshot {
                id: i as u64,
                state: Kinematics {
                    position: DVec2::new(base_x + i as f64, 0.0),
                    time,
                    ..Kinematics::default()
                },
            })
            .collect()
    }

    #[test]
    fn test_grows_to_reported_count() {
        let mut roster = Roster::new();
        roster.apply(&snapshots(5, 0.0, 1000));
        assert_eq!(roster.states().len(), 5);
        assert_eq!(roster.states()[3].position.x, 3.0);
    }

    #[test]
    fn test_fewer_snapshots_deactivate_without_discarding() {
        let mut roster = Roster::new();
        roster.apply(&snapshots(5, 0.0, 1000));
        roster.apply(&snapshots(3, 0.0, 1100));
        assert_eq!(roster.states().len(), 3);

        // entries 3 and 4 kept their history: when they reappear, the
        // blend starts from the old snapshot, not the new one
        roster.apply(&snapshots(5, 100.0, 2000));
        let states = roster.states();
        assert_eq!(states.len(), 5);
        assert_eq!(states[4].position.x, 4.0);
        // a freshly created entry would instead sit at the new snapshot
        assert_eq!(states[2].position.x, 2.0);
    }
}
