//! Bookkeeping for requests awaiting a server answer.

use std::collections::{BTreeMap, BTreeSet};

use super::protocol::Package;

/// Ledger of sent requests that have not been answered yet.
///
/// State pushes are cleared one by one as `Acknowledge` answers arrive.
/// Polls are cleared in bulk: an `Other` answer echoing id `n` settles
/// every outstanding poll with id `<= n`, since a newer snapshot makes the
/// older polls moot.
#[derive(Debug, Default)]
pub struct PendingRequests {
    requests: BTreeMap<u64, Package>,
    polls: BTreeSet<u64>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an id-carrying request as outstanding. Requests without an
    /// id (login, teardown) are not tracked.
    pub fn track(&mut self, package: Package) {
        if let Some(id) = package.request_id() {
            if matches!(package, Package::GetOther { .. }) {
                self.polls.insert(id);
            }
            self.requests.insert(id, package);
        }
    }

    /// Settles one request by id, returning it if it was outstanding.
    pub fn acknowledge(&mut self, id: u64) -> Option<Package> {
        self.polls.remove(&id);
        self.requests.remove(&id)
    }

    /// Discards a request that will never be answered, such as one whose
    /// send failed after it was recorded.
    pub fn untrack(&mut self, id: u64) {
        self.polls.remove(&id);
        self.requests.remove(&id);
    }

    /// Settles every poll with id `<= id`.
    pub fn complete_polls_through(&mut self, id: u64) {
        let settled: Vec<u64> = self.polls.range(..=id).copied().collect();
        for poll in settled {
            self.polls.remove(&poll);
            self.requests.remove(&poll);
        }
    }

    pub fn outstanding(&self) -> usize {
        self.requests.len()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.requests.contains_key(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::protocol::Kinematics;

    fn message(id: u64) -> Package {
        Package::Message {
            id,
            state: Kinematics::default(),
        }
    }

    #[test]
    fn test_acks_empty_the_ledger() {
        let mut pending = PendingRequests::new();
        for id in 0..10 {
            pending.track(message(id));
        }
        assert_eq!(pending.outstanding(), 10);
        for id in 0..10 {
            assert!(pending.acknowledge(id).is_some());
        }
        assert!(pending.is_empty());
    }

    #[test]
    fn test_unknown_ack_is_noop() {
        let mut pending = PendingRequests::new();
        pending.track(message(1));
        assert!(pending.acknowledge(99).is_none());
        assert_eq!(pending.outstanding(), 1);
    }

    #[test]
    fn test_untracked_variants() {
        let mut pending = PendingRequests::new();
        pending.track(Package::Login);
        pending.track(Package::BreakSession);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_untrack_discards_both_kinds() {
        let mut pending = PendingRequests::new();
        pending.track(message(1));
        pending.track(Package::GetOther { id: 2 });
        pending.untrack(1);
        pending.untrack(2);
        assert!(pending.is_empty());
        // the discarded poll no longer counts toward a later bulk purge
        pending.track(Package::GetOther { id: 3 });
        pending.complete_polls_through(2);
        assert!(pending.contains(3));
    }

    #[test]
    fn test_poll_purge_keeps_later_polls() {
        let mut pending = PendingRequests::new();
        for id in [2, 4, 6] {
            pending.track(Package::GetOther { id });
        }
        pending.track(message(5));
        pending.complete_polls_through(4);
        assert!(!pending.contains(2));
        assert!(!pending.contains(4));
        assert!(pending.contains(6));
        // state pushes are untouched by the poll purge
        assert!(pending.contains(5));
        assert_eq!(pending.outstanding(), 2);
    }
}
