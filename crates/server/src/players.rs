//! Authoritative player state and per-tick reconciliation.

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;

use autumn::net::{Answer, Kinematics, OtherSnapshot, Package};

/// Sink for answers produced while mutating the store. The processor
/// plugs in the real socket; tests record what would have been sent.
pub trait Respond {
    fn respond(&self, to: SocketAddr, answer: &Answer);
}

#[derive(Debug)]
struct Player {
    addr: SocketAddr,
    state: Kinematics,
    /// Samples received this tick, keyed by request id so reconciliation
    /// can replay them in send order regardless of arrival order.
    unprocessed: BTreeMap<u64, Kinematics>,
}

impl Player {
    fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            state: Kinematics::default(),
            unprocessed: BTreeMap::new(),
        }
    }
}

/// All registered players, keyed by their `"ip:port"` string. Only the
/// processor thread touches this, so no locking is needed.
#[derive(Debug, Default)]
pub struct PlayerStore {
    players: HashMap<String, Player>,
}

impl PlayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes one decoded package from `from`.
    pub fn process<R: Respond>(&mut self, package: Package, from: SocketAddr, responder: &R) {
        match package {
            Package::Login => self.login(from, responder),
            Package::Message { id, state } => self.buffer_sample(from, id, state),
            Package::GetOther { id } => self.answer_other(from, id, responder),
            Package::Finish { id, .. } => {
                // standings are not tracked yet, see answer_other
                log::debug!("ignoring finish report {id} from {from}");
            }
            Package::BreakSession => self.remove(from, responder),
        }
    }

    /// Registers `from`, or does nothing if already known. Always
    /// confirms, so a client may retry a lost login freely.
    fn login<R: Respond>(&mut self, from: SocketAddr, responder: &R) {
        self.players
            .entry(from.to_string())
            .or_insert_with(|| {
                log::info!("player {from} registered");
                Player::new(from)
            });
        responder.respond(from, &Answer::Registered);
    }

    /// Queues a state sample for the next reconciliation pass. Samples
    /// from unregistered senders are dropped.
    fn buffer_sample(&mut self, from: SocketAddr, id: u64, state: Kinematics) {
        let Some(player) = self.players.get_mut(&from.to_string()) else {
            log::debug!("state sample from unregistered {from}");
            return;
        };
        player.unprocessed.insert(id, state);
    }

    /// Applies every buffered sample in ascending-id order, last applied
    /// wins, acknowledging each id as it lands.
    pub fn reconcile<R: Respond>(&mut self, responder: &R) {
        for player in self.players.values_mut() {
            for (id, sample) in std::mem::take(&mut player.unprocessed) {
                player.state = sample;
                responder.respond(player.addr, &Answer::Acknowledge { id });
            }
        }
    }

    /// Answers a poll with every other player's authoritative state.
    /// Unregistered senders and lone players get no answer at all.
    fn answer_other<R: Respond>(&self, from: SocketAddr, request_id: u64, responder: &R) {
        let key = from.to_string();
        if !self.players.contains_key(&key) {
            log::debug!("poll from unregistered {from}");
            return;
        }
        if self.players.len() < 2 {
            return;
        }
        let players = self
            .players
            .iter()
            .filter(|(k, _)| **k != key)
            .enumerate()
            .map(|(i, (_, player))| OtherSnapshot {
                // ordinal only meaningful within this one response
                id: i as u64,
                state: player.state,
            })
            .collect();
        responder.respond(
            from,
            &Answer::Other {
                id: request_id,
                players,
            },
        );
    }

    /// Drops the player and confirms the teardown.
    fn remove<R: Respond>(&mut self, from: SocketAddr, responder: &R) {
        if self.players.remove(&from.to_string()).is_some() {
            log::info!("player {from} left");
        }
        responder.respond(from, &Answer::BreakSession);
    }
}
