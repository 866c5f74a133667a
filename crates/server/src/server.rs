//! Processor thread: repairs and decodes queued datagrams, feeds the
//! player store, and runs the per-tick reconciliation.

use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use autumn::fec;
use autumn::net::{Answer, Package};

use crate::config::ServerConfig;
use crate::listener::RawDatagram;
use crate::players::{PlayerStore, Respond};

/// Sends answers back out through the listener's socket.
pub struct SocketResponder {
    socket: Arc<UdpSocket>,
}

impl SocketResponder {
    pub fn new(socket: Arc<UdpSocket>) -> Self {
        Self { socket }
    }
}

impl Respond for SocketResponder {
    fn respond(&self, to: SocketAddr, answer: &Answer) {
        match fec::encode_package(&answer.encode()) {
            Ok(datagram) => {
                if let Err(e) = self.socket.send_to(&datagram, to) {
                    log::warn!("failed to send answer to {to}: {e}");
                }
            }
            Err(e) => log::warn!("failed to protect answer for {to}: {e}"),
        }
    }
}

/// Drains the datagram queue in rate-limited ticks and reconciles the
/// store after each batch.
pub struct Processor<R: Respond> {
    store: PlayerStore,
    responder: R,
    config: ServerConfig,
    running: Arc<AtomicBool>,
}

impl<R: Respond> Processor<R> {
    pub fn new(responder: R, config: ServerConfig, running: Arc<AtomicBool>) -> Self {
        Self {
            store: PlayerStore::new(),
            responder,
            config,
            running,
        }
    }

    /// Processes until stopped. Each tick handles at most
    /// `max_packages_per_tick` datagrams; the rest wait for the next
    /// tick. A stop request still drains everything already queued.
    pub fn run(&mut self, queue: &Receiver<RawDatagram>) {
        let tick = Duration::from_millis(self.config.tick_interval_ms);
        while self.running.load(Ordering::SeqCst) {
            let deadline = Instant::now() + tick;
            let mut handled = 0;

            match queue.recv_timeout(tick) {
                Ok(datagram) => {
                    self.handle(datagram);
                    handled += 1;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            while handled < self.config.max_packages_per_tick {
                match queue.try_recv() {
                    Ok(datagram) => {
                        self.handle(datagram);
                        handled += 1;
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        self.running.store(false, Ordering::SeqCst);
                        break;
                    }
                }
            }

            if handled > 0 {
                self.store.reconcile(&self.responder);
            }
            if let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
                thread::sleep(remaining);
            }
        }

        // stop requested: finish whatever the listener already queued
        while let Ok(datagram) = queue.try_recv() {
            self.handle(datagram);
        }
        self.store.reconcile(&self.responder);
    }

    /// Repairs and decodes one datagram. Transport-level corruption is
    /// dropped without a reply; a payload that fails wire decoding gets
    /// a `BadFormed` answer.
    fn handle(&mut self, datagram: RawDatagram) {
        let payload = match fec::decode_package(&datagram.bytes) {
            Ok(payload) => payload,
            Err(e) => {
                log::debug!("dropping corrupt datagram from {}: {e}", datagram.from);
                return;
            }
        };
        match Package::decode(&payload) {
            Ok(package) => self.store.process(package, datagram.from, &self.responder),
            Err(e) => {
                log::debug!("bad formed package from {}: {e}", datagram.from);
                self.responder.respond(datagram.from, &Answer::BadFormed);
            }
        }
    }
}
