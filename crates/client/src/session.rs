//! Session lifecycle: registration, the paired send/receive threads, and
//! teardown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use autumn::net::{Answer, FinishReport, Kinematics, Package, PendingRequests, SEND_PERIOD_MS};

use crate::roster::Roster;
use crate::transport::{Transport, TransportError};

const CONNECT_ATTEMPTS: u32 = 5;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(100);
const TEARDOWN_ATTEMPTS: u32 = 5;
// lets the first state push land before we start waiting for answers
const RECEIVE_GRACE: Duration = Duration::from_millis(2 * SEND_PERIOD_MS);

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("server did not confirm registration")]
    NotRegistered,
}

/// Out-of-band happenings the driving loop should react to.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The server reported final standings.
    Finished(FinishReport),
    /// The server terminated the session.
    SessionClosed,
    /// The server rejected our last state as invalid; local prediction
    /// should fall back to the last acknowledged state.
    Rollback,
}

/// Registers with the server, retrying a few times since the login and
/// its confirmation both travel over lossy UDP.
pub fn connect(transport: &Transport) -> Result<(), SessionError> {
    for attempt in 1..=CONNECT_ATTEMPTS {
        transport.send(&Package::Login)?;
        if let Some(Answer::Registered) = transport.recv()? {
            log::info!("registered with {}", transport.server_addr());
            return Ok(());
        }
        log::debug!("no registration confirmation (attempt {attempt})");
        thread::sleep(CONNECT_RETRY_DELAY);
    }
    Err(SessionError::NotRegistered)
}

/// A running session: one thread pushing local state and polling for
/// opponents, one thread dispatching answers.
pub struct Session {
    transport: Arc<Transport>,
    local_state: Arc<Mutex<Kinematics>>,
    roster: Arc<Mutex<Roster>>,
    pending: Arc<Mutex<PendingRequests>>,
    running: Arc<AtomicBool>,
    events: Receiver<SessionEvent>,
    send_handle: JoinHandle<()>,
    recv_handle: JoinHandle<()>,
}

impl Session {
    /// Spawns the send and receive threads. The caller should have
    /// [`connect`]ed first.
    pub fn start(transport: Transport) -> Session {
        let transport = Arc::new(transport);
        let local_state = Arc::new(Mutex::new(Kinematics::default()));
        let roster = Arc::new(Mutex::new(Roster::new()));
        let pending = Arc::new(Mutex::new(PendingRequests::new()));
        let running = Arc::new(AtomicBool::new(true));
        let (event_tx, events) = mpsc::channel();

        let send_handle = {
            let transport = Arc::clone(&transport);
            let local_state = Arc::clone(&local_state);
            let pending = Arc::clone(&pending);
            let running = Arc::clone(&running);
            thread::spawn(move || send_loop(&transport, &local_state, &pending, &running))
        };
        let recv_handle = {
            let transport = Arc::clone(&transport);
            let roster = Arc::clone(&roster);
            let pending = Arc::clone(&pending);
            let running = Arc::clone(&running);
            thread::spawn(move || recv_loop(&transport, &roster, &pending, &running, event_tx))
        };

        Session {
            transport,
            local_state,
            roster,
            pending,
            running,
            events,
            send_handle,
            recv_handle,
        }
    }

    /// Publishes the local player's latest state for the next push.
    pub fn set_local_state(&self, state: Kinematics) {
        *self.local_state.lock().unwrap() = state;
    }

    /// Reports crossing the finish line with the current local state.
    pub fn report_finish(&self) {
        let id = self.transport.allocate_id();
        let mut state = *self.local_state.lock().unwrap();
        state.time = now_ms();
        push_tracked(&self.transport, &self.pending, Package::Finish { id, state });
    }

    /// Interpolated states of the remote players.
    pub fn remote_states(&self) -> Vec<Kinematics> {
        self.roster.lock().unwrap().states()
    }

    /// Advances remote-player playback time.
    pub fn advance_remotes(&self, delta_ms: u64) {
        self.roster.lock().unwrap().advance(delta_ms);
    }

    pub fn events(&self) -> &Receiver<SessionEvent> {
        &self.events
    }

    /// Requests still waiting for a server answer.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().outstanding()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stops both threads and tells the server the session is over. The
    /// teardown notice is retried a few times; if the server never
    /// confirms, it will notice the silence on its own eventually.
    pub fn shutdown(self) {
        self.running.store(false, Ordering::SeqCst);
        if self.send_handle.join().is_err() {
            log::error!("send thread panicked");
        }
        if self.recv_handle.join().is_err() {
            log::error!("receive thread panicked");
        }

        for _ in 0..TEARDOWN_ATTEMPTS {
            if let Err(e) = self.transport.send(&Package::BreakSession) {
                log::warn!("failed to send session teardown: {e}");
                continue;
            }
            match self.transport.recv() {
                Ok(Some(Answer::BreakSession)) => {
                    log::info!("session closed");
                    return;
                }
                Ok(_) => {}
                Err(e) => log::warn!("error awaiting teardown confirmation: {e}"),
            }
        }
        log::warn!("server never confirmed session teardown");
    }
}

fn send_loop(
    transport: &Transport,
    local_state: &Mutex<Kinematics>,
    pending: &Mutex<PendingRequests>,
    running: &AtomicBool,
) {
    while running.load(Ordering::SeqCst) {
        let mut state = *local_state.lock().unwrap();
        state.time = now_ms();

        let message = Package::Message {
            id: transport.allocate_id(),
            state,
        };
        let poll = Package::GetOther {
            id: transport.allocate_id(),
        };
        for package in [message, poll] {
            push_tracked(transport, pending, package);
        }
        thread::sleep(Duration::from_millis(SEND_PERIOD_MS));
    }
}

/// Records the request in the ledger, then sends it. The order matters:
/// on loopback the answer can arrive before `send_to` even returns, and
/// an entry inserted after its acknowledgement was dispatched would sit
/// in the ledger forever.
fn push_tracked(transport: &Transport, pending: &Mutex<PendingRequests>, package: Package) {
    pending.lock().unwrap().track(package.clone());
    if let Err(e) = transport.send(&package) {
        log::warn!("send failed: {e}");
        if let Some(id) = package.request_id() {
            pending.lock().unwrap().untrack(id);
        }
    }
}

fn recv_loop(
    transport: &Transport,
    roster: &Mutex<Roster>,
    pending: &Mutex<PendingRequests>,
    running: &AtomicBool,
    events: Sender<SessionEvent>,
) {
    thread::sleep(RECEIVE_GRACE);
    while running.load(Ordering::SeqCst) {
        let answer = match transport.recv() {
            Ok(Some(answer)) => answer,
            Ok(None) => continue,
            Err(e) => {
                log::error!("receive failed: {e}");
                running.store(false, Ordering::SeqCst);
                break;
            }
        };
        match answer {
            Answer::Acknowledge { id } => {
                if pending.lock().unwrap().acknowledge(id).is_none() {
                    log::debug!("acknowledgement for unknown request {id}");
                }
            }
            Answer::Other { id, players } => {
                roster.lock().unwrap().apply(&players);
                pending.lock().unwrap().complete_polls_through(id);
            }
            Answer::Finish(report) => {
                let _ = events.send(SessionEvent::Finished(report));
            }
            Answer::BreakSession => {
                log::error!("server closed the session");
                running.store(false, Ordering::SeqCst);
                let _ = events.send(SessionEvent::SessionClosed);
            }
            Answer::ErrorValueIncorrect => {
                log::warn!("server rejected our last state");
                let _ = events.send(SessionEvent::Rollback);
            }
            Answer::BadFormed => {
                log::warn!("server could not decode one of our requests");
            }
            // late duplicate of the login confirmation
            Answer::Registered => {}
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use autumn::fec;
    use std::net::UdpSocket;

    fn fake_server() -> UdpSocket {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        socket
    }

    fn recv_package(server: &UdpSocket) -> (Package, std::net::SocketAddr) {
        let mut buf = [0u8; 1024];
        let (len, from) = server.recv_from(&mut buf).unwrap();
        let payload = fec::decode_package(&buf[..len]).unwrap();
        (Package::decode(&payload).unwrap(), from)
    }

    fn send_answer(server: &UdpSocket, to: std::net::SocketAddr, answer: &Answer) {
        let datagram = fec::encode_package(&answer.encode()).unwrap();
        server.send_to(&datagram, to).unwrap();
    }

    #[test]
    fn test_sent_request_is_tracked() {
        let server = fake_server();
        let transport = Transport::open(server.local_addr().unwrap()).unwrap();
        let pending = Mutex::new(PendingRequests::new());
        let id = transport.allocate_id();
        push_tracked(&transport, &pending, Package::GetOther { id });
        assert!(pending.lock().unwrap().contains(id));
    }

    #[test]
    fn test_failed_send_leaves_no_ledger_entry() {
        // port zero is not a sendable destination
        let transport = Transport::open("127.0.0.1:0").unwrap();
        let pending = Mutex::new(PendingRequests::new());
        let id = transport.allocate_id();
        push_tracked(
            &transport,
            &pending,
            Package::Message {
                id,
                state: Kinematics::default(),
            },
        );
        assert!(pending.lock().unwrap().is_empty());
    }

    #[test]
    fn test_connect_retries_until_registered() {
        let server = fake_server();
        let addr = server.local_addr().unwrap();
        let handle = thread::spawn(move || {
            // ignore the first login, confirm the second
            let _ = recv_package(&server);
            let (package, from) = recv_package(&server);
            assert_eq!(package, Package::Login);
            send_answer(&server, from, &Answer::Registered);
        });

        let transport = Transport::open(addr).unwrap();
        connect(&transport).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_connect_gives_up() {
        let server = fake_server();
        let transport = Transport::open(server.local_addr().unwrap()).unwrap();
        assert!(matches!(
            connect(&transport),
            Err(SessionError::NotRegistered)
        ));
    }

    #[test]
    fn test_session_pushes_and_polls_then_tears_down() {
        let server = fake_server();
        let addr = server.local_addr().unwrap();

        let transport = Transport::open(addr).unwrap();
        let session = Session::start(transport);
        session.set_local_state(Kinematics {
            position: glam::DVec2::new(7.0, 0.0),
            ..Kinematics::default()
        });

        // the send thread emits both a state push and an opponent poll
        let mut saw_message = false;
        let mut saw_poll = false;
        while !saw_message || !saw_poll {
            let (package, from) = recv_package(&server);
            match package {
                Package::Message { id, state } => {
                    assert!(state.time > 0);
                    send_answer(&server, from, &Answer::Acknowledge { id });
                    saw_message = true;
                }
                Package::GetOther { id } => {
                    send_answer(
                        &server,
                        from,
                        &Answer::Other {
                            id,
                            players: vec![],
                        },
                    );
                    saw_poll = true;
                }
                other => panic!("unexpected package {other:?}"),
            }
        }

        assert!(session.is_running());
        let teardown = thread::spawn(move || session.shutdown());

        // teardown keeps notifying the server until it confirms
        loop {
            let (package, from) = recv_package(&server);
            if package == Package::BreakSession {
                send_answer(&server, from, &Answer::BreakSession);
                break;
            }
        }
        teardown.join().unwrap();
    }

    #[test]
    fn test_break_session_answer_stops_the_session() {
        let server = fake_server();
        let addr = server.local_addr().unwrap();

        let transport = Transport::open(addr).unwrap();
        let session = Session::start(transport);

        let (_, from) = recv_package(&server);
        send_answer(&server, from, &Answer::BreakSession);

        let event = session
            .events()
            .recv_timeout(Duration::from_secs(2))
            .unwrap();
        assert_eq!(event, SessionEvent::SessionClosed);
        session.shutdown();
    }
}
