//! UDP endpoint talking to one game server.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use autumn::fec::{self, FecError};
use autumn::net::{Answer, Package, MAX_DATAGRAM_SIZE};

const READ_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("socket error: {0}")]
    Io(#[from] io::Error),
    #[error("datagram protection failed: {0}")]
    Fec(#[from] FecError),
    #[error("server address did not resolve")]
    NoAddress,
}

/// Client side of the UDP exchange. Outgoing packages are FEC-protected;
/// incoming datagrams are repaired and decoded, with anything unreadable
/// dropped on the floor.
pub struct Transport {
    socket: UdpSocket,
    server_addr: SocketAddr,
    next_request_id: AtomicU64,
}

impl Transport {
    /// Binds an ephemeral local socket aimed at `server`. The short read
    /// timeout keeps receive loops responsive to shutdown.
    pub fn open<A: ToSocketAddrs>(server: A) -> Result<Self, TransportError> {
        let server_addr = server
            .to_socket_addrs()?
            .next()
            .ok_or(TransportError::NoAddress)?;
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_read_timeout(Some(READ_TIMEOUT))?;
        Ok(Self {
            socket,
            server_addr,
            next_request_id: AtomicU64::new(1),
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    /// Allocates the next monotonic request id.
    pub fn allocate_id(&self) -> u64 {
        self.next_request_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Protects and sends one package to the server.
    pub fn send(&self, package: &Package) -> Result<(), TransportError> {
        let datagram = fec::encode_package(&package.encode())?;
        self.socket.send_to(&datagram, self.server_addr)?;
        Ok(())
    }

    /// Receives one answer if a readable datagram is waiting.
    ///
    /// Returns `Ok(None)` on timeout and on datagrams that fail repair or
    /// decoding; only genuine socket failures surface as errors.
    pub fn recv(&self) -> Result<Option<Answer>, TransportError> {
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        let (len, from) = match self.socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock
                        | io::ErrorKind::TimedOut
                        | io::ErrorKind::ConnectionReset
                ) =>
            {
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let payload = match fec::decode_package(&buf[..len]) {
            Ok(payload) => payload,
            Err(e) => {
                log::debug!("dropping corrupt datagram from {from}: {e}");
                return Ok(None);
            }
        };
        match Answer::decode(&payload) {
            Ok(answer) => Ok(Some(answer)),
            Err(e) => {
                log::debug!("dropping undecodable answer from {from}: {e}");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autumn::net::Kinematics;

    #[test]
    fn test_ids_are_monotonic() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let transport = Transport::open(server.local_addr().unwrap()).unwrap();
        let first = transport.allocate_id();
        let second = transport.allocate_id();
        assert!(second > first);
    }

    #[test]
    fn test_send_and_recv_round_trip() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        server
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let transport = Transport::open(server.local_addr().unwrap()).unwrap();

        transport
            .send(&Package::Message {
                id: 1,
                state: Kinematics::default(),
            })
            .unwrap();

        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        let (len, from) = server.recv_from(&mut buf).unwrap();
        let payload = fec::decode_package(&buf[..len]).unwrap();
        assert!(matches!(
            Package::decode(&payload),
            Ok(Package::Message { id: 1, .. })
        ));

        let reply = fec::encode_package(&Answer::Acknowledge { id: 1 }.encode()).unwrap();
        server.send_to(&reply, from).unwrap();
        let answer = loop {
            if let Some(answer) = transport.recv().unwrap() {
                break answer;
            }
        };
        assert_eq!(answer, Answer::Acknowledge { id: 1 });
    }

    #[test]
    fn test_recv_drops_garbage() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let transport = Transport::open(server.local_addr().unwrap()).unwrap();

        let port = transport.socket.local_addr().unwrap().port();
        server.send_to(&[0xFF; 16], ("127.0.0.1", port)).unwrap();
        // the garbage datagram is swallowed and the next poll times out
        let mut seen = None;
        for _ in 0..4 {
            if let Some(answer) = transport.recv().unwrap() {
                seen = Some(answer);
            }
        }
        assert!(seen.is_none());
    }
}
