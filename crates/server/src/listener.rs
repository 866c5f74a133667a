//! Socket thread: pulls raw datagrams off the wire and queues them for
//! the processor.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Duration;

use autumn::net::MAX_DATAGRAM_SIZE;

const READ_TIMEOUT: Duration = Duration::from_millis(250);

/// One datagram as received, before any repair or decoding.
#[derive(Debug)]
pub struct RawDatagram {
    pub bytes: Vec<u8>,
    pub from: SocketAddr,
}

/// Owns the server socket and the receive loop.
pub struct Listener {
    socket: Arc<UdpSocket>,
    running: Arc<AtomicBool>,
}

impl Listener {
    /// Binds the server socket. The short read timeout keeps the loop
    /// checking its stop flag.
    pub fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(READ_TIMEOUT))?;
        Ok(Self {
            socket: Arc::new(socket),
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Shared handle to the socket, for sending answers.
    pub fn socket(&self) -> Arc<UdpSocket> {
        Arc::clone(&self.socket)
    }

    /// Shared stop flag; clearing it winds down the receive loop.
    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Receives until stopped, forwarding every datagram into `sink`.
    pub fn run(&self, sink: Sender<RawDatagram>) {
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        while self.running.load(Ordering::SeqCst) {
            match self.socket.recv_from(&mut buf) {
                Ok((len, from)) => {
                    let datagram = RawDatagram {
                        bytes: buf[..len].to_vec(),
                        from,
                    };
                    if sink.send(datagram).is_err() {
                        // processor is gone, nothing left to feed
                        break;
                    }
                }
                Err(e)
                    if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
                // reported on connectionless sockets when a previous send
                // bounced off a vanished peer; harmless here
                Err(e) if e.kind() == io::ErrorKind::ConnectionReset => {}
                Err(e) => log::error!("socket receive failed: {e}"),
            }
        }
    }
}
