// Blocking TLS connections.
//
// A `TlsConnection` owns a non-blocking `TcpStream` and drives rustls by
// hand: every rustls call happens under a short-lived mutex, and every block
// happens in the waiter with the mutex released. One thread may block in
// `read` while another blocks in `write`; a third may call `interrupt` to
// unblock both. After an interrupt the descriptor is never touched again and
// every operation returns `Interrupted`.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::os::fd::AsFd;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::tls::context::{ClientContext, ServerContext};
use crate::tls::waiter::{SocketWaiter, WaitDirection, WaitOutcome};

pub struct TlsConnection {
    stream: TcpStream,
    conn: Mutex<rustls::Connection>,
    waiter: Arc<SocketWaiter>,
}

fn deadline_from(timeout: Duration) -> Option<Instant> {
    (!timeout.is_zero()).then(|| Instant::now() + timeout)
}

fn wait_ready(
    waiter: &SocketWaiter,
    stream: &TcpStream,
    direction: WaitDirection,
    deadline: Option<Instant>,
) -> Result<()> {
    let timeout = match deadline {
        None => Duration::ZERO,
        Some(deadline) => {
            let now = Instant::now();
            if now >= deadline {
                return Err(Error::Timeout);
            }
            deadline - now
        }
    };
    match waiter.wait(stream.as_fd(), direction, timeout) {
        WaitOutcome::Ready => Ok(()),
        WaitOutcome::TimedOut => Err(Error::Timeout),
        WaitOutcome::Interrupted => Err(Error::Interrupted),
        WaitOutcome::Closed => Err(Error::Closed),
    }
}

impl ClientContext {
    /// Handshake over an established TCP connection. `Duration::ZERO` means
    /// no time limit.
    pub fn connect(
        &self,
        stream: TcpStream,
        server_name: &str,
        timeout: Duration,
    ) -> Result<TlsConnection> {
        let server_name = rustls::pki_types::ServerName::try_from(server_name.to_string())
            .map_err(|_| Error::InvalidArgument("invalid server name"))?;
        stream.set_nonblocking(true)?;
        let conn = rustls::ClientConnection::new(self.config.clone(), server_name)?;
        let connection = TlsConnection::new(stream, rustls::Connection::Client(conn))?;
        connection.complete_handshake(deadline_from(timeout))?;
        Ok(connection)
    }
}

impl ServerContext {
    /// Accept one TLS connection: read the ClientHello, consult the ALPN
    /// selector if one is configured, then complete the handshake.
    pub fn accept(&self, stream: TcpStream, timeout: Duration) -> Result<TlsConnection> {
        stream.set_nonblocking(true)?;
        let waiter = Arc::new(SocketWaiter::new()?);
        let deadline = deadline_from(timeout);

        let mut acceptor = rustls::server::Acceptor::default();
        let accepted = loop {
            match acceptor.read_tls(&mut (&stream)) {
                Ok(0) => return Err(Error::Closed),
                Ok(_) => (),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    wait_ready(&waiter, &stream, WaitDirection::Read, deadline)?;
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
            match acceptor.accept() {
                Ok(Some(accepted)) => break accepted,
                Ok(None) => (),
                Err((e, mut alert)) => {
                    let _ = alert.write(&mut (&stream));
                    return Err(e.into());
                }
            }
        };

        let offered: Vec<Vec<u8>> = accepted
            .client_hello()
            .alpn()
            .map(|protocols| protocols.map(|p| p.to_vec()).collect())
            .unwrap_or_default();
        let config = self.config_for_offer(&offered);

        let conn = match accepted.into_connection(config) {
            Ok(conn) => conn,
            Err((e, mut alert)) => {
                let _ = alert.write(&mut (&stream));
                return Err(e.into());
            }
        };

        let connection = TlsConnection {
            stream,
            conn: Mutex::new(rustls::Connection::Server(conn)),
            waiter,
        };
        connection.complete_handshake(deadline)?;
        Ok(connection)
    }
}

impl TlsConnection {
    fn new(stream: TcpStream, conn: rustls::Connection) -> Result<Self> {
        Ok(TlsConnection {
            stream,
            conn: Mutex::new(conn),
            waiter: Arc::new(SocketWaiter::new()?),
        })
    }

    fn check_alive(&self) -> Result<()> {
        if !self.waiter.is_alive() {
            return Err(Error::Interrupted);
        }
        Ok(())
    }

    fn complete_handshake(&self, deadline: Option<Instant>) -> Result<()> {
        loop {
            let (handshaking, wants_write) = {
                let conn = self.conn.lock();
                (conn.is_handshaking(), conn.wants_write())
            };
            if wants_write {
                self.flush_tls(deadline)?;
                continue;
            }
            if !handshaking {
                log::debug!(
                    "handshake complete, protocol {:?}, alpn {:?}",
                    self.protocol_version(),
                    self.alpn_protocol().map(|p| String::from_utf8_lossy(&p).into_owned())
                );
                return Ok(());
            }
            self.fill_tls(deadline)?;
        }
    }

    /// Write all pending TLS records to the socket, blocking as needed.
    fn flush_tls(&self, deadline: Option<Instant>) -> Result<()> {
        loop {
            {
                let mut conn = self.conn.lock();
                if !conn.wants_write() {
                    return Ok(());
                }
                match conn.write_tls(&mut (&self.stream)) {
                    Ok(_) => continue,
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => (),
                    Err(e) => return Err(e.into()),
                }
            }
            self.check_alive()?;
            wait_ready(&self.waiter, &self.stream, WaitDirection::Write, deadline)?;
        }
    }

    /// Read at least one TLS record from the socket and process it,
    /// blocking as needed.
    fn fill_tls(&self, deadline: Option<Instant>) -> Result<()> {
        loop {
            {
                let mut conn = self.conn.lock();
                match conn.read_tls(&mut (&self.stream)) {
                    Ok(0) => {
                        // Peer closed the transport. rustls has recorded the
                        // EOF; the plaintext reader reports it from here on.
                        conn.process_new_packets()?;
                        if conn.is_handshaking() {
                            return Err(Error::Closed);
                        }
                        return Ok(());
                    }
                    Ok(_) => {
                        if let Err(e) = conn.process_new_packets() {
                            drop(conn);
                            // Best effort: send the alert rustls queued.
                            let _ = self.flush_tls(deadline);
                            return Err(e.into());
                        }
                        return Ok(());
                    }
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => (),
                    Err(e) => return Err(e.into()),
                }
            }
            self.check_alive()?;
            wait_ready(&self.waiter, &self.stream, WaitDirection::Read, deadline)?;
        }
    }

    /// Read decrypted application data. Returns 0 only after the peer's
    /// close_notify; an abrupt transport close is `Error::Closed`.
    /// `Duration::ZERO` blocks indefinitely.
    pub fn read(&self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let deadline = deadline_from(timeout);
        self.check_alive()?;
        loop {
            {
                let mut conn = self.conn.lock();
                match conn.reader().read(buf) {
                    Ok(n) => return Ok(n),
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => (),
                    Err(e) => return Err(e.into()),
                }
            }
            self.fill_tls(deadline)?;
        }
    }

    /// Encrypt and send application data. Returns the number of plaintext
    /// bytes accepted (all of `buf` once the records are flushed).
    pub fn write(&self, buf: &[u8], timeout: Duration) -> Result<usize> {
        let deadline = deadline_from(timeout);
        self.check_alive()?;
        let written = {
            let mut conn = self.conn.lock();
            conn.writer().write(buf).map_err(Error::from)?
        };
        self.flush_tls(deadline)?;
        Ok(written)
    }

    /// Send close_notify and flush it.
    pub fn shutdown(&self, timeout: Duration) -> Result<()> {
        let deadline = deadline_from(timeout);
        self.check_alive()?;
        self.conn.lock().send_close_notify();
        self.flush_tls(deadline)?;
        let _ = self.stream.shutdown(std::net::Shutdown::Write);
        Ok(())
    }

    /// Permanently unblock and poison the connection. Any thread blocked in
    /// `read`, `write`, or `shutdown` returns `Interrupted` promptly, and so
    /// does every later call.
    pub fn interrupt(&self) {
        log::debug!("interrupting tls connection");
        self.waiter.interrupt();
    }

    pub fn alpn_protocol(&self) -> Option<Vec<u8>> {
        self.conn.lock().alpn_protocol().map(|p| p.to_vec())
    }

    pub fn protocol_version(&self) -> Option<rustls::ProtocolVersion> {
        self.conn.lock().protocol_version()
    }

    /// The peer's certificate chain in DER, leaf first.
    pub fn peer_certificates(&self) -> Option<Vec<Vec<u8>>> {
        self.conn
            .lock()
            .peer_certificates()
            .map(|certs| certs.iter().map(|c| c.as_ref().to_vec()).collect())
    }

    pub fn is_handshaking(&self) -> bool {
        self.conn.lock().is_handshaking()
    }
}
