use crate::sink::{LogSink, SinkResult};
use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::{Mutex, PoisonError};

/// Sink that streams records over a raw TCP connection.
///
/// There is no framing beyond the trailing newline of each record and no
/// reconnect: once the peer goes away every `send` fails and the logger
/// counts the record as dropped.
pub struct TcpSink {
    stream: Mutex<Option<TcpStream>>,
    peer: SocketAddr,
}

impl TcpSink {
    /// Open a connection to `addr`.
    ///
    /// **Returns**
    /// - `Ok(sink)` once the TCP handshake completed.
    /// - `Err(..)` with the connect error; the caller decides whether that
    ///   aborts startup.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        let peer = stream.peer_addr()?;
        tracing::debug!(target: crate::INTERNAL_TARGET, %peer, "tcp log sink connected");
        Ok(TcpSink {
            stream: Mutex::new(Some(stream)),
            peer,
        })
    }

    /// Address of the remote collector.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl LogSink for TcpSink {
    fn send(&self, payload: &[u8]) -> SinkResult {
        let mut guard = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_mut() {
            Some(stream) => Ok(stream.write_all(payload)?),
            None => Err(io::Error::from(io::ErrorKind::NotConnected).into()),
        }
    }

    fn flush(&self) -> SinkResult {
        let mut guard = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(stream) = guard.as_mut() {
            stream.flush()?;
        }
        Ok(())
    }

    fn close(&self) -> SinkResult {
        let stream = self
            .stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut stream) = stream {
            stream.flush()?;
            // The peer may already be gone; the handle is dropped either way.
            let _ = stream.shutdown(Shutdown::Both);
            tracing::debug!(target: crate::INTERNAL_TARGET, peer = %self.peer, "tcp log sink closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;

    #[test]
    fn send_reaches_peer_and_close_ends_stream() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let sink = TcpSink::connect(listener.local_addr().unwrap()).unwrap();
        let (mut peer, _) = listener.accept().unwrap();

        sink.send(b"{\"a\":1}\n").unwrap();
        sink.close().unwrap();

        let mut received = String::new();
        peer.read_to_string(&mut received).unwrap();
        assert_eq!(received, "{\"a\":1}\n");
    }

    #[test]
    fn send_after_close_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let sink = TcpSink::connect(listener.local_addr().unwrap()).unwrap();
        sink.close().unwrap();
        assert!(sink.send(b"late\n").is_err());
        // Closing twice is harmless at the sink level.
        sink.close().unwrap();
    }

    #[test]
    fn connect_to_closed_port_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        assert!(TcpSink::connect(addr).is_err());
    }
}
