//! Blocking connection: connect, write the request, read every line until
//! the peer closes, close.
//!
//! # Design
//! `Transport` is the seam between the session and the network. The session
//! only ever hands it a finished request image and gets raw lines back, so
//! tests can replay canned responses without sockets. `TcpTransport` opens
//! a fresh connection per exchange and drops it before returning; nothing is
//! pooled or reused.
//!
//! Sockets are created through `socket2` so that a failure to create the
//! socket is reported separately from a failure to connect it.

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};

use crate::error::{HttpClientError, Result};

/// Where and how long to talk.
#[derive(Debug, Clone, Copy)]
pub struct Endpoint<'a> {
    pub host: &'a str,
    pub port: u16,
    /// Bounds the connect and every subsequent blocking read or write.
    pub timeout: Duration,
}

/// One request/response exchange over a fresh connection.
pub trait Transport {
    /// Send `request` to `endpoint` and return the response split into
    /// lines, each keeping its `\n` terminator (the last may lack one).
    fn exchange(&mut self, endpoint: &Endpoint<'_>, request: &[u8]) -> Result<Vec<Vec<u8>>>;
}

/// Plain TCP transport used by default.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpTransport;

impl TcpTransport {
    fn connect(endpoint: &Endpoint<'_>) -> Result<TcpStream> {
        let addrs: Vec<SocketAddr> = (endpoint.host, endpoint.port)
            .to_socket_addrs()
            .map_err(|e| HttpClientError::DnsLookup {
                host: endpoint.host.to_string(),
                message: e.to_string(),
            })?
            .collect();
        if addrs.is_empty() {
            return Err(HttpClientError::DnsLookup {
                host: endpoint.host.to_string(),
                message: "no addresses".to_string(),
            });
        }

        let mut last_err = None;
        for addr in addrs {
            let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
                .map_err(HttpClientError::SocketCreation)?;
            match socket.connect_timeout(&addr.into(), endpoint.timeout) {
                Ok(()) => {
                    let stream: TcpStream = socket.into();
                    stream.set_read_timeout(Some(endpoint.timeout)).map_err(HttpClientError::Io)?;
                    stream.set_write_timeout(Some(endpoint.timeout)).map_err(HttpClientError::Io)?;
                    log::debug!("connected to {addr}");
                    return Ok(stream);
                }
                Err(e) => {
                    log::debug!("connect to {addr} failed: {e}");
                    last_err = Some(e);
                }
            }
        }

        Err(match last_err {
            Some(e) if is_refused_or_timeout(e.kind()) => HttpClientError::ConnectionRefused(e),
            Some(e) => HttpClientError::ConnectFailed {
                code: e.raw_os_error().unwrap_or(0),
                message: e.to_string(),
            },
            None => HttpClientError::ConnectFailed {
                code: 0,
                message: "no address could be tried".to_string(),
            },
        })
    }
}

impl Transport for TcpTransport {
    fn exchange(&mut self, endpoint: &Endpoint<'_>, request: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut stream = Self::connect(endpoint)?;
        stream.write_all(request).map_err(HttpClientError::Io)?;
        stream.flush().map_err(HttpClientError::Io)?;

        let mut reader = BufReader::new(stream);
        let mut lines = Vec::new();
        loop {
            let mut line = Vec::new();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) => break,
                Ok(_) => lines.push(line),
                Err(e) if is_read_timeout(e.kind()) => {
                    // A stalled peer ends the response; whatever arrived is kept.
                    log::warn!("read from {}:{} timed out, treating as end of stream", endpoint.host, endpoint.port);
                    if !line.is_empty() {
                        lines.push(line);
                    }
                    break;
                }
                Err(e) => return Err(HttpClientError::Io(e)),
            }
        }
        drop(reader);

        log::trace!("received {} lines from {}:{}", lines.len(), endpoint.host, endpoint.port);
        Ok(lines)
    }
}

fn is_refused_or_timeout(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::ConnectionRefused | ErrorKind::TimedOut | ErrorKind::WouldBlock)
}

fn is_read_timeout(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::TimedOut | ErrorKind::WouldBlock)
}

/// Split `raw` after every `\n`, keeping the terminators, the way a line
/// reader would hand the bytes over.
pub fn split_lines(raw: &[u8]) -> Vec<Vec<u8>> {
    raw.split_inclusive(|b| *b == b'\n').map(<[u8]>::to_vec).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;
    use std::thread;

    fn endpoint(port: u16) -> Endpoint<'static> {
        Endpoint {
            host: "127.0.0.1",
            port,
            timeout: Duration::from_secs(2),
        }
    }

    #[test]
    fn split_lines_keeps_terminators() {
        let lines = split_lines(b"HTTP/1.0 200 OK\r\nA: b\r\n\r\nbody");
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], b"HTTP/1.0 200 OK\r\n");
        assert_eq!(lines[2], b"\r\n");
        assert_eq!(lines[3], b"body");
        assert!(split_lines(b"").is_empty());
    }

    #[test]
    fn exchange_reads_until_peer_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            let mut buf = [0u8; 1024];
            let n = sock.read(&mut buf).unwrap();
            sock.write_all(b"HTTP/1.0 200 OK\r\nX: 1\r\n\r\nline one\nline two").unwrap();
            String::from_utf8_lossy(&buf[..n]).into_owned()
        });

        let lines = TcpTransport.exchange(&endpoint(port), b"GET / HTTP/1.0\r\n\r\n").unwrap();
        let received = server.join().unwrap();
        assert_eq!(received, "GET / HTTP/1.0\r\n\r\n");
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[3], b"line one\n");
        assert_eq!(lines[4], b"line two");
    }

    #[test]
    fn refused_port_is_reported_as_refused() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let err = TcpTransport.exchange(&endpoint(port), b"GET / HTTP/1.0\r\n\r\n").unwrap_err();
        assert!(matches!(err, HttpClientError::ConnectionRefused(_)), "got {err:?}");
        assert_eq!(err.code(), crate::error::CONNECTION_REFUSED);
    }

    #[test]
    fn unresolvable_host_is_a_dns_failure() {
        let ep = Endpoint {
            host: "no-such-host.invalid",
            port: 80,
            timeout: Duration::from_secs(2),
        };
        let err = TcpTransport.exchange(&ep, b"GET / HTTP/1.0\r\n\r\n").unwrap_err();
        assert!(matches!(err, HttpClientError::DnsLookup { .. }), "got {err:?}");
    }
}
