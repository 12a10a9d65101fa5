//! Byte-stream transports to an out-of-process peer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::path::PathBuf;

/// A bidirectional byte stream owned by exactly one bridge process
pub trait Transport: Send {
    /// Write all of `bytes`, looping until the peer accepted them
    fn send(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read whatever is available into `buf`; `Ok(0)` means the peer closed
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Human readable peer description for logs
    fn peer(&self) -> String;
}

pub struct TcpTransport {
    stream: TcpStream,
    peer: SocketAddr,
}

impl TcpTransport {
    /// Resolve `host` and connect to the first address that accepts
    pub fn connect(host: &str, port: u16) -> io::Result<Self> {
        let addrs: Vec<SocketAddr> = (host, port).to_socket_addrs()?.collect();
        if addrs.is_empty() {
            return Err(io::Error::new(ErrorKind::NotFound, format!("no address found for host '{}'", host)));
        }
        let stream = TcpStream::connect(&addrs[..])?;
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        Ok(Self { stream, peer })
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes)?;
        self.stream.flush()
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }

    fn peer(&self) -> String {
        format!("tcp://{}", self.peer)
    }
}

/// A pair of named pipes (or plain files): one written, one read
///
/// The write end is opened first. A peer that opens its read end first
/// therefore never deadlocks against this side.
pub struct PipeTransport {
    writer: File,
    reader: File,
    to_peer: PathBuf,
    from_peer: PathBuf,
}

impl PipeTransport {
    pub fn open(to_peer: impl Into<PathBuf>, from_peer: impl Into<PathBuf>) -> io::Result<Self> {
        let to_peer = to_peer.into();
        let from_peer = from_peer.into();
        let writer = OpenOptions::new().write(true).open(&to_peer)?;
        let reader = File::open(&from_peer)?;
        Ok(Self {
            writer,
            reader,
            to_peer,
            from_peer,
        })
    }
}

impl Transport for PipeTransport {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)?;
        self.writer.flush()
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }

    fn peer(&self) -> String {
        format!("pipe://{} -> {}", self.to_peer.display(), self.from_peer.display())
    }
}

/// Where a bridge finds its peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    Pipe { to_peer: PathBuf, from_peer: PathBuf },
}

impl Endpoint {
    pub fn open(&self) -> io::Result<Box<dyn Transport>> {
        match self {
            Endpoint::Tcp { host, port } => Ok(Box::new(TcpTransport::connect(host, *port)?)),
            Endpoint::Pipe { to_peer, from_peer } => Ok(Box::new(PipeTransport::open(to_peer, from_peer)?)),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp { host, port } => write!(f, "{}:{}", host, port),
            Endpoint::Pipe { to_peer, from_peer } => {
                write!(f, "{} / {}", to_peer.display(), from_peer.display())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_tcp_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let peer = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 5];
            stream.read_exact(&mut buf).unwrap();
            stream.write_all(&buf).unwrap();
        });

        let mut transport = Endpoint::Tcp {
            host: "127.0.0.1".to_string(),
            port,
        }
        .open()
        .unwrap();
        transport.send(b"hello").unwrap();
        let mut buf = [0u8; 5];
        let mut read = 0;
        while read < 5 {
            read += transport.recv(&mut buf[read..]).unwrap();
        }
        assert_eq!(&buf, b"hello");
        assert!(transport.peer().starts_with("tcp://127.0.0.1:"));
        peer.join().unwrap();
    }

    #[test]
    fn test_unreachable_host_fails() {
        let endpoint = Endpoint::Tcp {
            host: "no-such-host.invalid".to_string(),
            port: 1,
        };
        assert!(endpoint.open().is_err());
    }

    #[test]
    fn test_pipe_pair_over_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("to_peer");
        let inp = dir.path().join("from_peer");
        std::fs::write(&out, b"").unwrap();
        std::fs::write(&inp, b"7\n").unwrap();

        let mut transport = PipeTransport::open(&out, &inp).unwrap();
        transport.send(b"3\n").unwrap();
        let mut buf = [0u8; 16];
        let n = transport.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"7\n");
        assert_eq!(std::fs::read(&out).unwrap(), b"3\n");
    }

    #[test]
    fn test_endpoint_from_json() {
        let endpoint: Endpoint = serde_json::from_str(r#"{"kind":"tcp","host":"localhost","port":1212}"#).unwrap();
        assert_eq!(
            endpoint,
            Endpoint::Tcp {
                host: "localhost".to_string(),
                port: 1212
            }
        );
    }
}
