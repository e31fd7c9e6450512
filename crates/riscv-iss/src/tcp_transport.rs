//! A TCP socket dressed up as a [`gdb_server::Transport`] (spec §6:
//! "A bidirectional byte stream (TCP by default, port 2222...)").

use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> std::io::Result<Self> {
        stream.set_nonblocking(true)?;
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }
}

impl gdb_server::Transport for TcpTransport {
    fn try_read(&mut self, block: bool) -> Option<Vec<u8>> {
        let mut buf = [0u8; 4096];
        loop {
            match self.stream.read(&mut buf) {
                Ok(0) => return None,
                Ok(n) => return Some(buf[..n].to_vec()),
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    if !block {
                        return None;
                    }
                    std::thread::sleep(Duration::from_millis(1));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "gdb transport read failed");
                    return None;
                }
            }
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        if let Err(e) = self.stream.write_all(bytes) {
            tracing::warn!(error = %e, "gdb transport write failed");
        }
    }
}
