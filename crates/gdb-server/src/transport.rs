//! The byte-stream transport a [`crate::server::Server`] is served over
//! (spec §6 "Transport"). Production code plugs in a TCP or UDS socket;
//! tests plug in an in-memory loopback.

/// A bidirectional byte stream. `try_read` never blocks the caller past
/// what `block` asks for: the CPU hot path calls with `block = false` so a
/// quiet connection never stalls instruction execution.
pub trait Transport {
    /// Read whatever bytes are currently available. If `block` is true and
    /// nothing has arrived yet, wait for at least one byte; if false,
    /// return `None` immediately when nothing is buffered.
    fn try_read(&mut self, block: bool) -> Option<Vec<u8>>;

    /// Write `bytes` to the peer.
    fn write(&mut self, bytes: &[u8]);
}

/// An in-memory duplex transport for tests: bytes written to one end show
/// up on the other end's `try_read`.
#[cfg(test)]
pub mod loopback {
    use super::Transport;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default, Clone)]
    pub struct Loopback {
        inbox: Arc<Mutex<VecDeque<u8>>>,
        pub sent: Arc<Mutex<Vec<u8>>>,
    }

    impl Loopback {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue bytes as if the peer had just sent them.
        pub fn push_incoming(&self, bytes: &[u8]) {
            self.inbox.lock().expect("loopback inbox poisoned").extend(bytes.iter().copied());
        }

        /// Everything written by the code under test so far.
        #[must_use]
        pub fn sent_bytes(&self) -> Vec<u8> {
            self.sent.lock().expect("loopback outbox poisoned").clone()
        }
    }

    impl Transport for Loopback {
        fn try_read(&mut self, _block: bool) -> Option<Vec<u8>> {
            let mut inbox = self.inbox.lock().expect("loopback inbox poisoned");
            if inbox.is_empty() {
                return None;
            }
            Some(inbox.drain(..).collect())
        }

        fn write(&mut self, bytes: &[u8]) {
            self.sent.lock().expect("loopback outbox poisoned").extend_from_slice(bytes);
        }
    }
}
