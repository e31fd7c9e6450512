//! RSP packet framing: `$payload#cc` framing, `+`/`-` acknowledgement,
//! `%payload#cc` notifications, and the out-of-band Ctrl-C interrupt byte
//! (spec §4.E).

use crate::hex::from_byte;

/// One unit the wire-level reader can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A complete, checksum-valid `$...#cc` packet payload.
    Packet(String),
    /// A complete `%...#cc` notification payload.
    Notification(String),
    /// The debugger sent `+`: our last packet was accepted.
    Ack,
    /// The debugger sent `-`: our last packet must be retransmitted.
    Nack,
    /// A bare `0x03` byte: the debugger wants the target to stop now.
    Interrupt,
    /// A `$...#cc` packet whose trailing checksum didn't match its payload.
    /// The caller must reply `-` so the sender retransmits (spec §4.E).
    ChecksumError(CodecError),
}

/// Errors the wire-level reader can detect while framing packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("checksum mismatch: wire sent {wire:#04x}, computed {computed:#04x}")]
    ChecksumMismatch { wire: u8, computed: u8 },
}

/// Sum-of-bytes-mod-256 checksum, as required by the RSP framing format.
#[must_use]
pub fn checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Frame `payload` as a `$payload#cc` packet, ready to write to the wire.
#[must_use]
pub fn encode_packet(payload: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 4);
    out.push(b'$');
    out.extend_from_slice(payload.as_bytes());
    out.push(b'#');
    out.extend_from_slice(from_byte(checksum(payload.as_bytes())).as_bytes());
    out
}

/// Frame `payload` as a `%payload#cc` notification. Notifications are not
/// acknowledged by the receiver.
#[must_use]
pub fn encode_notification(payload: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 4);
    out.push(b'%');
    out.extend_from_slice(payload.as_bytes());
    out.push(b'#');
    out.extend_from_slice(from_byte(checksum(payload.as_bytes())).as_bytes());
    out
}

/// A single ack byte (`+`), sent after successfully receiving a packet.
#[must_use]
pub fn encode_ack() -> [u8; 1] {
    [b'+']
}

/// A single nack byte (`-`), sent to request retransmission.
#[must_use]
pub fn encode_nack() -> [u8; 1] {
    [b'-']
}

/// Incrementally parses RSP framing out of a byte stream that may deliver
/// packets split across several reads.
#[derive(Debug, Default)]
pub struct Reader {
    buf: Vec<u8>,
}

impl Reader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append freshly-read bytes to the internal buffer.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pop the next fully-buffered [`Event`], if any. A malformed
    /// (checksum-mismatched) packet is consumed and reported as
    /// [`Event::ChecksumError`] so the caller can nack it (spec §4.E).
    pub fn next_event(&mut self) -> Option<Event> {
        loop {
            match self.buf.first()? {
                b'+' => {
                    self.buf.remove(0);
                    return Some(Event::Ack);
                }
                b'-' => {
                    self.buf.remove(0);
                    return Some(Event::Nack);
                }
                0x03 => {
                    self.buf.remove(0);
                    return Some(Event::Interrupt);
                }
                b'$' | b'%' => {
                    let is_notification = self.buf[0] == b'%';
                    let Some(hash_pos) = self.buf.iter().position(|b| *b == b'#') else {
                        return None; // packet not fully received yet
                    };
                    if self.buf.len() < hash_pos + 3 {
                        return None; // checksum digits not fully received yet
                    }
                    let payload = self.buf[1..hash_pos].to_vec();
                    let checksum_str = String::from_utf8_lossy(&self.buf[hash_pos + 1..hash_pos + 3]).into_owned();
                    let consumed = hash_pos + 3;
                    let wire_checksum = crate::hex::decode_u64(&checksum_str).map(|c| c as u8);
                    let computed = checksum(&payload);
                    self.buf.drain(..consumed);
                    if wire_checksum == Some(computed) {
                        let text = String::from_utf8_lossy(&payload).into_owned();
                        return Some(if is_notification { Event::Notification(text) } else { Event::Packet(text) });
                    }
                    return Some(Event::ChecksumError(CodecError::ChecksumMismatch {
                        wire: wire_checksum.unwrap_or(0),
                        computed,
                    }));
                }
                _ => {
                    self.buf.remove(0); // resync: skip stray bytes between packets
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_and_round_trips_a_packet() {
        let wire = encode_packet("g");
        let mut r = Reader::new();
        r.feed(&wire);
        assert_eq!(r.next_event(), Some(Event::Packet("g".to_string())));
        assert_eq!(r.next_event(), None);
    }

    #[test]
    fn handles_split_reads() {
        let wire = encode_packet("m1000,4");
        let mut r = Reader::new();
        r.feed(&wire[..3]);
        assert_eq!(r.next_event(), None);
        r.feed(&wire[3..]);
        assert_eq!(r.next_event(), Some(Event::Packet("m1000,4".to_string())));
    }

    #[test]
    fn reports_bad_checksum_for_retransmission() {
        let mut wire = encode_packet("g");
        *wire.last_mut().unwrap() = b'0';
        let mut r = Reader::new();
        r.feed(&wire);
        assert!(matches!(r.next_event(), Some(Event::ChecksumError(_))));
        assert_eq!(r.next_event(), None);
    }

    #[test]
    fn recognizes_ack_nack_and_interrupt() {
        let mut r = Reader::new();
        r.feed(b"+-\x03");
        assert_eq!(r.next_event(), Some(Event::Ack));
        assert_eq!(r.next_event(), Some(Event::Nack));
        assert_eq!(r.next_event(), Some(Event::Interrupt));
    }

    #[test]
    fn parses_notifications_separately_from_packets() {
        let wire = encode_notification("Stop:T05");
        let mut r = Reader::new();
        r.feed(&wire);
        assert_eq!(r.next_event(), Some(Event::Notification("Stop:T05".to_string())));
    }
}
