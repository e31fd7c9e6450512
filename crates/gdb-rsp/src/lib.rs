//! GDB Remote Serial Protocol packet codec: framing, checksums, and hex
//! payload encode/decode. The server state machine that dispatches decoded
//! packets lives in the `gdb-server` crate; this crate only knows about
//! bytes on the wire.

pub mod hex;
pub mod packet;

pub use packet::{checksum, encode_ack, encode_nack, encode_notification, encode_packet, CodecError, Event, Reader};
