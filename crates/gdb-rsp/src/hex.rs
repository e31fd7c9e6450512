//! Hex encode/decode helpers for register and memory payloads (spec §4.E).

/// Encode a single byte as two lowercase hex digits.
#[must_use]
pub fn from_byte(b: u8) -> String {
    format!("{b:02x}")
}

/// Encode a byte slice as a lowercase hex string, respecting `endianness`
/// (GDB transmits register/memory bytes in target byte order).
#[must_use]
pub fn encode_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|b| from_byte(*b)).collect()
}

/// Decode one hex digit (`0-9a-fA-F`).
#[must_use]
pub fn from_hex(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Decode a hex string into raw bytes. Returns `None` on an odd length or
/// any non-hex character.
#[must_use]
pub fn decode_bytes(s: &str) -> Option<Vec<u8>> {
    let s = s.as_bytes();
    if s.len() % 2 != 0 {
        return None;
    }
    s.chunks(2).map(|pair| Some(from_hex(pair[0])? << 4 | from_hex(pair[1])?)).collect()
}

/// Decode a hex-encoded `u64`, most-significant nibble first (as used by
/// `m`/`M`/`Z`/`z` addresses and lengths).
#[must_use]
pub fn decode_u64(s: &str) -> Option<u64> {
    if s.is_empty() || s.len() > 16 {
        return None;
    }
    u64::from_str_radix(s, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_bytes() {
        let bytes = [0x00, 0x7f, 0xff, 0x10];
        let encoded = encode_bytes(&bytes);
        assert_eq!(encoded, "007fff10");
        assert_eq!(decode_bytes(&encoded).unwrap(), bytes);
    }

    #[test]
    fn rejects_odd_length() {
        assert_eq!(decode_bytes("abc"), None);
    }

    #[test]
    fn decodes_addresses() {
        assert_eq!(decode_u64("1000"), Some(0x1000));
        assert_eq!(decode_u64("deadbeef"), Some(0xdead_beef));
    }
}
