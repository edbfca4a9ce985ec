/// Key and value layout for `SignalDb` partitions
///
/// Partition structure:
/// - `data`: key -> [expires_at_ms: u64 BE][snappy(record)]
/// - `expiry`: [expires_at_ms: u64 BE][key] -> ()
/// - `meta`: "next_key" -> u64 BE
///
/// Autokeys are big-endian so byte order equals numeric order.
/// An `expires_at_ms` of zero marks an entry that never expires.

pub const META_NEXT_KEY: &[u8] = b"next_key";

const HEADER_LEN: usize = 8;

/// Encode an autokey
pub fn encode_auto_key(key: u64) -> [u8; 8] {
    key.to_be_bytes()
}

/// Decode an autokey; `None` for keys that are not 8 bytes long
pub fn decode_auto_key(key: &[u8]) -> Option<u64> {
    let bytes: [u8; 8] = key.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}

/// Encode an expiry index key: {expires_at_ms:be}{key}
pub fn encode_expiry_key(expires_at_ms: u64, key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + key.len());
    out.extend_from_slice(&expires_at_ms.to_be_bytes());
    out.extend_from_slice(key);
    out
}

/// Decode an expiry index key -> (expires_at_ms, key)
pub fn decode_expiry_key(raw: &[u8]) -> Option<(u64, &[u8])> {
    if raw.len() < HEADER_LEN {
        return None;
    }
    let (ts, key) = raw.split_at(HEADER_LEN);
    Some((decode_auto_key(ts)?, key))
}

/// Prefix a compressed record with its expiry timestamp
pub fn encode_stored_value(expires_at_ms: u64, compressed: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + compressed.len());
    out.extend_from_slice(&expires_at_ms.to_be_bytes());
    out.extend_from_slice(compressed);
    out
}

/// Split a stored value -> (expires_at_ms, compressed record)
pub fn decode_stored_value(raw: &[u8]) -> Option<(u64, &[u8])> {
    decode_expiry_key(raw)
}
