//! Primitive field codecs for the AMQP 0-9-1 wire format.
//!
//! All multi-byte integers are big-endian. Strings come in two flavors:
//! short-string (1-byte length prefix, used for field-table keys) and
//! long-string (4-byte length prefix, used for most textual values).

use crate::error::{CodecError, CodecResult};

// ---------------------------------------------------------------------------
// Read helpers
// ---------------------------------------------------------------------------

pub fn read_u8(data: &[u8], offset: usize) -> CodecResult<u8> {
    check_len(data, offset, 1, "u8")?;
    Ok(data[offset])
}

pub fn read_u16(data: &[u8], offset: usize) -> CodecResult<u16> {
    check_len(data, offset, 2, "u16")?;
    Ok(u16::from_be_bytes([data[offset], data[offset + 1]]))
}

pub fn read_u32(data: &[u8], offset: usize) -> CodecResult<u32> {
    check_len(data, offset, 4, "u32")?;
    Ok(u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ]))
}

pub fn read_u64(data: &[u8], offset: usize) -> CodecResult<u64> {
    check_len(data, offset, 8, "u64")?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[offset..offset + 8]);
    Ok(u64::from_be_bytes(buf))
}

/// Read a short-string: 1-byte length prefix followed by UTF-8 bytes.
/// Returns the decoded string and the number of bytes consumed.
pub fn read_short_string(data: &[u8], offset: usize) -> CodecResult<(String, usize)> {
    let len = read_u8(data, offset)? as usize;
    check_len(data, offset + 1, len, "short-string")?;
    let bytes = data[offset + 1..offset + 1 + len].to_vec();
    let s = String::from_utf8(bytes)
        .map_err(|source| CodecError::InvalidString { what: "short-string", source })?;
    Ok((s, 1 + len))
}

/// Read a long-string: 4-byte length prefix followed by UTF-8 bytes.
/// Returns the decoded string and the number of bytes consumed.
pub fn read_long_string(data: &[u8], offset: usize) -> CodecResult<(String, usize)> {
    let len = read_u32(data, offset)? as usize;
    check_len(data, offset + 4, len, "long-string")?;
    let bytes = data[offset + 4..offset + 4 + len].to_vec();
    let s = String::from_utf8(bytes)
        .map_err(|source| CodecError::InvalidString { what: "long-string", source })?;
    Ok((s, 4 + len))
}

/// Read a long-string payload as raw bytes (no UTF-8 validation), used for
/// opaque blobs carried in field-table values.
pub fn read_long_bytes(data: &[u8], offset: usize) -> CodecResult<(Vec<u8>, usize)> {
    let len = read_u32(data, offset)? as usize;
    check_len(data, offset + 4, len, "long-string")?;
    Ok((data[offset + 4..offset + 4 + len].to_vec(), 4 + len))
}

// ---------------------------------------------------------------------------
// Write helpers
// ---------------------------------------------------------------------------

pub fn write_u8(buf: &mut Vec<u8>, v: u8) {
    buf.push(v);
}

pub fn write_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_be_bytes());
}

pub fn write_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

pub fn write_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_be_bytes());
}

pub fn write_short_string(buf: &mut Vec<u8>, s: &str) {
    debug_assert!(s.len() <= u8::MAX as usize, "short-string longer than 255 bytes");
    buf.push(s.len() as u8);
    buf.extend_from_slice(s.as_bytes());
}

pub fn write_long_string(buf: &mut Vec<u8>, s: &str) {
    write_u32(buf, s.len() as u32);
    buf.extend_from_slice(s.as_bytes());
}

pub fn write_long_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    write_u32(buf, bytes.len() as u32);
    buf.extend_from_slice(bytes);
}

fn check_len(data: &[u8], offset: usize, need: usize, what: &'static str) -> CodecResult<()> {
    let got = data.len().saturating_sub(offset);
    if got < need {
        return Err(CodecError::Truncated { what, need, got });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u32_round_trip() {
        let mut buf = Vec::new();
        write_u32(&mut buf, 0xDEAD_BEEF);
        assert_eq!(read_u32(&buf, 0).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn short_string_round_trip() {
        let mut buf = Vec::new();
        write_short_string(&mut buf, "PLAIN");
        let (s, n) = read_short_string(&buf, 0).unwrap();
        assert_eq!(s, "PLAIN");
        assert_eq!(n, buf.len());
    }

    #[test]
    fn long_string_round_trip() {
        let mut buf = Vec::new();
        write_long_string(&mut buf, "amqp-core");
        let (s, n) = read_long_string(&buf, 0).unwrap();
        assert_eq!(s, "amqp-core");
        assert_eq!(n, buf.len());
    }

    #[test]
    fn truncated_read_reports_need_and_got() {
        let buf = [0x00, 0x05, b'h', b'i'];
        match read_short_string(&buf, 0) {
            Err(CodecError::Truncated { need, got, .. }) => {
                assert_eq!(need, 5);
                assert_eq!(got, 2);
            }
            other => panic!("expected Truncated, got {other:?}"),
        }
    }
}
