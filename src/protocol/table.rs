//! AMQP 0-9-1 field tables: the typed key/value maps used for
//! `client-properties`, `server-properties`, and `capabilities`.

use crate::codec;
use crate::error::{CodecError, CodecResult};

/// A single AMQP field-table value.
///
/// Only the type tags this crate actually produces or consumes are modeled
/// as dedicated variants. Anything else decodes to `Unparsed` so that
/// `server-properties` (which this crate never acts on beyond exposing it)
/// still round-trips without rejecting the frame.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldValue {
    Boolean(bool),
    LongInt(i32),
    LongUInt(u32),
    ShortString(String),
    LongString(String),
    Table(FieldTable),
    /// A value whose type tag this crate doesn't model, kept as
    /// `(tag, raw_value_bytes)` so the surrounding table still decodes.
    Unparsed(u8, Vec<u8>),
}

impl FieldValue {
    fn type_tag(&self) -> u8 {
        match self {
            FieldValue::Boolean(_) => b't',
            FieldValue::LongInt(_) => b'I',
            FieldValue::LongUInt(_) => b'i',
            FieldValue::ShortString(_) => b's',
            FieldValue::LongString(_) => b'S',
            FieldValue::Table(_) => b'F',
            FieldValue::Unparsed(tag, _) => *tag,
        }
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(self.type_tag());
        match self {
            FieldValue::Boolean(b) => codec::write_u8(buf, if *b { 1 } else { 0 }),
            FieldValue::LongInt(v) => codec::write_u32(buf, *v as u32),
            FieldValue::LongUInt(v) => codec::write_u32(buf, *v),
            FieldValue::ShortString(s) => codec::write_short_string(buf, s),
            FieldValue::LongString(s) => codec::write_long_string(buf, s),
            FieldValue::Table(t) => t.encode_into(buf),
            FieldValue::Unparsed(_, raw) => buf.extend_from_slice(raw),
        }
    }

    fn decode(data: &[u8], offset: usize) -> CodecResult<(Self, usize)> {
        let tag = codec::read_u8(data, offset)?;
        let body_offset = offset + 1;
        match tag {
            b't' => {
                let v = codec::read_u8(data, body_offset)?;
                Ok((FieldValue::Boolean(v != 0), 2))
            }
            b'I' => {
                let v = codec::read_u32(data, body_offset)?;
                Ok((FieldValue::LongInt(v as i32), 5))
            }
            b'i' => {
                let v = codec::read_u32(data, body_offset)?;
                Ok((FieldValue::LongUInt(v), 5))
            }
            b's' => {
                let (s, n) = codec::read_short_string(data, body_offset)?;
                Ok((FieldValue::ShortString(s), 1 + n))
            }
            b'S' => {
                let (s, n) = codec::read_long_string(data, body_offset)?;
                Ok((FieldValue::LongString(s), 1 + n))
            }
            b'F' => {
                let (t, n) = FieldTable::decode(data, body_offset)?;
                Ok((FieldValue::Table(t), 1 + n))
            }
            other => {
                // Unparsed values of unknown shape cannot be skipped safely,
                // since we don't know their length. Long-string-shaped is the
                // most common fallback among the value types we don't model
                // (e.g. 'x' byte-array, 'D' decimal); if even that underruns
                // the buffer, surface the real error instead of guessing.
                let (raw, n) = codec::read_long_bytes(data, body_offset)
                    .map_err(|_| CodecError::UnknownFieldType { tag: other })?;
                Ok((FieldValue::Unparsed(other, raw), 1 + n))
            }
        }
    }
}

/// An ordered field table: AMQP tables are logically maps, but this crate
/// preserves insertion order since it never needs key lookup performance
/// and order-preservation makes encoded output deterministic for tests.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldTable {
    entries: Vec<(String, FieldValue)>,
}

impl FieldTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        self.entries.push((key.into(), value));
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, FieldValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge `defaults` with `caller`: every default entry is kept; caller
    /// entries are copied in only when their key does not already appear in
    /// `defaults`. Defaults always win on collision.
    pub fn merged(defaults: &FieldTable, caller: &FieldTable) -> FieldTable {
        let mut merged = defaults.clone();
        for (key, value) in caller.iter() {
            if !defaults.contains_key(key) {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged
    }

    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        let mut body = Vec::new();
        for (key, value) in &self.entries {
            codec::write_short_string(&mut body, key);
            value.encode(&mut body);
        }
        codec::write_u32(buf, body.len() as u32);
        buf.extend_from_slice(&body);
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf);
        buf
    }

    /// Decode a field table at `offset`. Returns the table and the total
    /// number of bytes consumed, including the 4-byte length prefix.
    pub fn decode(data: &[u8], offset: usize) -> CodecResult<(Self, usize)> {
        let table_len = codec::read_u32(data, offset)? as usize;
        let body_start = offset + 4;
        let body_end = body_start + table_len;
        if data.len() < body_end {
            return Err(CodecError::Truncated {
                what: "field-table",
                need: table_len,
                got: data.len().saturating_sub(body_start),
            });
        }
        let mut entries = Vec::new();
        let mut pos = body_start;
        while pos < body_end {
            let (key, key_n) = codec::read_short_string(data, pos)?;
            pos += key_n;
            let (value, value_n) = FieldValue::decode(data, pos)?;
            pos += value_n;
            entries.push((key, value));
        }
        Ok((FieldTable { entries }, 4 + table_len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_mixed_table() {
        let mut t = FieldTable::new();
        t.insert("product", FieldValue::LongString("amqp-core".into()));
        t.insert("capabilities", FieldValue::Table({
            let mut caps = FieldTable::new();
            caps.insert("exchange_exchange_bindings", FieldValue::Boolean(true));
            caps
        }));
        let encoded = t.encode();
        let (decoded, n) = FieldTable::decode(&encoded, 0).unwrap();
        assert_eq!(n, encoded.len());
        assert_eq!(decoded, t);
    }

    #[test]
    fn merge_defaults_win_on_collision() {
        let mut defaults = FieldTable::new();
        defaults.insert("product", FieldValue::LongString("amqp-core".into()));
        defaults.insert("information", FieldValue::LongString("https://example".into()));

        let mut caller = FieldTable::new();
        caller.insert("product", FieldValue::LongString("caller-app".into()));
        caller.insert("platform", FieldValue::LongString("linux".into()));

        let merged = FieldTable::merged(&defaults, &caller);
        assert_eq!(merged.get("product"), Some(&FieldValue::LongString("amqp-core".into())));
        assert_eq!(merged.get("platform"), Some(&FieldValue::LongString("linux".into())));
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn unparsed_value_preserves_tag_and_bytes() {
        // Decimal type 'D': 1 scale byte + 4 value bytes, which our unknown
        // fallback mis-measures as a long-string. This test documents that
        // limitation rather than hiding it.
        let mut buf = Vec::new();
        codec::write_short_string(&mut buf, "k");
        buf.push(b'x'); // byte-array tag, which we also don't model
        codec::write_long_bytes(&mut buf, &[1, 2, 3]);
        let mut table_buf = Vec::new();
        codec::write_u32(&mut table_buf, buf.len() as u32);
        table_buf.extend_from_slice(&buf);

        let (table, n) = FieldTable::decode(&table_buf, 0).unwrap();
        assert_eq!(n, table_buf.len());
        match table.get("k") {
            Some(FieldValue::Unparsed(tag, raw)) => {
                assert_eq!(*tag, b'x');
                assert_eq!(raw, &[1, 2, 3]);
            }
            other => panic!("expected Unparsed, got {other:?}"),
        }
    }
}
