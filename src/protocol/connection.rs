//! `connection` class methods: the handshake and its matching close path.

use crate::codec;
use crate::error::CodecResult;
use crate::protocol::table::FieldTable;

pub const CLASS_ID: u16 = 10;

pub const METHOD_START: u16 = 10;
pub const METHOD_START_OK: u16 = 11;
pub const METHOD_TUNE: u16 = 30;
pub const METHOD_TUNE_OK: u16 = 31;
pub const METHOD_OPEN: u16 = 40;
pub const METHOD_OPEN_OK: u16 = 41;
pub const METHOD_CLOSE: u16 = 50;
pub const METHOD_CLOSE_OK: u16 = 51;

/// Server greeting. First method the server ever sends.
#[derive(Debug, Clone)]
pub struct Start {
    pub version_major: u8,
    pub version_minor: u8,
    pub server_properties: FieldTable,
    pub mechanisms: String,
    pub locales: String,
}

impl Start {
    pub fn decode(payload: &[u8]) -> CodecResult<Self> {
        let version_major = codec::read_u8(payload, 0)?;
        let version_minor = codec::read_u8(payload, 1)?;
        let (server_properties, n) = FieldTable::decode(payload, 2)?;
        let mut pos = 2 + n;
        let (mechanisms, n) = codec::read_long_string(payload, pos)?;
        pos += n;
        let (locales, _) = codec::read_long_string(payload, pos)?;
        Ok(Self {
            version_major,
            version_minor,
            server_properties,
            mechanisms,
            locales,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        codec::write_u8(&mut buf, self.version_major);
        codec::write_u8(&mut buf, self.version_minor);
        self.server_properties.encode_into(&mut buf);
        codec::write_long_string(&mut buf, &self.mechanisms);
        codec::write_long_string(&mut buf, &self.locales);
        buf
    }
}

/// Client's SASL response to `Start`.
#[derive(Debug, Clone)]
pub struct StartOk {
    pub client_properties: FieldTable,
    pub mechanism: String,
    pub response: Vec<u8>,
    pub locale: String,
}

impl StartOk {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.client_properties.encode_into(&mut buf);
        codec::write_short_string(&mut buf, &self.mechanism);
        codec::write_long_bytes(&mut buf, &self.response);
        codec::write_short_string(&mut buf, &self.locale);
        buf
    }

    pub fn decode(payload: &[u8]) -> CodecResult<Self> {
        let (client_properties, n) = FieldTable::decode(payload, 0)?;
        let mut pos = n;
        let (mechanism, n) = codec::read_short_string(payload, pos)?;
        pos += n;
        let (response, n) = codec::read_long_bytes(payload, pos)?;
        pos += n;
        let (locale, _) = codec::read_short_string(payload, pos)?;
        Ok(Self { client_properties, mechanism, response, locale })
    }
}

/// Server's proposed tuning limits.
#[derive(Debug, Clone, Copy)]
pub struct Tune {
    pub channel_max: u16,
    pub frame_max: u32,
    pub heartbeat: u16,
}

impl Tune {
    pub fn decode(payload: &[u8]) -> CodecResult<Self> {
        Ok(Self {
            channel_max: codec::read_u16(payload, 0)?,
            frame_max: codec::read_u32(payload, 2)?,
            heartbeat: codec::read_u16(payload, 6)?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        codec::write_u16(&mut buf, self.channel_max);
        codec::write_u32(&mut buf, self.frame_max);
        codec::write_u16(&mut buf, self.heartbeat);
        buf
    }
}

/// Client's accepted tuning limits, echoed back after negotiation.
pub type TuneOk = Tune;

/// Request to open a virtual host.
#[derive(Debug, Clone)]
pub struct Open {
    pub virtual_host: String,
    pub capabilities: String,
    pub insist: bool,
}

impl Open {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        codec::write_short_string(&mut buf, &self.virtual_host);
        codec::write_short_string(&mut buf, &self.capabilities);
        codec::write_u8(&mut buf, if self.insist { 1 } else { 0 });
        buf
    }

    pub fn decode(payload: &[u8]) -> CodecResult<Self> {
        let (virtual_host, n) = codec::read_short_string(payload, 0)?;
        let mut pos = n;
        let (capabilities, n) = codec::read_short_string(payload, pos)?;
        pos += n;
        let insist = codec::read_u8(payload, pos)? != 0;
        Ok(Self { virtual_host, capabilities, insist })
    }
}

/// Confirms the virtual host was opened.
#[derive(Debug, Clone)]
pub struct OpenOk {
    pub known_hosts: String,
}

impl OpenOk {
    pub fn decode(payload: &[u8]) -> CodecResult<Self> {
        let (known_hosts, _) = codec::read_short_string(payload, 0)?;
        Ok(Self { known_hosts })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        codec::write_short_string(&mut buf, &self.known_hosts);
        buf
    }
}

/// A connection-level close, sent by either peer.
#[derive(Debug, Clone)]
pub struct Close {
    pub reply_code: u16,
    pub reply_text: String,
    pub class_id: u16,
    pub method_id: u16,
}

impl Close {
    pub fn decode(payload: &[u8]) -> CodecResult<Self> {
        let reply_code = codec::read_u16(payload, 0)?;
        let (reply_text, n) = codec::read_short_string(payload, 2)?;
        let mut pos = 2 + n;
        let class_id = codec::read_u16(payload, pos)?;
        pos += 2;
        let method_id = codec::read_u16(payload, pos)?;
        Ok(Self { reply_code, reply_text, class_id, method_id })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        codec::write_u16(&mut buf, self.reply_code);
        codec::write_short_string(&mut buf, &self.reply_text);
        codec::write_u16(&mut buf, self.class_id);
        codec::write_u16(&mut buf, self.method_id);
        buf
    }
}

/// Acknowledges a `Close`.
#[derive(Debug, Clone, Copy)]
pub struct CloseOk;

impl CloseOk {
    pub fn decode(_payload: &[u8]) -> CodecResult<Self> {
        Ok(Self)
    }

    pub fn encode(&self) -> Vec<u8> {
        Vec::new()
    }
}
