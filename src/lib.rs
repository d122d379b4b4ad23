//! Connection handshake and frame I/O core for an AMQP 0-9-1 client.
//!
//! This crate drives the client side of the AMQP 0-9-1 connection
//! lifecycle — protocol header, SASL handshake, tuning negotiation, and
//! opening a virtual host — plus the frame demultiplexer and synchronous
//! RPC primitive that sit underneath it. Channel-level protocol beyond
//! opening, publisher confirms, consumer dispatch, and TLS are out of
//! scope; [`transport::Transport`] is the seam a TLS transport would fill.

pub mod codec;
pub mod conn;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod protocol;
pub mod queue;
pub mod rpc;
pub mod transport;

pub use conn::{Connection, Tuning};
pub use error::{CodecError, Error, Result};
pub use handshake::{login, ConnectionOptions, SaslCredentials};
pub use protocol::{Method, MethodId};
pub use rpc::RpcReply;
pub use transport::{TcpTransport, Transport};

/// AMQP protocol version this crate speaks, per the literal 8-byte header
/// `'A' 'M' 'Q' 'P' 0 0 9 1`.
pub const PROTOCOL_VERSION_MAJOR: u8 = 0;
pub const PROTOCOL_VERSION_MINOR: u8 = 9;
pub const PROTOCOL_VERSION_REVISION: u8 = 1;
