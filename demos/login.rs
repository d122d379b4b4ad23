//! Connect to a broker and complete the AMQP handshake.
//!
//! Usage: cargo run --example login -- <host> <port> <user> <password>

use std::process;

use amqp_core::{login, Connection, ConnectionOptions, RpcReply, SaslCredentials, TcpTransport};

fn main() {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "localhost".to_string());
    let port: u16 = args.next().and_then(|p| p.parse().ok()).unwrap_or(5672);
    let username = args.next().unwrap_or_else(|| "guest".to_string());
    let password = args.next().unwrap_or_else(|| "guest".to_string());

    let transport = match TcpTransport::connect(&host, port) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("connect to {host}:{port} failed: {e}");
            process::exit(1);
        }
    };

    let mut conn = Connection::open(Box::new(transport));
    let options = ConnectionOptions {
        credentials: SaslCredentials::Plain { username, password },
        ..ConnectionOptions::default()
    };

    match login(&mut conn, &options) {
        RpcReply::Normal { .. } => {
            println!(
                "connected: channel_max={} frame_max={} heartbeat={}",
                conn.tuning.channel_max, conn.tuning.frame_max, conn.tuning.heartbeat
            );
        }
        RpcReply::ServerException { close } => {
            eprintln!("server closed the connection during login: {close:?}");
            process::exit(1);
        }
        RpcReply::LibraryException { error } => {
            eprintln!("login failed: {error}");
            process::exit(1);
        }
    }
}
