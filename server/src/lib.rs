pub mod config;
pub mod http;
pub mod map;
pub mod net;
pub mod server;

pub use config::{configure_server, init_tracing};
pub use map::{LevelError, LevelService, generate_level};
pub use net::{ClientToServer, accept_connections_task};
pub use server::LevelServer;

use anyhow::{Context, Result};
use clap::Parser;
use quinn::Endpoint;
use std::{net::SocketAddr, path::PathBuf};
use tokio::{net::TcpListener, sync::mpsc::unbounded_channel};
use tracing::{error, info};

use common::{
    config::{DEFAULT_CERT_PATH, DEFAULT_KEY_PATH},
    constants::DEFAULT_MAX_LEVEL_SIZE,
};

// ============================================================================
// CLI Argument Parsing
// ============================================================================

#[derive(Parser, Debug)]
#[command(author, version, about = "Maze level server", long_about = None)]
pub struct Args {
    /// Address to bind the QUIC endpoint to
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    pub bind: String,

    /// Address to bind the HTTP (GraphQL) endpoint to
    #[arg(long, default_value = "127.0.0.1:4000")]
    pub http: String,

    /// Serve HTTP only
    #[arg(long, default_value_t = false)]
    pub no_quic: bool,

    /// TLS certificate (PEM) for the QUIC endpoint
    #[arg(long, default_value = DEFAULT_CERT_PATH)]
    pub cert: PathBuf,

    /// TLS private key (PEM) for the QUIC endpoint
    #[arg(long, default_value = DEFAULT_KEY_PATH)]
    pub key: PathBuf,

    /// Largest accepted level height or width
    #[arg(long, default_value_t = DEFAULT_MAX_LEVEL_SIZE, value_parser = clap::value_parser!(i32).range(1..))]
    pub max_size: i32,
}

// ============================================================================
// Main Server Loop
// ============================================================================

pub async fn run_server() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    let service = LevelService::new(args.max_size);

    let http_addr: SocketAddr = args.http.parse().context("Invalid HTTP address")?;
    let listener = TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("Failed to bind {http_addr}"))?;
    info!("HTTP server listening on {}", http_addr);
    let mut http_task = tokio::spawn(async move { axum::serve(listener, http::build_router(service)).await });

    if args.no_quic {
        return http_task.await?.context("HTTP server failed");
    }

    let addr: SocketAddr = args.bind.parse().context("Invalid QUIC address")?;
    let server_config = configure_server(&args.cert, &args.key)?;
    let endpoint = Endpoint::server(server_config, addr)?;
    info!("QUIC server listening on {}", addr);

    let mut server = LevelServer::new(service);

    // Channel for the accept task to hand over established connections
    let (to_server_from_accept, mut from_accept) = unbounded_channel();
    tokio::spawn(accept_connections_task(endpoint, to_server_from_accept));

    // Channel for client tasks to send messages to server
    let (to_server, mut from_clients) = unbounded_channel::<(u32, ClientToServer)>();

    loop {
        tokio::select! {
            // Register established connections
            Some(connection) = from_accept.recv() => {
                server.accept_client(to_server.clone(), connection);
            }

            // Process messages from clients
            Some((id, msg)) = from_clients.recv() => {
                match msg {
                    ClientToServer::Message(msg) => {
                        server.process_client_data(id, msg);
                    }
                    ClientToServer::Disconnected => {
                        server.disconnect_client(id);
                    }
                }
            }

            result = &mut http_task => {
                error!("HTTP server stopped");
                return result?.context("HTTP server failed");
            }
        }
    }
}
