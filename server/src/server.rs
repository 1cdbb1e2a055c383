use quinn::Connection;
use std::collections::HashMap;
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};
use tracing::{debug, error, instrument, warn};

use crate::{
    map::LevelService,
    net::{ClientToServer, ServerToClient, per_client_network_io_task},
};
use common::protocol::{CGenerateLevel, ClientMessage, SError, SLevel, ServerMessage};

// ============================================================================
// Level Server
// ============================================================================

#[derive(Debug)]
struct Client {
    to_client: UnboundedSender<ServerToClient>,
}

/// QUIC level server. Tracks connected clients and hands each level request
/// to a blocking worker, so slow generations never stall the accept loop.
///
/// The server has business logic only with no I/O. I/O is handled by per-client tasks.
#[derive(Debug)]
pub struct LevelServer {
    /// Map of client ID to client state
    clients: HashMap<u32, Client>,
    /// Counter for generating unique client IDs
    next_id: u32,
    service: LevelService,
}

impl LevelServer {
    #[must_use]
    pub fn new(service: LevelService) -> Self {
        Self {
            clients: HashMap::new(),
            next_id: 1,
            service,
        }
    }

    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    // ============================================================================
    // Helper functions
    // ============================================================================

    fn advance_id(&mut self) {
        loop {
            self.next_id = self.next_id.checked_add(1).unwrap_or(1);
            if !self.clients.contains_key(&self.next_id) {
                break;
            }
        }
    }

    fn add_client(&mut self, to_client: UnboundedSender<ServerToClient>) -> u32 {
        let id = self.next_id;
        self.advance_id();
        self.clients.insert(id, Client { to_client });
        id
    }

    fn remove_client(&mut self, id: u32) {
        if let Some(client) = self.clients.remove(&id) {
            // Ignore errors because the client task may already have terminated
            let _ = client.to_client.send(ServerToClient::Close);
        }
    }

    // ============================================================================
    // Handle new client connections
    // ============================================================================

    // Registers an established connection and starts its network I/O task.
    // Handshakes are completed by the accept task, so this never waits.
    pub fn accept_client(&mut self, to_server: UnboundedSender<(u32, ClientToServer)>, connection: Connection) {
        // Channel for sending from the server to a new client network IO task
        let (to_client, from_server) = unbounded_channel();

        let id = self.add_client(to_client);
        debug!(id, remote = %connection.remote_address(), "accepted new client");

        tokio::spawn(per_client_network_io_task(id, connection, to_server, from_server));
    }

    // ============================================================================
    // Handle client disconnects
    // ============================================================================

    pub fn disconnect_client(&mut self, id: u32) {
        if self.clients.remove(&id).is_some() {
            debug!(id, "client disconnected");
        }
    }

    // ============================================================================
    // Process messages from clients
    // ============================================================================

    #[instrument(skip(self, msg))]
    pub fn process_client_data(&mut self, id: u32, msg: ClientMessage) {
        if !self.clients.contains_key(&id) {
            return;
        }
        match msg {
            ClientMessage::GenerateLevel(request) => self.generate_level(id, request),
            ClientMessage::Logoff(_) => {
                debug!("client logged off");
                self.remove_client(id);
            }
        }
    }

    fn generate_level(&self, id: u32, request: CGenerateLevel) {
        let Some(client) = self.clients.get(&id) else {
            return;
        };
        let to_client = client.to_client.clone();
        let service = self.service;

        tokio::task::spawn_blocking(move || {
            let msg = match service.handle(&request) {
                Ok(level) => ServerMessage::Level(SLevel { level }),
                Err(err) => {
                    if err.is_validation() {
                        warn!(id, "rejected level request: {err}");
                    } else {
                        error!(id, "level generation failed: {err}");
                    }
                    ServerMessage::Error(SError {
                        message: err.to_string(),
                    })
                }
            };
            if let Err(e) = to_client.send(ServerToClient::Send(msg)) {
                debug!(id, "failed to send to client: {}", e);
            }
        });
    }
}
