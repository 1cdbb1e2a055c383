use anyhow::Error;
use quinn::{Connection, ConnectionError, Endpoint};
use std::fmt::Display;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, trace, warn};

use common::{
    io::MessageStream,
    protocol::{ClientMessage, ServerMessage},
};

// ============================================================================
// Accept Connections Task
// ============================================================================

// Accepts incoming connections and hands each established one to the server
// loop. Every handshake runs in its own task, so one that stalls never holds up
// the server loop or the clients behind it.
pub async fn accept_connections_task(endpoint: Endpoint, accepted: UnboundedSender<Connection>) {
    while let Some(incoming) = endpoint.accept().await {
        spawn_handshake(incoming.into_future(), accepted.clone());
    }
    debug!("endpoint closed, no longer accepting connections");
}

fn spawn_handshake<C, E>(
    handshake: impl Future<Output = Result<C, E>> + Send + 'static,
    accepted: UnboundedSender<C>,
) where
    C: Send + 'static,
    E: Display + Send + 'static,
{
    tokio::spawn(async move {
        match handshake.await {
            Ok(connection) => {
                if accepted.send(connection).is_err() {
                    debug!("server loop gone, dropping new connection");
                }
            }
            Err(e) => warn!("handshake failed: {e}"),
        }
    });
}

// ============================================================================
// Per Client Network I/O Task
// ============================================================================

// Message from per client network I/O task to server
#[derive(Debug)]
pub enum ClientToServer {
    Message(ClientMessage),
    Disconnected,
}

// Message from server to per client network I/O task
#[derive(Debug)]
pub enum ServerToClient {
    Send(ServerMessage),
    Close,
}

pub async fn per_client_network_io_task(
    id: u32,
    connection: Connection,
    to_server: UnboundedSender<(u32, ClientToServer)>,
    from_server: UnboundedReceiver<ServerToClient>,
) {
    let stream = MessageStream::new(&connection);
    let stream = &stream;

    let close = serve_client(
        id,
        move || stream.recv::<ClientMessage>(),
        move |msg| async move { stream.send(&msg).await },
        &to_server,
        from_server,
    )
    .await;

    if close {
        connection.close(0u32.into(), b"logged off");
    }
    debug!(id, "network task exiting");
    let _ = to_server.send((id, ClientToServer::Disconnected));
}

// Runs the request and reply loops side by side until either ends. Both loop
// futures live for the whole connection, so a reply going out never cancels a
// request that is halfway read. Returns true when the server asked to close.
async fn serve_client<R, RF, S, SF>(
    id: u32,
    recv: R,
    send: S,
    to_server: &UnboundedSender<(u32, ClientToServer)>,
    from_server: UnboundedReceiver<ServerToClient>,
) -> bool
where
    R: FnMut() -> RF,
    RF: Future<Output = Result<ClientMessage, Error>>,
    S: FnMut(ServerMessage) -> SF,
    SF: Future<Output = Result<(), Error>>,
{
    tokio::select! {
        () = forward_requests(id, recv, to_server) => false,
        close = deliver_replies(id, send, from_server) => close,
    }
}

async fn forward_requests<R, RF>(id: u32, mut recv: R, to_server: &UnboundedSender<(u32, ClientToServer)>)
where
    R: FnMut() -> RF,
    RF: Future<Output = Result<ClientMessage, Error>>,
{
    loop {
        let result = recv().await;
        if !forward_request(id, result, to_server) {
            break;
        }
    }
}

fn forward_request(
    id: u32,
    result: Result<ClientMessage, Error>,
    to_server: &UnboundedSender<(u32, ClientToServer)>,
) -> bool {
    let err = match result {
        Ok(msg) => {
            trace!(id, ?msg, "request from client");
            return to_server
                .send((id, ClientToServer::Message(msg)))
                .map_err(|e| error!(id, "server loop gone: {e}"))
                .is_ok();
        }
        Err(err) => err,
    };

    match err.downcast_ref::<ConnectionError>() {
        Some(ConnectionError::ApplicationClosed { .. }) => debug!(id, "client closed connection"),
        Some(ConnectionError::TimedOut) => debug!(id, "client timed out"),
        Some(ConnectionError::LocallyClosed) => debug!(id, "connection closed by server"),
        Some(_) => error!(id, "connection error: {err}"),
        None => warn!(id, "unreadable request: {err}"),
    }
    false
}

async fn deliver_replies<S, SF>(id: u32, mut send: S, mut from_server: UnboundedReceiver<ServerToClient>) -> bool
where
    S: FnMut(ServerMessage) -> SF,
    SF: Future<Output = Result<(), Error>>,
{
    while let Some(cmd) = from_server.recv().await {
        match cmd {
            ServerToClient::Send(msg) => {
                // Levels are large, so only the variant is logged
                trace!(id, kind = message_kind(&msg), "reply to client");
                if let Err(e) = send(msg).await {
                    warn!(id, "failed to deliver reply: {e}");
                    return false;
                }
            }
            ServerToClient::Close => {
                debug!(id, "closing connection");
                return true;
            }
        }
    }
    debug!(id, "server dropped client channel");
    false
}

const fn message_kind(msg: &ServerMessage) -> &'static str {
    match msg {
        ServerMessage::Level(_) => "level",
        ServerMessage::Error(_) => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::protocol::{CGenerateLevel, SError};
    use std::time::Duration;
    use tokio::sync::{Mutex, mpsc::unbounded_channel};

    fn generate(seed: u64) -> ClientMessage {
        ClientMessage::GenerateLevel(CGenerateLevel {
            height: 4,
            width: 4,
            hall_width: None,
            seed: Some(seed),
        })
    }

    fn seed_of(msg: &ClientToServer) -> Option<u64> {
        match msg {
            ClientToServer::Message(ClientMessage::GenerateLevel(request)) => request.seed,
            _ => None,
        }
    }

    fn reply(message: &str) -> ServerMessage {
        ServerMessage::Error(SError {
            message: message.to_string(),
        })
    }

    #[tokio::test]
    async fn reply_does_not_drop_a_request_being_read() {
        // Each request is taken off the wire and then takes a while to finish
        // reading, so the reply to the first lands in the middle of the second.
        let (client_tx, client_rx) = unbounded_channel::<ClientMessage>();
        client_tx.send(generate(1)).unwrap();
        client_tx.send(generate(2)).unwrap();
        drop(client_tx);
        let client_rx = &Mutex::new(client_rx);
        let recv = move || async move {
            let msg = client_rx.lock().await.recv().await;
            tokio::time::sleep(Duration::from_millis(50)).await;
            msg.ok_or_else(|| anyhow::anyhow!("client went away"))
        };

        let (reply_tx, mut reply_rx) = unbounded_channel::<ServerMessage>();
        let send = move |msg: ServerMessage| {
            let reply_tx = reply_tx.clone();
            async move { reply_tx.send(msg).map_err(|_| anyhow::anyhow!("reply channel closed")) }
        };

        let (to_server, mut from_clients) = unbounded_channel();
        let (to_client, from_server) = unbounded_channel();

        let server_side = async {
            let (id, first) = from_clients.recv().await.unwrap();
            assert_eq!((id, seed_of(&first)), (7, Some(1)));
            to_client.send(ServerToClient::Send(reply("first"))).unwrap();

            let delivered = reply_rx.recv().await.unwrap();
            let (_, second) = from_clients.recv().await.unwrap();
            (delivered, seed_of(&second))
        };

        let (close, (delivered, second)) =
            tokio::join!(serve_client(7, recv, send, &to_server, from_server), server_side);

        assert!(!close);
        assert!(matches!(delivered, ServerMessage::Error(SError { message }) if message == "first"));
        assert_eq!(second, Some(2));
    }

    #[tokio::test]
    async fn close_command_ends_a_pending_read() {
        let (to_server, _from_clients) = unbounded_channel();
        let (to_client, from_server) = unbounded_channel();
        to_client.send(ServerToClient::Close).unwrap();

        let close = serve_client(
            3,
            std::future::pending::<Result<ClientMessage, Error>>,
            |_| async { Ok(()) },
            &to_server,
            from_server,
        )
        .await;
        assert!(close);
    }

    #[tokio::test]
    async fn unreadable_request_ends_the_connection() {
        let (to_server, mut from_clients) = unbounded_channel();
        let (_to_client, from_server) = unbounded_channel();

        let close = serve_client(
            3,
            || async { Err(anyhow::anyhow!("truncated message")) },
            |_| async { Ok(()) },
            &to_server,
            from_server,
        )
        .await;
        assert!(!close);
        assert!(from_clients.try_recv().is_err());
    }

    #[tokio::test]
    async fn stalled_handshake_does_not_hold_up_others() {
        let (accepted, mut from_accept) = unbounded_channel::<u32>();
        spawn_handshake(std::future::pending::<Result<u32, ConnectionError>>(), accepted.clone());
        spawn_handshake(async { Err::<u32, _>(ConnectionError::TimedOut) }, accepted.clone());
        spawn_handshake(async { Ok::<_, ConnectionError>(3) }, accepted);

        let connection = tokio::time::timeout(Duration::from_secs(1), from_accept.recv())
            .await
            .unwrap();
        assert_eq!(connection, Some(3));
    }
}
