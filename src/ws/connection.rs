use std::fmt;
use std::sync::Arc;
use axum::extract::ws::Message;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::utils::scope_guard::ScopeGuard;
use super::hub::Hub;

pub type ConnectionId = Uuid;

/// A serialized outbound message, shared between every mailbox it is queued on
pub type Payload = Arc<str>;

/// A websocket frame type the connection loops can drive.
pub trait Frame: From<String> + Send + 'static {
    fn is_close(&self) -> bool;
    fn close() -> Self;
}

impl Frame for Message {
    fn is_close(&self) -> bool {
        matches!(self, Message::Close(_))
    }

    fn close() -> Self {
        Message::Close(None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// The peer is not draining its mailbox fast enough
    MailboxFull,
    /// The outbound loop is gone
    Closed,
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::MailboxFull => write!(f, "mailbox full"),
            SendError::Closed => write!(f, "mailbox closed"),
        }
    }
}

impl std::error::Error for SendError {}

/// Producer side of a connection's mailbox.
///
/// Only the hub registry holds one. Dropping it closes the mailbox, which in
/// turn ends the connection's outbound loop.
#[derive(Debug)]
pub struct ClientHandle {
    id: ConnectionId,
    session_id: String,
    mailbox: mpsc::Sender<Payload>,
}

impl ClientHandle {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Non-blocking enqueue. Never waits for the peer.
    pub fn send(&self, payload: Payload) -> Result<(), SendError> {
        self.mailbox.try_send(payload).map_err(|e| match e {
            TrySendError::Full(_) => SendError::MailboxFull,
            TrySendError::Closed(_) => SendError::Closed,
        })
    }
}

/// Create a bounded mailbox for a new connection bound to `session_id`.
pub fn mailbox(session_id: &str, capacity: usize) -> (ClientHandle, mpsc::Receiver<Payload>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let handle = ClientHandle {
        id: Uuid::new_v4(),
        session_id: session_id.to_string(),
        mailbox: tx,
    };
    (handle, rx)
}

/// Drive one peer for its whole lifetime.
///
/// `admit` receives the connection's mailbox producer and must register it
/// with `hub`, queueing anything the peer has to see first beforehand. When it
/// returns false the peer is sent a close frame and dropped. Otherwise the
/// outbound and inbound loops run until either ends, and the connection is
/// unregistered exactly once on the way out.
pub async fn serve<S, M, E, A>(hub: Arc<Hub>, session_id: String, stream: S, admit: A)
where
    S: Stream<Item = Result<M, E>> + Sink<M> + Send + 'static,
    <S as Sink<M>>::Error: fmt::Display + Send,
    M: Frame,
    E: fmt::Display + Send + 'static,
    A: FnOnce(ClientHandle) -> bool,
{
    let (handle, mailbox) = mailbox(&session_id, hub.mailbox_capacity());
    let connection_id = handle.id();
    let (mut sink, stream) = stream.split::<M>();

    if !admit(handle) {
        info!("Connection {} refused for session {}", connection_id, session_id);
        _ = sink.send(M::close()).await;
        return;
    }
    info!(
        "Connection {} registered for session {} ({} member(s))",
        connection_id,
        session_id,
        hub.member_count(&session_id)
    );

    let _unregister = ScopeGuard::new({
        let hub = hub.clone();
        let session_id = session_id.clone();
        move || {
            if hub.unregister(&session_id, connection_id) {
                info!("Connection {} unregistered from session {}", connection_id, session_id);
            } else {
                debug!("Connection {} was already evicted from session {}", connection_id, session_id);
            }
        }
    });

    let mut send_task = tokio::spawn(outbound_loop(sink, mailbox, connection_id));
    let mut recv_task = tokio::spawn(inbound_loop(stream, connection_id));
    // Also runs when this future is dropped mid-flight
    let _abort = ScopeGuard::new({
        let send = send_task.abort_handle();
        let recv = recv_task.abort_handle();
        move || {
            send.abort();
            recv.abort();
        }
    });

    // Wait for either task to finish, the guard stops the other
    tokio::select! {
        _ = (&mut send_task) => {},
        _ = (&mut recv_task) => {},
    };
    info!("WebSocket connection {} for session {} terminated", connection_id, session_id);
}

async fn outbound_loop<S, M>(mut sink: SplitSink<S, M>, mut mailbox: mpsc::Receiver<Payload>, connection_id: ConnectionId)
where
    S: Sink<M>,
    S::Error: fmt::Display,
    M: Frame,
{
    while let Some(payload) = mailbox.recv().await {
        if let Err(e) = sink.send(M::from(payload.to_string())).await {
            warn!("Write to connection {} failed: {}", connection_id, e);
            return;
        }
    }

    // The hub dropped our handle
    debug!("Mailbox of connection {} closed", connection_id);
    _ = sink.send(M::close()).await;
}

async fn inbound_loop<S, M, E>(mut stream: SplitStream<S>, connection_id: ConnectionId)
where
    S: Stream<Item = Result<M, E>>,
    M: Frame,
    E: fmt::Display,
{
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(frame) if frame.is_close() => {
                debug!("Peer closed connection {}", connection_id);
                return;
            }
            Ok(_) => debug!("Ignoring inbound frame on connection {}", connection_id),
            Err(e) => {
                warn!("Read from connection {} failed: {}", connection_id, e);
                return;
            }
        }
    }
    debug!("Stream of connection {} ended", connection_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::models::Participant;
    use crate::services::{GameService, SessionStore};
    use tokio::io::DuplexStream;
    use tokio::time::{sleep, timeout};
    use tokio_tungstenite::tungstenite::{protocol::Role, Message as WsMessage};
    use tokio_tungstenite::WebSocketStream;

    impl Frame for WsMessage {
        fn is_close(&self) -> bool {
            matches!(self, WsMessage::Close(_))
        }

        fn close() -> Self {
            WsMessage::Close(None)
        }
    }

    const WAIT: Duration = Duration::from_secs(2);

    async fn socket_pair(buffer: usize) -> (WebSocketStream<DuplexStream>, WebSocketStream<DuplexStream>) {
        let (server_io, client_io) = tokio::io::duplex(buffer);
        let server = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;
        let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
        (server, client)
    }

    fn register_with(hub: &Arc<Hub>, greeting: Option<&'static str>) -> impl FnOnce(ClientHandle) -> bool {
        let hub = hub.clone();
        move |handle| {
            if let Some(greeting) = greeting {
                handle.send(Arc::from(greeting)).unwrap();
            }
            hub.register(handle);
            true
        }
    }

    async fn wait_for_members(hub: &Hub, session_id: &str, expected: usize) {
        timeout(WAIT, async {
            while hub.member_count(session_id) != expected {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("member count never reached expected value");
    }

    async fn next_text(client: &mut WebSocketStream<DuplexStream>) -> String {
        let frame = timeout(WAIT, client.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("read failed");
        frame.to_text().unwrap().to_string()
    }

    #[test]
    fn send_reports_full_and_closed_mailboxes() {
        let (handle, rx) = mailbox("abc", 1);
        assert_eq!(handle.session_id(), "abc");
        assert!(handle.send(Arc::from("a")).is_ok());
        assert_eq!(handle.send(Arc::from("b")), Err(SendError::MailboxFull));
        drop(rx);
        assert_eq!(handle.send(Arc::from("c")), Err(SendError::Closed));
    }

    #[tokio::test]
    async fn greeting_comes_first_then_broadcasts_in_order() {
        let hub = Arc::new(Hub::new(8));
        let (server, mut client) = socket_pair(64 * 1024).await;
        let task = tokio::spawn(serve(hub.clone(), "abc".to_string(), server, register_with(&hub, Some("hello"))));
        wait_for_members(&hub, "abc", 1).await;

        assert_eq!(hub.broadcast_payload("abc", Arc::from("one")), 1);
        assert_eq!(hub.broadcast_payload("abc", Arc::from("two")), 1);
        for expected in ["hello", "one", "two"] {
            assert_eq!(next_text(&mut client).await, expected);
        }

        client.close(None).await.unwrap();
        timeout(WAIT, task).await.unwrap().unwrap();
        assert_eq!(hub.member_count("abc"), 0);
        assert_eq!(hub.session_count(), 0);
    }

    #[tokio::test]
    async fn dropped_peer_is_unregistered() {
        let hub = Arc::new(Hub::new(8));
        let (server, client) = socket_pair(1024).await;
        let task = tokio::spawn(serve(hub.clone(), "abc".to_string(), server, register_with(&hub, None)));
        wait_for_members(&hub, "abc", 1).await;

        drop(client);
        timeout(WAIT, task).await.unwrap().unwrap();
        assert_eq!(hub.connection_count(), 0);
    }

    #[tokio::test]
    async fn stalled_peer_is_evicted_and_sent_a_close_frame() {
        let hub = Arc::new(Hub::new(1));
        // Tiny pipe so the outbound loop blocks on write while nobody reads
        let (server, mut client) = socket_pair(256).await;
        let task = tokio::spawn(serve(hub.clone(), "abc".to_string(), server, register_with(&hub, None)));
        wait_for_members(&hub, "abc", 1).await;

        let payload: Payload = Arc::from("x".repeat(1024));
        for _ in 0..100 {
            hub.broadcast_payload("abc", payload.clone());
            if hub.member_count("abc") == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(hub.member_count("abc"), 0);

        let mut texts = 0;
        let mut saw_close = false;
        while let Ok(Some(Ok(frame))) = timeout(WAIT, client.next()).await {
            if frame.is_close() {
                saw_close = true;
                break;
            }
            texts += 1;
        }
        assert!(texts >= 1);
        assert!(saw_close);
        timeout(WAIT, task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn refused_peer_gets_a_close_frame() {
        let hub = Arc::new(Hub::new(8));
        let (server, mut client) = socket_pair(1024).await;
        timeout(WAIT, serve(hub.clone(), "abc".to_string(), server, |_| false)).await.unwrap();

        let frame = timeout(WAIT, client.next()).await.unwrap().unwrap().unwrap();
        assert!(frame.is_close());
        assert_eq!(hub.connection_count(), 0);
    }

    #[tokio::test]
    async fn join_before_serve_is_part_of_the_game_state() {
        let service = Arc::new(GameService::new(SessionStore::new(16, Duration::from_secs(60)), Arc::new(Hub::new(8))));
        let game = service.create_game("the quick brown fox").unwrap();
        let session_id = game.id.to_string();
        let (server, mut client) = socket_pair(64 * 1024).await;

        // Lands after the upgrade was accepted but before the socket is served
        service.join_game(game.id, Participant::new("p1", "One")).unwrap();

        let task = tokio::spawn(serve(service.hub(), session_id.clone(), server, {
            let service = service.clone();
            move |handle| service.subscribe(game.id, handle).is_ok()
        }));

        let state: serde_json::Value = serde_json::from_str(&next_text(&mut client).await).unwrap();
        assert_eq!(state["type"], "gameState");
        assert_eq!(state["data"]["status"], "playing");
        assert_eq!(state["data"]["players"].as_array().unwrap().len(), 1);

        wait_for_members(&service.hub(), &session_id, 1).await;
        service.join_game(game.id, Participant::new("p2", "Two")).unwrap();
        let joined: serde_json::Value = serde_json::from_str(&next_text(&mut client).await).unwrap();
        assert_eq!(joined["type"], "playerJoined");
        assert_eq!(joined["data"]["id"], "p2");

        client.close(None).await.unwrap();
        timeout(WAIT, task).await.unwrap().unwrap();
        assert_eq!(service.hub().connection_count(), 0);
    }

    #[tokio::test]
    async fn dropping_serve_releases_the_socket() {
        let hub = Arc::new(Hub::new(8));
        let (server, mut client) = socket_pair(1024).await;
        let task = tokio::spawn(serve(hub.clone(), "abc".to_string(), server, register_with(&hub, None)));
        wait_for_members(&hub, "abc", 1).await;

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert_eq!(hub.connection_count(), 0);

        // Once both loops are gone the server half of the pipe is dropped
        timeout(WAIT, async {
            while client.send(WsMessage::text("ping")).await.is_ok() {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("server side of the socket outlived serve");
    }
}
