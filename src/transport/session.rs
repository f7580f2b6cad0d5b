//! Control-link session and event loop.
//!
//! A [`Session`] owns one WebSocket to the control server. Opening it
//! spawns a tokio task that handles:
//!
//! - The `Hello` / `Identify` / `Identified` handshake
//! - Outgoing requests from [`Session::send_request`] and frame forwards
//! - Request/response correlation by request id
//! - Routing every response into the [`StatusAggregator`]
//!
//! Only the event loop writes to or closes the socket.

// ============================================================================
// Imports
// ============================================================================

use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use futures_util::future::join_all;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};

use crate::config::{HandshakeMode, RelayConfig};
use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::{
    ClientMessage, Hello, Identify, Request, RequestResponse, RequestType, ServerMessage,
};
use crate::status::{Endpoint, LinkStatus, StatusAggregator};

use super::router::route_response;

// ============================================================================
// Types
// ============================================================================

/// WebSocket stream returned by `connect_async`.
pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

type WsSink = SplitSink<WsStream, Message>;

/// Map of request ids to waiting callers.
type CorrelationMap = FxHashMap<RequestId, PendingRequest>;

/// An in-flight request awaiting its `RequestResponse`.
struct PendingRequest {
    request_type: RequestType,
    response_tx: oneshot::Sender<RequestResponse>,
}

// ============================================================================
// HandshakeState
// ============================================================================

/// Handshake progress of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Waiting for the server's `Hello`.
    AwaitingHello,
    /// `Identify` sent.
    AwaitingIdentified,
    /// `Identified` received.
    Ready,
    /// `IdentifyFailed` received. The socket stays open.
    Rejected,
}

// ============================================================================
// SocketState
// ============================================================================

const SOCKET_OPEN: u8 = 0;
const SOCKET_ERRORED: u8 = 1;
const SOCKET_CLOSED: u8 = 2;

// ============================================================================
// HandshakeOptions
// ============================================================================

#[derive(Debug, Clone)]
struct HandshakeOptions {
    mode: HandshakeMode,
    rpc_version: u32,
    password: Option<String>,
}

impl From<&RelayConfig> for HandshakeOptions {
    fn from(config: &RelayConfig) -> Self {
        Self {
            mode: config.handshake,
            rpc_version: config.rpc_version,
            password: config.password.clone(),
        }
    }
}

// ============================================================================
// SessionCommand
// ============================================================================

/// Internal commands for the event loop.
enum SessionCommand {
    /// Write a message to the socket.
    Send(ClientMessage),
    /// Close the socket.
    Shutdown,
}

// ============================================================================
// Shared
// ============================================================================

/// State shared between [`Session`] handles and the event loop.
struct Shared {
    correlation: Mutex<CorrelationMap>,
    socket: AtomicU8,
    handshake: Mutex<HandshakeState>,
    /// Set by [`Session::shutdown`]; held while a message is routed.
    retired: Mutex<bool>,
    options: HandshakeOptions,
    aggregator: Arc<StatusAggregator>,
}

impl Shared {
    fn new(options: HandshakeOptions, aggregator: Arc<StatusAggregator>) -> Self {
        let handshake = match options.mode {
            HandshakeMode::IdentifyOnOpen => HandshakeState::AwaitingIdentified,
            HandshakeMode::AwaitHello => HandshakeState::AwaitingHello,
        };

        Self {
            correlation: Mutex::new(CorrelationMap::default()),
            socket: AtomicU8::new(SOCKET_OPEN),
            handshake: Mutex::new(handshake),
            retired: Mutex::new(false),
            options,
            aggregator,
        }
    }

    fn set_handshake(&self, state: HandshakeState) {
        *self.handshake.lock() = state;
    }

    /// Stops this session from reporting into the aggregator.
    ///
    /// Returns once any message being routed has finished.
    fn retire(&self) {
        *self.retired.lock() = true;
    }

    /// Posts a control link status unless the session is retired.
    fn report(&self, status: LinkStatus) {
        let retired = self.retired.lock();
        if !*retired {
            self.aggregator.update_status(Endpoint::ControlLink, status);
        }
    }

    /// Registers a pending request under an id not currently in use.
    fn register(
        &self,
        request_type: &RequestType,
        response_tx: oneshot::Sender<RequestResponse>,
    ) -> RequestId {
        let mut correlation = self.correlation.lock();
        loop {
            if let Entry::Vacant(slot) = correlation.entry(RequestId::generate()) {
                let id = slot.key().clone();
                slot.insert(PendingRequest {
                    request_type: request_type.clone(),
                    response_tx,
                });
                return id;
            }
        }
    }

    /// Drops all pending requests without answering them.
    fn discard_pending(&self) -> usize {
        let pending: Vec<_> = self.correlation.lock().drain().collect();
        for (request_id, entry) in &pending {
            trace!(%request_id, request_type = %entry.request_type, "Discarding pending request");
        }
        pending.len()
    }
}

// ============================================================================
// Session
// ============================================================================

/// One open connection to the control server.
///
/// Cloning yields another handle to the same socket.
#[derive(Clone)]
pub struct Session {
    command_tx: mpsc::UnboundedSender<SessionCommand>,
    shared: Arc<Shared>,
}

impl Session {
    /// Starts a session on a freshly opened socket.
    ///
    /// In identify-on-open mode `Identify` is written before the event loop
    /// starts. Either way the control link is marked `connected`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WebSocket`] if the initial `Identify` cannot be sent.
    pub(crate) async fn open(
        mut ws_stream: WsStream,
        config: &RelayConfig,
        aggregator: Arc<StatusAggregator>,
    ) -> Result<Self> {
        let shared = Arc::new(Shared::new(HandshakeOptions::from(config), aggregator));

        if shared.options.mode == HandshakeMode::IdentifyOnOpen {
            let identify = ClientMessage::from(Identify::new(shared.options.rpc_version));
            debug!(rpc_version = shared.options.rpc_version, "Sending Identify");
            ws_stream.send(Message::Text(identify.to_json()?.into())).await?;
        }

        shared
            .aggregator
            .update_status(Endpoint::ControlLink, LinkStatus::Connected);

        let (command_tx, command_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_event_loop(
            ws_stream,
            command_rx,
            command_tx.downgrade(),
            Arc::clone(&shared),
        ));

        Ok(Self { command_tx, shared })
    }

    /// Returns `true` while the socket is open and readable.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.shared.socket.load(Ordering::Acquire) == SOCKET_OPEN
    }

    /// Returns `true` once the socket has closed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.socket.load(Ordering::Acquire) == SOCKET_CLOSED
    }

    /// Returns the handshake progress.
    #[inline]
    #[must_use]
    pub fn handshake_state(&self) -> HandshakeState {
        *self.shared.handshake.lock()
    }

    /// Returns the number of requests awaiting a response.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.correlation.lock().len()
    }

    /// Sends a request and waits for its response.
    ///
    /// Keys of `data` are merged into the request payload. There is no
    /// timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the socket is not open
    /// - [`Error::Protocol`] if `data` is not a JSON object
    /// - [`Error::ConnectionClosed`] if the socket closes first
    pub async fn send_request(
        &self,
        request_type: RequestType,
        data: Option<Value>,
    ) -> Result<RequestResponse> {
        if !self.is_open() {
            error!(%request_type, "Control link is not open");
            return Err(Error::NotConnected);
        }

        let mut request = Request::with_data(request_type, RequestId::new(""), data)?;
        let (response_tx, response_rx) = oneshot::channel();
        request.request_id = self.shared.register(&request.request_type, response_tx);
        let request_id = request.request_id.clone();

        debug!(%request_id, request_type = %request.request_type, "Sending request");

        if self
            .command_tx
            .send(SessionCommand::Send(request.into()))
            .is_err()
        {
            self.shared.correlation.lock().remove(&request_id);
            return Err(Error::ConnectionClosed);
        }

        response_rx.await.map_err(|_| Error::ConnectionClosed)
    }

    /// Queues a request without registering for its response.
    ///
    /// Returns `false` if the socket is not open.
    pub(crate) fn forward(&self, request: Request) -> bool {
        if !self.is_open() {
            return false;
        }
        trace!(request_id = %request.request_id, "Forwarding broadcast");
        self.command_tx
            .send(SessionCommand::Send(request.into()))
            .is_ok()
    }

    /// Asks the event loop to close the socket.
    ///
    /// Pending requests are dropped; the control link status is left to
    /// the caller. No message is routed after this returns, even one
    /// already read from the socket.
    pub(crate) fn shutdown(&self) {
        self.shared.retire();
        let _ = self.command_tx.send(SessionCommand::Shutdown);
    }
}

// ============================================================================
// Event Loop
// ============================================================================

#[derive(Debug, PartialEq, Eq)]
enum LoopExit {
    RemoteClosed,
    Shutdown,
    Dropped,
}

async fn run_event_loop(
    ws_stream: WsStream,
    mut command_rx: mpsc::UnboundedReceiver<SessionCommand>,
    weak_tx: mpsc::WeakUnboundedSender<SessionCommand>,
    shared: Arc<Shared>,
) {
    let (mut ws_write, mut ws_read) = ws_stream.split();
    let mut reading = true;

    let exit = loop {
        tokio::select! {
            // Incoming messages from the control server
            message = ws_read.next(), if reading => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handle_incoming_message(&text, &shared, &weak_tx) {
                            write_message(&mut ws_write, reply, &shared).await;
                        }
                    }

                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "WebSocket closed by remote");
                        break LoopExit::RemoteClosed;
                    }

                    Some(Err(e)) => {
                        error!(error = %e, "WebSocket error");
                        shared.socket.store(SOCKET_ERRORED, Ordering::Release);
                        shared.report(LinkStatus::Error);
                        reading = false;
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        break LoopExit::RemoteClosed;
                    }

                    // Ignore Binary, Ping, Pong
                    _ => {}
                }
            }

            // Commands from session handles
            command = command_rx.recv() => {
                match command {
                    Some(SessionCommand::Send(message)) => {
                        write_message(&mut ws_write, message, &shared).await;
                    }

                    Some(SessionCommand::Shutdown) => {
                        debug!("Shutdown command received");
                        let _ = ws_write.close().await;
                        break LoopExit::Shutdown;
                    }

                    None => {
                        debug!("All session handles dropped");
                        let _ = ws_write.close().await;
                        break LoopExit::Dropped;
                    }
                }
            }
        }
    };

    shared.socket.store(SOCKET_CLOSED, Ordering::Release);

    let count = shared.discard_pending();
    if count > 0 {
        debug!(count, "Dropped pending requests on close");
    }

    if exit == LoopExit::RemoteClosed {
        shared.report(LinkStatus::Disconnected);
    }

    debug!(?exit, "Event loop terminated");
}

/// Handles a text frame from the control server.
///
/// Returns a message to write back, if any.
fn handle_incoming_message(
    text: &str,
    shared: &Arc<Shared>,
    weak_tx: &mpsc::WeakUnboundedSender<SessionCommand>,
) -> Option<ClientMessage> {
    let retired = shared.retired.lock();
    if *retired {
        trace!("Session retired, ignoring control-server message");
        return None;
    }

    let message = match ServerMessage::parse(text) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, text = %text, "Failed to parse control-server message");
            return None;
        }
    };

    match message {
        ServerMessage::Hello(hello) => handle_hello(&hello, shared),

        ServerMessage::Identified(identified) => {
            info!(
                negotiated_rpc_version = ?identified.negotiated_rpc_version,
                "Identified with control server"
            );
            shared.set_handshake(HandshakeState::Ready);
            shared
                .aggregator
                .update_status(Endpoint::ControlLink, LinkStatus::Authenticated);

            if let Some(command_tx) = weak_tx.upgrade() {
                spawn_stats_refresh(Session {
                    command_tx,
                    shared: Arc::clone(shared),
                });
            }
            None
        }

        ServerMessage::IdentifyFailed(failed) => {
            error!(reason = ?failed.error, "Identification failed");
            shared.set_handshake(HandshakeState::Rejected);
            shared
                .aggregator
                .update_status(Endpoint::ControlLink, LinkStatus::AuthFailed);
            None
        }

        ServerMessage::RequestResponse(response) => {
            dispatch_response(response, shared);
            None
        }

        ServerMessage::Unhandled { op } => {
            debug!(op, "Unhandled message type");
            None
        }
    }
}

fn handle_hello(hello: &Hello, shared: &Shared) -> Option<ClientMessage> {
    debug!(
        rpc_version = hello.rpc_version,
        server_version = ?hello.obs_web_socket_version,
        auth_required = hello.authentication.is_some(),
        "Received Hello"
    );

    if shared.options.mode == HandshakeMode::IdentifyOnOpen {
        return None;
    }

    {
        let mut state = shared.handshake.lock();
        if *state != HandshakeState::AwaitingHello {
            warn!(state = ?*state, "Ignoring unexpected Hello");
            return None;
        }
        *state = HandshakeState::AwaitingIdentified;
    }

    let password = shared.options.password.as_deref();
    if hello.authentication.is_some() && password.is_none() {
        warn!("Control server requires a password but none is configured");
    }

    Some(Identify::for_hello(hello, password).into())
}

/// Routes a response, then completes its pending request if one exists.
fn dispatch_response(response: RequestResponse, shared: &Shared) {
    route_response(&response, &shared.aggregator);

    let pending = shared.correlation.lock().remove(&response.request_id);
    match pending {
        Some(pending) => {
            trace!(request_id = %response.request_id, "Completing pending request");
            let _ = pending.response_tx.send(response);
        }
        None => {
            trace!(request_id = %response.request_id, "Response without pending request");
        }
    }
}

async fn write_message(ws_write: &mut WsSink, message: ClientMessage, shared: &Shared) {
    let request_id = match &message {
        ClientMessage::Request(request) => Some(request.request_id.clone()),
        ClientMessage::Identify(_) => None,
    };

    let json = match message.to_json() {
        Ok(json) => json,
        Err(e) => {
            error!(error = %e, "Failed to serialize message");
            if let Some(id) = &request_id {
                shared.correlation.lock().remove(id);
            }
            return;
        }
    };

    if let Err(e) = ws_write.send(Message::Text(json.into())).await {
        warn!(error = %e, "Failed to write to control server");
        if let Some(id) = &request_id {
            // Dropping the sender fails the waiting caller.
            shared.correlation.lock().remove(id);
        }
    }
}

/// Issues the four status queries concurrently.
fn spawn_stats_refresh(session: Session) {
    tokio::spawn(async move {
        let queries = RequestType::STATUS_QUERIES.map(|request_type| {
            let session = session.clone();
            async move {
                let result = session.send_request(request_type.clone(), None).await;
                (request_type, result)
            }
        });

        for (request_type, result) in join_all(queries).await {
            if let Err(e) = result {
                debug!(%request_type, error = %e, "Status query abandoned");
            }
        }
    });
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    use tokio::sync::oneshot::error::TryRecvError;

    fn shared(mode: HandshakeMode, password: Option<&str>) -> Arc<Shared> {
        Arc::new(Shared::new(
            HandshakeOptions {
                mode,
                rpc_version: 1,
                password: password.map(str::to_string),
            },
            StatusAggregator::new(),
        ))
    }

    fn detached_weak() -> mpsc::WeakUnboundedSender<SessionCommand> {
        let (tx, _rx) = mpsc::unbounded_channel();
        tx.downgrade()
    }

    #[test]
    fn test_register_ids_are_unique() {
        let shared = shared(HandshakeMode::IdentifyOnOpen, None);
        let mut ids = HashSet::new();
        let mut receivers = Vec::new();
        for _ in 0..256 {
            let (tx, rx) = oneshot::channel();
            receivers.push(rx);
            assert!(ids.insert(shared.register(&RequestType::GetSceneList, tx)));
        }
        assert_eq!(shared.correlation.lock().len(), 256);
    }

    #[test]
    fn test_unmatched_response_updates_stats_without_callback() {
        let shared = shared(HandshakeMode::IdentifyOnOpen, None);
        let (tx, mut rx) = oneshot::channel();
        let pending_id = shared.register(&RequestType::GetSceneList, tx);

        let reply = handle_incoming_message(
            r#"{"op":7,"d":{"requestType":"GetSceneList","requestId":"X","responseData":{"scenes":["a","b","c"]}}}"#,
            &shared,
            &detached_weak(),
        );

        assert!(reply.is_none());
        assert_eq!(shared.aggregator.snapshot().obs_stats.scenes, 3);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        assert!(shared.correlation.lock().contains_key(&pending_id));
    }

    #[test]
    fn test_matched_response_completes_pending() {
        let shared = shared(HandshakeMode::IdentifyOnOpen, None);
        let (tx, mut rx) = oneshot::channel();
        let id = shared.register(&RequestType::GetInputList, tx);

        let text = format!(
            r#"{{"op":7,"d":{{"requestType":"GetInputList","requestId":"{id}","responseData":{{"inputs":[1]}}}}}}"#
        );
        handle_incoming_message(&text, &shared, &detached_weak());

        let response = rx.try_recv().expect("pending request should complete");
        assert_eq!(response.request_id, id);
        assert_eq!(shared.aggregator.snapshot().obs_stats.sources, 1);
        assert_eq!(shared.correlation.lock().len(), 0);
    }

    #[test]
    fn test_discarded_requests_never_complete() {
        let shared = shared(HandshakeMode::IdentifyOnOpen, None);
        let (tx, mut rx) = oneshot::channel();
        let id = shared.register(&RequestType::GetRecordStatus, tx);

        assert_eq!(shared.discard_pending(), 1);

        let text = format!(
            r#"{{"op":7,"d":{{"requestType":"GetRecordStatus","requestId":"{id}","responseData":{{"outputActive":true}}}}}}"#
        );
        handle_incoming_message(&text, &shared, &detached_weak());

        assert!(matches!(rx.try_recv(), Err(TryRecvError::Closed)));
    }

    #[test]
    fn test_identify_failed_sets_auth_failed() {
        let shared = shared(HandshakeMode::IdentifyOnOpen, None);
        handle_incoming_message(
            r#"{"op":3,"d":{"error":"nope"}}"#,
            &shared,
            &detached_weak(),
        );
        assert_eq!(*shared.handshake.lock(), HandshakeState::Rejected);
        assert_eq!(
            shared.aggregator.status(Endpoint::ControlLink),
            LinkStatus::AuthFailed
        );
    }

    #[test]
    fn test_hello_ignored_when_identifying_on_open() {
        let shared = shared(HandshakeMode::IdentifyOnOpen, None);
        let reply = handle_incoming_message(
            r#"{"op":0,"d":{"rpcVersion":1}}"#,
            &shared,
            &detached_weak(),
        );
        assert!(reply.is_none());
        assert_eq!(*shared.handshake.lock(), HandshakeState::AwaitingIdentified);
    }

    #[test]
    fn test_hello_triggers_identify_when_awaiting() {
        let shared = shared(HandshakeMode::AwaitHello, Some(""));
        let reply = handle_incoming_message(
            r#"{"op":0,"d":{"rpcVersion":1,"authentication":{"challenge":"challenge","salt":"salt"}}}"#,
            &shared,
            &detached_weak(),
        );

        let Some(ClientMessage::Identify(identify)) = reply else {
            panic!("expected Identify reply");
        };
        assert_eq!(identify.rpc_version, 1);
        assert_eq!(
            identify.authentication.as_deref(),
            Some("5fmcrqR0I7snYOpUX/Ac22UdSA81TwCyHqCr6eFQyyI=")
        );
        assert_eq!(*shared.handshake.lock(), HandshakeState::AwaitingIdentified);

        let again = handle_incoming_message(
            r#"{"op":0,"d":{"rpcVersion":1}}"#,
            &shared,
            &detached_weak(),
        );
        assert!(again.is_none());
    }

    #[test]
    fn test_retired_session_ignores_messages() {
        let shared = shared(HandshakeMode::IdentifyOnOpen, None);
        let (tx, mut rx) = oneshot::channel();
        let id = shared.register(&RequestType::GetSceneList, tx);
        shared.retire();

        let text = format!(
            r#"{{"op":7,"d":{{"requestType":"GetSceneList","requestId":"{id}","responseData":{{"scenes":[1,2]}}}}}}"#
        );
        assert!(handle_incoming_message(&text, &shared, &detached_weak()).is_none());
        handle_incoming_message(
            r#"{"op":2,"d":{"negotiatedRpcVersion":1}}"#,
            &shared,
            &detached_weak(),
        );

        let snapshot = shared.aggregator.snapshot();
        assert_eq!(snapshot.obs_stats.scenes, 0);
        assert_eq!(snapshot.connection_status.control_link, LinkStatus::Disconnected);
        assert_eq!(*shared.handshake.lock(), HandshakeState::AwaitingIdentified);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        shared.report(LinkStatus::Error);
        assert_eq!(
            shared.aggregator.status(Endpoint::ControlLink),
            LinkStatus::Disconnected
        );
    }

    #[test]
    fn test_malformed_message_is_ignored() {
        let shared = shared(HandshakeMode::IdentifyOnOpen, None);
        assert!(handle_incoming_message("{{", &shared, &detached_weak()).is_none());
        assert_eq!(shared.aggregator.snapshot(), Default::default());
    }
}
