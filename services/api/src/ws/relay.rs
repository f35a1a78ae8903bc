//! The relay engine: one client socket, one upstream socket, two directions.
//!
//! After connecting upstream the engine writes `session.update` before either
//! forwarding loop starts, so the session configuration always precedes the
//! first client-originated message. Both loops then run in a per-session
//! `JoinSet`; whichever finishes first ends the session and the other is
//! aborted without draining.
//!
//! The upstream write half is shared by both loops behind a session-scoped
//! mutex. Tool follow-ups are written under a single lock acquisition, inline
//! in the upstream-to-client loop, before the next upstream message is read.

use anyhow::{Context, Result, anyhow};
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{
    Sink, SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpStream, sync::Mutex, task::JoinSet, time::timeout};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{
        client::IntoClientRequest,
        http::{HeaderName, HeaderValue},
        protocol::Message as WsMessage,
    },
};
use tracing::{Instrument, debug, error, info, instrument, warn};
use uuid::Uuid;
use voicebridge_core::{
    ProviderConnectionConfig, SessionUpdate, ToolDispatcher,
    events::{ClientEvent, function_calls},
};

/// Close code sent to the client when the upstream cannot be reached.
pub const CLOSE_UPSTREAM_UNAVAILABLE: u16 = 1011;

/// WebSocket close reasons are limited to 123 bytes.
const MAX_CLOSE_REASON_BYTES: usize = 123;

/// Upper bound on the best-effort close handshake at teardown.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type UpstreamSink = Arc<Mutex<SplitSink<UpstreamSocket, WsMessage>>>;
type ClientSink = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Why a relay direction stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    ClientClosed,
    ClientError,
    UpstreamClosed,
    UpstreamError,
}

fn truncate_reason(reason: &str) -> &str {
    if reason.len() <= MAX_CLOSE_REASON_BYTES {
        return reason;
    }
    let mut end = MAX_CLOSE_REASON_BYTES;
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    &reason[..end]
}

/// Sends a close frame with `code` and `reason`, then drops the socket.
pub async fn close_client(mut socket: WebSocket, code: u16, reason: impl Into<String>) {
    let reason = reason.into();
    let frame = CloseFrame {
        code,
        reason: truncate_reason(&reason).to_string().into(),
    };
    if let Err(e) = socket.send(Message::Close(Some(frame))).await {
        debug!(error = %e, "Failed to send close frame to client");
    }
}

/// Runs relay sessions. Cheap to clone; shared by every connection.
#[derive(Clone)]
pub struct RelayEngine {
    tools: Arc<ToolDispatcher>,
    connect_timeout: Duration,
}

impl RelayEngine {
    pub fn new(tools: Arc<ToolDispatcher>, connect_timeout: Duration) -> Self {
        Self {
            tools,
            connect_timeout,
        }
    }

    /// Relays one client session until either side goes away.
    #[instrument(
        name = "relay_session",
        skip_all,
        fields(
            session_id = %Uuid::new_v4(),
            provider = %connection.provider,
            model = %connection.resolved_model,
        )
    )]
    pub async fn run(
        &self,
        client: WebSocket,
        connection: ProviderConnectionConfig,
        session_update: SessionUpdate,
    ) {
        let upstream = match self.open_upstream(&connection, &session_update).await {
            Ok(upstream) => upstream,
            Err(e) => {
                error!(error = %format!("{e:#}"), "Upstream connection failed");
                close_client(client, CLOSE_UPSTREAM_UNAVAILABLE, "Upstream connection failed")
                    .await;
                return;
            }
        };
        info!("Connected to upstream; relaying session");

        let (upstream_tx, upstream_rx) = upstream.split();
        let upstream_tx = Arc::new(Mutex::new(upstream_tx));
        let (client_tx, client_rx) = client.split();
        let client_tx = Arc::new(Mutex::new(client_tx));

        let mut directions = JoinSet::new();
        directions.spawn(client_to_upstream(client_rx, upstream_tx.clone()).in_current_span());
        directions.spawn(
            upstream_to_client(
                upstream_rx,
                client_tx.clone(),
                upstream_tx.clone(),
                self.tools.clone(),
            )
            .in_current_span(),
        );

        match directions.join_next().await {
            Some(Ok(end)) => info!(?end, "Relay direction finished; tearing down session"),
            Some(Err(e)) => error!(error = %e, "Relay task failed"),
            None => {}
        }
        directions.abort_all();
        while directions.join_next().await.is_some() {}

        let _ = timeout(CLOSE_GRACE, async {
            let _ = upstream_tx.lock().await.close().await;
        })
        .await;
        let _ = timeout(CLOSE_GRACE, async {
            let _ = client_tx.lock().await.close().await;
        })
        .await;
        info!("Relay session closed");
    }

    /// Connects upstream and writes the session configuration.
    async fn open_upstream(
        &self,
        connection: &ProviderConnectionConfig,
        session_update: &SessionUpdate,
    ) -> Result<UpstreamSocket> {
        let mut upstream = self.connect_upstream(connection).await?;
        let payload = serde_json::to_string(session_update)?;
        upstream
            .send(WsMessage::Text(payload.into()))
            .await
            .context("Failed to send session.update")?;
        Ok(upstream)
    }

    async fn connect_upstream(
        &self,
        connection: &ProviderConnectionConfig,
    ) -> Result<UpstreamSocket> {
        let mut request = connection
            .ws_url
            .as_str()
            .into_client_request()
            .context("Invalid upstream URL")?;
        for (name, value) in &connection.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .context("Invalid upstream header name")?;
            let mut value =
                HeaderValue::from_str(value).context("Invalid upstream header value")?;
            value.set_sensitive(true);
            request.headers_mut().insert(name, value);
        }

        let (stream, _) = timeout(self.connect_timeout, connect_async(request))
            .await
            .map_err(|_| {
                anyhow!(
                    "Timed out after {:?} connecting to upstream",
                    self.connect_timeout
                )
            })?
            .context("Failed to connect to upstream realtime WebSocket")?;
        Ok(stream)
    }
}

async fn client_to_upstream(
    mut client_rx: SplitStream<WebSocket>,
    upstream_tx: UpstreamSink,
) -> SessionEnd {
    while let Some(msg_result) = client_rx.next().await {
        let forward = match msg_result {
            Ok(Message::Text(text)) => WsMessage::Text(text.as_str().to_owned().into()),
            Ok(Message::Binary(data)) => WsMessage::Binary(data),
            Ok(Message::Close(_)) => {
                info!("Client sent close frame");
                return SessionEnd::ClientClosed;
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => continue,
            Err(e) => {
                warn!(error = %e, "Error receiving from client WebSocket");
                return SessionEnd::ClientError;
            }
        };

        if let Err(e) = upstream_tx.lock().await.send(forward).await {
            warn!(error = %e, "Failed to forward client message upstream");
            return SessionEnd::UpstreamError;
        }
    }
    SessionEnd::ClientClosed
}

async fn upstream_to_client(
    mut upstream_rx: SplitStream<UpstreamSocket>,
    client_tx: ClientSink,
    upstream_tx: UpstreamSink,
    tools: Arc<ToolDispatcher>,
) -> SessionEnd {
    while let Some(msg_result) = upstream_rx.next().await {
        match msg_result {
            Ok(WsMessage::Text(text)) => {
                let forward = Message::Text(text.as_str().to_owned().into());
                if let Err(e) = client_tx.lock().await.send(forward).await {
                    warn!(error = %e, "Failed to forward upstream message to client");
                    return SessionEnd::ClientError;
                }

                // Forwarding never depends on the payload being JSON.
                let Ok(event) = serde_json::from_str::<Value>(text.as_str()) else {
                    continue;
                };
                if let Err(e) = answer_tool_calls(&event, upstream_tx.as_ref(), &tools).await {
                    warn!(error = %format!("{e:#}"), "Failed to deliver tool result upstream");
                    return SessionEnd::UpstreamError;
                }
            }
            Ok(WsMessage::Binary(data)) => {
                if let Err(e) = client_tx.lock().await.send(Message::Binary(data)).await {
                    warn!(error = %e, "Failed to forward upstream audio to client");
                    return SessionEnd::ClientError;
                }
            }
            Ok(WsMessage::Close(_)) => {
                info!("Upstream sent close frame");
                return SessionEnd::UpstreamClosed;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "Error receiving from upstream WebSocket");
                return SessionEnd::UpstreamError;
            }
        }
    }
    SessionEnd::UpstreamClosed
}

/// Executes every function call in a `response.done` event and writes
/// `conversation.item.create` + `response.create` upstream for each, in order.
async fn answer_tool_calls<S>(
    event: &Value,
    upstream_tx: &Mutex<S>,
    tools: &ToolDispatcher,
) -> Result<()>
where
    S: Sink<WsMessage> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    for call in function_calls(event) {
        let output = tools.execute(&call.name, &call.arguments).await;
        info!(tool = %call.name, call_id = %call.call_id, "Answering tool call");

        let mut sink = upstream_tx.lock().await;
        for message in ClientEvent::tool_result(&call.call_id, output) {
            let payload = serde_json::to_string(&message)?;
            sink.send(WsMessage::Text(payload.into())).await?;
        }
    }
    Ok(())
}
