//! Shared fixtures for the integration tests: an in-process app server and a
//! scriptable upstream realtime endpoint.

#![allow(dead_code)]

use futures_util::{Stream, StreamExt};
use secrecy::SecretString;
use serde_json::Value;
use std::{
    net::SocketAddr,
    path::PathBuf,
    sync::{Arc, Mutex as StdMutex},
    time::Duration,
};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::mpsc,
    time::timeout,
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, accept_hdr_async,
    tungstenite::{
        Error as WsError, Message,
        handshake::server::{ErrorResponse, Request, Response},
        http::HeaderMap,
    },
};
use tracing::Level;
use voicebridge_api::{config::Config, router::create_router, state::AppState};
use voicebridge_core::{ProviderCatalog, RealtimeSettings, ToolDispatcher};

pub const WAIT: Duration = Duration::from_secs(5);

pub const CATALOG: &str = r#"{
    "providers": {
        "openai": {
            "models": [
                { "id": "gpt-realtime-mini" },
                { "id": "gpt-realtime" }
            ]
        },
        "azure": {
            "deployments": [{ "name": "rt-prod", "model": "gpt-4o-realtime-preview" }]
        }
    }
}"#;

pub type ClientSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One accepted upstream connection, with what the relay sent in the handshake.
pub struct UpstreamConnection {
    pub uri: String,
    pub headers: HeaderMap,
    pub ws: WebSocketStream<TcpStream>,
}

/// A local WebSocket server standing in for the provider's realtime endpoint.
pub struct MockUpstream {
    pub addr: SocketAddr,
    connections: mpsc::Receiver<UpstreamConnection>,
}

impl MockUpstream {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, connections) = mpsc::channel(8);

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let captured = Arc::new(StdMutex::new(None));
                    let sink = captured.clone();
                    let callback = move |req: &Request, resp: Response| {
                        *sink.lock().unwrap() =
                            Some((req.uri().to_string(), req.headers().clone()));
                        Ok::<_, ErrorResponse>(resp)
                    };
                    if let Ok(ws) = accept_hdr_async(stream, callback).await {
                        let (uri, headers) = captured.lock().unwrap().take().unwrap();
                        let _ = tx.send(UpstreamConnection { uri, headers, ws }).await;
                    }
                });
            }
        });

        Self { addr, connections }
    }

    pub fn base_url(&self) -> String {
        format!("ws://{}/v1/realtime", self.addr)
    }

    pub async fn accept(&mut self) -> UpstreamConnection {
        timeout(WAIT, self.connections.recv())
            .await
            .expect("timed out waiting for the relay to connect upstream")
            .expect("mock upstream stopped")
    }

    /// True if no upstream connection arrives within `wait`.
    pub async fn stays_idle(&mut self, wait: Duration) -> bool {
        timeout(wait, self.connections.recv()).await.is_err()
    }
}

/// Settings with a server-side OpenAI key pointed at `openai_base_url`.
pub fn test_config(openai_base_url: String) -> Config {
    let mut realtime = RealtimeSettings::default();
    realtime.openai.api_key = Some(SecretString::from("server-openai-key"));
    realtime.openai.realtime_base_url = openai_base_url;

    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        log_level: Level::INFO,
        providers_config_path: PathBuf::from("config/providers.json"),
        static_dir: None,
        upstream_connect_timeout: Duration::from_secs(2),
        realtime,
    }
}

pub fn test_state(config: Config) -> Arc<AppState> {
    let catalog = ProviderCatalog::from_json_str(CATALOG).unwrap();
    Arc::new(AppState::new(config, catalog, ToolDispatcher::default()))
}

/// Serves the app on an ephemeral port and returns its address.
pub async fn spawn_app(config: Config) -> SocketAddr {
    let app = create_router(test_state(config));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub async fn connect_client(app: SocketAddr, query: &str) -> ClientSocket {
    let url = format!("ws://{app}/ws?{query}");
    let (ws, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    ws
}

/// Next data or close frame, skipping pings and pongs.
pub async fn next_message<S>(ws: &mut S) -> Option<Message>
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    timeout(WAIT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(msg)) => return Some(msg),
                _ => return None,
            }
        }
    })
    .await
    .expect("timed out waiting for a WebSocket message")
}

pub async fn next_json<S>(ws: &mut S) -> Value
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    match next_message(ws).await {
        Some(Message::Text(text)) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("Expected a JSON text frame, got {other:?}"),
    }
}

/// Waits for the peer to end the connection, by close frame or EOF.
pub async fn expect_closed<S>(ws: &mut S)
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    loop {
        match next_message(ws).await {
            None | Some(Message::Close(_)) => return,
            Some(_) => continue,
        }
    }
}

/// Waits for a close frame and returns its code and reason.
pub async fn expect_close_frame<S>(ws: &mut S) -> (u16, String)
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    match next_message(ws).await {
        Some(Message::Close(Some(frame))) => {
            (u16::from(frame.code), frame.reason.as_str().to_string())
        }
        other => panic!("Expected a close frame, got {other:?}"),
    }
}
