//! HUD server: pushes every classified shot to browser clients (OBS browser
//! sources, a second screen) over a WebSocket.
//!
//! `GET /` serves the embedded HUD page, `GET /ws` upgrades to the push
//! stream. Each shot is one JSON text message in [`WireShot`] form.
//!
//! [`WireShot`]: crate::shot::WireShot

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context};
use futures_util::{SinkExt, StreamExt};
use include_dir::{include_dir, Dir};
use log::{debug, info, warn};
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, Take,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::derive_accept_key;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::shot::ShotResult;
use crate::sink::ShotSink;

static ASSETS: Dir = include_dir!("$CARGO_MANIFEST_DIR/assets");

const SHOT_BUFFER: usize = 64;
const MAX_HEADERS: usize = 64;
/// Cap on request line plus headers.
pub const MAX_HEAD_BYTES: u64 = 8 * 1024;
const HEAD_TIMEOUT: Duration = Duration::from_secs(5);

const HTML: &str = "text/html; charset=utf-8";
const TEXT: &str = "text/plain";

pub fn hud_page() -> &'static str {
    ASSETS
        .get_file("hud.html")
        .and_then(|f| f.contents_utf8())
        .unwrap_or("<!DOCTYPE html><html><body>HUD page missing</body></html>")
}

/// Fan-out point between the input thread and the async server.
///
/// `deliver` is synchronous and may be called from any thread.
#[derive(Debug, Clone)]
pub struct ShotHub {
    tx: broadcast::Sender<String>,
}

impl Default for ShotHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ShotHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(SHOT_BUFFER);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl ShotSink for ShotHub {
    fn deliver(&self, shot: &ShotResult) {
        let json = match serde_json::to_string(&shot.to_wire_form()) {
            Ok(json) => json,
            Err(e) => {
                warn!("could not encode shot: {e}");
                return;
            }
        };
        if self.tx.send(json).is_err() {
            debug!("no HUD clients connected");
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestHead {
    pub method: String,
    pub target: String,
    headers: Vec<(String, String)>,
}

impl RequestHead {
    /// Request path without the query string.
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or("")
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_websocket_upgrade(&self) -> bool {
        self.header("upgrade")
            .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
    }
}

/// Reads the request line and headers, giving up after [`MAX_HEAD_BYTES`].
///
/// Bytes past the blank line stay buffered in `reader`.
pub async fn read_request_head<R: AsyncBufRead + Unpin>(
    reader: &mut R,
) -> anyhow::Result<RequestHead> {
    let mut limited = AsyncReadExt::take(reader, MAX_HEAD_BYTES);
    let mut line = String::new();
    read_head_line(&mut limited, &mut line).await?;
    let mut parts = line.split_whitespace();
    let method = parts.next().context("empty request")?.to_string();
    let target = parts
        .next()
        .context("request line without target")?
        .to_string();

    let mut headers = Vec::new();
    loop {
        read_head_line(&mut limited, &mut line).await?;
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            break;
        }
        if headers.len() == MAX_HEADERS {
            bail!("too many request headers");
        }
        if let Some((name, value)) = trimmed.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    Ok(RequestHead {
        method,
        target,
        headers,
    })
}

/// [`read_request_head`] for clients that may stall mid-request.
pub async fn read_request_head_within<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    deadline: Duration,
) -> anyhow::Result<RequestHead> {
    timeout(deadline, read_request_head(reader))
        .await
        .context("timed out reading request head")?
}

async fn read_head_line<R: AsyncBufRead + Unpin>(
    reader: &mut Take<R>,
    line: &mut String,
) -> anyhow::Result<()> {
    line.clear();
    reader.read_line(line).await?;
    if line.ends_with('\n') {
        return Ok(());
    }
    if reader.limit() == 0 {
        bail!("request head larger than {MAX_HEAD_BYTES} bytes");
    }
    bail!("connection closed inside the request head");
}

async fn respond<S: AsyncWrite + Unpin>(
    stream: &mut S,
    status: &str,
    content_type: &str,
    body: &str,
) -> anyhow::Result<()> {
    let head = format!(
        "HTTP/1.1 {status}\r\n\
         Content-Type: {content_type}\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(body.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    hub: ShotHub,
) -> anyhow::Result<()> {
    // the websocket reads through the same buffer as the head
    let mut stream = BufReader::new(stream);
    let head = read_request_head_within(&mut stream, HEAD_TIMEOUT).await?;
    debug!("{peer} {} {}", head.method, head.target);

    match (head.method.as_str(), head.path()) {
        ("GET", "/ws") => {
            let Some(key) = head
                .header("sec-websocket-key")
                .filter(|_| head.is_websocket_upgrade())
            else {
                return respond(
                    &mut stream,
                    "400 Bad Request",
                    TEXT,
                    "expected a websocket upgrade",
                )
                .await;
            };
            // subscribe before the handshake completes so no shot after it is missed
            let rx = hub.subscribe();
            let reply = format!(
                "HTTP/1.1 101 Switching Protocols\r\n\
                 Upgrade: websocket\r\n\
                 Connection: Upgrade\r\n\
                 Sec-WebSocket-Accept: {}\r\n\r\n",
                derive_accept_key(key.as_bytes())
            );
            stream.write_all(reply.as_bytes()).await?;
            let ws = WebSocketStream::from_raw_socket(stream, Role::Server, None).await;
            info!("HUD client {peer} connected");
            forward_shots(ws, rx, peer).await;
            Ok(())
        }
        ("GET", "/") => respond(&mut stream, "200 OK", HTML, hud_page()).await,
        _ => respond(&mut stream, "404 Not Found", TEXT, "not found").await,
    }
}

async fn forward_shots(
    ws: WebSocketStream<BufReader<TcpStream>>,
    mut rx: broadcast::Receiver<String>,
    peer: SocketAddr,
) {
    let (mut outgoing, mut incoming) = ws.split();
    loop {
        tokio::select! {
            shot = rx.recv() => match shot {
                Ok(json) => {
                    if let Err(e) = outgoing.send(Message::Text(json)).await {
                        debug!("HUD client {peer} send failed: {e}");
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => warn!("HUD client {peer} skipped {n} shots"),
                Err(RecvError::Closed) => break,
            },
            msg = incoming.next() => match msg {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("HUD client {peer} read failed: {e}");
                    break;
                }
            },
        }
    }
    info!("HUD client {peer} disconnected");
}

pub struct HudServer {
    listener: TcpListener,
    hub: ShotHub,
}

impl HudServer {
    pub async fn bind(addr: SocketAddr) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding HUD server to {addr}"))?;
        Ok(Self {
            listener,
            hub: ShotHub::new(),
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn hub(&self) -> ShotHub {
        self.hub.clone()
    }

    /// Accept clients forever.
    pub async fn run(self) {
        if let Ok(addr) = self.listener.local_addr() {
            info!("HUD server listening on {addr}");
        }
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let hub = self.hub.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, peer, hub).await {
                            debug!("HUD connection {peer}: {e:#}");
                        }
                    });
                }
                Err(e) => warn!("accepting HUD connection failed: {e}"),
            }
        }
    }
}

/// Start the HUD server on its own thread and async runtime.
///
/// Returns once the listener is bound, with the hub to register as a sink.
pub fn spawn(addr: SocketAddr) -> anyhow::Result<(ShotHub, SocketAddr)> {
    let (ready_tx, ready_rx) = std::sync::mpsc::channel();
    std::thread::Builder::new()
        .name("hud-server".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    let e = anyhow::Error::new(e).context("starting async runtime");
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            runtime.block_on(async move {
                match HudServer::bind(addr).await {
                    Ok(server) => {
                        let ready = server.local_addr().map(|a| (server.hub(), a));
                        let _ = ready_tx.send(ready);
                        server.run().await;
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            });
        })
        .context("spawning HUD server thread")?;

    ready_rx
        .recv()
        .context("HUD server thread exited during startup")?
}
