// WebSocket server pushing live league events to connected clients.

use std::sync::Arc;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

use crate::live::{BroadcastPublisher, LiveEvent};

/// Serialize a live event into the WebSocket text frame clients receive.
/// Frames carry an RFC 3339 timestamp alongside the event payload so clients
/// can order updates without trusting their own clocks.
pub fn event_to_message(event: &LiveEvent) -> Result<Message, serde_json::Error> {
    let mut value = serde_json::to_value(event)?;
    if let serde_json::Value::Object(map) = &mut value {
        map.insert(
            "timestamp".to_string(),
            serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
        );
    }
    Ok(Message::Text(serde_json::to_string(&value)?.into()))
}

/// Run the live-update server on the given port, fanning out every event
/// published through `publisher`.
///
/// Binds a TCP listener on `127.0.0.1:{port}`. Each accepted connection gets
/// its own broadcast subscription and forwarding task; clients never send
/// anything meaningful, so the read half is only drained for close frames.
/// The server runs forever (until the task is cancelled or the process
/// exits).
pub async fn run(port: u16, publisher: Arc<BroadcastPublisher>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    let local_addr = listener.local_addr()?;
    info!("live update server listening on {local_addr}");

    loop {
        let (stream, addr) = listener.accept().await?;
        let addr_str = addr.to_string();
        info!("accepted TCP connection from {addr_str}");

        let rx = publisher.subscribe();
        tokio::spawn(async move {
            let ws_stream = match tokio_tungstenite::accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    warn!("WebSocket handshake failed for {addr_str}: {e}");
                    return;
                }
            };

            let (write, mut read) = ws_stream.split();
            tokio::spawn(async move {
                // Drain the read half so close frames are processed.
                while let Some(msg) = read.next().await {
                    if matches!(msg, Ok(Message::Close(_)) | Err(_)) {
                        break;
                    }
                }
            });
            forward_events(write, rx, &addr_str).await;
        });
    }
}

/// Forward broadcast events into a WebSocket sink until the client goes away
/// or the publisher is dropped. A lagging client skips the events it missed
/// and keeps going; clients refetch state anyway.
///
/// Generic over the sink type so it can be tested without opening TCP ports.
pub async fn forward_events<S>(mut sink: S, mut rx: broadcast::Receiver<LiveEvent>, addr: &str)
where
    S: Sink<Message> + Unpin,
{
    loop {
        match rx.recv().await {
            Ok(event) => {
                let msg = match event_to_message(&event) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!("failed to serialize live event: {e}");
                        continue;
                    }
                };
                if sink.send(msg).await.is_err() {
                    info!("client {addr} disconnected");
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("client {addr} lagged, skipped {skipped} events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
