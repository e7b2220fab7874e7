use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::{Connector, Transport, TransportEvent};
use crate::errors::ClientError;

/// WebSocket transport over `tokio-tungstenite`.
#[derive(Debug, Clone, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Transport, ClientError> {
        let (stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| ClientError::transport(format!("Failed to connect to {url}: {e}")))?;
        info!("WebSocket connected");

        let (mut ws_write, mut ws_read) = stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<TransportEvent>();

        // ── Writer: drain outbound frames until the client drops its sender ──
        tokio::spawn(async move {
            while let Some(text) = out_rx.recv().await {
                if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                    warn!("WebSocket send failed: {e}");
                    return;
                }
            }
            debug!("Outbound queue closed, sending close frame");
            let _ = ws_write.send(Message::Close(None)).await;
        });

        // ── Reader: forward frames until the socket or the client goes away ──
        tokio::spawn(async move {
            loop {
                let msg = tokio::select! {
                    msg = ws_read.next() => msg,
                    _ = in_tx.closed() => return,
                };
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if in_tx.send(TransportEvent::Text(text.to_string())).is_err() {
                            return;
                        }
                    }
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => {
                            let _ = in_tx.send(TransportEvent::Text(text));
                        }
                        Err(_) => warn!("Dropping non-UTF-8 binary frame ({} bytes)", bytes.len()),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        debug!("WebSocket closed by peer: {frame:?}");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        let _ = in_tx.send(TransportEvent::Error(e.to_string()));
                        break;
                    }
                    None => break,
                }
            }
            let _ = in_tx.send(TransportEvent::Closed);
        });

        Ok(Transport { outbound: out_tx, inbound: in_rx })
    }
}
