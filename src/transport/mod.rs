//! Transport seam for the streaming client.
//!
//! A [`Connector`] opens one full-duplex connection and hands back a
//! [`Transport`]: an outbound queue of text frames and an inbound queue of
//! [`TransportEvent`]s. Dropping the outbound sender asks the connection to close.

pub mod ws;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::ClientError;

pub use ws::WsConnector;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Text(String),
    Error(String),
    Closed,
}

/// An open connection, already past its handshake.
pub struct Transport {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Resolves once the connection is open.
    async fn connect(&self, url: &str) -> Result<Transport, ClientError>;
}
