use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

use crate::lib::orchestrator::types::Orchestrator;
use crate::lib::proto::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    Disconnected,
    Connecting,
    Streaming,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            StreamState::Disconnected => "disconnected",
            StreamState::Connecting => "connecting",
            StreamState::Streaming => "streaming",
        };
        f.write_str(state)
    }
}

/// Send half of the current hub connection. Clones share the same stream.
#[derive(Debug, Clone)]
pub struct EventSink {
    pub(super) tx: mpsc::Sender<Event>,
}

/// One open bidirectional stream.
pub struct HubConnection {
    pub sink: EventSink,
    pub inbound: BoxStream<'static, Result<Event, tonic::Status>>,
}

/// A received event together with the connection it arrived on; feedback
/// goes back through `sink`.
#[derive(Debug)]
pub struct Inbound {
    pub event: Event,
    pub sink: EventSink,
}

#[async_trait]
pub trait Connector: Send + Sync {
    async fn dial(&self) -> Result<HubConnection, HubError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Bound on establishing the transport; does not apply once streaming.
    pub dial_timeout: Duration,
    pub retry_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy {
            dial_timeout: Duration::from_secs(5),
            retry_delay: Duration::from_secs(5),
        }
    }
}

/// Builds the heartbeat that opens every connection.
#[derive(Clone)]
pub struct Registration {
    pub(super) dc_name: String,
    pub(super) orchestrator: Arc<Orchestrator>,
}

pub struct StreamClient<C> {
    pub(super) connector: C,
    pub(super) registration: Registration,
    pub(super) policy: ReconnectPolicy,
    pub(super) state: watch::Sender<StreamState>,
}

#[derive(Debug, Error)]
pub enum HubError {
    #[error("invalid hub address {address}: {message}")]
    Address { address: String, message: String },
    #[error("dial hub: {0}")]
    Dial(String),
    #[error("dial hub: timed out after {0:?}")]
    Timeout(Duration),
    #[error("hub stream closed")]
    Closed,
    #[error("dispatcher stopped")]
    DispatcherGone,
}
