use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::Endpoint;
use tracing::{debug, trace};

use super::types::{Connector, EventSink, HubConnection, HubError};
use crate::lib::proto::{DcStreamerClient, Event};

const OUTBOUND_BUFFER: usize = 16;

/// Dials the hub over plaintext HTTP/2.
pub struct GrpcConnector {
    endpoint: Endpoint,
}

impl GrpcConnector {
    pub fn new(hub: &str) -> Result<Self, HubError> {
        let uri = if hub.contains("://") {
            hub.to_string()
        } else {
            format!("http://{}", hub)
        };
        let endpoint = Endpoint::from_shared(uri).map_err(|err| HubError::Address {
            address: hub.to_string(),
            message: err.to_string(),
        })?;
        Ok(GrpcConnector { endpoint })
    }
}

#[async_trait]
impl Connector for GrpcConnector {
    /// Connects the transport and opens the stream. Response headers are
    /// awaited lazily on the first receive, so frames queued on the sink
    /// right after dialing go out before the hub answers.
    async fn dial(&self) -> Result<HubConnection, HubError> {
        let channel = self
            .endpoint
            .connect()
            .await
            .map_err(|err| HubError::Dial(format!("{}: {}", self.endpoint.uri(), err)))?;
        debug!("connected to hub {}", self.endpoint.uri());

        let mut client = DcStreamerClient::new(channel);
        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
        let call = async move { client.server_stream(ReceiverStream::new(rx)).await };

        let inbound = stream::once(call)
            .flat_map(|response| -> BoxStream<'static, Result<Event, tonic::Status>> {
                match response {
                    Ok(response) => response.into_inner().boxed(),
                    Err(status) => stream::iter(vec![Err(status)]).boxed(),
                }
            })
            .boxed();

        Ok(HubConnection {
            sink: EventSink::new(tx),
            inbound,
        })
    }
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<Event>) -> Self {
        EventSink { tx }
    }

    pub async fn send(&self, event: Event) -> Result<(), HubError> {
        let operation = event.operation();
        match self.tx.send(event).await {
            Ok(()) => {
                trace!("send {:?} success", operation);
                Ok(())
            }
            Err(_) => {
                debug!("send {:?} fail: stream closed", operation);
                Err(HubError::Closed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_address_gets_http_scheme() {
        let connector = GrpcConnector::new("hub.internal:9090").unwrap();
        assert_eq!(
            connector.endpoint.uri().to_string(),
            "http://hub.internal:9090/"
        );
    }

    #[test]
    fn explicit_scheme_is_kept() {
        let connector = GrpcConnector::new("https://hub.internal:443").unwrap();
        assert_eq!(connector.endpoint.uri().scheme_str(), Some("https"));
    }

    #[test]
    fn garbage_address_is_rejected() {
        assert!(matches!(
            GrpcConnector::new("not a uri"),
            Err(HubError::Address { .. })
        ));
    }

    #[tokio::test]
    async fn sink_reports_closed_stream() {
        let (tx, rx) = mpsc::channel(1);
        let sink = EventSink::new(tx);
        drop(rx);
        assert!(matches!(
            sink.send(Event::heartbeat("dc", "")).await,
            Err(HubError::Closed)
        ));
    }
}
