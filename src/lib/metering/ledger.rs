use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use super::types::{HttpLedgerReporter, LedgerError, LedgerReporter, RpcResponse};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

impl HttpLedgerReporter {
    pub fn new() -> Result<Self, LedgerError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(HttpLedgerReporter { client })
    }
}

/// Tendermint-style `broadcast_tx_sync` over the node's HTTP RPC.
#[async_trait]
impl LedgerReporter for HttpLedgerReporter {
    async fn broadcast(
        &self,
        endpoint: &str,
        ws_endpoint: &str,
        key: &str,
        payload: &[u8],
    ) -> Result<(), LedgerError> {
        // sync broadcast needs no event subscription on the websocket
        trace!("broadcast {} via {} (ws {})", key, endpoint, ws_endpoint);

        let url = format!("{}/broadcast_tx_sync", endpoint.trim_end_matches('/'));
        // the node's URI handler parses tx as a JSON string literal
        let tx =
            serde_json::to_string(&format!("{}={}", key, String::from_utf8_lossy(payload)))?;
        let response = self.client.get(&url).query(&[("tx", tx)]).send().await?;
        let status = response.status();
        let body = response.text().await?;

        let rpc: RpcResponse = serde_json::from_str(&body)
            .map_err(|_| LedgerError::Rpc(format!("{}: {}", status, body.trim())))?;
        if let Some(error) = rpc.error {
            let message = match error.data {
                Some(data) if !data.is_empty() => format!("{}: {}", error.message, data),
                _ => error.message,
            };
            return Err(LedgerError::Rpc(message));
        }

        match rpc.result {
            Some(result) if result.code != 0 => Err(LedgerError::Rejected {
                code: result.code,
                log: result.log,
            }),
            Some(_) => Ok(()),
            None => Err(LedgerError::Rpc(format!("{}: empty response", status))),
        }
    }
}
