use std::sync::Arc;
use std::time::Duration;

use sysinfo::System;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info};

use super::types::{
    HostStats, LedgerEndpoints, LedgerRecord, LedgerReporter, MeteringError, MeteringPublisher,
};
use crate::lib::orchestrator::types::Orchestrator;

pub const METERING_INTERVAL: Duration = Duration::from_secs(30);

/// Stable ledger key for one data center namespace.
pub fn ledger_key(dc_name: &str, namespace: &str) -> String {
    format!("metering:{}:{}", dc_name, namespace)
}

impl<R: LedgerReporter> MeteringPublisher<R> {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        reporter: R,
        dc_name: &str,
        ledger: LedgerEndpoints,
    ) -> Self {
        MeteringPublisher {
            orchestrator,
            reporter,
            dc_name: dc_name.to_string(),
            ledger,
            interval: METERING_INTERVAL,
            system: System::new(),
            announced: false,
        }
    }

    pub fn key(&self) -> String {
        ledger_key(&self.dc_name, self.orchestrator.namespace())
    }

    /// Builds the current record and submits it once.
    pub async fn publish_once(&mut self) -> Result<(), MeteringError> {
        let snapshot = self.orchestrator.metering().await?;
        let record = LedgerRecord {
            data_center: self.dc_name.clone(),
            snapshot,
            host: HostStats::collect(&mut self.system),
        };
        let payload = serde_json::to_vec(&record)?;

        self.reporter
            .broadcast(&self.ledger.http, &self.ledger.ws, &self.key(), &payload)
            .await?;
        Ok(())
    }

    async fn tick(&mut self) {
        match self.publish_once().await {
            Ok(()) => {
                if !self.announced {
                    self.announced = true;
                    info!("metering broadcast started");
                }
            }
            Err(MeteringError::Ledger(err)) if err.is_duplicate() => {
                debug!("metering already submitted: {}", err);
            }
            Err(err) => error!("metering broadcast fail: {}", err),
        }
    }

    /// Publishes on a fixed cadence forever; the first tick is one interval
    /// after start and outcomes never shift the schedule.
    pub async fn run(mut self) {
        info!("metering publisher started, every {:?}", self.interval);
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }
}
