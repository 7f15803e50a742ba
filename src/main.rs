use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::lib::{
    api::types::StatusServer,
    config::Cli,
    dispatcher::types::Dispatcher,
    hub::{
        connector::GrpcConnector,
        handoff,
        types::{Registration, StreamClient},
    },
    metering::types::{HttpLedgerReporter, MeteringPublisher},
    orchestrator::types::Orchestrator,
    platform::kubernetes::KubePlatform,
};

mod lib {
    pub mod api;
    pub mod config;
    pub mod dispatcher;
    pub mod hub;
    pub mod metering;
    pub mod orchestrator;
    pub mod platform;
    pub mod proto;
    pub mod tasks;
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());
    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = cli.into_config()?;

    let platform = KubePlatform::connect(config.kubeconfig.as_deref(), &config.namespace)
        .await
        .context("connect to kubernetes")?;
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(platform),
        &config.namespace,
        config.ingress_host.clone(),
        config.defaults,
    ));

    let client = StreamClient::new(
        GrpcConnector::new(&config.hub)?,
        Registration::new(&config.dc_name, orchestrator.clone()),
        config.reconnect,
    );
    client
        .ensure_reachable()
        .await
        .with_context(|| format!("reach hub {}", config.hub))?;

    let publisher = MeteringPublisher::new(
        orchestrator.clone(),
        HttpLedgerReporter::new()?,
        &config.dc_name,
        config.ledger.clone(),
    );
    tokio::spawn(publisher.run());

    if let Some(address) = &config.status_listen {
        let server = StatusServer::new(orchestrator.clone(), client.state(), address);
        tokio::spawn(async move {
            if let Err(err) = server.start_server().await {
                error!("status server stopped: {}", err);
            }
        });
    }

    let (handoff_tx, handoff_rx) = handoff::channel();
    let dispatcher = Dispatcher::new(orchestrator, &config.dc_name, config.update);
    tokio::spawn(dispatcher.run(handoff_rx));

    info!(
        "agent {} serving namespace {} for hub {}",
        config.dc_name, config.namespace, config.hub
    );
    client.run(handoff_tx).await?;
    Ok(())
}
