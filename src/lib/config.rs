use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use crate::lib::hub::types::ReconnectPolicy;
use crate::lib::metering::types::LedgerEndpoints;
use crate::lib::platform::resources::parse_quantity;
use crate::lib::tasks::types::{ResourceUnit, TaskDefaults, UpdateParams};

#[derive(Parser, Debug)]
#[command(name = "dc-agent")]
#[command(about = "Applies hub task commands to a Kubernetes namespace", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Hub address (host:port)
    #[arg(long, env = "DC_AGENT_HUB")]
    pub hub: String,

    /// Data center name used to register with the hub
    #[arg(long, env = "DC_AGENT_DC_NAME")]
    pub dc_name: String,

    /// Namespace all task resources live in
    #[arg(long, env = "DC_AGENT_NAMESPACE", default_value = "default")]
    pub namespace: String,

    /// Kubeconfig path; in-cluster or default config when unset
    #[arg(long, env = "DC_AGENT_KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Base host for task ingresses; no ingress is created when unset
    #[arg(long, env = "DC_AGENT_INGRESS_HOST")]
    pub ingress_host: Option<String>,

    /// Ledger node RPC endpoint
    #[arg(long, env = "DC_AGENT_LEDGER", default_value = "http://127.0.0.1:26657")]
    pub ledger: String,

    /// Ledger node websocket endpoint
    #[arg(long, env = "DC_AGENT_LEDGER_WS", default_value = "/websocket")]
    pub ledger_ws: String,

    /// Listen address of the status API; disabled when unset
    #[arg(long, env = "DC_AGENT_STATUS_LISTEN")]
    pub status_listen: Option<String>,

    /// CPU limit per task container, in millicores
    #[arg(long, env = "DC_AGENT_CPU_MILLI", default_value_t = 500)]
    pub cpu_milli: u32,

    /// Memory limit per task container
    #[arg(long, env = "DC_AGENT_MEMORY", default_value = "512Mi")]
    pub memory: String,

    /// Ephemeral storage limit per task container
    #[arg(long, env = "DC_AGENT_DISK", default_value = "1Gi")]
    pub disk: String,

    /// Container port exposed by new tasks
    #[arg(long, env = "DC_AGENT_PORT", default_value_t = 80)]
    pub port: u16,

    /// Replicas of new tasks
    #[arg(long, env = "DC_AGENT_REPLICAS", default_value_t = 1)]
    pub replicas: i32,

    /// Replicas applied by task updates
    #[arg(long, env = "DC_AGENT_UPDATE_REPLICAS", default_value_t = 2)]
    pub update_replicas: i32,

    /// Container port applied by task updates
    #[arg(long, env = "DC_AGENT_UPDATE_PORT", default_value_t = 80)]
    pub update_port: u16,

    /// Service port applied by task updates
    #[arg(long, env = "DC_AGENT_UPDATE_EXTERNAL_PORT", default_value_t = 80)]
    pub update_external_port: u16,

    /// Log level
    #[arg(long, env = "DC_AGENT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "DC_AGENT_LOG_JSON")]
    pub json: bool,
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub hub: String,
    pub dc_name: String,
    pub namespace: String,
    pub kubeconfig: Option<PathBuf>,
    pub ingress_host: Option<String>,
    pub ledger: LedgerEndpoints,
    pub status_listen: Option<String>,
    pub defaults: TaskDefaults,
    pub update: UpdateParams,
    pub reconnect: ReconnectPolicy,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{flag} must not be empty")]
    Empty { flag: &'static str },
    #[error("invalid {flag} quantity {value:?}")]
    Quantity { flag: &'static str, value: String },
    #[error("{flag} must be positive")]
    NotPositive { flag: &'static str },
}

impl Cli {
    pub fn into_config(self) -> Result<AgentConfig, ConfigError> {
        for (flag, value) in [
            ("--hub", &self.hub),
            ("--dc-name", &self.dc_name),
            ("--namespace", &self.namespace),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Empty { flag });
            }
        }
        if self.port == 0 {
            return Err(ConfigError::NotPositive { flag: "--port" });
        }
        if self.update_port == 0 {
            return Err(ConfigError::NotPositive {
                flag: "--update-port",
            });
        }
        if self.replicas < 1 {
            return Err(ConfigError::NotPositive { flag: "--replicas" });
        }
        if self.update_replicas < 1 {
            return Err(ConfigError::NotPositive {
                flag: "--update-replicas",
            });
        }

        let unit = ResourceUnit {
            cpu_milli: self.cpu_milli,
            memory_bytes: bytes("--memory", &self.memory)?,
            disk_bytes: bytes("--disk", &self.disk)?,
        };

        Ok(AgentConfig {
            hub: self.hub,
            dc_name: self.dc_name,
            namespace: self.namespace,
            kubeconfig: self.kubeconfig,
            ingress_host: self.ingress_host.filter(|host| !host.trim().is_empty()),
            ledger: LedgerEndpoints {
                http: self.ledger,
                ws: self.ledger_ws,
            },
            status_listen: self.status_listen,
            defaults: TaskDefaults {
                unit,
                port: self.port,
                replicas: self.replicas,
            },
            update: UpdateParams {
                replicas: self.update_replicas,
                port: self.update_port,
                external_port: self.update_external_port,
            },
            reconnect: ReconnectPolicy::default(),
        })
    }
}

fn bytes(flag: &'static str, value: &str) -> Result<u64, ConfigError> {
    match parse_quantity(value) {
        Some(quantity) if quantity >= 1.0 => Ok(quantity.round() as u64),
        _ => Err(ConfigError::Quantity {
            flag,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["dc-agent", "--hub", "hub:9090", "--dc-name", "dc-1"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_match_built_in_task_defaults() {
        let config = parse(&[]).into_config().unwrap();

        assert_eq!(config.namespace, "default");
        assert_eq!(config.defaults, TaskDefaults::default());
        assert_eq!(config.update, UpdateParams::default());
        assert_eq!(config.reconnect, ReconnectPolicy::default());
        assert_eq!(config.ingress_host, None);
        assert_eq!(config.status_listen, None);
    }

    #[test]
    fn quantities_accept_kubernetes_notation() {
        let config = parse(&["--memory", "1Gi", "--disk", "10G"])
            .into_config()
            .unwrap();
        assert_eq!(config.defaults.unit.memory_bytes, 1024 * 1024 * 1024);
        assert_eq!(config.defaults.unit.disk_bytes, 10_000_000_000);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert_eq!(
            parse(&["--memory", "lots"]).into_config().unwrap_err(),
            ConfigError::Quantity {
                flag: "--memory",
                value: "lots".to_string()
            }
        );
        assert_eq!(
            parse(&["--update-replicas", "0"]).into_config().unwrap_err(),
            ConfigError::NotPositive {
                flag: "--update-replicas"
            }
        );
        assert_eq!(
            parse(&["--namespace", " "]).into_config().unwrap_err(),
            ConfigError::Empty {
                flag: "--namespace"
            }
        );
    }

    #[test]
    fn blank_ingress_host_disables_ingress() {
        let config = parse(&["--ingress-host", ""]).into_config().unwrap();
        assert_eq!(config.ingress_host, None);
    }

    #[test]
    fn hub_is_required() {
        assert!(Cli::try_parse_from(["dc-agent", "--dc-name", "dc-1"]).is_err());
    }
}
