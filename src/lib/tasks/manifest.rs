use super::types::{
    EnvEntry, ExposedPort, ManifestError, ManifestService, ResourceUnit, TaskDefaults,
    UpdateParams,
};

impl ExposedPort {
    pub fn new(port: u16) -> Self {
        ExposedPort {
            port,
            external_port: 0,
        }
    }

    pub fn effective_external_port(&self) -> u16 {
        if self.external_port == 0 {
            self.port
        } else {
            self.external_port
        }
    }
}

impl Default for TaskDefaults {
    fn default() -> Self {
        TaskDefaults {
            unit: ResourceUnit {
                cpu_milli: 500,
                memory_bytes: 512 * 1024 * 1024,
                disk_bytes: 1024 * 1024 * 1024,
            },
            port: 80,
            replicas: 1,
        }
    }
}

impl Default for UpdateParams {
    fn default() -> Self {
        UpdateParams {
            replicas: 2,
            port: 80,
            external_port: 80,
        }
    }
}

impl TaskDefaults {
    pub fn manifest(&self, name: &str, image: &str) -> ManifestService {
        ManifestService {
            name: name.to_string(),
            image: image.to_string(),
            args: Vec::new(),
            env: Vec::new(),
            unit: self.unit,
            expose: vec![ExposedPort::new(self.port)],
        }
    }
}

impl ManifestService {
    /// Parsed environment, in declaration order.
    pub fn env_entries(&self) -> Result<Vec<EnvEntry>, ManifestError> {
        self.env.iter().map(|entry| parse_env(entry)).collect()
    }

    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.image.trim().is_empty() {
            return Err(ManifestError::NoImage(self.name.clone()));
        }
        if self.expose.iter().any(|expose| expose.port == 0) {
            return Err(ManifestError::InvalidPort(self.name.clone()));
        }
        self.env_entries().map(|_| ())
    }
}

/// Parses `KEY` or `KEY=VALUE`. Only the first `=` separates, so `A=b=c`
/// yields `A` with value `b=c`.
pub fn parse_env(entry: &str) -> Result<EnvEntry, ManifestError> {
    let (name, value) = entry.split_once('=').unwrap_or((entry, ""));
    if name.is_empty() {
        return Err(ManifestError::EmptyEnvName(entry.to_string()));
    }

    Ok(EnvEntry {
        name: name.to_string(),
        value: value.to_string(),
    })
}

/// Platform name of the `index`-th image of a task. The first image keeps the
/// task name so single-container tasks map one-to-one.
pub fn resource_name(task: &str, index: usize) -> String {
    if index == 0 {
        task.to_string()
    } else {
        format!("{}-{}", task, index)
    }
}

/// Splits a comma-joined image list, dropping blank entries.
pub fn split_images(images: &str) -> Vec<String> {
    images
        .split(',')
        .map(str::trim)
        .filter(|image| !image.is_empty())
        .map(str::to_string)
        .collect()
}
