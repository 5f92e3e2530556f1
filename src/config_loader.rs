use std::{
    io,
    ops::RangeInclusive,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "mesh_masher.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("worker_threads must be within {min}..={max}, got {value}")]
    WorkerThreads { value: usize, min: usize, max: usize },
    #[error("phase_timeout_secs must be at least 1 when set")]
    ZeroTimeout,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub worker_threads: usize,
    /// Bake every node transform into the vertices before extraction.
    pub pre_transform_vertices: bool,
    /// Deduplicate and reorder geometry, otherwise every face corner becomes its own vertex.
    pub use_mesh_optimizer: bool,
    /// One model file per line, relative to `input_dir`.
    pub manifest: PathBuf,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Abort instead of hanging when a phase does not finish in time.
    pub phase_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            pre_transform_vertices: true,
            use_mesh_optimizer: true,
            manifest: "contents.txt".into(),
            input_dir: "input".into(),
            output_dir: "output".into(),
            phase_timeout_secs: None,
        }
    }
}

impl Config {
    pub const WORKER_THREADS: RangeInclusive<usize> = 1..=6;

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !Self::WORKER_THREADS.contains(&self.worker_threads) {
            return Err(ConfigError::WorkerThreads {
                value: self.worker_threads,
                min: *Self::WORKER_THREADS.start(),
                max: *Self::WORKER_THREADS.end(),
            });
        }
        if self.phase_timeout_secs == Some(0) {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn phase_timeout(&self) -> Option<Duration> {
        self.phase_timeout_secs.map(Duration::from_secs)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let config: Config = serde_json::from_str(value)?;
        config.validate()?;
        Ok(config)
    }
}

pub struct ConfigFileLoader {
    pub path: PathBuf,
    config: Option<Config>,
}

impl ConfigFileLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().into(),
            config: None,
        }
    }

    /// Reads and validates the config file. A missing file yields the defaults,
    /// which are then written out so they can be edited.
    pub fn load_config(&mut self) -> Result<&Config, ConfigError> {
        let config = match std::fs::read_to_string(&self.path) {
            Ok(content) => content.parse::<Config>()?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::info!(
                    "No config file at {:?}, using and saving the defaults",
                    self.path
                );
                self.config = Some(Config::default());
                if let Err(err) = self.save_config() {
                    log::warn!("Failed to save default config to {:?}: {}", self.path, err);
                }
                Config::default()
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        Ok(self.config.insert(config))
    }

    pub fn save_config(&self) -> anyhow::Result<()> {
        if let Some(config) = &self.config {
            let content = serde_json::to_string_pretty(config)?;
            std::fs::write(&self.path, content)?;
        }
        Ok(())
    }
}
