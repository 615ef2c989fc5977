use super::{
    Topology,
    logger::BinaryLogLevel,
    profiling::{ProfilingConfig, ProfilingLogLevel},
    transfer::TransferConfig,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Global configuration, loaded on first use.
static CLUSTER_GLOBAL_CONFIG: spin::Mutex<Option<Arc<GlobalConfig>>> = spin::Mutex::new(None);

/// Name of the configuration file searched in the current directory and its parents.
pub const CONFIG_FILE_NAME: &str = "cluster.toml";

const DEFAULT_LOG_FILE: &str = "/tmp/cluster.log";

/// The global configuration: default topology, profiling and transfer logging.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct GlobalConfig {
    /// Topology used by [System::from_config](crate::System::from_config).
    #[serde(default)]
    pub topology: Topology,

    /// Configuration for the per-core stage timers.
    #[serde(default)]
    pub profiling: ProfilingConfig,

    /// Configuration for the transfer engines.
    #[serde(default)]
    pub transfer: TransferConfig,
}

impl GlobalConfig {
    /// Returns the global configuration.
    ///
    /// The first call loads `cluster.toml` from the current directory or the nearest parent
    /// that has one, falling back to the defaults, then applies
    /// [GlobalConfig::override_from_env]. Later calls return the same value.
    pub fn get() -> Arc<Self> {
        CLUSTER_GLOBAL_CONFIG
            .lock()
            .get_or_insert_with(|| Arc::new(Self::from_current_dir().override_from_env()))
            .clone()
    }

    /// Writes the current configuration to `path` as TOML.
    pub fn save_default<P: AsRef<Path>>(path: P) -> io::Result<()> {
        let content = toml::to_string_pretty(Self::get().as_ref())
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        std::fs::write(path, content)
    }

    /// Installs `config` as the global configuration.
    ///
    /// # Panics
    /// If a configuration was already installed or loaded by [GlobalConfig::get].
    pub fn set(config: Self) {
        let mut slot = CLUSTER_GLOBAL_CONFIG.lock();
        assert!(
            slot.is_none(),
            "The global configuration is already initialized"
        );
        *slot = Some(Arc::new(config));
    }

    /// Applies the logging environment variables.
    ///
    /// - `CLUSTER_LOG` selects the sink of both categories: `stdout`, `stderr`, a file path,
    ///   `1`/`true` for `/tmp/cluster.log`, or `0`/`false` to silence everything. Any value other
    ///   than the last two turns the stage timers on.
    /// - `CLUSTER_LOG_LEVEL=full` also logs every transfer; `basic` only the stage timers.
    pub fn override_from_env(mut self) -> Self {
        if let Ok(target) = std::env::var("CLUSTER_LOG") {
            self.redirect_logs(&target);
        }
        if let Ok(level) = std::env::var("CLUSTER_LOG_LEVEL") {
            self.raise_log_level(&level);
        }
        self
    }

    fn redirect_logs(&mut self, target: &str) {
        let profiling = &mut self.profiling.logger;
        let transfer = &mut self.transfer.logger;

        match target {
            "0" | "false" => {
                profiling.level = ProfilingLogLevel::Disabled;
                transfer.level = BinaryLogLevel::Disabled;
                return;
            }
            "stdout" => {
                profiling.stdout = true;
                transfer.stdout = true;
            }
            "stderr" => {
                profiling.stderr = true;
                transfer.stderr = true;
            }
            path => {
                let path = match path {
                    "1" | "true" => PathBuf::from(DEFAULT_LOG_FILE),
                    path => PathBuf::from(path),
                };
                transfer.file = Some(path.clone());
                profiling.file = Some(path);
            }
        }

        profiling.level = ProfilingLogLevel::Basic;
    }

    fn raise_log_level(&mut self, level: &str) {
        match level {
            "basic" => self.profiling.logger.level = ProfilingLogLevel::Basic,
            "full" => {
                self.profiling.logger.level = ProfilingLogLevel::Full;
                self.transfer.logger.level = BinaryLogLevel::Full;
            }
            other => log::warn!("Ignoring unknown CLUSTER_LOG_LEVEL {other:?}"),
        }
    }

    // Nearest `cluster.toml` walking up from the current directory.
    fn from_current_dir() -> Self {
        let Ok(cwd) = std::env::current_dir() else {
            return Self::default();
        };

        cwd.ancestors()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .filter(|path| path.is_file())
            .find_map(|path| match Self::from_file_path(&path) {
                Ok(config) => Some(config),
                Err(err) => {
                    log::warn!("Skipping {}: {err}", path.display());
                    None
                }
            })
            .unwrap_or_default()
    }

    fn from_file_path<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }
}
