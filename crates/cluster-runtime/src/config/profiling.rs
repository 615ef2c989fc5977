use super::logger::{LogLevel, LoggerConfig};

/// Configuration for the per-core stage timers.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ProfilingConfig {
    /// Logger configuration for profiling logs, using profiling-specific log levels.
    #[serde(default)]
    pub logger: LoggerConfig<ProfilingLogLevel>,
}

/// Log levels for profiling.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ProfilingLogLevel {
    /// Profiling logging is disabled and stage timers record nothing.
    #[default]
    #[serde(rename = "disabled")]
    Disabled,

    /// One line per core with the total time spent in each stage.
    #[serde(rename = "basic")]
    Basic,

    /// Every recorded span is logged.
    #[serde(rename = "full")]
    Full,
}

impl LogLevel for ProfilingLogLevel {}
