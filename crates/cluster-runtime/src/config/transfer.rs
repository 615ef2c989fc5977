use super::logger::{BinaryLogLevel, LoggerConfig};

/// Configuration for the transfer engines.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TransferConfig {
    /// Logger configuration for transfer logs. At `full`, every request executed by a transfer
    /// engine is logged.
    #[serde(default)]
    pub logger: LoggerConfig<BinaryLogLevel>,
}
