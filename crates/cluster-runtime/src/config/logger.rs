use super::GlobalConfig;
use super::profiling::ProfilingLogLevel;
use core::fmt::Display;
use hashbrown::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where the messages of one category go, and how many of them.
///
/// Several outputs can be enabled together.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub struct LoggerConfig<L: LogLevel> {
    /// Log file, created if missing.
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Keep the previous content of `file`. On by default.
    #[serde(default = "append_default")]
    pub append: bool,

    /// Print to standard output.
    #[serde(default)]
    pub stdout: bool,

    /// Print to standard error.
    #[serde(default)]
    pub stderr: bool,

    /// Also emit through the `log` facade at this level.
    #[serde(default)]
    pub log: Option<LogCrateLevel>,

    /// Verbosity; nothing is opened when disabled.
    #[serde(default)]
    pub level: L,
}

impl<L: LogLevel> Default for LoggerConfig<L> {
    fn default() -> Self {
        Self {
            file: None,
            append: append_default(),
            stdout: false,
            stderr: false,
            log: None,
            level: L::default(),
        }
    }
}

impl<L: LogLevel> LoggerConfig<L> {
    /// Identifiers of every output this configuration enables.
    fn outputs(&self) -> Vec<OutputId> {
        let mut outputs = Vec::new();
        if let Some(path) = &self.file {
            outputs.push(OutputId::File(path.clone()));
        }
        if self.stdout {
            outputs.push(OutputId::Stdout);
        }
        if self.stderr {
            outputs.push(OutputId::Stderr);
        }
        if let Some(level) = self.log {
            outputs.push(OutputId::LogCrate(level));
        }
        outputs
    }
}

/// Level used when forwarding to the `log` facade.
#[derive(
    Clone, Copy, Debug, Default, serde::Serialize, serde::Deserialize, Hash, PartialEq, Eq,
)]
#[serde(rename_all = "snake_case")]
pub enum LogCrateLevel {
    /// `log::info!`.
    #[default]
    Info,
    /// `log::debug!`.
    Debug,
    /// `log::trace!`.
    Trace,
}

fn append_default() -> bool {
    true
}

/// Verbosity of one logging category.
pub trait LogLevel:
    serde::de::DeserializeOwned + serde::Serialize + Clone + Copy + core::fmt::Debug + Default
{
}

/// Verbosity of a category that is either silent or logs everything.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryLogLevel {
    /// Nothing is logged.
    #[default]
    Disabled,
    /// Every message is logged.
    Full,
}

impl LogLevel for BinaryLogLevel {}

#[derive(Clone, Copy, Debug)]
enum Category {
    Profiling = 0,
    Transfer = 1,
}

/// Sends profiling and transfer messages to the outputs configured in [GlobalConfig].
///
/// An output enabled by both categories, e.g. the same file, is opened once and shared.
#[derive(Debug)]
pub struct Logger {
    outputs: Vec<Output>,
    /// Indices into `outputs`, per [Category].
    routes: [Vec<usize>; 2],
    /// Configuration the outputs were opened from.
    pub config: Arc<GlobalConfig>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    /// Opens the outputs of every enabled category of the global configuration.
    pub fn new() -> Self {
        let config = GlobalConfig::get();
        let mut logger = Self {
            outputs: Vec::new(),
            routes: [Vec::new(), Vec::new()],
            config: config.clone(),
        };
        let mut opened = HashMap::<OutputId, usize>::new();

        if config.profiling.logger.level != ProfilingLogLevel::Disabled {
            logger.route(Category::Profiling, &config.profiling.logger, &mut opened);
        }
        if config.transfer.logger.level != BinaryLogLevel::Disabled {
            logger.route(Category::Transfer, &config.transfer.logger, &mut opened);
        }

        logger
    }

    fn route<L: LogLevel>(
        &mut self,
        category: Category,
        config: &LoggerConfig<L>,
        opened: &mut HashMap<OutputId, usize>,
    ) {
        for id in config.outputs() {
            let index = match opened.get(&id) {
                Some(index) => *index,
                None => {
                    self.outputs.push(Output::open(&id, config.append));
                    opened.insert(id, self.outputs.len() - 1);
                    self.outputs.len() - 1
                }
            };
            self.routes[category as usize].push(index);
        }
    }

    fn log<S: Display>(&mut self, category: Category, msg: &S) {
        for index in &self.routes[category as usize] {
            self.outputs[*index].write(msg);
        }
    }

    /// Logs a profiling message.
    pub fn log_profiling<S: Display>(&mut self, msg: &S) {
        self.log(Category::Profiling, msg);
    }

    /// Logs a transfer message.
    pub fn log_transfer<S: Display>(&mut self, msg: &S) {
        self.log(Category::Transfer, msg);
    }

    /// Verbosity of the stage timers.
    pub fn log_level_profiling(&self) -> ProfilingLogLevel {
        self.config.profiling.logger.level
    }

    /// Whether transfers are logged.
    pub fn log_level_transfer(&self) -> BinaryLogLevel {
        self.config.transfer.logger.level
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
enum OutputId {
    File(PathBuf),
    Stdout,
    Stderr,
    LogCrate(LogCrateLevel),
}

#[derive(Debug)]
enum Output {
    /// `None` once the file failed.
    File(Option<BufWriter<File>>),
    Stdout,
    Stderr,
    LogCrate(LogCrateLevel),
}

impl Output {
    fn open(id: &OutputId, append: bool) -> Self {
        match id {
            OutputId::File(path) => Output::File(open_file(path, append)),
            OutputId::Stdout => Output::Stdout,
            OutputId::Stderr => Output::Stderr,
            OutputId::LogCrate(level) => Output::LogCrate(*level),
        }
    }

    fn write<S: Display>(&mut self, msg: &S) {
        match self {
            Output::File(file) => {
                let Some(writer) = file else {
                    return;
                };
                // Flushed per message so the file is complete if a core faults.
                if let Err(err) = writeln!(writer, "{msg}").and_then(|_| writer.flush()) {
                    log::warn!("Disabling log file after a write failure: {err}");
                    *file = None;
                }
            }
            Output::Stdout => println!("{msg}"),
            Output::Stderr => eprintln!("{msg}"),
            Output::LogCrate(LogCrateLevel::Info) => log::info!("{msg}"),
            Output::LogCrate(LogCrateLevel::Debug) => log::debug!("{msg}"),
            Output::LogCrate(LogCrateLevel::Trace) => log::trace!("{msg}"),
        }
    }
}

fn open_file(path: &Path, append: bool) -> Option<BufWriter<File>> {
    let file = OpenOptions::new()
        .write(true)
        .append(append)
        .truncate(!append)
        .create(true)
        .open(path);

    match file {
        Ok(file) => Some(BufWriter::new(file)),
        Err(err) => {
            log::warn!("Can't open log file {}: {err}", path.display());
            None
        }
    }
}
