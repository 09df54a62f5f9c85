//! Data logger configuration and log writers.
//!
//! [`LoggerConfig`] is what a device's data logger is enabled with. The
//! writers turn replayed records back into log files, which is how recorded
//! logs are converted between formats.

use crate::frame::Frame;
use crate::mapping::{RecordTable, Registry, codec};
use crate::{DataId, Error, Result};
use log::debug;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, SystemTime};

/// Directory logs are written to and replayed from by default.
pub const DEFAULT_LOGS_DIRECTORY: &str = "IS_logs";

/// Name of the file written by the raw log writer.
pub const RAW_LOG_FILE: &str = "LOG_0001.dat";

/// Log file format
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LogType {
    /// Raw frames as received
    #[default]
    Dat,
    /// Summarized frames
    Sdat,
    /// Map track
    Kml,
    /// Comma separated values, one file per record type
    Csv,
}

impl LogType {
    /// Gets the short tag of the log type.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Dat => "dat",
            Self::Sdat => "sdat",
            Self::Kml => "kml",
            Self::Csv => "csv",
        }
    }
}

impl FromStr for LogType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dat" | "raw" => Ok(Self::Dat),
            "sdat" | "summarized" => Ok(Self::Sdat),
            "kml" | "map" => Ok(Self::Kml),
            "csv" => Ok(Self::Csv),
            other => Err(format!(
                "unknown log type `{}` (expected dat, sdat, kml or csv)",
                other
            )),
        }
    }
}

impl std::fmt::Display for LogType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Formats a time as a log folder name, `YYYYMMDD_HHMMSS` in UTC.
pub fn timestamp(time: SystemTime) -> String {
    let digits = humantime::format_rfc3339_seconds(time)
        .to_string()
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>();
    let (date, time) = digits.split_at(digits.len().min(8));
    format!("{}_{}", date, time)
}

/// Interprets a log sub-folder option.
///
/// `1` or `true` selects a folder named after the current time, an empty
/// value, `0` or `false` selects none, anything else is used as the name.
pub fn parse_sub_folder(value: &str) -> Option<String> {
    match value.trim() {
        "1" | "true" => Some(timestamp(SystemTime::now())),
        "" | "0" | "false" => None,
        name => Some(name.to_string()),
    }
}

/// Data logger configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LoggerConfig {
    enabled: bool,
    path: PathBuf,
    log_type: LogType,
    stream_ppd: bool,
    max_space_percent: f32,
    max_file_size: u32,
    max_memory: u32,
    sub_folder: Option<String>,
    flush_timeout: Duration,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: PathBuf::from(DEFAULT_LOGS_DIRECTORY),
            log_type: LogType::default(),
            stream_ppd: false,
            max_space_percent: 0.5,
            max_file_size: 5 * 1024 * 1024,
            max_memory: 131_072,
            sub_folder: None,
            flush_timeout: Duration::from_secs(3),
        }
    }
}

impl LoggerConfig {
    /// Creates a default [`LoggerConfig`].
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a default [`LoggerConfig`] builder.
    pub fn builder() -> LoggerConfigBuilder {
        Default::default()
    }

    /// Checks whether logging is enabled.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Gets the root directory of logs.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log_type(&self) -> LogType {
        self.log_type
    }

    /// Checks whether the post processing data preset is streamed.
    pub fn stream_ppd(&self) -> bool {
        self.stream_ppd
    }

    /// Gets the share of free disk space logs may use, 0 for unlimited.
    pub fn max_space_percent(&self) -> f32 {
        self.max_space_percent
    }

    /// Gets the size limit of one log file in bytes.
    pub fn max_file_size(&self) -> u32 {
        self.max_file_size
    }

    /// Gets the amount of memory the logger buffers at most.
    pub fn max_memory(&self) -> u32 {
        self.max_memory
    }

    pub fn sub_folder(&self) -> Option<&str> {
        self.sub_folder.as_deref()
    }

    /// Gets how long the logger may take to flush on close.
    pub fn flush_timeout(&self) -> Duration {
        self.flush_timeout
    }

    /// Gets the directory log files are written to.
    pub fn directory(&self) -> PathBuf {
        match &self.sub_folder {
            Some(sub) => self.path.join(sub),
            None => self.path.clone(),
        }
    }
}

/// [`LoggerConfig`] builder
///
/// A builder can be created by any of
///
/// * [`LoggerConfig::builder()`]
/// * [`LoggerConfigBuilder::new()`]
/// * [`LoggerConfigBuilder::default()`].
#[derive(Default, Debug, Clone)]
pub struct LoggerConfigBuilder {
    inner: LoggerConfig,
}

impl LoggerConfigBuilder {
    /// Creates a default [`LoggerConfig`] builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a [`LoggerConfig`].
    pub fn build(self) -> LoggerConfig {
        self.inner
    }

    pub fn enabled(&mut self, enabled: bool) -> &mut Self {
        self.inner.enabled = enabled;
        self
    }

    pub fn path(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.inner.path = path.into();
        self
    }

    pub fn log_type(&mut self, log_type: LogType) -> &mut Self {
        self.inner.log_type = log_type;
        self
    }

    pub fn stream_ppd(&mut self, stream: bool) -> &mut Self {
        self.inner.stream_ppd = stream;
        self
    }

    pub fn max_space_percent(&mut self, percent: f32) -> &mut Self {
        self.inner.max_space_percent = percent;
        self
    }

    pub fn max_file_size(&mut self, bytes: u32) -> &mut Self {
        self.inner.max_file_size = bytes;
        self
    }

    pub fn max_memory(&mut self, bytes: u32) -> &mut Self {
        self.inner.max_memory = bytes;
        self
    }

    pub fn sub_folder(&mut self, name: Option<String>) -> &mut Self {
        self.inner.sub_folder = name;
        self
    }

    pub fn flush_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.inner.flush_timeout = timeout;
        self
    }
}

impl From<LoggerConfig> for LoggerConfigBuilder {
    /// Creates a [`LoggerConfig`] builder from an existing [`LoggerConfig`].
    fn from(value: LoggerConfig) -> Self {
        Self { inner: value }
    }
}

/// Sink for whole records
pub trait LogWriter {
    fn write(&mut self, id: DataId, record: &[u8]) -> Result<()>;

    /// Flushes everything written so far.
    fn finish(&mut self) -> Result<()>;
}

/// Opens the writer for the configured log type, creating its directory.
pub fn open_writer<'a>(
    config: &LoggerConfig,
    registry: &'a Registry,
) -> Result<Box<dyn LogWriter + 'a>> {
    let directory = config.directory();
    match config.log_type() {
        LogType::Dat => Ok(Box::new(RawWriter::create(&directory)?)),
        LogType::Csv => Ok(Box::new(CsvWriter::create(&directory, registry)?)),
        LogType::Sdat => Err(Error::Unsupported("writing summarized logs")),
        LogType::Kml => Err(Error::Unsupported("writing map logs")),
    }
}

/// Writes records as frames into a single `.dat` file.
#[derive(Debug)]
pub struct RawWriter {
    out: BufWriter<File>,
}

impl RawWriter {
    pub fn create(directory: &Path) -> Result<Self> {
        fs::create_dir_all(directory)?;
        let path = directory.join(RAW_LOG_FILE);
        debug!("writing raw log {}", path.display());
        Ok(Self {
            out: BufWriter::new(File::create(path)?),
        })
    }
}

impl LogWriter for RawWriter {
    fn write(&mut self, id: DataId, record: &[u8]) -> Result<()> {
        Frame::new(id, record).write_to(&mut self.out)
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Writes records as CSV rows, one `<record>.csv` file per record type.
///
/// Array fields take one column per element, named `field[i]`.
pub struct CsvWriter<'a> {
    directory: PathBuf,
    registry: &'a Registry,
    files: BTreeMap<DataId, BufWriter<File>>,
}

impl<'a> CsvWriter<'a> {
    pub fn create(directory: &Path, registry: &'a Registry) -> Result<Self> {
        fs::create_dir_all(directory)?;
        Ok(Self {
            directory: directory.to_path_buf(),
            registry,
            files: BTreeMap::new(),
        })
    }
}

fn csv_cell(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Renders one CSV row of a record, in the column order of
/// [`RecordTable::columns()`].
pub fn csv_row(table: &RecordTable, record: &[u8]) -> Result<String> {
    let mut cells = Vec::new();
    for field in table.fields() {
        for index in 0..field.count() {
            let element = field.element(index).unwrap_or(*field);
            cells.push(csv_cell(&codec::render(&element, record)?));
        }
    }
    Ok(cells.join(","))
}

impl LogWriter for CsvWriter<'_> {
    fn write(&mut self, id: DataId, record: &[u8]) -> Result<()> {
        let table = self.registry.get(id).ok_or(Error::UnknownRecord(id))?;
        let out = match self.files.entry(id) {
            std::collections::btree_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::btree_map::Entry::Vacant(entry) => {
                let path = self.directory.join(format!("{}.csv", table.name()));
                debug!("writing csv log {}", path.display());
                let mut out = BufWriter::new(File::create(path)?);
                writeln!(out, "{}", table.columns().join(","))?;
                entry.insert(out)
            }
        };
        writeln!(out, "{}", csv_row(table, record)?)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        for out in self.files.values_mut() {
            out.flush()?;
        }
        Ok(())
    }
}
