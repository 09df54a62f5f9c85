//! Serial port selection and link settings.

use crate::Result;
use log::debug;
use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortInfo, StopBits};
use std::borrow::Cow;
use std::str::FromStr;
use std::time::Duration;

pub type Baudrate = u32;

/// Baudrate devices are linked at unless told otherwise.
pub const DEFAULT_BAUDRATE: Baudrate = 921_600;

/// Baudrates devices accept, fastest first.
pub const SUPPORTED_BAUDRATES: &[Baudrate] = &[
    3_000_000, 921_600, 460_800, 230_400, 115_200, 57_600, 38_400, 19_200,
];

/// Checks whether devices accept a baudrate.
pub fn is_supported_baudrate(baudrate: Baudrate) -> bool {
    SUPPORTED_BAUDRATES.contains(&baudrate)
}

/// Ports to work with
///
/// Parsed from `*` (every port), `*N` (the first `N` ports) or a port name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum PortSelection {
    #[default]
    All,
    First(usize),
    Named(String),
}

impl FromStr for PortSelection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        match s.strip_prefix('*') {
            Some("") => Ok(Self::All),
            Some(count) => count
                .parse()
                .map(Self::First)
                .map_err(|_| format!("incorrect port count: {}", s)),
            None if s.is_empty() => Err("empty port name".to_string()),
            None => Ok(Self::Named(s.to_string())),
        }
    }
}

impl std::fmt::Display for PortSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "*"),
            Self::First(count) => write!(f, "*{}", count),
            Self::Named(name) => write!(f, "{}", name),
        }
    }
}

impl PortSelection {
    /// Picks ports out of `available`, which is expected sorted by name.
    ///
    /// A named port is picked even when it is not listed.
    pub fn select(&self, available: &[String]) -> Vec<String> {
        match self {
            Self::All => available.to_vec(),
            Self::First(count) => available.iter().take(*count).cloned().collect(),
            Self::Named(name) => vec![name.clone()],
        }
    }
}

/// Lists the host's serial ports sorted by name.
pub fn available_ports() -> Result<Vec<SerialPortInfo>> {
    let mut ports = serialport::available_ports()?;
    ports.sort_by(|a, b| a.port_name.cmp(&b.port_name));
    Ok(ports)
}

/// Link contains the settings serial ports are opened with.
#[derive(Debug, Clone)]
pub struct Link {
    baudrate: Baudrate,
    timeout: Duration,
}

impl Default for Link {
    fn default() -> Self {
        Self {
            baudrate: DEFAULT_BAUDRATE,
            timeout: Duration::from_millis(100),
        }
    }
}

impl Link {
    /// Creates a default [`Link`].
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a default [`Link`] builder.
    pub fn builder() -> LinkBuilder {
        Default::default()
    }

    /// Gets baudrate of the link.
    pub fn baudrate(&self) -> Baudrate {
        self.baudrate
    }

    /// Sets baudrate of the link.
    pub fn set_baudrate(&mut self, baudrate: Baudrate) {
        self.baudrate = baudrate;
    }

    /// Gets timeout for reading from the underlying port.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sets timeout for reading from the underlying port.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Opens a port, 8 data bits, no parity, one stop bit.
    pub fn open<'a>(&self, path: impl Into<Cow<'a, str>>) -> Result<Box<dyn SerialPort>> {
        let path = path.into();
        let port = serialport::new(path.as_ref(), self.baudrate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.timeout)
            .open()?;
        debug!("opened {} at {} baud", path, self.baudrate);
        Ok(port)
    }
}

/// [`Link`] builder
///
/// A builder can be created by any of
///
/// * [`Link::builder()`]
/// * [`LinkBuilder::new()`]
/// * [`LinkBuilder::default()`].
#[derive(Default, Debug, Clone)]
pub struct LinkBuilder {
    inner: Link,
}

impl LinkBuilder {
    /// Creates a default [`Link`] builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a [`Link`].
    pub fn build(self) -> Link {
        self.inner
    }

    /// Sets baudrate of the link.
    pub fn baudrate(&mut self, baudrate: Baudrate) -> &mut Self {
        self.inner.baudrate = baudrate;
        self
    }

    /// Sets timeout for reading from the underlying port.
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.inner.timeout = timeout;
        self
    }
}

impl From<Link> for LinkBuilder {
    /// Creates a [`Link`] builder from an existing [`Link`].
    fn from(value: Link) -> Self {
        Self { inner: value }
    }
}
