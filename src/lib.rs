pub mod device;
pub mod frame;
pub mod logger;
pub mod mapping;
pub mod ports;
pub mod records;
pub mod replay;

pub use device::{Device, ImageDevice};
pub use frame::Frame;
pub use logger::{LogType, LogWriter, LoggerConfig, LoggerConfigBuilder};
pub use mapping::{
    DataId, ElementType, EnumDef, Entry, Field, IntWidth, RecordTable, Registry, TableBuilder,
    TableError,
};
pub use ports::{Baudrate, Link, LinkBuilder, PortSelection};
pub use records::{FlashConfig, registry};
pub use replay::{LogReader, Replay, Sample};

/// Error
#[derive(Debug)]
pub enum Error {
    Unsupported(&'static str),
    MissingRecord(DataId),
    UnknownRecord(DataId),
    NoLogFiles(std::path::PathBuf),
    Mapping(mapping::Error),
    Table(TableError),
    Io(std::io::Error),
    Serial(serialport::Error),
    Frame(binrw::Error),
}

impl Error {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(..))
    }
    pub fn is_missing_record(&self) -> bool {
        matches!(self, Self::MissingRecord(..))
    }
    pub fn is_unknown_record(&self) -> bool {
        matches!(self, Self::UnknownRecord(..))
    }

    pub fn is_mapping_error(&self) -> bool {
        matches!(self, Self::Mapping(..))
    }
    pub fn as_mapping_error(&self) -> Option<&mapping::Error> {
        match self {
            Self::Mapping(e) => Some(e),
            _ => None,
        }
    }
    pub fn into_mapping_error(self) -> Option<mapping::Error> {
        match self {
            Self::Mapping(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_table_error(&self) -> bool {
        matches!(self, Self::Table(..))
    }
    pub fn as_table_error(&self) -> Option<&TableError> {
        match self {
            Self::Table(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_io_error(&self) -> bool {
        matches!(self, Self::Io(..))
    }
    pub fn as_io_error(&self) -> Option<&std::io::Error> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
    pub fn into_io_error(self) -> Option<std::io::Error> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_serial_error(&self) -> bool {
        matches!(self, Self::Serial(..))
    }
    pub fn as_serial_error(&self) -> Option<&serialport::Error> {
        match self {
            Self::Serial(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_frame_error(&self) -> bool {
        matches!(self, Self::Frame(..))
    }
    pub fn as_frame_error(&self) -> Option<&binrw::Error> {
        match self {
            Self::Frame(e) => Some(e),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsupported(what) => write!(f, "{} is not supported", what),
            Self::MissingRecord(id) => write!(f, "device holds no {} record", id),
            Self::UnknownRecord(id) => write!(f, "no layout known for record {}", id),
            Self::NoLogFiles(path) => write!(f, "no log files found in {}", path.display()),
            Self::Mapping(e) => write!(f, "mapping error: {}", e),
            Self::Table(e) => write!(f, "table error: {}", e),
            Self::Io(e) => write!(f, "io error: {}", e),
            Self::Serial(e) => write!(f, "serial error: {}", e),
            Self::Frame(e) => write!(f, "frame error: {}", e),
        }
    }
}

impl From<mapping::Error> for Error {
    fn from(value: mapping::Error) -> Self {
        Self::Mapping(value)
    }
}

impl From<TableError> for Error {
    fn from(value: TableError) -> Self {
        Self::Table(value)
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serialport::Error> for Error {
    fn from(value: serialport::Error) -> Self {
        Self::Serial(value)
    }
}

impl From<binrw::Error> for Error {
    fn from(value: binrw::Error) -> Self {
        Self::Frame(value)
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
