//! Schema-driven conversion between fixed-layout binary records and text.
//!
//! A [`RecordTable`] describes where every named field of one record type
//! lives. The [`codec`] renders a field of a raw record buffer to text and
//! parses text back into it, and [`update`] applies `key=value|key=value`
//! batches to a copy of a record.

pub mod codec;
mod field;
mod registry;
mod table;
pub mod update;

pub use field::{ElementType, EnumDef, Field, IntWidth};
pub use registry::{DataId, Registry};
pub use table::{RecordTable, TableBuilder};
pub use update::{Batch, Entry, Outcome, Pair, Update};

/// Errors raised while rendering, parsing or applying field values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The descriptor cannot be handled. Never raised for a validated table.
    #[error("field `{field}` has an unsupported element type")]
    UnsupportedType { field: &'static str },

    #[error("invalid value `{value}` for field `{field}`: {reason}")]
    MalformedValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("value for field `{field}` is {len} bytes long, at most {max} fit")]
    ValueTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("field `{field}` ends at byte {end}, record buffer holds {len}")]
    OutOfRange {
        field: &'static str,
        end: usize,
        len: usize,
    },

    #[error("record `{record}` is {expected} bytes, got {actual}")]
    RecordSize {
        record: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("malformed pair `{0}`, expected key=value")]
    MalformedPair(String),

    #[error("unknown key `{0}`")]
    UnknownKey(String),

    #[error("no key=value pairs in update")]
    EmptyOrMalformedBatch,
}

impl Error {
    /// The key or field the error is about, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::UnsupportedType { field }
            | Self::MalformedValue { field, .. }
            | Self::ValueTooLong { field, .. }
            | Self::OutOfRange { field, .. } => Some(field),
            Self::UnknownKey(key) => Some(key),
            Self::MalformedPair(segment) => Some(segment),
            Self::RecordSize { .. } | Self::EmptyOrMalformedBatch => None,
        }
    }
}

/// Defects found while building a [`RecordTable`] or a [`Registry`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("{table}: duplicate field `{field}`")]
    Duplicate {
        table: &'static str,
        field: &'static str,
    },

    #[error("{table}: field `{field}` has no elements")]
    Empty {
        table: &'static str,
        field: &'static str,
    },

    #[error("{table}: field `{field}` ends at byte {end}, past the record size {size}")]
    OutOfBounds {
        table: &'static str,
        field: &'static str,
        end: usize,
        size: usize,
    },

    #[error("{table}: fields `{first}` and `{second}` overlap")]
    Overlap {
        table: &'static str,
        first: &'static str,
        second: &'static str,
    },

    #[error("{table}: field `{field}` is unsupported ({reason})")]
    Unsupported {
        table: &'static str,
        field: &'static str,
        reason: &'static str,
    },

    #[error("record type {0} registered twice")]
    DuplicateRecord(DataId),
}

pub type Result<T> = std::result::Result<T, Error>;
