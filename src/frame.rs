//! Binary record frames shared by device images and recorded logs.

use crate::DataId;
use binrw::io::NoSeek;
use binrw::{BinRead, BinWrite, binrw};
use log::trace;
use std::io::{Cursor, Read, Write};

mod checksum {
    pub(super) fn iter(data: impl Iterator<Item = u8>) -> u8 {
        data.fold(0u8, |acc, e| acc ^ e)
    }
}

/// One record, or a slice of one, tagged with its [`DataId`].
///
/// On the wire: data id, offset into the record, payload size (all `u32`
/// little-endian), the payload, then an XOR checksum of the payload.
#[binrw]
#[derive(Debug, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct Frame {
    pub data_id: DataId,
    pub offset: u32,
    #[br(temp)]
    #[bw(calc = data.len() as u32)]
    size: u32,
    #[br(count = size)]
    pub data: Vec<u8>,
    #[br(temp, assert(
        checksum == checksum::iter(data.iter().copied()),
        "checksum mismatch in {} frame", data_id
    ))]
    #[bw(calc = checksum::iter(data.iter().copied()))]
    checksum: u8,
}

impl Frame {
    /// Creates a frame holding a whole record.
    pub fn new(data_id: DataId, data: impl Into<Vec<u8>>) -> Self {
        Self {
            data_id,
            offset: 0,
            data: data.into(),
        }
    }

    /// Creates a frame holding part of a record starting at `offset`.
    pub fn partial(data_id: DataId, offset: u32, data: impl Into<Vec<u8>>) -> Self {
        Self {
            data_id,
            offset,
            data: data.into(),
        }
    }

    /// Writes the frame to a stream.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> crate::Result<()> {
        let mut wrapper = NoSeek::new(writer);
        self.write(&mut wrapper)?;
        trace!("wrote {} frame ({} bytes)", self.data_id, self.data.len());
        Ok(())
    }

    /// Reads one frame from a stream.
    pub fn read_from<R: Read>(reader: &mut R) -> crate::Result<Self> {
        let mut wrapper = NoSeek::new(reader);
        let frame = Self::read(&mut wrapper)?;
        trace!("read {} frame ({} bytes)", frame.data_id, frame.data.len());
        Ok(frame)
    }

    /// Decodes every frame of a byte buffer.
    pub fn decode_all(bytes: &[u8]) -> crate::Result<Vec<Self>> {
        let mut cursor = Cursor::new(bytes);
        let mut frames = Vec::new();
        while (cursor.position() as usize) < bytes.len() {
            frames.push(Self::read(&mut cursor)?);
        }
        Ok(frames)
    }
}
