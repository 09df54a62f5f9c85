//! Device interface.
//!
//! [`Device`] is the seam between the record tooling and whatever holds the
//! records. [`ImageDevice`] keeps them in a file on disk, which is enough to
//! prepare and inspect configurations without hardware attached.

use crate::frame::Frame;
use crate::logger::LoggerConfig;
use crate::records::{FlashConfig, registry};
use crate::{DataId, Error, Result};
use binrw::io::NoSeek;
use binrw::{BinRead, BinWrite, binrw};
use log::{debug, info};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Device holding records addressed by [`DataId`]
pub trait Device {
    /// Gets a snapshot of a record.
    fn get_record(&self, id: DataId) -> Result<Vec<u8>>;

    /// Replaces a record.
    fn set_record(&mut self, id: DataId, record: &[u8]) -> Result<()>;

    /// Enables or disables the data logger.
    fn set_logger(&mut self, _config: &LoggerConfig) -> Result<()> {
        Err(Error::Unsupported("data logging on this device"))
    }

    /// Gets a human readable name.
    fn name(&self) -> String;
}

const IMAGE_VERSION: u16 = 1;

#[binrw]
#[brw(little, magic = b"NVCF")]
struct ImageFile {
    #[br(assert(version == IMAGE_VERSION, "unsupported image version {}", version))]
    version: u16,
    #[br(temp)]
    #[bw(calc = frames.len() as u32)]
    count: u32,
    #[br(count = count)]
    frames: Vec<Frame>,
}

/// Device image
///
/// Records held in memory and, when a path is attached, written back to the
/// image file on every change. The file is replaced as a whole, so a failed
/// write leaves the previous image in place. The file starts with the magic `NVCF`, a
/// format version and a frame count followed by one [`Frame`] per record.
#[derive(Debug, Clone)]
pub struct ImageDevice {
    path: Option<PathBuf>,
    records: BTreeMap<DataId, Vec<u8>>,
}

impl Default for ImageDevice {
    fn default() -> Self {
        let mut records = BTreeMap::new();
        if let Ok(bytes) = FlashConfig::default().to_bytes() {
            records.insert(DataId::FLASH_CONFIG, bytes);
        }
        Self {
            path: None,
            records,
        }
    }
}

impl ImageDevice {
    /// Creates an in-memory image holding the default flash configuration.
    pub fn new() -> Self {
        Default::default()
    }

    /// Opens an image file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);
        let mut image = Self::load(&mut reader)?;
        image.path = Some(path.to_path_buf());
        debug!("opened image {} ({} records)", path.display(), image.records.len());
        Ok(image)
    }

    /// Creates a new image file holding the default flash configuration.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let mut image = Self::new();
        image.path = Some(path.as_ref().to_path_buf());
        image.save()?;
        Ok(image)
    }

    /// Opens an image file, creating it first if it does not exist.
    pub fn open_or_create(path: impl AsRef<Path>) -> Result<Self> {
        match path.as_ref().exists() {
            true => Self::open(path),
            false => Self::create(path),
        }
    }

    /// Reads an image from a stream.
    pub fn load<R: Read>(reader: &mut R) -> Result<Self> {
        let mut wrapper = NoSeek::new(reader);
        let file = ImageFile::read(&mut wrapper)?;
        let mut records = BTreeMap::new();
        for frame in file.frames {
            if frame.offset != 0 {
                return Err(Error::Unsupported("partial records in device images"));
            }
            records.insert(frame.data_id, frame.data);
        }
        Ok(Self {
            path: None,
            records,
        })
    }

    /// Writes the image to a stream.
    pub fn store<W: Write>(&self, writer: &mut W) -> Result<()> {
        let file = ImageFile {
            version: IMAGE_VERSION,
            frames: self
                .records
                .iter()
                .map(|(id, data)| Frame::new(*id, data.clone()))
                .collect(),
        };
        let mut wrapper = NoSeek::new(writer);
        file.write(&mut wrapper)?;
        Ok(())
    }

    /// Writes the image back to its file, if it has one.
    ///
    /// The image goes to a temporary file next to the target which then
    /// replaces it.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let directory = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut file = NamedTempFile::new_in(directory)?;
        {
            let mut writer = BufWriter::new(file.as_file_mut());
            self.store(&mut writer)?;
            writer.flush()?;
        }
        file.persist(path).map_err(|e| e.error)?;
        debug!("saved image {}", path.display());
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Gets the record types held by the image.
    pub fn ids(&self) -> impl Iterator<Item = DataId> + '_ {
        self.records.keys().copied()
    }
}

impl Device for ImageDevice {
    fn get_record(&self, id: DataId) -> Result<Vec<u8>> {
        self.records.get(&id).cloned().ok_or(Error::MissingRecord(id))
    }

    fn set_record(&mut self, id: DataId, record: &[u8]) -> Result<()> {
        let table = registry().get(id).ok_or(Error::UnknownRecord(id))?;
        if record.len() != table.size() {
            return Err(crate::mapping::Error::RecordSize {
                record: table.name(),
                expected: table.size(),
                actual: record.len(),
            }
            .into());
        }
        let previous = self.records.insert(id, record.to_vec());
        if let Err(e) = self.save() {
            match previous {
                Some(previous) => self.records.insert(id, previous),
                None => self.records.remove(&id),
            };
            return Err(e);
        }
        info!("committed {} record to {}", id, self.name());
        Ok(())
    }

    fn name(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => "memory image".to_string(),
        }
    }
}
