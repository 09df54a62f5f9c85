//! Recorded log replay.
//!
//! A log is a directory of `.dat` files, each a plain sequence of
//! [`Frame`]s. [`LogReader`] walks the files in name order and [`Replay`]
//! reassembles records from frames and paces them by their own timestamps.

use crate::frame::Frame;
use crate::mapping::{RecordTable, Registry, codec};
use crate::{DataId, Error, Result};
use log::{debug, trace, warn};
use std::collections::{HashMap, VecDeque};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Extension of replayable log files.
pub const LOG_EXTENSION: &str = "dat";

/// Longest pause between two samples, before speed scaling.
pub const MAX_GAP: Duration = Duration::from_secs(1);

/// Time fields looked up in replayed records, with their scale to seconds.
const TIME_FIELDS: &[(&str, f64)] = &[("timeOfWeek", 1.0), ("time", 1.0), ("timeOfWeekMs", 0.001)];

/// Reads the frames of every log file in a directory.
///
/// Frames are streamed one at a time. A frame that fails to decode ends its
/// file with a warning; the frames before it are kept.
#[derive(Debug)]
pub struct LogReader {
    files: VecDeque<PathBuf>,
    current: Option<(PathBuf, BufReader<File>)>,
}

impl LogReader {
    /// Finds the log files of a directory.
    ///
    /// Fails with [`Error::NoLogFiles`] when the directory holds none.
    pub fn load(directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref();
        let mut files = Vec::new();
        for entry in fs::read_dir(directory)? {
            let path = entry?.path();
            let is_log = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(LOG_EXTENSION));
            if is_log && path.is_file() {
                files.push(path);
            }
        }
        if files.is_empty() {
            return Err(Error::NoLogFiles(directory.to_path_buf()));
        }
        files.sort();
        debug!("found {} log files in {}", files.len(), directory.display());
        Ok(Self {
            files: files.into(),
            current: None,
        })
    }

    /// Gets the files not yet read.
    pub fn remaining_files(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(PathBuf::as_path)
    }

    /// Checks whether `directory` holds any file not yet read.
    ///
    /// Paths are compared after resolving `.`, `..` and symbolic links. A
    /// directory that does not exist holds nothing.
    pub fn reads_from(&self, directory: impl AsRef<Path>) -> bool {
        let Ok(directory) = fs::canonicalize(directory) else {
            return false;
        };
        self.files.iter().any(|file| {
            let linked = file.parent().and_then(|parent| fs::canonicalize(parent).ok());
            let resolved = fs::canonicalize(file)
                .ok()
                .and_then(|file| file.parent().map(Path::to_path_buf));
            linked.as_deref() == Some(directory.as_path())
                || resolved.as_deref() == Some(directory.as_path())
        })
    }
}

/// Reads the next frame of a file, or `None` once the file is done.
fn read_frame(path: &Path, reader: &mut BufReader<File>) -> Result<Option<Frame>> {
    if reader.fill_buf()?.is_empty() {
        return Ok(None);
    }
    match Frame::read_from(reader) {
        Ok(frame) => Ok(Some(frame)),
        Err(e) => {
            warn!("skipping the rest of {}: {}", path.display(), e);
            Ok(None)
        }
    }
}

impl Iterator for LogReader {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((path, reader)) = self.current.as_mut() {
                match read_frame(path, reader) {
                    Ok(Some(frame)) => return Some(Ok(frame)),
                    Ok(None) => {}
                    Err(e) => {
                        self.current = None;
                        return Some(Err(e));
                    }
                }
                self.current = None;
            }
            let path = self.files.pop_front()?;
            debug!("replaying {}", path.display());
            match File::open(&path) {
                Ok(file) => self.current = Some((path, BufReader::new(file))),
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

/// One reassembled record
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub id: DataId,
    pub record: Vec<u8>,
    /// Record time in seconds, if the record type carries one.
    pub time: Option<f64>,
}

/// Gets the time carried by a record, in seconds.
pub fn record_time(table: &RecordTable, record: &[u8]) -> Option<f64> {
    TIME_FIELDS.iter().find_map(|(name, scale)| {
        let field = table.lookup(name)?;
        codec::number(field, record).map(|value| value * scale)
    })
}

/// Replay state
///
/// Keeps the latest copy of every record type so partial frames can be
/// merged into whole records.
#[derive(Debug)]
pub struct Replay<'a> {
    registry: &'a Registry,
    speed: f64,
    records: HashMap<DataId, Vec<u8>>,
    last_time: Option<f64>,
}

impl<'a> Replay<'a> {
    /// Creates a replay running at `speed` times real time.
    ///
    /// A speed of zero or less, or one that is not finite, replays without
    /// pauses.
    pub fn new(registry: &'a Registry, speed: f64) -> Self {
        Self {
            registry,
            speed,
            records: HashMap::new(),
            last_time: None,
        }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Gets the latest copy of a record type.
    pub fn record(&self, id: DataId) -> Option<&[u8]> {
        self.records.get(&id).map(Vec::as_slice)
    }

    /// Merges a frame into its record.
    ///
    /// Returns the updated record, or `None` for frames of unknown record
    /// types and frames reaching past the end of their record.
    pub fn feed(&mut self, frame: Frame) -> Option<Sample> {
        let Some(table) = self.registry.get(frame.data_id) else {
            trace!("skipping {} frame: unknown record", frame.data_id);
            return None;
        };
        let start = frame.offset as usize;
        let end = start + frame.data.len();
        if end > table.size() {
            warn!(
                "skipping {} frame: bytes {}..{} outside a {} byte record",
                frame.data_id,
                start,
                end,
                table.size()
            );
            return None;
        }
        let record = self
            .records
            .entry(frame.data_id)
            .or_insert_with(|| vec![0u8; table.size()]);
        record[start..end].copy_from_slice(&frame.data);
        Some(Sample {
            id: frame.data_id,
            record: record.clone(),
            time: record_time(table, record),
        })
    }

    /// Computes the pause due before showing `sample`.
    ///
    /// The gap to the previous timed sample is clamped to [`MAX_GAP`], then
    /// divided by the speed. Samples with a non-finite time and speeds that
    /// are not finite and positive never pause; pauses too long to represent
    /// saturate.
    pub fn delay(&mut self, sample: &Sample) -> Duration {
        let Some(time) = sample.time.filter(|time| time.is_finite()) else {
            return Duration::ZERO;
        };
        let previous = self.last_time.replace(time);
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Duration::ZERO;
        }
        match previous {
            Some(previous) if time > previous => {
                let gap = (time - previous).min(MAX_GAP.as_secs_f64());
                Duration::try_from_secs_f64(gap / self.speed).unwrap_or(Duration::MAX)
            }
            _ => Duration::ZERO,
        }
    }

    /// Sleeps for [`Self::delay()`].
    pub fn pace(&mut self, sample: &Sample) {
        let delay = self.delay(sample);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::registry;

    fn barometer(time: f64, bar: f32) -> Vec<u8> {
        let mut record = vec![0u8; 24];
        record[0..8].copy_from_slice(&time.to_le_bytes());
        record[8..12].copy_from_slice(&bar.to_le_bytes());
        record
    }

    #[test]
    fn merges_partial_frames() {
        let mut replay = Replay::new(registry(), 1.0);
        let sample = replay
            .feed(Frame::new(DataId::BAROMETER, barometer(10.0, 1.0)))
            .unwrap();
        assert_eq!(sample.time, Some(10.0));

        let sample = replay
            .feed(Frame::partial(DataId::BAROMETER, 8, 2.5f32.to_le_bytes()))
            .unwrap();
        assert_eq!(sample.record, barometer(10.0, 2.5));
        assert_eq!(replay.record(DataId::BAROMETER), Some(sample.record.as_slice()));
    }

    #[test]
    fn skips_unknown_and_oversized_frames() {
        let mut replay = Replay::new(registry(), 1.0);
        assert!(replay.feed(Frame::new(DataId::new(999), [1u8])).is_none());
        assert!(
            replay
                .feed(Frame::partial(DataId::BAROMETER, 20, [0u8; 8]))
                .is_none()
        );
    }

    #[test]
    fn gps_time_is_scaled_to_seconds() {
        let mut replay = Replay::new(registry(), 1.0);
        let sample = replay
            .feed(Frame::partial(DataId::GPS1_POS, 4, 1500u32.to_le_bytes()))
            .unwrap();
        assert_eq!(sample.time, Some(1.5));
        let sample = replay
            .feed(Frame::new(DataId::DEV_INFO, vec![0u8; 84]))
            .unwrap();
        assert_eq!(sample.time, None);
    }

    #[test]
    fn pacing() {
        let mut replay = Replay::new(registry(), 2.0);
        let first = replay
            .feed(Frame::new(DataId::BAROMETER, barometer(1.0, 0.0)))
            .unwrap();
        assert_eq!(replay.delay(&first), Duration::ZERO);

        let second = replay
            .feed(Frame::new(DataId::BAROMETER, barometer(1.5, 0.0)))
            .unwrap();
        assert_eq!(replay.delay(&second), Duration::from_millis(250));

        let late = replay
            .feed(Frame::new(DataId::BAROMETER, barometer(100.0, 0.0)))
            .unwrap();
        assert_eq!(replay.delay(&late), MAX_GAP / 2);

        let earlier = replay
            .feed(Frame::new(DataId::BAROMETER, barometer(50.0, 0.0)))
            .unwrap();
        assert_eq!(replay.delay(&earlier), Duration::ZERO);
    }

    #[test]
    fn no_pacing_without_speed() {
        let mut replay = Replay::new(registry(), 0.0);
        for time in [1.0, 2.0, 3.0] {
            let sample = replay
                .feed(Frame::new(DataId::BAROMETER, barometer(time, 0.0)))
                .unwrap();
            assert_eq!(replay.delay(&sample), Duration::ZERO);
        }
    }

    #[test]
    fn huge_and_infinite_gaps_are_clamped() {
        let mut replay = Replay::new(registry(), 1.0);
        let mut delay = |time: f64| {
            let sample = replay
                .feed(Frame::new(DataId::BAROMETER, barometer(time, 0.0)))
                .unwrap();
            replay.delay(&sample)
        };
        assert_eq!(delay(0.0), Duration::ZERO);
        assert_eq!(delay(1e30), MAX_GAP);
        assert_eq!(delay(f64::INFINITY), Duration::ZERO);
        assert_eq!(delay(f64::NAN), Duration::ZERO);
        assert_eq!(delay(1e30 + 1e20), MAX_GAP);
    }

    #[test]
    fn odd_speeds_do_not_panic() {
        for speed in [f64::NAN, f64::INFINITY, -1.0] {
            let mut replay = Replay::new(registry(), speed);
            for time in [0.0, 0.5] {
                let sample = replay
                    .feed(Frame::new(DataId::BAROMETER, barometer(time, 0.0)))
                    .unwrap();
                assert_eq!(replay.delay(&sample), Duration::ZERO);
            }
        }

        let mut replay = Replay::new(registry(), 1e-30);
        let first = replay
            .feed(Frame::new(DataId::BAROMETER, barometer(0.0, 0.0)))
            .unwrap();
        assert_eq!(replay.delay(&first), Duration::ZERO);
        let second = replay
            .feed(Frame::new(DataId::BAROMETER, barometer(0.5, 0.0)))
            .unwrap();
        assert_eq!(replay.delay(&second), Duration::MAX);
    }

    #[test]
    fn reads_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, frames: &[Frame]| {
            let mut bytes = Vec::new();
            for frame in frames {
                frame.write_to(&mut bytes).unwrap();
            }
            fs::write(dir.path().join(name), bytes).unwrap();
        };
        write("LOG_0002.dat", &[Frame::new(DataId::BAROMETER, barometer(2.0, 0.0))]);
        write(
            "LOG_0001.dat",
            &[
                Frame::new(DataId::BAROMETER, barometer(0.0, 0.0)),
                Frame::new(DataId::BAROMETER, barometer(1.0, 0.0)),
            ],
        );
        fs::write(dir.path().join("notes.txt"), "not a log").unwrap();

        let reader = LogReader::load(dir.path()).unwrap();
        assert_eq!(reader.remaining_files().count(), 2);
        let frames = reader.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2].data, barometer(2.0, 0.0));
    }

    #[test]
    fn truncated_file_keeps_leading_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = Vec::new();
        for time in [0.0, 1.0, 2.0] {
            Frame::new(DataId::BAROMETER, barometer(time, 0.0))
                .write_to(&mut bytes)
                .unwrap();
        }
        bytes.truncate(bytes.len() - 5);
        fs::write(dir.path().join("LOG_0001.dat"), bytes).unwrap();
        let mut next = Vec::new();
        Frame::new(DataId::BAROMETER, barometer(3.0, 0.0))
            .write_to(&mut next)
            .unwrap();
        fs::write(dir.path().join("LOG_0002.dat"), next).unwrap();

        let frames = LogReader::load(dir.path())
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        let times = frames
            .iter()
            .map(|frame| f64::from_le_bytes(frame.data[0..8].try_into().unwrap()))
            .collect::<Vec<_>>();
        assert_eq!(times, [0.0, 1.0, 3.0]);
    }

    #[test]
    fn detects_reading_from_aliased_directory() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("IS_logs");
        let other = dir.path().join("converted");
        fs::create_dir(&logs).unwrap();
        fs::create_dir(&other).unwrap();
        let mut bytes = Vec::new();
        Frame::new(DataId::BAROMETER, barometer(0.0, 0.0))
            .write_to(&mut bytes)
            .unwrap();
        fs::write(logs.join("LOG_0001.dat"), bytes).unwrap();

        let reader = LogReader::load(&logs).unwrap();
        assert!(reader.reads_from(&logs));
        assert!(reader.reads_from(logs.join(".")));
        assert!(reader.reads_from(other.join("..").join("IS_logs")));
        assert!(!reader.reads_from(&other));
        assert!(!reader.reads_from(dir.path()));
        assert!(!reader.reads_from(logs.join("missing")));
    }

    #[test]
    fn empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = LogReader::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::NoLogFiles(..)));
    }
}
