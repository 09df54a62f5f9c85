use navcfg::logger::{self, LogType, LoggerConfig, RAW_LOG_FILE};
use navcfg::{DataId, Frame, LogReader, Replay, registry};
use std::fs;
use std::path::Path;

fn barometer(time: f64, bar: f32) -> Vec<u8> {
    let mut record = vec![0u8; 24];
    record[0..8].copy_from_slice(&time.to_le_bytes());
    record[8..12].copy_from_slice(&bar.to_le_bytes());
    record
}

fn magnetometer(time: f64, mag: [f32; 3]) -> Vec<u8> {
    let mut record = time.to_le_bytes().to_vec();
    for axis in mag {
        record.extend_from_slice(&axis.to_le_bytes());
    }
    record
}

fn write_log(path: &Path, frames: &[Frame]) {
    let mut bytes = Vec::new();
    for frame in frames {
        frame.write_to(&mut bytes).unwrap();
    }
    fs::write(path, bytes).unwrap();
}

fn recorded(dir: &Path) {
    write_log(
        &dir.join("LOG_0001.dat"),
        &[
            Frame::new(DataId::BAROMETER, barometer(1.5, 1000.0)),
            Frame::new(DataId::new(250), [1u8, 2, 3]),
            Frame::new(DataId::MAGNETOMETER, magnetometer(2.0, [0.5, -1.0, 0.0])),
        ],
    );
    write_log(
        &dir.join("LOG_0002.dat"),
        &[Frame::partial(DataId::BAROMETER, 8, 990.5f32.to_le_bytes())],
    );
}

fn convert(source: &Path, config: &LoggerConfig) {
    let mut writer = logger::open_writer(config, registry()).unwrap();
    let mut replay = Replay::new(registry(), 0.0);
    for frame in LogReader::load(source).unwrap() {
        if let Some(sample) = replay.feed(frame.unwrap()) {
            writer.write(sample.id, &sample.record).unwrap();
        }
    }
    writer.finish().unwrap();
}

#[test]
fn replay_reassembles_records() {
    let dir = tempfile::tempdir().unwrap();
    recorded(dir.path());

    let mut replay = Replay::new(registry(), 0.0);
    let samples = LogReader::load(dir.path())
        .unwrap()
        .filter_map(|frame| replay.feed(frame.unwrap()))
        .collect::<Vec<_>>();
    let ids = samples.iter().map(|s| s.id).collect::<Vec<_>>();
    assert_eq!(ids, [DataId::BAROMETER, DataId::MAGNETOMETER, DataId::BAROMETER]);
    assert_eq!(samples[2].record, barometer(1.5, 990.5));
    assert_eq!(samples[2].time, Some(1.5));
}

#[test]
fn converts_to_csv() {
    let source = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    recorded(source.path());

    let mut builder = LoggerConfig::builder();
    builder
        .enabled(true)
        .path(target.path())
        .log_type(LogType::Csv)
        .sub_folder(Some("run".into()));
    convert(source.path(), &builder.build());

    let csv = fs::read_to_string(target.path().join("run").join("barometer.csv")).unwrap();
    let lines = csv.lines().collect::<Vec<_>>();
    assert_eq!(lines, ["time,bar,mslBar,barTemp,humidity", "1.5,1000,0,0,0", "1.5,990.5,0,0,0"]);

    let csv = fs::read_to_string(target.path().join("run").join("magnetometer.csv")).unwrap();
    assert_eq!(csv, "time,mag[0],mag[1],mag[2]\n2,0.5,-1,0\n");
}

#[test]
fn converts_to_dat() {
    let source = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    recorded(source.path());

    let mut builder = LoggerConfig::builder();
    builder.enabled(true).path(target.path()).log_type(LogType::Dat);
    convert(source.path(), &builder.build());

    let bytes = fs::read(target.path().join(RAW_LOG_FILE)).unwrap();
    let frames = Frame::decode_all(&bytes).unwrap();
    assert_eq!(frames.len(), 3);
    assert!(frames.iter().all(|frame| frame.offset == 0));
    assert_eq!(frames[2].data, barometer(1.5, 990.5));
}

#[test]
fn summarized_and_map_logs_are_unsupported() {
    let target = tempfile::tempdir().unwrap();
    for log_type in [LogType::Sdat, LogType::Kml] {
        let mut builder = LoggerConfig::builder();
        builder.path(target.path()).log_type(log_type);
        let err = logger::open_writer(&builder.build(), registry()).err().unwrap();
        assert!(err.is_unsupported());
    }
}
