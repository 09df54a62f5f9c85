use crate::mapping::{ElementType, Field, IntWidth};

const BITS32: ElementType = ElementType::Bitfield(IntWidth::W32);

pub(super) const DEV_INFO_SIZE: usize = 84;
pub(super) const INS_1_SIZE: usize = 80;
pub(super) const INS_2_SIZE: usize = 72;
pub(super) const GPS1_POS_SIZE: usize = 92;
pub(super) const MAGNETOMETER_SIZE: usize = 20;
pub(super) const BAROMETER_SIZE: usize = 24;

/// Device identification.
pub static DEV_INFO_FIELDS: &[Field] = &[
    Field::new("hardwareType", 2, ElementType::U8),
    Field::new("serialNumber", 4, ElementType::U32),
    Field::array("hardwareVer", 8, ElementType::U8, 4),
    Field::array("firmwareVer", 12, ElementType::U8, 4),
    Field::new("buildNumber", 16, ElementType::U32),
    Field::array("protocolVer", 20, ElementType::U8, 4),
    Field::new("repoRevision", 24, ElementType::U32),
    Field::new("manufacturer", 28, ElementType::String(24)),
    Field::array("buildDate", 52, ElementType::U8, 4),
    Field::array("buildTime", 56, ElementType::U8, 4),
    Field::new("addInfo", 60, ElementType::String(24)),
];

/// INS output with euler attitude.
pub static INS_1_FIELDS: &[Field] = &[
    Field::new("week", 0, ElementType::U32),
    Field::new("timeOfWeek", 4, ElementType::F64),
    Field::new("insStatus", 12, BITS32),
    Field::new("hdwStatus", 16, BITS32),
    Field::array("theta", 20, ElementType::F32, 3),
    Field::array("uvw", 32, ElementType::F32, 3),
    Field::array("lla", 44, ElementType::F64, 3),
    Field::array("ned", 68, ElementType::F32, 3),
];

/// INS output with quaternion attitude.
pub static INS_2_FIELDS: &[Field] = &[
    Field::new("week", 0, ElementType::U32),
    Field::new("timeOfWeek", 4, ElementType::F64),
    Field::new("insStatus", 12, BITS32),
    Field::new("hdwStatus", 16, BITS32),
    Field::array("qn2b", 20, ElementType::F32, 4),
    Field::array("uvw", 36, ElementType::F32, 3),
    Field::array("lla", 48, ElementType::F64, 3),
];

/// GPS position.
pub static GPS1_POS_FIELDS: &[Field] = &[
    Field::new("week", 0, ElementType::U32),
    Field::new("timeOfWeekMs", 4, ElementType::U32),
    Field::new("status", 8, BITS32),
    Field::array("ecef", 12, ElementType::F64, 3),
    Field::array("lla", 36, ElementType::F64, 3),
    Field::new("hMSL", 60, ElementType::F32),
    Field::new("hAcc", 64, ElementType::F32),
    Field::new("vAcc", 68, ElementType::F32),
    Field::new("pDop", 72, ElementType::F32),
    Field::new("cnoMean", 76, ElementType::F32),
    Field::new("towOffset", 80, ElementType::F64),
    Field::new("leapS", 88, ElementType::U8),
];

pub static MAGNETOMETER_FIELDS: &[Field] = &[
    Field::new("time", 0, ElementType::F64),
    Field::array("mag", 8, ElementType::F32, 3),
];

pub static BAROMETER_FIELDS: &[Field] = &[
    Field::new("time", 0, ElementType::F64),
    Field::new("bar", 8, ElementType::F32),
    Field::new("mslBar", 12, ElementType::F32),
    Field::new("barTemp", 16, ElementType::F32),
    Field::new("humidity", 20, ElementType::F32),
];
