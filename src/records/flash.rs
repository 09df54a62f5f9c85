use crate::mapping::{ElementType, EnumDef, Field, IntWidth};
use binrw::io::Cursor;
use binrw::{BinRead, BinWrite, binrw};

/// INS dynamic model.
pub static DYNAMIC_MODEL: EnumDef = EnumDef {
    name: "DynamicModel",
    width: IntWidth::W8,
    variants: &[
        ("portable", 0),
        ("stationary", 2),
        ("pedestrian", 3),
        ("automotive", 4),
        ("sea", 5),
        ("air1g", 6),
        ("air2g", 7),
        ("air4g", 8),
        ("wrist", 9),
    ],
};

const BITS32: ElementType = ElementType::Bitfield(IntWidth::W32);

/// Field layout of [`FlashConfig`].
pub static FLASH_CONFIG_FIELDS: &[Field] = &[
    Field::new("size", 0, ElementType::U32),
    Field::new("checksum", 4, ElementType::U32),
    Field::new("key", 8, ElementType::U32),
    Field::new("startupImuDtMs", 12, ElementType::U32),
    Field::new("startupNavDtMs", 16, ElementType::U32),
    Field::new("ser0BaudRate", 20, ElementType::U32),
    Field::new("ser1BaudRate", 24, ElementType::U32),
    Field::array("insRotation", 28, ElementType::F32, 3),
    Field::array("insOffset", 40, ElementType::F32, 3),
    Field::array("gps1AntOffset", 52, ElementType::F32, 3),
    Field::new("insDynModel", 64, ElementType::Enum(&DYNAMIC_MODEL)),
    Field::new("debug", 65, ElementType::U8),
    Field::new("sysCfgBits", 68, BITS32),
    Field::array("refLla", 72, ElementType::F64, 3),
    Field::array("lastLla", 96, ElementType::F64, 3),
    Field::new("lastLlaTimeOfWeekMs", 120, ElementType::U32),
    Field::new("lastLlaWeek", 124, ElementType::U32),
    Field::new("lastLlaUpdateDistance", 128, ElementType::F32),
    Field::new("ioConfig", 132, BITS32),
    Field::new("platform", 136, ElementType::U32),
    Field::array("gps2AntOffset", 140, ElementType::F32, 3),
    Field::array("zeroVelRotation", 152, ElementType::F32, 3),
    Field::array("zeroVelOffset", 164, ElementType::F32, 3),
    Field::new("magInclination", 176, ElementType::F32),
    Field::new("magDeclination", 180, ElementType::F32),
    Field::new("gpsTimeSyncPeriodMs", 184, ElementType::U32),
    Field::new("startupGPSDtMs", 188, ElementType::U32),
    Field::new("RTKCfgBits", 192, BITS32),
    Field::new("sensorConfig", 196, BITS32),
    Field::new("gpsMinimumElevation", 200, ElementType::F32),
    Field::new("ser2BaudRate", 204, ElementType::U32),
];

/// Flash configuration record
///
/// Non-volatile settings of the device, stored little-endian in the layout
/// described by [`FLASH_CONFIG_FIELDS`].
#[binrw]
#[derive(Debug, Clone, PartialEq)]
#[brw(little)]
pub struct FlashConfig {
    pub size: u32,
    pub checksum: u32,
    pub key: u32,
    pub startup_imu_dt_ms: u32,
    pub startup_nav_dt_ms: u32,
    pub ser0_baud_rate: u32,
    pub ser1_baud_rate: u32,
    pub ins_rotation: [f32; 3],
    pub ins_offset: [f32; 3],
    pub gps1_ant_offset: [f32; 3],
    pub ins_dyn_model: u8,
    pub debug: u8,
    #[br(temp)]
    #[bw(calc = 0)]
    reserved: u16,
    pub sys_cfg_bits: u32,
    pub ref_lla: [f64; 3],
    pub last_lla: [f64; 3],
    pub last_lla_time_of_week_ms: u32,
    pub last_lla_week: u32,
    pub last_lla_update_distance: f32,
    pub io_config: u32,
    pub platform: u32,
    pub gps2_ant_offset: [f32; 3],
    pub zero_vel_rotation: [f32; 3],
    pub zero_vel_offset: [f32; 3],
    pub mag_inclination: f32,
    pub mag_declination: f32,
    pub gps_time_sync_period_ms: u32,
    pub startup_gps_dt_ms: u32,
    pub rtk_cfg_bits: u32,
    pub sensor_config: u32,
    pub gps_minimum_elevation: f32,
    pub ser2_baud_rate: u32,
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self {
            size: Self::SIZE as u32,
            checksum: 0,
            key: 0,
            startup_imu_dt_ms: 1,
            startup_nav_dt_ms: 4,
            ser0_baud_rate: 921_600,
            ser1_baud_rate: 921_600,
            ins_rotation: [0.0; 3],
            ins_offset: [0.0; 3],
            gps1_ant_offset: [0.0; 3],
            ins_dyn_model: 8,
            debug: 0,
            sys_cfg_bits: 0,
            ref_lla: [0.0; 3],
            last_lla: [0.0; 3],
            last_lla_time_of_week_ms: 0,
            last_lla_week: 0,
            last_lla_update_distance: 1000.0,
            io_config: 0,
            platform: 0,
            gps2_ant_offset: [0.0; 3],
            zero_vel_rotation: [0.0; 3],
            zero_vel_offset: [0.0; 3],
            mag_inclination: 0.0,
            mag_declination: 0.0,
            gps_time_sync_period_ms: 1000,
            startup_gps_dt_ms: 200,
            rtk_cfg_bits: 0,
            sensor_config: 0,
            gps_minimum_elevation: 0.261_799,
            ser2_baud_rate: 921_600,
        }
    }
}

impl FlashConfig {
    /// Record size in bytes.
    pub const SIZE: usize = 208;

    /// Decodes a raw flash configuration record.
    pub fn from_bytes(bytes: &[u8]) -> binrw::BinResult<Self> {
        Self::read(&mut Cursor::new(bytes))
    }

    /// Encodes into a raw flash configuration record.
    pub fn to_bytes(&self) -> binrw::BinResult<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::with_capacity(Self::SIZE));
        self.write(&mut cursor)?;
        Ok(cursor.into_inner())
    }
}
