//! Built-in record layouts.

mod flash;
mod nav;

pub use flash::{DYNAMIC_MODEL, FLASH_CONFIG_FIELDS, FlashConfig};
pub use nav::{
    BAROMETER_FIELDS, DEV_INFO_FIELDS, GPS1_POS_FIELDS, INS_1_FIELDS, INS_2_FIELDS,
    MAGNETOMETER_FIELDS,
};

use crate::mapping::{DataId, Field, RecordTable, Registry, TableError};
use std::sync::LazyLock;

static REGISTRY: LazyLock<Registry> = LazyLock::new(|| match build() {
    Ok(registry) => registry,
    Err(e) => panic!("invalid built-in record layout: {}", e),
});

fn table(name: &'static str, size: usize, fields: &[Field]) -> Result<RecordTable, TableError> {
    let mut builder = RecordTable::builder(name, size);
    builder.fields(fields);
    builder.build()
}

/// Builds a registry holding every built-in record layout.
pub fn build() -> Result<Registry, TableError> {
    let mut registry = Registry::new();
    registry
        .register(DataId::DEV_INFO, table("devInfo", nav::DEV_INFO_SIZE, DEV_INFO_FIELDS)?)?
        .register(DataId::INS_1, table("ins1", nav::INS_1_SIZE, INS_1_FIELDS)?)?
        .register(DataId::INS_2, table("ins2", nav::INS_2_SIZE, INS_2_FIELDS)?)?
        .register(
            DataId::FLASH_CONFIG,
            table("flashConfig", FlashConfig::SIZE, FLASH_CONFIG_FIELDS)?,
        )?
        .register(DataId::GPS1_POS, table("gps1Pos", nav::GPS1_POS_SIZE, GPS1_POS_FIELDS)?)?
        .register(
            DataId::MAGNETOMETER,
            table("magnetometer", nav::MAGNETOMETER_SIZE, MAGNETOMETER_FIELDS)?,
        )?
        .register(
            DataId::BAROMETER,
            table("barometer", nav::BAROMETER_SIZE, BAROMETER_FIELDS)?,
        )?;
    Ok(registry)
}

/// Gets the process-wide registry of built-in record layouts.
///
/// Built on first use. A defective built-in layout aborts the process.
pub fn registry() -> &'static Registry {
    &REGISTRY
}
