use super::{Field, RecordTable, TableError};
use binrw::{BinRead, BinWrite};
use log::debug;
use std::collections::BTreeMap;

/// A wrapper type for record type identifiers.
///
/// Every data set the device produces or accepts is tagged with one of these.
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DataId(u32);

impl DataId {
    pub const DEV_INFO: Self = Self(1);
    pub const INS_1: Self = Self(4);
    pub const INS_2: Self = Self(5);
    pub const FLASH_CONFIG: Self = Self(12);
    pub const GPS1_POS: Self = Self(13);
    pub const MAGNETOMETER: Self = Self(52);
    pub const BAROMETER: Self = Self(53);

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for DataId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            &Self::DEV_INFO => write!(f, "DEV_INFO"),
            &Self::INS_1 => write!(f, "INS_1"),
            &Self::INS_2 => write!(f, "INS_2"),
            &Self::FLASH_CONFIG => write!(f, "FLASH_CONFIG"),
            &Self::GPS1_POS => write!(f, "GPS1_POS"),
            &Self::MAGNETOMETER => write!(f, "MAGNETOMETER"),
            &Self::BAROMETER => write!(f, "BAROMETER"),
            id => write!(f, "DID {}", id.as_u32()),
        }
    }
}

impl From<u32> for DataId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<DataId> for u32 {
    fn from(value: DataId) -> Self {
        value.0
    }
}

/// Record tables keyed by [`DataId`]
#[derive(Debug, Clone, Default)]
pub struct Registry {
    tables: BTreeMap<DataId, RecordTable>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the table of a record type.
    pub fn register(&mut self, id: DataId, table: RecordTable) -> Result<&mut Self, TableError> {
        if self.tables.contains_key(&id) {
            return Err(TableError::DuplicateRecord(id));
        }
        debug!("registered {} as {}", table.name(), id);
        self.tables.insert(id, table);
        Ok(self)
    }

    /// Gets the table of a record type.
    pub fn get(&self, id: DataId) -> Option<&RecordTable> {
        self.tables.get(&id)
    }

    /// Looks up a field of a record type.
    pub fn lookup(&self, id: DataId, name: &str) -> Option<&Field> {
        self.get(id)?.lookup(name)
    }

    /// Finds a record type by table name, ignoring ASCII case.
    pub fn find(&self, name: &str) -> Option<(DataId, &RecordTable)> {
        self.iter()
            .find(|(_, table)| table.name().eq_ignore_ascii_case(name))
    }

    /// Iterates over all record types by ascending id.
    pub fn iter(&self) -> impl Iterator<Item = (DataId, &RecordTable)> {
        self.tables.iter().map(|(id, table)| (*id, table))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::ElementType;

    fn table(name: &'static str) -> RecordTable {
        let mut builder = RecordTable::builder(name, 4);
        builder.field(Field::new("value", 0, ElementType::U32));
        builder.build().unwrap()
    }

    #[test]
    fn lookup_by_id_and_name() {
        let mut registry = Registry::new();
        registry.register(DataId::new(100), table("first")).unwrap();
        registry.register(DataId::new(7), table("second")).unwrap();

        assert!(registry.lookup(DataId::new(7), "value").is_some());
        assert!(registry.lookup(DataId::new(7), "other").is_none());
        assert!(registry.lookup(DataId::new(8), "value").is_none());
        assert_eq!(registry.find("SECOND").unwrap().0, DataId::new(7));

        let ids = registry.iter().map(|(id, _)| id.as_u32()).collect::<Vec<_>>();
        assert_eq!(ids, [7, 100]);
    }

    #[test]
    fn rejects_duplicate_record() {
        let mut registry = Registry::new();
        registry.register(DataId::FLASH_CONFIG, table("a")).unwrap();
        let err = registry
            .register(DataId::FLASH_CONFIG, table("b"))
            .unwrap_err();
        assert_eq!(err, TableError::DuplicateRecord(DataId::FLASH_CONFIG));
    }

    #[test]
    fn data_id_names() {
        assert_eq!(DataId::FLASH_CONFIG.to_string(), "FLASH_CONFIG");
        assert_eq!(DataId::new(99).to_string(), "DID 99");
    }
}
