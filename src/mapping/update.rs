//! Key/value update batches.
//!
//! An update string looks like `key1=value1|key2=value2`. Processing goes
//! through three steps: [`Batch::parse()`] splits the text into pairs,
//! [`Batch::apply()`] writes every pair into a private copy of the record and
//! the resulting [`Update`] is handed back for the caller to commit.
//!
//! There is no escaping: values cannot contain `|` or `=`.

use super::{Error, RecordTable, Result, codec};
use log::{debug, warn};

/// Separates pairs of a batch.
pub const PAIR_DELIMITER: char = '|';

/// Separates the key from the value of a pair.
pub const KEY_VALUE_DELIMITER: char = '=';

/// One `key=value` pair of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Pair {
    pub key: String,
    pub value: String,
}

impl std::fmt::Display for Pair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.key, KEY_VALUE_DELIMITER, self.value)
    }
}

/// Rendered field of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Entry {
    pub name: &'static str,
    pub value: String,
}

impl std::fmt::Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", self.name, self.value)
    }
}

/// Parsed update batch
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pairs: Vec<Pair>,
    diagnostics: Vec<Error>,
}

impl Batch {
    /// Splits an update string into pairs.
    ///
    /// Blank segments are skipped. Segments without exactly one `=` or with
    /// an empty key are dropped with a [`Error::MalformedPair`] diagnostic.
    /// Keys are trimmed; values are kept as written and numeric fields
    /// trim them when parsing.
    /// Fails with [`Error::EmptyOrMalformedBatch`] when no pair survives.
    pub fn parse(input: &str) -> Result<Self> {
        let mut batch = Self::default();
        for segment in input.split(PAIR_DELIMITER) {
            if segment.trim().is_empty() {
                continue;
            }
            let mut parts = segment.split(KEY_VALUE_DELIMITER);
            match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(value), None) if !key.trim().is_empty() => {
                    batch.pairs.push(Pair {
                        key: key.trim().to_string(),
                        value: value.to_string(),
                    });
                }
                _ => {
                    let segment = segment.trim();
                    warn!("ignoring malformed pair `{}`", segment);
                    batch
                        .diagnostics
                        .push(Error::MalformedPair(segment.to_string()));
                }
            }
        }
        if batch.pairs.is_empty() {
            return Err(Error::EmptyOrMalformedBatch);
        }
        Ok(batch)
    }

    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    /// Diagnostics collected while splitting.
    pub fn diagnostics(&self) -> &[Error] {
        &self.diagnostics
    }

    /// Applies every pair to a copy of `record`.
    ///
    /// Unknown keys and rejected values become diagnostics; the remaining
    /// pairs are still applied. `record` itself is never modified.
    pub fn apply(self, table: &RecordTable, record: &[u8]) -> Result<Update> {
        check_size(table, record)?;
        let mut update = Update {
            record: record.to_vec(),
            applied: Vec::new(),
            diagnostics: self.diagnostics,
        };
        for pair in self.pairs {
            let Some(field) = table.resolve(&pair.key) else {
                warn!("unrecognized {} key `{}`, ignoring", table.name(), pair.key);
                update.diagnostics.push(Error::UnknownKey(pair.key));
                continue;
            };
            match codec::parse(&field, &pair.value, &mut update.record) {
                Ok(()) => {
                    debug!("updated {} key `{}` to `{}`", table.name(), pair.key, pair.value);
                    update.applied.push(pair);
                }
                Err(e) => {
                    warn!("{}", e);
                    update.diagnostics.push(e);
                }
            }
        }
        Ok(update)
    }
}

/// Result of applying a [`Batch`]
#[derive(Debug, Clone)]
pub struct Update {
    record: Vec<u8>,
    applied: Vec<Pair>,
    diagnostics: Vec<Error>,
}

impl Update {
    /// Gets the updated copy of the record.
    pub fn record(&self) -> &[u8] {
        &self.record
    }

    pub fn into_record(self) -> Vec<u8> {
        self.record
    }

    /// Pairs written into the record, in input order.
    pub fn applied(&self) -> &[Pair] {
        &self.applied
    }

    /// Pairs and values that were rejected.
    pub fn diagnostics(&self) -> &[Error] {
        &self.diagnostics
    }

    /// Checks whether every pair was applied.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Result of [`run()`]
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The input held no update; the record was rendered instead.
    Display(Vec<Entry>),
    Update(Update),
}

fn check_size(table: &RecordTable, record: &[u8]) -> Result<()> {
    if record.len() != table.size() {
        return Err(Error::RecordSize {
            record: table.name(),
            expected: table.size(),
            actual: record.len(),
        });
    }
    Ok(())
}

/// Renders every field of `record` in table order.
pub fn display(table: &RecordTable, record: &[u8]) -> Result<Vec<Entry>> {
    check_size(table, record)?;
    table
        .fields()
        .iter()
        .map(|field| {
            Ok(Entry {
                name: field.name(),
                value: codec::render(field, record)?,
            })
        })
        .collect()
}

/// Displays or updates a record depending on `input`.
///
/// Inputs shorter than two characters cannot hold a pair and select the
/// display path.
pub fn run(table: &RecordTable, record: &[u8], input: &str) -> Result<Outcome> {
    if input.len() < 2 {
        return display(table, record).map(Outcome::Display);
    }
    Batch::parse(input)?.apply(table, record).map(Outcome::Update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{ElementType, Field};

    fn table() -> RecordTable {
        let mut builder = RecordTable::builder("test", 16);
        builder.fields(&[
            Field::new("validKey", 0, ElementType::U32),
            Field::new("name", 4, ElementType::String(8)),
            Field::array("gain", 12, ElementType::I8, 4),
        ]);
        builder.build().unwrap()
    }

    #[test]
    fn splits_pairs() {
        let batch = Batch::parse("a=1| |b = two||c=").unwrap();
        let keys = batch.pairs().iter().map(|p| p.key.as_str()).collect::<Vec<_>>();
        assert_eq!(keys, ["a", "b", "c"]);
        assert_eq!(batch.pairs()[1].value, " two");
        assert_eq!(batch.pairs()[2].value, "");
        assert!(batch.diagnostics().is_empty());
    }

    #[test]
    fn malformed_pairs() {
        let batch = Batch::parse("a=1|noequals|b=2=3|=4").unwrap();
        assert_eq!(batch.pairs().len(), 1);
        assert_eq!(
            batch.diagnostics(),
            [
                Error::MalformedPair("noequals".into()),
                Error::MalformedPair("b=2=3".into()),
                Error::MalformedPair("=4".into()),
            ]
        );
    }

    #[test]
    fn empty_batch_aborts() {
        for input in ["||", "nothing", " | = "] {
            assert_eq!(
                Batch::parse(input).unwrap_err(),
                Error::EmptyOrMalformedBatch,
                "{}",
                input
            );
        }
    }

    #[test]
    fn partial_success() {
        let table = table();
        let record = vec![0u8; 16];
        let outcome = run(&table, &record, "validKey=5|unknownKey=9|badSyntaxNoEquals").unwrap();
        let Outcome::Update(update) = outcome else {
            panic!("expected an update");
        };
        assert_eq!(update.applied().len(), 1);
        assert_eq!(update.diagnostics().len(), 2);
        assert!(
            update
                .diagnostics()
                .contains(&Error::UnknownKey("unknownKey".into()))
        );
        assert!(
            update
                .diagnostics()
                .contains(&Error::MalformedPair("badSyntaxNoEquals".into()))
        );
        assert_eq!(&update.record()[..4], &5u32.to_le_bytes());
        assert!(update.record()[4..].iter().all(|&b| b == 0));
        assert!(record.iter().all(|&b| b == 0));
    }

    #[test]
    fn rejected_value_keeps_other_pairs() {
        let table = table();
        let update = Batch::parse("validKey=-1|name=imu|gain=1,2,3,4")
            .unwrap()
            .apply(&table, &[0u8; 16])
            .unwrap();
        assert_eq!(update.applied().len(), 2);
        assert!(matches!(
            update.diagnostics(),
            [Error::MalformedValue { field: "validKey", .. }]
        ));
        assert_eq!(&update.record()[4..8], b"imu\0");
        assert_eq!(&update.record()[12..], &[1, 2, 3, 4]);
    }

    #[test]
    fn string_values_keep_padding() {
        let table = table();
        let update = Batch::parse("validKey = 7 | name= a  b ")
            .unwrap()
            .apply(&table, &[0u8; 16])
            .unwrap();
        assert!(update.is_clean());
        assert_eq!(&update.record()[..4], &7u32.to_le_bytes());
        assert_eq!(&update.record()[4..12], b" a  b \0\0");
        let entries = display(&table, update.record()).unwrap();
        assert_eq!(entries[1].value, " a  b ");
    }

    #[test]
    fn all_unknown_keys_succeed_without_effect() {
        let table = table();
        let record = [7u8; 16];
        let update = Batch::parse("x=1|y=2").unwrap().apply(&table, &record).unwrap();
        assert!(update.applied().is_empty());
        assert_eq!(update.record(), &record);
    }

    #[test]
    fn indexed_keys() {
        let table = table();
        let update = Batch::parse("gain[2]=-5")
            .unwrap()
            .apply(&table, &[0u8; 16])
            .unwrap();
        assert!(update.is_clean());
        assert_eq!(&update.record()[12..], &[0, 0, 0xfb, 0]);
    }

    #[test]
    fn idempotent() {
        let table = table();
        let input = "validKey=42|name=rover|gain=-1,0,1,2";
        let once = Batch::parse(input)
            .unwrap()
            .apply(&table, &[0u8; 16])
            .unwrap()
            .into_record();
        let twice = Batch::parse(input)
            .unwrap()
            .apply(&table, &once)
            .unwrap()
            .into_record();
        assert_eq!(once, twice);
    }

    #[test]
    fn short_input_displays() {
        let table = table();
        let mut record = vec![0u8; 16];
        record[0] = 3;
        for input in ["", "x"] {
            let Outcome::Display(entries) = run(&table, &record, input).unwrap() else {
                panic!("expected display for `{}`", input);
            };
            assert_eq!(entries.len(), 3);
            assert_eq!(entries[0].to_string(), "validKey = 3");
            assert_eq!(entries[1].to_string(), "name = ");
            assert_eq!(entries[2].to_string(), "gain = 0,0,0,0");
        }
    }

    #[test]
    fn wrong_record_size() {
        let table = table();
        assert!(matches!(
            display(&table, &[0u8; 8]),
            Err(Error::RecordSize { expected: 16, actual: 8, .. })
        ));
    }
}
