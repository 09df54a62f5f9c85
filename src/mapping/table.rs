use super::{ElementType, Field, TableError};
use log::trace;
use std::collections::HashMap;

/// Descriptor table of one record type
///
/// Fields are kept in insertion order, which is also the display order. A
/// table can only be created through [`TableBuilder::build()`], which
/// validates the layout, and is read-only afterwards.
#[derive(Debug, Clone)]
pub struct RecordTable {
    name: &'static str,
    size: usize,
    fields: Vec<Field>,
    index: HashMap<&'static str, usize>,
}

impl RecordTable {
    /// Creates a [`TableBuilder`] for a record of `size` bytes.
    pub fn builder(name: &'static str, size: usize) -> TableBuilder {
        TableBuilder::new(name, size)
    }

    /// Gets the record name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Gets the record size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Gets all fields in insertion order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Looks up a field by its exact name.
    pub fn lookup(&self, name: &str) -> Option<&Field> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    /// Resolves a key to a field.
    ///
    /// Besides plain names, `name[i]` addresses element `i` of an array field.
    pub fn resolve(&self, key: &str) -> Option<Field> {
        if let Some(field) = self.lookup(key) {
            return Some(*field);
        }
        let (name, rest) = key.split_once('[')?;
        let index = rest.strip_suffix(']')?.trim().parse::<usize>().ok()?;
        let field = self.lookup(name.trim())?;
        if !field.is_array() {
            return None;
        }
        field.element(index)
    }

    /// Gets column names with array fields expanded as `name[i]`.
    pub fn columns(&self) -> Vec<String> {
        self.fields
            .iter()
            .flat_map(|field| {
                let name = field.name();
                match field.is_array() {
                    false => vec![name.to_string()],
                    true => (0..field.count())
                        .map(|i| format!("{}[{}]", name, i))
                        .collect(),
                }
            })
            .collect()
    }
}

/// [`RecordTable`] builder
///
/// A builder can be created by any of
///
/// * [`RecordTable::builder()`]
/// * [`TableBuilder::new()`].
#[derive(Debug, Clone)]
pub struct TableBuilder {
    name: &'static str,
    size: usize,
    fields: Vec<Field>,
}

impl TableBuilder {
    /// Creates a builder for a record of `size` bytes.
    pub fn new(name: &'static str, size: usize) -> Self {
        Self {
            name,
            size,
            fields: Vec::new(),
        }
    }

    /// Appends a field.
    pub fn field(&mut self, field: Field) -> &mut Self {
        self.fields.push(field);
        self
    }

    /// Appends fields in order.
    pub fn fields(&mut self, fields: &[Field]) -> &mut Self {
        self.fields.extend_from_slice(fields);
        self
    }

    /// Validates the layout and builds a [`RecordTable`].
    pub fn build(self) -> Result<RecordTable, TableError> {
        let table = self.name;
        let mut index = HashMap::with_capacity(self.fields.len());

        for (i, field) in self.fields.iter().enumerate() {
            let name = field.name();
            if field.count() == 0 {
                return Err(TableError::Empty { table, field: name });
            }
            if let Some(reason) = field.element_type().defect() {
                return Err(TableError::Unsupported {
                    table,
                    field: name,
                    reason,
                });
            }
            if matches!(field.element_type(), ElementType::String(..)) && field.is_array() {
                return Err(TableError::Unsupported {
                    table,
                    field: name,
                    reason: "string arrays",
                });
            }
            let end = field.end().unwrap_or(usize::MAX);
            if end > self.size {
                return Err(TableError::OutOfBounds {
                    table,
                    field: name,
                    end,
                    size: self.size,
                });
            }
            if index.insert(name, i).is_some() {
                return Err(TableError::Duplicate { table, field: name });
            }
        }

        let mut by_offset = self.fields.iter().collect::<Vec<_>>();
        by_offset.sort_by_key(|field| field.offset());
        for pair in by_offset.windows(2) {
            let (first, second) = (pair[0], pair[1]);
            if first.range().end > second.offset() {
                return Err(TableError::Overlap {
                    table,
                    first: first.name(),
                    second: second.name(),
                });
            }
        }

        trace!(
            "built table {} ({} bytes, {} fields)",
            self.name,
            self.size,
            self.fields.len()
        );
        Ok(RecordTable {
            name: self.name,
            size: self.size,
            fields: self.fields,
            index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{EnumDef, IntWidth};

    fn build(size: usize, fields: &[Field]) -> Result<RecordTable, TableError> {
        let mut builder = RecordTable::builder("test", size);
        builder.fields(fields);
        builder.build()
    }

    #[test]
    fn keeps_insertion_order() {
        let table = build(
            16,
            &[
                Field::new("b", 8, ElementType::U64),
                Field::new("a", 0, ElementType::U32),
                Field::new("c", 4, ElementType::F32),
            ],
        )
        .unwrap();
        let names = table.fields().iter().map(|f| f.name()).collect::<Vec<_>>();
        assert_eq!(names, ["b", "a", "c"]);
        assert_eq!(table.lookup("c").unwrap().offset(), 4);
        assert!(table.lookup("d").is_none());
    }

    #[test]
    fn rejects_duplicates() {
        let err = build(
            8,
            &[
                Field::new("a", 0, ElementType::U32),
                Field::new("a", 4, ElementType::U32),
            ],
        )
        .unwrap_err();
        assert_eq!(
            err,
            TableError::Duplicate {
                table: "test",
                field: "a"
            }
        );
    }

    #[test]
    fn rejects_out_of_bounds() {
        let err = build(8, &[Field::array("a", 0, ElementType::U32, 3)]).unwrap_err();
        assert!(matches!(err, TableError::OutOfBounds { end: 12, size: 8, .. }));
    }

    #[test]
    fn rejects_overlap() {
        let err = build(
            8,
            &[
                Field::new("a", 0, ElementType::U32),
                Field::new("b", 2, ElementType::U16),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, TableError::Overlap { first: "a", second: "b", .. }));
    }

    #[test]
    fn rejects_bad_types() {
        assert!(matches!(
            build(8, &[Field::array("s", 0, ElementType::String(4), 2)]),
            Err(TableError::Unsupported { reason: "string arrays", .. })
        ));
        assert!(matches!(
            build(8, &[Field::new("s", 0, ElementType::String(0))]),
            Err(TableError::Unsupported { .. })
        ));
        assert!(matches!(
            build(8, &[Field::array("e", 0, ElementType::U8, 0)]),
            Err(TableError::Empty { .. })
        ));

        const EMPTY: EnumDef = EnumDef {
            name: "Empty",
            width: IntWidth::W8,
            variants: &[],
        };
        assert!(matches!(
            build(8, &[Field::new("e", 0, ElementType::Enum(&EMPTY))]),
            Err(TableError::Unsupported { .. })
        ));
    }

    #[test]
    fn allows_gaps() {
        let table = build(
            16,
            &[
                Field::new("a", 0, ElementType::U8),
                Field::new("b", 8, ElementType::U64),
            ],
        )
        .unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn resolves_indexed_keys() {
        let table = build(
            16,
            &[
                Field::array("v", 0, ElementType::F32, 3),
                Field::new("n", 12, ElementType::U32),
            ],
        )
        .unwrap();
        assert_eq!(table.resolve("v[2]").unwrap().offset(), 8);
        assert_eq!(table.resolve("n").unwrap().offset(), 12);
        assert!(table.resolve("v[3]").is_none());
        assert!(table.resolve("n[0]").is_none());
        assert!(table.resolve("v[x]").is_none());
        assert_eq!(table.columns(), ["v[0]", "v[1]", "v[2]", "n"]);
    }
}
