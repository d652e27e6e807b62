use csv::StringRecord;

use crate::errors::ParserError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    Named(&'static str),
    At {
        index: usize,
        header: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub locator: Locator,
}

impl FieldSpec {
    pub const fn named(key: &'static str, header: &'static str) -> Self {
        Self {
            key,
            locator: Locator::Named(header),
        }
    }

    pub const fn at(key: &'static str, index: usize, header: &'static str) -> Self {
        Self {
            key,
            locator: Locator::At { index, header },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaDescriptor {
    pub id: &'static str,
    pub version: u32,
    pub description: &'static str,
    pub fields: &'static [FieldSpec],
}

impl SchemaDescriptor {
    pub fn resolve(
        &'static self,
        reader: &'static str,
        header: &StringRecord,
    ) -> Result<ResolvedSchema, ParserError> {
        let mut indices = Vec::with_capacity(self.fields.len());
        for field in self.fields {
            let index = match field.locator {
                Locator::Named(label) => header
                    .iter()
                    .position(|column| labels_match(column, label))
                    .ok_or_else(|| ParserError::ColumnShape {
                        reader,
                        schema: self.id,
                        reason: format!("missing column '{label}' for field {}", field.key),
                    })?,
                Locator::At { index, header: label } => {
                    let found = header.get(index).ok_or_else(|| ParserError::ColumnShape {
                        reader,
                        schema: self.id,
                        reason: format!(
                            "expected column '{label}' at offset {index}, header has {} columns",
                            header.len()
                        ),
                    })?;
                    if !labels_match(found, label) {
                        return Err(ParserError::ColumnShape {
                            reader,
                            schema: self.id,
                            reason: format!(
                                "expected column '{label}' at offset {index}, found '{}'",
                                found.trim()
                            ),
                        });
                    }
                    index
                }
            };
            indices.push(index);
        }

        let width = indices.iter().map(|index| index + 1).max().unwrap_or(0);
        Ok(ResolvedSchema {
            descriptor: self,
            indices,
            width,
        })
    }
}

fn labels_match(found: &str, expected: &str) -> bool {
    found.trim().eq_ignore_ascii_case(expected.trim())
}

#[derive(Debug, Clone)]
pub struct ResolvedSchema {
    pub descriptor: &'static SchemaDescriptor,
    indices: Vec<usize>,
    width: usize,
}

impl ResolvedSchema {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn value<'r>(&self, record: &'r StringRecord, field: usize) -> &'r str {
        self.indices
            .get(field)
            .and_then(|index| record.get(*index))
            .unwrap_or_default()
    }
}
