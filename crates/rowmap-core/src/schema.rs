//! Column schema resolution against a target type.

use smol_str::SmolStr;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{Result, RowMapError};
use crate::materialize::FromRow;
use crate::options::MapOptions;
use crate::row::ColumnDescriptor;
use crate::shape::Shape;

/// Lowercased column name to column descriptor, filtered to what the target type consumes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchemaMapping {
    columns: HashMap<SmolStr, ColumnDescriptor>,
}

impl SchemaMapping {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the mapping `T` needs from a cursor's column schema.
    ///
    /// Column names are matched ignoring case; when two columns collide the
    /// later one wins. Composite targets keep only columns that back one of
    /// their fields.
    pub fn resolve<T: FromRow>(columns: &[ColumnDescriptor], options: &MapOptions) -> Result<Self> {
        let mapping = match T::SHAPE {
            Shape::Simple => Self::empty(),
            Shape::Tuple => Self::from_columns(columns.iter().cloned()),
            Shape::Composite => {
                let Some(model) = T::model() else {
                    return Ok(Self::empty());
                };
                let wanted = columns.iter().filter(|c| {
                    let key = c.name.to_lowercase();
                    model.fields.iter().any(|f| f.column == key.as_str())
                });
                let mapping = Self::from_columns(wanted.cloned());

                if options.strict {
                    if let Some(field) = model.fields.iter().find(|f| !mapping.contains_key(&f.column)) {
                        return Err(RowMapError::UnmappedField {
                            field: field.name.to_string(),
                        });
                    }
                }
                mapping
            }
        };

        debug!(
            target_type = std::any::type_name::<T>(),
            shape = ?T::SHAPE,
            columns = columns.len(),
            mapped = mapping.len(),
            "resolved column schema"
        );
        Ok(mapping)
    }

    fn from_columns(columns: impl Iterator<Item = ColumnDescriptor>) -> Self {
        let mut map = HashMap::new();
        for column in columns {
            map.insert(SmolStr::new(column.name.to_lowercase()), column);
        }
        Self { columns: map }
    }

    pub fn get(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.get(name.to_lowercase().as_str())
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnDescriptor)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }
}
