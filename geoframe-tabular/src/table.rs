//! Columnar attribute table.
//!
//! `Table` stores attribute data in typed column vectors with schema
//! information. It deliberately covers only what the spatial engines need:
//! row selection by index (with a `-1` null-padding sentinel for outer
//! joins), column renaming for suffix disambiguation, and horizontal /
//! vertical concatenation.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Result, TableError};

/// Attribute field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Bool,
    Int,
    Float,
    Str,
    Bytes,
}

/// Field information for one table column.
#[derive(Debug, Clone)]
pub struct Field {
    /// Column name - canonical identifier for lookups.
    pub name: String,
    /// Field type.
    pub field_type: FieldType,
    /// Whether the field allows nulls.
    pub nullable: bool,
}

impl Field {
    /// Convenience constructor for a nullable field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: true,
        }
    }
}

/// Schema for an attribute table.
#[derive(Debug, Clone)]
pub struct TableSchema {
    /// Field definitions in column order.
    pub fields: Vec<Field>,
    /// Canonical lookup by name.
    name_to_index: HashMap<String, usize>,
}

impl TableSchema {
    /// Create a new schema from field definitions.
    ///
    /// Duplicate column names are rejected.
    pub fn new(fields: Vec<Field>) -> Result<Self> {
        let mut name_to_index = HashMap::with_capacity(fields.len());
        for (i, f) in fields.iter().enumerate() {
            if name_to_index.insert(f.name.clone(), i).is_some() {
                return Err(TableError::Schema(format!(
                    "duplicate column name: {}",
                    f.name
                )));
            }
        }
        Ok(Self {
            fields,
            name_to_index,
        })
    }

    /// Get field index by name.
    #[inline]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// Get field info by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.index_of(name).map(|i| &self.fields[i])
    }

    /// Whether the schema contains a column with this name.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.name_to_index.contains_key(name)
    }

    /// Number of fields in the schema.
    #[inline]
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// Column names in schema order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// Column storage - typed arrays with optional values (nullable).
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Bool(Vec<Option<bool>>),
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Str(Vec<Option<String>>),
    Bytes(Vec<Option<Vec<u8>>>),
}

impl Column {
    /// Create an empty column of the given type.
    pub fn empty(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Bool => Self::Bool(Vec::new()),
            FieldType::Int => Self::Int(Vec::new()),
            FieldType::Float => Self::Float(Vec::new()),
            FieldType::Str => Self::Str(Vec::new()),
            FieldType::Bytes => Self::Bytes(Vec::new()),
        }
    }

    /// Get the number of rows in this column.
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Self::Bool(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Str(v) => v.len(),
            Self::Bytes(v) => v.len(),
        }
    }

    /// Check if the column has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the field type of this column.
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Bool(_) => FieldType::Bool,
            Self::Int(_) => FieldType::Int,
            Self::Float(_) => FieldType::Float,
            Self::Str(_) => FieldType::Str,
            Self::Bytes(_) => FieldType::Bytes,
        }
    }

    /// Check if the value at index is null.
    #[inline]
    pub fn is_null(&self, idx: usize) -> bool {
        match self {
            Self::Bool(v) => v.get(idx).map_or(true, |v| v.is_none()),
            Self::Int(v) => v.get(idx).map_or(true, |v| v.is_none()),
            Self::Float(v) => v.get(idx).map_or(true, |v| v.is_none()),
            Self::Str(v) => v.get(idx).map_or(true, |v| v.is_none()),
            Self::Bytes(v) => v.get(idx).map_or(true, |v| v.is_none()),
        }
    }

    /// Get bool value at index (None if wrong type or null).
    #[inline]
    pub fn get_bool(&self, idx: usize) -> Option<bool> {
        match self {
            Self::Bool(v) => v.get(idx).and_then(|v| *v),
            _ => None,
        }
    }

    /// Get i64 value at index (None if wrong type or null).
    #[inline]
    pub fn get_int(&self, idx: usize) -> Option<i64> {
        match self {
            Self::Int(v) => v.get(idx).and_then(|v| *v),
            _ => None,
        }
    }

    /// Get f64 value at index (None if wrong type or null).
    #[inline]
    pub fn get_float(&self, idx: usize) -> Option<f64> {
        match self {
            Self::Float(v) => v.get(idx).and_then(|v| *v),
            _ => None,
        }
    }

    /// Get string value at index (None if wrong type or null).
    #[inline]
    pub fn get_str(&self, idx: usize) -> Option<&str> {
        match self {
            Self::Str(v) => v.get(idx).and_then(|v| v.as_deref()),
            _ => None,
        }
    }

    /// Get bytes value at index (None if wrong type or null).
    #[inline]
    pub fn get_bytes(&self, idx: usize) -> Option<&[u8]> {
        match self {
            Self::Bytes(v) => v.get(idx).and_then(|v| v.as_deref()),
            _ => None,
        }
    }

    /// Compare the value at `i` with the value of `other` at `j`.
    ///
    /// Used by attribute-restricted joins. Nulls never compare equal, and
    /// columns of different types never compare equal.
    pub fn value_eq(&self, i: usize, other: &Column, j: usize) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => match (a.get(i), b.get(j)) {
                (Some(Some(x)), Some(Some(y))) => x == y,
                _ => false,
            },
            (Self::Int(a), Self::Int(b)) => match (a.get(i), b.get(j)) {
                (Some(Some(x)), Some(Some(y))) => x == y,
                _ => false,
            },
            (Self::Float(a), Self::Float(b)) => match (a.get(i), b.get(j)) {
                (Some(Some(x)), Some(Some(y))) => x == y,
                _ => false,
            },
            (Self::Str(a), Self::Str(b)) => match (a.get(i), b.get(j)) {
                (Some(Some(x)), Some(Some(y))) => x == y,
                _ => false,
            },
            (Self::Bytes(a), Self::Bytes(b)) => match (a.get(i), b.get(j)) {
                (Some(Some(x)), Some(Some(y))) => x == y,
                _ => false,
            },
            _ => false,
        }
    }

    /// Select rows by index, returning a new column with only those rows.
    pub fn filter_by_indices(&self, indices: &[usize]) -> Self {
        match self {
            Self::Bool(v) => Self::Bool(indices.iter().map(|&i| v[i]).collect()),
            Self::Int(v) => Self::Int(indices.iter().map(|&i| v[i]).collect()),
            Self::Float(v) => Self::Float(indices.iter().map(|&i| v[i]).collect()),
            Self::Str(v) => Self::Str(indices.iter().map(|&i| v[i].clone()).collect()),
            Self::Bytes(v) => Self::Bytes(indices.iter().map(|&i| v[i].clone()).collect()),
        }
    }

    /// Select rows by signed index, where `-1` yields a null slot.
    ///
    /// This is the outer-join row gather: unmatched rows come through as
    /// nulls rather than being dropped.
    pub fn take_padded(&self, indices: &[i64]) -> Self {
        fn gather<T: Clone>(v: &[Option<T>], indices: &[i64]) -> Vec<Option<T>> {
            indices
                .iter()
                .map(|&i| {
                    if i < 0 {
                        None
                    } else {
                        v[i as usize].clone()
                    }
                })
                .collect()
        }
        match self {
            Self::Bool(v) => Self::Bool(gather(v, indices)),
            Self::Int(v) => Self::Int(gather(v, indices)),
            Self::Float(v) => Self::Float(gather(v, indices)),
            Self::Str(v) => Self::Str(gather(v, indices)),
            Self::Bytes(v) => Self::Bytes(gather(v, indices)),
        }
    }

    /// Merge two equal-length columns, keeping the first non-null value per
    /// row. Types must match.
    pub fn coalesce(&self, other: &Column) -> Result<Self> {
        fn merge<T: Clone>(a: &[Option<T>], b: &[Option<T>]) -> Vec<Option<T>> {
            a.iter()
                .zip(b)
                .map(|(x, y)| x.clone().or_else(|| y.clone()))
                .collect()
        }
        if self.len() != other.len() {
            return Err(TableError::Schema(format!(
                "coalesce row count mismatch: {} vs {}",
                self.len(),
                other.len()
            )));
        }
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => Ok(Self::Bool(merge(a, b))),
            (Self::Int(a), Self::Int(b)) => Ok(Self::Int(merge(a, b))),
            (Self::Float(a), Self::Float(b)) => Ok(Self::Float(merge(a, b))),
            (Self::Str(a), Self::Str(b)) => Ok(Self::Str(merge(a, b))),
            (Self::Bytes(a), Self::Bytes(b)) => Ok(Self::Bytes(merge(a, b))),
            (a, b) => Err(TableError::Schema(format!(
                "cannot coalesce {:?} column with {:?} column",
                a.field_type(),
                b.field_type()
            ))),
        }
    }

    /// Append all rows of `other` to this column. Types must match.
    pub fn concat(&mut self, other: &Column) -> Result<()> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.extend(b.iter().cloned()),
            (Self::Int(a), Self::Int(b)) => a.extend(b.iter().cloned()),
            (Self::Float(a), Self::Float(b)) => a.extend(b.iter().cloned()),
            (Self::Str(a), Self::Str(b)) => a.extend(b.iter().cloned()),
            (Self::Bytes(a), Self::Bytes(b)) => a.extend(b.iter().cloned()),
            (a, b) => {
                return Err(TableError::Schema(format!(
                    "cannot concat {:?} column with {:?} column",
                    a.field_type(),
                    b.field_type()
                )))
            }
        }
        Ok(())
    }
}

/// Columnar attribute table.
#[derive(Debug, Clone)]
pub struct Table {
    /// Schema for this table.
    pub schema: Arc<TableSchema>,
    /// Column data in schema order.
    pub columns: Vec<Column>,
    /// Number of rows.
    pub num_rows: usize,
}

impl Table {
    /// Create a new table, validating column count and row counts.
    pub fn new(schema: Arc<TableSchema>, columns: Vec<Column>) -> Result<Self> {
        if columns.len() != schema.num_fields() {
            return Err(TableError::Schema(format!(
                "column count mismatch: schema has {} fields, got {} columns",
                schema.num_fields(),
                columns.len()
            )));
        }

        let num_rows = columns.first().map_or(0, |c| c.len());
        for (i, col) in columns.iter().enumerate() {
            if col.len() != num_rows {
                return Err(TableError::Schema(format!(
                    "row count mismatch: column {} has {} rows, expected {}",
                    i,
                    col.len(),
                    num_rows
                )));
            }
            if col.field_type() != schema.fields[i].field_type {
                return Err(TableError::Schema(format!(
                    "type mismatch for column {}: expected {:?}, got {:?}",
                    schema.fields[i].name,
                    schema.fields[i].field_type,
                    col.field_type()
                )));
            }
        }

        Ok(Self {
            schema,
            columns,
            num_rows,
        })
    }

    /// Create an empty table with zero columns and `num_rows` rows.
    pub fn empty(num_rows: usize) -> Self {
        Self {
            schema: Arc::new(TableSchema::new(Vec::new()).expect("empty schema")),
            columns: Vec::new(),
            num_rows,
        }
    }

    /// Get a column by name.
    #[inline]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.schema.index_of(name).map(|i| &self.columns[i])
    }

    /// Check if the table has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    /// Select rows by index, returning a new table with only those rows.
    pub fn filter_by_indices(&self, indices: &[usize]) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|c| c.filter_by_indices(indices))
            .collect();
        Self {
            schema: Arc::clone(&self.schema),
            columns,
            num_rows: indices.len(),
        }
    }

    /// Select rows by signed index, where `-1` yields an all-null row.
    pub fn take_padded(&self, indices: &[i64]) -> Self {
        let columns = self.columns.iter().map(|c| c.take_padded(indices)).collect();
        Self {
            schema: Arc::clone(&self.schema),
            columns,
            num_rows: indices.len(),
        }
    }

    /// Rename columns according to the given old-name to new-name map.
    ///
    /// Names not present in the map are kept. The renamed schema must still
    /// be free of duplicates.
    pub fn rename_columns(&self, renames: &HashMap<String, String>) -> Result<Self> {
        let fields = self
            .schema
            .fields
            .iter()
            .map(|f| Field {
                name: renames.get(&f.name).cloned().unwrap_or_else(|| f.name.clone()),
                field_type: f.field_type,
                nullable: f.nullable,
            })
            .collect();
        let schema = Arc::new(TableSchema::new(fields)?);
        Ok(Self {
            schema,
            columns: self.columns.clone(),
            num_rows: self.num_rows,
        })
    }

    /// Concatenate another table side-by-side. Row counts must match and
    /// column names must not collide.
    pub fn hstack(&self, other: &Table) -> Result<Self> {
        if self.num_rows != other.num_rows {
            return Err(TableError::Schema(format!(
                "hstack row count mismatch: {} vs {}",
                self.num_rows, other.num_rows
            )));
        }
        let mut fields = self.schema.fields.clone();
        fields.extend(other.schema.fields.iter().cloned());
        let schema = Arc::new(TableSchema::new(fields)?);
        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());
        Ok(Self {
            schema,
            columns,
            num_rows: self.num_rows,
        })
    }

    /// Concatenate another table's rows below this one. Schemas must match
    /// by name and type, in order.
    pub fn vstack(&self, other: &Table) -> Result<Self> {
        if self.schema.num_fields() != other.schema.num_fields() {
            return Err(TableError::Schema(format!(
                "vstack column count mismatch: {} vs {}",
                self.schema.num_fields(),
                other.schema.num_fields()
            )));
        }
        for (a, b) in self.schema.fields.iter().zip(other.schema.fields.iter()) {
            if a.name != b.name || a.field_type != b.field_type {
                return Err(TableError::Schema(format!(
                    "vstack schema mismatch at column {}: {:?} vs {:?}",
                    a.name, a.field_type, b.field_type
                )));
            }
        }
        let mut columns = self.columns.clone();
        for (col, other_col) in columns.iter_mut().zip(other.columns.iter()) {
            col.concat(other_col)?;
        }
        Ok(Self {
            schema: Arc::clone(&self.schema),
            columns,
            num_rows: self.num_rows + other.num_rows,
        })
    }

    /// Append a column to the table.
    pub fn push_column(&self, field: Field, column: Column) -> Result<Self> {
        if column.len() != self.num_rows {
            return Err(TableError::Schema(format!(
                "pushed column has {} rows, table has {}",
                column.len(),
                self.num_rows
            )));
        }
        let mut fields = self.schema.fields.clone();
        fields.push(field);
        let schema = Arc::new(TableSchema::new(fields)?);
        let mut columns = self.columns.clone();
        columns.push(column);
        Ok(Self {
            schema,
            columns,
            num_rows: self.num_rows,
        })
    }

    /// Replace a named column's data, keeping its field definition.
    pub fn replace_column(&self, name: &str, column: Column) -> Result<Self> {
        let idx = self
            .schema
            .index_of(name)
            .ok_or_else(|| TableError::ColumnNotFound(name.to_string()))?;
        if column.len() != self.num_rows {
            return Err(TableError::Schema(format!(
                "replacement column has {} rows, table has {}",
                column.len(),
                self.num_rows
            )));
        }
        if column.field_type() != self.schema.fields[idx].field_type {
            return Err(TableError::Schema(format!(
                "type mismatch for column {}: expected {:?}, got {:?}",
                name,
                self.schema.fields[idx].field_type,
                column.field_type()
            )));
        }
        let mut columns = self.columns.clone();
        columns[idx] = column;
        Ok(Self {
            schema: Arc::clone(&self.schema),
            columns,
            num_rows: self.num_rows,
        })
    }

    /// Project to a subset of columns by name.
    pub fn project(&self, names: &[&str]) -> Result<Self> {
        let mut fields = Vec::with_capacity(names.len());
        let mut columns = Vec::with_capacity(names.len());
        for &name in names {
            let idx = self
                .schema
                .index_of(name)
                .ok_or_else(|| TableError::ColumnNotFound(name.to_string()))?;
            fields.push(self.schema.fields[idx].clone());
            columns.push(self.columns[idx].clone());
        }
        let schema = Arc::new(TableSchema::new(fields)?);
        Ok(Self {
            schema,
            columns,
            num_rows: self.num_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        let schema = Arc::new(
            TableSchema::new(vec![
                Field::new("id", FieldType::Int),
                Field::new("name", FieldType::Str),
            ])
            .unwrap(),
        );
        let columns = vec![
            Column::Int(vec![Some(1), Some(2), Some(3)]),
            Column::Str(vec![
                Some("a".to_string()),
                Some("b".to_string()),
                None,
            ]),
        ];
        Table::new(schema, columns).unwrap()
    }

    #[test]
    fn test_schema_rejects_duplicates() {
        let err = TableSchema::new(vec![
            Field::new("x", FieldType::Int),
            Field::new("x", FieldType::Str),
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn test_column_lookup() {
        let table = sample_table();
        assert_eq!(table.num_rows, 3);
        assert_eq!(table.column("id").unwrap().get_int(1), Some(2));
        assert_eq!(table.column("name").unwrap().get_str(0), Some("a"));
        assert!(table.column("name").unwrap().is_null(2));
        assert!(table.column("missing").is_none());
    }

    #[test]
    fn test_take_padded_fills_nulls() {
        let table = sample_table();
        let taken = table.take_padded(&[2, -1, 0]);
        assert_eq!(taken.num_rows, 3);
        assert_eq!(taken.column("id").unwrap().get_int(0), Some(3));
        assert!(taken.column("id").unwrap().is_null(1));
        assert!(taken.column("name").unwrap().is_null(1));
        assert_eq!(taken.column("id").unwrap().get_int(2), Some(1));
    }

    #[test]
    fn test_hstack_rejects_name_collision() {
        let table = sample_table();
        assert!(table.hstack(&table).is_err());

        let renames: HashMap<_, _> = [
            ("id".to_string(), "id_right".to_string()),
            ("name".to_string(), "name_right".to_string()),
        ]
        .into();
        let renamed = table.rename_columns(&renames).unwrap();
        let stacked = table.hstack(&renamed).unwrap();
        assert_eq!(stacked.schema.num_fields(), 4);
        assert_eq!(stacked.column("id_right").unwrap().get_int(0), Some(1));
    }

    #[test]
    fn test_vstack() {
        let table = sample_table();
        let stacked = table.vstack(&table).unwrap();
        assert_eq!(stacked.num_rows, 6);
        assert_eq!(stacked.column("id").unwrap().get_int(3), Some(1));
    }

    #[test]
    fn test_coalesce_and_replace_column() {
        let table = sample_table();
        let a = Column::Str(vec![Some("a".to_string()), None, None]);
        let b = Column::Str(vec![Some("z".to_string()), Some("b".to_string()), None]);
        let merged = a.coalesce(&b).unwrap();
        assert_eq!(merged.get_str(0), Some("a"));
        assert_eq!(merged.get_str(1), Some("b"));
        assert!(merged.is_null(2));
        assert!(a.coalesce(&Column::Int(vec![None, None, None])).is_err());
        assert!(a.coalesce(&Column::Str(vec![None])).is_err());

        let replaced = table.replace_column("name", merged).unwrap();
        assert_eq!(replaced.column("name").unwrap().get_str(1), Some("b"));
        assert!(table
            .replace_column("name", Column::Int(vec![None, None, None]))
            .is_err());
        assert!(table.replace_column("missing", b).is_err());
    }

    #[test]
    fn test_value_eq_null_never_matches() {
        let table = sample_table();
        let names = table.column("name").unwrap();
        assert!(names.value_eq(0, names, 0));
        assert!(!names.value_eq(2, names, 2)); // null vs null
        assert!(!names.value_eq(0, names, 1));
    }
}
