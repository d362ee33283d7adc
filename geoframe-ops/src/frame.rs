//! A table with an active geometry column and row labels.

use geoframe_spatial::{Crs, GeomArray};
use geoframe_tabular::Table;

use crate::error::{OpsError, Result};

/// An attribute table paired with a geometry column of the same length.
///
/// Row labels are carried separately from attribute columns so that join
/// results can report which source rows produced each output row. A fresh
/// frame labels its rows positionally.
#[derive(Debug, Clone)]
pub struct GeoFrame {
    table: Table,
    geometry: GeomArray,
    geometry_column: String,
    labels: Vec<i64>,
}

impl GeoFrame {
    /// Pair a table with its geometry column, labeling rows positionally.
    pub fn new(table: Table, geometry: GeomArray, geometry_column: impl Into<String>) -> Result<Self> {
        let labels = (0..table.num_rows as i64).collect();
        Self::with_labels(table, geometry, geometry_column, labels)
    }

    /// Pair a table with its geometry column under explicit row labels.
    pub fn with_labels(
        table: Table,
        geometry: GeomArray,
        geometry_column: impl Into<String>,
        labels: Vec<i64>,
    ) -> Result<Self> {
        if geometry.len() != table.num_rows {
            return Err(OpsError::Param(format!(
                "geometry column has {} entries but table has {} rows",
                geometry.len(),
                table.num_rows
            )));
        }
        if labels.len() != table.num_rows {
            return Err(OpsError::Param(format!(
                "got {} row labels for {} rows",
                labels.len(),
                table.num_rows
            )));
        }
        let geometry_column = geometry_column.into();
        if table.schema.contains(&geometry_column) {
            return Err(OpsError::Param(format!(
                "attribute table already has a column named {geometry_column:?}"
            )));
        }
        Ok(Self {
            table,
            geometry,
            geometry_column,
            labels,
        })
    }

    pub fn len(&self) -> usize {
        self.table.num_rows
    }

    pub fn is_empty(&self) -> bool {
        self.table.num_rows == 0
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn geometry(&self) -> &GeomArray {
        &self.geometry
    }

    pub fn geometry_mut(&mut self) -> &mut GeomArray {
        &mut self.geometry
    }

    /// Name of the active geometry column.
    pub fn geometry_column(&self) -> &str {
        &self.geometry_column
    }

    pub fn labels(&self) -> &[i64] {
        &self.labels
    }

    pub fn crs(&self) -> Option<&Crs> {
        self.geometry.crs()
    }

    /// Relabel the CRS without reprojecting. See [`GeomArray::set_crs`].
    pub fn set_crs(&mut self, crs: Option<Crs>, allow_override: bool) -> Result<()> {
        self.geometry.set_crs(crs, allow_override)?;
        Ok(())
    }

    /// Reproject the geometry column, leaving attributes untouched.
    pub fn to_crs(&self, target: &Crs) -> Result<Self> {
        Ok(Self {
            table: self.table.clone(),
            geometry: self.geometry.to_crs(target)?,
            geometry_column: self.geometry_column.clone(),
            labels: self.labels.clone(),
        })
    }

    /// Keep only the rows at `indices`, in that order, labels included.
    pub fn filter_by_indices(&self, indices: &[usize]) -> Self {
        Self {
            table: self.table.filter_by_indices(indices),
            geometry: self.geometry.filter_by_indices(indices),
            geometry_column: self.geometry_column.clone(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoframe_spatial::GeomArray;
    use geoframe_tabular::{Column, Field, FieldType, Table, TableSchema};
    use std::sync::Arc;

    fn frame() -> GeoFrame {
        let schema = Arc::new(
            TableSchema::new(vec![Field::new("name", FieldType::Str)]).unwrap(),
        );
        let table = Table::new(
            schema,
            vec![Column::Str(vec![Some("a".into()), Some("b".into())])],
        )
        .unwrap();
        let geometry = GeomArray::points_from_xy(&[0.0, 5.0], &[0.0, 5.0], None, None).unwrap();
        GeoFrame::new(table, geometry, "geometry").unwrap()
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let table = Table::empty(3);
        let geometry = GeomArray::points_from_xy(&[0.0], &[0.0], None, None).unwrap();
        assert!(GeoFrame::new(table, geometry, "geometry").is_err());
    }

    #[test]
    fn test_geometry_name_collision_rejected() {
        let schema = Arc::new(
            TableSchema::new(vec![Field::new("geometry", FieldType::Int)]).unwrap(),
        );
        let table = Table::new(schema, vec![Column::Int(vec![Some(1)])]).unwrap();
        let geometry = GeomArray::points_from_xy(&[0.0], &[0.0], None, None).unwrap();
        assert!(GeoFrame::new(table, geometry, "geometry").is_err());
    }

    #[test]
    fn test_filter_keeps_labels() {
        let filtered = frame().filter_by_indices(&[1]);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.labels(), &[1]);
        assert_eq!(filtered.table().column("name").unwrap().get_str(0), Some("b"));
    }
}
