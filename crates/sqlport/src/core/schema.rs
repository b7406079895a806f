//! Column and row-set metadata.
//!
//! [`Column`] is the column model read by the value dispatcher. [`RowSet`] is
//! the metadata record stored in a backup container next to the chunk files
//! holding its rows.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::types::SqlTypeCode;
use super::variant::VariantKind;

/// Column metadata as reported by the source connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Qualified name of the originating table (may be empty for queries).
    #[serde(default)]
    pub table: String,

    /// Column name.
    pub name: String,

    /// Generic SQL type code.
    pub type_code: SqlTypeCode,

    /// Vendor type name (e.g. "YEAR", "varchar", "jsonb").
    #[serde(default)]
    pub type_name: String,

    /// Numeric precision or character length.
    #[serde(default)]
    pub precision: Option<i32>,

    /// Numeric scale.
    #[serde(default)]
    pub scale: Option<i32>,
}

impl Column {
    pub fn new(
        table: impl Into<String>,
        name: impl Into<String>,
        type_code: SqlTypeCode,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
            type_code,
            type_name: type_name.into(),
            precision: None,
            scale: None,
        }
    }

    pub fn with_precision(mut self, precision: i32, scale: i32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    /// Get the qualified column name used in diagnostics.
    pub fn full_name(&self) -> String {
        if self.table.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.table, self.name)
        }
    }
}

/// Column entry of a row set: its name and how its values are framed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,

    #[serde(default)]
    pub value_kind: VariantKind,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, value_kind: VariantKind) -> Self {
        Self {
            name: name.into(),
            value_kind,
        }
    }
}

/// One physical data file holding a contiguous run of a row set's rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// File name relative to the backup directory.
    pub name: String,

    /// Rows stored in the file.
    pub row_count: u64,
}

/// What a row set was read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowSetType {
    #[default]
    Table,
    Query,
}

/// Metadata for one backed-up table or query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowSet {
    #[serde(rename = "type", default)]
    pub kind: RowSetType,

    /// Row set name, used as the chunk file stem.
    pub name: String,

    #[serde(default)]
    pub catalog: Option<String>,

    #[serde(default)]
    pub schema: Option<String>,

    #[serde(default)]
    pub table: Option<String>,

    /// Total rows across all chunks.
    #[serde(default)]
    pub row_count: u64,

    pub columns: Vec<ColumnDescriptor>,

    #[serde(default)]
    pub chunks: Vec<Chunk>,
}

impl RowSet {
    /// Create an empty table row set.
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            kind: RowSetType::Table,
            name: name.into(),
            catalog: None,
            schema: None,
            table: None,
            row_count: 0,
            columns,
            chunks: Vec::new(),
        }
    }

    /// Build a row set whose column kinds are classified from column models.
    pub fn from_columns<'a>(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = (&'a Column, VariantKind)>,
    ) -> Self {
        Self::new(
            name,
            columns
                .into_iter()
                .map(|(c, kind)| ColumnDescriptor::new(c.name.clone(), kind))
                .collect(),
        )
    }

    /// Get the fully qualified source table name, if known.
    pub fn full_name(&self) -> String {
        match (&self.schema, &self.table) {
            (Some(schema), Some(table)) => format!("{}.{}", schema, table),
            (None, Some(table)) => table.clone(),
            _ => self.name.clone(),
        }
    }

    /// Append a chunk and account for its rows.
    pub fn add_chunk(&mut self, chunk: Chunk) {
        self.row_count += chunk.row_count;
        self.chunks.push(chunk);
    }

    /// Check that the chunk list accounts for every row.
    pub fn chunk_rows_consistent(&self) -> bool {
        self.chunks.iter().map(|c| c.row_count).sum::<u64>() == self.row_count
    }

    /// Load row-set metadata from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write row-set metadata as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Conventional metadata file name, `<name>.json`.
    pub fn metadata_file_name(&self) -> String {
        format!("{}.json", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_full_name() {
        let col = Column::new("public.users", "id", SqlTypeCode::Integer, "int4");
        assert_eq!(col.full_name(), "public.users.id");
        let anonymous = Column::new("", "total", SqlTypeCode::BigInt, "int8");
        assert_eq!(anonymous.full_name(), "total");
    }

    #[test]
    fn test_row_set_json_shape() {
        let mut rs = RowSet::new(
            "users",
            vec![
                ColumnDescriptor::new("id", VariantKind::Text),
                ColumnDescriptor::new("avatar", VariantKind::Binary),
            ],
        );
        rs.schema = Some("public".into());
        rs.table = Some("users".into());
        rs.add_chunk(Chunk {
            name: "users.0.csv".into(),
            row_count: 3,
        });

        let json: serde_json::Value = serde_json::to_value(&rs).unwrap();
        assert_eq!(json["type"], "table");
        assert_eq!(json["row_count"], 3);
        assert_eq!(json["columns"][1]["value_kind"], "binary");
        assert_eq!(json["chunks"][0]["name"], "users.0.csv");

        let back: RowSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, rs);
        assert!(back.chunk_rows_consistent());
        assert_eq!(back.full_name(), "public.users");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut rs = RowSet::new("orders", vec![ColumnDescriptor::new("id", VariantKind::Text)]);
        rs.add_chunk(Chunk {
            name: "orders.0.xml".into(),
            row_count: 12,
        });
        let path = dir.path().join(rs.metadata_file_name());
        rs.save(&path).unwrap();

        assert_eq!(RowSet::load(&path).unwrap(), rs);
        assert!(RowSet::load(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_missing_value_kind_defaults_to_text() {
        let json = r#"{"name": "t", "columns": [{"name": "a"}]}"#;
        let rs: RowSet = serde_json::from_str(json).unwrap();
        assert_eq!(rs.columns[0].value_kind, VariantKind::Text);
        assert_eq!(rs.kind, RowSetType::Table);
        assert!(rs.chunks.is_empty());
    }
}
