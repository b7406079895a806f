//! Re-encoding of backed-up row sets between formats.

use std::fs::File;
use std::path::Path;

use tracing::{debug, info};

use crate::config::FormatOptions;
use crate::core::{Chunk, RowSet};
use crate::error::{MigrateError, Result};
use crate::format::Format;

use super::chunked::chunk_file_name;

/// Re-encode every chunk of `row_set` from `from` to `to`.
///
/// Chunk boundaries, row order and row counts are preserved. Output chunks
/// are named for the target format and the returned metadata lists them.
///
/// # Errors
///
/// Fails before writing anything when an output chunk would replace one of
/// the input chunks. Otherwise fails on the first codec error, or when a
/// chunk holds a different number of rows than its metadata records.
pub fn convert_rowset(
    row_set: &RowSet,
    input_dir: &Path,
    from: &dyn Format,
    to: &dyn Format,
    output_dir: &Path,
    options: &FormatOptions,
) -> Result<RowSet> {
    info!(
        "Converting {} ({} chunks) from {} to {}",
        row_set.name,
        row_set.chunks.len(),
        from.name(),
        to.name()
    );

    for index in 0..row_set.chunks.len() {
        let output = output_dir.join(chunk_file_name(&row_set.name, index, to.extension()));
        let clash = row_set
            .chunks
            .iter()
            .map(|chunk| input_dir.join(&chunk.name))
            .find(|input| same_file(input, &output));
        if let Some(input) = clash {
            return Err(MigrateError::Config(format!(
                "output chunk {} would overwrite input chunk {}",
                output.display(),
                input.display()
            )));
        }
    }

    let mut converted = row_set.clone();
    converted.chunks.clear();
    converted.row_count = 0;

    for (index, chunk) in row_set.chunks.iter().enumerate() {
        let input = File::open(input_dir.join(&chunk.name))?;
        let mut reader = from.reader(Box::new(input), &row_set.columns, options)?;

        let name = chunk_file_name(&row_set.name, index, to.extension());
        let output = File::create(output_dir.join(&name))?;
        let mut writer = to.writer(Box::new(output), &row_set.columns, options)?;

        let mut rows = 0u64;
        while let Some(row) = reader.read_row()? {
            writer.write_row(&row)?;
            rows += 1;
        }
        let bytes = writer.finish()?;

        if rows != chunk.row_count {
            return Err(MigrateError::codec(
                from.name(),
                format!(
                    "chunk {} holds {} rows but its metadata records {}",
                    chunk.name, rows, chunk.row_count
                ),
            ));
        }
        debug!("{} -> {}: {} rows, {} bytes", chunk.name, name, rows, bytes);
        converted.add_chunk(Chunk {
            name,
            row_count: rows,
        });
    }

    Ok(converted)
}

/// Whether both paths exist and name the same file.
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChunkingConfig;
    use crate::core::{ColumnDescriptor, Row, ValueVariant, VariantKind};
    use crate::format::{BsonFormat, CsvFormat, XmlFormat};
    use crate::transfer::ChunkedWriter;
    use std::sync::Arc;

    fn rows() -> Vec<Row> {
        vec![
            vec![
                Some(ValueVariant::Text("1".into())),
                Some(ValueVariant::Text("Zoë, \"quoted\"".into())),
                Some(ValueVariant::Binary(vec![0, 1, 2, 255])),
            ],
            vec![Some(ValueVariant::Text("2".into())), Some(ValueVariant::Text(String::new())), None],
            vec![Some(ValueVariant::Text("3".into())), None, Some(ValueVariant::Binary(vec![7]))],
        ]
    }

    fn row_set() -> RowSet {
        RowSet::new(
            "blobs",
            vec![
                ColumnDescriptor::new("id", VariantKind::Text),
                ColumnDescriptor::new("name", VariantKind::Text),
                ColumnDescriptor::new("data", VariantKind::Binary),
            ],
        )
    }

    fn read_all(row_set: &RowSet, dir: &Path, format: &dyn Format) -> Vec<Row> {
        let mut out = Vec::new();
        for chunk in &row_set.chunks {
            let file = File::open(dir.join(&chunk.name)).unwrap();
            let mut reader = format
                .reader(Box::new(file), &row_set.columns, &FormatOptions::default())
                .unwrap();
            while let Some(row) = reader.read_row().unwrap() {
                out.push(row);
            }
        }
        out
    }

    #[test]
    fn test_convert_csv_to_xml_to_bson() {
        let src = tempfile::tempdir().unwrap();
        let mid = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let options = FormatOptions::default();

        let mut writer = ChunkedWriter::new(
            src.path(),
            row_set(),
            Arc::new(CsvFormat),
            &options,
            &ChunkingConfig {
                max_rows: Some(2),
                max_bytes: None,
            },
        );
        for row in rows() {
            writer.write_row(&row).unwrap();
        }
        let csv = writer.finish().unwrap();

        let xml = convert_rowset(&csv, src.path(), &CsvFormat, &XmlFormat, mid.path(), &options)
            .unwrap();
        assert_eq!(xml.chunks[0].name, "blobs.0.xml");
        assert_eq!(xml.chunks[1].row_count, 1);
        assert_eq!(read_all(&xml, mid.path(), &XmlFormat), rows());

        let bson = convert_rowset(&xml, mid.path(), &XmlFormat, &BsonFormat, dst.path(), &options)
            .unwrap();
        assert_eq!(bson.row_count, 3);
        assert_eq!(read_all(&bson, dst.path(), &BsonFormat), rows());
    }

    #[test]
    fn test_row_count_mismatch_is_an_error() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let options = FormatOptions::default();

        let mut writer = ChunkedWriter::new(
            src.path(),
            row_set(),
            Arc::new(CsvFormat),
            &options,
            &ChunkingConfig::default(),
        );
        for row in rows() {
            writer.write_row(&row).unwrap();
        }
        let mut csv = writer.finish().unwrap();
        csv.chunks[0].row_count = 5;

        let err = convert_rowset(&csv, src.path(), &CsvFormat, &XmlFormat, dst.path(), &options)
            .unwrap_err();
        assert!(err.to_string().contains("holds 3 rows"));
    }

    #[test]
    fn test_refuses_to_overwrite_input_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let options = FormatOptions::default();

        let mut writer = ChunkedWriter::new(
            dir.path(),
            row_set(),
            Arc::new(CsvFormat),
            &options,
            &ChunkingConfig::default(),
        );
        for row in rows() {
            writer.write_row(&row).unwrap();
        }
        let csv = writer.finish().unwrap();
        let chunk = dir.path().join(&csv.chunks[0].name);
        let before = std::fs::read(&chunk).unwrap();

        let err = convert_rowset(&csv, dir.path(), &CsvFormat, &CsvFormat, dir.path(), &options)
            .unwrap_err();
        assert!(matches!(err, MigrateError::Config(_)));
        assert!(err.to_string().contains("would overwrite"));
        assert_eq!(std::fs::read(&chunk).unwrap(), before);

        // Another format in the same directory does not collide.
        let xml = convert_rowset(&csv, dir.path(), &CsvFormat, &XmlFormat, dir.path(), &options)
            .unwrap();
        assert_eq!(xml.row_count, 3);
        assert_eq!(std::fs::read(&chunk).unwrap(), before);
    }

    #[test]
    fn test_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.csv");
        std::fs::write(&file, "x\n").unwrap();
        assert!(same_file(&file, &dir.path().join(".").join("a.csv")));
        assert!(!same_file(&file, &dir.path().join("b.csv")));
    }

    #[test]
    fn test_missing_chunk_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut rs = row_set();
        rs.add_chunk(Chunk {
            name: "blobs.0.csv".into(),
            row_count: 1,
        });
        let err = convert_rowset(
            &rs,
            dir.path(),
            &CsvFormat,
            &XmlFormat,
            dir.path(),
            &FormatOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MigrateError::Io(_)));
    }
}
