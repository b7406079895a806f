//! Backup container codecs.
//!
//! A [`Format`] opens a [`RowWriter`] or [`RowReader`] over a byte stream.
//! Rows are [`Row`]s of optional [`ValueVariant`](crate::core::ValueVariant)s;
//! every codec records NULL in a per-row [`NullBitmap`] and omits the bodies
//! of null columns.
//!
//! Built-in codecs:
//!
//! - [`CsvFormat`]: delimiter-separated text, binary inline as hex or base64
//! - [`XmlFormat`]: `<rowset>` document, binary as base64
//! - [`BsonFormat`]: a stream of BSON documents, one per row

pub mod bitmap;
pub mod bson;
pub mod csv;
pub mod encoding;
pub mod xml;

pub use bitmap::NullBitmap;
pub use bson::BsonFormat;
pub use csv::CsvFormat;
pub use encoding::BinaryEncoding;
pub use xml::XmlFormat;

use std::fmt;
use std::io::{self, BufReader, BufWriter, Read, Write};

use crate::config::FormatOptions;
use crate::core::{ColumnDescriptor, Row, VariantKind};
use crate::error::{MigrateError, Result};

/// Output stream handed to a codec.
pub type Output = Box<dyn Write + Send>;

/// Input stream handed to a codec.
pub type Input = Box<dyn Read + Send>;

/// A physical encoding of row streams.
pub trait Format: Send + Sync + fmt::Debug {
    /// Name used for selection ("csv", "xml", "bson").
    fn name(&self) -> &'static str;

    /// File extension for chunk files, without the dot.
    fn extension(&self) -> &'static str;

    /// Open a writer. Header or prolog bytes are written immediately.
    fn writer(
        &self,
        output: Output,
        columns: &[ColumnDescriptor],
        options: &FormatOptions,
    ) -> Result<Box<dyn RowWriter>>;

    /// Open a reader. An empty `columns` slice means "infer from the stream".
    fn reader(
        &self,
        input: Input,
        columns: &[ColumnDescriptor],
        options: &FormatOptions,
    ) -> Result<Box<dyn RowReader>>;
}

/// Streaming row sink.
///
/// Dropping a writer without calling [`finish`](RowWriter::finish) releases
/// the underlying handle but leaves the document without its trailer.
pub trait RowWriter: Send {
    fn write_row(&mut self, row: &Row) -> Result<()>;

    /// Bytes accepted so far, including buffered ones.
    fn bytes_written(&self) -> u64;

    /// Write the trailer, flush and close. Returns the total byte count.
    fn finish(self: Box<Self>) -> Result<u64>;
}

/// Streaming row source.
pub trait RowReader: Send {
    /// Next row, or `None` at the legitimate end of rows.
    fn read_row(&mut self) -> Result<Option<Row>>;
}

/// Counts bytes passed through to the inner writer.
pub(crate) struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W: Write> CountingWriter<W> {
    pub(crate) fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }

    pub(crate) fn count(&self) -> u64 {
        self.count
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Wrap an output stream per the buffering options and count what goes in.
pub(crate) fn open_output(output: Output, options: &FormatOptions) -> CountingWriter<Output> {
    let output: Output = if options.buffering {
        Box::new(BufWriter::with_capacity(options.buffer_size, output))
    } else {
        output
    };
    CountingWriter::new(output)
}

/// Wrap an input stream per the buffering options.
///
/// Readers need `BufRead`; with buffering off the buffer holds a single byte.
pub(crate) fn open_input(input: Input, options: &FormatOptions) -> BufReader<Input> {
    let capacity = if options.buffering {
        options.buffer_size.max(1)
    } else {
        1
    };
    BufReader::with_capacity(capacity, input)
}

/// Check a row against the declared columns before anything is written.
pub(crate) fn check_row(format: &str, row: &Row, columns: &[ColumnDescriptor]) -> Result<()> {
    if columns.is_empty() {
        return Ok(());
    }
    if row.len() != columns.len() {
        return Err(MigrateError::codec(
            format,
            format!(
                "row has {} values but {} columns are declared",
                row.len(),
                columns.len()
            ),
        ));
    }
    for (value, column) in row.iter().zip(columns) {
        if let Some(value) = value {
            if value.kind() != column.value_kind {
                return Err(MigrateError::codec(
                    format,
                    format!(
                        "column {} is declared {} but got a {} value",
                        column.name,
                        column.value_kind,
                        value.kind()
                    ),
                ));
            }
        }
    }
    Ok(())
}

/// Declared kind of column `index`, Text when undeclared.
pub(crate) fn declared_kind(columns: &[ColumnDescriptor], index: usize) -> VariantKind {
    columns
        .get(index)
        .map(|c| c.value_kind)
        .unwrap_or_default()
}

/// Interleave decoded values with the nulls of a bitmap.
///
/// `width` is the declared column count, or `None` to derive it from the
/// values present plus the nulls set.
pub(crate) fn assemble_row<T>(
    format: &str,
    bitmap: &NullBitmap,
    values: Vec<T>,
    width: Option<usize>,
) -> Result<Vec<Option<T>>> {
    let width = width.unwrap_or(values.len() + bitmap.count());
    if let Some(highest) = bitmap.highest() {
        if highest >= width {
            return Err(MigrateError::codec(
                format,
                format!("null bitmap marks column {} of a {}-column row", highest, width),
            ));
        }
    }
    let present = width - bitmap.count();
    if values.len() != present {
        return Err(MigrateError::codec(
            format,
            format!(
                "row carries {} values, expected {} ({} columns, {} null)",
                values.len(),
                present,
                width,
                bitmap.count()
            ),
        ));
    }

    let mut values = values.into_iter();
    let mut row = Vec::with_capacity(width);
    for i in 0..width {
        if bitmap.is_null(i) {
            row.push(None);
        } else {
            row.push(values.next());
        }
    }
    Ok(row)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixtures for codec tests.

    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    use crate::core::{ColumnDescriptor, Row, ValueVariant, VariantKind};

    /// In-memory output that stays readable after the writer is finished.
    #[derive(Clone, Default)]
    pub struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        pub fn bytes(&self) -> Vec<u8> {
            self.0.lock().unwrap().clone()
        }

        pub fn text(&self) -> String {
            String::from_utf8(self.bytes()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    pub fn mixed_columns() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("id", VariantKind::Text),
            ColumnDescriptor::new("name", VariantKind::Text),
            ColumnDescriptor::new("photo", VariantKind::Binary),
            ColumnDescriptor::new("note", VariantKind::Text),
            ColumnDescriptor::new("blob", VariantKind::Binary),
        ]
    }

    /// Rows mixing nulls, empty values and awkward characters.
    pub fn mixed_rows() -> Vec<Row> {
        vec![
            vec![
                Some(ValueVariant::Text("1".into())),
                Some(ValueVariant::Text("plain".into())),
                Some(ValueVariant::Binary(vec![0, 1, 2, 0xFF])),
                Some(ValueVariant::Text("".into())),
                Some(ValueVariant::Binary(Vec::new())),
            ],
            vec![
                None,
                Some(ValueVariant::Text("a,b \"quoted\"\r\nline <&> 'x'".into())),
                None,
                Some(ValueVariant::Text("zażółć 😀 \u{1}\u{FFFE}\t".into())),
                Some(ValueVariant::Binary(b"\x00,\n".to_vec())),
            ],
            vec![None, None, None, None, None],
            vec![
                Some(ValueVariant::Text("  ".into())),
                None,
                Some(ValueVariant::Binary(vec![9; 40])),
                None,
                None,
            ],
        ]
    }
}
