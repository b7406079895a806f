//! Binary document codec.
//!
//! A stream of little-endian BSON documents, one per row:
//!
//! ```text
//! document := int32 total_len, element*, 0x00
//! element  := 0x05 "n\0" int32 len, 0x00 subtype, bitmap bytes
//!           | 0x02 "<index>\0" int32 len+1, utf8 bytes, 0x00
//!           | 0x05 "<index>\0" int32 len, 0x00 subtype, bytes
//! ```
//!
//! The `n` element is the row's [`NullBitmap`]; present columns follow keyed
//! by their decimal column index. There is no stream header or trailer, so
//! end of input on a document boundary is the end of rows.

use std::collections::BTreeMap;
use std::io::{BufReader, Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{
    check_row, open_input, open_output, CountingWriter, Format, Input, NullBitmap, Output,
    RowReader, RowWriter,
};
use crate::config::FormatOptions;
use crate::core::{ColumnDescriptor, Row, ValueVariant};
use crate::error::{MigrateError, Result};

const FORMAT: &str = "bson";

const TYPE_STRING: u8 = 0x02;
const TYPE_BINARY: u8 = 0x05;
const SUBTYPE_GENERIC: u8 = 0x00;

/// Key of the null bitmap element.
const NULLS_KEY: &str = "n";

/// Smallest legal document: length prefix plus terminator.
const MIN_DOCUMENT: usize = 5;

/// BSON codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct BsonFormat;

impl Format for BsonFormat {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn extension(&self) -> &'static str {
        "bson"
    }

    fn writer(
        &self,
        output: Output,
        columns: &[ColumnDescriptor],
        options: &FormatOptions,
    ) -> Result<Box<dyn RowWriter>> {
        Ok(Box::new(BsonRowWriter {
            out: open_output(output, options),
            columns: columns.to_vec(),
            buf: BytesMut::with_capacity(4 * 1024),
        }))
    }

    fn reader(
        &self,
        input: Input,
        columns: &[ColumnDescriptor],
        options: &FormatOptions,
    ) -> Result<Box<dyn RowReader>> {
        Ok(Box::new(BsonRowReader {
            input: open_input(input, options),
            columns: columns.to_vec(),
        }))
    }
}

struct BsonRowWriter {
    out: CountingWriter<Output>,
    columns: Vec<ColumnDescriptor>,
    buf: BytesMut,
}

fn put_key(buf: &mut BytesMut, element_type: u8, key: &str) {
    buf.put_u8(element_type);
    buf.put_slice(key.as_bytes());
    buf.put_u8(0);
}

fn put_len(buf: &mut BytesMut, len: usize) -> Result<()> {
    let len = i32::try_from(len)
        .map_err(|_| MigrateError::codec(FORMAT, format!("value of {} bytes is too large", len)))?;
    buf.put_i32_le(len);
    Ok(())
}

fn put_binary(buf: &mut BytesMut, key: &str, bytes: &[u8]) -> Result<()> {
    put_key(buf, TYPE_BINARY, key);
    put_len(buf, bytes.len())?;
    buf.put_u8(SUBTYPE_GENERIC);
    buf.put_slice(bytes);
    Ok(())
}

fn put_string(buf: &mut BytesMut, key: &str, text: &str) -> Result<()> {
    put_key(buf, TYPE_STRING, key);
    put_len(buf, text.len() + 1)?;
    buf.put_slice(text.as_bytes());
    buf.put_u8(0);
    Ok(())
}

impl RowWriter for BsonRowWriter {
    fn write_row(&mut self, row: &Row) -> Result<()> {
        check_row(FORMAT, row, &self.columns)?;

        self.buf.clear();
        self.buf.put_i32_le(0);
        put_binary(&mut self.buf, NULLS_KEY, NullBitmap::from_row(row).as_bytes())?;
        for (index, value) in row.iter().enumerate() {
            let key = index.to_string();
            match value {
                None => {}
                Some(ValueVariant::Text(text)) => put_string(&mut self.buf, &key, text)?,
                Some(ValueVariant::Binary(bytes)) => put_binary(&mut self.buf, &key, bytes)?,
            }
        }
        self.buf.put_u8(0);

        let total = i32::try_from(self.buf.len())
            .map_err(|_| MigrateError::codec(FORMAT, "row document exceeds 2 GiB"))?;
        self.buf[..4].copy_from_slice(&total.to_le_bytes());
        self.out.write_all(&self.buf)?;
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.out.count()
    }

    fn finish(mut self: Box<Self>) -> Result<u64> {
        self.out.flush()?;
        Ok(self.out.count())
    }
}

struct BsonRowReader {
    input: BufReader<Input>,
    columns: Vec<ColumnDescriptor>,
}

impl BsonRowReader {
    /// Length prefix of the next document, or `None` at a clean end of input.
    fn read_length(&mut self) -> Result<Option<usize>> {
        let mut prefix = [0u8; 4];
        let mut filled = 0;
        while filled < prefix.len() {
            let n = self.input.read(&mut prefix[filled..])?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(truncated("document length"));
            }
            filled += n;
        }
        let len = i32::from_le_bytes(prefix);
        match usize::try_from(len) {
            Ok(len) if len >= MIN_DOCUMENT => Ok(Some(len)),
            _ => Err(MigrateError::codec(
                FORMAT,
                format!("invalid document length {}", len),
            )),
        }
    }
}

impl RowReader for BsonRowReader {
    fn read_row(&mut self) -> Result<Option<Row>> {
        let Some(len) = self.read_length()? else {
            return Ok(None);
        };
        // Allocate only what the input actually holds, not what the prefix claims.
        let want = len - 4;
        let mut body = Vec::new();
        (&mut self.input).take(want as u64).read_to_end(&mut body)?;
        if body.len() < want {
            return Err(truncated("document body"));
        }
        let (bitmap, values) = parse_document(Bytes::from(body))?;

        let width = if self.columns.is_empty() {
            values.len() + bitmap.count()
        } else {
            self.columns.len()
        };
        let mut values = values;
        let mut row = Vec::with_capacity(width);
        for index in 0..width {
            let value = values.remove(&index);
            match (bitmap.is_null(index), value) {
                (true, None) => row.push(None),
                (false, Some(v)) => row.push(Some(v)),
                (true, Some(_)) => {
                    return Err(MigrateError::codec(
                        FORMAT,
                        format!("column {} is marked null but carries a value", index),
                    ))
                }
                (false, None) => {
                    return Err(MigrateError::codec(
                        FORMAT,
                        format!("column {} is missing", index),
                    ))
                }
            }
        }
        if let Some(index) = values.keys().next().copied().or_else(|| {
            bitmap.highest().filter(|&h| h >= width)
        }) {
            return Err(MigrateError::codec(
                FORMAT,
                format!("column {} is outside the {}-column row", index, width),
            ));
        }
        Ok(Some(row))
    }
}

fn truncated(what: &str) -> MigrateError {
    MigrateError::codec(FORMAT, format!("truncated {}", what))
}

/// Parse the elements of one document; `doc` excludes the length prefix.
fn parse_document(mut doc: Bytes) -> Result<(NullBitmap, BTreeMap<usize, ValueVariant>)> {
    let mut bitmap = NullBitmap::new();
    let mut values = BTreeMap::new();

    loop {
        if !doc.has_remaining() {
            return Err(truncated("document: missing terminator"));
        }
        let element_type = doc.get_u8();
        if element_type == 0 {
            if doc.has_remaining() {
                return Err(MigrateError::codec(
                    FORMAT,
                    "bytes after the document terminator",
                ));
            }
            return Ok((bitmap, values));
        }

        let key = read_cstring(&mut doc)?;
        let value = match element_type {
            TYPE_STRING => {
                let len = read_len(&mut doc)?;
                if len == 0 || doc.remaining() < len {
                    return Err(truncated("string element"));
                }
                let raw = doc.copy_to_bytes(len - 1);
                if doc.get_u8() != 0 {
                    return Err(MigrateError::codec(FORMAT, "string element not NUL-terminated"));
                }
                let text = String::from_utf8(raw.to_vec()).map_err(|e| {
                    MigrateError::codec(FORMAT, format!("invalid UTF-8 in column {}: {}", key, e))
                })?;
                ValueVariant::Text(text)
            }
            TYPE_BINARY => {
                let len = read_len(&mut doc)?;
                if doc.remaining() < len + 1 {
                    return Err(truncated("binary element"));
                }
                let _subtype = doc.get_u8();
                ValueVariant::Binary(doc.copy_to_bytes(len).to_vec())
            }
            other => {
                return Err(MigrateError::codec(
                    FORMAT,
                    format!("unsupported element type 0x{:02x} for key '{}'", other, key),
                ))
            }
        };

        if key == NULLS_KEY {
            match value {
                ValueVariant::Binary(bytes) => bitmap = NullBitmap::from_bytes(&bytes),
                ValueVariant::Text(_) => {
                    return Err(MigrateError::codec(FORMAT, "null bitmap must be binary"))
                }
            }
            continue;
        }
        let index: usize = key
            .parse()
            .map_err(|_| MigrateError::codec(FORMAT, format!("unexpected key '{}'", key)))?;
        if values.insert(index, value).is_some() {
            return Err(MigrateError::codec(
                FORMAT,
                format!("column {} appears twice", index),
            ));
        }
    }
}

fn read_cstring(doc: &mut Bytes) -> Result<String> {
    let end = doc
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| truncated("element key"))?;
    let raw = doc.copy_to_bytes(end);
    doc.advance(1);
    String::from_utf8(raw.to_vec()).map_err(|_| MigrateError::codec(FORMAT, "invalid UTF-8 key"))
}

fn read_len(doc: &mut Bytes) -> Result<usize> {
    if doc.remaining() < 4 {
        return Err(truncated("element length"));
    }
    let len = doc.get_i32_le();
    usize::try_from(len)
        .map_err(|_| MigrateError::codec(FORMAT, format!("negative element length {}", len)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::VariantKind;
    use crate::format::testing::{mixed_columns, mixed_rows, SharedBuf};
    use std::io::Cursor;

    fn write_rows(columns: &[ColumnDescriptor], rows: &[Row]) -> Vec<u8> {
        let buf = SharedBuf::default();
        let mut writer = BsonFormat
            .writer(Box::new(buf.clone()), columns, &FormatOptions::default())
            .unwrap();
        for row in rows {
            writer.write_row(row).unwrap();
        }
        writer.finish().unwrap();
        buf.bytes()
    }

    fn read_all(bytes: &[u8], columns: &[ColumnDescriptor]) -> Result<Vec<Row>> {
        let mut reader = BsonFormat.reader(
            Box::new(Cursor::new(bytes.to_vec())),
            columns,
            &FormatOptions::default(),
        )?;
        let mut rows = Vec::new();
        while let Some(row) = reader.read_row()? {
            rows.push(row);
        }
        Ok(rows)
    }

    #[test]
    fn test_roundtrip_mixed_rows() {
        let columns = mixed_columns();
        let rows = mixed_rows();
        let bytes = write_rows(&columns, &rows);
        assert_eq!(read_all(&bytes, &columns).unwrap(), rows);
        assert_eq!(read_all(&bytes, &[]).unwrap(), rows);
    }

    #[test]
    fn test_exact_document_layout() {
        let row: Row = vec![
            None,
            Some(ValueVariant::Text("b".into())),
            None,
            Some(ValueVariant::Binary(vec![0xAB])),
        ];
        let bytes = write_rows(&[], &[row]);
        let expected: Vec<u8> = [
            &[0x20, 0, 0, 0][..],
            // "n": binary, 1 byte, subtype 0, bitmap 0b0101
            &[0x05, b'n', 0, 1, 0, 0, 0, 0, 0x05],
            // "1": string "b"
            &[0x02, b'1', 0, 2, 0, 0, 0, b'b', 0],
            // "3": binary 0xAB
            &[0x05, b'3', 0, 1, 0, 0, 0, 0, 0xAB],
            &[0],
        ]
        .concat();
        assert_eq!(bytes, expected);
        assert_eq!(bytes.len(), 0x20);
    }

    #[test]
    fn test_empty_stream_has_no_rows() {
        assert!(read_all(&[], &[]).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_documents_fail() {
        let row: Row = vec![Some(ValueVariant::Text("hello".into()))];
        let bytes = write_rows(&[], &[row]);
        for cut in [1, 3, 4, 10, bytes.len() - 1] {
            let err = read_all(&bytes[..cut], &[]).unwrap_err();
            assert!(matches!(err, MigrateError::Codec { .. }), "cut {cut}: {err:?}");
        }
    }

    #[test]
    fn test_oversized_length_prefix_is_truncation() {
        let mut doc = i32::MAX.to_le_bytes().to_vec();
        doc.extend_from_slice(&[0x02, b'0', 0, 1, 0, 0, 0, 0, 0]);
        let err = read_all(&doc, &[]).unwrap_err();
        assert!(err.to_string().contains("truncated document body"), "{err}");
    }

    #[test]
    fn test_corrupt_documents_fail() {
        // Length prefix smaller than the minimum.
        assert!(read_all(&[4, 0, 0, 0], &[]).is_err());
        // Unsupported element type (double).
        let doc = [0x10, 0, 0, 0, 0x01, b'0', 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(read_all(&doc, &[]).is_err());
        // Null bit set for a column that also has a value.
        let mut doc = vec![0, 0, 0, 0];
        doc.extend_from_slice(&[0x05, b'n', 0, 1, 0, 0, 0, 0, 0x01]);
        doc.extend_from_slice(&[0x02, b'0', 0, 1, 0, 0, 0, 0]);
        doc.push(0);
        doc[0] = doc.len() as u8;
        assert!(read_all(&doc, &[]).is_err());
        // Same key twice.
        let mut doc = vec![0, 0, 0, 0];
        doc.extend_from_slice(&[0x02, b'0', 0, 1, 0, 0, 0, 0]);
        doc.extend_from_slice(&[0x02, b'0', 0, 1, 0, 0, 0, 0]);
        doc.push(0);
        doc[0] = doc.len() as u8;
        assert!(read_all(&doc, &[]).is_err());
    }

    #[test]
    fn test_declared_width_mismatch_fails() {
        let columns = vec![
            ColumnDescriptor::new("a", VariantKind::Text),
            ColumnDescriptor::new("b", VariantKind::Text),
        ];
        let row: Row = vec![Some(ValueVariant::Text("x".into()))];
        let bytes = write_rows(&[], &[row]);
        assert!(read_all(&bytes, &columns).is_err());
    }
}
