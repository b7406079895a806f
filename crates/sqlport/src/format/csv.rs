//! Delimiter-separated text codec.
//!
//! The first record holds the column names. A NULL is an unquoted empty
//! field; an empty value is always quoted (`""`), so the two never collide.
//! Binary columns are embedded as base64 or hex text per
//! [`CsvOptions::binary_encoding`](crate::config::CsvOptions), and which
//! columns are binary comes from the declared column kinds. Records end with
//! `\n`; `\r\n` is accepted on read.

use std::io::{BufRead, BufReader, Write};

use super::{
    check_row, open_input, open_output, BinaryEncoding, CountingWriter, Format, Input, Output,
    RowReader, RowWriter,
};
use crate::config::FormatOptions;
use crate::core::{ColumnDescriptor, Row, ValueVariant, VariantKind};
use crate::error::{MigrateError, Result};

const FORMAT: &str = "csv";

/// CSV codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvFormat;

impl Format for CsvFormat {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn extension(&self) -> &'static str {
        "csv"
    }

    fn writer(
        &self,
        output: Output,
        columns: &[ColumnDescriptor],
        options: &FormatOptions,
    ) -> Result<Box<dyn RowWriter>> {
        if columns.is_empty() {
            return Err(MigrateError::codec(
                FORMAT,
                "the writer needs the column list for its header record",
            ));
        }
        let dialect = Dialect::from_options(options)?;
        let mut writer = CsvRowWriter {
            out: open_output(output, options),
            columns: columns.to_vec(),
            dialect,
        };
        let header: Vec<String> = columns
            .iter()
            .map(|c| writer.dialect.quote_field(&c.name, false))
            .collect();
        writer.write_record(&header)?;
        Ok(Box::new(writer))
    }

    fn reader(
        &self,
        input: Input,
        columns: &[ColumnDescriptor],
        options: &FormatOptions,
    ) -> Result<Box<dyn RowReader>> {
        Ok(Box::new(CsvRowReader {
            input: open_input(input, options),
            columns: columns.to_vec(),
            dialect: Dialect::from_options(options)?,
            header_read: false,
        }))
    }
}

/// Single-byte delimiter and quote plus the binary encoding.
#[derive(Debug, Clone, Copy)]
struct Dialect {
    delimiter: u8,
    quote: u8,
    binary: BinaryEncoding,
}

impl Dialect {
    fn from_options(options: &FormatOptions) -> Result<Self> {
        let byte = |key: &str, c: char| {
            u8::try_from(c).ok().filter(u8::is_ascii).ok_or_else(|| {
                MigrateError::Config(format!("format.csv.{} must be ASCII, got {:?}", key, c))
            })
        };
        Ok(Self {
            delimiter: byte("delimiter", options.csv.delimiter)?,
            quote: byte("quote", options.csv.quote)?,
            binary: options.csv.binary_encoding,
        })
    }

    /// Quote when the field is empty (unless it stands for NULL) or holds
    /// the delimiter, the quote, CR or LF.
    fn quote_field(&self, field: &str, empty_is_null: bool) -> String {
        if field.is_empty() {
            return if empty_is_null {
                String::new()
            } else {
                let q = self.quote as char;
                format!("{q}{q}")
            };
        }
        let needs_quotes = field
            .bytes()
            .any(|b| b == self.delimiter || b == self.quote || b == b'\r' || b == b'\n');
        if !needs_quotes {
            return field.to_string();
        }
        let q = self.quote as char;
        let doubled = field.replace(q, &format!("{q}{q}"));
        format!("{q}{doubled}{q}")
    }
}

struct CsvRowWriter {
    out: CountingWriter<Output>,
    columns: Vec<ColumnDescriptor>,
    dialect: Dialect,
}

impl CsvRowWriter {
    fn write_record(&mut self, fields: &[String]) -> Result<()> {
        let mut line = fields.join(&(self.dialect.delimiter as char).to_string());
        line.push('\n');
        self.out.write_all(line.as_bytes())?;
        Ok(())
    }
}

impl RowWriter for CsvRowWriter {
    fn write_row(&mut self, row: &Row) -> Result<()> {
        check_row(FORMAT, row, &self.columns)?;
        let fields: Vec<String> = row
            .iter()
            .map(|value| match value {
                None => String::new(),
                Some(ValueVariant::Text(text)) => self.dialect.quote_field(text, false),
                Some(ValueVariant::Binary(bytes)) => {
                    self.dialect
                        .quote_field(&self.dialect.binary.encode(bytes), false)
                }
            })
            .collect();
        self.write_record(&fields)
    }

    fn bytes_written(&self) -> u64 {
        self.out.count()
    }

    fn finish(mut self: Box<Self>) -> Result<u64> {
        self.out.flush()?;
        Ok(self.out.count())
    }
}

/// One parsed field; `quoted` separates `""` from an empty (NULL) field.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Field {
    text: String,
    quoted: bool,
}

struct CsvRowReader {
    input: BufReader<Input>,
    columns: Vec<ColumnDescriptor>,
    dialect: Dialect,
    header_read: bool,
}

impl CsvRowReader {
    fn peek(&mut self) -> Result<Option<u8>> {
        Ok(self.input.fill_buf()?.first().copied())
    }

    fn next_byte(&mut self) -> Result<Option<u8>> {
        let b = self.peek()?;
        if b.is_some() {
            self.input.consume(1);
        }
        Ok(b)
    }

    /// Next record, or `None` at end of input on a record boundary.
    fn read_record(&mut self) -> Result<Option<Vec<Field>>> {
        let Dialect {
            delimiter, quote, ..
        } = self.dialect;
        let mut fields = Vec::new();
        let mut buf: Vec<u8> = Vec::new();
        let mut quoted = false;
        let mut in_quotes = false;
        let mut started = false;

        loop {
            let Some(b) = self.next_byte()? else {
                if in_quotes {
                    return Err(MigrateError::codec(
                        FORMAT,
                        "end of input inside a quoted field",
                    ));
                }
                if !started {
                    return Ok(None);
                }
                fields.push(finish_field(&mut buf, quoted)?);
                return Ok(Some(fields));
            };
            started = true;

            if in_quotes {
                if b == quote {
                    if self.peek()? == Some(quote) {
                        self.input.consume(1);
                        buf.push(quote);
                    } else {
                        in_quotes = false;
                    }
                } else {
                    buf.push(b);
                }
                continue;
            }

            if b == delimiter {
                fields.push(finish_field(&mut buf, quoted)?);
                quoted = false;
            } else if b == b'\n' || b == b'\r' {
                if b == b'\r' && self.peek()? == Some(b'\n') {
                    self.input.consume(1);
                }
                fields.push(finish_field(&mut buf, quoted)?);
                return Ok(Some(fields));
            } else if quoted {
                return Err(MigrateError::codec(
                    FORMAT,
                    format!("unexpected {:?} after a closing quote", b as char),
                ));
            } else if b == quote {
                if !buf.is_empty() {
                    return Err(MigrateError::codec(
                        FORMAT,
                        "quote character inside an unquoted field",
                    ));
                }
                quoted = true;
                in_quotes = true;
            } else {
                buf.push(b);
            }
        }
    }

    fn read_header(&mut self) -> Result<()> {
        let header = self
            .read_record()?
            .ok_or_else(|| MigrateError::codec(FORMAT, "missing header record"))?;
        if self.columns.is_empty() {
            self.columns = header
                .into_iter()
                .map(|f| ColumnDescriptor::new(f.text, VariantKind::Text))
                .collect();
        } else {
            let names: Vec<&str> = header.iter().map(|f| f.text.as_str()).collect();
            let declared: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
            if names != declared {
                return Err(MigrateError::codec(
                    FORMAT,
                    format!(
                        "header [{}] does not match declared columns [{}]",
                        names.join(", "),
                        declared.join(", ")
                    ),
                ));
            }
        }
        self.header_read = true;
        Ok(())
    }
}

fn finish_field(buf: &mut Vec<u8>, quoted: bool) -> Result<Field> {
    let text = String::from_utf8(std::mem::take(buf))
        .map_err(|e| MigrateError::codec(FORMAT, format!("invalid UTF-8: {}", e)))?;
    Ok(Field { text, quoted })
}

impl RowReader for CsvRowReader {
    fn read_row(&mut self) -> Result<Option<Row>> {
        if !self.header_read {
            self.read_header()?;
        }
        let Some(fields) = self.read_record()? else {
            return Ok(None);
        };
        if fields.len() != self.columns.len() {
            return Err(MigrateError::codec(
                FORMAT,
                format!(
                    "record has {} fields but {} columns",
                    fields.len(),
                    self.columns.len()
                ),
            ));
        }

        fields
            .into_iter()
            .zip(&self.columns)
            .map(|(field, column)| {
                if field.text.is_empty() && !field.quoted {
                    return Ok(None);
                }
                match column.value_kind {
                    VariantKind::Text => Ok(Some(ValueVariant::Text(field.text))),
                    VariantKind::Binary => self
                        .dialect
                        .binary
                        .decode(&field.text)
                        .map(|b| Some(ValueVariant::Binary(b)))
                        .map_err(|e| {
                            MigrateError::codec(
                                FORMAT,
                                format!("column {}: invalid {}: {}", column.name, self.dialect.binary, e),
                            )
                        }),
                }
            })
            .collect::<Result<Row>>()
            .map(Some)
    }
}
