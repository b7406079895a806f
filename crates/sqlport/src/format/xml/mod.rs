//! XML row stream codec.
//!
//! Document shape:
//!
//! ```text
//! <?xml version="1.0" encoding="utf-8"?>
//! <rowset>
//! <row nulls="05"><col>b</col><col kind="binary">AAEC</col></row>
//! </rowset>
//! ```
//!
//! `nulls` is the lowercase hex [`NullBitmap`]; null columns have no `<col>`.
//! A `<col>` without a `kind` attribute takes the declared column kind, or
//! Text when nothing is declared.

mod escape;

pub use escape::{escape, is_xml_char, unescape};

use std::io::{BufRead, BufReader, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use super::{
    assemble_row, check_row, declared_kind, open_input, open_output, CountingWriter, Format,
    Input, NullBitmap, Output, RowReader, RowWriter,
};
use crate::config::FormatOptions;
use crate::core::{ColumnDescriptor, Row, ValueVariant, VariantKind};
use crate::error::{MigrateError, Result};

const FORMAT: &str = "xml";

const ROOT: &str = "rowset";
const ROW: &str = "row";
const COL: &str = "col";
const NULLS_ATTR: &str = "nulls";
const KIND_ATTR: &str = "kind";

/// XML codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlFormat;

impl Format for XmlFormat {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn extension(&self) -> &'static str {
        "xml"
    }

    fn writer(
        &self,
        output: Output,
        columns: &[ColumnDescriptor],
        options: &FormatOptions,
    ) -> Result<Box<dyn RowWriter>> {
        let mut out = open_output(output, options);
        write!(
            out,
            "<?xml version=\"{}\" encoding=\"{}\"?>\n<{}>\n",
            escape(&options.xml.version),
            escape(&options.xml.encoding),
            ROOT
        )?;
        Ok(Box::new(XmlRowWriter {
            out,
            columns: columns.to_vec(),
        }))
    }

    fn reader(
        &self,
        input: Input,
        columns: &[ColumnDescriptor],
        options: &FormatOptions,
    ) -> Result<Box<dyn RowReader>> {
        Ok(Box::new(XmlRowReader {
            tokens: Tokenizer::new(open_input(input, options)),
            columns: columns.to_vec(),
            state: ReadState::Prolog,
        }))
    }
}

struct XmlRowWriter {
    out: CountingWriter<Output>,
    columns: Vec<ColumnDescriptor>,
}

impl RowWriter for XmlRowWriter {
    fn write_row(&mut self, row: &Row) -> Result<()> {
        check_row(FORMAT, row, &self.columns)?;

        // The whole element is rendered first so a failure never leaves half a row.
        let bitmap = NullBitmap::from_row(row);
        let mut element = format!("<{} {}=\"{}\">", ROW, NULLS_ATTR, bitmap.to_hex());
        for value in row.iter().flatten() {
            match value {
                ValueVariant::Text(text) => {
                    element.push_str("<col>");
                    element.push_str(&escape(text));
                    element.push_str("</col>");
                }
                ValueVariant::Binary(bytes) => {
                    element.push_str("<col kind=\"binary\">");
                    element.push_str(&STANDARD.encode(bytes));
                    element.push_str("</col>");
                }
            }
        }
        element.push_str("</row>\n");
        self.out.write_all(element.as_bytes())?;
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.out.count()
    }

    fn finish(mut self: Box<Self>) -> Result<u64> {
        write!(self.out, "</{}>\n", ROOT)?;
        self.out.flush()?;
        Ok(self.out.count())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    Prolog,
    Rows,
    Done,
}

struct XmlRowReader {
    tokens: Tokenizer<BufReader<Input>>,
    columns: Vec<ColumnDescriptor>,
    state: ReadState,
}

impl RowReader for XmlRowReader {
    fn read_row(&mut self) -> Result<Option<Row>> {
        if self.state == ReadState::Prolog {
            match self.tokens.next_markup()? {
                Token::Start(tag) if tag.name == ROOT => {
                    self.state = if tag.empty {
                        ReadState::Done
                    } else {
                        ReadState::Rows
                    };
                }
                other => return Err(unexpected(&other, "<rowset>")),
            }
        }
        if self.state == ReadState::Done {
            return Ok(None);
        }

        match self.tokens.next_markup()? {
            Token::Start(tag) if tag.name == ROW => self.read_row_body(tag).map(Some),
            Token::End(name) if name == ROOT => {
                self.state = ReadState::Done;
                Ok(None)
            }
            other => Err(unexpected(&other, "<row> or </rowset>")),
        }
    }
}

impl XmlRowReader {
    fn read_row_body(&mut self, tag: StartTag) -> Result<Row> {
        let bitmap = match tag.attr(NULLS_ATTR) {
            Some(hex) => NullBitmap::from_hex(hex).map_err(|e| {
                MigrateError::codec(FORMAT, format!("invalid null bitmap '{}': {}", hex, e))
            })?,
            None => NullBitmap::new(),
        };

        let mut values = Vec::new();
        if !tag.empty {
            loop {
                match self.tokens.next_markup()? {
                    Token::Start(col) if col.name == COL => {
                        let index = column_index(&bitmap, values.len());
                        let kind = match col.attr(KIND_ATTR) {
                            Some(kind) => kind.parse::<VariantKind>().map_err(|_| {
                                MigrateError::codec(FORMAT, format!("unknown kind '{}'", kind))
                            })?,
                            None => declared_kind(&self.columns, index),
                        };
                        let body = if col.empty {
                            String::new()
                        } else {
                            self.tokens.text_until_end(COL)?
                        };
                        values.push(decode_value(kind, body)?);
                    }
                    Token::End(name) if name == ROW => break,
                    other => return Err(unexpected(&other, "<col> or </row>")),
                }
            }
        }

        let width = (!self.columns.is_empty()).then_some(self.columns.len());
        assemble_row(FORMAT, &bitmap, values, width)
    }
}

/// Column position of the value that follows `present` earlier values.
fn column_index(bitmap: &NullBitmap, present: usize) -> usize {
    let mut seen = 0;
    let mut index = 0;
    loop {
        if !bitmap.is_null(index) {
            if seen == present {
                return index;
            }
            seen += 1;
        }
        index += 1;
    }
}

fn decode_value(kind: VariantKind, body: String) -> Result<ValueVariant> {
    match kind {
        VariantKind::Text => Ok(ValueVariant::Text(body)),
        VariantKind::Binary => STANDARD
            .decode(body.trim())
            .map(ValueVariant::Binary)
            .map_err(|e| MigrateError::codec(FORMAT, format!("invalid base64 body: {}", e))),
    }
}

fn unexpected(token: &Token, wanted: &str) -> MigrateError {
    let found = match token {
        Token::Start(tag) => format!("<{}>", tag.name),
        Token::End(name) => format!("</{}>", name),
        Token::Text(text) => format!("text '{}'", text.chars().take(32).collect::<String>()),
        Token::Eof => "end of input".to_string(),
    };
    MigrateError::codec(FORMAT, format!("expected {}, found {}", wanted, found))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StartTag {
    name: String,
    attrs: Vec<(String, String)>,
    empty: bool,
}

impl StartTag {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Start(StartTag),
    End(String),
    Text(String),
    Eof,
}

/// Minimal pull tokenizer for the row document grammar.
///
/// Handles start, end and empty-element tags, attributes, character data,
/// CDATA sections, comments and processing instructions. DTDs are rejected.
struct Tokenizer<R> {
    input: R,
}

impl<R: BufRead> Tokenizer<R> {
    fn new(input: R) -> Self {
        Self { input }
    }

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

    fn require_byte(&mut self) -> Result<u8> {
        self.next_byte()?
            .ok_or_else(|| MigrateError::codec(FORMAT, "unexpected end of input inside markup"))
    }

    /// Consume bytes up to and including `terminator`, returning those before it.
    fn read_until_seq(&mut self, terminator: &[u8]) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        loop {
            buf.push(self.require_byte()?);
            if buf.ends_with(terminator) {
                buf.truncate(buf.len() - terminator.len());
                return Ok(buf);
            }
        }
    }

    /// Next token that is not whitespace-only text.
    fn next_markup(&mut self) -> Result<Token> {
        loop {
            match self.next_token()? {
                Token::Text(text) if text.chars().all(char::is_whitespace) => continue,
                token => return Ok(token),
            }
        }
    }

    /// Concatenated character data up to the matching end tag.
    fn text_until_end(&mut self, name: &str) -> Result<String> {
        let mut text = String::new();
        loop {
            match self.next_token()? {
                Token::Text(chunk) => text.push_str(&chunk),
                Token::End(end) if end == name => return Ok(text),
                other => return Err(unexpected(&other, &format!("</{}>", name))),
            }
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        loop {
            let Some(b) = self.peek()? else {
                return Ok(Token::Eof);
            };
            if b != b'<' {
                return self.read_text();
            }
            self.input.consume(1);

            match self.require_byte()? {
                b'?' => {
                    self.read_until_seq(b"?>")?;
                }
                b'!' => {
                    if let Some(text) = self.read_declaration()? {
                        return Ok(Token::Text(text));
                    }
                }
                b'/' => {
                    let raw = self.read_until_seq(b">")?;
                    let name = utf8(raw)?.trim().to_string();
                    return Ok(Token::End(name));
                }
                first => return self.read_start_tag(first),
            }
        }
    }

    /// `<!--` comments are skipped, `<![CDATA[` yields its text.
    fn read_declaration(&mut self) -> Result<Option<String>> {
        match self.require_byte()? {
            b'-' => {
                if self.require_byte()? != b'-' {
                    return Err(MigrateError::codec(FORMAT, "malformed comment"));
                }
                self.read_until_seq(b"-->")?;
                Ok(None)
            }
            b'[' => {
                let marker = self.read_until_seq(b"[")?;
                if marker != b"CDATA" {
                    return Err(MigrateError::codec(FORMAT, "malformed CDATA section"));
                }
                let raw = self.read_until_seq(b"]]>")?;
                Ok(Some(utf8(raw)?))
            }
            _ => Err(MigrateError::codec(
                FORMAT,
                "document type declarations are not supported",
            )),
        }
    }

    fn read_text(&mut self) -> Result<Token> {
        let mut raw = Vec::new();
        while let Some(b) = self.peek()? {
            if b == b'<' {
                break;
            }
            raw.push(b);
            self.input.consume(1);
        }
        let text = utf8(raw)?;
        Ok(Token::Text(unescape(&text)?.into_owned()))
    }

    fn read_start_tag(&mut self, first: u8) -> Result<Token> {
        let mut raw = vec![first];
        let mut quote: Option<u8> = None;
        loop {
            let b = self.require_byte()?;
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None if b == b'"' || b == b'\'' => quote = Some(b),
                None if b == b'>' => break,
                None => {}
            }
            raw.push(b);
        }

        let mut body = utf8(raw)?;
        let empty = body.ends_with('/');
        if empty {
            body.pop();
        }
        parse_start_tag(&body, empty).map(Token::Start)
    }
}

fn utf8(raw: Vec<u8>) -> Result<String> {
    String::from_utf8(raw).map_err(|e| MigrateError::codec(FORMAT, format!("invalid UTF-8: {}", e)))
}

/// Parse `name attr="v" attr2='w'`.
fn parse_start_tag(body: &str, empty: bool) -> Result<StartTag> {
    let body = body.trim();
    let name_end = body.find(char::is_whitespace).unwrap_or(body.len());
    let name = &body[..name_end];
    if name.is_empty() {
        return Err(MigrateError::codec(FORMAT, "start tag without a name"));
    }

    let mut attrs = Vec::new();
    let mut rest = body[name_end..].trim_start();
    while !rest.is_empty() {
        let eq = rest
            .find('=')
            .ok_or_else(|| MigrateError::codec(FORMAT, format!("malformed attribute in <{}>", name)))?;
        let key = rest[..eq].trim().to_string();
        let after = rest[eq + 1..].trim_start();
        let quote = after
            .chars()
            .next()
            .filter(|c| *c == '"' || *c == '\'')
            .ok_or_else(|| {
                MigrateError::codec(FORMAT, format!("unquoted attribute {} in <{}>", key, name))
            })?;
        let close = after[1..].find(quote).ok_or_else(|| {
            MigrateError::codec(FORMAT, format!("unterminated attribute {} in <{}>", key, name))
        })?;
        let value = unescape(&after[1..1 + close])?.into_owned();
        attrs.push((key, value));
        rest = after[close + 2..].trim_start();
    }

    Ok(StartTag {
        name: name.to_string(),
        attrs,
        empty,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::testing::{mixed_columns, mixed_rows, SharedBuf};
    use std::io::Cursor;

    fn write_rows(columns: &[ColumnDescriptor], rows: &[Row], options: &FormatOptions) -> String {
        let buf = SharedBuf::default();
        let mut writer = XmlFormat
            .writer(Box::new(buf.clone()), columns, options)
            .unwrap();
        for row in rows {
            writer.write_row(row).unwrap();
        }
        let total = writer.finish().unwrap();
        assert_eq!(total as usize, buf.bytes().len());
        buf.text()
    }

    fn read_all(doc: &str, columns: &[ColumnDescriptor]) -> Result<Vec<Row>> {
        let mut reader = XmlFormat.reader(
            Box::new(Cursor::new(doc.as_bytes().to_vec())),
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
        for options in [FormatOptions::default(), FormatOptions::default().unbuffered()] {
            let doc = write_rows(&columns, &rows, &options);
            assert_eq!(read_all(&doc, &columns).unwrap(), rows);
            // Kinds travel in the document, so no declared columns are needed.
            assert_eq!(read_all(&doc, &[]).unwrap(), rows);
        }
    }

    #[test]
    fn test_null_bitmap_and_omitted_columns() {
        let columns = vec![
            ColumnDescriptor::new("a", VariantKind::Text),
            ColumnDescriptor::new("b", VariantKind::Text),
            ColumnDescriptor::new("c", VariantKind::Text),
            ColumnDescriptor::new("d", VariantKind::Binary),
        ];
        let row: Row = vec![
            None,
            Some(ValueVariant::Text("b".into())),
            None,
            Some(ValueVariant::Binary(vec![0, 1, 2])),
        ];
        let doc = write_rows(&columns, &[row], &FormatOptions::default());
        assert_eq!(
            doc,
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<rowset>\n\
             <row nulls=\"05\"><col>b</col><col kind=\"binary\">AAEC</col></row>\n\
             </rowset>\n"
        );
    }

    #[test]
    fn test_escaped_text_in_document() {
        let row: Row = vec![Some(ValueVariant::Text("a<b\u{1}".into()))];
        let doc = write_rows(&[], &[row.clone()], &FormatOptions::default());
        assert!(doc.contains("<col>a&lt;b&#x1;</col>"));
        assert_eq!(read_all(&doc, &[]).unwrap(), vec![row]);
    }

    #[test]
    fn test_reader_tolerates_hand_written_documents() {
        let doc = r#"<?xml version="1.0"?>
<!-- exported by hand -->
<rowset>
  <row nulls="">
    <col>x</col>
    <col/>
    <col><![CDATA[<raw> & text]]></col>
  </row>
  <row nulls='02'><col>1</col><col>3</col></row>
  <row nulls="07"/>
</rowset>"#;
        let rows = read_all(doc, &[]).unwrap();
        assert_eq!(
            rows[0],
            vec![
                Some(ValueVariant::Text("x".into())),
                Some(ValueVariant::Text("".into())),
                Some(ValueVariant::Text("<raw> & text".into())),
            ]
        );
        assert_eq!(
            rows[1],
            vec![
                Some(ValueVariant::Text("1".into())),
                None,
                Some(ValueVariant::Text("3".into())),
            ]
        );
        assert_eq!(rows[2], vec![None, None, None]);
    }

    #[test]
    fn test_declared_kind_used_without_attribute() {
        let columns = vec![
            ColumnDescriptor::new("t", VariantKind::Text),
            ColumnDescriptor::new("b", VariantKind::Binary),
        ];
        let doc = "<rowset><row nulls=\"01\"><col>AAE=</col></row></rowset>";
        let rows = read_all(doc, &columns).unwrap();
        assert_eq!(rows, vec![vec![None, Some(ValueVariant::Binary(vec![0, 1]))]]);
    }

    #[test]
    fn test_empty_rowset() {
        assert!(read_all("<rowset/>", &[]).unwrap().is_empty());
        assert!(read_all("<rowset>\n</rowset>\n", &[]).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_documents_fail() {
        let cases = [
            "",
            "<rowset><row nulls=\"\"><col>x</col></row>",
            "<rowset><row nulls=\"\"><col>x</row></rowset>",
            "<rowset><row nulls=\"zz\"/></rowset>",
            "<rowset><row nulls=\"\"><col>&bogus;</col></row></rowset>",
            "<rowset><row nulls=\"\"><col kind=\"binary\">***</col></row></rowset>",
            "<rowset><row nulls=\"\"><col kind=\"float\">1</col></row></rowset>",
            "<rowset>stray text</rowset>",
            "<table/>",
        ];
        for doc in cases {
            let err = read_all(doc, &[]).unwrap_err();
            assert!(matches!(err, MigrateError::Codec { .. }), "{doc}: {err:?}");
        }
    }

    #[test]
    fn test_declared_width_mismatch_fails() {
        let columns = vec![
            ColumnDescriptor::new("a", VariantKind::Text),
            ColumnDescriptor::new("b", VariantKind::Text),
        ];
        let doc = "<rowset><row nulls=\"\"><col>1</col></row></rowset>";
        assert!(read_all(doc, &columns).is_err());
    }

    #[test]
    fn test_writer_rejects_kind_mismatch() {
        let columns = vec![ColumnDescriptor::new("b", VariantKind::Binary)];
        let mut writer = XmlFormat
            .writer(Box::new(Vec::new()), &columns, &FormatOptions::default())
            .unwrap();
        let err = writer
            .write_row(&vec![Some(ValueVariant::Text("x".into()))])
            .unwrap_err();
        assert!(err.to_string().contains("declared binary"));
    }

    #[test]
    fn test_column_index_skips_nulls() {
        let mut bitmap = NullBitmap::new();
        bitmap.set(0);
        bitmap.set(2);
        assert_eq!(column_index(&bitmap, 0), 1);
        assert_eq!(column_index(&bitmap, 1), 3);
        assert_eq!(column_index(&NullBitmap::new(), 3), 3);
    }
}
