//! XML character escaping.
//!
//! Characters outside the XML 1.0 `Char` production are written as numeric
//! references instead of being dropped. CR is also written as a reference so
//! that end-of-line normalization in other parsers cannot rewrite it.

use std::borrow::Cow;

use crate::error::{MigrateError, Result};

/// Largest codepoint accepted in a numeric reference.
const MAX_REFERENCE: u32 = 0xFFFF;

/// True for characters that may appear unescaped in XML 1.0 content.
pub fn is_xml_char(c: char) -> bool {
    matches!(
        c as u32,
        0x9 | 0xA | 0xD | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x10000..=0x10FFFF
    )
}

fn needs_escape(c: char) -> bool {
    matches!(c, '&' | '<' | '>' | '"' | '\'' | '\r') || !is_xml_char(c)
}

/// Escape text for element content or attribute values.
pub fn escape(text: &str) -> Cow<'_, str> {
    let Some(first) = text.find(needs_escape) else {
        return Cow::Borrowed(text);
    };

    let mut out = String::with_capacity(text.len() + 16);
    out.push_str(&text[..first]);
    for c in text[first..].chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if c == '\r' || !is_xml_char(c) => {
                out.push_str(&format!("&#x{:X};", c as u32));
            }
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Decode named, decimal and hex character references.
pub fn unescape(text: &str) -> Result<Cow<'_, str>> {
    if !text.contains('&') {
        return Ok(Cow::Borrowed(text));
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after.find(';').ok_or_else(|| {
            let head: String = after.chars().take(12).collect();
            invalid_entity(&head, "missing ';'")
        })?;
        let entity = &after[..semi];
        out.push(decode_entity(entity)?);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(Cow::Owned(out))
}

fn decode_entity(entity: &str) -> Result<char> {
    match entity {
        "amp" => return Ok('&'),
        "lt" => return Ok('<'),
        "gt" => return Ok('>'),
        "quot" => return Ok('"'),
        "apos" => return Ok('\''),
        _ => {}
    }

    let code = if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        parse_reference(hex, 16)
    } else if let Some(dec) = entity.strip_prefix('#') {
        parse_reference(dec, 10)
    } else {
        return Err(invalid_entity(entity, "unknown entity"));
    };

    let code = code.ok_or_else(|| invalid_entity(entity, "malformed number"))?;
    if code > MAX_REFERENCE {
        return Err(invalid_entity(entity, "codepoint above U+FFFF"));
    }
    char::from_u32(code).ok_or_else(|| invalid_entity(entity, "not a Unicode scalar value"))
}

fn parse_reference(digits: &str, radix: u32) -> Option<u32> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u32::from_str_radix(digits, radix).ok()
}

fn invalid_entity(entity: &str, reason: &str) -> MigrateError {
    MigrateError::codec("xml", format!("invalid entity '&{}': {}", entity, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_borrowed() {
        assert!(matches!(escape("hello world"), Cow::Borrowed(_)));
        assert!(matches!(unescape("hello world").unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn test_predefined_entities() {
        assert_eq!(
            escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &apos;Jerry&apos;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_invalid_chars_become_references() {
        assert_eq!(escape("a\u{1}b"), "a&#x1;b");
        assert_eq!(escape("\u{FFFE}\u{FFFF}"), "&#xFFFE;&#xFFFF;");
        assert_eq!(escape("\r\n\t"), "&#xD;\n\t");
        assert_eq!(escape("😀"), "😀");
    }

    #[test]
    fn test_roundtrip_awkward_strings() {
        let samples = [
            "",
            "\u{0}\u{1}\u{8}\u{B}\u{C}\u{1F}",
            "&amp; is already escaped",
            "<>&\"'",
            "\u{FFFE}\u{FFFF}\u{D7FF}\u{E000}",
            "line1\r\nline2\rline3",
            "𝄞 music 😀",
        ];
        for s in samples {
            assert_eq!(unescape(&escape(s)).unwrap(), s, "{s:?}");
        }
    }

    #[test]
    fn test_unescape_numeric_forms() {
        assert_eq!(unescape("&#65;&#x42;&#X43;").unwrap(), "ABC");
        assert_eq!(unescape("&#xffff;").unwrap(), "\u{FFFF}");
    }

    #[test]
    fn test_unescape_rejects_bad_references() {
        for bad in [
            "&#x10000;",
            "&#128512;",
            "&#xD800;",
            "&nbsp;",
            "&#;",
            "&#x;",
            "&#12a;",
            "dangling & ampersand",
        ] {
            assert!(unescape(bad).is_err(), "{bad}");
        }
    }
}
