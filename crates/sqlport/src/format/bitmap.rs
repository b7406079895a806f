//! Per-row null bitmap.
//!
//! Bit `i` lives in byte `i / 8` under mask `1 << (i % 8)`; a set bit means
//! column `i` is NULL. Trailing zero bytes are never stored, so a row without
//! nulls has an empty bitmap and an empty hex form.

use crate::core::Row;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NullBitmap {
    bytes: Vec<u8>,
}

impl NullBitmap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bitmap of the `None` positions of a row.
    pub fn from_row<T>(row: &[Option<T>]) -> Self {
        let mut bitmap = Self::new();
        for (i, value) in row.iter().enumerate() {
            if value.is_none() {
                bitmap.set(i);
            }
        }
        bitmap
    }

    /// Bitmap from stored bytes; trailing zero bytes are dropped.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let len = bytes.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
        Self {
            bytes: bytes[..len].to_vec(),
        }
    }

    pub fn from_hex(hex: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(hex.trim())?;
        Ok(Self::from_bytes(&bytes))
    }

    pub fn set(&mut self, index: usize) {
        let byte = index / 8;
        if byte >= self.bytes.len() {
            self.bytes.resize(byte + 1, 0);
        }
        self.bytes[byte] |= 1 << (index % 8);
    }

    pub fn is_null(&self, index: usize) -> bool {
        self.bytes
            .get(index / 8)
            .is_some_and(|b| b & (1 << (index % 8)) != 0)
    }

    /// Number of null columns.
    pub fn count(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Highest null position, if any.
    pub fn highest(&self) -> Option<usize> {
        let last = *self.bytes.last()?;
        Some((self.bytes.len() - 1) * 8 + (7 - last.leading_zeros() as usize))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lowercase hex of the stored bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl From<&Row> for NullBitmap {
    fn from(row: &Row) -> Self {
        Self::from_row(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ValueVariant;

    #[test]
    fn test_nulls_at_zero_and_two() {
        let row: Row = vec![
            None,
            Some(ValueVariant::Text("b".into())),
            None,
            Some(ValueVariant::Text("d".into())),
        ];
        let bitmap = NullBitmap::from(&row);
        assert_eq!(bitmap.as_bytes(), &[0b0000_0101]);
        assert_eq!(bitmap.to_hex(), "05");
        assert_eq!(bitmap.count(), 2);
        assert!(bitmap.is_null(0) && bitmap.is_null(2));
        assert!(!bitmap.is_null(1) && !bitmap.is_null(3) && !bitmap.is_null(100));
        assert_eq!(bitmap.highest(), Some(2));
    }

    #[test]
    fn test_no_nulls_is_empty() {
        let row: Row = vec![Some(ValueVariant::Binary(vec![]))];
        let bitmap = NullBitmap::from(&row);
        assert!(bitmap.is_empty());
        assert_eq!(bitmap.to_hex(), "");
        assert_eq!(bitmap.highest(), None);
        assert_eq!(NullBitmap::from_hex("").unwrap(), bitmap);
    }

    #[test]
    fn test_multi_byte_layout() {
        let mut bitmap = NullBitmap::new();
        bitmap.set(9);
        bitmap.set(15);
        assert_eq!(bitmap.as_bytes(), &[0x00, 0x82]);
        assert_eq!(bitmap.to_hex(), "0082");
        assert_eq!(bitmap.highest(), Some(15));
    }

    #[test]
    fn test_from_bytes_trims_trailing_zeros() {
        let bitmap = NullBitmap::from_bytes(&[0x01, 0x00, 0x00]);
        assert_eq!(bitmap.as_bytes(), &[0x01]);
        assert_eq!(NullBitmap::from_hex("0100").unwrap(), bitmap);
        assert_eq!(NullBitmap::from_hex("0A").unwrap().as_bytes(), &[0x0a]);
        assert!(NullBitmap::from_hex("zz").is_err());
    }
}
