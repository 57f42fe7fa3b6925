//! Record type.

use std::fmt;

/// A key/value pair read from the store.
///
/// Records own their bytes: values are copied out of the snapshot when an
/// iterator or lookup reaches them, so a record stays usable after the
/// transaction that produced it has ended.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Record {
    /// Key bytes.
    pub key: Vec<u8>,
    /// Value bytes.
    pub value: Vec<u8>,
}

impl Record {
    /// Creates a new record.
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Returns the key as text, replacing invalid UTF-8.
    #[must_use]
    pub fn key_lossy(&self) -> String {
        String::from_utf8_lossy(&self.key).into_owned()
    }

    /// Returns the value as text, replacing invalid UTF-8.
    #[must_use]
    pub fn value_lossy(&self) -> String {
        String::from_utf8_lossy(&self.value).into_owned()
    }
}

impl From<(Vec<u8>, Vec<u8>)> for Record {
    fn from((key, value): (Vec<u8>, Vec<u8>)) -> Self {
        Self { key, value }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "key={}, value={}",
            String::from_utf8_lossy(&self.key),
            String::from_utf8_lossy(&self.value)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let record = Record::new("bKey", "bValue");
        assert_eq!(record.to_string(), "key=bKey, value=bValue");
    }

    #[test]
    fn lossy_accessors_replace_invalid_utf8() {
        let record = Record::new(vec![0x66, 0xff], "ok");
        assert_eq!(record.key_lossy(), "f\u{fffd}");
        assert_eq!(record.value_lossy(), "ok");
    }
}
