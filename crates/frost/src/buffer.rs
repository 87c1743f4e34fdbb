// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Growable positional byte buffer used by every codec operation.
//!
//! A buffer starts either in write mode ([`AutoBuffer::new`]) or read mode
//! ([`AutoBuffer::from_bytes`]); [`AutoBuffer::flip`] turns a written buffer
//! into a readable one. In write mode the content ends at the position:
//! moving the position back and writing again overwrites the tail.

use crate::error::{WeaveError, WeaveResult};

/// Generate little-endian put methods for scalar types
macro_rules! impl_put_le {
    ($name:ident, $type:ty) => {
        pub fn $name(&mut self, value: $type) -> &mut Self {
            self.put_bytes(&value.to_le_bytes())
        }
    };
}

/// Generate little-endian get methods for scalar types
macro_rules! impl_get_le {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self) -> WeaveResult<$type> {
            let mut bytes = [0u8; $size];
            bytes.copy_from_slice(self.take($size)?);
            Ok(<$type>::from_le_bytes(bytes))
        }
    };
}

/// Length marker for a null string, array or fallback payload.
pub const NULL_LEN: i32 = -1;

/// Deepest chain of nested objects a read will follow.
pub const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, Default)]
pub struct AutoBuffer {
    buf: Vec<u8>,
    pos: usize,
    reading: bool,
    /// Nested objects currently being read.
    depth: usize,
}

impl AutoBuffer {
    /// Empty buffer in write mode.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Buffer in read mode over `bytes`, positioned at the start.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            buf: bytes.into(),
            reading: true,
            ..Self::default()
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move the position, clamped to the content length.
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.len());
    }

    /// Content length: the position in write mode, all bytes in read mode.
    pub fn len(&self) -> usize {
        if self.reading {
            self.buf.len()
        } else {
            self.pos.min(self.buf.len())
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn remaining(&self) -> usize {
        self.len().saturating_sub(self.pos)
    }

    /// Switch from writing to reading, rewinding to the start.
    pub fn flip(&mut self) -> &mut Self {
        if !self.reading {
            self.buf.truncate(self.pos);
            self.reading = true;
        }
        self.pos = 0;
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len()]
    }

    pub fn into_bytes(mut self) -> Vec<u8> {
        let len = self.len();
        self.buf.truncate(len);
        self.buf
    }

    /// Bytes not yet consumed in read mode.
    pub fn unread(&self) -> &[u8] {
        &self.buf[self.pos.min(self.buf.len())..self.len()]
    }

    // ------------------------------------------------------------------
    // Writing
    // ------------------------------------------------------------------

    pub fn put_bytes(&mut self, data: &[u8]) -> &mut Self {
        debug_assert!(!self.reading, "write on a buffer in read mode");
        self.buf.truncate(self.pos);
        self.buf.extend_from_slice(data);
        self.pos += data.len();
        self
    }

    pub fn put_bool(&mut self, value: bool) -> &mut Self {
        self.put_bytes(&[u8::from(value)])
    }

    impl_put_le!(put1, i8);
    impl_put_le!(put2, u16);
    impl_put_le!(put2s, i16);
    impl_put_le!(put4, i32);
    impl_put_le!(put4f, f32);
    impl_put_le!(put8, i64);
    impl_put_le!(put8d, f64);

    /// Length-prefixed UTF-8; `None` writes the null length.
    pub fn put_str(&mut self, value: Option<&str>) -> WeaveResult<&mut Self> {
        match value {
            None => Ok(self.put4(NULL_LEN)),
            Some(s) => {
                self.put_len(s.len())?;
                Ok(self.put_bytes(s.as_bytes()))
            }
        }
    }

    /// Array, string or payload length prefix.
    pub fn put_len(&mut self, len: usize) -> WeaveResult<&mut Self> {
        let len = i32::try_from(len)
            .map_err(|_| WeaveError::Encode(format!("length {len} exceeds the wire limit")))?;
        Ok(self.put4(len))
    }

    /// Raw text for the object-notation form.
    pub fn put_ascii(&mut self, text: &str) -> &mut Self {
        self.put_bytes(text.as_bytes())
    }

    // ------------------------------------------------------------------
    // Reading
    // ------------------------------------------------------------------

    fn take(&mut self, n: usize) -> WeaveResult<&[u8]> {
        let have = self.remaining();
        if n > have {
            return Err(WeaveError::Underflow {
                offset: self.pos,
                need: n,
                have,
            });
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.buf[start..start + n])
    }

    pub fn get_bytes(&mut self, n: usize) -> WeaveResult<&[u8]> {
        self.take(n)
    }

    pub fn get_bool(&mut self) -> WeaveResult<bool> {
        let offset = self.pos;
        match self.take(1)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(WeaveError::Decode(format!(
                "invalid boolean byte {other:#04x} at offset {offset}"
            ))),
        }
    }

    impl_get_le!(get1, i8, 1);
    impl_get_le!(get2, u16, 2);
    impl_get_le!(get2s, i16, 2);
    impl_get_le!(get4, i32, 4);
    impl_get_le!(get4f, f32, 4);
    impl_get_le!(get8, i64, 8);
    impl_get_le!(get8d, f64, 8);

    /// Length prefix; `None` for the null marker.
    pub fn get_len(&mut self) -> WeaveResult<Option<usize>> {
        let offset = self.pos;
        match self.get4()? {
            NULL_LEN => Ok(None),
            len if len < 0 => Err(WeaveError::Decode(format!(
                "negative length {len} at offset {offset}"
            ))),
            len => Ok(Some(len as usize)),
        }
    }

    pub fn get_str(&mut self) -> WeaveResult<Option<String>> {
        let Some(len) = self.get_len()? else {
            return Ok(None);
        };
        let offset = self.pos;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map(Some)
            .map_err(|e| WeaveError::Decode(format!("invalid UTF-8 string at offset {offset}: {e}")))
    }

    /// Advance past `n` bytes already consumed through [`unread`](Self::unread).
    pub fn skip(&mut self, n: usize) -> WeaveResult<()> {
        self.take(n).map(|_| ())
    }

    /// Run `f` one nesting level deeper, failing past [`MAX_NESTING`].
    pub fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> WeaveResult<T>) -> WeaveResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(WeaveError::Decode(format!(
                "objects nested deeper than {MAX_NESTING} at offset {}",
                self.pos
            )));
        }
        self.depth += 1;
        let out = f(self);
        self.depth -= 1;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nesting_limit() {
        fn descend(ab: &mut AutoBuffer, levels: usize) -> WeaveResult<usize> {
            if levels == 0 {
                return Ok(0);
            }
            ab.nested(|ab| descend(ab, levels - 1).map(|n| n + 1))
        }
        let mut ab = AutoBuffer::from_bytes(vec![]);
        assert_eq!(descend(&mut ab, MAX_NESTING).unwrap(), MAX_NESTING);
        assert!(matches!(descend(&mut ab, MAX_NESTING + 1), Err(WeaveError::Decode(_))));
        // The failed descent unwinds fully.
        assert_eq!(descend(&mut ab, 1).unwrap(), 1);
    }

    #[test]
    fn test_scalar_layout_is_little_endian() {
        let mut ab = AutoBuffer::new();
        ab.put4(1).put2(0x0203).put_bool(true);
        assert_eq!(ab.as_bytes(), &[1, 0, 0, 0, 3, 2, 1]);
    }

    #[test]
    fn test_write_then_read() {
        let mut ab = AutoBuffer::new();
        ab.put1(-3).put2s(-300).put4f(1.5).put8(i64::MIN).put8d(-0.25);
        ab.put_str(Some("héllo")).unwrap();
        ab.put_str(None).unwrap();
        ab.flip();

        assert_eq!(ab.get1().unwrap(), -3);
        assert_eq!(ab.get2s().unwrap(), -300);
        assert_eq!(ab.get4f().unwrap(), 1.5);
        assert_eq!(ab.get8().unwrap(), i64::MIN);
        assert_eq!(ab.get8d().unwrap(), -0.25);
        assert_eq!(ab.get_str().unwrap().as_deref(), Some("héllo"));
        assert_eq!(ab.get_str().unwrap(), None);
        assert_eq!(ab.remaining(), 0);
    }

    #[test]
    fn test_rewind_overwrites_tail() {
        let mut ab = AutoBuffer::new();
        ab.put_ascii("{\"a\":1,");
        let pos = ab.position();
        ab.set_position(pos - 1);
        ab.put_ascii("}");
        assert_eq!(ab.as_bytes(), b"{\"a\":1}");
        assert_eq!(ab.into_bytes(), b"{\"a\":1}".to_vec());
    }

    #[test]
    fn test_retracted_position_hides_tail() {
        let mut ab = AutoBuffer::new();
        ab.put_ascii("ab,");
        ab.set_position(2);
        assert_eq!(ab.as_bytes(), b"ab");
        ab.flip();
        assert_eq!(ab.remaining(), 2);
    }

    #[test]
    fn test_underflow_reports_offset() {
        let mut ab = AutoBuffer::from_bytes(vec![1, 2]);
        ab.get1().unwrap();
        match ab.get4() {
            Err(WeaveError::Underflow { offset, need, have }) => {
                assert_eq!((offset, need, have), (1, 4, 1));
            }
            other => panic!("expected underflow, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_bool_and_negative_len() {
        let mut ab = AutoBuffer::from_bytes(vec![7]);
        assert!(matches!(ab.get_bool(), Err(WeaveError::Decode(_))));

        let mut ab = AutoBuffer::from_bytes((-5i32).to_le_bytes().to_vec());
        assert!(matches!(ab.get_len(), Err(WeaveError::Decode(_))));
    }
}
