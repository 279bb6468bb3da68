//! Primitive encodings shared by the reader and the writer
//!
//! All integers are little-endian. A string is an `i16` length followed by
//! that many single-byte (Latin-1) characters; a bool is one byte, 0 or 1.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{FormatError, LoadResult};

/// Data format version this crate reads and writes
pub const SUPPORTED_VERSION: (i32, i32) = (1, 0);

pub(crate) trait ReadFormatExt: Read {
    fn read_text(&mut self) -> LoadResult<String> {
        let len = self.read_count16("string length")?;
        let mut bytes = vec![0u8; len];
        self.read_exact(&mut bytes)?;
        Ok(bytes.into_iter().map(char::from).collect())
    }

    fn read_flag(&mut self, field: &'static str) -> LoadResult<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(FormatError::InvalidBool { field, value }.into()),
        }
    }

    fn read_count16(&mut self, field: &'static str) -> LoadResult<usize> {
        let value = self.read_i16::<LittleEndian>()?;
        usize::try_from(value).map_err(|_| {
            FormatError::NegativeLength {
                field,
                value: value.into(),
            }
            .into()
        })
    }

    fn read_count32(&mut self, field: &'static str) -> LoadResult<usize> {
        let value = self.read_i32::<LittleEndian>()?;
        usize::try_from(value).map_err(|_| {
            FormatError::NegativeLength {
                field,
                value: value.into(),
            }
            .into()
        })
    }
}

impl<R: Read + ?Sized> ReadFormatExt for R {}

pub(crate) trait WriteFormatExt: Write {
    fn write_text(&mut self, value: &str) -> LoadResult<()> {
        let bytes = value
            .chars()
            .map(u8::try_from)
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|_| FormatError::Unencodable {
                value: value.to_string(),
            })?;
        self.write_count16("string length", bytes.len())?;
        self.write_all(&bytes)?;
        Ok(())
    }

    fn write_flag(&mut self, value: bool) -> LoadResult<()> {
        self.write_u8(u8::from(value))?;
        Ok(())
    }

    fn write_count16(&mut self, field: &'static str, count: usize) -> LoadResult<()> {
        let value = i16::try_from(count).map_err(|_| FormatError::TooMany { field, count })?;
        self.write_i16::<LittleEndian>(value)?;
        Ok(())
    }

    fn write_count32(&mut self, field: &'static str, count: usize) -> LoadResult<()> {
        let value = i32::try_from(count).map_err(|_| FormatError::TooMany { field, count })?;
        self.write_i32::<LittleEndian>(value)?;
        Ok(())
    }
}

impl<W: Write + ?Sized> WriteFormatExt for W {}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::error::LoadError;

    #[test]
    fn text_is_single_byte() {
        let mut out: Vec<u8> = Vec::new();
        out.write_text("Café").unwrap();
        assert_eq!(out, vec![4, 0, b'C', b'a', b'f', 0xE9]);

        let mut input = Cursor::new(out);
        assert_eq!(input.read_text().unwrap(), "Café");
    }

    #[test]
    fn wide_characters_are_rejected() {
        let err = Vec::<u8>::new().write_text("snow ☃").unwrap_err();
        assert!(matches!(err, LoadError::Format(FormatError::Unencodable { .. })));
    }

    #[test]
    fn negative_length_is_a_format_error() {
        let mut input = Cursor::new((-3i16).to_le_bytes().to_vec());
        let err = input.read_text().unwrap_err();
        assert!(matches!(
            err,
            LoadError::Format(FormatError::NegativeLength { value: -3, .. })
        ));
    }

    #[test]
    fn short_string_is_an_io_error() {
        let mut input = Cursor::new(vec![5, 0, b'a', b'b']);
        assert!(matches!(input.read_text().unwrap_err(), LoadError::Io(_)));
    }

    #[test]
    fn flags() {
        let mut input = Cursor::new(vec![0, 1, 2]);
        assert!(!input.read_flag("a").unwrap());
        assert!(input.read_flag("b").unwrap());
        assert!(matches!(
            input.read_flag("c").unwrap_err(),
            LoadError::Format(FormatError::InvalidBool { value: 2, .. })
        ));
    }

    #[test]
    fn counts_must_fit() {
        let err = Vec::<u8>::new().write_count16("children", 40_000).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Format(FormatError::TooMany { count: 40_000, .. })
        ));
    }
}
