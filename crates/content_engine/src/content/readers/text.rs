//! Plain UTF-8 text content

use std::io::Read;

use crate::content::error::ContentError;
use crate::content::key::Content;
use crate::content::provider::ContentProvider;
use crate::content::reader::{ContentReader, InPlaceReader};

/// Text file contents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Text {
    /// Decoded text
    pub value: String,
}

impl Content for Text {}

/// Reads [`Text`], re-reading in place on hot swap
#[derive(Debug, Clone, Copy, Default)]
pub struct TextReader;

pub(crate) fn read_utf8(stream: &mut dyn Read) -> Result<String, ContentError> {
    let mut bytes = Vec::new();
    stream.read_to_end(&mut bytes)?;
    String::from_utf8(bytes).map_err(|e| ContentError::invalid_data(format!("Text is not valid UTF-8: {}", e)))
}

impl ContentReader<Text> for TextReader {
    fn read(&self, stream: &mut dyn Read, _provider: &mut dyn ContentProvider) -> Result<Text, ContentError> {
        Ok(Text {
            value: read_utf8(stream)?,
        })
    }

    fn in_place(&self) -> Option<&dyn InPlaceReader<Text>> {
        Some(self)
    }

    fn supports_subtypes(&self) -> bool {
        true
    }
}

impl InPlaceReader<Text> for TextReader {
    fn read_into(
        &self,
        existing: &mut Text,
        stream: &mut dyn Read,
        _provider: &mut dyn ContentProvider,
    ) -> Result<(), ContentError> {
        existing.value = read_utf8(stream)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_invalid_utf8_rejected() {
        let mut stream = Cursor::new(vec![0xff, 0xfe, 0x00]);
        assert!(matches!(read_utf8(&mut stream), Err(ContentError::InvalidData { .. })));
    }

    #[test]
    fn test_utf8_decoded() {
        let mut stream = Cursor::new("grüße".as_bytes().to_vec());
        assert_eq!(read_utf8(&mut stream).unwrap(), "grüße");
    }
}
