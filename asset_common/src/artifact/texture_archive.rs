use std::fmt;

use super::{split_numbered_line, FormatError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureHeader<'a> {
    pub name: &'a str,
    pub width: u32,
    pub height: u32,
    pub byte_length: u64,
}

impl fmt::Display for TextureHeader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.name, self.width, self.height, self.byte_length
        )
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct TextureRecord {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl fmt::Debug for TextureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureRecord")
            .field("name", &self.name)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixels_len", &self.pixels.len())
            .finish()
    }
}

/// A header line per texture, immediately followed by exactly `byte_length` raw bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextureArchive {
    pub textures: Vec<TextureRecord>,
}

impl TextureArchive {
    pub fn parse(bytes: &[u8]) -> Result<Self, FormatError> {
        let mut textures = Vec::new();
        let mut rest = bytes;
        let mut entry = 1;

        while !rest.is_empty() {
            let line_end = rest
                .iter()
                .position(|&b| b == b'\n')
                .ok_or(FormatError::FieldCount {
                    line: entry,
                    expected: 4,
                })?;
            let line = std::str::from_utf8(&rest[..line_end])
                .map_err(|_| FormatError::Utf8 { line: entry })?;
            let (name, [width, height, byte_length]) = split_numbered_line::<3>(line, entry)?;
            rest = &rest[line_end + 1..];

            if (rest.len() as u64) < byte_length {
                return Err(FormatError::Truncated {
                    name: name.to_string(),
                    expected: byte_length,
                    available: rest.len() as u64,
                });
            }
            let (pixels, tail) = rest.split_at(byte_length as usize);
            textures.push(TextureRecord {
                name: name.to_string(),
                width: narrow(width, entry)?,
                height: narrow(height, entry)?,
                pixels: pixels.to_vec(),
            });
            rest = tail;
            entry += 1;
        }

        Ok(Self { textures })
    }

    pub fn get(&self, name: &str) -> Option<&TextureRecord> {
        self.textures.iter().find(|t| t.name == name)
    }
}

fn narrow(value: u64, line: usize) -> Result<u32, FormatError> {
    u32::try_from(value).map_err(|_| FormatError::InvalidNumber {
        line,
        value: value.to_string(),
    })
}
