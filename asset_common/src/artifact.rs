//! The files a conversion run produces and readers for them.
//!
//! All five files are written from the same bucket-ordered mesh sequence, the
//! offsets in the loader index are only meaningful together with the two
//! buffer files of the same run.

mod buffers;
mod loader_index;
mod material_table;
mod texture_archive;

pub use buffers::*;
pub use loader_index::*;
pub use material_table::*;
pub use texture_archive::*;

pub const VERTEX_BUFFER_FILE: &str = "dat.vbf";
pub const INDEX_BUFFER_FILE: &str = "dat.ebf";
pub const LOADER_INDEX_FILE: &str = "dat.ldr";
pub const MATERIAL_FILE: &str = "dat.mtr";
pub const TEXTURE_FILE: &str = "dat.txr";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("line {line}: missing header")]
    MissingHeader { line: usize },
    #[error("line {line}: expected {expected} fields")]
    FieldCount { line: usize, expected: usize },
    #[error("line {line}: {value:?} is not a valid number")]
    InvalidNumber { line: usize, value: String },
    #[error("header announces {expected} entries, found {found}")]
    EntryCount { expected: u64, found: u64 },
    #[error("entry {name:?} announces {expected} bytes, only {available} remain")]
    Truncated {
        name: String,
        expected: u64,
        available: u64,
    },
    #[error("buffer length {length} is not a multiple of the {stride} byte record size")]
    Misaligned { length: usize, stride: usize },
    #[error("line {line}: not valid UTF-8")]
    Utf8 { line: usize },
}

/// Splits `<name> <n1> ... <nN>` from the right, so names may contain spaces.
fn split_numbered_line<const N: usize>(
    line: &str,
    line_number: usize,
) -> Result<(&str, [u64; N]), FormatError> {
    let mut numbers = [0u64; N];
    let mut rest = line.trim_end();
    for slot in numbers.iter_mut().rev() {
        let (head, value) = rest.rsplit_once(' ').ok_or(FormatError::FieldCount {
            line: line_number,
            expected: N + 1,
        })?;
        *slot = parse_number(value, line_number)?;
        rest = head;
    }
    if rest.is_empty() {
        return Err(FormatError::FieldCount {
            line: line_number,
            expected: N + 1,
        });
    }
    Ok((rest, numbers))
}

fn parse_number(value: &str, line_number: usize) -> Result<u64, FormatError> {
    value.parse().map_err(|_| FormatError::InvalidNumber {
        line: line_number,
        value: value.to_string(),
    })
}
