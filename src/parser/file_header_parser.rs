use crate::parser::primitive_parsers::{parse_c_string, parse_u32, parse_u64};
use nom::IResult;
use nom::Parser;
use nom::combinator::map;

#[derive(Debug, PartialEq, Eq)]
pub struct FileHeader {
    /// Lossy text of `format_bytes`, for display.
    pub format: String,
    /// Format name exactly as found in the file, without its NUL terminator.
    pub format_bytes: Vec<u8>,
    pub size_pointers: u32,
    pub timestamp: u64,
}

impl FileHeader {
    pub fn from_bytes(format_b: &[u8], size_pointers: u32, timestamp: u64) -> Self {
        Self {
            format: String::from_utf8_lossy(format_b).to_string(),
            format_bytes: format_b.to_vec(),
            size_pointers,
            timestamp,
        }
    }
}

pub fn parse_file_header(i: &[u8]) -> IResult<&[u8], FileHeader> {
    map(
        (parse_c_string, parse_u32, parse_u64),
        |(format, size_pointers, timestamp)| {
            FileHeader::from_bytes(format, size_pointers, timestamp)
        },
    )
    .parse(i)
}
