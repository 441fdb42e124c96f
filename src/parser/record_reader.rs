use std::io::{ErrorKind, Read};

use crate::errors::HprofCrunchError;
use crate::errors::HprofCrunchError::InvalidRecord;
use crate::parser::record::{HprofRecord, RECORD_HEADER_LENGTH};
use crate::parser::record_parser::parse_record_header;

/// Pulls one top-level record at a time, payload included.
///
/// Yields the number of bytes processed so far (starting at `processed_len`) with each record.
pub struct HprofRecordIter<R> {
    reader: R,
    processed_len: usize,
    done: bool,
}

impl<R: Read> HprofRecordIter<R> {
    pub fn new(reader: R, processed_len: usize) -> Self {
        HprofRecordIter {
            reader,
            processed_len,
            done: false,
        }
    }

    fn pull_next(&mut self) -> Result<Option<HprofRecord>, HprofCrunchError> {
        let mut header_buffer = Vec::with_capacity(RECORD_HEADER_LENGTH);
        self.reader
            .by_ref()
            .take(RECORD_HEADER_LENGTH as u64)
            .read_to_end(&mut header_buffer)?;
        if header_buffer.is_empty() {
            // end of input between two records
            return Ok(None);
        }
        if header_buffer.len() != RECORD_HEADER_LENGTH {
            return Err(InvalidRecord {
                message: format!(
                    "truncated record header of {} bytes at offset {}",
                    header_buffer.len(),
                    self.processed_len
                ),
            });
        }
        let (_, header) = parse_record_header(&header_buffer).map_err(|e| InvalidRecord {
            message: format!("record header at offset {}: {e:?}", self.processed_len),
        })?;
        let mut payload = vec![0; header.length as usize];
        self.reader.read_exact(&mut payload).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                InvalidRecord {
                    message: format!(
                        "record with tag {:#04x} at offset {} expects {} bytes past the end of input",
                        header.tag, self.processed_len, header.length
                    ),
                }
            } else {
                HprofCrunchError::StdIoError { e }
            }
        })?;
        self.processed_len += RECORD_HEADER_LENGTH + payload.len();
        Ok(Some(HprofRecord {
            tag: header.tag,
            timestamp: header.timestamp,
            payload,
        }))
    }
}

impl<R: Read> Iterator for HprofRecordIter<R> {
    type Item = Result<(usize, HprofRecord), HprofCrunchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.pull_next() {
            Ok(Some(record)) => Some(Ok((self.processed_len, record))),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
