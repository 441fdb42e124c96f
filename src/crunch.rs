use std::fs;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Read, Seek, SeekFrom, Write};

use indicatif::{ProgressBar, ProgressStyle};

use crate::crunch_processor::{CrunchProcessor, CrunchStats};
use crate::errors::HprofCrunchError;
use crate::errors::HprofCrunchError::{InvalidHeader, InvalidIdSize};
use crate::parser::file_header_parser::{FileHeader, parse_file_header};
use crate::parser::record_reader::HprofRecordIter;
use crate::summary::CrunchSummary;
use crate::utils::pretty_bytes_size;

// u32 id size followed by the u64 timestamp
const HEADER_FIXED_LENGTH: usize = 12;

pub struct CrunchOptions {
    /// Write string hashes instead of the string text.
    pub hashed_strings: bool,
    pub debug_mode: bool,
}

/// Converts the hprof file at `input_path` into a BMD file at `output_path`.
///
/// The output file is removed if the conversion fails.
pub fn crunch_file(
    input_path: &str,
    output_path: &str,
    options: &CrunchOptions,
) -> Result<CrunchSummary, HprofCrunchError> {
    let file = File::open(input_path)?;
    let file_len = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    let (header, header_len) = crunch_header(&mut reader)?;
    println!(
        "Processing {} binary hprof file in '{}' format.",
        pretty_bytes_size(file_len),
        header.format
    );

    let writer = BufWriter::new(File::create(output_path)?);

    // every byte is read once per pass
    let pb = ProgressBar::new(file_len * 2);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} (speed:{bytes_per_sec}) (eta:{eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let result = crunch_records(
        &mut reader,
        writer,
        &header,
        header_len,
        file_len,
        options,
        &pb,
    );
    pb.finish_and_clear();

    match result {
        Ok((_, stats)) => Ok(CrunchSummary::new(file_len, stats)),
        Err(e) => {
            if let Err(remove_error) = fs::remove_file(output_path) {
                eprintln!("could not remove partial output '{output_path}': {remove_error}");
            }
            Err(e)
        }
    }
}

/// Reads and validates the file header, returns it with its length in bytes.
pub fn crunch_header<R: BufRead>(reader: &mut R) -> Result<(FileHeader, usize), HprofCrunchError> {
    let mut header_buffer = Vec::new();
    reader.read_until(0, &mut header_buffer)?;
    if header_buffer.last() != Some(&0) {
        return Err(InvalidHeader {
            message: "format name is not NUL terminated".to_string(),
        });
    }
    let mut fixed = [0; HEADER_FIXED_LENGTH];
    reader.read_exact(&mut fixed).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            InvalidHeader {
                message: "input ends before the id size and timestamp".to_string(),
            }
        } else {
            HprofCrunchError::StdIoError { e }
        }
    })?;
    header_buffer.extend_from_slice(&fixed);

    let (rest, header) = parse_file_header(&header_buffer).map_err(|e| InvalidHeader {
        message: format!("{e:?}"),
    })?;
    if !rest.is_empty() {
        return Err(InvalidHeader {
            message: format!("{} unexpected trailing bytes", rest.len()),
        });
    }
    let id_size = header.size_pointers;
    if id_size != 4 && id_size != 8 {
        return Err(InvalidIdSize { size: id_size });
    }
    Ok((header, header_buffer.len()))
}

/// Runs both passes over the records following the file header.
pub fn crunch_records<R: Read + Seek, W: Write>(
    reader: &mut R,
    out: W,
    header: &FileHeader,
    header_len: usize,
    input_len: u64,
    options: &CrunchOptions,
    pb: &ProgressBar,
) -> Result<(W, CrunchStats), HprofCrunchError> {
    let mut processor = CrunchProcessor::new(
        out,
        header.size_pointers,
        options.hashed_strings,
        options.debug_mode,
    );
    processor.on_header(header)?;

    let records = crunch_pass(reader, &mut processor, header_len, 0, pb)?;
    if options.debug_mode {
        println!("Definitions pass done after {records} records");
    }

    processor.all_classes_read();
    let records = crunch_pass(reader, &mut processor, header_len, input_len, pb)?;
    if options.debug_mode {
        println!("Objects pass done after {records} records");
    }

    processor.finish()
}

fn crunch_pass<R: Read + Seek, W: Write>(
    reader: &mut R,
    processor: &mut CrunchProcessor<W>,
    header_len: usize,
    progress_offset: u64,
    pb: &ProgressBar,
) -> Result<u64, HprofCrunchError> {
    reader.seek(SeekFrom::Start(header_len as u64))?;
    let mut records = 0;
    for next in HprofRecordIter::new(reader.by_ref(), header_len) {
        let (processed, record) = next?;
        processor.on_record(&record)?;
        pb.set_position(progress_offset + processed as u64);
        records += 1;
    }
    Ok(records)
}
