pub mod file_header_parser;
pub mod gc_record;
pub mod primitive_parsers;
pub mod record;
pub mod record_parser;
pub mod record_reader;

#[cfg(test)]
pub mod test_hprof;
