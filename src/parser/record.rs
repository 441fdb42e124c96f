pub const TAG_STRING: u8 = 0x01;
pub const TAG_LOAD_CLASS: u8 = 0x02;
pub const TAG_UNLOAD_CLASS: u8 = 0x03;
pub const TAG_HEAP_DUMP: u8 = 0x0C;
pub const TAG_HEAP_DUMP_SEGMENT: u8 = 0x1C;
pub const TAG_HEAP_DUMP_END: u8 = 0x2C;

/// Length of the framing preceding every record payload: tag, timestamp and length.
pub const RECORD_HEADER_LENGTH: usize = 9;

#[derive(Debug, PartialEq, Eq)]
pub struct RecordHeader {
    pub tag: u8,
    pub timestamp: u32,
    pub length: u32,
}

/// Top-level record with its payload still undecoded.
#[derive(Debug, PartialEq, Eq)]
pub struct HprofRecord {
    pub tag: u8,
    pub timestamp: u32,
    pub payload: Vec<u8>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct HprofString {
    pub id: u64,
    pub value: Box<[u8]>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct LoadClassData {
    pub serial_number: u32,
    pub class_object_id: u64,
    pub class_name_id: u64,
}
