use std::io::Write;

use ahash::AHashSet;
use serde::Serialize;

use crate::bmd_writer::{BMD_FORMAT_VERSION, BmdWriter};
use crate::class_compactor::compact_class_definition;
use crate::class_registry::ClassRegistry;
use crate::errors::HprofCrunchError;
use crate::id_map::IdMap;
use crate::instance_compactor::compact_instance_dump;
use crate::parser::file_header_parser::FileHeader;
use crate::parser::gc_record::{ClassDumpFields, GcRecord};
use crate::parser::record::{
    HprofRecord, HprofString, TAG_HEAP_DUMP, TAG_HEAP_DUMP_END, TAG_HEAP_DUMP_SEGMENT,
    TAG_LOAD_CLASS, TAG_STRING, TAG_UNLOAD_CLASS,
};
use crate::parser::record_parser::HprofRecordParser;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CrunchPhase {
    /// Strings, class loads and class dumps.
    ReadingDefinitions,
    /// Instance dumps, every class is known by now.
    ReadingObjects,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct CrunchStats {
    pub strings: u64,
    pub classes_loaded: u64,
    pub class_definitions: u64,
    pub instance_dumps: u64,
    pub legacy_records: u64,
    pub discarded_records: u64,
    pub gc_roots: u64,
    pub object_arrays_skipped: u64,
    pub primitive_arrays_skipped: u64,
    pub classes_known: u64,
    pub mapped_object_ids: u64,
    pub bytes_written: u64,
}

/// Turns hprof records into BMD entries over two passes on the same input.
///
/// The first pass writes strings and class definitions, `all_classes_read` switches
/// to the second pass which writes the instance dumps.
pub struct CrunchProcessor<W: Write> {
    writer: BmdWriter<W>,
    parser: HprofRecordParser,
    debug_mode: bool,
    hashed_strings: bool,
    phase: CrunchPhase,
    string_ids: IdMap,
    defined_strings: AHashSet<u64>,
    object_ids: IdMap,
    classes: ClassRegistry,
    stats: CrunchStats,
}

impl<W: Write> CrunchProcessor<W> {
    pub fn new(out: W, id_size: u32, hashed_strings: bool, debug_mode: bool) -> Self {
        CrunchProcessor {
            writer: BmdWriter::new(out),
            parser: HprofRecordParser::new(id_size),
            debug_mode,
            hashed_strings,
            phase: CrunchPhase::ReadingDefinitions,
            string_ids: IdMap::new(),
            defined_strings: AHashSet::new(),
            object_ids: IdMap::new(),
            classes: ClassRegistry::new(),
            stats: CrunchStats::default(),
        }
    }

    #[cfg(test)]
    pub fn phase(&self) -> CrunchPhase {
        self.phase
    }

    pub fn on_header(&mut self, header: &FileHeader) -> Result<(), HprofCrunchError> {
        if self.debug_mode {
            println!(
                "Header format:'{}' id size:{} timestamp:{}",
                header.format, header.size_pointers, header.timestamp
            );
        }
        self.writer
            .write_header(BMD_FORMAT_VERSION, &header.format_bytes)?;
        Ok(())
    }

    /// Every string and class definition has been read, the next records are read for their objects.
    pub fn all_classes_read(&mut self) {
        self.phase = CrunchPhase::ReadingObjects;
    }

    pub fn on_record(&mut self, record: &HprofRecord) -> Result<(), HprofCrunchError> {
        if self.debug_mode {
            println!(
                "Found record tag:{:#04x} timestamp:{} length:{} phase:{:?}",
                record.tag,
                record.timestamp,
                record.payload.len(),
                self.phase
            );
        }
        match self.phase {
            CrunchPhase::ReadingDefinitions => self.on_definition_record(record),
            CrunchPhase::ReadingObjects => self.on_object_record(record),
        }
    }

    fn on_definition_record(&mut self, record: &HprofRecord) -> Result<(), HprofCrunchError> {
        match record.tag {
            TAG_STRING => {
                let string = self.parser.parse_string_record(&record.payload)?;
                self.write_string(&string)?;
            }
            TAG_LOAD_CLASS => {
                let load_class = self.parser.parse_load_class(&record.payload)?;
                let mapped_id = self.object_ids.map(load_class.class_object_id);
                self.classes.register_loaded(
                    load_class.class_object_id,
                    mapped_id,
                    load_class.class_name_id,
                );
                self.stats.classes_loaded += 1;
                if self.debug_mode {
                    println!(
                        "Loaded class serial:{} id:{:#x} as {}",
                        load_class.serial_number, load_class.class_object_id, mapped_id
                    );
                }
            }
            TAG_HEAP_DUMP | TAG_HEAP_DUMP_SEGMENT => {
                for gc_record in self.parser.heap_dump_records(&record.payload) {
                    match gc_record? {
                        GcRecord::ClassDump(class_dump) => self.write_class_definition(*class_dump)?,
                        GcRecord::InstanceDump(_)
                        | GcRecord::ObjectArrayDump { .. }
                        | GcRecord::PrimitiveArrayDump { .. }
                        | GcRecord::PrimitiveArrayNoData { .. } => (), // second pass
                        GcRecord::HeapDumpInfo { .. } => (),
                        _ => self.stats.gc_roots += 1,
                    }
                }
            }
            TAG_UNLOAD_CLASS | TAG_HEAP_DUMP_END => self.stats.discarded_records += 1,
            tag => {
                self.writer.write_legacy_record(tag, &record.payload)?;
                self.stats.legacy_records += 1;
            }
        }
        Ok(())
    }

    fn on_object_record(&mut self, record: &HprofRecord) -> Result<(), HprofCrunchError> {
        match record.tag {
            TAG_HEAP_DUMP | TAG_HEAP_DUMP_SEGMENT => {
                for gc_record in self.parser.heap_dump_records(&record.payload) {
                    match gc_record? {
                        GcRecord::InstanceDump(instance) => {
                            let compact = compact_instance_dump(
                                &instance,
                                &self.classes,
                                &mut self.object_ids,
                                self.parser.id_size(),
                            )?;
                            self.writer.write_instance_dump(&compact)?;
                            self.stats.instance_dumps += 1;
                        }
                        // arrays are recognized but not compacted yet
                        GcRecord::ObjectArrayDump { .. } => self.stats.object_arrays_skipped += 1,
                        GcRecord::PrimitiveArrayDump { .. } | GcRecord::PrimitiveArrayNoData { .. } => {
                            self.stats.primitive_arrays_skipped += 1;
                        }
                        _ => (), // handled in the first pass
                    }
                }
            }
            _ => (),
        }
        Ok(())
    }

    fn write_string(&mut self, string: &HprofString) -> Result<(), HprofCrunchError> {
        if !self.defined_strings.insert(string.id) {
            return Err(HprofCrunchError::DuplicateStringId { id: string.id });
        }
        let mapped_id = self.string_ids.map(string.id);
        self.writer
            .write_string(mapped_id, &string.value, self.hashed_strings)?;
        self.stats.strings += 1;
        Ok(())
    }

    fn write_class_definition(
        &mut self,
        class_dump: ClassDumpFields,
    ) -> Result<(), HprofCrunchError> {
        let mapped_id = self.object_ids.map(class_dump.class_object_id);
        let class = self.classes.define(class_dump, mapped_id);
        let compact = compact_class_definition(
            class,
            &mut self.string_ids,
            &mut self.object_ids,
            self.parser.id_size(),
        );
        if self.debug_mode {
            println!(
                "Class dump id:{:#x} name id:{:#x} instance size:{} retained fields:{} skipped bytes:{}",
                class.object_id,
                class.class_name_id,
                class.instance_size,
                compact.retained_fields.len(),
                compact.skipped_bytes
            );
        }
        self.writer.write_class_definition(&compact)?;
        self.stats.class_definitions += 1;
        Ok(())
    }

    /// Flushes the output and returns it with the run counters.
    pub fn finish(self) -> Result<(W, CrunchStats), HprofCrunchError> {
        let mut stats = self.stats;
        stats.bytes_written = self.writer.bytes_written();
        stats.classes_known = self.classes.len() as u64;
        stats.mapped_object_ids = self.object_ids.len() as u64;
        let out = self.writer.into_inner()?;
        Ok((out, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::gc_record::FieldType;
    use crate::parser::test_hprof::{SegmentBuilder, id_bytes};

    fn record(tag: u8, payload: Vec<u8>) -> HprofRecord {
        HprofRecord {
            tag,
            timestamp: 0,
            payload,
        }
    }

    fn string_record(id: u64, text: &str) -> HprofRecord {
        let mut payload = id_bytes(4, id);
        payload.extend_from_slice(text.as_bytes());
        record(TAG_STRING, payload)
    }

    fn be32(value: i32) -> Vec<u8> {
        value.to_be_bytes().to_vec()
    }

    #[test]
    fn starts_reading_definitions() {
        let mut processor = CrunchProcessor::new(Vec::new(), 4, true, false);
        assert_eq!(processor.phase(), CrunchPhase::ReadingDefinitions);
        processor.all_classes_read();
        assert_eq!(processor.phase(), CrunchPhase::ReadingObjects);
    }

    #[test]
    fn strings_get_sequential_ids() {
        let mut processor = CrunchProcessor::new(Vec::new(), 4, true, false);
        processor.on_record(&string_record(0x500, "a")).unwrap();
        processor.on_record(&string_record(0x100, "b")).unwrap();
        let (out, stats) = processor.finish().unwrap();
        assert_eq!(stats.strings, 2);
        let expected = [
            be32(3),
            be32(1),
            be32(java_hash("a")),
            be32(3),
            be32(2),
            be32(java_hash("b")),
        ]
        .concat();
        assert_eq!(out, expected);
    }

    fn java_hash(text: &str) -> i32 {
        crate::bmd_writer::java_string_hash(text.as_bytes())
    }

    #[test]
    fn full_strings_keep_text() {
        let mut processor = CrunchProcessor::new(Vec::new(), 4, false, false);
        processor.on_record(&string_record(0x500, "Foo")).unwrap();
        let (out, _) = processor.finish().unwrap();
        assert_eq!(out, [be32(2), be32(1), be32(3), b"Foo".to_vec()].concat());
    }

    #[test]
    fn duplicate_string_aborts() {
        let mut processor = CrunchProcessor::new(Vec::new(), 4, true, false);
        processor.on_record(&string_record(7, "a")).unwrap();
        let result = processor.on_record(&string_record(7, "b"));
        assert!(matches!(
            result,
            Err(HprofCrunchError::DuplicateStringId { id: 7 })
        ));
    }

    #[test]
    fn unknown_records_pass_through_verbatim() {
        let mut processor = CrunchProcessor::new(Vec::new(), 4, true, false);
        processor.on_record(&record(0x05, vec![1, 2, 3, 4])).unwrap();
        processor.on_record(&record(TAG_UNLOAD_CLASS, vec![0, 0, 0, 1])).unwrap();
        processor.on_record(&record(TAG_HEAP_DUMP_END, vec![])).unwrap();
        processor.all_classes_read();
        // ignored in the second pass
        processor.on_record(&record(0x05, vec![1, 2, 3, 4])).unwrap();
        let (out, stats) = processor.finish().unwrap();
        assert_eq!(out, [be32(4), be32(5), vec![1, 2, 3, 4]].concat());
        assert_eq!(stats.legacy_records, 1);
        assert_eq!(stats.discarded_records, 2);
    }

    #[test]
    fn first_pass_only_writes_class_dumps() {
        let segment = SegmentBuilder::new(4)
            .root_sticky_class(200)
            .instance_dump(300, 200, &[])
            .class_dump(200, 0, &[], &[], &[])
            .primitive_array(400, FieldType::Int, 2)
            .build();
        let mut processor = CrunchProcessor::new(Vec::new(), 4, true, false);
        processor
            .on_record(&record(TAG_HEAP_DUMP_SEGMENT, segment))
            .unwrap();
        let (out, stats) = processor.finish().unwrap();
        assert_eq!(
            out,
            [be32(5), be32(1), be32(0), be32(0), be32(0), be32(0), be32(0)].concat()
        );
        assert_eq!(stats.class_definitions, 1);
        assert_eq!(stats.gc_roots, 1);
        assert_eq!(stats.instance_dumps, 0);
    }

    #[test]
    fn second_pass_only_writes_instances() {
        let segment = SegmentBuilder::new(4)
            .instance_dump(300, 200, &301u32.to_be_bytes())
            .class_dump(200, 0, &[], &[], &[(100, FieldType::Object)])
            .object_array(401, 200, &[300])
            .primitive_array(400, FieldType::Int, 2)
            .build();
        let mut processor = CrunchProcessor::new(Vec::new(), 4, true, false);
        processor
            .on_record(&record(TAG_HEAP_DUMP_SEGMENT, segment.clone()))
            .unwrap();
        processor.all_classes_read();
        processor
            .on_record(&record(TAG_HEAP_DUMP, segment))
            .unwrap();
        let (out, stats) = processor.finish().unwrap();
        let class_definition = [
            be32(5),
            be32(1),
            be32(0),
            be32(0),
            be32(0),
            be32(1),
            be32(2),
            be32(0),
            be32(0),
        ]
        .concat();
        // the instance precedes its class dump in the segment, the class is known anyway
        let instance_dump = [be32(6), be32(2), be32(1), be32(3)].concat();
        assert_eq!(out, [class_definition, instance_dump].concat());
        assert_eq!(stats.instance_dumps, 1);
        assert_eq!(stats.object_arrays_skipped, 1);
        assert_eq!(stats.primitive_arrays_skipped, 1);
        assert_eq!(stats.mapped_object_ids, 3);
    }

    #[test]
    fn layout_mismatch_aborts_second_pass() {
        let segment = SegmentBuilder::new(4)
            .class_dump(200, 0, &[], &[], &[(100, FieldType::Long)])
            .instance_dump(300, 200, &[0, 0, 0, 1])
            .build();
        let mut processor = CrunchProcessor::new(Vec::new(), 4, true, false);
        processor
            .on_record(&record(TAG_HEAP_DUMP_SEGMENT, segment.clone()))
            .unwrap();
        processor.all_classes_read();
        let result = processor.on_record(&record(TAG_HEAP_DUMP_SEGMENT, segment));
        assert!(matches!(
            result,
            Err(HprofCrunchError::InstanceDataUnderflow { object_id: 300, .. })
        ));
    }

    #[test]
    fn header_entry_carries_format() {
        let mut processor = CrunchProcessor::new(Vec::new(), 8, true, false);
        let header = FileHeader::from_bytes(b"JAVA PROFILE 1.0.2", 8, 0);
        processor.on_header(&header).unwrap();
        let (out, _) = processor.finish().unwrap();
        assert_eq!(
            out,
            [be32(1), be32(1), be32(18), b"JAVA PROFILE 1.0.2".to_vec()].concat()
        );
    }

    #[test]
    fn header_entry_keeps_format_bytes_unmodified() {
        let mut processor = CrunchProcessor::new(Vec::new(), 4, true, false);
        let format = b"JAVA PROFILE \xC0\x80\xFF";
        let header = FileHeader::from_bytes(format, 4, 0);
        processor.on_header(&header).unwrap();
        let (out, _) = processor.finish().unwrap();
        assert_eq!(out, [be32(1), be32(1), be32(16), format.to_vec()].concat());
    }
}
