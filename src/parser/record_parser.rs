use crate::errors::HprofCrunchError;
use crate::parser::gc_record::*;
use crate::parser::primitive_parsers::*;
use crate::parser::record::{HprofString, LoadClassData, RecordHeader};
use nom::combinator::{map, map_opt, rest};
use nom::error::ErrorKind;
use nom::multi::length_count;
use nom::{IResult, Parser};

const TAG_GC_ROOT_UNKNOWN: u8 = 0xFF;
const TAG_GC_ROOT_JNI_GLOBAL: u8 = 0x01;
const TAG_GC_ROOT_JNI_LOCAL: u8 = 0x02;
const TAG_GC_ROOT_JAVA_FRAME: u8 = 0x03;
const TAG_GC_ROOT_NATIVE_STACK: u8 = 0x04;
const TAG_GC_ROOT_STICKY_CLASS: u8 = 0x05;
const TAG_GC_ROOT_THREAD_BLOCK: u8 = 0x06;
const TAG_GC_ROOT_MONITOR_USED: u8 = 0x07;
const TAG_GC_ROOT_THREAD_OBJ: u8 = 0x08;
const TAG_GC_CLASS_DUMP: u8 = 0x20;
const TAG_GC_INSTANCE_DUMP: u8 = 0x21;
const TAG_GC_OBJ_ARRAY_DUMP: u8 = 0x22;
const TAG_GC_PRIM_ARRAY_DUMP: u8 = 0x23;

// Android
const TAG_GC_HEAP_DUMP_INFO: u8 = 0xFE;
const TAG_GC_ROOT_INTERNED_STRING: u8 = 0x89;
const TAG_GC_ROOT_FINALIZING: u8 = 0x8A;
const TAG_GC_ROOT_DEBUGGER: u8 = 0x8B;
const TAG_GC_ROOT_REFERENCE_CLEANUP: u8 = 0x8C;
const TAG_GC_ROOT_VM_INTERNAL: u8 = 0x8D;
const TAG_GC_ROOT_JNI_MONITOR: u8 = 0x8E;
const TAG_GC_UNREACHABLE: u8 = 0x90;
const TAG_GC_PRIM_ARRAY_NODATA_DUMP: u8 = 0xC3;

pub fn parse_record_header(i: &[u8]) -> IResult<&[u8], RecordHeader> {
    map(
        (parse_u8, parse_u32, parse_u32),
        |(tag, timestamp, length)| RecordHeader {
            tag,
            timestamp,
            length,
        },
    )
    .parse(i)
}

fn invalid_record(context: &str, e: nom::Err<nom::error::Error<&[u8]>>) -> HprofCrunchError {
    let message = match e {
        nom::Err::Incomplete(_) => format!("{context}: incomplete input"),
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            format!("{context}: {:?} with {} bytes left", e.code, e.input.len())
        }
    };
    HprofCrunchError::InvalidRecord { message }
}

/// Decodes record payloads on demand, identifiers are `id_size` bytes wide.
#[derive(Clone, Copy, Debug)]
pub struct HprofRecordParser {
    id_size: u32,
}

impl HprofRecordParser {
    pub fn new(id_size: u32) -> Self {
        HprofRecordParser { id_size }
    }

    pub fn id_size(&self) -> u32 {
        self.id_size
    }

    pub fn parse_string_record(&self, payload: &[u8]) -> Result<HprofString, HprofCrunchError> {
        map((parse_id(self.id_size), rest), |(id, value): (u64, &[u8])| {
            HprofString {
                id,
                value: value.into(),
            }
        })
        .parse(payload)
        .map(|(_, string)| string)
        .map_err(|e| invalid_record("string", e))
    }

    pub fn parse_load_class(&self, payload: &[u8]) -> Result<LoadClassData, HprofCrunchError> {
        let id = parse_id(self.id_size);
        map(
            (parse_u32, id, parse_u32, id),
            |(serial_number, class_object_id, _stack_trace_serial_number, class_name_id)| {
                LoadClassData {
                    serial_number,
                    class_object_id,
                    class_name_id,
                }
            },
        )
        .parse(payload)
        .map(|(_, load_class)| load_class)
        .map_err(|e| invalid_record("load class", e))
    }

    /// Sub-records of a heap dump (segment) payload, decoded lazily.
    pub fn heap_dump_records<'a>(&self, segment: &'a [u8]) -> HeapDumpRecords<'a> {
        HeapDumpRecords {
            parser: *self,
            remaining: segment,
        }
    }

    fn parse_gc_record<'a>(&self, i: &'a [u8]) -> IResult<&'a [u8], GcRecord<'a>> {
        let id = parse_id(self.id_size);
        let (r1, tag) = parse_u8(i)?;
        match tag {
            TAG_GC_ROOT_UNKNOWN => map(id, |object_id| GcRecord::RootUnknown { object_id }).parse(r1),
            TAG_GC_ROOT_JNI_GLOBAL => map((id, id), |(object_id, jni_global_ref_id)| {
                GcRecord::RootJniGlobal {
                    object_id,
                    jni_global_ref_id,
                }
            })
            .parse(r1),
            TAG_GC_ROOT_JNI_LOCAL => map(
                (id, parse_u32, parse_u32),
                |(object_id, thread_serial_number, frame_number_in_stack_trace)| GcRecord::RootJniLocal {
                    object_id,
                    thread_serial_number,
                    frame_number_in_stack_trace,
                },
            )
            .parse(r1),
            TAG_GC_ROOT_JAVA_FRAME => map(
                (id, parse_u32, parse_u32),
                |(object_id, thread_serial_number, frame_number_in_stack_trace)| GcRecord::RootJavaFrame {
                    object_id,
                    thread_serial_number,
                    frame_number_in_stack_trace,
                },
            )
            .parse(r1),
            TAG_GC_ROOT_NATIVE_STACK => map((id, parse_u32), |(object_id, thread_serial_number)| {
                GcRecord::RootNativeStack {
                    object_id,
                    thread_serial_number,
                }
            })
            .parse(r1),
            TAG_GC_ROOT_STICKY_CLASS => {
                map(id, |object_id| GcRecord::RootStickyClass { object_id }).parse(r1)
            }
            TAG_GC_ROOT_THREAD_BLOCK => map((id, parse_u32), |(object_id, thread_serial_number)| {
                GcRecord::RootThreadBlock {
                    object_id,
                    thread_serial_number,
                }
            })
            .parse(r1),
            TAG_GC_ROOT_MONITOR_USED => {
                map(id, |object_id| GcRecord::RootMonitorUsed { object_id }).parse(r1)
            }
            TAG_GC_ROOT_THREAD_OBJ => map(
                (id, parse_u32, parse_u32),
                |(thread_object_id, thread_sequence_number, stack_sequence_number)| {
                    GcRecord::RootThreadObject {
                        thread_object_id,
                        thread_sequence_number,
                        stack_sequence_number,
                    }
                },
            )
            .parse(r1),
            TAG_GC_HEAP_DUMP_INFO => map((parse_u32, id), |(heap_type, heap_name_id)| {
                GcRecord::HeapDumpInfo {
                    heap_type,
                    heap_name_id,
                }
            })
            .parse(r1),
            TAG_GC_ROOT_INTERNED_STRING => {
                map(id, |object_id| GcRecord::RootInternedString { object_id }).parse(r1)
            }
            TAG_GC_ROOT_FINALIZING => map(id, |object_id| GcRecord::RootFinalizing { object_id }).parse(r1),
            TAG_GC_ROOT_DEBUGGER => map(id, |object_id| GcRecord::RootDebugger { object_id }).parse(r1),
            TAG_GC_ROOT_REFERENCE_CLEANUP => {
                map(id, |object_id| GcRecord::RootReferenceCleanup { object_id }).parse(r1)
            }
            TAG_GC_ROOT_VM_INTERNAL => map(id, |object_id| GcRecord::RootVmInternal { object_id }).parse(r1),
            TAG_GC_ROOT_JNI_MONITOR => map(
                (id, parse_u32, parse_u32),
                |(object_id, thread_serial_number, stack_depth)| GcRecord::RootJniMonitor {
                    object_id,
                    thread_serial_number,
                    stack_depth,
                },
            )
            .parse(r1),
            TAG_GC_UNREACHABLE => map(id, |object_id| GcRecord::Unreachable { object_id }).parse(r1),
            TAG_GC_CLASS_DUMP => self.parse_gc_class_dump(r1),
            TAG_GC_INSTANCE_DUMP => self.parse_gc_instance_dump(r1),
            TAG_GC_OBJ_ARRAY_DUMP => self.parse_gc_object_array_dump(r1),
            TAG_GC_PRIM_ARRAY_DUMP => self.parse_gc_primitive_array_dump(r1),
            TAG_GC_PRIM_ARRAY_NODATA_DUMP => map(
                (id, parse_u32, parse_u32, parse_field_type),
                |(object_id, stack_trace_serial_number, number_of_elements, element_type)| {
                    GcRecord::PrimitiveArrayNoData {
                        object_id,
                        stack_trace_serial_number,
                        number_of_elements,
                        element_type,
                    }
                },
            )
            .parse(r1),
            // sub-records carry no length, an unknown one cannot be skipped
            _ => Err(nom::Err::Failure(nom::error::Error::new(
                i,
                ErrorKind::Switch,
            ))),
        }
    }

    fn parse_gc_class_dump<'a>(&self, i: &'a [u8]) -> IResult<&'a [u8], GcRecord<'a>> {
        let id = parse_id(self.id_size);
        let (
            r1,
            (
                class_object_id,
                _stack_trace_serial_number,
                super_class_object_id,
                _class_loader_object_id,
                _signers_object_id,
                _protection_domain_object_id,
                _reserved_1,
                _reserved_2,
                instance_size,
            ),
        ) = (id, parse_u32, id, id, id, id, id, id, parse_u32).parse(i)?;
        let (r2, constant_fields) = length_count(parse_u16, |i: &'a [u8]| {
            self.parse_const_pool_item(i)
        })
        .parse(r1)?;
        let (r3, static_fields) = length_count(parse_u16, |i: &'a [u8]| {
            self.parse_static_field_item(i)
        })
        .parse(r2)?;
        let (r4, instance_fields) = length_count(parse_u16, |i: &'a [u8]| {
            self.parse_instance_field_item(i)
        })
        .parse(r3)?;
        let fields = ClassDumpFields {
            class_object_id,
            super_class_object_id,
            instance_size,
            constant_fields,
            static_fields,
            instance_fields,
        };
        Ok((r4, GcRecord::ClassDump(Box::new(fields))))
    }

    fn parse_const_pool_item<'a>(&self, i: &'a [u8]) -> IResult<&'a [u8], ConstantField> {
        let (r1, (pool_index, field_type)) = (parse_u16, parse_field_type).parse(i)?;
        let (r2, value) = parse_field_value(field_type, self.id_size)(r1)?;
        let field = ConstantField {
            pool_index,
            field_type,
            value,
        };
        Ok((r2, field))
    }

    fn parse_static_field_item<'a>(&self, i: &'a [u8]) -> IResult<&'a [u8], StaticField> {
        let (r1, (name_id, field_type)) =
            (parse_id(self.id_size), parse_field_type).parse(i)?;
        let (r2, value) = parse_field_value(field_type, self.id_size)(r1)?;
        let field = StaticField {
            name_id,
            field_type,
            value,
        };
        Ok((r2, field))
    }

    fn parse_instance_field_item<'a>(&self, i: &'a [u8]) -> IResult<&'a [u8], InstanceField> {
        map(
            (parse_id(self.id_size), parse_field_type),
            |(name_id, field_type)| InstanceField {
                name_id,
                field_type,
            },
        )
        .parse(i)
    }

    fn parse_gc_instance_dump<'a>(&self, i: &'a [u8]) -> IResult<&'a [u8], GcRecord<'a>> {
        let id = parse_id(self.id_size);
        let (r1, (object_id, _stack_trace_serial_number, class_object_id, data_size)) =
            (id, parse_u32, id, parse_u32).parse(i)?;
        // The field bytes are only meaningful with the class hierarchy at hand, they stay raw here.
        let (r2, instance_field_data) = take_bytes(data_size as usize)(r1)?;
        let instance = InstanceDump {
            object_id,
            class_object_id,
            instance_field_data,
        };
        Ok((r2, GcRecord::InstanceDump(instance)))
    }

    fn parse_gc_object_array_dump<'a>(&self, i: &'a [u8]) -> IResult<&'a [u8], GcRecord<'a>> {
        let id = parse_id(self.id_size);
        let (r1, (object_id, stack_trace_serial_number, number_of_elements, array_class_id)) =
            (id, parse_u32, parse_u32, id).parse(i)?;
        let elements_len = number_of_elements as usize * self.id_size as usize;
        let (r2, _elements) = take_bytes(elements_len)(r1)?;
        let array = GcRecord::ObjectArrayDump {
            object_id,
            stack_trace_serial_number,
            number_of_elements,
            array_class_id,
        };
        Ok((r2, array))
    }

    fn parse_gc_primitive_array_dump<'a>(&self, i: &'a [u8]) -> IResult<&'a [u8], GcRecord<'a>> {
        let (r1, (object_id, stack_trace_serial_number, number_of_elements, element_type)) =
            (parse_id(self.id_size), parse_u32, parse_u32, parse_field_type).parse(i)?;
        let elements_len =
            number_of_elements as usize * element_type.byte_size(self.id_size) as usize;
        let (r2, _elements) = take_bytes(elements_len)(r1)?;
        let array = GcRecord::PrimitiveArrayDump {
            object_id,
            stack_trace_serial_number,
            number_of_elements,
            element_type,
        };
        Ok((r2, array))
    }
}

/// Bounded iterator over the sub-records of one heap dump segment.
///
/// Stops after the first decoding error.
pub struct HeapDumpRecords<'a> {
    parser: HprofRecordParser,
    remaining: &'a [u8],
}

impl<'a> Iterator for HeapDumpRecords<'a> {
    type Item = Result<GcRecord<'a>, HprofCrunchError>;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = *self.remaining.first()?;
        match self.parser.parse_gc_record(self.remaining) {
            Ok((rest, gc_record)) => {
                self.remaining = rest;
                Some(Ok(gc_record))
            }
            Err(e) => {
                self.remaining = &[];
                let context = format!("heap dump sub-record with tag {tag:#04x}");
                Some(Err(invalid_record(&context, e)))
            }
        }
    }
}

fn parse_field_type(i: &[u8]) -> IResult<&[u8], FieldType> {
    map_opt(parse_u8, FieldType::from_value).parse(i)
}

fn parse_field_value(ty: FieldType, id_size: u32) -> impl Fn(&[u8]) -> IResult<&[u8], FieldValue> {
    move |i| match ty {
        FieldType::Object => map(parse_id(id_size), FieldValue::Object).parse(i),
        FieldType::Bool => map(parse_u8, FieldValue::Bool).parse(i),
        FieldType::Char => map(parse_u16, FieldValue::Char).parse(i),
        FieldType::Float => map(parse_f32, FieldValue::Float).parse(i),
        FieldType::Double => map(parse_f64, FieldValue::Double).parse(i),
        FieldType::Byte => map(parse_i8, FieldValue::Byte).parse(i),
        FieldType::Short => map(parse_i16, FieldValue::Short).parse(i),
        FieldType::Int => map(parse_i32, FieldValue::Int).parse(i),
        FieldType::Long => map(parse_i64, FieldValue::Long).parse(i),
    }
}
