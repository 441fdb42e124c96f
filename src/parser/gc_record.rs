#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FieldType {
    Object = 2,
    Bool = 4,
    Char = 5,
    Float = 6,
    Double = 7,
    Byte = 8,
    Short = 9,
    Int = 10,
    Long = 11,
}

impl FieldType {
    pub fn from_value(v: u8) -> Option<FieldType> {
        match v {
            2 => Some(FieldType::Object),
            4 => Some(FieldType::Bool),
            5 => Some(FieldType::Char),
            6 => Some(FieldType::Float),
            7 => Some(FieldType::Double),
            8 => Some(FieldType::Byte),
            9 => Some(FieldType::Short),
            10 => Some(FieldType::Int),
            11 => Some(FieldType::Long),
            _ => None,
        }
    }

    /// Type code shared by HPROF and BMD.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Encoded width in bytes, object references are `id_size` wide.
    pub fn byte_size(self, id_size: u32) -> u32 {
        match self {
            FieldType::Object => id_size,
            FieldType::Byte | FieldType::Bool => 1,
            FieldType::Char | FieldType::Short => 2,
            FieldType::Float | FieldType::Int => 4,
            FieldType::Double | FieldType::Long => 8,
        }
    }
}

/// Decoded value of a constant or static field.
///
/// `Bool` keeps the raw byte as found in the dump.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldValue {
    Bool(u8),
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Object(u64),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConstantField {
    pub pool_index: u16,
    pub field_type: FieldType,
    pub value: FieldValue,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StaticField {
    pub name_id: u64,
    pub field_type: FieldType,
    pub value: FieldValue,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InstanceField {
    pub name_id: u64,
    pub field_type: FieldType,
}

#[derive(Debug, PartialEq)]
pub struct ClassDumpFields {
    pub class_object_id: u64,
    pub super_class_object_id: u64,
    pub instance_size: u32,
    pub constant_fields: Vec<ConstantField>,
    pub static_fields: Vec<StaticField>,
    pub instance_fields: Vec<InstanceField>,
}

// TODO write GC roots once BMD has an entry kind for them, until then only their framing matters
#[derive(Debug, PartialEq)]
#[allow(dead_code)]
pub enum GcRecord<'a> {
    RootUnknown {
        object_id: u64,
    },
    RootThreadObject {
        thread_object_id: u64,
        thread_sequence_number: u32,
        stack_sequence_number: u32,
    },
    RootJniGlobal {
        object_id: u64,
        jni_global_ref_id: u64,
    },
    RootJniLocal {
        object_id: u64,
        thread_serial_number: u32,
        frame_number_in_stack_trace: u32,
    },
    RootJavaFrame {
        object_id: u64,
        thread_serial_number: u32,
        frame_number_in_stack_trace: u32,
    },
    RootNativeStack {
        object_id: u64,
        thread_serial_number: u32,
    },
    RootStickyClass {
        object_id: u64,
    },
    RootThreadBlock {
        object_id: u64,
        thread_serial_number: u32,
    },
    RootMonitorUsed {
        object_id: u64,
    },
    // Android extensions
    HeapDumpInfo {
        heap_type: u32,
        heap_name_id: u64,
    },
    RootInternedString {
        object_id: u64,
    },
    RootFinalizing {
        object_id: u64,
    },
    RootDebugger {
        object_id: u64,
    },
    RootReferenceCleanup {
        object_id: u64,
    },
    RootVmInternal {
        object_id: u64,
    },
    RootJniMonitor {
        object_id: u64,
        thread_serial_number: u32,
        stack_depth: u32,
    },
    Unreachable {
        object_id: u64,
    },
    InstanceDump(InstanceDump<'a>),
    ObjectArrayDump {
        object_id: u64,
        stack_trace_serial_number: u32,
        number_of_elements: u32,
        array_class_id: u64,
    },
    PrimitiveArrayDump {
        object_id: u64,
        stack_trace_serial_number: u32,
        number_of_elements: u32,
        element_type: FieldType,
    },
    PrimitiveArrayNoData {
        object_id: u64,
        stack_trace_serial_number: u32,
        number_of_elements: u32,
        element_type: FieldType,
    },
    ClassDump(Box<ClassDumpFields>),
}

/// Instance whose field bytes are laid out by its class hierarchy, most derived class first.
#[derive(Debug, PartialEq, Eq)]
pub struct InstanceDump<'a> {
    pub object_id: u64,
    pub class_object_id: u64,
    pub instance_field_data: &'a [u8],
}
