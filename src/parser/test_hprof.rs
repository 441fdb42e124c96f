//! Builds synthetic hprof byte streams for tests.

use crate::parser::gc_record::FieldType;
use crate::parser::record::{TAG_HEAP_DUMP_SEGMENT, TAG_LOAD_CLASS, TAG_STRING};

pub const TEST_HEADER_FORMAT: &str = "JAVA PROFILE 1.0.3";

pub fn id_bytes(id_size: u32, id: u64) -> Vec<u8> {
    if id_size == 4 {
        (id as u32).to_be_bytes().to_vec()
    } else {
        id.to_be_bytes().to_vec()
    }
}

pub struct HprofBuilder {
    id_size: u32,
    bytes: Vec<u8>,
}

impl HprofBuilder {
    pub fn new(id_size: u32) -> Self {
        let mut bytes = TEST_HEADER_FORMAT.as_bytes().to_vec();
        bytes.push(0);
        bytes.extend_from_slice(&id_size.to_be_bytes());
        bytes.extend_from_slice(&1_608_192_273_831u64.to_be_bytes());
        HprofBuilder { id_size, bytes }
    }

    pub fn record(mut self, tag: u8, payload: &[u8]) -> Self {
        self.bytes.push(tag);
        self.bytes.extend_from_slice(&0u32.to_be_bytes());
        self.bytes
            .extend_from_slice(&(payload.len() as u32).to_be_bytes());
        self.bytes.extend_from_slice(payload);
        self
    }

    pub fn string(self, id: u64, text: &str) -> Self {
        let mut payload = id_bytes(self.id_size, id);
        payload.extend_from_slice(text.as_bytes());
        self.record(TAG_STRING, &payload)
    }

    pub fn load_class(self, serial_number: u32, class_object_id: u64, class_name_id: u64) -> Self {
        let mut payload = serial_number.to_be_bytes().to_vec();
        payload.extend(id_bytes(self.id_size, class_object_id));
        payload.extend(0u32.to_be_bytes());
        payload.extend(id_bytes(self.id_size, class_name_id));
        self.record(TAG_LOAD_CLASS, &payload)
    }

    pub fn heap_dump_segment(self, segment: &[u8]) -> Self {
        self.record(TAG_HEAP_DUMP_SEGMENT, segment)
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

pub struct SegmentBuilder {
    id_size: u32,
    bytes: Vec<u8>,
}

impl SegmentBuilder {
    pub fn new(id_size: u32) -> Self {
        SegmentBuilder {
            id_size,
            bytes: Vec::new(),
        }
    }

    fn id(&mut self, id: u64) {
        let bytes = id_bytes(self.id_size, id);
        self.bytes.extend(bytes);
    }

    pub fn root_unknown(mut self, object_id: u64) -> Self {
        self.bytes.push(0xFF);
        self.id(object_id);
        self
    }

    pub fn root_sticky_class(mut self, object_id: u64) -> Self {
        self.bytes.push(0x05);
        self.id(object_id);
        self
    }

    pub fn heap_dump_info(mut self, heap_type: u32, heap_name_id: u64) -> Self {
        self.bytes.push(0xFE);
        self.bytes.extend_from_slice(&heap_type.to_be_bytes());
        self.id(heap_name_id);
        self
    }

    pub fn class_dump(
        mut self,
        class_object_id: u64,
        super_class_object_id: u64,
        constant_fields: &[(u16, FieldType, &[u8])],
        static_fields: &[(u64, FieldType, &[u8])],
        instance_fields: &[(u64, FieldType)],
    ) -> Self {
        self.bytes.push(0x20);
        self.id(class_object_id);
        self.bytes.extend_from_slice(&0u32.to_be_bytes());
        self.id(super_class_object_id);
        // class loader, signers, protection domain, reserved x2
        for _ in 0..5 {
            self.id(0);
        }
        let instance_size: u32 = instance_fields
            .iter()
            .map(|(_, field_type)| field_type.byte_size(self.id_size))
            .sum();
        self.bytes.extend_from_slice(&instance_size.to_be_bytes());
        self.bytes
            .extend_from_slice(&(constant_fields.len() as u16).to_be_bytes());
        for (pool_index, field_type, value) in constant_fields {
            self.bytes.extend_from_slice(&pool_index.to_be_bytes());
            self.bytes.push(field_type.code() as u8);
            self.bytes.extend_from_slice(value);
        }
        self.bytes
            .extend_from_slice(&(static_fields.len() as u16).to_be_bytes());
        for (name_id, field_type, value) in static_fields {
            self.id(*name_id);
            self.bytes.push(field_type.code() as u8);
            self.bytes.extend_from_slice(value);
        }
        self.bytes
            .extend_from_slice(&(instance_fields.len() as u16).to_be_bytes());
        for (name_id, field_type) in instance_fields {
            self.id(*name_id);
            self.bytes.push(field_type.code() as u8);
        }
        self
    }

    pub fn instance_dump(mut self, object_id: u64, class_object_id: u64, data: &[u8]) -> Self {
        self.bytes.push(0x21);
        self.id(object_id);
        self.bytes.extend_from_slice(&0u32.to_be_bytes());
        self.id(class_object_id);
        self.bytes
            .extend_from_slice(&(data.len() as u32).to_be_bytes());
        self.bytes.extend_from_slice(data);
        self
    }

    pub fn object_array(mut self, object_id: u64, array_class_id: u64, elements: &[u64]) -> Self {
        self.bytes.push(0x22);
        self.id(object_id);
        self.bytes.extend_from_slice(&0u32.to_be_bytes());
        self.bytes
            .extend_from_slice(&(elements.len() as u32).to_be_bytes());
        self.id(array_class_id);
        for element in elements {
            self.id(*element);
        }
        self
    }

    pub fn primitive_array(
        mut self,
        object_id: u64,
        element_type: FieldType,
        number_of_elements: u32,
    ) -> Self {
        self.bytes.push(0x23);
        self.id(object_id);
        self.bytes.extend_from_slice(&0u32.to_be_bytes());
        self.bytes
            .extend_from_slice(&number_of_elements.to_be_bytes());
        self.bytes.push(element_type.code() as u8);
        let len = number_of_elements * element_type.byte_size(self.id_size);
        self.bytes.extend(vec![0; len as usize]);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}
