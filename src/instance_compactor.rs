use crate::class_registry::ClassRegistry;
use crate::errors::HprofCrunchError;
use crate::errors::HprofCrunchError::{InstanceDataMismatch, InstanceDataUnderflow};
use crate::id_map::IdMap;
use crate::parser::gc_record::{FieldType, InstanceDump};

/// Instance reduced to its remapped object references.
#[derive(Debug, PartialEq, Eq)]
pub struct CompactInstanceDump {
    pub object_id: u32,
    pub class_id: u32,
    /// In field declaration order, most derived class first.
    pub field_values: Vec<u32>,
}

fn read_be_id(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte))
}

/// Replays the class hierarchy layout over the instance field bytes, keeping object references only.
///
/// The field bytes must be consumed exactly, any mismatch means the layout and the dump disagree.
pub fn compact_instance_dump(
    instance: &InstanceDump<'_>,
    classes: &ClassRegistry,
    object_ids: &mut IdMap,
    id_size: u32,
) -> Result<CompactInstanceDump, HprofCrunchError> {
    let object_id = object_ids.map(instance.object_id);
    let class_id = object_ids.map(instance.class_object_id);
    let mut field_values = Vec::new();
    let mut cursor = instance.instance_field_data;
    for class in classes.hierarchy(class_id) {
        let class = class?;
        for field in &class.instance_fields {
            let width = field.field_type.byte_size(id_size) as usize;
            if cursor.len() < width {
                return Err(InstanceDataUnderflow {
                    object_id: instance.object_id,
                    class_object_id: instance.class_object_id,
                    needed: width,
                    available: cursor.len(),
                });
            }
            let (value, rest) = cursor.split_at(width);
            if field.field_type == FieldType::Object {
                field_values.push(object_ids.map(read_be_id(value)));
            }
            cursor = rest;
        }
    }
    if !cursor.is_empty() {
        return Err(InstanceDataMismatch {
            object_id: instance.object_id,
            class_object_id: instance.class_object_id,
            remaining: cursor.len(),
        });
    }
    Ok(CompactInstanceDump {
        object_id,
        class_id,
        field_values,
    })
}
