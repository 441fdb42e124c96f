use crate::class_registry::ClassDefinition;
use crate::id_map::IdMap;
use crate::parser::gc_record::{FieldType, FieldValue};

/// Field value as written in BMD.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CompactValue {
    Object(u32),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(u8),
    Byte(i8),
    Char(u16),
}

#[derive(Debug, PartialEq)]
pub struct CompactConstantField {
    pub pool_index: u16,
    pub field_type: FieldType,
    pub value: CompactValue,
}

#[derive(Debug, PartialEq)]
pub struct CompactStaticField {
    pub name_id: u32,
    pub field_type: FieldType,
    pub value: CompactValue,
}

#[derive(Debug, PartialEq, Eq)]
pub struct CompactInstanceField {
    pub name_id: u32,
    pub field_type: FieldType,
}

/// Class definition with remapped ids and only its object reference instance fields.
#[derive(Debug, PartialEq)]
pub struct CompactClassDefinition {
    pub class_id: u32,
    pub super_class_id: u32,
    pub constant_fields: Vec<CompactConstantField>,
    pub static_fields: Vec<CompactStaticField>,
    pub retained_fields: Vec<CompactInstanceField>,
    /// Total width of the dropped primitive instance fields.
    pub skipped_bytes: u32,
}

pub fn compact_value(value: FieldValue, object_ids: &mut IdMap) -> CompactValue {
    match value {
        FieldValue::Object(id) => CompactValue::Object(object_ids.map(id)),
        FieldValue::Short(v) => CompactValue::Int(i32::from(v)),
        FieldValue::Int(v) => CompactValue::Int(v),
        FieldValue::Long(v) => CompactValue::Long(v),
        FieldValue::Float(v) => CompactValue::Float(v),
        FieldValue::Double(v) => CompactValue::Double(v),
        FieldValue::Bool(v) => CompactValue::Bool(v),
        FieldValue::Byte(v) => CompactValue::Byte(v),
        FieldValue::Char(v) => CompactValue::Char(v),
    }
}

/// Remaps ids in the order: class, superclass, constant values, static names and values, instance field names.
pub fn compact_class_definition(
    class: &ClassDefinition,
    string_ids: &mut IdMap,
    object_ids: &mut IdMap,
    id_size: u32,
) -> CompactClassDefinition {
    let class_id = object_ids.map(class.object_id);
    let super_class_id = object_ids.map(class.super_class_object_id);

    let constant_fields = class
        .constant_fields
        .iter()
        .map(|field| CompactConstantField {
            pool_index: field.pool_index,
            field_type: field.field_type,
            value: compact_value(field.value, object_ids),
        })
        .collect();

    let static_fields = class
        .static_fields
        .iter()
        .map(|field| CompactStaticField {
            name_id: string_ids.map(field.name_id),
            field_type: field.field_type,
            value: compact_value(field.value, object_ids),
        })
        .collect();

    let mut retained_fields = Vec::new();
    let mut skipped_bytes = 0;
    for field in &class.instance_fields {
        if field.field_type == FieldType::Object {
            retained_fields.push(CompactInstanceField {
                name_id: string_ids.map(field.name_id),
                field_type: field.field_type,
            });
        } else {
            skipped_bytes += field.field_type.byte_size(id_size);
        }
    }

    CompactClassDefinition {
        class_id,
        super_class_id,
        constant_fields,
        static_fields,
        retained_fields,
        skipped_bytes,
    }
}
