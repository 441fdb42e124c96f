use std::io::Write;

use crate::class_compactor::{CompactClassDefinition, CompactValue};
use crate::instance_compactor::CompactInstanceDump;

/// Version written in the BMD header entry.
pub const BMD_FORMAT_VERSION: i32 = 1;

/// Marks the end of the retained instance fields of a class definition.
const END_OF_FIELDS: u32 = 0;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BmdTag {
    Header = 1,
    String = 2,
    HashedString = 3,
    LegacyHprofRecord = 4,
    ClassDefinition = 5,
    InstanceDump = 6,
}

const REPLACEMENT_UNIT: u16 = 0xFFFD;

/// UTF-16 code units of modified UTF-8 text as written in hprof strings.
///
/// Surrogates encoded as separate 3-byte sequences come out unchanged and `C0 80` decodes to 0.
/// Standard 4-byte sequences are split into a surrogate pair. Each invalid byte yields U+FFFD.
struct ModifiedUtf8Units<'a> {
    bytes: &'a [u8],
    pending_low_surrogate: Option<u16>,
}

impl<'a> ModifiedUtf8Units<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        ModifiedUtf8Units {
            bytes,
            pending_low_surrogate: None,
        }
    }

    // payload bits of the `count` continuation bytes following the lead byte
    fn continuation(&self, count: usize) -> Option<u32> {
        let tail = self.bytes.get(1..=count)?;
        tail.iter().try_fold(0u32, |acc, byte| {
            (byte & 0xC0 == 0x80).then_some((acc << 6) | u32::from(byte & 0x3F))
        })
    }

    fn decode(&self, lead: u8) -> Option<(u32, usize)> {
        match lead {
            0x00..=0x7F => Some((u32::from(lead), 1)),
            0xC0..=0xDF => {
                let bits = self.continuation(1)?;
                Some(((u32::from(lead & 0x1F) << 6) | bits, 2))
            }
            0xE0..=0xEF => {
                let bits = self.continuation(2)?;
                Some(((u32::from(lead & 0x0F) << 12) | bits, 3))
            }
            0xF0..=0xF4 => {
                let bits = self.continuation(3)?;
                let code_point = (u32::from(lead & 0x07) << 18) | bits;
                (0x1_0000..=0x10_FFFF)
                    .contains(&code_point)
                    .then_some((code_point, 4))
            }
            _ => None,
        }
    }
}

impl Iterator for ModifiedUtf8Units<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        if let Some(low) = self.pending_low_surrogate.take() {
            return Some(low);
        }
        let lead = *self.bytes.first()?;
        match self.decode(lead) {
            Some((code_point, len)) => {
                self.bytes = &self.bytes[len..];
                if code_point > 0xFFFF {
                    let offset = code_point - 0x1_0000;
                    self.pending_low_surrogate = Some(0xDC00 | (offset & 0x3FF) as u16);
                    Some(0xD800 | (offset >> 10) as u16)
                } else {
                    Some(code_point as u16)
                }
            }
            None => {
                self.bytes = &self.bytes[1..];
                Some(REPLACEMENT_UNIT)
            }
        }
    }
}

/// `String.hashCode` as computed by a JVM for the modified UTF-8 text.
pub fn java_string_hash(value: &[u8]) -> i32 {
    ModifiedUtf8Units::new(value).fold(0i32, |hash, unit| {
        hash.wrapping_mul(31).wrapping_add(i32::from(unit))
    })
}

/// Append-only writer of BMD entries, every scalar is big-endian.
pub struct BmdWriter<W: Write> {
    out: W,
    bytes_written: u64,
}

impl<W: Write> BmdWriter<W> {
    pub fn new(out: W) -> Self {
        BmdWriter {
            out,
            bytes_written: 0,
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flushes and hands back the underlying sink.
    pub fn into_inner(mut self) -> std::io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }

    fn write_raw_bytes(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.out.write_all(bytes)?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    fn write_i32(&mut self, value: i32) -> std::io::Result<()> {
        self.write_raw_bytes(&value.to_be_bytes())
    }

    // ids and counts share the int32 slot
    fn write_u32(&mut self, value: u32) -> std::io::Result<()> {
        self.write_raw_bytes(&value.to_be_bytes())
    }

    fn write_i64(&mut self, value: i64) -> std::io::Result<()> {
        self.write_raw_bytes(&value.to_be_bytes())
    }

    fn write_f32(&mut self, value: f32) -> std::io::Result<()> {
        self.write_raw_bytes(&value.to_be_bytes())
    }

    fn write_f64(&mut self, value: f64) -> std::io::Result<()> {
        self.write_raw_bytes(&value.to_be_bytes())
    }

    fn write_tag(&mut self, tag: BmdTag) -> std::io::Result<()> {
        self.write_i32(tag as i32)
    }

    fn write_byte_array_with_length(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.write_u32(bytes.len() as u32)?;
        self.write_raw_bytes(bytes)
    }

    fn write_value(&mut self, value: CompactValue) -> std::io::Result<()> {
        match value {
            CompactValue::Object(id) => self.write_u32(id),
            CompactValue::Int(v) => self.write_i32(v),
            CompactValue::Long(v) => self.write_i64(v),
            CompactValue::Float(v) => self.write_f32(v),
            CompactValue::Double(v) => self.write_f64(v),
            CompactValue::Bool(v) => self.write_raw_bytes(&[v]),
            CompactValue::Byte(v) => self.write_raw_bytes(&v.to_be_bytes()),
            CompactValue::Char(v) => self.write_raw_bytes(&v.to_be_bytes()),
        }
    }

    pub fn write_header(&mut self, version: i32, metadata: &[u8]) -> std::io::Result<()> {
        self.write_tag(BmdTag::Header)?;
        self.write_i32(version)?;
        self.write_byte_array_with_length(metadata)
    }

    /// Writes the string text, or only its hash when `hashed`.
    pub fn write_string(&mut self, id: u32, value: &[u8], hashed: bool) -> std::io::Result<()> {
        if hashed {
            self.write_tag(BmdTag::HashedString)?;
            self.write_u32(id)?;
            self.write_i32(java_string_hash(value))
        } else {
            self.write_tag(BmdTag::String)?;
            self.write_u32(id)?;
            self.write_byte_array_with_length(value)
        }
    }

    /// Copies an uninterpreted hprof record, its length is left to the record framing.
    pub fn write_legacy_record(&mut self, tag: u8, data: &[u8]) -> std::io::Result<()> {
        self.write_tag(BmdTag::LegacyHprofRecord)?;
        self.write_i32(i32::from(tag))?;
        self.write_raw_bytes(data)
    }

    pub fn write_class_definition(
        &mut self,
        class: &CompactClassDefinition,
    ) -> std::io::Result<()> {
        self.write_tag(BmdTag::ClassDefinition)?;
        self.write_u32(class.class_id)?;
        self.write_u32(class.super_class_id)?;
        self.write_u32(class.constant_fields.len() as u32)?;
        for field in &class.constant_fields {
            self.write_i32(i32::from(field.pool_index))?;
            self.write_i32(field.field_type.code())?;
            self.write_value(field.value)?;
        }
        self.write_u32(class.static_fields.len() as u32)?;
        for field in &class.static_fields {
            self.write_u32(field.name_id)?;
            self.write_i32(field.field_type.code())?;
            self.write_value(field.value)?;
        }
        for field in &class.retained_fields {
            self.write_u32(field.name_id)?;
            self.write_i32(field.field_type.code())?;
        }
        self.write_u32(END_OF_FIELDS)?;
        self.write_u32(class.skipped_bytes)
    }

    pub fn write_instance_dump(&mut self, instance: &CompactInstanceDump) -> std::io::Result<()> {
        self.write_tag(BmdTag::InstanceDump)?;
        self.write_u32(instance.object_id)?;
        self.write_u32(instance.class_id)?;
        for value in &instance.field_values {
            self.write_u32(*value)?;
        }
        Ok(())
    }
}
