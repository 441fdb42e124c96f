use ahash::{AHashMap, AHashSet};

use crate::errors::HprofCrunchError;
use crate::parser::gc_record::{ClassDumpFields, ConstantField, InstanceField, StaticField};

/// Class known to the run, filled in by its load-class record and its class dump.
#[derive(Debug, Default, PartialEq)]
pub struct ClassDefinition {
    pub object_id: u64,
    pub super_class_object_id: u64,
    pub class_name_id: u64,
    pub instance_size: u32,
    pub constant_fields: Vec<ConstantField>,
    pub static_fields: Vec<StaticField>,
    pub instance_fields: Vec<InstanceField>,
}

/// Class definitions indexed by original id and by mapped id.
///
/// Kept for the whole run as instance dumps may reference any class of the dump.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: Vec<ClassDefinition>,           // holds the definitions
    by_original_id: AHashMap<u64, usize>,    // value is index into classes
    by_mapped_id: Vec<Option<usize>>,        // dense, position is the mapped id
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_for(&mut self, original_id: u64, mapped_id: u32) -> usize {
        let index = *self.by_original_id.entry(original_id).or_insert_with(|| {
            self.classes.push(ClassDefinition {
                object_id: original_id,
                ..ClassDefinition::default()
            });
            self.classes.len() - 1
        });
        let slot = mapped_id as usize;
        if self.by_mapped_id.len() <= slot {
            self.by_mapped_id.resize(slot + 1, None);
        }
        self.by_mapped_id[slot] = Some(index);
        index
    }

    /// Registers a class seen in a load-class record.
    pub fn register_loaded(&mut self, original_id: u64, mapped_id: u32, class_name_id: u64) {
        let index = self.index_for(original_id, mapped_id);
        self.classes[index].class_name_id = class_name_id;
    }

    /// Stores the layout found in a class dump, registering the class if no load-class record announced it.
    pub fn define(&mut self, class_dump: ClassDumpFields, mapped_id: u32) -> &ClassDefinition {
        let index = self.index_for(class_dump.class_object_id, mapped_id);
        let class = &mut self.classes[index];
        class.super_class_object_id = class_dump.super_class_object_id;
        class.instance_size = class_dump.instance_size;
        class.constant_fields = class_dump.constant_fields;
        class.static_fields = class_dump.static_fields;
        class.instance_fields = class_dump.instance_fields;
        class
    }

    #[cfg(test)]
    pub fn get_by_mapped_id(&self, mapped_id: u32) -> Option<&ClassDefinition> {
        self.by_mapped_id
            .get(mapped_id as usize)
            .copied()
            .flatten()
            .map(|index| &self.classes[index])
    }

    /// The class with `mapped_id` followed by its superclasses, most derived first.
    ///
    /// Empty for an unknown class. The walk stops at the first superclass without definition.
    pub fn hierarchy(&self, mapped_id: u32) -> ClassHierarchy<'_> {
        ClassHierarchy {
            registry: self,
            current: self.by_mapped_id.get(mapped_id as usize).copied().flatten(),
            visited: AHashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }
}

/// Lazy superclass chain walk, ends after yielding a `ClassHierarchyCycle` error.
pub struct ClassHierarchy<'a> {
    registry: &'a ClassRegistry,
    current: Option<usize>,
    visited: AHashSet<usize>,
}

impl<'a> Iterator for ClassHierarchy<'a> {
    type Item = Result<&'a ClassDefinition, HprofCrunchError>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.current.take()?;
        let class = &self.registry.classes[index];
        if !self.visited.insert(index) {
            return Some(Err(HprofCrunchError::ClassHierarchyCycle {
                class_object_id: class.object_id,
            }));
        }
        self.current = self
            .registry
            .by_original_id
            .get(&class.super_class_object_id)
            .copied();
        Some(Ok(class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::gc_record::FieldType;

    fn class_dump(
        class_object_id: u64,
        super_class_object_id: u64,
        instance_fields: &[(u64, FieldType)],
    ) -> ClassDumpFields {
        ClassDumpFields {
            class_object_id,
            super_class_object_id,
            instance_size: 0,
            constant_fields: vec![],
            static_fields: vec![],
            instance_fields: instance_fields
                .iter()
                .map(|(name_id, field_type)| InstanceField {
                    name_id: *name_id,
                    field_type: *field_type,
                })
                .collect(),
        }
    }

    #[test]
    fn define_after_load_keeps_name() {
        let mut registry = ClassRegistry::new();
        registry.register_loaded(200, 1, 100);
        let class = registry.define(class_dump(200, 0, &[(101, FieldType::Int)]), 1);
        assert_eq!(class.class_name_id, 100);
        assert_eq!(class.instance_fields.len(), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get_by_mapped_id(1).unwrap().object_id, 200);
    }

    #[test]
    fn define_without_load() {
        let mut registry = ClassRegistry::new();
        registry.define(class_dump(200, 0, &[]), 4);
        assert!(registry.get_by_mapped_id(4).is_some());
        assert!(registry.get_by_mapped_id(3).is_none());
        assert!(registry.get_by_mapped_id(40).is_none());
    }

    #[test]
    fn hierarchy_is_most_derived_first() {
        let mut registry = ClassRegistry::new();
        registry.define(class_dump(10, 0, &[]), 1);
        registry.define(class_dump(20, 10, &[]), 2);
        registry.define(class_dump(30, 20, &[]), 3);
        let ids: Vec<u64> = registry
            .hierarchy(3)
            .map(|class| class.unwrap().object_id)
            .collect();
        assert_eq!(ids, vec![30, 20, 10]);
    }

    #[test]
    fn hierarchy_stops_at_unknown_superclass() {
        let mut registry = ClassRegistry::new();
        registry.define(class_dump(20, 999, &[]), 1);
        assert_eq!(registry.hierarchy(1).count(), 1);
        assert_eq!(registry.hierarchy(2).count(), 0);
    }

    #[test]
    fn hierarchy_cycle_is_detected() {
        let mut registry = ClassRegistry::new();
        registry.define(class_dump(10, 20, &[]), 1);
        registry.define(class_dump(20, 10, &[]), 2);
        let mut hierarchy = registry.hierarchy(1);
        assert_eq!(hierarchy.next().unwrap().unwrap().object_id, 10);
        assert_eq!(hierarchy.next().unwrap().unwrap().object_id, 20);
        assert!(matches!(
            hierarchy.next(),
            Some(Err(HprofCrunchError::ClassHierarchyCycle { class_object_id: 10 }))
        ));
        assert!(hierarchy.next().is_none());
    }

    #[test]
    fn self_referencing_class_is_a_cycle() {
        let mut registry = ClassRegistry::new();
        registry.define(class_dump(10, 10, &[]), 1);
        let result: Result<Vec<_>, _> = registry.hierarchy(1).collect();
        assert!(matches!(
            result,
            Err(HprofCrunchError::ClassHierarchyCycle { class_object_id: 10 })
        ));
    }
}
