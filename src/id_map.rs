use ahash::AHashMap;
use std::collections::hash_map::Entry;

/// Output id standing for "no object", original id 0 always maps to it.
pub const NULL_ID: u32 = 0;

/// Translates wide original identifiers into dense sequential ids.
///
/// Ids are handed out in first-seen order starting at 1 and never reused.
#[derive(Debug)]
pub struct IdMap {
    ids: AHashMap<u64, u32>,
    next_id: u32,
}

impl IdMap {
    pub fn new() -> Self {
        IdMap {
            ids: AHashMap::new(),
            next_id: NULL_ID + 1,
        }
    }

    /// Returns the mapped id and whether it was allocated by this call.
    pub fn get_or_insert(&mut self, original_id: u64) -> (u32, bool) {
        if original_id == 0 {
            return (NULL_ID, false);
        }
        match self.ids.entry(original_id) {
            Entry::Occupied(entry) => (*entry.get(), false),
            Entry::Vacant(entry) => {
                let mapped_id = self.next_id;
                self.next_id += 1;
                entry.insert(mapped_id);
                (mapped_id, true)
            }
        }
    }

    pub fn map(&mut self, original_id: u64) -> u32 {
        self.get_or_insert(original_id).0
    }

    #[cfg(test)]
    pub fn get(&self, original_id: u64) -> Option<u32> {
        if original_id == 0 {
            Some(NULL_ID)
        } else {
            self.ids.get(&original_id).copied()
        }
    }

    /// Number of ids allocated so far.
    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

impl Default for IdMap {
    fn default() -> Self {
        Self::new()
    }
}
