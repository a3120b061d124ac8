//! Identifier registry.
//!
//! Bidirectional map between external ids, compact internal slots, and the
//! human-readable label (achievement title or goal text) used for lookups.
//! Both directions are updated together, so `id_of(label_of(id)) == id` holds
//! for every live entry.

use std::collections::HashMap;
use std::hash::Hash;

use questline_domain::DomainError;

/// Compact internal index handed out per registered id.
///
/// Slots of unregistered ids are reused, so a slot is only meaningful while its
/// id is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot(u32);

impl Slot {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct Entry {
    slot: Slot,
    label: String,
}

/// Registry for one kind of entity (achievements or goals).
#[derive(Debug, Clone)]
pub struct Registry<I> {
    entity_type: &'static str,
    by_id: HashMap<I, Entry>,
    by_label: HashMap<String, I>,
    slots: Vec<Option<I>>,
    free: Vec<Slot>,
}

impl<I> Registry<I>
where
    I: Copy + Eq + Hash + ToString,
{
    pub fn new(entity_type: &'static str) -> Self {
        Self {
            entity_type,
            by_id: HashMap::new(),
            by_label: HashMap::new(),
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn contains(&self, id: &I) -> bool {
        self.by_id.contains_key(id)
    }

    /// Upper bound (exclusive) on slot indices handed out so far.
    pub fn slot_capacity(&self) -> usize {
        self.slots.len()
    }

    /// Check that `register(id, label)` would succeed without changing anything.
    pub fn check_register(&self, id: &I, label: &str) -> Result<(), DomainError> {
        if self.by_id.contains_key(id) {
            return Err(DomainError::duplicate_id(self.entity_type, id.to_string()));
        }
        if self.by_label.contains_key(label) {
            return Err(DomainError::duplicate_title(self.entity_type, label));
        }
        Ok(())
    }

    /// Register a new id under `label`.
    ///
    /// # Errors
    ///
    /// - `DuplicateId` if `id` is already registered
    /// - `DuplicateTitle` if another live id owns `label`
    pub fn register(&mut self, id: I, label: impl Into<String>) -> Result<Slot, DomainError> {
        let label = label.into();
        self.check_register(&id, &label)?;

        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot.index()] = Some(id);
                slot
            }
            None => {
                let slot = Slot(self.slots.len() as u32);
                self.slots.push(Some(id));
                slot
            }
        };
        self.by_label.insert(label.clone(), id);
        self.by_id.insert(id, Entry { slot, label });
        Ok(slot)
    }

    /// Remove `id`, freeing its label and slot.
    pub fn unregister(&mut self, id: &I) -> Result<Slot, DomainError> {
        let entry = self
            .by_id
            .remove(id)
            .ok_or_else(|| DomainError::not_found(self.entity_type, id.to_string()))?;
        self.by_label.remove(&entry.label);
        self.slots[entry.slot.index()] = None;
        self.free.push(entry.slot);
        Ok(entry.slot)
    }

    /// Check that `rename(id, label)` would succeed without changing anything.
    pub fn check_rename(&self, id: &I, label: &str) -> Result<(), DomainError> {
        if !self.by_id.contains_key(id) {
            return Err(DomainError::not_found(self.entity_type, id.to_string()));
        }
        match self.by_label.get(label) {
            Some(owner) if owner != id => {
                Err(DomainError::duplicate_title(self.entity_type, label))
            }
            _ => Ok(()),
        }
    }

    /// Move `id` to a new label. Renaming to the current label is a no-op.
    pub fn rename(&mut self, id: &I, label: impl Into<String>) -> Result<(), DomainError> {
        let label = label.into();
        self.check_rename(id, &label)?;

        let entry = self
            .by_id
            .get_mut(id)
            .ok_or_else(|| DomainError::not_found(self.entity_type, id.to_string()))?;
        if entry.label == label {
            return Ok(());
        }
        let old = std::mem::replace(&mut entry.label, label.clone());
        self.by_label.remove(&old);
        self.by_label.insert(label, *id);
        Ok(())
    }

    pub fn id_of(&self, label: &str) -> Result<I, DomainError> {
        self.by_label
            .get(label.trim())
            .copied()
            .ok_or_else(|| DomainError::not_found(self.entity_type, label))
    }

    pub fn label_of(&self, id: &I) -> Result<&str, DomainError> {
        self.by_id
            .get(id)
            .map(|entry| entry.label.as_str())
            .ok_or_else(|| DomainError::not_found(self.entity_type, id.to_string()))
    }

    pub fn slot_of(&self, id: &I) -> Option<Slot> {
        self.by_id.get(id).map(|entry| entry.slot)
    }

    pub fn id_at(&self, slot: Slot) -> Option<I> {
        self.slots.get(slot.index()).copied().flatten()
    }

    /// Live ids in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = I> + '_ {
        self.by_id.keys().copied()
    }

    /// True when both directions agree for every live entry.
    #[cfg(test)]
    pub fn is_consistent(&self) -> bool {
        self.by_id.len() == self.by_label.len()
            && self.by_id.iter().all(|(id, entry)| {
                self.by_label.get(&entry.label) == Some(id)
                    && self.id_at(entry.slot) == Some(*id)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use questline_domain::AchievementId;

    fn registry() -> Registry<AchievementId> {
        Registry::new("Achievement")
    }

    mod register {
        use super::*;

        #[test]
        fn lookups_work_both_ways() {
            let mut reg = registry();
            let a = AchievementId::new();
            reg.register(a, "Explorer").unwrap();

            assert_eq!(reg.id_of("Explorer").unwrap(), a);
            assert_eq!(reg.label_of(&a).unwrap(), "Explorer");
            assert!(reg.is_consistent());
        }

        #[test]
        fn duplicate_id_is_rejected() {
            let mut reg = registry();
            let a = AchievementId::new();
            reg.register(a, "Explorer").unwrap();
            let err = reg.register(a, "Other").unwrap_err();
            assert!(matches!(err, DomainError::DuplicateId { .. }));
            assert!(reg.id_of("Other").is_err());
        }

        #[test]
        fn duplicate_title_is_rejected() {
            let mut reg = registry();
            reg.register(AchievementId::new(), "Explorer").unwrap();
            let err = reg.register(AchievementId::new(), "Explorer").unwrap_err();
            assert!(matches!(err, DomainError::DuplicateTitle { .. }));
            assert_eq!(reg.len(), 1);
        }

        #[test]
        fn lookup_by_title_trims_input() {
            let mut reg = registry();
            let a = AchievementId::new();
            reg.register(a, "Explorer").unwrap();
            assert_eq!(reg.id_of("  Explorer ").unwrap(), a);
        }
    }

    mod slots {
        use super::*;

        #[test]
        fn freed_slots_are_reused() {
            let mut reg = registry();
            let a = AchievementId::new();
            let b = AchievementId::new();
            let slot_a = reg.register(a, "A").unwrap();
            reg.register(b, "B").unwrap();

            reg.unregister(&a).unwrap();
            assert_eq!(reg.id_at(slot_a), None);

            let c = AchievementId::new();
            let slot_c = reg.register(c, "C").unwrap();
            assert_eq!(slot_c, slot_a);
            assert_eq!(reg.slot_capacity(), 2);
            assert!(reg.is_consistent());
        }

        #[test]
        fn unregister_frees_title() {
            let mut reg = registry();
            let a = AchievementId::new();
            reg.register(a, "A").unwrap();
            reg.unregister(&a).unwrap();

            assert!(reg.id_of("A").is_err());
            reg.register(AchievementId::new(), "A").unwrap();
        }
    }

    mod rename {
        use super::*;

        #[test]
        fn rename_updates_both_directions() {
            let mut reg = registry();
            let a = AchievementId::new();
            reg.register(a, "Old").unwrap();
            reg.rename(&a, "New").unwrap();

            assert!(reg.id_of("Old").is_err());
            assert_eq!(reg.id_of("New").unwrap(), a);
            assert_eq!(reg.label_of(&a).unwrap(), "New");
            assert!(reg.is_consistent());
        }

        #[test]
        fn rename_to_taken_title_fails_without_change() {
            let mut reg = registry();
            let a = AchievementId::new();
            let b = AchievementId::new();
            reg.register(a, "A").unwrap();
            reg.register(b, "B").unwrap();

            let err = reg.rename(&a, "B").unwrap_err();
            assert!(matches!(err, DomainError::DuplicateTitle { .. }));
            assert_eq!(reg.label_of(&a).unwrap(), "A");
            assert_eq!(reg.id_of("B").unwrap(), b);
        }

        #[test]
        fn rename_to_same_title_is_noop() {
            let mut reg = registry();
            let a = AchievementId::new();
            reg.register(a, "A").unwrap();
            reg.rename(&a, "A").unwrap();
            assert_eq!(reg.id_of("A").unwrap(), a);
        }

        #[test]
        fn rename_unknown_id_is_not_found() {
            let mut reg = registry();
            let err = reg.rename(&AchievementId::new(), "X").unwrap_err();
            assert!(matches!(err, DomainError::NotFound { .. }));
        }
    }
}
