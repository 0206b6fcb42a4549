//! Deterministic id allocation: smallest-free-id per [`EntityKind`], scoped
//! to one merge run. No process-wide state — a fresh `UsedIds` table is
//! built for every call, matching the "allocator state is scoped to one
//! merge run" design note.

use crate::catalog::EntityKind;
use crate::error::{MergeError, MergeResult};
use crate::model::{IdMapping, MappedModDefinition, ModDefinition, ModFile};
use std::collections::{BTreeSet, HashMap};

/// Per-kind claimed-id table. A `BTreeSet` keeps "smallest free" a linear
/// scan from the range start and keeps the allocation order auditable.
#[derive(Default)]
struct UsedIds {
    table: HashMap<EntityKind, BTreeSet<u32>>,
}

impl UsedIds {
    fn claim(&mut self, kind: EntityKind, id: u32) {
        self.table.entry(kind).or_default().insert(id);
    }

    fn is_used(&self, kind: EntityKind, id: u32) -> bool {
        self.table.get(&kind).is_some_and(|set| set.contains(&id))
    }

    fn allocate(&mut self, kind: EntityKind) -> MergeResult<u32> {
        let range = kind.id_range().expect("allocate is only called for kinds with an id space");
        let used = self.table.entry(kind).or_default();
        for candidate in range.modding.clone() {
            if !used.contains(&candidate) {
                used.insert(candidate);
                return Ok(candidate);
            }
        }
        Err(MergeError::IdSpaceExhausted { kind })
    }
}

/// Assign fresh, collision-free ids to every mod.
///
/// `mods` must be in the order they should win ties in (input order); the
/// first mod to claim an id keeps it, later mods claiming the same id are
/// remapped. Returns one [`MappedModDefinition`] per input, in the same
/// order.
pub fn allocate(mods: Vec<(ModFile, ModDefinition)>) -> MergeResult<Vec<MappedModDefinition>> {
    let mut used = UsedIds::default();
    let mut mappings: Vec<IdMapping> = (0..mods.len()).map(|_| IdMapping::default()).collect();
    let mut implicit_ids: Vec<HashMap<EntityKind, Vec<u32>>> =
        (0..mods.len()).map(|_| HashMap::new()).collect();

    for kind in EntityKind::ALL {
        // RestrictedItem has no id space of its own (see EntityKind::resolves_via);
        // its numbers were already folded into Item's defined_ids during scanning.
        if kind.id_range().is_none() {
            continue;
        }

        for (idx, (_, def)) in mods.iter().enumerate() {
            let entity = def.entity(kind);

            let mut ids: Vec<u32> = entity.defined_ids.iter().copied().collect();
            ids.sort_unstable();
            for id in ids {
                if used.is_used(kind, id) {
                    let new_id = used.allocate(kind)?;
                    mappings[idx].insert(kind, id, new_id);
                } else {
                    used.claim(kind, id);
                }
            }

            if entity.implicit_definitions > 0 {
                let mut allocated = Vec::with_capacity(entity.implicit_definitions);
                for _ in 0..entity.implicit_definitions {
                    allocated.push(used.allocate(kind)?);
                }
                implicit_ids[idx].insert(kind, allocated);
            }
        }
    }

    Ok(mods
        .into_iter()
        .map(|(file, _)| file)
        .zip(mappings)
        .zip(implicit_ids)
        .map(|((file, mapping), implicit_ids)| MappedModDefinition { file, mapping, implicit_ids })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModFile;

    fn mod_with_monsters(name: &str, ids: &[u32]) -> (ModFile, ModDefinition) {
        let mut def = ModDefinition::new(name);
        for &id in ids {
            def.register_id(EntityKind::Monster, id);
        }
        (ModFile::in_memory(name, ""), def)
    }

    #[test]
    fn s1_second_mod_remaps_onto_smallest_free_ids() {
        let a = mod_with_monsters("A", &[5000, 5001]);
        let b = mod_with_monsters("B", &[5000, 5001]);
        let mapped = allocate(vec![a, b]).unwrap();

        assert!(mapped[0].mapping.is_empty());
        assert_eq!(mapped[1].mapped_id(EntityKind::Monster, 5000), 5002);
        assert_eq!(mapped[1].mapped_id(EntityKind::Monster, 5001), 5003);
    }

    #[test]
    fn identity_minimization_for_unique_ids() {
        let a = mod_with_monsters("A", &[5000]);
        let b = mod_with_monsters("B", &[5001]);
        let mapped = allocate(vec![a, b]).unwrap();
        assert_eq!(mapped[0].mapped_id(EntityKind::Monster, 5000), 5000);
        assert_eq!(mapped[1].mapped_id(EntityKind::Monster, 5001), 5001);
    }

    #[test]
    fn implicit_definitions_get_consecutive_fresh_ids() {
        let mut def = ModDefinition::new("A");
        def.entity_mut(EntityKind::Spell).implicit_definitions = 3;
        let mapped = allocate(vec![(ModFile::in_memory("A", ""), def)]).unwrap();
        assert_eq!(mapped[0].nth_implicit_id(EntityKind::Spell, 0), Some(2000));
        assert_eq!(mapped[0].nth_implicit_id(EntityKind::Spell, 1), Some(2001));
        assert_eq!(mapped[0].nth_implicit_id(EntityKind::Spell, 2), Some(2002));
    }

    #[test]
    fn id_space_exhausted_is_fatal() {
        let mut def = ModDefinition::new("A");
        def.entity_mut(EntityKind::PopType).implicit_definitions = 200;
        let err = allocate(vec![(ModFile::in_memory("A", ""), def)]).unwrap_err();
        assert!(matches!(err, MergeError::IdSpaceExhausted { kind: EntityKind::PopType }));
    }

    #[test]
    fn restricted_item_ids_do_not_consume_allocator_state() {
        // register_id already resolved RestrictedItem into Item during
        // scanning, so nothing should be left registered under the
        // reference-only kind itself.
        let mut def = ModDefinition::new("A");
        def.register_id(EntityKind::RestrictedItem, 705);
        let mapped = allocate(vec![(ModFile::in_memory("A", ""), def)]).unwrap();
        assert!(mapped[0].mapping.is_empty());
    }
}
