//! Conflict detection: pairwise ID-collision enumeration across mods.
//!
//! Pure comparison over already-scanned [`ModDefinition`]s, grouped the same
//! way the original mod-pair conflict report is shaped: group by pair, then
//! sort the flattened report by severity (here, count of colliding ids)
//! rather than file count.

use crate::catalog::EntityKind;
use crate::model::ModDefinition;
use std::collections::BTreeSet;

/// One colliding id, for one kind, between a pair of mods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collision {
    pub kind: EntityKind,
    pub id: u32,
}

/// All collisions between one ordered pair of mods.
#[derive(Debug, Clone)]
pub struct ModPairConflict {
    pub mod_a: String,
    pub mod_b: String,
    pub collisions: Vec<Collision>,
}

/// Both mods edit the same vanilla-range id — never remapped, only warned on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VanillaOverlap {
    pub kind: EntityKind,
    pub id: u32,
    pub mod_a: String,
    pub mod_b: String,
}

#[derive(Debug, Default)]
pub struct ConflictReport {
    /// Sorted most-colliding-pair first.
    pub pairs: Vec<ModPairConflict>,
    pub vanilla_overlaps: Vec<VanillaOverlap>,
}

impl ConflictReport {
    pub fn total_collisions(&self) -> usize {
        self.pairs.iter().map(|p| p.collisions.len()).sum()
    }
}

/// Compare every pair of mods, kind by kind. `A.defined_ids ∩ B.defined_ids`
/// is the collision set; `vanilla_edited_ids` overlaps are reported
/// separately and never feed the allocator.
pub fn detect(defs: &[ModDefinition]) -> ConflictReport {
    let mut pairs = Vec::new();
    let mut vanilla_overlaps = Vec::new();

    for i in 0..defs.len() {
        for j in (i + 1)..defs.len() {
            let a = &defs[i];
            let b = &defs[j];
            let mut collisions = Vec::new();

            for kind in EntityKind::ALL {
                let ea = a.entity(kind);
                let eb = b.entity(kind);

                let overlap: BTreeSet<u32> =
                    ea.defined_ids.intersection(&eb.defined_ids).copied().collect();
                collisions.extend(overlap.into_iter().map(|id| Collision { kind, id }));

                for &id in ea.vanilla_edited_ids.intersection(&eb.vanilla_edited_ids) {
                    vanilla_overlaps.push(VanillaOverlap {
                        kind,
                        id,
                        mod_a: a.mod_name.clone(),
                        mod_b: b.mod_name.clone(),
                    });
                }
            }

            if !collisions.is_empty() {
                collisions.sort_by_key(|c| (c.kind, c.id));
                pairs.push(ModPairConflict {
                    mod_a: a.mod_name.clone(),
                    mod_b: b.mod_name.clone(),
                    collisions,
                });
            }
        }
    }

    pairs.sort_by(|x, y| y.collisions.len().cmp(&x.collisions.len()));
    ConflictReport { pairs, vanilla_overlaps }
}
