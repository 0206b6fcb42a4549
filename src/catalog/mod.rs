//! The pattern catalog: entity kinds, their id ranges, and the directive
//! patterns the scanner and rewriters dispatch on.
//!
//! This module is deliberately data-first. Adding a new `EntityKind` means
//! adding one match arm per method here; nothing downstream needs its own
//! per-kind type.

pub mod patterns;

pub use patterns::{Directive, DirectivePattern, Reference, CATALOG};

use std::ops::RangeInclusive;

/// Every entity kind this format can declare or edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Monster,
    Weapon,
    Armor,
    Item,
    Site,
    Spell,
    Nation,
    NameType,
    Enchantment,
    Montag,
    EventCode,
    PopType,
    RestrictedItem,
}

impl EntityKind {
    pub const ALL: [EntityKind; 13] = [
        EntityKind::Monster,
        EntityKind::Weapon,
        EntityKind::Armor,
        EntityKind::Item,
        EntityKind::Site,
        EntityKind::Spell,
        EntityKind::Nation,
        EntityKind::NameType,
        EntityKind::Enchantment,
        EntityKind::Montag,
        EntityKind::EventCode,
        EntityKind::PopType,
        EntityKind::RestrictedItem,
    ];

    /// The lowercase token used in `#new<kind>` / `#select<kind>` directives.
    pub const fn directive_name(self) -> &'static str {
        match self {
            EntityKind::Monster => "monster",
            EntityKind::Weapon => "weapon",
            EntityKind::Armor => "armor",
            EntityKind::Item => "item",
            EntityKind::Site => "site",
            EntityKind::Spell => "spell",
            EntityKind::Nation => "nation",
            EntityKind::NameType => "nametype",
            EntityKind::Enchantment => "enchantment",
            EntityKind::Montag => "montag",
            EntityKind::EventCode => "eventcode",
            EntityKind::PopType => "poptype",
            EntityKind::RestrictedItem => "restricteditem",
        }
    }

    /// This kind's own id space, if it has one.
    ///
    /// `RestrictedItem` has no id space of its own: a `#restricteditem <id>`
    /// directive restricts an *existing* item id rather than declaring a
    /// new entity, so the pattern catalog resolves it against
    /// [`EntityKind::Item`]'s range and mapping instead (see `DESIGN.md`,
    /// Open Question decisions).
    pub const fn id_range(self) -> Option<IdRange> {
        match self {
            EntityKind::Weapon => Some(IdRange::with_vanilla(999, 1000, 3999)),
            EntityKind::Armor => Some(IdRange::with_vanilla(399, 400, 1999)),
            EntityKind::Monster => Some(IdRange::with_vanilla(4999, 5000, 19999)),
            EntityKind::NameType => Some(IdRange::with_vanilla(169, 170, 399)),
            EntityKind::Spell => Some(IdRange::with_vanilla(1999, 2000, 7999)),
            EntityKind::Enchantment => Some(IdRange::with_vanilla(199, 200, 9999)),
            EntityKind::Item => Some(IdRange::with_vanilla(699, 700, 1999)),
            EntityKind::Site => Some(IdRange::with_vanilla(1699, 1700, 3999)),
            EntityKind::Nation => Some(IdRange::with_vanilla(149, 150, 499)),
            EntityKind::PopType => Some(IdRange::with_vanilla(124, 125, 249)),
            EntityKind::Montag => Some(IdRange::no_vanilla(1000, 100_000)),
            EntityKind::EventCode => Some(IdRange::no_vanilla(1, u32::MAX)),
            EntityKind::RestrictedItem => None,
        }
    }

    /// The kind whose mapping table a reference-only directive (currently
    /// only `RestrictedItem`) should be resolved and remapped against.
    pub const fn resolves_via(self) -> EntityKind {
        match self {
            EntityKind::RestrictedItem => EntityKind::Item,
            other => other,
        }
    }

    /// `true` for spells only: `#newspell` has no numbered form at all.
    pub const fn always_implicit_new(self) -> bool {
        matches!(self, EntityKind::Spell)
    }
}

/// A kind's vanilla (untouchable) and modding (remappable) id intervals.
#[derive(Debug, Clone, Copy)]
pub struct IdRange {
    pub vanilla: Option<RangeInclusive<u32>>,
    pub modding: RangeInclusive<u32>,
}

impl IdRange {
    const fn with_vanilla(vanilla_end: u32, modding_start: u32, modding_end: u32) -> Self {
        IdRange {
            vanilla: Some(1..=vanilla_end),
            modding: modding_start..=modding_end,
        }
    }

    const fn no_vanilla(modding_start: u32, modding_end: u32) -> Self {
        IdRange {
            vanilla: None,
            modding: modding_start..=modding_end,
        }
    }

    pub fn is_vanilla(&self, id: u32) -> bool {
        self.vanilla.as_ref().is_some_and(|r| r.contains(&id))
    }

    pub fn is_modding(&self, id: u32) -> bool {
        self.modding.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_are_bit_exact() {
        let r = EntityKind::Monster.id_range().unwrap();
        assert_eq!(r.vanilla, Some(1..=4999));
        assert_eq!(r.modding, 5000..=19999);

        let r = EntityKind::Montag.id_range().unwrap();
        assert!(r.vanilla.is_none());
        assert_eq!(r.modding, 1000..=100_000);

        assert!(EntityKind::RestrictedItem.id_range().is_none());
        assert_eq!(EntityKind::RestrictedItem.resolves_via(), EntityKind::Item);
    }

    #[test]
    fn directive_names_are_lowercase_single_words() {
        for kind in EntityKind::ALL {
            let name = kind.directive_name();
            assert!(name.chars().all(|c| c.is_ascii_lowercase()));
        }
    }
}
