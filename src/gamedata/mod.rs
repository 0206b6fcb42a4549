//! Read-only game-data query interface.
//!
//! The spell-block rewriter consults this when a `#copyspell`/`#selectspell`
//! reference needs effect inference and no `#effect` line was seen in the
//! same block. The core never reads the backing tables directly — only
//! through this trait, injected by the caller (`src/main.rs` builds a
//! [`CsvGameData`] from `--game-data`, or falls back to [`EmptyGameData`]).

pub mod csv_source;

pub use csv_source::CsvGameData;

use crate::catalog::patterns::Reference;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpellData {
    pub id: u32,
    pub name: String,
    pub effect: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpellEffectData {
    pub spell_id: u32,
    pub effect: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonsterData {
    pub id: u32,
    pub name: String,
}

pub trait GameDataSource: Send + Sync {
    fn get_spell(&self, id: u32) -> Option<SpellData>;
    fn get_spell_by_name(&self, name: &str) -> Option<SpellData>;
    fn get_spell_effect(&self, spell_id: u32) -> Option<SpellEffectData>;
    fn get_monster(&self, id: u32) -> Option<MonsterData>;

    /// Resolve a `#copyspell`/`#selectspell` reference straight to the
    /// copied spell's effect id, the fallback the spell-block processor
    /// uses when the block itself never states `#effect`.
    fn effect_for_reference(&self, reference: &Reference) -> Option<i64> {
        let spell = match reference {
            Reference::Id(id) => self.get_spell(*id),
            Reference::Name(name) => self.get_spell_by_name(name),
        }?;
        Some(spell.effect)
    }
}

/// A [`GameDataSource`] with nothing loaded, used when `--game-data` is
/// omitted. Summoning/enchantment classification still works via the
/// bit-exact id/name fallback sets in `src/scanner/effects.rs`; only
/// inference for a copied spell outside those fixed sets is lost.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyGameData;

impl GameDataSource for EmptyGameData {
    fn get_spell(&self, _id: u32) -> Option<SpellData> {
        None
    }

    fn get_spell_by_name(&self, _name: &str) -> Option<SpellData> {
        None
    }

    fn get_spell_effect(&self, _spell_id: u32) -> Option<SpellEffectData> {
        None
    }

    fn get_monster(&self, _id: u32) -> Option<MonsterData> {
        None
    }
}
