//! CSV-backed [`GameDataSource`]: loads `spells.tsv`, `effects_spells.tsv`,
//! and `monsters.tsv` from a directory once at construction. Read-only after
//! that — callers may share one freely across the parallel scan fan-out.

use super::{GameDataSource, MonsterData, SpellData, SpellEffectData};
use crate::error::{MergeError, MergeResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct SpellRow {
    id: u32,
    name: String,
    effect: i64,
}

#[derive(Debug, Deserialize)]
struct SpellEffectRow {
    spell_id: u32,
    effect: i64,
}

#[derive(Debug, Deserialize)]
struct MonsterRow {
    id: u32,
    name: String,
}

#[derive(Debug, Default)]
pub struct CsvGameData {
    spells_by_id: HashMap<u32, SpellData>,
    spells_by_name: HashMap<String, SpellData>,
    effects_by_spell: HashMap<u32, SpellEffectData>,
    monsters: HashMap<u32, MonsterData>,
}

impl CsvGameData {
    /// Load every table found in `dir`. A missing table is tolerated (the
    /// resulting source just answers `None` for it); a table that exists
    /// but fails to parse is a fatal `InvalidModFile`-shaped error, since at
    /// that point the caller asked for game data it cannot trust.
    pub fn load(dir: impl AsRef<Path>) -> MergeResult<Self> {
        let dir = dir.as_ref();
        let mut data = CsvGameData::default();

        if let Some(rows) = read_tsv::<SpellRow>(&dir.join("spells.tsv"))? {
            for row in rows {
                let spell = SpellData { id: row.id, name: row.name.clone(), effect: row.effect };
                data.spells_by_name.insert(row.name.to_ascii_lowercase(), spell.clone());
                data.spells_by_id.insert(row.id, spell);
            }
        }

        if let Some(rows) = read_tsv::<SpellEffectRow>(&dir.join("effects_spells.tsv"))? {
            for row in rows {
                data.effects_by_spell
                    .insert(row.spell_id, SpellEffectData { spell_id: row.spell_id, effect: row.effect });
            }
        }

        if let Some(rows) = read_tsv::<MonsterRow>(&dir.join("monsters.tsv"))? {
            for row in rows {
                data.monsters.insert(row.id, MonsterData { id: row.id, name: row.name });
            }
        }

        tracing::info!(
            spells = data.spells_by_id.len(),
            monsters = data.monsters.len(),
            "loaded game data from {}",
            dir.display()
        );

        Ok(data)
    }
}

fn read_tsv<T: serde::de::DeserializeOwned>(path: &Path) -> MergeResult<Option<Vec<T>>> {
    if !path.exists() {
        return Ok(None);
    }
    let mut reader = csv::ReaderBuilder::new().delimiter(b'\t').has_headers(true).from_path(path).map_err(
        |e| MergeError::InvalidModFile { path: path.display().to_string(), reason: e.to_string() },
    )?;

    let mut rows = Vec::new();
    for record in reader.deserialize::<T>() {
        let record = record.map_err(|e| MergeError::InvalidModFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        rows.push(record);
    }
    Ok(Some(rows))
}

impl GameDataSource for CsvGameData {
    fn get_spell(&self, id: u32) -> Option<SpellData> {
        self.spells_by_id.get(&id).cloned()
    }

    fn get_spell_by_name(&self, name: &str) -> Option<SpellData> {
        self.spells_by_name.get(&name.to_ascii_lowercase()).cloned()
    }

    fn get_spell_effect(&self, spell_id: u32) -> Option<SpellEffectData> {
        self.effects_by_spell.get(&spell_id).cloned()
    }

    fn get_monster(&self, id: u32) -> Option<MonsterData> {
        self.monsters.get(&id).cloned()
    }
}
