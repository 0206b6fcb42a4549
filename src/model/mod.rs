//! The data model shared by every pipeline stage: mod handles, per-mod
//! entity bookkeeping, and the id mapping tables the allocator produces.

use crate::catalog::patterns::{recognize, Directive};
use crate::catalog::EntityKind;
use crate::error::{MergeError, MergeResult};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Anything that can hand back a mod's full source text. Implemented for
/// the filesystem in [`FileContent`]; tests supply an in-memory one so the
/// scanner and writer never need a real file on disk.
pub trait ContentProvider: Send + Sync {
    fn read(&self) -> MergeResult<String>;
}

/// Reads from a path on demand. Content is never cached: re-reading is the
/// caller's responsibility (see `SPEC_FULL.md` §3's lazy-metadata note).
#[derive(Debug, Clone)]
pub struct FileContent {
    pub path: PathBuf,
}

impl ContentProvider for FileContent {
    fn read(&self) -> MergeResult<String> {
        std::fs::read_to_string(&self.path).map_err(|e| MergeError::InvalidModFile {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

/// An in-memory mod body, for tests and for mod-group concatenation.
#[derive(Debug, Clone)]
pub struct StringContent(pub String);

impl ContentProvider for StringContent {
    fn read(&self) -> MergeResult<String> {
        Ok(self.0.clone())
    }
}

/// Header metadata derived from at most the first 4 KiB of a mod's content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModHeader {
    pub mod_name: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub icon_relative_path: Option<String>,
}

const HEADER_SCAN_BYTES: usize = 4096;

/// A source handle: a name, optional path, and a way to get its content.
pub struct ModFile {
    pub name: String,
    pub path: Option<PathBuf>,
    content: Box<dyn ContentProvider>,
}

impl ModFile {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        ModFile { name, path: Some(path.clone()), content: Box::new(FileContent { path }) }
    }

    pub fn in_memory(name: impl Into<String>, content: impl Into<String>) -> Self {
        ModFile { name: name.into(), path: None, content: Box::new(StringContent(content.into())) }
    }

    pub fn full_text(&self) -> MergeResult<String> {
        self.content.read()
    }

    /// Directory resource paths (e.g. the icon) are resolved relative to.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.path.as_ref().and_then(|p| p.parent().map(|d| d.to_path_buf()))
    }

    /// Parse header metadata from the first [`HEADER_SCAN_BYTES`] of
    /// content. Re-reads and re-parses on every call; callers that want
    /// caching add it themselves (see `SPEC_FULL.md` §3).
    pub fn header_metadata(&self) -> MergeResult<ModHeader> {
        let text = self.full_text()?;
        let prefix_end = text
            .char_indices()
            .map(|(i, c)| i + c.len_utf8())
            .take_while(|&i| i <= HEADER_SCAN_BYTES)
            .last()
            .unwrap_or(0);
        let prefix = &text[..prefix_end];

        let mut header = ModHeader::default();
        let mut in_description = false;
        for raw_line in prefix.lines() {
            let line = raw_line.trim();
            if in_description {
                if line.contains('"') {
                    in_description = false;
                }
                continue;
            }
            match recognize(line) {
                Directive::ModName(n) => {
                    if header.mod_name.is_none() {
                        header.mod_name = Some(n);
                    }
                }
                Directive::DescriptionOpen { closed } => {
                    if header.description.is_none() {
                        header.description = Some(line.to_string());
                    }
                    in_description = !closed;
                }
                Directive::Version(v) => {
                    header.version = Some(v);
                }
                Directive::Icon(p) => {
                    header.icon_relative_path = Some(p);
                }
                _ => {}
            }
        }
        Ok(header)
    }
}

/// Per-kind, per-mod bookkeeping accumulated by the scanner.
#[derive(Debug, Clone, Default)]
pub struct EntityDefinition {
    pub defined_ids: HashSet<u32>,
    pub vanilla_edited_ids: HashSet<u32>,
    pub implicit_definitions: usize,
    pub defined_names: HashSet<String>,
}

/// The scanner's output for one mod: everything it declares or edits, by
/// kind.
#[derive(Debug, Clone)]
pub struct ModDefinition {
    pub mod_name: String,
    pub entities: HashMap<EntityKind, EntityDefinition>,
}

impl ModDefinition {
    pub fn new(mod_name: impl Into<String>) -> Self {
        let mut entities = HashMap::new();
        for kind in EntityKind::ALL {
            entities.insert(kind, EntityDefinition::default());
        }
        ModDefinition { mod_name: mod_name.into(), entities }
    }

    pub fn entity(&self, kind: EntityKind) -> &EntityDefinition {
        self.entities.get(&kind).expect("every kind is pre-populated")
    }

    pub fn entity_mut(&mut self, kind: EntityKind) -> &mut EntityDefinition {
        self.entities.get_mut(&kind).expect("every kind is pre-populated")
    }

    /// Register a numeric id for `kind`, honoring the vanilla/modding split.
    /// Reference-only kinds resolve to their backing kind first (see
    /// [`EntityKind::resolves_via`]).
    pub fn register_id(&mut self, kind: EntityKind, id: u32) {
        let target = kind.resolves_via();
        let Some(range) = target.id_range() else { return };
        let def = self.entity_mut(target);
        if range.is_modding(id) {
            def.defined_ids.insert(id);
        } else if range.is_vanilla(id) {
            def.vanilla_edited_ids.insert(id);
        }
    }
}

/// `(kind, old_id) -> new_id`. Identity entries are never stored.
#[derive(Debug, Clone, Default)]
pub struct IdMapping {
    table: HashMap<(EntityKind, u32), u32>,
}

impl IdMapping {
    pub fn insert(&mut self, kind: EntityKind, old_id: u32, new_id: u32) {
        if old_id == new_id {
            return;
        }
        self.table.insert((kind, old_id), new_id);
    }

    /// An unknown `(kind, id)` maps to itself.
    pub fn get(&self, kind: EntityKind, id: u32) -> u32 {
        *self.table.get(&(kind, id)).unwrap_or(&id)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// A mod plus its frozen id mapping. Immutable once built.
pub struct MappedModDefinition {
    pub file: ModFile,
    pub mapping: IdMapping,
    /// The *i*-th entry is the id allocated for the *i*-th implicit
    /// (unnumbered) definition of that kind, in source order.
    pub implicit_ids: HashMap<EntityKind, Vec<u32>>,
}

impl MappedModDefinition {
    pub fn mapped_id(&self, kind: EntityKind, id: u32) -> u32 {
        self.mapping.get(kind.resolves_via(), id)
    }

    pub fn nth_implicit_id(&self, kind: EntityKind, index: usize) -> Option<u32> {
        self.implicit_ids.get(&kind).and_then(|v| v.get(index)).copied()
    }
}

/// A named set of input mods declared as co-dependent: parsed and mapped
/// as a single concatenated virtual mod, while the original files are
/// still tracked individually for resource copying.
pub struct ModGroup {
    pub name: String,
    pub members: Vec<ModFile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_id_splits_vanilla_and_modding() {
        let mut def = ModDefinition::new("test");
        def.register_id(EntityKind::Monster, 5000);
        def.register_id(EntityKind::Monster, 2845);
        assert!(def.entity(EntityKind::Monster).defined_ids.contains(&5000));
        assert!(def.entity(EntityKind::Monster).vanilla_edited_ids.contains(&2845));
    }

    #[test]
    fn restricted_item_resolves_into_item() {
        let mut def = ModDefinition::new("test");
        def.register_id(EntityKind::RestrictedItem, 705);
        assert!(def.entity(EntityKind::Item).defined_ids.contains(&705));
        assert!(def.entity(EntityKind::RestrictedItem).defined_ids.is_empty());
    }

    #[test]
    fn header_metadata_reads_first_directives() {
        let file = ModFile::in_memory(
            "x.dm",
            "#modname \"Test Mod\"\n#description \"short\"\n#version 1\n#icon \"icon.tga\"\n#newmonster 5000\n",
        );
        let header = file.header_metadata().unwrap();
        assert_eq!(header.mod_name.as_deref(), Some("Test Mod"));
        assert_eq!(header.version.as_deref(), Some("1"));
        assert_eq!(header.icon_relative_path.as_deref(), Some("icon.tga"));
    }

    #[test]
    fn id_mapping_elides_identity() {
        let mut m = IdMapping::default();
        m.insert(EntityKind::Monster, 5000, 5000);
        m.insert(EntityKind::Monster, 5001, 5002);
        assert!(m.is_empty() == false);
        assert_eq!(m.len(), 1);
        assert_eq!(m.get(EntityKind::Monster, 5000), 5000);
        assert_eq!(m.get(EntityKind::Monster, 5001), 5002);
        assert_eq!(m.get(EntityKind::Monster, 9999), 9999);
    }
}
