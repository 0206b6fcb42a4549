//! Spell-block processor: buffers one `#newspell`/`#selectspell` … `#end`
//! segment and rewrites it as a unit at `#end`, since `#damage`'s meaning
//! depends on `#effect`, which may appear later in the same block (the
//! "damage ordering" design note resolves this in favor of buffering).

use super::entity::{process_line, substitute_whole_number};
use crate::catalog::patterns::{recognize, Directive, Reference};
use crate::catalog::EntityKind;
use crate::error::Warning;
use crate::gamedata::GameDataSource;
use crate::model::MappedModDefinition;
use crate::scanner::effects::{classify_copy_reference, classify_effect_id, EffectClass};

pub struct SpellBlockProcessor {
    assigned_id: Option<u32>,
    lines: Vec<(String, Directive)>,
    effect_id: Option<i64>,
    copy_reference: Option<Reference>,
    copy_reference_line: usize,
}

impl SpellBlockProcessor {
    /// `assigned_id` is `Some` only when this block opened with an
    /// unnumbered `#newspell` and the allocator pre-assigned it an id.
    pub fn start(assigned_id: Option<u32>) -> Self {
        SpellBlockProcessor {
            assigned_id,
            lines: Vec::new(),
            effect_id: None,
            copy_reference: None,
            copy_reference_line: 0,
        }
    }

    pub fn push_line(&mut self, raw_line: &str, line_no: usize) {
        let directive = recognize(raw_line.trim());
        match &directive {
            Directive::Effect(n) => {
                self.effect_id.get_or_insert(*n);
            }
            Directive::CopySpell(r) | Directive::SelectSpell(r) => {
                if self.copy_reference.is_none() {
                    self.copy_reference = Some(r.clone());
                    self.copy_reference_line = line_no;
                }
            }
            _ => {}
        }
        self.lines.push((raw_line.to_string(), directive));
    }

    /// Resolve the block's effect class once, before deciding how to
    /// rewrite each buffered line. When a `#copyspell`/`#selectspell`
    /// reference is the only source of context and neither the injected
    /// game-data interface nor the fixed known-summoning fallback sets can
    /// resolve it, the block's effect is unknowable; that's reported as an
    /// `OrphanReference` warning rather than silently treated as `None`
    /// (`SPEC_FULL.md` §6).
    fn classify(&self, game_data: &dyn GameDataSource, mod_name: &str) -> (EffectClass, Option<Warning>) {
        if let Some(id) = self.effect_id {
            return (classify_effect_id(id), None);
        }
        let Some(reference) = &self.copy_reference else {
            return (EffectClass::None, None);
        };
        if let Some(effect_id) = game_data.effect_for_reference(reference) {
            return (classify_effect_id(effect_id), None);
        }
        let class = classify_copy_reference(reference);
        if matches!(class, EffectClass::None) {
            let warning = Warning::OrphanReference {
                kind: EntityKind::Spell,
                reference: reference_label(reference),
                mod_name: mod_name.to_string(),
                line_no: self.copy_reference_line,
            };
            (class, Some(warning))
        } else {
            (class, None)
        }
    }

    /// Consume the buffer, producing the rewritten block's lines (not
    /// including `#end`, which the caller appends) plus any warnings raised
    /// while classifying the block. Consecutive blank lines collapse to one.
    pub fn flush(
        self,
        mapped: &MappedModDefinition,
        game_data: &dyn GameDataSource,
    ) -> (Vec<String>, Vec<Warning>) {
        let mod_name = mapped.file.name.clone();
        let (effect_class, orphan_warning) = self.classify(game_data, &mod_name);
        let mut out = Vec::new();
        let warnings: Vec<Warning> = orphan_warning.into_iter().collect();
        let mut blank_run = false;

        for (raw, directive) in self.lines {
            if raw.trim().is_empty() {
                if !blank_run {
                    out.push(raw);
                }
                blank_run = true;
                continue;
            }
            blank_run = false;

            match directive {
                Directive::NewUnnumbered(EntityKind::Spell) => match self.assigned_id {
                    Some(id) => {
                        out.push(format!(
                            "-- MOD MERGER: Converted unnumbered #newspell to #selectspell {}",
                            id
                        ));
                        out.push(format!("#selectspell {}", id));
                    }
                    None => out.push(raw),
                },
                Directive::SelectSpell(Reference::Id(id))
                | Directive::CopySpell(Reference::Id(id))
                | Directive::NextSpell(Reference::Id(id)) => {
                    out.extend(remap_spell_reference(&raw, id, mapped));
                }
                Directive::Damage(n) => {
                    out.extend(rewrite_damage(&raw, n, effect_class, mapped));
                }
                _ => {
                    let rewritten = process_line(&raw, mapped);
                    if let Some(comment) = rewritten.audit_comment {
                        out.push(comment);
                    }
                    out.push(rewritten.line);
                }
            }
        }
        (out, warnings)
    }
}

/// Human-readable form of a spell reference for an `OrphanReference` warning:
/// the bare id, or the quoted lowercased name.
fn reference_label(reference: &Reference) -> String {
    match reference {
        Reference::Id(id) => id.to_string(),
        Reference::Name(name) => format!("\"{}\"", name),
    }
}

fn remap_spell_reference(raw: &str, id: u32, mapped: &MappedModDefinition) -> Vec<String> {
    let new_id = mapped.mapped_id(EntityKind::Spell, id);
    if new_id == id {
        return vec![raw.to_string()];
    }
    let rewritten = substitute_whole_number(raw, id, new_id);
    vec![format!("-- MOD MERGER: Remapped Spell {} -> {}", id, new_id), rewritten]
}

/// `#damage n` rewriting per spec.md §4.6 step 2: the sign is never part of
/// the matched digit run, so `substitute_whole_number` on the magnitude
/// leaves the sign character in place untouched.
fn rewrite_damage(raw: &str, n: i64, class: EffectClass, mapped: &MappedModDefinition) -> Vec<String> {
    let (kind, magnitude) = match class {
        EffectClass::Summoning if n > 0 => (EntityKind::Monster, n as u32),
        EffectClass::Summoning if n < 0 => (EntityKind::Montag, n.unsigned_abs() as u32),
        EffectClass::Enchantment => (EntityKind::Enchantment, n.unsigned_abs() as u32),
        _ => return vec![raw.to_string()],
    };

    let new_magnitude = mapped.mapped_id(kind, magnitude);
    if new_magnitude == magnitude {
        return vec![raw.to_string()];
    }
    let rewritten = substitute_whole_number(raw, magnitude, new_magnitude);
    vec![format!("-- MOD MERGER: Remapped {:?} {} -> {}", kind, magnitude, new_magnitude), rewritten]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamedata::EmptyGameData;
    use crate::model::{IdMapping, ModFile};
    use std::collections::HashMap;

    fn mapped_with(entries: &[(EntityKind, u32, u32)]) -> MappedModDefinition {
        let mut mapping = IdMapping::default();
        for &(kind, old, new) in entries {
            mapping.insert(kind, old, new);
        }
        MappedModDefinition { file: ModFile::in_memory("B", ""), mapping, implicit_ids: HashMap::new() }
    }

    #[test]
    fn s2_summoning_damage_follows_monster_remap() {
        let mapped = mapped_with(&[(EntityKind::Monster, 5001, 5002)]);
        let mut block = SpellBlockProcessor::start(None);
        block.push_line("#newspell", 1);
        block.push_line("#effect 1", 2);
        block.push_line("#damage 5001", 3);
        let (out, warnings) = block.flush(&mapped, &EmptyGameData);
        assert!(out.iter().any(|l| l == "#damage 5002"));
        assert!(warnings.is_empty());
    }

    #[test]
    fn s3_negative_damage_remaps_montag_keeping_sign() {
        let mapped = mapped_with(&[(EntityKind::Montag, 4149, 4200)]);
        let mut block = SpellBlockProcessor::start(None);
        block.push_line("#newspell", 1);
        block.push_line("#effect 1", 2);
        block.push_line("#damage -4149", 3);
        let (out, _) = block.flush(&mapped, &EmptyGameData);
        assert!(out.iter().any(|l| l == "#damage -4200"));
    }

    #[test]
    fn s4_enchantment_damage_remaps() {
        let mapped = mapped_with(&[(EntityKind::Enchantment, 500, 501)]);
        let mut block = SpellBlockProcessor::start(None);
        block.push_line("#newspell", 1);
        block.push_line("#effect 81", 2);
        block.push_line("#damage 500", 3);
        let (out, _) = block.flush(&mapped, &EmptyGameData);
        assert!(out.iter().any(|l| l == "#damage 501"));
    }

    #[test]
    fn damage_before_effect_in_buffer_still_rewrites_correctly() {
        let mapped = mapped_with(&[(EntityKind::Monster, 5001, 5002)]);
        let mut block = SpellBlockProcessor::start(None);
        block.push_line("#newspell", 1);
        block.push_line("#damage 5001", 2);
        block.push_line("#effect 1", 3);
        let (out, _) = block.flush(&mapped, &EmptyGameData);
        assert!(out.iter().any(|l| l == "#damage 5002"));
    }

    #[test]
    fn s5_unnumbered_newspell_becomes_selectspell_with_audit_comment() {
        let mapped = mapped_with(&[]);
        let mut block = SpellBlockProcessor::start(Some(2000));
        block.push_line("#newspell", 1);
        block.push_line("#name \"Test\"", 2);
        let (out, _) = block.flush(&mapped, &EmptyGameData);
        assert!(!out.iter().any(|l| l == "#newspell"));
        assert!(out.iter().any(|l| l == "#selectspell 2000"));
        assert!(out.iter().any(|l| l.starts_with("-- MOD MERGER:")));
    }

    #[test]
    fn consecutive_blank_lines_collapse_to_one() {
        let mapped = mapped_with(&[]);
        let mut block = SpellBlockProcessor::start(None);
        block.push_line("#newspell", 1);
        block.push_line("", 2);
        block.push_line("", 3);
        block.push_line("#effect 1", 4);
        let (out, _) = block.flush(&mapped, &EmptyGameData);
        let blanks = out.iter().filter(|l| l.trim().is_empty()).count();
        assert_eq!(blanks, 1);
    }

    #[test]
    fn fallback_classification_uses_game_data_when_no_effect_line() {
        struct FakeData;
        impl GameDataSource for FakeData {
            fn get_spell(&self, _id: u32) -> Option<crate::gamedata::SpellData> {
                None
            }
            fn get_spell_by_name(&self, name: &str) -> Option<crate::gamedata::SpellData> {
                (name == "pack of wolves").then(|| crate::gamedata::SpellData {
                    id: 900,
                    name: name.to_string(),
                    effect: 1,
                })
            }
            fn get_spell_effect(&self, _spell_id: u32) -> Option<crate::gamedata::SpellEffectData> {
                None
            }
            fn get_monster(&self, _id: u32) -> Option<crate::gamedata::MonsterData> {
                None
            }
        }

        let mapped = mapped_with(&[(EntityKind::Monster, 5002, 5003)]);
        let mut block = SpellBlockProcessor::start(None);
        block.push_line("#newspell", 1);
        block.push_line("#copyspell \"Pack of Wolves\"", 2);
        block.push_line("#damage 5002", 3);
        let (out, warnings) = block.flush(&mapped, &FakeData);
        assert!(out.iter().any(|l| l == "#damage 5003"));
        assert!(warnings.is_empty());
    }

    #[test]
    fn unresolvable_copyspell_reference_raises_orphan_warning() {
        let mapped = mapped_with(&[]);
        let mut block = SpellBlockProcessor::start(None);
        block.push_line("#newspell", 1);
        block.push_line("#copyspell \"Some Unlisted Spell\"", 2);
        block.push_line("#damage 500", 3);
        let (out, warnings) = block.flush(&mapped, &EmptyGameData);
        // No effect context could be resolved, so #damage passes through untouched.
        assert!(out.iter().any(|l| l == "#damage 500"));
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            &warnings[0],
            Warning::OrphanReference { kind: EntityKind::Spell, line_no: 2, .. }
        ));
    }

    #[test]
    fn unresolvable_copyspell_id_reference_raises_orphan_warning() {
        let mapped = mapped_with(&[]);
        let mut block = SpellBlockProcessor::start(None);
        block.push_line("#newspell", 1);
        block.push_line("#copyspell 9999", 2);
        let (_, warnings) = block.flush(&mapped, &EmptyGameData);
        assert_eq!(warnings.len(), 1);
        assert!(matches!(&warnings[0], Warning::OrphanReference { reference, .. } if reference == "9999"));
    }
}
