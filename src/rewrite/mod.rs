//! Content rewriting: dispatches each mod's lines through the entity
//! processor, the spell-block processor, or the implicit-id processor,
//! depending on state. Mirrors the scanner's state machine
//! (`src/scanner/mod.rs`) but emits rewritten output instead of recording
//! definitions.

pub mod entity;
pub mod implicit;
pub mod spell_block;

use crate::catalog::patterns::{recognize, Directive};
use crate::catalog::EntityKind;
use crate::error::Warning;
use crate::gamedata::GameDataSource;
use crate::model::MappedModDefinition;
use entity::{process_line, substitute_whole_number};
use implicit::ImplicitCounters;
use spell_block::SpellBlockProcessor;

enum State {
    Normal,
    Description,
    SpellBlock(SpellBlockProcessor),
}

/// Rewrite one mod's full text against its frozen mapping. Returns the
/// rewritten lines and any warnings raised along the way (malformed-block
/// discards only; collision/vanilla-overlap warnings are raised earlier,
/// during conflict detection).
pub fn rewrite_mod(
    mapped: &MappedModDefinition,
    text: &str,
    game_data: &dyn GameDataSource,
) -> (Vec<String>, Vec<Warning>) {
    let mut out = Vec::new();
    let mut warnings = Vec::new();
    let mut state = State::Normal;
    let mut counters = ImplicitCounters::default();

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw_line.trim();
        let directive = recognize(trimmed);

        if let State::SpellBlock(_) = &state {
            let reopening =
                matches!(directive, Directive::NewUnnumbered(EntityKind::Spell) | Directive::SelectSpell(_));
            if reopening {
                warnings.push(Warning::MalformedBlockDiscarded {
                    mod_name: mapped.file.name.clone(),
                    line_no,
                    block_kind: "spell",
                });
                let assigned_id = match &directive {
                    Directive::NewUnnumbered(EntityKind::Spell) => {
                        counters.next_id(EntityKind::Spell, mapped)
                    }
                    _ => None,
                };
                let mut processor = SpellBlockProcessor::start(assigned_id);
                processor.push_line(raw_line, line_no);
                state = State::SpellBlock(processor);
                continue;
            }

            if let Directive::End = directive {
                let State::SpellBlock(processor) = std::mem::replace(&mut state, State::Normal) else {
                    unreachable!("state is SpellBlock by the outer if-let guard")
                };
                let (lines, block_warnings) = processor.flush(mapped, game_data);
                out.extend(lines);
                warnings.extend(block_warnings);
                out.push(raw_line.to_string());
                continue;
            }

            if let State::SpellBlock(processor) = &mut state {
                processor.push_line(raw_line, line_no);
            }
            continue;
        }

        if let State::Description = &state {
            out.push(raw_line.to_string());
            if trimmed.contains('"') {
                state = State::Normal;
            }
            continue;
        }

        match &directive {
            Directive::DescriptionOpen { closed } => {
                out.push(raw_line.to_string());
                if !*closed {
                    state = State::Description;
                }
            }
            Directive::NewUnnumbered(EntityKind::Spell) => {
                let assigned_id = counters.next_id(EntityKind::Spell, mapped);
                let mut processor = SpellBlockProcessor::start(assigned_id);
                processor.push_line(raw_line, line_no);
                state = State::SpellBlock(processor);
            }
            Directive::SelectSpell(_) => {
                let mut processor = SpellBlockProcessor::start(None);
                processor.push_line(raw_line, line_no);
                state = State::SpellBlock(processor);
            }
            Directive::NewUnnumbered(kind) => {
                let target = kind.resolves_via();
                match counters.next_id(target, mapped) {
                    Some(id) => {
                        let (comment, rewritten) = implicit::rewrite_unnumbered(raw_line, target, id);
                        out.push(comment);
                        out.push(rewritten);
                    }
                    None => out.push(raw_line.to_string()),
                }
            }
            Directive::Code(n) if *n > 0 => {
                let old = *n as u32;
                let new_id = mapped.mapped_id(EntityKind::EventCode, old);
                if new_id == old {
                    out.push(raw_line.to_string());
                } else {
                    out.push(format!("-- MOD MERGER: Remapped EventCode {} -> {}", old, new_id));
                    out.push(substitute_whole_number(raw_line, old, new_id));
                }
            }
            _ => {
                let rewritten = process_line(raw_line, mapped);
                if let Some(comment) = rewritten.audit_comment {
                    out.push(comment);
                }
                out.push(rewritten.line);
            }
        }
    }

    (out, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamedata::EmptyGameData;
    use crate::model::{IdMapping, ModFile};
    use std::collections::HashMap;

    fn mapped_with(
        entries: &[(EntityKind, u32, u32)],
        implicit: &[(EntityKind, Vec<u32>)],
    ) -> MappedModDefinition {
        let mut mapping = IdMapping::default();
        for &(kind, old, new) in entries {
            mapping.insert(kind, old, new);
        }
        let implicit_ids = implicit.iter().cloned().collect::<HashMap<_, _>>();
        MappedModDefinition { file: ModFile::in_memory("B", ""), mapping, implicit_ids }
    }

    #[test]
    fn s1_rewrites_both_monster_lines() {
        let mapped = mapped_with(&[(EntityKind::Monster, 5000, 5002), (EntityKind::Monster, 5001, 5003)], &[]);
        let text = "#modname \"B\"\n#newmonster 5000\n#end\n#newmonster 5001\n#end\n";
        let (out, warnings) = rewrite_mod(&mapped, text, &EmptyGameData);
        assert!(warnings.is_empty());
        assert!(out.iter().any(|l| l == "#newmonster 5002"));
        assert!(out.iter().any(|l| l == "#newmonster 5003"));
    }

    #[test]
    fn s5_unnumbered_newspell_rewritten_in_full_pipeline() {
        let mapped = mapped_with(&[], &[(EntityKind::Spell, vec![2000])]);
        let text = "#newspell\n#name \"Test\"\n#end\n";
        let (out, _) = rewrite_mod(&mapped, text, &EmptyGameData);
        assert!(!out.iter().any(|l| l == "#newspell"));
        assert!(out.iter().any(|l| l == "#selectspell 2000"));
    }

    #[test]
    fn s6_vanilla_selectmonster_passes_through_unchanged() {
        let mapped = mapped_with(&[], &[]);
        let text = "#selectmonster 2845\n#end\n";
        let (out, _) = rewrite_mod(&mapped, text, &EmptyGameData);
        assert!(out.iter().any(|l| l == "#selectmonster 2845"));
    }

    #[test]
    fn reopened_spell_block_discards_previous_and_warns() {
        let mapped = mapped_with(&[], &[(EntityKind::Spell, vec![2000, 2001])]);
        let text = "#newspell\n#effect 1\n#newspell\n#damage 1\n#end\n";
        let (_, warnings) = rewrite_mod(&mapped, text, &EmptyGameData);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn event_code_remap_rewrites_line() {
        let mapped = mapped_with(&[(EntityKind::EventCode, 10, 20)], &[]);
        let text = "#newevent\n#code 10\n#end\n";
        let (out, _) = rewrite_mod(&mapped, text, &EmptyGameData);
        assert!(out.iter().any(|l| l == "#code 20"));
    }

    #[test]
    fn description_block_passes_through_verbatim() {
        let mapped = mapped_with(&[], &[]);
        let text = "#description \"line one\nstill inside\"\n#newmonster 5000\n#end\n";
        let (out, _) = rewrite_mod(&mapped, text, &EmptyGameData);
        assert!(out.iter().any(|l| l == "still inside\""));
    }

    #[test]
    fn unresolvable_copyspell_reference_raises_orphan_warning_in_full_pipeline() {
        let mapped = mapped_with(&[], &[]);
        let text = "#newspell\n#copyspell \"Some Unlisted Spell\"\n#damage 500\n#end\n";
        let (_, warnings) = rewrite_mod(&mapped, text, &EmptyGameData);
        assert!(warnings.iter().any(|w| matches!(w, Warning::OrphanReference { .. })));
    }
}
