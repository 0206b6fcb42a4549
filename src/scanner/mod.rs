//! The per-mod line scanner: turns one mod's raw text into a
//! [`ModDefinition`], classifying every id it sees as vanilla-edit,
//! modding-new, or implicit-new. Pure function of its input — no shared
//! state, no I/O beyond the one read already done by the caller — so it is
//! safe to run many of these concurrently (see `src/writer/mod.rs`).

pub mod effects;

use crate::catalog::patterns::{recognize, Directive, Reference};
use crate::catalog::EntityKind;
use crate::error::{MergeError, MergeResult, Warning};
use crate::model::ModDefinition;
use effects::{classify_copy_reference, classify_effect_id, EffectClass};

/// Buffered state for the spell block currently being scanned. Mirrors the
/// writer-stage `SpellBlockProcessor`'s buffering (`src/rewrite/spell_block.rs`)
/// but only tracks what bookkeeping needs, not the raw lines.
#[derive(Default)]
struct PendingSpellBlock {
    start_line: usize,
    effect_id: Option<i64>,
    copy_reference: Option<Reference>,
    damages: Vec<i64>,
}

enum State {
    Normal,
    Description,
    SpellBlock(PendingSpellBlock),
}

pub struct ScanOutcome {
    pub definition: ModDefinition,
    pub warnings: Vec<Warning>,
}

/// Scan one mod's full text into a [`ModDefinition`].
pub fn scan(mod_name: &str, text: &str) -> MergeResult<ScanOutcome> {
    let mut def = ModDefinition::new(mod_name);
    let mut warnings = Vec::new();
    let mut state = State::Normal;
    let mut seen_mod_name = false;

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();

        let directive = recognize(line);

        match &state {
            State::Description => {
                if line.contains('"') {
                    state = State::Normal;
                }
                continue;
            }
            State::SpellBlock(_) => {
                handle_spell_block_line(
                    &mut state,
                    &mut def,
                    &mut warnings,
                    mod_name,
                    line_no,
                    line,
                    directive,
                )?;
                continue;
            }
            State::Normal => {}
        }

        match directive {
            Directive::Ignored => {}
            Directive::ModName(_) => {
                // The first #modname wins; header metadata itself is
                // parsed separately by `ModFile::header_metadata`, the
                // scanner only needs to not misinterpret this line.
                seen_mod_name = true;
            }
            Directive::DescriptionOpen { closed } => {
                if !closed {
                    state = State::Description;
                }
            }
            Directive::Version(_) | Directive::DomVersion(_) | Directive::Icon(_) => {}
            Directive::NewUnnumbered(EntityKind::Spell) => {
                def.entity_mut(EntityKind::Spell).implicit_definitions += 1;
                state = State::SpellBlock(PendingSpellBlock { start_line: line_no, ..Default::default() });
            }
            Directive::SelectSpell(reference) => {
                state = State::SpellBlock(PendingSpellBlock { start_line: line_no, ..Default::default() });
                // Re-dispatch so the opening line itself is registered.
                handle_spell_block_line(
                    &mut state,
                    &mut def,
                    &mut warnings,
                    mod_name,
                    line_no,
                    line,
                    Directive::SelectSpell(reference),
                )?;
            }
            Directive::NewUnnumbered(kind) => {
                def.entity_mut(kind.resolves_via()).implicit_definitions += 1;
            }
            Directive::Numbered { kind, id, .. } => {
                def.register_id(kind, id);
            }
            Directive::Code(n) => {
                if n > 0 {
                    def.register_id(EntityKind::EventCode, n as u32);
                }
                // Negative codes are control markers, not entity ids.
            }
            Directive::Effect(_)
            | Directive::Damage(_)
            | Directive::CopySpell(_)
            | Directive::NextSpell(_)
            | Directive::End => {
                // Only meaningful inside a spell block; outside one these
                // are just unrecognized-in-context and pass through.
            }
            Directive::Unrecognized => {}
        }
    }

    let _ = seen_mod_name;
    Ok(ScanOutcome { definition: def, warnings })
}

fn handle_spell_block_line(
    state: &mut State,
    def: &mut ModDefinition,
    warnings: &mut Vec<Warning>,
    mod_name: &str,
    line_no: usize,
    line: &str,
    directive: Directive,
) -> MergeResult<()> {
    // A new block opening mid-block: discard and restart, per `spec.md` §4.6's
    // edge case (applied consistently to scanner bookkeeping too).
    let reopening = matches!(directive, Directive::NewUnnumbered(EntityKind::Spell) | Directive::SelectSpell(_));
    if reopening {
        if let State::SpellBlock(_) = state {
            warnings.push(Warning::MalformedBlockDiscarded {
                mod_name: mod_name.to_string(),
                line_no,
                block_kind: "spell",
            });
        }
        *state = State::SpellBlock(PendingSpellBlock { start_line: line_no, ..Default::default() });
    }

    let State::SpellBlock(pending) = state else {
        return Err(MergeError::ParseError {
            mod_name: mod_name.to_string(),
            line_no,
            line: line.to_string(),
            cause: "expected spell-block state".into(),
        });
    };

    match directive {
        Directive::NewUnnumbered(EntityKind::Spell) => {
            def.entity_mut(EntityKind::Spell).implicit_definitions += 1;
        }
        Directive::SelectSpell(reference) => {
            if let Reference::Id(id) = &reference {
                def.register_id(EntityKind::Spell, *id);
            } else if let Reference::Name(name) = &reference {
                def.entity_mut(EntityKind::Spell).defined_names.insert(name.clone());
            }
            pending.copy_reference.get_or_insert(reference);
        }
        Directive::Effect(n) => {
            pending.effect_id.get_or_insert(n);
        }
        Directive::CopySpell(reference) => {
            pending.copy_reference.get_or_insert(reference);
        }
        Directive::Damage(n) => {
            pending.damages.push(n);
        }
        Directive::NextSpell(_) => {}
        Directive::End => {
            flush_spell_block(def, pending);
            *state = State::Normal;
        }
        // Anything else inside a spell block (header lines would be
        // malformed input here) is ignored, matching rule 6's "unknown
        // directive passes through" at the top level.
        _ => {}
    }
    Ok(())
}

fn flush_spell_block(def: &mut ModDefinition, pending: &PendingSpellBlock) {
    let effect_class = match pending.effect_id {
        Some(id) => classify_effect_id(id),
        None => pending
            .copy_reference
            .as_ref()
            .map(classify_copy_reference)
            .unwrap_or(EffectClass::None),
    };

    for &n in &pending.damages {
        match effect_class {
            EffectClass::Summoning if n > 0 => def.register_id(EntityKind::Monster, n as u32),
            EffectClass::Summoning if n < 0 => def.register_id(EntityKind::Montag, n.unsigned_abs() as u32),
            EffectClass::Summoning => {}
            EffectClass::Enchantment => def.register_id(EntityKind::Enchantment, n.unsigned_abs() as u32),
            EffectClass::None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_simple_monster_definitions() {
        let text = "#modname \"A\"\n#newmonster 5000\n#end\n#newmonster 5001\n#end\n";
        let out = scan("A", text).unwrap();
        let monster = out.definition.entity(EntityKind::Monster);
        assert!(monster.defined_ids.contains(&5000));
        assert!(monster.defined_ids.contains(&5001));
    }

    #[test]
    fn summoning_spell_registers_monster_damage() {
        let text = "#newspell\n#name \"Test\"\n#effect 1\n#damage 5001\n#end\n";
        let out = scan("B", text).unwrap();
        assert!(out.definition.entity(EntityKind::Monster).defined_ids.contains(&5001));
        assert_eq!(out.definition.entity(EntityKind::Spell).implicit_definitions, 1);
    }

    #[test]
    fn negative_damage_registers_montag() {
        let text = "#newspell\n#effect 1\n#damage -4149\n#end\n";
        let out = scan("C", text).unwrap();
        assert!(out.definition.entity(EntityKind::Montag).defined_ids.contains(&4149));
    }

    #[test]
    fn enchantment_damage_registers_enchantment_id() {
        let text = "#newspell\n#effect 81\n#damage 500\n#end\n";
        let out = scan("D", text).unwrap();
        assert!(out.definition.entity(EntityKind::Enchantment).defined_ids.contains(&500));
    }

    #[test]
    fn damage_before_effect_still_classifies_correctly() {
        // Buffered: #effect appearing after #damage must not change the result.
        let text = "#newspell\n#damage 5001\n#effect 1\n#end\n";
        let out = scan("E", text).unwrap();
        assert!(out.definition.entity(EntityKind::Monster).defined_ids.contains(&5001));
    }

    #[test]
    fn fallback_classification_from_known_summoning_name() {
        let text = "#newspell\n#copyspell \"Pack of Wolves\"\n#damage 5002\n#end\n";
        let out = scan("F", text).unwrap();
        assert!(out.definition.entity(EntityKind::Monster).defined_ids.contains(&5002));
    }

    #[test]
    fn reopening_block_without_end_discards_previous_and_warns() {
        let text = "#newspell\n#effect 1\n#newspell\n#damage 5003\n#end\n";
        let out = scan("G", text).unwrap();
        assert_eq!(out.warnings.len(), 1);
        assert!(out.definition.entity(EntityKind::Monster).defined_ids.contains(&5003));
        assert_eq!(out.definition.entity(EntityKind::Spell).implicit_definitions, 2);
    }

    #[test]
    fn vanilla_edit_recorded_separately_from_new() {
        let text = "#selectmonster 2845\n#end\n";
        let out = scan("H", text).unwrap();
        assert!(out.definition.entity(EntityKind::Monster).vanilla_edited_ids.contains(&2845));
        assert!(!out.definition.entity(EntityKind::Monster).defined_ids.contains(&2845));
    }

    #[test]
    fn event_code_registers_only_for_positive_values() {
        let text = "#newevent\n#code 1234\n#end\n#newevent\n#code -5\n#end\n";
        let out = scan("I", text).unwrap();
        let ev = out.definition.entity(EntityKind::EventCode);
        assert!(ev.defined_ids.contains(&1234));
        assert_eq!(ev.defined_ids.len(), 1);
    }
}
