//! Implicit-id processor: converts unnumbered `#newX` into `#selectX <id>`
//! using the allocator's pre-assigned ids (spec.md §4.7). Spells are handled
//! inside the spell-block processor instead (`SpellBlockProcessor::start`'s
//! `assigned_id`), since `#newspell` only ever appears as a block opener.

use crate::catalog::EntityKind;
use crate::model::MappedModDefinition;
use std::collections::HashMap;

/// How many implicit definitions of each kind have been consumed so far in
/// one mod. Scoped to a single writer pass over one mod; never shared.
#[derive(Default)]
pub struct ImplicitCounters {
    seen: HashMap<EntityKind, usize>,
}

impl ImplicitCounters {
    /// Claim the next pre-allocated id for `kind`. `None` means the
    /// allocator recorded fewer implicit definitions for `(kind, mod)` than
    /// the writer is now consuming — a scanner/writer desync, not a user
    /// input problem, since both walk the same source in the same order.
    pub fn next_id(&mut self, kind: EntityKind, mapped: &MappedModDefinition) -> Option<u32> {
        let index = self.seen.entry(kind).or_insert(0);
        let id = mapped.nth_implicit_id(kind, *index);
        *index += 1;
        id
    }
}

/// Rewrite one `#new<kind>` line (no number) into `#select<kind> <id>`,
/// preserving any trailing tokens after the command. Returns
/// `(audit_comment, rewritten_line)`.
pub fn rewrite_unnumbered(line: &str, kind: EntityKind, assigned_id: u32) -> (String, String) {
    let trimmed = line.trim();
    let rest = trimmed.strip_prefix('#').unwrap_or(trimmed);
    let trailing = rest.split_once(char::is_whitespace).map(|(_, tail)| tail.trim()).filter(|s| !s.is_empty());

    let mut rewritten = format!("#select{} {}", kind.directive_name(), assigned_id);
    if let Some(trailing) = trailing {
        rewritten.push(' ');
        rewritten.push_str(trailing);
    }

    let comment = format!(
        "-- MOD MERGER: Converted unnumbered #new{} to #select{} {}",
        kind.directive_name(),
        kind.directive_name(),
        assigned_id
    );
    (comment, rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IdMapping, ModFile};

    #[test]
    fn rewrites_unnumbered_new_to_select_with_id() {
        let (comment, line) = rewrite_unnumbered("#newmonster", EntityKind::Monster, 5004);
        assert_eq!(line, "#selectmonster 5004");
        assert!(comment.contains("newmonster"));
        assert!(comment.contains("5004"));
    }

    #[test]
    fn preserves_trailing_tokens() {
        let (_, line) = rewrite_unnumbered("#newnametype \"extra text\"", EntityKind::NameType, 200);
        assert_eq!(line, "#selectnametype 200 \"extra text\"");
    }

    #[test]
    fn counters_advance_across_calls_and_are_per_kind() {
        let mut mapping = IdMapping::default();
        // IdMapping only tracks remaps, not implicit ids; implicit_ids is
        // populated directly on MappedModDefinition by the allocator.
        let _ = &mut mapping;
        let mapped = MappedModDefinition {
            file: ModFile::in_memory("A", ""),
            mapping,
            implicit_ids: HashMap::from([(EntityKind::Monster, vec![5000, 5001])]),
        };
        let mut counters = ImplicitCounters::default();
        assert_eq!(counters.next_id(EntityKind::Monster, &mapped), Some(5000));
        assert_eq!(counters.next_id(EntityKind::Monster, &mapped), Some(5001));
        assert_eq!(counters.next_id(EntityKind::Monster, &mapped), None);
    }
}
