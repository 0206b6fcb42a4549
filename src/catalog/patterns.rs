//! Compiled directive recognizers.
//!
//! Every directive line is reduced to one [`Directive`] variant. The
//! scanner, entity processor, and spell-block processor all dispatch off
//! this single recognition step instead of each re-deriving their own
//! regexes, so the grammar lives in exactly one place.

use super::EntityKind;
use regex_lite::Regex;
use std::sync::LazyLock;

/// Either a numeric id or a (lowercased) name reference, as accepted by
/// `#copyspell`, `#selectspell`, and `#nextspell`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Id(u32),
    Name(String),
}

/// One recognized directive line, with just enough structure for callers
/// to act without re-parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    ModName(String),
    /// `#description "..."` — `bool` is whether the closing quote is on
    /// this same line.
    DescriptionOpen { closed: bool },
    Version(String),
    DomVersion(String),
    Icon(String),
    /// `#new<kind>` with no id.
    NewUnnumbered(EntityKind),
    /// `#new<kind> <id>` / `#select<kind> <id>`.
    Numbered { kind: EntityKind, is_new: bool, id: u32 },
    Effect(i64),
    Damage(i64),
    CopySpell(Reference),
    SelectSpell(Reference),
    NextSpell(Reference),
    Code(i64),
    End,
    /// Recognized as a `#` directive, but not one the catalog assigns
    /// meaning to. Passed through unchanged.
    Unrecognized,
    /// Blank or `--` comment.
    Ignored,
}

/// Named pattern entry, kept mainly so the catalog can be enumerated
/// (e.g. by documentation or tests) rather than only used opaquely via
/// [`recognize`].
pub struct DirectivePattern {
    pub name: &'static str,
    pub capture: &'static str,
}

pub static CATALOG: &[DirectivePattern] = &[
    DirectivePattern { name: "modname", capture: "name" },
    DirectivePattern { name: "description", capture: "name" },
    DirectivePattern { name: "version", capture: "name" },
    DirectivePattern { name: "domversion", capture: "name" },
    DirectivePattern { name: "icon", capture: "name" },
    DirectivePattern { name: "new<kind>", capture: "id?" },
    DirectivePattern { name: "select<kind>", capture: "id" },
    DirectivePattern { name: "effect", capture: "id" },
    DirectivePattern { name: "damage", capture: "signed id" },
    DirectivePattern { name: "copyspell", capture: "id|name" },
    DirectivePattern { name: "selectspell", capture: "id|name" },
    DirectivePattern { name: "nextspell", capture: "id|name" },
    DirectivePattern { name: "code", capture: "signed id" },
    DirectivePattern { name: "end", capture: "" },
];

static QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"^#(\w+)\s+"([^"]*)"?"#).unwrap());
static SIMPLE_ARG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#(\w+)\s+(.+)$").unwrap());
static BARE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#(\w+)\s*$").unwrap());

fn parse_reference(arg: &str) -> Option<Reference> {
    let arg = arg.trim();
    if let Some(name) = arg.strip_prefix('"') {
        let name = name.strip_suffix('"').unwrap_or(name);
        return Some(Reference::Name(name.to_ascii_lowercase()));
    }
    arg.parse::<u32>().ok().map(Reference::Id)
}

/// Recognize one already-trimmed source line.
pub fn recognize(line: &str) -> Directive {
    if line.is_empty() || line.starts_with("--") {
        return Directive::Ignored;
    }
    if !line.starts_with('#') {
        return Directive::Unrecognized;
    }

    if let Some(caps) = QUOTED.captures(line) {
        let command = caps.get(1).unwrap().as_str().to_ascii_lowercase();
        let value = caps.get(2).unwrap().as_str().to_string();
        let closed = line.trim_end().ends_with('"') && line.matches('"').count() >= 2;
        match command.as_str() {
            "modname" => return Directive::ModName(value),
            "description" => return Directive::DescriptionOpen { closed },
            "icon" => return Directive::Icon(value),
            _ => {}
        }
    }

    if let Some(caps) = SIMPLE_ARG.captures(line) {
        let command = caps.get(1).unwrap().as_str().to_ascii_lowercase();
        let arg = caps.get(2).unwrap().as_str().trim();

        match command.as_str() {
            "version" => return Directive::Version(arg.to_string()),
            "domversion" => return Directive::DomVersion(arg.to_string()),
            "description" => return Directive::DescriptionOpen { closed: false },
            "effect" => {
                if let Ok(n) = arg.parse::<i64>() {
                    return Directive::Effect(n);
                }
            }
            "damage" => {
                if let Ok(n) = arg.parse::<i64>() {
                    return Directive::Damage(n);
                }
            }
            "code" => {
                if let Ok(n) = arg.parse::<i64>() {
                    return Directive::Code(n);
                }
            }
            "copyspell" => {
                if let Some(r) = parse_reference(arg) {
                    return Directive::CopySpell(r);
                }
            }
            "selectspell" => {
                if let Some(r) = parse_reference(arg) {
                    return Directive::SelectSpell(r);
                }
            }
            "nextspell" => {
                if let Some(r) = parse_reference(arg) {
                    return Directive::NextSpell(r);
                }
            }
            _ => {
                if let Some((kind, is_new)) = classify_kind_command(&command) {
                    if let Ok(id) = arg.parse::<u32>() {
                        return Directive::Numbered { kind, is_new, id };
                    }
                }
            }
        }
    }

    if let Some(caps) = BARE.captures(line) {
        let command = caps.get(1).unwrap().as_str().to_ascii_lowercase();
        match command.as_str() {
            "end" => return Directive::End,
            _ => {
                if let Some((kind, true)) = classify_kind_command(&command) {
                    return Directive::NewUnnumbered(kind);
                }
            }
        }
    }

    Directive::Unrecognized
}

/// Match `new<kind>` / `select<kind>` against the closed kind table.
fn classify_kind_command(command: &str) -> Option<(EntityKind, bool)> {
    if let Some(rest) = command.strip_prefix("new") {
        return EntityKind::ALL
            .into_iter()
            .find(|k| k.directive_name() == rest)
            .map(|k| (k, true));
    }
    if let Some(rest) = command.strip_prefix("select") {
        return EntityKind::ALL
            .into_iter()
            .find(|k| k.directive_name() == rest)
            .map(|k| (k, false));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_numbered_and_unnumbered_new() {
        assert_eq!(
            recognize("#newmonster 5000"),
            Directive::Numbered { kind: EntityKind::Monster, is_new: true, id: 5000 }
        );
        assert_eq!(recognize("#newspell"), Directive::NewUnnumbered(EntityKind::Spell));
        assert_eq!(
            recognize("#selectmonster 2845"),
            Directive::Numbered { kind: EntityKind::Monster, is_new: false, id: 2845 }
        );
    }

    #[test]
    fn recognizes_spell_block_interior() {
        assert_eq!(recognize("#effect 1"), Directive::Effect(1));
        assert_eq!(recognize("#damage -4149"), Directive::Damage(-4149));
        assert_eq!(recognize("#damage 500"), Directive::Damage(500));
        assert_eq!(
            recognize("#copyspell \"Animate Skeleton\""),
            Directive::CopySpell(Reference::Name("animate skeleton".into()))
        );
        assert_eq!(recognize("#copyspell 721"), Directive::CopySpell(Reference::Id(721)));
        assert_eq!(recognize("#end"), Directive::End);
    }

    #[test]
    fn recognizes_header_and_restricted_item() {
        assert_eq!(recognize("#modname \"Test Mod\""), Directive::ModName("Test Mod".into()));
        assert_eq!(
            recognize("#selectrestricteditem 705"),
            Directive::Numbered { kind: EntityKind::RestrictedItem, is_new: false, id: 705 }
        );
        assert_eq!(recognize("-- a comment"), Directive::Ignored);
        assert_eq!(recognize(""), Directive::Ignored);
        assert_eq!(recognize("#somefuturedirective 1 2 3"), Directive::Unrecognized);
    }
}
