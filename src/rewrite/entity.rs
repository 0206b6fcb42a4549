//! Entity processor: pure line rewriting for ordinary (non-spell-block)
//! numbered directives (spec.md §4.5).

use crate::catalog::patterns::{recognize, Directive};
use crate::model::MappedModDefinition;

pub struct Rewritten {
    pub line: String,
    pub audit_comment: Option<String>,
}

/// Rewrite one line against `mapped`'s id mapping. `raw_line` may carry
/// leading whitespace or a trailing comment; only the matched numeric token
/// is touched, so both survive untouched. Anything the catalog does not
/// recognize as a numbered entity directive is returned verbatim.
pub fn process_line(raw_line: &str, mapped: &MappedModDefinition) -> Rewritten {
    let Directive::Numbered { kind, id, .. } = recognize(raw_line.trim()) else {
        return Rewritten { line: raw_line.to_string(), audit_comment: None };
    };

    let new_id = mapped.mapped_id(kind, id);
    if new_id == id {
        return Rewritten { line: raw_line.to_string(), audit_comment: None };
    }

    let rewritten = substitute_whole_number(raw_line, id, new_id);
    let audit = format!("-- MOD MERGER: Remapped {:?} {} -> {}", kind, id, new_id);
    Rewritten { line: rewritten, audit_comment: Some(audit) }
}

/// Replace the first whole-number occurrence of `old` with `new`, bounded by
/// non-digit neighbors on both sides so e.g. `old=500` never matches inside
/// `15000`. A leading `-` is never part of the digit run: it is its own
/// token, so a signed field like `#damage -4149` remaps its magnitude
/// without disturbing the sign.
pub fn substitute_whole_number(line: &str, old: u32, new: u32) -> String {
    let needle = old.to_string();
    let bytes = line.as_bytes();
    let mut search_from = 0;
    while let Some(rel) = line[search_from..].find(&needle) {
        let start = search_from + rel;
        let end = start + needle.len();
        let before_ok = start == 0 || !bytes[start - 1].is_ascii_digit();
        let after_ok = end == bytes.len() || !bytes[end].is_ascii_digit();
        if before_ok && after_ok {
            let mut out = String::with_capacity(line.len());
            out.push_str(&line[..start]);
            out.push_str(&new.to_string());
            out.push_str(&line[end..]);
            return out;
        }
        search_from = end;
    }
    line.to_string()
}
