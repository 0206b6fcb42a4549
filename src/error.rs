//! Structured error and warning taxonomy for the merge pipeline.
//!
//! Fatal conditions are `MergeError`s and abort the pipeline. Everything
//! else that is worth telling the caller about but does not stop the merge
//! accumulates as a `Warning` inside the `MergeReport`.

use crate::catalog::EntityKind;

pub type MergeResult<T> = Result<T, MergeError>;

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("invalid mod file {path}: {reason}")]
    InvalidModFile { path: String, reason: String },

    #[error("parse error in {mod_name} at line {line_no}: {cause} ({line:?})")]
    ParseError {
        mod_name: String,
        line_no: usize,
        line: String,
        cause: String,
    },

    #[error("no free id remains for {kind:?} in its modding range")]
    IdSpaceExhausted { kind: EntityKind },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Non-fatal conditions surfaced in a `MergeReport` rather than aborting.
#[derive(Debug, Clone)]
pub enum Warning {
    /// Two mods both edit the same vanilla-range id for a kind.
    VanillaOverlap {
        kind: EntityKind,
        id: u32,
        mods: Vec<String>,
    },
    /// A `#copyspell`/`#selectspell` reference (by id or by name) that
    /// neither the injected game-data interface nor the fixed fallback sets
    /// could resolve, so the spell block's effect context is unknown.
    OrphanReference {
        kind: EntityKind,
        reference: String,
        mod_name: String,
        line_no: usize,
    },
    /// A resource file referenced by a mod (e.g. its icon) could not be
    /// located on disk and was skipped.
    ResourceCopy {
        mod_name: String,
        path: String,
        reason: String,
    },
    /// Two resource files at the same relative destination had different
    /// contents; the first one copied was kept.
    ResourceDuplicate { relative_path: String, mods: Vec<String> },
    /// A spell/event block was still open when a new one started; the
    /// malformed buffer was discarded.
    MalformedBlockDiscarded {
        mod_name: String,
        line_no: usize,
        block_kind: &'static str,
    },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::VanillaOverlap { kind, id, mods } => write!(
                f,
                "vanilla {:?} id {} edited by multiple mods: {}",
                kind,
                id,
                mods.join(", ")
            ),
            Warning::OrphanReference {
                kind,
                reference,
                mod_name,
                line_no,
            } => write!(
                f,
                "{}:{}: unresolved {:?} reference {}",
                mod_name, line_no, kind, reference
            ),
            Warning::ResourceCopy {
                mod_name,
                path,
                reason,
            } => write!(f, "{}: could not copy resource {}: {}", mod_name, path, reason),
            Warning::ResourceDuplicate { relative_path, mods } => write!(
                f,
                "duplicate resource {} provided by multiple mods: {}",
                relative_path,
                mods.join(", ")
            ),
            Warning::MalformedBlockDiscarded {
                mod_name,
                line_no,
                block_kind,
            } => write!(
                f,
                "{}:{}: a new {} block opened before the previous one's #end; discarding the unterminated block",
                mod_name, line_no, block_kind
            ),
        }
    }
}
