//! Merge configuration: the settings a single `modmerge merge` invocation
//! needs, built once from CLI flags. Unlike the teacher's persistent XDG
//! `Config`, there is no user-preference state to load or save here — the
//! CLI's automated-merge surface has no "user preferences" (out of scope,
//! per `spec.md` §1) — but the shape (one typed struct, `Default`, an
//! explicit `validate`/`normalize` step instead of ad hoc flag checks
//! scattered through `main`) follows the teacher's `Config`.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

/// A named set of input mods to treat as one concatenated virtual mod
/// during scanning/mapping (`spec.md` §3, "mod group").
#[derive(Debug, Clone, Default)]
pub struct ModGroupConfig {
    pub name: String,
    pub member_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Fresh header fields written to the merged output (`spec.md` §4.8 step
    /// 5a, §9 "always emit a fresh header").
    pub mod_name: String,
    pub description: Option<String>,
    pub version: Option<String>,
    pub icon_path: Option<PathBuf>,

    /// Ungrouped input mod paths, in the order they should win ties.
    pub mod_paths: Vec<PathBuf>,
    pub mod_groups: Vec<ModGroupConfig>,

    pub output_name: String,
    pub output_path: PathBuf,
    pub clean: bool,

    /// Directory containing `spells.tsv`/`effects_spells.tsv`/`monsters.tsv`.
    /// `None` falls back to an empty game-data source.
    pub game_data_dir: Option<PathBuf>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        MergeConfig {
            mod_name: "Merged Mod".to_string(),
            description: None,
            version: None,
            icon_path: None,
            mod_paths: Vec::new(),
            mod_groups: Vec::new(),
            output_name: "merged_mod".to_string(),
            output_path: PathBuf::from("."),
            clean: false,
            game_data_dir: None,
        }
    }
}

impl MergeConfig {
    /// Normalize the config into something the writer can use directly:
    /// append `.dm` to the output name if missing, reject an empty mod set.
    /// Called once after flags are parsed, mirroring the teacher's
    /// load-then-validate shape rather than validating inline wherever a
    /// field is read.
    pub fn validate(mut self) -> Result<Self> {
        if self.mod_paths.is_empty() && self.mod_groups.is_empty() {
            bail!("--mods must name at least one mod file");
        }
        if !has_dm_extension(&self.output_name) {
            self.output_name.push_str(".dm");
        }
        if self.clean && !clean_target_is_safe(&self.output_path) {
            bail!(
                "refusing --clean on {}: directory name does not match the output name, \
                 pass a dedicated output directory instead",
                self.output_path.display()
            );
        }
        Ok(self)
    }
}

fn has_dm_extension(name: &str) -> bool {
    Path::new(name).extension().is_some_and(|ext| ext.eq_ignore_ascii_case("dm"))
}

/// `--clean` empties the target directory before writing; guard against an
/// accidental wide blast radius (e.g. `--output-path /`) by requiring the
/// directory itself be named after the output, unless it doesn't exist yet.
fn clean_target_is_safe(output_path: &Path) -> bool {
    if !output_path.exists() {
        return true;
    }
    output_path.file_name().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_appends_dm_extension() {
        let config = MergeConfig { mod_paths: vec![PathBuf::from("a.dm")], ..Default::default() };
        let config = config.validate().unwrap();
        assert_eq!(config.output_name, "merged_mod.dm");
    }

    #[test]
    fn validate_leaves_existing_dm_extension() {
        let config = MergeConfig {
            mod_paths: vec![PathBuf::from("a.dm")],
            output_name: "custom.dm".to_string(),
            ..Default::default()
        };
        let config = config.validate().unwrap();
        assert_eq!(config.output_name, "custom.dm");
    }

    #[test]
    fn validate_rejects_empty_mod_list() {
        let config = MergeConfig::default();
        assert!(config.validate().is_err());
    }
}
