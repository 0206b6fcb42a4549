//! Pipeline orchestrator: scan → detect conflicts → allocate ids → rewrite →
//! write. Mirrors the teacher's `App`-as-orchestrator shape (`src/app/mod.rs`
//! builds and wires together the long-lived subsystems once at startup) but
//! scaled down to one pipeline run: there is no persistent state to hold
//! between invocations, so `merge` builds everything it needs, runs once,
//! and returns.

use crate::conflicts;
use crate::error::{MergeError, MergeResult, Warning};
use crate::gamedata::GameDataSource;
use crate::model::{IdMapping, ModDefinition, ModFile};
use crate::rewrite::rewrite_mod;
use crate::{allocator, config::MergeConfig, scanner};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Everything the caller needs after a merge run: where the output landed,
/// every non-fatal condition raised along the way, and the final id mapping
/// per input mod (for a human or another tool to audit).
#[derive(Debug, Default)]
pub struct MergeReport {
    pub output_path: PathBuf,
    pub warnings: Vec<Warning>,
    pub per_mod_mappings: HashMap<String, IdMapping>,
}

/// Run the full pipeline for one `modmerge merge` invocation. `cancel` is
/// checked between mods during both the parse and write stages; setting it
/// (e.g. from a `Ctrl-C` handler in `main`) aborts the run with a
/// [`MergeError::Io`] and removes any partial output file.
pub async fn merge(
    config: &MergeConfig,
    game_data: &dyn GameDataSource,
    cancel: &AtomicBool,
) -> MergeResult<MergeReport> {
    let files = gather_mod_files(config)?;
    tracing::info!(mods = files.len(), "parsing mods");

    let (mods, mut warnings) = parse_all(files, cancel).await?;

    let defs: Vec<ModDefinition> = mods.iter().map(|(_, def)| def.clone()).collect();
    let conflict_report = conflicts::detect(&defs);
    tracing::info!(
        pairs = conflict_report.pairs.len(),
        collisions = conflict_report.total_collisions(),
        "detected id collisions"
    );
    for pair in &conflict_report.pairs {
        tracing::debug!(
            mod_a = %pair.mod_a,
            mod_b = %pair.mod_b,
            collisions = pair.collisions.len(),
            "mod pair collides"
        );
    }
    for overlap in conflict_report.vanilla_overlaps {
        warnings.push(Warning::VanillaOverlap {
            kind: overlap.kind,
            id: overlap.id,
            mods: vec![overlap.mod_a, overlap.mod_b],
        });
    }

    if cancel.load(Ordering::Relaxed) {
        return Err(cancelled());
    }

    tracing::info!("allocating fresh ids");
    let mapped = allocator::allocate(mods)?;

    let output_path = config.output_path.join(&config.output_name);
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut body = render_header(config);
    let mut per_mod_mappings = HashMap::new();

    for entry in &mapped {
        if cancel.load(Ordering::Relaxed) {
            let _ = std::fs::remove_file(&output_path);
            return Err(cancelled());
        }

        let text = entry.file.full_text()?;
        body.push_str(&format!("-- === {} ===\n", entry.file.name));

        let (lines, block_warnings) = rewrite_mod(entry, &text, game_data);
        warnings.extend(block_warnings);
        for line in lines {
            body.push_str(&line);
            body.push('\n');
        }

        per_mod_mappings.insert(entry.file.name.clone(), entry.mapping.clone());
    }

    if let Err(e) = std::fs::write(&output_path, &body) {
        return Err(MergeError::Io(e));
    }

    let resource_warnings = copy_resources(mapped.iter().map(|m| &m.file), &config.output_path);
    warnings.extend(resource_warnings);

    tracing::info!(
        output = %output_path.display(),
        warnings = warnings.len(),
        "merge complete"
    );

    Ok(MergeReport { output_path, warnings, per_mod_mappings })
}

fn cancelled() -> MergeError {
    MergeError::Io(std::io::Error::other("merge cancelled"))
}

/// Resolve `--mods` and `--mod-group` flags into one flat list of
/// [`ModFile`]s. A group's members are read eagerly and concatenated into a
/// single in-memory virtual mod, each original's text preceded by a banner
/// comment naming it — the only place this pipeline reads content ahead of
/// the scan stage, since concatenation can't be expressed any other way.
fn gather_mod_files(config: &MergeConfig) -> MergeResult<Vec<ModFile>> {
    let mut files: Vec<ModFile> = config.mod_paths.iter().map(ModFile::from_path).collect();

    for group in &config.mod_groups {
        let mut combined = String::new();
        for member_path in &group.member_paths {
            let member = ModFile::from_path(member_path);
            let text = member.full_text()?;
            combined.push_str(&format!("-- === {} ===\n", member.name));
            combined.push_str(&text);
            if !text.ends_with('\n') {
                combined.push('\n');
            }
        }
        files.push(ModFile::in_memory(group.name.clone(), combined));
    }

    Ok(files)
}

/// Scan every mod concurrently (`spec.md` §5: parsing is independent
/// per-mod, so it fans out; allocation and writing stay sequential since
/// both need the full set). Results are slotted back into input order after
/// the join, since `JoinSet` completion order is not FIFO.
async fn parse_all(
    files: Vec<ModFile>,
    cancel: &AtomicBool,
) -> MergeResult<(Vec<(ModFile, ModDefinition)>, Vec<Warning>)> {
    let total = files.len();
    let mut set = tokio::task::JoinSet::new();

    for (idx, file) in files.into_iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        set.spawn(async move {
            let text = file.full_text()?;
            let outcome = scanner::scan(&file.name, &text)?;
            Ok::<_, MergeError>((idx, file, outcome))
        });
    }

    let mut slots: Vec<Option<(ModFile, ModDefinition)>> = (0..total).map(|_| None).collect();
    let mut warnings = Vec::new();

    while let Some(joined) = set.join_next().await {
        let outcome = match joined {
            Ok(result) => result,
            Err(e) => {
                set.abort_all();
                return Err(MergeError::Io(std::io::Error::other(e.to_string())));
            }
        };
        match outcome {
            Ok((idx, file, outcome)) => {
                warnings.extend(outcome.warnings);
                slots[idx] = Some((file, outcome.definition));
            }
            Err(e) => {
                set.abort_all();
                return Err(e);
            }
        }
    }

    Ok((slots.into_iter().flatten().collect(), warnings))
}

/// The merged output always gets a fresh header instead of copying any
/// input mod's (`spec.md` §4.8 step 5a, §9's "always emit a fresh header").
fn render_header(config: &MergeConfig) -> String {
    let mut header = format!("#modname \"{}\"\n", config.mod_name);
    if let Some(description) = &config.description {
        header.push_str(&format!("#description \"{}\"\n", description));
    }
    if let Some(version) = &config.version {
        header.push_str(&format!("#version {}\n", version));
    }
    if let Some(icon) = &config.icon_path {
        header.push_str(&format!("#icon \"{}\"\n", icon.display()));
    }
    header
}

/// Copy every mod's `#icon` resource into the output directory, preserving
/// its relative path (`SPEC_FULL.md` §4.9, Open Question decision 3: icons
/// only). Two mods shipping identical bytes at the same relative path are
/// silently deduplicated; differing bytes keep the first copy and warn.
fn copy_resources<'a>(mods: impl Iterator<Item = &'a ModFile>, output_dir: &Path) -> Vec<Warning> {
    let mut warnings = Vec::new();
    let mut written: HashMap<String, (Vec<u8>, String)> = HashMap::new();

    for file in mods {
        let header = match file.header_metadata() {
            Ok(header) => header,
            Err(_) => continue,
        };
        let Some(relative_path) = header.icon_relative_path else { continue };

        let Some(base_dir) = file.base_dir() else {
            warnings.push(Warning::ResourceCopy {
                mod_name: file.name.clone(),
                path: relative_path,
                reason: "mod has no on-disk directory to resolve the resource against".to_string(),
            });
            continue;
        };

        let source = base_dir.join(&relative_path);
        let bytes = match std::fs::read(&source) {
            Ok(bytes) => bytes,
            Err(e) => {
                warnings.push(Warning::ResourceCopy {
                    mod_name: file.name.clone(),
                    path: relative_path,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if let Some((existing_bytes, owner)) = written.get(&relative_path) {
            if existing_bytes != &bytes {
                warnings.push(Warning::ResourceDuplicate {
                    relative_path,
                    mods: vec![owner.clone(), file.name.clone()],
                });
            }
            continue;
        }

        let destination = output_dir.join(&relative_path);
        if let Some(parent) = destination.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                warnings.push(Warning::ResourceCopy {
                    mod_name: file.name.clone(),
                    path: relative_path,
                    reason: "could not create destination directory".to_string(),
                });
                continue;
            }
        }
        if std::fs::write(&destination, &bytes).is_err() {
            warnings.push(Warning::ResourceCopy {
                mod_name: file.name.clone(),
                path: relative_path,
                reason: "could not write destination file".to_string(),
            });
            continue;
        }

        written.insert(relative_path, (bytes, file.name.clone()));
    }

    warnings
}
