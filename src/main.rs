use anyhow::{Context, Result};
use clap::Parser;
use modmerge::config::MergeConfig;
use modmerge::gamedata::{CsvGameData, EmptyGameData, GameDataSource};
use modmerge::writer;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "modmerge")]
#[command(author, version, about = "Merges mod files, relocating colliding entity ids")]
struct Cli {
    /// Comma-separated list of mod file paths to merge. Bracket syntax
    /// (`[a.dm,b.dm]`) is accepted; the brackets are stripped before splitting.
    #[arg(long)]
    mods: String,

    /// Name of the merged output mod (a `.dm` extension is appended if missing).
    #[arg(long, default_value = "merged_mod")]
    output: String,

    /// Directory to write the merged mod and its resources into.
    #[arg(long, default_value = ".")]
    output_path: PathBuf,

    /// Empty the output directory before writing.
    #[arg(long)]
    clean: bool,

    /// Directory containing spells.tsv, effects_spells.tsv, monsters.tsv.
    #[arg(long)]
    game_data: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Parse `--mods`, accepting either a bare comma list or the bracketed
/// `[a.dm,b.dm]` form from `spec.md` §6.
fn parse_mod_paths(raw: &str) -> Vec<PathBuf> {
    let trimmed = raw.trim();
    let inner = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')).unwrap_or(trimmed);
    inner.split(',').map(str::trim).filter(|s| !s.is_empty()).map(PathBuf::from).collect()
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "modmerge=info",
        1 => "modmerge=debug",
        2 => "modmerge=trace",
        _ => "trace",
    };

    let log_dir = std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".modmerge");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = log_dir.join("modmerge.log");

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .expect("failed to open log file");

    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::sync::Arc::new(file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = MergeConfig {
        mod_paths: parse_mod_paths(&cli.mods),
        output_name: cli.output,
        output_path: cli.output_path,
        clean: cli.clean,
        game_data_dir: cli.game_data.clone(),
        ..Default::default()
    }
    .validate()?;

    if config.clean && config.output_path.exists() {
        tracing::info!(path = %config.output_path.display(), "cleaning output directory");
        std::fs::remove_dir_all(&config.output_path)
            .with_context(|| format!("failed to clean {}", config.output_path.display()))?;
    }

    let game_data: Box<dyn GameDataSource> = match &config.game_data_dir {
        Some(dir) => Box::new(CsvGameData::load(dir)?),
        None => Box::new(EmptyGameData),
    };

    let cancel = AtomicBool::new(false);
    let report = writer::merge(&config, game_data.as_ref(), &cancel).await?;

    tracing::info!(
        output = %report.output_path.display(),
        mods = report.per_mod_mappings.len(),
        warnings = report.warnings.len(),
        "merge finished"
    );
    for warning in &report.warnings {
        tracing::warn!("{}", warning);
    }

    Ok(())
}
