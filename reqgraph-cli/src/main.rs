mod cli;
mod render;
mod snapshot_file;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use reqgraph_core::db::{create_backend, ScoreBackend, ScoreStoreConfig};
use reqgraph_core::{AnalysisResult, Analyzer, EngineConfig, FrictionLog, GraphSnapshot};

use crate::cli::{Cli, Command, ConfigCommand, OutputFormat};
use crate::snapshot_file::SnapshotFile;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::load_from(path)?,
        None => EngineConfig::load()?,
    };

    match cli.command {
        Command::Analyze {
            file,
            format,
            phase,
            scores,
            related,
            save,
        } => analyze(
            config,
            &file,
            format,
            phase.as_deref(),
            scores.as_deref(),
            related,
            save,
        ),
        Command::Baseline {
            file,
            scores,
            phase,
        } => baseline(config, &file, &scores, phase.as_deref()),
        Command::Config { command } => match command {
            ConfigCommand::Show => config_show(&cli.config, &config),
            ConfigCommand::Init { force } => config_init(&cli.config, force),
        },
    }
}

fn apply_phase(config: &mut EngineConfig, phase: Option<&str>) -> Result<()> {
    if let Some(phase) = phase {
        config.phase = phase.parse()?;
    }
    Ok(())
}

fn load_snapshot(file: &Path) -> Result<(GraphSnapshot, FrictionLog)> {
    let snapshot_file = SnapshotFile::load(file)?;
    let friction = snapshot_file.friction_log();
    Ok((snapshot_file.into_snapshot()?, friction))
}

fn run_pass(
    config: EngineConfig,
    snapshot: &GraphSnapshot,
    friction: &FrictionLog,
    store: Option<&dyn ScoreBackend>,
) -> Result<AnalysisResult> {
    let existing = match store {
        Some(backend) => backend.load_all()?,
        None => BTreeMap::new(),
    };
    Ok(Analyzer::new(config).run(snapshot, &existing, friction)?)
}

fn analyze(
    mut config: EngineConfig,
    file: &Path,
    format: OutputFormat,
    phase: Option<&str>,
    scores: Option<&Path>,
    related: bool,
    save: bool,
) -> Result<()> {
    apply_phase(&mut config, phase)?;
    if related {
        config.duplicate_threshold = config.related_threshold;
    }
    let (snapshot, friction) = load_snapshot(file)?;

    let store = match scores {
        Some(path) => Some(create_backend(&ScoreStoreConfig::from_path(path))?),
        None => None,
    };
    let result = run_pass(config, &snapshot, &friction, store.as_deref())?;

    if save {
        let backend = store
            .as_deref()
            .context("--save requires a score store")?;
        for (id, score) in &result.scores {
            backend.establish_baseline(id, &score.stable)?;
            backend.record_current(id, &score.stable)?;
        }
    }

    match format {
        OutputFormat::Text => render::text_report(&result),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result.report)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&result.report)?),
    }
    Ok(())
}

fn baseline(
    mut config: EngineConfig,
    file: &Path,
    scores: &Path,
    phase: Option<&str>,
) -> Result<()> {
    apply_phase(&mut config, phase)?;
    let (snapshot, friction) = load_snapshot(file)?;
    let backend = create_backend(&ScoreStoreConfig::from_path(scores))?;

    // An empty existing map makes every requirement establish a fresh
    // candidate; the backend keeps any baseline already stored.
    let result = run_pass(config, &snapshot, &friction, None)?;
    let mut established = 0usize;
    let mut kept = 0usize;
    for (id, score) in &result.scores {
        let stored = backend.establish_baseline(id, &score.stable)?;
        if stored == score.stable {
            established += 1;
        } else {
            kept += 1;
        }
    }
    println!(
        "baselines: {established} established, {kept} already present in {}",
        backend.path().display()
    );
    Ok(())
}

fn config_show(path: &Option<std::path::PathBuf>, config: &EngineConfig) -> Result<()> {
    let effective = match path {
        Some(p) => p.clone(),
        None => EngineConfig::default_path()?,
    };
    println!("# {}", effective.display());
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}

fn config_init(path: &Option<std::path::PathBuf>, force: bool) -> Result<()> {
    let target = match path {
        Some(p) => p.clone(),
        None => EngineConfig::default_path()?,
    };
    if target.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", target.display());
    }
    EngineConfig::default().save_to(&target)?;
    println!("wrote {}", target.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqgraph_core::StableScore;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_snapshot() -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(
            file,
            r#"
now: 2024-06-01T00:00:00Z
requirements:
  - id: REQ-001
    title: Billing export
    description: Export invoices as CSV monthly
  - id: REQ-002
    title: Mobile push
    description: Send push notifications on iOS
dependencies:
  - from: REQ-002
    to: REQ-001
"#
        )
        .unwrap();
        file
    }

    #[test]
    fn test_analyze_with_score_store_roundtrip() {
        let snapshot_file = sample_snapshot();
        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join("scores.yaml");

        analyze(
            EngineConfig::default(),
            snapshot_file.path(),
            OutputFormat::Json,
            Some("growth"),
            Some(&store_path),
            false,
            true,
        )
        .unwrap();

        let backend = create_backend(&ScoreStoreConfig::from_path(&store_path)).unwrap();
        let all = backend.load_all().unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_baseline_is_idempotent() {
        let snapshot_file = sample_snapshot();
        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join("scores.yaml");

        baseline(
            EngineConfig::default(),
            snapshot_file.path(),
            &store_path,
            None,
        )
        .unwrap();
        let backend = create_backend(&ScoreStoreConfig::from_path(&store_path)).unwrap();
        let first: Vec<i64> = backend
            .load_all()
            .unwrap()
            .values()
            .map(StableScore::baseline)
            .collect();

        baseline(
            EngineConfig::default(),
            snapshot_file.path(),
            &store_path,
            None,
        )
        .unwrap();
        let second: Vec<i64> = backend
            .load_all()
            .unwrap()
            .values()
            .map(StableScore::baseline)
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_phase_rejected() {
        let mut config = EngineConfig::default();
        assert!(apply_phase(&mut config, Some("startup")).is_err());
        assert!(apply_phase(&mut config, Some("maturity")).is_ok());
    }
}
