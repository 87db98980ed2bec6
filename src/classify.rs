//! Implementation of the `classify` subcommand.

use std::path::Path;

use crate::batch::{evaluate_one, BatchRecord, BatchRequest};
use crate::common::GenomeRelease;
use crate::conf::Config;
use crate::snapshot::Snapshot;

/// Command line arguments for `classify` subcommand.
#[derive(Debug, clap::Parser)]
#[command(author, version, about = "predict PVS1 strength of a single variant", long_about = None)]
pub struct Args {
    /// Genome release of the reference snapshot.
    #[arg(long, value_enum, default_value_t = GenomeRelease::Grch38)]
    pub genome_release: GenomeRelease,
    /// Path to the reference snapshot directory.
    #[arg(long)]
    pub path_db: String,
    /// Path to configuration TOML file, defaults to `${path_db}/conf.toml`.
    #[arg(long)]
    pub path_conf: Option<String>,
    /// Variant, e.g., `GRCh38-1-1055-C-A` or `NM_000001.1:c.5C>A`.
    #[arg(long)]
    pub variant: String,
    /// Target transcript; all overlapping transcripts are used if missing.
    #[arg(long)]
    pub transcript: Option<String>,
}

/// Render records as pretty-printed JSON, one verdict object per transcript.
fn render(records: &[BatchRecord]) -> Result<String, anyhow::Error> {
    let verdicts = records
        .iter()
        .filter_map(|record| record.verdict.as_ref())
        .collect::<Vec<_>>();
    Ok(match verdicts.as_slice() {
        [verdict] => serde_json::to_string_pretty(verdict)?,
        _ => serde_json::to_string_pretty(&verdicts)?,
    })
}

/// Main entry point for `classify` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    let path_db = Path::new(&args.path_db);
    let config = Config::resolve(path_db, args.path_conf.as_deref().map(Path::new))?;
    let snapshot = Snapshot::load(path_db, args.genome_release, &config.annotation)?;

    let request = BatchRequest {
        id: args.variant.clone(),
        variant: args.variant.clone(),
        transcript_id: args.transcript.clone(),
    };
    let records = evaluate_one(&snapshot, &config.engine, &request);
    for error in records.iter().filter_map(|record| record.error.as_ref()) {
        tracing::warn!("{}: {}", error.kind, error.message);
    }
    if records.iter().all(|record| record.verdict.is_none()) {
        anyhow::bail!("no verdict for {}", &args.variant);
    }

    println!("{}", render(&records)?);

    Ok(())
}
