//! Implementation of the `batch` subcommand.
//!
//! Variants are evaluated in parallel; errors are reported per variant and
//! never abort the batch.

use std::io::Write;
use std::path::Path;
use std::time::Instant;

use indicatif::ParallelProgressIterator;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thousands::Separable;

use crate::common::io::{open_read_maybe_gz, open_write_maybe_gz};
use crate::common::{progress_bar, GenomeRelease};
use crate::conf::{Config, EngineConf};
use crate::err::Error;
use crate::pvs1::{predict, Transcript, Verdict, VariantInput};
use crate::snapshot::Snapshot;

/// Command line arguments for `batch` subcommand.
#[derive(Debug, clap::Parser)]
#[command(author, version, about = "classify a batch of variants", long_about = None)]
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
    /// Path to input TSV file with columns `id`, `variant`, and `transcript_id`.
    #[arg(long)]
    pub path_input: String,
    /// Path to output JSONL file.
    #[arg(long)]
    pub path_output: String,
    /// Set the number of threads to use, defaults to number of cores.
    #[arg(long)]
    pub num_threads: Option<usize>,
}

/// One line of the input TSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Identifier to correlate results with.
    pub id: String,
    /// Variant description, see `VariantInput`.
    pub variant: String,
    /// Target transcript; all overlapping transcripts are used if missing.
    #[serde(default)]
    pub transcript_id: Option<String>,
}

/// Error reported for a single variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    pub kind: String,
    pub message: String,
}

impl From<&Error> for BatchError {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind().to_owned(),
            message: err.to_string(),
        }
    }
}

/// One line of the output JSONL, holding either a verdict or an error.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub id: String,
    pub transcript_id: Option<String>,
    pub verdict: Option<Verdict>,
    pub error: Option<BatchError>,
}

impl BatchRecord {
    fn from_result(id: &str, transcript_id: Option<&str>, result: Result<Verdict, Error>) -> Self {
        match result {
            Ok(verdict) => Self {
                id: id.to_owned(),
                transcript_id: Some(verdict.transcript_id.clone()),
                verdict: Some(verdict),
                error: None,
            },
            Err(err) => {
                tracing::debug!("variant {} failed: {}", id, &err);
                Self {
                    id: id.to_owned(),
                    transcript_id: transcript_id.map(str::to_owned),
                    verdict: None,
                    error: Some((&err).into()),
                }
            }
        }
    }
}

/// Transcripts to evaluate `input` on.
fn target_transcripts<'a>(
    snapshot: &'a Snapshot,
    request: &BatchRequest,
    input: &VariantInput,
) -> Result<Vec<&'a Transcript>, Error> {
    let tx_id = request
        .transcript_id
        .as_deref()
        .filter(|tx_id| !tx_id.is_empty())
        .or_else(|| input.transcript_id());
    match (tx_id, input) {
        (Some(tx_id), _) => snapshot
            .transcript(tx_id)
            .map(|tx| vec![tx])
            .ok_or_else(|| Error::UnknownTranscript(tx_id.to_owned())),
        (None, VariantInput::Genomic { variant, .. }) => {
            let txs = snapshot.overlapping(variant.chrom(), variant.start(), variant.end());
            if txs.is_empty() {
                Err(Error::UnknownTranscript(format!(
                    "no transcript overlaps {}",
                    variant
                )))
            } else {
                Ok(txs)
            }
        }
        (None, VariantInput::Transcript { .. }) => Err(Error::InvalidVariant(
            "transcript-relative variant without transcript".to_owned(),
        )),
    }
}

/// Evaluate one request, yielding one record per target transcript.
pub fn evaluate_one(
    snapshot: &Snapshot,
    conf: &EngineConf,
    request: &BatchRequest,
) -> Vec<BatchRecord> {
    let error = |err: Error| {
        vec![BatchRecord::from_result(
            &request.id,
            request.transcript_id.as_deref(),
            Err(err),
        )]
    };

    let input = match request.variant.parse::<VariantInput>() {
        Ok(input) => input,
        Err(err) => return error(err),
    };
    if let VariantInput::Genomic {
        release: Some(release),
        ..
    } = &input
    {
        if *release != snapshot.genome_release() {
            return error(Error::InvalidVariant(format!(
                "{} is on {} but the reference data is {}",
                request.variant,
                release.name(),
                snapshot.genome_release().name()
            )));
        }
    }
    let txs = match target_transcripts(snapshot, request, &input) {
        Ok(txs) => txs,
        Err(err) => return error(err),
    };

    txs.into_iter()
        .map(|tx| {
            let result = input.resolve(tx).and_then(|variant| {
                predict(&request.id, &variant, tx, snapshot.annotations(), conf)
            });
            BatchRecord::from_result(&request.id, Some(tx.id()), result)
        })
        .collect()
}

/// Evaluate all requests in parallel; output order follows input order.
pub fn evaluate_batch(
    snapshot: &Snapshot,
    conf: &EngineConf,
    requests: &[BatchRequest],
) -> Result<Vec<BatchRecord>, anyhow::Error> {
    let records = requests
        .par_iter()
        .progress_with(progress_bar(requests.len())?)
        .map(|request| evaluate_one(snapshot, conf, request))
        .collect::<Vec<_>>();
    Ok(records.into_iter().flatten().collect())
}

/// Read requests from the headered input TSV.
pub fn read_requests(path: &Path) -> Result<Vec<BatchRequest>, anyhow::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .delimiter(b'\t')
        .from_reader(open_read_maybe_gz(path)?);
    reader
        .deserialize()
        .collect::<Result<Vec<BatchRequest>, _>>()
        .map_err(|e| anyhow::anyhow!("could not parse {:?}: {}", path, e))
}

/// Write records as JSONL.
pub fn write_records(path: &Path, records: &[BatchRecord]) -> Result<(), anyhow::Error> {
    let mut writer = open_write_maybe_gz(path)?;
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Main entry point for `batch` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    if let Some(num_threads) = args.num_threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .map_err(|e| anyhow::anyhow!("building global Rayon thread pool failed: {}", e))?;
    }

    let path_db = Path::new(&args.path_db);
    let config = Config::resolve(path_db, args.path_conf.as_deref().map(Path::new))?;
    let snapshot = Snapshot::load(path_db, args.genome_release, &config.annotation)?;

    tracing::info!("Reading requests from {}...", &args.path_input);
    let requests = read_requests(Path::new(&args.path_input))?;
    tracing::info!("... read {} requests", requests.len().separate_with_commas());

    tracing::info!("Evaluating...");
    let before_evaluation = Instant::now();
    let records = evaluate_batch(&snapshot, &config.engine, &requests)?;
    let failed = records.iter().filter(|r| r.error.is_some()).count();
    tracing::info!(
        "... done evaluating {} records ({} failed) in {:?}",
        records.len().separate_with_commas(),
        failed.separate_with_commas(),
        before_evaluation.elapsed()
    );

    write_records(Path::new(&args.path_output), &records)?;
    tracing::info!("wrote results to {}", &args.path_output);

    Ok(())
}
