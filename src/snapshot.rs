//! Loading of the reference data snapshot into memory.
//!
//! A snapshot directory contains `transcripts.jsonl` (one `TranscriptRecord`
//! per line) and the headered TSV tables `domains.tsv`, `hotspots.tsv` and
//! `precedents.tsv`; all files may be gzip-compressed.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;
use std::time::Instant;

use bio::data_structures::interval_tree::ArrayBackedIntervalTree;
use thousands::Separable;

use crate::common::io::{maybe_gz_path, open_read_maybe_gz};
use crate::common::{trace_rss_now, GenomeRelease};
use crate::conf::AnnotationConf;
use crate::pvs1::annotation::{AnnotationDb, AnnotationDbBuilder, PrecedentRecord, RegionRecord};
use crate::pvs1::transcript::{Transcript, TranscriptRecord};

/// Alias for the interval tree over transcript indices.
type IntervalTree = ArrayBackedIntervalTree<i64, u32>;

/// Immutable reference data shared by all evaluations.
#[derive(Debug)]
pub struct Snapshot {
    genome_release: GenomeRelease,
    transcripts: Vec<Transcript>,
    /// Index into `transcripts` by identifier, with and without version.
    by_id: HashMap<String, usize>,
    by_chrom: HashMap<String, IntervalTree>,
    annotations: AnnotationDb,
}

/// Strip the version suffix from a transcript identifier.
fn versionless(tx_id: &str) -> &str {
    match tx_id.rsplit_once('.') {
        Some((base, version)) if version.chars().all(|c| c.is_ascii_digit()) => base,
        _ => tx_id,
    }
}

impl Snapshot {
    /// Build snapshot from transcripts and collected annotation records.
    ///
    /// Every transcript is registered with the annotation database so that
    /// a transcript without records has no annotation rather than unknown ones.
    pub fn new(
        genome_release: GenomeRelease,
        transcripts: Vec<Transcript>,
        mut annotations: AnnotationDbBuilder,
    ) -> Self {
        let mut by_id = HashMap::new();
        let mut by_chrom: HashMap<String, IntervalTree> = HashMap::new();
        for (idx, tx) in transcripts.iter().enumerate() {
            annotations.register_transcript(tx.id());
            by_id.insert(tx.id().to_owned(), idx);
            by_id.entry(versionless(tx.id()).to_owned()).or_insert(idx);

            let start = tx.exons().iter().map(|e| e.start).min().unwrap_or_default();
            let end = tx.exons().iter().map(|e| e.end).max().unwrap_or_default();
            by_chrom
                .entry(tx.chrom().to_owned())
                .or_default()
                .insert((start - 1)..end, idx as u32);
        }
        by_chrom.values_mut().for_each(|tree| tree.index());

        Self {
            genome_release,
            transcripts,
            by_id,
            by_chrom,
            annotations: annotations.build(),
        }
    }

    /// Load the snapshot from the directory `path_db`.
    #[tracing::instrument(skip(conf))]
    pub fn load(
        path_db: &Path,
        genome_release: GenomeRelease,
        conf: &AnnotationConf,
    ) -> Result<Self, anyhow::Error> {
        let before_loading = Instant::now();

        let path_tx = maybe_gz_path(path_db, "transcripts.jsonl").ok_or_else(|| {
            anyhow::anyhow!("no transcripts.jsonl[.gz] found in {:?}", path_db)
        })?;
        let transcripts = load_transcripts(&path_tx)?;

        let mut builder = AnnotationDb::builder(conf.clone());
        for record in load_table::<RegionRecord>(path_db, "domains.tsv")? {
            builder.add_domain(record);
        }
        for record in load_table::<RegionRecord>(path_db, "hotspots.tsv")? {
            builder.add_hotspot(record);
        }
        for record in load_table::<PrecedentRecord>(path_db, "precedents.tsv")? {
            builder.add_precedent(record);
        }

        let result = Self::new(genome_release, transcripts, builder);
        tracing::info!(
            "loaded {} transcripts for {} in {:?}",
            result.len().separate_with_commas(),
            genome_release.name(),
            before_loading.elapsed()
        );
        trace_rss_now();

        Ok(result)
    }

    pub fn genome_release(&self) -> GenomeRelease {
        self.genome_release
    }

    /// Lookup over the curated annotation tables.
    pub fn annotations(&self) -> &AnnotationDb {
        &self.annotations
    }

    /// Number of transcripts.
    pub fn len(&self) -> usize {
        self.transcripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transcripts.is_empty()
    }

    /// Transcript by identifier; falls back to ignoring the version.
    pub fn transcript(&self, tx_id: &str) -> Option<&Transcript> {
        self.by_id
            .get(tx_id)
            .or_else(|| self.by_id.get(versionless(tx_id)))
            .map(|idx| &self.transcripts[*idx])
    }

    /// Transcripts whose exon hull overlaps `start..=end` on `chrom`.
    pub fn overlapping(&self, chrom: &str, start: i64, end: i64) -> Vec<&Transcript> {
        // insertions have `end == start - 1`
        let (start, end) = (start.min(end), start.max(end));
        match self.by_chrom.get(chrom) {
            Some(tree) => tree
                .find((start - 1)..end)
                .iter()
                .map(|e| &self.transcripts[*e.data() as usize])
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Read transcripts from JSONL, skipping records that are not valid.
fn load_transcripts(path: &Path) -> Result<Vec<Transcript>, anyhow::Error> {
    tracing::debug!("loading transcripts from {:?}", path);
    let mut result = Vec::new();
    let mut skipped = 0usize;
    for (lineno, line) in open_read_maybe_gz(path)?.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: TranscriptRecord = serde_json::from_str(&line).map_err(|e| {
            anyhow::anyhow!("could not parse {:?} line {}: {}", path, lineno + 1, e)
        })?;
        match Transcript::try_from(record) {
            Ok(tx) => result.push(tx),
            Err(e) => {
                tracing::warn!("skipping transcript: {}", e);
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        tracing::warn!("skipped {} invalid transcripts", skipped.separate_with_commas());
    }
    Ok(result)
}

/// Read the headered TSV table `name` from `path_db`; a missing table is empty.
fn load_table<T>(path_db: &Path, name: &str) -> Result<Vec<T>, anyhow::Error>
where
    T: for<'de> serde::Deserialize<'de>,
{
    let path = match maybe_gz_path(path_db, name) {
        Some(path) => path,
        None => {
            tracing::info!("no {} in {:?}, table is empty", name, path_db);
            return Ok(Vec::new());
        }
    };
    let before_parsing = Instant::now();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .delimiter(b'\t')
        .from_reader(open_read_maybe_gz(&path)?);
    let records = reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| anyhow::anyhow!("could not parse {:?}: {}", &path, e))?;
    tracing::debug!(
        "read {} records from {:?} in {:?}",
        records.len().separate_with_commas(),
        &path,
        before_parsing.elapsed()
    );
    Ok(records)
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::common::io::open_write_maybe_gz;
    use crate::pvs1::annotation::{AnnotationLookup, GenomicRegion};

    fn load_test_snapshot() -> Result<Snapshot, anyhow::Error> {
        Snapshot::load(
            Path::new("tests/snapshot"),
            GenomeRelease::Grch38,
            &Default::default(),
        )
    }

    #[test]
    #[tracing_test::traced_test]
    fn load_directory() -> Result<(), anyhow::Error> {
        let snapshot = load_test_snapshot()?;

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.genome_release(), GenomeRelease::Grch38);
        assert_eq!(snapshot.annotations().len(), 2);
        assert!(logs_contain("skipping transcript"));
        Ok(())
    }

    #[rstest::rstest]
    #[case("NM_000001.1", Some("NM_000001.1"))]
    #[case("NM_000001", Some("NM_000001.1"))]
    #[case("NM_000001.2", Some("NM_000001.1"))]
    #[case("NM_000002.3", Some("NM_000002.3"))]
    #[case("NM_999999.1", None)]
    fn transcript_by_id(
        #[case] tx_id: &str,
        #[case] expected: Option<&str>,
    ) -> Result<(), anyhow::Error> {
        let snapshot = load_test_snapshot()?;
        assert_eq!(snapshot.transcript(tx_id).map(|tx| tx.id()), expected);
        Ok(())
    }

    #[rstest::rstest]
    #[case("1", 1050, 1050, vec!["NM_000001.1"])]
    #[case("1", 5500, 5600, vec![])]
    #[case("2", 1500, 1500, vec!["NM_000002.3"])]
    #[case("1", 900, 1001, vec!["NM_000001.1"])]
    #[case("X", 1050, 1050, vec![])]
    fn overlapping_transcripts(
        #[case] chrom: &str,
        #[case] start: i64,
        #[case] end: i64,
        #[case] expected: Vec<&str>,
    ) -> Result<(), anyhow::Error> {
        let snapshot = load_test_snapshot()?;
        let ids = snapshot
            .overlapping(chrom, start, end)
            .iter()
            .map(|tx| tx.id())
            .collect::<Vec<_>>();
        assert_eq!(ids, expected);
        Ok(())
    }

    #[test]
    fn annotations_are_indexed() -> Result<(), anyhow::Error> {
        let snapshot = load_test_snapshot()?;
        let tx = snapshot
            .transcript("NM_000001.1")
            .ok_or_else(|| anyhow::anyhow!("missing transcript"))?;
        let db = snapshot.annotations();

        assert!(db.domain_overlap(tx, &GenomicRegion::new(2100, 2100))?);
        assert!(!db.domain_overlap(tx, &GenomicRegion::new(3001, 3121))?);
        assert!(db.hotspot_overlap(tx, &GenomicRegion::new(5100, 5200))?);
        assert!(db.known_pathogenic_truncation(tx, &GenomicRegion::new(5001, 5200))?);
        assert!(db.known_benign_truncation_nearby(tx, 4050)?);
        Ok(())
    }

    #[test]
    fn load_gzip_without_tables() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let jsonl = std::fs::read_to_string("tests/snapshot/transcripts.jsonl")?;
        {
            let mut f = open_write_maybe_gz(tmp_dir.join("transcripts.jsonl.gz"))?;
            f.write_all(jsonl.as_bytes())?;
            f.flush()?;
        }

        let snapshot = Snapshot::load(&tmp_dir, GenomeRelease::Grch37, &Default::default())?;
        assert_eq!(snapshot.len(), 2);
        let tx = snapshot
            .transcript("NM_000002.3")
            .ok_or_else(|| anyhow::anyhow!("missing transcript"))?;
        assert!(!snapshot
            .annotations()
            .domain_overlap(tx, &GenomicRegion::new(1, 10_000))?);
        Ok(())
    }

    #[test]
    fn missing_transcripts_is_error() {
        let tmp_dir = temp_testdir::TempDir::default();
        assert!(Snapshot::load(&tmp_dir, GenomeRelease::Grch38, &Default::default()).is_err());
    }
}
