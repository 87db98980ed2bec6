//! Read-only lookups into curated domain, hotspot and precedent tables.

use std::collections::HashMap;

use bio::data_structures::interval_tree::ArrayBackedIntervalTree;
use serde::{Deserialize, Serialize};

use crate::conf::AnnotationConf;
use crate::err::Error;
use crate::pvs1::transcript::Transcript;

/// Alias for the interval tree that we use.
type IntervalTree = ArrayBackedIntervalTree<i64, u32>;

/// A genomic region, 1-based and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct GenomicRegion {
    pub start: i64,
    pub end: i64,
}

impl GenomicRegion {
    /// Query range for the interval trees, 0-based and half-open.
    fn tree_range(&self) -> std::ops::Range<i64> {
        (self.start - 1)..self.end
    }
}

/// Read queries against preloaded reference tables.
///
/// Implementations must not perform I/O; all data is resident before
/// evaluation starts.
pub trait AnnotationLookup: Send + Sync {
    /// Whether `region` overlaps a critical functional domain.
    fn domain_overlap(&self, tx: &Transcript, region: &GenomicRegion) -> Result<bool, Error>;

    /// Whether `region` overlaps a mutational hotspot.
    fn hotspot_overlap(&self, tx: &Transcript, region: &GenomicRegion) -> Result<bool, Error>;

    /// Whether known truncating variants in `region` are predominantly pathogenic.
    fn known_pathogenic_truncation(
        &self,
        tx: &Transcript,
        region: &GenomicRegion,
    ) -> Result<bool, Error>;

    /// Whether benign or frequent truncations are known in the exon around `pos`.
    fn known_benign_truncation_nearby(&self, tx: &Transcript, pos: i64) -> Result<bool, Error>;
}

/// Bundle of annotation facts consumed by the decision engine.
///
/// Missing data is represented as `false`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationFacts {
    pub is_in_critical_domain: bool,
    pub is_in_hotspot: bool,
    pub has_pathogenic_precedent: bool,
    pub has_benign_precedent_nearby: bool,
    pub fraction_of_protein_truncated: f64,
}

impl AnnotationFacts {
    /// Query all facts for the affected `region` (if any) and `position`.
    pub fn gather<L: AnnotationLookup + ?Sized>(
        lookup: &L,
        tx: &Transcript,
        region: Option<&GenomicRegion>,
        position: i64,
        fraction_of_protein_truncated: f64,
    ) -> Result<Self, Error> {
        let mut facts = Self {
            fraction_of_protein_truncated: fraction_of_protein_truncated.clamp(0.0, 1.0),
            ..Default::default()
        };
        if let Some(region) = region {
            facts.is_in_critical_domain = lookup.domain_overlap(tx, region)?;
            facts.is_in_hotspot = lookup.hotspot_overlap(tx, region)?;
            facts.has_pathogenic_precedent = lookup.known_pathogenic_truncation(tx, region)?;
        }
        facts.has_benign_precedent_nearby = lookup.known_benign_truncation_nearby(tx, position)?;
        Ok(facts)
    }

    /// Whether a critical domain or a hotspot is affected.
    pub fn overlaps_critical_region(&self) -> bool {
        self.is_in_critical_domain || self.is_in_hotspot
    }
}

/// A domain or hotspot region of a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRecord {
    pub transcript_id: String,
    /// 1-based start position.
    pub start: i64,
    /// 1-based inclusive end position.
    pub end: i64,
    /// Free-text label, e.g., the domain name.
    #[serde(default)]
    pub name: String,
}

/// Clinical significance of a precedent truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Significance {
    #[serde(alias = "Pathogenic")]
    Pathogenic,
    #[serde(alias = "Likely pathogenic")]
    LikelyPathogenic,
    #[serde(alias = "Uncertain significance", alias = "uncertain_significance")]
    Uncertain,
    #[serde(alias = "Likely benign")]
    LikelyBenign,
    #[serde(alias = "Benign")]
    Benign,
}

impl Significance {
    pub fn is_pathogenic(&self) -> bool {
        matches!(self, Significance::Pathogenic | Significance::LikelyPathogenic)
    }

    pub fn is_benign(&self) -> bool {
        matches!(self, Significance::Benign | Significance::LikelyBenign)
    }
}

/// A previously reported truncating variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecedentRecord {
    pub transcript_id: String,
    /// 1-based start position.
    pub start: i64,
    /// 1-based inclusive end position.
    pub end: i64,
    pub significance: Significance,
    /// Maximal population allele frequency, if known.
    #[serde(default)]
    pub popmax_af: Option<f64>,
}

/// Records of one table together with their interval tree.
#[derive(Debug, Clone)]
struct Indexed<T> {
    records: Vec<T>,
    tree: IntervalTree,
}

impl<T> Default for Indexed<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            tree: IntervalTree::new(),
        }
    }
}

impl<T> Indexed<T> {
    fn insert(&mut self, start: i64, end: i64, record: T) {
        if start < 1 || end < start {
            tracing::warn!("skipping annotation record with invalid interval {}-{}", start, end);
            return;
        }
        self.tree
            .insert((start - 1)..end, self.records.len() as u32);
        self.records.push(record);
    }

    fn find(&self, region: &GenomicRegion) -> Vec<&T> {
        self.tree
            .find(region.tree_range())
            .iter()
            .map(|e| &self.records[*e.data() as usize])
            .collect()
    }
}

/// Annotation tables of one transcript.
#[derive(Debug, Clone, Default)]
struct TranscriptAnnotations {
    domains: Indexed<RegionRecord>,
    hotspots: Indexed<RegionRecord>,
    precedents: Indexed<PrecedentRecord>,
}

/// In-memory `AnnotationLookup` over interval trees per transcript.
#[derive(Debug, Clone, Default)]
pub struct AnnotationDb {
    conf: AnnotationConf,
    by_tx: HashMap<String, TranscriptAnnotations>,
}

/// Collects records before building the `AnnotationDb`.
#[derive(Debug, Default)]
pub struct AnnotationDbBuilder {
    db: AnnotationDb,
}

impl AnnotationDbBuilder {
    /// Register a transcript; registered transcripts without records have no
    /// annotations rather than unknown ones.
    pub fn register_transcript(&mut self, tx_id: &str) -> &mut Self {
        self.db.by_tx.entry(tx_id.to_owned()).or_default();
        self
    }

    pub fn add_domain(&mut self, record: RegionRecord) -> &mut Self {
        let entry = self.db.by_tx.entry(record.transcript_id.clone()).or_default();
        entry.domains.insert(record.start, record.end, record);
        self
    }

    pub fn add_hotspot(&mut self, record: RegionRecord) -> &mut Self {
        let entry = self.db.by_tx.entry(record.transcript_id.clone()).or_default();
        entry.hotspots.insert(record.start, record.end, record);
        self
    }

    pub fn add_precedent(&mut self, record: PrecedentRecord) -> &mut Self {
        let entry = self.db.by_tx.entry(record.transcript_id.clone()).or_default();
        entry.precedents.insert(record.start, record.end, record);
        self
    }

    /// Index all interval trees and return the immutable database.
    pub fn build(mut self) -> AnnotationDb {
        for annos in self.db.by_tx.values_mut() {
            annos.domains.tree.index();
            annos.hotspots.tree.index();
            annos.precedents.tree.index();
        }
        self.db
    }
}

impl AnnotationDb {
    pub fn builder(conf: AnnotationConf) -> AnnotationDbBuilder {
        AnnotationDbBuilder {
            db: AnnotationDb {
                conf,
                by_tx: HashMap::new(),
            },
        }
    }

    /// Number of registered transcripts.
    pub fn len(&self) -> usize {
        self.by_tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tx.is_empty()
    }

    fn annotations(&self, tx: &Transcript) -> Result<&TranscriptAnnotations, Error> {
        self.by_tx.get(tx.id()).ok_or_else(|| {
            Error::Classification(format!("no annotation tables for transcript {}", tx.id()))
        })
    }
}

impl AnnotationLookup for AnnotationDb {
    fn domain_overlap(&self, tx: &Transcript, region: &GenomicRegion) -> Result<bool, Error> {
        Ok(!self.annotations(tx)?.domains.find(region).is_empty())
    }

    fn hotspot_overlap(&self, tx: &Transcript, region: &GenomicRegion) -> Result<bool, Error> {
        Ok(!self.annotations(tx)?.hotspots.find(region).is_empty())
    }

    fn known_pathogenic_truncation(
        &self,
        tx: &Transcript,
        region: &GenomicRegion,
    ) -> Result<bool, Error> {
        let precedents = self.annotations(tx)?.precedents.find(region);
        if precedents.is_empty() {
            return Ok(false);
        }
        let pathogenic = precedents
            .iter()
            .filter(|p| p.significance.is_pathogenic())
            .count();
        Ok(pathogenic as f64 / precedents.len() as f64 > self.conf.pathogenic_fraction)
    }

    fn known_benign_truncation_nearby(&self, tx: &Transcript, pos: i64) -> Result<bool, Error> {
        let annos = self.annotations(tx)?;
        let exon = tx
            .exons()
            .iter()
            .find(|e| e.contains(pos))
            .ok_or_else(|| {
                Error::Classification(format!(
                    "no exon of {} contains position {} for the benign precedent lookup",
                    tx.id(),
                    pos
                ))
            })?;
        let flank = self.conf.benign_flank as i64;
        let window = GenomicRegion::new((exon.start - flank).max(1), exon.end + flank);
        let precedents = annos.precedents.find(&window);
        if precedents.is_empty() {
            return Ok(false);
        }
        let benign_or_frequent = precedents
            .iter()
            .filter(|p| {
                p.significance.is_benign()
                    || p.popmax_af.is_some_and(|af| af > self.conf.frequent_lof_af)
            })
            .count();
        Ok(benign_or_frequent as f64 / precedents.len() as f64 > self.conf.frequent_lof_fraction)
    }
}
