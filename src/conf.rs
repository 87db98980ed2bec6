//! Code for supporting the configuration file of the PVS1 prediction.
//!
//! All values have defaults so an empty (or missing) `conf.toml` yields the
//! standard behavior.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    /// Thresholds and gene rules of the decision engine.
    pub engine: EngineConf,
    /// Thresholds used by the annotation lookups.
    pub annotation: AnnotationConf,
}

impl Config {
    /// Load the configuration from the TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self, anyhow::Error> {
        let toml_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("could not read config {:?}: {}", path, e))?;
        let config: Config = toml::from_str(&toml_str)
            .map_err(|e| anyhow::anyhow!("could not parse config {:?}: {}", path, e))?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Load from `path_conf` if given, else from `conf.toml` in `path_db` if
    /// present, else use the defaults.
    pub fn resolve(path_db: &Path, path_conf: Option<&Path>) -> Result<Self, anyhow::Error> {
        match path_conf {
            Some(path) => Self::load(path),
            None => {
                let path = path_db.join("conf.toml");
                if path.exists() {
                    Self::load(&path)
                } else {
                    tracing::debug!("no conf.toml in {:?}, using defaults", path_db);
                    Ok(Self::default())
                }
            }
        }
    }
}

/// Protein truncation cutoff for a single gene.
///
/// Premature termination before `protein_pos` is considered null regardless
/// of NMD.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct TruncationCutoff {
    /// HGNC identifier, e.g., `HGNC:9588`.
    pub gene_id: String,
    /// 1-based protein position.
    pub protein_pos: u32,
}

/// Configuration of the decision engine.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[serde(default)]
pub struct EngineConf {
    /// Minimal fraction of the protein that must be truncated within a critical
    /// region for the NMD-escape branch to yield very strong evidence.
    pub very_strong_truncated_fraction: f64,
    /// If set, NMD-escaping and in-frame events of unknown role removing more than
    /// this fraction of the protein yield strong instead of moderate evidence.
    pub strong_removed_fraction: Option<f64>,
    /// Number of bases at the 3' end of the penultimate exon in which a
    /// termination codon escapes NMD.
    pub nmd_escape_window: u32,
    /// HGNC identifiers of genes for which NMD is always predicted.
    pub always_nmd_genes: Vec<String>,
    /// Gene-specific protein truncation cutoffs.
    pub truncation_cutoffs: Vec<TruncationCutoff>,
    /// Transcript tags marking biologically relevant transcripts; empty means
    /// that every transcript is considered relevant.
    pub relevant_transcript_tags: Vec<String>,
    /// Initiation codon loss with an alternative start, no critical region and no
    /// pathogenic precedent upstream of it yields supporting instead of moderate
    /// evidence.
    pub supporting_initiation_without_precedent: bool,
}

impl Default for EngineConf {
    fn default() -> Self {
        Self {
            very_strong_truncated_fraction: 0.5,
            strong_removed_fraction: None,
            nmd_escape_window: 50,
            always_nmd_genes: vec!["HGNC:4284".to_owned()],
            truncation_cutoffs: vec![TruncationCutoff {
                gene_id: "HGNC:9588".to_owned(),
                protein_pos: 374,
            }],
            relevant_transcript_tags: Vec::new(),
            supporting_initiation_without_precedent: false,
        }
    }
}

impl EngineConf {
    /// Check that fractions are within `[0, 1]`.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let fractions = [
            (
                "very_strong_truncated_fraction",
                Some(self.very_strong_truncated_fraction),
            ),
            ("strong_removed_fraction", self.strong_removed_fraction),
        ];
        for (name, value) in fractions {
            if let Some(value) = value {
                if !(0.0..=1.0).contains(&value) {
                    anyhow::bail!("engine.{} must be within [0, 1], is {}", name, value);
                }
            }
        }
        Ok(())
    }

    /// Return the truncation cutoff for the given gene, if any.
    pub fn truncation_cutoff(&self, gene_id: &str) -> Option<u32> {
        self.truncation_cutoffs
            .iter()
            .find(|cutoff| cutoff.gene_id == gene_id)
            .map(|cutoff| cutoff.protein_pos)
    }
}

/// Configuration of the annotation lookups.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[serde(default)]
pub struct AnnotationConf {
    /// A region is considered to carry pathogenic precedent if more than this
    /// fraction of the precedent truncations overlapping it are pathogenic.
    pub pathogenic_fraction: f64,
    /// Popmax allele frequency above which a truncation is frequent.
    pub frequent_lof_af: f64,
    /// Benign precedent is assumed if more than this fraction of the truncations
    /// in the affected exon are benign or frequent.
    pub frequent_lof_fraction: f64,
    /// Flank in bp added around the affected exon for the benign lookup.
    pub benign_flank: u32,
}

impl Default for AnnotationConf {
    fn default() -> Self {
        Self {
            pathogenic_fraction: 0.05,
            frequent_lof_af: 0.001,
            frequent_lof_fraction: 0.1,
            benign_flank: 0,
        }
    }
}
