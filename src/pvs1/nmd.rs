//! Prediction of nonsense-mediated decay (NMD).

use serde::{Deserialize, Serialize};

use crate::conf::EngineConf;
use crate::pvs1::transcript::Transcript;

/// Why a premature termination codon escapes NMD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum EscapeReason {
    /// The transcript has a single exon.
    SingleExon,
    /// The termination codon lies in the last exon.
    LastExon,
    /// The termination codon lies in the 3' window of the penultimate exon.
    PenultimateExonWindow,
}

/// Outcome of the NMD prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NmdPrediction {
    /// Transcript is degraded; `gene_rule` is set if forced by the gene.
    Predicted { gene_rule: bool },
    /// A truncated protein is made.
    Escaped(EscapeReason),
}

impl NmdPrediction {
    pub fn is_predicted(&self) -> bool {
        matches!(self, NmdPrediction::Predicted { .. })
    }
}

/// Transcript offset from which a termination codon escapes NMD.
///
/// This is the start of the `nmd_escape_window` bases at the 3' end of the
/// penultimate exon (clamped to that exon), or `0` for single-exon transcripts.
pub fn escape_cutoff(tx: &Transcript, nmd_escape_window: u32) -> u32 {
    let exons = tx.exons();
    if exons.len() < 2 {
        return 0;
    }
    let penultimate = &exons[exons.len() - 2];
    penultimate.tx_range.end - nmd_escape_window.min(penultimate.len())
}

/// Predict NMD for a premature termination codon whose first base is at
/// transcript offset `ptc`.
pub fn predict(tx: &Transcript, ptc: u32, conf: &EngineConf) -> NmdPrediction {
    if conf.always_nmd_genes.iter().any(|g| g == tx.gene_id()) {
        return NmdPrediction::Predicted { gene_rule: true };
    }

    let exons = tx.exons();
    if exons.len() == 1 {
        return NmdPrediction::Escaped(EscapeReason::SingleExon);
    }
    let last = &exons[exons.len() - 1];
    if ptc >= last.tx_range.start {
        NmdPrediction::Escaped(EscapeReason::LastExon)
    } else if ptc >= escape_cutoff(tx, conf.nmd_escape_window) {
        NmdPrediction::Escaped(EscapeReason::PenultimateExonWindow)
    } else {
        NmdPrediction::Predicted { gene_rule: false }
    }
}
