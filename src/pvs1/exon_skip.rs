//! Analysis of skipped, deleted, or duplicated exons.

use serde::{Deserialize, Serialize};

use crate::err::Error;
use crate::pvs1::annotation::{AnnotationFacts, AnnotationLookup, GenomicRegion};
use crate::pvs1::consequence::Consequence;
use crate::pvs1::transcript::Transcript;

/// Contiguous run of exons given by 0-based indices, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExonSpan {
    pub first: usize,
    pub last: usize,
}

impl ExonSpan {
    pub fn single(idx: usize) -> Self {
        Self {
            first: idx,
            last: idx,
        }
    }

    pub fn indices(&self) -> std::ops::RangeInclusive<usize> {
        self.first..=self.last
    }
}

impl std::fmt::Display for ExonSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.first == self.last {
            write!(f, "exon {}", self.first + 1)
        } else {
            write!(f, "exons {}-{}", self.first + 1, self.last + 1)
        }
    }
}

/// Reading frame effect of removing or duplicating coding bases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Frame {
    InFrame,
    OutOfFrame,
}

impl Frame {
    /// Frame effect of changing `len` coding bases.
    pub fn of_len(len: u32) -> Self {
        if len % 3 == 0 {
            Frame::InFrame
        } else {
            Frame::OutOfFrame
        }
    }
}

/// Whether the exons are lost or present twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum SkipKind {
    Deletion,
    Duplication,
}

/// Number of coding bases in the exons of `span`.
pub fn coding_len(tx: &Transcript, span: &ExonSpan) -> u32 {
    span.indices().map(|idx| tx.exon_coding_len(idx)).sum()
}

/// Reading frame effect of removing or duplicating the exons of `span`.
pub fn frame_of(tx: &Transcript, span: &ExonSpan) -> Frame {
    Frame::of_len(coding_len(tx, span))
}

/// Result of the exon skip analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExonSkipAnalysis {
    pub exons: ExonSpan,
    pub kind: SkipKind,
    pub frame: Frame,
    /// Number of coding bases removed or duplicated.
    pub coding_len: u32,
    /// Transcript offset at which the NMD prediction is made for out-of-frame
    /// events, i.e., the first exon downstream of the span.
    pub nmd_position: u32,
    /// Transcript offset from which the protein is altered.
    pub truncated_from: u32,
    /// Annotation facts for the coding part of the span.
    pub facts: AnnotationFacts,
}

/// Analyzes exon skipping caused by splice site disruption and exon-level
/// deletions and duplications.
pub struct ExonSkipAnalyzer<'a, L: AnnotationLookup + ?Sized> {
    lookup: &'a L,
}

impl<'a, L: AnnotationLookup + ?Sized> ExonSkipAnalyzer<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Self { lookup }
    }

    /// Analyze the exons affected by a splice or exon-level consequence.
    ///
    /// A disrupted donor or acceptor site is predicted to skip its exon.
    pub fn analyze(
        &self,
        tx: &Transcript,
        consequence: &Consequence,
    ) -> Result<ExonSkipAnalysis, Error> {
        let (exons, kind) = match consequence {
            Consequence::SpliceDonor { exon } | Consequence::SpliceAcceptor { exon } => {
                (ExonSpan::single(*exon), SkipKind::Deletion)
            }
            Consequence::ExonDeletionInFrame { exons }
            | Consequence::ExonDeletionOutOfFrame { exons } => (*exons, SkipKind::Deletion),
            Consequence::ExonDuplicationInFrame { exons }
            | Consequence::ExonDuplicationOutOfFrame { exons } => (*exons, SkipKind::Duplication),
            _ => {
                return Err(Error::Classification(format!(
                    "exon skip analysis requires a splice or exon-level consequence, got {}",
                    consequence.name()
                )))
            }
        };
        if exons.last >= tx.exons().len() || exons.first > exons.last {
            return Err(Error::Classification(format!(
                "{} not within the {} exons of {}",
                exons,
                tx.exons().len(),
                tx.id()
            )));
        }

        let coding = exons
            .indices()
            .filter_map(|idx| tx.exon_coding_range(idx))
            .reduce(|lhs, rhs| lhs.start.min(rhs.start)..lhs.end.max(rhs.end))
            .ok_or_else(|| {
                Error::Classification(format!("{} of {} has no coding bases", exons, tx.id()))
            })?;
        let coding_len = coding_len(tx, &exons);

        let downstream = tx.exons().get(exons.last + 1).map(|e| e.tx_range.start);
        let (nmd_position, truncated_from) = match kind {
            SkipKind::Deletion => (downstream.unwrap_or(coding.start), coding.start),
            SkipKind::Duplication => {
                let pos = downstream.unwrap_or(tx.stop_codon().start);
                (pos, pos)
            }
        };

        let (start, end) = tx.tx_range_to_genomic(coding.clone())?;
        let region = GenomicRegion::new(start, end);
        let position = tx.tx_to_genomic(coding.start)?;
        let facts = AnnotationFacts::gather(
            self.lookup,
            tx,
            Some(&region),
            position,
            coding_len as f64 / tx.cds_len() as f64,
        )?;
        tracing::trace!(
            "{} of {}: {} {} bp coding, facts {:?}",
            exons,
            tx.id(),
            kind,
            coding_len,
            &facts
        );

        Ok(ExonSkipAnalysis {
            exons,
            kind,
            frame: Frame::of_len(coding_len),
            coding_len,
            nmd_position,
            truncated_from,
            facts,
        })
    }
}
