//! The PVS1 decision tree.
//!
//! Each branch is a method taking the trail of visited nodes; every path ends
//! in exactly one terminal strength.

use serde::{Deserialize, Serialize};

use crate::conf::EngineConf;
use crate::err::Error;
use crate::pvs1::annotation::{AnnotationFacts, AnnotationLookup, GenomicRegion};
use crate::pvs1::consequence::Consequence;
use crate::pvs1::exon_skip::{ExonSkipAnalyzer, Frame};
use crate::pvs1::nmd::{self, NmdPrediction};
use crate::pvs1::transcript::Transcript;

/// Strength of the PVS1 criterion.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Pvs1Strength {
    VeryStrong,
    Strong,
    Moderate,
    Supporting,
    Unmet,
}

/// Identifier of a node of the decision tree.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum RuleNode {
    // entry nodes by consequence
    ConsequenceNotApplicable,
    NullVariant,
    SpliceSite,
    InitiationCodon,
    ExonDeletionDuplication,
    // exon skipping
    ExonSkipInFrame,
    ExonSkipOutOfFrame,
    // truncation
    GeneSpecificCutoff,
    NmdPredicted,
    NmdEscaped,
    NotBiologicallyRelevant,
    RescueByReinitiation,
    LossOfFunction,
    CriticalRegionMajorTruncation,
    CriticalRegionTruncated,
    PathogenicPrecedentDownstream,
    BenignPrecedentNearby,
    RemovesSubstantialProtein,
    RoleUnknown,
    // in-frame
    CriticalRegionRemoved,
    // initiation codon
    NoAlternativeStart,
    CriticalRegionBeforeAlternativeStart,
    PathogenicPrecedentBeforeAlternativeStart,
    NoPrecedentBeforeAlternativeStart,
    AlternativeStartRescue,
}

/// Maximal number of nodes on any path through the tree.
pub const MAX_RATIONALE_LEN: usize = 4;

/// Outcome of the decision tree for one consequence.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub strength: Pvs1Strength,
    /// Visited nodes in order.
    pub rationale: Vec<RuleNode>,
    /// NMD prediction, if one was made.
    pub nmd: Option<NmdPrediction>,
    /// Annotation facts the decision was based on, if any were needed.
    pub facts: Option<AnnotationFacts>,
}

#[derive(Debug, Default)]
struct Trail {
    nodes: Vec<RuleNode>,
    nmd: Option<NmdPrediction>,
    facts: Option<AnnotationFacts>,
}

impl Trail {
    fn visit(&mut self, node: RuleNode) {
        debug_assert!(!self.nodes.contains(&node), "node {} visited twice", node);
        tracing::trace!("visiting {}", node);
        self.nodes.push(node);
    }

    fn conclude(mut self, node: RuleNode, strength: Pvs1Strength) -> Decision {
        self.visit(node);
        Decision {
            strength,
            rationale: self.nodes,
            nmd: self.nmd,
            facts: self.facts,
        }
    }
}

/// Walks the PVS1 decision tree; holds no state across calls.
pub struct DecisionEngine<'a, L: AnnotationLookup + ?Sized> {
    conf: &'a EngineConf,
    lookup: &'a L,
}

impl<'a, L: AnnotationLookup + ?Sized> DecisionEngine<'a, L> {
    pub fn new(conf: &'a EngineConf, lookup: &'a L) -> Self {
        Self { conf, lookup }
    }

    /// Evaluate the decision tree for `consequence` on `tx`.
    pub fn evaluate(&self, tx: &Transcript, consequence: &Consequence) -> Result<Decision, Error> {
        let mut trail = Trail::default();
        match consequence {
            Consequence::NotApplicable => Ok(trail.conclude(
                RuleNode::ConsequenceNotApplicable,
                Pvs1Strength::Unmet,
            )),
            Consequence::Nonsense { ptc } => {
                trail.visit(RuleNode::NullVariant);
                self.truncation(tx, *ptc, *ptc, trail)
            }
            Consequence::Frameshift { ptc, altered_from } => {
                trail.visit(RuleNode::NullVariant);
                self.truncation(tx, *ptc, *altered_from, trail)
            }
            Consequence::SpliceDonor { .. } | Consequence::SpliceAcceptor { .. } => {
                trail.visit(RuleNode::SpliceSite);
                self.exon_skip(tx, consequence, trail)
            }
            Consequence::ExonDeletionInFrame { .. }
            | Consequence::ExonDeletionOutOfFrame { .. }
            | Consequence::ExonDuplicationInFrame { .. }
            | Consequence::ExonDuplicationOutOfFrame { .. } => {
                trail.visit(RuleNode::ExonDeletionDuplication);
                self.exon_skip(tx, consequence, trail)
            }
            Consequence::InitiationLoss => {
                trail.visit(RuleNode::InitiationCodon);
                self.initiation(tx, trail)
            }
        }
    }

    fn exon_skip(
        &self,
        tx: &Transcript,
        consequence: &Consequence,
        mut trail: Trail,
    ) -> Result<Decision, Error> {
        let analysis = ExonSkipAnalyzer::new(self.lookup).analyze(tx, consequence)?;
        match analysis.frame {
            Frame::InFrame => {
                trail.visit(RuleNode::ExonSkipInFrame);
                trail.facts = Some(analysis.facts);
                Ok(self.in_frame(tx, trail))
            }
            Frame::OutOfFrame => {
                trail.visit(RuleNode::ExonSkipOutOfFrame);
                self.truncation(tx, analysis.nmd_position, analysis.truncated_from, trail)
            }
        }
    }

    /// In-frame loss or duplication of coding sequence.
    fn in_frame(&self, tx: &Transcript, trail: Trail) -> Decision {
        let facts = trail.facts.clone().unwrap_or_default();
        if facts.overlaps_critical_region() || facts.has_pathogenic_precedent {
            trail.conclude(RuleNode::CriticalRegionRemoved, Pvs1Strength::Strong)
        } else if facts.has_benign_precedent_nearby {
            trail.conclude(RuleNode::BenignPrecedentNearby, Pvs1Strength::Unmet)
        } else if self.removes_substantial_protein(tx, &facts) {
            trail.conclude(RuleNode::RemovesSubstantialProtein, Pvs1Strength::Strong)
        } else {
            trail.conclude(RuleNode::RoleUnknown, Pvs1Strength::Moderate)
        }
    }

    fn removes_substantial_protein(&self, tx: &Transcript, facts: &AnnotationFacts) -> bool {
        self.is_relevant(tx)
            && self
                .conf
                .strong_removed_fraction
                .is_some_and(|fraction| facts.fraction_of_protein_truncated > fraction)
    }

    fn is_relevant(&self, tx: &Transcript) -> bool {
        tx.has_any_tag(&self.conf.relevant_transcript_tags)
    }

    /// Premature termination; NMD is predicted at `nmd_position` and the protein
    /// is truncated from `truncated_from`, both transcript offsets.
    fn truncation(
        &self,
        tx: &Transcript,
        nmd_position: u32,
        truncated_from: u32,
        mut trail: Trail,
    ) -> Result<Decision, Error> {
        let cds = tx.cds();
        let in_protein = truncated_from < tx.stop_codon().start;
        let protein_pos = truncated_from.saturating_sub(cds.start) / 3 + 1;
        let fraction = if in_protein {
            (tx.protein_len() + 1 - protein_pos) as f64 / tx.protein_len() as f64
        } else {
            0.0
        };
        let region = if in_protein {
            let (start, end) = tx.tx_range_to_genomic(truncated_from..cds.end)?;
            Some(GenomicRegion::new(start, end))
        } else {
            None
        };
        let position = tx.tx_to_genomic(truncated_from.min(tx.tx_len() - 1))?;
        let facts = AnnotationFacts::gather(self.lookup, tx, region.as_ref(), position, fraction)?;
        trail.facts = Some(facts.clone());

        if let Some(cutoff) = self.conf.truncation_cutoff(tx.gene_id()) {
            if in_protein && protein_pos < cutoff {
                return Ok(trail.conclude(RuleNode::GeneSpecificCutoff, Pvs1Strength::VeryStrong));
            }
        }

        let prediction = nmd::predict(tx, nmd_position, self.conf);
        trail.nmd = Some(prediction);
        if prediction.is_predicted() {
            trail.visit(RuleNode::NmdPredicted);
            if !self.is_relevant(tx) {
                return Ok(trail.conclude(RuleNode::NotBiologicallyRelevant, Pvs1Strength::Unmet));
            }
            // only documented reinitiation rescues, not any downstream ATG
            let rescued = tx
                .curated_alternative_start()
                .is_some_and(|alt| alt - 1 > truncated_from.saturating_sub(cds.start));
            if rescued {
                Ok(trail.conclude(RuleNode::RescueByReinitiation, Pvs1Strength::Moderate))
            } else {
                Ok(trail.conclude(RuleNode::LossOfFunction, Pvs1Strength::VeryStrong))
            }
        } else {
            trail.visit(RuleNode::NmdEscaped);
            Ok(self.nmd_escaped(tx, &facts, trail))
        }
    }

    fn nmd_escaped(&self, tx: &Transcript, facts: &AnnotationFacts, trail: Trail) -> Decision {
        if !self.is_relevant(tx) {
            trail.conclude(RuleNode::NotBiologicallyRelevant, Pvs1Strength::Unmet)
        } else if facts.overlaps_critical_region()
            && facts.fraction_of_protein_truncated >= self.conf.very_strong_truncated_fraction
        {
            trail.conclude(
                RuleNode::CriticalRegionMajorTruncation,
                Pvs1Strength::VeryStrong,
            )
        } else if facts.overlaps_critical_region() {
            trail.conclude(RuleNode::CriticalRegionTruncated, Pvs1Strength::Strong)
        } else if facts.has_pathogenic_precedent {
            trail.conclude(
                RuleNode::PathogenicPrecedentDownstream,
                Pvs1Strength::Strong,
            )
        } else if facts.has_benign_precedent_nearby {
            trail.conclude(RuleNode::BenignPrecedentNearby, Pvs1Strength::Unmet)
        } else if self.removes_substantial_protein(tx, facts) {
            trail.conclude(RuleNode::RemovesSubstantialProtein, Pvs1Strength::Strong)
        } else {
            trail.conclude(RuleNode::RoleUnknown, Pvs1Strength::Moderate)
        }
    }

    /// Loss of the start codon.
    fn initiation(&self, tx: &Transcript, mut trail: Trail) -> Result<Decision, Error> {
        let alt = match tx.closest_alternative_start() {
            Some(alt) => alt,
            None => {
                return Ok(trail.conclude(RuleNode::NoAlternativeStart, Pvs1Strength::VeryStrong))
            }
        };

        let cds = tx.cds();
        let lost = cds.start..(cds.start + alt - 1);
        let (start, end) = tx.tx_range_to_genomic(lost.clone())?;
        let fraction = ((alt - 1) / 3) as f64 / tx.protein_len() as f64;
        let facts = AnnotationFacts::gather(
            self.lookup,
            tx,
            Some(&GenomicRegion::new(start, end)),
            tx.tx_to_genomic(lost.start)?,
            fraction,
        )?;
        trail.facts = Some(facts.clone());

        Ok(if facts.overlaps_critical_region() {
            trail.conclude(
                RuleNode::CriticalRegionBeforeAlternativeStart,
                Pvs1Strength::VeryStrong,
            )
        } else if facts.has_pathogenic_precedent {
            trail.conclude(
                RuleNode::PathogenicPrecedentBeforeAlternativeStart,
                Pvs1Strength::Moderate,
            )
        } else if self.conf.supporting_initiation_without_precedent {
            trail.conclude(
                RuleNode::NoPrecedentBeforeAlternativeStart,
                Pvs1Strength::Supporting,
            )
        } else {
            trail.conclude(RuleNode::AlternativeStartRescue, Pvs1Strength::Moderate)
        })
    }
}
