//! Classification of the molecular consequence of a variant on a transcript.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::err::Error;
use crate::pvs1::exon_skip::{coding_len, ExonSpan, Frame};
use crate::pvs1::transcript::{is_stop_codon, revcomp, SpliceSide, SpliceSite, Strand, Transcript};
use crate::pvs1::variant::{Variant, VariantClass};

/// Molecular consequence relevant for PVS1, exactly one per variant and transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, strum::IntoStaticStr)]
#[serde(tag = "kind", rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Consequence {
    /// Stop gained; `ptc` is the transcript offset of the termination codon.
    Nonsense { ptc: u32 },
    /// Frameshift; `ptc` is the transcript offset of the new termination codon
    /// in reference coordinates, `altered_from` the first altered offset.
    Frameshift { ptc: u32, altered_from: u32 },
    /// Canonical donor site of the exon with the given index disrupted.
    SpliceDonor { exon: usize },
    /// Canonical acceptor site of the exon with the given index disrupted.
    SpliceAcceptor { exon: usize },
    InitiationLoss,
    ExonDeletionInFrame { exons: ExonSpan },
    ExonDeletionOutOfFrame { exons: ExonSpan },
    ExonDuplicationInFrame { exons: ExonSpan },
    ExonDuplicationOutOfFrame { exons: ExonSpan },
    NotApplicable,
}

impl Consequence {
    /// Stable kebab-case name of the consequence.
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

/// A variant projected onto the spliced transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TxChange {
    /// Deleted transcript offsets; empty for insertions before `range.start`.
    range: Range<u32>,
    /// Inserted bases in transcript orientation.
    inserted: String,
}

impl TxChange {
    fn from_variant(variant: &Variant, tx: &Transcript) -> Result<Self, Error> {
        let inserted = match tx.strand() {
            Strand::Plus => variant.inserted().to_owned(),
            Strand::Minus => revcomp(variant.inserted()),
        };

        if variant.is_insertion() {
            let (first, second) = match tx.strand() {
                Strand::Plus => (variant.end(), variant.start()),
                Strand::Minus => (variant.start(), variant.end()),
            };
            let pos = match tx.locate(first) {
                Ok(loc) => loc.tx_offset + 1,
                Err(_) => tx.locate(second)?.tx_offset,
            };
            return Ok(Self {
                range: pos..pos,
                inserted,
            });
        }

        let (start, end) = match (tx.locate(variant.start()), tx.locate(variant.end())) {
            (Ok(start), Ok(end)) => (start, end),
            (Ok(loc), Err(_)) | (Err(_), Ok(loc)) => {
                // Overhangs the 5' or 3' end of the transcript; keep the exonic part.
                let exon = &tx.exons()[loc.exon_idx];
                let start = tx.locate(variant.start().max(exon.start))?;
                let end = tx.locate(variant.end().min(exon.end))?;
                (start, end)
            }
            (Err(err), Err(_)) => {
                if tx
                    .exons()
                    .iter()
                    .any(|e| variant.start() <= e.start && e.end <= variant.end())
                {
                    return Err(Error::UnsupportedVariantClass(format!(
                        "{} removes whole exons of {}, describe it as a span",
                        variant,
                        tx.id()
                    )));
                }
                return Err(err);
            }
        };
        let lo = start.tx_offset.min(end.tx_offset);
        let hi = start.tx_offset.max(end.tx_offset);
        Ok(Self {
            range: lo..(hi + 1),
            inserted,
        })
    }

    fn is_insertion(&self) -> bool {
        self.range.is_empty()
    }

    /// Whether the change touches the start codon.
    fn alters_start_codon(&self, tx: &Transcript) -> bool {
        let codon = tx.start_codon();
        if self.is_insertion() {
            codon.start < self.range.start && self.range.start < codon.end
        } else {
            self.range.start < codon.end && codon.start < self.range.end
        }
    }

    /// Whether the change starts within the CDS, excluding start and stop codons.
    fn starts_in_cds(&self, tx: &Transcript) -> bool {
        let cds = tx.cds();
        if self.is_insertion() {
            self.range.start >= cds.start + 3 && self.range.start <= cds.end - 3
        } else {
            self.range.start >= cds.start + 3 && self.range.start < cds.end - 3
        }
    }
}

/// Canonical splice dinucleotide disrupted by the variant, if any.
fn disrupted_splice_site(variant: &Variant, tx: &Transcript) -> Option<SpliceSite> {
    if variant.is_insertion() {
        // only insertions between the two bases of the dinucleotide disrupt it
        let site = tx.splice_site_at(variant.end())?;
        (tx.splice_site_at(variant.start()) == Some(site)).then_some(site)
    } else {
        (variant.start()..=variant.end()).find_map(|pos| tx.splice_site_at(pos))
    }
}

/// Transcript offset of the first termination codon in the frame of the
/// change, mapped back to reference coordinates.
///
/// Returns `None` without a transcript sequence.  If the altered frame has no
/// stop codon, the last transcript base is returned.
fn new_termination(tx: &Transcript, change: &TxChange) -> Option<u32> {
    let seq = tx.sequence()?.as_bytes();
    let lo = change.range.start as usize;
    let hi = change.range.end as usize;
    let ins = change.inserted.len();

    let mut mutant = Vec::with_capacity(seq.len() + ins);
    mutant.extend_from_slice(&seq[..lo]);
    mutant.extend_from_slice(change.inserted.as_bytes());
    mutant.extend_from_slice(&seq[hi..]);

    let cds_start = tx.cds().start as usize;
    let codon_start = cds_start + (lo - cds_start) / 3 * 3;
    let stop = mutant[codon_start..]
        .chunks_exact(3)
        .position(is_stop_codon)
        .map(|idx| codon_start + idx * 3);

    Some(match stop {
        Some(m) if m < lo => m as u32,
        Some(m) if m < lo + ins => lo as u32,
        Some(m) => (m - ins + (hi - lo)) as u32,
        None => tx.tx_len() - 1,
    })
}

fn classify_substitution(
    variant: &Variant,
    tx: &Transcript,
    change: &TxChange,
) -> Result<Consequence, Error> {
    let seq = tx.sequence().ok_or_else(|| {
        Error::Classification(format!(
            "transcript sequence of {} required to translate {}",
            tx.id(),
            variant
        ))
    })?;
    let pos = change.range.start as usize;
    let cds_offset = change.range.start - tx.cds().start;
    let codon_start = pos - (cds_offset % 3) as usize;

    let reference = &seq.as_bytes()[codon_start..codon_start + 3];
    let expected = match tx.strand() {
        Strand::Plus => variant.deleted().to_owned(),
        Strand::Minus => revcomp(variant.deleted()),
    };
    if seq.as_bytes()[pos] != expected.as_bytes()[0] {
        tracing::warn!(
            "reference base of {} does not match transcript {} at offset {}",
            variant,
            tx.id(),
            pos
        );
    }
    let mut alternative = reference.to_vec();
    alternative[pos - codon_start] = change.inserted.as_bytes()[0];

    if is_stop_codon(&alternative) && !is_stop_codon(reference) {
        Ok(Consequence::Nonsense {
            ptc: codon_start as u32,
        })
    } else {
        Ok(Consequence::NotApplicable)
    }
}

fn classify_small(variant: &Variant, tx: &Transcript) -> Result<Consequence, Error> {
    if let Some(site) = disrupted_splice_site(variant, tx) {
        if tx.exon_coding_len(site.exon_idx) == 0 {
            return Ok(Consequence::NotApplicable);
        }
        return Ok(match site.side {
            SpliceSide::Donor => Consequence::SpliceDonor {
                exon: site.exon_idx,
            },
            SpliceSide::Acceptor => Consequence::SpliceAcceptor {
                exon: site.exon_idx,
            },
        });
    }

    let change = TxChange::from_variant(variant, tx)?;
    if change.alters_start_codon(tx) {
        return Ok(Consequence::InitiationLoss);
    }
    if !change.starts_in_cds(tx) {
        return Ok(Consequence::NotApplicable);
    }

    if variant.class() == VariantClass::Snv {
        return classify_substitution(variant, tx, &change);
    }

    let net = change.inserted.len() as i64 - change.range.len() as i64;
    let ptc = new_termination(tx, &change);
    if net % 3 != 0 {
        Ok(Consequence::Frameshift {
            ptc: ptc.unwrap_or(change.range.start),
            altered_from: change.range.start,
        })
    } else {
        match ptc {
            Some(ptc) if ptc < tx.stop_codon().start => Ok(Consequence::Nonsense { ptc }),
            _ => Ok(Consequence::NotApplicable),
        }
    }
}

fn classify_span(variant: &Variant, tx: &Transcript) -> Result<Consequence, Error> {
    let mut contained = Vec::new();
    for (idx, exon) in tx.exons().iter().enumerate() {
        if exon.end < variant.start() || variant.end() < exon.start {
            continue;
        }
        if variant.start() <= exon.start && exon.end <= variant.end() {
            contained.push(idx);
        } else {
            return Err(Error::UnsupportedVariantClass(format!(
                "{} partially overlaps exon {} of {}",
                variant,
                exon.number,
                tx.id()
            )));
        }
    }

    let exons = match (contained.first(), contained.last()) {
        (Some(&first), Some(&last)) => ExonSpan { first, last },
        _ => return Ok(Consequence::NotApplicable),
    };
    if exons.first == 0 && exons.last + 1 == tx.exons().len() {
        return Err(Error::UnsupportedVariantClass(format!(
            "{} affects every exon of {}",
            variant,
            tx.id()
        )));
    }

    let coding_len = coding_len(tx, &exons);
    if coding_len == 0 {
        return Ok(Consequence::NotApplicable);
    }
    let deletion = variant.class() == VariantClass::SpanDeletion;
    if deletion
        && exons
            .indices()
            .any(|idx| tx.exons()[idx].tx_range.contains(&tx.cds().start))
    {
        return Ok(Consequence::InitiationLoss);
    }

    Ok(match (deletion, Frame::of_len(coding_len)) {
        (true, Frame::InFrame) => Consequence::ExonDeletionInFrame { exons },
        (true, Frame::OutOfFrame) => Consequence::ExonDeletionOutOfFrame { exons },
        (false, Frame::InFrame) => Consequence::ExonDuplicationInFrame { exons },
        (false, Frame::OutOfFrame) => Consequence::ExonDuplicationOutOfFrame { exons },
    })
}

/// Classify the consequence of `variant` on `tx`.
///
/// Positions outside of the transcript yield `NotApplicable`.
pub fn classify(variant: &Variant, tx: &Transcript) -> Result<Consequence, Error> {
    if variant.chrom() != tx.chrom() {
        tracing::debug!("{} is not on the chromosome of {}", variant, tx.id());
        return Ok(Consequence::NotApplicable);
    }

    let result = match variant.class() {
        VariantClass::Mnv => Err(Error::UnsupportedVariantClass(format!(
            "multi-nucleotide substitution {}",
            variant
        ))),
        VariantClass::SpanDeletion | VariantClass::SpanDuplication => classify_span(variant, tx),
        VariantClass::Snv
        | VariantClass::Insertion
        | VariantClass::Deletion
        | VariantClass::Duplication
        | VariantClass::Delins => classify_small(variant, tx),
    };
    match result {
        Err(Error::OutOfTranscriptRange { tx_id, pos }) => {
            tracing::debug!("position {} outside of the exons of {}", pos, tx_id);
            Ok(Consequence::NotApplicable)
        }
        result => result,
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::pvs1::transcript::test::{five_exon_tx, five_exon_tx_with_seq};
    use crate::pvs1::variant::{SpanKind, VariantInput};

    fn var(pos: i64, reference: &str, alternative: &str) -> Variant {
        Variant::new("1", pos, reference, alternative).unwrap()
    }

    fn span(start: i64, end: i64, kind: SpanKind) -> Variant {
        Variant::span("1", start, end, kind).unwrap()
    }

    #[rstest::rstest]
    #[case::stop_gained(var(1055, "C", "A"), Consequence::Nonsense { ptc: 53 })]
    #[case::missense(var(1054, "T", "G"), Consequence::NotApplicable)]
    #[case::start_codon(var(1051, "A", "G"), Consequence::InitiationLoss)]
    #[case::utr5(var(1010, "C", "T"), Consequence::NotApplicable)]
    #[case::stop_lost(var(5149, "T", "C"), Consequence::NotApplicable)]
    #[case::deep_intronic(var(1500, "A", "G"), Consequence::NotApplicable)]
    #[case::upstream(var(500, "A", "G"), Consequence::NotApplicable)]
    #[case::donor(var(1101, "G", "A"), Consequence::SpliceDonor { exon: 0 })]
    #[case::donor_2(var(1102, "T", "A"), Consequence::SpliceDonor { exon: 0 })]
    #[case::acceptor(var(1999, "A", "G"), Consequence::SpliceAcceptor { exon: 1 })]
    #[case::no_donor_after_last_exon(var(5201, "A", "G"), Consequence::NotApplicable)]
    #[case::frameshift(var(2050, "TC", "T"), Consequence::Frameshift { ptc: 231, altered_from: 150 })]
    #[case::inframe_deletion(var(2050, "TCAT", "T"), Consequence::NotApplicable)]
    #[case::inframe_stop_insertion(var(1056, "A", "ATAG"), Consequence::Nonsense { ptc: 56 })]
    #[case::deletion_over_donor(var(1098, "CCCGT", "C"), Consequence::SpliceDonor { exon: 0 })]
    #[case::span_out_of_frame(span(2500, 3500, SpanKind::Del), Consequence::ExonDeletionOutOfFrame { exons: ExonSpan::single(2) })]
    #[case::span_dup_out_of_frame(span(2500, 3500, SpanKind::Dup), Consequence::ExonDuplicationOutOfFrame { exons: ExonSpan::single(2) })]
    #[case::span_dup_in_frame(span(1900, 2200, SpanKind::Dup), Consequence::ExonDuplicationInFrame { exons: ExonSpan::single(1) })]
    #[case::span_two_exons(span(2500, 4500, SpanKind::Del), Consequence::ExonDeletionInFrame { exons: ExonSpan { first: 2, last: 3 } })]
    #[case::span_start_codon(span(900, 1500, SpanKind::Del), Consequence::InitiationLoss)]
    #[case::span_intronic(span(2200, 2300, SpanKind::Del), Consequence::NotApplicable)]
    fn classify_plus(
        #[case] variant: Variant,
        #[case] expected: Consequence,
    ) -> Result<(), anyhow::Error> {
        let tx = five_exon_tx_with_seq(Strand::Plus);
        assert_eq!(classify(&variant, &tx)?, expected);
        Ok(())
    }

    #[rstest::rstest]
    #[case::stop_gained("NM_000001.1:c.5C>A", Consequence::Nonsense { ptc: 53 })]
    #[case::start_codon("NM_000001.1:c.2T>C", Consequence::InitiationLoss)]
    #[case::donor("NM_000001.1:c.50+1G>A", Consequence::SpliceDonor { exon: 0 })]
    #[case::acceptor("NM_000001.1:c.51-1G>A", Consequence::SpliceAcceptor { exon: 1 })]
    #[case::frameshift("NM_000001.1:c.101del", Consequence::Frameshift { ptc: 231, altered_from: 150 })]
    #[case::dup_frameshift_without_new_stop("NM_000001.1:c.101dup", Consequence::Frameshift { ptc: 662, altered_from: 150 })]
    #[case::utr3("NM_000001.1:c.*5del", Consequence::NotApplicable)]
    fn classify_minus(
        #[case] text: &str,
        #[case] expected: Consequence,
    ) -> Result<(), anyhow::Error> {
        let tx = five_exon_tx_with_seq(Strand::Minus);
        let variant = text.parse::<VariantInput>()?.resolve(&tx)?;
        assert_eq!(classify(&variant, &tx)?, expected);
        Ok(())
    }

    #[test]
    fn frameshift_without_sequence_uses_first_affected_base() -> Result<(), anyhow::Error> {
        let tx = five_exon_tx(Strand::Plus);
        assert_eq!(
            classify(&var(2050, "TC", "T"), &tx)?,
            Consequence::Frameshift {
                ptc: 150,
                altered_from: 150
            }
        );
        Ok(())
    }

    #[test]
    fn substitution_without_sequence_is_an_error() {
        let tx = five_exon_tx(Strand::Plus);
        assert!(matches!(
            classify(&var(1055, "C", "A"), &tx),
            Err(Error::Classification(_))
        ));
    }

    #[rstest::rstest]
    #[case::mnv(var(1055, "CA", "AT"))]
    #[case::partial_exon(span(3050, 3500, SpanKind::Del))]
    #[case::whole_transcript(span(500, 6000, SpanKind::Del))]
    fn unsupported(#[case] variant: Variant) {
        let tx = five_exon_tx_with_seq(Strand::Plus);
        assert!(matches!(
            classify(&variant, &tx),
            Err(Error::UnsupportedVariantClass(_))
        ));
    }

    #[test]
    fn other_chromosome_not_applicable() -> Result<(), anyhow::Error> {
        let tx = five_exon_tx_with_seq(Strand::Plus);
        let variant = Variant::new("2", 1055, "C", "A")?;
        assert_eq!(classify(&variant, &tx)?, Consequence::NotApplicable);
        Ok(())
    }

    #[test]
    fn consequence_json() -> Result<(), anyhow::Error> {
        assert_eq!(
            serde_json::to_string(&Consequence::ExonDeletionInFrame {
                exons: ExonSpan::single(1)
            })?,
            r#"{"kind":"exon-deletion-in-frame","exons":{"first":1,"last":1}}"#
        );
        assert_eq!(Consequence::InitiationLoss.name(), "initiation-loss");
        Ok(())
    }
}
