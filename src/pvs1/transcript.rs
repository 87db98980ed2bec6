//! Transcript model with exon, CDS and reading-frame structure.
//!
//! Genomic coordinates are 1-based and inclusive.  Positions within the spliced
//! transcript ("transcript offsets") and within the coding sequence ("CDS
//! offsets") are 0-based.

use std::ops::Range;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::err::Error;

/// Genomic strand of a transcript.
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
)]
pub enum Strand {
    /// Forward strand.
    #[serde(rename = "+", alias = "plus")]
    #[strum(serialize = "+")]
    Plus,
    /// Reverse strand.
    #[serde(rename = "-", alias = "minus")]
    #[strum(serialize = "-")]
    Minus,
}

/// Genomic interval of an exon as found in the reference snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExonRecord {
    /// 1-based start position.
    pub start: i64,
    /// 1-based inclusive end position.
    pub end: i64,
}

/// Transcript as stored in the reference snapshot, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    /// Transcript accession, e.g., `NM_000038.6`.
    pub id: String,
    /// HGNC identifier of the gene, e.g., `HGNC:583`.
    pub gene_id: String,
    /// Gene symbol.
    #[serde(default)]
    pub gene_symbol: String,
    /// Chromosome name.
    pub chrom: String,
    /// Strand of the transcript.
    pub strand: Strand,
    /// Exons in transcript order (descending genomic order on the minus strand).
    pub exons: Vec<ExonRecord>,
    /// Transcript offset of the first base of the start codon.
    pub cds_start: u32,
    /// Transcript offset one past the last base of the stop codon.
    pub cds_end: u32,
    /// Transcript tags, e.g., `ManeSelect`.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Spliced transcript sequence in transcript orientation.
    #[serde(default)]
    pub sequence: Option<String>,
    /// Curated alternative in-frame start codons as 1-based CDS positions.
    #[serde(default)]
    pub alternative_starts: Vec<u32>,
}

/// One exon of a validated transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exon {
    /// 1-based exon number in transcript order.
    pub number: usize,
    /// 1-based genomic start position.
    pub start: i64,
    /// 1-based inclusive genomic end position.
    pub end: i64,
    /// Transcript offsets covered by the exon.
    pub tx_range: Range<u32>,
    /// Reading frame phase of the first coding base, `None` for non-coding exons.
    pub phase: Option<u8>,
}

impl Exon {
    /// Length of the exon in bp.
    pub fn len(&self) -> u32 {
        self.tx_range.end - self.tx_range.start
    }

    /// Whether the exon has zero length, never true for validated exons.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the exon contains the genomic position.
    pub fn contains(&self, pos: i64) -> bool {
        self.start <= pos && pos <= self.end
    }
}

/// Location of a genomic position within a transcript's exons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// 0-based index of the exon.
    pub exon_idx: usize,
    /// Transcript offset of the position.
    pub tx_offset: u32,
    /// CDS offset of the position, if coding.
    pub cds_offset: Option<u32>,
}

/// Side of an intron that a canonical splice dinucleotide belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum SpliceSide {
    /// The `+1`/`+2` bases downstream of an exon.
    Donor,
    /// The `-2`/`-1` bases upstream of an exon.
    Acceptor,
}

/// A canonical splice dinucleotide position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpliceSite {
    /// Donor or acceptor.
    pub side: SpliceSide,
    /// 0-based index of the exon the site belongs to.
    pub exon_idx: usize,
}

/// Position in `c.` notation, e.g. `c.100+1`, `c.-20`, or `c.*5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdsPos {
    /// The `c.` base, negative for positions in the 5' UTR.
    pub base: i64,
    /// Whether the position is relative to the stop codon (`c.*N`).
    pub utr3: bool,
    /// Intronic offset, zero for exonic positions.
    pub offset: i64,
}

impl CdsPos {
    /// Exonic coding position `c.<base>`.
    pub fn coding(base: i64) -> Self {
        Self {
            base,
            utr3: false,
            offset: 0,
        }
    }
}

/// Immutable, validated transcript model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transcript {
    id: String,
    gene_id: String,
    gene_symbol: String,
    chrom: String,
    strand: Strand,
    exons: Vec<Exon>,
    cds: Range<u32>,
    tags: Vec<String>,
    sequence: Option<String>,
    alternative_starts: Vec<u32>,
}

/// Returns whether the codon is a stop codon.
pub fn is_stop_codon(codon: &[u8]) -> bool {
    matches!(codon, b"TAA" | b"TAG" | b"TGA")
}

/// Reverse-complement a nucleotide sequence.
pub fn revcomp(seq: &str) -> String {
    seq.chars()
        .rev()
        .map(|c| match c {
            'A' => 'T',
            'C' => 'G',
            'G' => 'C',
            'T' => 'A',
            'a' => 't',
            'c' => 'g',
            'g' => 'c',
            't' => 'a',
            other => other,
        })
        .collect()
}

impl TryFrom<TranscriptRecord> for Transcript {
    type Error = Error;

    fn try_from(record: TranscriptRecord) -> Result<Self, Self::Error> {
        let invalid = |reason: String| Error::InvalidTranscript {
            tx_id: record.id.clone(),
            reason,
        };

        if record.exons.is_empty() {
            return Err(invalid("transcript has no exons".into()));
        }
        if let Some(exon) = record.exons.iter().find(|e| e.start > e.end || e.start < 1) {
            return Err(invalid(format!("invalid exon interval {:?}", exon)));
        }
        for (lhs, rhs) in record.exons.iter().tuple_windows() {
            let ordered = match record.strand {
                Strand::Plus => lhs.end < rhs.start,
                Strand::Minus => lhs.start > rhs.end,
            };
            if !ordered {
                return Err(invalid(format!(
                    "exons {:?} and {:?} overlap or are not in {} strand order",
                    lhs, rhs, record.strand
                )));
            }
        }

        let mut exons = Vec::with_capacity(record.exons.len());
        let mut tx_start = 0u32;
        for (idx, exon) in record.exons.iter().enumerate() {
            let len = (exon.end - exon.start + 1) as u32;
            let tx_range = tx_start..(tx_start + len);
            let coding_start = tx_range.start.max(record.cds_start);
            let phase = if coding_start < tx_range.end.min(record.cds_end) {
                Some(((coding_start - record.cds_start) % 3) as u8)
            } else {
                None
            };
            exons.push(Exon {
                number: idx + 1,
                start: exon.start,
                end: exon.end,
                tx_range,
                phase,
            });
            tx_start += len;
        }
        let tx_len = tx_start;

        if record.cds_start >= record.cds_end || record.cds_end > tx_len {
            return Err(invalid(format!(
                "CDS {}..{} not within transcript of length {}",
                record.cds_start, record.cds_end, tx_len
            )));
        }
        let cds_len = record.cds_end - record.cds_start;
        if cds_len % 3 != 0 || cds_len < 6 {
            return Err(invalid(format!(
                "CDS length {} is not a multiple of 3 of at least two codons",
                cds_len
            )));
        }

        let sequence = match record.sequence {
            Some(seq) => {
                let seq = seq.to_ascii_uppercase();
                if seq.len() as u32 != tx_len {
                    return Err(invalid(format!(
                        "sequence length {} differs from exon length {}",
                        seq.len(),
                        tx_len
                    )));
                }
                if !seq.bytes().all(|b| matches!(b, b'A' | b'C' | b'G' | b'T' | b'N')) {
                    return Err(invalid("sequence contains non-ACGTN characters".into()));
                }
                Some(seq)
            }
            None => None,
        };

        if let Some(pos) = record
            .alternative_starts
            .iter()
            .find(|&&pos| pos < 1 || pos > cds_len || (pos - 1) % 3 != 0)
        {
            return Err(invalid(format!(
                "alternative start c.{} is not an in-frame CDS position",
                pos
            )));
        }

        Ok(Self {
            id: record.id,
            gene_id: record.gene_id,
            gene_symbol: record.gene_symbol,
            chrom: crate::common::canonicalize(&record.chrom),
            strand: record.strand,
            exons,
            cds: record.cds_start..record.cds_end,
            tags: record.tags,
            sequence,
            alternative_starts: record.alternative_starts,
        })
    }
}

impl Transcript {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn gene_id(&self) -> &str {
        &self.gene_id
    }

    pub fn gene_symbol(&self) -> &str {
        &self.gene_symbol
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn strand(&self) -> Strand {
        self.strand
    }

    pub fn exons(&self) -> &[Exon] {
        &self.exons
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn sequence(&self) -> Option<&str> {
        self.sequence.as_deref()
    }

    /// Transcript offsets of the CDS including the stop codon.
    pub fn cds(&self) -> Range<u32> {
        self.cds.clone()
    }

    /// Length of the spliced transcript.
    pub fn tx_len(&self) -> u32 {
        self.exons.last().map(|e| e.tx_range.end).unwrap_or(0)
    }

    /// Length of the CDS including the stop codon.
    pub fn cds_len(&self) -> u32 {
        self.cds.end - self.cds.start
    }

    /// Number of amino acids of the encoded protein.
    pub fn protein_len(&self) -> u32 {
        self.cds_len() / 3 - 1
    }

    /// Transcript offsets of the start codon.
    pub fn start_codon(&self) -> Range<u32> {
        self.cds.start..(self.cds.start + 3)
    }

    /// Transcript offsets of the stop codon.
    pub fn stop_codon(&self) -> Range<u32> {
        (self.cds.end - 3)..self.cds.end
    }

    /// Transcript offsets of the coding part of exon `idx`.
    pub fn exon_coding_range(&self, idx: usize) -> Option<Range<u32>> {
        let exon = self.exons.get(idx)?;
        let start = exon.tx_range.start.max(self.cds.start);
        let end = exon.tx_range.end.min(self.cds.end);
        (start < end).then_some(start..end)
    }

    /// Number of coding bases in exon `idx`.
    pub fn exon_coding_len(&self, idx: usize) -> u32 {
        self.exon_coding_range(idx)
            .map(|r| r.end - r.start)
            .unwrap_or(0)
    }

    /// Index of the exon containing the transcript offset.
    pub fn exon_idx_of_tx_offset(&self, tx_offset: u32) -> Option<usize> {
        self.exons
            .iter()
            .position(|e| e.tx_range.contains(&tx_offset))
    }

    /// CDS offset for a transcript offset within the CDS.
    pub fn cds_offset(&self, tx_offset: u32) -> Option<u32> {
        self.cds
            .contains(&tx_offset)
            .then(|| tx_offset - self.cds.start)
    }

    /// Resolve the exon and transcript/CDS offsets of a genomic position.
    pub fn locate(&self, pos: i64) -> Result<Location, Error> {
        let (exon_idx, exon) = self
            .exons
            .iter()
            .enumerate()
            .find(|(_, e)| e.contains(pos))
            .ok_or_else(|| Error::OutOfTranscriptRange {
                tx_id: self.id.clone(),
                pos,
            })?;
        let delta = match self.strand {
            Strand::Plus => pos - exon.start,
            Strand::Minus => exon.end - pos,
        } as u32;
        let tx_offset = exon.tx_range.start + delta;
        Ok(Location {
            exon_idx,
            tx_offset,
            cds_offset: self.cds_offset(tx_offset),
        })
    }

    /// Genomic position of a transcript offset.
    pub fn tx_to_genomic(&self, tx_offset: u32) -> Result<i64, Error> {
        let exon = self
            .exon_idx_of_tx_offset(tx_offset)
            .map(|idx| &self.exons[idx])
            .ok_or_else(|| {
                Error::Classification(format!(
                    "transcript offset {} beyond end of {}",
                    tx_offset, self.id
                ))
            })?;
        let delta = (tx_offset - exon.tx_range.start) as i64;
        Ok(match self.strand {
            Strand::Plus => exon.start + delta,
            Strand::Minus => exon.end - delta,
        })
    }

    /// Genomic hull `(start, end)` of a non-empty range of transcript offsets.
    pub fn tx_range_to_genomic(&self, range: Range<u32>) -> Result<(i64, i64), Error> {
        if range.is_empty() {
            return Err(Error::Classification(format!(
                "empty transcript range {:?} on {}",
                range, self.id
            )));
        }
        let first = self.tx_to_genomic(range.start)?;
        let last = self.tx_to_genomic(range.end - 1)?;
        Ok((first.min(last), first.max(last)))
    }

    /// Genomic hull `(start, end)` of the coding sequence including the stop codon.
    pub fn coding_region_genomic(&self) -> Result<(i64, i64), Error> {
        self.tx_range_to_genomic(self.cds())
    }

    /// Genomic position of a `c.` position, including intronic offsets.
    pub fn cds_to_genomic(&self, pos: CdsPos) -> Result<i64, Error> {
        let tx_offset = if pos.utr3 {
            self.cds.end as i64 + pos.base - 1
        } else if pos.base < 0 {
            self.cds.start as i64 + pos.base
        } else if pos.base > 0 {
            self.cds.start as i64 + pos.base - 1
        } else {
            return Err(Error::InvalidVariant("c.0 is not a valid position".into()));
        };
        if tx_offset < 0 || tx_offset >= self.tx_len() as i64 {
            return Err(Error::OutOfTranscriptRange {
                tx_id: self.id.clone(),
                pos: tx_offset,
            });
        }
        let genomic = self.tx_to_genomic(tx_offset as u32)?;
        Ok(match self.strand {
            Strand::Plus => genomic + pos.offset,
            Strand::Minus => genomic - pos.offset,
        })
    }

    /// Canonical splice dinucleotide containing the genomic position, if any.
    ///
    /// Donor sites exist for all but the last exon, acceptor sites for all but
    /// the first exon.
    pub fn splice_site_at(&self, pos: i64) -> Option<SpliceSite> {
        let last = self.exons.len() - 1;
        self.exons.iter().enumerate().find_map(|(idx, exon)| {
            let (upstream, downstream) = match self.strand {
                Strand::Plus => ((exon.start - 2)..exon.start, (exon.end + 1)..(exon.end + 3)),
                Strand::Minus => ((exon.end + 1)..(exon.end + 3), (exon.start - 2)..exon.start),
            };
            if idx < last && downstream.contains(&pos) {
                Some(SpliceSite {
                    side: SpliceSide::Donor,
                    exon_idx: idx,
                })
            } else if idx > 0 && upstream.contains(&pos) {
                Some(SpliceSite {
                    side: SpliceSide::Acceptor,
                    exon_idx: idx,
                })
            } else {
                None
            }
        })
    }

    /// 0-based position of the CDS offset within its codon.
    pub fn codon_phase(&self, cds_offset: u32) -> u8 {
        (cds_offset % 3) as u8
    }

    /// Distance in coding bases from the codon containing `cds_offset` to the
    /// final (stop) codon.
    pub fn distance_to_final_codon(&self, cds_offset: u32) -> u32 {
        let codon_start = cds_offset - cds_offset % 3;
        (self.cds_len() - 3).saturating_sub(codon_start)
    }

    /// The codon at the given CDS offset, if the sequence is known.
    pub fn codon_at(&self, cds_offset: u32) -> Option<&str> {
        let start = (self.cds.start + cds_offset - cds_offset % 3) as usize;
        self.sequence
            .as_deref()
            .and_then(|seq| seq.get(start..start + 3))
    }

    /// Closest in-frame alternative start codon downstream of the annotated one
    /// as a 1-based CDS position.
    ///
    /// Curated alternative starts take precedence over scanning the sequence.
    pub fn closest_alternative_start(&self) -> Option<u32> {
        if let Some(pos) = self.curated_alternative_start() {
            return Some(pos);
        }
        let seq = self.sequence.as_deref()?.as_bytes();
        let coding = &seq[self.cds.start as usize..(self.cds.end - 3) as usize];
        coding
            .chunks_exact(3)
            .enumerate()
            .skip(1)
            .find(|(_, codon)| *codon == b"ATG")
            .map(|(idx, _)| idx as u32 * 3 + 1)
    }

    /// Closest curated alternative start codon as a 1-based CDS position.
    pub fn curated_alternative_start(&self) -> Option<u32> {
        self.alternative_starts.iter().filter(|&&p| p > 1).min().copied()
    }

    /// Whether any of the given tags is present; an empty list matches all.
    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        tags.is_empty() || tags.iter().any(|tag| self.tags.contains(tag))
    }
}

#[cfg(test)]
pub(crate) mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    /// Exon lengths 100, 150, 121, 92, 200 with a 50bp 5' UTR, a CDS of
    /// 564bp (coding lengths 50, 150, 121, 92, 151), and a 49bp 3' UTR.
    pub fn five_exon_record(strand: Strand) -> TranscriptRecord {
        let exons = match strand {
            Strand::Plus => vec![
                ExonRecord { start: 1001, end: 1100 },
                ExonRecord { start: 2001, end: 2150 },
                ExonRecord { start: 3001, end: 3121 },
                ExonRecord { start: 4001, end: 4092 },
                ExonRecord { start: 5001, end: 5200 },
            ],
            Strand::Minus => vec![
                ExonRecord { start: 5001, end: 5100 },
                ExonRecord { start: 4001, end: 4150 },
                ExonRecord { start: 3001, end: 3121 },
                ExonRecord { start: 2001, end: 2092 },
                ExonRecord { start: 1001, end: 1200 },
            ],
        };
        TranscriptRecord {
            id: "NM_000001.1".into(),
            gene_id: "HGNC:1".into(),
            gene_symbol: "GENE1".into(),
            chrom: "chr1".into(),
            strand,
            exons,
            cds_start: 50,
            cds_end: 614,
            tags: vec!["ManeSelect".into()],
            sequence: None,
            alternative_starts: Vec::new(),
        }
    }

    /// Transcript sequence for `five_exon_record`: poly-C 5' UTR, `ATG`, `TCA`
    /// codons with `CTA GCA` at codons 61/62 (a `TAG` in the +1 frame at CDS
    /// offset 181), `TAA` and a 3' UTR starting with `ATGA`.
    pub fn five_exon_sequence() -> String {
        let mut cds = String::from("ATG");
        for idx in 1..187 {
            cds.push_str(match idx {
                60 => "CTA",
                61 => "GCA",
                _ => "TCA",
            });
        }
        cds.push_str("TAA");
        assert_eq!(cds.len(), 564);
        let utr3 = format!("ATGA{}", "C".repeat(45));
        format!("{}{}{}", "C".repeat(50), cds, utr3)
    }

    pub fn five_exon_tx(strand: Strand) -> Transcript {
        Transcript::try_from(five_exon_record(strand)).expect("valid transcript")
    }

    pub fn five_exon_tx_with_seq(strand: Strand) -> Transcript {
        let mut record = five_exon_record(strand);
        record.sequence = Some(five_exon_sequence());
        Transcript::try_from(record).expect("valid transcript")
    }

    #[test]
    fn derived_structure() {
        let tx = five_exon_tx(Strand::Plus);

        assert_eq!(tx.tx_len(), 663);
        assert_eq!(tx.cds_len(), 564);
        assert_eq!(tx.protein_len(), 187);
        assert_eq!(tx.chrom(), "1");
        assert_eq!(
            tx.exons().iter().map(|e| e.tx_range.clone()).collect::<Vec<_>>(),
            vec![0..100, 100..250, 250..371, 371..463, 463..663]
        );
        assert_eq!(
            (0..5).map(|i| tx.exon_coding_len(i)).collect::<Vec<_>>(),
            vec![50, 150, 121, 92, 151]
        );
    }

    #[test]
    fn phases_carry_over_between_exons() {
        let tx = five_exon_tx(Strand::Plus);
        let phases = tx.exons().iter().map(|e| e.phase).collect::<Vec<_>>();
        assert_eq!(phases, vec![Some(0), Some(2), Some(2), Some(0), Some(2)]);

        for idx in 0..4 {
            let carried = (tx.exons()[idx].phase.unwrap() as u32 + tx.exon_coding_len(idx)) % 3;
            assert_eq!(Some(carried as u8), tx.exons()[idx + 1].phase);
        }
    }

    #[rstest::rstest]
    #[case(Strand::Plus, 1001, 0, 0, None)]
    #[case(Strand::Plus, 1051, 0, 50, Some(0))]
    #[case(Strand::Plus, 2001, 1, 100, Some(50))]
    #[case(Strand::Plus, 5200, 4, 662, None)]
    #[case(Strand::Minus, 5100, 0, 0, None)]
    #[case(Strand::Minus, 5050, 0, 50, Some(0))]
    #[case(Strand::Minus, 4150, 1, 100, Some(50))]
    #[case(Strand::Minus, 1001, 4, 662, None)]
    fn locate(
        #[case] strand: Strand,
        #[case] pos: i64,
        #[case] exon_idx: usize,
        #[case] tx_offset: u32,
        #[case] cds_offset: Option<u32>,
    ) -> Result<(), anyhow::Error> {
        let tx = five_exon_tx(strand);
        assert_eq!(
            tx.locate(pos)?,
            Location {
                exon_idx,
                tx_offset,
                cds_offset
            }
        );
        assert_eq!(tx.tx_to_genomic(tx_offset)?, pos);
        Ok(())
    }

    #[rstest::rstest]
    #[case(1000)]
    #[case(1101)]
    #[case(5201)]
    fn locate_outside_exons(#[case] pos: i64) {
        let tx = five_exon_tx(Strand::Plus);
        assert_eq!(
            tx.locate(pos),
            Err(Error::OutOfTranscriptRange {
                tx_id: "NM_000001.1".into(),
                pos
            })
        );
    }

    #[rstest::rstest]
    #[case(Strand::Plus, CdsPos::coding(1), 1051)]
    #[case(Strand::Plus, CdsPos::coding(51), 2001)]
    #[case(Strand::Plus, CdsPos { base: 50, utr3: false, offset: 1 }, 1101)]
    #[case(Strand::Plus, CdsPos { base: 51, utr3: false, offset: -2 }, 1999)]
    #[case(Strand::Plus, CdsPos { base: -1, utr3: false, offset: 0 }, 1050)]
    #[case(Strand::Plus, CdsPos { base: 1, utr3: true, offset: 0 }, 5152)]
    #[case(Strand::Minus, CdsPos::coding(1), 5050)]
    #[case(Strand::Minus, CdsPos { base: 50, utr3: false, offset: 1 }, 5000)]
    #[case(Strand::Minus, CdsPos { base: 51, utr3: false, offset: -2 }, 4152)]
    fn cds_to_genomic(
        #[case] strand: Strand,
        #[case] pos: CdsPos,
        #[case] expected: i64,
    ) -> Result<(), anyhow::Error> {
        let tx = five_exon_tx(strand);
        assert_eq!(tx.cds_to_genomic(pos)?, expected);
        Ok(())
    }

    #[rstest::rstest]
    #[case(Strand::Plus, 1101, Some((SpliceSide::Donor, 0)))]
    #[case(Strand::Plus, 1102, Some((SpliceSide::Donor, 0)))]
    #[case(Strand::Plus, 1103, None)]
    #[case(Strand::Plus, 1999, Some((SpliceSide::Acceptor, 1)))]
    #[case(Strand::Plus, 2000, Some((SpliceSide::Acceptor, 1)))]
    #[case(Strand::Plus, 999, None)]
    #[case(Strand::Plus, 5201, None)]
    #[case(Strand::Minus, 5000, Some((SpliceSide::Donor, 0)))]
    #[case(Strand::Minus, 4999, Some((SpliceSide::Donor, 0)))]
    #[case(Strand::Minus, 4151, Some((SpliceSide::Acceptor, 1)))]
    #[case(Strand::Minus, 5101, None)]
    fn splice_site_at(
        #[case] strand: Strand,
        #[case] pos: i64,
        #[case] expected: Option<(SpliceSide, usize)>,
    ) {
        let tx = five_exon_tx(strand);
        assert_eq!(
            tx.splice_site_at(pos).map(|s| (s.side, s.exon_idx)),
            expected
        );
    }

    #[rstest::rstest]
    #[case(0, 0, 561)]
    #[case(1, 1, 561)]
    #[case(5, 2, 558)]
    #[case(560, 2, 3)]
    #[case(561, 0, 0)]
    fn codon_phase_and_distance(
        #[case] cds_offset: u32,
        #[case] phase: u8,
        #[case] distance: u32,
    ) {
        let tx = five_exon_tx(Strand::Plus);
        assert_eq!(tx.codon_phase(cds_offset), phase);
        assert_eq!(tx.distance_to_final_codon(cds_offset), distance);
    }

    #[test]
    fn codons_from_sequence() {
        let tx = five_exon_tx_with_seq(Strand::Plus);
        assert_eq!(tx.codon_at(0), Some("ATG"));
        assert_eq!(tx.codon_at(4), Some("TCA"));
        assert_eq!(tx.codon_at(181), Some("CTA"));
        assert_eq!(tx.codon_at(563), Some("TAA"));
        assert_eq!(five_exon_tx(Strand::Plus).codon_at(0), None);
    }

    #[test]
    fn closest_alternative_start() {
        assert_eq!(five_exon_tx_with_seq(Strand::Plus).closest_alternative_start(), None);

        let mut record = five_exon_record(Strand::Plus);
        let mut seq = five_exon_sequence();
        seq.replace_range(50 + 30..50 + 33, "ATG");
        record.sequence = Some(seq);
        let tx = Transcript::try_from(record.clone()).unwrap();
        assert_eq!(tx.closest_alternative_start(), Some(31));
        assert_eq!(tx.curated_alternative_start(), None);

        record.alternative_starts = vec![1, 100];
        let tx = Transcript::try_from(record).unwrap();
        assert_eq!(tx.closest_alternative_start(), Some(100));
        assert_eq!(tx.curated_alternative_start(), Some(100));
    }

    #[rstest::rstest]
    #[case(Strand::Plus, (1051, 5151))]
    #[case(Strand::Minus, (1050, 5050))]
    fn coding_region_genomic(
        #[case] strand: Strand,
        #[case] expected: (i64, i64),
    ) -> Result<(), anyhow::Error> {
        assert_eq!(five_exon_tx(strand).coding_region_genomic()?, expected);
        Ok(())
    }

    #[test]
    fn invalid_overlapping_exons() {
        let mut record = five_exon_record(Strand::Plus);
        record.exons[1].start = 1050;
        assert!(matches!(
            Transcript::try_from(record),
            Err(Error::InvalidTranscript { .. })
        ));
    }

    #[test]
    fn invalid_minus_strand_order() {
        let mut record = five_exon_record(Strand::Minus);
        record.exons.reverse();
        assert!(matches!(
            Transcript::try_from(record),
            Err(Error::InvalidTranscript { .. })
        ));
    }

    #[rstest::rstest]
    #[case(50, 700)]
    #[case(50, 615)]
    #[case(614, 50)]
    fn invalid_cds(#[case] cds_start: u32, #[case] cds_end: u32) {
        let mut record = five_exon_record(Strand::Plus);
        record.cds_start = cds_start;
        record.cds_end = cds_end;
        assert!(Transcript::try_from(record).is_err());
    }

    #[test]
    fn invalid_sequence_length() {
        let mut record = five_exon_record(Strand::Plus);
        record.sequence = Some("ACGT".into());
        assert!(Transcript::try_from(record).is_err());
    }

    #[test]
    fn strand_from_json() -> Result<(), anyhow::Error> {
        assert_eq!(serde_json::from_str::<Strand>("\"+\"")?, Strand::Plus);
        assert_eq!(serde_json::from_str::<Strand>("\"minus\"")?, Strand::Minus);
        Ok(())
    }

    #[test]
    fn revcomp_seq() {
        assert_eq!(revcomp("AACGTN"), "NACGTT");
    }
}
