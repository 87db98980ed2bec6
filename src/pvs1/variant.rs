//! Variant model and parsing of the supported textual representations.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::{canonicalize, GenomeRelease};
use crate::err::Error;
use crate::pvs1::transcript::{revcomp, CdsPos, Strand, Transcript};

/// Class of a variant, derived at construction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum VariantClass {
    /// Single nucleotide variant.
    Snv,
    /// Multi-nucleotide substitution of equal length.
    Mnv,
    /// Insertion of bases.
    Insertion,
    /// Deletion of bases.
    Deletion,
    /// Tandem duplication of bases.
    Duplication,
    /// Deletion with inserted bases.
    Delins,
    /// Deletion of a larger genomic span (CNV).
    SpanDeletion,
    /// Duplication of a larger genomic span (CNV).
    SpanDuplication,
}

/// Kind of structural span.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum SpanKind {
    Del,
    Dup,
}

/// A normalized, immutable variant.
///
/// The deleted reference bases cover `start..=end`; for insertions and
/// duplications `end == start - 1` and the inserted bases go between `end`
/// and `start`.  Unknown bases are given as `N`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variant {
    chrom: String,
    start: i64,
    end: i64,
    deleted: String,
    inserted: String,
    class: VariantClass,
}

fn check_bases(bases: &str) -> Result<String, Error> {
    let bases = bases.to_ascii_uppercase();
    if bases
        .bytes()
        .all(|b| matches!(b, b'A' | b'C' | b'G' | b'T' | b'N'))
    {
        Ok(bases)
    } else {
        Err(Error::InvalidVariant(format!("invalid bases {:?}", bases)))
    }
}

impl Variant {
    /// Construct from position and alleles, trimming shared suffix and prefix.
    pub fn new(chrom: &str, pos: i64, reference: &str, alternative: &str) -> Result<Self, Error> {
        if pos < 1 {
            return Err(Error::InvalidVariant(format!("invalid position {}", pos)));
        }
        let mut deleted = check_bases(reference)?.into_bytes();
        let mut inserted = check_bases(alternative)?.into_bytes();

        let same = |a: Option<&u8>, b: Option<&u8>| {
            matches!((a, b), (Some(a), Some(b)) if a == b && *a != b'N')
        };
        while same(deleted.last(), inserted.last()) {
            deleted.pop();
            inserted.pop();
        }
        let prefix = deleted
            .iter()
            .zip(inserted.iter())
            .take_while(|(a, b)| a == b && **a != b'N')
            .count();
        let deleted = String::from_utf8_lossy(&deleted[prefix..]).into_owned();
        let inserted = String::from_utf8_lossy(&inserted[prefix..]).into_owned();
        let start = pos + prefix as i64;

        let class = match (deleted.len(), inserted.len()) {
            (0, 0) => {
                return Err(Error::InvalidVariant(format!(
                    "reference {:?} equals alternative allele",
                    reference
                )))
            }
            (1, 1) => VariantClass::Snv,
            (0, _) => VariantClass::Insertion,
            (_, 0) => VariantClass::Deletion,
            (d, i) if d == i => VariantClass::Mnv,
            _ => VariantClass::Delins,
        };

        Ok(Self {
            chrom: canonicalize(chrom),
            start,
            end: start + deleted.len() as i64 - 1,
            deleted,
            inserted,
            class,
        })
    }

    /// Tandem duplication of `start..=end`, `bases` being the duplicated bases.
    pub fn duplication(chrom: &str, start: i64, end: i64, bases: &str) -> Result<Self, Error> {
        let bases = check_bases(bases)?;
        if start < 1 || end < start || bases.len() as i64 != end - start + 1 {
            return Err(Error::InvalidVariant(format!(
                "invalid duplication {}:{}-{} of {:?}",
                chrom, start, end, bases
            )));
        }
        Ok(Self {
            chrom: canonicalize(chrom),
            start: end + 1,
            end,
            deleted: String::new(),
            inserted: bases,
            class: VariantClass::Duplication,
        })
    }

    /// Structural deletion or duplication of `start..=end`.
    pub fn span(chrom: &str, start: i64, end: i64, kind: SpanKind) -> Result<Self, Error> {
        if start < 1 || end < start {
            return Err(Error::InvalidVariant(format!(
                "invalid span {}:{}-{}",
                chrom, start, end
            )));
        }
        Ok(Self {
            chrom: canonicalize(chrom),
            start,
            end,
            deleted: String::new(),
            inserted: String::new(),
            class: match kind {
                SpanKind::Del => VariantClass::SpanDeletion,
                SpanKind::Dup => VariantClass::SpanDuplication,
            },
        })
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    /// First affected genomic position.
    pub fn start(&self) -> i64 {
        self.start
    }

    /// Last deleted genomic position, `start() - 1` for insertions.
    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn deleted(&self) -> &str {
        &self.deleted
    }

    pub fn inserted(&self) -> &str {
        &self.inserted
    }

    pub fn class(&self) -> VariantClass {
        self.class
    }

    /// Whether the variant inserts bases between two reference positions.
    pub fn is_insertion(&self) -> bool {
        self.end < self.start
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.class {
            VariantClass::SpanDeletion => {
                write!(f, "{}:{}-{}:DEL", self.chrom, self.start, self.end)
            }
            VariantClass::SpanDuplication => {
                write!(f, "{}:{}-{}:DUP", self.chrom, self.start, self.end)
            }
            _ => write!(
                f,
                "{}:{}:{}:{}",
                self.chrom, self.start, self.deleted, self.inserted
            ),
        }
    }
}

/// Edit of a transcript-relative change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CdsEdit {
    Substitution { reference: String, alternative: String },
    Deletion,
    Duplication,
    Insertion(String),
    Delins(String),
}

/// Transcript-relative change in `c.` notation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdsChange {
    pub start: CdsPos,
    pub end: Option<CdsPos>,
    pub edit: CdsEdit,
}

impl CdsChange {
    /// Resolve into a genomic variant through the transcript model.
    pub fn resolve(&self, tx: &Transcript) -> Result<Variant, Error> {
        let first = tx.cds_to_genomic(self.start)?;
        let last = match self.end {
            Some(end) => tx.cds_to_genomic(end)?,
            None => first,
        };
        let (lo, hi) = (first.min(last), first.max(last));
        let oriented = |bases: &str| match tx.strand() {
            Strand::Plus => bases.to_owned(),
            Strand::Minus => revcomp(bases),
        };

        match &self.edit {
            CdsEdit::Substitution {
                reference,
                alternative,
            } => {
                if lo != hi {
                    return Err(Error::InvalidVariant(
                        "substitution must affect a single position".into(),
                    ));
                }
                Variant::new(tx.chrom(), lo, &oriented(reference), &oriented(alternative))
            }
            CdsEdit::Deletion => {
                Variant::new(tx.chrom(), lo, &genomic_reference(tx, lo, hi), "")
            }
            CdsEdit::Delins(bases) => Variant::new(
                tx.chrom(),
                lo,
                &genomic_reference(tx, lo, hi),
                &oriented(bases),
            ),
            CdsEdit::Insertion(bases) => {
                if self.end.is_none() || hi - lo != 1 {
                    return Err(Error::InvalidVariant(
                        "insertion must be given between two adjacent positions".into(),
                    ));
                }
                Variant::new(tx.chrom(), hi, "", &oriented(bases))
            }
            CdsEdit::Duplication => {
                Variant::duplication(tx.chrom(), lo, hi, &genomic_reference(tx, lo, hi))
            }
        }
    }
}

/// Reference bases of `lo..=hi` in genomic orientation, `N` where unknown.
fn genomic_reference(tx: &Transcript, lo: i64, hi: i64) -> String {
    (lo..=hi)
        .map(|pos| {
            let base = tx.sequence().and_then(|seq| {
                let loc = tx.locate(pos).ok()?;
                seq.as_bytes().get(loc.tx_offset as usize).copied()
            });
            match (base, tx.strand()) {
                (Some(base), Strand::Plus) => base as char,
                (Some(base), Strand::Minus) => match base {
                    b'A' => 'T',
                    b'C' => 'G',
                    b'G' => 'C',
                    b'T' => 'A',
                    _ => 'N',
                },
                (None, _) => 'N',
            }
        })
        .collect()
}

/// A parsed variant description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantInput {
    /// Genomic variant, optionally with an explicit genome release.
    Genomic {
        release: Option<GenomeRelease>,
        variant: Variant,
    },
    /// Transcript-relative change.
    Transcript { tx_id: String, change: CdsChange },
}

impl VariantInput {
    /// The transcript named by the description, if any.
    pub fn transcript_id(&self) -> Option<&str> {
        match self {
            VariantInput::Genomic { .. } => None,
            VariantInput::Transcript { tx_id, .. } => Some(tx_id),
        }
    }

    /// Resolve into a genomic variant on the given transcript.
    pub fn resolve(&self, tx: &Transcript) -> Result<Variant, Error> {
        match self {
            VariantInput::Genomic { variant, .. } => Ok(variant.clone()),
            VariantInput::Transcript { change, .. } => change.resolve(tx),
        }
    }
}

lazy_static::lazy_static! {
    static ref RE_SEQVAR: regex::Regex = regex::Regex::new(
        r"(?i)^(?:(?P<release>grch3[78]|hg19|hg38)[-:])?(?:chr)?(?P<chrom>\d{1,2}|X|Y|MT?)[-:](?P<pos>\d+)[-:](?P<del>[ACGTN]*)[-:](?P<ins>[ACGTN]*)$"
    ).expect("invalid regex in source code");
    static ref RE_SPAN: regex::Regex = regex::Regex::new(
        r"(?i)^(?:(?P<release>grch3[78]|hg19|hg38)[-:])?(?:chr)?(?P<chrom>\d{1,2}|X|Y|MT?):(?P<start>\d+)-(?P<end>\d+):(?P<kind>DEL|DUP)$"
    ).expect("invalid regex in source code");
    static ref RE_CDS: regex::Regex = regex::Regex::new(
        r"^(?P<tx>[A-Za-z0-9_.]+):c\.(?P<start>[-*]?\d+(?:[+-]\d+)?)(?:_(?P<end>[-*]?\d+(?:[+-]\d+)?))?(?P<edit>.+)$"
    ).expect("invalid regex in source code");
    static ref RE_CDS_POS: regex::Regex = regex::Regex::new(
        r"^(?P<prefix>[-*]?)(?P<base>\d+)(?P<offset>[+-]\d+)?$"
    ).expect("invalid regex in source code");
    static ref RE_EDIT: regex::Regex = regex::Regex::new(
        r"^(?:(?P<subst_ref>[ACGT])>(?P<subst_alt>[ACGT])|delins(?P<delins>[ACGT]+)|del(?P<del>[ACGT]*)|dup(?P<dup>[ACGT]*)|ins(?P<ins>[ACGT]+))$"
    ).expect("invalid regex in source code");
}

fn parse_number(text: &str) -> Result<i64, Error> {
    text.parse::<i64>()
        .map_err(|e| Error::InvalidVariant(format!("invalid number {:?}: {}", text, e)))
}

fn parse_release(caps: &regex::Captures<'_>) -> Result<Option<GenomeRelease>, Error> {
    caps.name("release")
        .map(|m| {
            m.as_str()
                .parse::<GenomeRelease>()
                .map_err(|e| Error::InvalidVariant(e.to_string()))
        })
        .transpose()
}

impl FromStr for CdsPos {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = RE_CDS_POS
            .captures(s)
            .ok_or_else(|| Error::InvalidVariant(format!("invalid c. position {:?}", s)))?;
        let base = parse_number(&caps["base"])?;
        let offset = caps
            .name("offset")
            .map(|m| parse_number(m.as_str().trim_start_matches('+')))
            .transpose()?
            .unwrap_or(0);
        Ok(match &caps["prefix"] {
            "-" => CdsPos {
                base: -base,
                utr3: false,
                offset,
            },
            "*" => CdsPos {
                base,
                utr3: true,
                offset,
            },
            _ => CdsPos {
                base,
                utr3: false,
                offset,
            },
        })
    }
}

impl FromStr for VariantInput {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(caps) = RE_SEQVAR.captures(s) {
            let variant = Variant::new(
                &caps["chrom"],
                parse_number(&caps["pos"])?,
                &caps["del"],
                &caps["ins"],
            )?;
            Ok(VariantInput::Genomic {
                release: parse_release(&caps)?,
                variant,
            })
        } else if let Some(caps) = RE_SPAN.captures(s) {
            let kind = caps["kind"]
                .parse::<SpanKind>()
                .map_err(|e| Error::InvalidVariant(e.to_string()))?;
            let variant = Variant::span(
                &caps["chrom"],
                parse_number(&caps["start"])?,
                parse_number(&caps["end"])?,
                kind,
            )?;
            Ok(VariantInput::Genomic {
                release: parse_release(&caps)?,
                variant,
            })
        } else if let Some(caps) = RE_CDS.captures(s) {
            let start = caps["start"].parse::<CdsPos>()?;
            let end = caps
                .name("end")
                .map(|m| m.as_str().parse::<CdsPos>())
                .transpose()?;
            let edit = RE_EDIT
                .captures(&caps["edit"])
                .ok_or_else(|| {
                    Error::InvalidVariant(format!("unsupported c. edit {:?}", &caps["edit"]))
                })?;
            let edit = if let (Some(reference), Some(alternative)) =
                (edit.name("subst_ref"), edit.name("subst_alt"))
            {
                CdsEdit::Substitution {
                    reference: reference.as_str().to_owned(),
                    alternative: alternative.as_str().to_owned(),
                }
            } else if let Some(bases) = edit.name("delins") {
                CdsEdit::Delins(bases.as_str().to_owned())
            } else if edit.name("del").is_some() {
                CdsEdit::Deletion
            } else if edit.name("dup").is_some() {
                CdsEdit::Duplication
            } else if let Some(bases) = edit.name("ins") {
                CdsEdit::Insertion(bases.as_str().to_owned())
            } else {
                return Err(Error::InvalidVariant(format!("unsupported c. edit in {:?}", s)));
            };
            Ok(VariantInput::Transcript {
                tx_id: caps["tx"].to_owned(),
                change: CdsChange { start, end, edit },
            })
        } else {
            Err(Error::InvalidVariant(s.to_owned()))
        }
    }
}
