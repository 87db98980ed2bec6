//! Common functionality.

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use indexmap::IndexMap;

pub mod io;

/// Commonly used command line arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            verbose: Verbosity::new(0, 0),
        }
    }
}

/// Helper to print the current memory resident set size via `tracing`.
pub fn trace_rss_now() {
    let rss = procfs::process::Process::myself()
        .and_then(|me| me.stat())
        .map(|stat| stat.rss * procfs::page_size());
    match rss {
        Ok(rss) => tracing::debug!("RSS now: {}", bytesize::ByteSize::b(rss)),
        Err(e) => tracing::debug!("could not determine RSS: {}", e),
    }
}

/// Progress bar for `len` items in the style used by all commands.
pub fn progress_bar(len: usize) -> Result<indicatif::ProgressBar, anyhow::Error> {
    let pb = indicatif::ProgressBar::new(len as u64);
    pb.set_style(
        indicatif::ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")?
            .progress_chars("##-"),
    );
    Ok(pb)
}

/// Definition of canonical chromosome names.
pub const CHROMS: &[&str] = &[
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15", "16", "17",
    "18", "19", "20", "21", "22", "X", "Y", "MT",
];

/// Build mapping of chromosome name spellings to the index into `CHROMS`.
pub fn build_chrom_map() -> IndexMap<String, usize> {
    let mut result = IndexMap::new();
    for (i, &chrom_name) in CHROMS.iter().enumerate() {
        result.insert(chrom_name.to_owned(), i);
        result.insert(format!("chr{chrom_name}"), i);
        result.insert(chrom_name.to_lowercase(), i);
        result.insert(format!("chr{}", chrom_name.to_lowercase()), i);
    }
    result.insert("M".to_owned(), 24);
    result.insert("m".to_owned(), 24);
    result.insert("chrM".to_owned(), 24);
    result.insert("chrm".to_owned(), 24);
    result
}

/// Canonicalize chromosome name, e.g., `chr1` to `1` and `chrM` to `MT`.
///
/// Names that are not known are returned unchanged.
pub fn canonicalize(chrom: &str) -> String {
    thread_local! {
        static CHROM_MAP: IndexMap<String, usize> = build_chrom_map();
    }
    CHROM_MAP.with(|map| match map.get(chrom) {
        Some(idx) => CHROMS[*idx].to_owned(),
        None => chrom.to_owned(),
    })
}

/// Select the genome release to use.
#[derive(
    clap::ValueEnum,
    Clone,
    Copy,
    Debug,
    Default,
    strum::Display,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum GenomeRelease {
    /// GRCh37 / hg19
    #[strum(serialize = "grch37")]
    Grch37,
    /// GRCh38 / hg38
    #[default]
    #[strum(serialize = "grch38")]
    Grch38,
}

impl GenomeRelease {
    pub fn name(&self) -> String {
        match self {
            GenomeRelease::Grch37 => String::from("GRCh37"),
            GenomeRelease::Grch38 => String::from("GRCh38"),
        }
    }
}

impl std::str::FromStr for GenomeRelease {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_ascii_lowercase();
        if s.starts_with("grch37") || s == "hg19" {
            Ok(GenomeRelease::Grch37)
        } else if s.starts_with("grch38") || s == "hg38" {
            Ok(GenomeRelease::Grch38)
        } else {
            Err(anyhow::anyhow!("Unknown genome release: {}", s))
        }
    }
}

/// The version of the `auto-pvs1` package.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[rstest::rstest]
    #[case("1", "1")]
    #[case("chr1", "1")]
    #[case("chrX", "X")]
    #[case("x", "X")]
    #[case("chrM", "MT")]
    #[case("M", "MT")]
    #[case("MT", "MT")]
    #[case("GL000192.1", "GL000192.1")]
    fn canonicalize_chrom(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(canonicalize(input), expected);
    }

    #[rstest::rstest]
    #[case("GRCh37", GenomeRelease::Grch37)]
    #[case("grch37", GenomeRelease::Grch37)]
    #[case("hg19", GenomeRelease::Grch37)]
    #[case("GRCh38", GenomeRelease::Grch38)]
    #[case("hg38", GenomeRelease::Grch38)]
    fn genome_release_from_str(
        #[case] input: &str,
        #[case] expected: GenomeRelease,
    ) -> Result<(), anyhow::Error> {
        assert_eq!(input.parse::<GenomeRelease>()?, expected);
        Ok(())
    }

    #[test]
    fn genome_release_from_str_unknown() {
        assert!("hg18".parse::<GenomeRelease>().is_err());
    }
}
