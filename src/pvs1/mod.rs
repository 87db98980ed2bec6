//! PVS1 classification core.

pub mod annotation;
pub mod consequence;
pub mod engine;
pub mod exon_skip;
pub mod nmd;
pub mod transcript;
pub mod variant;

use serde::{Deserialize, Serialize};

use crate::conf::EngineConf;
use crate::err::Error;

pub use annotation::{AnnotationDb, AnnotationFacts, AnnotationLookup};
pub use consequence::Consequence;
pub use engine::{DecisionEngine, Pvs1Strength, RuleNode};
pub use transcript::Transcript;
pub use variant::{Variant, VariantInput};

/// PVS1 verdict for one variant on one transcript.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Identifier of the variant as given by the caller.
    pub variant_id: String,
    pub transcript_id: String,
    pub gene_id: String,
    pub consequence: Consequence,
    pub strength: Pvs1Strength,
    /// Decision tree nodes in the order visited.
    pub rationale: Vec<RuleNode>,
    pub facts: Option<AnnotationFacts>,
}

/// Classify `variant` on `tx` and walk the decision tree.
pub fn predict<L: AnnotationLookup + ?Sized>(
    variant_id: &str,
    variant: &Variant,
    tx: &Transcript,
    lookup: &L,
    conf: &EngineConf,
) -> Result<Verdict, Error> {
    let consequence = consequence::classify(variant, tx)?;
    tracing::debug!("{} on {}: {}", variant, tx.id(), consequence.name());
    let decision = DecisionEngine::new(conf, lookup).evaluate(tx, &consequence)?;

    Ok(Verdict {
        variant_id: variant_id.to_owned(),
        transcript_id: tx.id().to_owned(),
        gene_id: tx.gene_id().to_owned(),
        consequence,
        strength: decision.strength,
        rationale: decision.rationale,
        facts: decision.facts,
    })
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::pvs1::annotation::test::{empty_db, region};
    use crate::pvs1::transcript::{test::five_exon_tx_with_seq, Strand};

    #[rstest::rstest]
    // stop gained in the last exon
    #[case("1-5102-C-A", Pvs1Strength::Moderate, "nonsense")]
    // frameshift early in the CDS
    #[case("1-1061-C-", Pvs1Strength::VeryStrong, "frameshift")]
    // donor of exon 3 (out-of-frame skip upstream of the NMD window)
    #[case("1-3122-G-A", Pvs1Strength::VeryStrong, "splice-donor")]
    #[case("1-1051-A-G", Pvs1Strength::VeryStrong, "initiation-loss")]
    // intronic
    #[case("1-1500-A-G", Pvs1Strength::Unmet, "not-applicable")]
    fn predict_genomic(
        #[case] text: &str,
        #[case] strength: Pvs1Strength,
        #[case] consequence: &str,
    ) -> Result<(), anyhow::Error> {
        let tx = five_exon_tx_with_seq(Strand::Plus);
        let variant = match text.parse::<VariantInput>()? {
            VariantInput::Genomic { variant, .. } => variant,
            input => anyhow::bail!("unexpected input {:?}", input),
        };
        let verdict = predict("var1", &variant, &tx, &empty_db(), &EngineConf::default())?;

        assert_eq!(verdict.consequence.name(), consequence);
        assert_eq!(verdict.strength, strength);
        assert_eq!(verdict.variant_id, "var1");
        assert_eq!(verdict.transcript_id, "NM_000001.1");
        Ok(())
    }

    #[test]
    fn not_applicable_serializes_without_facts() -> Result<(), anyhow::Error> {
        let tx = five_exon_tx_with_seq(Strand::Plus);
        let variant = Variant::new("1", 1500, "A", "G")?;
        let verdict = predict("var1", &variant, &tx, &empty_db(), &EngineConf::default())?;
        assert_eq!(
            serde_json::to_string(&verdict)?,
            r#"{"variant_id":"var1","transcript_id":"NM_000001.1","gene_id":"HGNC:1","consequence":{"kind":"not-applicable"},"strength":"unmet","rationale":["consequence-not-applicable"]}"#
        );
        Ok(())
    }

    #[test]
    fn exon_duplication_in_domain() -> Result<(), anyhow::Error> {
        let tx = five_exon_tx_with_seq(Strand::Plus);
        let mut builder = AnnotationDb::builder(Default::default());
        builder.add_domain(region("NM_000001.1", 2050, 2060));
        let db = builder.build();
        let variant: VariantInput = "1:1901-2500:DUP".parse()?;
        let variant = variant.resolve(&tx)?;

        let verdict = predict("dup", &variant, &tx, &db, &EngineConf::default())?;
        assert_eq!(verdict.strength, Pvs1Strength::Strong);
        assert_eq!(
            verdict.rationale,
            vec![
                RuleNode::ExonDeletionDuplication,
                RuleNode::ExonSkipInFrame,
                RuleNode::CriticalRegionRemoved
            ]
        );
        Ok(())
    }

    #[test]
    fn frameshift_read_through_over_domain() -> Result<(), anyhow::Error> {
        let tx = five_exon_tx_with_seq(Strand::Plus);
        let mut builder = AnnotationDb::builder(Default::default());
        builder.add_domain(region("NM_000001.1", 3010, 3100));
        let db = builder.build();
        let variant = "NM_000001.1:c.101dup".parse::<VariantInput>()?.resolve(&tx)?;

        let verdict = predict("dup", &variant, &tx, &db, &EngineConf::default())?;
        assert_eq!(
            verdict.consequence,
            Consequence::Frameshift {
                ptc: 662,
                altered_from: 151
            }
        );
        assert_eq!(verdict.strength, Pvs1Strength::VeryStrong);
        assert_eq!(
            verdict.rationale,
            vec![
                RuleNode::NullVariant,
                RuleNode::NmdEscaped,
                RuleNode::CriticalRegionMajorTruncation
            ]
        );
        Ok(())
    }

    #[test]
    fn unsupported_class_is_error() -> Result<(), anyhow::Error> {
        let tx = five_exon_tx_with_seq(Strand::Plus);
        let variant = Variant::new("1", 1055, "CA", "TT")?;
        assert!(matches!(
            predict("mnv", &variant, &tx, &empty_db(), &EngineConf::default()),
            Err(Error::UnsupportedVariantClass(_))
        ));
        Ok(())
    }
}
