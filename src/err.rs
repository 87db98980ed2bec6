//! Error types for the PVS1 classification core.

/// Errors raised while classifying a single variant on a single transcript.
///
/// None of these abort a batch; they are reported per variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The coordinate does not fall into any exon of the transcript.
    #[error("position {pos} is outside of the exons of transcript {tx_id}")]
    OutOfTranscriptRange { tx_id: String, pos: i64 },
    /// The variant is of a type that no classifier rule covers.
    #[error("unsupported variant class: {0}")]
    UnsupportedVariantClass(String),
    /// A decision node required data that could not be supplied.
    #[error("classification failed, precondition not met: {0}")]
    Classification(String),
    /// The transcript record violates the model invariants.
    #[error("invalid transcript {tx_id}: {reason}")]
    InvalidTranscript { tx_id: String, reason: String },
    /// The variant description could not be parsed.
    #[error("invalid variant description: {0:?}")]
    InvalidVariant(String),
    /// No transcript of the reference snapshot matches.
    #[error("unknown transcript: {0}")]
    UnknownTranscript(String),
}

impl Error {
    /// Short stable token for serializing the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::OutOfTranscriptRange { .. } => "out-of-transcript-range",
            Error::UnsupportedVariantClass(_) => "unsupported-variant-class",
            Error::Classification(_) => "classification-error",
            Error::InvalidTranscript { .. } => "invalid-transcript",
            Error::InvalidVariant(_) => "invalid-variant",
            Error::UnknownTranscript(_) => "unknown-transcript",
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::Error;

    #[rstest::rstest]
    #[case(Error::OutOfTranscriptRange { tx_id: "NM_1.1".into(), pos: 5 }, "out-of-transcript-range")]
    #[case(Error::UnsupportedVariantClass("mnv".into()), "unsupported-variant-class")]
    #[case(Error::Classification("no exon".into()), "classification-error")]
    #[case(Error::UnknownTranscript("NM_2.1".into()), "unknown-transcript")]
    fn kind(#[case] err: Error, #[case] expected: &str) {
        assert_eq!(err.kind(), expected);
    }

    #[test]
    fn display_names_precondition() {
        let err = Error::Classification("transcript sequence required".into());
        assert_eq!(
            err.to_string(),
            "classification failed, precondition not met: transcript sequence required"
        );
    }
}
