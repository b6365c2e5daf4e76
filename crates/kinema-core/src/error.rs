use thiserror::Error;

/// Fatal parse failure. Anything less than a malformed document degrades to
/// a skipped node plus a warning on the composition instead.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed composition document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read composition document: {0}")]
    Io(#[from] std::io::Error),
}

/// Two shapes (or gradients) with different element counts cannot be
/// interpolated. This is an authoring defect in the document, reported to
/// the caller of the morph rather than aborting the composition.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("cannot morph shapes with different curve counts ({a} vs {b})")]
pub struct TopologyError {
    pub a: usize,
    pub b: usize,
}
