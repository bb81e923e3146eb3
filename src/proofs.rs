use tracing::debug;

use crate::error::Result;
use crate::models::{PackageIdentity, ReviewRecord, ReviewScore};

/// Separator between documents in `cargo crev proof find` output
pub const DOCUMENT_SEPARATOR: &str = "---\n";

/// Parse a single review document. Unknown keys are ignored.
pub fn parse_review_record(text: &str) -> Result<ReviewRecord> {
    Ok(serde_yaml::from_str(text)?)
}

pub fn parse_review_score(text: &str) -> Result<ReviewScore> {
    Ok(serde_yaml::from_str(text)?)
}

pub fn parse_package_identity(text: &str) -> Result<PackageIdentity> {
    Ok(serde_yaml::from_str(text)?)
}

/// Split multi-document output on `---\n`, dropping blank segments
pub fn split_documents(output: &str) -> impl Iterator<Item = &str> {
    output
        .split(DOCUMENT_SEPARATOR)
        .filter(|segment| !segment.trim().is_empty())
}

/// Parse every document in `output`, in order.
///
/// One malformed document fails the whole batch.
pub fn parse_review_records(output: &str) -> Result<Vec<ReviewRecord>> {
    let records = split_documents(output)
        .map(parse_review_record)
        .collect::<Result<Vec<_>>>()?;

    debug!(count = records.len(), "Parsed review documents");

    Ok(records)
}
