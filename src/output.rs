use std::path::Path;

use anyhow::Context;
use csv::WriterBuilder;

use crate::posting::JobPosting;

pub const COLUMNS: [&str; 5] = ["job_title", "location", "post_date", "link", "scraped_at"];

/// Write postings to `path`, replacing any existing file. Returns rows written.
///
/// The header is written explicitly so an empty run still produces it.
pub fn write_postings(path: &Path, postings: &[JobPosting]) -> anyhow::Result<usize> {
    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    wtr.write_record(COLUMNS)?;
    for posting in postings {
        wtr.serialize(posting)?;
    }
    wtr.flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(postings.len())
}

#[cfg(test)]
pub fn read_postings(path: &Path) -> anyhow::Result<Vec<JobPosting>> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let headers = rdr.headers()?.clone();
    anyhow::ensure!(
        headers.iter().eq(COLUMNS.iter().copied()),
        "Unexpected header: {:?}",
        headers
    );

    let mut postings = Vec::new();
    for result in rdr.deserialize() {
        postings.push(result?);
    }
    Ok(postings)
}
