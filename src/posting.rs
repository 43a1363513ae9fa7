use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::detail::PostingDetails;
use crate::links::Candidate;

/// One output row. Field order here is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub job_title: String,
    pub location: Option<String>,
    pub post_date: Option<String>,
    pub link: String,
    pub scraped_at: String,
}

impl JobPosting {
    pub fn assemble(candidate: Candidate, details: PostingDetails, scraped_at: DateTime<Utc>) -> Self {
        Self {
            job_title: candidate.title,
            location: details.location,
            post_date: details.post_date,
            link: candidate.link.into(),
            scraped_at: scraped_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}
