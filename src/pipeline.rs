use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::{Heuristics, ScrapeConfig};
use crate::detail::{fetch_details, PostingDetails};
use crate::error::FetchError;
use crate::fetch::Fetch;
use crate::links::detect_candidates;
use crate::output::write_postings;
use crate::posting::JobPosting;

#[derive(Debug, Default)]
pub struct RunReport {
    pub postings: Vec<JobPosting>,
    pub fallback_used: bool,
    /// Detail pages that could not be fetched. Their rows have no date or location.
    pub detail_failures: usize,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    pub rows_written: usize,
}

/// Fetch the base page and turn its candidate links into postings.
///
/// Only the base page fetch can fail. Detail pages are fetched one at a time in
/// candidate order, and only for keyword matches; container fallback rows are
/// produced without visiting the linked pages.
pub fn collect_postings(
    config: &ScrapeConfig,
    heuristics: &Heuristics,
    fetcher: &dyn Fetch,
) -> Result<RunReport, FetchError> {
    info!("Fetching {}", config.base_url);
    let html = fetcher.fetch_base(&config.base_url)?;

    let detection = detect_candidates(&html, &config.base_url, heuristics);
    info!(
        "Found {} candidate links{}",
        detection.candidates.len(),
        if detection.fallback { " (container fallback)" } else { "" }
    );

    let mut report = RunReport {
        fallback_used: detection.fallback,
        ..RunReport::default()
    };

    for candidate in detection.candidates {
        let scraped_at = Utc::now();

        let details = if detection.fallback {
            PostingDetails::default()
        } else {
            match fetch_details(fetcher, &candidate.link, heuristics) {
                Ok(details) => details,
                Err(e) => {
                    debug!("Detail fetch for '{}' failed: {}", candidate.href, e);
                    report.detail_failures += 1;
                    PostingDetails::default()
                }
            }
        };

        report
            .postings
            .push(JobPosting::assemble(candidate, details, scraped_at));
    }

    if report.detail_failures > 0 {
        warn!(
            "{} of {} detail pages could not be fetched",
            report.detail_failures,
            report.postings.len()
        );
    }

    Ok(report)
}

/// Collect postings and write them to the configured output file.
///
/// Nothing is written if the base page fetch fails.
pub fn run(
    config: &ScrapeConfig,
    heuristics: &Heuristics,
    fetcher: &dyn Fetch,
) -> anyhow::Result<RunOutcome> {
    let report = collect_postings(config, heuristics, fetcher)?;
    let rows_written = write_postings(&config.output, &report.postings)?;
    info!("Wrote {} rows to {}", rows_written, config.output.display());

    Ok(RunOutcome {
        report,
        rows_written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::read_postings;
    use chrono::DateTime;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;
    use url::Url;

    enum Canned {
        Body(&'static str),
        Status(u16),
        Timeout,
    }

    /// In-memory site keyed by absolute URL. Unknown URLs answer 404.
    #[derive(Default)]
    struct StaticSite {
        pages: HashMap<String, Canned>,
        detail_requests: RefCell<Vec<String>>,
    }

    impl StaticSite {
        fn with(mut self, url: &str, page: Canned) -> Self {
            self.pages.insert(url.to_string(), page);
            self
        }

        fn answer(&self, url: &Url) -> Result<String, FetchError> {
            match self.pages.get(url.as_str()) {
                Some(Canned::Body(body)) => Ok(body.to_string()),
                Some(Canned::Status(status)) => Err(FetchError::Status {
                    url: url.to_string(),
                    status: *status,
                }),
                Some(Canned::Timeout) => Err(FetchError::Timeout {
                    url: url.to_string(),
                }),
                None => Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }

    impl Fetch for StaticSite {
        fn fetch_base(&self, url: &Url) -> Result<String, FetchError> {
            self.answer(url)
        }

        fn fetch_detail(&self, url: &Url) -> Result<String, FetchError> {
            self.detail_requests.borrow_mut().push(url.to_string());
            self.answer(url)
        }
    }

    const BASE: &str = "https://www.ibps.in/";

    fn config(dir: &TempDir) -> ScrapeConfig {
        ScrapeConfig::new(BASE, dir.path().join("ibps_jobs.csv"), 15, 12, false).unwrap()
    }

    #[test]
    fn test_end_to_end_meta_date_without_location() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let site = StaticSite::default()
            .with(
                BASE,
                Canned::Body(r#"<html><body><a href="/notice/1">Recruitment Notification 2025</a></body></html>"#),
            )
            .with(
                "https://www.ibps.in/notice/1",
                Canned::Body(r#"<html><head><meta name="date" content="2025-01-10"></head><body><p>Apply online.</p></body></html>"#),
            );

        let outcome = run(&config, &Heuristics::default(), &site).unwrap();
        assert_eq!(outcome.rows_written, 1);
        assert!(!outcome.report.fallback_used);
        assert_eq!(outcome.report.detail_failures, 0);

        let raw = fs::read_to_string(&config.output).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "job_title,location,post_date,link,scraped_at");
        let prefix = "Recruitment Notification 2025,,2025-01-10,https://www.ibps.in/notice/1,";
        assert!(lines[1].starts_with(prefix), "row was {}", lines[1]);
        assert!(DateTime::parse_from_rfc3339(&lines[1][prefix.len()..]).is_ok());
    }

    #[test]
    fn test_base_timeout_leaves_existing_output_untouched() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        fs::write(&config.output, "previous run\n").unwrap();
        let site = StaticSite::default().with(BASE, Canned::Timeout);

        let err = run(&config, &Heuristics::default(), &site).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FetchError>(),
            Some(FetchError::Timeout { .. })
        ));
        assert_eq!(fs::read_to_string(&config.output).unwrap(), "previous run\n");
    }

    #[test]
    fn test_base_fetch_failure_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let site = StaticSite::default().with(BASE, Canned::Status(500));

        assert!(run(&config, &Heuristics::default(), &site).is_err());
        assert!(!config.output.exists());
    }

    #[test]
    fn test_detail_failures_are_counted_not_fatal() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let site = StaticSite::default()
            .with(
                BASE,
                Canned::Body(
                    r#"<a href="/po">PO Recruitment</a>
                       <a href="/clerk">Clerk Recruitment</a>
                       <a href="/so">SO Vacancy</a>"#,
                ),
            )
            .with(
                "https://www.ibps.in/po",
                Canned::Body("<p>Location: Mumbai, India</p><p>Published on 05 Mar 2025</p>"),
            )
            .with("https://www.ibps.in/clerk", Canned::Timeout)
            .with("https://www.ibps.in/so", Canned::Status(403));

        let outcome = run(&config, &Heuristics::default(), &site).unwrap();
        let report = &outcome.report;
        assert_eq!(report.detail_failures, 2);
        assert_eq!(report.postings.len(), 3);
        assert_eq!(report.postings[0].location.as_deref(), Some("Mumbai, India"));
        assert_eq!(report.postings[0].post_date.as_deref(), Some("05 Mar 2025"));
        assert_eq!(report.postings[1].location, None);
        assert_eq!(report.postings[2].post_date, None);

        // Candidate order is preserved and each detail page is requested once.
        assert_eq!(
            *site.detail_requests.borrow(),
            vec![
                "https://www.ibps.in/po",
                "https://www.ibps.in/clerk",
                "https://www.ibps.in/so",
            ]
        );
        assert_eq!(read_postings(&config.output).unwrap(), report.postings);
    }

    #[test]
    fn test_fallback_rows_skip_detail_fetch() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let site = StaticSite::default().with(
            BASE,
            Canned::Body(
                r#"<div class="latest-news">
                     <a href="/item/1">PO exam schedule</a>
                     <a href="/item/2">Score cards</a>
                   </div>"#,
            ),
        );

        let outcome = run(&config, &Heuristics::default(), &site).unwrap();
        assert!(outcome.report.fallback_used);
        assert_eq!(outcome.rows_written, 2);
        assert!(site.detail_requests.borrow().is_empty());
        for posting in &outcome.report.postings {
            assert_eq!(posting.location, None);
            assert_eq!(posting.post_date, None);
        }

        let raw = fs::read_to_string(&config.output).unwrap();
        assert!(raw
            .lines()
            .nth(1)
            .unwrap()
            .starts_with("PO exam schedule,,,https://www.ibps.in/item/1,"));
    }

    #[test]
    fn test_no_candidates_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let site = StaticSite::default().with(BASE, Canned::Body("<a href='/about'>About</a>"));

        let outcome = run(&config, &Heuristics::default(), &site).unwrap();
        assert_eq!(outcome.rows_written, 0);
        assert!(outcome.report.postings.is_empty());
        assert_eq!(
            fs::read_to_string(&config.output).unwrap(),
            "job_title,location,post_date,link,scraped_at\n"
        );
    }

    #[test]
    fn test_scraped_at_is_non_decreasing() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let site = StaticSite::default().with(
            BASE,
            Canned::Body(r#"<a href="/1">Career 1</a><a href="/2">Career 2</a><a href="/3">Career 3</a>"#),
        );

        let report = collect_postings(&config, &Heuristics::default(), &site).unwrap();
        let stamps: Vec<DateTime<chrono::FixedOffset>> = report
            .postings
            .iter()
            .map(|p| DateTime::parse_from_rfc3339(&p.scraped_at).unwrap())
            .collect();
        assert_eq!(stamps.len(), 3);
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }
}
