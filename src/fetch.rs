use std::time::Duration;

use reqwest::blocking::{Client, ClientBuilder};
use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use crate::config::ScrapeConfig;
use crate::error::FetchError;

const USER_AGENT: &str = concat!("ibps-scraper/", env!("CARGO_PKG_VERSION"));

/// Source of page bodies for the pipeline.
pub trait Fetch {
    /// Fetch the page holding the candidate links. Any 2xx is accepted.
    fn fetch_base(&self, url: &Url) -> Result<String, FetchError>;

    /// Fetch a candidate's detail page. Only 200 is accepted.
    fn fetch_detail(&self, url: &Url) -> Result<String, FetchError>;
}

/// Blocking HTTP fetcher with one client per kind of request.
pub struct HttpFetcher {
    page: Client,
    detail: Client,
}

impl HttpFetcher {
    pub fn new(config: &ScrapeConfig) -> Result<Self, FetchError> {
        // The certificate exception applies to the base page only.
        let page = client_builder(config.page_timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(FetchError::Client)?;
        let detail = client_builder(config.detail_timeout)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { page, detail })
    }

    fn get(
        client: &Client,
        url: &Url,
        accept: impl Fn(StatusCode) -> bool,
    ) -> Result<String, FetchError> {
        debug!("GET {}", url);
        let response = client
            .get(url.clone())
            .send()
            .map_err(|e| FetchError::from_send(url.as_str(), e))?;

        let status = response.status();
        if !accept(status) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().map_err(|source| {
            if source.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Body {
                    url: url.to_string(),
                    source,
                }
            }
        })
    }
}

impl Fetch for HttpFetcher {
    fn fetch_base(&self, url: &Url) -> Result<String, FetchError> {
        Self::get(&self.page, url, |s| s.is_success())
    }

    fn fetch_detail(&self, url: &Url) -> Result<String, FetchError> {
        Self::get(&self.detail, url, |s| s == StatusCode::OK)
    }
}

fn client_builder(timeout: Duration) -> ClientBuilder {
    Client::builder().user_agent(USER_AGENT).timeout(timeout)
}
