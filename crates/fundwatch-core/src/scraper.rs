//! Net worth scraper for fund quote pages.
//!
//! The quote page carries one summary table. Its header cells name the
//! published figures and its right-aligned data cells hold the values in
//! the same order, minus the quote-date column which has no right-aligned
//! cell. The latest net worth is the value under the `最新淨值` header.

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tracing::{debug, error};

use crate::utils::html::{elements, Element};

/// Class attribute of the summary table
pub const TABLE_CLASS: &str = "table table-striped table-bordered reversion-xs page-break-inside-avoid";

/// Header of the latest net worth column
pub const NET_WORTH_FIELD: &str = "最新淨值";

/// Header excluded from the field list (it has no matching value cell)
pub const SKIPPED_FIELD: &str = "淨值日期";

/// Class of the value cells
pub const VALUE_CLASS: &str = "text-right";

/// Returned in place of a value when the net worth cannot be found
pub const NOT_FOUND: &str = "unfind net worth";

/// Page fetch timeout in seconds
const FETCH_TIMEOUT_SECS: u64 = 15;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Failed to fetch page: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("Page returned status {0}")]
    Status(u16),

    #[error("Expected exactly one summary table, found {0}")]
    TableCount(usize),

    #[error("{field} is not in the list {fields:?}")]
    FieldMissing { field: String, fields: Vec<String> },

    #[error("Value index {index} out of range for {len} values")]
    ValueMissing { index: usize, len: usize },
}

/// Anything that can report a fund's latest net worth.
/// Implementations return `NOT_FOUND` rather than failing.
#[allow(async_fn_in_trait)]
pub trait NetWorthSource {
    async fn fetch_net_worth(&self, url: &str) -> String;
}

/// A fetched quote page.
#[derive(Debug, Clone)]
pub struct FundPage {
    html: String,
}

impl FundPage {
    pub fn from_html(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub async fn fetch(client: &Client, url: &str) -> Result<Self, ScrapeError> {
        debug!(url = url, "Fetching fund page");
        let response = client
            .get(url)
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ScrapeError::Status(response.status().as_u16()));
        }
        Ok(Self::from_html(response.text().await?))
    }

    fn table(&self) -> Result<Element<'_>, ScrapeError> {
        let tables: Vec<_> = elements(&self.html, "table")
            .into_iter()
            .filter(|t| t.class() == TABLE_CLASS)
            .collect();
        match tables.as_slice() {
            [table] => Ok(*table),
            _ => Err(ScrapeError::TableCount(tables.len())),
        }
    }

    /// Header texts, excluding the quote-date header
    pub fn fields(&self) -> Result<Vec<String>, ScrapeError> {
        Ok(elements(self.table()?.inner, "th")
            .iter()
            .map(Element::text)
            .filter(|text| text != SKIPPED_FIELD)
            .collect())
    }

    /// Right-aligned data cell texts
    pub fn values(&self) -> Result<Vec<String>, ScrapeError> {
        Ok(elements(self.table()?.inner, "td")
            .iter()
            .filter(|td| td.has_class(VALUE_CLASS))
            .map(Element::text)
            .collect())
    }

    pub fn net_worth(&self) -> Result<String, ScrapeError> {
        let fields = self.fields()?;
        let index = fields
            .iter()
            .position(|f| f == NET_WORTH_FIELD)
            .ok_or_else(|| ScrapeError::FieldMissing {
                field: NET_WORTH_FIELD.to_string(),
                fields: fields.clone(),
            })?;

        let mut values = self.values()?;
        let len = values.len();
        if index >= len {
            return Err(ScrapeError::ValueMissing { index, len });
        }
        Ok(values.swap_remove(index))
    }
}

/// Scrapes quote pages over HTTP.
///
/// Each page is fetched once per scraper and kept for later lookups. Failed
/// fetches are not kept, so the next lookup of that URL tries again.
#[derive(Clone)]
pub struct FundPageScraper {
    client: Client,
    pages: RefCell<HashMap<String, FundPage>>,
}

impl FundPageScraper {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            pages: RefCell::new(HashMap::new()),
        }
    }

    /// Number of pages held
    pub fn cached_pages(&self) -> usize {
        self.pages.borrow().len()
    }

    async fn lookup(&self, url: &str) -> Result<String, ScrapeError> {
        if let Some(result) = self.pages.borrow().get(url).map(FundPage::net_worth) {
            debug!(url = url, "Using cached fund page");
            return result;
        }

        let page = FundPage::fetch(&self.client, url).await?;
        let result = page.net_worth();
        self.pages.borrow_mut().insert(url.to_string(), page);
        result
    }
}

impl NetWorthSource for FundPageScraper {
    async fn fetch_net_worth(&self, url: &str) -> String {
        match self.lookup(url).await {
            Ok(value) => {
                debug!(url = url, net_worth = %value, "Found net worth");
                value
            }
            Err(e) => {
                error!(url = url, error = %e, "Net worth lookup failed");
                NOT_FOUND.to_string()
            }
        }
    }
}
