use std::time::Duration;

use anyhow::Context as _;
use chrono::NaiveDate;
use serde::Deserialize;

/// How many times a rate-limited request is retried before the run aborts.
const RATE_LIMIT_RETRIES: u32 = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct OverviewResponse {
    pub results: OverviewResults,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverviewResults {
    pub published_date: String,
    #[serde(default)]
    pub lists: Vec<OverviewList>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverviewList {
    pub list_name_encoded: String,
    /// Publication cadence as reported upstream: "WEEKLY" or "MONTHLY".
    #[serde(default)]
    pub updated: String,
    #[serde(default)]
    pub books: Vec<OverviewBook>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverviewBook {
    #[serde(default)]
    pub primary_isbn13: String,
    #[serde(default)]
    pub primary_isbn10: String,
    #[serde(default)]
    pub weeks_on_list: i64,
    #[serde(default)]
    pub book_review_link: String,
    #[serde(default)]
    pub sunday_review_link: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse {
    #[serde(default)]
    pub results: Vec<ListEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListEntry {
    #[serde(default)]
    pub book_details: Vec<BookDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookDetails {
    #[serde(default)]
    pub primary_isbn13: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub results: Vec<HistoryResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResult {
    #[serde(default)]
    pub isbns: Vec<IsbnPair>,
    #[serde(default)]
    pub ranks_history: Vec<RankHistoryEntry>,
}

/// The upstream sometimes nulls out one side of the pair.
#[derive(Debug, Clone, Deserialize)]
pub struct IsbnPair {
    #[serde(default)]
    pub isbn10: Option<String>,
    #[serde(default)]
    pub isbn13: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankHistoryEntry {
    pub list_name: String,
    pub bestsellers_date: NaiveDate,
    #[serde(default)]
    pub primary_isbn13: String,
}

pub struct ListsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    request_delay: Duration,
}

impl ListsClient {
    /// Reads the API key from `NYT_API_KEY`. `delay_ms` is both the
    /// inter-request delay and the 429 backoff.
    pub fn from_env(base_url: &str, delay_ms: u64) -> anyhow::Result<Self> {
        let api_key =
            std::env::var("NYT_API_KEY").map_err(|_| anyhow::anyhow!("NYT_API_KEY is not set"))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("build lists api http client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key,
            request_delay: Duration::from_millis(delay_ms),
        })
    }

    pub async fn overview(&self, published_date: NaiveDate) -> anyhow::Result<OverviewResponse> {
        self.get_json(
            "/svc/books/v3/lists/full-overview.json",
            &[("published_date", format_date(published_date))],
        )
        .await
    }

    pub async fn list(
        &self,
        list_name_encoded: &str,
        published_date: NaiveDate,
    ) -> anyhow::Result<ListResponse> {
        self.get_json(
            "/svc/books/v3/lists.json",
            &[
                ("list", list_name_encoded.to_owned()),
                ("published-date", format_date(published_date)),
            ],
        )
        .await
    }

    pub async fn history(&self, isbn: &str) -> anyhow::Result<HistoryResponse> {
        self.get_json(
            "/svc/books/v3/lists/best-sellers/history.json",
            &[("isbn", isbn.to_owned())],
        )
        .await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> anyhow::Result<T> {
        let url = format!("{}{path}", self.base_url);
        let mut attempts_left = RATE_LIMIT_RETRIES;

        loop {
            let response = self
                .http
                .get(&url)
                .query(&[("api-key", self.api_key.as_str())])
                .query(params)
                .send()
                .await
                .with_context(|| format!("GET {url}"))?;

            let status = response.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS && attempts_left > 0 {
                attempts_left -= 1;
                tracing::warn!(%url, attempts_left, "rate limited; backing off");
                tokio::time::sleep(self.request_delay).await;
                continue;
            }

            let raw = response
                .text()
                .await
                .context("read lists api response body")?;
            if !status.is_success() {
                let message = parse_error_message(&raw).unwrap_or(raw);
                anyhow::bail!("lists api error ({status}): {message}");
            }

            tokio::time::sleep(self.request_delay).await;
            return serde_json::from_str(&raw).with_context(|| format!("parse response: {url}"));
        }
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    if let Some(fault) = value
        .get("fault")
        .and_then(|fault| fault.get("faultstring"))
        .and_then(|v| v.as_str())
    {
        return Some(fault.to_owned());
    }
    value
        .get("errors")?
        .as_array()?
        .first()?
        .as_str()
        .map(str::to_owned)
}
