use std::collections::BTreeMap;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

/// One list's first-appearance ISBNs for one published date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListBatch {
    pub list_name_encoded: String,
    pub published_date: String,
    pub isbns: Vec<String>,
}

/// Distinct review URLs collected for one book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewGroup {
    pub isbn: String,
    pub reviews: Vec<String>,
}

/// Canonical first appearance resolved from a book's full ranks history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalAppearance {
    pub primary_isbn: String,
    pub alternative_isbns: Vec<String>,
    pub list_name: String,
    pub bestsellers_date: String,
}

/// Input accepted by the link bot: either the reviews object written by
/// `collect` or the legacy `[url, isbn]` pair array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ReviewInput {
    Keyed(BTreeMap<String, ReviewGroup>),
    Pairs(Vec<Vec<String>>),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobCounters {
    pub total_processed: u64,
    pub books_imported: u64,
    pub tags_added: u64,
    pub tags_already_exist: u64,
    pub links_added: u64,
    pub links_already_exist: u64,
    pub isbns_failed: u64,
}

/// Counters accumulated across one bot run, flushed to disk at normal
/// completion or on interrupt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub input_file: String,
    pub dry_run: bool,
    #[serde(flatten)]
    pub counters: JobCounters,
}

impl JobReport {
    pub fn new(input_file: &str, dry_run: bool) -> Self {
        Self {
            input_file: input_file.to_owned(),
            dry_run,
            counters: JobCounters::default(),
        }
    }
}

pub fn write_json<T: Serialize>(path: &str, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize output json")?;
    std::fs::write(path, json).with_context(|| format!("write output: {path}"))?;
    tracing::info!(%path, "results written");
    Ok(())
}
