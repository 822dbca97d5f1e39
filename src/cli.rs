use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Collect first-appearance ISBN groups and review links from the bestseller API.
    Collect(CollectArgs),
    /// Resolve each book on one list to its canonical first appearance.
    History(HistoryArgs),
    /// Add bestseller provenance tags to catalog works.
    Tag(TagArgs),
    /// Add review links to catalog works.
    Link(LinkArgs),
}

#[derive(Debug, Args)]
pub struct CollectArgs {
    /// Output file for first-appearance ISBN groups.
    #[arg(long, default_value = "result.json")]
    pub output: String,

    /// Output file for review links keyed by ISBN.
    #[arg(long, default_value = "reviews.json")]
    pub reviews_output: String,

    /// First published date to fetch (YYYY-MM-DD). Defaults to 30 days ago.
    #[arg(long)]
    pub date_start: Option<NaiveDate>,

    /// Last published date to fetch (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    pub date_end: Option<NaiveDate>,

    /// Base URL of the bestseller list API.
    #[arg(long, default_value = "https://api.nytimes.com")]
    pub api_url: String,

    /// Delay after each API request, and the 429 backoff.
    #[arg(long, default_value_t = 6000)]
    pub delay_ms: u64,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Encoded name of the list to resolve (e.g. hardcover-fiction).
    #[arg(long)]
    pub list: String,

    /// Published date of the list snapshot (YYYY-MM-DD).
    #[arg(long)]
    pub published_date: NaiveDate,

    /// Output file for canonical appearance records.
    #[arg(long, default_value = "history.json")]
    pub output: String,

    /// Maximum number of books to resolve (0 = all).
    #[arg(long, default_value_t = 0)]
    pub limit: usize,

    /// Base URL of the bestseller list API.
    #[arg(long, default_value = "https://api.nytimes.com")]
    pub api_url: String,

    /// Delay after each API request, and the 429 backoff.
    #[arg(long, default_value_t = 6000)]
    pub delay_ms: u64,
}

#[derive(Debug, Args)]
pub struct TagArgs {
    /// Input file of first-appearance ISBN groups (written by `collect`).
    #[arg(long)]
    pub file: String,

    /// Output file for run counters.
    #[arg(long, default_value = "tag_report.json")]
    pub report: String,

    /// Base URL of the catalog API.
    #[arg(long, default_value = "https://openlibrary.org")]
    pub catalog_url: String,

    /// Log catalog mutations without issuing them.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Maximum number of ISBN groups to process (0 = all).
    #[arg(long, default_value_t = 0)]
    pub limit: usize,
}

#[derive(Debug, Args)]
pub struct LinkArgs {
    /// Input file of review links: the `collect` reviews object or `[url, isbn]` pairs.
    #[arg(long)]
    pub file: String,

    /// Output file for run counters.
    #[arg(long, default_value = "link_report.json")]
    pub report: String,

    /// Base URL of the catalog API.
    #[arg(long, default_value = "https://openlibrary.org")]
    pub catalog_url: String,

    /// Log catalog mutations without issuing them.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Maximum number of review records to process (0 = all).
    #[arg(long, default_value_t = 0)]
    pub limit: usize,
}
