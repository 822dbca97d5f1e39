use std::collections::{BTreeMap, HashSet};

use anyhow::Context as _;
use chrono::Days;

use crate::cli::CollectArgs;
use crate::formats::{self, ListBatch, ReviewGroup};
use crate::nyt::{ListsClient, OverviewBook, OverviewResults};

pub async fn run(args: CollectArgs) -> anyhow::Result<()> {
    let today = chrono::Local::now().date_naive();
    let date_start = args
        .date_start
        .or_else(|| today.checked_sub_days(Days::new(30)))
        .context("compute default start date")?;
    let date_end = args.date_end.unwrap_or(today);
    if date_end < date_start {
        anyhow::bail!("--date-end {date_end} is before --date-start {date_start}");
    }

    let client =
        ListsClient::from_env(&args.api_url, args.delay_ms).context("build lists api client")?;

    let mut batches: Vec<ListBatch> = Vec::new();
    let mut reviews: BTreeMap<String, ReviewGroup> = BTreeMap::new();
    let mut seen_isbns: HashSet<String> = HashSet::new();

    let mut current = date_start;
    while current <= date_end {
        let overview = client
            .overview(current)
            .await
            .with_context(|| format!("fetch overview for {current}"))?;

        let extracted = extract_first_appearances(&overview.results, &mut seen_isbns);
        let new_books: usize = extracted.iter().map(|batch| batch.isbns.len()).sum();
        tracing::info!(
            date = %overview.results.published_date,
            lists = overview.results.lists.len(),
            new_books,
            "processed overview"
        );

        batches.extend(extracted);
        extract_reviews(&overview.results, &mut reviews);

        current = current
            .checked_add_days(Days::new(7))
            .context("advance published date")?;
    }

    formats::write_json(&args.output, &batches).context("write appearance batches")?;
    formats::write_json(&args.reviews_output, &reviews).context("write reviews")?;
    tracing::info!(
        total = seen_isbns.len(),
        start = %date_start,
        end = %date_end,
        "collection complete"
    );

    Ok(())
}

/// Upstream signals a debut inconsistently: weekly lists start at
/// `weeks_on_list == 1`, monthly lists at `weeks_on_list == 0`. The asymmetry
/// is preserved as-is; an unknown cadence never counts as a debut.
pub fn first_time_on_list(cadence: &str, weeks_on_list: i64) -> bool {
    match cadence {
        "WEEKLY" => weeks_on_list == 1,
        "MONTHLY" => weeks_on_list == 0,
        _ => false,
    }
}

/// One batch per list, in API order, empty or not. Emitted ISBNs land in
/// `seen_isbns`; an ISBN already there is skipped even when the debut
/// predicate fires, because monthly lists do not reliably advance
/// `weeks_on_list` between weekly fetches.
pub fn extract_first_appearances(
    results: &OverviewResults,
    seen_isbns: &mut HashSet<String>,
) -> Vec<ListBatch> {
    let mut batches = Vec::with_capacity(results.lists.len());

    for list in &results.lists {
        let mut batch = ListBatch {
            list_name_encoded: list.list_name_encoded.clone(),
            published_date: results.published_date.clone(),
            isbns: Vec::new(),
        };

        for book in &list.books {
            if !first_time_on_list(&list.updated, book.weeks_on_list) {
                continue;
            }
            let Some(isbn) = preferred_isbn(book) else {
                continue;
            };
            if seen_isbns.insert(isbn.clone()) {
                batch.isbns.push(isbn);
            }
        }

        batches.push(batch);
    }

    batches
}

/// Unions every book's review URLs into the per-ISBN groups, regardless of
/// whether the book is a debut; repeat appearances across lists and weeks
/// only add URLs not already recorded.
pub fn extract_reviews(results: &OverviewResults, reviews: &mut BTreeMap<String, ReviewGroup>) {
    for list in &results.lists {
        for book in &list.books {
            let urls: Vec<&str> = [
                book.book_review_link.as_str(),
                book.sunday_review_link.as_str(),
            ]
            .into_iter()
            .filter(|url| !url.is_empty())
            .collect();
            if urls.is_empty() {
                continue;
            }

            let Some(isbn) = preferred_isbn(book) else {
                continue;
            };
            let group = reviews.entry(isbn.clone()).or_insert_with(|| ReviewGroup {
                isbn,
                reviews: Vec::new(),
            });
            for url in urls {
                if !group.reviews.iter().any(|existing| existing == url) {
                    group.reviews.push(url.to_owned());
                }
            }
        }
    }
}

/// Prefer the 13-digit identifier; fall back to the 10-digit one when the
/// 13-digit field is absent or the wrong length.
fn preferred_isbn(book: &OverviewBook) -> Option<String> {
    if book.primary_isbn13.len() == 13 {
        return Some(book.primary_isbn13.clone());
    }
    if !book.primary_isbn10.is_empty() {
        return Some(book.primary_isbn10.clone());
    }
    None
}
