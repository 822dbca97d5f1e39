use anyhow::Context as _;

use crate::cli::HistoryArgs;
use crate::formats::{self, CanonicalAppearance};
use crate::nyt::{HistoryResult, ListsClient, RankHistoryEntry};

pub async fn run(args: HistoryArgs) -> anyhow::Result<()> {
    let client =
        ListsClient::from_env(&args.api_url, args.delay_ms).context("build lists api client")?;

    let list = client
        .list(&args.list, args.published_date)
        .await
        .with_context(|| format!("fetch list {}", args.list))?;

    let mut appearances: Vec<CanonicalAppearance> = Vec::new();
    for (index, entry) in list.results.iter().enumerate() {
        if args.limit != 0 && index >= args.limit {
            break;
        }

        let Some(details) = entry.book_details.first() else {
            tracing::warn!("list entry without book details; skipping");
            continue;
        };
        let isbn = &details.primary_isbn13;

        tracing::info!(%isbn, "resolving ranks history");
        let history = client
            .history(isbn)
            .await
            .with_context(|| format!("fetch history for {isbn}"))?;

        match canonical_appearance(&history.results) {
            Some(appearance) => appearances.push(appearance),
            None => tracing::warn!(%isbn, "no ranks history; skipping"),
        }
    }

    formats::write_json(&args.output, &appearances).context("write canonical appearances")?;
    tracing::info!(
        resolved = appearances.len(),
        list = %args.list,
        "history resolution complete"
    );

    Ok(())
}

/// Flattens a history response into the one defining appearance, or `None`
/// when the book has no results or an empty ranks history.
pub fn canonical_appearance(results: &[HistoryResult]) -> Option<CanonicalAppearance> {
    let first = results.first()?;
    let chosen = choose_bestseller_list(&first.ranks_history)?;
    Some(CanonicalAppearance {
        primary_isbn: chosen.primary_isbn13.clone(),
        alternative_isbns: alternative_isbns(first),
        list_name: chosen.list_name.clone(),
        bestsellers_date: chosen.bestsellers_date.format("%Y-%m-%d").to_string(),
    })
}

/// A book may sit on many lists at once. The defining appearance is the
/// oldest one; date ties go to the shortest list name, which biases against
/// the long "combined" list names. A double tie falls back to the first
/// entry in upstream order.
pub fn choose_bestseller_list(ranks_history: &[RankHistoryEntry]) -> Option<&RankHistoryEntry> {
    let oldest_date = ranks_history
        .iter()
        .map(|entry| entry.bestsellers_date)
        .min()?;
    let oldest: Vec<&RankHistoryEntry> = ranks_history
        .iter()
        .filter(|entry| entry.bestsellers_date == oldest_date)
        .collect();

    let shortest_name = oldest.iter().map(|entry| entry.list_name.len()).min()?;
    oldest
        .into_iter()
        .find(|entry| entry.list_name.len() == shortest_name)
}

/// Keeps each identifier of the expected length; the upstream sometimes
/// nulls or truncates one side of a pair.
fn alternative_isbns(result: &HistoryResult) -> Vec<String> {
    let mut isbns = Vec::new();
    for pair in &result.isbns {
        if let Some(isbn10) = &pair.isbn10
            && isbn10.len() == 10
        {
            isbns.push(isbn10.clone());
        }
        if let Some(isbn13) = &pair.isbn13
            && isbn13.len() == 13
        {
            isbns.push(isbn13.clone());
        }
    }
    isbns
}
