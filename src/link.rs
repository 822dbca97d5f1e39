use anyhow::Context as _;

use crate::annotate::{self, LinkMerge};
use crate::catalog::CatalogClient;
use crate::cli::LinkArgs;
use crate::formats::{self, JobReport, ReviewInput};
use crate::interrupt::InterruptFlag;

const SAVE_COMMENT: &str = "Add NYT review link";

pub async fn run(args: LinkArgs) -> anyhow::Result<()> {
    if args.dry_run {
        tracing::info!("dry run: no catalog mutations will be issued");
    }

    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("read reviews file: {}", args.file))?;
    let input: ReviewInput = serde_json::from_str(&raw).context("parse reviews file")?;
    let candidates = review_candidates(input);

    let catalog = CatalogClient::new(&args.catalog_url, args.dry_run).context("build catalog client")?;
    let interrupt = InterruptFlag::listen();

    let mut report = JobReport::new(&args.file, args.dry_run);
    let mut outcome = Ok(());

    for (index, candidate) in candidates.into_iter().enumerate() {
        if args.limit != 0 && index >= args.limit {
            tracing::info!(limit = args.limit, "record limit reached; stopping");
            break;
        }
        if interrupt.is_set() {
            outcome = Err(anyhow::anyhow!("interrupted"));
            break;
        }

        report.counters.total_processed += 1;
        match candidate {
            Ok((isbn, url)) => {
                if let Err(err) = process_record(&catalog, &isbn, &url, &mut report).await {
                    tracing::error!(%isbn, err = format!("{err:#}"), "failed to process isbn");
                    report.counters.isbns_failed += 1;
                }
            }
            Err(err) => {
                tracing::error!(err = format!("{err:#}"), "malformed review record");
                report.counters.isbns_failed += 1;
            }
        }
    }

    formats::write_json(&args.report, &report).context("write job report")?;
    outcome
}

/// Flattens either input shape into `(isbn, url)` candidates. Malformed pair
/// records surface as per-record errors so one bad record never aborts the
/// batch.
fn review_candidates(input: ReviewInput) -> Vec<anyhow::Result<(String, String)>> {
    match input {
        ReviewInput::Keyed(groups) => {
            let mut candidates = Vec::new();
            for group in groups.into_values() {
                for url in group.reviews {
                    candidates.push(Ok((group.isbn.clone(), url)));
                }
            }
            candidates
        }
        ReviewInput::Pairs(pairs) => pairs
            .iter()
            .map(|pair| parse_review_record(pair))
            .collect(),
    }
}

/// Legacy pair records carry the URL and the ISBN in either order.
fn parse_review_record(record: &[String]) -> anyhow::Result<(String, String)> {
    if record.len() != 2 {
        anyhow::bail!(
            "expected exactly 2 items in review record, got {}: {record:?}",
            record.len()
        );
    }
    if record[0].starts_with("http") {
        Ok((record[1].clone(), record[0].clone()))
    } else if record[1].starts_with("http") {
        Ok((record[0].clone(), record[1].clone()))
    } else {
        anyhow::bail!("expected a review record item starting with http: {record:?}");
    }
}

async fn process_record(
    catalog: &CatalogClient,
    isbn: &str,
    url: &str,
    report: &mut JobReport,
) -> anyhow::Result<()> {
    url::Url::parse(url).with_context(|| format!("invalid review url: {url}"))?;

    let Some(edition) = catalog.edition_by_isbn(isbn).await? else {
        tracing::info!(%isbn, "edition not in catalog; requesting import");
        catalog.request_import(isbn).await;
        report.counters.books_imported += 1;
        return Ok(());
    };

    let work_key = edition.work_key()?;
    let mut work = catalog.work(work_key).await?;

    match annotate::merge_review_link(&mut work, url) {
        LinkMerge::Added => {
            catalog.save_work(&work, SAVE_COMMENT).await?;
            tracing::info!(%isbn, work = %work.key, %url, "review link added");
            report.counters.links_added += 1;
        }
        LinkMerge::Upgraded => {
            catalog.save_work(&work, SAVE_COMMENT).await?;
            tracing::info!(%isbn, work = %work.key, %url, "review link upgraded to https");
            report.counters.links_added += 1;
        }
        LinkMerge::AlreadyPresent => {
            tracing::info!(%isbn, work = %work.key, "review link already present; skipping");
            report.counters.links_already_exist += 1;
        }
    }

    Ok(())
}
