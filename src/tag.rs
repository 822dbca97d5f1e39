use anyhow::Context as _;

use crate::annotate::{self, TagMerge};
use crate::catalog::CatalogClient;
use crate::cli::TagArgs;
use crate::formats::{self, JobReport, ListBatch};
use crate::interrupt::InterruptFlag;

const SAVE_COMMENT: &str = "Add NYT bestseller tag";

pub async fn run(args: TagArgs) -> anyhow::Result<()> {
    if args.dry_run {
        tracing::info!("dry run: no catalog mutations will be issued");
    }

    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("read batch file: {}", args.file))?;
    let batches: Vec<ListBatch> = serde_json::from_str(&raw).context("parse batch file")?;

    let catalog = CatalogClient::new(&args.catalog_url, args.dry_run).context("build catalog client")?;
    let interrupt = InterruptFlag::listen();

    let mut report = JobReport::new(&args.file, args.dry_run);
    let mut outcome = Ok(());

    'groups: for (index, batch) in batches.iter().enumerate() {
        if args.limit != 0 && index >= args.limit {
            tracing::info!(limit = args.limit, "group limit reached; stopping");
            break;
        }

        for isbn in &batch.isbns {
            if interrupt.is_set() {
                outcome = Err(anyhow::anyhow!("interrupted"));
                break 'groups;
            }

            report.counters.total_processed += 1;
            if let Err(err) = process_isbn(&catalog, batch, isbn, &mut report).await {
                tracing::error!(%isbn, err = format!("{err:#}"), "failed to process isbn");
                report.counters.isbns_failed += 1;
            }
        }
    }

    formats::write_json(&args.report, &report).context("write job report")?;
    outcome
}

async fn process_isbn(
    catalog: &CatalogClient,
    batch: &ListBatch,
    isbn: &str,
    report: &mut JobReport,
) -> anyhow::Result<()> {
    let Some(edition) = catalog.edition_by_isbn(isbn).await? else {
        tracing::info!(%isbn, "edition not in catalog; requesting import");
        catalog.request_import(isbn).await;
        report.counters.books_imported += 1;
        return Ok(());
    };

    let work_key = edition.work_key()?;
    let mut work = catalog.work(work_key).await?;

    match annotate::merge_bestseller_tags(&mut work, &batch.list_name_encoded, &batch.published_date)
    {
        TagMerge::Added => {
            catalog.save_work(&work, SAVE_COMMENT).await?;
            tracing::info!(%isbn, work = %work.key, "bestseller tag added");
            report.counters.tags_added += 1;
        }
        TagMerge::AlreadyTagged => {
            tracing::info!(%isbn, work = %work.key, "bestseller tag already present; skipping");
            report.counters.tags_already_exist += 1;
        }
    }

    Ok(())
}
