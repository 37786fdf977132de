use crate::fetcher::FetchContent;
use crate::ingest::IngestEngine;
use crate::newsletter::{dispatch_new_jobs, DispatchOutcome, Mailer};
use crate::parser::{parse_json_jobs, parse_syndication_jobs, parse_syndication_news};
use crate::sources::{SourceFormat, SourceSpec};
use crate::store::Store;
use crate::summarize::Summarizer;
use crate::types::{JobPosting, NewsPost, RawJob, Result};
use chrono::FixedOffset;
use std::time::Duration;
use tracing::{error, info};

/// Pause between external calls so upstream providers are not hammered.
pub const INTER_SOURCE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
pub struct JobRunReport {
    pub sources_ok: usize,
    pub sources_failed: usize,
    pub records_seen: usize,
    pub created: Vec<JobPosting>,
    pub duplicates: usize,
    pub rejected: usize,
    pub newsletter: Option<DispatchOutcome>,
}

#[derive(Debug, Default)]
pub struct NewsRunReport {
    pub sources_ok: usize,
    pub sources_failed: usize,
    pub records_seen: usize,
    pub created: Vec<NewsPost>,
    pub duplicates: usize,
    pub rejected: usize,
}

async fn fetch_job_records(fetcher: &dyn FetchContent, source: &SourceSpec) -> Result<Vec<RawJob>> {
    let body = fetcher.fetch(&source.url).await?;
    match &source.format {
        SourceFormat::Syndication => parse_syndication_jobs(&body, source),
        SourceFormat::JsonApi(map) => parse_json_jobs(&body, map, source),
    }
}

/// One scheduled job-fetch run: every source in the registry, sequentially,
/// each inside its own error boundary so a dead or malformed source never
/// aborts the rest. Ends by mailing subscribers about fresh postings.
pub async fn run_job_fetch(
    store: &dyn Store,
    fetcher: &dyn FetchContent,
    sources: &[SourceSpec],
    mailer: &dyn Mailer,
    timezone: FixedOffset,
    delay: Duration,
) -> Result<JobRunReport> {
    let engine = IngestEngine::new(store, timezone);
    let mut report = JobRunReport::default();

    for (i, source) in sources.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        info!("Fetching jobs from {}", source.name);
        match fetch_job_records(fetcher, source).await {
            Ok(records) => {
                report.records_seen += records.len();
                let outcome = engine.ingest_jobs(records).await?;
                report.created.extend(outcome.created);
                report.duplicates += outcome.duplicates;
                report.rejected += outcome.rejected;
                report.sources_ok += 1;
            }
            Err(e) => {
                error!("Error fetching from {}: {}", source.name, e);
                report.sources_failed += 1;
            }
        }
    }

    info!(
        "Job run: {}/{} sources ok, {} new postings, {} duplicates",
        report.sources_ok,
        sources.len(),
        report.created.len(),
        report.duplicates
    );

    if !report.created.is_empty() {
        let subscribers = store.list_subscribers().await?;
        report.newsletter = Some(dispatch_new_jobs(mailer, &subscribers, &report.created).await);
    }

    Ok(report)
}

/// One scheduled news-fetch run; same per-source isolation and pacing, no
/// notification step.
pub async fn run_news_fetch(
    store: &dyn Store,
    fetcher: &dyn FetchContent,
    sources: &[SourceSpec],
    summarizer: &dyn Summarizer,
    default_author: &str,
    timezone: FixedOffset,
    delay: Duration,
) -> Result<NewsRunReport> {
    let engine = IngestEngine::new(store, timezone);
    let mut report = NewsRunReport::default();

    for (i, source) in sources.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        info!("Fetching news from {}", source.name);
        let parsed = match fetcher.fetch(&source.url).await {
            Ok(body) => parse_syndication_news(&body, source),
            Err(e) => Err(e),
        };

        match parsed {
            Ok(records) => {
                report.records_seen += records.len();
                let outcome = engine.ingest_news(records, summarizer, default_author).await?;
                report.created.extend(outcome.created);
                report.duplicates += outcome.duplicates;
                report.rejected += outcome.rejected;
                report.sources_ok += 1;
            }
            Err(e) => {
                error!("Error fetching from {}: {}", source.name, e);
                report.sources_failed += 1;
            }
        }
    }

    info!(
        "News run: {}/{} sources ok, {} new posts, {} duplicates",
        report.sources_ok,
        sources.len(),
        report.created.len(),
        report.duplicates
    );

    Ok(report)
}
