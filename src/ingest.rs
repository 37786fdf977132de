use crate::store::Store;
use crate::summarize::Summarizer;
use crate::types::{JobPosting, NewJob, NewNewsPost, NewsPost, PostedAt, RawJob, RawNewsItem, Result};
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use tracing::{debug, info};

/// Outcome of one ingest batch.
#[derive(Debug, Default)]
pub struct IngestOutcome {
    pub created: Vec<JobPosting>,
    pub duplicates: usize,
    pub rejected: usize,
}

#[derive(Debug, Default)]
pub struct NewsIngestOutcome {
    pub created: Vec<NewsPost>,
    pub duplicates: usize,
    pub rejected: usize,
}

/// Normalize a provider timestamp for storage. Naive timestamps are read
/// in the configured timezone; missing or unparseable ones get the current
/// time (fail-open, matching upstream feeds that omit dates).
pub fn make_aware(posted: PostedAt, tz: FixedOffset, now: DateTime<Utc>) -> DateTime<Utc> {
    match posted {
        PostedAt::Utc(dt) => dt,
        PostedAt::Naive(naive) => tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(now),
        PostedAt::Unknown => now,
    }
}

/// Decides whether canonical records are new and commits them. The only
/// place holding the no-duplicate invariant: existence check and create go
/// through the store as one logical unit, with the storage-layer unique
/// constraint as backstop.
pub struct IngestEngine<'a> {
    store: &'a dyn Store,
    timezone: FixedOffset,
}

impl<'a> IngestEngine<'a> {
    pub fn new(store: &'a dyn Store, timezone: FixedOffset) -> Self {
        Self { store, timezone }
    }

    pub async fn ingest_jobs(&self, records: Vec<RawJob>) -> Result<IngestOutcome> {
        let mut outcome = IngestOutcome::default();
        let now = Utc::now();

        for record in records {
            let title = record.title.trim();
            if title.is_empty() {
                debug!("Rejected record with blank title from {}", record.source);
                outcome.rejected += 1;
                continue;
            }

            let job = NewJob {
                title: title.to_string(),
                company: record.company,
                location: record.location,
                description: record.description,
                url: record.url,
                source: record.source,
                category: record.category,
                date_posted: make_aware(record.posted_at, self.timezone, now),
                employer_email: None,
            };

            match self.store.insert_job_if_absent(job).await? {
                Some(created) => outcome.created.push(created),
                None => outcome.duplicates += 1,
            }
        }

        info!(
            "Job ingest: {} created, {} duplicates, {} rejected",
            outcome.created.len(),
            outcome.duplicates,
            outcome.rejected
        );
        Ok(outcome)
    }

    /// News ingestion: same dedup discipline keyed on (title, source); the
    /// summary is derived here, once, by the configured summarizer.
    /// Entries without a byline get `default_author`.
    pub async fn ingest_news(
        &self,
        records: Vec<RawNewsItem>,
        summarizer: &dyn Summarizer,
        default_author: &str,
    ) -> Result<NewsIngestOutcome> {
        let mut outcome = NewsIngestOutcome::default();
        let now = Utc::now();

        for record in records {
            let title = record.title.trim();
            if title.is_empty() {
                debug!("Rejected news entry with blank title from {}", record.source);
                outcome.rejected += 1;
                continue;
            }

            let summary = summarizer.summarize(&record.content).await;
            let post = NewNewsPost {
                title: title.to_string(),
                summary,
                content: record.content,
                author: record.author.unwrap_or_else(|| default_author.to_string()),
                source: record.source,
                category: record.category,
                date_posted: make_aware(record.posted_at, self.timezone, now),
            };

            match self.store.insert_news_if_absent(post).await? {
                Some(created) => outcome.created.push(created),
                None => outcome.duplicates += 1,
            }
        }

        info!(
            "News ingest: {} created, {} duplicates, {} rejected",
            outcome.created.len(),
            outcome.duplicates,
            outcome.rejected
        );
        Ok(outcome)
    }
}
