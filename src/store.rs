use crate::types::{Error, JobPosting, NewJob, NewNewsPost, NewsPost, Result, Subscriber};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Persistence boundary. The store owns the entities; the pipeline
/// components only create, query, and update through it. Implementations
/// must enforce the unique constraints on (title, company), (title, source)
/// and the payment reference as a backstop to the in-process checks.
#[async_trait]
pub trait Store: Send + Sync {
    /// Existence-check + create as one logical unit: returns the created
    /// posting, or None when a posting with the same (title, company)
    /// already exists.
    async fn insert_job_if_absent(&self, job: NewJob) -> Result<Option<JobPosting>>;

    async fn get_job(&self, id: i64) -> Result<Option<JobPosting>>;

    async fn find_job_by_reference(&self, reference: &str) -> Result<Option<JobPosting>>;

    /// Assign the payment reference. The reference is immutable once set;
    /// assigning over an existing one is an error.
    async fn set_payment_reference(&self, id: i64, reference: &str) -> Result<()>;

    /// Flip the paid flag for a reference, but only if it is not already
    /// set. Returns whether this call performed the transition, so
    /// concurrent confirmations for the same token serialize to exactly
    /// one effective flip.
    async fn mark_paid_once(&self, reference: &str) -> Result<bool>;

    /// Postings with a posting date at or after `since`, newest first.
    /// Drives the daily newsletter run.
    async fn list_jobs_posted_since(
        &self,
        since: chrono::DateTime<Utc>,
    ) -> Result<Vec<JobPosting>>;

    /// Existence-check + create keyed on (title, source).
    async fn insert_news_if_absent(&self, post: NewNewsPost) -> Result<Option<NewsPost>>;

    /// Get-or-create a subscriber. The bool reports whether the email was
    /// newly subscribed.
    async fn add_subscriber(&self, email: &str) -> Result<(Subscriber, bool)>;

    async fn list_subscribers(&self) -> Result<Vec<Subscriber>>;
}

#[derive(Default)]
struct MemoryInner {
    jobs: Vec<JobPosting>,
    news: Vec<NewsPost>,
    subscribers: Vec<Subscriber>,
    next_job_id: i64,
    next_news_id: i64,
    next_subscriber_id: i64,
}

/// In-memory store used by tests and local runs without a database.
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryInner {
                next_job_id: 1,
                next_news_id: 1,
                next_subscriber_id: 1,
                ..Default::default()
            }),
        }
    }

    /// Seed a posting directly, for tests that need existing records.
    pub async fn seed_job(&self, job: NewJob) -> JobPosting {
        self.insert_job_if_absent(job)
            .await
            .expect("memory store insert cannot fail")
            .expect("seeded job must not collide")
    }

    /// Pin the next assigned id, for tests that care about reference
    /// tokens derived from it.
    pub async fn set_next_job_id(&self, id: i64) {
        self.inner.write().await.next_job_id = id;
    }

    pub async fn job_count(&self) -> usize {
        self.inner.read().await.jobs.len()
    }

    pub async fn news_count(&self) -> usize {
        self.inner.read().await.news.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_job_if_absent(&self, job: NewJob) -> Result<Option<JobPosting>> {
        let mut inner = self.inner.write().await;
        if inner
            .jobs
            .iter()
            .any(|j| j.title == job.title && j.company == job.company)
        {
            debug!("Duplicate posting skipped: {} at {}", job.title, job.company);
            return Ok(None);
        }

        let id = inner.next_job_id;
        inner.next_job_id += 1;
        let posting = JobPosting {
            id,
            title: job.title,
            company: job.company,
            location: job.location,
            description: job.description,
            url: job.url,
            source: job.source,
            category: job.category,
            date_posted: job.date_posted,
            created_at: Utc::now(),
            is_paid: false,
            employer_email: job.employer_email,
            payment_reference: None,
        };
        inner.jobs.push(posting.clone());
        Ok(Some(posting))
    }

    async fn get_job(&self, id: i64) -> Result<Option<JobPosting>> {
        Ok(self.inner.read().await.jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn find_job_by_reference(&self, reference: &str) -> Result<Option<JobPosting>> {
        Ok(self
            .inner
            .read()
            .await
            .jobs
            .iter()
            .find(|j| j.payment_reference.as_deref() == Some(reference))
            .cloned())
    }

    async fn set_payment_reference(&self, id: i64, reference: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner
            .jobs
            .iter()
            .any(|j| j.payment_reference.as_deref() == Some(reference))
        {
            return Err(Error::General(format!("reference already assigned: {reference}")));
        }
        let job = inner
            .jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| Error::General(format!("no job with id {id}")))?;
        if job.payment_reference.is_some() {
            return Err(Error::General(format!("job {id} already has a reference")));
        }
        job.payment_reference = Some(reference.to_string());
        Ok(())
    }

    async fn mark_paid_once(&self, reference: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        match inner
            .jobs
            .iter_mut()
            .find(|j| j.payment_reference.as_deref() == Some(reference) && !j.is_paid)
        {
            Some(job) => {
                job.is_paid = true;
                info!("Posting {} marked paid (reference {})", job.id, reference);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_jobs_posted_since(
        &self,
        since: chrono::DateTime<Utc>,
    ) -> Result<Vec<JobPosting>> {
        let inner = self.inner.read().await;
        let mut jobs: Vec<JobPosting> = inner
            .jobs
            .iter()
            .filter(|j| j.date_posted >= since)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.date_posted.cmp(&a.date_posted));
        Ok(jobs)
    }

    async fn insert_news_if_absent(&self, post: NewNewsPost) -> Result<Option<NewsPost>> {
        let mut inner = self.inner.write().await;
        if inner
            .news
            .iter()
            .any(|n| n.title == post.title && n.source == post.source)
        {
            debug!("Duplicate news entry skipped: {} ({})", post.title, post.source);
            return Ok(None);
        }

        let id = inner.next_news_id;
        inner.next_news_id += 1;
        let created = NewsPost {
            id,
            title: post.title,
            summary: post.summary,
            content: post.content,
            author: post.author,
            source: post.source,
            category: post.category,
            date_posted: post.date_posted,
        };
        inner.news.push(created.clone());
        Ok(Some(created))
    }

    async fn add_subscriber(&self, email: &str) -> Result<(Subscriber, bool)> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.subscribers.iter().find(|s| s.email == email) {
            return Ok((existing.clone(), false));
        }
        let id = inner.next_subscriber_id;
        inner.next_subscriber_id += 1;
        let subscriber = Subscriber {
            id,
            email: email.to_string(),
            date_subscribed: Utc::now(),
        };
        inner.subscribers.push(subscriber.clone());
        Ok((subscriber, true))
    }

    async fn list_subscribers(&self) -> Result<Vec<Subscriber>> {
        Ok(self.inner.read().await.subscribers.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_job(title: &str, company: &str) -> NewJob {
        NewJob {
            title: title.to_string(),
            company: company.to_string(),
            location: "Remote".to_string(),
            description: String::new(),
            url: "https://jobs.example/x".to_string(),
            source: "Test".to_string(),
            category: String::new(),
            date_posted: Utc::now(),
            employer_email: None,
        }
    }

    #[tokio::test]
    async fn duplicate_title_company_yields_one_entity() {
        let store = MemoryStore::new();
        let first = store.insert_job_if_absent(sample_job("Engineer", "Acme")).await.unwrap();
        let second = store.insert_job_if_absent(sample_job("Engineer", "Acme")).await.unwrap();
        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(store.job_count().await, 1);
    }

    #[tokio::test]
    async fn reference_is_immutable_once_set() {
        let store = MemoryStore::new();
        let job = store.seed_job(sample_job("Engineer", "Acme")).await;
        store.set_payment_reference(job.id, "1_job").await.unwrap();
        assert!(store.set_payment_reference(job.id, "other").await.is_err());
    }

    #[tokio::test]
    async fn mark_paid_once_is_effective_exactly_once() {
        let store = MemoryStore::new();
        let job = store.seed_job(sample_job("Engineer", "Acme")).await;
        store.set_payment_reference(job.id, "1_job").await.unwrap();

        assert!(store.mark_paid_once("1_job").await.unwrap());
        assert!(!store.mark_paid_once("1_job").await.unwrap());
        assert!(store.get_job(job.id).await.unwrap().unwrap().is_paid);
    }

    #[tokio::test]
    async fn resubscribing_is_a_benign_no_op() {
        let store = MemoryStore::new();
        let (_, created) = store.add_subscriber("a@example.test").await.unwrap();
        let (_, replay) = store.add_subscriber("a@example.test").await.unwrap();
        assert!(created);
        assert!(!replay);
        assert_eq!(store.list_subscribers().await.unwrap().len(), 1);
    }
}
