use crate::store::Store;
use crate::types::{Error, JobPosting, NewJob, NewNewsPost, NewsPost, Result, Subscriber};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Pool, Postgres, Row};
use tracing::{debug, info};

/// PostgreSQL-backed store. The schema (see `migrations/`) carries the
/// unique constraints on (title, company), (title, source), the payment
/// reference, and the subscriber email, so the insert-if-absent operations
/// are atomic at the database (`ON CONFLICT DO NOTHING ... RETURNING`).
pub struct PgStore {
    db: Pool<Postgres>,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let db = PgPool::connect(database_url).await?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .map_err(|e| Error::General(format!("migration failed: {e}")))?;
        Ok(())
    }

    fn job_from_row(row: &PgRow) -> Result<JobPosting> {
        Ok(JobPosting {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            company: row.try_get("company")?,
            location: row.try_get("location")?,
            description: row.try_get("description")?,
            url: row.try_get("url")?,
            source: row.try_get("source")?,
            category: row.try_get("category")?,
            date_posted: row.try_get::<DateTime<Utc>, _>("date_posted")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            is_paid: row.try_get("is_paid")?,
            employer_email: row.try_get("employer_email")?,
            payment_reference: row.try_get("payment_reference")?,
        })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_job_if_absent(&self, job: NewJob) -> Result<Option<JobPosting>> {
        let row = sqlx::query(
            r#"
            INSERT INTO jobs (title, company, location, description, url, source, category, date_posted, employer_email)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (title, company) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.location)
        .bind(&job.description)
        .bind(&job.url)
        .bind(&job.source)
        .bind(&job.category)
        .bind(job.date_posted)
        .bind(&job.employer_email)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => {
                let posting = Self::job_from_row(&row)?;
                info!("Created posting {}: {} at {}", posting.id, posting.title, posting.company);
                Ok(Some(posting))
            }
            None => {
                debug!("Duplicate posting skipped: {} at {}", job.title, job.company);
                Ok(None)
            }
        }
    }

    async fn get_job(&self, id: i64) -> Result<Option<JobPosting>> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        row.map(|r| Self::job_from_row(&r)).transpose()
    }

    async fn find_job_by_reference(&self, reference: &str) -> Result<Option<JobPosting>> {
        let row = sqlx::query("SELECT * FROM jobs WHERE payment_reference = $1")
            .bind(reference)
            .fetch_optional(&self.db)
            .await?;
        row.map(|r| Self::job_from_row(&r)).transpose()
    }

    async fn set_payment_reference(&self, id: i64, reference: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE jobs SET payment_reference = $2 WHERE id = $1 AND payment_reference IS NULL",
        )
        .bind(id)
        .bind(reference)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::General(format!(
                "job {id} missing or reference already assigned"
            )));
        }
        Ok(())
    }

    async fn mark_paid_once(&self, reference: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE jobs SET is_paid = TRUE WHERE payment_reference = $1 AND is_paid = FALSE",
        )
        .bind(reference)
        .execute(&self.db)
        .await?;

        let flipped = result.rows_affected() > 0;
        if flipped {
            info!("Posting with reference {} marked paid", reference);
        }
        Ok(flipped)
    }

    async fn list_jobs_posted_since(&self, since: DateTime<Utc>) -> Result<Vec<JobPosting>> {
        let rows = sqlx::query("SELECT * FROM jobs WHERE date_posted >= $1 ORDER BY date_posted DESC")
            .bind(since)
            .fetch_all(&self.db)
            .await?;
        rows.iter().map(Self::job_from_row).collect()
    }

    async fn insert_news_if_absent(&self, post: NewNewsPost) -> Result<Option<NewsPost>> {
        let row = sqlx::query(
            r#"
            INSERT INTO news_posts (title, summary, content, author, source, category, date_posted)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (title, source) DO NOTHING
            RETURNING id, title, summary, content, author, source, category, date_posted
            "#,
        )
        .bind(&post.title)
        .bind(&post.summary)
        .bind(&post.content)
        .bind(&post.author)
        .bind(&post.source)
        .bind(&post.category)
        .bind(post.date_posted)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => Ok(Some(NewsPost {
                id: row.try_get("id")?,
                title: row.try_get("title")?,
                summary: row.try_get("summary")?,
                content: row.try_get("content")?,
                author: row.try_get("author")?,
                source: row.try_get("source")?,
                category: row.try_get("category")?,
                date_posted: row.try_get::<DateTime<Utc>, _>("date_posted")?,
            })),
            None => {
                debug!("Duplicate news entry skipped: {} ({})", post.title, post.source);
                Ok(None)
            }
        }
    }

    async fn add_subscriber(&self, email: &str) -> Result<(Subscriber, bool)> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO subscribers (email) VALUES ($1)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, email, date_subscribed
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        if let Some(row) = inserted {
            return Ok((
                Subscriber {
                    id: row.try_get("id")?,
                    email: row.try_get("email")?,
                    date_subscribed: row.try_get::<DateTime<Utc>, _>("date_subscribed")?,
                },
                true,
            ));
        }

        let row = sqlx::query("SELECT id, email, date_subscribed FROM subscribers WHERE email = $1")
            .bind(email)
            .fetch_one(&self.db)
            .await?;
        Ok((
            Subscriber {
                id: row.try_get("id")?,
                email: row.try_get("email")?,
                date_subscribed: row.try_get::<DateTime<Utc>, _>("date_subscribed")?,
            },
            false,
        ))
    }

    async fn list_subscribers(&self) -> Result<Vec<Subscriber>> {
        let rows = sqlx::query("SELECT id, email, date_subscribed FROM subscribers ORDER BY id")
            .fetch_all(&self.db)
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(Subscriber {
                    id: row.try_get("id")?,
                    email: row.try_get("email")?,
                    date_subscribed: row.try_get::<DateTime<Utc>, _>("date_subscribed")?,
                })
            })
            .collect()
    }
}
