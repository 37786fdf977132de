use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A job posting as persisted by the store.
///
/// Created either by an employer submission (unpaid, awaiting payment) or by
/// the feed fetcher (externally sourced, never payable). The uniqueness key
/// is (title, company); the payment reference, once assigned, is immutable
/// and globally unique.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobPosting {
    pub id: i64,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub url: String,
    pub source: String,
    pub category: String,
    pub date_posted: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub is_paid: bool,
    pub employer_email: Option<String>,
    pub payment_reference: Option<String>,
}

/// Fields for a job posting about to be created. The store assigns the id
/// and `created_at`.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub url: String,
    pub source: String,
    pub category: String,
    pub date_posted: DateTime<Utc>,
    pub employer_email: Option<String>,
}

/// An aggregated news/career article. Uniqueness key is (title, source) so a
/// feed entry is never reprocessed. The summary is derived once at creation
/// time and not recomputed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsPost {
    pub id: i64,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub author: String,
    pub source: String,
    pub category: String,
    pub date_posted: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNewsPost {
    pub title: String,
    pub summary: String,
    pub content: String,
    pub author: String,
    pub source: String,
    pub category: String,
    pub date_posted: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subscriber {
    pub id: i64,
    pub email: String,
    pub date_subscribed: DateTime<Utc>,
}

/// Timestamp as reported by an upstream provider, before the ingest engine
/// normalizes it. Providers disagree about whether their dates carry an
/// offset, and some omit the date entirely.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PostedAt {
    /// Offset-aware timestamp, already normalized to UTC.
    Utc(DateTime<Utc>),
    /// Naive timestamp; coerced to the configured timezone at ingest.
    Naive(NaiveDateTime),
    /// Missing or unparseable; substituted with "now" at ingest (fail-open).
    Unknown,
}

/// Canonical job record produced by the parser regardless of provider
/// format. Not yet persisted; the ingest engine decides that.
#[derive(Debug, Clone)]
pub struct RawJob {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub url: String,
    pub source: String,
    pub category: String,
    pub posted_at: PostedAt,
}

/// Canonical news record produced by the parser. The author is None when
/// the feed entry does not carry one; ingest fills the configured default.
#[derive(Debug, Clone)]
pub struct RawNewsItem {
    pub title: String,
    pub content: String,
    pub author: Option<String>,
    pub source: String,
    pub category: String,
    pub posted_at: PostedAt,
}

/// Verification result returned by the payment gateway. Transient, never
/// persisted, and treated as untrusted input: the amount is checked against
/// the expected fee independently of the gateway's success flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub reference: String,
    pub amount: i64,
    pub status: String,
}

impl PaymentConfirmation {
    pub fn is_successful(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "JobAggregator/1.0".to_string(),
            timeout_seconds: 20,
            max_retries: 3,
            retry_delay_seconds: 2,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Mail build error: {0}")]
    MailBuild(#[from] lettre::error::Error),

    #[error("Mail address error: {0}")]
    MailAddress(#[from] lettre::address::AddressError),

    #[error("Mail transport error: {0}")]
    MailTransport(#[from] lettre::transport::smtp::Error),

    #[error("Missing payment reference")]
    MissingReference,

    #[error("Unknown or already processed reference: {0}")]
    UnknownReference(String),

    #[error("Payment not successful (status: {0})")]
    PaymentNotSuccessful(String),

    #[error("Suspicious amount: got {got}, expected {expected}")]
    AmountMismatch { got: i64, expected: i64 },

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, Error>;
