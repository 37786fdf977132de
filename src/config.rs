use crate::types::{Error, Result};
use chrono::FixedOffset;
use std::env;

/// Job posting fee in kobo (NGN minor units). Verified amounts must match
/// this exactly.
pub const JOB_FEE_KOBO: i64 = 500_000;

/// Which summarizer variant the news ingester uses. Selected once at
/// configuration time, never probed at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum SummarizerKind {
    Truncation,
    Llm { endpoint: String, api_key: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub smtp_host: String,
    pub smtp_user: String,
    pub smtp_pass: String,
    pub from_email: String,
    pub payment_secret_key: String,
    pub payment_callback_url: String,
    pub adzuna_app_id: String,
    pub adzuna_app_key: String,
    /// Timezone applied to naive provider timestamps before storage.
    pub timezone: FixedOffset,
    /// Author attributed to generated content when a feed has none.
    pub default_author: String,
    pub summarizer: SummarizerKind,
}

fn required(key: &str) -> Result<String> {
    env::var(key).map_err(|_| Error::Config(format!("missing required environment variable {key}")))
}

/// Parse an offset like "+01:00" or "-05:30".
fn parse_offset(raw: &str) -> Result<FixedOffset> {
    let bad = || Error::Config(format!("invalid TIMEZONE_OFFSET: {raw}"));
    let (sign, rest) = match raw.as_bytes().first() {
        Some(b'+') => (1, &raw[1..]),
        Some(b'-') => (-1, &raw[1..]),
        _ => return Err(bad()),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(bad)?;
    let hours: i32 = hours.parse().map_err(|_| bad())?;
    let minutes: i32 = minutes.parse().map_err(|_| bad())?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(bad)
}

impl AppConfig {
    /// Assemble configuration from the environment. Missing required
    /// credentials fail here, before any partial operation is attempted.
    pub fn from_env() -> Result<Self> {
        let summarizer = match env::var("SUMMARIZER").as_deref() {
            Ok("llm") => SummarizerKind::Llm {
                endpoint: required("LLM_ENDPOINT")?,
                api_key: required("LLM_API_KEY")?,
            },
            _ => SummarizerKind::Truncation,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            smtp_host: required("SMTP_HOST")?,
            smtp_user: required("SMTP_USER")?,
            smtp_pass: required("SMTP_PASS")?,
            from_email: required("FROM_EMAIL")?,
            payment_secret_key: required("PAYMENT_SECRET_KEY")?,
            payment_callback_url: env::var("PAYMENT_CALLBACK_URL")
                .unwrap_or_else(|_| "https://localhost/payment-callback/".to_string()),
            adzuna_app_id: required("ADZUNA_APP_ID")?,
            adzuna_app_key: required("ADZUNA_APP_KEY")?,
            timezone: parse_offset(
                &env::var("TIMEZONE_OFFSET").unwrap_or_else(|_| "+01:00".to_string()),
            )?,
            default_author: env::var("DEFAULT_AUTHOR").unwrap_or_else(|_| "Editorial Team".to_string()),
            summarizer,
        })
    }

    /// Fixed configuration for tests; no environment access.
    pub fn for_tests() -> Self {
        Self {
            database_url: "postgresql://localhost/test".to_string(),
            smtp_host: "smtp.test".to_string(),
            smtp_user: "mailer".to_string(),
            smtp_pass: "secret".to_string(),
            from_email: "jobs@example.test".to_string(),
            payment_secret_key: "sk_test".to_string(),
            payment_callback_url: "https://example.test/payment-callback/".to_string(),
            adzuna_app_id: "test-app-id".to_string(),
            adzuna_app_key: "test-app-key".to_string(),
            timezone: FixedOffset::east_opt(3600).unwrap(),
            default_author: "Editorial Team".to_string(),
            summarizer: SummarizerKind::Truncation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_offset() {
        let tz = parse_offset("+01:00").unwrap();
        assert_eq!(tz.local_minus_utc(), 3600);
    }

    #[test]
    fn parses_negative_offset() {
        let tz = parse_offset("-05:30").unwrap();
        assert_eq!(tz.local_minus_utc(), -(5 * 3600 + 30 * 60));
    }

    #[test]
    fn rejects_garbage_offset() {
        assert!(parse_offset("lagos").is_err());
        assert!(parse_offset("+1").is_err());
    }
}
