use crate::sources::{FieldMap, SourceSpec};
use crate::types::{Error, PostedAt, RawJob, RawNewsItem, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use feed_rs::parser;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Entries processed per news source, to bound batch cost.
pub const NEWS_ENTRIES_PER_SOURCE: usize = 5;

/// Parse a syndication (RSS/Atom) payload into canonical job records.
/// Entry fields map as title / author→company / summary→description /
/// link / publish date. A malformed payload is an error for this source;
/// a bad date on one entry is not (fail-open to `PostedAt::Unknown`).
pub fn parse_syndication_jobs(content: &str, source: &SourceSpec) -> Result<Vec<RawJob>> {
    let feed = parser::parse(content.as_bytes())
        .map_err(|e| Error::Parse(format!("{}: {}", source.name, e)))?;

    let mut jobs = Vec::new();
    for entry in feed.entries {
        let title = entry
            .title
            .map(|t| t.content.trim().to_string())
            .unwrap_or_default();
        let company = entry
            .authors
            .first()
            .map(|a| a.name.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| source.company_default.to_string());
        let description = entry.summary.map(|s| s.content).unwrap_or_default();
        let url = entry
            .links
            .first()
            .map(|l| l.href.clone())
            .unwrap_or_default();
        let posted_at = entry
            .published
            .map(|dt| PostedAt::Utc(dt.with_timezone(&Utc)))
            .unwrap_or(PostedAt::Unknown);

        jobs.push(RawJob {
            title,
            company,
            location: source.location_policy.default_location().to_string(),
            description,
            url,
            source: source.name.to_string(),
            category: source.category.to_string(),
            posted_at,
        });
    }

    info!("{}: parsed {} job entries", source.name, jobs.len());
    Ok(jobs)
}

/// Parse a syndication payload into canonical news records, keeping only
/// the top entries. Full content is preferred over the summary when the
/// feed carries both.
pub fn parse_syndication_news(content: &str, source: &SourceSpec) -> Result<Vec<RawNewsItem>> {
    let feed = parser::parse(content.as_bytes())
        .map_err(|e| Error::Parse(format!("{}: {}", source.name, e)))?;

    let mut items = Vec::new();
    for entry in feed.entries.into_iter().take(NEWS_ENTRIES_PER_SOURCE) {
        let author = entry
            .authors
            .first()
            .map(|a| a.name.trim().to_string())
            .filter(|n| !n.is_empty());
        let title: String = entry
            .title
            .map(|t| t.content.trim().chars().take(200).collect())
            .unwrap_or_default();
        let summary = entry.summary.map(|s| s.content);
        let content_body = entry
            .content
            .and_then(|c| c.body)
            .or(summary)
            .unwrap_or_default();
        let posted_at = entry
            .published
            .map(|dt| PostedAt::Utc(dt.with_timezone(&Utc)))
            .unwrap_or(PostedAt::Unknown);

        items.push(RawNewsItem {
            title,
            content: content_body,
            author,
            source: source.name.to_string(),
            category: source.category.to_string(),
            posted_at,
        });
    }

    info!("{}: parsed {} news entries", source.name, items.len());
    Ok(items)
}

/// Parse a JSON API payload into canonical job records using the
/// provider's field map. An unexpected top-level shape is an error for
/// this source; missing fields on individual records fall back to the
/// provider defaults.
pub fn parse_json_jobs(content: &str, map: &FieldMap, source: &SourceSpec) -> Result<Vec<RawJob>> {
    let body: Value = serde_json::from_str(content)
        .map_err(|e| Error::Parse(format!("{}: {}", source.name, e)))?;

    let records = body
        .get(map.records_key)
        .and_then(Value::as_array)
        .ok_or_else(|| {
            Error::Parse(format!(
                "{}: expected array under key '{}'",
                source.name, map.records_key
            ))
        })?;

    let jobs = records
        .iter()
        .map(|record| RawJob {
            title: lookup_str(record, map.title).unwrap_or_default(),
            company: lookup_str(record, map.company).unwrap_or_else(|| "Unknown".to_string()),
            location: lookup_str(record, map.location)
                .unwrap_or_else(|| map.location_policy.default_location().to_string()),
            description: lookup_str(record, map.description).unwrap_or_default(),
            url: lookup_str(record, map.url).unwrap_or_default(),
            source: source.name.to_string(),
            category: lookup_str(record, map.category).unwrap_or_default(),
            posted_at: lookup_str(record, map.date)
                .map(|raw| parse_provider_date(&raw, map.date_format))
                .unwrap_or(PostedAt::Unknown),
        })
        .collect::<Vec<_>>();

    info!("{}: parsed {} job records", source.name, jobs.len());
    Ok(jobs)
}

/// Resolve a dotted path like "company.display_name" into a string value.
fn lookup_str(record: &Value, path: &str) -> Option<String> {
    let mut cursor = record;
    for segment in path.split('.') {
        cursor = cursor.get(segment)?;
    }
    match cursor {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Attempt the provider's timestamp format; on failure, fall open to
/// `Unknown` rather than failing the entry.
fn parse_provider_date(raw: &str, format: Option<&str>) -> PostedAt {
    let parsed = match format {
        Some(fmt) => NaiveDateTime::parse_from_str(raw, fmt)
            .map(PostedAt::Naive)
            .map_err(|e| e.to_string()),
        None => DateTime::parse_from_rfc3339(raw)
            .map(|dt| PostedAt::Utc(dt.with_timezone(&Utc)))
            .map_err(|e| e.to_string()),
    };

    match parsed {
        Ok(at) => at,
        Err(e) => {
            warn!("Unparseable provider date '{}': {}", raw, e);
            debug!("Substituting current time at ingest");
            PostedAt::Unknown
        }
    }
}
