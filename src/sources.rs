use crate::config::AppConfig;

/// How missing locations are filled for a provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationPolicy {
    Remote,
    Nigeria,
}

impl LocationPolicy {
    pub fn default_location(&self) -> &'static str {
        match self {
            LocationPolicy::Remote => "Remote",
            LocationPolicy::Nigeria => "Nigeria",
        }
    }
}

/// Maps provider-specific JSON keys to canonical fields. Keys are dotted
/// paths into the record object ("company.display_name" reaches into a
/// nested object).
#[derive(Debug, Clone)]
pub struct FieldMap {
    /// Top-level key holding the array of records.
    pub records_key: &'static str,
    pub title: &'static str,
    pub company: &'static str,
    pub location: &'static str,
    pub description: &'static str,
    pub url: &'static str,
    pub category: &'static str,
    pub date: &'static str,
    /// strftime pattern for the provider's timestamp, or None for RFC 3339.
    pub date_format: Option<&'static str>,
    pub location_policy: LocationPolicy,
}

#[derive(Debug, Clone)]
pub enum SourceFormat {
    /// RSS/Atom feed parsed with feed-rs.
    Syndication,
    /// JSON API returning an array of records under `records_key`.
    JsonApi(FieldMap),
}

/// Descriptor for one upstream feed.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    pub name: &'static str,
    pub url: String,
    pub category: &'static str,
    pub format: SourceFormat,
    /// Default company when the feed omits an author.
    pub company_default: &'static str,
    pub location_policy: LocationPolicy,
}

impl SourceSpec {
    pub fn syndication(name: &'static str, url: &str, category: &'static str) -> Self {
        Self {
            name,
            url: url.to_string(),
            category,
            format: SourceFormat::Syndication,
            company_default: "Unknown",
            location_policy: LocationPolicy::Nigeria,
        }
    }
}

/// Job sources processed by the `fetch-jobs` run: two JSON API providers
/// plus the syndication feeds.
pub fn job_sources(config: &AppConfig) -> Vec<SourceSpec> {
    let mut sources = vec![
        SourceSpec {
            name: "Remotive",
            url: "https://remotive.com/api/remote-jobs".to_string(),
            category: "",
            format: SourceFormat::JsonApi(FieldMap {
                records_key: "jobs",
                title: "title",
                company: "company_name",
                location: "candidate_required_location",
                description: "description",
                url: "url",
                category: "category",
                date: "publication_date",
                date_format: None,
                location_policy: LocationPolicy::Remote,
            }),
            company_default: "Unknown",
            location_policy: LocationPolicy::Remote,
        },
        SourceSpec {
            name: "Adzuna",
            url: format!(
                "https://api.adzuna.com/v1/api/jobs/gb/search/1?app_id={}&app_key={}&results_per_page=50&what=remote&where=Nigeria",
                config.adzuna_app_id, config.adzuna_app_key
            ),
            category: "",
            format: SourceFormat::JsonApi(FieldMap {
                records_key: "results",
                title: "title",
                company: "company.display_name",
                location: "location.display_name",
                description: "description",
                url: "redirect_url",
                category: "category.label",
                date: "created",
                date_format: Some("%Y-%m-%dT%H:%M:%SZ"),
                location_policy: LocationPolicy::Nigeria,
            }),
            company_default: "Unknown",
            location_policy: LocationPolicy::Nigeria,
        },
    ];

    sources.extend([
        SourceSpec::syndication("ReliefWeb", "https://reliefweb.int/jobs/rss.xml?country=175", ""),
        SourceSpec::syndication("HotNigerianJobs", "http://www.hotnigerianjobs.com/feed/rss.xml", ""),
        SourceSpec::syndication("NGOJobsInAfrica", "https://ngojobsinafrica.com/job-location/nigeria/feed/", ""),
        SourceSpec::syndication("Jobzilla", "https://www.jobzilla.ng/feed/", ""),
        SourceSpec::syndication("Careerjet", "https://www.careerjet.com.ng/rss/", ""),
        SourceSpec::syndication("UN Jobs", "https://unjobs.org/themes/development.rss", ""),
        SourceSpec::syndication("Devex", "https://www.devex.com/jobs/search.rss", ""),
    ]);

    sources
}

/// News/career feeds processed by the `fetch-news` run. Entries per source
/// are capped by the parser to bound batch cost.
pub fn news_sources() -> Vec<SourceSpec> {
    vec![
        SourceSpec::syndication("TechCrunch - Jobs", "https://techcrunch.com/category/jobs/feed/", "Tech Jobs"),
        SourceSpec::syndication("The Guardian - Careers", "https://www.theguardian.com/careers/rss", "Career Advice"),
        SourceSpec::syndication("Glassdoor Blog", "https://www.glassdoor.com/blog/feed/", "Job Market"),
        SourceSpec::syndication("Nairaland - Jobs", "https://www.nairaland.com/jobs/feed", "Nigeria Jobs"),
        SourceSpec::syndication("Remote OK - Jobs", "https://remoteok.com/feeds/remote-jobs.rss", "Remote Jobs"),
    ]
}
