use anyhow::Context;
use clap::{Parser, Subcommand};
use job_aggregator::newsletter::{self, dispatch_new_jobs, SmtpMailer};
use job_aggregator::payment::{confirm_payment, ConfirmationOutcome, HttpGateway};
use job_aggregator::pipeline::{run_job_fetch, run_news_fetch, INTER_SOURCE_DELAY};
use job_aggregator::sources::{job_sources, news_sources};
use job_aggregator::store::Store;
use job_aggregator::types::FetchConfig;
use job_aggregator::{summarize, AppConfig, Fetcher, PgStore};
use tracing::{info, warn};

/// Batch entrypoints for the job-board aggregation pipeline. Each
/// subcommand is one scheduled run, meant to be invoked from cron; there
/// is no in-process scheduler.
#[derive(Parser)]
#[command(name = "job-aggregator", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch all job sources, ingest new postings, notify subscribers.
    FetchJobs,
    /// Fetch news/career feeds and ingest new posts.
    FetchNews,
    /// Mail postings created in the last day to all subscribers.
    SendNewsletter {
        /// Look-back window in hours.
        #[arg(long, default_value_t = 24)]
        hours: i64,
    },
    /// Re-run verification for a payment reference (callback replay).
    ConfirmPayment {
        #[arg(long)]
        reference: String,
    },
    /// Add an email address to the newsletter list.
    Subscribe {
        #[arg(long)]
        email: String,
    },
    /// Apply pending database migrations.
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("configuration")?;
    let store = PgStore::connect(&config.database_url)
        .await
        .context("database connection")?;

    match cli.command {
        Command::FetchJobs => {
            let fetcher = Fetcher::new(FetchConfig::default())?;
            let mailer = SmtpMailer::from_config(&config)?;
            let report = run_job_fetch(
                &store,
                &fetcher,
                &job_sources(&config),
                &mailer,
                config.timezone,
                INTER_SOURCE_DELAY,
            )
            .await?;
            info!(
                "Done: {} new postings, {} duplicates, {} sources failed",
                report.created.len(),
                report.duplicates,
                report.sources_failed
            );
        }
        Command::FetchNews => {
            let fetcher = Fetcher::new(FetchConfig::default())?;
            let summarizer = summarize::from_config(&config.summarizer)?;
            let report = run_news_fetch(
                &store,
                &fetcher,
                &news_sources(),
                summarizer.as_ref(),
                &config.default_author,
                config.timezone,
                INTER_SOURCE_DELAY,
            )
            .await?;
            info!(
                "Done: {} new posts, {} duplicates, {} sources failed",
                report.created.len(),
                report.duplicates,
                report.sources_failed
            );
        }
        Command::SendNewsletter { hours } => {
            let mailer = SmtpMailer::from_config(&config)?;
            let since = chrono::Utc::now() - chrono::Duration::hours(hours);
            let jobs = store.list_jobs_posted_since(since).await?;
            let subscribers = store.list_subscribers().await?;
            let outcome = dispatch_new_jobs(&mailer, &subscribers, &jobs).await;
            info!("Newsletter outcome: {:?}", outcome);
        }
        Command::ConfirmPayment { reference } => {
            let gateway = HttpGateway::new(config.payment_secret_key.clone())?;
            match confirm_payment(&store, &gateway, Some(&reference)).await {
                Ok(ConfirmationOutcome::Confirmed(id)) => {
                    info!("Payment confirmed; posting {} is now featured", id)
                }
                Ok(ConfirmationOutcome::AlreadyPaid) => info!("Payment already processed"),
                Err(e) => warn!("Confirmation rejected: {}", e),
            }
        }
        Command::Subscribe { email } => {
            let (subscriber, created) = newsletter::subscribe(&store, &email).await?;
            if created {
                info!("Subscribed {}", subscriber.email);
            } else {
                info!("{} was already subscribed", subscriber.email);
            }
        }
        Command::Migrate => {
            store.migrate().await?;
            info!("Migrations applied");
        }
    }

    Ok(())
}
