use crate::config::AppConfig;
use crate::store::Store;
use crate::types::{Error, JobPosting, Result, Subscriber};
use async_trait::async_trait;
use lettre::message::{header, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{error, info};

/// Mail transport boundary. One call per newsletter run; a failure here is
/// reported, never propagated past the dispatcher.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        subject: &str,
        text_body: &str,
        html_body: &str,
        recipients: &[String],
    ) -> Result<()>;
}

/// SMTP transport over lettre's async client.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let creds = Credentials::new(config.smtp_user.clone(), config.smtp_pass.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?
            .credentials(creds)
            .build();
        let from: Mailbox = config.from_email.parse()?;
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(
        &self,
        subject: &str,
        text_body: &str,
        html_body: &str,
        recipients: &[String],
    ) -> Result<()> {
        let mut builder = Message::builder().from(self.from.clone()).subject(subject);
        for recipient in recipients {
            builder = builder.to(recipient.parse()?);
        }

        let message = builder.multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(header::ContentType::TEXT_PLAIN)
                        .body(text_body.to_string()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(header::ContentType::TEXT_HTML)
                        .body(html_body.to_string()),
                ),
        )?;

        self.transport.send(message).await?;
        Ok(())
    }
}

/// What the dispatcher did for one run.
#[derive(Debug, PartialEq)]
pub enum DispatchOutcome {
    /// No subscribers or no new postings; nothing to send.
    Skipped,
    Sent { recipients: usize, jobs: usize },
    /// The single delivery attempt failed; the run itself still completed.
    DeliveryFailed(String),
}

pub const NEWSLETTER_SUBJECT: &str = "New Jobs Alert";

pub fn compose_text(jobs: &[JobPosting]) -> String {
    let listing = jobs
        .iter()
        .map(|job| {
            format!(
                "{} at {}\nLocation: {}\nLink: {}",
                job.title, job.company, job.location, job.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("Hello!\n\nHere are the latest job postings:\n\n{listing}\n\nVisit our site for more jobs!")
}

pub fn compose_html(jobs: &[JobPosting]) -> String {
    let mut html = String::from("<h2>Latest job postings</h2>\n<ul>\n");
    for job in jobs {
        html.push_str(&format!(
            "  <li><a href=\"{}\">{}</a> at {} ({})</li>\n",
            job.url, job.title, job.company, job.location
        ));
    }
    html.push_str("</ul>\n<p>Visit our site for more jobs!</p>\n");
    html
}

/// Record a newsletter subscription. Re-subscribing an existing address is a
/// no-op; the bool reports whether the subscriber is new.
pub async fn subscribe(store: &dyn Store, email: &str) -> Result<(Subscriber, bool)> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(Error::General(format!("invalid email address: {email:?}")));
    }
    store.add_subscriber(email).await
}

/// Email freshly created postings to every subscriber: one send call with
/// the full recipient list. Silently skips when there is nothing to say or
/// nobody to tell; a delivery failure is contained here.
pub async fn dispatch_new_jobs(
    mailer: &dyn Mailer,
    subscribers: &[Subscriber],
    jobs: &[JobPosting],
) -> DispatchOutcome {
    if subscribers.is_empty() || jobs.is_empty() {
        return DispatchOutcome::Skipped;
    }

    let recipients: Vec<String> = subscribers.iter().map(|s| s.email.clone()).collect();
    let text = compose_text(jobs);
    let html = compose_html(jobs);

    match mailer.send(NEWSLETTER_SUBJECT, &text, &html, &recipients).await {
        Ok(()) => {
            info!("Newsletter sent to {} subscribers ({} jobs)", recipients.len(), jobs.len());
            DispatchOutcome::Sent {
                recipients: recipients.len(),
                jobs: jobs.len(),
            }
        }
        Err(e) => {
            error!("Failed to send newsletter: {}", e);
            DispatchOutcome::DeliveryFailed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Utc;
    use std::sync::Mutex;

    fn posting(id: i64, title: &str) -> JobPosting {
        JobPosting {
            id,
            title: title.to_string(),
            company: "Acme".to_string(),
            location: "Lagos".to_string(),
            description: String::new(),
            url: format!("https://jobs.example/{id}"),
            source: "Test".to_string(),
            category: String::new(),
            date_posted: Utc::now(),
            created_at: Utc::now(),
            is_paid: false,
            employer_email: None,
            payment_reference: None,
        }
    }

    fn subscriber(id: i64, email: &str) -> Subscriber {
        Subscriber {
            id,
            email: email.to_string(),
            date_subscribed: Utc::now(),
        }
    }

    /// Records every send call; optionally fails delivery.
    struct RecordingMailer {
        sends: Mutex<Vec<(String, Vec<String>)>>,
        fail: bool,
    }

    impl RecordingMailer {
        fn new(fail: bool) -> Self {
            Self {
                sends: Mutex::new(Vec::new()),
                fail,
            }
        }

        fn send_count(&self) -> usize {
            self.sends.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(
            &self,
            subject: &str,
            _text_body: &str,
            _html_body: &str,
            recipients: &[String],
        ) -> Result<()> {
            self.sends
                .lock()
                .unwrap()
                .push((subject.to_string(), recipients.to_vec()));
            if self.fail {
                return Err(Error::General("smtp down".to_string()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn zero_subscribers_means_no_send_call() {
        let mailer = RecordingMailer::new(false);
        let jobs = vec![posting(1, "A"), posting(2, "B"), posting(3, "C")];
        let outcome = dispatch_new_jobs(&mailer, &[], &jobs).await;
        assert_eq!(outcome, DispatchOutcome::Skipped);
        assert_eq!(mailer.send_count(), 0);
    }

    #[tokio::test]
    async fn no_new_jobs_means_no_send_call() {
        let mailer = RecordingMailer::new(false);
        let subs = vec![subscriber(1, "a@example.test")];
        let outcome = dispatch_new_jobs(&mailer, &subs, &[]).await;
        assert_eq!(outcome, DispatchOutcome::Skipped);
        assert_eq!(mailer.send_count(), 0);
    }

    #[tokio::test]
    async fn one_send_call_carries_the_full_recipient_list() {
        let mailer = RecordingMailer::new(false);
        let subs = vec![
            subscriber(1, "a@example.test"),
            subscriber(2, "b@example.test"),
        ];
        let jobs = vec![posting(1, "Engineer")];
        let outcome = dispatch_new_jobs(&mailer, &subs, &jobs).await;
        assert_eq!(outcome, DispatchOutcome::Sent { recipients: 2, jobs: 1 });

        let sends = mailer.sends.lock().unwrap();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].1, vec!["a@example.test", "b@example.test"]);
    }

    #[tokio::test]
    async fn delivery_failure_is_contained() {
        let mailer = RecordingMailer::new(true);
        let subs = vec![subscriber(1, "a@example.test")];
        let jobs = vec![posting(1, "Engineer")];
        let outcome = dispatch_new_jobs(&mailer, &subs, &jobs).await;
        assert!(matches!(outcome, DispatchOutcome::DeliveryFailed(_)));
        assert_eq!(mailer.send_count(), 1);
    }

    #[tokio::test]
    async fn subscribe_rejects_addresses_without_an_at_sign() {
        let store = MemoryStore::new();
        assert!(subscribe(&store, "not-an-email").await.is_err());
        assert!(subscribe(&store, "   ").await.is_err());
        assert!(store.list_subscribers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn subscribe_twice_keeps_one_record() {
        let store = MemoryStore::new();
        let (_, created) = subscribe(&store, "a@example.test").await.unwrap();
        assert!(created);
        let (_, created) = subscribe(&store, "a@example.test").await.unwrap();
        assert!(!created);
        assert_eq!(store.list_subscribers().await.unwrap().len(), 1);
    }

    #[test]
    fn text_body_enumerates_title_company_location_link() {
        let jobs = vec![posting(7, "Engineer")];
        let text = compose_text(&jobs);
        assert!(text.contains("Engineer at Acme"));
        assert!(text.contains("Location: Lagos"));
        assert!(text.contains("Link: https://jobs.example/7"));
    }

    #[test]
    fn html_body_links_each_posting() {
        let jobs = vec![posting(7, "Engineer"), posting(8, "Analyst")];
        let html = compose_html(&jobs);
        assert_eq!(html.matches("<li>").count(), 2);
        assert!(html.contains("href=\"https://jobs.example/7\""));
    }
}
