use crate::config::JOB_FEE_KOBO;
use crate::store::Store;
use crate::types::{Error, JobPosting, NewJob, PaymentConfirmation, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{error, info, warn};

/// Payment gateway boundary. `verify` output is untrusted: the caller
/// checks the amount independently.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Start a transaction; returns the authorization URL the employer is
    /// redirected to.
    async fn initialize(
        &self,
        reference: &str,
        amount: i64,
        email: &str,
        callback_url: &str,
    ) -> Result<String>;

    async fn verify(&self, reference: &str) -> Result<PaymentConfirmation>;
}

/// Paystack-style HTTP gateway client.
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

#[derive(Deserialize)]
struct GatewayEnvelope<T> {
    status: bool,
    message: Option<String>,
    data: Option<T>,
}

#[derive(Deserialize)]
struct InitializeData {
    authorization_url: String,
}

#[derive(Deserialize)]
struct VerifyData {
    status: String,
    amount: i64,
}

impl HttpGateway {
    pub fn new(secret_key: String) -> Result<Self> {
        Self::with_base_url(secret_key, "https://api.paystack.co".to_string())
    }

    pub fn with_base_url(secret_key: String, base_url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(Error::Http)?;
        Ok(Self {
            client,
            base_url,
            secret_key,
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn initialize(
        &self,
        reference: &str,
        amount: i64,
        email: &str,
        callback_url: &str,
    ) -> Result<String> {
        let body = json!({
            "reference": reference,
            "amount": amount,
            "email": email,
            "callback_url": callback_url,
        });

        let response: GatewayEnvelope<InitializeData> = self
            .client
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if !response.status {
            return Err(Error::Gateway(
                response.message.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }
        response
            .data
            .map(|d| d.authorization_url)
            .ok_or_else(|| Error::Gateway("missing authorization URL".to_string()))
    }

    async fn verify(&self, reference: &str) -> Result<PaymentConfirmation> {
        let response: GatewayEnvelope<VerifyData> = self
            .client
            .get(format!("{}/transaction/verify/{}", self.base_url, reference))
            .bearer_auth(&self.secret_key)
            .send()
            .await?
            .json()
            .await?;

        if !response.status {
            return Err(Error::Gateway(
                response.message.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }
        let data = response
            .data
            .ok_or_else(|| Error::Gateway("missing verification data".to_string()))?;
        Ok(PaymentConfirmation {
            reference: reference.to_string(),
            amount: data.amount,
            status: data.status,
        })
    }
}

/// Reference token for a posting: deterministic, derived from the id.
pub fn reference_for(job_id: i64) -> String {
    format!("{job_id}_job")
}

/// Employer submission form fields.
#[derive(Debug, Clone)]
pub struct JobSubmission {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub url: String,
    pub category: String,
    pub employer_email: String,
}

/// Outcome of a submission: the posting and its reference are always
/// persisted; the authorization URL is absent when the gateway call
/// failed (the posting stays queryable and payable later).
#[derive(Debug)]
pub struct SubmittedJob {
    pub job: JobPosting,
    pub reference: String,
    pub authorization_url: Option<String>,
    pub gateway_error: Option<String>,
}

/// Create an unpaid posting from an employer submission, durably issue its
/// reference, then ask the gateway for an authorization URL. The reference
/// is persisted before the external call so a later confirmation can
/// always be correlated even if that call fails.
pub async fn submit_job(
    store: &dyn Store,
    gateway: &dyn PaymentGateway,
    submission: JobSubmission,
    callback_url: &str,
) -> Result<SubmittedJob> {
    let title = submission.title.trim();
    if title.is_empty() {
        return Err(Error::General("submission title must not be blank".to_string()));
    }

    let job = store
        .insert_job_if_absent(NewJob {
            title: title.to_string(),
            company: submission.company,
            location: submission.location,
            description: submission.description,
            url: submission.url,
            source: "Employer".to_string(),
            category: submission.category,
            date_posted: Utc::now(),
            employer_email: Some(submission.employer_email.clone()),
        })
        .await?
        .ok_or_else(|| Error::General("a posting with this title and company already exists".to_string()))?;

    let reference = reference_for(job.id);
    store.set_payment_reference(job.id, &reference).await?;
    info!("Issued payment reference {} for posting {}", reference, job.id);

    match gateway
        .initialize(&reference, JOB_FEE_KOBO, &submission.employer_email, callback_url)
        .await
    {
        Ok(authorization_url) => Ok(SubmittedJob {
            job,
            reference,
            authorization_url: Some(authorization_url),
            gateway_error: None,
        }),
        Err(e) => {
            // Posting and reference are already durable; the employer can
            // retry payment later.
            error!("Payment gateway error for {}: {}", reference, e);
            Ok(SubmittedJob {
                job,
                reference,
                authorization_url: None,
                gateway_error: Some(e.to_string()),
            })
        }
    }
}

/// Result of handling an inbound confirmation.
#[derive(Debug, PartialEq)]
pub enum ConfirmationOutcome {
    /// This call performed the unpaid → paid transition.
    Confirmed(i64),
    /// The token was already paid; replaying the confirmation is a no-op
    /// success since callback delivery is not exactly-once.
    AlreadyPaid,
}

/// Handle an inbound payment callback. Rejections (missing or unknown
/// token, unsuccessful status, wrong amount) are deterministic, mutate
/// nothing, and are safe to replay.
pub async fn confirm_payment(
    store: &dyn Store,
    gateway: &dyn PaymentGateway,
    reference: Option<&str>,
) -> Result<ConfirmationOutcome> {
    let reference = match reference {
        Some(r) if !r.is_empty() => r,
        _ => return Err(Error::MissingReference),
    };

    let confirmation = gateway.verify(reference).await?;
    if !confirmation.is_successful() {
        warn!("Verification for {} not successful: {}", reference, confirmation.status);
        return Err(Error::PaymentNotSuccessful(confirmation.status));
    }

    let job = store
        .find_job_by_reference(reference)
        .await?
        .ok_or_else(|| Error::UnknownReference(reference.to_string()))?;

    if job.is_paid {
        info!("Confirmation replay for already-paid reference {}", reference);
        return Ok(ConfirmationOutcome::AlreadyPaid);
    }

    if confirmation.amount != JOB_FEE_KOBO {
        warn!(
            "Amount mismatch for {}: got {}, expected {}",
            reference, confirmation.amount, JOB_FEE_KOBO
        );
        return Err(Error::AmountMismatch {
            got: confirmation.amount,
            expected: JOB_FEE_KOBO,
        });
    }

    // Check-and-set at the store; a concurrent confirmation for the same
    // token loses the race and lands in the idempotent no-op case.
    if store.mark_paid_once(reference).await? {
        Ok(ConfirmationOutcome::Confirmed(job.id))
    } else {
        Ok(ConfirmationOutcome::AlreadyPaid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_is_id_underscore_job() {
        assert_eq!(reference_for(42), "42_job");
        assert_eq!(reference_for(1), "1_job");
    }
}
