use async_trait::async_trait;
use job_aggregator::payment::{
    confirm_payment, submit_job, ConfirmationOutcome, JobSubmission, PaymentGateway,
};
use job_aggregator::store::{MemoryStore, Store};
use job_aggregator::types::{Error, PaymentConfirmation, Result};
use std::sync::Mutex;

const CALLBACK_URL: &str = "https://example.test/payment-callback/";

/// Gateway double: canned verify responses, optional initialize failure,
/// and a call log so tests can assert ordering against store state.
struct MockGateway {
    verify_response: Mutex<Option<PaymentConfirmation>>,
    fail_initialize: bool,
    initialize_calls: Mutex<Vec<String>>,
}

impl MockGateway {
    fn new() -> Self {
        Self {
            verify_response: Mutex::new(None),
            fail_initialize: false,
            initialize_calls: Mutex::new(Vec::new()),
        }
    }

    fn failing_initialize() -> Self {
        Self {
            fail_initialize: true,
            ..Self::new()
        }
    }

    fn set_verify(&self, reference: &str, amount: i64, status: &str) {
        *self.verify_response.lock().unwrap() = Some(PaymentConfirmation {
            reference: reference.to_string(),
            amount,
            status: status.to_string(),
        });
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn initialize(
        &self,
        reference: &str,
        _amount: i64,
        _email: &str,
        _callback_url: &str,
    ) -> Result<String> {
        self.initialize_calls
            .lock()
            .unwrap()
            .push(reference.to_string());
        if self.fail_initialize {
            return Err(Error::Gateway("gateway unreachable".to_string()));
        }
        Ok(format!("https://gateway.test/authorize/{reference}"))
    }

    async fn verify(&self, reference: &str) -> Result<PaymentConfirmation> {
        self.verify_response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::Gateway(format!("no transaction for {reference}")))
    }
}

fn submission(title: &str) -> JobSubmission {
    JobSubmission {
        title: title.to_string(),
        company: "Acme".to_string(),
        location: "Lagos".to_string(),
        description: "desc".to_string(),
        url: "https://jobs.example/acme".to_string(),
        category: "Engineering".to_string(),
        employer_email: "hr@acme.test".to_string(),
    }
}

#[tokio::test]
async fn submission_with_id_42_issues_reference_42_job() {
    let _ = tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).try_init();

    let store = MemoryStore::new();
    store.set_next_job_id(42).await;
    let gateway = MockGateway::new();

    let submitted = submit_job(&store, &gateway, submission("Backend Engineer"), CALLBACK_URL)
        .await
        .unwrap();

    assert_eq!(submitted.job.id, 42);
    assert_eq!(submitted.reference, "42_job");
    assert!(submitted.authorization_url.is_some());

    let stored = store.get_job(42).await.unwrap().unwrap();
    assert_eq!(stored.payment_reference.as_deref(), Some("42_job"));
    assert!(!stored.is_paid);
}

#[tokio::test]
async fn reference_is_persisted_before_the_gateway_call() {
    let store = MemoryStore::new();
    let gateway = MockGateway::failing_initialize();

    let submitted = submit_job(&store, &gateway, submission("Backend Engineer"), CALLBACK_URL)
        .await
        .unwrap();

    // The gateway was reached and failed, yet the posting keeps its
    // durable reference and stays correlatable/resubmittable.
    assert_eq!(gateway.initialize_calls.lock().unwrap().len(), 1);
    assert!(submitted.authorization_url.is_none());
    assert!(submitted.gateway_error.is_some());

    let stored = store.get_job(submitted.job.id).await.unwrap().unwrap();
    assert_eq!(stored.payment_reference, Some(submitted.reference));
    assert!(!stored.is_paid);
}

#[tokio::test]
async fn unknown_reference_is_rejected_without_mutation() {
    let store = MemoryStore::new();
    let gateway = MockGateway::new();
    gateway.set_verify("999_job", 500_000, "success");

    let result = confirm_payment(&store, &gateway, Some("999_job")).await;
    match result {
        Err(Error::UnknownReference(reference)) => assert_eq!(reference, "999_job"),
        other => panic!("expected UnknownReference, got {other:?}"),
    }
    // Error carries a human-readable message for the callback response.
    let message = confirm_payment(&store, &gateway, Some("999_job"))
        .await
        .unwrap_err()
        .to_string();
    assert!(message.contains("999_job"));
}

#[tokio::test]
async fn missing_reference_is_rejected_before_any_gateway_call() {
    let store = MemoryStore::new();
    let gateway = MockGateway::new();

    assert!(matches!(
        confirm_payment(&store, &gateway, None).await,
        Err(Error::MissingReference)
    ));
    assert!(matches!(
        confirm_payment(&store, &gateway, Some("")).await,
        Err(Error::MissingReference)
    ));
}

#[tokio::test]
async fn correct_confirmation_pays_once_and_replays_as_no_op() {
    let store = MemoryStore::new();
    let gateway = MockGateway::new();

    let submitted = submit_job(&store, &gateway, submission("Backend Engineer"), CALLBACK_URL)
        .await
        .unwrap();
    gateway.set_verify(&submitted.reference, 500_000, "success");

    let first = confirm_payment(&store, &gateway, Some(&submitted.reference))
        .await
        .unwrap();
    assert_eq!(first, ConfirmationOutcome::Confirmed(submitted.job.id));
    assert!(store.get_job(submitted.job.id).await.unwrap().unwrap().is_paid);

    // Identical replay: callback delivery is not exactly-once.
    let replay = confirm_payment(&store, &gateway, Some(&submitted.reference))
        .await
        .unwrap();
    assert_eq!(replay, ConfirmationOutcome::AlreadyPaid);
    assert!(store.get_job(submitted.job.id).await.unwrap().unwrap().is_paid);
}

#[tokio::test]
async fn amount_mismatch_leaves_paid_flag_false() {
    let store = MemoryStore::new();
    let gateway = MockGateway::new();

    let submitted = submit_job(&store, &gateway, submission("Backend Engineer"), CALLBACK_URL)
        .await
        .unwrap();
    gateway.set_verify(&submitted.reference, 450_000, "success");

    let result = confirm_payment(&store, &gateway, Some(&submitted.reference)).await;
    assert!(matches!(
        result,
        Err(Error::AmountMismatch { got: 450_000, expected: 500_000 })
    ));
    assert!(!store.get_job(submitted.job.id).await.unwrap().unwrap().is_paid);
}

#[tokio::test]
async fn unsuccessful_verification_status_is_rejected() {
    let store = MemoryStore::new();
    let gateway = MockGateway::new();

    let submitted = submit_job(&store, &gateway, submission("Backend Engineer"), CALLBACK_URL)
        .await
        .unwrap();
    gateway.set_verify(&submitted.reference, 500_000, "abandoned");

    let result = confirm_payment(&store, &gateway, Some(&submitted.reference)).await;
    assert!(matches!(result, Err(Error::PaymentNotSuccessful(_))));
    assert!(!store.get_job(submitted.job.id).await.unwrap().unwrap().is_paid);
}

#[tokio::test]
async fn duplicate_submission_is_rejected() {
    let store = MemoryStore::new();
    let gateway = MockGateway::new();

    submit_job(&store, &gateway, submission("Backend Engineer"), CALLBACK_URL)
        .await
        .unwrap();
    let second = submit_job(&store, &gateway, submission("Backend Engineer"), CALLBACK_URL).await;
    assert!(second.is_err());
    assert_eq!(store.job_count().await, 1);
}
