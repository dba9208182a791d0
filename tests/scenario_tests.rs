use std::sync::Arc;
use std::time::Duration;

use jobflow::{
    DelayAdapter, InMemoryJobStore, Job, JobError, JobFilter, JobId, JobStatus, JobflowConfig,
    LifecycleEngine, Priority, SubmitRequest, WebhookNotifier,
};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DELAY: Duration = Duration::from_millis(200);

fn engine_for(webhook: Option<String>) -> LifecycleEngine {
    LifecycleEngine::new(
        InMemoryJobStore::arc(),
        Arc::new(DelayAdapter::new(DELAY)),
        Arc::new(WebhookNotifier::new(webhook).unwrap()),
    )
}

async fn wait_for(engine: &LifecycleEngine, id: JobId, status: JobStatus) -> Job {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let job = engine.get(id).unwrap();
        if job.status == status {
            return job;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {id} never reached {status}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn send_email_job_runs_to_completion_and_notifies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine_for(Some(format!("{}/webhook", server.uri())));

    let job = engine
        .submit(SubmitRequest::new("Send Email", "High", json!({"to": "a@b.com"})))
        .unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.priority, Priority::High);

    let ack = engine.trigger(job.id).await.unwrap();
    assert_eq!(
        serde_json::to_value(&ack).unwrap(),
        json!({"message": "Job started", "jobId": job.id.get()})
    );

    let running = engine.get(job.id).unwrap();
    assert_eq!(running.status, JobStatus::Running);

    let done = wait_for(&engine, job.id, JobStatus::Completed).await;
    let completed_at = done.completed_at.expect("completedAt populated");
    assert!(completed_at >= running.updated_at);
    assert_eq!(done.payload, json!({"to": "a@b.com"}));

    // The webhook call follows the completed write; give it a moment to land.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    let requests = loop {
        let requests = server.received_requests().await.unwrap_or_default();
        if !requests.is_empty() || tokio::time::Instant::now() >= deadline {
            break requests;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    };
    assert_eq!(requests.len(), 1);

    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["jobId"], job.id.get());
    assert_eq!(body["taskName"], "Send Email");
    assert_eq!(body["priority"], "High");
    assert_eq!(body["status"], "completed");
    assert_eq!(body["payload"], json!({"to": "a@b.com"}));
    assert!(body["completedAt"].is_string());
}

#[tokio::test]
async fn unreachable_webhook_does_not_fail_the_job() {
    let engine = engine_for(Some("http://127.0.0.1:9/unreachable".into()));
    let job = engine
        .submit(SubmitRequest::new("Send Email", "Low", json!({})))
        .unwrap();

    engine.trigger(job.id).await.unwrap();
    wait_for(&engine, job.id, JobStatus::Completed).await;

    // Give the delivery attempt time to fail, then make sure nothing moved.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(engine.get(job.id).unwrap().status, JobStatus::Completed);
}

#[tokio::test]
async fn listing_reflects_lifecycle() {
    let engine = engine_for(None);
    let email = engine
        .submit(SubmitRequest::new("Send Email", "High", json!({"to": "a@b.com"})))
        .unwrap();
    let report = engine
        .submit(SubmitRequest::new("Generate Report", "Medium", json!(null)))
        .unwrap();

    engine.trigger(email.id).await.unwrap();
    wait_for(&engine, email.id, JobStatus::Completed).await;

    let all = engine.list(&JobFilter::all()).unwrap();
    assert_eq!(
        all.iter().map(|j| j.id).collect::<Vec<_>>(),
        vec![report.id, email.id]
    );

    let completed = engine
        .list(&JobFilter::parse(Some("completed"), None).unwrap())
        .unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, email.id);

    let pending_medium = engine
        .list(&JobFilter::parse(Some("pending"), Some("Medium")).unwrap())
        .unwrap();
    assert_eq!(pending_medium.len(), 1);
    assert_eq!(pending_medium[0].payload, json!({}));
}

#[tokio::test]
async fn engine_from_config_honors_delay() {
    let config = JobflowConfig {
        execution_delay_ms: 50,
        ..Default::default()
    };
    let engine = LifecycleEngine::from_config(&config).unwrap();
    let job = engine
        .submit(SubmitRequest::new("Resize Image", "Medium", json!({"width": 640})))
        .unwrap();

    engine.trigger(job.id).await.unwrap();
    let done = wait_for(&engine, job.id, JobStatus::Completed).await;
    assert!(done.completed_at.is_some());
}

#[tokio::test]
async fn invalid_requests_leave_no_trace() {
    let engine = engine_for(None);

    let err = engine
        .submit(SubmitRequest::new("Send Email", "Critical", json!({})))
        .unwrap_err();
    assert!(matches!(err, JobError::Validation(_)));

    let err = engine.trigger(JobId::new(1)).await.unwrap_err();
    assert!(matches!(err, JobError::NotFound(_)));

    assert!(engine.list(&JobFilter::all()).unwrap().is_empty());
}
