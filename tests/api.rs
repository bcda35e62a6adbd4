//! Black-box tests against the assembled router, with the storage and email
//! collaborators replaced by in-memory doubles.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::util::ServiceExt;

use asklink::models::link::{Answer, LinkRecord, LinkStatus};
use asklink::services::link::LinkService;
use asklink::services::notification::NotificationSender;
use asklink::startup::{AppState, app};
use asklink::store::{AnswerOutcome, LinkStore};

#[derive(Default)]
struct MemoryLinkStore {
    records: Mutex<HashMap<String, LinkRecord>>,
}

impl MemoryLinkStore {
    fn status_of(&self, id: &str) -> Option<LinkStatus> {
        self.records
            .lock()
            .unwrap()
            .get(id)
            .map(|record| record.status)
    }

    fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn put(&self, id: &str, record: &LinkRecord) -> anyhow::Result<()> {
        self.records
            .lock()
            .unwrap()
            .insert(id.to_string(), record.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<LinkRecord>> {
        Ok(self.records.lock().unwrap().get(id).cloned())
    }

    async fn answer(&self, id: &str, answer: Answer) -> anyhow::Result<AnswerOutcome> {
        let mut records = self.records.lock().unwrap();
        match records.get_mut(id) {
            None => Ok(AnswerOutcome::Missing),
            Some(record) if record.status != LinkStatus::Pending => {
                Ok(AnswerOutcome::AlreadyAnswered)
            }
            Some(record) => {
                record.status = answer.into();
                Ok(AnswerOutcome::Applied)
            }
        }
    }
}

#[derive(Default)]
struct StubMailer {
    fail: bool,
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl NotificationSender for StubMailer {
    async fn send(&self, to: &str, subject: &str, _html_body: &str) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("mailer unavailable");
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string()));
        Ok(())
    }
}

struct TestApp {
    router: Router,
    store: Arc<MemoryLinkStore>,
    mailer: Arc<StubMailer>,
}

fn test_app_with(dev_mode: bool, failing_mailer: bool) -> TestApp {
    let store = Arc::new(MemoryLinkStore::default());
    let mailer = Arc::new(StubMailer {
        fail: failing_mailer,
        ..StubMailer::default()
    });
    let link_service = LinkService::new(
        store.clone(),
        mailer.clone(),
        "http://localhost:4001".into(),
        dev_mode,
    );
    TestApp {
        router: app(AppState { link_service }),
        store,
        mailer,
    }
}

fn test_app() -> TestApp {
    test_app_with(false, false)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn end_to_end_create_read_respond() {
    let harness = test_app();

    let (status, body) = send(
        &harness.router,
        post_json(
            "/api/create-link",
            &json!({"email": "a@example.com", "name": "Sam"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["id"].as_str().unwrap().to_string();
    assert_eq!(
        body["url"].as_str().unwrap(),
        &format!("http://localhost:4001/ask/{id}")
    );
    assert_eq!(body["bypass"], json!(false));

    let (status, body) = send(&harness.router, get(&format!("/api/check-link?id={id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "a@example.com");
    assert_eq!(body["name"], "Sam");
    assert_eq!(body["status"], "pending");

    let (status, body) = send(
        &harness.router,
        post_json("/api/respond", &json!({"id": id, "answer": "yes"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(harness.store.status_of(&id), Some(LinkStatus::Yes));

    let (status, body) = send(
        &harness.router,
        post_json("/api/respond", &json!({"id": id, "answer": "no"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Link already answered");
    assert_eq!(harness.store.status_of(&id), Some(LinkStatus::Yes));

    let sent = harness.mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "a@example.com");
    assert_eq!(sent[0].1, "Sam responded 💌");
}

#[tokio::test]
async fn create_requires_a_valid_email() {
    let harness = test_app();

    for body in [json!({}), json!({"email": ""}), json!({"email": "no-at-sign"})] {
        let (status, response) = send(&harness.router, post_json("/api/create-link", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"], "Valid email is required");
    }
    assert_eq!(harness.store.len(), 0);
}

#[tokio::test]
async fn create_with_malformed_body_is_a_generic_failure() {
    let harness = test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/create-link")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&harness.router, request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to create link");
}

#[tokio::test]
async fn check_link_requires_an_id() {
    let harness = test_app();

    let (status, body) = send(&harness.router, get("/api/check-link")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ID is required");
}

#[tokio::test]
async fn check_link_unknown_id_is_not_found() {
    let harness = test_app();

    let (status, body) = send(&harness.router, get("/api/check-link?id=never-created")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Link not found");
}

#[tokio::test]
async fn respond_rejects_answers_outside_the_two_accepted_values() {
    let harness = test_app();

    let (_, created) = send(
        &harness.router,
        post_json("/api/create-link", &json!({"email": "a@example.com"})),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();

    for answer in ["maybe", "YES", ""] {
        let (status, body) = send(
            &harness.router,
            post_json("/api/respond", &json!({"id": id, "answer": answer})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Answer must be \"yes\" or \"no\"");
    }
    assert_eq!(harness.store.status_of(&id), Some(LinkStatus::Pending));
}

#[tokio::test]
async fn respond_requires_an_id() {
    let harness = test_app();

    let (status, body) = send(
        &harness.router,
        post_json("/api/respond", &json!({"answer": "yes"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ID is required");
}

#[tokio::test]
async fn respond_unknown_id_is_not_found() {
    let harness = test_app();

    let (status, body) = send(
        &harness.router,
        post_json("/api/respond", &json!({"id": "never-created", "answer": "yes"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Link not found");
}

#[tokio::test]
async fn notification_failure_does_not_fail_the_response() {
    let harness = test_app_with(false, true);

    let (_, created) = send(
        &harness.router,
        post_json("/api/create-link", &json!({"email": "a@example.com"})),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &harness.router,
        post_json("/api/respond", &json!({"id": id, "answer": "yes"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(harness.store.status_of(&id), Some(LinkStatus::Yes));
}

#[tokio::test]
async fn concurrent_responds_have_a_single_winner() {
    let harness = test_app();

    let (_, created) = send(
        &harness.router,
        post_json("/api/create-link", &json!({"email": "a@example.com"})),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();

    let first = send(
        &harness.router,
        post_json("/api/respond", &json!({"id": id, "answer": "yes"})),
    );
    let second = send(
        &harness.router,
        post_json("/api/respond", &json!({"id": id, "answer": "no"})),
    );
    let ((first_status, _), (second_status, _)) = tokio::join!(first, second);

    let winners = [first_status, second_status]
        .iter()
        .filter(|status| **status == StatusCode::OK)
        .count();
    assert_eq!(winners, 1);

    let loser = if first_status == StatusCode::OK {
        second_status
    } else {
        first_status
    };
    assert_eq!(loser, StatusCode::BAD_REQUEST);
    assert_eq!(harness.mailer.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn dev_mode_bypasses_storage_and_email() {
    let harness = test_app_with(true, false);

    let (status, body) = send(&harness.router, post_json("/api/create-link", &json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bypass"], json!(true));
    let id = body["id"].as_str().unwrap().to_string();
    assert!(body["url"].as_str().unwrap().contains(&format!("/ask/{id}")));
    assert_eq!(harness.store.len(), 0);

    let (status, body) = send(&harness.router, get(&format!("/api/check-link?id={id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "dev@example.com");
    assert_eq!(body["status"], "pending");

    let (status, body) = send(
        &harness.router,
        post_json("/api/respond", &json!({"id": id, "answer": "yes"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["bypass"], json!(true));
    assert_eq!(harness.store.len(), 0);
    assert!(harness.mailer.sent.lock().unwrap().is_empty());
}
