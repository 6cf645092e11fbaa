use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use tower::ServiceExt;

use super::build_router;
use crate::session::Session;
use crate::state::AppState;
use crate::testing::{
    auth_error, no_key_session, python_java_resume, ready_session, ScriptedCompletion,
};

const BOUNDARY: &str = "----resume-search-test-boundary";

fn app(session: Session) -> Router {
    build_router(AppState::new(session, true), 1024 * 1024)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn query(q: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/query")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("q={q}")))
        .unwrap()
}

fn upload(files: &[(&str, &str)]) -> Request<Body> {
    let mut body = String::new();
    for (name, content) in files {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\nContent-Type: application/pdf\r\n\r\n{content}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_index_without_store_shows_upload_only() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(ready_session(tmp.path().join("db"), ScriptedCompletion::with(vec![])));

    let (status, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"id="upload-form""#));
    assert!(!body.contains(r#"id="query-form""#));
}

#[tokio::test]
async fn test_query_without_store_is_refused() {
    let tmp = tempfile::tempdir().unwrap();
    let completion = ScriptedCompletion::with(vec![]);
    let app = app(ready_session(tmp.path().join("db"), completion.clone()));

    let (status, body) = send(&app, query("Python")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(!body.contains(r#"id="query-form""#));
    assert_eq!(completion.calls(), 0);
}

#[tokio::test]
async fn test_upload_then_query_end_to_end() {
    let tmp = tempfile::tempdir().unwrap();
    let completion = ScriptedCompletion::with(vec![Ok("Jane_Doe_matches".to_string())]);
    let app = app(ready_session(tmp.path().join("db"), completion.clone()));

    let resume = python_java_resume();
    let (status, body) = send(&app, upload(&[("jane.pdf", &resume)])).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"id="upload-report""#));
    assert!(body.contains(r#"id="query-form""#));

    let (status, body) = send(&app, query("Python")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Jane_Doe_matches"));
    assert!(body.contains("jane.pdf"));

    let prompt = &completion.prompts()[0];
    assert!(prompt.contains("matching these skills: Python"));
    assert!(prompt.contains("Python, Java"));
}

#[tokio::test]
async fn test_upload_reports_failed_file_alongside_indexed_one() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(ready_session(tmp.path().join("db"), ScriptedCompletion::with(vec![])));

    let (status, body) = send(&app, upload(&[("ok.pdf", "Go"), ("broken.pdf", "FAIL")])).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("broken.pdf"));
    assert!(body.contains(r#"class="warning""#));
}

#[tokio::test]
async fn test_upload_with_no_files_is_a_validation_error() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(ready_session(tmp.path().join("db"), ScriptedCompletion::with(vec![])));

    let (status, _) = send(&app, upload(&[])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_auth_error_is_shown_and_next_query_succeeds() {
    let tmp = tempfile::tempdir().unwrap();
    let completion = ScriptedCompletion::with(vec![Err(auth_error())]);
    let app = app(ready_session(tmp.path().join("db"), completion.clone()));
    send(&app, upload(&[("a.pdf", "Python developer")])).await;

    let (status, body) = send(&app, query("Python")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains(r#"id="error""#));
    assert!(body.contains("Invalid"));
    assert!(body.contains(r#"id="query-form""#));

    let (status, body) = send(&app, query("Python")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"id="answer""#));
    assert_eq!(completion.calls(), 2);
}

#[tokio::test]
async fn test_missing_key_hides_every_form() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("db");
    std::fs::create_dir_all(&dir).unwrap();
    let app = app(no_key_session(dir));

    let (status, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"id="config-error""#));
    assert!(!body.contains(r#"id="query-form""#));
    assert!(!body.contains(r#"id="upload-form""#));

    let (status, _) = send(&app, query("Python")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let (status, _) = send(&app, upload(&[("a.pdf", "Python")])).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_clear_removes_query_form() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(ready_session(tmp.path().join("db"), ScriptedCompletion::with(vec![])));
    send(&app, upload(&[("a.pdf", "Python")])).await;

    let request = Request::builder()
        .method("POST")
        .uri("/clear")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains(r#"id="query-form""#));
}

#[tokio::test]
async fn test_health_reports_phase() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(ready_session(tmp.path().join("db"), ScriptedCompletion::with(vec![])));

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "resume-search");
    assert_eq!(json["phase"], "idle");
    assert_eq!(json["store_ready"], false);
    assert_eq!(json["entries"], 0);
}

#[tokio::test]
async fn test_health_reports_busy_while_session_is_held() {
    let tmp = tempfile::tempdir().unwrap();
    let state = AppState::new(
        ready_session(tmp.path().join("db"), ScriptedCompletion::with(vec![])),
        true,
    );
    let app = build_router(state.clone(), 1024 * 1024);

    let _held = state.session.lock().await;
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["phase"], "busy");
    assert!(json.get("store_ready").is_none());
}
