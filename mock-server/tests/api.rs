use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, JSON_API};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn authed(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, JSON_API)
        .header(http::header::AUTHORIZATION, "Bearer test-token")
        .body(body.to_string())
        .unwrap()
}

fn content_type(response: &axum::response::Response) -> Option<&str> {
    response
        .headers()
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
}

// --- auth ---

#[tokio::test]
async fn missing_bearer_returns_401_with_errors() {
    let resp = app()
        .oneshot(Request::builder().uri("/projects").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["errors"][0]["status"], "401");
}

#[tokio::test]
async fn blank_bearer_returns_401() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/projects")
                .header(http::header::AUTHORIZATION, "Bearer ")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- list ---

#[tokio::test]
async fn list_projects_empty() {
    let resp = app().oneshot(authed("GET", "/projects", "")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(content_type(&resp), Some(JSON_API));
    let body = body_json(resp).await;
    assert_eq!(body, json!({"data": [], "meta": {"total": 0}}));
}

// --- create ---

#[tokio::test]
async fn create_project_returns_201() {
    let resp = app()
        .oneshot(authed(
            "POST",
            "/projects",
            r#"{"data":{"type":"projects","attributes":{"name":"Apollo"}}}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["type"], "projects");
    assert_eq!(body["data"]["attributes"]["name"], "Apollo");
    assert!(body["data"]["id"].as_str().is_some());
}

#[tokio::test]
async fn create_project_without_name_returns_422() {
    let resp = app()
        .oneshot(authed("POST", "/projects", r#"{"data":{"type":"projects"}}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(resp).await;
    assert_eq!(body["errors"][0]["detail"], "name is required");
}

#[tokio::test]
async fn create_project_malformed_json_returns_400() {
    let resp = app()
        .oneshot(authed("POST", "/projects", "{not json"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- get / update / delete ---

#[tokio::test]
async fn get_project_not_found() {
    let resp = app()
        .oneshot(authed("GET", "/projects/missing", ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["errors"][0]["title"], "Not Found");
}

#[tokio::test]
async fn update_project_not_found() {
    let resp = app()
        .oneshot(authed(
            "PATCH",
            "/projects/missing",
            r#"{"data":{"attributes":{"name":"Nope"}}}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_project_not_found() {
    let resp = app()
        .oneshot(authed("DELETE", "/projects/missing", ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- misbehaving endpoints ---

#[tokio::test]
async fn empty_returns_no_body() {
    let resp = app().oneshot(authed("GET", "/empty", "")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn garbage_is_not_json() {
    let resp = app().oneshot(authed("GET", "/garbage", "")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body_bytes(resp).await;
    assert!(serde_json::from_slice::<Value>(&bytes).is_err());
}

#[tokio::test]
async fn slow_waits_then_answers() {
    let resp = app().oneshot(authed("GET", "/slow?ms=5", "")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["attributes"]["ms"], 5);
}

#[tokio::test]
async fn echo_reports_raw_path() {
    let resp = app()
        .oneshot(authed("GET", "/echo/a%20b?x=1", ""))
        .await
        .unwrap();

    let body = body_json(resp).await;
    assert_eq!(body["meta"]["path"], "/echo/a%20b");
    assert_eq!(body["meta"]["query"], "x=1");
}

// --- full lifecycle ---

#[tokio::test]
async fn project_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed(
            "POST",
            "/projects",
            r#"{"data":{"type":"projects","attributes":{"name":"Gemini"},
                "relationships":{"owner":{"data":{"type":"users","id":"u1"}}}}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = body_json(resp).await;
    let id = created["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["data"]["relationships"]["owner"]["data"]["id"], "u1");

    // list
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("GET", "/projects", ""))
        .await
        .unwrap();
    let listed = body_json(resp).await;
    assert_eq!(listed["meta"]["total"], 1);
    assert_eq!(listed["data"][0]["id"], id.as_str());

    // update only the description
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed(
            "PATCH",
            &format!("/projects/{id}"),
            r#"{"data":{"type":"projects","attributes":{"description":"crewed"}}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated = body_json(resp).await;
    assert_eq!(updated["data"]["attributes"]["name"], "Gemini");
    assert_eq!(updated["data"]["attributes"]["description"], "crewed");

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("DELETE", &format!("/projects/{id}"), ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let deleted = body_json(resp).await;
    assert_eq!(deleted, json!({"meta": {"deleted": id}}));

    // get after delete is a 404
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("GET", &format!("/projects/{id}"), ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
