use super::*;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode as HttpStatus, Uri},
    Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::{list_editor::ListEditor, post_editor::PostEditor};
use shared::domain::PostStatus;

#[derive(Debug, Clone)]
struct Captured {
    method: String,
    path_and_query: String,
    authorization: Option<String>,
    content_type: Option<String>,
    body: String,
}

#[derive(Clone)]
struct ServerState {
    routes: Arc<Vec<(&'static str, &'static str, u16, String)>>,
    captured: Arc<Mutex<Vec<Captured>>>,
}

async fn handle_any(
    State(state): State<ServerState>,
    method: axum::http::Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (HttpStatus, [(header::HeaderName, &'static str); 1], String) {
    let header_text = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    state.captured.lock().await.push(Captured {
        method: method.to_string(),
        path_and_query: uri
            .path_and_query()
            .map(|pq| pq.to_string())
            .unwrap_or_default(),
        authorization: header_text(header::AUTHORIZATION),
        content_type: header_text(header::CONTENT_TYPE),
        body,
    });

    let json_header = [(header::CONTENT_TYPE, "application/json")];
    match state
        .routes
        .iter()
        .find(|(m, path, _, _)| *m == method.as_str() && *path == uri.path())
    {
        Some((_, _, status, body)) => (
            HttpStatus::from_u16(*status).unwrap_or(HttpStatus::INTERNAL_SERVER_ERROR),
            json_header,
            body.clone(),
        ),
        None => (HttpStatus::NOT_FOUND, json_header, String::new()),
    }
}

async fn spawn_backend(
    routes: Vec<(&'static str, &'static str, u16, Value)>,
) -> anyhow::Result<(String, Arc<Mutex<Vec<Captured>>>)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let captured = Arc::new(Mutex::new(Vec::new()));
    let state = ServerState {
        routes: Arc::new(
            routes
                .into_iter()
                .map(|(method, path, status, body)| (method, path, status, body.to_string()))
                .collect(),
        ),
        captured: Arc::clone(&captured),
    };
    let app = Router::new().fallback(handle_any).with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}/api"), captured))
}

fn list_json(entries: Value) -> Value {
    json!({
        "id": 7,
        "title": "Best Bridges",
        "slug": "best-bridges",
        "intro": "Spans we love.",
        "tags": [{"id": 1, "name": "Travel", "slug": "travel"}],
        "entries": entries,
        "publishedAt": "2024-05-01T12:00:00"
    })
}

fn entry_json(id: i64, rank: u32, title: &str) -> Value {
    json!({"id": id, "rank": rank, "title": title})
}

fn post_json(id: i64, status: &str) -> Value {
    json!({
        "id": id,
        "title": "Hello",
        "slug": "hello",
        "excerpt": "Short",
        "body": "Long body",
        "tags": [],
        "status": status
    })
}

fn admin_session() -> Session {
    Session::from_credentials("user", "pass")
}

#[tokio::test]
async fn fetch_list_sorts_entries_without_credentials() {
    let (base, captured) = spawn_backend(vec![(
        "GET",
        "/api/lists/best-bridges",
        200,
        list_json(json!([
            entry_json(3, 3, "Golden Gate"),
            entry_json(1, 1, "Tower Bridge"),
            entry_json(2, 2, "Millau Viaduct"),
        ])),
    )])
    .await
    .expect("spawn backend");
    let client = LayerTenClient::new_with_session(&base, admin_session()).expect("client");

    let list = client.fetch_list("best-bridges").await.expect("fetch list");

    let ranks: Vec<u32> = list.entries.iter().map(|entry| entry.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
    let captured = captured.lock().await;
    assert_eq!(captured.len(), 1);
    assert!(captured[0].authorization.is_none());
}

#[tokio::test]
async fn list_query_is_encoded_into_the_url() {
    let (base, captured) = spawn_backend(vec![(
        "GET",
        "/api/lists",
        200,
        json!({"content": [], "totalElements": 0, "totalPages": 0, "size": 5, "number": 2}),
    )])
    .await
    .expect("spawn backend");
    let client = LayerTenClient::new(&base).expect("client");

    let page = client
        .list_lists(&PageQuery {
            search: Some("bridges".to_string()),
            tag: None,
            page: Some(2),
            size: Some(5),
        })
        .await
        .expect("lists page");

    assert_eq!(page.number, 2);
    assert_eq!(
        captured.lock().await[0].path_and_query,
        "/api/lists?search=bridges&page=2&size=5"
    );
}

#[tokio::test]
async fn admin_calls_without_session_never_reach_the_backend() {
    let (base, captured) = spawn_backend(Vec::new()).await.expect("spawn backend");
    let client = LayerTenClient::new(&base).expect("client");

    let err = client.delete_list(ListId(7)).await.expect_err("no session");

    assert!(matches!(err, ClientError::NotAuthenticated));
    assert!(err.requires_reauth());
    assert!(captured.lock().await.is_empty());
}

#[tokio::test]
async fn admin_calls_attach_basic_credentials() {
    let (base, captured) = spawn_backend(vec![("DELETE", "/api/admin/lists/7", 204, json!(null))])
        .await
        .expect("spawn backend");
    let client = LayerTenClient::new_with_session(&base, admin_session()).expect("client");

    client.delete_list(ListId(7)).await.expect("delete list");

    let captured = captured.lock().await;
    assert_eq!(captured[0].method, "DELETE");
    assert_eq!(
        captured[0].authorization.as_deref(),
        Some("Basic dXNlcjpwYXNz")
    );
}

#[tokio::test]
async fn reorder_sends_entry_rank_pairs() {
    let (base, captured) = spawn_backend(vec![(
        "PUT",
        "/api/admin/lists/7/entries/reorder",
        200,
        json!(null),
    )])
    .await
    .expect("spawn backend");
    let client = LayerTenClient::new_with_session(&base, admin_session()).expect("client");

    client
        .reorder_entries(
            ListId(7),
            &[
                EntryRankUpdate {
                    entry_id: shared::domain::EntryId(3),
                    new_rank: 1,
                },
                EntryRankUpdate {
                    entry_id: shared::domain::EntryId(1),
                    new_rank: 2,
                },
            ],
        )
        .await
        .expect("reorder");

    let body: Value = serde_json::from_str(&captured.lock().await[0].body).expect("json body");
    assert_eq!(
        body,
        json!([{"entryId": 3, "newRank": 1}, {"entryId": 1, "newRank": 2}])
    );
}

#[tokio::test]
async fn unauthorized_admin_response_expires_the_session() {
    let (base, _captured) = spawn_backend(vec![(
        "GET",
        "/api/admin/suggestions",
        401,
        json!({"status": 401, "message": "Unauthorized"}),
    )])
    .await
    .expect("spawn backend");
    let store = Arc::new(MemorySessionStore::default());
    store.save(&admin_session()).expect("seed session");
    let client =
        LayerTenClient::new_with_session_store(&base, store.clone()).expect("client");
    assert!(client.is_authenticated().await);
    let mut events = client.subscribe_events();

    let err = client.list_suggestions().await.expect_err("401");

    assert!(matches!(err, ClientError::SessionExpired));
    assert!(!client.is_authenticated().await);
    assert!(store.load().expect("load").is_none());
    assert_eq!(events.recv().await.expect("event"), ClientEvent::SessionExpired);

    let err = client.list_suggestions().await.expect_err("still signed out");
    assert!(matches!(err, ClientError::NotAuthenticated));
}

#[tokio::test]
async fn login_probes_and_persists_credentials() {
    let (base, captured) = spawn_backend(vec![("GET", "/api/admin/suggestions", 200, json!([]))])
        .await
        .expect("spawn backend");
    let store = Arc::new(MemorySessionStore::default());
    let client = LayerTenClient::new_with_dependencies(&base, None, store.clone()).expect("client");
    let mut events = client.subscribe_events();

    client.login("user", "pass").await.expect("login");

    assert!(client.is_authenticated().await);
    let stored = store.load().expect("load").expect("stored session");
    assert_eq!(stored.token(), admin_session().token());
    assert_eq!(events.recv().await.expect("event"), ClientEvent::SessionStarted);
    assert_eq!(
        captured.lock().await[0].authorization.as_deref(),
        Some("Basic dXNlcjpwYXNz")
    );

    client.logout().await.expect("logout");
    assert!(!client.is_authenticated().await);
    assert!(store.load().expect("load").is_none());
}

#[tokio::test]
async fn rejected_login_leaves_client_signed_out() {
    let (base, _captured) = spawn_backend(vec![("GET", "/api/admin/suggestions", 401, json!({}))])
        .await
        .expect("spawn backend");
    let store = Arc::new(MemorySessionStore::default());
    let client = LayerTenClient::new_with_dependencies(&base, None, store.clone()).expect("client");

    let err = client.login("user", "wrong").await.expect_err("bad password");

    assert!(matches!(err, ClientError::InvalidCredentials));
    assert!(!client.is_authenticated().await);
    assert!(store.load().expect("load").is_none());
}

#[tokio::test]
async fn backend_field_errors_are_surfaced() {
    let (base, _captured) = spawn_backend(vec![(
        "POST",
        "/api/admin/lists",
        400,
        json!({"status": 400, "message": "Validation failed", "errors": {"slug": "Slug already taken"}}),
    )])
    .await
    .expect("spawn backend");
    let client = LayerTenClient::new_with_session(&base, admin_session()).expect("client");

    let err = client
        .create_list(&CreateListRequest {
            title: "Best Bridges".to_string(),
            subtitle: None,
            intro: "Spans".to_string(),
            outro: None,
            cover_image_id: None,
            tag_ids: Vec::new(),
        })
        .await
        .expect_err("400");

    let ClientError::Api(api) = err else {
        panic!("expected api error");
    };
    assert_eq!(api.message, "Validation failed");
    assert_eq!(
        api.field_errors.get("slug").map(String::as_str),
        Some("Slug already taken")
    );
}

#[tokio::test]
async fn missing_list_is_reported_as_not_found() {
    let (base, _captured) = spawn_backend(Vec::new()).await.expect("spawn backend");
    let client = LayerTenClient::new(&base).expect("client");

    let err = client.fetch_list("nope").await.expect_err("404");
    assert!(err.is_not_found());
}

#[tokio::test]
async fn invalid_suggestion_is_rejected_locally() {
    let (base, captured) = spawn_backend(Vec::new()).await.expect("spawn backend");
    let client = LayerTenClient::new(&base).expect("client");

    let err = client
        .create_suggestion(&CreateSuggestionRequest {
            title: "Lighthouses".to_string(),
            description: " ".to_string(),
            submitter_email: Some("not-an-address".to_string()),
            ..CreateSuggestionRequest::default()
        })
        .await
        .expect_err("invalid");

    let ClientError::Validation(errors) = err else {
        panic!("expected validation error");
    };
    assert_eq!(errors.get("description"), Some("Description must not be blank"));
    assert_eq!(errors.get("submitterEmail"), Some("Email must be valid"));
    assert!(captured.lock().await.is_empty());
}

#[tokio::test]
async fn media_upload_is_multipart_with_alt_text() {
    let (base, captured) = spawn_backend(vec![(
        "POST",
        "/api/admin/media",
        201,
        json!({
            "id": 11,
            "filename": "bridge.png",
            "contentType": "image/png",
            "fileSize": 7,
            "altText": "A bridge",
            "url": "/uploads/bridge.png"
        }),
    )])
    .await
    .expect("spawn backend");
    let client = LayerTenClient::new_with_session(&base, admin_session()).expect("client");

    let asset = client
        .upload_media(MediaUpload {
            filename: "bridge.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: b"pngdata".to_vec(),
            alt_text: Some("A bridge".to_string()),
        })
        .await
        .expect("upload");

    assert_eq!(asset.id, MediaId(11));
    let captured = captured.lock().await;
    assert!(captured[0]
        .content_type
        .as_deref()
        .is_some_and(|value| value.starts_with("multipart/form-data")));
    assert!(captured[0].body.contains("name=\"file\"; filename=\"bridge.png\""));
    assert!(captured[0].body.contains("name=\"altText\""));
}

#[tokio::test]
async fn unsupported_media_type_is_rejected_locally() {
    let (base, captured) = spawn_backend(Vec::new()).await.expect("spawn backend");
    let client = LayerTenClient::new_with_session(&base, admin_session()).expect("client");

    let err = client
        .upload_media(MediaUpload {
            filename: "notes.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            bytes: b"%PDF".to_vec(),
            alt_text: None,
        })
        .await
        .expect_err("pdf");

    assert!(matches!(err, ClientError::Validation(_)));
    assert!(captured.lock().await.is_empty());
}

#[tokio::test]
async fn list_editor_save_hits_endpoints_in_order() {
    let (base, captured) = spawn_backend(vec![
        ("PUT", "/api/admin/lists/7", 200, list_json(json!([]))),
        (
            "POST",
            "/api/admin/lists/7/entries",
            201,
            entry_json(9, 3, "Øresund"),
        ),
        ("PUT", "/api/admin/lists/7/entries/reorder", 200, json!(null)),
    ])
    .await
    .expect("spawn backend");
    let client = LayerTenClient::new_with_session(&base, admin_session()).expect("client");

    let list: RankedList = serde_json::from_value(list_json(json!([
        entry_json(1, 1, "Tower Bridge"),
        entry_json(2, 2, "Millau Viaduct"),
    ])))
    .expect("list");
    let mut editor = ListEditor::from_list(list);
    editor.move_entry(1, 0).expect("move");
    editor
        .add_entry(EntryDraft {
            title: "Øresund".to_string(),
            ..EntryDraft::default()
        })
        .expect("add");

    let outcome = editor.save(&client).await.expect("save");

    assert_eq!(outcome.created_entries[0].id, shared::domain::EntryId(9));
    let captured = captured.lock().await;
    let order: Vec<(&str, &str)> = captured
        .iter()
        .map(|c| (c.method.as_str(), c.path_and_query.as_str()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("PUT", "/api/admin/lists/7"),
            ("POST", "/api/admin/lists/7/entries"),
            ("PUT", "/api/admin/lists/7/entries/reorder"),
        ]
    );
    let metadata: Value = serde_json::from_str(&captured[0].body).expect("metadata json");
    assert_eq!(metadata["tagIds"], json!([1]));
}

#[tokio::test]
async fn post_editor_creates_then_updates() {
    let (base, captured) = spawn_backend(vec![
        ("POST", "/api/admin/posts", 201, post_json(5, "DRAFT")),
        ("PUT", "/api/admin/posts/5", 200, post_json(5, "PUBLISHED")),
    ])
    .await
    .expect("spawn backend");
    let client = LayerTenClient::new_with_session(&base, admin_session()).expect("client");

    let mut editor = PostEditor::new();
    let err = editor
        .save(&client, PostStatus::Draft)
        .await
        .expect_err("empty post");
    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(editor.field_errors().len(), 3);

    editor.title = "Hello".to_string();
    editor.excerpt = "Short".to_string();
    editor.body = "Long body".to_string();
    editor.save(&client, PostStatus::Draft).await.expect("create");
    assert_eq!(editor.post_id(), Some(PostId(5)));
    assert!(editor.field_errors().is_empty());

    editor
        .save(&client, PostStatus::Published)
        .await
        .expect("publish");
    assert_eq!(editor.status, PostStatus::Published);

    let captured = captured.lock().await;
    assert_eq!(captured.len(), 2);
    let update: Value = serde_json::from_str(&captured[1].body).expect("update json");
    assert_eq!(update["status"], json!("PUBLISHED"));
}

fn suggestion_json(id: i64, status: &str) -> Value {
    json!({
        "id": id,
        "title": "Lighthouses",
        "description": "Rank the best lighthouses",
        "status": status,
        "createdAt": "2024-03-02T09:30:00"
    })
}

#[tokio::test]
async fn suggestion_status_update_replaces_local_copy() {
    let (base, captured) = spawn_backend(vec![
        (
            "GET",
            "/api/admin/suggestions",
            200,
            json!([suggestion_json(1, "NEW"), suggestion_json(2, "NEW")]),
        ),
        (
            "PUT",
            "/api/admin/suggestions/2",
            200,
            suggestion_json(2, "ACCEPTED"),
        ),
    ])
    .await
    .expect("spawn backend");
    let client = LayerTenClient::new_with_session(&base, admin_session()).expect("client");

    let mut queue = crate::suggestions::SuggestionQueue::load(&client)
        .await
        .expect("load queue");
    let updated = queue
        .set_status(&client, SuggestionId(2), SuggestionStatus::Accepted)
        .await
        .expect("update status");
    assert_eq!(updated.status, SuggestionStatus::Accepted);

    assert_eq!(queue.count(SuggestionStatus::New), 1);
    assert_eq!(queue.count(SuggestionStatus::Accepted), 1);
    let body: Value = serde_json::from_str(&captured.lock().await[1].body).expect("json body");
    assert_eq!(body, json!({"status": "ACCEPTED"}));
}
