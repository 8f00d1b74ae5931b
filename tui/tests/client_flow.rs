/// End-to-end tests for the client core, run against an in-process stub of
/// the news service.
///
/// The stub terminates real HTTP/1.1 connections and speaks the same wire
/// contract as the production service, with an in-memory comment list so
/// mutations are observable through refetches.
use shared::types::{ApiError, CommentPayload};
use tui::api::ApiClient;
use tui::collections::{CollectionKey, Collections};
use tui::edit::{EditSessions, SaveError};
use tui::session::SessionStore;

// ---------------------------------------------------------------------------
// Stub service
// ---------------------------------------------------------------------------

mod stub {
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;
    use http_body_util::{BodyExt, Full};
    use hyper::body::Incoming;
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::{Method, Request, Response, StatusCode};
    use hyper_util::rt::TokioIo;
    use serde_json::{Value, json};
    use tokio::net::TcpListener;

    pub const PASSWORD: &str = "Secret123!";

    pub struct Stub {
        pub addr: SocketAddr,
        pub comments: Arc<Mutex<Vec<Value>>>,
    }

    pub fn news_item() -> Value {
        json!({
            "id": 3,
            "title": "Launch day",
            "content": {"text": "We shipped."},
            "cover": null,
            "author_id": 42,
            "publication_date": "2025-11-02T10:00:00",
            "author": {"id": 42, "name": "alice"}
        })
    }

    pub fn comment(id: i64, text: &str) -> Value {
        json!({
            "id": id,
            "news_id": 3,
            "text": text,
            "author_id": 42,
            "publication_date": "2025-11-02T11:00:00",
            "author": {"id": 42, "name": "alice"}
        })
    }

    pub async fn start(seed: Vec<Value>, token: &str) -> Stub {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let comments = Arc::new(Mutex::new(seed));

        let state = comments.clone();
        let token = token.to_string();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let io = TokioIo::new(stream);
                let comments = state.clone();
                let token = token.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req| {
                        handle(req, comments.clone(), token.clone())
                    });
                    // Client-side hangups are uninteresting here.
                    let _ = http1::Builder::new().serve_connection(io, service).await;
                });
            }
        });

        Stub { addr, comments }
    }

    async fn handle(
        req: Request<Incoming>,
        comments: Arc<Mutex<Vec<Value>>>,
        token: String,
    ) -> Result<Response<Full<Bytes>>, Infallible> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let authed = req.headers().contains_key("authorization");
        let body = req.into_body().collect().await.unwrap().to_bytes();

        let (status, payload) = if method == Method::POST && path == "/auth/login" {
            let params: HashMap<String, String> =
                form_urlencoded::parse(body.as_ref()).into_owned().collect();
            if params.get("password").map(String::as_str) == Some(PASSWORD) {
                (StatusCode::OK, json!({ "access_token": token }))
            } else {
                (
                    StatusCode::UNAUTHORIZED,
                    json!({ "detail": "Wrong email or password" }),
                )
            }
        } else if method == Method::GET && path == "/news/" {
            (StatusCode::OK, json!([news_item()]))
        } else if method == Method::GET && path == "/news/3" {
            (StatusCode::OK, news_item())
        } else if method == Method::GET && path == "/comments/" {
            let list = comments.lock().unwrap().clone();
            (StatusCode::OK, Value::Array(list))
        } else if method == Method::POST && path == "/comments/" {
            if !authed {
                (
                    StatusCode::UNAUTHORIZED,
                    json!({ "detail": "Not authenticated" }),
                )
            } else {
                let sent: Value = serde_json::from_slice(&body).unwrap();
                let mut list = comments.lock().unwrap();
                let id = 100 + list.len() as i64;
                let created = json!({
                    "id": id,
                    "news_id": sent["news_id"],
                    "text": sent["text"],
                    "author_id": 42,
                    "publication_date": "2025-11-02T12:00:00",
                    "author": {"id": 42, "name": "alice"}
                });
                list.push(created.clone());
                (StatusCode::OK, created)
            }
        } else if method == Method::PUT && path.starts_with("/comments/") {
            let id: i64 = path.trim_start_matches("/comments/").parse().unwrap();
            let sent: Value = serde_json::from_slice(&body).unwrap();
            if !authed {
                (
                    StatusCode::UNAUTHORIZED,
                    json!({ "detail": "Not authenticated" }),
                )
            } else if sent["text"] == "explode" {
                // Canned failure for the save-error path.
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "detail": "boom" }),
                )
            } else {
                let mut list = comments.lock().unwrap();
                match list.iter_mut().find(|c| c["id"] == json!(id)) {
                    Some(stored) => {
                        stored["text"] = sent["text"].clone();
                        (StatusCode::OK, stored.clone())
                    }
                    None => (
                        StatusCode::NOT_FOUND,
                        json!({ "detail": "Comment not found" }),
                    ),
                }
            }
        } else if method == Method::DELETE && path.starts_with("/comments/") {
            let id: i64 = path.trim_start_matches("/comments/").parse().unwrap();
            if !authed {
                (
                    StatusCode::UNAUTHORIZED,
                    json!({ "detail": "Not authenticated" }),
                )
            } else {
                let mut list = comments.lock().unwrap();
                list.retain(|c| c["id"] != json!(id));
                (StatusCode::OK, json!({ "status": "deleted" }))
            }
        } else {
            (StatusCode::NOT_FOUND, json!({ "detail": "Not found" }))
        };

        let response = Response::builder()
            .status(status)
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from(payload.to_string())))
            .unwrap();
        Ok(response)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn forge_token(sub: &str, admin: bool, verified: bool, exp: u64) -> String {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        format!(
            r#"{{"sub":"{}","admin":{},"verified":{},"exp":{}}}"#,
            sub, admin, verified, exp
        )
        .as_bytes(),
    );
    format!("{}.{}.sig", header, payload)
}

fn client_for(addr: std::net::SocketAddr) -> ApiClient {
    let mut service = shared::types::ServiceConfig::default();
    service.base_url = format!("http://{}", addr);
    service.request_timeout_secs = 5;
    ApiClient::new(&service).unwrap()
}

fn session_in(dir: &tempfile::TempDir) -> SessionStore {
    SessionStore::new(dir.path().join("token"))
}

const FAR_FUTURE: u64 = 4_102_444_800; // 2100-01-01
const NOW_MS: u64 = 1_700_000_000_000;

// ---------------------------------------------------------------------------
// Session flows
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_persists_token_and_sets_principal() {
    let token = forge_token("42", false, true, FAR_FUTURE);
    let service = stub::start(vec![], &token).await;
    let api = client_for(service.addr);
    let dir = tempfile::tempdir().unwrap();

    let mut session = session_in(&dir);
    let principal = session
        .login(&api, "alice@example.com", stub::PASSWORD, NOW_MS)
        .await
        .unwrap();

    assert_eq!(principal.id, 42);
    assert!(principal.is_verified);
    assert!(!principal.is_admin);
    assert_eq!(session.bearer(), Some(token.as_str()));
    assert!(dir.path().join("token").exists());

    // A fresh store restores the same session from disk.
    let mut restored = session_in(&dir);
    restored.restore(NOW_MS);
    assert_eq!(restored.principal(), Some(&principal));
}

#[tokio::test]
async fn login_failure_surfaces_detail_and_leaves_session_unchanged() {
    let token = forge_token("42", false, true, FAR_FUTURE);
    let service = stub::start(vec![], &token).await;
    let api = client_for(service.addr);
    let dir = tempfile::tempdir().unwrap();

    let mut session = session_in(&dir);
    let err = session
        .login(&api, "alice@example.com", "wrong", NOW_MS)
        .await
        .unwrap_err();

    // The server's detail string reaches the form verbatim.
    assert_eq!(err.to_string(), "Wrong email or password");
    assert!(session.principal().is_none());
    assert!(!dir.path().join("token").exists());
}

#[tokio::test]
async fn login_rejects_an_already_expired_token() {
    let token = forge_token("42", false, true, 1_000);
    let service = stub::start(vec![], &token).await;
    let api = client_for(service.addr);
    let dir = tempfile::tempdir().unwrap();

    let mut session = session_in(&dir);
    let result = session
        .login(&api, "alice@example.com", stub::PASSWORD, NOW_MS)
        .await;

    assert!(result.is_err());
    assert!(session.principal().is_none());
    assert!(!dir.path().join("token").exists());
}

// ---------------------------------------------------------------------------
// Mutation + refetch flows
// ---------------------------------------------------------------------------

#[tokio::test]
async fn inline_edit_flow_updates_list_after_refetch() {
    let token = forge_token("42", false, true, FAR_FUTURE);
    let service = stub::start(vec![stub::comment(9, "old text")], &token).await;
    let api = client_for(service.addr);
    let dir = tempfile::tempdir().unwrap();

    let mut session = session_in(&dir);
    session
        .login(&api, "alice@example.com", stub::PASSWORD, NOW_MS)
        .await
        .unwrap();

    let mut collections = Collections::default();
    collections
        .refetch(&api, &session, CollectionKey::Comments(3))
        .await
        .unwrap();
    assert_eq!(collections.comments(3).unwrap()[0].text, "old text");

    let mut edits = EditSessions::new(1);
    edits.begin(9, "old text");
    edits.update_draft(9, "X".into());

    let bearer = session.bearer().map(str::to_string);
    let api_for_save = api.clone();
    edits
        .save(9, |draft| async move {
            api_for_save
                .update_comment(
                    9,
                    &CommentPayload {
                        news_id: 3,
                        text: draft,
                    },
                    bearer.as_deref(),
                )
                .await
        })
        .await
        .unwrap();

    assert!(!edits.is_open(9), "edit session closes after a save");

    collections
        .refetch(&api, &session, CollectionKey::Comments(3))
        .await
        .unwrap();
    assert_eq!(collections.comments(3).unwrap()[0].text, "X");
}

#[tokio::test]
async fn failed_save_keeps_draft_and_cached_list_untouched() {
    let token = forge_token("42", false, true, FAR_FUTURE);
    let service = stub::start(vec![stub::comment(9, "old text")], &token).await;
    let api = client_for(service.addr);
    let dir = tempfile::tempdir().unwrap();

    let mut session = session_in(&dir);
    session
        .login(&api, "alice@example.com", stub::PASSWORD, NOW_MS)
        .await
        .unwrap();

    let mut collections = Collections::default();
    collections
        .refetch(&api, &session, CollectionKey::Comments(3))
        .await
        .unwrap();

    let mut edits = EditSessions::new(1);
    edits.begin(9, "old text");
    edits.update_draft(9, "explode".into());

    let bearer = session.bearer().map(str::to_string);
    let api_for_save = api.clone();
    let result = edits
        .save(9, |draft| async move {
            api_for_save
                .update_comment(
                    9,
                    &CommentPayload {
                        news_id: 3,
                        text: draft,
                    },
                    bearer.as_deref(),
                )
                .await
        })
        .await;

    match result {
        Err(SaveError::Failed(ApiError::Status { status, message })) => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(message, "boom");
        }
        other => panic!("expected a failed save, got {:?}", other.err()),
    }

    // Draft retained for a manual retry; no refetch ran, cache untouched.
    assert!(edits.is_open(9));
    assert_eq!(edits.draft(9), Some("explode"));
    assert_eq!(collections.comments(3).unwrap()[0].text, "old text");
}

#[tokio::test]
async fn comment_create_and_delete_round_trip_via_refetch() {
    let token = forge_token("42", false, true, FAR_FUTURE);
    let service = stub::start(vec![], &token).await;
    let api = client_for(service.addr);
    let dir = tempfile::tempdir().unwrap();

    let mut session = session_in(&dir);
    session
        .login(&api, "alice@example.com", stub::PASSWORD, NOW_MS)
        .await
        .unwrap();

    let mut collections = Collections::default();

    api.create_comment(
        &CommentPayload {
            news_id: 3,
            text: "first!".into(),
        },
        session.bearer(),
    )
    .await
    .unwrap();

    assert_eq!(service.comments.lock().unwrap().len(), 1);

    collections
        .refetch(&api, &session, CollectionKey::Comments(3))
        .await
        .unwrap();
    let thread = collections.comments(3).unwrap();
    assert_eq!(thread.len(), 1);
    assert_eq!(thread[0].text, "first!");
    let id = thread[0].id;

    api.delete_comment(id, session.bearer()).await.unwrap();
    collections
        .refetch(&api, &session, CollectionKey::Comments(3))
        .await
        .unwrap();
    assert!(collections.comments(3).unwrap().is_empty());
}

#[tokio::test]
async fn unauthenticated_mutation_is_denied_with_server_detail() {
    let token = forge_token("42", false, true, FAR_FUTURE);
    let service = stub::start(vec![], &token).await;
    let api = client_for(service.addr);

    let err = api
        .create_comment(
            &CommentPayload {
                news_id: 3,
                text: "anon".into(),
            },
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Denied(d) if d == "Not authenticated"));
}

#[tokio::test]
async fn news_list_and_detail_fetches_deserialize() {
    let token = forge_token("42", false, true, FAR_FUTURE);
    let service = stub::start(vec![stub::comment(9, "nice")], &token).await;
    let api = client_for(service.addr);

    let news = api.list_news(None).await.unwrap();
    assert_eq!(news.len(), 1);
    assert_eq!(news[0].title, "Launch day");
    assert_eq!(news[0].author_label(), "alice");

    let one = api.get_news(3, None).await.unwrap();
    assert_eq!(one.content.text, "We shipped.");

    let comments = api.list_comments(3, None).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].news_id, 3);
}
