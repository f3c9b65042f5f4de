//! Axum route handlers for the notes REST API.
//!
//! Handlers only translate between HTTP and `NoteStore`; all rules about
//! names and existence live in the store. Store calls do blocking file I/O,
//! so each one runs on tokio's blocking pool.

use crate::error::{NoteError, NoteResult};
use crate::store::NoteStore;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use notes_types::*;
use std::sync::Arc;
use std::time::Instant;

pub struct AppState {
    pub store: Arc<NoteStore>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: NoteStore) -> Self {
        Self {
            store: Arc::new(store),
            start_time: Instant::now(),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/notes", get(list_notes))
        .route(
            "/notes/:name",
            get(get_note)
                .post(create_note)
                .put(replace_note)
                .delete(delete_note),
        )
        .route("/rpc/status", get(status))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(tower_http::cors::CorsLayer::permissive())
}

/// Run a store call on the blocking pool
async fn with_store<T, F>(state: &AppState, f: F) -> NoteResult<T>
where
    F: FnOnce(&NoteStore) -> NoteResult<T> + Send + 'static,
    T: Send + 'static,
{
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|e| NoteError::Io(std::io::Error::other(format!("Store task failed: {}", e))))?
}

// GET /notes
pub async fn list_notes(State(state): State<Arc<AppState>>) -> NoteResult<Json<Vec<NoteEntry>>> {
    let notes = with_store(&state, |store| store.list()).await?;
    Ok(Json(notes))
}

// GET /notes/:name
pub async fn get_note(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> NoteResult<String> {
    with_store(&state, move |store| store.get(&name)).await
}

// POST /notes/:name
pub async fn create_note(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: String,
) -> NoteResult<(StatusCode, &'static str)> {
    with_store(&state, move |store| store.create(&name, &body)).await?;
    Ok((StatusCode::CREATED, "Created"))
}

// PUT /notes/:name
pub async fn replace_note(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: String,
) -> NoteResult<&'static str> {
    with_store(&state, move |store| store.replace(&name, &body)).await?;
    Ok("Updated")
}

// DELETE /notes/:name
pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> NoteResult<&'static str> {
    with_store(&state, move |store| store.remove(&name)).await?;
    Ok("Deleted")
}

// GET /rpc/status
pub async fn status(State(state): State<Arc<AppState>>) -> (StatusCode, Json<RpcResponse<ServiceStatus>>) {
    let total_notes = match with_store(&state, |store| store.count()).await {
        Ok(n) => n as u64,
        Err(e) => {
            log::warn!("[NOTES] Could not count notes: {}", e);
            0
        }
    };

    let status = ServiceStatus {
        running: true,
        uptime_secs: state.start_time.elapsed().as_secs(),
        notes_dir: state.store.notes_dir().to_string_lossy().to_string(),
        total_notes,
    };

    (StatusCode::OK, Json(RpcResponse::ok(status)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use tempfile::tempdir;
    use tower::ServiceExt;

    fn test_app() -> (tempfile::TempDir, Router) {
        let dir = tempdir().unwrap();
        let store = NoteStore::open(dir.path().join("notes")).expect("Failed to open store");
        let app = router(Arc::new(AppState::new(store)));
        (dir, app)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: &str) -> (StatusCode, String) {
        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "text/plain")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn note_lifecycle() {
        let (_dir, app) = test_app();

        assert_eq!(send(&app, "POST", "/notes/foo", "hello").await, (StatusCode::CREATED, "Created".to_string()));
        assert_eq!(send(&app, "GET", "/notes/foo", "").await, (StatusCode::OK, "hello".to_string()));
        assert_eq!(send(&app, "PUT", "/notes/foo", "bye").await, (StatusCode::OK, "Updated".to_string()));
        assert_eq!(send(&app, "GET", "/notes/foo", "").await, (StatusCode::OK, "bye".to_string()));
        assert_eq!(send(&app, "DELETE", "/notes/foo", "").await, (StatusCode::OK, "Deleted".to_string()));
        assert_eq!(send(&app, "GET", "/notes/foo", "").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn get_note_is_plain_text() {
        let (_dir, app) = test_app();
        send(&app, "POST", "/notes/plain", "{\"not\": \"parsed\"}").await;

        let resp = app
            .oneshot(Request::builder().uri("/notes/plain").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap();
        assert!(content_type.starts_with("text/plain"));

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"{\"not\": \"parsed\"}");
    }

    #[tokio::test]
    async fn duplicate_create_is_bad_request() {
        let (_dir, app) = test_app();

        send(&app, "POST", "/notes/dup", "one").await;
        let (status, body) = send(&app, "POST", "/notes/dup", "two").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Note already exists");

        assert_eq!(send(&app, "GET", "/notes/dup", "").await.1, "one");
    }

    #[tokio::test]
    async fn missing_notes_are_not_found() {
        let (_dir, app) = test_app();

        let (status, body) = send(&app, "PUT", "/notes/ghost", "boo").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "Not found");
        assert_eq!(send(&app, "DELETE", "/notes/ghost", "").await.0, StatusCode::NOT_FOUND);
        assert_eq!(send(&app, "GET", "/notes/ghost", "").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_returns_name_and_text() {
        let (_dir, app) = test_app();

        let (status, body) = send(&app, "GET", "/notes", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "[]");

        send(&app, "POST", "/notes/a", "1").await;
        send(&app, "POST", "/notes/b", "2").await;

        let (status, body) = send(&app, "GET", "/notes", "").await;
        assert_eq!(status, StatusCode::OK);
        let mut notes: Vec<NoteEntry> = serde_json::from_str(&body).unwrap();
        notes.sort_by(|x, y| x.name.cmp(&y.name));
        assert_eq!(
            notes,
            vec![
                NoteEntry { name: "a".into(), text: "1".into() },
                NoteEntry { name: "b".into(), text: "2".into() },
            ]
        );
    }

    #[tokio::test]
    async fn traversal_names_are_rejected() {
        let (dir, app) = test_app();
        std::fs::write(dir.path().join("secret"), "keep out").unwrap();

        // Percent-encoded so the router sees a single path segment
        for uri in ["/notes/..", "/notes/..%2Fsecret", "/notes/a%5Cb", "/notes/%2Fetc%2Fpasswd"] {
            for method in ["GET", "POST", "PUT", "DELETE"] {
                let (status, _) = send(&app, method, uri, "pwned").await;
                assert_eq!(status, StatusCode::BAD_REQUEST, "{method} {uri}");
            }
        }

        assert_eq!(std::fs::read_to_string(dir.path().join("secret")).unwrap(), "keep out");
    }

    #[tokio::test]
    async fn status_reports_note_count() {
        let (_dir, app) = test_app();
        send(&app, "POST", "/notes/one", "1").await;

        let (status, body) = send(&app, "GET", "/rpc/status", "").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["running"], true);
        assert_eq!(json["data"]["total_notes"], 1);
        assert!(json["data"]["notes_dir"].as_str().unwrap().ends_with("notes"));
    }

    #[tokio::test]
    async fn overlong_name_is_bad_request() {
        let (_dir, app) = test_app();
        let uri = format!("/notes/{}", "a".repeat(300));

        for method in ["GET", "POST", "PUT", "DELETE"] {
            assert_eq!(send(&app, method, &uri, "x").await.0, StatusCode::BAD_REQUEST, "{method}");
        }
    }

    #[tokio::test]
    async fn directories_and_links_are_not_found() {
        let (dir, app) = test_app();
        let notes = dir.path().join("notes");
        std::fs::create_dir(notes.join("subdir")).unwrap();

        assert_eq!(send(&app, "GET", "/notes/subdir", "").await.0, StatusCode::NOT_FOUND);
        assert_eq!(send(&app, "DELETE", "/notes/subdir", "").await.0, StatusCode::NOT_FOUND);

        #[cfg(unix)]
        {
            std::fs::write(dir.path().join("secret"), "keep out").unwrap();
            std::os::unix::fs::symlink(dir.path().join("secret"), notes.join("link")).unwrap();

            assert_eq!(send(&app, "GET", "/notes/link", "").await.0, StatusCode::NOT_FOUND);
            assert_eq!(send(&app, "PUT", "/notes/link", "pwned").await.0, StatusCode::NOT_FOUND);
            assert_eq!(std::fs::read_to_string(dir.path().join("secret")).unwrap(), "keep out");
        }
    }
}
