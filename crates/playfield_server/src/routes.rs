//! # Routes
//!
//! | Method | Path                                 | Handler           |
//! |--------|--------------------------------------|-------------------|
//! | POST   | `/api/lyrics`                        | lyrics lookup     |
//! | POST   | `/api/kaleidoscope-submissions`      | create submission |
//! | GET    | `/api/kaleidoscope-submissions`      | list, newest first|
//! | GET    | `/api/kaleidoscope-submissions/{id}` | one submission    |
//!
//! Unknown paths are 404, known paths with the wrong method 405.

use playfield_shared::{LyricsRequest, LyricsResponse};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::http::{Method, Request, Response};
use crate::lyrics::LyricsProvider;
use crate::store::{validate, SubmissionStore};

/// Message for a lyrics request without track or artist.
pub const LYRICS_REQUIRED: &str = "Track and artist are required";

const LYRICS_PATH: &str = "/api/lyrics";
const SUBMISSIONS_PATH: &str = "/api/kaleidoscope-submissions";

/// Shared handler state.
#[derive(Debug)]
pub struct AppState<S, P> {
    /// Submission storage.
    pub store: S,
    /// Lyrics lookup.
    pub lyrics: P,
}

impl<S, P> AppState<S, P> {
    /// Bundles a store and a provider.
    #[must_use]
    pub fn new(store: S, lyrics: P) -> Self {
        Self { store, lyrics }
    }
}

/// Dispatches one request.
pub async fn route<S, P>(state: &AppState<S, P>, request: Request) -> Response
where
    S: SubmissionStore,
    P: LyricsProvider,
{
    let path = request.path.trim_end_matches('/');
    let result = match (path, &request.method) {
        (LYRICS_PATH, Method::Post) => lyrics(state, &request.body).await,
        (LYRICS_PATH, _) => Err(ApiError::MethodNotAllowed { allow: "POST" }),

        (SUBMISSIONS_PATH, Method::Post) => create_submission(state, &request.body),
        (SUBMISSIONS_PATH, Method::Get) => Ok(Response::json(200, &state.store.list())),
        (SUBMISSIONS_PATH, _) => Err(ApiError::MethodNotAllowed { allow: "GET, POST" }),

        (other, method) => match other
            .strip_prefix(SUBMISSIONS_PATH)
            .and_then(|r| r.strip_prefix('/'))
        {
            Some(id) if !id.is_empty() && !id.contains('/') => match method {
                Method::Get => state
                    .store
                    .get(id)
                    .map(|s| Response::json(200, &s))
                    .ok_or(ApiError::NotFound),
                _ => Err(ApiError::MethodNotAllowed { allow: "GET" }),
            },
            _ => Err(ApiError::NotFound),
        },
    };

    result.unwrap_or_else(|err| {
        debug!(path = %request.path, status = err.status(), "request rejected");
        Response::error(&err)
    })
}

async fn lyrics<S, P>(state: &AppState<S, P>, body: &[u8]) -> Result<Response, ApiError>
where
    P: LyricsProvider,
{
    let request: LyricsRequest =
        serde_json::from_slice(body).map_err(|_| ApiError::BadRequest(LYRICS_REQUIRED))?;
    if !request.is_complete() {
        return Err(ApiError::BadRequest(LYRICS_REQUIRED));
    }

    let response = match state.lyrics.lookup(&request).await {
        Ok(Some(found)) => found,
        Ok(None) => {
            debug!(track = %request.track, artist = %request.artist, "no lyrics found");
            LyricsResponse::unavailable()
        }
        Err(err) => {
            warn!(%err, track = %request.track, artist = %request.artist, "lyrics lookup failed");
            LyricsResponse::unavailable()
        }
    };
    Ok(Response::json(200, &response))
}

fn create_submission<S, P>(state: &AppState<S, P>, body: &[u8]) -> Result<Response, ApiError>
where
    S: SubmissionStore,
{
    let submission = validate(body)?;
    let created = state.store.create(submission);
    debug!(id = %created.id, flowers = created.flower_count, "submission stored");
    Ok(Response::json(201, &created))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lyrics::DisabledLyricsProvider;
    use crate::store::InMemoryStore;
    use playfield_shared::{ErrorBody, Submission};

    fn state() -> AppState<InMemoryStore, DisabledLyricsProvider> {
        AppState::new(InMemoryStore::new(), DisabledLyricsProvider)
    }

    fn post(path: &str, body: &str) -> Request {
        Request::new(Method::Post, path, body.as_bytes().to_vec())
    }

    fn error_of(response: &Response) -> String {
        serde_json::from_slice::<ErrorBody>(&response.body).unwrap().error
    }

    #[tokio::test]
    async fn test_lyrics_requires_track_and_artist() {
        let state = state();
        for body in [r#"{"track":"Song"}"#, r#"{"track":"","artist":"Band"}"#, "garbage"] {
            let response = route(&state, post("/api/lyrics", body)).await;
            assert_eq!(response.status, 400);
            assert_eq!(error_of(&response), LYRICS_REQUIRED);
        }
    }

    #[tokio::test]
    async fn test_lyrics_fallback() {
        let request = post("/api/lyrics", r#"{"track":"Nope","artist":"Nobody"}"#);
        let response = route(&state(), request).await;
        assert_eq!(response.status, 200);
        let body: LyricsResponse = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body, LyricsResponse::unavailable());
    }

    #[tokio::test]
    async fn test_submission_create_and_fetch() {
        let state = state();
        let response = route(
            &state,
            post(
                "/api/kaleidoscope-submissions",
                r#"{"imageData":"data:image/png;base64,AA","flowerCount":7}"#,
            ),
        )
        .await;
        assert_eq!(response.status, 201);
        let created: Submission = serde_json::from_slice(&response.body).unwrap();

        let one = route(
            &state,
            Request::new(
                Method::Get,
                &format!("/api/kaleidoscope-submissions/{}", created.id),
                Vec::new(),
            ),
        )
        .await;
        assert_eq!(one.status, 200);

        let missing = route(
            &state,
            Request::new(Method::Get, "/api/kaleidoscope-submissions/unknown", Vec::new()),
        )
        .await;
        assert_eq!(missing.status, 404);
    }

    #[tokio::test]
    async fn test_unknown_path_and_wrong_method() {
        let state = state();
        let unknown = route(&state, Request::new(Method::Get, "/api/weather", Vec::new())).await;
        assert_eq!(unknown.status, 404);
        assert_eq!(error_of(&unknown), "Not found");

        let wrong = route(&state, Request::new(Method::Get, "/api/lyrics", Vec::new())).await;
        assert_eq!(wrong.status, 405);
        assert_eq!(wrong.header("allow"), Some("POST"));

        let delete = route(
            &state,
            Request::new(
                Method::Other("DELETE".into()),
                "/api/kaleidoscope-submissions",
                Vec::new(),
            ),
        )
        .await;
        assert_eq!(delete.status, 405);
    }

    #[tokio::test]
    async fn test_trailing_slash_and_query_ignored() {
        let request =
            Request::new(Method::Get, "/api/kaleidoscope-submissions/?page=1", Vec::new());
        let response = route(&state(), request).await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"[]");
    }
}
