//! HTTP API wire types.
//!
//! Field names follow the JSON contract (camelCase). Both the server and
//! any Rust client must agree on these definitions.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/lyrics`.
///
/// Fields default to empty so a missing field is reported as a 400 by the
/// handler rather than as a body decode failure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricsRequest {
    /// Track title.
    #[serde(default)]
    pub track: String,
    /// Artist name.
    #[serde(default)]
    pub artist: String,
    /// Optional provider track id (Spotify).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<String>,
}

impl LyricsRequest {
    /// True if both required fields carry non-blank text.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.track.trim().is_empty() && !self.artist.trim().is_empty()
    }
}

/// One time-coded lyric line. Times are millisecond strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedLine {
    /// Line start, milliseconds from track start.
    pub start_time_ms: String,
    /// Line text.
    pub words: String,
    /// Line end (start of the next line), if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time_ms: Option<String>,
}

/// Response of `POST /api/lyrics`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricsResponse {
    /// Plain lyrics text, or the unavailable placeholder.
    pub lyrics: String,
    /// Where the lyrics came from.
    pub source: String,
    /// Time-coded lines, when the provider has them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_lyrics: Option<Vec<SyncedLine>>,
}

impl LyricsResponse {
    /// The placeholder response used when lookup fails.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            lyrics: crate::constants::LYRICS_UNAVAILABLE.to_string(),
            source: crate::constants::LYRICS_SOURCE_UNAVAILABLE.to_string(),
            synced_lyrics: None,
        }
    }
}

/// Body of `POST /api/kaleidoscope-submissions`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubmission {
    /// Rendered kaleidoscope as a `data:image/...` URL.
    pub image_data: String,
    /// Number of flowers in the composition.
    pub flower_count: u32,
}

/// A stored submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    /// Generated UUID.
    pub id: String,
    /// Rendered kaleidoscope as a `data:image/...` URL.
    pub image_data: String,
    /// Number of flowers in the composition.
    pub flower_count: u32,
    /// RFC 3339 UTC creation time.
    pub created_at: String,
}

/// JSON error body: `{ "error": "..." }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lyrics_request_camel_case() {
        let req: LyricsRequest =
            serde_json::from_str(r#"{"track":"Song","artist":"Band","trackId":"abc"}"#).unwrap();
        assert_eq!(req.track_id.as_deref(), Some("abc"));
        assert!(req.is_complete());
    }

    #[test]
    fn test_lyrics_request_missing_artist_is_incomplete() {
        let req: LyricsRequest = serde_json::from_str(r#"{"track":"Song"}"#).unwrap();
        assert!(!req.is_complete());
    }

    #[test]
    fn test_unavailable_omits_synced() {
        let json = serde_json::to_string(&LyricsResponse::unavailable()).unwrap();
        assert!(json.contains("Lyrics not available for this track"));
        assert!(!json.contains("syncedLyrics"));
    }

    #[test]
    fn test_new_submission_rejects_negative_count() {
        let parsed: Result<NewSubmission, _> =
            serde_json::from_str(r#"{"imageData":"data:image/png;base64,AAAA","flowerCount":-1}"#);
        assert!(parsed.is_err());
    }
}
