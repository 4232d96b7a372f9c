//! # Lyrics Lookup
//!
//! `POST /api/lyrics` asks a [`LyricsProvider`]. The stock provider talks
//! plain HTTP/1.1 to an LRCLIB-compatible service:
//!
//! ```text
//! GET /api/get?artist_name=<artist>&track_name=<track>
//! -> 200 { "plainLyrics": "...", "syncedLyrics": "[00:12.34] line\n..." }
//! -> 404 when the track is unknown
//! ```
//!
//! Synced lyrics arrive in LRC format and are converted into
//! [`SyncedLine`]s whose end time is the next line's start.

use std::future::Future;
use std::time::Duration;

use playfield_shared::{LyricsRequest, LyricsResponse, SyncedLine};
use serde::Deserialize;
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tracing::debug;

use crate::config::LyricsConfig;
use crate::error::LyricsError;
use crate::http::{read_response, write_request, Limits, Method, Request};

/// `source` value for lyrics found upstream.
pub const SOURCE_LRCLIB: &str = "lrclib";

/// Largest upstream response accepted.
const MAX_UPSTREAM_BODY: usize = 1024 * 1024;

/// Looks up lyrics for a track.
pub trait LyricsProvider: Send + Sync + 'static {
    /// `Ok(None)` when the provider has no lyrics for the track.
    fn lookup(
        &self,
        request: &LyricsRequest,
    ) -> impl Future<Output = Result<Option<LyricsResponse>, LyricsError>> + Send;
}

/// Provider used when no upstream is configured: never finds anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledLyricsProvider;

impl LyricsProvider for DisabledLyricsProvider {
    async fn lookup(
        &self,
        _request: &LyricsRequest,
    ) -> Result<Option<LyricsResponse>, LyricsError> {
        Ok(None)
    }
}

/// LRCLIB-compatible upstream over plain HTTP.
#[derive(Clone, Debug)]
pub struct HttpLyricsProvider {
    upstream: String,
    path: String,
    timeout: Duration,
}

/// Upstream record; every field may be absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UpstreamRecord {
    plain_lyrics: Option<String>,
    synced_lyrics: Option<String>,
    instrumental: bool,
}

impl HttpLyricsProvider {
    /// Provider for `upstream` (`host:port`).
    #[must_use]
    pub fn new(upstream: impl Into<String>, path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            upstream: upstream.into(),
            path: path.into(),
            timeout,
        }
    }

    /// Lookup target for a request.
    fn target(&self, request: &LyricsRequest) -> String {
        format!(
            "{}?artist_name={}&track_name={}",
            self.path,
            encode_component(request.artist.trim()),
            encode_component(request.track.trim())
        )
    }

    async fn fetch(&self, request: &LyricsRequest) -> Result<Option<LyricsResponse>, LyricsError> {
        let stream = TcpStream::connect(&self.upstream)
            .await
            .map_err(|e| LyricsError::Transport(e.into()))?;
        let (read_half, mut write_half) = stream.into_split();

        let outgoing = Request::new(Method::Get, &self.target(request), Vec::new())
            .with_header("accept", "application/json")
            .with_header("user-agent", concat!("playfield/", env!("CARGO_PKG_VERSION")));
        write_request(&mut write_half, &self.upstream, &outgoing).await?;

        let mut reader = BufReader::new(read_half);
        let limits = Limits {
            max_head: 16 * 1024,
            max_body: MAX_UPSTREAM_BODY,
        };
        let response = read_response(&mut reader, limits).await?;

        match response.status {
            200..=299 => {}
            404 => return Ok(None),
            status => return Err(LyricsError::Status(status)),
        }

        let record: UpstreamRecord = serde_json::from_slice(&response.body)?;
        Ok(to_response(record))
    }
}

impl LyricsProvider for HttpLyricsProvider {
    async fn lookup(&self, request: &LyricsRequest) -> Result<Option<LyricsResponse>, LyricsError> {
        debug!(
            track = %request.track,
            artist = %request.artist,
            upstream = %self.upstream,
            "lyrics lookup"
        );
        match tokio::time::timeout(self.timeout, self.fetch(request)).await {
            Ok(result) => result,
            Err(_) => Err(LyricsError::Timeout(self.timeout)),
        }
    }
}

/// The provider selected by configuration.
#[derive(Clone, Debug)]
pub enum ConfiguredProvider {
    /// An upstream is configured.
    Http(HttpLyricsProvider),
    /// No upstream: every lookup falls back.
    Disabled(DisabledLyricsProvider),
}

impl ConfiguredProvider {
    /// Builds the provider `config` describes.
    #[must_use]
    pub fn from_config(config: &LyricsConfig) -> Self {
        match &config.upstream {
            Some(upstream) => Self::Http(HttpLyricsProvider::new(
                upstream.clone(),
                config.path.clone(),
                config.timeout(),
            )),
            None => Self::Disabled(DisabledLyricsProvider),
        }
    }
}

impl LyricsProvider for ConfiguredProvider {
    async fn lookup(&self, request: &LyricsRequest) -> Result<Option<LyricsResponse>, LyricsError> {
        match self {
            Self::Http(provider) => provider.lookup(request).await,
            Self::Disabled(provider) => provider.lookup(request).await,
        }
    }
}

fn to_response(record: UpstreamRecord) -> Option<LyricsResponse> {
    let synced = record
        .synced_lyrics
        .as_deref()
        .map(parse_lrc)
        .filter(|lines| !lines.is_empty());

    let plain = record
        .plain_lyrics
        .filter(|text| !text.trim().is_empty())
        .or_else(|| {
            synced.as_ref().map(|lines| {
                lines
                    .iter()
                    .map(|l| l.words.as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        });

    match plain {
        Some(lyrics) => Some(LyricsResponse {
            lyrics,
            source: SOURCE_LRCLIB.to_string(),
            synced_lyrics: synced,
        }),
        None if record.instrumental => Some(LyricsResponse {
            lyrics: "[Instrumental]".to_string(),
            source: SOURCE_LRCLIB.to_string(),
            synced_lyrics: None,
        }),
        None => None,
    }
}

/// Parses LRC text into time-ordered lines.
///
/// A line may carry several `[mm:ss.xx]` stamps; it is emitted once per
/// stamp. Tag lines such as `[ar:Artist]` are skipped. Each line ends where
/// the next begins; the last has no end time.
#[must_use]
pub fn parse_lrc(text: &str) -> Vec<SyncedLine> {
    let mut timed: Vec<(u64, String)> = Vec::new();

    for raw in text.lines() {
        let mut rest = raw.trim();
        let mut stamps = Vec::new();
        while let Some(inner) = rest.strip_prefix('[') {
            let Some((tag, after)) = inner.split_once(']') else {
                break;
            };
            match parse_timestamp(tag) {
                Some(ms) => stamps.push(ms),
                None => break,
            }
            rest = after;
        }
        let words = rest.trim().to_string();
        timed.extend(stamps.into_iter().map(|ms| (ms, words.clone())));
    }

    // Stable: equal stamps keep file order.
    timed.sort_by_key(|(ms, _)| *ms);

    let ends: Vec<Option<u64>> = timed
        .iter()
        .skip(1)
        .map(|(ms, _)| Some(*ms))
        .chain(std::iter::once(None))
        .collect();

    timed
        .into_iter()
        .zip(ends)
        .map(|((start, words), end)| SyncedLine {
            start_time_ms: start.to_string(),
            words,
            end_time_ms: end.map(|e| e.to_string()),
        })
        .collect()
}

/// `mm:ss`, `mm:ss.x`, `mm:ss.xx` or `mm:ss.xxx` to milliseconds.
fn parse_timestamp(tag: &str) -> Option<u64> {
    let (minutes, seconds) = tag.split_once(':')?;
    let minutes: u64 = minutes.trim().parse().ok()?;
    let (whole, fraction) = match seconds.split_once('.') {
        Some((w, f)) => (w, f),
        None => (seconds, ""),
    };
    let whole: u64 = whole.parse().ok()?;
    if whole >= 60 || !fraction.chars().all(|c| c.is_ascii_digit()) || fraction.len() > 3 {
        return None;
    }
    let fraction_ms = match fraction.len() {
        0 => 0,
        n => fraction.parse::<u64>().ok()? * 10_u64.pow(3 - n as u32),
    };
    Some(minutes * 60_000 + whole * 1_000 + fraction_ms)
}

/// Percent-encodes a query component (RFC 3986 unreserved kept).
fn encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lrc_end_times() {
        let lines =
            parse_lrc("[ar:Band]\n[00:12.34] First line\n[00:15.00]Second\n[01:02.5] Third\n");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].start_time_ms, "12340");
        assert_eq!(lines[0].words, "First line");
        assert_eq!(lines[0].end_time_ms.as_deref(), Some("15000"));
        assert_eq!(lines[1].end_time_ms.as_deref(), Some("62500"));
        assert_eq!(lines[2].end_time_ms, None);
    }

    #[test]
    fn test_parse_lrc_repeated_stamps_sorted() {
        let lines = parse_lrc("[00:30.00][00:10.00] Chorus\n[00:20.000] Verse\n");
        let starts: Vec<_> = lines.iter().map(|l| l.start_time_ms.as_str()).collect();
        assert_eq!(starts, ["10000", "20000", "30000"]);
        assert_eq!(lines[0].words, "Chorus");
        assert_eq!(lines[2].words, "Chorus");
    }

    #[test]
    fn test_parse_timestamp_rejects_tags() {
        assert_eq!(parse_timestamp("ti:Title"), None);
        assert_eq!(parse_timestamp("00:75.00"), None);
        assert_eq!(parse_timestamp("02:03"), Some(123_000));
        assert_eq!(parse_timestamp("00:01.123"), Some(1_123));
    }

    #[test]
    fn test_encode_component() {
        assert_eq!(encode_component("AC/DC & Friends"), "AC%2FDC%20%26%20Friends");
        assert_eq!(encode_component("Björk"), "Bj%C3%B6rk");
    }

    #[test]
    fn test_synced_only_record_derives_plain_text() {
        let record = UpstreamRecord {
            plain_lyrics: None,
            synced_lyrics: Some("[00:01.00] a\n[00:02.00] b".into()),
            instrumental: false,
        };
        let response = to_response(record).unwrap();
        assert_eq!(response.lyrics, "a\nb");
        assert_eq!(response.source, SOURCE_LRCLIB);
        assert_eq!(response.synced_lyrics.map(|l| l.len()), Some(2));
    }

    #[test]
    fn test_empty_record_is_none() {
        assert!(to_response(UpstreamRecord::default()).is_none());
    }
}
