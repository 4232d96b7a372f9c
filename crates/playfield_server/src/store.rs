//! # Kaleidoscope Submission Store
//!
//! Submissions live in process memory and vanish on restart. The
//! [`SubmissionStore`] trait is the seam for a durable store.

use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use playfield_shared::{NewSubmission, Submission};
use uuid::Uuid;

use crate::error::ApiError;

/// Message for any submission that fails validation.
pub const INVALID_SUBMISSION: &str = "Invalid submission data";

/// Storage for kaleidoscope submissions.
pub trait SubmissionStore: Send + Sync + 'static {
    /// Stores a validated submission, assigning id and creation time.
    fn create(&self, submission: NewSubmission) -> Submission;

    /// Every submission, newest first.
    fn list(&self) -> Vec<Submission>;

    /// One submission by id.
    fn get(&self, id: &str) -> Option<Submission>;
}

#[derive(Debug)]
struct Stored {
    created: SystemTime,
    seq: u64,
    submission: Submission,
}

#[derive(Debug, Default)]
struct Inner {
    records: Vec<Stored>,
    next_seq: u64,
}

/// Process-memory store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored submissions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    /// True if nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn create_at(&self, submission: NewSubmission, created: SystemTime) -> Submission {
        let record = Submission {
            id: Uuid::new_v4().to_string(),
            image_data: submission.image_data,
            flower_count: submission.flower_count,
            created_at: format_rfc3339(created),
        };
        let mut inner = self.inner.write();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.records.push(Stored {
            created,
            seq,
            submission: record.clone(),
        });
        record
    }
}

impl SubmissionStore for InMemoryStore {
    fn create(&self, submission: NewSubmission) -> Submission {
        self.create_at(submission, SystemTime::now())
    }

    fn list(&self) -> Vec<Submission> {
        let inner = self.inner.read();
        let mut sorted: Vec<&Stored> = inner.records.iter().collect();
        sorted.sort_by(|a, b| b.created.cmp(&a.created).then(b.seq.cmp(&a.seq)));
        sorted.into_iter().map(|s| s.submission.clone()).collect()
    }

    fn get(&self, id: &str) -> Option<Submission> {
        self.inner
            .read()
            .records
            .iter()
            .find(|s| s.submission.id == id)
            .map(|s| s.submission.clone())
    }
}

/// Decodes and validates a submission body.
///
/// # Errors
///
/// Returns [`ApiError::BadRequest`] with [`INVALID_SUBMISSION`] if the body
/// is not JSON, `imageData` is not an image data URL, or `flowerCount` is
/// not a non-negative integer.
pub fn validate(body: &[u8]) -> Result<NewSubmission, ApiError> {
    let submission: NewSubmission =
        serde_json::from_slice(body).map_err(|_| ApiError::BadRequest(INVALID_SUBMISSION))?;
    let is_image = submission
        .image_data
        .strip_prefix("data:image/")
        .is_some_and(|rest| rest.contains(','));
    if !is_image {
        return Err(ApiError::BadRequest(INVALID_SUBMISSION));
    }
    Ok(submission)
}

/// Formats a time as RFC 3339 UTC with milliseconds,
/// e.g. `2024-03-01T12:30:05.042Z`.
#[must_use]
pub fn format_rfc3339(time: SystemTime) -> String {
    let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or_default();
    let secs = since_epoch.as_secs();
    let millis = since_epoch.subsec_millis();

    let days = (secs / 86_400) as i64;
    let rem = secs % 86_400;
    let (year, month, day) = civil_from_days(days);
    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}.{millis:03}Z",
        rem / 3_600,
        (rem % 3_600) / 60,
        rem % 60
    )
}

/// Days since 1970-01-01 to a proleptic Gregorian (year, month, day).
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
