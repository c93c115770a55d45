//! Persisted session records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audio::CaptureSource;
use crate::summary::SummaryResult;

/// How many characters of the summary seed a derived title.
const TITLE_PREFIX_CHARS: usize = 50;

const UNTITLED: &str = "Untitled Session";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Recording,
    Paused,
    Processing,
    Completed,
    Error,
}

/// A completed (or failed) meeting session as written to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub duration_seconds: u64,
    pub transcript: String,
    /// Absent when summarization failed; the transcript is still kept.
    pub summary: Option<SummaryResult>,
    pub status: SessionStatus,
    pub source: CaptureSource,
}

impl Session {
    /// Build a completed record. The title is the first 50 characters of
    /// the summary text plus "..." when one exists, otherwise a fixed
    /// placeholder.
    pub fn completed(
        transcript: String,
        duration_seconds: u64,
        source: CaptureSource,
        summary: Option<SummaryResult>,
    ) -> Self {
        let title = summary
            .as_ref()
            .map(|s| s.summary.trim())
            .filter(|text| !text.is_empty())
            .map(derive_title)
            .unwrap_or_else(|| UNTITLED.to_string());

        Session {
            id: Uuid::new_v4().to_string(),
            title,
            created_at: Utc::now(),
            duration_seconds,
            transcript,
            summary,
            status: SessionStatus::Completed,
            source,
        }
    }
}

fn derive_title(text: &str) -> String {
    let mut title: String = text.chars().take(TITLE_PREFIX_CHARS).collect();
    title.push_str("...");
    title
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(text: &str) -> SummaryResult {
        SummaryResult {
            summary: text.to_string(),
            key_points: vec![],
            action_items: vec![],
        }
    }

    #[test]
    fn title_truncates_long_summaries() {
        let long = "a".repeat(80);
        let session = Session::completed("t".into(), 10, CaptureSource::Mic, Some(summary(&long)));
        assert_eq!(session.title, format!("{}...", "a".repeat(50)));
    }

    #[test]
    fn short_summary_still_gets_the_ellipsis() {
        // The ellipsis is appended unconditionally, even when the summary
        // fits within the prefix length
        let session = Session::completed(
            "t".into(),
            10,
            CaptureSource::Mic,
            Some(summary("Weekly sync notes")),
        );
        assert_eq!(session.title, "Weekly sync notes...");
    }

    #[test]
    fn missing_summary_falls_back_to_placeholder() {
        let session = Session::completed("t".into(), 10, CaptureSource::System, None);
        assert_eq!(session.title, "Untitled Session");
        assert!(session.summary.is_none());
        assert_eq!(session.status, SessionStatus::Completed);
    }

    #[test]
    fn blank_summary_text_falls_back_to_placeholder() {
        let session =
            Session::completed("t".into(), 10, CaptureSource::Mic, Some(summary("   ")));
        assert_eq!(session.title, "Untitled Session");
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let long = "é".repeat(60);
        let session = Session::completed("t".into(), 1, CaptureSource::Mic, Some(summary(&long)));
        assert_eq!(session.title, format!("{}...", "é".repeat(50)));
    }

    #[test]
    fn record_round_trips_through_json() {
        let session = Session::completed(
            "hello world".into(),
            42,
            CaptureSource::System,
            Some(summary("Standup")),
        );
        let json = serde_json::to_string(&session).unwrap();
        assert!(json.contains(r#""createdAt""#));
        assert!(json.contains(r#""durationSeconds":42"#));
        assert!(json.contains(r#""source":"system""#));
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }
}
