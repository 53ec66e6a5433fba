//! The triggering event payload.
//!
//! Only the issue's `updated_at` is read: it is the reference point for
//! detecting edits that landed after the run was triggered.

use std::path::Path;

use jiff::Timestamp;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct EventPayload {
	issue: Option<EventIssue>,
}

#[derive(Debug, Deserialize)]
struct EventIssue {
	updated_at: Option<Timestamp>,
}

/// `issue.updated_at` from an event payload, if present and well-formed.
pub fn parse_issue_updated_at(payload: &str) -> Option<Timestamp> {
	match serde_json::from_str::<EventPayload>(payload) {
		Ok(event) => event.issue?.updated_at,
		Err(e) => {
			tracing::warn!(error = %e, "event payload is malformed, ignoring");
			None
		}
	}
}

/// Read `issue.updated_at` from the event payload file.
pub fn issue_updated_at(event_path: Option<&Path>) -> Option<Timestamp> {
	let path = event_path?;
	match std::fs::read_to_string(path) {
		Ok(payload) => parse_issue_updated_at(&payload),
		Err(e) => {
			tracing::warn!(path = %path.display(), error = %e, "failed to read event payload");
			None
		}
	}
}
