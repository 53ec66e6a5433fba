//! Marker types for managed checklist documents.
//!
//! Markers are HTML comments that carry machine-readable structure inside the
//! rendered markdown: ownership of the document, the boundaries of the rendered
//! checkbox block, per-item keys and the encoded state snapshot.
//! This module provides decoding and encoding for all marker types, plus the
//! string transforms that add and remove them from a document.

use std::{fmt, sync::LazyLock};

use regex::{NoExpand, Regex};

/// Prefix shared by every marker this tool owns.
pub const MARKER_PREFIX: &str = "checkbox-workflow-action";

/// Placeholder in a user template that is replaced by the rendered checkbox block.
pub const BODY_PLACEHOLDER: &str = "{{body}}";

static MANAGED_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(&regex::escape(&Marker::Managed.encode())).unwrap());

static BODY_SECTION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(&format!(
		"(?s){}.*?{}",
		regex::escape(&Marker::BodyStart.encode()),
		regex::escape(&Marker::BodyEnd.encode())
	))
	.unwrap()
});

static METADATA_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(&format!("<!-- {MARKER_PREFIX}:state:[^>]*-->")).unwrap());

/// A marker that can appear in a managed document.
/// All markers normalize whitespace on decode and encode with consistent spacing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Marker {
	/// Ownership flag, emitted once as the document prefix: `<!-- checkbox-workflow-action:managed -->`
	Managed,
	/// Start of the rendered checkbox block: `<!-- checkbox-workflow-action:body-start -->`
	BodyStart,
	/// End of the rendered checkbox block: `<!-- checkbox-workflow-action:body-end -->`
	BodyEnd,
	/// Encoded state snapshot: `<!-- checkbox-workflow-action:state:<action id>:<base64> -->`
	State { action_id: String, payload: String },
	/// Checkbox key: `<!-- key -->`
	Item { key: String },
}

impl Marker {
	/// Decode a marker from a string.
	/// The whole string (after trimming) must be a single HTML comment.
	/// Any comment that is not one of the prefixed markers decodes as an item key.
	pub fn decode(s: &str) -> Option<Self> {
		let trimmed = s.trim();
		let inner = trimmed.strip_prefix("<!--")?.strip_suffix("-->")?.trim();
		if inner.is_empty() {
			return None;
		}

		let Some(rest) = inner.strip_prefix(MARKER_PREFIX).and_then(|r| r.strip_prefix(':')) else {
			return Some(Marker::Item { key: inner.to_string() });
		};

		match rest {
			"managed" => Some(Marker::Managed),
			"body-start" => Some(Marker::BodyStart),
			"body-end" => Some(Marker::BodyEnd),
			_ => {
				// Action ids may contain ':', base64 never does
				let (action_id, payload) = rest.strip_prefix("state:")?.rsplit_once(':')?;
				if payload.is_empty() || payload.contains(char::is_whitespace) {
					return None;
				}
				Some(Marker::State {
					action_id: action_id.to_string(),
					payload: payload.to_string(),
				})
			}
		}
	}

	/// Encode the marker to a single-line HTML comment.
	pub fn encode(&self) -> String {
		match self {
			Marker::Managed => format!("<!-- {MARKER_PREFIX}:managed -->"),
			Marker::BodyStart => format!("<!-- {MARKER_PREFIX}:body-start -->"),
			Marker::BodyEnd => format!("<!-- {MARKER_PREFIX}:body-end -->"),
			Marker::State { action_id, payload } => format!("<!-- {MARKER_PREFIX}:state:{action_id}:{payload} -->"),
			Marker::Item { key } => format!("<!-- {key} -->"),
		}
	}
}

impl fmt::Display for Marker {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.encode())
	}
}

/// Managed marker followed by a newline, prepended to every rendered document.
pub fn managed_prefix() -> String {
	format!("{}\n", Marker::Managed)
}

/// Wrap rendered checkbox lines between the body-start and body-end markers.
pub fn body_section(content: &str) -> String {
	format!("{}\n{content}\n{}", Marker::BodyStart, Marker::BodyEnd)
}

/// Remove the managed marker and trim the result.
pub fn strip_managed_prefix(content: &str) -> String {
	MANAGED_PATTERN.replace(content, "").trim().to_string()
}

/// Remove every state metadata comment, regardless of action id, and trim the result.
pub fn strip_metadata_comments(content: &str) -> String {
	METADATA_PATTERN.replace_all(content, "").trim().to_string()
}

/// Action id and still-encoded payload of every state marker in `content`, in document order.
pub fn state_markers(content: &str) -> impl Iterator<Item = (String, String)> + '_ {
	METADATA_PATTERN.find_iter(content).filter_map(|m| match Marker::decode(m.as_str())? {
		Marker::State { action_id, payload } => Some((action_id, payload)),
		_ => None,
	})
}

/// Replace each marker-wrapped body section with the `{{body}}` placeholder.
pub fn replace_body_section_with_placeholder(content: &str) -> String {
	BODY_SECTION_PATTERN.replace_all(content, NoExpand(BODY_PLACEHOLDER)).into_owned()
}
