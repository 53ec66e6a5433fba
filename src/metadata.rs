//! Hidden state snapshot embedded in a managed document.
//!
//! The snapshot is JSON `{id, previousState}`, base64-encoded into a single-line
//! state marker. The action id is kept in plaintext in the marker so a document
//! can be matched to its checklist without decoding anything.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::{
	marker::{self, Marker},
	state::CheckboxState,
};

/// Payload of the state marker.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMetadata {
	pub id: String,
	pub previous_state: CheckboxState,
}

/// Locate the still-encoded payload of the first state marker for `action_id`.
fn locate_payload(body: &str, action_id: &str) -> Option<String> {
	marker::state_markers(body).find(|(id, _)| id == action_id).map(|(_, payload)| payload)
}

/// Whether `body` carries a state marker for `action_id`. Does not decode it, so a
/// corrupted marker still identifies the document.
pub fn has_metadata(body: &str, action_id: &str) -> bool {
	locate_payload(body, action_id).is_some()
}

/// Encode a state snapshot as a state marker.
pub fn encode_metadata(action_id: &str, state: &CheckboxState) -> String {
	let metadata = StateMetadata {
		id: action_id.to_string(),
		previous_state: state.clone(),
	};
	// Serializing a string map of bools cannot fail
	let json = serde_json::to_string(&metadata).unwrap_or_default();
	Marker::State {
		action_id: action_id.to_string(),
		payload: STANDARD.encode(json),
	}
	.encode()
}

/// Decode the state snapshot stored for `action_id`.
///
/// Returns `None` when no marker for this id exists, or when its payload is not
/// valid base64, not valid JSON, or does not have the snapshot shape. A missing
/// or foreign snapshot is an ordinary first-run condition, never an error.
pub fn decode_metadata(body: &str, action_id: &str) -> Option<StateMetadata> {
	let payload = locate_payload(body, action_id)?;

	let bytes = match STANDARD.decode(&payload) {
		Ok(bytes) => bytes,
		Err(e) => {
			tracing::debug!(action_id, error = %e, "state marker is not valid base64, ignoring");
			return None;
		}
	};

	match serde_json::from_slice::<StateMetadata>(&bytes) {
		Ok(metadata) if !metadata.id.is_empty() => Some(metadata),
		Ok(_) => {
			tracing::debug!(action_id, "state marker has an empty id, ignoring");
			None
		}
		Err(e) => {
			tracing::debug!(action_id, error = %e, "state marker payload is malformed, ignoring");
			None
		}
	}
}

/// Previous state recorded for `action_id`, if any.
pub fn extract_previous_state(body: &str, action_id: &str) -> Option<CheckboxState> {
	decode_metadata(body, action_id).map(|m| m.previous_state)
}

/// Append the state marker for `state` to rendered content.
pub fn append_metadata(content: &str, action_id: &str, state: &CheckboxState) -> String {
	format!("{content}\n\n{}", encode_metadata(action_id, state))
}
