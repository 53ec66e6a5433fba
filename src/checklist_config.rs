//! Checklist configuration: an ordered list of key → label pairs.
//!
//! Accepted as JSON5, so trailing commas, comments and unquoted keys are fine:
//! ```text
//! [
//!   { format: "Run code formatting" },
//!   { lint: { label: "Run linting checks" } },
//! ]
//! ```

use serde_json::Value;

use crate::error::{ValidationError, Violation, ViolationKind, json_type_name};

const CONTEXT: &str = "checkbox configuration";

/// One checkbox to render: its stable key and its visible label.
#[derive(Clone, Debug, Eq, PartialEq, derive_new::new)]
pub struct ConfigPair {
	pub key: String,
	pub label: String,
}

/// Parse and validate a checklist configuration, preserving item order.
pub fn parse_config(text: &str) -> Result<Vec<ConfigPair>, ValidationError> {
	let value: Value = json5::from_str(text).map_err(|e| ValidationError::Syntax {
		context: CONTEXT,
		message: e.to_string(),
	})?;

	let items = match value {
		Value::Array(items) => items,
		other => {
			let message = format!("Expected array, received {}", json_type_name(&other));
			return Err(ValidationError::Invalid {
				context: CONTEXT,
				violations: vec![Violation::new(ViolationKind::Shape, vec![], message)],
			});
		}
	};
	if items.is_empty() {
		return Err(ValidationError::Invalid {
			context: CONTEXT,
			violations: vec![Violation::new(ViolationKind::Shape, vec![], "Config must contain at least one item".to_string())],
		});
	}

	let mut pairs = Vec::with_capacity(items.len());
	let mut violations = Vec::new();
	for (index, item) in items.iter().enumerate() {
		match extract_pair(index, item) {
			Ok(pair) => pairs.push(pair),
			Err(mut found) => violations.append(&mut found),
		}
	}
	ValidationError::check(CONTEXT, violations)?;

	Ok(pairs)
}

/// Validate a single array element: an object with exactly one key, mapped to
/// either a label string or an object with a `label` field.
fn extract_pair(index: usize, item: &Value) -> Result<ConfigPair, Vec<Violation>> {
	let at = |segments: &[&str]| -> Vec<String> { std::iter::once(index.to_string()).chain(segments.iter().map(|s| s.to_string())).collect() };

	let Value::Object(entries) = item else {
		return Err(vec![Violation::new(ViolationKind::Shape, at(&[]), format!("Expected object, received {}", json_type_name(item)))]);
	};

	let mut violations = Vec::new();
	let mut pair = None;
	for (key, value) in entries {
		if key.is_empty() {
			violations.push(Violation::new(ViolationKind::Field, at(&[]), "Key must not be empty".to_string()));
		}

		let label = match value {
			Value::String(label) => {
				if label.is_empty() {
					violations.push(Violation::new(ViolationKind::Field, at(&[key.as_str()]), "Label must not be empty".to_string()));
				}
				label
			}
			// Fields other than `label` are ignored
			Value::Object(fields) => match fields.get("label") {
				Some(Value::String(label)) => {
					if label.is_empty() {
						violations.push(Violation::new(ViolationKind::Field, at(&[key.as_str(), "label"]), "Label must not be empty".to_string()));
					}
					label
				}
				Some(other) => {
					violations.push(Violation::new(
						ViolationKind::Field,
						at(&[key.as_str(), "label"]),
						format!("Expected string, received {}", json_type_name(other)),
					));
					continue;
				}
				None => {
					violations.push(Violation::new(ViolationKind::Field, at(&[key.as_str(), "label"]), "Required".to_string()));
					continue;
				}
			},
			_ => {
				violations.push(Violation::new(ViolationKind::Field, at(&[key.as_str()]), "Invalid input".to_string()));
				continue;
			}
		};
		pair = Some(ConfigPair::new(key.clone(), label.clone()));
	}

	if entries.len() != 1 {
		violations.push(Violation::new(ViolationKind::Shape, at(&[]), "Each config item must have exactly one key-value pair".to_string()));
	}

	match pair {
		Some(pair) if violations.is_empty() => Ok(pair),
		_ => Err(violations),
	}
}
