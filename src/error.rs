//! Error types for validating user-supplied text.
//!
//! Uses miette for diagnostics. Every validator reports either a syntax error
//! (the text did not parse at all) or a list of violations, each located by a
//! path into the parsed value.

use std::fmt;

use miette::Diagnostic;

/// What a violation is about.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ViolationKind {
	/// Wrong type, wrong arity, or an empty collection.
	Shape,
	/// A field that is present but has an unacceptable value.
	Field,
}

/// A single problem found while validating, with its location.
#[derive(Clone, Debug, Eq, PartialEq, derive_new::new)]
pub struct Violation {
	pub kind: ViolationKind,
	pub path: Vec<String>,
	pub message: String,
}

impl fmt::Display for Violation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if !self.path.is_empty() {
			write!(f, "[{}] ", self.path.join(" → "))?;
		}
		write!(f, "{}", self.message)
	}
}

fn format_violations(violations: &[Violation]) -> String {
	violations.iter().map(|v| format!("  {v}")).collect::<Vec<_>>().join("\n")
}

/// Error type for validating configuration, inputs and parameters.
/// `context` names what was being validated, e.g. "checkbox configuration".
#[derive(Debug, Diagnostic, thiserror::Error)]
pub enum ValidationError {
	#[error("Invalid {context} syntax: {message}")]
	#[diagnostic(code(checkbox_workflow::validation::syntax), help("check the value is well-formed JSON"))]
	Syntax { context: &'static str, message: String },

	#[error("Invalid {context}:\n{}", format_violations(.violations))]
	#[diagnostic(code(checkbox_workflow::validation::invalid))]
	Invalid { context: &'static str, violations: Vec<Violation> },
}

impl ValidationError {
	pub fn context(&self) -> &'static str {
		match self {
			ValidationError::Syntax { context, .. } | ValidationError::Invalid { context, .. } => context,
		}
	}

	/// Violations found, empty for syntax errors.
	pub fn violations(&self) -> &[Violation] {
		match self {
			ValidationError::Syntax { .. } => &[],
			ValidationError::Invalid { violations, .. } => violations,
		}
	}

	/// Error out with the collected violations, if there are any.
	pub fn check(context: &'static str, violations: Vec<Violation>) -> Result<(), Self> {
		if violations.is_empty() { Ok(()) } else { Err(ValidationError::Invalid { context, violations }) }
	}
}

/// Name of a JSON value's type, as used in "Expected X, received Y" messages.
pub fn json_type_name(value: &serde_json::Value) -> &'static str {
	match value {
		serde_json::Value::Null => "null",
		serde_json::Value::Bool(_) => "boolean",
		serde_json::Value::Number(_) => "number",
		serde_json::Value::String(_) => "string",
		serde_json::Value::Array(_) => "array",
		serde_json::Value::Object(_) => "object",
	}
}
