//! Action inputs, from command-line flags or the `INPUT_*` environment the
//! Actions runner provides.

use clap::Parser;
use serde_json::Value;

use crate::error::{ValidationError, Violation, ViolationKind, json_type_name};

/// Where the checklist lives.
#[derive(Clone, Copy, Debug, Eq, PartialEq, derive_more::Display)]
pub enum Target {
	/// A comment on the issue, located by its state marker.
	#[display("comment")]
	Comment,
	/// The issue (or pull request) body itself.
	#[display("issue body")]
	IssueBody,
}

/// Track checkbox state in an issue or pull request comment.
///
/// With `--config`, (re)creates the checklist. Without it, reports which
/// checkboxes changed since the previous run.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
	/// Identifier scoping this checklist's hidden state
	#[arg(long, env = "INPUT_ID", default_value = "")]
	pub id: String,

	/// Issue or pull request number
	#[arg(long, env = "INPUT_NUMBER", default_value = "")]
	pub number: String,

	/// Message template; `{{body}}` is replaced by the checkboxes
	#[arg(long, env = "INPUT_MESSAGE", default_value = "")]
	pub message: String,

	/// JSON5 array of `{key: label}` items. Switches to configuration mode
	#[arg(long, env = "INPUT_CONFIG")]
	pub config: Option<String>,

	/// JSON array of keys to check; every other key is unchecked
	#[arg(long = "force-checked", env = "INPUT_FORCE-CHECKED")]
	pub force_checked: Option<String>,

	/// Track the issue body instead of a comment ("true" / "false")
	#[arg(long, env = "INPUT_BODY", default_value = "false")]
	pub body: String,

	/// GitHub token
	#[arg(long, env = "INPUT_TOKEN", default_value = "", hide_env_values = true)]
	pub token: String,
}

/// Validated inputs for one run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ActionInputs {
	pub id: String,
	pub number: u64,
	pub message: String,
	/// Raw checklist configuration; `Some` selects configuration mode.
	pub config: Option<String>,
	pub force_checked: Option<Vec<String>>,
	pub target: Target,
	pub token: String,
}

/// Unset and empty inputs are the same to the runner. Whitespace is a value.
fn non_empty(value: Option<String>) -> Option<String> {
	value.filter(|v| !v.is_empty())
}

impl Cli {
	/// Validate raw inputs. Input problems are reported together under
	/// "action inputs"; a bad `force-checked` value under "checked parameter".
	pub fn into_inputs(self) -> Result<ActionInputs, ValidationError> {
		let mut violations = Vec::new();

		if self.id.is_empty() {
			violations.push(Violation::new(ViolationKind::Field, vec!["id".to_string()], "ID must not be empty".to_string()));
		}
		let number = self.number.trim().parse::<i64>().ok().filter(|n| *n > 0);
		if number.is_none() {
			violations.push(Violation::new(ViolationKind::Field, vec!["number".to_string()], "Number must be a positive integer".to_string()));
		}
		if self.token.is_empty() {
			violations.push(Violation::new(ViolationKind::Field, vec!["token".to_string()], "Token must not be empty".to_string()));
		}
		ValidationError::check("action inputs", violations)?;

		let force_checked = non_empty(self.force_checked).map(|raw| parse_forced_keys(&raw)).transpose()?;

		Ok(ActionInputs {
			id: self.id,
			number: number.unwrap_or_default() as u64,
			message: self.message,
			config: non_empty(self.config),
			force_checked,
			target: if self.body.trim() == "true" { Target::IssueBody } else { Target::Comment },
			token: self.token,
		})
	}
}

/// Parse the `force-checked` input: a strict JSON array of strings.
pub fn parse_forced_keys(text: &str) -> Result<Vec<String>, ValidationError> {
	const CONTEXT: &str = "checked parameter";

	let value: Value = serde_json::from_str(text).map_err(|e| ValidationError::Syntax {
		context: CONTEXT,
		message: e.to_string(),
	})?;
	let items = match value {
		Value::Array(items) => items,
		other => {
			return Err(ValidationError::Invalid {
				context: CONTEXT,
				violations: vec![Violation::new(ViolationKind::Shape, vec![], format!("Expected array, received {}", json_type_name(&other)))],
			});
		}
	};

	let mut keys = Vec::with_capacity(items.len());
	let mut violations = Vec::new();
	for (index, item) in items.into_iter().enumerate() {
		match item {
			Value::String(key) => keys.push(key),
			other => violations.push(Violation::new(
				ViolationKind::Field,
				vec![index.to_string()],
				format!("Expected string, received {}", json_type_name(&other)),
			)),
		}
	}
	ValidationError::check(CONTEXT, violations)?;

	Ok(keys)
}
