//! Step outputs and the failure annotation.

use std::{fs::OpenOptions, io::Write, path::Path};

use color_eyre::eyre::{Context, Result};

use crate::state::CheckboxState;

/// What a run reports back to the workflow.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ActionOutputs {
	/// Whether a managed document was found (detection) or written (configuration)
	pub retrieved: bool,
	pub changed: bool,
	pub state: CheckboxState,
	/// Keys whose checked flag differs from the previous run, sorted
	pub changes: Vec<String>,
	pub all_checked: bool,
	/// Tracked comment, in comment mode
	pub comment_id: Option<u64>,
}

impl ActionOutputs {
	/// Nothing to detect: no managed document exists yet.
	pub fn not_retrieved(comment_id: Option<u64>) -> Self {
		Self { comment_id, ..Default::default() }
	}

	/// Outputs as `(name, value)` pairs, in reporting order.
	pub fn to_lines(&self) -> Vec<(&'static str, String)> {
		let mut lines = vec![
			("retrieved", self.retrieved.to_string()),
			("changed", self.changed.to_string()),
			("state", serde_json::to_string(&self.state).unwrap_or_else(|_| "{}".to_string())),
			("changes", serde_json::to_string(&self.changes).unwrap_or_else(|_| "[]".to_string())),
			("all-checked", self.all_checked.to_string()),
		];
		if let Some(id) = self.comment_id {
			lines.push(("comment-id", id.to_string()));
		}
		lines
	}

	/// Append `name=value` lines to the runner's output file, or print them when there is none.
	pub fn write(&self, output_file: Option<&Path>) -> Result<()> {
		let rendered: String = self.to_lines().into_iter().map(|(name, value)| format!("{name}={value}\n")).collect();

		match output_file {
			Some(path) => {
				let mut file = OpenOptions::new()
					.create(true)
					.append(true)
					.open(path)
					.wrap_err_with(|| format!("Failed to open output file {}", path.display()))?;
				file.write_all(rendered.as_bytes())
					.wrap_err_with(|| format!("Failed to write outputs to {}", path.display()))?;
			}
			None => print!("{rendered}"),
		}
		Ok(())
	}
}

/// `::error::` workflow command marking the step failed with `message`.
pub fn error_command(message: &str) -> String {
	let message = if message.is_empty() { "Unknown error occurred" } else { message };
	let escaped = message.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A");
	format!("::error::{escaped}")
}
