//! Checkbox lines with hidden keys: `- [x] <!-- key --> label`.
//!
//! Parsing is line-oriented and tolerant of leading indentation. Rendering
//! produces one line per pair, and a rendered block is wrapped between the body
//! markers so it can be located and replaced on the next run.

use std::{collections::HashSet, ops::Range, sync::LazyLock};

use regex::Regex;

use crate::{
	checklist_config::ConfigPair,
	marker::{self, BODY_PLACEHOLDER, Marker},
	state::CheckboxState,
};

static CHECKBOX_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^(\s*)- \[([ xX])\]\s*(<!--.+?-->)\s*(.*)$").unwrap());

/// A checkbox parsed out of a markdown document.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CheckboxItem {
	pub key: String,
	pub label: String,
	pub checked: bool,
	/// Leading whitespace as matched, which may include a preceding newline.
	pub indentation: String,
	/// Byte range of the whole match in the source.
	pub span: Range<usize>,
}

/// Scan markdown for keyed checkbox lines, in document order.
pub fn parse_checkboxes(markdown: &str) -> Vec<CheckboxItem> {
	CHECKBOX_PATTERN
		.captures_iter(markdown)
		.filter_map(|caps| {
			let whole = caps.get(0)?;
			// Prefixed markers and empty comments are not keys
			let Some(Marker::Item { key }) = Marker::decode(caps.get(3)?.as_str()) else {
				return None;
			};
			Some(CheckboxItem {
				key,
				label: caps.get(4).map_or("", |m| m.as_str()).trim().to_string(),
				checked: caps.get(2).is_some_and(|m| m.as_str().eq_ignore_ascii_case("x")),
				indentation: caps.get(1).map_or("", |m| m.as_str()).to_string(),
				span: whole.range(),
			})
		})
		.collect()
}

/// Current checkbox state of a document.
pub fn extract_state(markdown: &str) -> CheckboxState {
	CheckboxState::from_items(&parse_checkboxes(markdown))
}

/// Recover the key/label pairs of an existing document. The first occurrence of a key wins.
pub fn pairs_from_markdown(markdown: &str) -> Vec<ConfigPair> {
	let mut seen = HashSet::new();
	parse_checkboxes(markdown)
		.into_iter()
		.filter(|item| seen.insert(item.key.clone()))
		.map(|item| ConfigPair::new(item.key, item.label))
		.collect()
}

/// Render one checkbox line per pair, in input order.
pub fn render_checkboxes(pairs: &[ConfigPair], checked_keys: &HashSet<&str>) -> String {
	pairs
		.iter()
		.map(|pair| {
			let mark = if checked_keys.contains(pair.key.as_str()) { "x" } else { " " };
			format!("- [{mark}] {} {}", Marker::Item { key: pair.key.clone() }, pair.label)
		})
		.collect::<Vec<_>>()
		.join("\n")
}

/// Render the pairs with checked flags taken from `state`.
pub fn rerender_checkboxes(pairs: &[ConfigPair], state: &CheckboxState) -> String {
	let checked: HashSet<&str> = state.checked_keys().into_iter().collect();
	render_checkboxes(pairs, &checked)
}

/// Substitute every `{{body}}` in the template with the marker-wrapped checkboxes,
/// and prefix the result with the managed marker.
pub fn render_message(template: &str, checkboxes: &str) -> String {
	let section = marker::body_section(checkboxes);
	format!("{}{}", marker::managed_prefix(), template.replace(BODY_PLACEHOLDER, &section))
}

/// Recover the template a document was rendered from.
///
/// Drops the managed prefix and every state comment, then puts the `{{body}}`
/// placeholder back where the checkbox block was.
pub fn template_from_markdown(markdown: &str) -> String {
	let without_prefix = marker::strip_managed_prefix(markdown);
	let without_metadata = marker::strip_metadata_comments(&without_prefix);
	marker::replace_body_section_with_placeholder(&without_metadata).trim().to_string()
}
