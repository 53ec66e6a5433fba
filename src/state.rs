//! Checkbox state snapshots and the diff between two runs.

use std::collections::BTreeSet;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::checkbox::CheckboxItem;

/// Mapping from checkbox key to its checked flag, in document order.
/// A key that is absent compares as unchecked.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize, derive_more::From)]
#[serde(transparent)]
pub struct CheckboxState(IndexMap<String, bool>);

impl CheckboxState {
	/// Build an all-unchecked state for the given keys.
	pub fn unchecked<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
		Self(keys.into_iter().map(|k| (k.to_string(), false)).collect())
	}

	/// Build a state from parsed items. Duplicate keys collapse at their first position, last value wins.
	pub fn from_items(items: &[CheckboxItem]) -> Self {
		Self(items.iter().map(|item| (item.key.clone(), item.checked)).collect())
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Effective value of a key; absent keys are unchecked.
	pub fn is_checked(&self, key: &str) -> bool {
		self.0.get(key).copied().unwrap_or(false)
	}

	pub fn insert(&mut self, key: impl Into<String>, checked: bool) {
		self.0.insert(key.into(), checked);
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
		self.0.iter().map(|(k, v)| (k.as_str(), *v))
	}

	/// Keys whose value is `true`.
	pub fn checked_keys(&self) -> BTreeSet<&str> {
		self.iter().filter(|(_, checked)| *checked).map(|(k, _)| k).collect()
	}

	/// Reset every key to unchecked, then check the forced keys that already exist.
	/// Forced keys with no entry in `self` are ignored, never added.
	pub fn with_forced<S: AsRef<str>>(&self, forced: &[S]) -> Self {
		let mut state: IndexMap<String, bool> = self.0.keys().map(|k| (k.clone(), false)).collect();
		for key in forced {
			if let Some(checked) = state.get_mut(key.as_ref()) {
				*checked = true;
			}
		}
		Self(state)
	}

	/// True only for a non-empty state where every value is checked.
	pub fn all_checked(&self) -> bool {
		!self.0.is_empty() && self.0.values().all(|v| *v)
	}
}

impl<'a> IntoIterator for &'a CheckboxState {
	type IntoIter = indexmap::map::Iter<'a, String, bool>;
	type Item = (&'a String, &'a bool);

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}

/// Whether `current` differs from `previous`.
///
/// A missing previous snapshot always counts as a change. Otherwise the states
/// differ when their key counts differ or when any key of `current` maps to a
/// different (or missing) value in `previous`.
pub fn has_changed(previous: Option<&CheckboxState>, current: &CheckboxState) -> bool {
	let Some(previous) = previous else {
		return true;
	};
	if previous.len() != current.len() {
		return true;
	}
	current.0.iter().any(|(key, value)| previous.0.get(key) != Some(value))
}

/// Keys from either state whose effective value differs: keys of `previous` in
/// their order, then keys only `current` has.
pub fn changed_keys(previous: &CheckboxState, current: &CheckboxState) -> Vec<String> {
	let all_keys: IndexSet<&String> = previous.0.keys().chain(current.0.keys()).collect();
	all_keys.into_iter().filter(|key| previous.is_checked(key) != current.is_checked(key)).cloned().collect()
}
