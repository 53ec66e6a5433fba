//! One run of the action: configuration mode writes a fresh checklist,
//! detection mode reports what changed since the previous run.

use color_eyre::eyre::Result;
use jiff::Timestamp;
use tracing::instrument;

use crate::{
	checkbox::{extract_state, pairs_from_markdown, render_message, rerender_checkboxes, template_from_markdown},
	checklist_config::{ConfigPair, parse_config},
	github::CommentManager,
	inputs::{ActionInputs, Target},
	metadata::{append_metadata, extract_previous_state},
	mocks::MockTimestamp,
	outputs::ActionOutputs,
	state::{CheckboxState, changed_keys, has_changed},
};

#[instrument(skip_all, fields(id = %inputs.id, number = inputs.number, location = %inputs.target))]
pub async fn run(inputs: &ActionInputs, manager: &CommentManager, event_updated_at: Option<Timestamp>) -> Result<ActionOutputs> {
	tracing::info!("Starting action for ID: {}, Issue: #{}", inputs.id, inputs.number);

	let outputs = match inputs.config.as_deref() {
		Some(config) => configure(inputs, manager, config).await?,
		None => detect(inputs, manager, event_updated_at).await?,
	};

	tracing::info!("Action completed successfully");
	Ok(outputs)
}

/// Full managed document: rendered template plus the state marker.
fn render_document(template: &str, pairs: &[ConfigPair], action_id: &str, state: &CheckboxState) -> String {
	let checkboxes = rerender_checkboxes(pairs, state);
	append_metadata(&render_message(template, &checkboxes), action_id, state)
}

async fn configure(inputs: &ActionInputs, manager: &CommentManager, config: &str) -> Result<ActionOutputs> {
	let pairs = parse_config(config)?;
	tracing::debug!(items = pairs.len(), "parsed checklist config");

	let initial = CheckboxState::unchecked(pairs.iter().map(|p| p.key.as_str()));
	let state = match &inputs.force_checked {
		Some(forced) => initial.with_forced(forced),
		None => initial,
	};

	let document = render_document(&inputs.message, &pairs, &inputs.id, &state);

	let comment_id = match inputs.target {
		Target::IssueBody => {
			let (issue, _) = manager.create_or_update_issue_body(inputs.number, &inputs.id, &document).await?;
			tracing::info!("Issue body updated: {}", issue.html_url);
			None
		}
		Target::Comment => {
			let (comment, is_new) = manager.create_or_update_comment(inputs.number, &inputs.id, &document).await?;
			tracing::info!(is_new, "Comment created/updated: {}", comment.html_url);
			Some(comment.id)
		}
	};

	Ok(ActionOutputs {
		retrieved: true,
		changed: false,
		all_checked: state.all_checked(),
		state,
		changes: Vec::new(),
		comment_id,
	})
}

/// Overwrite the tracked document. In comment mode without a comment there is nothing to write.
async fn persist(inputs: &ActionInputs, manager: &CommentManager, comment_id: Option<u64>, document: &str) -> Result<()> {
	match (inputs.target, comment_id) {
		(Target::IssueBody, _) => {
			manager.update_issue_body(inputs.number, document).await?;
		}
		(Target::Comment, Some(id)) => {
			manager.update_comment(id, document).await?;
		}
		(Target::Comment, None) => {}
	}
	Ok(())
}

async fn detect(inputs: &ActionInputs, manager: &CommentManager, event_updated_at: Option<Timestamp>) -> Result<ActionOutputs> {
	let event_updated_at = event_updated_at.unwrap_or_else(MockTimestamp::now);
	tracing::debug!(%event_updated_at, "event timestamp");

	let (content, comment_id) = match inputs.target {
		Target::IssueBody => (manager.fetch_issue(inputs.number).await?.body, None),
		Target::Comment => match manager.find_comment(inputs.number, &inputs.id).await? {
			Some(comment) => (comment.body, Some(comment.id)),
			None => (None, None),
		},
	};
	let Some(content) = content.filter(|c| !c.is_empty()) else {
		tracing::info!("No existing content found, nothing to detect");
		return Ok(ActionOutputs::not_retrieved(comment_id));
	};

	let current = extract_state(&content);
	let baseline = extract_previous_state(&content, &inputs.id).unwrap_or_default();

	let state = match &inputs.force_checked {
		Some(forced) => {
			let forced_state = current.with_forced(forced);

			let message = inputs.message.trim();
			let template = if message.is_empty() { template_from_markdown(&content) } else { message.to_string() };
			tracing::debug!(input = %inputs.message, resolved = %template, "message for forced update");

			let pairs = pairs_from_markdown(&content);
			let document = render_document(&template, &pairs, &inputs.id, &forced_state);
			persist(inputs, manager, comment_id, &document).await?;
			tracing::debug!(items = pairs.len(), "persisted forced state");

			forced_state
		}
		None => current,
	};

	let mut changed = has_changed(Some(&baseline), &state);
	let mut changes = changed_keys(&baseline, &state);
	tracing::debug!("State transition: {} → {} items", baseline.len(), state.len());
	if changed && !changes.is_empty() {
		tracing::info!("Changed: {}", changes.join(", "));
	}

	if !changed || inputs.force_checked.is_some() {
		return Ok(outputs(state, changed, changes, comment_id));
	}

	let final_state = match live_state_after_race(inputs, manager, event_updated_at, &state).await? {
		Some(live) => {
			changed = has_changed(Some(&baseline), &live);
			changes = changed_keys(&baseline, &live);
			tracing::debug!(changes = %changes.join(", "), "recalculated with latest state");
			live
		}
		None => state,
	};

	// Metadata now records this run's state so the next run diffs against it
	let document = render_document(&template_from_markdown(&content), &pairs_from_markdown(&content), &inputs.id, &final_state);
	persist(inputs, manager, comment_id, &document).await?;
	tracing::debug!("updated metadata for next run");

	Ok(outputs(final_state, changed, changes, comment_id))
}

/// Live checkbox state, if the issue was modified after the triggering event.
async fn live_state_after_race(inputs: &ActionInputs, manager: &CommentManager, event_updated_at: Timestamp, fallback: &CheckboxState) -> Result<Option<CheckboxState>> {
	let latest = manager.fetch_issue(inputs.number).await?;
	tracing::debug!(latest_update = %latest.updated_at, "checked issue for later edits");

	if latest.updated_at <= event_updated_at {
		tracing::debug!("No conflicts detected, proceeding");
		return Ok(None);
	}
	let delay = latest.updated_at.duration_since(event_updated_at);
	tracing::warn!("Race condition detected ({}ms delay)", delay.as_millis());

	let live = match inputs.target {
		Target::IssueBody => extract_state(latest.body.as_deref().unwrap_or_default()),
		Target::Comment => match manager.find_comment(inputs.number, &inputs.id).await? {
			Some(comment) => {
				tracing::debug!(comment_id = comment.id, "reading latest state from comment");
				extract_state(comment.body.as_deref().unwrap_or_default())
			}
			None => {
				tracing::debug!("Comment not found, using current state as fallback");
				fallback.clone()
			}
		},
	};
	Ok(Some(live))
}

fn outputs(state: CheckboxState, changed: bool, changes: Vec<String>, comment_id: Option<u64>) -> ActionOutputs {
	ActionOutputs {
		retrieved: true,
		changed,
		all_checked: state.all_checked(),
		state,
		changes,
		comment_id,
	}
}
