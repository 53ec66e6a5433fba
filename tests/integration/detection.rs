//! Detection-mode edge cases: forced keys, missing or foreign state, and edits
//! racing the run.

use checkbox_workflow::{ActionOutputs, Target, metadata, mock_github::ConcurrentEdit};

use crate::common::{ACTION_ID, ISSUE, OWNER, REPO, TestContext, inputs, toggle};

const CONFIG: &str = "[{lint: 'Lint passes'}, {docs: 'Docs updated'}, {changelog: 'Changelog entry'}]";

async fn configured(target: Target) -> TestContext {
	let ctx = TestContext::new("");
	ctx.run(&inputs(target).message("## Checklist\n\n{{body}}").config(CONFIG).build(), None).await;
	ctx
}

#[tokio::test]
async fn test_nothing_to_detect_on_fresh_issue() {
	let ctx = TestContext::new("");

	assert_eq!(ctx.run(&inputs(Target::Comment).build(), None).await, ActionOutputs::not_retrieved(None));
	assert_eq!(ctx.run(&inputs(Target::IssueBody).build(), None).await, ActionOutputs::not_retrieved(None));
	assert!(ctx.client.get_call_log().iter().all(|c| !c.starts_with("update") && !c.starts_with("create")));
}

#[tokio::test]
async fn test_unmanaged_issue_body_is_read_without_previous_state() {
	let ctx = TestContext::new("- [x] <!-- hand --> Written by hand\n- [ ] <!-- other --> Not yet");

	let out = ctx.run(&inputs(Target::IssueBody).build(), Some(ctx.advance(0))).await;
	assert!(out.retrieved);
	assert!(out.changed);
	// Absent previous state compares as all-unchecked
	assert_eq!(out.changes, vec!["hand"]);

	let body = ctx.client.issue_body(OWNER, REPO, ISSUE).unwrap();
	assert_eq!(metadata::extract_previous_state(&body, ACTION_ID).unwrap(), out.state);
}

fn corrupt_state(body: &str) -> String {
	body.replace(&format!("state:{ACTION_ID}:"), &format!("state:{ACTION_ID}:!!"))
}

#[tokio::test]
async fn test_corrupted_state_is_treated_as_missing() {
	let ctx = configured(Target::Comment).await;
	let (id, body) = ctx.tracked_comment();
	let broken = toggle(&corrupt_state(&body), "docs");
	let event_at = ctx.advance(1);
	ctx.client.set_comment_body(OWNER, REPO, id, &broken);
	assert!(metadata::decode_metadata(&broken, ACTION_ID).is_none());

	// The marker still identifies the comment; only the baseline is lost
	let out = ctx.run(&inputs(Target::Comment).build(), Some(event_at)).await;
	assert!(out.retrieved);
	assert!(out.changed);
	assert_eq!(out.changes, vec!["docs"]);
	assert_eq!(out.comment_id, Some(id));

	let (_, body) = ctx.tracked_comment();
	assert_eq!(metadata::extract_previous_state(&body, ACTION_ID).unwrap(), out.state);
}

#[tokio::test]
async fn test_reconfiguring_over_corrupted_state_reuses_comment() {
	let ctx = configured(Target::Comment).await;
	let (id, body) = ctx.tracked_comment();
	ctx.client.set_comment_body(OWNER, REPO, id, &corrupt_state(&body));

	let out = ctx.run(&inputs(Target::Comment).message("## Checklist\n\n{{body}}").config(CONFIG).build(), None).await;
	assert_eq!(out.comment_id, Some(id));
	assert_eq!(ctx.client.comment_ids(OWNER, REPO, ISSUE), vec![id]);

	let (_, body) = ctx.tracked_comment();
	assert!(metadata::decode_metadata(&body, ACTION_ID).is_some());
}

#[tokio::test]
async fn test_forced_keys_persist_and_diff_against_previous_run() {
	let ctx = configured(Target::Comment).await;
	let event_at = ctx.user_toggles_comment("lint");
	ctx.run(&inputs(Target::Comment).build(), Some(event_at)).await;

	let out = ctx.run(&inputs(Target::Comment).force_checked(&["docs", "changelog"]).build(), None).await;
	assert!(out.changed);
	assert_eq!(out.changes, vec!["lint", "docs", "changelog"]);
	assert!(!out.state.is_checked("lint"));
	assert!(!out.all_checked);

	let (_, body) = ctx.tracked_comment();
	assert!(body.contains("## Checklist"));
	assert!(body.contains("- [ ] <!-- lint --> Lint passes"));
	assert!(body.contains("- [x] <!-- docs --> Docs updated"));
	assert_eq!(metadata::extract_previous_state(&body, ACTION_ID).unwrap(), out.state);
}

#[tokio::test]
async fn test_forced_keys_with_new_message() {
	let ctx = configured(Target::IssueBody).await;

	let out = ctx
		.run(&inputs(Target::IssueBody).message("  Done:\n{{body}}\n").force_checked(&["lint", "docs", "changelog"]).build(), None)
		.await;
	assert!(out.all_checked);

	let body = ctx.client.issue_body(OWNER, REPO, ISSUE).unwrap();
	assert!(body.starts_with("<!-- checkbox-workflow-action:managed -->\nDone:\n<!-- checkbox-workflow-action:body-start -->"));
	assert!(!body.contains("## Checklist"));
}

#[tokio::test]
async fn test_forced_unknown_keys_only_reset() {
	let ctx = configured(Target::Comment).await;
	let event_at = ctx.user_toggles_comment("docs");
	ctx.run(&inputs(Target::Comment).build(), Some(event_at)).await;

	let out = ctx.run(&inputs(Target::Comment).force_checked(&["nonexistent"]).build(), None).await;
	assert_eq!(out.changes, vec!["docs"]);
	assert!(!out.state.is_checked("docs"));
	assert!(!out.state.is_checked("nonexistent"));
	assert_eq!(out.state.len(), 3);
}

#[tokio::test]
async fn test_race_with_comment_losing_its_state_falls_back() {
	let ctx = configured(Target::Comment).await;
	let event_at = ctx.user_toggles_comment("lint");
	let (id, _) = ctx.tracked_comment();

	ctx.advance(3);
	ctx.client.queue_edit_on_issue_fetch(OWNER, REPO, 1, ConcurrentEdit::Comment {
		id,
		body: "someone replaced the checklist".to_string(),
	});

	let out = ctx.run(&inputs(Target::Comment).build(), Some(event_at)).await;
	assert!(out.changed);
	assert_eq!(out.changes, vec!["lint"]);
	assert!(out.state.is_checked("lint"));
}

#[tokio::test]
async fn test_race_in_issue_body_mode() {
	let ctx = configured(Target::IssueBody).await;
	let event_at = ctx.user_toggles_issue_body("lint");
	let clicked = ctx.client.issue_body(OWNER, REPO, ISSUE).unwrap();

	ctx.advance(2);
	ctx.client.queue_edit_on_issue_fetch(OWNER, REPO, 2, ConcurrentEdit::IssueBody {
		number: ISSUE,
		body: toggle(&toggle(&clicked, "docs"), "changelog"),
	});

	let out = ctx.run(&inputs(Target::IssueBody).build(), Some(event_at)).await;
	assert_eq!(out.changes, vec!["lint", "docs", "changelog"]);
	assert!(out.all_checked);

	let body = ctx.client.issue_body(OWNER, REPO, ISSUE).unwrap();
	assert_eq!(metadata::extract_previous_state(&body, ACTION_ID).unwrap(), out.state);
	assert!(body.contains("## Checklist"));
}

#[tokio::test]
async fn test_missing_event_timestamp_uses_clock() {
	let ctx = configured(Target::Comment).await;
	ctx.user_toggles_comment("docs");

	// The clock has not moved since the click, so the issue is not newer than "now" and no re-read happens
	let out = ctx.run(&inputs(Target::Comment).build(), None).await;
	assert_eq!(out.changes, vec!["docs"]);
	assert_eq!(ctx.client.get_call_log().iter().filter(|c| c.starts_with("fetch_comments")).count(), 2);
}

#[tokio::test]
async fn test_changes_and_state_follow_checklist_order() {
	let ctx = TestContext::new("");
	ctx.run(&inputs(Target::IssueBody).config("[{zeta: 'Last alphabetically'}, {alpha: 'First alphabetically'}]").build(), None).await;
	ctx.user_toggles_issue_body("alpha");
	let event_at = ctx.user_toggles_issue_body("zeta");

	let out = ctx.run(&inputs(Target::IssueBody).build(), Some(event_at)).await;
	assert_eq!(out.changes, vec!["zeta", "alpha"]);
	assert_eq!(serde_json::to_string(&out.state).unwrap(), r#"{"zeta":true,"alpha":true}"#);
}
