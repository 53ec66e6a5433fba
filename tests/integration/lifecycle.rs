//! Full create → click → detect cycles against the mock GitHub.

use checkbox_workflow::{CheckboxState, Target, marker, metadata};
use insta::assert_snapshot;

use crate::common::{ACTION_ID, ISSUE, OWNER, REPO, TestContext, inputs};

const CONFIG: &str = r#"[{a: "Task A"}, {b: "Task B"}]"#;

fn state(pairs: &[(&str, bool)]) -> CheckboxState {
	let mut state = CheckboxState::default();
	for (key, checked) in pairs {
		state.insert(*key, *checked);
	}
	state
}

#[tokio::test]
async fn test_configure_then_detect_click() {
	let ctx = TestContext::new("");

	let configured = ctx.run(&inputs(Target::Comment).message("{{body}}").config(CONFIG).build(), None).await;
	assert!(configured.retrieved);
	assert!(!configured.changed);
	assert!(!configured.all_checked);
	assert_eq!(configured.state, state(&[("a", false), ("b", false)]));

	let event_at = ctx.user_toggles_comment("a");
	let detected = ctx.run(&inputs(Target::Comment).build(), Some(event_at)).await;

	assert!(detected.retrieved);
	assert!(detected.changed);
	assert_eq!(detected.changes, vec!["a"]);
	assert_eq!(detected.state, state(&[("a", true), ("b", false)]));
	assert!(!detected.all_checked);
	assert_eq!(detected.comment_id, configured.comment_id);
}

#[tokio::test]
async fn test_checking_everything_reports_all_checked() {
	let ctx = TestContext::new("");
	ctx.run(&inputs(Target::Comment).message("{{body}}").config(CONFIG).build(), None).await;

	let first = ctx.user_toggles_comment("a");
	ctx.run(&inputs(Target::Comment).build(), Some(first)).await;
	let second = ctx.user_toggles_comment("b");
	let out = ctx.run(&inputs(Target::Comment).build(), Some(second)).await;

	// Only the click since the previous run counts as a change
	assert_eq!(out.changes, vec!["b"]);
	assert!(out.all_checked);

	// Unchecking flips it back
	let third = ctx.user_toggles_comment("a");
	let out = ctx.run(&inputs(Target::Comment).build(), Some(third)).await;
	assert_eq!(out.changes, vec!["a"]);
	assert!(!out.all_checked);
}

#[tokio::test]
async fn test_rendered_comment_keeps_template_across_runs() {
	let ctx = TestContext::new("");
	let message = "### Before merging\n\n{{body}}\n\n_Managed by CI_";
	ctx.run(&inputs(Target::Comment).message(message).config(CONFIG).build(), None).await;

	let event_at = ctx.user_toggles_comment("b");
	ctx.run(&inputs(Target::Comment).build(), Some(event_at)).await;

	let (_, body) = ctx.tracked_comment();
	assert_snapshot!(marker::strip_metadata_comments(&body), @r"
	<!-- checkbox-workflow-action:managed -->
	### Before merging

	<!-- checkbox-workflow-action:body-start -->
	- [ ] <!-- a --> Task A
	- [x] <!-- b --> Task B
	<!-- checkbox-workflow-action:body-end -->

	_Managed by CI_
	");
	assert_eq!(metadata::extract_previous_state(&body, ACTION_ID).unwrap(), state(&[("a", false), ("b", true)]));
}

#[tokio::test]
async fn test_issue_body_lifecycle() {
	let ctx = TestContext::new("Original description");

	let configured = ctx.run(&inputs(Target::IssueBody).message("Steps:\n{{body}}").config(CONFIG).build(), None).await;
	assert_eq!(configured.comment_id, None);
	assert!(ctx.client.comment_ids(OWNER, REPO, ISSUE).is_empty());

	let event_at = ctx.user_toggles_issue_body("b");
	let detected = ctx.run(&inputs(Target::IssueBody).build(), Some(event_at)).await;
	assert_eq!(detected.changes, vec!["b"]);
	assert_eq!(detected.comment_id, None);

	let body = ctx.client.issue_body(OWNER, REPO, ISSUE).unwrap();
	assert!(body.starts_with("<!-- checkbox-workflow-action:managed -->\nSteps:\n<!-- checkbox-workflow-action:body-start -->"));
	assert_eq!(metadata::extract_previous_state(&body, ACTION_ID).unwrap(), detected.state);
}

#[tokio::test]
async fn test_reconfigure_replaces_checklist_in_place() {
	let ctx = TestContext::new("");
	let first = ctx.run(&inputs(Target::Comment).message("{{body}}").config(CONFIG).build(), None).await;

	let second = ctx
		.run(&inputs(Target::Comment).message("{{body}}").config("[{c: 'Task C'}]").force_checked(&["c"]).build(), None)
		.await;

	assert_eq!(first.comment_id, second.comment_id);
	assert_eq!(second.state, state(&[("c", true)]));
	assert!(second.all_checked);

	let (_, body) = ctx.tracked_comment();
	assert!(!body.contains("Task A"));
	assert!(body.contains("- [x] <!-- c --> Task C"));
}

#[tokio::test]
async fn test_checklists_with_different_ids_coexist() {
	let ctx = TestContext::new("");
	let mut qa = inputs(Target::Comment).message("QA\n{{body}}").config("[{smoke: 'Smoke tests'}]").build();
	qa.id = "qa".to_string();

	let release = ctx.run(&inputs(Target::Comment).message("{{body}}").config(CONFIG).build(), None).await;
	let qa_out = ctx.run(&qa, None).await;
	assert_ne!(release.comment_id, qa_out.comment_id);

	let qa_id = qa_out.comment_id.unwrap();
	let body = ctx.client.comment_body(OWNER, REPO, qa_id).unwrap();
	let event_at = ctx.advance(10);
	ctx.client.set_comment_body(OWNER, REPO, qa_id, &crate::common::toggle(&body, "smoke"));

	qa.config = None;
	let detected = ctx.run(&qa, Some(event_at)).await;
	assert_eq!(detected.changes, vec!["smoke"]);

	let untouched = ctx.run(&inputs(Target::Comment).build(), Some(event_at)).await;
	assert!(!untouched.changed);
	assert_eq!(untouched.comment_id, release.comment_id);
}

#[tokio::test]
async fn test_tracked_comment_found_beyond_first_page() {
	let ctx = TestContext::new("");
	for id in 1..=120 {
		ctx.client.add_comment(OWNER, REPO, ISSUE, id, "LGTM", "reviewer");
	}

	let configured = ctx.run(&inputs(Target::Comment).message("{{body}}").config(CONFIG).build(), None).await;
	let comment_id = configured.comment_id.unwrap();

	let body = ctx.client.comment_body(OWNER, REPO, comment_id).unwrap();
	let event_at = ctx.advance(5);
	ctx.client.set_comment_body(OWNER, REPO, comment_id, &crate::common::toggle(&body, "a"));

	let detected = ctx.run(&inputs(Target::Comment).build(), Some(event_at)).await;
	assert_eq!(detected.comment_id, Some(comment_id));
	assert_eq!(detected.changes, vec!["a"]);
	assert!(ctx.client.get_call_log().iter().any(|c| c.ends_with(", 2)")));
}
