//! Mock GitHub client for testing purposes.
//!
//! Stores issues and comments in memory. Every mutation stamps the owning
//! issue's `updated_at` with [`MockTimestamp::now`], so tests can pin the clock
//! and decide which edits count as "after the event".

use std::{
	collections::{BTreeMap, HashMap},
	sync::{
		Mutex,
		atomic::{AtomicU64, AtomicUsize, Ordering},
	},
};

use async_trait::async_trait;
use color_eyre::eyre::{Result, eyre};
use jiff::Timestamp;
use tracing::instrument;

use crate::{
	github::{COMMENTS_PER_PAGE, GitHubClient, GitHubComment, GitHubIssue, GitHubUser},
	mocks::MockTimestamp,
};

#[derive(Clone, Debug)]
struct MockIssueData {
	number: u64,
	title: String,
	body: String,
	state: String,
	updated_at: Timestamp,
}

#[derive(Clone, Debug)]
struct MockCommentData {
	id: u64,
	issue_number: u64,
	body: String,
	owner_login: String,
}

/// Key for looking up issues/comments by owner/repo
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct RepoKey {
	owner: String,
	repo: String,
}

impl RepoKey {
	fn new(owner: &str, repo: &str) -> Self {
		Self {
			owner: owner.to_string(),
			repo: repo.to_string(),
		}
	}
}

/// An edit made by someone else while the action is running.
#[derive(Clone, Debug)]
pub enum ConcurrentEdit {
	Comment { id: u64, body: String },
	IssueBody { number: u64, body: String },
}

/// Mock GitHub client that stores all state in memory.
/// Thread-safe for use in async contexts.
pub struct MockGitHubClient {
	/// The authenticated user's login, author of created comments
	user_login: String,

	/// Counter for generating unique comment IDs
	next_comment_id: AtomicU64,

	/// All issues, keyed by (owner, repo) -> issue_number -> issue
	issues: Mutex<HashMap<RepoKey, HashMap<u64, MockIssueData>>>,

	/// All comments, keyed by (owner, repo) -> comment_id -> comment. Ordered so pages are stable.
	comments: Mutex<HashMap<RepoKey, BTreeMap<u64, MockCommentData>>>,

	/// Number of `fetch_issue` calls served so far
	issue_fetches: AtomicUsize,

	/// Edits applied right before serving the `fetch_issue` call with this (1-based) ordinal
	pending_edits: Mutex<Vec<(usize, RepoKey, ConcurrentEdit)>>,

	/// Call log for debugging
	call_log: Mutex<Vec<String>>,
}

impl MockGitHubClient {
	/// Create a new mock client with the given authenticated user login
	pub fn new(user_login: &str) -> Self {
		Self {
			user_login: user_login.to_string(),
			next_comment_id: AtomicU64::new(5000),
			issues: Mutex::new(HashMap::new()),
			comments: Mutex::new(HashMap::new()),
			issue_fetches: AtomicUsize::new(0),
			pending_edits: Mutex::new(Vec::new()),
			call_log: Mutex::new(Vec::new()),
		}
	}

	/// Add an issue to the mock state
	pub fn add_issue(&self, owner: &str, repo: &str, number: u64, title: &str, body: &str) {
		let issue = MockIssueData {
			number,
			title: title.to_string(),
			body: body.to_string(),
			state: "open".to_string(),
			updated_at: MockTimestamp::now(),
		};

		let mut issues = self.issues.lock().unwrap();
		issues.entry(RepoKey::new(owner, repo)).or_default().insert(number, issue);
	}

	/// Add a comment to an issue
	pub fn add_comment(&self, owner: &str, repo: &str, issue_number: u64, comment_id: u64, body: &str, owner_login: &str) {
		let key = RepoKey::new(owner, repo);
		let comment = MockCommentData {
			id: comment_id,
			issue_number,
			body: body.to_string(),
			owner_login: owner_login.to_string(),
		};

		self.comments.lock().unwrap().entry(key.clone()).or_default().insert(comment_id, comment);
		self.touch_issue(&key, issue_number);
	}

	/// Simulate a user editing a comment in the UI
	pub fn set_comment_body(&self, owner: &str, repo: &str, comment_id: u64, body: &str) {
		let key = RepoKey::new(owner, repo);
		self.apply_edit(&key, &ConcurrentEdit::Comment {
			id: comment_id,
			body: body.to_string(),
		});
	}

	/// Simulate a user editing an issue body in the UI
	pub fn set_issue_body(&self, owner: &str, repo: &str, issue_number: u64, body: &str) {
		let key = RepoKey::new(owner, repo);
		self.apply_edit(&key, &ConcurrentEdit::IssueBody {
			number: issue_number,
			body: body.to_string(),
		});
	}

	pub fn comment_body(&self, owner: &str, repo: &str, comment_id: u64) -> Option<String> {
		let comments = self.comments.lock().unwrap();
		comments.get(&RepoKey::new(owner, repo))?.get(&comment_id).map(|c| c.body.clone())
	}

	/// Ids of all comments on an issue, oldest first
	pub fn comment_ids(&self, owner: &str, repo: &str, issue_number: u64) -> Vec<u64> {
		let comments = self.comments.lock().unwrap();
		comments
			.get(&RepoKey::new(owner, repo))
			.map(|c| c.values().filter(|c| c.issue_number == issue_number).map(|c| c.id).collect())
			.unwrap_or_default()
	}

	pub fn issue_body(&self, owner: &str, repo: &str, issue_number: u64) -> Option<String> {
		let issues = self.issues.lock().unwrap();
		issues.get(&RepoKey::new(owner, repo))?.get(&issue_number).map(|i| i.body.clone())
	}

	pub fn issue_updated_at(&self, owner: &str, repo: &str, issue_number: u64) -> Option<Timestamp> {
		let issues = self.issues.lock().unwrap();
		issues.get(&RepoKey::new(owner, repo))?.get(&issue_number).map(|i| i.updated_at)
	}

	/// Schedule `edit` to land right before the `nth` (1-based) `fetch_issue` call from now is served.
	pub fn queue_edit_on_issue_fetch(&self, owner: &str, repo: &str, nth: usize, edit: ConcurrentEdit) {
		let due_at = self.issue_fetches.load(Ordering::SeqCst) + nth;
		self.pending_edits.lock().unwrap().push((due_at, RepoKey::new(owner, repo), edit));
	}

	/// Get the call log for debugging
	pub fn get_call_log(&self) -> Vec<String> {
		self.call_log.lock().unwrap().clone()
	}

	/// Clear the call log
	pub fn clear_call_log(&self) {
		self.call_log.lock().unwrap().clear();
	}

	fn log_call(&self, call: &str) {
		self.call_log.lock().unwrap().push(call.to_string());
	}

	fn touch_issue(&self, key: &RepoKey, issue_number: u64) {
		let mut issues = self.issues.lock().unwrap();
		if let Some(issue) = issues.get_mut(key).and_then(|i| i.get_mut(&issue_number)) {
			issue.updated_at = MockTimestamp::now();
		}
	}

	fn apply_edit(&self, key: &RepoKey, edit: &ConcurrentEdit) {
		tracing::info!(target: "mock_github", ?edit, "applying edit");
		match edit {
			ConcurrentEdit::Comment { id, body } => {
				let issue_number = {
					let mut comments = self.comments.lock().unwrap();
					let Some(comment) = comments.get_mut(key).and_then(|c| c.get_mut(id)) else {
						return;
					};
					comment.body = body.clone();
					comment.issue_number
				};
				self.touch_issue(key, issue_number);
			}
			ConcurrentEdit::IssueBody { number, body } => {
				let mut issues = self.issues.lock().unwrap();
				if let Some(issue) = issues.get_mut(key).and_then(|i| i.get_mut(number)) {
					issue.body = body.clone();
					issue.updated_at = MockTimestamp::now();
				}
			}
		}
	}

	fn convert_issue_data(&self, data: &MockIssueData, key: &RepoKey) -> GitHubIssue {
		GitHubIssue {
			number: data.number,
			title: data.title.clone(),
			body: if data.body.is_empty() { None } else { Some(data.body.clone()) },
			state: data.state.clone(),
			html_url: format!("https://github.com/{}/{}/issues/{}", key.owner, key.repo, data.number),
			updated_at: data.updated_at,
		}
	}

	fn convert_comment_data(&self, data: &MockCommentData, key: &RepoKey) -> GitHubComment {
		GitHubComment {
			id: data.id,
			body: if data.body.is_empty() { None } else { Some(data.body.clone()) },
			html_url: format!("https://github.com/{}/{}/issues/{}#issuecomment-{}", key.owner, key.repo, data.issue_number, data.id),
			user: GitHubUser { login: data.owner_login.clone() },
		}
	}

	fn issue_exists(&self, key: &RepoKey, issue_number: u64) -> bool {
		self.issues.lock().unwrap().get(key).is_some_and(|i| i.contains_key(&issue_number))
	}
}

#[async_trait]
impl GitHubClient for MockGitHubClient {
	#[instrument(skip(self), name = "MockGitHubClient::fetch_issue")]
	async fn fetch_issue(&self, owner: &str, repo: &str, issue_number: u64) -> Result<GitHubIssue> {
		tracing::info!(target: "mock_github", owner, repo, issue_number, "fetch_issue");
		self.log_call(&format!("fetch_issue({owner}, {repo}, {issue_number})"));

		let nth = self.issue_fetches.fetch_add(1, Ordering::SeqCst) + 1;
		let due: Vec<_> = {
			let mut pending = self.pending_edits.lock().unwrap();
			let (due, rest): (Vec<_>, Vec<_>) = pending.drain(..).partition(|(n, ..)| *n == nth);
			*pending = rest;
			due
		};
		for (_, key, edit) in &due {
			self.apply_edit(key, edit);
		}

		let key = RepoKey::new(owner, repo);
		let issues = self.issues.lock().unwrap();
		let repo_issues = issues.get(&key).ok_or_else(|| eyre!("Repository not found: {}/{}", owner, repo))?;
		let issue_data = repo_issues.get(&issue_number).ok_or_else(|| eyre!("Issue not found: #{}", issue_number))?;

		Ok(self.convert_issue_data(issue_data, &key))
	}

	#[instrument(skip(self), name = "MockGitHubClient::fetch_comments")]
	async fn fetch_comments(&self, owner: &str, repo: &str, issue_number: u64, page: u32) -> Result<Vec<GitHubComment>> {
		tracing::info!(target: "mock_github", owner, repo, issue_number, page, "fetch_comments");
		self.log_call(&format!("fetch_comments({owner}, {repo}, {issue_number}, {page})"));

		let key = RepoKey::new(owner, repo);
		let comments = self.comments.lock().unwrap();
		let Some(repo_comments) = comments.get(&key) else {
			return Ok(Vec::new());
		};

		let skip = (page.max(1) as usize - 1) * COMMENTS_PER_PAGE;
		Ok(repo_comments
			.values()
			.filter(|c| c.issue_number == issue_number)
			.skip(skip)
			.take(COMMENTS_PER_PAGE)
			.map(|c| self.convert_comment_data(c, &key))
			.collect())
	}

	#[instrument(skip(self, body), name = "MockGitHubClient::create_comment")]
	async fn create_comment(&self, owner: &str, repo: &str, issue_number: u64, body: &str) -> Result<GitHubComment> {
		tracing::info!(target: "mock_github", owner, repo, issue_number, "create_comment");
		self.log_call(&format!("create_comment({owner}, {repo}, {issue_number}, <body>)"));

		let key = RepoKey::new(owner, repo);
		if !self.issue_exists(&key, issue_number) {
			return Err(eyre!("Issue not found: #{}", issue_number));
		}

		let comment = MockCommentData {
			id: self.next_comment_id.fetch_add(1, Ordering::SeqCst),
			issue_number,
			body: body.to_string(),
			owner_login: self.user_login.clone(),
		};
		let created = self.convert_comment_data(&comment, &key);

		self.comments.lock().unwrap().entry(key.clone()).or_default().insert(comment.id, comment);
		self.touch_issue(&key, issue_number);
		Ok(created)
	}

	#[instrument(skip(self, body), name = "MockGitHubClient::update_comment")]
	async fn update_comment(&self, owner: &str, repo: &str, comment_id: u64, body: &str) -> Result<GitHubComment> {
		tracing::info!(target: "mock_github", owner, repo, comment_id, "update_comment");
		self.log_call(&format!("update_comment({owner}, {repo}, {comment_id}, <body>)"));

		let key = RepoKey::new(owner, repo);
		let updated = {
			let mut comments = self.comments.lock().unwrap();
			let repo_comments = comments.get_mut(&key).ok_or_else(|| eyre!("Repository not found: {}/{}", owner, repo))?;
			let comment = repo_comments.get_mut(&comment_id).ok_or_else(|| eyre!("Comment not found: {}", comment_id))?;
			comment.body = body.to_string();
			comment.clone()
		};

		self.touch_issue(&key, updated.issue_number);
		Ok(self.convert_comment_data(&updated, &key))
	}

	#[instrument(skip(self, body), name = "MockGitHubClient::update_issue_body")]
	async fn update_issue_body(&self, owner: &str, repo: &str, issue_number: u64, body: &str) -> Result<GitHubIssue> {
		tracing::info!(target: "mock_github", owner, repo, issue_number, "update_issue_body");
		self.log_call(&format!("update_issue_body({owner}, {repo}, {issue_number}, <body>)"));

		let key = RepoKey::new(owner, repo);
		let mut issues = self.issues.lock().unwrap();
		let repo_issues = issues.get_mut(&key).ok_or_else(|| eyre!("Repository not found: {}/{}", owner, repo))?;
		let issue = repo_issues.get_mut(&issue_number).ok_or_else(|| eyre!("Issue not found: #{}", issue_number))?;

		issue.body = body.to_string();
		issue.updated_at = MockTimestamp::now();
		Ok(self.convert_issue_data(issue, &key))
	}
}
