use std::sync::Arc;

use async_trait::async_trait;
use color_eyre::eyre::{Result, bail};
use jiff::Timestamp;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::instrument;

use crate::metadata;

/// Comments requested per page when listing.
pub const COMMENTS_PER_PAGE: usize = 100;

#[derive(Clone, Debug, Deserialize)]
pub struct GitHubIssue {
	pub number: u64,
	#[serde(default)]
	pub title: String,
	pub body: Option<String>,
	pub state: String, // "open" or "closed"
	#[serde(default)]
	pub html_url: String,
	/// Last time the issue, or anything on it, was modified
	pub updated_at: Timestamp,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GitHubUser {
	pub login: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GitHubComment {
	pub id: u64,
	pub body: Option<String>,
	#[serde(default)]
	pub html_url: String,
	pub user: GitHubUser,
}

//==============================================================================
// GitHub Client Trait
//==============================================================================

/// GitHub API operations the action needs.
/// Implemented by the HTTP client and by the in-memory mock.
#[async_trait]
pub trait GitHubClient: Send + Sync {
	/// Fetch a single issue (or pull request) by number
	async fn fetch_issue(&self, owner: &str, repo: &str, issue_number: u64) -> Result<GitHubIssue>;

	/// Fetch one page of an issue's comments, oldest first. Pages are 1-based, [`COMMENTS_PER_PAGE`] long.
	async fn fetch_comments(&self, owner: &str, repo: &str, issue_number: u64, page: u32) -> Result<Vec<GitHubComment>>;

	/// Create a new comment on an issue
	async fn create_comment(&self, owner: &str, repo: &str, issue_number: u64, body: &str) -> Result<GitHubComment>;

	/// Overwrite a comment's body
	async fn update_comment(&self, owner: &str, repo: &str, comment_id: u64, body: &str) -> Result<GitHubComment>;

	/// Overwrite an issue's body
	async fn update_issue_body(&self, owner: &str, repo: &str, issue_number: u64, body: &str) -> Result<GitHubIssue>;
}

pub type BoxedGitHubClient = Arc<dyn GitHubClient>;

//==============================================================================
// Real GitHub Client Implementation
//==============================================================================

/// GitHub REST client
pub struct RealGitHubClient {
	http_client: Client,
	api_url: String,
	github_token: String,
}

impl RealGitHubClient {
	pub fn new(api_url: &str, github_token: &str) -> Self {
		Self {
			http_client: Client::new(),
			api_url: api_url.trim_end_matches('/').to_string(),
			github_token: github_token.to_string(),
		}
	}

	fn auth_header(&self) -> String {
		format!("token {}", self.github_token)
	}

	fn request(&self, method: Method, path: &str) -> RequestBuilder {
		self.http_client
			.request(method, format!("{}{path}", self.api_url))
			.header("User-Agent", "checkbox-workflow")
			.header("Accept", "application/vnd.github+json")
			.header("Authorization", self.auth_header())
	}

	async fn parse<T: DeserializeOwned>(res: Response, action: &str) -> Result<T> {
		if !res.status().is_success() {
			let status = res.status();
			let body = res.text().await.unwrap_or_default();
			bail!("Failed to {action}: {status} - {body}");
		}
		Ok(res.json::<T>().await?)
	}
}

#[async_trait]
impl GitHubClient for RealGitHubClient {
	#[instrument(skip(self), name = "RealGitHubClient::fetch_issue")]
	async fn fetch_issue(&self, owner: &str, repo: &str, issue_number: u64) -> Result<GitHubIssue> {
		let res = self.request(Method::GET, &format!("/repos/{owner}/{repo}/issues/{issue_number}")).send().await?;
		Self::parse(res, "fetch issue").await
	}

	#[instrument(skip(self), name = "RealGitHubClient::fetch_comments")]
	async fn fetch_comments(&self, owner: &str, repo: &str, issue_number: u64, page: u32) -> Result<Vec<GitHubComment>> {
		let res = self
			.request(
				Method::GET,
				&format!("/repos/{owner}/{repo}/issues/{issue_number}/comments?per_page={COMMENTS_PER_PAGE}&page={page}"),
			)
			.send()
			.await?;
		Self::parse(res, "fetch comments").await
	}

	#[instrument(skip(self, body), name = "RealGitHubClient::create_comment")]
	async fn create_comment(&self, owner: &str, repo: &str, issue_number: u64, body: &str) -> Result<GitHubComment> {
		let res = self
			.request(Method::POST, &format!("/repos/{owner}/{repo}/issues/{issue_number}/comments"))
			.json(&serde_json::json!({ "body": body }))
			.send()
			.await?;
		Self::parse(res, "create comment").await
	}

	#[instrument(skip(self, body), name = "RealGitHubClient::update_comment")]
	async fn update_comment(&self, owner: &str, repo: &str, comment_id: u64, body: &str) -> Result<GitHubComment> {
		let res = self
			.request(Method::PATCH, &format!("/repos/{owner}/{repo}/issues/comments/{comment_id}"))
			.json(&serde_json::json!({ "body": body }))
			.send()
			.await?;
		Self::parse(res, "update comment").await
	}

	#[instrument(skip(self, body), name = "RealGitHubClient::update_issue_body")]
	async fn update_issue_body(&self, owner: &str, repo: &str, issue_number: u64, body: &str) -> Result<GitHubIssue> {
		let res = self
			.request(Method::PATCH, &format!("/repos/{owner}/{repo}/issues/{issue_number}"))
			.json(&serde_json::json!({ "body": body }))
			.send()
			.await?;
		Self::parse(res, "update issue body").await
	}
}

//==============================================================================
// Comment Manager
//==============================================================================

/// Gateway bound to one repository, adding lookup of the managed comment on top of [`GitHubClient`].
#[derive(Clone)]
pub struct CommentManager {
	client: BoxedGitHubClient,
	owner: String,
	repo: String,
}

impl CommentManager {
	pub fn new(client: BoxedGitHubClient, owner: impl Into<String>, repo: impl Into<String>) -> Self {
		Self {
			client,
			owner: owner.into(),
			repo: repo.into(),
		}
	}

	/// First comment whose body carries a state marker for `action_id`, decodable or not.
	/// Stops paginating as soon as it is found.
	#[instrument(skip(self))]
	pub async fn find_comment(&self, issue_number: u64, action_id: &str) -> Result<Option<GitHubComment>> {
		let mut page = 1;
		loop {
			let comments = self.client.fetch_comments(&self.owner, &self.repo, issue_number, page).await?;
			let last_page = comments.len() < COMMENTS_PER_PAGE;

			if let Some(found) = comments
				.into_iter()
				.find(|c| c.body.as_deref().is_some_and(|body| metadata::has_metadata(body, action_id)))
			{
				tracing::debug!(comment_id = found.id, page, "found tracked comment");
				return Ok(Some(found));
			}
			if last_page {
				return Ok(None);
			}
			page += 1;
		}
	}

	pub async fn fetch_issue(&self, issue_number: u64) -> Result<GitHubIssue> {
		self.client.fetch_issue(&self.owner, &self.repo, issue_number).await
	}

	pub async fn create_comment(&self, issue_number: u64, body: &str) -> Result<GitHubComment> {
		self.client.create_comment(&self.owner, &self.repo, issue_number, body).await
	}

	pub async fn update_comment(&self, comment_id: u64, body: &str) -> Result<GitHubComment> {
		self.client.update_comment(&self.owner, &self.repo, comment_id, body).await
	}

	pub async fn update_issue_body(&self, issue_number: u64, body: &str) -> Result<GitHubIssue> {
		self.client.update_issue_body(&self.owner, &self.repo, issue_number, body).await
	}

	/// Update the tracked comment, or create it. The flag is true when the comment is new.
	#[instrument(skip(self, body))]
	pub async fn create_or_update_comment(&self, issue_number: u64, action_id: &str, body: &str) -> Result<(GitHubComment, bool)> {
		match self.find_comment(issue_number, action_id).await? {
			Some(existing) => {
				let comment = self.update_comment(existing.id, body).await?;
				Ok((comment, false))
			}
			None => {
				let comment = self.create_comment(issue_number, body).await?;
				tracing::info!(comment_id = comment.id, "created tracked comment");
				Ok((comment, true))
			}
		}
	}

	/// Overwrite the issue body. The flag is true when the previous body held no state for `action_id`.
	#[instrument(skip(self, body))]
	pub async fn create_or_update_issue_body(&self, issue_number: u64, action_id: &str, body: &str) -> Result<(GitHubIssue, bool)> {
		let issue = self.fetch_issue(issue_number).await?;
		let had_state = issue.body.as_deref().is_some_and(|b| metadata::has_metadata(b, action_id));

		let updated = self.update_issue_body(issue_number, body).await?;
		Ok((updated, !had_state))
	}
}

/// Build the HTTP-backed gateway for one repository.
pub fn create_comment_manager(api_url: &str, token: &str, owner: &str, repo: &str) -> CommentManager {
	CommentManager::new(Arc::new(RealGitHubClient::new(api_url, token)), owner, repo)
}
