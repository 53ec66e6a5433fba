//! Runner settings, read from the `GITHUB_*` environment of an Actions job.

use std::path::PathBuf;

use color_eyre::eyre::{Context, Result, bail};
use serde::Deserialize;
use smart_default::SmartDefault;

#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct RunnerSettings {
	/// REST API root, `GITHUB_API_URL`
	#[default("https://api.github.com")]
	pub api_url: String,
	/// `owner/repo`, `GITHUB_REPOSITORY`
	pub repository: Option<String>,
	/// JSON payload of the triggering event, `GITHUB_EVENT_PATH`
	pub event_path: Option<PathBuf>,
	/// File step outputs are appended to, `GITHUB_OUTPUT`
	pub output: Option<PathBuf>,
}

impl RunnerSettings {
	pub fn from_env() -> Result<Self> {
		Self::from_source(config::Environment::with_prefix("GITHUB"))
	}

	fn from_source(source: config::Environment) -> Result<Self> {
		let settings = config::Config::builder()
			.add_source(source)
			.build()
			.wrap_err("Failed to read runner environment")?
			.try_deserialize::<Self>()
			.wrap_err("Runner environment is malformed")?;
		Ok(settings)
	}

	/// Owner and repository name of the target repository.
	pub fn owner_repo(&self) -> Result<(String, String)> {
		let Some(slug) = self.repository.as_deref() else {
			bail!("GITHUB_REPOSITORY is not set; expected `owner/repo`");
		};
		match slug.trim().split_once('/') {
			Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => Ok((owner.to_string(), repo.to_string())),
			_ => bail!("GITHUB_REPOSITORY must look like `owner/repo`, got {slug:?}"),
		}
	}
}
