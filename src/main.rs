use std::process::ExitCode;

use checkbox_workflow::{action, config::RunnerSettings, event, github, inputs::Cli, outputs::error_command};
use clap::Parser;
use color_eyre::eyre::Result;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(option_env!("LOG_DIRECTIVES").unwrap_or("info")));
	// stdout carries the outputs when there is no GITHUB_OUTPUT
	let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false);
	if std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
		builder.json().init();
	} else {
		builder.init();
	}
}

async fn try_main() -> Result<()> {
	let inputs = Cli::parse().into_inputs()?;
	let settings = RunnerSettings::from_env()?;
	let (owner, repo) = settings.owner_repo()?;
	tracing::debug!(api_url = %settings.api_url, %owner, %repo, "runner settings");

	let manager = github::create_comment_manager(&settings.api_url, &inputs.token, &owner, &repo);
	let event_updated_at = event::issue_updated_at(settings.event_path.as_deref());

	let outputs = action::run(&inputs, &manager, event_updated_at).await?;
	outputs.write(settings.output.as_deref())
}

#[tokio::main]
async fn main() -> ExitCode {
	if let Err(e) = color_eyre::install() {
		eprintln!("{e}");
	}
	init_tracing();
	tracing::debug!(git_hash = option_env!("GIT_HASH").unwrap_or("unknown"), "checkbox-workflow v{}", env!("CARGO_PKG_VERSION"));

	match try_main().await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			tracing::error!("{e:?}");
			println!("{}", error_command(&e.to_string()));
			ExitCode::FAILURE
		}
	}
}
