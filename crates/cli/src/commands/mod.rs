pub mod run;
pub mod session;

use anyhow::Result;

use crate::cli::{Cli, Commands, SessionAction};
use crate::config::Config;

pub async fn dispatch(cli: Cli) -> Result<()> {
	let config = Config::load(cli.config.as_deref())?.with_session_file(cli.session_file);

	match cli.command {
		Commands::Run(args) => run::execute(config.apply_run_args(&args), &args).await,
		Commands::Session { action } => match action {
			SessionAction::Show { json } => session::show(&config.session_file, json),
			SessionAction::Clear => session::clear(&config.session_file),
		},
	}
}
