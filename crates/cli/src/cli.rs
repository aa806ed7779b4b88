use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "backup")]
#[command(about = "Download project backups through an authenticated browser session")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// JSON config file (defaults to ./backup.json when present)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Session file holding the saved cookies
	#[arg(long, global = true, value_name = "FILE")]
	pub session_file: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Log in if needed and trigger a backup download for every project
	Run(RunArgs),

	/// Inspect or discard the saved session
	Session {
		#[command(subcommand)]
		action: SessionAction,
	},
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
	/// Page listing the projects to back up
	#[arg(long, value_name = "URL")]
	pub landing_url: Option<String>,

	/// Directory receiving the downloaded archives
	#[arg(long, value_name = "DIR")]
	pub download_dir: Option<PathBuf>,

	/// Show the browser window
	#[arg(long)]
	pub headed: bool,

	/// Ignore the saved session and log in with credentials
	#[arg(long)]
	pub fresh_login: bool,

	/// Timeout for every wait, in seconds
	#[arg(long, value_name = "SECS")]
	pub timeout_secs: Option<u64>,

	/// Account identity used for interactive login
	#[arg(long, env = "EMAIL", hide_env_values = true)]
	pub email: Option<String>,

	/// Account secret used for interactive login
	#[arg(long, env = "PASSWORD", hide_env_values = true)]
	pub password: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum SessionAction {
	/// Show the cookies stored in the session file (names and expiry only)
	Show {
		/// Print the overview as JSON
		#[arg(long)]
		json: bool,
	},
	/// Delete the session file
	Clear,
}

#[cfg(test)]
mod tests {
	use clap::CommandFactory;

	use super::*;

	#[test]
	fn cli_definition_is_consistent() {
		Cli::command().debug_assert();
	}

	#[test]
	fn parses_run_overrides() {
		let cli = Cli::try_parse_from([
			"backup",
			"-vv",
			"--session-file",
			"/tmp/s.json",
			"run",
			"--landing-url",
			"https://example.com/team/1",
			"--timeout-secs",
			"20",
			"--headed",
		])
		.unwrap();

		assert_eq!(cli.verbose, 2);
		assert_eq!(cli.session_file, Some(PathBuf::from("/tmp/s.json")));
		let Commands::Run(args) = cli.command else {
			panic!("expected run command");
		};
		assert_eq!(args.landing_url.as_deref(), Some("https://example.com/team/1"));
		assert_eq!(args.timeout_secs, Some(20));
		assert!(args.headed);
		assert!(!args.fresh_login);
	}

	#[test]
	fn parses_session_actions() {
		let cli = Cli::try_parse_from(["backup", "session", "clear"]).unwrap();
		assert!(matches!(
			cli.command,
			Commands::Session {
				action: SessionAction::Clear
			}
		));
	}

	#[test]
	fn parses_session_show_json() {
		let cli = Cli::try_parse_from(["backup", "session", "show", "--json"]).unwrap();
		assert!(matches!(
			cli.command,
			Commands::Session {
				action: SessionAction::Show { json: true }
			}
		));
	}
}
