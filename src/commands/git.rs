use clap::{Args, Subcommand};
use dockhand::config::Settings;
use dockhand::git::{self, GitCloneSetup, GitCloneStatus};
use dockhand::session::Session;
use serde::Serialize;

use super::CmdResult;

#[derive(Args)]
pub struct GitArgs {
    /// Target host(s) in user@host[:port] form (repeatable).
    /// Falls back to the hosts list in dockhand.yml.
    #[arg(long = "host", value_name = "USER@HOST[:PORT]", global = true)]
    pub hosts: Vec<String>,

    #[command(subcommand)]
    pub subcommand: GitSubcommand,
}

#[derive(Subcommand)]
pub enum GitSubcommand {
    /// Install SSH keys and the GIT_SSH wrapper for private clones
    Setup,
    /// Check whether setup has been run on each host
    Check,
}

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum GitOutput {
    Setup { setups: Vec<GitCloneSetup> },
    Check { statuses: Vec<GitCloneStatus> },
}

pub fn run(args: GitArgs, _global: &super::GlobalArgs) -> CmdResult<GitOutput> {
    // Settings are loaded once and handed down by reference
    let settings = Settings::load()?;
    let git_settings = settings.require_git_clone()?;
    let hosts = if args.hosts.is_empty() {
        settings.resolve_hosts()?
    } else {
        super::resolve_hosts(&args.hosts)?
    };

    match args.subcommand {
        GitSubcommand::Setup => {
            let mut setups = Vec::new();
            for host in &hosts {
                let session = Session::connect(host)?;
                setups.push(git::setup_server_for_git_clone(
                    &session,
                    git_settings,
                    None,
                )?);
            }
            Ok((GitOutput::Setup { setups }, 0))
        }
        GitSubcommand::Check => {
            let mut statuses = Vec::new();
            for host in &hosts {
                let session = Session::connect(host)?;
                statuses.push(git::is_git_clone_setup_complete(
                    &session,
                    git_settings,
                    None,
                )?);
            }
            let exit_code = if statuses.iter().all(|s| s.complete) {
                0
            } else {
                20
            };
            Ok((GitOutput::Check { statuses }, exit_code))
        }
    }
}
