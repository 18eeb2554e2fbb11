use clap::{Args, Subcommand};
use dockhand::packages::{self, InstallReport};
use dockhand::provision::{self, DockerInstallReport, VundleReport};
use dockhand::session::Session;
use serde::Serialize;

use super::CmdResult;

#[derive(Args)]
pub struct ServerArgs {
    /// Target host(s) in user@host[:port] form (repeatable).
    /// Falls back to the hosts list in dockhand.yml.
    #[arg(long = "host", value_name = "USER@HOST[:PORT]", global = true)]
    pub hosts: Vec<String>,

    #[command(subcommand)]
    pub subcommand: ServerSubcommand,
}

#[derive(Subcommand)]
pub enum ServerSubcommand {
    /// Install packages that are not already present
    Provision {
        /// Packages to install
        #[arg(required = true, value_delimiter = ',')]
        packages: Vec<String>,

        /// Refresh package lists first
        #[arg(long)]
        update: bool,
    },
    /// Install the Docker engine and add the user to the docker group
    InstallDocker,
    /// Clone/update Vundle and install managed vim plugins
    SetupVundle,
}

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ServerOutput {
    Provision { reports: Vec<InstallReport> },
    InstallDocker { reports: Vec<DockerInstallReport> },
    SetupVundle { reports: Vec<VundleReport> },
}

pub fn run(args: ServerArgs, _global: &super::GlobalArgs) -> CmdResult<ServerOutput> {
    let hosts = super::resolve_hosts(&args.hosts)?;

    match args.subcommand {
        ServerSubcommand::Provision { packages, update } => {
            let mut reports = Vec::new();
            for host in &hosts {
                let session = Session::connect(host)?;
                if update {
                    packages::update_package_lists(&session)?;
                }
                reports.push(packages::install_missing(&session, &packages)?);
            }
            Ok((ServerOutput::Provision { reports }, 0))
        }
        ServerSubcommand::InstallDocker => {
            let mut reports = Vec::new();
            for host in &hosts {
                let session = Session::connect(host)?;
                reports.push(provision::install_docker(&session)?);
            }
            Ok((ServerOutput::InstallDocker { reports }, 0))
        }
        ServerSubcommand::SetupVundle => {
            let mut reports = Vec::new();
            for host in &hosts {
                let session = Session::connect(host)?;
                reports.push(provision::setup_vundle(&session, None)?);
            }
            Ok((ServerOutput::SetupVundle { reports }, 0))
        }
    }
}
