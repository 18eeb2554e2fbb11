use clap::{Args, Subcommand};
use dockhand::docker::{
    self, BuildConfig, BuildOutput, PullOutput, PushOutput, ReleaseOutput,
};
use dockhand::error::Error;
use dockhand::session::Session;
use serde::Serialize;
use std::collections::BTreeMap;

use super::CmdResult;

#[derive(Args)]
pub struct DockerArgs {
    #[command(subcommand)]
    pub subcommand: DockerSubcommand,
}

#[derive(Subcommand)]
pub enum DockerSubcommand {
    /// Build a tagged image from a fresh clone of a git branch
    Build(BuildArgs),
    /// Push a local image to the registry
    Push {
        /// Image name in namespace/image format
        image: String,

        /// Image tag
        #[arg(long, default_value = "latest")]
        tag: String,
    },
    /// Pull a tagged image on each target host
    Pull {
        /// Image name in namespace/image format
        image: String,

        /// Image tag
        #[arg(long, default_value = "latest")]
        tag: String,

        /// Target host(s); falls back to the hosts list in dockhand.yml
        #[arg(long = "host", value_name = "USER@HOST[:PORT]")]
        hosts: Vec<String>,
    },
    /// Build once, push once, then optionally pull on every host
    Release(ReleaseArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Git repository handed to `git clone` (URL or local path)
    #[arg(long)]
    pub repo: String,

    /// Image name in namespace/image format
    #[arg(long)]
    pub image: String,

    /// Branch to build from
    #[arg(long, default_value = "master")]
    pub branch: String,

    /// Override a remote in the clone: name=url (repeatable)
    #[arg(long = "git-remote", value_name = "NAME=URL")]
    pub git_remotes: Vec<String>,

    /// Wire an upstream branch: local=remote/branch (repeatable)
    #[arg(long = "set-upstream", value_name = "LOCAL=REMOTE/BRANCH")]
    pub set_upstream: Vec<String>,

    /// Run `git-crypt init` with this key after checkout
    #[arg(long, value_name = "KEY_PATH")]
    pub git_crypt_key: Option<String>,

    /// Directory inside the repository holding the Dockerfile
    #[arg(long, default_value = ".")]
    pub dockerfile_dir: String,

    /// Explicit tag (default: branch-<first 12 chars of HEAD>)
    #[arg(long)]
    pub tag: Option<String>,
}

#[derive(Args)]
pub struct ReleaseArgs {
    #[command(flatten)]
    pub build: BuildArgs,

    /// Pull the pushed image on each host afterwards
    #[arg(long)]
    pub pull: bool,

    /// Target host(s); falls back to the hosts list in dockhand.yml
    #[arg(long = "host", value_name = "USER@HOST[:PORT]")]
    pub hosts: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum DockerOutput {
    Build(BuildOutput),
    Push(PushOutput),
    Pull { pulls: Vec<PullOutput> },
    Release {
        build: BuildOutput,
        push: PushOutput,
        pulls: Vec<PullOutput>,
    },
}

fn parse_pair(flag: &str, raw: &str) -> dockhand::Result<(String, String)> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| {
            Error::validation_invalid_argument(
                flag,
                format!("expected key=value, got '{}'", raw),
                None,
            )
        })
}

fn parse_pairs(flag: &str, raw: &[String]) -> dockhand::Result<BTreeMap<String, String>> {
    raw.iter().map(|entry| parse_pair(flag, entry)).collect()
}

impl BuildArgs {
    fn into_config(self) -> dockhand::Result<BuildConfig> {
        Ok(BuildConfig {
            git_repository: self.repo,
            image_name: self.image,
            branch: self.branch,
            git_remotes: parse_pairs("git-remote", &self.git_remotes)?,
            git_set_upstream: parse_pairs("set-upstream", &self.set_upstream)?,
            run_git_crypt_init: self.git_crypt_key.is_some(),
            git_crypt_key_path: self.git_crypt_key,
            dockerfile_dir: self.dockerfile_dir,
            image_tag: self.tag,
        })
    }
}

pub fn run(args: DockerArgs, _global: &super::GlobalArgs) -> CmdResult<DockerOutput> {
    match args.subcommand {
        DockerSubcommand::Build(build_args) => {
            let config = build_args.into_config()?;
            let output = docker::build_from_git_repo(&config)?;
            Ok((DockerOutput::Build(output), 0))
        }
        DockerSubcommand::Push { image, tag } => {
            let output = docker::push_image(&image, Some(&tag))?;
            Ok((DockerOutput::Push(output), 0))
        }
        DockerSubcommand::Pull { image, tag, hosts } => {
            let hosts = super::resolve_hosts(&hosts)?;
            // Explicit fan-out: each host pulls independently
            let mut pulls = Vec::new();
            for host in &hosts {
                let session = Session::connect(host)?;
                pulls.push(docker::pull_image(&session, &image, Some(&tag))?);
            }
            Ok((DockerOutput::Pull { pulls }, 0))
        }
        DockerSubcommand::Release(release_args) => {
            let pull_after = release_args.pull;
            let host_flags = release_args.hosts;
            let config = release_args.build.into_config()?;

            // Build and push run exactly once, regardless of host count
            let ReleaseOutput { build, push } = docker::build_and_push(&config)?;

            let mut pulls = Vec::new();
            if pull_after {
                let hosts = super::resolve_hosts(&host_flags)?;
                for host in &hosts {
                    let session = Session::connect(host)?;
                    pulls.push(docker::pull_image(
                        &session,
                        &build.image_name,
                        Some(&build.image_tag),
                    )?);
                }
            }

            Ok((DockerOutput::Release { build, push, pulls }, 0))
        }
    }
}
