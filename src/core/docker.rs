//! Docker image workflows: build from a freshly cloned git branch, push to
//! the registry, pull on target hosts.

use crate::error::{Error, Result};
use crate::git;
use crate::session::Session;
use crate::ssh::{
    execute_local_command_in_dir, execute_local_command_interactive,
    execute_local_command_passthrough,
};
use crate::utils::{command, shell, tty};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Serialize an image name with an optional tag: `name` or `name:tag`.
pub fn tagged_image_name(image_name: &str, image_tag: Option<&str>) -> String {
    match image_tag {
        None => image_name.to_string(),
        Some(tag) => format!("{}:{}", image_name, tag),
    }
}

/// Options for building an image from a git repository.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    /// Repository handed to `git clone` (URL or local path).
    pub git_repository: String,
    /// Image name in `namespace/image` format.
    pub image_name: String,
    /// Branch the image is built from.
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Remote-name -> URL overrides applied to the fresh clone. Needed when
    /// the repository is a local path and the image fetches from `origin`
    /// at run time.
    #[serde(default)]
    pub git_remotes: BTreeMap<String, String>,
    /// Local-branch -> `remote/branch` upstream wiring, applied after the
    /// overridden remotes have been fetched.
    #[serde(default)]
    pub git_set_upstream: BTreeMap<String, String>,
    /// Run `git-crypt init` with `git_crypt_key_path` after checkout.
    #[serde(default)]
    pub run_git_crypt_init: bool,
    #[serde(default)]
    pub git_crypt_key_path: Option<String>,
    /// Directory inside the repository holding the Dockerfile.
    #[serde(default = "default_dockerfile_dir")]
    pub dockerfile_dir: String,
    /// Explicit tag; derived from branch + HEAD commit when absent.
    #[serde(default)]
    pub image_tag: Option<String>,
}

fn default_branch() -> String {
    "master".to_string()
}

fn default_dockerfile_dir() -> String {
    ".".to_string()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOutput {
    pub image_name: String,
    pub image_tag: String,
    pub tagged_image: String,
    pub branch: String,
    pub head_commit: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushOutput {
    pub tagged_image: String,
    pub login_required: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullOutput {
    pub host: String,
    pub tagged_image: String,
    pub login_required: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseOutput {
    pub build: BuildOutput,
    pub push: PushOutput,
}

/// Tag derived from the branch and the first 12 hex characters of HEAD.
fn derived_tag(branch: &str, head_commit: &str) -> String {
    let short = &head_commit[..head_commit.len().min(12)];
    format!("{}-{}", branch, short)
}

/// Reject a build configuration that asks for git-crypt decryption without
/// a usable key, before any external command runs.
fn validate(config: &BuildConfig) -> Result<()> {
    if !config.run_git_crypt_init {
        return Ok(());
    }

    let key_path = config.git_crypt_key_path.as_deref().ok_or_else(|| {
        Error::validation_invalid_argument(
            "gitCryptKeyPath",
            "git-crypt init requested without a key path",
            None,
        )
    })?;

    let expanded = shellexpand::tilde(key_path).to_string();
    if !std::path::Path::new(&expanded).exists() {
        return Err(Error::validation_invalid_argument(
            "gitCryptKeyPath",
            "git-crypt key file does not exist",
            Some(vec![expanded]),
        ));
    }
    Ok(())
}

/// Build a tagged image from a fresh clone of the configured branch.
///
/// Clones into a temporary directory, reconciles remotes and upstream
/// tracking branches, checks out the branch, optionally decrypts with
/// git-crypt, and runs `docker build` from the configured subdirectory.
/// The clone directory is removed when this returns.
pub fn build_from_git_repo(config: &BuildConfig) -> Result<BuildOutput> {
    validate(config)?;

    let clone_dir = tempfile::tempdir()
        .map_err(|e| Error::internal_io(e.to_string(), Some("create clone dir".to_string())))?;
    let repo_dir = clone_dir.path().to_string_lossy().to_string();

    command::run(
        "git",
        &["clone", &config.git_repository, &repo_dir],
        "git clone",
    )
    .map_err(|e| Error::git_command_failed(e.to_string()))?;

    if !config.git_remotes.is_empty() {
        log_status!("docker", "Adding supplied git remotes");
        add_remotes(&repo_dir, &config.git_remotes);
    }

    command::run_in(&repo_dir, "git", &["fetch", "--all"], "git fetch")
        .map_err(|e| Error::git_command_failed(e.to_string()))?;

    if !config.git_set_upstream.is_empty() {
        log_status!("docker", "Setting upstream branches");
        set_upstream_branches(&repo_dir, &config.git_set_upstream);
    }

    command::run_in(
        &repo_dir,
        "git",
        &["checkout", &config.branch],
        "git checkout",
    )
    .map_err(|e| Error::git_command_failed(e.to_string()))?;

    if config.run_git_crypt_init {
        // validate() has already established the key path exists
        if let Some(key_path) = config.git_crypt_key_path.as_deref() {
            let expanded = shellexpand::tilde(key_path).to_string();
            command::run_in(&repo_dir, "git-crypt", &["init", &expanded], "git-crypt init")
                .map_err(|e| Error::git_command_failed(e.to_string()))?;
        }
    }

    let head_commit = command::run_in(&repo_dir, "git", &["rev-parse", "HEAD"], "git rev-parse")
        .map_err(|e| Error::git_command_failed(e.to_string()))?;

    let image_tag = config
        .image_tag
        .clone()
        .unwrap_or_else(|| derived_tag(&config.branch, &head_commit));
    let tagged_image = tagged_image_name(&config.image_name, Some(&image_tag));

    log_status!(
        "docker",
        "Building '{}' from branch '{}' commit {}",
        tagged_image,
        config.branch,
        head_commit
    );
    let build = execute_local_command_passthrough(
        &format!(
            "docker build -t {} {}",
            shell::quote_arg(&tagged_image),
            shell::quote_path(&config.dockerfile_dir)
        ),
        Some(&repo_dir),
        None,
    );
    if !build.success {
        return Err(Error::docker_build_failed(format!(
            "docker build of '{}' exited with code {}",
            tagged_image, build.exit_code
        )));
    }

    Ok(BuildOutput {
        image_name: config.image_name.clone(),
        image_tag,
        tagged_image,
        branch: config.branch.clone(),
        head_commit,
    })
}

/// Replace any same-named remotes in the clone with the supplied URLs.
/// Removal of a missing remote is expected to fail and is ignored.
fn add_remotes(repo_dir: &str, remotes: &BTreeMap<String, String>) {
    for (name, url) in remotes {
        let _ = execute_local_command_in_dir(
            &format!("git remote rm {}", shell::quote_arg(name)),
            Some(repo_dir),
            None,
        );
        let added = execute_local_command_in_dir(
            &format!(
                "git remote add {} {}",
                shell::quote_arg(name),
                shell::quote_arg(url)
            ),
            Some(repo_dir),
            None,
        );
        if !added.success {
            log_status!("docker", "Could not add remote '{}': {}", name, added.stderr.trim());
        }
    }
}

/// Wire upstream tracking branches. Existing local branches get their
/// upstream re-pointed; missing ones are checked out from the remote
/// branch (which must already be fetched). Failures are reported but do
/// not abort the build.
fn set_upstream_branches(repo_dir: &str, upstreams: &BTreeMap<String, String>) {
    for (local_branch, upstream_branch) in upstreams {
        let result = if git::local_branch_exists(repo_dir, local_branch) {
            execute_local_command_in_dir(
                &format!(
                    "git branch --set-upstream-to={} {}",
                    shell::quote_arg(upstream_branch),
                    shell::quote_arg(local_branch)
                ),
                Some(repo_dir),
                None,
            )
        } else {
            execute_local_command_in_dir(
                &format!(
                    "git checkout -b {} {}",
                    shell::quote_arg(local_branch),
                    shell::quote_arg(upstream_branch)
                ),
                Some(repo_dir),
                None,
            )
        };
        if !result.success {
            log_status!(
                "docker",
                "Could not set upstream '{}' for '{}': {}",
                upstream_branch,
                local_branch,
                result.stderr.trim()
            );
        }
    }
}

/// Push a local image to the registry.
///
/// Tries without logging in first (a `docker login` prompts even when the
/// credentials are cached); on failure, logs in interactively and retries.
pub fn push_image(image_name: &str, image_tag: Option<&str>) -> Result<PushOutput> {
    let tag = image_tag.unwrap_or("latest");
    let tagged_image = tagged_image_name(image_name, Some(tag));
    let push_cmd = format!("docker push {}", shell::quote_arg(&tagged_image));

    log_status!("docker", "Pushing '{}' to the registry", tagged_image);
    let first = execute_local_command_passthrough(&push_cmd, None, None);
    if first.success {
        return Ok(PushOutput {
            tagged_image,
            login_required: false,
        });
    }

    log_status!(
        "docker",
        "Push failed, most likely missing credentials; running 'docker login' and retrying"
    );
    if !tty::require_tty_for_interactive() {
        return Err(Error::docker_push_failed(tagged_image)
            .retryable(true)
            .with_hint("No interactive terminal for 'docker login'; log in and retry"));
    }
    execute_local_command_interactive("docker login", None, None);
    let retry = execute_local_command_passthrough(&push_cmd, None, None);
    if !retry.success {
        return Err(Error::docker_push_failed(tagged_image).retryable(false));
    }

    Ok(PushOutput {
        tagged_image,
        login_required: true,
    })
}

/// Pull a tagged image on the target host.
///
/// Pulling ahead of a `docker stop`/`docker run` swap keeps the container's
/// downtime to the restart itself rather than the transfer.
pub fn pull_image(
    session: &Session,
    image_name: &str,
    image_tag: Option<&str>,
) -> Result<PullOutput> {
    let tag = image_tag.unwrap_or("latest");
    let tagged_image = tagged_image_name(image_name, Some(tag));
    let pull_cmd = format!("docker pull {}", shell::quote_arg(&tagged_image));

    log_status!("docker", "Pulling '{}' on {}", tagged_image, session.label());
    let first = session.run(&pull_cmd);
    if first.success {
        return Ok(PullOutput {
            host: session.label().to_string(),
            tagged_image,
            login_required: false,
        });
    }

    log_status!(
        "docker",
        "Pull failed on {}, most likely missing credentials; running 'docker login' and retrying",
        session.label()
    );
    if !tty::require_tty_for_interactive() {
        return Err(
            Error::docker_pull_failed(tagged_image, session.label().to_string())
                .retryable(true)
                .with_hint("No interactive terminal for 'docker login' on the target"),
        );
    }
    session.run_interactive("docker login");
    let retry = session.run(&pull_cmd);
    if !retry.success {
        return Err(
            Error::docker_pull_failed(tagged_image, session.label().to_string()).retryable(false),
        );
    }

    Ok(PullOutput {
        host: session.label().to_string(),
        tagged_image,
        login_required: true,
    })
}

/// Build an image from a git repository and push it to the registry.
///
/// This is the single-coordinator path: callers invoke it exactly once on
/// the controller, regardless of how many hosts will later pull the image.
pub fn build_and_push(config: &BuildConfig) -> Result<ReleaseOutput> {
    let build = build_from_git_repo(config)?;
    let push = push_image(&build.image_name, Some(&build.image_tag))?;
    Ok(ReleaseOutput { build, push })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_name_without_tag() {
        assert_eq!(tagged_image_name("org/img", None), "org/img");
    }

    #[test]
    fn tagged_name_with_tag() {
        assert_eq!(tagged_image_name("org/img", Some("v1")), "org/img:v1");
    }

    #[test]
    fn tag_derived_from_branch_and_head() {
        assert_eq!(
            derived_tag("master", "18f450dc8c4be916fdf7f47cf79aae9af1a67cd7"),
            "master-18f450dc8c4b"
        );
    }

    #[test]
    fn tag_derivation_tolerates_short_hashes() {
        assert_eq!(derived_tag("dev", "abc123"), "dev-abc123");
    }

    fn build_config() -> BuildConfig {
        BuildConfig {
            git_repository: "git@example.com:org/repo.git".to_string(),
            image_name: "org/img".to_string(),
            branch: default_branch(),
            git_remotes: BTreeMap::new(),
            git_set_upstream: BTreeMap::new(),
            run_git_crypt_init: false,
            git_crypt_key_path: None,
            dockerfile_dir: default_dockerfile_dir(),
            image_tag: None,
        }
    }

    #[test]
    fn git_crypt_without_key_path_fails_fast() {
        let mut config = build_config();
        config.run_git_crypt_init = true;
        let err = validate(&config).unwrap_err();
        assert_eq!(err.code, crate::ErrorCode::ValidationInvalidArgument);
    }

    #[test]
    fn git_crypt_with_missing_key_file_fails_fast() {
        let mut config = build_config();
        config.run_git_crypt_init = true;
        config.git_crypt_key_path = Some("/definitely/not/a/key".to_string());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn git_crypt_with_existing_key_passes() {
        let key = tempfile::NamedTempFile::new().unwrap();
        let mut config = build_config();
        config.run_git_crypt_init = true;
        config.git_crypt_key_path = Some(key.path().to_string_lossy().to_string());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn build_config_deserializes_with_defaults() {
        let config: BuildConfig = serde_json::from_str(
            r#"{"gitRepository": "git@example.com:org/repo.git", "imageName": "org/img"}"#,
        )
        .unwrap();
        assert_eq!(config.branch, "master");
        assert_eq!(config.dockerfile_dir, ".");
        assert!(config.git_remotes.is_empty());
        assert!(config.image_tag.is_none());
    }
}
