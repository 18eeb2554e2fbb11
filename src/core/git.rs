//! Git predicates and the private-clone provisioning helper.
//!
//! Provisioning installs a managed SSH key pair and a GIT_SSH wrapper
//! script on the target so it can clone private repositories:
//!
//! ```text
//! GIT_SSH=$HOME/git_ssh_wrap.sh git fetch origin
//! ```
//!
//! Both steps are idempotent: files already present are left alone.

use crate::config::GitCloneSettings;
use crate::error::{Error, Result};
use crate::remote;
use crate::session::Session;
use crate::utils::{command, shell, template};
use serde::Serialize;
use std::io::Write;

/// Whether a directory on the target is under git control.
pub fn is_dir_under_git_control(session: &Session, dir: &str) -> bool {
    session
        .run(&format!(
            "cd {} && git rev-parse --git-dir",
            shell::quote_path(dir)
        ))
        .success
}

/// Whether a branch exists in a local repository.
pub fn local_branch_exists(repo_dir: &str, branch: &str) -> bool {
    command::succeeded_in(
        repo_dir,
        "git",
        &[
            "show-ref",
            "--verify",
            "--quiet",
            &format!("refs/heads/{}", branch),
        ],
    )
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GitCloneSetup {
    pub host: String,
    pub copied: Vec<String>,
    pub skipped: Vec<String>,
    pub script_installed: bool,
    pub script_path: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GitCloneStatus {
    pub host: String,
    pub complete: bool,
    pub missing: Vec<String>,
}

/// Path of the GIT_SSH wrapper script on the target.
pub fn git_ssh_script_path(settings: &GitCloneSettings, home_dir: &str) -> String {
    remote::join_remote(home_dir, &settings.git_ssh_script_name)
}

fn remote_public_key_path(settings: &GitCloneSettings, home_dir: &str) -> String {
    let dir = remote::join_remote(home_dir, &settings.ssh_keys_remote_dir);
    remote::join_remote(&dir, &settings.ssh_public_key)
}

fn remote_private_key_path(settings: &GitCloneSettings, home_dir: &str) -> String {
    let dir = remote::join_remote(home_dir, &settings.ssh_keys_remote_dir);
    remote::join_remote(&dir, &settings.ssh_private_key)
}

/// Install the SSH key pair and the GIT_SSH wrapper script on the target.
pub fn setup_server_for_git_clone(
    session: &Session,
    settings: &GitCloneSettings,
    home_dir: Option<&str>,
) -> Result<GitCloneSetup> {
    let home = match home_dir {
        Some(dir) => dir.to_string(),
        None => remote::home_dir(session),
    };

    let keys_dir = remote::join_remote(&home, &settings.ssh_keys_remote_dir);
    session
        .run(&format!("mkdir -p {}", shell::quote_path(&keys_dir)))
        .require_success()?;

    let mut copied = Vec::new();
    let mut skipped = Vec::new();

    let transfers = [
        (
            settings.local_public_key_path(),
            remote_public_key_path(settings, &home),
        ),
        (
            settings.local_private_key_path(),
            remote_private_key_path(settings, &home),
        ),
    ];
    for (local_path, remote_path) in &transfers {
        if remote::copy_file_if_absent(session, local_path, remote_path)? {
            copied.push(remote_path.clone());
        } else {
            skipped.push(remote_path.clone());
        }
    }

    let script_path = git_ssh_script_path(settings, &home);
    let script_installed = if session.exists(&script_path) {
        skipped.push(script_path.clone());
        false
    } else {
        install_wrapper_script(session, settings, &script_path, &home)?;
        true
    };

    Ok(GitCloneSetup {
        host: session.label().to_string(),
        copied,
        skipped,
        script_installed,
        script_path,
    })
}

/// Render the wrapper script template and install it with mode 0755.
fn install_wrapper_script(
    session: &Session,
    settings: &GitCloneSettings,
    script_path: &str,
    home_dir: &str,
) -> Result<()> {
    let template_path = settings.script_template_path();
    let raw = std::fs::read_to_string(&template_path).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("read {}", template_path)))
            .with_hint("git_ssh_script_template_dir must contain the wrapper script template")
    })?;

    let rendered = template::render(
        &raw,
        &[(
            template::TemplateVars::SSH_PRIVATE_KEY_PATH,
            remote_private_key_path(settings, home_dir).as_str(),
        )],
    );

    let mut file = tempfile::NamedTempFile::new()
        .map_err(|e| Error::internal_io(e.to_string(), Some("create tempfile".to_string())))?;
    file.write_all(rendered.as_bytes())
        .map_err(|e| Error::internal_io(e.to_string(), Some("write tempfile".to_string())))?;

    session
        .put(&file.path().to_string_lossy(), script_path)
        .require_success()?;
    session
        .run(&format!("chmod 755 {}", shell::quote_path(script_path)))
        .require_success()?;
    Ok(())
}

/// Whether the provisioning step has been run on the target.
///
/// Checks presence of the wrapper script and both keys; every missing path
/// is reported, and the setup only counts as complete when none is missing.
pub fn is_git_clone_setup_complete(
    session: &Session,
    settings: &GitCloneSettings,
    home_dir: Option<&str>,
) -> Result<GitCloneStatus> {
    let home = match home_dir {
        Some(dir) => dir.to_string(),
        None => remote::home_dir(session),
    };

    let expected = [
        git_ssh_script_path(settings, &home),
        remote_public_key_path(settings, &home),
        remote_private_key_path(settings, &home),
    ];

    let mut missing = Vec::new();
    for path in &expected {
        if !session.exists(path) {
            log_status!("git", "'{}' does not exist on '{}'", path, session.label());
            missing.push(path.clone());
        }
    }

    if !missing.is_empty() {
        log_status!(
            "git",
            "Run 'dockhand git setup' for '{}' and try again",
            session.label()
        );
    }

    Ok(GitCloneStatus {
        host: session.label().to_string(),
        complete: missing.is_empty(),
        missing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> GitCloneSettings {
        GitCloneSettings {
            ssh_private_key: "id_rsa_deploy".to_string(),
            ssh_public_key: "id_rsa_deploy.pub".to_string(),
            ssh_keys_local_dir: "keys".to_string(),
            ssh_keys_remote_dir: ".ssh/deploy-keys".to_string(),
            git_ssh_script_name: "git_ssh_wrap.sh".to_string(),
            git_ssh_script_template_dir: "templates".to_string(),
        }
    }

    #[test]
    fn remote_paths_join_under_home() {
        let settings = settings();
        assert_eq!(
            git_ssh_script_path(&settings, "/home/deploy"),
            "/home/deploy/git_ssh_wrap.sh"
        );
        assert_eq!(
            remote_private_key_path(&settings, "/home/deploy"),
            "/home/deploy/.ssh/deploy-keys/id_rsa_deploy"
        );
        assert_eq!(
            remote_public_key_path(&settings, "/home/deploy"),
            "/home/deploy/.ssh/deploy-keys/id_rsa_deploy.pub"
        );
    }

    #[test]
    fn local_branch_exists_in_fresh_repo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_string_lossy().to_string();
        command::run_in(&path, "git", &["init", "-q"], "git init").unwrap();
        assert!(!local_branch_exists(&path, "master"));
    }

    #[test]
    fn git_control_probe_on_plain_dir() {
        let session = Session::local();
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_dir_under_git_control(
            &session,
            &dir.path().to_string_lossy()
        ));
    }
}
