//! Server bootstrap helpers: Docker engine install and Vundle setup.

use crate::error::{Error, Result};
use crate::remote;
use crate::session::Session;
use crate::utils::shell;
use serde::Serialize;

const VUNDLE_REPO_URL: &str = "https://github.com/gmarik/Vundle.vim.git";
const VUNDLE_VERSION: &str = "v0.10.2";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerInstallReport {
    pub host: String,
    pub user_added_to_group: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VundleReport {
    pub host: String,
    pub repo_path: String,
    pub cloned: bool,
}

/// Install the most recent Docker engine via the get.docker.io script and
/// add the session user to the docker group.
///
/// Assumes bash exists on the target and the user has sudo privileges.
pub fn install_docker(session: &Session) -> Result<DockerInstallReport> {
    session
        .run("wget -qO- https://get.docker.io/ | bash")
        .require_success()
        .map_err(|e| Error::provision_failed(format!("Docker install script failed: {}", e)))?;

    let user = session.user().to_string();
    session
        .sudo(&format!("usermod -aG docker {}", shell::quote_arg(&user)))
        .require_success()
        .map_err(|e| Error::provision_failed(format!("usermod failed: {}", e)))?;

    Ok(DockerInstallReport {
        host: session.label().to_string(),
        user_added_to_group: user,
    })
}

/// Clone or update the Vundle vim plugin manager, pin it to the known-good
/// version, and install the vim plugins it manages.
pub fn setup_vundle(session: &Session, home_dir: Option<&str>) -> Result<VundleReport> {
    let home = match home_dir {
        Some(dir) => dir.to_string(),
        None => remote::home_dir(session),
    };
    let repo_path = remote::join_remote(&home, ".vim/bundle/Vundle.vim");

    let cloned = if session.exists(&repo_path) {
        if !session.is_dir(&repo_path) {
            return Err(Error::provision_failed(format!(
                "'{}' on '{}' is not a directory; remove it manually (it is used for storing Vundle)",
                repo_path,
                session.label()
            )));
        }
        log_status!("provision", "Vundle repo exists on {}, updating", session.label());
        session
            .run(&format!(
                "cd {} && git remote update",
                shell::quote_path(&repo_path)
            ))
            .require_success()?;
        false
    } else {
        log_status!("provision", "Cloning Vundle to '{}' on {}", repo_path, session.label());
        session
            .run(&format!(
                "git clone {} {}",
                VUNDLE_REPO_URL,
                shell::quote_path(&repo_path)
            ))
            .require_success()?;
        true
    };

    session
        .run(&format!(
            "cd {} && git checkout {}",
            shell::quote_path(&repo_path),
            VUNDLE_VERSION
        ))
        .require_success()?;

    log_status!("provision", "Installing vim plugins managed by Vundle on {}", session.label());
    session
        .run("vim +PluginInstall +qall")
        .require_success()?;

    Ok(VundleReport {
        host: session.label().to_string(),
        repo_path,
        cloned,
    })
}
