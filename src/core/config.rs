//! Settings document handling.
//!
//! Settings are read once from `dockhand.yml` in the working directory and
//! passed by reference to whatever needs them — there is no ambient global.

use crate::error::{Error, Result};
use crate::host::Host;
use serde::Deserialize;
use std::path::Path;

/// Well-known relative path of the settings document.
pub const SETTINGS_FILE: &str = "dockhand.yml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// Default host targets in `user@host[:port]` form.
    #[serde(default)]
    pub hosts: Vec<String>,

    /// SSH identity file used for every host (tilde-expanded).
    #[serde(default)]
    pub identity_file: Option<String>,

    /// Settings block for the git clone provisioning helper.
    #[serde(default)]
    pub git_clone: Option<GitCloneSettings>,
}

/// Key material and wrapper-script settings for provisioning servers to
/// clone private repositories.
#[derive(Debug, Clone, Deserialize)]
pub struct GitCloneSettings {
    /// Filename of the private key (inside the local and remote key dirs).
    pub ssh_private_key: String,
    /// Filename of the public key.
    pub ssh_public_key: String,
    /// Local directory holding the key pair to copy from.
    pub ssh_keys_local_dir: String,
    /// Directory under the remote $HOME where keys are installed.
    pub ssh_keys_remote_dir: String,
    /// Name of the GIT_SSH wrapper script (also its template filename).
    pub git_ssh_script_name: String,
    /// Local directory holding the wrapper script template.
    pub git_ssh_script_template_dir: String,
}

impl Settings {
    /// Load settings from the well-known relative path.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(SETTINGS_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let display = path.display().to_string();

        let raw = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::config_missing_file(display.clone())
            } else {
                Error::internal_io(e.to_string(), Some(format!("read {}", display)))
            }
        })?;

        serde_yml::from_str(&raw).map_err(|e| Error::config_invalid_yaml(display, e.to_string()))
    }

    /// The git clone block, or a descriptive error before any remote work.
    pub fn require_git_clone(&self) -> Result<&GitCloneSettings> {
        self.git_clone.as_ref().ok_or_else(|| {
            Error::config_missing_key("git_clone", Some(SETTINGS_FILE.to_string())).with_hint(
                "Add a git_clone block with ssh_private_key, ssh_public_key, \
                 ssh_keys_local_dir, ssh_keys_remote_dir, git_ssh_script_name and \
                 git_ssh_script_template_dir",
            )
        })
    }

    /// Parse the configured host list into [`Host`] targets.
    pub fn resolve_hosts(&self) -> Result<Vec<Host>> {
        if self.hosts.is_empty() {
            return Err(Error::config_missing_key(
                "hosts",
                Some(SETTINGS_FILE.to_string()),
            )
            .with_hint("Add a hosts list to dockhand.yml or pass --host user@host"));
        }

        self.hosts
            .iter()
            .map(|spec| {
                spec.parse::<Host>()
                    .map(|h| h.with_identity_file(self.identity_file.clone()))
            })
            .collect()
    }
}

impl GitCloneSettings {
    pub fn local_public_key_path(&self) -> String {
        join_local(&self.ssh_keys_local_dir, &self.ssh_public_key)
    }

    pub fn local_private_key_path(&self) -> String {
        join_local(&self.ssh_keys_local_dir, &self.ssh_private_key)
    }

    pub fn script_template_path(&self) -> String {
        join_local(&self.git_ssh_script_template_dir, &self.git_ssh_script_name)
    }
}

fn join_local(dir: &str, file: &str) -> String {
    Path::new(&shellexpand::tilde(dir).to_string())
        .join(file)
        .to_string_lossy()
        .to_string()
}
